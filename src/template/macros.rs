use std::path::Path;

const MACRO_EXTENSION: &str = "xlsm";

/// Whether the template's VBA project travels to the output workbook.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MacroPolicy {
    Keep,
    Drop,
}

impl MacroPolicy {
    /// Macros are kept only when both the template and the output are
    /// macro-enabled workbooks.
    pub fn resolve(template: &Path, output: &Path) -> Self {
        if is_macro_enabled(template) && is_macro_enabled(output) {
            MacroPolicy::Keep
        } else {
            MacroPolicy::Drop
        }
    }

    pub fn keeps_macros(self) -> bool {
        self == MacroPolicy::Keep
    }
}

fn is_macro_enabled(path: &Path) -> bool {
    path.extension()
        .and_then(|extension| extension.to_str())
        .is_some_and(|extension| extension.eq_ignore_ascii_case(MACRO_EXTENSION))
}
