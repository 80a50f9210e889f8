use std::path::Path;

use tracing::{debug, info, instrument};

use crate::error::{Result, ToolError};
use crate::template::grid::{LabeledGrid, TemplateDocument};
use crate::template::macros::MacroPolicy;

/// Loads the whole template workbook. The VBA project is dropped up front
/// unless the policy keeps macros.
#[instrument(level = "info", skip_all, fields(path = %path.display(), ?macros))]
pub fn read_template(path: &Path, macros: MacroPolicy) -> Result<TemplateDocument> {
    let book = umya_spreadsheet::reader::xlsx::read(path)
        .map_err(|error| ToolError::Spreadsheet(error.to_string()))?;
    let mut document = TemplateDocument::new(book);

    if document.has_macros() && !macros.keeps_macros() {
        document.remove_macros();
        debug!("VBA project dropped");
    }

    info!(
        sheet_count = document.sheet_count(),
        macros_kept = document.has_macros(),
        "template loaded"
    );
    Ok(document)
}

/// Saves the document, VBA project included when it still carries one.
#[instrument(level = "info", skip_all, fields(path = %path.display()))]
pub fn write_template(path: &Path, document: &TemplateDocument) -> Result<()> {
    umya_spreadsheet::writer::xlsx::write(document.spreadsheet(), path)
        .map_err(|error| ToolError::Spreadsheet(error.to_string()))?;
    Ok(())
}
