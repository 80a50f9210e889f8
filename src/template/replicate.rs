use std::collections::{BTreeMap, HashSet};

use tracing::{debug, instrument};

use crate::error::{Result, ToolError};
use crate::template::grid::LabeledGrid;

/// Worksheet titles are limited to 31 characters.
pub const MAX_SHEET_TITLE_LEN: usize = 31;
/// Title used when a category sanitizes to nothing.
pub const FALLBACK_SHEET_TITLE: &str = "TIER";

const FORBIDDEN_TITLE_CHARS: [char; 7] = [':', '\\', '/', '?', '*', '[', ']'];

/// Removes the characters worksheets reject, trims, and bounds the length.
pub fn sanitize_sheet_title(raw: &str) -> String {
    let stripped: String = raw
        .chars()
        .filter(|ch| !FORBIDDEN_TITLE_CHARS.contains(ch))
        .collect();

    let trimmed = stripped.trim();
    let title = if trimmed.is_empty() {
        FALLBACK_SHEET_TITLE
    } else {
        trimmed
    };

    title.chars().take(MAX_SHEET_TITLE_LEN).collect()
}

/// Hands out unique sheet titles; worksheets compare titles case-insensitively.
#[derive(Debug, Default)]
struct SheetTitleRegistry {
    used: HashSet<String>,
}

impl SheetTitleRegistry {
    fn claim(&mut self, title: &str) {
        self.used.insert(title.to_lowercase());
    }

    fn is_free(&self, title: &str) -> bool {
        !self.used.contains(&title.to_lowercase())
    }

    fn assign(&mut self, raw: &str) -> String {
        let base = sanitize_sheet_title(raw);
        if self.is_free(&base) {
            self.claim(&base);
            return base;
        }

        let mut counter = 1;
        loop {
            let suffix = format!("_{counter}");
            let prefix: String = base
                .chars()
                .take(MAX_SHEET_TITLE_LEN - suffix.len())
                .collect();
            let candidate = format!("{}{suffix}", prefix.trim_end());
            if self.is_free(&candidate) {
                self.claim(&candidate);
                return candidate;
            }
            counter += 1;
        }
    }
}

/// Picks the sheet every category sheet is cloned from: the sheet titled
/// `preferred` when present, otherwise the first sheet.
pub fn template_sheet_index(document: &dyn LabeledGrid, preferred: &str) -> Result<usize> {
    if document.sheet_count() == 0 {
        return Err(ToolError::InvalidWorkbook(
            "template workbook has no worksheets".into(),
        ));
    }
    Ok(document.sheet_index(preferred).unwrap_or(0))
}

/// Clones the template sheet once per category and returns the index of the
/// sheet created for each category.
#[instrument(level = "debug", skip(document, categories))]
pub fn replicate_template<'a, I>(
    document: &mut dyn LabeledGrid,
    template: usize,
    categories: I,
) -> Result<BTreeMap<String, usize>>
where
    I: IntoIterator<Item = &'a String>,
{
    let mut titles = SheetTitleRegistry::default();
    for existing in document.sheet_titles() {
        titles.claim(&existing);
    }

    let mut sheets = BTreeMap::new();
    for category in categories {
        if sheets.contains_key(category) {
            continue;
        }
        let title = titles.assign(category);
        let index = document.clone_sheet(template, &title)?;
        debug!(%category, %title, index, "template sheet cloned");
        sheets.insert(category.clone(), index);
    }

    Ok(sheets)
}
