use umya_spreadsheet::{Spreadsheet, Worksheet};

use crate::error::{Result, ToolError};
use crate::template::locate::find_label_row;

/// Largest 1-based row index a worksheet can address.
pub const MAX_ROW: u32 = 1_048_576;
/// Largest 1-based column index a worksheet can address.
pub const MAX_COLUMN: u16 = 16_384;

/// Value written into a template cell.
#[derive(Debug, Clone, PartialEq)]
pub enum CellValue {
    Text(String),
    Number(f64),
}

impl From<&str> for CellValue {
    fn from(value: &str) -> Self {
        CellValue::Text(value.to_string())
    }
}

impl From<String> for CellValue {
    fn from(value: String) -> Self {
        CellValue::Text(value)
    }
}

impl From<f64> for CellValue {
    fn from(value: f64) -> Self {
        CellValue::Number(value)
    }
}

/// The operations the population engine needs from a spreadsheet document.
///
/// Sheets are addressed by position, rows and columns are 1-based and column 1
/// holds the row labels.
pub trait LabeledGrid {
    fn sheet_count(&self) -> usize;

    fn sheet_title(&self, index: usize) -> Option<String>;

    /// Highest row holding any cell, 0 for an empty or unknown sheet.
    fn last_row(&self, sheet: usize) -> u32;

    /// Displayed text of a cell. Formula cells yield their `=` source.
    fn cell_text(&self, sheet: usize, row: u32, column: u16) -> Option<String>;

    /// True for cells driven by a formula, shared formula children included.
    fn holds_formula(&self, sheet: usize, row: u32, column: u16) -> bool;

    /// Appends a copy of the sheet at `source` titled `title` and returns its
    /// index. The source sheet is left untouched.
    fn clone_sheet(&mut self, source: usize, title: &str) -> Result<usize>;

    /// Writes `value` at `(row, column)` of the sheet at `sheet`, keeping the
    /// cell's formatting.
    fn write_cell(&mut self, sheet: usize, row: u32, column: u16, value: CellValue)
    -> Result<()>;

    fn sheet_titles(&self) -> Vec<String> {
        (0..self.sheet_count())
            .filter_map(|index| self.sheet_title(index))
            .collect()
    }

    /// Index of the sheet whose title equals `title` (case-insensitive).
    fn sheet_index(&self, title: &str) -> Option<usize> {
        (0..self.sheet_count()).find(|index| {
            self.sheet_title(*index)
                .is_some_and(|existing| existing.eq_ignore_ascii_case(title))
        })
    }

    fn find_row_by_label(&self, sheet: usize, keywords: &[String]) -> Option<u32> {
        find_label_row(self, sheet, keywords)
    }
}

/// Estimating template held as a full workbook model, so styles, merged
/// ranges, column widths, defined names, dates, shared formulas and the VBA
/// project all survive a load and save.
#[derive(Debug, Clone)]
pub struct TemplateDocument {
    book: Spreadsheet,
}

impl TemplateDocument {
    pub fn new(book: Spreadsheet) -> Self {
        Self { book }
    }

    pub fn spreadsheet(&self) -> &Spreadsheet {
        &self.book
    }

    pub fn has_macros(&self) -> bool {
        self.book.get_macros_code().is_some()
    }

    /// Strips the VBA project so the document saves as a plain workbook.
    pub fn remove_macros(&mut self) {
        self.book.remove_macros_code();
    }

    fn worksheet(&self, index: usize) -> Option<&Worksheet> {
        self.book.get_sheet_collection().get(index)
    }

    fn next_sheet_id(&self) -> u32 {
        self.book
            .get_sheet_collection()
            .iter()
            .filter_map(|worksheet| worksheet.get_sheet_id().parse::<u32>().ok())
            .max()
            .unwrap_or(0)
            + 1
    }
}

impl LabeledGrid for TemplateDocument {
    fn sheet_count(&self) -> usize {
        self.book.get_sheet_collection().len()
    }

    fn sheet_title(&self, index: usize) -> Option<String> {
        self.worksheet(index)
            .map(|worksheet| worksheet.get_name().to_string())
    }

    fn last_row(&self, sheet: usize) -> u32 {
        self.worksheet(sheet)
            .map(|worksheet| worksheet.get_highest_row())
            .unwrap_or(0)
    }

    fn cell_text(&self, sheet: usize, row: u32, column: u16) -> Option<String> {
        let cell = self
            .worksheet(sheet)?
            .get_cell((u32::from(column), row))?;
        let text = if cell.is_formula() {
            format!("={}", cell.get_formula())
        } else {
            cell.get_value().to_string()
        };
        (!text.is_empty()).then_some(text)
    }

    fn holds_formula(&self, sheet: usize, row: u32, column: u16) -> bool {
        self.worksheet(sheet)
            .and_then(|worksheet| worksheet.get_cell((u32::from(column), row)))
            .is_some_and(|cell| cell.is_formula())
    }

    fn clone_sheet(&mut self, source: usize, title: &str) -> Result<usize> {
        if self.sheet_index(title).is_some() {
            return Err(ToolError::InvalidWorkbook(format!(
                "sheet '{title}' already exists"
            )));
        }
        let sheet_id = self.next_sheet_id();
        let mut copy = self
            .worksheet(source)
            .cloned()
            .ok_or_else(|| ToolError::InvalidWorkbook(format!("no sheet at index {source}")))?;
        copy.set_name(title);
        copy.set_sheet_id(sheet_id.to_string());
        self.book
            .add_sheet(copy)
            .map_err(|error| ToolError::InvalidWorkbook(error.to_string()))?;
        Ok(self.sheet_count() - 1)
    }

    fn write_cell(
        &mut self,
        sheet: usize,
        row: u32,
        column: u16,
        value: CellValue,
    ) -> Result<()> {
        if !(1..=MAX_ROW).contains(&row) || !(1..=MAX_COLUMN).contains(&column) {
            return Err(ToolError::InvalidWorkbook(format!(
                "cell R{row}C{column} is outside the worksheet"
            )));
        }
        let worksheet = self
            .book
            .get_sheet_collection_mut()
            .get_mut(sheet)
            .ok_or_else(|| ToolError::InvalidWorkbook(format!("no sheet at index {sheet}")))?;
        let cell = worksheet.get_cell_mut((u32::from(column), row));
        match value {
            CellValue::Text(text) => {
                cell.set_value_string(text);
            }
            CellValue::Number(number) => {
                cell.set_value_number(number);
            }
        }
        Ok(())
    }
}
