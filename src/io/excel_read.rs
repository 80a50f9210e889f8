use std::io::{Read, Seek};
use std::path::Path;

use calamine::{DataType, Range, Reader, Xlsx, open_workbook};
use tracing::{info, instrument};

use crate::aggregate::KEY_COLUMNS;
use crate::diagnostics::{Advisory, Diagnostics};
use crate::error::{Result, ToolError};
use crate::model::{RawCell, RawRecord};

/// Rows of a takeoff export together with its header row.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct TakeoffExport {
    pub columns: Vec<String>,
    pub records: Vec<RawRecord>,
}

impl TakeoffExport {
    pub fn has_column(&self, column: &str) -> bool {
        self.columns.iter().any(|name| name == column)
    }
}

/// Reads the first worksheet of a takeoff export. The first row holds the
/// column names; blank rows are skipped.
#[instrument(level = "info", skip_all, fields(path = %path.display()))]
pub fn read_takeoff(path: &Path, diagnostics: &mut Diagnostics) -> Result<TakeoffExport> {
    let mut workbook: Xlsx<_> = open_workbook(path)?;
    let first_sheet = workbook
        .sheet_names()
        .first()
        .cloned()
        .ok_or_else(|| ToolError::InvalidWorkbook("takeoff export has no worksheets".into()))?;
    let range = read_required_sheet(&mut workbook, &first_sheet)?;

    let columns: Vec<String> = match range.rows().next() {
        Some(header) => header
            .iter()
            .map(|cell| cell_to_string(Some(cell)).trim().to_string())
            .collect(),
        None => Vec::new(),
    };

    let mut records = Vec::new();
    for row in range.rows().skip(1) {
        let mut record = RawRecord::new();
        let mut populated = false;
        for (column, cell) in columns.iter().zip(row.iter()) {
            if column.is_empty() {
                continue;
            }
            let cell = to_raw_cell(cell);
            populated |= cell != RawCell::Empty;
            record.insert(column.clone(), cell);
        }
        if populated {
            records.push(record);
        }
    }

    let export = TakeoffExport { columns, records };
    for column in KEY_COLUMNS {
        if !export.has_column(column) {
            diagnostics.report(Advisory::MissingColumn {
                column: column.to_string(),
            });
        }
    }

    info!(
        sheet = %first_sheet,
        column_count = export.columns.len(),
        row_count = export.records.len(),
        "takeoff export loaded"
    );
    Ok(export)
}

fn read_required_sheet<R: Read + Seek>(
    workbook: &mut Xlsx<R>,
    name: &str,
) -> Result<Range<DataType>> {
    let range_result = workbook
        .worksheet_range(name)
        .ok_or_else(|| ToolError::InvalidWorkbook(format!("missing sheet '{name}'")))?;
    let range = range_result.map_err(ToolError::from)?;
    Ok(range)
}

fn to_raw_cell(cell: &DataType) -> RawCell {
    match cell {
        DataType::String(value) => RawCell::Text(value.clone()),
        DataType::Float(value) => RawCell::Number(*value),
        DataType::Int(value) => RawCell::Number(*value as f64),
        DataType::Bool(value) => RawCell::Number(if *value { 1.0 } else { 0.0 }),
        DataType::DateTime(serial) => RawCell::Number(*serial),
        DataType::Empty | DataType::Error(_) => RawCell::Empty,
        other => RawCell::Text(other.to_string()),
    }
}

fn cell_to_string(cell: Option<&DataType>) -> String {
    match cell {
        Some(DataType::String(value)) => value.clone(),
        Some(DataType::Float(value)) => value.to_string(),
        Some(DataType::Int(value)) => value.to_string(),
        Some(DataType::Bool(value)) => value.to_string(),
        Some(DataType::Empty) | None => String::new(),
        Some(other) => other.to_string(),
    }
}
