use std::collections::HashMap;
use std::path::Path;

use rust_xlsxwriter::{Table, Workbook};

use crate::error::Result;
use crate::model::{ConditionKey, ConditionMetrics};
use crate::pipeline::sorted_metrics;

/// Name of the worksheet holding the metrics table.
pub const METRICS_SHEET: &str = "Pier Metrics";

const METRICS_COLUMNS: [&str; 7] = [
    "Tier",
    "Classification",
    "Shaft Dia (in)",
    "Bell Dia (in)",
    "Depth (ft)",
    "Count",
    "Total Length (ft)",
];

/// Writes the metrics as one filterable table, ordered by tier then
/// classification. Unknown values stay blank.
pub fn write_metrics_workbook(
    path: &Path,
    metrics: &HashMap<ConditionKey, ConditionMetrics>,
) -> Result<()> {
    let mut workbook_writer = Workbook::new();
    let worksheet = workbook_writer.add_worksheet();
    worksheet.set_name(METRICS_SHEET)?;

    for (col_idx, header) in METRICS_COLUMNS.iter().enumerate() {
        worksheet.write_string(0, col_idx as u16, *header)?;
    }

    let rows = sorted_metrics(metrics);
    for (row_idx, condition) in rows.iter().enumerate() {
        let row = (row_idx + 1) as u32;
        worksheet.write_string(row, 0, &condition.tier)?;
        worksheet.write_string(row, 1, &condition.classification)?;

        let values = [
            condition.shaft_diameter_in,
            condition.bell_diameter_in,
            condition.depth_ft,
            Some(condition.count),
            condition.total_length_ft,
        ];
        for (offset, value) in values.into_iter().enumerate() {
            if let Some(value) = value {
                worksheet.write_number(row, (offset + 2) as u16, value)?;
            }
        }
    }

    if !rows.is_empty() {
        let mut excel_table = Table::new();
        excel_table.set_autofilter(true);
        let col_end = (METRICS_COLUMNS.len() as u16).saturating_sub(1);
        worksheet.add_table(0, 0, rows.len() as u32, col_end, &excel_table)?;
    }

    workbook_writer.save(path)?;
    Ok(())
}
