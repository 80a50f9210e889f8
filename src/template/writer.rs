use std::collections::{BTreeMap, BTreeSet, HashMap};

use serde::Serialize;
use tracing::{debug, info, instrument};

use crate::diagnostics::{Advisory, Diagnostics};
use crate::error::{Result, ToolError};
use crate::model::{ConditionKey, ConditionMetrics};
use crate::template::grid::{CellValue, LabeledGrid};
use crate::template::layout::{MetricField, TemplateLayout};
use crate::template::replicate::{replicate_template, template_sheet_index};

/// What a population run changed in the document.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct PopulationSummary {
    /// Tier → title of the sheet created for it.
    pub sheets: BTreeMap<String, String>,
    /// Conditions that received a column.
    pub conditions_written: usize,
    /// Metric cells written, headers excluded.
    pub cells_written: usize,
}

fn field_value(metrics: &ConditionMetrics, field: MetricField) -> Option<f64> {
    match field {
        MetricField::ShaftDiameter => metrics.shaft_diameter_in,
        MetricField::BellDiameter => metrics.bell_diameter_in,
        MetricField::Depth => metrics.depth_ft,
        MetricField::Count => Some(metrics.count),
    }
}

/// Writes the aggregated pier metrics into one cloned template sheet per
/// tier. A document without tiers to write is left unchanged.
#[instrument(level = "info", skip_all, fields(condition_count = metrics.len()))]
pub fn populate_template(
    document: &mut dyn LabeledGrid,
    metrics: &HashMap<ConditionKey, ConditionMetrics>,
    layout: &TemplateLayout,
    diagnostics: &mut Diagnostics,
) -> Result<PopulationSummary> {
    let tiers: BTreeSet<String> = metrics.keys().map(|key| key.tier.clone()).collect();
    if tiers.is_empty() {
        info!("no tiers found in pier metrics; template left unchanged");
        return Ok(PopulationSummary::default());
    }
    info!(?tiers, "detected tiers");

    let template = template_sheet_index(document, &layout.template_sheet)?;
    let tier_sheets = replicate_template(document, template, &tiers)?;

    let mut buckets: BTreeMap<&str, Vec<&ConditionMetrics>> =
        tiers.iter().map(|tier| (tier.as_str(), Vec::new())).collect();
    for (key, condition) in metrics {
        if !layout.accepts(&key.classification) {
            continue;
        }
        if let Some(bucket) = buckets.get_mut(key.tier.as_str()) {
            bucket.push(condition);
        }
    }

    let mut summary = PopulationSummary::default();

    for (tier, mut conditions) in buckets {
        let sheet = tier_sheets.get(tier).copied().ok_or_else(|| {
            ToolError::InvalidWorkbook(format!("no sheet was created for tier '{tier}'"))
        })?;
        let title = document.sheet_title(sheet).unwrap_or_default();
        summary.sheets.insert(tier.to_string(), title.clone());

        if conditions.is_empty() {
            info!(%tier, sheet = %title, "no drilled piers for this tier");
            continue;
        }

        conditions.sort_by(|lhs, rhs| lhs.classification.cmp(&rhs.classification));

        for (offset, condition) in conditions.into_iter().enumerate() {
            let column = condition_column(layout.start_column, offset)?;
            document.write_cell(
                sheet,
                layout.header_row,
                column,
                CellValue::from(condition.classification.as_str()),
            )?;
            debug!(classification = %condition.classification, column, "condition column assigned");

            summary.cells_written +=
                write_condition(document, sheet, &title, column, condition, layout, diagnostics)?;
            summary.conditions_written += 1;
        }
    }

    Ok(summary)
}

fn write_condition(
    document: &mut dyn LabeledGrid,
    sheet: usize,
    title: &str,
    column: u16,
    condition: &ConditionMetrics,
    layout: &TemplateLayout,
    diagnostics: &mut Diagnostics,
) -> Result<usize> {
    let mut written = 0;

    for field in MetricField::WRITABLE {
        let Some(value) = field_value(condition, field) else {
            continue;
        };

        let keywords = layout.labels.for_field(field);
        let Some(row) = document.find_row_by_label(sheet, keywords) else {
            diagnostics.report(Advisory::LabelRowNotFound {
                sheet: title.to_string(),
                field: field.name().to_string(),
                keywords: keywords.to_vec(),
            });
            continue;
        };

        if document.holds_formula(sheet, row, column) {
            diagnostics.report(Advisory::FormulaCellSkipped {
                sheet: title.to_string(),
                field: field.name().to_string(),
                row,
                column,
            });
            continue;
        }

        document.write_cell(sheet, row, column, CellValue::Number(value))?;
        debug!(field = field.name(), value, row, column, "metric written");
        written += 1;
    }

    Ok(written)
}

fn condition_column(start: u16, offset: usize) -> Result<u16> {
    u16::try_from(offset)
        .ok()
        .and_then(|offset| start.checked_add(offset))
        .ok_or_else(|| {
            ToolError::InvalidWorkbook(format!("too many conditions for one sheet ({offset})"))
        })
}
