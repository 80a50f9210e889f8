use std::collections::HashMap;
use std::fs;
use std::path::Path;

use serde::Serialize;
use tracing::{debug, info, instrument};

use crate::aggregate::{aggregate_conditions, normalize_records};
use crate::diagnostics::{Advisory, Diagnostics};
use crate::error::{Result, ToolError};
use crate::io::{excel_read, excel_write, template_book};
use crate::model::{ConditionKey, ConditionMetrics};
use crate::template::{MacroPolicy, PopulationSummary, TemplateLayout, populate_template};

/// Pier metrics of one takeoff export plus the advisories raised reading it.
#[derive(Debug, Clone, Default)]
pub struct TakeoffSummary {
    pub metrics: HashMap<ConditionKey, ConditionMetrics>,
    pub advisories: Vec<Advisory>,
}

impl TakeoffSummary {
    /// Metrics ordered by tier then classification.
    pub fn sorted_metrics(&self) -> Vec<&ConditionMetrics> {
        sorted_metrics(&self.metrics)
    }
}

/// Outcome of a full populate run.
#[derive(Debug, Clone, Default, Serialize)]
pub struct RunReport {
    pub population: PopulationSummary,
    pub macros_kept: bool,
    pub advisories: Vec<Advisory>,
}

/// Orders metrics by key; the aggregation map itself is unordered.
pub fn sorted_metrics(metrics: &HashMap<ConditionKey, ConditionMetrics>) -> Vec<&ConditionMetrics> {
    let mut sorted: Vec<(&ConditionKey, &ConditionMetrics)> = metrics.iter().collect();
    sorted.sort_by(|lhs, rhs| lhs.0.cmp(rhs.0));
    sorted.into_iter().map(|(_, metrics)| metrics).collect()
}

/// Reads a takeoff export and folds its pier rows into per-condition metrics.
#[instrument(level = "info", skip_all, fields(input = %input.display()))]
pub fn summarize_takeoff(input: &Path) -> Result<TakeoffSummary> {
    let mut diagnostics = Diagnostics::new();
    let metrics = aggregate_takeoff(input, &mut diagnostics)?;
    Ok(TakeoffSummary {
        metrics,
        advisories: diagnostics.into_advisories(),
    })
}

/// Aggregates a takeoff export and writes the metrics into clones of the
/// estimating template, saving the result to `output`.
#[instrument(
    level = "info",
    skip_all,
    fields(input = %input.display(), template = %template.display(), output = %output.display())
)]
pub fn populate_estimate(
    input: &Path,
    template: &Path,
    output: &Path,
    layout: &TemplateLayout,
) -> Result<RunReport> {
    ensure_exists(template)?;

    let mut diagnostics = Diagnostics::new();
    let metrics = aggregate_takeoff(input, &mut diagnostics)?;

    let macros = MacroPolicy::resolve(template, output);
    let mut document = template_book::read_template(template, macros)?;

    let population = populate_template(&mut document, &metrics, layout, &mut diagnostics)?;
    template_book::write_template(output, &document)?;
    info!(
        sheets_created = population.sheets.len(),
        conditions_written = population.conditions_written,
        "completed estimate saved"
    );

    Ok(RunReport {
        population,
        macros_kept: document.has_macros(),
        advisories: diagnostics.into_advisories(),
    })
}

/// Persists metrics as pretty-printed JSON, ordered by key.
pub fn write_metrics_json(
    output: &Path,
    metrics: &HashMap<ConditionKey, ConditionMetrics>,
) -> Result<()> {
    let json_string = serde_json::to_string_pretty(&sorted_metrics(metrics))?;
    fs::write(output, json_string)?;
    Ok(())
}

/// Persists metrics as a workbook holding one filterable table.
pub fn write_metrics_workbook(
    output: &Path,
    metrics: &HashMap<ConditionKey, ConditionMetrics>,
) -> Result<()> {
    excel_write::write_metrics_workbook(output, metrics)?;
    info!(row_count = metrics.len(), output = %output.display(), "metrics workbook saved");
    Ok(())
}

fn aggregate_takeoff(
    input: &Path,
    diagnostics: &mut Diagnostics,
) -> Result<HashMap<ConditionKey, ConditionMetrics>> {
    ensure_exists(input)?;
    let export = excel_read::read_takeoff(input, diagnostics)?;
    let records = normalize_records(&export.records);
    debug!(record_count = records.len(), "takeoff rows normalized");
    let metrics = aggregate_conditions(&records, diagnostics);
    info!(condition_count = metrics.len(), "pier conditions aggregated");
    Ok(metrics)
}

fn ensure_exists(path: &Path) -> Result<()> {
    if path.is_file() {
        Ok(())
    } else {
        Err(ToolError::MissingInput(path.to_path_buf()))
    }
}
