use std::fs;
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::Result;

/// Metric fields the population engine writes into a category sheet.
///
/// Total length is deliberately absent: its row holds a formula in the
/// template.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MetricField {
    ShaftDiameter,
    BellDiameter,
    Depth,
    Count,
}

impl MetricField {
    pub const WRITABLE: [MetricField; 4] = [
        MetricField::ShaftDiameter,
        MetricField::BellDiameter,
        MetricField::Depth,
        MetricField::Count,
    ];

    pub fn name(self) -> &'static str {
        match self {
            MetricField::ShaftDiameter => "shaft_diameter_in",
            MetricField::BellDiameter => "bell_diameter_in",
            MetricField::Depth => "depth_ft",
            MetricField::Count => "count",
        }
    }
}

/// Keywords identifying the label row of each writable field.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LabelKeywords {
    pub shaft_diameter: Vec<String>,
    pub bell_diameter: Vec<String>,
    pub depth: Vec<String>,
    pub count: Vec<String>,
}

impl LabelKeywords {
    pub fn for_field(&self, field: MetricField) -> &[String] {
        match field {
            MetricField::ShaftDiameter => &self.shaft_diameter,
            MetricField::BellDiameter => &self.bell_diameter,
            MetricField::Depth => &self.depth,
            MetricField::Count => &self.count,
        }
    }
}

impl Default for LabelKeywords {
    fn default() -> Self {
        Self {
            shaft_diameter: strings(&["SHAFT DIA", "SHAFT", "SHAFT DIAMETER"]),
            bell_diameter: strings(&["BELL DIA", "BELL DIAMETER", "BELL"]),
            depth: strings(&["PIER DEPTH", "DEPTH"]),
            count: strings(&["PIER QTY", "QTY", "QTY."]),
        }
    }
}

/// Where conditions land on a category sheet. Every field may be omitted
/// from a layout file; omitted fields keep the defaults of the stock
/// estimating template.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TemplateLayout {
    /// Title of the sheet cloned per tier; the first sheet is used when absent.
    pub template_sheet: String,
    /// 1-based row receiving the condition names.
    pub header_row: u32,
    /// 1-based column of the first condition.
    pub start_column: u16,
    /// Only classifications starting with this prefix get a column.
    pub classification_prefix: String,
    pub labels: LabelKeywords,
}

impl Default for TemplateLayout {
    fn default() -> Self {
        Self {
            template_sheet: "BID".to_string(),
            header_row: 5,
            start_column: 3,
            classification_prefix: "PIER".to_string(),
            labels: LabelKeywords::default(),
        }
    }
}

impl TemplateLayout {
    /// Reads a JSON layout file.
    pub fn from_path(path: &Path) -> Result<Self> {
        let data = fs::read_to_string(path)?;
        Ok(serde_json::from_str(&data)?)
    }

    /// Case-insensitive prefix test used to select the conditions to write.
    pub fn accepts(&self, classification: &str) -> bool {
        classification
            .to_uppercase()
            .starts_with(&self.classification_prefix.to_uppercase())
    }
}

fn strings(values: &[&str]) -> Vec<String> {
    values.iter().map(|value| value.to_string()).collect()
}
