use std::collections::HashMap;
use std::fmt;

use serde::{Deserialize, Serialize};

/// A single cell as exported by the takeoff tool.
#[derive(Debug, Clone, PartialEq)]
pub enum RawCell {
    /// Free text cell.
    Text(String),
    /// Numeric cell (booleans are surfaced as 1/0).
    Number(f64),
    /// Blank, error, or otherwise valueless cell.
    Empty,
}

/// One row of the takeoff export keyed by its column header.
///
/// Columns that are absent from the export are simply missing from the map;
/// accessors treat them the same way as empty cells.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RawRecord {
    cells: HashMap<String, RawCell>,
}

impl RawRecord {
    /// Creates an empty record.
    pub fn new() -> Self {
        Self::default()
    }

    /// Inserts or replaces the cell stored under `column`.
    pub fn insert(&mut self, column: impl Into<String>, cell: RawCell) {
        self.cells.insert(column.into(), cell);
    }

    /// Builder-style variant of [`RawRecord::insert`].
    pub fn with(mut self, column: impl Into<String>, cell: RawCell) -> Self {
        self.insert(column, cell);
        self
    }

    /// Returns the cell stored under `column`, if the column exists.
    pub fn get(&self, column: &str) -> Option<&RawCell> {
        self.cells.get(column)
    }
}

/// An optional reading paired with its optional unit-of-measure tag.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Measure {
    pub value: Option<f64>,
    pub unit: Option<String>,
}

impl Measure {
    pub fn new(value: Option<f64>, unit: Option<String>) -> Self {
        Self { value, unit }
    }

    /// The unit tag trimmed and uppercased, ready for comparison.
    pub fn unit_tag(&self) -> Option<String> {
        self.unit.as_deref().map(|unit| unit.trim().to_uppercase())
    }
}

/// A takeoff row after cleaning: fixed shape, every reading optional.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct NormalizedRecord {
    /// `Classification Folder`, empty when missing.
    pub folder: String,
    /// `Classification`, empty when missing.
    pub classification: String,
    pub quantity1: Measure,
    pub quantity2: Measure,
    pub height: Measure,
    pub width: Measure,
    pub thickness: Measure,
    pub length: Measure,
    pub breakdown_tier: Option<String>,
    pub breakdown_item: Option<String>,
}

/// Identifies one drilled pier condition: a normalized tier plus the
/// classification text as exported.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct ConditionKey {
    pub tier: String,
    pub classification: String,
}

impl ConditionKey {
    pub fn new(tier: impl Into<String>, classification: impl Into<String>) -> Self {
        Self {
            tier: tier.into(),
            classification: classification.into(),
        }
    }
}

impl fmt::Display for ConditionKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} | {}", self.tier, self.classification)
    }
}

/// Engineering metrics aggregated for one condition.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ConditionMetrics {
    /// Normalized breakdown tier, e.g. `TIER 1`.
    pub tier: String,
    /// Condition name, e.g. `PIER - 1`.
    pub classification: String,
    /// Shaft diameter in inches.
    pub shaft_diameter_in: Option<f64>,
    /// Bell diameter in inches. Defaults to the shaft diameter.
    pub bell_diameter_in: Option<f64>,
    /// Pier depth in feet.
    pub depth_ft: Option<f64>,
    /// Number of piers.
    pub count: f64,
    /// `depth_ft * count` in linear feet, present only when the depth is known.
    pub total_length_ft: Option<f64>,
}

impl ConditionMetrics {
    /// The key this metrics value was folded under.
    pub fn key(&self) -> ConditionKey {
        ConditionKey::new(self.tier.clone(), self.classification.clone())
    }
}

impl fmt::Display for ConditionMetrics {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} | {}: shaft={} in, bell={} in, depth={} ft, count={}, total LF={}",
            self.tier,
            self.classification,
            display_optional(self.shaft_diameter_in),
            display_optional(self.bell_diameter_in),
            display_optional(self.depth_ft),
            self.count,
            display_optional(self.total_length_ft),
        )
    }
}

fn display_optional(value: Option<f64>) -> String {
    value.map_or_else(|| "-".to_string(), |value| value.to_string())
}
