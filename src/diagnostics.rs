//! Advisory output collected while a run keeps going.
//!
//! Structural warnings and data-quality notes never abort the pipeline. They
//! are recorded here, forwarded to `tracing`, and handed back to the caller so
//! the person reviewing the estimate can see what was skipped.

use std::fmt;

use serde::Serialize;
use tracing::warn;

/// A single non-fatal finding.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Advisory {
    /// An expected column is absent from the takeoff export.
    MissingColumn { column: String },
    /// A later record replaced an already-known value for the same condition.
    ConflictingValue {
        tier: String,
        classification: String,
        field: String,
        previous: f64,
        replacement: f64,
    },
    /// No row label in the sheet matched the keywords of a field.
    LabelRowNotFound {
        sheet: String,
        field: String,
        keywords: Vec<String>,
    },
    /// The resolved target cell holds a formula and was left untouched.
    FormulaCellSkipped {
        sheet: String,
        field: String,
        row: u32,
        column: u16,
    },
}

impl fmt::Display for Advisory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Advisory::MissingColumn { column } => write!(f, "column {column:?} not found"),
            Advisory::ConflictingValue {
                tier,
                classification,
                field,
                previous,
                replacement,
            } => write!(
                f,
                "{tier} | {classification}: {field} changed from {previous} to {replacement}"
            ),
            Advisory::LabelRowNotFound {
                sheet,
                field,
                keywords,
            } => write!(
                f,
                "sheet '{sheet}': no row found for {field} (keywords={keywords:?})"
            ),
            Advisory::FormulaCellSkipped {
                sheet,
                field,
                row,
                column,
            } => write!(
                f,
                "sheet '{sheet}': {field} target R{row}C{column} holds a formula, left unchanged"
            ),
        }
    }
}

/// Collects advisories emitted by the pipeline components.
#[derive(Debug, Default, Clone)]
pub struct Diagnostics {
    advisories: Vec<Advisory>,
}

impl Diagnostics {
    pub fn new() -> Self {
        Self::default()
    }

    /// Records an advisory and logs it at `warn` level.
    pub fn report(&mut self, advisory: Advisory) {
        warn!(%advisory, "advisory");
        self.advisories.push(advisory);
    }

    pub fn advisories(&self) -> &[Advisory] {
        &self.advisories
    }

    pub fn is_empty(&self) -> bool {
        self.advisories.is_empty()
    }

    pub fn into_advisories(self) -> Vec<Advisory> {
        self.advisories
    }
}
