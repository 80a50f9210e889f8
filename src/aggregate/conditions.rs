use std::collections::HashMap;

use tracing::{debug, instrument};

use crate::diagnostics::{Advisory, Diagnostics};
use crate::model::{ConditionKey, ConditionMetrics, Measure, NormalizedRecord};

/// Tier assigned to records without a usable breakdown tier.
pub const UNASSIGNED_TIER: &str = "UNASSIGNED";

const PIER_MARKER: &str = "PIER";
const TIER_PREFIX: &str = "TIER";

const INCH_UNITS: [&str; 3] = ["IN", "INCH", "INCHES"];
const FOOT_UNITS: [&str; 3] = ["FT", "FEET", "FOOT"];
const COUNT_UNITS: [&str; 4] = ["EA", "EACH", "COUNT", "#"];

/// Returns `true` when the classification or its folder mentions a pier.
pub fn is_pier_record(record: &NormalizedRecord) -> bool {
    record.classification.to_uppercase().contains(PIER_MARKER)
        || record.folder.to_uppercase().contains(PIER_MARKER)
}

/// Canonical form of a breakdown tier, e.g. `" tier  2"` becomes `"TIER 2"`.
pub fn normalize_tier(tier: Option<&str>) -> String {
    let upper = tier.unwrap_or_default().to_uppercase();
    let upper = upper.trim();

    if upper.is_empty() {
        return UNASSIGNED_TIER.to_string();
    }

    match upper.strip_prefix(TIER_PREFIX) {
        Some(rest) => {
            let rest = rest.split_whitespace().collect::<Vec<_>>().join(" ");
            if rest.is_empty() {
                TIER_PREFIX.to_string()
            } else {
                format!("{TIER_PREFIX} {rest}")
            }
        }
        None => upper.to_string(),
    }
}

/// Shaft diameter in inches read from the width measure.
fn shaft_diameter_in(width: &Measure) -> Option<f64> {
    let value = width.value?;
    let unit = width.unit_tag()?;
    if INCH_UNITS.contains(&unit.as_str()) {
        Some(value)
    } else if FOOT_UNITS.contains(&unit.as_str()) {
        Some(value * 12.0)
    } else {
        None
    }
}

/// Depth in feet read from the height measure.
fn depth_ft(height: &Measure) -> Option<f64> {
    let value = height.value?;
    let unit = height.unit_tag()?;
    if FOOT_UNITS.contains(&unit.as_str()) {
        Some(value)
    } else if INCH_UNITS.contains(&unit.as_str()) {
        Some(value / 12.0)
    } else {
        None
    }
}

/// Pier count contributed by the first quantity. Negative quantities are
/// ignored so the count never decreases.
fn pier_count(quantity: &Measure) -> Option<f64> {
    let value = quantity.value.filter(|value| *value >= 0.0)?;
    match quantity.unit_tag() {
        None => Some(value),
        Some(unit) if unit.is_empty() || COUNT_UNITS.contains(&unit.as_str()) => Some(value),
        Some(_) => None,
    }
}

#[derive(Debug, Default)]
struct ConditionAccumulator {
    shaft_diameter_in: Option<f64>,
    bell_diameter_in: Option<f64>,
    depth_ft: Option<f64>,
    count: f64,
}

impl ConditionAccumulator {
    fn finish(self, key: ConditionKey) -> ConditionMetrics {
        let total_length_ft = self.depth_ft.map(|depth| depth * self.count);
        ConditionMetrics {
            tier: key.tier,
            classification: key.classification,
            shaft_diameter_in: self.shaft_diameter_in,
            bell_diameter_in: self.bell_diameter_in,
            depth_ft: self.depth_ft,
            count: self.count,
            total_length_ft,
        }
    }
}

/// Folds the pier records into one [`ConditionMetrics`] per
/// `(tier, classification)`. The map order carries no meaning.
#[instrument(level = "debug", skip_all, fields(record_count = records.len()))]
pub fn aggregate_conditions(
    records: &[NormalizedRecord],
    diagnostics: &mut Diagnostics,
) -> HashMap<ConditionKey, ConditionMetrics> {
    let mut accumulators: HashMap<ConditionKey, ConditionAccumulator> = HashMap::new();

    for record in records.iter().filter(|record| is_pier_record(record)) {
        let key = ConditionKey::new(
            normalize_tier(record.breakdown_tier.as_deref()),
            record.classification.trim(),
        );
        let acc = accumulators.entry(key.clone()).or_default();

        if let Some(shaft) = shaft_diameter_in(&record.width) {
            note_overwrite(diagnostics, &key, "shaft_diameter_in", acc.shaft_diameter_in, shaft);
            acc.shaft_diameter_in = Some(shaft);
            if acc.bell_diameter_in.is_none() {
                acc.bell_diameter_in = Some(shaft);
            }
        }

        if let Some(depth) = depth_ft(&record.height) {
            note_overwrite(diagnostics, &key, "depth_ft", acc.depth_ft, depth);
            acc.depth_ft = Some(depth);
        }

        if let Some(count) = pier_count(&record.quantity1) {
            acc.count += count;
        }
    }

    debug!(condition_count = accumulators.len(), "pier conditions folded");

    accumulators
        .into_iter()
        .map(|(key, acc)| {
            let metrics = acc.finish(key.clone());
            (key, metrics)
        })
        .collect()
}

fn note_overwrite(
    diagnostics: &mut Diagnostics,
    key: &ConditionKey,
    field: &str,
    previous: Option<f64>,
    replacement: f64,
) {
    if let Some(previous) = previous.filter(|previous| *previous != replacement) {
        diagnostics.report(Advisory::ConflictingValue {
            tier: key.tier.clone(),
            classification: key.classification.clone(),
            field: field.to_string(),
            previous,
            replacement,
        });
    }
}
