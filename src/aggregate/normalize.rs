use crate::model::{Measure, NormalizedRecord, RawCell, RawRecord};

pub const FOLDER_COLUMN: &str = "Classification Folder";
pub const CLASSIFICATION_COLUMN: &str = "Classification";
pub const QUANTITY1_COLUMN: &str = "Quantity 1";
pub const QUANTITY1_UOM_COLUMN: &str = "Quantity1 UOM";
pub const QUANTITY2_COLUMN: &str = "Quantity 2";
pub const QUANTITY2_UOM_COLUMN: &str = "Quantity2 UOM";
pub const HEIGHT_COLUMN: &str = "Height";
pub const HEIGHT_UOM_COLUMN: &str = "Height UOM";
pub const WIDTH_COLUMN: &str = "Width";
pub const WIDTH_UOM_COLUMN: &str = "Width UOM";
pub const THICKNESS_COLUMN: &str = "Thickness";
pub const THICKNESS_UOM_COLUMN: &str = "Thickness UOM";
pub const LENGTH_COLUMN: &str = "Length";
pub const LENGTH_UOM_COLUMN: &str = "Length UOM";
pub const BREAKDOWN_TIER_COLUMN: &str = "Breakdown Tier";
pub const BREAKDOWN_ITEM_COLUMN: &str = "Breakdown Item";

/// Columns whose absence is reported when an export is loaded.
pub const KEY_COLUMNS: [&str; 2] = [FOLDER_COLUMN, CLASSIFICATION_COLUMN];

/// Turns one export row into a [`NormalizedRecord`]. Malformed cells become
/// absent readings rather than errors.
pub fn normalize_record(row: &RawRecord) -> NormalizedRecord {
    NormalizedRecord {
        folder: text(row, FOLDER_COLUMN).unwrap_or_default(),
        classification: text(row, CLASSIFICATION_COLUMN).unwrap_or_default(),
        quantity1: measure(row, QUANTITY1_COLUMN, QUANTITY1_UOM_COLUMN),
        quantity2: measure(row, QUANTITY2_COLUMN, QUANTITY2_UOM_COLUMN),
        height: measure(row, HEIGHT_COLUMN, HEIGHT_UOM_COLUMN),
        width: measure(row, WIDTH_COLUMN, WIDTH_UOM_COLUMN),
        thickness: measure(row, THICKNESS_COLUMN, THICKNESS_UOM_COLUMN),
        length: measure(row, LENGTH_COLUMN, LENGTH_UOM_COLUMN),
        breakdown_tier: text(row, BREAKDOWN_TIER_COLUMN),
        breakdown_item: text(row, BREAKDOWN_ITEM_COLUMN),
    }
}

/// Normalizes every row, keeping input order.
pub fn normalize_records(rows: &[RawRecord]) -> Vec<NormalizedRecord> {
    rows.iter().map(normalize_record).collect()
}

fn measure(row: &RawRecord, value_column: &str, unit_column: &str) -> Measure {
    Measure::new(number(row, value_column), text(row, unit_column))
}

fn number(row: &RawRecord, column: &str) -> Option<f64> {
    let value = match row.get(column)? {
        RawCell::Number(value) => *value,
        RawCell::Text(text) => text.trim().parse::<f64>().ok()?,
        RawCell::Empty => return None,
    };
    value.is_finite().then_some(value)
}

fn text(row: &RawRecord, column: &str) -> Option<String> {
    let text = match row.get(column)? {
        RawCell::Text(text) => text.trim().to_string(),
        RawCell::Number(value) if value.is_finite() => value.to_string(),
        RawCell::Number(_) | RawCell::Empty => return None,
    };
    (!text.is_empty()).then_some(text)
}
