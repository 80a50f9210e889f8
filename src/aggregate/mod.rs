//! Stage one: clean takeoff rows and fold pier records into per-condition
//! metrics.

pub mod conditions;
pub mod normalize;

pub use conditions::{UNASSIGNED_TIER, aggregate_conditions, is_pier_record, normalize_tier};
pub use normalize::{KEY_COLUMNS, normalize_record, normalize_records};
