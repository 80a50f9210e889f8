//! Stage two: clone the estimating template per tier and write the pier
//! metrics next to the matching row labels.

pub mod grid;
pub mod layout;
pub mod locate;
pub mod macros;
pub mod replicate;
pub mod writer;

pub use grid::{CellValue, LabeledGrid, TemplateDocument};
pub use layout::{LabelKeywords, MetricField, TemplateLayout};
pub use locate::find_label_row;
pub use macros::MacroPolicy;
pub use replicate::{replicate_template, sanitize_sheet_title, template_sheet_index};
pub use writer::{PopulationSummary, populate_template};
