//! Core library for the pier-takeoff command line application.
//!
//! The pipeline has two stages. [`aggregate`] cleans the rows of a
//! quantity-takeoff export and folds the drilled pier records into
//! per-condition metrics; [`template`] clones the estimating template once
//! per tier and writes those metrics next to the matching row labels.
//! Workbook IO lives under [`io`], the shared records in [`model`], and the
//! batch orchestration in [`pipeline`].

pub mod aggregate;
pub mod diagnostics;
pub mod error;
pub mod io;
pub mod model;
pub mod pipeline;
pub mod template;

pub use diagnostics::{Advisory, Diagnostics};
pub use error::{Result, ToolError};
