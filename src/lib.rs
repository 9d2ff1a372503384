//! Core library for the survey-harmonise command line application.
//!
//! A change table loaded from a spreadsheet declares, per survey file, which
//! variables are renamed, relabelled, or recoded. The modules keep those
//! concerns narrow: the change table and its derived transforms live under
//! [`changes`], cell and table representations in [`model`], the data and
//! metadata rewrites in [`transform`], post-transform checks in [`verify`],
//! file adapters under [`io`], and the per-file orchestration in [`pipeline`].

pub mod changes;
pub mod error;
pub mod io;
pub mod logging;
pub mod model;
pub mod pipeline;
pub mod summary;
pub mod transform;
pub mod verify;

pub use error::{Result, ToolError};
pub use pipeline::{FileOutcome, HarmoniseConfig, Harmoniser, RunSummary, harmonise};
pub use summary::summarise_changes;
