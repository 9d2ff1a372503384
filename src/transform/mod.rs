//! Harmonisation of a file's dataset and metadata from its declared changes.

pub mod data;
pub mod metadata;

pub use data::harmonise_data;
pub use metadata::harmonise_metadata;
