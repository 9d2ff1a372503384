//! Readers and writers for the change spreadsheet and survey files.

pub mod excel_read;
pub mod excel_write;

use std::path::Path;

use crate::error::Result;
use crate::model::{Dataset, MetadataTable};

/// Sheet holding one column per variable and one row per record.
pub const DATA_SHEET: &str = "Data";
/// Sheet holding one row per variable.
pub const METADATA_SHEET: &str = "Metadata";

/// Reads and writes the dataset + metadata pair stored in a survey file.
pub trait SurveyFormat {
    fn read(&self, path: &Path) -> Result<(Dataset, MetadataTable)>;

    fn write(&self, path: &Path, dataset: &Dataset, metadata: &MetadataTable) -> Result<()>;
}

/// Survey files stored as `.xlsx` workbooks with [`DATA_SHEET`] and
/// [`METADATA_SHEET`] sheets.
#[derive(Debug, Clone, Copy, Default)]
pub struct WorkbookFormat;

impl SurveyFormat for WorkbookFormat {
    fn read(&self, path: &Path) -> Result<(Dataset, MetadataTable)> {
        excel_read::read_survey(path)
    }

    fn write(&self, path: &Path, dataset: &Dataset, metadata: &MetadataTable) -> Result<()> {
        excel_write::write_survey(path, dataset, metadata)
    }
}
