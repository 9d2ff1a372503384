use std::fs;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use tracing::{debug, error, info, instrument};

use crate::changes::{ChangeTable, DataTransforms, derive_transforms};
use crate::error::{Result, ToolError};
use crate::io::{SurveyFormat, WorkbookFormat};
use crate::model::{Dataset, MetadataTable};
use crate::transform::{harmonise_data, harmonise_metadata};
use crate::verify::{
    UnchangedCheck, check_metadata_consistency, check_recoding, check_unchanged_columns,
};

/// Locations and switches for a harmonisation run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HarmoniseConfig {
    /// Directory the survey files are read from.
    pub input_dir: PathBuf,
    /// Directory harmonised files are written to, under the same file names.
    pub output_dir: PathBuf,
    /// Also run the recode conservation check before writing.
    #[serde(default)]
    pub verify_recodes: bool,
}

impl HarmoniseConfig {
    pub fn new(input_dir: impl Into<PathBuf>, output_dir: impl Into<PathBuf>) -> Self {
        Self {
            input_dir: input_dir.into(),
            output_dir: output_dir.into(),
            verify_recodes: false,
        }
    }

    pub fn with_recode_verification(mut self, enabled: bool) -> Self {
        self.verify_recodes = enabled;
        self
    }
}

/// What happened to one harmonised file.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FileOutcome {
    pub file: String,
    pub output: PathBuf,
    pub records: usize,
    pub renamed: Vec<(String, String)>,
    pub recoded: Vec<String>,
    pub unchanged_columns_checked: usize,
}

/// Outcomes of every file written during a run, in processing order.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct RunSummary {
    pub files: Vec<FileOutcome>,
}

/// Applies a change table to every file it references.
#[derive(Debug, Clone)]
pub struct Harmoniser<F> {
    config: HarmoniseConfig,
    format: F,
}

impl<F: SurveyFormat> Harmoniser<F> {
    pub fn new(config: HarmoniseConfig, format: F) -> Self {
        Self { config, format }
    }

    pub fn config(&self) -> &HarmoniseConfig {
        &self.config
    }

    /// Harmonises every file referenced by a row with at least one declared
    /// change. Stops at the first failing file; files already written stay.
    #[instrument(
        level = "info",
        skip_all,
        fields(input = %self.config.input_dir.display(), output = %self.config.output_dir.display())
    )]
    pub fn run(&self, changes: &ChangeTable) -> Result<RunSummary> {
        let changed = changes.changed();
        fs::create_dir_all(&self.config.output_dir)?;

        let mut summary = RunSummary::default();
        for file in changed.files() {
            summary.files.push(self.harmonise_file(&changed, file)?);
        }
        info!(files = summary.files.len(), "harmonisation complete");
        Ok(summary)
    }

    /// Reads, transforms, verifies, and writes a single file.
    #[instrument(level = "info", skip(self, changes))]
    pub fn harmonise_file(&self, changes: &ChangeTable, file: &str) -> Result<FileOutcome> {
        let input = self.config.input_dir.join(file);
        if !input.exists() {
            return Err(ToolError::MissingInput(input));
        }

        let (dataset, metadata) = self.format.read(&input)?;
        debug!(
            columns = dataset.columns.len(),
            records = dataset.row_count(),
            "read survey file"
        );

        let transforms = derive_transforms(changes, file)?;
        let harmonised = harmonise_data(&dataset, &transforms)?;
        let harmonised_metadata = harmonise_metadata(&metadata, changes, file)?;

        self.verify_and_write(
            changes,
            file,
            &transforms,
            &dataset,
            &harmonised,
            &harmonised_metadata,
        )
    }

    /// Runs the pre-write checks and writes the file only when all pass.
    fn verify_and_write(
        &self,
        changes: &ChangeTable,
        file: &str,
        transforms: &DataTransforms,
        dataset: &Dataset,
        harmonised: &Dataset,
        harmonised_metadata: &MetadataTable,
    ) -> Result<FileOutcome> {
        let changed = changes.changed_variables(file);
        let checked = match check_unchanged_columns(dataset, harmonised, &changed) {
            UnchangedCheck::Identical { checked } => checked,
            UnchangedCheck::Mismatch { column } => {
                error!(column = %column, "mismatch in unchanged column");
                return Err(ToolError::InvariantViolation {
                    file: file.to_string(),
                    column,
                });
            }
        };
        check_metadata_consistency(harmonised, harmonised_metadata, file)?;
        if self.config.verify_recodes {
            check_recoding(dataset, harmonised, transforms)?;
        }

        let output = self.config.output_dir.join(file);
        ensure_parent(&output)?;
        self.format.write(&output, harmonised, harmonised_metadata)?;

        let outcome = FileOutcome {
            file: file.to_string(),
            output,
            records: harmonised.row_count(),
            renamed: transforms
                .renames
                .iter()
                .map(|(old, new)| (old.to_string(), new.to_string()))
                .collect(),
            recoded: transforms.recoded_variables().map(str::to_string).collect(),
            unchanged_columns_checked: checked,
        };
        info!(
            renamed = outcome.renamed.len(),
            recoded = outcome.recoded.len(),
            unchanged = checked,
            "wrote harmonised file"
        );
        Ok(outcome)
    }
}

/// Harmonises workbook-backed survey files with the given configuration.
pub fn harmonise(changes: &ChangeTable, config: HarmoniseConfig) -> Result<RunSummary> {
    Harmoniser::new(config, WorkbookFormat).run(changes)
}

fn ensure_parent(path: &Path) -> Result<()> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)?;
    }
    Ok(())
}
