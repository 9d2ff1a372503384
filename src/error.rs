use std::path::PathBuf;

use thiserror::Error;

/// Convenient alias for fallible results returned throughout the crate.
pub type Result<T> = std::result::Result<T, ToolError>;

/// Error type covering the different failure cases that can occur while the
/// change table is loaded, survey files are transformed, or outputs are written.
#[derive(Debug, Error)]
pub enum ToolError {
    /// Wrapper for IO failures such as reading or writing files.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Raised when the run report cannot be serialised.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// Errors bubbled up from the Excel writer implementation.
    #[error("Excel write error: {0}")]
    ExcelWrite(#[from] rust_xlsxwriter::XlsxError),

    /// Errors bubbled up from the Excel reader implementation.
    #[error("Excel read error: {0}")]
    ExcelRead(#[from] calamine::XlsxError),

    /// Raised when a sheet does not follow the expected conventions.
    #[error("invalid workbook structure: {0}")]
    InvalidWorkbook(String),

    /// Raised when a recode or field-value literal is malformed.
    #[error("parse error in {file} (row {row}): {detail}")]
    Parse {
        file: String,
        row: usize,
        detail: String,
    },

    /// Raised when a column outside the declared change set differs after
    /// harmonisation.
    #[error("unchanged column '{column}' in {file} was altered by harmonisation")]
    InvariantViolation { file: String, column: String },

    /// Raised when a declared variable is absent from the dataset or metadata.
    #[error("variable '{variable}' not found in {file}")]
    MissingVariable { file: String, variable: String },

    /// Raised when the same variable is declared more than once for a file.
    #[error("variable '{variable}' has more than one change row for {file}")]
    DuplicateChange { file: String, variable: String },

    /// Raised when a rename would produce two columns with the same name.
    #[error("rename target '{target}' collides with another variable in {file}")]
    RenameCollision { file: String, target: String },

    /// Raised when the recode conservation check fails.
    #[error(
        "recode of '{column}' in {file} is not conserved for value {value}: expected {expected} rows, found {actual}"
    )]
    RecodeMismatch {
        file: String,
        column: String,
        value: String,
        expected: usize,
        actual: usize,
    },

    /// Raised when harmonised data and metadata disagree on variable names.
    #[error("metadata does not match data in {file}: {detail}")]
    MetadataMismatch { file: String, detail: String },

    /// Raised when the user provides a path that does not exist.
    #[error("input file not found: {0}")]
    MissingInput(PathBuf),

    /// Raised when the tracing subscriber fails to initialise.
    #[error("failed to initialise logging: {0}")]
    Logging(String),
}
