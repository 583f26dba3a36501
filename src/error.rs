//! Error type shared by every table operation.

use thiserror::Error;

/// Errors raised by table construction, I/O and the wrangling engines.
///
/// Failures are deterministic: they describe a programming or data error and
/// never leave the input table modified.
#[derive(Debug, Error)]
pub enum TableError {
    #[error("column '{0}' not found")]
    UnknownColumn(String),

    #[error("type mismatch in column '{column}': {message}")]
    TypeMismatch { column: String, message: String },

    #[error("reframe outputs disagree in group {group}: '{output}' has {found} values, expected {expected}")]
    LengthMismatch {
        group: String,
        output: String,
        expected: usize,
        found: usize,
    },

    #[error("more than one row maps to cell '{cell}' of group {group}")]
    DuplicateKey { cell: String, group: String },

    #[error("duplicate column name '{0}'")]
    DuplicateColumn(String),

    #[error("column '{column}' has {found} values, expected {expected}")]
    ColumnLength {
        column: String,
        expected: usize,
        found: usize,
    },

    #[error("row {index} out of range [0, {len})")]
    RowOutOfRange { index: usize, len: usize },

    #[error("invalid argument: {0}")]
    InvalidArgument(String),

    #[error("expression error: {0}")]
    Parse(String),

    #[error(transparent)]
    Csv(#[from] csv::Error),

    #[error(transparent)]
    Io(#[from] std::io::Error),

    #[error(transparent)]
    Json(#[from] serde_json::Error),

    #[error(transparent)]
    Regex(#[from] regex::Error),
}

impl TableError {
    pub(crate) fn type_mismatch(column: &str, message: impl Into<String>) -> Self {
        TableError::TypeMismatch {
            column: column.to_string(),
            message: message.into(),
        }
    }
}

pub type Result<T> = std::result::Result<T, TableError>;
