use thiserror::Error;

#[derive(Debug, Error)]
pub enum BreakdownError {
    #[error("filename matches no known breakdown grammar: {0}")]
    UnrecognizedFilename(String),

    #[error("no table or block layout matched in {filename}")]
    UnsupportedLayout { filename: String },

    #[error("header label '{label}' not found in {filename}")]
    MissingMetadata {
        filename: String,
        label: &'static str,
    },

    #[error("reconciliation failed for {filename} at row {row_index} ({row}): {reason}")]
    Reconciliation {
        filename: String,
        row_index: usize,
        row: String,
        reason: String,
    },

    #[error("invalid amount '{raw}' in {filename}")]
    InvalidAmount { filename: String, raw: String },

    #[error("both amount columns populated in {filename} for '{row}': '{first}' / '{second}'")]
    ConflictingAmounts {
        filename: String,
        row: String,
        first: String,
        second: String,
    },

    #[error("{filename} is not a {expected} breakdown")]
    CategoryMismatch {
        filename: String,
        expected: &'static str,
    },
}

impl BreakdownError {
    /// Bulk scans use this as a selection filter rather than a failure.
    pub fn is_unrecognized_filename(&self) -> bool {
        matches!(self, BreakdownError::UnrecognizedFilename(_))
    }
}

pub type Result<T> = std::result::Result<T, BreakdownError>;
