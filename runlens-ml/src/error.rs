//! Error types for the runlens-ml crate.
//!
//! Asset resolution never surfaces these to callers directly: decoder failures are folded
//! into diagnostics on the bundle. `ExplainError` is the one error a reduction returns.

use thiserror::Error;

/// Top-level error type for decoding and reduction.
#[derive(Debug, Error)]
pub enum LensError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    #[error("NPY error: {0}")]
    Npy(#[from] NpyError),

    #[error("Explanation error: {0}")]
    Explain(#[from] ExplainError),

    #[error("Model error: {0}")]
    Model(String),

    #[error("Invalid input: {0}")]
    InvalidInput(String),
}

impl LensError {
    pub fn model(msg: impl Into<String>) -> Self {
        Self::Model(msg.into())
    }

    pub fn invalid_input(msg: impl Into<String>) -> Self {
        Self::InvalidInput(msg.into())
    }
}

/// Errors from decoding NumPy `.npy` files.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum NpyError {
    #[error("missing NUMPY magic string")]
    BadMagic,

    #[error("unsupported format version {major}.{minor}")]
    UnsupportedVersion { major: u8, minor: u8 },

    #[error("file truncated in {section}")]
    Truncated { section: &'static str },

    #[error("malformed header: {message}")]
    Header { message: String },

    #[error("unsupported dtype '{descr}'")]
    UnsupportedDtype { descr: String },

    #[error("shape {shape:?} needs {expected} elements but the payload holds {actual}")]
    PayloadSize {
        shape: Vec<usize>,
        expected: usize,
        actual: usize,
    },
}

impl NpyError {
    pub(crate) fn header(msg: impl Into<String>) -> Self {
        Self::Header {
            message: msg.into(),
        }
    }
}

/// Errors a reduction reports instead of a table.
///
/// These are display-level conditions: the caller renders the message in place of a chart.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ExplainError {
    #[error("unsupported attribution array rank {rank} (expected {expected})")]
    UnsupportedRank { rank: usize, expected: &'static str },

    #[error("attribution array has an empty {axis} axis")]
    EmptyAxis { axis: &'static str },

    #[error("sample index {index} is out of range for {len} samples")]
    SampleIndexOutOfRange { index: usize, len: usize },
}
