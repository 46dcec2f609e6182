//! Error type shared by every fallible operation in the crate.

use thiserror::Error;

/// Result alias used throughout the crate.
pub type Result<T> = std::result::Result<T, LstmError>;

#[derive(Debug, Error)]
pub enum LstmError {
    /// Operand dimensions are incompatible for the requested operation.
    #[error("shape mismatch in {op}: {}x{} vs {}x{}", left.0, left.1, right.0, right.1)]
    ShapeMismatch {
        op: &'static str,
        left: (usize, usize),
        right: (usize, usize),
    },

    /// Storage for a matrix could not be reserved.
    #[error("failed to allocate a {rows}x{cols} matrix")]
    AllocationFailure { rows: usize, cols: usize },

    #[error("insufficient data: {0}")]
    InsufficientData(String),

    #[error("corrupt model file: {0}")]
    CorruptModelFile(String),

    #[error("invalid argument: {0}")]
    InvalidArgument(String),

    #[error("index ({row}, {col}) out of bounds for a {rows}x{cols} matrix")]
    IndexOutOfBounds {
        row: usize,
        col: usize,
        rows: usize,
        cols: usize,
    },

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    #[error("invalid configuration: {0}")]
    Config(String),
}

impl LstmError {
    pub(crate) fn shape(op: &'static str, left: (usize, usize), right: (usize, usize)) -> Self {
        LstmError::ShapeMismatch { op, left, right }
    }
}
