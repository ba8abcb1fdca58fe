//! Error types for the GTM training engine.

use thiserror::Error;

/// The main error type for GTM operations.
#[derive(Error, Debug)]
pub enum GtmError {
    /// Malformed grid counts, mismatched dimensions or bad configuration values.
    #[error("Invalid argument: {0}")]
    InvalidArgument(String),

    /// A normal-equations matrix could not be inverted.
    #[error("Singular matrix: {0}")]
    SingularMatrix(String),

    /// A probability normalizer, noise precision or residual left the finite positive range.
    #[error("Numeric instability: {0}")]
    NumericInstability(String),

    /// I/O error.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Malformed text data file.
    #[error("Invalid data file: {0}")]
    InvalidDataFile(String),

    /// Malformed binary model file.
    #[error("Invalid model format: {0}")]
    InvalidModelFormat(String),

    /// Empty input.
    #[error("Empty input: {0}")]
    EmptyInput(String),
}

/// Result type alias for GTM operations.
pub type Result<T> = std::result::Result<T, GtmError>;
