//! Error types for the otu-gradient library.

use thiserror::Error;

/// Main error type for the library.
///
/// Only run-level problems are errors. Per-feature numeric trouble
/// (too few observations, zero variance) is recorded on the result as a
/// [`FeatureStatus`](crate::data::FeatureStatus) and never aborts a run.
#[derive(Error, Debug)]
pub enum GradientError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    #[error("Invalid configuration: {0}")]
    InvalidConfiguration(String),

    #[error("Cannot coerce value '{value}' of category '{column}' (sample '{sample}') to a number")]
    InputCoercion {
        column: String,
        sample: String,
        value: String,
    },

    #[error("Invalid abundance value '{value}' at row {row}, column {col}")]
    InvalidAbundance {
        value: String,
        row: usize,
        col: usize,
    },

    #[error("Dimension mismatch: expected {expected}, got {actual}")]
    DimensionMismatch { expected: usize, actual: usize },

    #[error("Sample ID mismatch: {0}")]
    SampleMismatch(String),

    #[error("Missing column '{0}' in metadata")]
    MissingColumn(String),

    #[error("Empty data: {0}")]
    EmptyData(String),

    #[error("Invalid parameter: {0}")]
    InvalidParameter(String),

    #[error("Pipeline error: {0}")]
    Pipeline(String),

    #[error("YAML serialization error: {0}")]
    Yaml(#[from] serde_yaml::Error),

    #[error("JSON serialization error: {0}")]
    Json(#[from] serde_json::Error),
}

/// Result type alias for library operations.
pub type Result<T> = std::result::Result<T, GradientError>;
