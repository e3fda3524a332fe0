//! Error types for the risk profiling pipeline

use thiserror::Error;

/// Result type alias for profiling operations
pub type Result<T> = std::result::Result<T, ProfilerError>;

/// Main error type for the risk profiling pipeline
#[derive(Error, Debug)]
pub enum ProfilerError {
    #[error("Configuration error: {0}")]
    ConfigError(String),

    #[error("Data consistency error: {0}")]
    DataError(String),

    #[error("Degenerate gradient profile: sample row {row} has zero norm")]
    DegenerateGradient { row: usize },

    #[error("Gradient provider error: {0}")]
    GradientError(String),

    #[error("Render error: {0}")]
    RenderError(String),

    #[error("Export error: {0}")]
    ExportError(String),

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),
}
