//! Error types for the graft core library.

/// Top-level error enum for the graft core library.
#[derive(Debug, thiserror::Error)]
pub enum GraftError {
    #[error("Parse error: {0}")]
    Parse(String),

    #[error("Analysis error: {0}")]
    Analysis(String),

    #[error("Integration error: {0}")]
    Integration(String),

    #[error("Config error: {0}")]
    Config(String),

    #[error("Generation error: {0}")]
    Generation(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

pub type GraftResult<T> = Result<T, GraftError>;
