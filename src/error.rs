use std::path::PathBuf;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum PipelineError {
    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("failed to fetch page after {attempts} attempts: {source}")]
    RetriesExhausted {
        attempts: u32,
        #[source]
        source: Box<PipelineError>,
    },

    #[error("unexpected API response structure: {0}")]
    Envelope(String),

    #[error("validation failed: {0}")]
    Validation(String),

    #[error("no batch files found in '{}'", .0.display())]
    NoBatchFiles(PathBuf),

    #[error("not a readable data directory: '{}'", .0.display())]
    InvalidDataDir(PathBuf),

    #[error("configuration error: {0}")]
    Config(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON deserialization failed: {0}")]
    Json(#[from] serde_json::Error),

    #[error("TOML deserialization failed: {0}")]
    Toml(#[from] toml::de::Error),

    #[error("columnar batch error: {0}")]
    Arrow(#[from] arrow::error::ArrowError),

    #[error("parquet file error: {0}")]
    Parquet(#[from] parquet::errors::ParquetError),

    #[error("batch schema mismatch: {0}")]
    Schema(String),
}

impl PipelineError {
    /// Transport failures are the only retryable class; everything else
    /// aborts the run immediately.
    pub fn is_transient(&self) -> bool {
        matches!(self, PipelineError::Http(_))
    }
}

pub type Result<T> = std::result::Result<T, PipelineError>;
