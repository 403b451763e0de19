use std::path::PathBuf;
use thiserror::Error;

/// Errors raised while reading plans from a source.
#[derive(Error, Debug)]
pub enum SourceError {
    #[error("Request to {url} failed: {source}")]
    Http {
        url: String,
        #[source]
        source: reqwest::Error,
    },

    #[error("Request to {url} returned status {status}")]
    Status { url: String, status: u16 },

    #[error("Failed to read plans file {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Malformed plan data: {0}")]
    Decode(#[from] serde_json::Error),

    #[error("Plan {0} not found")]
    NotFound(i64),
}

/// Errors raised while assembling settings.
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("No plan source configured: set PLANBOARD_API_URL or PLANBOARD_PLANS_FILE")]
    MissingSource,

    #[error("Invalid value for {key}: {value}")]
    InvalidValue { key: &'static str, value: String },
}
