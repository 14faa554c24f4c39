//! Error types for civitgrab_core

use thiserror::Error;

/// Core error type
#[derive(Error, Debug)]
pub enum Error {
    #[error("invalid model URL '{0}': expected https://civitai.com/models/<id>")]
    InvalidUrl(String),

    #[error("failed to fetch metadata for model {model}: {reason}")]
    MetadataFetch { model: String, reason: String },

    #[error("no download URL for model '{0}'")]
    NoDownloadUrl(String),

    #[error("no destination path assigned for model '{0}'")]
    PathNotAssigned(String),

    #[error("transfer failed: {0}")]
    Transfer(String),

    #[error("no virus scan information for model '{0}'")]
    NoScanInfo(String),

    #[error("configuration error: {0}")]
    Config(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Result type alias
pub type Result<T> = std::result::Result<T, Error>;
