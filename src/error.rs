use std::path::PathBuf;

use miette::Diagnostic;
use thiserror::Error;

#[derive(Debug, Error, Diagnostic)]
pub enum UploadError {
    #[error("invalid URL: {0}")]
    #[diagnostic(help("expected an absolute http:// or https:// URL"))]
    InvalidUrl(String),

    #[error("unable to determine filename for URL uploaded file: {0}")]
    #[diagnostic(help("the URL path must end with a file name, not a '/'"))]
    MissingFilename(String),

    #[error("fetch failed: {0}")]
    Fetch(String),

    #[error("remote returned status {status}: {message}")]
    FetchStatus { status: u16, message: String },

    #[error("unable to determine MIME type for URL uploaded file: {0}")]
    MissingContentType(String),

    #[error("filesystem error: {0}")]
    Filesystem(String),

    #[error("failed to read config file at {0}")]
    ConfigRead(PathBuf),

    #[error("failed to parse JSON config: {0}")]
    ConfigParse(String),

    #[error("invalid config value: {0}")]
    InvalidConfig(String),
}

impl UploadError {
    pub fn is_fetch_error(&self) -> bool {
        matches!(self, UploadError::Fetch(_) | UploadError::FetchStatus { .. })
    }
}
