use std::fmt;
use std::str::FromStr;

use clap::ValueEnum;
use serde::{Deserialize, Serialize};
use url::Url;

use crate::error::UploadError;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum ResolverKind {
    #[default]
    Identify,
    Header,
}

impl fmt::Display for ResolverKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ResolverKind::Identify => write!(f, "identify"),
            ResolverKind::Header => write!(f, "header"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SourceUrl(Url);

impl SourceUrl {
    pub fn as_str(&self) -> &str {
        self.0.as_str()
    }

    pub fn as_url(&self) -> &Url {
        &self.0
    }

    pub fn host(&self) -> Option<&str> {
        self.0.host_str()
    }

    pub fn is_https(&self) -> bool {
        self.0.scheme() == "https"
    }

    /// Last segment of the URL path, or `None` when the path is empty or ends in `/`.
    ///
    /// The query string and fragment are never part of the path, and the segment
    /// is returned exactly as it appears in the URL (still percent-encoded).
    pub fn original_filename(&self) -> Option<&str> {
        self.0
            .path()
            .rsplit_once('/')
            .map(|(_, name)| name)
            .filter(|name| !name.is_empty())
    }

    pub fn require_filename(&self) -> Result<&str, UploadError> {
        self.original_filename()
            .ok_or_else(|| UploadError::MissingFilename(self.as_str().to_string()))
    }
}

impl fmt::Display for SourceUrl {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl FromStr for SourceUrl {
    type Err = UploadError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        let trimmed = value.trim();
        let url = Url::parse(trimmed)
            .map_err(|err| UploadError::InvalidUrl(format!("{trimmed}: {err}")))?;
        if !matches!(url.scheme(), "http" | "https") {
            return Err(UploadError::InvalidUrl(format!(
                "{trimmed}: unsupported scheme {}",
                url.scheme()
            )));
        }
        if url.host_str().map(str::is_empty).unwrap_or(true) {
            return Err(UploadError::InvalidUrl(format!("{trimmed}: missing host")));
        }
        Ok(Self(url))
    }
}
