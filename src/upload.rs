use std::fs::{self, File};
use std::path::{Path, PathBuf};

use camino::Utf8PathBuf;
use chrono::{DateTime, Utc};
use serde::Serialize;
use tempfile::{Builder, NamedTempFile};
use tracing::{debug, info};

use crate::config::Settings;
use crate::domain::SourceUrl;
use crate::error::UploadError;
use crate::http::{HttpFetcher, ReqwestFetcher};
use crate::resolver::{self, ContentTypeResolver, ResolveInput};

const TEMP_PREFIX: &str = "urlupload";

/// A downloaded URL held in a temporary file, shaped like a user file upload.
///
/// The file is removed when this value is dropped unless it is moved out with
/// [`UrlTempfile::persist`] or [`UrlTempfile::keep`].
#[derive(Debug)]
pub struct UrlTempfile {
    url: SourceUrl,
    original_filename: String,
    content_type: String,
    declared_content_type: Option<String>,
    len: u64,
    fetched_at: DateTime<Utc>,
    file: NamedTempFile,
}

#[derive(Debug, Clone, Serialize)]
pub struct UploadSummary {
    pub url: String,
    pub original_filename: String,
    pub content_type: String,
    pub declared_content_type: Option<String>,
    pub bytes: u64,
    pub path: String,
    pub fetched_at: DateTime<Utc>,
}

impl UrlTempfile {
    pub fn download(url: &str, settings: &Settings) -> Result<Self, UploadError> {
        UrlFetcher::from_settings(settings)?.fetch(url)
    }

    pub fn url(&self) -> &SourceUrl {
        &self.url
    }

    pub fn path(&self) -> &Path {
        self.file.path()
    }

    pub fn original_filename(&self) -> &str {
        &self.original_filename
    }

    pub fn content_type(&self) -> &str {
        &self.content_type
    }

    pub fn declared_content_type(&self) -> Option<&str> {
        self.declared_content_type.as_deref()
    }

    pub fn len(&self) -> u64 {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    pub fn fetched_at(&self) -> DateTime<Utc> {
        self.fetched_at
    }

    /// Opens a fresh read handle positioned at the start of the payload.
    pub fn reopen(&self) -> Result<File, UploadError> {
        self.file
            .reopen()
            .map_err(|err| UploadError::Filesystem(err.to_string()))
    }

    pub fn summary(&self) -> UploadSummary {
        self.summary_at(self.path())
    }

    fn summary_at(&self, path: &Path) -> UploadSummary {
        UploadSummary {
            url: self.url.to_string(),
            original_filename: self.original_filename.clone(),
            content_type: self.content_type.clone(),
            declared_content_type: self.declared_content_type.clone(),
            bytes: self.len,
            path: path.display().to_string(),
            fetched_at: self.fetched_at,
        }
    }

    /// Moves the payload to `destination`, replacing any existing file.
    pub fn persist(self, destination: &Path) -> Result<UploadSummary, UploadError> {
        if let Some(parent) = destination.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent).map_err(|err| UploadError::Filesystem(err.to_string()))?;
        }
        let summary = self.summary_at(destination);
        match self.file.persist(destination) {
            Ok(_) => Ok(summary),
            Err(err) => {
                // rename fails across filesystems; fall back to a copy and let the
                // temp file drop
                debug!(error = %err.error, "rename failed, copying payload");
                fs::copy(err.file.path(), destination).map_err(|copy_err| {
                    UploadError::Filesystem(format!(
                        "persist {}: {copy_err}",
                        destination.display()
                    ))
                })?;
                Ok(summary)
            }
        }
    }

    /// Disables cleanup and returns the temporary path.
    pub fn keep(self) -> Result<PathBuf, UploadError> {
        self.file
            .into_temp_path()
            .keep()
            .map_err(|err| UploadError::Filesystem(err.to_string()))
    }
}

pub struct UrlFetcher<H: HttpFetcher, R: ContentTypeResolver> {
    http: H,
    resolver: R,
    temp_dir: Option<Utf8PathBuf>,
}

impl UrlFetcher<ReqwestFetcher, Box<dyn ContentTypeResolver>> {
    pub fn from_settings(settings: &Settings) -> Result<Self, UploadError> {
        let http = ReqwestFetcher::new(&settings.http)?;
        let resolver = resolver::build(settings);
        Ok(Self::new(http, resolver).with_temp_dir(settings.temp_dir.clone()))
    }
}

impl<H: HttpFetcher, R: ContentTypeResolver> UrlFetcher<H, R> {
    pub fn new(http: H, resolver: R) -> Self {
        Self {
            http,
            resolver,
            temp_dir: None,
        }
    }

    pub fn with_temp_dir(mut self, temp_dir: Option<Utf8PathBuf>) -> Self {
        self.temp_dir = temp_dir;
        self
    }

    pub fn http(&self) -> &H {
        &self.http
    }

    pub fn fetch(&self, url: &str) -> Result<UrlTempfile, UploadError> {
        self.fetch_url(url.parse()?)
    }

    pub fn fetch_url(&self, url: SourceUrl) -> Result<UrlTempfile, UploadError> {
        let original_filename = url.require_filename()?.to_string();

        let mut file = self.create_temp()?;
        let download = self.http.download(&url, file.as_file_mut())?;
        file.as_file()
            .sync_all()
            .map_err(|err| UploadError::Filesystem(err.to_string()))?;

        let content_type = self.resolver.resolve(&ResolveInput {
            path: file.path(),
            declared_content_type: download.content_type.as_deref(),
            original_filename: &original_filename,
        })?;
        let content_type = content_type.trim().to_string();
        if content_type.is_empty() {
            return Err(UploadError::MissingContentType(format!(
                "{} resolver returned an empty type",
                self.resolver.name()
            )));
        }

        info!(
            url = %url,
            filename = %original_filename,
            content_type = %content_type,
            bytes = download.bytes,
            "fetched URL upload"
        );
        Ok(UrlTempfile {
            url,
            original_filename,
            content_type,
            declared_content_type: download.content_type,
            len: download.bytes,
            fetched_at: Utc::now(),
            file,
        })
    }

    fn create_temp(&self) -> Result<NamedTempFile, UploadError> {
        let mut builder = Builder::new();
        builder.prefix(TEMP_PREFIX);
        let result = match &self.temp_dir {
            Some(dir) => {
                fs::create_dir_all(dir.as_std_path())
                    .map_err(|err| UploadError::Filesystem(err.to_string()))?;
                builder.tempfile_in(dir.as_std_path())
            }
            None => builder.tempfile(),
        };
        result.map_err(|err| UploadError::Filesystem(format!("create temp file: {err}")))
    }
}
