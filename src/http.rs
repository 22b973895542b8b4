use std::fs::File;
use std::io::{Read, Write};

use reqwest::blocking::{Client, Response};
use reqwest::header::{CONTENT_TYPE, HeaderMap, HeaderValue, USER_AGENT};
use reqwest::redirect::Policy;
use tracing::debug;

use crate::config::HttpSettings;
use crate::domain::SourceUrl;
use crate::error::UploadError;

const STATUS_MESSAGE_LIMIT: usize = 200;
const COPY_BUFFER_SIZE: usize = 64 * 1024;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DownloadInfo {
    pub status: u16,
    pub bytes: u64,
    pub content_type: Option<String>,
}

pub trait HttpFetcher: Send + Sync {
    fn download(
        &self,
        url: &SourceUrl,
        destination: &mut File,
    ) -> Result<DownloadInfo, UploadError>;
}

#[derive(Clone)]
pub struct ReqwestFetcher {
    client: Client,
}

impl ReqwestFetcher {
    pub fn new(settings: &HttpSettings) -> Result<Self, UploadError> {
        let mut headers = HeaderMap::new();
        headers.insert(
            USER_AGENT,
            HeaderValue::from_str(&settings.user_agent)
                .map_err(|err| UploadError::InvalidConfig(format!("user_agent: {err}")))?,
        );
        // Certificate checks are relaxed on this client only.
        let client = Client::builder()
            .default_headers(headers)
            .timeout(settings.timeout)
            .redirect(Policy::none())
            .danger_accept_invalid_certs(settings.accept_invalid_certs)
            .build()
            .map_err(|err| UploadError::Fetch(err.to_string()))?;
        Ok(Self { client })
    }

    fn handle_status(response: Response) -> Result<Response, UploadError> {
        if response.status().is_success() {
            return Ok(response);
        }
        let status = response.status().as_u16();
        let message = response
            .text()
            .map(|body| truncate(body.trim(), STATUS_MESSAGE_LIMIT))
            .ok()
            .filter(|body| !body.is_empty())
            .unwrap_or_else(|| "request failed".to_string());
        Err(UploadError::FetchStatus { status, message })
    }
}

impl HttpFetcher for ReqwestFetcher {
    fn download(
        &self,
        url: &SourceUrl,
        destination: &mut File,
    ) -> Result<DownloadInfo, UploadError> {
        debug!(url = %url, "sending GET");
        let response = self
            .client
            .get(url.as_url().clone())
            .send()
            .map_err(|err| UploadError::Fetch(describe(&err)))?;
        let mut response = Self::handle_status(response)?;

        let status = response.status().as_u16();
        let content_type = response
            .headers()
            .get(CONTENT_TYPE)
            .and_then(|value| value.to_str().ok())
            .map(|value| value.to_string());

        let bytes = copy_body(&mut response, destination)?;

        debug!(url = %url, status, bytes, content_type = ?content_type, "download complete");
        Ok(DownloadInfo {
            status,
            bytes,
            content_type,
        })
    }
}

/// Copies the body, keeping network read failures apart from local write failures.
pub fn copy_body<R: Read, W: Write>(
    body: &mut R,
    destination: &mut W,
) -> Result<u64, UploadError> {
    let mut buffer = vec![0u8; COPY_BUFFER_SIZE];
    let mut written = 0u64;
    loop {
        let read = match body.read(&mut buffer) {
            Ok(0) => break,
            Ok(read) => read,
            Err(err) if err.kind() == std::io::ErrorKind::Interrupted => continue,
            Err(err) => {
                return Err(UploadError::Fetch(format!("reading response body: {err}")));
            }
        };
        destination
            .write_all(&buffer[..read])
            .map_err(|err| UploadError::Filesystem(format!("writing temp file: {err}")))?;
        written += read as u64;
    }
    destination
        .flush()
        .map_err(|err| UploadError::Filesystem(format!("writing temp file: {err}")))?;
    Ok(written)
}

fn describe(err: &reqwest::Error) -> String {
    if err.is_timeout() {
        format!("timed out: {err}")
    } else if err.is_connect() {
        format!("connection failed: {err}")
    } else {
        err.to_string()
    }
}

fn truncate(value: &str, limit: usize) -> String {
    match value.char_indices().nth(limit) {
        Some((index, _)) => format!("{}...", &value[..index]),
        None => value.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use assert_matches::assert_matches;

    use super::*;

    struct FailingReader;

    impl Read for FailingReader {
        fn read(&mut self, _buf: &mut [u8]) -> std::io::Result<usize> {
            Err(std::io::Error::new(
                std::io::ErrorKind::ConnectionReset,
                "connection reset",
            ))
        }
    }

    struct FullDisk;

    impl Write for FullDisk {
        fn write(&mut self, _buf: &[u8]) -> std::io::Result<usize> {
            Err(std::io::Error::other("no space left on device"))
        }

        fn flush(&mut self) -> std::io::Result<()> {
            Ok(())
        }
    }

    #[test]
    fn copy_body_counts_bytes() {
        let body = vec![3u8; COPY_BUFFER_SIZE * 2 + 17];
        let mut out = Vec::new();
        let written = copy_body(&mut body.as_slice(), &mut out).unwrap();
        assert_eq!(written, body.len() as u64);
        assert_eq!(out, body);
    }

    #[test]
    fn copy_body_read_failure_is_fetch_error() {
        let mut out = Vec::new();
        assert_matches!(
            copy_body(&mut FailingReader, &mut out),
            Err(UploadError::Fetch(_))
        );
    }

    #[test]
    fn copy_body_write_failure_is_filesystem_error() {
        let body = b"payload".to_vec();
        assert_matches!(
            copy_body(&mut body.as_slice(), &mut FullDisk),
            Err(UploadError::Filesystem(_))
        );
    }

    #[test]
    fn truncate_respects_char_boundaries() {
        assert_eq!(truncate("héllo", 2), "hé...");
        assert_eq!(truncate("short", 10), "short");
    }
}
