pub mod config;
pub mod domain;
pub mod error;
pub mod http;
pub mod mime_types;
pub mod output;
pub mod resolver;
pub mod upload;

pub use error::UploadError;
pub use upload::{UrlFetcher, UrlTempfile};
