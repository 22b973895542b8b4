use std::fs;
use std::path::PathBuf;
use std::time::Duration;

use camino::Utf8PathBuf;
use serde::{Deserialize, Serialize};

use crate::domain::ResolverKind;
use crate::error::UploadError;

pub const SCHEMA_VERSION: u32 = 1;
pub const DEFAULT_CONFIG_FILE: &str = "url-upload.json";
pub const DEFAULT_TIMEOUT_SECS: u64 = 30;
pub const DEFAULT_IDENTIFY_PROGRAM: &str = "identify";

#[derive(Debug, Default, Deserialize, Serialize)]
pub struct Config {
    #[serde(default)]
    pub schema_version: Option<u32>,
    #[serde(default)]
    pub resolver: Option<ResolverKind>,
    #[serde(default)]
    pub identify_program: Option<String>,
    #[serde(default)]
    pub timeout_secs: Option<u64>,
    #[serde(default)]
    pub accept_invalid_certs: Option<bool>,
    #[serde(default)]
    pub user_agent: Option<String>,
    #[serde(default)]
    pub temp_dir: Option<Utf8PathBuf>,
}

#[derive(Debug, Clone)]
pub struct HttpSettings {
    pub timeout: Duration,
    pub accept_invalid_certs: bool,
    pub user_agent: String,
}

impl Default for HttpSettings {
    fn default() -> Self {
        Self {
            timeout: Duration::from_secs(DEFAULT_TIMEOUT_SECS),
            accept_invalid_certs: true,
            user_agent: default_user_agent(),
        }
    }
}

#[derive(Debug, Clone)]
pub struct Settings {
    pub schema_version: u32,
    pub resolver: ResolverKind,
    pub identify_program: String,
    pub http: HttpSettings,
    pub temp_dir: Option<Utf8PathBuf>,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            schema_version: SCHEMA_VERSION,
            resolver: ResolverKind::default(),
            identify_program: DEFAULT_IDENTIFY_PROGRAM.to_string(),
            http: HttpSettings::default(),
            temp_dir: None,
        }
    }
}

pub struct ConfigLoader;

impl ConfigLoader {
    pub fn resolve(path: Option<&str>) -> Result<Settings, UploadError> {
        let config_path = match path {
            Some(path) => PathBuf::from(path),
            None => PathBuf::from(DEFAULT_CONFIG_FILE),
        };

        if path.is_none() && !config_path.exists() {
            return Ok(Settings::default());
        }

        let content = fs::read_to_string(&config_path)
            .map_err(|_| UploadError::ConfigRead(config_path.clone()))?;
        let config: Config = serde_json::from_str(&content)
            .map_err(|err| UploadError::ConfigParse(err.to_string()))?;

        Self::resolve_config(config)
    }

    pub fn resolve_config(config: Config) -> Result<Settings, UploadError> {
        let schema_version = config.schema_version.unwrap_or(SCHEMA_VERSION);
        if schema_version != SCHEMA_VERSION {
            return Err(UploadError::InvalidConfig(format!(
                "unsupported schema_version {schema_version} (expected {SCHEMA_VERSION})"
            )));
        }

        let timeout_secs = config.timeout_secs.unwrap_or(DEFAULT_TIMEOUT_SECS);
        if timeout_secs == 0 {
            return Err(UploadError::InvalidConfig(
                "timeout_secs must be greater than zero".to_string(),
            ));
        }

        let identify_program = config
            .identify_program
            .map(|value| value.trim().to_string())
            .unwrap_or_else(|| DEFAULT_IDENTIFY_PROGRAM.to_string());
        if identify_program.is_empty() {
            return Err(UploadError::InvalidConfig(
                "identify_program must not be empty".to_string(),
            ));
        }

        Ok(Settings {
            schema_version,
            resolver: config.resolver.unwrap_or_default(),
            identify_program,
            http: HttpSettings {
                timeout: Duration::from_secs(timeout_secs),
                accept_invalid_certs: config.accept_invalid_certs.unwrap_or(true),
                user_agent: config.user_agent.unwrap_or_else(default_user_agent),
            },
            temp_dir: config.temp_dir,
        })
    }
}

pub fn default_user_agent() -> String {
    format!("url-upload/{}", env!("CARGO_PKG_VERSION"))
}
