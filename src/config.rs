//! Configuration management for Task Planner.
//!
//! Configuration can be set via environment variables:
//! - `TASK_PLANNER_DATA_DIR` - Optional. Directory holding the JSON stores. Defaults to `./data`.
//! - `TASK_PLANNER_STORE` - Optional. `file` or `memory`. Defaults to `file`.
//! - `TASK_PLANNER_BASE_URL` - Optional. Public URL used in mail links. Defaults to `http://localhost:8000`.
//! - `TASK_PLANNER_MAILER` - Optional. `log` or `sendmail`. Defaults to `log`.
//! - `TASK_PLANNER_MAIL_FROM` - Optional. Sender header. Defaults to `Task Planner <no-reply@example.com>`.
//! - `TASK_PLANNER_SENDMAIL_PATH` - Optional. Defaults to `/usr/sbin/sendmail`.
//! - `TASK_PLANNER_PRETTY_JSON` - Optional. Pretty-print stored documents. Defaults to `true`.

use crate::mail::MailerType;
use crate::util::env_var_bool;
use std::path::PathBuf;
use thiserror::Error;
use url::Url;

pub const DEFAULT_BASE_URL: &str = "http://localhost:8000";
pub const DEFAULT_MAIL_FROM: &str = "Task Planner <no-reply@example.com>";
pub const DEFAULT_SENDMAIL_PATH: &str = "/usr/sbin/sendmail";

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Invalid value for {0}: {1}")]
    InvalidValue(String, String),
}

/// Storage backend selection, shared by the task and subscription stores.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum StoreType {
    Memory,
    #[default]
    File,
}

impl StoreType {
    /// Parse from environment variable value.
    pub fn parse(s: &str) -> Option<Self> {
        match s.trim().to_lowercase().as_str() {
            "memory" => Some(Self::Memory),
            "file" | "json" => Some(Self::File),
            _ => None,
        }
    }
}

/// Application configuration.
#[derive(Debug, Clone)]
pub struct Config {
    /// Directory holding the JSON documents
    pub data_dir: PathBuf,

    pub store_type: StoreType,

    /// Public base URL for verification and unsubscribe links
    pub base_url: Url,

    pub mailer: MailerType,

    /// `From` header for outgoing mail
    pub mail_from: String,

    pub sendmail_path: PathBuf,

    /// Pretty-print stored JSON documents
    pub pretty_json: bool,
}

impl Config {
    /// Load configuration from environment variables.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError::InvalidValue` if a variable is set to something unparseable.
    pub fn from_env() -> Result<Self, ConfigError> {
        let data_dir = std::env::var("TASK_PLANNER_DATA_DIR")
            .map(PathBuf::from)
            .unwrap_or_else(|_| PathBuf::from("data"));

        let store_type = match std::env::var("TASK_PLANNER_STORE") {
            Ok(value) => StoreType::parse(&value)
                .ok_or_else(|| ConfigError::InvalidValue("TASK_PLANNER_STORE".to_string(), value))?,
            Err(_) => StoreType::default(),
        };

        let base_url = parse_base_url(
            &std::env::var("TASK_PLANNER_BASE_URL").unwrap_or_else(|_| DEFAULT_BASE_URL.to_string()),
        )?;

        let mailer = match std::env::var("TASK_PLANNER_MAILER") {
            Ok(value) => MailerType::parse(&value).ok_or_else(|| {
                ConfigError::InvalidValue("TASK_PLANNER_MAILER".to_string(), value)
            })?,
            Err(_) => MailerType::default(),
        };

        let mail_from = std::env::var("TASK_PLANNER_MAIL_FROM")
            .unwrap_or_else(|_| DEFAULT_MAIL_FROM.to_string());
        if mail_from.contains(['\r', '\n']) {
            return Err(ConfigError::InvalidValue(
                "TASK_PLANNER_MAIL_FROM".to_string(),
                "must be a single line".to_string(),
            ));
        }

        let sendmail_path = std::env::var("TASK_PLANNER_SENDMAIL_PATH")
            .map(PathBuf::from)
            .unwrap_or_else(|_| PathBuf::from(DEFAULT_SENDMAIL_PATH));

        Ok(Self {
            data_dir,
            store_type,
            base_url,
            mailer,
            mail_from,
            sendmail_path,
            pretty_json: env_var_bool("TASK_PLANNER_PRETTY_JSON", true),
        })
    }

    /// Create a config with default values rooted at `data_dir` (useful for testing).
    pub fn new(data_dir: PathBuf) -> Self {
        Self {
            data_dir,
            store_type: StoreType::File,
            base_url: Url::parse(DEFAULT_BASE_URL).expect("default base URL is valid"),
            mailer: MailerType::Log,
            mail_from: DEFAULT_MAIL_FROM.to_string(),
            sendmail_path: PathBuf::from(DEFAULT_SENDMAIL_PATH),
            pretty_json: true,
        }
    }
}

/// Parse and check a public base URL (http or https only).
pub fn parse_base_url(value: &str) -> Result<Url, ConfigError> {
    let invalid = |reason: String| ConfigError::InvalidValue("TASK_PLANNER_BASE_URL".to_string(), reason);
    let url = Url::parse(value.trim()).map_err(|e| invalid(format!("{}: {}", value, e)))?;
    if !matches!(url.scheme(), "http" | "https") {
        return Err(invalid(format!("unsupported scheme {}", url.scheme())));
    }
    Ok(url)
}
