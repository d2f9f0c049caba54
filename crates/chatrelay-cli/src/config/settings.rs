//! Runtime settings resolved from flags, environment and the config file
//!
//! The config file lives at ~/.config/chatrelay/config.toml unless
//! `--config` points elsewhere.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::{Path, PathBuf};
use std::str::FromStr;
use thiserror::Error;

use chatrelay_ai::llm::DEFAULT_ANTHROPIC_MODEL;
use chatrelay_core::HistoryConfig;

use crate::cli::Overrides;

const DEFAULT_POLLING_TIMEOUT: u32 = 30;
const REDACTED: &str = "<redacted>";

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Missing required setting {name}: set {env} or add it to the config file")]
    MissingRequired {
        name: &'static str,
        env: &'static str,
    },

    #[error("Invalid value for {key}: '{value}' ({reason})")]
    InvalidValue {
        key: &'static str,
        value: String,
        reason: String,
    },

    #[error("Config file not found: {0}")]
    NotFound(PathBuf),

    #[error("Failed to read config file {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to parse config file {path}: {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: toml::de::Error,
    },
}

/// On-disk configuration. Every field is optional.
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct FileConfig {
    #[serde(default)]
    pub telegram: TelegramSection,
    #[serde(default)]
    pub anthropic: AnthropicSection,
    #[serde(default)]
    pub history: HistorySection,
    #[serde(default)]
    pub logging: LoggingSection,
}

#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct TelegramSection {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub bot_token: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub bot_username: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub polling_timeout: Option<u32>,
}

#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct AnthropicSection {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub api_key: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub model: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub max_retries: Option<u32>,
}

#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct HistorySection {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub max_history_length: Option<usize>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub max_age_hours: Option<u64>,
}

#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct LoggingSection {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub level: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub environment: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub dir: Option<PathBuf>,
}

impl FileConfig {
    /// Get the default configuration file path
    pub fn default_path() -> Option<PathBuf> {
        dirs::config_dir().map(|p| p.join("chatrelay").join("config.toml"))
    }

    /// Load the config file.
    ///
    /// An explicit path must exist; a missing default file yields an
    /// empty config.
    pub fn load(explicit: Option<&Path>) -> Result<Self, ConfigError> {
        match explicit {
            Some(path) => {
                if !path.exists() {
                    return Err(ConfigError::NotFound(path.to_path_buf()));
                }
                Self::load_from_path(path)
            }
            None => match Self::default_path() {
                Some(path) if path.exists() => Self::load_from_path(&path),
                _ => Ok(Self::default()),
            },
        }
    }

    pub fn load_from_path(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        toml::from_str(&content).map_err(|source| ConfigError::Parse {
            path: path.to_path_buf(),
            source,
        })
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum LogLevel {
    Error,
    Warn,
    #[default]
    Info,
    Debug,
    Trace,
}

impl LogLevel {
    pub fn as_str(&self) -> &'static str {
        match self {
            LogLevel::Error => "error",
            LogLevel::Warn => "warn",
            LogLevel::Info => "info",
            LogLevel::Debug => "debug",
            LogLevel::Trace => "trace",
        }
    }
}

impl FromStr for LogLevel {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "error" => Ok(LogLevel::Error),
            "warn" | "warning" => Ok(LogLevel::Warn),
            "info" => Ok(LogLevel::Info),
            "debug" => Ok(LogLevel::Debug),
            "trace" => Ok(LogLevel::Trace),
            _ => Err("expected one of error, warn, info, debug, trace".to_string()),
        }
    }
}

impl fmt::Display for LogLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Environment {
    #[default]
    Development,
    Production,
    Test,
}

impl Environment {
    pub fn as_str(&self) -> &'static str {
        match self {
            Environment::Development => "development",
            Environment::Production => "production",
            Environment::Test => "test",
        }
    }

    /// Colored, human-oriented log output
    pub fn is_development(&self) -> bool {
        matches!(self, Environment::Development)
    }
}

impl FromStr for Environment {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "development" | "dev" => Ok(Environment::Development),
            "production" | "prod" => Ok(Environment::Production),
            "test" => Ok(Environment::Test),
            _ => Err("expected one of development, production, test".to_string()),
        }
    }
}

impl fmt::Display for Environment {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone)]
pub struct TelegramSettings {
    pub bot_token: String,
    pub bot_username: Option<String>,
    pub polling_timeout: u32,
}

#[derive(Debug, Clone)]
pub struct AnthropicSettings {
    pub api_key: String,
    pub model: String,
    pub max_retries: u32,
}

#[derive(Debug, Clone, Default)]
pub struct LoggingSettings {
    pub level: LogLevel,
    pub environment: Environment,
    pub dir: Option<PathBuf>,
}

/// Fully validated settings for one process run
#[derive(Debug, Clone)]
pub struct Settings {
    pub telegram: TelegramSettings,
    pub anthropic: AnthropicSettings,
    pub history: HistoryConfig,
    pub logging: LoggingSettings,
}

impl Settings {
    /// Merge command-line/environment overrides over the file config and
    /// validate the result.
    pub fn resolve(overrides: &Overrides, file: FileConfig) -> Result<Self, ConfigError> {
        let FileConfig {
            telegram,
            anthropic,
            history,
            logging,
        } = file;

        let bot_token = required(
            overrides.telegram_token.clone().or(telegram.bot_token),
            "telegram.bot_token",
            "TELEGRAM_BOT_TOKEN",
        )?;
        let api_key = required(
            overrides.anthropic_api_key.clone().or(anthropic.api_key),
            "anthropic.api_key",
            "ANTHROPIC_API_KEY",
        )?;

        let bot_username = non_empty(overrides.bot_username.clone().or(telegram.bot_username))
            .map(|name| name.trim_start_matches('@').to_string());

        let polling_timeout = numeric(
            overrides.polling_timeout.as_deref(),
            telegram.polling_timeout,
            "polling_timeout",
        )?
        .unwrap_or(DEFAULT_POLLING_TIMEOUT);

        let model = non_empty(overrides.model.clone().or(anthropic.model))
            .unwrap_or_else(|| DEFAULT_ANTHROPIC_MODEL.to_string());
        let max_retries = numeric(
            overrides.llm_max_retries.as_deref(),
            anthropic.max_retries,
            "max_retries",
        )?
        .unwrap_or(0);

        let mut history_config = HistoryConfig::default();
        if let Some(len) = numeric(
            overrides.max_history_length.as_deref(),
            history.max_history_length,
            "max_history_length",
        )? {
            history_config = history_config.with_max_history_length(positive(
                len,
                "max_history_length",
            )?);
        }
        if let Some(hours) = numeric(
            overrides.max_age_hours.as_deref(),
            history.max_age_hours,
            "max_age_hours",
        )? {
            history_config =
                history_config.with_max_age_hours(positive(hours, "max_age_hours")?);
        }

        let level = match overrides.log_level.clone().or(logging.level) {
            Some(raw) => parse_enum(&raw, "log_level")?,
            None => LogLevel::default(),
        };
        let environment = match overrides.environment.clone().or(logging.environment) {
            Some(raw) => parse_enum(&raw, "environment")?,
            None => Environment::default(),
        };

        Ok(Self {
            telegram: TelegramSettings {
                bot_token,
                bot_username,
                polling_timeout,
            },
            anthropic: AnthropicSettings {
                api_key,
                model,
                max_retries,
            },
            history: history_config,
            logging: LoggingSettings {
                level,
                environment,
                dir: overrides.log_dir.clone().or(logging.dir),
            },
        })
    }

    /// Render the effective settings as TOML with secrets masked
    pub fn render_redacted(&self) -> String {
        let view = FileConfig {
            telegram: TelegramSection {
                bot_token: Some(REDACTED.to_string()),
                bot_username: self.telegram.bot_username.clone(),
                polling_timeout: Some(self.telegram.polling_timeout),
            },
            anthropic: AnthropicSection {
                api_key: Some(REDACTED.to_string()),
                model: Some(self.anthropic.model.clone()),
                max_retries: Some(self.anthropic.max_retries),
            },
            history: HistorySection {
                max_history_length: Some(self.history.max_history_length),
                max_age_hours: Some(self.history.max_age_hours),
            },
            logging: LoggingSection {
                level: Some(self.logging.level.to_string()),
                environment: Some(self.logging.environment.to_string()),
                dir: self.logging.dir.clone(),
            },
        };
        toml::to_string_pretty(&view).unwrap_or_default()
    }
}

fn non_empty(value: Option<String>) -> Option<String> {
    value
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

fn required(
    value: Option<String>,
    name: &'static str,
    env: &'static str,
) -> Result<String, ConfigError> {
    non_empty(value).ok_or(ConfigError::MissingRequired { name, env })
}

/// Textual overrides win over the typed file value.
fn numeric<T: FromStr>(
    raw: Option<&str>,
    file_value: Option<T>,
    key: &'static str,
) -> Result<Option<T>, ConfigError> {
    match raw {
        Some(raw) => raw
            .trim()
            .parse::<T>()
            .map(Some)
            .map_err(|_| ConfigError::InvalidValue {
                key,
                value: raw.to_string(),
                reason: "expected a non-negative integer".to_string(),
            }),
        None => Ok(file_value),
    }
}

fn positive<T: PartialEq + Default + ToString>(
    value: T,
    key: &'static str,
) -> Result<T, ConfigError> {
    if value == T::default() {
        return Err(ConfigError::InvalidValue {
            key,
            value: value.to_string(),
            reason: "must be at least 1".to_string(),
        });
    }
    Ok(value)
}

fn parse_enum<T: FromStr<Err = String>>(raw: &str, key: &'static str) -> Result<T, ConfigError> {
    raw.parse().map_err(|reason| ConfigError::InvalidValue {
        key,
        value: raw.to_string(),
        reason,
    })
}
