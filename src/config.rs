use std::collections::HashMap;
use std::env;
use std::fs;
use std::time::Duration;

use chrono_tz::Tz;

use crate::clients::backend_client::DEFAULT_BASE_URL;
use crate::models::agent::AgentId;
use crate::models::session::{DayPolicy, Role, SessionContext};

const DEFAULT_REFRESH_SECS: u64 = 30;
const DEFAULT_LOG_FILTER: &str = "info";

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Unable to read config file {path}: {source}")]
    Io {
        path: String,
        source: std::io::Error,
    },
    #[error("Invalid config line {line}: {content}")]
    InvalidLine { line: usize, content: String },
    #[error("{0} must be set")]
    Missing(&'static str),
    #[error("{key} has an invalid value '{value}'")]
    InvalidValue { key: &'static str, value: String },
}

/// `KEY=value` settings read from an optional file, each key falling back to
/// the process environment.
#[derive(Debug, Default, Clone)]
pub struct AppConfig {
    values: HashMap<String, String>,
}

impl AppConfig {
    pub fn from_file(path: &str) -> Result<Self, ConfigError> {
        let content = fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_string(),
            source,
        })?;
        Self::parse(&content)
    }

    pub fn parse(content: &str) -> Result<Self, ConfigError> {
        let mut values = HashMap::new();
        for (idx, line) in content.lines().enumerate() {
            let trimmed = line.trim();
            if trimmed.is_empty() || trimmed.starts_with('#') {
                continue;
            }
            let trimmed = trimmed.strip_prefix("export ").unwrap_or(trimmed);
            let Some((key, value)) = trimmed.split_once('=') else {
                return Err(ConfigError::InvalidLine {
                    line: idx + 1,
                    content: line.to_string(),
                });
            };
            let key = key.trim();
            let mut value = value.trim().to_string();
            if value.len() >= 2
                && ((value.starts_with('"') && value.ends_with('"'))
                    || (value.starts_with('\'') && value.ends_with('\'')))
            {
                value = value[1..value.len() - 1].to_string();
            }
            values.insert(key.to_string(), value);
        }
        Ok(Self { values })
    }

    /// Loads the file named by `CONFIG_FILE`, or an empty config when unset.
    pub fn load() -> Result<Self, ConfigError> {
        match env::var("CONFIG_FILE") {
            Ok(path) => Self::from_file(&path),
            Err(_) => Ok(Self::default()),
        }
    }

    pub fn get(&self, key: &str) -> Option<String> {
        self.values
            .get(key)
            .cloned()
            .or_else(|| env::var(key).ok())
            .filter(|value| !value.trim().is_empty())
    }

    pub fn base_url(&self) -> String {
        self.get("API_BASE_URL")
            .unwrap_or_else(|| DEFAULT_BASE_URL.to_string())
    }

    pub fn refresh_interval(&self) -> Result<Duration, ConfigError> {
        match self.get("REFRESH_INTERVAL_SECS") {
            None => Ok(Duration::from_secs(DEFAULT_REFRESH_SECS)),
            Some(raw) => match raw.trim().parse::<u64>() {
                Ok(secs) if secs > 0 => Ok(Duration::from_secs(secs)),
                _ => Err(ConfigError::InvalidValue {
                    key: "REFRESH_INTERVAL_SECS",
                    value: raw,
                }),
            },
        }
    }

    pub fn log_filter(&self) -> String {
        self.get("LOG_FILTER")
            .or_else(|| self.get("RUST_LOG"))
            .unwrap_or_else(|| DEFAULT_LOG_FILTER.to_string())
    }

    pub fn day_policy(&self) -> Result<DayPolicy, ConfigError> {
        match self.get("CALENDAR_TIMEZONE") {
            None => Ok(DayPolicy::utc()),
            Some(raw) => raw
                .trim()
                .parse::<Tz>()
                .map(DayPolicy::new)
                .map_err(|_| ConfigError::InvalidValue {
                    key: "CALENDAR_TIMEZONE",
                    value: raw,
                }),
        }
    }

    pub fn session(&self) -> Result<SessionContext, ConfigError> {
        let token = self.get("API_TOKEN").ok_or(ConfigError::Missing("API_TOKEN"))?;
        let role = match self.get("SESSION_ROLE") {
            None => Role::Admin,
            Some(raw) => raw.parse::<Role>().map_err(|_| ConfigError::InvalidValue {
                key: "SESSION_ROLE",
                value: raw,
            })?,
        };
        let mut session = SessionContext::new(role, token).with_day_policy(self.day_policy()?);
        match self.get("SESSION_USER_ID") {
            Some(raw) => {
                let id = raw.parse::<AgentId>().map_err(|_| ConfigError::InvalidValue {
                    key: "SESSION_USER_ID",
                    value: raw,
                })?;
                session = session.with_user(id);
            }
            None if role != Role::Admin => return Err(ConfigError::Missing("SESSION_USER_ID")),
            None => {}
        }
        if let Some(name) = self.get("SESSION_DISPLAY_NAME") {
            session = session.with_display_name(name);
        }
        Ok(session)
    }
}
