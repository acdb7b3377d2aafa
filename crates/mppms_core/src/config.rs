//! Layered runtime configuration.
//!
//! # Responsibility
//! - Resolve settings from defaults, an optional JSON file and environment
//!   variables, in that priority order.
//!
//! # Invariants
//! - Unknown JSON fields are rejected.
//! - `max_cascade_rounds` is at least 1.
//! - `log_level` names a known level.

use crate::events::bus::{ChangeBus, DEFAULT_MAX_ROUNDS};
use crate::logging::{default_log_level, LogLevel};
use serde::Deserialize;
use std::error::Error;
use std::fmt::{Display, Formatter};
use std::path::{Path, PathBuf};

pub const ENV_LOG_LEVEL: &str = "MPPMS_LOG_LEVEL";
pub const ENV_LOG_DIR: &str = "MPPMS_LOG_DIR";
pub const ENV_DB_PATH: &str = "MPPMS_DB_PATH";
pub const ENV_MAX_CASCADE_ROUNDS: &str = "MPPMS_MAX_CASCADE_ROUNDS";

#[derive(Debug)]
pub enum ConfigError {
    Io {
        path: PathBuf,
        source: std::io::Error,
    },
    Parse(serde_json::Error),
    Invalid {
        field: &'static str,
        message: String,
    },
}

impl Display for ConfigError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Io { path, source } => {
                write!(f, "failed to read config `{}`: {source}", path.display())
            }
            Self::Parse(err) => write!(f, "invalid config json: {err}"),
            Self::Invalid { field, message } => write!(f, "invalid `{field}`: {message}"),
        }
    }
}

impl Error for ConfigError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Io { source, .. } => Some(source),
            Self::Parse(err) => Some(err),
            Self::Invalid { .. } => None,
        }
    }
}

impl From<serde_json::Error> for ConfigError {
    fn from(value: serde_json::Error) -> Self {
        Self::Parse(value)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct CoreConfig {
    pub log_level: String,
    /// Absolute directory for rolling log files; no file logging when unset.
    pub log_dir: Option<PathBuf>,
    /// SQLite file; an in-memory store when unset.
    pub database_path: Option<PathBuf>,
    /// Events one dispatch may deliver before the rest are dropped.
    pub max_cascade_rounds: usize,
}

impl Default for CoreConfig {
    fn default() -> Self {
        Self {
            log_level: default_log_level().to_string(),
            log_dir: None,
            database_path: None,
            max_cascade_rounds: DEFAULT_MAX_ROUNDS,
        }
    }
}

impl CoreConfig {
    pub fn from_json_str(raw: &str) -> Result<Self, ConfigError> {
        let config: Self = serde_json::from_str(raw)?;
        config.validate()?;
        Ok(config)
    }

    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        let raw = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_json_str(&raw)
    }

    /// Defaults, then `path` when given, then process environment.
    pub fn load(path: Option<&Path>) -> Result<Self, ConfigError> {
        let base = match path {
            Some(path) => Self::from_file(path)?,
            None => Self::default(),
        };
        base.with_env(|key| std::env::var(key).ok())
    }

    /// Overlays variables resolved through `lookup`; blank values are ignored.
    pub fn with_env(
        mut self,
        lookup: impl Fn(&str) -> Option<String>,
    ) -> Result<Self, ConfigError> {
        let read = |key: &str| lookup(key).filter(|value| !value.trim().is_empty());

        if let Some(level) = read(ENV_LOG_LEVEL) {
            self.log_level = level.trim().to_string();
        }
        if let Some(dir) = read(ENV_LOG_DIR) {
            self.log_dir = Some(PathBuf::from(dir.trim()));
        }
        if let Some(path) = read(ENV_DB_PATH) {
            self.database_path = Some(PathBuf::from(path.trim()));
        }
        if let Some(rounds) = read(ENV_MAX_CASCADE_ROUNDS) {
            self.max_cascade_rounds = rounds.trim().parse().map_err(|err| ConfigError::Invalid {
                field: "max_cascade_rounds",
                message: format!("{err}"),
            })?;
        }
        self.validate()?;
        Ok(self)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if LogLevel::parse(&self.log_level).is_none() {
            return Err(ConfigError::Invalid {
                field: "log_level",
                message: format!("unsupported level `{}`", self.log_level),
            });
        }
        if self.max_cascade_rounds == 0 {
            return Err(ConfigError::Invalid {
                field: "max_cascade_rounds",
                message: "must be at least 1".to_string(),
            });
        }
        if let Some(dir) = &self.log_dir {
            if !dir.is_absolute() {
                return Err(ConfigError::Invalid {
                    field: "log_dir",
                    message: format!("must be absolute, got `{}`", dir.display()),
                });
            }
        }
        Ok(())
    }

    pub fn change_bus(&self) -> ChangeBus {
        ChangeBus::with_max_rounds(self.max_cascade_rounds)
    }
}
