//! Runtime configuration for hosts embedding the relationship graph.
//!
//! # Responsibility
//! - Resolve database and logging settings from the environment.
//! - Open the configured store with the full schema applied.
//!
//! # Invariants
//! - A missing database path selects a private in-memory store.
//! - The log level is validated when the config is built, not at first use.

use crate::db::{open_db, open_db_in_memory, DbResult};
use crate::logging::{default_log_level, init_logging, normalize_level, LoggingError};
use rusqlite::Connection;
use std::error::Error;
use std::fmt::{Display, Formatter};
use std::path::PathBuf;

pub const DB_PATH_ENV: &str = "FAMILY_GRAPH_DB";
pub const LOG_LEVEL_ENV: &str = "FAMILY_GRAPH_LOG_LEVEL";
pub const LOG_DIR_ENV: &str = "FAMILY_GRAPH_LOG_DIR";

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConfigError {
    InvalidLogLevel(LoggingError),
    /// Variable is set but not valid unicode.
    InvalidVar(&'static str),
}

impl Display for ConfigError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::InvalidLogLevel(err) => write!(f, "{err}"),
            Self::InvalidVar(name) => write!(f, "environment variable {name} is not valid unicode"),
        }
    }
}

impl Error for ConfigError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::InvalidLogLevel(err) => Some(err),
            Self::InvalidVar(_) => None,
        }
    }
}

/// Database and logging settings.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GraphConfig {
    /// `None` opens an in-memory store.
    pub db_path: Option<PathBuf>,
    pub log_level: &'static str,
    /// `None` leaves logging uninitialized.
    pub log_dir: Option<PathBuf>,
}

impl Default for GraphConfig {
    fn default() -> Self {
        Self {
            db_path: None,
            log_level: default_log_level(),
            log_dir: None,
        }
    }
}

impl GraphConfig {
    /// Reads `FAMILY_GRAPH_DB`, `FAMILY_GRAPH_LOG_LEVEL` and `FAMILY_GRAPH_LOG_DIR`.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|name| match std::env::var(name) {
            Ok(value) => Ok(Some(value)),
            Err(std::env::VarError::NotPresent) => Ok(None),
            Err(std::env::VarError::NotUnicode(_)) => Err(ConfigError::InvalidVar(name)),
        })
    }

    /// Builds a config from an arbitrary variable source.
    ///
    /// Blank values count as unset.
    pub fn from_lookup<L>(mut lookup: L) -> Result<Self, ConfigError>
    where
        L: FnMut(&'static str) -> Result<Option<String>, ConfigError>,
    {
        let mut read = |name: &'static str| -> Result<Option<String>, ConfigError> {
            Ok(lookup(name)?
                .map(|value| value.trim().to_string())
                .filter(|value| !value.is_empty()))
        };

        let log_level = match read(LOG_LEVEL_ENV)? {
            Some(value) => normalize_level(&value).map_err(ConfigError::InvalidLogLevel)?,
            None => default_log_level(),
        };

        Ok(Self {
            db_path: read(DB_PATH_ENV)?.map(PathBuf::from),
            log_level,
            log_dir: read(LOG_DIR_ENV)?.map(PathBuf::from),
        })
    }

    /// Starts file logging when a log directory is configured.
    pub fn init_logging(&self) -> Result<bool, LoggingError> {
        match &self.log_dir {
            Some(dir) => init_logging(self.log_level, dir).map(|()| true),
            None => Ok(false),
        }
    }

    /// Opens the configured database with migrations applied.
    pub fn open_db(&self) -> DbResult<Connection> {
        match &self.db_path {
            Some(path) => open_db(path),
            None => open_db_in_memory(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::{ConfigError, GraphConfig, DB_PATH_ENV, LOG_DIR_ENV, LOG_LEVEL_ENV};
    use crate::logging::{default_log_level, LoggingError};
    use std::collections::HashMap;
    use std::path::PathBuf;

    fn config_from(vars: &[(&'static str, &str)]) -> Result<GraphConfig, ConfigError> {
        let vars: HashMap<&str, String> = vars
            .iter()
            .map(|(name, value)| (*name, value.to_string()))
            .collect();
        GraphConfig::from_lookup(|name| Ok(vars.get(name).cloned()))
    }

    #[test]
    fn empty_environment_uses_defaults() {
        let config = config_from(&[]).unwrap();
        assert_eq!(config, GraphConfig::default());
        assert_eq!(config.log_level, default_log_level());
    }

    #[test]
    fn variables_are_trimmed_and_level_is_normalized() {
        let config = config_from(&[
            (DB_PATH_ENV, " /var/lib/graph.db "),
            (LOG_LEVEL_ENV, "WARNING"),
            (LOG_DIR_ENV, "   "),
        ])
        .unwrap();
        assert_eq!(config.db_path, Some(PathBuf::from("/var/lib/graph.db")));
        assert_eq!(config.log_level, "warn");
        assert_eq!(config.log_dir, None);
    }

    #[test]
    fn unknown_level_is_rejected() {
        let err = config_from(&[(LOG_LEVEL_ENV, "loud")]).unwrap_err();
        assert_eq!(
            err,
            ConfigError::InvalidLogLevel(LoggingError::UnsupportedLevel("loud".to_string()))
        );
    }

    #[test]
    fn default_config_opens_in_memory_store() {
        let conn = GraphConfig::default().open_db().unwrap();
        let version: u32 = conn
            .query_row("PRAGMA user_version;", [], |row| row.get(0))
            .unwrap();
        assert_eq!(version, crate::db::migrations::latest_version());
    }

    #[test]
    fn file_store_is_created_at_configured_path() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("graph.sqlite3");
        let config = GraphConfig {
            db_path: Some(path.clone()),
            ..GraphConfig::default()
        };
        drop(config.open_db().unwrap());
        assert!(path.exists());
    }
}
