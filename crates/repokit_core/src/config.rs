//! Startup configuration.
//!
//! # Responsibility
//! - Describe database and logging settings loaded from TOML.
//! - Let startup code build collaborators lazily from the loaded config.
//!
//! # Invariants
//! - Every field has a default; an empty document is a valid config.
//! - `validate()` runs before any collaborator is built from a config.

use crate::logging::{default_log_level, normalize_level};
use serde::Deserialize;
use std::path::{Path, PathBuf};
use std::time::Duration;
use thiserror::Error;

const IN_MEMORY_PATH: &str = ":memory:";
const DEFAULT_BUSY_TIMEOUT_MS: u64 = 5_000;
const DEFAULT_MAX_LOG_FILE_SIZE_BYTES: u64 = 10 * 1024 * 1024;
const DEFAULT_MAX_LOG_FILES: usize = 5;

pub type ConfigResult<T> = Result<T, ConfigError>;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config `{}`: {source}", .path.display())]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("failed to parse config: {0}")]
    Parse(#[from] toml::de::Error),
    #[error("invalid config: {0}")]
    Invalid(String),
}

/// Root configuration document.
#[derive(Debug, Clone, PartialEq, Eq, Default, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct CoreConfig {
    pub database: DatabaseConfig,
    pub logging: LoggingConfig,
}

impl CoreConfig {
    /// Parses and validates a TOML document.
    pub fn from_toml_str(source: &str) -> ConfigResult<Self> {
        let config: Self = toml::from_str(source)?;
        config.validate()?;
        Ok(config)
    }

    /// Reads, parses and validates a TOML file.
    pub fn load(path: impl AsRef<Path>) -> ConfigResult<Self> {
        let path = path.as_ref();
        let source = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_toml_str(&source)
    }

    pub fn validate(&self) -> ConfigResult<()> {
        self.database.validate()?;
        self.logging.validate()
    }
}

/// `[database]` section.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct DatabaseConfig {
    /// SQLite file path, or `:memory:` for a private database per handle.
    pub path: PathBuf,
    pub busy_timeout_ms: u64,
    pub foreign_keys: bool,
    /// Batch executed on every freshly opened connection.
    pub init_sql: Option<String>,
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            path: PathBuf::from(IN_MEMORY_PATH),
            busy_timeout_ms: DEFAULT_BUSY_TIMEOUT_MS,
            foreign_keys: true,
            init_sql: None,
        }
    }
}

impl DatabaseConfig {
    pub fn in_memory() -> Self {
        Self::default()
    }

    pub fn file(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            ..Self::default()
        }
    }

    pub fn is_in_memory(&self) -> bool {
        self.path.as_os_str() == IN_MEMORY_PATH
    }

    pub fn busy_timeout(&self) -> Duration {
        Duration::from_millis(self.busy_timeout_ms)
    }

    fn validate(&self) -> ConfigResult<()> {
        if self.path.as_os_str().is_empty() {
            return Err(ConfigError::Invalid(
                "database.path must not be empty".to_string(),
            ));
        }
        if self.busy_timeout_ms == 0 {
            return Err(ConfigError::Invalid(
                "database.busy_timeout_ms must be greater than zero".to_string(),
            ));
        }
        Ok(())
    }
}

/// `[logging]` section.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct LoggingConfig {
    /// One of `trace|debug|info|warn|error`.
    pub level: String,
    /// Absolute directory for rotating log files; stderr when unset.
    pub directory: Option<PathBuf>,
    pub max_file_size_bytes: u64,
    pub max_files: usize,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level().to_string(),
            directory: None,
            max_file_size_bytes: DEFAULT_MAX_LOG_FILE_SIZE_BYTES,
            max_files: DEFAULT_MAX_LOG_FILES,
        }
    }
}

impl LoggingConfig {
    fn validate(&self) -> ConfigResult<()> {
        normalize_level(&self.level).map_err(|err| ConfigError::Invalid(err.to_string()))?;
        if self.max_files == 0 {
            return Err(ConfigError::Invalid(
                "logging.max_files must be greater than zero".to_string(),
            ));
        }
        if self.max_file_size_bytes == 0 {
            return Err(ConfigError::Invalid(
                "logging.max_file_size_bytes must be greater than zero".to_string(),
            ));
        }
        Ok(())
    }
}

/// Builds an object from the loaded configuration during startup.
///
/// Closures `Fn(&CoreConfig) -> T` implement this trait, so a bundle can be
/// declared before the configuration exists and construct its collaborators
/// once it does.
pub trait ConfigAwareProvider<T> {
    fn get(&self, config: &CoreConfig) -> T;
}

impl<T, P> ConfigAwareProvider<T> for P
where
    P: Fn(&CoreConfig) -> T,
{
    fn get(&self, config: &CoreConfig) -> T {
        self(config)
    }
}

#[cfg(test)]
mod tests {
    use super::{ConfigAwareProvider, ConfigError, CoreConfig, DatabaseConfig};
    use std::path::PathBuf;

    #[test]
    fn empty_document_uses_defaults() {
        let config = CoreConfig::from_toml_str("").expect("empty config");
        assert_eq!(config, CoreConfig::default());
        assert!(config.database.is_in_memory());
        assert!(config.logging.directory.is_none());
    }

    #[test]
    fn parses_database_and_logging_sections() {
        let config = CoreConfig::from_toml_str(
            r#"
            [database]
            path = "/var/lib/repokit/app.sqlite3"
            busy_timeout_ms = 250
            foreign_keys = false
            init_sql = "PRAGMA journal_mode = WAL;"

            [logging]
            level = "debug"
            directory = "/var/log/repokit"
            max_files = 2
            "#,
        )
        .expect("full config");

        assert_eq!(
            config.database.path,
            PathBuf::from("/var/lib/repokit/app.sqlite3")
        );
        assert_eq!(config.database.busy_timeout().as_millis(), 250);
        assert!(!config.database.foreign_keys);
        assert!(!config.database.is_in_memory());
        assert_eq!(config.logging.level, "debug");
        assert_eq!(config.logging.max_files, 2);
    }

    #[test]
    fn rejects_unknown_fields() {
        let err = CoreConfig::from_toml_str("[database]\npool_size = 4\n")
            .expect_err("unknown field must fail");
        assert!(matches!(err, ConfigError::Parse(_)));
    }

    #[test]
    fn rejects_zero_busy_timeout() {
        let err = CoreConfig::from_toml_str("[database]\nbusy_timeout_ms = 0\n")
            .expect_err("zero timeout must fail");
        assert!(err.to_string().contains("busy_timeout_ms"));
    }

    #[test]
    fn rejects_unsupported_log_level() {
        let err = CoreConfig::from_toml_str("[logging]\nlevel = \"loud\"\n")
            .expect_err("unknown level must fail");
        assert!(matches!(err, ConfigError::Invalid(_)));
    }

    #[test]
    fn load_reports_missing_file() {
        let err = CoreConfig::load("/definitely/not/here/repokit.toml")
            .expect_err("missing file must fail");
        assert!(matches!(err, ConfigError::Read { .. }));
    }

    #[test]
    fn closures_act_as_config_aware_providers() {
        let provider = |config: &CoreConfig| config.database.busy_timeout_ms * 2;
        let config = CoreConfig {
            database: DatabaseConfig {
                busy_timeout_ms: 21,
                ..DatabaseConfig::default()
            },
            ..CoreConfig::default()
        };
        assert_eq!(provider.get(&config), 42);
    }
}
