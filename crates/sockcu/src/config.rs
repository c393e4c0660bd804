//! Configuration management for sockcu.
//!
//! This module provides TOML-based configuration file loading and saving.
//! The default configuration path is `~/.config/sockcu/config.toml`.
//! Command line flags are applied on top by the binary.

use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use escape::{EscapeDetector, EscapeError};
use serde::Deserialize;
use thiserror::Error;

/// Configuration validation errors.
#[derive(Debug, Error, PartialEq)]
pub enum ConfigError {
    #[error("escape_char must be a single printable character other than '.', got {0:?}")]
    InvalidEscapeChar(String),

    #[error("buffer_size must be between 1 and {max}, got {0}", max = MAX_BUFFER_SIZE)]
    InvalidBufferSize(usize),

    #[error("log_level must be one of: trace, debug, info, warn, error; got {0}")]
    InvalidLogLevel(String),

    #[error("{0}")]
    Load(String),
}

/// Valid log level values for tracing configuration.
const VALID_LOG_LEVELS: &[&str] = &["trace", "debug", "info", "warn", "error"];

/// Bytes read per wake-up unless configured otherwise.
pub const DEFAULT_BUFFER_SIZE: usize = 128;

/// Upper bound for `buffer_size`.
pub const MAX_BUFFER_SIZE: usize = 64 * 1024;

/// Main configuration structure for sockcu.
#[derive(Debug, Clone, Deserialize, PartialEq, Default)]
#[serde(default)]
pub struct Config {
    /// Relay session configuration.
    pub session: SessionConfig,

    /// Diagnostic logging configuration.
    pub logging: LoggingConfig,
}

/// Relay session configuration.
#[derive(Debug, Clone, Deserialize, PartialEq)]
#[serde(default)]
pub struct SessionConfig {
    /// Middle character of the `CR <escape> .` termination sequence.
    pub escape_char: String,

    /// Maximum bytes read from either side per wake-up.
    pub buffer_size: usize,

    /// Traffic log used when `-l` is not given.
    pub log_file: Option<PathBuf>,
}

/// Diagnostic logging configuration.
#[derive(Debug, Clone, Deserialize, PartialEq)]
#[serde(default)]
pub struct LoggingConfig {
    /// Logging level (trace, debug, info, warn, error).
    pub level: String,

    /// Write diagnostics here instead of stderr.
    pub file: Option<PathBuf>,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            escape_char: "~".to_string(),
            buffer_size: DEFAULT_BUFFER_SIZE,
            log_file: None,
        }
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            // Anything chattier lands on top of the remote console.
            level: "warn".to_string(),
            file: None,
        }
    }
}

/// Returns the default configuration file path.
pub fn default_config_path() -> PathBuf {
    dirs::config_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join("sockcu")
        .join("config.toml")
}

impl Config {
    /// Apply environment variable overrides to the configuration.
    ///
    /// Environment variables take precedence over config file values.
    /// Supported variables:
    /// - SOCKCU_LOG_LEVEL: Override log level (trace, debug, info, warn, error)
    /// - SOCKCU_ESCAPE_CHAR: Override the escape character
    pub fn apply_env_overrides(&mut self) {
        if let Ok(level) = std::env::var("SOCKCU_LOG_LEVEL") {
            if !level.is_empty() {
                tracing::debug!("Overriding log level from environment: {}", level);
                self.logging.level = level;
            }
        }

        if let Ok(escape) = std::env::var("SOCKCU_ESCAPE_CHAR") {
            if !escape.is_empty() {
                tracing::debug!("Overriding escape_char from environment: {:?}", escape);
                self.session.escape_char = escape;
            }
        }
    }

    /// Validate the configuration values.
    ///
    /// Returns an error if any configuration value is outside the valid range.
    pub fn validate(&self) -> Result<(), ConfigError> {
        self.escape_detector()?;

        if self.session.buffer_size == 0 || self.session.buffer_size > MAX_BUFFER_SIZE {
            return Err(ConfigError::InvalidBufferSize(self.session.buffer_size));
        }

        let level = self.logging.level.to_lowercase();
        if !VALID_LOG_LEVELS.contains(&level.as_str()) {
            return Err(ConfigError::InvalidLogLevel(self.logging.level.clone()));
        }

        Ok(())
    }

    /// Build an escape detector for the configured escape character.
    pub fn escape_detector(&self) -> Result<EscapeDetector, ConfigError> {
        let invalid = || ConfigError::InvalidEscapeChar(self.session.escape_char.clone());

        let byte = match self.session.escape_char.as_bytes() {
            [byte] => *byte,
            _ => return Err(invalid()),
        };

        EscapeDetector::with_escape_char(byte).map_err(|e: EscapeError| {
            tracing::debug!("Rejected escape character: {}", e);
            invalid()
        })
    }

    /// Load configuration from a file.
    ///
    /// If the file does not exist, returns the default configuration.
    /// If the file exists but is invalid TOML, returns an error with
    /// a helpful message.
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();

        if !path.exists() {
            tracing::debug!("Config file not found at {:?}, using defaults", path);
            return Ok(Self::default());
        }

        let contents = fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {}", path.display()))?;

        Self::from_toml(&contents)
            .with_context(|| format!("Failed to parse config file: {}", path.display()))
    }

    /// Load configuration from the default path.
    pub fn load_default() -> Result<Self> {
        Self::load(default_config_path())
    }

    /// Parse configuration from a TOML string.
    pub fn from_toml(toml_str: &str) -> Result<Self> {
        toml::from_str(toml_str)
            .map_err(|e| anyhow::anyhow!("Invalid TOML configuration: {}", format_toml_error(&e)))
    }
}

/// Format a TOML deserialization error for user-friendly display.
fn format_toml_error(error: &toml::de::Error) -> String {
    let mut msg = error.message().to_string();

    if let Some(span) = error.span() {
        msg.push_str(&format!(" (at position {}..{})", span.start, span.end));
    }

    msg
}

#[cfg(test)]
mod tests {
    use super::*;
    use serial_test::serial;
    use tempfile::TempDir;

    #[test]
    fn test_default_config() {
        let config = Config::default();
        assert_eq!(config.session.escape_char, "~");
        assert_eq!(config.session.buffer_size, 128);
        assert!(config.session.log_file.is_none());
        assert_eq!(config.logging.level, "warn");
        assert!(config.logging.file.is_none());
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_from_toml_empty() {
        let config = Config::from_toml("").unwrap();
        assert_eq!(config, Config::default());
    }

    #[test]
    fn test_from_toml_partial() {
        let config = Config::from_toml(
            r#"
            [session]
            buffer_size = 4096
            "#,
        )
        .unwrap();

        assert_eq!(config.session.buffer_size, 4096);
        assert_eq!(config.session.escape_char, "~");
        assert_eq!(config.logging, LoggingConfig::default());
    }

    #[test]
    fn test_from_toml_full() {
        let config = Config::from_toml(
            r#"
            [session]
            escape_char = "%"
            buffer_size = 512
            log_file = "/var/log/console.log"

            [logging]
            level = "debug"
            file = "/tmp/sockcu.trace"
            "#,
        )
        .unwrap();

        assert_eq!(config.session.escape_char, "%");
        assert_eq!(config.session.buffer_size, 512);
        assert_eq!(
            config.session.log_file,
            Some(PathBuf::from("/var/log/console.log"))
        );
        assert_eq!(config.logging.level, "debug");
        assert_eq!(config.logging.file, Some(PathBuf::from("/tmp/sockcu.trace")));
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_from_toml_invalid_syntax() {
        let result = Config::from_toml("[session\nbuffer_size = 1");
        assert!(result.is_err());
        let msg = result.unwrap_err().to_string();
        assert!(msg.contains("Invalid TOML configuration"));
    }

    #[test]
    fn test_from_toml_wrong_type() {
        let result = Config::from_toml(
            r#"
            [session]
            buffer_size = "large"
            "#,
        );
        assert!(result.is_err());
    }

    #[test]
    fn test_unknown_fields_ignored() {
        let config = Config::from_toml(
            r#"
            [session]
            baud = 9600

            [extra]
            key = "value"
            "#,
        )
        .unwrap();
        assert_eq!(config, Config::default());
    }

    #[test]
    fn test_load_missing_file() {
        let temp_dir = TempDir::new().unwrap();
        let config = Config::load(temp_dir.path().join("missing.toml")).unwrap();
        assert_eq!(config, Config::default());
    }

    #[test]
    fn test_load_invalid_file() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("config.toml");
        fs::write(&path, "not = [valid").unwrap();

        let err = Config::load(&path).unwrap_err();
        assert!(format!("{:#}", err).contains("Failed to parse config file"));
    }

    #[test]
    fn test_default_config_path() {
        let path = default_config_path();
        assert!(path.ends_with("sockcu/config.toml"));
    }

    #[test]
    fn test_buffer_size_error_message() {
        assert_eq!(
            ConfigError::InvalidBufferSize(0).to_string(),
            format!("buffer_size must be between 1 and {}, got 0", MAX_BUFFER_SIZE)
        );
    }

    #[test]
    fn test_validate_buffer_size() {
        let mut config = Config::default();

        config.session.buffer_size = 0;
        assert_eq!(config.validate(), Err(ConfigError::InvalidBufferSize(0)));

        config.session.buffer_size = MAX_BUFFER_SIZE + 1;
        assert_eq!(
            config.validate(),
            Err(ConfigError::InvalidBufferSize(MAX_BUFFER_SIZE + 1))
        );

        config.session.buffer_size = 1;
        assert!(config.validate().is_ok());

        config.session.buffer_size = MAX_BUFFER_SIZE;
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_validate_escape_char() {
        let mut config = Config::default();

        for bad in ["", "~~", ".", " ", "\r", "é"] {
            config.session.escape_char = bad.to_string();
            assert_eq!(
                config.validate(),
                Err(ConfigError::InvalidEscapeChar(bad.to_string())),
                "{:?} should be rejected",
                bad
            );
        }

        config.session.escape_char = "%".to_string();
        assert!(config.validate().is_ok());
        assert_eq!(config.escape_detector().unwrap().escape_char(), b'%');
    }

    #[test]
    fn test_validate_log_level() {
        let mut config = Config::default();

        config.logging.level = "verbose".to_string();
        assert_eq!(
            config.validate(),
            Err(ConfigError::InvalidLogLevel("verbose".to_string()))
        );

        config.logging.level = "DEBUG".to_string();
        assert!(config.validate().is_ok());
    }

    #[test]
    #[serial]
    fn test_env_override_log_level() {
        std::env::remove_var("SOCKCU_ESCAPE_CHAR");
        std::env::set_var("SOCKCU_LOG_LEVEL", "trace");

        let mut config = Config::default();
        config.apply_env_overrides();
        assert_eq!(config.logging.level, "trace");

        std::env::remove_var("SOCKCU_LOG_LEVEL");
    }

    #[test]
    #[serial]
    fn test_env_override_escape_char() {
        std::env::remove_var("SOCKCU_LOG_LEVEL");
        std::env::set_var("SOCKCU_ESCAPE_CHAR", "#");

        let mut config = Config::default();
        config.apply_env_overrides();
        assert_eq!(config.session.escape_char, "#");

        std::env::remove_var("SOCKCU_ESCAPE_CHAR");
    }

    #[test]
    #[serial]
    fn test_env_override_empty_does_not_override() {
        std::env::set_var("SOCKCU_LOG_LEVEL", "");
        std::env::set_var("SOCKCU_ESCAPE_CHAR", "");

        let mut config = Config::default();
        config.apply_env_overrides();
        assert_eq!(config, Config::default());

        std::env::remove_var("SOCKCU_LOG_LEVEL");
        std::env::remove_var("SOCKCU_ESCAPE_CHAR");
    }

    #[test]
    #[serial]
    fn test_env_override_unset_does_not_override() {
        std::env::remove_var("SOCKCU_LOG_LEVEL");
        std::env::remove_var("SOCKCU_ESCAPE_CHAR");

        let mut config = Config::default();
        config.apply_env_overrides();
        assert_eq!(config, Config::default());
    }
}
