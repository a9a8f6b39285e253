//! Configuration management for keycadence
//!
//! Settings live in a TOML file in the platform config directory. Missing
//! files fall back to defaults; command-line flags override what is loaded.
//!
//! ## Config File Locations
//!
//! | Platform | Path |
//! |----------|------|
//! | Linux | `~/.config/keycadence/config.toml` |
//! | macOS | `~/Library/Application Support/keycadence/config.toml` |
//! | Windows | `%APPDATA%\keycadence\config.toml` |
//!
//! ## Example
//!
//! ```no_run
//! use keycadence::Config;
//!
//! let config = Config::load().unwrap_or_default();
//! println!("Capture backend: {:?}", config.capture.backend);
//! ```

use serde::{Deserialize, Serialize};
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use std::time::Duration;
use thiserror::Error;

const APP_DIR: &str = "keycadence";
const CONFIG_FILE: &str = "config.toml";

/// Error type for configuration operations
#[derive(Debug, Error)]
pub enum ConfigError {
    /// Failed to determine config directory
    #[error("Could not determine config directory")]
    NoConfigDir,
    /// IO error reading or writing config file
    #[error("IO error: {0}")]
    Io(#[from] io::Error),
    /// Failed to parse config file
    #[error("Parse error: {0}")]
    Parse(#[from] toml::de::Error),
    /// Failed to serialize config
    #[error("Serialize error: {0}")]
    Serialize(#[from] toml::ser::Error),
}

/// Returns the path to the config file.
///
/// # Platform-specific paths
///
/// - Linux: `~/.config/keycadence/config.toml`
/// - macOS: `~/Library/Application Support/keycadence/config.toml`
/// - Windows: `%APPDATA%\keycadence\config.toml`
pub fn config_path() -> Result<PathBuf, ConfigError> {
    let config_dir = dirs::config_dir().ok_or(ConfigError::NoConfigDir)?;
    Ok(config_dir.join(APP_DIR).join(CONFIG_FILE))
}

/// Main application configuration
#[derive(Debug, Clone, Serialize, Deserialize, Default, PartialEq)]
pub struct Config {
    /// Keyboard capture settings
    #[serde(default)]
    pub capture: CaptureConfig,
    /// Report output settings
    #[serde(default)]
    pub report: ReportConfig,
    /// Webhook delivery settings
    #[serde(default)]
    pub webhook: WebhookConfig,
}

/// Which key source records rounds
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default, clap::ValueEnum)]
#[serde(rename_all = "kebab-case")]
pub enum Backend {
    /// evdev on Linux, then the terminal, then device_query
    #[default]
    Auto,
    /// Raw `/dev/input` devices (Linux only)
    Evdev,
    /// Global key state polling via device_query
    DeviceQuery,
    /// The terminal's own key events
    Terminal,
}

/// Keyboard capture configuration
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct CaptureConfig {
    pub backend: Backend,
    /// Sleep between source polls (in milliseconds)
    pub poll_interval_ms: u64,
}

impl Default for CaptureConfig {
    fn default() -> Self {
        Self {
            backend: Backend::Auto,
            poll_interval_ms: 1,
        }
    }
}

/// Report output configuration
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct ReportConfig {
    /// Include per-round detail in the JSON and HTML reports
    pub include_rounds: bool,
    /// Characters of each key label shown in the HTML report
    pub html_key_prefix: usize,
}

impl Default for ReportConfig {
    fn default() -> Self {
        Self {
            include_rounds: true,
            html_key_prefix: 8,
        }
    }
}

/// Body format for webhook posts
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "kebab-case")]
pub enum WebhookFormat {
    /// Discord embed message
    #[default]
    Discord,
    /// Plain `{ metadata, aggregate }` JSON
    Json,
}

/// Webhook configuration
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct WebhookConfig {
    pub format: WebhookFormat,
    /// Request timeout in seconds
    pub timeout_secs: u64,
}

impl Default for WebhookConfig {
    fn default() -> Self {
        Self {
            format: WebhookFormat::Discord,
            timeout_secs: 10,
        }
    }
}

impl Config {
    /// Load configuration from the default config file.
    ///
    /// Returns the default configuration if the file doesn't exist.
    /// Returns an error if the file exists but cannot be parsed.
    pub fn load() -> Result<Self, ConfigError> {
        let path = config_path()?;

        if !path.exists() {
            return Ok(Self::default());
        }

        Self::load_from(&path)
    }

    /// Load configuration from a specific path.
    pub fn load_from(path: &Path) -> Result<Self, ConfigError> {
        let contents = fs::read_to_string(path)?;
        let config: Config = toml::from_str(&contents)?;
        Ok(config)
    }

    /// Save configuration to the default config file, creating its
    /// directory if needed. Returns the path written.
    pub fn save(&self) -> Result<PathBuf, ConfigError> {
        let path = config_path()?;
        if let Some(dir) = path.parent() {
            fs::create_dir_all(dir)?;
        }
        self.save_to(&path)?;
        Ok(path)
    }

    /// Save configuration to a specific path.
    pub fn save_to(&self, path: &Path) -> Result<(), ConfigError> {
        let contents = toml::to_string_pretty(self)?;
        fs::write(path, contents)?;
        Ok(())
    }

    /// Get the source poll interval as Duration
    pub fn poll_interval(&self) -> Duration {
        Duration::from_millis(self.capture.poll_interval_ms)
    }

    /// Get the webhook request timeout as Duration
    pub fn webhook_timeout(&self) -> Duration {
        Duration::from_secs(self.webhook.timeout_secs)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn config_default_values() {
        let config = Config::default();
        assert_eq!(config.capture.backend, Backend::Auto);
        assert_eq!(config.capture.poll_interval_ms, 1);
        assert!(config.report.include_rounds);
        assert_eq!(config.report.html_key_prefix, 8);
        assert_eq!(config.webhook.format, WebhookFormat::Discord);
        assert_eq!(config.webhook.timeout_secs, 10);
    }

    #[test]
    fn config_durations() {
        let config = Config::default();
        assert_eq!(config.poll_interval(), Duration::from_millis(1));
        assert_eq!(config.webhook_timeout(), Duration::from_secs(10));
    }

    #[test]
    fn config_save_and_load_roundtrip() {
        let dir = tempfile::tempdir().expect("tempdir");
        let path = dir.path().join("config.toml");

        let mut config = Config::default();
        config.capture.backend = Backend::Terminal;
        config.webhook.format = WebhookFormat::Json;

        config.save_to(&path).expect("Failed to save config");
        let loaded = Config::load_from(&path).expect("Failed to load config");

        assert_eq!(loaded, config);
    }

    #[test]
    fn config_load_missing_file_fails() {
        let path = PathBuf::from("/nonexistent/path/config.toml");
        assert!(matches!(Config::load_from(&path), Err(ConfigError::Io(_))));
    }

    #[test]
    fn config_serializes_to_toml() {
        let toml_str = toml::to_string_pretty(&Config::default()).expect("Failed to serialize");

        assert!(toml_str.contains("[capture]"));
        assert!(toml_str.contains("[report]"));
        assert!(toml_str.contains("[webhook]"));
        assert!(toml_str.contains("backend = \"auto\""));
        assert!(toml_str.contains("format = \"discord\""));
    }

    #[test]
    fn config_deserializes_partial_toml() {
        let toml_str = r#"
[capture]
backend = "device-query"

[webhook]
timeout_secs = 3
"#;

        let config: Config = toml::from_str(toml_str).expect("Failed to deserialize");

        assert_eq!(config.capture.backend, Backend::DeviceQuery);
        assert_eq!(config.capture.poll_interval_ms, 1);
        assert_eq!(config.webhook.timeout_secs, 3);
        assert_eq!(config.webhook.format, WebhookFormat::Discord);
        assert_eq!(config.report, ReportConfig::default());
    }

    #[test]
    fn config_rejects_unknown_backend() {
        let result: Result<Config, _> = toml::from_str("[capture]\nbackend = \"x11\"\n");
        assert!(result.is_err());
    }

    #[test]
    fn config_error_display() {
        assert_eq!(
            ConfigError::NoConfigDir.to_string(),
            "Could not determine config directory"
        );
        let io_err = ConfigError::Io(io::Error::new(io::ErrorKind::NotFound, "file not found"));
        assert!(io_err.to_string().contains("IO error"));
    }

    #[test]
    fn config_path_ends_with_app_file() {
        if let Ok(path) = config_path() {
            assert!(path.to_string_lossy().contains("keycadence"));
            assert!(path.to_string_lossy().ends_with("config.toml"));
        }
    }
}
