//! # cfredir-config
//!
//! Configuration management for the cfredir file-open redirector.
//!
//! Loads configuration from:
//! 1. Built-in defaults
//! 2. `~/.cfredir/config.toml` (global)
//! 3. Environment variables (highest priority)

pub mod logging;
pub mod testing;

use once_cell::sync::Lazy;
use serde::{Deserialize, Serialize};
use std::ffi::OsString;
use std::path::{Path, PathBuf};
use std::sync::{RwLock, RwLockReadGuard};

/// Global config instance
static CONFIG: Lazy<RwLock<Config>> = Lazy::new(|| {
    RwLock::new(Config::load_or_disabled(
        Config::global_config_path().as_deref(),
        |key| std::env::var(key).ok(),
    ))
});

/// Get global config (read-only)
pub fn config() -> RwLockReadGuard<'static, Config> {
    // A poisoned lock still holds a fully written Config.
    CONFIG.read().unwrap_or_else(|e| e.into_inner())
}

/// Reload config from disk
pub fn reload() -> Result<(), ConfigError> {
    let new_config = Config::load()?;
    *CONFIG.write().unwrap_or_else(|e| e.into_inner()) = new_config;
    Ok(())
}

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("TOML parse error: {0}")]
    Toml(#[from] toml::de::Error),
    #[error("invalid protected-root segment {name}: {value:?}")]
    InvalidSegment { name: &'static str, value: String },
}

/// Main configuration structure
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub redirect: RedirectConfig,
    pub logging: LoggingConfig,
}

impl Config {
    /// Load config from standard locations
    pub fn load() -> Result<Self, ConfigError> {
        Self::load_layered(Self::global_config_path().as_deref(), |key| {
            std::env::var(key).ok()
        })
    }

    /// Defaults, then the file at `global` if it exists, then `env`.
    pub fn load_layered(
        global: Option<&Path>,
        env: impl Fn(&str) -> Option<String>,
    ) -> Result<Self, ConfigError> {
        let mut config = match global {
            Some(path) if path.exists() => Self::load_from(path)?,
            _ => Config::default(),
        };
        config.apply_overrides(env);
        Ok(config)
    }

    /// Like [`Config::load_layered`], but a file that cannot be read or
    /// parsed turns redirection off instead of failing. `env` is still
    /// applied on top, so it can re-enable it.
    pub fn load_or_disabled(global: Option<&Path>, env: impl Fn(&str) -> Option<String>) -> Self {
        match Self::load_layered(global, &env) {
            Ok(config) => config,
            Err(err) => {
                log_config_warn!(
                    "config file unusable, redirection disabled",
                    error = tracing::field::display(&err)
                );
                let mut config = Config::default();
                config.redirect.enabled = false;
                config.apply_overrides(env);
                config
            }
        }
    }

    /// Load a single TOML file without applying environment overrides.
    pub fn load_from(path: &Path) -> Result<Self, ConfigError> {
        log_config_debug!(
            "loading config file",
            path = tracing::field::display(path.display())
        );
        let contents = std::fs::read_to_string(path)?;
        Ok(toml::from_str(&contents)?)
    }

    /// Global config path: ~/.cfredir/config.toml
    pub fn global_config_path() -> Option<PathBuf> {
        home_dir().map(|h| h.join(".cfredir").join("config.toml"))
    }

    /// Apply environment variable overrides
    pub fn apply_env_overrides(&mut self) {
        self.apply_overrides(|key| std::env::var(key).ok());
    }

    fn apply_overrides(&mut self, lookup: impl Fn(&str) -> Option<String>) {
        if let Some(value) = lookup("CFREDIR_ENABLED") {
            self.redirect.enabled = !matches!(
                value.trim().to_ascii_lowercase().as_str(),
                "0" | "false" | "off" | "no"
            );
        }
        if let Some(dir) = lookup("CFREDIR_APP_DIR") {
            self.redirect.app_dir = dir;
        }
        if let Some(dir) = lookup("CFREDIR_USER_DATA_DIR") {
            self.redirect.user_data_dir = dir;
        }
        if let Some(level) = lookup("CFREDIR_LOG") {
            self.logging.level = level;
        }
    }

    /// Generate default config TOML string
    pub fn default_toml() -> String {
        toml::to_string_pretty(&Config::default()).unwrap_or_default()
    }
}

#[cfg(not(windows))]
fn home_dir() -> Option<PathBuf> {
    dirs::home_dir()
}

#[cfg(windows)]
fn home_dir() -> Option<PathBuf> {
    profile_dir(|key| std::env::var_os(key))
}

/// `%USERPROFILE%`, read without touching the shell libraries.
#[cfg_attr(not(windows), allow(dead_code))]
fn profile_dir(env: impl Fn(&str) -> Option<OsString>) -> Option<PathBuf> {
    env("USERPROFILE")
        .filter(|dir| !dir.is_empty())
        .map(PathBuf::from)
        .filter(|dir| dir.is_absolute())
}

/// Redirect policy configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RedirectConfig {
    /// Master switch for the bypass path
    pub enabled: bool,
    /// First segment appended to the local app-data folder
    pub app_dir: String,
    /// Second segment, the user-data directory itself
    pub user_data_dir: String,
}

impl Default for RedirectConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            app_dir: "Cfredir".to_string(),
            user_data_dir: "User Data".to_string(),
        }
    }
}

impl RedirectConfig {
    /// The two protected-root segments, in append order.
    ///
    /// Each must be a single relative path component. Anything that could
    /// walk out of the local app-data folder is rejected.
    pub fn segments(&self) -> Result<[&str; 2], ConfigError> {
        Ok([
            validate_segment("app_dir", &self.app_dir)?,
            validate_segment("user_data_dir", &self.user_data_dir)?,
        ])
    }
}

fn validate_segment<'a>(name: &'static str, value: &'a str) -> Result<&'a str, ConfigError> {
    let bad = value.is_empty()
        || value == "."
        || value == ".."
        || value.contains(['\\', '/', ':', '\0'])
        || value.trim() != value;
    if bad {
        return Err(ConfigError::InvalidSegment {
            name,
            value: value.to_string(),
        });
    }
    Ok(value)
}

/// Logging configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// Default filter when RUST_LOG is not set
    pub level: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "warn".to_string(),
        }
    }
}

impl LoggingConfig {
    pub fn log_level(&self) -> logging::LogLevel {
        self.level.parse().unwrap_or(logging::LogLevel::Warn)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn overrides(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| map.get(key).cloned()
    }

    #[test]
    fn test_default_config() {
        let config = Config::default();
        assert!(config.redirect.enabled);
        assert_eq!(config.redirect.segments().unwrap(), ["Cfredir", "User Data"]);
        assert_eq!(config.logging.log_level(), logging::LogLevel::Warn);
    }

    #[test]
    fn test_default_toml_generation() {
        let toml_str = Config::default_toml();
        assert!(toml_str.contains("[redirect]"));
        assert!(toml_str.contains("[logging]"));
        assert!(toml_str.contains("User Data"));
    }

    #[test]
    fn test_partial_toml_keeps_defaults() {
        let config: Config = toml::from_str("[redirect]\napp_dir = \"Acme\"\n").unwrap();
        assert_eq!(config.redirect.app_dir, "Acme");
        assert_eq!(config.redirect.user_data_dir, "User Data");
        assert!(config.redirect.enabled);
    }

    #[test]
    fn test_env_overrides() {
        let mut config = Config::default();
        config.apply_overrides(overrides(&[
            ("CFREDIR_ENABLED", "off"),
            ("CFREDIR_APP_DIR", "Acme"),
            ("CFREDIR_USER_DATA_DIR", "Profile"),
            ("CFREDIR_LOG", "debug"),
        ]));
        assert!(!config.redirect.enabled);
        assert_eq!(config.redirect.segments().unwrap(), ["Acme", "Profile"]);
        assert_eq!(config.logging.log_level(), logging::LogLevel::Debug);
    }

    #[test]
    fn test_enabled_override_accepts_truthy_values() {
        let mut config = Config::default();
        config.redirect.enabled = false;
        config.apply_overrides(overrides(&[("CFREDIR_ENABLED", "1")]));
        assert!(config.redirect.enabled);
    }

    #[test]
    fn test_profile_dir_from_environment() {
        let profile = std::env::temp_dir().join("alice");
        let found = profile_dir(|key| {
            (key == "USERPROFILE").then(|| profile.clone().into_os_string())
        });
        assert_eq!(found, Some(profile));
        assert_eq!(profile_dir(|_| None), None);
        assert_eq!(profile_dir(|_| Some(OsString::new())), None);
        assert_eq!(profile_dir(|_| Some(OsString::from("relative"))), None);
    }

    #[test]
    fn test_segments_reject_traversal() {
        for bad in ["", "..", ".", "a\\b", "a/b", "C:", " pad"] {
            let cfg = RedirectConfig {
                app_dir: bad.to_string(),
                ..RedirectConfig::default()
            };
            assert!(
                matches!(cfg.segments(), Err(ConfigError::InvalidSegment { name: "app_dir", .. })),
                "segment {bad:?} should be rejected"
            );
        }
    }
}
