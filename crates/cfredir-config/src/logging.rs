//! Structured logging utilities for cfredir components.
//!
//! Provides consistent logging with component prefixes and structured fields.
//!
//! # Usage
//!
//! ```ignore
//! use cfredir_config::log_redirect_debug;
//!
//! log_redirect_debug!("native create failed", status = 0xC000_0022u32);
//! ```

use std::str::FromStr;

/// Component identifiers for log filtering
pub struct Component;

impl Component {
    pub const REDIRECT: &'static str = "REDIRECT";
    pub const SYMBOLS: &'static str = "SYMBOLS";
    pub const CONFIG: &'static str = "CONFIG";
}

/// Log levels for runtime configuration
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogLevel {
    Error,
    Warn,
    Info,
    Debug,
    Trace,
}

impl LogLevel {
    pub fn as_filter(self) -> &'static str {
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
        match s.trim().to_ascii_lowercase().as_str() {
            "error" => Ok(LogLevel::Error),
            "warn" | "warning" => Ok(LogLevel::Warn),
            "info" => Ok(LogLevel::Info),
            "debug" => Ok(LogLevel::Debug),
            "trace" => Ok(LogLevel::Trace),
            other => Err(format!("unknown log level: {other}")),
        }
    }
}

// === REDIRECT logging macros ===

#[macro_export]
macro_rules! log_redirect_warn {
    ($msg:literal $(, $key:ident = $value:expr)* $(,)?) => {
        tracing::warn!(component = "REDIRECT", $($key = $value,)* $msg)
    };
}

#[macro_export]
macro_rules! log_redirect_debug {
    ($msg:literal $(, $key:ident = $value:expr)* $(,)?) => {
        tracing::debug!(component = "REDIRECT", $($key = $value,)* $msg)
    };
}

#[macro_export]
macro_rules! log_redirect_trace {
    ($msg:literal $(, $key:ident = $value:expr)* $(,)?) => {
        tracing::trace!(component = "REDIRECT", $($key = $value,)* $msg)
    };
}

// === SYMBOLS logging macros ===

#[macro_export]
macro_rules! log_symbols_warn {
    ($msg:literal $(, $key:ident = $value:expr)* $(,)?) => {
        tracing::warn!(component = "SYMBOLS", $($key = $value,)* $msg)
    };
}

#[macro_export]
macro_rules! log_symbols_debug {
    ($msg:literal $(, $key:ident = $value:expr)* $(,)?) => {
        tracing::debug!(component = "SYMBOLS", $($key = $value,)* $msg)
    };
}

// === CONFIG logging macros ===

#[macro_export]
macro_rules! log_config_warn {
    ($msg:literal $(, $key:ident = $value:expr)* $(,)?) => {
        tracing::warn!(component = "CONFIG", $($key = $value,)* $msg)
    };
}

#[macro_export]
macro_rules! log_config_debug {
    ($msg:literal $(, $key:ident = $value:expr)* $(,)?) => {
        tracing::debug!(component = "CONFIG", $($key = $value,)* $msg)
    };
}

/// Initialize logging with the given level filter.
///
/// Safe to call more than once; a host process that already installed a
/// subscriber keeps it.
pub fn init_logging(level: LogLevel) {
    use tracing_subscriber::EnvFilter;

    let env_filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level.as_filter()));

    let _ = tracing_subscriber::fmt()
        .with_env_filter(env_filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .try_init();
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_component_constants() {
        assert_eq!(Component::REDIRECT, "REDIRECT");
        assert_eq!(Component::SYMBOLS, "SYMBOLS");
        assert_eq!(Component::CONFIG, "CONFIG");
    }

    #[test]
    fn test_level_parsing() {
        assert_eq!("TRACE".parse::<LogLevel>(), Ok(LogLevel::Trace));
        assert_eq!(" warning ".parse::<LogLevel>(), Ok(LogLevel::Warn));
        assert!("loud".parse::<LogLevel>().is_err());
    }

    #[test]
    fn test_init_logging_twice_is_harmless() {
        init_logging(LogLevel::Debug);
        init_logging(LogLevel::Trace);
        crate::log_config_debug!("second init ignored", attempt = 2);
    }
}
