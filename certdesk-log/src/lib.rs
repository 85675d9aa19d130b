//! certdesk logging setup
//!
//! Library crates log through `tracing`; binaries call [`init`] once to
//! install a subscriber configured from the environment.
//!
//! # Environment Variables
//!
//! - `CERTDESK_DEBUG=1` - Enable debug logging
//! - `CERTDESK_LOG_LEVEL=trace|debug|info|warn|error|off` - Set log level
//! - `CERTDESK_LOG_FORMAT=pretty|json|compact` - Set output format (default json)
//! - `CERTDESK_LOG_COLOR=1|0` - Enable/disable colors
//!
//! `RUST_LOG`, when set, takes precedence over the level.
//!
//! ```rust
//! use certdesk_log::{Format, Level, LogConfig};
//!
//! let config = LogConfig::from_lookup(|name| match name {
//!     "CERTDESK_DEBUG" => Some("1".to_string()),
//!     "CERTDESK_LOG_FORMAT" => Some("compact".to_string()),
//!     _ => None,
//! });
//! assert_eq!(config.level, Level::Debug);
//! assert_eq!(config.format, Format::Compact);
//! ```

use std::env;
use std::fmt;
use std::str::FromStr;
use thiserror::Error;
use tracing_subscriber::EnvFilter;
use tracing_subscriber::prelude::*;

// ============================================================================
// Log Levels
// ============================================================================

/// Minimum level to emit.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum Level {
    Trace,
    Debug,
    Info,
    Warn,
    Error,
    /// No output at all
    Off,
}

impl Level {
    /// Directive understood by [`EnvFilter`].
    pub fn as_str(&self) -> &'static str {
        match self {
            Level::Trace => "trace",
            Level::Debug => "debug",
            Level::Info => "info",
            Level::Warn => "warn",
            Level::Error => "error",
            Level::Off => "off",
        }
    }
}

impl FromStr for Level {
    type Err = LogError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "trace" => Ok(Level::Trace),
            "debug" => Ok(Level::Debug),
            "info" => Ok(Level::Info),
            "warn" | "warning" => Ok(Level::Warn),
            "error" => Ok(Level::Error),
            "off" | "none" => Ok(Level::Off),
            other => Err(LogError::InvalidLevel(other.to_string())),
        }
    }
}

impl fmt::Display for Level {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

// ============================================================================
// Log Format
// ============================================================================

/// Output format for log lines.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Format {
    /// Multi-line human readable output
    Pretty,
    /// Single-line human readable output
    Compact,
    /// One JSON object per line
    Json,
}

impl FromStr for Format {
    type Err = LogError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "pretty" => Ok(Format::Pretty),
            "compact" => Ok(Format::Compact),
            "json" => Ok(Format::Json),
            other => Err(LogError::InvalidFormat(other.to_string())),
        }
    }
}

#[derive(Debug, Error)]
pub enum LogError {
    #[error("Invalid log level: {0}")]
    InvalidLevel(String),

    #[error("Invalid log format: {0}")]
    InvalidFormat(String),

    #[error("Invalid filter directive: {0}")]
    Filter(String),

    #[error("Failed to install subscriber: {0}")]
    Init(String),
}

// ============================================================================
// Configuration
// ============================================================================

/// Logging configuration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LogConfig {
    pub debug: bool,
    pub level: Level,
    pub format: Format,
    pub color: bool,
    /// Include the event target (module path)
    pub targets: bool,
}

impl Default for LogConfig {
    fn default() -> Self {
        Self {
            debug: false,
            level: Level::Info,
            format: Format::Json,
            color: false,
            targets: true,
        }
    }
}

impl LogConfig {
    /// Read the `CERTDESK_*` logging variables from the process environment.
    pub fn from_env() -> Self {
        Self::from_lookup(|name| env::var(name).ok())
    }

    /// Read the logging variables through `lookup`. Unparseable values fall
    /// back to their defaults.
    pub fn from_lookup<F>(lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        let flag = |name: &str| {
            lookup(name).map(|v| {
                let v = v.trim().to_lowercase();
                v == "1" || v == "true" || v == "yes"
            })
        };

        let debug = flag("CERTDESK_DEBUG").unwrap_or(false);

        let level = lookup("CERTDESK_LOG_LEVEL")
            .and_then(|s| s.parse().ok())
            .unwrap_or(if debug { Level::Debug } else { Level::Info });

        let format = lookup("CERTDESK_LOG_FORMAT")
            .and_then(|s| s.parse().ok())
            .unwrap_or(Format::Json);

        let color = flag("CERTDESK_LOG_COLOR")
            .unwrap_or_else(|| format != Format::Json && lookup("NO_COLOR").is_none() && lookup("TERM").is_some());

        Self {
            debug,
            level,
            format,
            color,
            targets: true,
        }
    }

    pub fn with_level(mut self, level: Level) -> Self {
        self.level = level;
        self
    }

    pub fn with_format(mut self, format: Format) -> Self {
        self.format = format;
        self
    }

    /// Enable debug output, raising the level to at least debug.
    pub fn with_debug(mut self, debug: bool) -> Self {
        self.debug = debug;
        if debug && self.level > Level::Debug {
            self.level = Level::Debug;
        }
        self
    }

    /// Filter used when `RUST_LOG` is not set. Dependency crates stay at
    /// warn unless the level is trace.
    pub fn filter_directive(&self) -> String {
        match self.level {
            Level::Trace | Level::Off => self.level.as_str().to_string(),
            level => format!("warn,certdesk={0},certdesk_acme={0},certdesk_dns={0},certdesk_issuer={0},certdesk_crypto={0}", level),
        }
    }

    fn env_filter(&self) -> Result<EnvFilter, LogError> {
        match EnvFilter::try_from_default_env() {
            Ok(filter) => Ok(filter),
            Err(_) => EnvFilter::try_new(self.filter_directive())
                .map_err(|e| LogError::Filter(e.to_string())),
        }
    }
}

// ============================================================================
// Public API
// ============================================================================

/// Install the global subscriber from the environment.
pub fn init() -> Result<(), LogError> {
    try_init(&LogConfig::from_env())
}

/// Install the global subscriber for `config`. Fails if one is already set.
pub fn try_init(config: &LogConfig) -> Result<(), LogError> {
    let filter = config.env_filter()?;
    let registry = tracing_subscriber::registry().with(filter);
    let writer = std::io::stderr;

    let result = match config.format {
        Format::Json => registry
            .with(
                tracing_subscriber::fmt::layer()
                    .json()
                    .with_target(config.targets)
                    .with_writer(writer),
            )
            .try_init(),
        Format::Pretty => registry
            .with(
                tracing_subscriber::fmt::layer()
                    .pretty()
                    .with_ansi(config.color)
                    .with_target(config.targets)
                    .with_writer(writer),
            )
            .try_init(),
        Format::Compact => registry
            .with(
                tracing_subscriber::fmt::layer()
                    .compact()
                    .with_ansi(config.color)
                    .with_target(config.targets)
                    .with_writer(writer),
            )
            .try_init(),
    };

    result.map_err(|e| LogError::Init(e.to_string()))?;
    tracing::debug!(level = %config.level, format = ?config.format, "Logging initialized");
    Ok(())
}

// ============================================================================
// Tests
// ============================================================================
