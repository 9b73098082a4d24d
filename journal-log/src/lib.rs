//! Journal logging bootstrap
//!
//! Installs a global [`tracing`] subscriber configured from `JOURNAL_*`
//! environment variables or explicit settings. The router and listeners
//! only ever use `tracing` macros; this crate decides where the output
//! goes.
//!
//! # Usage
//!
//! ```rust,no_run
//! use journal_log::{Format, Level, LogConfig};
//!
//! let config = LogConfig::from_env()
//!     .with_format(Format::Compact)
//!     .with_target("journal_events", Level::Debug);
//! journal_log::init(&config).expect("logging already initialized");
//! ```
//!
//! # Environment Variables
//!
//! - `JOURNAL_DEBUG=1` - Enable debug logging
//! - `JOURNAL_LOG_LEVEL=trace|debug|info|warn|error|off` - Set log level
//! - `JOURNAL_LOG_FORMAT=pretty|json|compact` - Set output format
//! - `JOURNAL_LOG_COLOR=1|0` - Enable/disable colors
//! - `RUST_LOG` - When set, replaces the computed filter entirely

use once_cell::sync::OnceCell;
use std::env;
use std::fmt;
use std::str::FromStr;
use tracing_subscriber::prelude::*;
use tracing_subscriber::{EnvFilter, fmt as layer_fmt};

// ============================================================================
// Errors
// ============================================================================

#[derive(Debug, thiserror::Error)]
pub enum LogError {
    #[error("Logging is already initialized")]
    AlreadyInitialized,

    #[error("Unknown log level: {0}")]
    UnknownLevel(String),

    #[error("Unknown log format: {0}")]
    UnknownFormat(String),

    #[error("Invalid filter directive: {0}")]
    InvalidDirective(String),

    #[error("Failed to install subscriber: {0}")]
    Install(String),
}

// ============================================================================
// Log Levels
// ============================================================================

/// Minimum level for journal logging.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Default)]
pub enum Level {
    /// Trace level (most verbose)
    Trace,
    Debug,
    #[default]
    Info,
    Warn,
    Error,
    /// Off (no logging)
    Off,
}

impl Level {
    /// Directive name understood by [`EnvFilter`]
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
            _ => Err(LogError::UnknownLevel(s.to_string())),
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

/// Output format for log messages.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Format {
    /// Multi-line, human oriented
    #[default]
    Pretty,
    /// Compact single-line format
    Compact,
    /// JSON format for structured logging
    Json,
}

impl FromStr for Format {
    type Err = LogError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "pretty" => Ok(Format::Pretty),
            "compact" => Ok(Format::Compact),
            "json" => Ok(Format::Json),
            _ => Err(LogError::UnknownFormat(s.to_string())),
        }
    }
}

// ============================================================================
// Configuration
// ============================================================================

/// Logging configuration.
#[derive(Debug, Clone, PartialEq)]
pub struct LogConfig {
    /// Minimum log level
    pub level: Level,
    /// Output format
    pub format: Format,
    /// Whether colors are enabled (ignored for JSON)
    pub color: bool,
    /// Per-target overrides, e.g. `journal_events=debug`
    pub targets: Vec<(String, Level)>,
}

impl Default for LogConfig {
    fn default() -> Self {
        Self {
            level: Level::Info,
            format: Format::Pretty,
            color: true,
            targets: Vec::new(),
        }
    }
}

impl LogConfig {
    /// Create config from environment variables.
    pub fn from_env() -> Self {
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Create config from any variable source.
    ///
    /// Unparseable values fall back to their defaults.
    pub fn from_lookup<F>(lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        let flag = |key: &str| {
            lookup(key).map(|v| v == "1" || v.eq_ignore_ascii_case("true"))
        };

        let debug = flag("JOURNAL_DEBUG").unwrap_or(false);

        let level = lookup("JOURNAL_LOG_LEVEL")
            .and_then(|s| s.parse().ok())
            .unwrap_or(if debug { Level::Debug } else { Level::Info });

        let format = lookup("JOURNAL_LOG_FORMAT")
            .and_then(|s| s.parse().ok())
            .unwrap_or_default();

        let color = flag("JOURNAL_LOG_COLOR")
            .unwrap_or_else(|| lookup("NO_COLOR").is_none() && lookup("TERM").is_some());

        Self {
            level,
            format,
            color,
            targets: Vec::new(),
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

    pub fn with_color(mut self, color: bool) -> Self {
        self.color = color;
        self
    }

    /// Override the level for one target (module path prefix)
    pub fn with_target(mut self, target: impl Into<String>, level: Level) -> Self {
        self.targets.push((target.into(), level));
        self
    }

    /// [`EnvFilter`] directive string for this configuration
    pub fn directive(&self) -> String {
        let mut directive = self.level.as_str().to_string();
        for (target, level) in &self.targets {
            directive.push(',');
            directive.push_str(target);
            directive.push('=');
            directive.push_str(level.as_str());
        }
        directive
    }

    fn filter(&self) -> Result<EnvFilter, LogError> {
        match EnvFilter::try_from_default_env() {
            Ok(filter) => Ok(filter),
            Err(_) => EnvFilter::try_new(self.directive())
                .map_err(|e| LogError::InvalidDirective(e.to_string())),
        }
    }
}

// ============================================================================
// Public API
// ============================================================================

/// Configuration of the installed subscriber.
static INSTALLED: OnceCell<LogConfig> = OnceCell::new();

/// Install the global subscriber.
///
/// Can succeed once per process; later calls return
/// [`LogError::AlreadyInitialized`].
pub fn init(config: &LogConfig) -> Result<(), LogError> {
    if INSTALLED.get().is_some() {
        return Err(LogError::AlreadyInitialized);
    }

    let filter = config.filter()?;
    let output = match config.format {
        Format::Pretty => layer_fmt::layer()
            .pretty()
            .with_ansi(config.color)
            .boxed(),
        Format::Compact => layer_fmt::layer()
            .compact()
            .with_ansi(config.color)
            .boxed(),
        Format::Json => layer_fmt::layer().json().with_ansi(false).boxed(),
    };

    tracing_subscriber::registry()
        .with(output)
        .with(filter)
        .try_init()
        .map_err(|e| LogError::Install(e.to_string()))?;

    INSTALLED
        .set(config.clone())
        .map_err(|_| LogError::AlreadyInitialized)?;

    tracing::debug!(
        level = %config.level,
        format = ?config.format,
        "Journal logging initialized"
    );
    Ok(())
}

/// Install from `JOURNAL_*` environment variables.
pub fn init_from_env() -> Result<(), LogError> {
    init(&LogConfig::from_env())
}

/// Configuration passed to the successful [`init`] call, if any.
pub fn config() -> Option<&'static LogConfig> {
    INSTALLED.get()
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let vars: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| vars.get(key).cloned()
    }

    #[test]
    fn test_level_ordering() {
        assert!(Level::Trace < Level::Debug);
        assert!(Level::Debug < Level::Info);
        assert!(Level::Info < Level::Warn);
        assert!(Level::Warn < Level::Error);
        assert!(Level::Error < Level::Off);
    }

    #[test]
    fn test_level_from_str() {
        assert_eq!("debug".parse::<Level>().unwrap(), Level::Debug);
        assert_eq!("DEBUG".parse::<Level>().unwrap(), Level::Debug);
        assert_eq!("warning".parse::<Level>().unwrap(), Level::Warn);
        assert!(matches!(
            "invalid".parse::<Level>(),
            Err(LogError::UnknownLevel(_))
        ));
    }

    #[test]
    fn test_format_from_str() {
        assert_eq!("pretty".parse::<Format>().unwrap(), Format::Pretty);
        assert_eq!("Compact".parse::<Format>().unwrap(), Format::Compact);
        assert_eq!("json".parse::<Format>().unwrap(), Format::Json);
        assert!("xml".parse::<Format>().is_err());
    }

    #[test]
    fn test_from_lookup() {
        let config = LogConfig::from_lookup(lookup(&[
            ("JOURNAL_LOG_LEVEL", "warn"),
            ("JOURNAL_LOG_FORMAT", "json"),
            ("JOURNAL_LOG_COLOR", "0"),
        ]));

        assert_eq!(config.level, Level::Warn);
        assert_eq!(config.format, Format::Json);
        assert!(!config.color);
    }

    #[test]
    fn test_debug_flag_lowers_default_level() {
        let config = LogConfig::from_lookup(lookup(&[("JOURNAL_DEBUG", "true")]));
        assert_eq!(config.level, Level::Debug);

        let explicit = LogConfig::from_lookup(lookup(&[
            ("JOURNAL_DEBUG", "1"),
            ("JOURNAL_LOG_LEVEL", "error"),
        ]));
        assert_eq!(explicit.level, Level::Error);
    }

    #[test]
    fn test_color_detection() {
        assert!(LogConfig::from_lookup(lookup(&[("TERM", "xterm")])).color);
        assert!(!LogConfig::from_lookup(lookup(&[("TERM", "xterm"), ("NO_COLOR", "1")])).color);
        assert!(!LogConfig::from_lookup(lookup(&[])).color);
    }

    #[test]
    fn test_directive() {
        let config = LogConfig::default()
            .with_level(Level::Warn)
            .with_target("journal_events", Level::Debug)
            .with_target("journal", Level::Info);

        assert_eq!(config.directive(), "warn,journal_events=debug,journal=info");
        assert!(EnvFilter::try_new(config.directive()).is_ok());
    }

    #[test]
    fn test_init_once() {
        let config = LogConfig::default().with_format(Format::Compact).with_color(false);

        // Another test binary may already own the global subscriber.
        match init(&config) {
            Ok(()) => {
                assert_eq!(super::config(), Some(&config));
                assert!(matches!(init(&config), Err(LogError::AlreadyInitialized)));
            }
            Err(LogError::Install(_)) => {}
            Err(other) => panic!("unexpected error: {other}"),
        }
    }
}
