//! Typed settings for a journal instance

use crate::validation::{ConfigValidator, Validate};
use crate::{ConfigManager, DEFAULT_PREFIX, Result};
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Log levels accepted by `log.level`
pub const LOG_LEVELS: [&str; 5] = ["trace", "debug", "info", "warn", "error"];

/// Output formats accepted by `log.format`
pub const LOG_FORMATS: [&str; 3] = ["pretty", "compact", "json"];

/// Everything a journal needs at start-up.
///
/// Every field has a default, so an empty source yields a working
/// configuration.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct JournalSettings {
    pub router: RouterSettings,
    pub log: LogSettings,
    pub hooks: HookSettings,
}

/// Router behaviour
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RouterSettings {
    /// Run matched handlers concurrently
    pub async_handling: bool,

    /// Unregistering an unknown listener is an error
    pub strict_unregister: bool,

    /// Emit dispatch debug/info logs
    pub enable_logging: bool,

    /// Register a tracing listener on `/` at start-up
    pub root_tracing: bool,

    /// Substitute `{key}` placeholders in content from attributes
    pub placeholders: bool,
}

impl Default for RouterSettings {
    fn default() -> Self {
        Self {
            async_handling: true,
            strict_unregister: true,
            enable_logging: true,
            root_tracing: false,
            placeholders: false,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LogSettings {
    pub level: String,
    pub format: String,
    pub color: bool,
}

impl Default for LogSettings {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            format: "pretty".to_string(),
            color: true,
        }
    }
}

/// Names of the lifecycle hooks the registry accepts
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct HookSettings {
    pub names: Vec<String>,
}

impl Default for HookSettings {
    fn default() -> Self {
        Self {
            names: vec!["on_guild_join".to_string(), "on_guild_leave".to_string()],
        }
    }
}

impl Validate for JournalSettings {
    fn validate(&self) -> Result<()> {
        self.log.validate()?;
        self.hooks.validate()
    }
}

impl Validate for LogSettings {
    fn validate(&self) -> Result<()> {
        let level = self.level.to_lowercase();
        ConfigValidator::one_of(&level.as_str(), &LOG_LEVELS, "log.level")?;

        let format = self.format.to_lowercase();
        ConfigValidator::one_of(&format.as_str(), &LOG_FORMATS, "log.format")
    }
}

impl Validate for HookSettings {
    fn validate(&self) -> Result<()> {
        for name in &self.names {
            ConfigValidator::not_empty(name, "hooks.names")?;
        }
        ConfigValidator::unique(&self.names, "hooks.names")
    }
}

impl JournalSettings {
    /// Load settings from an optional file, then `.env`, then `JOURNAL_*`
    /// environment variables.
    pub fn load(file: Option<&Path>) -> Result<Self> {
        let manager = ConfigManager::with_prefix(DEFAULT_PREFIX);
        if let Some(file) = file {
            manager.load_file_auto(file)?;
        }
        manager.load_dotenv(None)?;
        manager.load_validated()
    }
}
