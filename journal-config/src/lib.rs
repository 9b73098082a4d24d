//! Layered configuration for the journal router
//!
//! Values from files, `.env` files, environment variables and explicit
//! [`ConfigManager::set`] calls are merged into one tree of
//! [`serde_json::Value`]s. Later sources override earlier ones key by key,
//! and nested sections merge instead of being replaced.
//!
//! ```
//! use journal_config::{ConfigManager, JournalSettings};
//!
//! let manager = ConfigManager::new();
//! manager.set("router.strict_unregister", false).unwrap();
//!
//! let settings: JournalSettings = manager.load_validated().unwrap();
//! assert!(!settings.router.strict_unregister);
//! assert_eq!(settings.log.level, "info");
//! ```

pub mod env;
pub mod error;
pub mod loader;
pub mod settings;
pub mod validation;

pub use env::EnvLoader;
pub use error::{ConfigError, Result};
pub use loader::{ConfigLoader, FileFormat};
pub use settings::{HookSettings, JournalSettings, LogSettings, RouterSettings};
pub use validation::{ConfigValidator, Validate};

use loader::{deep_merge, insert_path};
use serde::de::DeserializeOwned;
use serde_json::{Map, Value};
use std::collections::HashMap;
use std::path::Path;
use std::sync::{Arc, RwLock, RwLockReadGuard, RwLockWriteGuard};
use tracing::debug;

/// Default environment variable prefix
pub const DEFAULT_PREFIX: &str = "JOURNAL";

/// Main configuration manager
///
/// Keys are dotted paths (`log.level`) into the merged tree. Clones share
/// the same underlying store.
#[derive(Clone)]
pub struct ConfigManager {
    config: Arc<RwLock<HashMap<String, Value>>>,
    env_prefix: Option<String>,
}

impl ConfigManager {
    /// Create a new configuration manager
    pub fn new() -> Self {
        Self {
            config: Arc::new(RwLock::new(HashMap::new())),
            env_prefix: None,
        }
    }

    /// Create with environment variable prefix
    pub fn with_prefix(prefix: impl Into<String>) -> Self {
        Self {
            config: Arc::new(RwLock::new(HashMap::new())),
            env_prefix: Some(prefix.into()),
        }
    }

    fn read(&self) -> RwLockReadGuard<'_, HashMap<String, Value>> {
        self.config.read().unwrap_or_else(|e| e.into_inner())
    }

    fn write(&self) -> RwLockWriteGuard<'_, HashMap<String, Value>> {
        self.config.write().unwrap_or_else(|e| e.into_inner())
    }

    /// Load configuration from environment variables
    pub fn load_env(&self) -> Result<()> {
        let loader = EnvLoader::new(self.env_prefix.clone());
        let vars = loader.load();
        debug!(count = vars.len(), prefix = ?self.env_prefix, "Loading environment overrides");

        for (key, value) in vars {
            self.set_value(&key, value);
        }
        Ok(())
    }

    /// Load a `.env` file into the process environment, then the
    /// environment itself.
    ///
    /// Without a path a missing `.env` in the working directory is ignored.
    pub fn load_dotenv(&self, path: Option<&Path>) -> Result<()> {
        match path {
            Some(path) => {
                dotenvy::from_path(path).map_err(|e| ConfigError::LoadError(e.to_string()))?;
            }
            None => {
                dotenvy::dotenv().ok();
            }
        }
        self.load_env()
    }

    /// Load configuration from file
    pub fn load_file(&self, path: impl AsRef<Path>, format: FileFormat) -> Result<()> {
        let path = path.as_ref();
        let data = ConfigLoader::new(format).load_file(path)?;
        debug!(path = %path.display(), ?format, "Loaded configuration file");
        self.merge_value(data);
        Ok(())
    }

    /// Load configuration from file, detecting the format from its extension
    pub fn load_file_auto(&self, path: impl AsRef<Path>) -> Result<()> {
        let path = path.as_ref();
        self.load_file(path, FileFormat::detect(path)?)
    }

    /// Load configuration from an in-memory document
    pub fn load_str(&self, content: &str, format: FileFormat) -> Result<()> {
        let data = ConfigLoader::new(format).parse(content)?;
        self.merge_value(data);
        Ok(())
    }

    fn merge_value(&self, data: Value) {
        if let Value::Object(map) = data {
            let mut config = self.write();
            for (key, value) in map {
                match config.get_mut(&key) {
                    Some(existing) => deep_merge(existing, value),
                    None => {
                        config.insert(key, value);
                    }
                }
            }
        }
    }

    fn set_value(&self, key: &str, value: Value) {
        let segments: Vec<String> = key.split('.').map(str::to_string).collect();
        let Some((head, rest)) = segments.split_first() else {
            return;
        };

        let mut config = self.write();
        if rest.is_empty() {
            config.insert(head.clone(), value);
        } else {
            let entry = config.entry(head.clone()).or_insert(Value::Null);
            insert_path(entry, rest, value);
        }
    }

    /// Set a configuration value
    pub fn set<T: serde::Serialize>(&self, key: &str, value: T) -> Result<()> {
        let json_value = serde_json::to_value(value)
            .map_err(|e| ConfigError::SerializationError(e.to_string()))?;
        self.set_value(key, json_value);
        Ok(())
    }

    fn lookup(&self, key: &str) -> Option<Value> {
        let config = self.read();
        let mut segments = key.split('.');
        let mut current = config.get(segments.next()?)?;
        for segment in segments {
            current = current.get(segment)?;
        }
        Some(current.clone())
    }

    /// Get a configuration value
    pub fn get<T: DeserializeOwned>(&self, key: &str) -> Result<T> {
        let value = self
            .lookup(key)
            .ok_or_else(|| ConfigError::KeyNotFound(key.to_string()))?;

        serde_json::from_value(value).map_err(|e| ConfigError::DeserializationError(e.to_string()))
    }

    /// Get a configuration value with default
    pub fn get_or<T: DeserializeOwned>(&self, key: &str, default: T) -> T {
        self.get(key).unwrap_or(default)
    }

    pub fn get_string(&self, key: &str) -> Result<String> {
        self.get(key)
    }

    pub fn get_bool(&self, key: &str) -> Result<bool> {
        self.get(key)
    }

    /// Check if a key exists
    pub fn has(&self, key: &str) -> bool {
        self.lookup(key).is_some()
    }

    /// Top-level configuration keys, sorted
    pub fn keys(&self) -> Vec<String> {
        let mut keys: Vec<String> = self.read().keys().cloned().collect();
        keys.sort();
        keys
    }

    /// Merge configuration from another manager; `other` wins on conflicts
    pub fn merge(&self, other: &ConfigManager) -> Result<()> {
        if Arc::ptr_eq(&self.config, &other.config) {
            return Ok(());
        }
        let snapshot = other.snapshot();
        self.merge_value(snapshot);
        Ok(())
    }

    /// The whole merged tree as one JSON object
    pub fn snapshot(&self) -> Value {
        Value::Object(
            self.read()
                .iter()
                .map(|(k, v)| (k.clone(), v.clone()))
                .collect::<Map<String, Value>>(),
        )
    }

    /// Load and validate configuration
    pub fn load_validated<T: DeserializeOwned + Validate>(&self) -> Result<T> {
        let validated: T = serde_json::from_value(self.snapshot())
            .map_err(|e| ConfigError::DeserializationError(e.to_string()))?;

        validated.validate()?;

        Ok(validated)
    }
}

impl Default for ConfigManager {
    fn default() -> Self {
        Self::with_prefix(DEFAULT_PREFIX)
    }
}

impl std::fmt::Debug for ConfigManager {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ConfigManager")
            .field("env_prefix", &self.env_prefix)
            .field("keys", &self.keys())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_set_and_get() {
        let manager = ConfigManager::new();
        manager.set("test_key", "test_value").unwrap();

        let value: String = manager.get("test_key").unwrap();
        assert_eq!(value, "test_value");
    }

    #[test]
    fn test_dotted_keys() {
        let manager = ConfigManager::new();
        manager.set("log.level", "debug").unwrap();
        manager.set("log.color", false).unwrap();

        assert_eq!(manager.get_string("log.level").unwrap(), "debug");
        assert!(!manager.get_bool("log.color").unwrap());
        assert_eq!(manager.keys(), vec!["log".to_string()]);
        assert!(manager.has("log"));
        assert!(!manager.has("log.format"));
    }

    #[test]
    fn test_get_or_default() {
        let manager = ConfigManager::new();

        let value: String = manager.get_or("missing_key", "default_value".to_string());
        assert_eq!(value, "default_value");
        assert!(matches!(
            manager.get::<String>("missing_key"),
            Err(ConfigError::KeyNotFound(_))
        ));
    }

    #[test]
    fn test_type_mismatch() {
        let manager = ConfigManager::new();
        manager.set("router.async_handling", "yes").unwrap();

        assert!(matches!(
            manager.get_bool("router.async_handling"),
            Err(ConfigError::DeserializationError(_))
        ));
    }

    #[test]
    fn test_file_then_override_merges_sections() {
        let manager = ConfigManager::new();
        manager
            .load_str(
                r#"
                [log]
                level = "warn"
                format = "json"
                "#,
                FileFormat::Toml,
            )
            .unwrap();
        manager.set("log.level", "trace").unwrap();

        assert_eq!(manager.get_string("log.level").unwrap(), "trace");
        assert_eq!(manager.get_string("log.format").unwrap(), "json");
    }

    #[test]
    fn test_merge_managers() {
        let base = ConfigManager::new();
        base.set("router.async_handling", true).unwrap();
        base.set("router.strict_unregister", true).unwrap();

        let overrides = ConfigManager::new();
        overrides.set("router.strict_unregister", false).unwrap();

        base.merge(&overrides).unwrap();
        base.merge(&base.clone()).unwrap();

        assert_eq!(
            base.snapshot(),
            json!({"router": {"async_handling": true, "strict_unregister": false}})
        );
    }

    #[test]
    fn test_load_validated_rejects_invalid() {
        let manager = ConfigManager::new();
        manager.set("log.level", "loud").unwrap();

        assert!(matches!(
            manager.load_validated::<JournalSettings>(),
            Err(ConfigError::ValidationError(_))
        ));
    }
}
