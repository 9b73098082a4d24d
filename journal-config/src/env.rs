// Environment variable loading

use crate::{ConfigError, Result};
use serde_json::Value;
use std::env;

/// Separator between nested keys in variable names: `JOURNAL_LOG__LEVEL`
/// sets `log.level`.
pub const NESTING_SEPARATOR: &str = "__";

/// Environment variable loader
pub struct EnvLoader {
    prefix: Option<String>,
}

impl EnvLoader {
    /// Create a new environment loader
    pub fn new(prefix: Option<String>) -> Self {
        Self { prefix }
    }

    /// Load matching variables from the process environment
    pub fn load(&self) -> Vec<(String, Value)> {
        self.load_from(env::vars())
    }

    /// Load matching variables from `vars`.
    ///
    /// Returns dotted, lower-cased keys. Values that parse as JSON scalars
    /// (`true`, `42`, `1.5`) keep their type; everything else is a string.
    pub fn load_from<I>(&self, vars: I) -> Vec<(String, Value)>
    where
        I: IntoIterator<Item = (String, String)>,
    {
        let mut loaded: Vec<(String, Value)> = vars
            .into_iter()
            .filter_map(|(key, value)| {
                let key = match &self.prefix {
                    Some(prefix) => key.strip_prefix(prefix.as_str())?.strip_prefix('_')?.to_string(),
                    None => key,
                };
                if key.is_empty() {
                    return None;
                }
                Some((to_dotted(&key), parse_scalar(&value)))
            })
            .collect();

        loaded.sort_by(|a, b| a.0.cmp(&b.0));
        loaded
    }

    /// Load a specific environment variable
    pub fn load_var(&self, key: &str) -> Result<String> {
        env::var(self.var_name(key)).map_err(ConfigError::EnvError)
    }

    /// Load with default value
    pub fn load_var_or(&self, key: &str, default: &str) -> String {
        self.load_var(key).unwrap_or_else(|_| default.to_string())
    }

    /// Full variable name for a dotted key, e.g. `log.level` ->
    /// `JOURNAL_LOG__LEVEL`
    pub fn var_name(&self, key: &str) -> String {
        let key = key.replace('.', NESTING_SEPARATOR).to_uppercase();
        match &self.prefix {
            Some(prefix) => format!("{}_{}", prefix, key),
            None => key,
        }
    }
}

impl Default for EnvLoader {
    fn default() -> Self {
        Self::new(Some("JOURNAL".to_string()))
    }
}

fn to_dotted(key: &str) -> String {
    key.split(NESTING_SEPARATOR)
        .map(str::to_lowercase)
        .collect::<Vec<_>>()
        .join(".")
}

pub(crate) fn parse_scalar(raw: &str) -> Value {
    match serde_json::from_str::<Value>(raw) {
        Ok(value @ (Value::Bool(_) | Value::Number(_))) => value,
        _ => Value::String(raw.to_string()),
    }
}
