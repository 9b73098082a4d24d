// Configuration validation

use crate::{ConfigError, Result};
use std::fmt::Debug;

/// Trait for validating configuration
pub trait Validate {
    fn validate(&self) -> Result<()>;
}

/// Configuration validator with rules
pub struct ConfigValidator;

impl ConfigValidator {
    /// Validate that a value is not empty
    pub fn not_empty(value: &str, field: &str) -> Result<()> {
        if value.trim().is_empty() {
            return Err(ConfigError::ValidationError(format!(
                "{} cannot be empty",
                field
            )));
        }
        Ok(())
    }

    /// Validate that a value is in a list of allowed values
    pub fn one_of<T: PartialEq + Debug>(value: &T, allowed: &[T], field: &str) -> Result<()> {
        if !allowed.contains(value) {
            return Err(ConfigError::ValidationError(format!(
                "{} must be one of {:?}, got {:?}",
                field, allowed, value
            )));
        }
        Ok(())
    }

    /// Validate that no entry appears twice
    pub fn unique<T: PartialEq + Debug>(values: &[T], field: &str) -> Result<()> {
        for (i, value) in values.iter().enumerate() {
            if values[..i].contains(value) {
                return Err(ConfigError::ValidationError(format!(
                    "{} contains {:?} more than once",
                    field, value
                )));
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_not_empty_validation() {
        assert!(ConfigValidator::not_empty("value", "field").is_ok());
        assert!(ConfigValidator::not_empty("", "field").is_err());
        assert!(ConfigValidator::not_empty("   ", "field").is_err());
    }

    #[test]
    fn test_one_of_validation() {
        let allowed = ["pretty", "compact", "json"];
        assert!(ConfigValidator::one_of(&"json", &allowed, "log.format").is_ok());

        let err = ConfigValidator::one_of(&"xml", &allowed, "log.format").unwrap_err();
        assert!(err.to_string().contains("log.format must be one of"));
    }

    #[test]
    fn test_unique_validation() {
        assert!(ConfigValidator::unique(&["a", "b"], "hooks.names").is_ok());
        assert!(ConfigValidator::unique(&["a", "b", "a"], "hooks.names").is_err());
    }
}
