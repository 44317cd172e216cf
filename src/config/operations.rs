//! Config loading and validation.

use super::model::Config;
use crate::error::{Result, UnlatchError};
use std::path::Path;

impl Config {
    /// Load config from a YAML file.
    ///
    /// Unknown fields in the YAML are silently ignored for forward compatibility.
    ///
    /// # Returns
    ///
    /// * `Ok(Config)` - Successfully loaded and validated config
    /// * `Err(UnlatchError::UserError)` - Read error, parse error or validation failure
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();

        let content = std::fs::read_to_string(path).map_err(|e| {
            UnlatchError::UserError(format!(
                "failed to read config file '{}': {}",
                path.display(),
                e
            ))
        })?;

        Self::from_yaml(&content)
    }

    /// Load config from `path` when given, otherwise use defaults.
    pub fn load_or_default(path: Option<&Path>) -> Result<Self> {
        match path {
            Some(path) => Self::load(path),
            None => Ok(Self::default()),
        }
    }

    /// Parse config from a YAML string.
    pub fn from_yaml(yaml: &str) -> Result<Self> {
        let config: Config = serde_yaml::from_str(yaml)
            .map_err(|e| UnlatchError::UserError(format!("failed to parse config YAML: {}", e)))?;

        config.validate()?;
        Ok(config)
    }

    /// Serialize config to YAML string.
    pub fn to_yaml(&self) -> Result<String> {
        serde_yaml::to_string(self).map_err(|e| {
            UnlatchError::UserError(format!("failed to serialize config to YAML: {}", e))
        })
    }

    /// Validate config values and return error on invalid values.
    ///
    /// Validation rules:
    /// - `tool_path` must be non-empty
    /// - `large_directory_threshold` and `sample_lock_limit` must be positive
    /// - `release_poll_ms` must be positive and not exceed `release_wait_ms`
    /// - `unlock_retry_attempts` and `method_attempts` must be positive
    pub fn validate(&self) -> Result<()> {
        if self.tool_path.trim().is_empty() {
            return Err(invalid("tool_path must not be empty"));
        }

        if self.large_directory_threshold == 0 {
            return Err(invalid("large_directory_threshold must be greater than 0"));
        }

        if self.sample_lock_limit == 0 {
            return Err(invalid("sample_lock_limit must be greater than 0"));
        }

        if self.release_poll_ms == 0 {
            return Err(invalid("release_poll_ms must be greater than 0"));
        }

        if self.release_poll_ms > self.release_wait_ms {
            return Err(UnlatchError::UserError(format!(
                "config validation failed: release_poll_ms ({}) must not exceed release_wait_ms ({})",
                self.release_poll_ms, self.release_wait_ms
            )));
        }

        if self.unlock_retry_attempts == 0 {
            return Err(invalid("unlock_retry_attempts must be greater than 0"));
        }

        if self.method_attempts == 0 {
            return Err(invalid("method_attempts must be greater than 0"));
        }

        if let Some(label) = &self.preferred_encoding
            && encoding_rs::Encoding::for_label(label.as_bytes()).is_none()
        {
            return Err(UnlatchError::UserError(format!(
                "config validation failed: unknown preferred_encoding '{}'",
                label
            )));
        }

        Ok(())
    }
}

fn invalid(rule: &str) -> UnlatchError {
    UnlatchError::UserError(format!("config validation failed: {}", rule))
}
