// In: src/config.rs

//! The single source of truth for all store construction settings.
//!
//! `StoreConfig` is created once at the application boundary (from a JSON file,
//! the CLI, or code) and passed by reference into the builders. Codec names are
//! kept as text here; `codec::policy` is responsible for turning them into codec
//! instances and rejecting invalid combinations.

use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::PrefError;

//==================================================================================
// I. The Unified StoreConfig
//==================================================================================

/// Settings for building a preference store.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
#[serde(rename_all = "snake_case")]
pub struct StoreConfig {
    /// Codec used for the identifier lists of both indices (e.g. `"zeta_3"`).
    #[serde(default = "default_codec")]
    pub id_codec: String,

    /// Codec used for the quantised ratings. Ignored by the binary store.
    #[serde(default = "default_codec")]
    pub value_codec: String,

    /// Ratings are stored as `round(rating * rating_scale)`.
    /// `1.0` suits integer star ratings, `2.0` half stars.
    #[serde(default = "default_rating_scale")]
    pub rating_scale: f64,

    /// Size of a dedicated construction thread pool. `None` uses the global rayon pool.
    #[serde(default)]
    pub threads: Option<usize>,

    /// When set, persisted blobs are wrapped in a zstd frame of this level.
    #[serde(default)]
    pub persist_zstd_level: Option<i32>,
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            id_codec: default_codec(),
            value_codec: default_codec(),
            rating_scale: default_rating_scale(),
            threads: None,
            persist_zstd_level: None,
        }
    }
}

impl StoreConfig {
    /// Convenience constructor for the common "ids only" case.
    pub fn with_id_codec(name: impl Into<String>) -> Self {
        Self {
            id_codec: name.into(),
            ..Self::default()
        }
    }

    /// Sets the value codec, builder style.
    pub fn value_codec(mut self, name: impl Into<String>) -> Self {
        self.value_codec = name.into();
        self
    }

    pub fn from_json_str(json: &str) -> Result<Self, PrefError> {
        let config: StoreConfig = serde_json::from_str(json)?;
        config.validate()?;
        Ok(config)
    }

    pub fn from_path(path: impl AsRef<Path>) -> Result<Self, PrefError> {
        let text = std::fs::read_to_string(path)?;
        Self::from_json_str(&text)
    }

    /// Checks the numeric settings. Codec names are checked by the policy.
    pub fn validate(&self) -> Result<(), PrefError> {
        if !(self.rating_scale.is_finite() && self.rating_scale > 0.0) {
            return Err(PrefError::Config(format!(
                "rating_scale must be a positive finite number, got {}",
                self.rating_scale
            )));
        }
        if self.threads == Some(0) {
            return Err(PrefError::Config("threads must be at least 1".to_string()));
        }
        if let Some(level) = self.persist_zstd_level {
            if !(1..=22).contains(&level) {
                return Err(PrefError::Config(format!(
                    "persist_zstd_level must be in 1..=22, got {}",
                    level
                )));
            }
        }
        Ok(())
    }
}

/// Helper for `serde` to default codec names to the no-op codec.
fn default_codec() -> String {
    "null".to_string()
}

fn default_rating_scale() -> f64 {
    1.0
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_from_empty_json() {
        let config = StoreConfig::from_json_str("{}").unwrap();
        assert_eq!(config, StoreConfig::default());
        assert_eq!(config.id_codec, "null");
        assert_eq!(config.rating_scale, 1.0);
    }

    #[test]
    fn test_partial_json() {
        let config =
            StoreConfig::from_json_str(r#"{"id_codec": "zeta_3", "rating_scale": 2.0}"#).unwrap();
        assert_eq!(config.id_codec, "zeta_3");
        assert_eq!(config.value_codec, "null");
        assert_eq!(config.rating_scale, 2.0);
    }

    #[test]
    fn test_invalid_numeric_settings_are_rejected() {
        assert!(StoreConfig::from_json_str(r#"{"rating_scale": 0.0}"#).is_err());
        assert!(StoreConfig::from_json_str(r#"{"threads": 0}"#).is_err());
        let err = StoreConfig::from_json_str(r#"{"persist_zstd_level": 40}"#).unwrap_err();
        assert!(err.is_config_error());
    }
}
