//! Engine configuration

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::types::SelectorCategory;

/// Default base URL of the segment service.
pub const DEFAULT_API_BASE: &str = "https://sponsor.ajay.app/api";

/// Error type for configuration loading.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Invalid config JSON: {0}")]
    Parse(#[from] serde_json::Error),
    #[error("Invalid value for '{field}': {reason}")]
    Invalid { field: &'static str, reason: String },
}

/// Tunables for both subsystems. Every field has a default, so `{}` is a
/// valid config.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    /// Segment service base URL, without trailing slash
    pub api_base: String,
    /// Minimum spacing between reactive re-scans
    pub throttle_ms: u64,
    /// Period of the fallback full scan
    pub rescan_interval_ms: u64,
    /// Delay between hiding an element and detaching it
    pub removal_grace_ms: u64,
    /// Media shorter than this is treated as a pre-roll ad when seeking
    pub short_ad_threshold_secs: f64,
    /// On-screen time of the skip notification
    pub notification_ms: u64,
    /// Selectors appended to the built-in categories
    pub extra_selectors: BTreeMap<SelectorCategory, Vec<String>>,
    /// Filters appended to the builtin list
    pub extra_filters: Vec<String>,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            api_base: DEFAULT_API_BASE.to_string(),
            throttle_ms: 100,
            rescan_interval_ms: 1000,
            removal_grace_ms: 1000,
            short_ad_threshold_secs: 30.0,
            notification_ms: 2000,
            extra_selectors: BTreeMap::new(),
            extra_filters: Vec::new(),
        }
    }
}

impl EngineConfig {
    /// Parse and validate. Blank input yields the defaults.
    pub fn from_json(text: &str) -> Result<Self, ConfigError> {
        if text.trim().is_empty() {
            return Ok(Self::default());
        }
        let mut config: Self = serde_json::from_str(text)?;
        config.api_base = config.api_base.trim_end_matches('/').to_string();
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if !(self.api_base.starts_with("https://") || self.api_base.starts_with("http://")) {
            return Err(ConfigError::Invalid {
                field: "api_base",
                reason: format!("'{}' is not an http(s) URL", self.api_base),
            });
        }
        if self.rescan_interval_ms == 0 {
            return Err(ConfigError::Invalid {
                field: "rescan_interval_ms",
                reason: "must be greater than 0".to_string(),
            });
        }
        if !(self.short_ad_threshold_secs.is_finite() && self.short_ad_threshold_secs >= 0.0) {
            return Err(ConfigError::Invalid {
                field: "short_ad_threshold_secs",
                reason: "must be a non-negative number".to_string(),
            });
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_is_default() {
        assert_eq!(EngineConfig::from_json("").unwrap(), EngineConfig::default());
        assert_eq!(EngineConfig::from_json("{}").unwrap(), EngineConfig::default());
    }

    #[test]
    fn test_partial_override() {
        let config = EngineConfig::from_json(
            r#"{"api_base":"http://localhost:8080/api/","throttle_ms":50,"extra_selectors":{"banner":[".promo"]}}"#,
        )
        .unwrap();
        assert_eq!(config.api_base, "http://localhost:8080/api");
        assert_eq!(config.throttle_ms, 50);
        assert_eq!(config.rescan_interval_ms, 1000);
        assert_eq!(config.extra_selectors[&SelectorCategory::Banner], vec![".promo".to_string()]);
    }

    #[test]
    fn test_rejects_bad_values() {
        assert!(matches!(
            EngineConfig::from_json(r#"{"api_base":"ftp://x"}"#),
            Err(ConfigError::Invalid { field: "api_base", .. })
        ));
        assert!(matches!(
            EngineConfig::from_json(r#"{"rescan_interval_ms":0}"#),
            Err(ConfigError::Invalid { field: "rescan_interval_ms", .. })
        ));
        assert!(matches!(EngineConfig::from_json("{"), Err(ConfigError::Parse(_))));
        assert!(matches!(
            EngineConfig::from_json(r#"{"extra_selectors":{"footer":[]}}"#),
            Err(ConfigError::Parse(_))
        ));
    }
}
