use serde::{Deserialize, Serialize};
use tracing::level_filters::LevelFilter;

use crate::error::ConfigError;

pub const DEFAULT_MEMORY_PAIRS: usize = 8;
pub const DEFAULT_REPEAT_PROBABILITY: f64 = 0.35;

/// Runtime configuration handed to `start_app` as JSON. Every field is
/// optional in the JSON; missing fields take their defaults.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    /// Batch upload endpoint. `None` disables flushing entirely.
    pub api_endpoint: Option<String>,
    pub require_participant_code: bool,
    pub memory_pairs: usize,
    pub verbal_repeat_probability: f64,
    pub log_level: String,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            api_endpoint: None,
            require_participant_code: true,
            memory_pairs: DEFAULT_MEMORY_PAIRS,
            verbal_repeat_probability: DEFAULT_REPEAT_PROBABILITY,
            log_level: "info".to_string(),
        }
    }
}

impl AppConfig {
    pub fn from_json(raw: &str) -> Result<Self, ConfigError> {
        let cfg: AppConfig = serde_json::from_str(raw)?;
        cfg.validate()?;
        Ok(cfg)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        let max = crate::MEMORY_WORDS.len();
        if self.memory_pairs == 0 || self.memory_pairs > max {
            return Err(ConfigError::MemoryPairs {
                got: self.memory_pairs,
                max,
            });
        }
        if !(0.0..=1.0).contains(&self.verbal_repeat_probability) {
            return Err(ConfigError::RepeatProbability(self.verbal_repeat_probability));
        }
        self.level_filter()?;
        Ok(())
    }

    pub fn level_filter(&self) -> Result<LevelFilter, ConfigError> {
        match self.log_level.trim().to_ascii_lowercase().as_str() {
            "off" => Ok(LevelFilter::OFF),
            "error" => Ok(LevelFilter::ERROR),
            "warn" => Ok(LevelFilter::WARN),
            "info" => Ok(LevelFilter::INFO),
            "debug" => Ok(LevelFilter::DEBUG),
            "trace" => Ok(LevelFilter::TRACE),
            _ => Err(ConfigError::LogLevel(self.log_level.clone())),
        }
    }

    /// Endpoint with blank strings treated as absent.
    pub fn endpoint(&self) -> Option<&str> {
        self.api_endpoint
            .as_deref()
            .map(str::trim)
            .filter(|s| !s.is_empty())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_object_yields_defaults() {
        let cfg = AppConfig::from_json("{}").unwrap();
        assert_eq!(cfg, AppConfig::default());
        assert_eq!(cfg.memory_pairs, 8);
        assert!(cfg.require_participant_code);
    }

    #[test]
    fn partial_json_overrides_only_given_fields() {
        let cfg = AppConfig::from_json(
            r#"{"api_endpoint":"https://collect.example/exec","memory_pairs":4}"#,
        )
        .unwrap();
        assert_eq!(cfg.endpoint(), Some("https://collect.example/exec"));
        assert_eq!(cfg.memory_pairs, 4);
        assert!((cfg.verbal_repeat_probability - 0.35).abs() < f64::EPSILON);
    }

    #[test]
    fn rejects_out_of_range_parameters() {
        assert!(matches!(
            AppConfig::from_json(r#"{"memory_pairs":0}"#),
            Err(ConfigError::MemoryPairs { .. })
        ));
        assert!(matches!(
            AppConfig::from_json(r#"{"memory_pairs":999}"#),
            Err(ConfigError::MemoryPairs { .. })
        ));
        assert!(matches!(
            AppConfig::from_json(r#"{"verbal_repeat_probability":1.5}"#),
            Err(ConfigError::RepeatProbability(_))
        ));
        assert!(matches!(
            AppConfig::from_json(r#"{"log_level":"loud"}"#),
            Err(ConfigError::LogLevel(_))
        ));
    }

    #[test]
    fn blank_endpoint_is_treated_as_absent() {
        let cfg = AppConfig {
            api_endpoint: Some("   ".into()),
            ..AppConfig::default()
        };
        assert_eq!(cfg.endpoint(), None);
    }
}
