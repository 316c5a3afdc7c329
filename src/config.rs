// Engine Configuration
//
// Defines the tunable constants for the built-in graders, the meta-learning
// adaptation rules, and the collaborator timeout.

use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Failed to read config file: {0}")]
    IoError(#[from] std::io::Error),

    #[error("Failed to parse config: {0}")]
    ParseError(#[from] toml::de::Error),

    #[error("Invalid configuration: {0}")]
    ValidationError(String),
}

/// Main engine configuration
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct EngineConfig {
    /// Built-in grader settings
    #[serde(default)]
    pub grading: GradingConfig,

    /// Meta-learning settings
    #[serde(default)]
    pub adaptation: AdaptationConfig,

    /// Collaborator settings
    #[serde(default)]
    pub storage: StorageConfig,
}

/// Scoring knobs for the structural grader (and the graders that reuse them)
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct GradingConfig {
    /// Cyclomatic complexity above which a function is penalised
    pub complexity_ceiling: u32,

    /// Lines longer than this many characters are penalised
    pub max_line_length: usize,

    /// Deduction per undocumented function or class
    pub docstring_penalty: f64,

    /// Deduction per unit of complexity above the ceiling
    pub complexity_excess_penalty: f64,

    /// Comment-to-code ratio that earns the full comment bonus
    pub comment_ratio_cap: f64,

    /// Maximum readability bonus for comments
    pub comment_bonus: f64,

    /// Deduction per overly long line
    pub long_line_penalty: f64,

    /// Deduction per identifier shorter than two characters
    pub short_identifier_penalty: f64,

    /// Deduction per bare `except:` / `catch {}`
    pub bare_except_penalty: f64,

    /// Deduction per `except Exception` style handler
    pub broad_except_penalty: f64,

    /// Deduction per wildcard import
    pub wildcard_import_penalty: f64,

    /// Deduction per mutable default argument
    pub mutable_default_penalty: f64,

    /// Functions longer than this many lines are penalised by the speed grader
    pub max_function_lines: usize,
}

impl Default for GradingConfig {
    fn default() -> Self {
        Self {
            complexity_ceiling: 10,
            max_line_length: 100,
            docstring_penalty: 15.0,
            complexity_excess_penalty: 5.0,
            comment_ratio_cap: 0.2,
            comment_bonus: 20.0,
            long_line_penalty: 3.0,
            short_identifier_penalty: 5.0,
            bare_except_penalty: 20.0,
            broad_except_penalty: 10.0,
            wildcard_import_penalty: 15.0,
            mutable_default_penalty: 15.0,
            max_function_lines: 50,
        }
    }
}

/// Meta-learning adaptation rules
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct AdaptationConfig {
    /// EMA smoothing factor for improvement rates and skill estimate
    pub alpha: f64,

    /// Improvement rate below which a sub-metric is considered stagnant
    pub stagnation_threshold: f64,

    /// Improvement rate assigned to a sub-metric before any feedback
    pub initial_improvement_rate: f64,

    /// Weight added to a stagnant sub-metric per feedback event
    pub weight_step: f64,

    /// Lower bound for any single weight
    pub weight_floor: f64,

    /// Upper bound for any single weight
    pub weight_ceiling: f64,

    /// Points a threshold band moves per feedback event
    pub threshold_step: f64,

    /// No band may fall below this value
    pub band_min: f64,

    /// No band may rise above this value
    pub band_max: f64,

    /// Lowest accepted usefulness rating
    pub rating_min: u8,

    /// Highest accepted usefulness rating
    pub rating_max: u8,

    /// Ratings strictly below/above this are negative/positive
    pub rating_midpoint: u8,

    /// Number of recent verbosity signals considered by the majority vote
    pub verbosity_window: usize,

    /// Number of applied feedback fingerprints remembered per strategy
    pub duplicate_window: usize,

    /// Compare-and-swap attempts before giving up
    pub retry_budget: u32,
}

impl Default for AdaptationConfig {
    fn default() -> Self {
        Self {
            alpha: 0.2,
            stagnation_threshold: 0.3,
            initial_improvement_rate: 0.5,
            weight_step: 0.05,
            weight_floor: 0.05,
            weight_ceiling: 0.6,
            threshold_step: 2.0,
            band_min: 30.0,
            band_max: 95.0,
            rating_min: 1,
            rating_max: 5,
            rating_midpoint: 3,
            verbosity_window: 5,
            duplicate_window: 1024,
            retry_budget: 3,
        }
    }
}

/// Collaborator call settings
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct StorageConfig {
    /// Bound on every strategy store / ledger / pattern store call (milliseconds)
    #[serde(with = "serde_duration_ms")]
    pub timeout: Duration,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            timeout: Duration::from_millis(2000),
        }
    }
}

// Custom serde module for Duration (serialize/deserialize as milliseconds)
mod serde_duration_ms {
    use serde::{Deserialize, Deserializer, Serializer};
    use std::time::Duration;

    pub fn serialize<S>(duration: &Duration, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.serialize_u64(duration.as_millis() as u64)
    }

    pub fn deserialize<'de, D>(deserializer: D) -> Result<Duration, D::Error>
    where
        D: Deserializer<'de>,
    {
        let millis = u64::deserialize(deserializer)?;
        Ok(Duration::from_millis(millis))
    }
}

impl EngineConfig {
    /// Load configuration from TOML file
    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        let contents = std::fs::read_to_string(path)?;
        Self::from_toml(&contents)
    }

    /// Load configuration from TOML string
    pub fn from_toml(toml_str: &str) -> Result<Self, ConfigError> {
        let config: EngineConfig = toml::from_str(toml_str)?;
        config.validate()?;
        Ok(config)
    }

    /// Validate configuration values
    pub fn validate(&self) -> Result<(), ConfigError> {
        let g = &self.grading;
        if g.complexity_ceiling == 0 {
            return Err(ConfigError::ValidationError(
                "grading.complexity_ceiling must be at least 1".to_string(),
            ));
        }
        if g.max_line_length == 0 || g.max_function_lines == 0 {
            return Err(ConfigError::ValidationError(
                "grading line limits must be positive".to_string(),
            ));
        }
        if g.comment_ratio_cap <= 0.0 {
            return Err(ConfigError::ValidationError(
                "grading.comment_ratio_cap must be positive".to_string(),
            ));
        }
        if !(0.0..=100.0).contains(&g.comment_bonus) {
            return Err(ConfigError::ValidationError(
                "grading.comment_bonus must be within [0, 100]".to_string(),
            ));
        }

        let a = &self.adaptation;
        if !(a.alpha > 0.0 && a.alpha <= 1.0) {
            return Err(ConfigError::ValidationError(
                "adaptation.alpha must be within (0, 1]".to_string(),
            ));
        }
        if a.weight_floor < 0.0 || a.weight_floor >= a.weight_ceiling || a.weight_ceiling > 1.0 {
            return Err(ConfigError::ValidationError(
                "adaptation weights require 0 <= floor < ceiling <= 1".to_string(),
            ));
        }
        if a.weight_step <= 0.0 || a.threshold_step <= 0.0 {
            return Err(ConfigError::ValidationError(
                "adaptation steps must be positive".to_string(),
            ));
        }
        if a.band_min >= a.band_max {
            return Err(ConfigError::ValidationError(
                "adaptation.band_min must be below band_max".to_string(),
            ));
        }
        if !(a.rating_min < a.rating_midpoint && a.rating_midpoint < a.rating_max) {
            return Err(ConfigError::ValidationError(
                "adaptation ratings require min < midpoint < max".to_string(),
            ));
        }
        if a.verbosity_window == 0 || a.duplicate_window == 0 || a.retry_budget == 0 {
            return Err(ConfigError::ValidationError(
                "adaptation windows and retry budget must be positive".to_string(),
            ));
        }

        if self.storage.timeout.is_zero() {
            return Err(ConfigError::ValidationError(
                "storage.timeout must be positive".to_string(),
            ));
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config_is_valid() {
        let config = EngineConfig::default();
        assert!(config.validate().is_ok());
        assert_eq!(config.grading.complexity_ceiling, 10);
        assert_eq!(config.grading.max_line_length, 100);
        assert!((config.adaptation.alpha - 0.2).abs() < f64::EPSILON);
        assert!((config.adaptation.weight_step - 0.05).abs() < f64::EPSILON);
        assert_eq!(config.storage.timeout, Duration::from_millis(2000));
    }

    #[test]
    fn test_partial_toml_uses_defaults() {
        let toml_str = r#"
            [grading]
            complexity_ceiling = 8

            [storage]
            timeout = 500
        "#;

        let config = EngineConfig::from_toml(toml_str).unwrap();
        assert_eq!(config.grading.complexity_ceiling, 8);
        assert_eq!(config.grading.max_line_length, 100);
        assert_eq!(config.storage.timeout, Duration::from_millis(500));
        assert_eq!(config.adaptation.verbosity_window, 5);
    }

    #[test]
    fn test_invalid_alpha_rejected() {
        let toml_str = r#"
            [adaptation]
            alpha = 1.5
        "#;

        let result = EngineConfig::from_toml(toml_str);
        assert!(matches!(result, Err(ConfigError::ValidationError(_))));
    }

    #[test]
    fn test_inverted_weight_bounds_rejected() {
        let mut config = EngineConfig::default();
        config.adaptation.weight_floor = 0.7;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_from_file() {
        let dir = tempfile::TempDir::new().unwrap();
        let path = dir.path().join("toasty.toml");
        std::fs::write(&path, "[adaptation]\nthreshold_step = 1.0\n").unwrap();

        let config = EngineConfig::from_file(&path).unwrap();
        assert!((config.adaptation.threshold_step - 1.0).abs() < f64::EPSILON);
    }

    #[test]
    fn test_malformed_toml() {
        let result = EngineConfig::from_toml("[grading\ncomplexity_ceiling = ");
        assert!(matches!(result, Err(ConfigError::ParseError(_))));
    }
}
