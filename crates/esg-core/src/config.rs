//! ESG Configuration Management
//!
//! Handles configuration from environment variables and TOML files with
//! defaults matching the standard extraction behavior.

use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Main application configuration
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
#[serde(default)]
pub struct AppConfig {
    /// Metric extraction policy
    pub extraction: ExtractionConfig,

    /// Classifier keyword lists
    pub classifier: ClassifierConfig,

    /// Input file limits
    pub analyzer: AnalyzerConfig,

    /// Retry policy for the analyzer call
    pub retry: RetryConfig,

    /// Logging configuration
    pub logging: LoggingConfig,
}

impl AppConfig {
    /// Load configuration from environment variables
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::default().with_env_override()
    }

    /// Load from a TOML file
    pub fn from_file(path: impl Into<PathBuf>) -> Result<Self, ConfigError> {
        let path = path.into();
        let content = std::fs::read_to_string(&path).map_err(|e| ConfigError::FileReadError {
            path: path.clone(),
            source: e,
        })?;

        toml::from_str(&content).map_err(|e| ConfigError::ParseError {
            path,
            message: e.to_string(),
        })
    }

    /// Apply environment variables on top of this config (env takes precedence)
    pub fn with_env_override(mut self) -> Result<Self, ConfigError> {
        // Extraction
        if let Some(v) = env_parse("ESG_KVP_MIN_CONFIDENCE")? {
            self.extraction.kvp_min_confidence = v;
        }
        if let Some(v) = env_parse("ESG_TABLE_CONFIDENCE")? {
            self.extraction.table_confidence = v;
        }
        if let Some(v) = env_parse("ESG_INCLUDE_UNKNOWN")? {
            self.extraction.include_unknown = v;
        }

        // Analyzer
        if let Some(v) = env_parse("ESG_MAX_FILE_SIZE_MB")? {
            self.analyzer.max_file_size_mb = v;
        }

        // Retry
        if let Some(v) = env_parse("ESG_RETRY_MAX_ATTEMPTS")? {
            self.retry.max_attempts = v;
        }
        if let Some(v) = env_parse("ESG_RETRY_BASE_DELAY_MS")? {
            self.retry.base_delay_ms = v;
        }
        if let Some(v) = env_parse("ESG_RETRY_BACKOFF")? {
            self.retry.backoff = v;
        }

        // Logging
        if let Ok(level) = std::env::var("LOG_LEVEL") {
            self.logging.level = level;
        }
        if let Some(v) = env_parse("LOG_JSON")? {
            self.logging.json_format = v;
        }

        Ok(self)
    }

    /// Check value ranges
    pub fn validate(&self) -> Result<(), ConfigError> {
        check_unit_interval(
            "extraction.kvp_min_confidence",
            self.extraction.kvp_min_confidence,
        )?;
        check_unit_interval(
            "extraction.table_confidence",
            self.extraction.table_confidence,
        )?;

        for (key, keywords) in [
            ("classifier.environmental", &self.classifier.environmental),
            ("classifier.social", &self.classifier.social),
            ("classifier.governance", &self.classifier.governance),
        ] {
            if keywords.iter().all(|k| k.trim().is_empty()) {
                return Err(ConfigError::MissingRequired(key.to_string()));
            }
        }

        if self.analyzer.allowed_extensions.is_empty() {
            return Err(ConfigError::MissingRequired(
                "analyzer.allowed_extensions".to_string(),
            ));
        }

        if self.retry.max_attempts == 0 {
            return Err(ConfigError::InvalidValue {
                key: "retry.max_attempts".to_string(),
                value: "0".to_string(),
            });
        }
        if self.retry.backoff.is_nan() || self.retry.backoff < 1.0 {
            return Err(ConfigError::InvalidValue {
                key: "retry.backoff".to_string(),
                value: self.retry.backoff.to_string(),
            });
        }

        Ok(())
    }
}

fn env_parse<T: std::str::FromStr>(key: &str) -> Result<Option<T>, ConfigError> {
    match std::env::var(key) {
        Ok(value) => value
            .trim()
            .parse()
            .map(Some)
            .map_err(|_| ConfigError::InvalidValue {
                key: key.to_string(),
                value,
            }),
        Err(_) => Ok(None),
    }
}

fn check_unit_interval(key: &str, value: f32) -> Result<(), ConfigError> {
    if (0.0..=1.0).contains(&value) {
        Ok(())
    } else {
        Err(ConfigError::InvalidValue {
            key: key.to_string(),
            value: value.to_string(),
        })
    }
}

/// Metric extraction policy
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ExtractionConfig {
    /// Key-value pairs below this confidence are discarded
    pub kvp_min_confidence: f32,

    /// Confidence assigned to every table-derived metric
    pub table_confidence: f32,

    /// Keep metrics whose label matched no category
    pub include_unknown: bool,
}

impl Default for ExtractionConfig {
    fn default() -> Self {
        Self {
            kvp_min_confidence: 0.5,
            table_confidence: 0.9,
            include_unknown: true,
        }
    }
}

/// Keyword lists per category, matched case-insensitively as substrings
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ClassifierConfig {
    pub environmental: Vec<String>,
    pub social: Vec<String>,
    pub governance: Vec<String>,
}

impl Default for ClassifierConfig {
    fn default() -> Self {
        fn owned(words: &[&str]) -> Vec<String> {
            words.iter().map(|w| w.to_string()).collect()
        }

        Self {
            environmental: owned(&[
                "carbon",
                "emission",
                "ghg",
                "renewable",
                "energy",
                "water",
                "waste",
                "climate",
                "co2",
                "greenhouse",
                "biodiversity",
                "pollution",
            ]),
            social: owned(&[
                "employee",
                "diversity",
                "safety",
                "community",
                "customer",
                "privacy",
                "labor",
                "labour",
                "gender",
                "training",
                "human rights",
                "turnover",
                "injury",
            ]),
            governance: owned(&[
                "board",
                "compliance",
                "audit",
                "ethics",
                "risk management",
                "executive",
                "governance",
                "corruption",
                "bribery",
                "shareholder",
                "whistleblow",
            ]),
        }
    }
}

/// Input file limits applied before analysis
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct AnalyzerConfig {
    /// Maximum accepted file size in megabytes
    pub max_file_size_mb: u64,

    /// Accepted file extensions, without the leading dot
    pub allowed_extensions: Vec<String>,
}

impl AnalyzerConfig {
    pub fn max_file_size_bytes(&self) -> u64 {
        self.max_file_size_mb.saturating_mul(1024 * 1024)
    }
}

impl Default for AnalyzerConfig {
    fn default() -> Self {
        Self {
            max_file_size_mb: 50,
            allowed_extensions: vec!["xlsx".to_string(), "xls".to_string(), "xlsm".to_string()],
        }
    }
}

/// Retry policy for the external analyzer call
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RetryConfig {
    /// Total attempts, including the first
    pub max_attempts: u32,

    /// Delay before the second attempt in milliseconds
    pub base_delay_ms: u64,

    /// Multiplier applied to the delay after each failed attempt
    pub backoff: f64,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            base_delay_ms: 2000,
            backoff: 2.0,
        }
    }
}

/// Logging configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// Log level (trace, debug, info, warn, error)
    pub level: String,

    /// JSON format for logs
    pub json_format: bool,

    /// Include file/line in logs
    pub include_location: bool,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            json_format: false,
            include_location: false,
        }
    }
}

/// Configuration errors
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Failed to read config file {path}: {source}")]
    FileReadError {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to parse config file {path}: {message}")]
    ParseError { path: PathBuf, message: String },

    #[error("Invalid value for {key}: {value}")]
    InvalidValue { key: String, value: String },

    #[error("Missing required configuration: {0}")]
    MissingRequired(String),
}
