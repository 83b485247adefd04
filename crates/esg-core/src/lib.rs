//! ESG Core - Domain models, payload schema and shared types
//!
//! This crate defines the core abstractions used throughout the ESG
//! extraction workspace:
//! - Input payload model (tables, cells, key-value pairs) and its
//!   boundary validation
//! - Metric, summary and report models
//! - Common error types
//! - Configuration management

pub mod config;
pub mod payload;

pub use config::{
    AnalyzerConfig, AppConfig, ClassifierConfig, ConfigError, ExtractionConfig, LoggingConfig,
    RetryConfig,
};
pub use payload::{ExtractionResult, RawCell, RawKeyValuePair, RawTable};

use serde::{Deserialize, Serialize};
use thiserror::Error;

// ============================================================================
// Error Types
// ============================================================================

/// Core error types for ESG extraction
#[derive(Error, Debug)]
pub enum EsgError {
    /// The input payload is structurally unusable
    #[error("Invalid input payload: {0}")]
    InvalidInput(String),

    #[error("Configuration error: {0}")]
    ConfigError(String),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

impl From<ConfigError> for EsgError {
    fn from(err: ConfigError) -> Self {
        Self::ConfigError(err.to_string())
    }
}

pub type Result<T> = std::result::Result<T, EsgError>;

// ============================================================================
// Metric Models
// ============================================================================

/// ESG classification bucket
///
/// Declaration order is the classification priority order.
#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
#[serde(rename_all = "lowercase")]
pub enum Category {
    Environmental,
    Social,
    Governance,
    #[default]
    Unknown,
}

impl Category {
    /// Categories a label can be classified into, in priority order
    pub const PRIORITY: [Category; 3] = [Self::Environmental, Self::Social, Self::Governance];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Environmental => "environmental",
            Self::Social => "social",
            Self::Governance => "governance",
            Self::Unknown => "unknown",
        }
    }
}

impl std::fmt::Display for Category {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Where a metric was found in the extraction payload
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MetricSource {
    Table,
    KeyValuePair,
}

impl std::fmt::Display for MetricSource {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Table => write!(f, "table"),
            Self::KeyValuePair => write!(f, "key_value_pair"),
        }
    }
}

/// A single quantified ESG data point
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EsgMetric {
    pub category: Category,

    /// Trimmed, never empty
    pub metric_name: String,

    /// Always a finite parsed number
    pub value: f64,

    pub unit: Option<String>,

    /// Extraction reliability (0.0 - 1.0)
    pub confidence: f32,

    pub source: MetricSource,
}

impl EsgMetric {
    /// Create a metric, returning `None` when the trimmed name is empty
    /// or the value is not finite.
    pub fn new(
        category: Category,
        metric_name: &str,
        value: f64,
        unit: Option<String>,
        confidence: f32,
        source: MetricSource,
    ) -> Option<Self> {
        let metric_name = metric_name.trim();
        if metric_name.is_empty() || !value.is_finite() {
            return None;
        }

        Some(Self {
            category,
            metric_name: metric_name.to_string(),
            value,
            unit,
            confidence,
            source,
        })
    }
}

/// Metric counts per category
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CategoryCounts {
    pub environmental: usize,
    pub social: usize,
    pub governance: usize,
    #[serde(default, skip_serializing_if = "is_zero")]
    pub unknown: usize,
}

fn is_zero(n: &usize) -> bool {
    *n == 0
}

impl CategoryCounts {
    /// Increment the counter for a category
    pub fn record(&mut self, category: Category) {
        match category {
            Category::Environmental => self.environmental += 1,
            Category::Social => self.social += 1,
            Category::Governance => self.governance += 1,
            Category::Unknown => self.unknown += 1,
        }
    }

    pub fn get(&self, category: Category) -> usize {
        match category {
            Category::Environmental => self.environmental,
            Category::Social => self.social,
            Category::Governance => self.governance,
            Category::Unknown => self.unknown,
        }
    }
}

/// Aggregate statistics over a final metric set
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Summary {
    pub total_metrics: usize,
    pub metrics_by_category: CategoryCounts,
    /// Zero when there are no metrics
    pub average_confidence: f32,
}

/// The structured result of one processing run
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EsgReport {
    pub filename: String,
    pub metrics: Vec<EsgMetric>,
    pub summary: Summary,
    pub processing_metadata: serde_json::Map<String, serde_json::Value>,
}

impl EsgReport {
    /// Serialize as pretty-printed JSON
    pub fn to_json_pretty(&self) -> Result<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    /// Metrics of one category, in report order
    pub fn metrics_in(&self, category: Category) -> impl Iterator<Item = &EsgMetric> {
        self.metrics.iter().filter(move |m| m.category == category)
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_category_serialization() {
        assert_eq!(
            serde_json::to_string(&Category::Environmental).unwrap(),
            "\"environmental\""
        );
        assert_eq!(Category::Governance.to_string(), "governance");
        assert_eq!(
            serde_json::to_string(&MetricSource::KeyValuePair).unwrap(),
            "\"key_value_pair\""
        );
    }

    #[test]
    fn test_category_priority_order() {
        assert_eq!(
            Category::PRIORITY,
            [
                Category::Environmental,
                Category::Social,
                Category::Governance
            ]
        );
        assert!(Category::Environmental < Category::Unknown);
    }

    #[test]
    fn test_metric_rejects_empty_name() {
        let metric = EsgMetric::new(
            Category::Social,
            "   ",
            1.0,
            None,
            0.9,
            MetricSource::Table,
        );
        assert!(metric.is_none());
    }

    #[test]
    fn test_metric_rejects_non_finite_value() {
        let metric = EsgMetric::new(
            Category::Social,
            "Turnover",
            f64::INFINITY,
            None,
            0.9,
            MetricSource::Table,
        );
        assert!(metric.is_none());
    }

    #[test]
    fn test_metric_trims_name() {
        let metric = EsgMetric::new(
            Category::Environmental,
            "  Water use ",
            12.0,
            Some("m3".to_string()),
            0.8,
            MetricSource::KeyValuePair,
        )
        .unwrap();
        assert_eq!(metric.metric_name, "Water use");
    }

    #[test]
    fn test_category_counts_serialization() {
        let mut counts = CategoryCounts::default();
        counts.record(Category::Environmental);
        counts.record(Category::Environmental);
        counts.record(Category::Governance);

        let json = serde_json::to_value(&counts).unwrap();
        assert_eq!(json["environmental"], 2);
        assert_eq!(json["social"], 0);
        assert_eq!(json["governance"], 1);
        assert!(json.get("unknown").is_none());

        counts.record(Category::Unknown);
        let json = serde_json::to_value(&counts).unwrap();
        assert_eq!(json["unknown"], 1);
        assert_eq!(counts.get(Category::Unknown), 1);
    }

    #[test]
    fn test_metric_json_shape() {
        let metric = EsgMetric::new(
            Category::Environmental,
            "Carbon Emissions",
            1234.0,
            None,
            0.9,
            MetricSource::Table,
        )
        .unwrap();

        let json = serde_json::to_value(&metric).unwrap();
        assert_eq!(json["category"], "environmental");
        assert_eq!(json["metric_name"], "Carbon Emissions");
        assert_eq!(json["value"], 1234.0);
        assert!(json["unit"].is_null());
        assert_eq!(json["source"], "table");
    }
}
