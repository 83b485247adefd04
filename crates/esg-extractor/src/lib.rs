//! ESG Extractor - Metric extraction pipeline
//!
//! Turns tables and key-value pairs from an [`ExtractionResult`] into a
//! deduplicated catalog of ESG metrics with summary statistics.
//!
//! - [`classifier`]: keyword-based category assignment
//! - [`value`]: numeric value and unit parsing
//! - [`table`] / [`kvp`]: per-source metric extraction
//! - [`summary`]: aggregate statistics
//! - [`processor`]: orchestration and deduplication

use esg_core::Category;

/// Trait for label classifiers
pub trait Categorizer: Send + Sync {
    /// Assign a category to a free-text label. Must be deterministic.
    fn categorize(&self, text: &str) -> Category;
}

pub mod classifier;
pub mod kvp;
pub mod processor;
pub mod summary;
pub mod table;
pub mod value;

pub use classifier::KeywordClassifier;
pub use kvp::extract_metrics_from_kvps;
pub use processor::EsgProcessor;
pub use summary::summarize;
pub use table::{extract_metrics_from_table, DEFAULT_TABLE_CONFIDENCE};
pub use value::{ParsedValue, ValueParser};

#[doc(no_inline)]
pub use esg_core::ExtractionResult;
