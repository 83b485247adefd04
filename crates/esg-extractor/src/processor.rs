//! ESG processor
//!
//! Orchestrates extraction over a whole payload: tables first (in input
//! order), then key-value pairs, followed by deduplication and the
//! summary. The processor holds only immutable collaborators, so a single
//! instance can serve concurrent callers on independent payloads.

use std::collections::HashSet;

use serde_json::{Map, Value};

use esg_core::{
    AppConfig, Category, EsgMetric, EsgReport, ExtractionConfig, ExtractionResult,
    RawKeyValuePair, RawTable, Result,
};

use crate::classifier::KeywordClassifier;
use crate::value::{ParsedValue, ValueParser};
use crate::{kvp, summary, table, Categorizer};

/// Identity of a metric for deduplication
type MetricKey = (Category, String, u64, Option<String>);

fn metric_key(metric: &EsgMetric) -> MetricKey {
    // -0.0 and 0.0 are the same value
    let value = if metric.value == 0.0 { 0.0 } else { metric.value };
    (
        metric.category,
        metric.metric_name.clone(),
        value.to_bits(),
        metric.unit.clone(),
    )
}

/// Extraction pipeline over injected collaborators
pub struct EsgProcessor {
    classifier: Box<dyn Categorizer>,
    parser: ValueParser,
    config: ExtractionConfig,
}

impl EsgProcessor {
    /// Create a processor with default keywords and policy
    pub fn new() -> Self {
        Self {
            classifier: Box::new(KeywordClassifier::new()),
            parser: ValueParser::new(),
            config: ExtractionConfig::default(),
        }
    }

    /// Create a processor from validated application config
    pub fn from_config(config: &AppConfig) -> Result<Self> {
        config.validate()?;

        Ok(Self {
            classifier: Box::new(KeywordClassifier::from_config(&config.classifier)),
            parser: ValueParser::new(),
            config: config.extraction.clone(),
        })
    }

    /// Replace the classifier
    pub fn with_classifier(mut self, classifier: impl Categorizer + 'static) -> Self {
        self.classifier = Box::new(classifier);
        self
    }

    /// Replace the extraction policy
    pub fn with_extraction_config(mut self, config: ExtractionConfig) -> Self {
        self.config = config;
        self
    }

    pub fn config(&self) -> &ExtractionConfig {
        &self.config
    }

    pub fn categorize(&self, text: &str) -> Category {
        self.classifier.categorize(text)
    }

    pub fn parse_value(&self, text: &str) -> Option<ParsedValue> {
        self.parser.parse(text)
    }

    pub fn extract_metrics_from_table(&self, table: &RawTable, table_index: usize) -> Vec<EsgMetric> {
        table::extract_metrics_from_table(
            table,
            table_index,
            self.classifier.as_ref(),
            &self.parser,
            self.config.table_confidence,
        )
    }

    pub fn extract_metrics_from_kvps(&self, kvps: &[RawKeyValuePair]) -> Vec<EsgMetric> {
        kvp::extract_metrics_from_kvps(
            kvps,
            self.classifier.as_ref(),
            &self.parser,
            self.config.kvp_min_confidence,
        )
    }

    /// Run the full pipeline over a validated payload
    pub fn process(&self, input: &ExtractionResult) -> EsgReport {
        let mut candidates = Vec::new();
        for (idx, table) in input.tables.iter().enumerate() {
            candidates.extend(self.extract_metrics_from_table(table, idx));
        }
        let table_count = candidates.len();
        candidates.extend(self.extract_metrics_from_kvps(&input.key_value_pairs));

        let candidate_count = candidates.len();
        let metrics = self.deduplicate(candidates);
        let summary = summary::summarize(&metrics);

        tracing::info!(
            filename = %input.filename,
            tables = input.tables.len(),
            key_value_pairs = input.key_value_pairs.len(),
            table_metrics = table_count,
            kvp_metrics = candidate_count - table_count,
            metrics = metrics.len(),
            "Processed ESG payload"
        );

        EsgReport {
            filename: input.filename.clone(),
            metrics,
            summary,
            processing_metadata: Self::passthrough_metadata(input),
        }
    }

    /// Validate a raw JSON payload, then run the pipeline
    pub fn process_json(&self, payload: Value) -> Result<EsgReport> {
        let input = ExtractionResult::from_value(payload)?;
        Ok(self.process(&input))
    }

    /// Keep the first occurrence of each (category, name, value, unit)
    /// and apply the unknown-category policy
    fn deduplicate(&self, candidates: Vec<EsgMetric>) -> Vec<EsgMetric> {
        let mut seen: HashSet<MetricKey> = HashSet::new();

        candidates
            .into_iter()
            .filter(|m| self.config.include_unknown || m.category != Category::Unknown)
            .filter(|m| seen.insert(metric_key(m)))
            .collect()
    }

    fn passthrough_metadata(input: &ExtractionResult) -> Map<String, Value> {
        let mut metadata = Map::new();
        metadata.insert(
            "document_intelligence_metadata".to_string(),
            Value::Object(input.metadata.clone()),
        );
        if let Some(ts) = input.analysis_timestamp {
            metadata.insert("processing_timestamp".to_string(), Value::from(ts));
        }
        metadata
    }
}

impl Default for EsgProcessor {
    fn default() -> Self {
        Self::new()
    }
}

// ============================================================================
// Tests
// ============================================================================
