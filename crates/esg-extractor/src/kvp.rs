//! Key-value pair metric extraction
//!
//! Unlike table metrics, a key-value metric keeps the confidence the
//! upstream service reported for its pair.

use esg_core::{EsgMetric, MetricSource, RawKeyValuePair};

use crate::value::ValueParser;
use crate::Categorizer;

/// Extract metrics from key-value pairs, in input order.
///
/// Pairs with an empty key or value, or with confidence below
/// `min_confidence`, are discarded, as are pairs whose value does not parse.
pub fn extract_metrics_from_kvps(
    kvps: &[RawKeyValuePair],
    classifier: &dyn Categorizer,
    parser: &ValueParser,
    min_confidence: f32,
) -> Vec<EsgMetric> {
    kvps.iter()
        .filter(|kvp| {
            let valid = kvp.is_valid(min_confidence);
            if !valid {
                tracing::debug!(
                    key = %kvp.key,
                    confidence = kvp.confidence,
                    "Discarding invalid key-value pair"
                );
            }
            valid
        })
        .filter_map(|kvp| {
            let Some(parsed) = parser.parse(&kvp.value) else {
                tracing::debug!(key = %kvp.key, value = %kvp.value, "Unparseable key-value value");
                return None;
            };

            EsgMetric::new(
                classifier.categorize(&kvp.key),
                &kvp.key,
                parsed.value,
                parsed.unit,
                kvp.confidence,
                MetricSource::KeyValuePair,
            )
        })
        .collect()
}
