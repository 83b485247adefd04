//! Summary statistics
//!
//! Recomputed from the final metric set on every run.

use esg_core::{CategoryCounts, EsgMetric, Summary};

/// Compute total count, per-category counts and average confidence
pub fn summarize(metrics: &[EsgMetric]) -> Summary {
    let mut metrics_by_category = CategoryCounts::default();
    for metric in metrics {
        metrics_by_category.record(metric.category);
    }

    Summary {
        total_metrics: metrics.len(),
        metrics_by_category,
        average_confidence: average_confidence(metrics),
    }
}

/// Mean confidence, 0.0 for an empty set
fn average_confidence(metrics: &[EsgMetric]) -> f32 {
    if metrics.is_empty() {
        return 0.0;
    }

    let total: f64 = metrics.iter().map(|m| f64::from(m.confidence)).sum();
    (total / metrics.len() as f64) as f32
}
