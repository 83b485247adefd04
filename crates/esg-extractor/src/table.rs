//! Table metric extraction
//!
//! Row 0 of every table is treated as the header row. This is a literal
//! limitation: tables without a header row lose their first data row, and
//! multi-row headers leak into the data rows (where they are normally
//! dropped because their "value" cell does not parse as a number).
//!
//! Every later row with at least two populated cells yields one candidate:
//! the cell in the table's first column is the label and the cell in its
//! second column is the value. Cells are paired by position, never shifted
//! past blanks, so a row with an empty label or empty value cell is skipped.

use esg_core::{EsgMetric, MetricSource, RawCell, RawTable};

use crate::value::ValueParser;
use crate::Categorizer;

/// Confidence given to table-derived metrics.
///
/// Table layout carries no per-cell confidence signal, so every metric from
/// a table gets this fixed value.
pub const DEFAULT_TABLE_CONFIDENCE: f32 = 0.9;

/// Index of the row treated as header
const HEADER_ROW: usize = 0;

/// Extract metrics from one table, in row order
pub fn extract_metrics_from_table(
    table: &RawTable,
    table_index: usize,
    classifier: &dyn Categorizer,
    parser: &ValueParser,
    confidence: f32,
) -> Vec<EsgMetric> {
    let mut metrics = Vec::new();
    let first_column = table
        .cells
        .iter()
        .map(|c| c.column_index)
        .min()
        .unwrap_or(0);

    for (row_index, cells) in table.rows() {
        if row_index == HEADER_ROW {
            continue;
        }

        if cells.iter().filter(|c| c.is_populated()).count() < 2 {
            tracing::debug!(
                table = table_index,
                row = row_index,
                "Skipping row with fewer than two populated cells"
            );
            continue;
        }

        let label = content_at(&cells, first_column);
        let raw_value = content_at(&cells, first_column.saturating_add(1));

        if label.is_empty() {
            tracing::debug!(
                table = table_index,
                row = row_index,
                "Skipping row with empty label"
            );
            continue;
        }

        let Some(parsed) = parser.parse(raw_value) else {
            tracing::debug!(
                table = table_index,
                row = row_index,
                value = %raw_value,
                "Skipping row with unparseable value"
            );
            continue;
        };

        let category = classifier.categorize(label);
        if let Some(metric) = EsgMetric::new(
            category,
            label,
            parsed.value,
            parsed.unit,
            confidence,
            MetricSource::Table,
        ) {
            metrics.push(metric);
        }
    }

    tracing::debug!(
        table = table_index,
        metrics = metrics.len(),
        "Extracted table metrics"
    );

    metrics
}

/// Trimmed content of the cell in `column`; a missing cell is blank
fn content_at<'a>(cells: &[&'a RawCell], column: usize) -> &'a str {
    cells
        .iter()
        .find(|c| c.column_index == column)
        .map_or("", |c| c.content.trim())
}

// ============================================================================
// Tests
// ============================================================================
