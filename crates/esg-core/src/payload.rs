//! Extraction payload model
//!
//! The upstream document-understanding service hands over a loosely-typed
//! JSON payload in which almost every field may be missing. This module
//! defines the optional-field wire schema, validates it once, and produces
//! the fully-typed [`ExtractionResult`] the extractors work against.
//!
//! Malformed individual entries (a cell without a position, a table that is
//! not an object) are dropped here. Only a payload that is structurally
//! unusable as a whole is rejected.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::{EsgError, Result};

/// Filename used when the payload does not carry one
pub const UNKNOWN_FILENAME: &str = "unknown";

// ============================================================================
// Typed Model
// ============================================================================

/// A table cell, modeled at its anchor position
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RawCell {
    pub row_index: usize,
    pub column_index: usize,
    pub content: String,
    pub row_span: u32,
    pub column_span: u32,
    pub is_header: bool,
}

impl RawCell {
    /// Create a single-span cell; row 0 is flagged as header
    pub fn new(row_index: usize, column_index: usize, content: impl Into<String>) -> Self {
        Self {
            row_index,
            column_index,
            content: content.into(),
            row_span: 1,
            column_span: 1,
            is_header: row_index == 0,
        }
    }

    /// Set spans (clamped to at least 1)
    pub fn with_spans(mut self, row_span: u32, column_span: u32) -> Self {
        self.row_span = row_span.max(1);
        self.column_span = column_span.max(1);
        self
    }

    pub fn position(&self) -> (usize, usize) {
        (self.row_index, self.column_index)
    }

    /// Whether the cell carries any non-whitespace content
    pub fn is_populated(&self) -> bool {
        !self.content.trim().is_empty()
    }
}

/// A table as produced by the upstream extractor
///
/// Cells are kept sorted by `(row_index, column_index)` with unique
/// positions.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RawTable {
    pub table_id: usize,
    pub row_count: usize,
    pub column_count: usize,
    pub cells: Vec<RawCell>,
    pub headers: Vec<String>,
}

impl RawTable {
    /// Build a table from cells in any order.
    ///
    /// Dimensions are derived from the cell positions and headers from the
    /// row 0 contents. When two cells share a position the first one wins.
    pub fn new(table_id: usize, mut cells: Vec<RawCell>) -> Self {
        cells.sort_by_key(RawCell::position);
        cells.dedup_by_key(|c| c.position());

        let row_count = cells
            .iter()
            .map(|c| c.row_index.saturating_add(1))
            .max()
            .unwrap_or(0);
        let column_count = cells
            .iter()
            .map(|c| c.column_index.saturating_add(1))
            .max()
            .unwrap_or(0);
        let headers = cells
            .iter()
            .filter(|c| c.row_index == 0)
            .map(|c| c.content.clone())
            .collect();

        Self {
            table_id,
            row_count,
            column_count,
            cells,
            headers,
        }
    }

    /// Group cells by row, in row order
    pub fn rows(&self) -> Vec<(usize, Vec<&RawCell>)> {
        let mut rows: Vec<(usize, Vec<&RawCell>)> = Vec::new();

        for cell in &self.cells {
            match rows.last_mut() {
                Some((row, cells)) if *row == cell.row_index => cells.push(cell),
                _ => rows.push((cell.row_index, vec![cell])),
            }
        }

        rows
    }

    pub fn is_empty(&self) -> bool {
        self.cells.is_empty()
    }
}

/// A label/value association detected outside tabular structure
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RawKeyValuePair {
    pub key: String,
    pub value: String,
    pub confidence: f32,
}

impl RawKeyValuePair {
    pub fn new(key: impl Into<String>, value: impl Into<String>, confidence: f32) -> Self {
        Self {
            key: key.into(),
            value: value.into(),
            confidence,
        }
    }

    /// Both sides non-empty and confidence at or above `min_confidence`
    pub fn is_valid(&self, min_confidence: f32) -> bool {
        !self.key.trim().is_empty()
            && !self.value.trim().is_empty()
            && self.confidence >= min_confidence
    }
}

/// Fully-typed extraction payload
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExtractionResult {
    pub filename: String,
    pub tables: Vec<RawTable>,
    pub key_value_pairs: Vec<RawKeyValuePair>,

    /// Passthrough: full document content
    pub content: Option<String>,

    /// Passthrough: per-page data, never interpreted
    pub pages: Vec<Value>,

    /// Passthrough: analyzer metadata, never interpreted
    pub metadata: Map<String, Value>,

    /// Passthrough: when the upstream analysis ran (seconds since epoch)
    pub analysis_timestamp: Option<f64>,
}

impl ExtractionResult {
    /// Create an empty payload for a file
    pub fn new(filename: impl Into<String>) -> Self {
        Self {
            filename: filename.into(),
            tables: Vec::new(),
            key_value_pairs: Vec::new(),
            content: None,
            pages: Vec::new(),
            metadata: Map::new(),
            analysis_timestamp: None,
        }
    }

    pub fn with_tables(mut self, tables: Vec<RawTable>) -> Self {
        self.tables = tables;
        self
    }

    pub fn with_key_value_pairs(mut self, kvps: Vec<RawKeyValuePair>) -> Self {
        self.key_value_pairs = kvps;
        self
    }

    /// Validate a raw JSON payload into the typed model
    pub fn from_value(value: Value) -> Result<Self> {
        if !value.is_object() {
            return Err(EsgError::InvalidInput(
                "payload must be a JSON object".to_string(),
            ));
        }

        let wire: WirePayload = serde_json::from_value(value)
            .map_err(|e| EsgError::InvalidInput(e.to_string()))?;
        wire.try_into()
    }

    /// Parse and validate a JSON document
    pub fn from_json_str(json: &str) -> Result<Self> {
        let value: Value =
            serde_json::from_str(json).map_err(|e| EsgError::InvalidInput(e.to_string()))?;
        Self::from_value(value)
    }
}

// ============================================================================
// Wire Schema
// ============================================================================

#[derive(Debug, Deserialize)]
struct WirePayload {
    filename: Option<String>,
    tables: Option<Vec<Value>>,
    key_value_pairs: Option<Vec<Value>>,
    content: Option<String>,
    pages: Option<Vec<Value>>,
    metadata: Option<Map<String, Value>>,
    analysis_timestamp: Option<f64>,
}

#[derive(Debug, Deserialize)]
struct WireTable {
    table_id: Option<usize>,
    row_count: Option<usize>,
    column_count: Option<usize>,
    cells: Option<Vec<Value>>,
    headers: Option<Vec<String>>,
}

#[derive(Debug, Deserialize)]
struct WireCell {
    row_index: Option<usize>,
    column_index: Option<usize>,
    content: Option<String>,
    row_span: Option<u32>,
    column_span: Option<u32>,
    is_header: Option<bool>,
}

#[derive(Debug, Deserialize)]
struct WireKeyValuePair {
    key: Option<String>,
    value: Option<String>,
    confidence: Option<f32>,
}

impl TryFrom<WirePayload> for ExtractionResult {
    type Error = EsgError;

    fn try_from(wire: WirePayload) -> Result<Self> {
        if wire.tables.is_none() && wire.key_value_pairs.is_none() {
            return Err(EsgError::InvalidInput(
                "payload has neither `tables` nor `key_value_pairs`".to_string(),
            ));
        }

        let tables = wire
            .tables
            .unwrap_or_default()
            .into_iter()
            .enumerate()
            .filter_map(|(idx, value)| match serde_json::from_value::<WireTable>(value) {
                Ok(table) => Some(table.into_table(idx)),
                Err(e) => {
                    tracing::debug!("Dropping malformed table {}: {}", idx, e);
                    None
                }
            })
            .collect();

        let key_value_pairs = wire
            .key_value_pairs
            .unwrap_or_default()
            .into_iter()
            .filter_map(
                |value| match serde_json::from_value::<WireKeyValuePair>(value) {
                    Ok(kvp) => Some(kvp.into()),
                    Err(e) => {
                        tracing::debug!("Dropping malformed key-value pair: {}", e);
                        None
                    }
                },
            )
            .collect();

        Ok(Self {
            filename: wire
                .filename
                .unwrap_or_else(|| UNKNOWN_FILENAME.to_string()),
            tables,
            key_value_pairs,
            content: wire.content,
            pages: wire.pages.unwrap_or_default(),
            metadata: wire.metadata.unwrap_or_default(),
            analysis_timestamp: wire.analysis_timestamp,
        })
    }
}

impl WireTable {
    fn into_table(self, idx: usize) -> RawTable {
        let cells = self
            .cells
            .unwrap_or_default()
            .into_iter()
            .filter_map(|value| {
                let cell: WireCell = serde_json::from_value(value).ok()?;
                cell.into_cell()
            })
            .collect();

        let mut table = RawTable::new(self.table_id.unwrap_or(idx), cells);
        table.row_count = table.row_count.max(self.row_count.unwrap_or(0));
        table.column_count = table.column_count.max(self.column_count.unwrap_or(0));
        if let Some(headers) = self.headers {
            table.headers = headers;
        }
        table
    }
}

impl WireCell {
    /// A cell without both indices has no position and is dropped
    fn into_cell(self) -> Option<RawCell> {
        let row_index = self.row_index?;
        let column_index = self.column_index?;

        Some(RawCell {
            row_index,
            column_index,
            content: self.content.unwrap_or_default().trim().to_string(),
            row_span: self.row_span.unwrap_or(1).max(1),
            column_span: self.column_span.unwrap_or(1).max(1),
            is_header: self.is_header.unwrap_or(row_index == 0),
        })
    }
}

impl From<WireKeyValuePair> for RawKeyValuePair {
    fn from(wire: WireKeyValuePair) -> Self {
        Self {
            key: wire.key.unwrap_or_default(),
            value: wire.value.unwrap_or_default(),
            confidence: wire.confidence.unwrap_or(0.0).clamp(0.0, 1.0),
        }
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_table_sorts_and_dedups_cells() {
        let table = RawTable::new(
            0,
            vec![
                RawCell::new(1, 1, "12"),
                RawCell::new(0, 1, "Value"),
                RawCell::new(1, 0, "Water"),
                RawCell::new(0, 0, "Metric"),
                RawCell::new(1, 1, "duplicate"),
            ],
        );

        let positions: Vec<_> = table.cells.iter().map(RawCell::position).collect();
        assert_eq!(positions, vec![(0, 0), (0, 1), (1, 0), (1, 1)]);
        assert_eq!(table.cells[3].content, "12");
        assert_eq!(table.row_count, 2);
        assert_eq!(table.column_count, 2);
        assert_eq!(table.headers, vec!["Metric", "Value"]);
    }

    #[test]
    fn test_table_dimensions_saturate_at_max_index() {
        let table = RawTable::new(
            0,
            vec![
                RawCell::new(0, 0, "Metric"),
                RawCell::new(usize::MAX, 1, "far down"),
                RawCell::new(1, usize::MAX, "far right"),
            ],
        );

        assert_eq!(table.row_count, usize::MAX);
        assert_eq!(table.column_count, usize::MAX);
        assert_eq!(table.rows().len(), 3);
    }

    #[test]
    fn test_from_value_accepts_max_cell_index() {
        let result = ExtractionResult::from_value(json!({
            "tables": [{
                "cells": [
                    {"row_index": 0, "column_index": 0, "content": "Metric"},
                    {"row_index": usize::MAX, "column_index": 0, "content": "Water"}
                ]
            }]
        }))
        .unwrap();

        let table = &result.tables[0];
        assert_eq!(table.cells.len(), 2);
        assert_eq!(table.row_count, usize::MAX);
        assert_eq!(table.column_count, 1);
    }

    #[test]
    fn test_table_rows_grouping() {
        let table = RawTable::new(
            0,
            vec![
                RawCell::new(0, 0, "A"),
                RawCell::new(2, 1, "x"),
                RawCell::new(2, 0, "B"),
            ],
        );

        let rows = table.rows();
        assert_eq!(rows.len(), 2);
        assert_eq!(rows[0].0, 0);
        assert_eq!(rows[1].0, 2);
        assert_eq!(rows[1].1.len(), 2);
        assert_eq!(rows[1].1[0].content, "B");
    }

    #[test]
    fn test_kvp_validity() {
        assert!(RawKeyValuePair::new("Scope 1", "10 t", 0.5).is_valid(0.5));
        assert!(!RawKeyValuePair::new("Scope 1", "10 t", 0.4).is_valid(0.5));
        assert!(!RawKeyValuePair::new("", "10 t", 0.9).is_valid(0.5));
        assert!(!RawKeyValuePair::new("Scope 1", "  ", 0.9).is_valid(0.5));
    }

    #[test]
    fn test_from_value_full_payload() {
        let payload = json!({
            "filename": "esg_report_2024.xlsx",
            "analysis_timestamp": 1718361000.0,
            "pages": [{"page_number": 1}],
            "metadata": {"page_count": 1, "table_count": 1},
            "tables": [{
                "table_id": 0,
                "row_count": 2,
                "column_count": 2,
                "cells": [
                    {"row_index": 1, "column_index": 1, "content": " 1,234 tons "},
                    {"row_index": 0, "column_index": 0, "content": "Metric"},
                    {"row_index": 0, "column_index": 1, "content": "Value"},
                    {"row_index": 1, "column_index": 0, "content": "Carbon Emissions"}
                ]
            }],
            "key_value_pairs": [
                {"key": "Employees", "value": "250", "confidence": 0.92}
            ]
        });

        let result = ExtractionResult::from_value(payload).unwrap();
        assert_eq!(result.filename, "esg_report_2024.xlsx");
        assert_eq!(result.tables.len(), 1);
        assert_eq!(result.tables[0].cells[0].content, "Metric");
        assert_eq!(result.tables[0].cells[3].content, "1,234 tons");
        assert!(result.tables[0].cells[0].is_header);
        assert!(!result.tables[0].cells[3].is_header);
        assert_eq!(result.key_value_pairs.len(), 1);
        assert_eq!(result.pages.len(), 1);
        assert_eq!(result.metadata["table_count"], 1);
        assert_eq!(result.analysis_timestamp, Some(1718361000.0));
    }

    #[test]
    fn test_from_value_drops_malformed_entries() {
        let payload = json!({
            "filename": "partial.xlsx",
            "tables": [
                "not a table",
                {"cells": [
                    {"row_index": 0, "content": "no column"},
                    {"row_index": "zero", "column_index": 0},
                    {"row_index": 1, "column_index": 0, "content": null}
                ]}
            ],
            "key_value_pairs": [
                {"key": "Board size"},
                42
            ]
        });

        let result = ExtractionResult::from_value(payload).unwrap();
        assert_eq!(result.tables.len(), 1);
        assert_eq!(result.tables[0].table_id, 1);
        assert_eq!(result.tables[0].cells.len(), 1);
        assert_eq!(result.tables[0].cells[0].content, "");
        assert_eq!(result.key_value_pairs.len(), 1);
        assert_eq!(result.key_value_pairs[0].value, "");
        assert_eq!(result.key_value_pairs[0].confidence, 0.0);
    }

    #[test]
    fn test_from_value_empty_lists_are_valid() {
        let result =
            ExtractionResult::from_value(json!({"tables": [], "key_value_pairs": []})).unwrap();
        assert_eq!(result.filename, UNKNOWN_FILENAME);
        assert!(result.tables.is_empty());
        assert!(result.key_value_pairs.is_empty());
    }

    #[test]
    fn test_from_value_rejects_structural_failures() {
        assert!(matches!(
            ExtractionResult::from_value(json!([1, 2, 3])),
            Err(EsgError::InvalidInput(_))
        ));
        assert!(matches!(
            ExtractionResult::from_value(json!({"filename": "x.xlsx"})),
            Err(EsgError::InvalidInput(_))
        ));
        assert!(matches!(
            ExtractionResult::from_value(json!({"tables": "oops"})),
            Err(EsgError::InvalidInput(_))
        ));
        assert!(matches!(
            ExtractionResult::from_json_str("{not json"),
            Err(EsgError::InvalidInput(_))
        ));
    }

    #[test]
    fn test_kvp_confidence_clamped() {
        let result = ExtractionResult::from_value(json!({
            "key_value_pairs": [{"key": "a", "value": "1", "confidence": 1.7}]
        }))
        .unwrap();
        assert_eq!(result.key_value_pairs[0].confidence, 1.0);
    }
}
