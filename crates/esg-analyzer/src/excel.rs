//! Local spreadsheet analyzer using calamine
//!
//! Produces the same payload shape as the hosted layout service, one table
//! per non-empty sheet. Spreadsheets carry no detected key-value pairs, so
//! `key_value_pairs` is always empty.

use std::io::Cursor;

use async_trait::async_trait;
use calamine::{open_workbook_auto_from_rs, Data, Range, Reader};
use serde_json::{json, Map, Value};

use esg_core::{AnalyzerConfig, ExtractionResult, RawCell, RawTable};

use crate::{validate_file, AnalyzerError, DocumentAnalyzer, FileType, Result};

/// Excel document analyzer
#[derive(Debug, Clone, Default)]
pub struct ExcelAnalyzer {
    /// Sheets to analyze (None = all sheets)
    pub sheet_filter: Option<Vec<String>>,
    /// File limits checked before parsing
    pub limits: AnalyzerConfig,
}

impl ExcelAnalyzer {
    /// Create a new Excel analyzer with default limits
    pub fn new() -> Self {
        Self::default()
    }

    /// Use configured file limits
    pub fn with_limits(mut self, limits: AnalyzerConfig) -> Self {
        self.limits = limits;
        self
    }

    /// Filter specific sheets
    pub fn with_sheets(mut self, sheets: Vec<String>) -> Self {
        self.sheet_filter = Some(sheets);
        self
    }

    pub fn supported_types(&self) -> &[FileType] {
        &[FileType::Xlsx, FileType::Xls, FileType::Xlsm]
    }

    /// Convert a Data cell to string
    fn cell_to_string(cell: &Data) -> String {
        match cell {
            Data::Empty => String::new(),
            Data::String(s) => s.trim().to_string(),
            Data::Float(f) => {
                // Format without unnecessary decimals
                if f.fract() == 0.0 && f.abs() < i64::MAX as f64 {
                    format!("{}", *f as i64)
                } else {
                    format!("{f}")
                }
            }
            Data::Int(i) => format!("{i}"),
            Data::Bool(b) => if *b { "TRUE" } else { "FALSE" }.to_string(),
            Data::Error(e) => format!("#ERROR: {e:?}"),
            Data::DateTime(dt) => format!("{dt}"),
            Data::DateTimeIso(s) => s.clone(),
            Data::DurationIso(s) => s.clone(),
        }
    }

    /// Convert a sheet range into a table at relative positions.
    ///
    /// Empty cells are omitted; row 0 is flagged as header.
    pub fn range_to_table(table_id: usize, range: &Range<Data>) -> RawTable {
        let cells = range
            .rows()
            .enumerate()
            .flat_map(|(r, row)| {
                row.iter().enumerate().filter_map(move |(c, data)| {
                    let content = Self::cell_to_string(data);
                    (!content.is_empty()).then(|| RawCell::new(r, c, content))
                })
            })
            .collect();

        RawTable::new(table_id, cells)
    }

    /// Render a table as markdown for the payload `content`
    fn table_to_markdown(sheet_name: &str, table: &RawTable) -> String {
        let mut md = format!("## {sheet_name}\n\n");

        for (row_index, cells) in table.rows() {
            let mut row = vec![""; table.column_count];
            for cell in cells {
                row[cell.column_index] = cell.content.as_str();
            }

            md.push('|');
            for content in &row {
                md.push_str(&format!(" {content} |"));
            }
            md.push('\n');

            if row_index == 0 {
                md.push('|');
                for _ in &row {
                    md.push_str(" --- |");
                }
                md.push('\n');
            }
        }

        md.push('\n');
        md
    }

    /// Parse workbook bytes into an extraction payload
    fn parse_workbook(&self, content: Vec<u8>, filename: &str) -> Result<ExtractionResult> {
        let mut workbook = open_workbook_auto_from_rs(Cursor::new(content))
            .map_err(|e| AnalyzerError::ExcelError(e.to_string()))?;

        let sheet_names = workbook.sheet_names().to_vec();

        let mut markdown = String::new();
        let mut tables = Vec::new();
        let mut pages = Vec::new();

        for (page_number, sheet_name) in sheet_names.iter().enumerate() {
            // Apply sheet filter if set
            if let Some(filter) = &self.sheet_filter {
                if !filter.contains(sheet_name) {
                    continue;
                }
            }

            let range = match workbook.worksheet_range(sheet_name) {
                Ok(range) => range,
                Err(e) => {
                    tracing::warn!("Error processing sheet {}: {}", sheet_name, e);
                    continue;
                }
            };

            let table = Self::range_to_table(tables.len(), &range);
            pages.push(json!({
                "page_number": page_number + 1,
                "sheet_name": sheet_name,
                "row_count": table.row_count,
                "column_count": table.column_count,
            }));

            // Only non-empty sheets become tables
            if table.is_empty() {
                continue;
            }

            markdown.push_str(&Self::table_to_markdown(sheet_name, &table));
            tables.push(table);
        }

        let mut metadata = Map::new();
        metadata.insert("page_count".to_string(), json!(sheet_names.len()));
        metadata.insert("table_count".to_string(), json!(tables.len()));
        metadata.insert("sheet_names".to_string(), json!(sheet_names));
        metadata.insert("confidence_scores".to_string(), Value::Array(Vec::new()));

        let mut result = ExtractionResult::new(filename).with_tables(tables);
        result.content = Some(markdown);
        result.pages = pages;
        result.metadata = metadata;
        result.analysis_timestamp = Some(chrono::Utc::now().timestamp_millis() as f64 / 1000.0);

        Ok(result)
    }
}

#[async_trait]
impl DocumentAnalyzer for ExcelAnalyzer {
    async fn analyze(&self, content: &[u8], filename: &str) -> Result<ExtractionResult> {
        validate_file(content, filename, &self.limits)?;

        tracing::info!("Starting spreadsheet analysis for {}", filename);

        let analyzer = self.clone();
        let content = content.to_vec();
        let name = filename.to_string();
        let result = tokio::task::spawn_blocking(move || analyzer.parse_workbook(content, &name))
            .await
            .map_err(|e| AnalyzerError::TaskFailed(e.to_string()))??;

        tracing::info!(
            "Successfully analyzed {}. Found {} tables",
            filename,
            result.tables.len()
        );
        Ok(result)
    }

    fn name(&self) -> &str {
        "excel"
    }
}
