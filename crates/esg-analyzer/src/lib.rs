//! ESG Analyzer - Document analysis boundary
//!
//! Everything between an uploaded spreadsheet and the extraction payload
//! consumed by `esg-extractor`:
//! - File validation (size and extension limits)
//! - The [`DocumentAnalyzer`] trait for document-understanding backends
//! - A local spreadsheet analyzer built on calamine
//! - A retry policy wrapping any analyzer
//!
//! The metric core never depends on this crate.

use std::path::Path;

use async_trait::async_trait;
use esg_core::{AnalyzerConfig, ExtractionResult};
use thiserror::Error;

pub mod excel;
pub mod retry;

pub use excel::ExcelAnalyzer;
pub use retry::{RetryPolicy, RetryingAnalyzer};

// ============================================================================
// Error Types
// ============================================================================

/// Errors that can occur while analyzing a document
#[derive(Error, Debug)]
pub enum AnalyzerError {
    /// File extension is not accepted
    #[error("Invalid file extension {extension}. Supported: {supported}")]
    UnsupportedFormat {
        extension: String,
        supported: String,
    },

    /// File exceeds the configured size limit
    #[error("File size {size_mb:.2}MB exceeds maximum {max_mb}MB")]
    FileTooLarge { size_mb: f64, max_mb: u64 },

    /// IO error while reading the file
    #[error("IO error reading file: {path}")]
    IoError {
        path: String,
        #[source]
        source: std::io::Error,
    },

    /// Spreadsheet parsing error
    #[error("Excel parsing error: {0}")]
    ExcelError(String),

    /// The analysis task did not complete
    #[error("Analysis task failed: {0}")]
    TaskFailed(String),
}

impl AnalyzerError {
    /// Validation failures are deterministic and never worth retrying
    pub fn is_validation(&self) -> bool {
        matches!(
            self,
            Self::UnsupportedFormat { .. } | Self::FileTooLarge { .. }
        )
    }

    pub fn is_retryable(&self) -> bool {
        !self.is_validation()
    }
}

pub type Result<T> = std::result::Result<T, AnalyzerError>;

// ============================================================================
// File Types
// ============================================================================

/// Spreadsheet file types
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FileType {
    Xlsx,
    Xls,
    Xlsm,
    Unknown,
}

impl FileType {
    /// Detect file type from extension
    pub fn from_extension(ext: &str) -> Self {
        match ext.to_lowercase().as_str() {
            "xlsx" => Self::Xlsx,
            "xls" => Self::Xls,
            "xlsm" => Self::Xlsm,
            _ => Self::Unknown,
        }
    }

    /// Detect file type from a file name or path
    pub fn from_path(path: &Path) -> Self {
        path.extension()
            .and_then(|ext| ext.to_str())
            .map(Self::from_extension)
            .unwrap_or(Self::Unknown)
    }

    /// Get MIME type
    pub fn mime_type(&self) -> &'static str {
        match self {
            Self::Xlsx => "application/vnd.openxmlformats-officedocument.spreadsheetml.sheet",
            Self::Xls => "application/vnd.ms-excel",
            Self::Xlsm => "application/vnd.ms-excel.sheet.macroEnabled.12",
            Self::Unknown => "application/octet-stream",
        }
    }
}

impl std::fmt::Display for FileType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Xlsx => write!(f, "xlsx"),
            Self::Xls => write!(f, "xls"),
            Self::Xlsm => write!(f, "xlsm"),
            Self::Unknown => write!(f, "unknown"),
        }
    }
}

// ============================================================================
// Validation
// ============================================================================

/// Check file size and extension against the configured limits
pub fn validate_file(content: &[u8], filename: &str, config: &AnalyzerConfig) -> Result<()> {
    let size_mb = content.len() as f64 / (1024.0 * 1024.0);
    if content.len() as u64 > config.max_file_size_bytes() {
        return Err(AnalyzerError::FileTooLarge {
            size_mb,
            max_mb: config.max_file_size_mb,
        });
    }

    let extension = Path::new(filename)
        .extension()
        .and_then(|ext| ext.to_str())
        .map(str::to_lowercase)
        .unwrap_or_default();

    let allowed = config
        .allowed_extensions
        .iter()
        .any(|a| a.trim_start_matches('.').eq_ignore_ascii_case(&extension));

    if extension.is_empty() || !allowed {
        return Err(AnalyzerError::UnsupportedFormat {
            extension: if extension.is_empty() {
                "none".to_string()
            } else {
                format!(".{extension}")
            },
            supported: config.allowed_extensions.join(", "),
        });
    }

    tracing::info!("File validation passed: {} ({:.2}MB)", filename, size_mb);
    Ok(())
}

// ============================================================================
// Analyzer Trait
// ============================================================================

/// Trait for document-understanding backends
///
/// Implementations turn raw file bytes into an extraction payload. A call
/// must be idempotent so that it can be retried.
#[async_trait]
pub trait DocumentAnalyzer: Send + Sync {
    /// Analyze a document
    async fn analyze(&self, content: &[u8], filename: &str) -> Result<ExtractionResult>;

    /// Get the analyzer name
    fn name(&self) -> &str;
}

// ============================================================================
// Tests
// ============================================================================
