//! ESG CLI - Command-line interface
//!
//! Usage:
//!   esg process <payload.json> [-o report.json]
//!   esg analyze <workbook.xlsx> [-o report.json]
//!   esg --config esg.toml analyze <workbook.xlsx>

use std::path::{Path, PathBuf};

use anyhow::Context;
use clap::{Parser, Subcommand};
use serde_json::{json, Value};
use tracing_subscriber::EnvFilter;
use uuid::Uuid;

use esg_analyzer::{AnalyzerError, DocumentAnalyzer, ExcelAnalyzer, RetryPolicy, RetryingAnalyzer};
use esg_core::payload::UNKNOWN_FILENAME;
use esg_core::{AppConfig, EsgError, EsgReport, ExtractionResult, LoggingConfig};
use esg_extractor::EsgProcessor;

#[derive(Parser)]
#[command(name = "esg")]
#[command(about = "ESG metric extraction CLI")]
#[command(version)]
struct Cli {
    /// Configuration file (TOML)
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Extract metrics from a document-analysis payload (JSON)
    Process {
        /// Payload file
        input: PathBuf,
        /// Report file (stdout if omitted)
        #[arg(short, long)]
        output: Option<PathBuf>,
    },
    /// Analyze a spreadsheet locally and extract metrics
    Analyze {
        /// Spreadsheet file
        path: PathBuf,
        /// Report file (stdout if omitted)
        #[arg(short, long)]
        output: Option<PathBuf>,
    },
}

impl Commands {
    fn input(&self) -> &Path {
        match self {
            Self::Process { input, .. } => input,
            Self::Analyze { path, .. } => path,
        }
    }

    fn output(&self) -> Option<&Path> {
        match self {
            Self::Process { output, .. } | Self::Analyze { output, .. } => output.as_deref(),
        }
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let config = load_config(cli.config.as_deref())?;
    init_tracing(&config.logging);

    let processor = EsgProcessor::from_config(&config)?;
    let correlation_id = Uuid::new_v4().to_string();
    let filename = display_name(cli.command.input());

    tracing::info!(correlation_id = %correlation_id, "Processing ESG file: {}", filename);

    let result = match &cli.command {
        Commands::Process { input, .. } => run_process(&processor, input).await,
        Commands::Analyze { path, .. } => {
            let analyzer = build_analyzer(&config);
            run_analyze(&analyzer, &processor, path).await
        }
    };

    match result {
        Ok(mut report) => {
            attach_run_metadata(&mut report, &correlation_id);
            write_output(cli.command.output(), &report.to_json_pretty()?).await?;

            tracing::info!(
                correlation_id = %correlation_id,
                "Successfully processed {}. Found {} ESG metrics",
                filename,
                report.metrics.len()
            );
            Ok(())
        }
        Err(err) => {
            tracing::error!(
                correlation_id = %correlation_id,
                "Error processing file {}: {:#}",
                filename,
                err
            );

            let report = error_report(&filename, &correlation_id, &err);
            write_output(cli.command.output(), &serde_json::to_string_pretty(&report)?).await?;
            Err(err)
        }
    }
}

// ============================================================================
// Setup
// ============================================================================

/// Defaults, then the optional TOML file, then environment overrides
fn load_config(path: Option<&Path>) -> anyhow::Result<AppConfig> {
    let config = match path {
        Some(path) => AppConfig::from_file(path)?,
        None => AppConfig::default(),
    };
    let config = config.with_env_override()?;
    config.validate()?;
    Ok(config)
}

fn init_tracing(logging: &LoggingConfig) {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&logging.level));

    // stdout carries the report
    let builder = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_file(logging.include_location)
        .with_line_number(logging.include_location);

    if logging.json_format {
        builder.json().init();
    } else {
        builder.init();
    }
}

fn build_analyzer(config: &AppConfig) -> RetryingAnalyzer<ExcelAnalyzer> {
    RetryingAnalyzer::new(
        ExcelAnalyzer::new().with_limits(config.analyzer.clone()),
        RetryPolicy::from_config(&config.retry),
    )
}

// ============================================================================
// Commands
// ============================================================================

async fn run_process(processor: &EsgProcessor, input: &Path) -> anyhow::Result<EsgReport> {
    let raw = tokio::fs::read_to_string(input)
        .await
        .with_context(|| format!("Failed to read payload {}", input.display()))?;

    let payload = ExtractionResult::from_json_str(&raw)?;
    log_extraction(&payload);

    Ok(processor.process(&payload))
}

async fn run_analyze(
    analyzer: &dyn DocumentAnalyzer,
    processor: &EsgProcessor,
    path: &Path,
) -> anyhow::Result<EsgReport> {
    let content = tokio::fs::read(path)
        .await
        .with_context(|| format!("Failed to read spreadsheet {}", path.display()))?;

    tracing::info!("File size: {} bytes", content.len());

    let extracted = analyzer.analyze(&content, &display_name(path)).await?;
    log_extraction(&extracted);

    let mut report = processor.process(&extracted);
    report
        .processing_metadata
        .insert("file_size_bytes".to_string(), json!(content.len()));
    Ok(report)
}

fn log_extraction(payload: &ExtractionResult) {
    tracing::info!(
        "Extraction complete. Tables: {}, KV Pairs: {}",
        payload.tables.len(),
        payload.key_value_pairs.len()
    );
}

// ============================================================================
// Output
// ============================================================================

fn display_name(path: &Path) -> String {
    path.file_name()
        .and_then(|name| name.to_str())
        .unwrap_or(UNKNOWN_FILENAME)
        .to_string()
}

fn attach_run_metadata(report: &mut EsgReport, correlation_id: &str) {
    let metadata = &mut report.processing_metadata;
    metadata.insert("correlation_id".to_string(), json!(correlation_id));
    metadata.insert("status".to_string(), json!("success"));
}

/// Short label for the `error` field of an error report
fn error_label(err: &anyhow::Error) -> &'static str {
    if let Some(e) = err.downcast_ref::<AnalyzerError>() {
        return if e.is_validation() {
            "Validation Error"
        } else {
            "Analysis Error"
        };
    }
    if let Some(EsgError::InvalidInput(_)) = err.downcast_ref::<EsgError>() {
        return "Validation Error";
    }
    if err.downcast_ref::<std::io::Error>().is_some() {
        return "IO Error";
    }
    "Processing Error"
}

fn error_report(filename: &str, correlation_id: &str, err: &anyhow::Error) -> Value {
    json!({
        "status": "error",
        "filename": filename,
        "correlation_id": correlation_id,
        "error": error_label(err),
        "details": format!("{err:#}"),
    })
}

async fn write_output(path: Option<&Path>, content: &str) -> anyhow::Result<()> {
    match path {
        Some(path) => tokio::fs::write(path, content)
            .await
            .with_context(|| format!("Failed to write {}", path.display())),
        None => {
            println!("{content}");
            Ok(())
        }
    }
}

// ============================================================================
// Tests
// ============================================================================
