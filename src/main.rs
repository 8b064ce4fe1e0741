//! CLI entry point for the consumption insights tool.
//!
//! Provides subcommands for analyzing inventory consumption uploads, exporting
//! normalized records, and the supplemental pattern and shelf-life reports.

use anyhow::Result;
use clap::{Parser, Subcommand};
use consumption_insights::analyzers::analyzer::{
    analyze_upload, load_records, patterns_report, shelf_life_report,
};
use consumption_insights::columns::QUANTITY;
use consumption_insights::config::{
    AnalysisOptions, DEFAULT_CONCURRENCY, DEFAULT_TOP_N, UploadFormat,
};
use consumption_insights::encoding::ChardetSniffer;
use consumption_insights::error::PipelineError;
use consumption_insights::output::{RecordFormat, export_records, log_summary, write_response};
use consumption_insights::response::AnalysisResponse;
use std::ffi::OsStr;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tokio::sync::Semaphore;
use tracing::{error, info, warn};
use tracing_subscriber::{
    EnvFilter, Layer,
    fmt::{self, format::FmtSpan},
    layer::SubscriberExt,
    util::SubscriberInitExt,
};

#[derive(Parser)]
#[command(name = "consumption_insights")]
#[command(about = "Analyze inventory consumption spreadsheets", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run the material consumption analysis on one or more uploads
    Analyze {
        /// CSV or workbook files to analyze
        #[arg(value_name = "FILE", required = true)]
        files: Vec<PathBuf>,

        /// Analyze every Material Group instead of only the first one
        #[arg(long, default_value_t = false)]
        all_partitions: bool,

        /// Directory to write one response JSON per file (stdout if absent)
        #[arg(short, long, value_name = "DIR")]
        output: Option<PathBuf>,

        /// Gzip compress response files
        #[arg(long, default_value_t = false)]
        gzip: bool,

        /// Maximum number of uploads analyzed at once
        #[arg(short, long, default_value_t = DEFAULT_CONCURRENCY)]
        concurrency: usize,
    },
    /// Parse and normalize an upload and export its records
    Records {
        #[arg(value_name = "FILE")]
        file: PathBuf,

        #[arg(short, long, value_enum, default_value_t = RecordFormat::Json)]
        format: RecordFormat,

        /// File to write to (stdout if absent)
        #[arg(short, long)]
        output: Option<PathBuf>,
    },
    /// Rank materials by transaction count and summed quantity
    Patterns {
        #[arg(value_name = "FILE")]
        file: PathBuf,

        /// Number of materials kept in each ranking
        #[arg(short = 'n', long, default_value_t = DEFAULT_TOP_N)]
        top_n: usize,

        /// Keep every material in the rankings
        #[arg(long, default_value_t = false, conflicts_with = "top_n")]
        all: bool,

        /// Column to sum, e.g. "Order Quantity" for order placement exports
        #[arg(short, long, default_value = QUANTITY)]
        quantity_column: String,

        #[arg(short, long)]
        output: Option<PathBuf>,
    },
    /// Remaining shelf life at consumption time
    ShelfLife {
        #[arg(value_name = "FILE")]
        file: PathBuf,

        #[arg(short, long)]
        output: Option<PathBuf>,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    dotenvy::dotenv().ok(); // Load .env file

    // Logging setup: colored stderr + JSON rolling log file
    let log_file_path = std::env::var("LOG_FILE_PATH")
        .unwrap_or_else(|_| "logs/consumption_insights.log".to_string());
    let log_dir = Path::new(&log_file_path)
        .parent()
        .unwrap_or(Path::new("logs"));
    let log_file_name = Path::new(&log_file_path)
        .file_name()
        .unwrap_or(OsStr::new("consumption_insights.log"));

    let file_appender = tracing_appender::rolling::daily(log_dir, log_file_name);
    let (non_blocking_file, _file_guard) = tracing_appender::non_blocking(file_appender);

    let stderr_layer = fmt::layer()
        .with_target(true)
        .with_span_events(FmtSpan::CLOSE)
        .with_ansi(true)
        .with_writer(std::io::stderr)
        .with_filter(EnvFilter::from_env("RUST_LOG").add_directive("info".parse()?));

    let json_layer = fmt::layer()
        .json()
        .with_current_span(true)
        .with_span_list(true)
        .with_writer(non_blocking_file)
        .with_filter(EnvFilter::from_env("RUST_LOG_JSON").add_directive("debug".parse()?));

    tracing_subscriber::registry()
        .with(stderr_layer)
        .with(json_layer)
        .init();

    let cli = Cli::parse();

    match cli.command {
        Commands::Analyze {
            files,
            all_partitions,
            output,
            gzip,
            concurrency,
        } => {
            let options = AnalysisOptions {
                process_all_partitions: all_partitions,
                ..AnalysisOptions::default()
            };
            analyze_files(files, options, output, gzip, concurrency).await?;
        }
        Commands::Records {
            file,
            format,
            output,
        } => {
            let loaded = read_upload(&file)
                .and_then(|(bytes, kind)| load_records(&bytes, kind, &ChardetSniffer));
            match loaded {
                Ok(table) => export_records(&table, format, output.as_deref())?,
                Err(e) => {
                    let response = report_failure(&file, &e);
                    write_response(&response, output.as_deref(), false)?;
                }
            }
        }
        Commands::Patterns {
            file,
            top_n,
            all,
            quantity_column,
            output,
        } => {
            let options = AnalysisOptions {
                top_n: (!all).then_some(top_n),
                quantity_column,
                ..AnalysisOptions::default()
            };
            let response = read_upload(&file)
                .and_then(|(bytes, kind)| patterns_report(&bytes, kind, &options, &ChardetSniffer))
                .unwrap_or_else(|e| report_failure(&file, &e));
            write_response(&response, output.as_deref(), false)?;
        }
        Commands::ShelfLife { file, output } => {
            let response = read_upload(&file)
                .and_then(|(bytes, kind)| shelf_life_report(&bytes, kind, &ChardetSniffer))
                .unwrap_or_else(|e| report_failure(&file, &e));
            write_response(&response, output.as_deref(), false)?;
        }
    }

    Ok(())
}

/// Reads an upload from disk and picks its format from the extension.
fn read_upload(path: &Path) -> Result<(Vec<u8>, UploadFormat), PipelineError> {
    let format = UploadFormat::from_path(path)?;
    let bytes = std::fs::read(path)?;
    Ok((bytes, format))
}

/// Logs the full error and returns the envelope with its user-safe message.
fn report_failure(path: &Path, err: &PipelineError) -> AnalysisResponse {
    error!(path = %path.display(), error = %err, "Upload could not be processed");
    AnalysisResponse::failure(err)
}

/// Analyzes uploads concurrently, one table per blocking task, and writes
/// the responses in input order.
#[tracing::instrument(skip(files, options, output), fields(count = files.len()))]
async fn analyze_files(
    files: Vec<PathBuf>,
    options: AnalysisOptions,
    output: Option<PathBuf>,
    gzip: bool,
    concurrency: usize,
) -> Result<()> {
    if let Some(dir) = &output {
        std::fs::create_dir_all(dir)?;
    } else if gzip {
        warn!("--gzip only applies to files written with --output");
    }

    let semaphore = Arc::new(Semaphore::new(concurrency.max(1)));
    let options = Arc::new(options);

    let mut tasks = vec![];

    for path in files {
        let permit = semaphore.clone().acquire_owned().await?;
        let options = options.clone();
        let file_span = tracing::info_span!("analyze_file", path = %path.display());

        let task_path = path.clone();
        let task = tokio::task::spawn_blocking(move || {
            let _permit = permit;
            file_span.in_scope(|| {
                let response = read_upload(&task_path)
                    .and_then(|(bytes, kind)| {
                        analyze_upload(&bytes, kind, &options, &ChardetSniffer)
                    })
                    .unwrap_or_else(|e| report_failure(&task_path, &e));
                log_summary(&response);
                response
            })
        });

        tasks.push((path, task));
    }

    let mut failures = 0;
    for (path, task) in tasks {
        let response = task.await?;
        if response.code() != 0 {
            failures += 1;
        }

        match &output {
            Some(dir) => {
                let target = response_path(dir, &path, gzip);
                write_response(&response, Some(&target), gzip)?;
                info!(source = %path.display(), target = %target.display(), "Response written");
            }
            None => write_response(&response, None, false)?,
        }
    }

    info!(failures, "Finished analyzing uploads");
    Ok(())
}

/// `<dir>/<file stem>.json`, with a `.gz` suffix when compressing.
fn response_path(dir: &Path, source: &Path, gzip: bool) -> PathBuf {
    let stem = source
        .file_stem()
        .and_then(OsStr::to_str)
        .unwrap_or("upload");
    let name = if gzip {
        format!("{stem}.json.gz")
    } else {
        format!("{stem}.json")
    };
    dir.join(name)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_response_path() {
        let dir = Path::new("out");
        assert_eq!(
            response_path(dir, Path::new("data/jan.csv"), false),
            PathBuf::from("out/jan.json")
        );
        assert_eq!(
            response_path(dir, Path::new("feb.xlsx"), true),
            PathBuf::from("out/feb.json.gz")
        );
    }

    #[test]
    fn test_cli_parses_analyze_flags() {
        let cli = Cli::try_parse_from([
            "consumption_insights",
            "analyze",
            "a.csv",
            "b.xlsx",
            "--all-partitions",
            "-c",
            "2",
        ])
        .unwrap();
        match cli.command {
            Commands::Analyze {
                files,
                all_partitions,
                concurrency,
                output,
                gzip,
            } => {
                assert_eq!(files.len(), 2);
                assert!(all_partitions);
                assert_eq!(concurrency, 2);
                assert!(output.is_none());
                assert!(!gzip);
            }
            _ => panic!("expected analyze"),
        }
    }

    #[test]
    fn test_cli_parses_patterns_quantity_column() {
        let cli = Cli::try_parse_from([
            "consumption_insights",
            "patterns",
            "orders.xlsx",
            "--quantity-column",
            "Order Quantity",
            "--all",
        ])
        .unwrap();
        match cli.command {
            Commands::Patterns {
                quantity_column,
                all,
                ..
            } => {
                assert_eq!(quantity_column, "Order Quantity");
                assert!(all);
            }
            _ => panic!("expected patterns"),
        }

        let cli = Cli::try_parse_from(["consumption_insights", "patterns", "a.csv"]).unwrap();
        match cli.command {
            Commands::Patterns {
                quantity_column, ..
            } => assert_eq!(quantity_column, "Quantity"),
            _ => panic!("expected patterns"),
        }
    }

    #[test]
    fn test_read_upload_rejects_unknown_extension() {
        assert!(matches!(
            read_upload(Path::new("notes.txt")),
            Err(PipelineError::UnsupportedFormat(_))
        ));
    }
}
