//! Output formatting and persistence for analysis responses and records.
//!
//! Supports summary logging, JSON files (optionally gzip-compressed) and
//! CSV/JSON export of normalized records.

use anyhow::Result;
use clap::ValueEnum;
use csv::WriterBuilder;
use flate2::Compression;
use flate2::write::GzEncoder;
use std::fs::File;
use std::io::{self, BufWriter, Write};
use std::path::Path;
use serde_json::Value;
use tracing::{debug, info};

use crate::response::AnalysisResponse;
use crate::table::Table;

/// Serialization used by the `records` export.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, ValueEnum)]
pub enum RecordFormat {
    #[default]
    Json,
    Csv,
}

/// Logs the shape of a response: its code, how many sections it carries and
/// how many summary rows they hold in total.
pub fn log_summary(response: &AnalysisResponse) {
    match response.data() {
        Some(Value::Object(sections)) => {
            let rows: usize = sections.values().map(row_count).sum();
            info!(
                code = response.code(),
                sections = sections.len(),
                rows,
                "Analysis finished"
            );
        }
        _ => info!(code = response.code(), "Analysis finished"),
    }
}

/// Summary rows in a section, descending into per-group objects.
fn row_count(value: &Value) -> usize {
    match value {
        Value::Array(rows) => rows.len(),
        Value::Object(nested) => nested.values().map(row_count).sum(),
        _ => 0,
    }
}

/// Writes a response as pretty JSON to `path`, or to stdout when `path` is
/// `None`. With `gzip` the file is compressed; stdout is never compressed.
pub fn write_response(
    response: &AnalysisResponse,
    path: Option<&Path>,
    gzip: bool,
) -> Result<()> {
    let json = serde_json::to_vec_pretty(response)?;

    match path {
        Some(path) => {
            debug!(path = %path.display(), gzip, bytes = json.len(), "Writing response");
            let file = BufWriter::new(File::create(path)?);
            if gzip {
                let mut encoder = GzEncoder::new(file, Compression::default());
                encoder.write_all(&json)?;
                encoder.finish()?.flush()?;
            } else {
                let mut file = file;
                file.write_all(&json)?;
                file.flush()?;
            }
        }
        None => {
            let mut stdout = io::stdout().lock();
            stdout.write_all(&json)?;
            writeln!(stdout)?;
        }
    }

    Ok(())
}

/// Writes every row of `table` as CSV, header first. Dates use
/// `YYYY-MM-DD HH:MM:SS` and nulls are empty fields.
pub fn write_records_csv<W: Write>(table: &Table, writer: W) -> Result<()> {
    let mut writer = WriterBuilder::new().has_headers(false).from_writer(writer);

    writer.write_record(table.headers())?;
    for row in 0..table.len() {
        writer.write_record(
            table
                .columns()
                .iter()
                .map(|c| c.get(row).map(ToString::to_string).unwrap_or_default()),
        )?;
    }
    writer.flush()?;

    Ok(())
}

/// Writes the rows of `table` as a JSON array of objects keyed by header.
pub fn write_records_json<W: Write>(table: &Table, mut writer: W) -> Result<()> {
    let records: Vec<_> = table.records().collect();
    serde_json::to_writer_pretty(&mut writer, &records)?;
    writer.flush()?;
    Ok(())
}

/// Exports normalized records to `path`, or to stdout when `path` is `None`.
pub fn export_records(table: &Table, format: RecordFormat, path: Option<&Path>) -> Result<()> {
    let writer: Box<dyn Write> = match path {
        Some(path) => {
            info!(path = %path.display(), ?format, rows = table.len(), "Exporting records");
            Box::new(BufWriter::new(File::create(path)?))
        }
        None => Box::new(io::stdout().lock()),
    };

    match format {
        RecordFormat::Csv => write_records_csv(table, writer),
        RecordFormat::Json => write_records_json(table, writer),
    }
}
