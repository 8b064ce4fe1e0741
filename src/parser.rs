//! Parsers turning uploaded bytes into a [`Table`].

use calamine::{Data, Reader, open_workbook_auto_from_rs};
use std::collections::HashMap;
use std::io::Cursor;
use tracing::debug;

use crate::config::UploadFormat;
use crate::encoding::{EncodingSniffer, decode_text};
use crate::error::{PipelineError, Result};
use crate::normalize::excel_serial_to_datetime;
use crate::table::{Table, Value};

/// Parses an upload according to its declared format.
///
/// # Errors
///
/// [`PipelineError::MalformedFile`] if the bytes cannot be parsed, and for
/// CSV input [`PipelineError::EncodingUndetected`] if no charset can be
/// determined.
#[tracing::instrument(skip(bytes, sniffer), fields(bytes = bytes.len()))]
pub fn parse_upload(
    bytes: &[u8],
    format: UploadFormat,
    sniffer: &dyn EncodingSniffer,
) -> Result<Table> {
    let table = match format {
        UploadFormat::Csv => parse_csv(bytes, sniffer)?,
        UploadFormat::Workbook => parse_workbook(bytes)?,
    };
    debug!(rows = table.len(), columns = table.width(), "Upload parsed");
    Ok(table)
}

/// Decodes a CSV upload. The first record is the header row.
pub fn parse_csv(bytes: &[u8], sniffer: &dyn EncodingSniffer) -> Result<Table> {
    let text = decode_text(bytes, sniffer)?;

    let mut rdr = csv::ReaderBuilder::new()
        .flexible(true)
        .from_reader(text.as_bytes());

    let headers: Vec<String> = rdr
        .headers()
        .map_err(|e| PipelineError::malformed(e.to_string()))?
        .iter()
        .map(str::to_string)
        .collect();

    if headers.iter().all(|h| h.trim().is_empty()) {
        return Err(PipelineError::malformed("no header row"));
    }

    let mut table = Table::new(dedupe_headers(headers));

    for result in rdr.records() {
        let record = result.map_err(|e| PipelineError::malformed(e.to_string()))?;
        table.push_row(record.iter().map(parse_text_cell).collect());
    }

    Ok(table)
}

/// Reads the first worksheet of an Excel or OpenDocument workbook.
pub fn parse_workbook(bytes: &[u8]) -> Result<Table> {
    let mut workbook = open_workbook_auto_from_rs(Cursor::new(bytes))
        .map_err(|e| PipelineError::malformed(e.to_string()))?;

    let range = workbook
        .worksheet_range_at(0)
        .ok_or_else(|| PipelineError::malformed("workbook has no worksheets"))?
        .map_err(|e| PipelineError::malformed(e.to_string()))?;

    let mut rows = range.rows();
    let Some(header_row) = rows.next() else {
        return Err(PipelineError::malformed("first worksheet is empty"));
    };

    let headers = header_row
        .iter()
        .enumerate()
        .map(|(i, cell)| match cell_value(cell) {
            Value::Null | Value::NullDate => format!("Unnamed: {i}"),
            v => v.to_string(),
        })
        .collect();

    let mut table = Table::new(dedupe_headers(headers));
    for row in rows {
        table.push_row(row.iter().map(cell_value).collect());
    }

    Ok(table)
}

/// Integers beyond this magnitude no longer round-trip through `f64`.
const MAX_EXACT_INTEGER: f64 = 9_007_199_254_740_992.0;

/// Types a raw CSV field. Empty fields are nulls and finite numerals become
/// numbers; everything else stays text, untrimmed. Integer numerals too long
/// to be held exactly (long material or batch IDs) also stay text.
pub(crate) fn parse_text_cell(field: &str) -> Value {
    if field.is_empty() {
        return Value::Null;
    }
    let trimmed = field.trim();
    match trimmed.parse::<f64>() {
        Ok(n) if n.is_finite() => {
            if is_integer_numeral(trimmed) && n.abs() >= MAX_EXACT_INTEGER {
                Value::Text(field.to_string())
            } else {
                Value::Number(n)
            }
        }
        _ => Value::Text(field.to_string()),
    }
}

fn is_integer_numeral(s: &str) -> bool {
    let digits = s.strip_prefix(['-', '+']).unwrap_or(s);
    !digits.is_empty() && digits.bytes().all(|b| b.is_ascii_digit())
}

fn cell_value(cell: &Data) -> Value {
    match cell {
        Data::Empty | Data::Error(_) => Value::Null,
        Data::String(s) => Value::Text(s.clone()),
        Data::Float(f) if f.is_finite() => Value::Number(*f),
        Data::Float(_) => Value::Null,
        Data::Int(i) => Value::Number(*i as f64),
        Data::Bool(b) => Value::Text(if *b { "True" } else { "False" }.to_string()),
        Data::DateTime(dt) => excel_serial_to_datetime(dt.as_f64())
            .map(Value::Date)
            .unwrap_or(Value::NullDate),
        other => Value::Text(other.to_string()),
    }
}

/// Repeated headers get a `.1`, `.2`, ... suffix so every column stays
/// addressable by name.
fn dedupe_headers(headers: Vec<String>) -> Vec<String> {
    let mut seen: HashMap<String, usize> = HashMap::new();
    headers
        .into_iter()
        .map(|h| {
            let count = seen.entry(h.clone()).or_insert(0);
            let name = if *count == 0 {
                h
            } else {
                format!("{h}.{count}")
            };
            *count += 1;
            name
        })
        .collect()
}
