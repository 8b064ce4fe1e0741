use serde_json::{Map, Value};
use tracing::info;

use crate::analyzers::consumption_aggregators;
use crate::analyzers::patterns::consumption_patterns;
use crate::analyzers::shelf_life::shelf_life_analysis;
use crate::config::{AnalysisOptions, UploadFormat};
use crate::encoding::EncodingSniffer;
use crate::error::Result;
use crate::normalize::normalize;
use crate::parser::parse_upload;
use crate::partition::{PartitionPolicy, partition};
use crate::response::{AnalysisResponse, compose};
use crate::table::Table;

/// Runs the material-consumption analysis over a parsed upload.
///
/// The table is normalized and split by Material Group. With the default
/// policy only the first group is analyzed and `data` holds its merged
/// sections; with `process_all_partitions` `data` maps every group key to
/// its merged sections. A table without a Material Group column yields a
/// `code: -1` response rather than an error.
#[tracing::instrument(skip_all, fields(rows = table.len(), all = options.process_all_partitions))]
pub fn material_consumption(table: Table, options: &AnalysisOptions) -> AnalysisResponse {
    let table = normalize(table);
    let policy = PartitionPolicy::from_flag(options.process_all_partitions);

    let partitions = match partition(&table, policy) {
        Ok(partitions) => partitions,
        Err(e) => {
            info!(error = %e, "Upload cannot be partitioned");
            return AnalysisResponse::failure(&e);
        }
    };

    let aggregators = consumption_aggregators();

    let data = match policy {
        PartitionPolicy::FirstOnly => partitions
            .first()
            .map(|p| {
                info!(group = %p.key, rows = p.table.len(), "Analyzing material group");
                compose(&p.table, &aggregators)
            })
            .unwrap_or_default(),
        PartitionPolicy::All => {
            let mut by_group = Map::new();
            for p in &partitions {
                info!(group = %p.key, rows = p.table.len(), "Analyzing material group");
                by_group.insert(
                    p.key.clone(),
                    Value::Object(compose(&p.table, &aggregators)),
                );
            }
            by_group
        }
    };

    AnalysisResponse::Success(Value::Object(data))
}

/// Parses an upload and runs [`material_consumption`] on it.
///
/// # Errors
///
/// Parse failures (`MalformedFile`, `EncodingUndetected`) are returned so
/// the caller can log them and answer with the error's user message.
pub fn analyze_upload(
    bytes: &[u8],
    format: UploadFormat,
    options: &AnalysisOptions,
    sniffer: &dyn EncodingSniffer,
) -> Result<AnalysisResponse> {
    let table = parse_upload(bytes, format, sniffer)?;
    Ok(material_consumption(table, options))
}

/// Parses and normalizes an upload without analyzing it.
pub fn load_records(
    bytes: &[u8],
    format: UploadFormat,
    sniffer: &dyn EncodingSniffer,
) -> Result<Table> {
    let table = parse_upload(bytes, format, sniffer)?;
    Ok(normalize(table))
}

/// Overall consumption patterns of a whole upload, summing
/// `options.quantity_column`.
pub fn patterns_report(
    bytes: &[u8],
    format: UploadFormat,
    options: &AnalysisOptions,
    sniffer: &dyn EncodingSniffer,
) -> Result<AnalysisResponse> {
    let table = load_records(bytes, format, sniffer)?;
    let patterns = consumption_patterns(&table, &options.quantity_column, options.top_n);
    Ok(AnalysisResponse::Success(serde_json::to_value(patterns)?))
}

/// Shelf-life distribution of a whole upload.
pub fn shelf_life_report(
    bytes: &[u8],
    format: UploadFormat,
    sniffer: &dyn EncodingSniffer,
) -> Result<AnalysisResponse> {
    let table = load_records(bytes, format, sniffer)?;
    let report = shelf_life_analysis(&table);
    Ok(AnalysisResponse::Success(serde_json::to_value(report)?))
}
