//! Run-time options for the analysis pipeline.

use std::path::Path;

use crate::columns::QUANTITY;
use crate::error::{PipelineError, Result};

/// Default number of materials kept in the consumption pattern rankings.
pub const DEFAULT_TOP_N: usize = 10;

/// Default number of uploads processed at once by the CLI.
pub const DEFAULT_CONCURRENCY: usize = 4;

/// How an upload's bytes should be parsed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UploadFormat {
    /// Delimited text in an unknown encoding.
    Csv,
    /// Excel/OpenDocument workbook; only the first worksheet is read.
    Workbook,
}

impl UploadFormat {
    /// Picks the format from a file extension (case-insensitive).
    pub fn from_path(path: &Path) -> Result<Self> {
        let ext = path
            .extension()
            .and_then(|e| e.to_str())
            .map(str::to_ascii_lowercase)
            .unwrap_or_default();

        match ext.as_str() {
            "csv" => Ok(UploadFormat::Csv),
            "xlsx" | "xlsm" | "xlsb" | "xls" | "ods" => Ok(UploadFormat::Workbook),
            _ => Err(PipelineError::UnsupportedFormat(
                path.display().to_string(),
            )),
        }
    }
}

/// Options that change what the pipeline returns.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AnalysisOptions {
    /// Analyze every Material Group instead of stopping after the first one.
    pub process_all_partitions: bool,
    /// Ranking length for the consumption pattern report; `None` keeps all.
    pub top_n: Option<usize>,
    /// Column summed by the pattern report; `Order Quantity` for order
    /// placement exports.
    pub quantity_column: String,
}

impl Default for AnalysisOptions {
    fn default() -> Self {
        Self {
            process_all_partitions: false,
            top_n: Some(DEFAULT_TOP_N),
            quantity_column: QUANTITY.to_string(),
        }
    }
}
