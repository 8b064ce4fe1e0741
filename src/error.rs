use thiserror::Error;

/// Errors produced while loading, normalizing and analyzing an upload.
#[derive(Error, Debug)]
pub enum PipelineError {
    /// The uploaded bytes could not be parsed as the declared format.
    #[error("Malformed file: {reason}")]
    MalformedFile { reason: String },

    /// The charset of a CSV upload could not be determined.
    #[error("Unable to detect file encoding")]
    EncodingUndetected,

    /// The canonical table has no `Material Group` column.
    #[error("No Material Group column found in the uploaded file.")]
    NoPartitionColumn,

    /// An aggregator could not find a column it depends on.
    #[error("{aggregator}: missing expected column '{column}'")]
    MissingExpectedColumn {
        aggregator: &'static str,
        column: &'static str,
    },

    /// The file extension does not map to a supported upload format.
    #[error("Unsupported upload format: {0}")]
    UnsupportedFormat(String),

    #[error(transparent)]
    Io(#[from] std::io::Error),

    #[error("Failed to serialize JSON: {0}")]
    Json(#[from] serde_json::Error),
}

impl PipelineError {
    /// A fixed message that is safe to hand back to whoever uploaded the file.
    ///
    /// Parse failures never leak the underlying reader error; the detail is
    /// only available through `Display` for logging.
    pub fn user_message(&self) -> &'static str {
        match self {
            PipelineError::MalformedFile { .. } => "The uploaded file could not be read.",
            PipelineError::EncodingUndetected => "Unable to detect file encoding.",
            PipelineError::NoPartitionColumn => {
                "No Material Group column found in the uploaded file."
            }
            PipelineError::MissingExpectedColumn { .. } => {
                "The uploaded file is missing a column required for this analysis."
            }
            PipelineError::UnsupportedFormat(_) => "Unsupported file type.",
            PipelineError::Io(_) | PipelineError::Json(_) => {
                "An internal error occurred while processing the file."
            }
        }
    }

    pub(crate) fn malformed(reason: impl Into<String>) -> Self {
        PipelineError::MalformedFile {
            reason: reason.into(),
        }
    }
}

pub type Result<T> = std::result::Result<T, PipelineError>;
