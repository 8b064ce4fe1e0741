//! Charset detection for CSV uploads.
//!
//! CSV exports from spreadsheet tools arrive in whatever codepage the
//! exporting machine used, so bytes are never assumed to be UTF-8.
//! [`EncodingSniffer`] is the seam; [`ChardetSniffer`] is the statistical
//! implementation backed by `chardetng`.

use chardetng::EncodingDetector;
use encoding_rs::{Encoding, UTF_8};
use std::borrow::Cow;
use tracing::debug;

use crate::error::{PipelineError, Result};

/// Outcome of a detection attempt.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Detection {
    pub encoding: &'static Encoding,
    /// 0.0 when the detector fell back to a default instead of recognising
    /// the content.
    pub confidence: f32,
}

/// Guesses the character encoding of raw bytes.
pub trait EncodingSniffer: Send + Sync {
    /// Returns `None` when no encoding can be named at all.
    fn detect(&self, bytes: &[u8]) -> Option<Detection>;
}

/// Byte-order marks and valid UTF-8 are recognised exactly; anything else is
/// scored by `chardetng`.
#[derive(Debug, Default, Clone, Copy)]
pub struct ChardetSniffer;

impl EncodingSniffer for ChardetSniffer {
    fn detect(&self, bytes: &[u8]) -> Option<Detection> {
        if bytes.is_empty() {
            return None;
        }

        if let Some((encoding, _)) = Encoding::for_bom(bytes) {
            return Some(Detection {
                encoding,
                confidence: 1.0,
            });
        }

        if std::str::from_utf8(bytes).is_ok() {
            return Some(Detection {
                encoding: UTF_8,
                confidence: 1.0,
            });
        }

        let mut detector = EncodingDetector::new();
        detector.feed(bytes, true);
        let (encoding, content_backed) = detector.guess_assess(None, false);

        Some(Detection {
            encoding,
            confidence: if content_backed { 1.0 } else { 0.0 },
        })
    }
}

/// Decodes `bytes` into text using `sniffer`.
///
/// # Errors
///
/// Returns [`PipelineError::EncodingUndetected`] when the sniffer names no
/// encoding or reports zero confidence.
pub fn decode_text<'a>(bytes: &'a [u8], sniffer: &dyn EncodingSniffer) -> Result<Cow<'a, str>> {
    let detection = sniffer
        .detect(bytes)
        .filter(|d| d.confidence > 0.0)
        .ok_or(PipelineError::EncodingUndetected)?;

    debug!(
        encoding = detection.encoding.name(),
        confidence = detection.confidence,
        bytes = bytes.len(),
        "Detected CSV encoding"
    );

    // `decode` strips a leading BOM and replaces malformed sequences.
    let (text, _, _) = detection.encoding.decode(bytes);
    Ok(text)
}
