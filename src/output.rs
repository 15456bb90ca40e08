//! Conversion results.

use crate::pipeline::gate::ImageFormat;
use serde::{Deserialize, Serialize};

/// A finished conversion: the PDF plus what it was made from.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConversionOutput {
    /// PDF bytes. Skipped in JSON output.
    #[serde(skip)]
    pub pdf: Vec<u8>,
    /// Download name: the source base name plus `.pdf`.
    pub filename: String,
    /// Source format as gated by its extension.
    pub format: ImageFormat,
    pub stats: ConversionStats,
}

/// Size and timing figures for one conversion.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConversionStats {
    pub input_bytes: usize,
    pub output_bytes: usize,
    /// Time spent decoding/encoding the image into a data URI.
    pub normalize_duration_ms: u64,
    /// Time spent in the browser, launch included.
    pub render_duration_ms: u64,
    pub total_duration_ms: u64,
}

/// Human-readable byte count, e.g. `1.4 MB`.
pub fn format_bytes(n: usize) -> String {
    const UNITS: [&str; 4] = ["B", "KB", "MB", "GB"];
    let mut value = n as f64;
    let mut unit = 0;
    while value >= 1024.0 && unit < UNITS.len() - 1 {
        value /= 1024.0;
        unit += 1;
    }
    if unit == 0 {
        format!("{n} B")
    } else {
        format!("{value:.1} {}", UNITS[unit])
    }
}
