//! Conversion entry points.
//!
//! [`convert`] is the in-memory pipeline shared by every transport. The other
//! functions only differ in where bytes come from and go to:
//! [`convert_to_file`] reads a staged file and writes the PDF to a path
//! (server mode), [`convert_input`] resolves a CLI path or URL first.

use crate::config::ConversionConfig;
use crate::error::Img2PdfError;
use crate::output::{ConversionOutput, ConversionStats};
use crate::pipeline::encode::{self, NormalizedImage};
use crate::pipeline::gate::{self, ImageFormat};
use crate::pipeline::input::{self, SourceImage};
use crate::pipeline::page;
use crate::pipeline::rasterize::{self, ChromeRasterizer, PdfOptions, Rasterizer};
use std::path::Path;
use std::sync::Arc;
use std::time::Instant;
use tracing::{debug, info};

/// Convert one in-memory image to a single-page PDF.
///
/// This is the primary entry point for the library and the whole of the
/// function-mode transport.
///
/// # Errors
/// - [`Img2PdfError::NoFileProvided`] for an empty buffer
/// - [`Img2PdfError::UnsupportedFormat`] / [`Img2PdfError::SignatureMismatch`]
///   from the format gate
/// - [`Img2PdfError::DecodeFailed`] for undecodable HEIC/HEIF
/// - [`Img2PdfError::LaunchFailed`], [`Img2PdfError::RenderFailed`],
///   [`Img2PdfError::RenderTimeout`] from the browser
pub async fn convert(
    source: SourceImage,
    config: &ConversionConfig,
) -> Result<ConversionOutput, Img2PdfError> {
    let total_start = Instant::now();
    let SourceImage { filename, bytes } = source;
    info!("Starting conversion: {} ({} bytes)", filename, bytes.len());

    if bytes.is_empty() {
        return Err(Img2PdfError::NoFileProvided);
    }
    let input_bytes = bytes.len();

    // ── Step 1: Format gate ──────────────────────────────────────────────
    let format = gate::check_format(&filename)?;
    if config.verify_signatures {
        gate::verify_signature(format, &bytes)?;
    }
    debug!("Accepted {} as {}", filename, format);

    // ── Step 2: Normalise to a data URI ──────────────────────────────────
    let normalize_start = Instant::now();
    let normalized = normalize(bytes, format).await?;
    let normalize_duration_ms = normalize_start.elapsed().as_millis() as u64;

    // ── Step 3: Build the page ───────────────────────────────────────────
    let html = page::render_page(&normalized);
    drop(normalized);

    // ── Step 4: Rasterise ────────────────────────────────────────────────
    let render_start = Instant::now();
    let pdf = rasterize::rasterize_html(
        resolve_rasterizer(config),
        html,
        PdfOptions::from_config(config),
    )
    .await?;
    let render_duration_ms = render_start.elapsed().as_millis() as u64;

    let stats = ConversionStats {
        input_bytes,
        output_bytes: pdf.len(),
        normalize_duration_ms,
        render_duration_ms,
        total_duration_ms: total_start.elapsed().as_millis() as u64,
    };
    info!(
        "Conversion complete: {} → {} bytes PDF, {}ms total",
        filename, stats.output_bytes, stats.total_duration_ms
    );

    Ok(ConversionOutput {
        pdf,
        filename: gate::output_filename(&filename),
        format,
        stats,
    })
}

/// Convert an image file on disk and write the PDF to `output_path`.
///
/// The format is taken from `input_path`'s extension. Uses atomic write
/// (temp file + rename) so a failed conversion never leaves a partial PDF.
pub async fn convert_to_file(
    input_path: impl AsRef<Path>,
    output_path: impl AsRef<Path>,
    config: &ConversionConfig,
) -> Result<ConversionStats, Img2PdfError> {
    let source = input::read_local(input_path.as_ref()).await?;
    let output = convert(source, config).await?;
    write_pdf(output_path.as_ref(), &output.pdf).await?;
    Ok(output.stats)
}

/// Convert a CLI input (local path or HTTP/HTTPS URL).
pub async fn convert_input(
    input_str: impl AsRef<str>,
    config: &ConversionConfig,
) -> Result<ConversionOutput, Img2PdfError> {
    let source = input::resolve_input(input_str.as_ref(), config.download_timeout_secs).await?;
    convert(source, config).await
}

/// Synchronous wrapper around [`convert`].
///
/// Creates a temporary tokio runtime internally.
pub fn convert_sync(
    source: SourceImage,
    config: &ConversionConfig,
) -> Result<ConversionOutput, Img2PdfError> {
    tokio::runtime::Runtime::new()
        .map_err(|e| Img2PdfError::Internal(format!("Failed to create tokio runtime: {}", e)))?
        .block_on(convert(source, config))
}

/// Write PDF bytes to `path` via a sibling temp file and rename.
pub async fn write_pdf(path: &Path, pdf: &[u8]) -> Result<(), Img2PdfError> {
    let write_failed = |source: std::io::Error| Img2PdfError::OutputWriteFailed {
        path: path.to_path_buf(),
        source,
    };

    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        tokio::fs::create_dir_all(parent).await.map_err(write_failed)?;
    }

    let tmp_path = path.with_extension("pdf.tmp");
    tokio::fs::write(&tmp_path, pdf).await.map_err(write_failed)?;
    if let Err(e) = tokio::fs::rename(&tmp_path, path).await {
        let _ = tokio::fs::remove_file(&tmp_path).await;
        return Err(write_failed(e));
    }
    Ok(())
}

// ── Internal helpers ─────────────────────────────────────────────────────

/// HEIC/HEIF decoding is blocking codec work; JPEG/PNG is a base64 pass.
async fn normalize(bytes: Vec<u8>, format: ImageFormat) -> Result<NormalizedImage, Img2PdfError> {
    if !format.needs_transcode() {
        return encode::normalize(&bytes, format);
    }
    tokio::task::spawn_blocking(move || encode::normalize(&bytes, format))
        .await
        .map_err(|e| Img2PdfError::Internal(format!("Decode task panicked: {}", e)))?
}

/// Use the injected rasterizer, else a fresh Chromium one from the config.
fn resolve_rasterizer(config: &ConversionConfig) -> Arc<dyn Rasterizer> {
    match &config.rasterizer {
        Some(r) => Arc::clone(r),
        None => Arc::new(ChromeRasterizer::from_config(config)),
    }
}
