//! Image normalisation: source bytes → base64 data URI the browser can show.
//!
//! JPEG and PNG are embedded untouched, so the same input always yields the
//! same URI. HEIC/HEIF are decoded ([`super::decode`]) and re-encoded as PNG;
//! PNG is lossless, so no second generation of compression artefacts ends up
//! in the PDF.

use super::decode::decode_heif;
use super::gate::ImageFormat;
use crate::error::Img2PdfError;
use base64::{engine::general_purpose::STANDARD, Engine as _};
use image::RgbaImage;
use std::io::Cursor;
use tracing::debug;

/// A browser-displayable image, inlined as a data URI.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NormalizedImage {
    /// MIME type carried by the URI (`image/png` for transcoded HEIC).
    pub mime_type: &'static str,
    /// `data:<mime>;base64,<payload>`
    pub data_uri: String,
}

/// Produce the data URI for `bytes` of an already-gated `format`.
///
/// Blocking for HEIC/HEIF (codec work); pure and cheap otherwise.
pub fn normalize(bytes: &[u8], format: ImageFormat) -> Result<NormalizedImage, Img2PdfError> {
    if format.needs_transcode() {
        let rgba = decode_heif(bytes, format)?;
        let png = encode_png(&rgba).map_err(|e| Img2PdfError::DecodeFailed {
            format: format.to_string(),
            detail: format!("PNG re-encoding failed: {e}"),
        })?;
        return Ok(NormalizedImage {
            mime_type: "image/png",
            data_uri: data_uri("image/png", &png),
        });
    }

    let mime = format.mime_type();
    Ok(NormalizedImage {
        mime_type: mime,
        data_uri: data_uri(mime, bytes),
    })
}

/// Encode an RGBA buffer as PNG bytes.
pub fn encode_png(img: &RgbaImage) -> Result<Vec<u8>, image::ImageError> {
    let mut buf = Vec::new();
    img.write_to(&mut Cursor::new(&mut buf), image::ImageFormat::Png)?;
    Ok(buf)
}

/// Base64-wrap `bytes` as a data URI.
pub fn data_uri(mime: &str, bytes: &[u8]) -> String {
    let b64 = STANDARD.encode(bytes);
    debug!("Encoded {} → {} bytes base64", mime, b64.len());
    format!("data:{mime};base64,{b64}")
}
