//! HEIC/HEIF decoding: container bytes → RGBA pixel buffer.
//!
//! Chromium cannot display HEIC, so these images are decoded with libheif
//! and re-encoded as PNG by [`super::encode`]. The decode is CPU-bound FFI
//! work; callers run it inside `spawn_blocking`.
//!
//! The primary image is decoded as stored. Orientation metadata is not
//! applied.

use super::gate::ImageFormat;
use crate::error::Img2PdfError;
use image::RgbaImage;

/// Decode the primary image of a HEIC/HEIF container.
#[cfg(feature = "heif")]
pub fn decode_heif(bytes: &[u8], format: ImageFormat) -> Result<RgbaImage, Img2PdfError> {
    use libheif_rs::{ColorSpace, HeifContext, LibHeif, RgbChroma};
    use tracing::debug;

    let fail = |detail: String| Img2PdfError::DecodeFailed {
        format: format.to_string(),
        detail,
    };

    let lib = LibHeif::new();
    let ctx = HeifContext::read_from_bytes(bytes).map_err(|e| fail(e.to_string()))?;
    let handle = ctx
        .primary_image_handle()
        .map_err(|e| fail(e.to_string()))?;
    let decoded = lib
        .decode(&handle, ColorSpace::Rgb(RgbChroma::Rgba), None)
        .map_err(|e| fail(e.to_string()))?;

    let planes = decoded.planes();
    let plane = planes
        .interleaved
        .ok_or_else(|| fail("decoder returned no interleaved RGBA plane".into()))?;

    let (width, height) = (plane.width, plane.height);
    let row_len = width as usize * 4;
    let mut pixels = Vec::with_capacity(row_len * height as usize);
    // libheif pads rows to `stride`; copy only the visible pixels.
    for y in 0..height as usize {
        let start = y * plane.stride;
        let row = plane
            .data
            .get(start..start + row_len)
            .ok_or_else(|| fail(format!("pixel plane too short at row {y}")))?;
        pixels.extend_from_slice(row);
    }

    debug!("Decoded {} → {}x{} px", format, width, height);
    RgbaImage::from_raw(width, height, pixels)
        .ok_or_else(|| fail("pixel buffer does not match image dimensions".into()))
}

/// HEIF support was not compiled in; every HEIC/HEIF input fails to decode.
#[cfg(not(feature = "heif"))]
pub fn decode_heif(_bytes: &[u8], format: ImageFormat) -> Result<RgbaImage, Img2PdfError> {
    Err(Img2PdfError::DecodeFailed {
        format: format.to_string(),
        detail: "HEIF support is not enabled in this build (rebuild with `--features heif`)"
            .into(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    /// Encode a small gradient as lossless HEVC-in-HEIF, for tests.
    ///
    /// Returns `None` when the linked libheif has no HEVC encoder.
    #[cfg(feature = "heif")]
    fn heic_fixture(width: u32, height: u32) -> Option<Vec<u8>> {
        use libheif_rs::{
            Channel, ColorSpace, CompressionFormat, EncoderQuality, HeifContext, Image, LibHeif,
            RgbChroma,
        };

        let lib = LibHeif::new();
        let mut image = Image::new(width, height, ColorSpace::Rgb(RgbChroma::Rgb)).ok()?;
        image
            .create_plane(Channel::Interleaved, width, height, 24)
            .ok()?;
        {
            let planes = image.planes_mut();
            let mut plane = planes.interleaved?;
            let stride = plane.stride;
            for y in 0..height as usize {
                for x in 0..width as usize {
                    let px = y * stride + x * 3;
                    plane.data[px] = (x * 80) as u8;
                    plane.data[px + 1] = (y * 120) as u8;
                    plane.data[px + 2] = 200;
                }
            }
        }

        let mut ctx = HeifContext::new().ok()?;
        let mut encoder = lib.encoder_for_format(CompressionFormat::Hevc).ok()?;
        encoder.set_quality(EncoderQuality::LossLess).ok()?;
        ctx.encode_image(&image, &mut encoder, None).ok()?;
        ctx.write_to_bytes().ok()
    }

    #[cfg(feature = "heif")]
    #[test]
    fn heic_decodes_to_rgba_at_stored_size() {
        use crate::pipeline::gate::{sniff, Signature};

        let Some(bytes) = heic_fixture(3, 2) else {
            println!("SKIP — libheif has no HEVC encoder");
            return;
        };
        assert!(matches!(sniff(&bytes), Some(Signature::Heif)));

        for format in [ImageFormat::Heic, ImageFormat::Heif] {
            let img = decode_heif(&bytes, format).unwrap();
            assert_eq!(img.dimensions(), (3, 2));
            // Opaque source: alpha is filled in by the decoder.
            assert!(img.pixels().all(|p| p.0[3] == 255));
        }
    }

    #[cfg(not(feature = "heif"))]
    #[test]
    fn disabled_build_names_the_feature() {
        match decode_heif(b"\0\0\0\x18ftypheic", ImageFormat::Heic) {
            Err(Img2PdfError::DecodeFailed { detail, .. }) => {
                assert!(detail.contains("--features heif"), "got: {detail}")
            }
            other => panic!("expected DecodeFailed, got {other:?}"),
        }
    }

    #[test]
    fn truncated_heic_is_a_decode_error() {
        let truncated = b"\0\0\0\x18ftypheic\0\0\0\0mif1";
        match decode_heif(truncated, ImageFormat::Heic) {
            Err(Img2PdfError::DecodeFailed { format, .. }) => assert_eq!(format, "HEIC"),
            other => panic!("expected DecodeFailed, got {other:?}"),
        }
    }

    #[test]
    fn empty_heif_is_a_decode_error() {
        assert!(matches!(
            decode_heif(&[], ImageFormat::Heif),
            Err(Img2PdfError::DecodeFailed { .. })
        ));
    }
}
