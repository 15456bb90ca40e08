//! Multipart extraction shared by both transport variants.

use crate::error::Img2PdfError;
use crate::pipeline::gate::DEFAULT_BASE_NAME;
use crate::pipeline::input::SourceImage;
use axum::extract::multipart::{Multipart, MultipartError, MultipartRejection};
use axum::http::StatusCode;

/// Form field carrying the image.
pub const FILE_FIELD: &str = "file";

/// Pull the `file` field out of a multipart body, entirely in memory.
///
/// Other fields are skipped. A missing or empty field is
/// [`Img2PdfError::NoFileProvided`]; a field larger than `limit` bytes is
/// [`Img2PdfError::PayloadTooLarge`].
pub async fn read_upload(
    multipart: Result<Multipart, MultipartRejection>,
    limit: usize,
) -> Result<SourceImage, Img2PdfError> {
    let mut multipart = multipart.map_err(|e| Img2PdfError::InvalidUpload {
        detail: e.body_text(),
    })?;
    let to_error = |e: MultipartError| {
        if e.status() == StatusCode::PAYLOAD_TOO_LARGE {
            Img2PdfError::PayloadTooLarge { limit_bytes: limit }
        } else {
            Img2PdfError::InvalidUpload {
                detail: e.body_text(),
            }
        }
    };

    while let Some(field) = multipart.next_field().await.map_err(to_error)? {
        if field.name() != Some(FILE_FIELD) {
            continue;
        }
        let filename = field
            .file_name()
            .filter(|n| !n.is_empty())
            .unwrap_or(DEFAULT_BASE_NAME)
            .to_string();
        let bytes = field.bytes().await.map_err(to_error)?;

        if bytes.is_empty() {
            return Err(Img2PdfError::NoFileProvided);
        }
        if bytes.len() > limit {
            return Err(Img2PdfError::PayloadTooLarge { limit_bytes: limit });
        }
        return Ok(SourceImage::new(filename, bytes.to_vec()));
    }

    Err(Img2PdfError::NoFileProvided)
}
