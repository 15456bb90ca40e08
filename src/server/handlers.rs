//! HTTP handlers for both transport variants.

use super::upload::read_upload;
use super::AppState;
use crate::convert::{convert, convert_to_file};
use crate::error::Img2PdfError;
use crate::pipeline::gate;
use axum::{
    extract::{multipart::MultipartRejection, Multipart, State},
    http::{header, StatusCode},
    response::{IntoResponse, Response},
    Json,
};
use serde::{Deserialize, Serialize};
use tracing::info;
use uuid::Uuid;

/// `GET /health` payload.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Health {
    pub ok: bool,
}

pub async fn health() -> Json<Health> {
    Json(Health { ok: true })
}

/// Any non-POST method on `/convert`.
pub async fn method_not_allowed() -> Img2PdfError {
    Img2PdfError::MethodNotAllowed
}

/// Server variant: stage the upload to disk, convert file → file, respond.
///
/// The staged input and the per-request output directory are owned by
/// guards, so both are gone by the time this returns, whatever the outcome.
pub async fn convert_staged(
    State(state): State<AppState>,
    multipart: Result<Multipart, MultipartRejection>,
) -> Result<Response, Img2PdfError> {
    let uploads = state.uploads()?;
    let source = read_upload(multipart, state.config.max_upload_bytes).await?;
    info!("Received {} ({} bytes)", source.filename, source.bytes.len());

    // Reject before anything touches the disk.
    gate::check_format(&source.filename)?;
    let ext = gate::extension_of(&source.filename);
    let download_name = gate::output_filename(&source.filename);

    let staged = uploads.stage(&source.bytes, &ext).await?;
    drop(source);

    let out_dir = uploads.output_dir()?;
    let out_path = out_dir.path().join(format!("{}.pdf", Uuid::new_v4()));
    convert_to_file(staged.path(), &out_path, &state.config).await?;

    let pdf = tokio::fs::read(&out_path)
        .await
        .map_err(|e| Img2PdfError::Internal(format!("Failed to read rendered PDF: {e}")))?;
    Ok(pdf_response(&download_name, pdf))
}

/// Function variant: everything stays in memory.
pub async fn convert_in_memory(
    State(state): State<AppState>,
    multipart: Result<Multipart, MultipartRejection>,
) -> Result<Response, Img2PdfError> {
    let source = read_upload(multipart, state.config.max_upload_bytes).await?;
    info!("Received {} ({} bytes)", source.filename, source.bytes.len());

    let output = convert(source, &state.config).await?;
    Ok(pdf_response(&output.filename, output.pdf))
}

/// `200 OK` with the PDF as an attachment named `filename`.
pub fn pdf_response(filename: &str, pdf: Vec<u8>) -> Response {
    (
        StatusCode::OK,
        [
            (header::CONTENT_TYPE, "application/pdf".to_string()),
            (
                header::CONTENT_DISPOSITION,
                format!("attachment; filename=\"{filename}\""),
            ),
        ],
        pdf,
    )
        .into_response()
}
