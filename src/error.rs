//! Error types for the edgequake-img2pdf library.
//!
//! Every failure is terminal for the request that hit it: nothing is retried
//! internally and no partial PDF is ever returned. Each variant knows the HTTP
//! status it maps to ([`Img2PdfError::status`]), a short user-facing message
//! ([`Img2PdfError::message`]) and a lower-level detail string
//! ([`Img2PdfError::details`]); together these form the JSON [`ErrorBody`]
//! returned by both transport variants.

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use thiserror::Error;

/// All errors returned by the edgequake-img2pdf library.
#[derive(Debug, Error)]
pub enum Img2PdfError {
    // ── Request errors ────────────────────────────────────────────────────
    /// The multipart body had no `file` field, or the field was empty.
    #[error("No file provided")]
    NoFileProvided,

    /// The request body could not be parsed as multipart form-data.
    #[error("Malformed upload: {detail}")]
    InvalidUpload { detail: String },

    /// `/convert` only accepts POST.
    #[error("Method Not Allowed")]
    MethodNotAllowed,

    /// The upload exceeded the configured body limit.
    #[error("Upload exceeds the {limit_bytes} byte limit")]
    PayloadTooLarge { limit_bytes: usize },

    // ── Format gate ───────────────────────────────────────────────────────
    /// The declared extension is not in the allow-set.
    #[error("Unsupported file type: {ext}")]
    UnsupportedFormat { ext: String },

    /// The file content does not match its declared extension.
    #[error("File content does not match its extension: declared {declared}, found {detected}")]
    SignatureMismatch { declared: String, detected: String },

    // ── Pipeline errors ───────────────────────────────────────────────────
    /// The image codec could not parse the buffer.
    #[error("Failed to decode {format} image: {detail}")]
    DecodeFailed { format: String, detail: String },

    /// The headless browser could not be started.
    #[error("Failed to launch headless browser: {detail}\nSet IMG2PDF_CHROME_PATH if Chromium is installed in a non-standard location.")]
    LaunchFailed { detail: String },

    /// The browser failed while loading the page or exporting the PDF.
    #[error("PDF rendering failed: {detail}")]
    RenderFailed { detail: String },

    /// Rasterisation did not finish within the configured timeout.
    #[error("PDF rendering timed out after {secs}s")]
    RenderTimeout { secs: u64 },

    // ── CLI / file errors ─────────────────────────────────────────────────
    /// Local input file does not exist or cannot be read.
    #[error("Input file not found: '{path}'")]
    InputNotFound { path: PathBuf },

    /// HTTP download of an input URL failed.
    #[error("Failed to download '{url}': {reason}")]
    DownloadFailed { url: String, reason: String },

    /// Could not create or write the output PDF file.
    #[error("Failed to write output file '{path}': {source}")]
    OutputWriteFailed {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    // ── Config errors ─────────────────────────────────────────────────────
    /// Builder validation failed.
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    // ── Catch-all ─────────────────────────────────────────────────────────
    /// Unexpected internal error.
    #[error("Internal error: {0}")]
    Internal(String),
}

impl Img2PdfError {
    /// HTTP status code this error maps to.
    pub fn status(&self) -> StatusCode {
        match self {
            Self::NoFileProvided | Self::InvalidUpload { .. } => StatusCode::BAD_REQUEST,
            Self::MethodNotAllowed => StatusCode::METHOD_NOT_ALLOWED,
            Self::PayloadTooLarge { .. } => StatusCode::PAYLOAD_TOO_LARGE,
            Self::UnsupportedFormat { .. } | Self::SignatureMismatch { .. } => {
                StatusCode::UNSUPPORTED_MEDIA_TYPE
            }
            Self::DecodeFailed { .. }
            | Self::LaunchFailed { .. }
            | Self::RenderFailed { .. }
            | Self::RenderTimeout { .. }
            | Self::InputNotFound { .. }
            | Self::DownloadFailed { .. }
            | Self::OutputWriteFailed { .. }
            | Self::InvalidConfig(_)
            | Self::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    /// Short user-facing message for the `error` field of the JSON body.
    pub fn message(&self) -> String {
        match self {
            Self::NoFileProvided => "No file provided".into(),
            Self::InvalidUpload { .. } => "Malformed upload".into(),
            Self::MethodNotAllowed => "Method Not Allowed".into(),
            Self::PayloadTooLarge { .. } => "File too large".into(),
            Self::UnsupportedFormat { ext } => format!("Unsupported file type: {ext}"),
            Self::SignatureMismatch { .. } => "File content does not match its extension".into(),
            _ => "Conversion failed".into(),
        }
    }

    /// Best-effort lower-level detail for the `details` field.
    pub fn details(&self) -> String {
        match self {
            Self::NoFileProvided | Self::MethodNotAllowed => String::new(),
            Self::InvalidUpload { detail } => detail.clone(),
            other => other.to_string(),
        }
    }

    /// JSON body shared by the server and function transports.
    pub fn body(&self) -> ErrorBody {
        ErrorBody {
            error: self.message(),
            details: self.details(),
        }
    }
}

impl IntoResponse for Img2PdfError {
    fn into_response(self) -> Response {
        let status = self.status();
        if status.is_server_error() {
            tracing::error!("Conversion failed: {}", self);
        } else {
            tracing::debug!("Rejected request ({}): {}", status, self);
        }
        (status, Json(self.body())).into_response()
    }
}

/// Machine-readable error payload: `{ "error": …, "details": … }`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ErrorBody {
    pub error: String,
    pub details: String,
}
