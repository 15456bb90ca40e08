//! Input resolution for the CLI: a local path or URL becomes a [`SourceImage`].
//!
//! The HTTP transports build their `SourceImage` straight from the multipart
//! field; only the command-line converter needs to read files or download.

use crate::error::Img2PdfError;
use std::path::Path;
use tracing::{debug, info};

/// Raw upload bytes plus the filename they were declared under.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SourceImage {
    pub filename: String,
    pub bytes: Vec<u8>,
}

impl SourceImage {
    pub fn new(filename: impl Into<String>, bytes: impl Into<Vec<u8>>) -> Self {
        Self {
            filename: filename.into(),
            bytes: bytes.into(),
        }
    }
}

/// Check if the input string looks like a URL.
pub fn is_url(input: &str) -> bool {
    input.starts_with("http://") || input.starts_with("https://")
}

/// Resolve a local path or HTTP/HTTPS URL into a [`SourceImage`].
pub async fn resolve_input(input: &str, timeout_secs: u64) -> Result<SourceImage, Img2PdfError> {
    if is_url(input) {
        download_url(input, timeout_secs).await
    } else {
        read_local(Path::new(input)).await
    }
}

/// Read a local file; its file name is the declared name.
pub async fn read_local(path: &Path) -> Result<SourceImage, Img2PdfError> {
    let bytes = tokio::fs::read(path)
        .await
        .map_err(|_| Img2PdfError::InputNotFound {
            path: path.to_path_buf(),
        })?;
    let filename = path
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_default();

    debug!("Read local image: {} ({} bytes)", path.display(), bytes.len());
    Ok(SourceImage { filename, bytes })
}

/// Download a URL into memory.
async fn download_url(url: &str, timeout_secs: u64) -> Result<SourceImage, Img2PdfError> {
    info!("Downloading image from: {}", url);
    let failed = |reason: String| Img2PdfError::DownloadFailed {
        url: url.to_string(),
        reason,
    };

    let client = reqwest::Client::builder()
        .timeout(std::time::Duration::from_secs(timeout_secs))
        .build()
        .map_err(|e| failed(e.to_string()))?;

    let response = client.get(url).send().await.map_err(|e| {
        if e.is_timeout() {
            failed(format!("timed out after {timeout_secs}s"))
        } else {
            failed(e.to_string())
        }
    })?;

    if !response.status().is_success() {
        return Err(failed(format!("HTTP {}", response.status())));
    }

    let content_type = response
        .headers()
        .get(reqwest::header::CONTENT_TYPE)
        .and_then(|v| v.to_str().ok())
        .map(str::to_string);
    let filename = extract_filename(url, content_type.as_deref());

    let bytes = response.bytes().await.map_err(|e| failed(e.to_string()))?;
    info!("Downloaded {} ({} bytes)", filename, bytes.len());

    Ok(SourceImage {
        filename,
        bytes: bytes.to_vec(),
    })
}

/// Name the download after the last URL path segment, or after its
/// `Content-Type` when the URL has no usable file name.
fn extract_filename(url: &str, content_type: Option<&str>) -> String {
    if let Ok(parsed) = reqwest::Url::parse(url) {
        if let Some(mut segments) = parsed.path_segments() {
            if let Some(last) = segments.next_back() {
                if !last.is_empty() && last.contains('.') {
                    return last.to_string();
                }
            }
        }
    }

    let ext = match content_type.map(|c| c.split(';').next().unwrap_or("").trim()) {
        Some("image/jpeg") => ".jpg",
        Some("image/png") => ".png",
        Some("image/heic") => ".heic",
        Some("image/heif") => ".heif",
        _ => "",
    };
    format!("downloaded{ext}")
}
