//! Upload staging for server mode.
//!
//! Each process owns one [`UploadDir`], a temporary directory created at
//! startup and removed when the last handle drops (normal shutdown). Uploads
//! are written into it under a random name with the original extension kept,
//! and removed again by [`StagedFile`]'s `Drop` on every exit path.

use crate::error::Img2PdfError;
use std::path::{Path, PathBuf};
use tempfile::TempDir;
use tracing::{debug, warn};
use uuid::Uuid;

/// Per-process staging area for uploaded images and rendered PDFs.
#[derive(Debug)]
pub struct UploadDir {
    dir: TempDir,
}

impl UploadDir {
    /// Create the staging directory under `parent`, or the OS temp dir.
    pub fn create(parent: Option<&Path>) -> Result<Self, Img2PdfError> {
        let mut builder = tempfile::Builder::new();
        builder.prefix("img2pdf-uploads-");
        let dir = match parent {
            Some(p) => {
                std::fs::create_dir_all(p).map_err(|e| {
                    Img2PdfError::Internal(format!("create upload dir {}: {e}", p.display()))
                })?;
                builder.tempdir_in(p)
            }
            None => builder.tempdir(),
        }
        .map_err(|e| Img2PdfError::Internal(format!("create upload dir: {e}")))?;

        debug!("Staging uploads in {}", dir.path().display());
        Ok(Self { dir })
    }

    pub fn path(&self) -> &Path {
        self.dir.path()
    }

    /// Write `bytes` to `<uuid><ext>` inside the staging directory.
    pub async fn stage(&self, bytes: &[u8], ext: &str) -> Result<StagedFile, Img2PdfError> {
        let path = self.dir.path().join(format!("{}{}", Uuid::new_v4(), ext));
        // Guard first so a partially written file is removed too.
        let staged = StagedFile { path };
        tokio::fs::write(&staged.path, bytes)
            .await
            .map_err(|e| Img2PdfError::Internal(format!("Failed to stage upload: {e}")))?;
        Ok(staged)
    }

    /// A fresh, empty directory for one request's output.
    pub fn output_dir(&self) -> Result<TempDir, Img2PdfError> {
        tempfile::Builder::new()
            .prefix("out-")
            .tempdir_in(self.dir.path())
            .map_err(|e| Img2PdfError::Internal(format!("create output dir: {e}")))
    }
}

/// A staged upload, deleted when dropped.
#[derive(Debug)]
pub struct StagedFile {
    path: PathBuf,
}

impl StagedFile {
    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl Drop for StagedFile {
    fn drop(&mut self) {
        match std::fs::remove_file(&self.path) {
            Ok(()) => debug!("Removed staged upload {}", self.path.display()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
            Err(e) => warn!("Failed to remove {}: {}", self.path.display(), e),
        }
    }
}
