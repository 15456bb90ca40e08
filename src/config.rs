//! Configuration types for image-to-PDF conversion and the HTTP service.
//!
//! All pipeline behaviour is controlled through [`ConversionConfig`], built
//! via its [`ConversionConfigBuilder`]. Transport settings (bind address,
//! deployment mode, upload staging) live in [`ServerConfig`].

use crate::error::Img2PdfError;
use crate::pipeline::rasterize::Rasterizer;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::PathBuf;
use std::sync::Arc;

/// Default upload size limit: 30 MiB.
pub const DEFAULT_MAX_UPLOAD_BYTES: usize = 30 * 1024 * 1024;

/// Configuration for a single image-to-PDF conversion.
///
/// Built via [`ConversionConfig::builder()`] or using
/// [`ConversionConfig::default()`].
///
/// # Example
/// ```rust
/// use edgequake_img2pdf::{ConversionConfig, PaperSize};
///
/// let config = ConversionConfig::builder()
///     .paper(PaperSize::Letter)
///     .render_timeout_secs(30)
///     .build()
///     .unwrap();
/// ```
#[derive(Clone)]
pub struct ConversionConfig {
    /// Output page size. Default: [`PaperSize::A4`].
    pub paper: PaperSize,

    /// Print CSS backgrounds into the PDF. Default: true.
    pub print_background: bool,

    /// Upper bound on browser launch + load + PDF export, in seconds. Default: 60.
    ///
    /// A pathological input must not hang a request forever; past this
    /// deadline the request fails with [`Img2PdfError::RenderTimeout`].
    pub render_timeout_secs: u64,

    /// Explicit Chromium/Chrome binary. If None, the usual install locations
    /// and `CHROME` are searched.
    pub chrome_path: Option<PathBuf>,

    /// Run Chromium with its sandbox enabled. Default: false.
    ///
    /// Containers and serverless runtimes rarely allow the setuid sandbox, so
    /// the service launches with `--no-sandbox` unless told otherwise.
    pub sandbox: bool,

    /// Check magic bytes against the declared extension. Default: true.
    ///
    /// When false, dispatch is purely extension-based.
    pub verify_signatures: bool,

    /// Maximum accepted upload size in bytes. Default: 30 MiB.
    pub max_upload_bytes: usize,

    /// Download timeout for URL inputs (CLI only) in seconds. Default: 120.
    pub download_timeout_secs: u64,

    /// Pre-constructed rasterizer. If None, a [`crate::ChromeRasterizer`] is
    /// built from the fields above for each conversion.
    pub rasterizer: Option<Arc<dyn Rasterizer>>,
}

impl Default for ConversionConfig {
    fn default() -> Self {
        Self {
            paper: PaperSize::default(),
            print_background: true,
            render_timeout_secs: 60,
            chrome_path: None,
            sandbox: false,
            verify_signatures: true,
            max_upload_bytes: DEFAULT_MAX_UPLOAD_BYTES,
            download_timeout_secs: 120,
            rasterizer: None,
        }
    }
}

impl fmt::Debug for ConversionConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ConversionConfig")
            .field("paper", &self.paper)
            .field("print_background", &self.print_background)
            .field("render_timeout_secs", &self.render_timeout_secs)
            .field("chrome_path", &self.chrome_path)
            .field("sandbox", &self.sandbox)
            .field("verify_signatures", &self.verify_signatures)
            .field("max_upload_bytes", &self.max_upload_bytes)
            .field("download_timeout_secs", &self.download_timeout_secs)
            .field(
                "rasterizer",
                &self.rasterizer.as_ref().map(|_| "<dyn Rasterizer>"),
            )
            .finish()
    }
}

impl ConversionConfig {
    /// Create a new builder for `ConversionConfig`.
    pub fn builder() -> ConversionConfigBuilder {
        ConversionConfigBuilder {
            config: Self::default(),
        }
    }
}

/// Builder for [`ConversionConfig`].
#[derive(Debug)]
pub struct ConversionConfigBuilder {
    config: ConversionConfig,
}

impl ConversionConfigBuilder {
    pub fn paper(mut self, paper: PaperSize) -> Self {
        self.config.paper = paper;
        self
    }

    pub fn print_background(mut self, v: bool) -> Self {
        self.config.print_background = v;
        self
    }

    pub fn render_timeout_secs(mut self, secs: u64) -> Self {
        self.config.render_timeout_secs = secs;
        self
    }

    pub fn chrome_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.config.chrome_path = Some(path.into());
        self
    }

    pub fn sandbox(mut self, v: bool) -> Self {
        self.config.sandbox = v;
        self
    }

    pub fn verify_signatures(mut self, v: bool) -> Self {
        self.config.verify_signatures = v;
        self
    }

    pub fn max_upload_bytes(mut self, n: usize) -> Self {
        self.config.max_upload_bytes = n;
        self
    }

    pub fn download_timeout_secs(mut self, secs: u64) -> Self {
        self.config.download_timeout_secs = secs;
        self
    }

    pub fn rasterizer(mut self, rasterizer: Arc<dyn Rasterizer>) -> Self {
        self.config.rasterizer = Some(rasterizer);
        self
    }

    /// Build the configuration, validating constraints.
    pub fn build(self) -> Result<ConversionConfig, Img2PdfError> {
        let c = &self.config;
        if c.render_timeout_secs == 0 {
            return Err(Img2PdfError::InvalidConfig(
                "Render timeout must be ≥ 1 second".into(),
            ));
        }
        if c.max_upload_bytes == 0 {
            return Err(Img2PdfError::InvalidConfig(
                "Upload limit must be ≥ 1 byte".into(),
            ));
        }
        Ok(self.config)
    }
}

// ── Enums ────────────────────────────────────────────────────────────────

/// Physical page size of the generated PDF.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PaperSize {
    /// 210 × 297 mm. (default)
    #[default]
    A4,
    /// 8.5 × 11 in.
    Letter,
}

impl PaperSize {
    /// `(width, height)` in inches, the unit Chromium's print API expects.
    pub fn inches(self) -> (f64, f64) {
        match self {
            PaperSize::A4 => (8.27, 11.69),
            PaperSize::Letter => (8.5, 11.0),
        }
    }
}

/// Which transport variant the HTTP service runs.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ServeMode {
    /// Long-running server: uploads are staged to a temp directory and
    /// `GET /health` is exposed. (default)
    #[default]
    Server,
    /// Stateless handler: uploads stay in memory, no filesystem use.
    Function,
}

/// Settings for the HTTP transport.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    /// Bind host. Default: `0.0.0.0`.
    pub host: String,
    /// Bind port. Default: 3000.
    pub port: u16,
    /// Transport variant.
    pub mode: ServeMode,
    /// Parent directory for the per-process uploads directory. If None, the
    /// OS temp directory is used.
    pub upload_dir: Option<PathBuf>,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".into(),
            port: 3000,
            mode: ServeMode::default(),
            upload_dir: None,
        }
    }
}

impl ServerConfig {
    /// `host:port` string suitable for `TcpListener::bind`.
    pub fn bind_addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}
