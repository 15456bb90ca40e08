//! # edgequake-img2pdf
//!
//! Convert a single JPEG, PNG, HEIC or HEIF image into a one-page PDF using a
//! headless Chromium instance as the layout and print engine.
//!
//! ## Why a browser?
//!
//! Centering an arbitrarily sized image on a printable page, scaling it to
//! fit without distortion and emitting a standards-compliant PDF is exactly
//! what a print-to-PDF engine already does. The crate builds a tiny HTML page
//! around the image and lets Chromium lay it out and print it.
//!
//! ## Pipeline Overview
//!
//! ```text
//! upload (bytes + filename)
//!  │
//!  ├─ 1. Gate       extension allow-set, optional magic-byte check
//!  ├─ 2. Normalise  HEIC/HEIF → PNG (spawn_blocking); JPEG/PNG pass through
//!  ├─ 3. Page       base64 data URI embedded in a centred A4 page
//!  ├─ 4. Rasterise  fresh Chromium per request, bounded by a timeout
//!  └─ 5. Output     PDF bytes + `<base>.pdf` download name
//! ```
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use edgequake_img2pdf::{convert, ConversionConfig, SourceImage};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let bytes = std::fs::read("photo.jpg")?;
//!     let config = ConversionConfig::default();
//!     let output = convert(SourceImage::new("photo.jpg", bytes), &config).await?;
//!     std::fs::write(&output.filename, &output.pdf)?;
//!     Ok(())
//! }
//! ```
//!
//! ## Serving
//!
//! [`router`] returns an axum [`axum::Router`] for either transport variant
//! ([`ServeMode::Server`] stages uploads to disk and exposes `/health`,
//! [`ServeMode::Function`] stays in memory); [`serve`] binds and runs it.
//!
//! ## Feature Flags
//!
//! | Feature | Default | Description |
//! |---------|---------|-------------|
//! | `cli`   | on      | Enables the `img2pdf` binary (clap + anyhow + tracing-subscriber) |
//! | `heif`  | off     | HEIC/HEIF decoding through the system libheif |
//!
//! Without `heif`, HEIC/HEIF uploads are still accepted by the gate but fail
//! with a decode error.

// ── Modules ──────────────────────────────────────────────────────────────

pub mod config;
pub mod convert;
pub mod error;
pub mod output;
pub mod pipeline;
pub mod server;

// ── Re-exports ───────────────────────────────────────────────────────────

pub use config::{ConversionConfig, ConversionConfigBuilder, PaperSize, ServeMode, ServerConfig};
pub use convert::{convert, convert_input, convert_sync, convert_to_file};
pub use error::{ErrorBody, Img2PdfError};
pub use output::{ConversionOutput, ConversionStats};
pub use pipeline::gate::ImageFormat;
pub use pipeline::input::SourceImage;
pub use pipeline::rasterize::{ChromeRasterizer, PdfOptions, Rasterizer, SessionSlot};
pub use server::{router, serve, AppState};
