//! Pipeline stages for image-to-PDF conversion.
//!
//! Each submodule implements exactly one transformation step, so each can be
//! tested on its own and the rendering backend can be swapped without
//! touching the others.
//!
//! ## Data Flow
//!
//! ```text
//! gate ──▶ decode/encode ──▶ page ──▶ rasterize
//! (ext)     (data URI)       (HTML)    (Chromium → PDF)
//! ```
//!
//! 1. [`gate`]      allow-list the declared extension, check magic bytes
//! 2. [`decode`]    HEIC/HEIF → RGBA via libheif (CPU-bound, blocking)
//! 3. [`encode`]    base64 data URI; PNG re-encode for transcoded inputs
//! 4. [`page`]      fixed one-image HTML document
//! 5. [`rasterize`] headless Chromium prints the page to an A4 PDF, the
//!    only stage that owns an external process
//! 6. [`input`]     CLI only: resolve a local path or URL into bytes

pub mod decode;
pub mod encode;
pub mod gate;
pub mod input;
pub mod page;
pub mod rasterize;
