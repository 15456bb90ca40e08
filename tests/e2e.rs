//! End-to-end tests against a real headless Chromium.
//!
//! They launch a browser per conversion and are gated behind the
//! `E2E_ENABLED` environment variable so they do not run in CI unless
//! explicitly requested. Set `IMG2PDF_CHROME_PATH` if Chromium is not on a
//! standard path.
//!
//! Run with:
//!   E2E_ENABLED=1 cargo test --test e2e -- --nocapture
//!
//! HEIC coverage additionally needs `--features heif` and a sample file at
//! `test_cases/sample.heic`.

use edgequake_img2pdf::{
    convert, router, AppState, ConversionConfig, PaperSize, ServeMode, SourceImage,
};
use std::path::PathBuf;

// ── Test helpers ─────────────────────────────────────────────────────────────

fn test_cases_dir() -> PathBuf {
    PathBuf::from(env!("CARGO_MANIFEST_DIR")).join("test_cases")
}

/// Skip this test if E2E_ENABLED is not set.
macro_rules! e2e_skip_unless_enabled {
    () => {{
        if std::env::var("E2E_ENABLED").is_err() {
            println!("SKIP — set E2E_ENABLED=1 to run e2e tests");
            return;
        }
    }};
}

fn config(paper: PaperSize) -> ConversionConfig {
    let mut builder = ConversionConfig::builder()
        .paper(paper)
        .render_timeout_secs(90);
    if let Ok(path) = std::env::var("IMG2PDF_CHROME_PATH") {
        builder = builder.chrome_path(path);
    }
    builder.build().expect("valid config")
}

fn jpeg(width: u32, height: u32) -> Vec<u8> {
    let img = image::RgbImage::from_fn(width, height, |x, y| {
        image::Rgb([(x % 256) as u8, (y % 256) as u8, 128])
    });
    let mut buf = Vec::new();
    img.write_to(&mut std::io::Cursor::new(&mut buf), image::ImageFormat::Jpeg)
        .unwrap();
    buf
}

fn png(width: u32, height: u32) -> Vec<u8> {
    let img = image::RgbaImage::from_pixel(width, height, image::Rgba([20, 160, 90, 255]));
    let mut buf = Vec::new();
    img.write_to(&mut std::io::Cursor::new(&mut buf), image::ImageFormat::Png)
        .unwrap();
    buf
}

/// Count `/Type /Page` objects (not `/Type /Pages`).
fn page_count(pdf: &[u8]) -> usize {
    let needle = b"/Type /Page";
    pdf.windows(needle.len() + 1)
        .filter(|w| &w[..needle.len()] == needle && w[needle.len()] != b's')
        .count()
}

/// First `/MediaBox [...]` entry, as text.
fn media_box(pdf: &[u8]) -> Option<String> {
    let text = String::from_utf8_lossy(pdf);
    let start = text.find("/MediaBox")?;
    let end = start + text[start..].find(']')?;
    Some(text[start..=end].to_string())
}

/// Assert the bytes look like a single-page PDF.
fn assert_single_page_pdf(pdf: &[u8], context: &str) {
    assert!(pdf.starts_with(b"%PDF-"), "[{context}] not a PDF");
    assert_eq!(page_count(pdf), 1, "[{context}] expected exactly one page");
    println!("[{context}] ✓  {} bytes, 1 page", pdf.len());
}

// ── Library ──────────────────────────────────────────────────────────────────

#[tokio::test]
async fn test_jpeg_to_single_page_a4() {
    e2e_skip_unless_enabled!();

    let out = convert(SourceImage::new("photo.jpg", jpeg(640, 480)), &config(PaperSize::A4))
        .await
        .expect("conversion should succeed");

    assert_eq!(out.filename, "photo.pdf");
    assert_single_page_pdf(&out.pdf, "jpeg");
    let mbox = media_box(&out.pdf).expect("MediaBox");
    assert!(mbox.contains("595") || mbox.contains("594.9"), "A4 width: {mbox}");
}

#[tokio::test]
async fn test_png_letter_paper() {
    e2e_skip_unless_enabled!();

    let out = convert(SourceImage::new("chart.png", png(300, 300)), &config(PaperSize::Letter))
        .await
        .expect("conversion should succeed");

    assert_single_page_pdf(&out.pdf, "png/letter");
    let mbox = media_box(&out.pdf).expect("MediaBox");
    assert!(mbox.contains("612"), "Letter width: {mbox}");
}

#[tokio::test]
async fn test_oversized_image_still_fits_one_page() {
    e2e_skip_unless_enabled!();

    let out = convert(SourceImage::new("tall.png", png(400, 6000)), &config(PaperSize::A4))
        .await
        .expect("conversion should succeed");
    assert_single_page_pdf(&out.pdf, "tall png");

    let out = convert(SourceImage::new("wide.jpg", jpeg(5000, 300)), &config(PaperSize::A4))
        .await
        .expect("conversion should succeed");
    assert_single_page_pdf(&out.pdf, "wide jpeg");
}

#[tokio::test]
async fn test_same_input_same_layout() {
    e2e_skip_unless_enabled!();

    let bytes = jpeg(200, 100);
    let cfg = config(PaperSize::A4);
    let a = convert(SourceImage::new("a.jpg", bytes.clone()), &cfg).await.unwrap();
    let b = convert(SourceImage::new("a.jpg", bytes), &cfg).await.unwrap();

    assert_eq!(page_count(&a.pdf), page_count(&b.pdf));
    assert_eq!(media_box(&a.pdf), media_box(&b.pdf));
}

#[tokio::test]
async fn test_heic_sample() {
    e2e_skip_unless_enabled!();
    if !cfg!(feature = "heif") {
        println!("SKIP — build with --features heif");
        return;
    }
    let path = test_cases_dir().join("sample.heic");
    if !path.exists() {
        println!("SKIP — test file not found: {}", path.display());
        return;
    }

    let bytes = std::fs::read(&path).unwrap();
    let out = convert(SourceImage::new("sample.heic", bytes), &config(PaperSize::A4))
        .await
        .expect("HEIC conversion should succeed");
    assert_eq!(out.filename, "sample.pdf");
    assert_single_page_pdf(&out.pdf, "heic");
}

// ── HTTP with a real browser ─────────────────────────────────────────────────

#[tokio::test]
async fn test_server_mode_round_trip() {
    use axum::body::Body;
    use axum::http::{header, Request, StatusCode};
    use tower::ServiceExt;

    e2e_skip_unless_enabled!();

    let parent = tempfile::tempdir().unwrap();
    let state = AppState::new(config(PaperSize::A4), ServeMode::Server, Some(parent.path()))
        .unwrap();
    let app = router(state.clone());

    let boundary = "e2e-boundary";
    let mut body = format!(
        "--{boundary}\r\nContent-Disposition: form-data; name=\"file\"; filename=\"Beach.JPEG\"\r\n\
         Content-Type: image/jpeg\r\n\r\n"
    )
    .into_bytes();
    body.extend_from_slice(&jpeg(320, 240));
    body.extend_from_slice(format!("\r\n--{boundary}--\r\n").as_bytes());

    let req = Request::post("/convert")
        .header(
            header::CONTENT_TYPE,
            format!("multipart/form-data; boundary={boundary}"),
        )
        .body(Body::from(body))
        .unwrap();
    let resp = app.oneshot(req).await.unwrap();

    assert_eq!(resp.status(), StatusCode::OK);
    assert_eq!(
        resp.headers()[header::CONTENT_DISPOSITION],
        "attachment; filename=\"Beach.pdf\""
    );
    let pdf = axum::body::to_bytes(resp.into_body(), usize::MAX)
        .await
        .unwrap();
    assert_single_page_pdf(&pdf, "http");

    let staged = std::fs::read_dir(state.uploads_path().unwrap())
        .unwrap()
        .count();
    assert_eq!(staged, 0, "uploads directory should be empty");
}
