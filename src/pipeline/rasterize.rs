//! PDF rasterisation: load the HTML page in headless Chromium and print it.
//!
//! ## Threading
//!
//! `headless_chrome` drives the DevTools protocol with blocking calls.
//! [`rasterize_html`] moves the whole browser session onto Tokio's blocking
//! pool so worker threads keep serving other requests while Chromium works.
//!
//! ## Lifecycle
//!
//! One browser per conversion. As soon as it is up, the rasterizer parks it
//! in the [`SessionSlot`] it was handed. [`rasterize_html`] owns that slot
//! and empties it before returning on every path, timeout included.
//! Emptying the slot drops the `Browser`, which kills the Chromium process.
//!
//! ## Timeout
//!
//! The browser's own idle timeout and the tab's default timeout are set to
//! the configured render timeout, and the blocking task as a whole is raced
//! against the same deadline. When the deadline wins, the slot is released
//! right away; the detached worker then fails on its dead tab and exits. A
//! browser that is still starting at that point is closed the moment it
//! would have been parked.

use crate::config::{ConversionConfig, PaperSize};
use crate::error::Img2PdfError;
use headless_chrome::protocol::cdp::Page;
use headless_chrome::types::PrintToPdfOptions;
use headless_chrome::{Browser, LaunchOptions};
use std::path::PathBuf;
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::{Duration, Instant};
use tracing::{debug, info, warn};

/// Resolves to `true` once the embedded image has been decoded, `false` if
/// it cannot be. This is the "network idle" point for an inlined image.
const WAIT_FOR_IMAGE_JS: &str = r#"(async () => {
  const img = document.querySelector('img');
  if (!img) return false;
  try { await img.decode(); return img.naturalWidth > 0; } catch (_) { return false; }
})()"#;

/// Print settings handed to a [`Rasterizer`].
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PdfOptions {
    pub paper: PaperSize,
    pub print_background: bool,
    pub timeout: Duration,
}

impl PdfOptions {
    pub fn from_config(config: &ConversionConfig) -> Self {
        Self {
            paper: config.paper,
            print_background: config.print_background,
            timeout: Duration::from_secs(config.render_timeout_secs),
        }
    }
}

impl Default for PdfOptions {
    fn default() -> Self {
        Self::from_config(&ConversionConfig::default())
    }
}

/// Turns a self-contained HTML document into PDF bytes.
///
/// Implementations are blocking. Whatever external resource they acquire
/// (a browser process) must be parked in `session` with
/// [`SessionSlot::hold`], so the caller can release it even while the
/// implementation is still running.
pub trait Rasterizer: Send + Sync {
    fn rasterize(
        &self,
        html: &str,
        options: &PdfOptions,
        session: &SessionSlot,
    ) -> Result<Vec<u8>, Img2PdfError>;
}

// ── Session slot ─────────────────────────────────────────────────────────

/// Shared owner of the resource a [`Rasterizer`] holds while it works.
///
/// Cloning shares the slot. [`release`](Self::release) drops the held value
/// and closes the slot: anything handed to [`hold`](Self::hold) afterwards
/// is dropped immediately.
#[derive(Clone, Default)]
pub struct SessionSlot {
    inner: Arc<Mutex<SlotState>>,
}

#[derive(Default)]
struct SlotState {
    held: Option<Box<dyn Send>>,
    released: bool,
}

impl std::fmt::Debug for SessionSlot {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let state = self.lock();
        f.debug_struct("SessionSlot")
            .field("held", &state.held.is_some())
            .field("released", &state.released)
            .finish()
    }
}

impl SessionSlot {
    pub fn new() -> Self {
        Self::default()
    }

    /// Park `session` in the slot.
    ///
    /// Fails with [`Img2PdfError::RenderFailed`] (after dropping `session`)
    /// if the slot was already released.
    pub fn hold<T: Send + 'static>(&self, session: T) -> Result<(), Img2PdfError> {
        let mut state = self.lock();
        if state.released {
            drop(state);
            drop(session);
            return Err(Img2PdfError::RenderFailed {
                detail: "render was cancelled before the browser was ready".into(),
            });
        }
        state.held = Some(Box::new(session));
        Ok(())
    }

    /// Drop whatever is held and refuse further sessions.
    pub fn release(&self) {
        let held = {
            let mut state = self.lock();
            state.released = true;
            state.held.take()
        };
        // Dropped outside the lock: closing a browser can take a while.
        drop(held);
    }

    pub fn is_holding(&self) -> bool {
        self.lock().held.is_some()
    }

    fn lock(&self) -> MutexGuard<'_, SlotState> {
        // A panic while holding the lock leaves the state itself consistent.
        self.inner.lock().unwrap_or_else(|e| e.into_inner())
    }
}

/// Run `rasterizer` on the blocking pool, bounded by `options.timeout`.
///
/// The session slot is released before this returns, whatever the outcome.
pub async fn rasterize_html(
    rasterizer: Arc<dyn Rasterizer>,
    html: String,
    options: PdfOptions,
) -> Result<Vec<u8>, Img2PdfError> {
    let deadline = options.timeout;
    let slot = SessionSlot::new();
    let worker_slot = slot.clone();
    let task = tokio::task::spawn_blocking(move || {
        rasterizer.rasterize(&html, &options, &worker_slot)
    });

    let outcome = tokio::time::timeout(deadline, task).await;
    slot.release();

    let pdf = match outcome {
        Err(_) => {
            warn!("Render exceeded {}ms, browser closed", deadline.as_millis());
            return Err(Img2PdfError::RenderTimeout {
                secs: whole_secs_rounded_up(deadline),
            });
        }
        Ok(joined) => joined
            .map_err(|e| Img2PdfError::Internal(format!("Render task panicked: {e}")))??,
    };

    if !pdf.starts_with(b"%PDF-") {
        return Err(Img2PdfError::RenderFailed {
            detail: "renderer output is not a PDF document".into(),
        });
    }
    Ok(pdf)
}

fn whole_secs_rounded_up(d: Duration) -> u64 {
    d.as_secs() + u64::from(d.subsec_nanos() > 0)
}

// ── Chromium ─────────────────────────────────────────────────────────────

/// Production rasterizer backed by a fresh headless Chromium per call.
#[derive(Debug, Clone, Default)]
pub struct ChromeRasterizer {
    chrome_path: Option<PathBuf>,
    sandbox: bool,
}

impl ChromeRasterizer {
    pub fn new(chrome_path: Option<PathBuf>, sandbox: bool) -> Self {
        Self {
            chrome_path,
            sandbox,
        }
    }

    pub fn from_config(config: &ConversionConfig) -> Self {
        Self::new(config.chrome_path.clone(), config.sandbox)
    }

    fn launch(&self, timeout: Duration) -> Result<BrowserSession, Img2PdfError> {
        let launch_failed = |detail: String| Img2PdfError::LaunchFailed { detail };

        let options = LaunchOptions::default_builder()
            .headless(true)
            .sandbox(self.sandbox)
            .path(self.chrome_path.clone())
            .idle_browser_timeout(timeout)
            .build()
            .map_err(|e| launch_failed(e.to_string()))?;

        let started = Instant::now();
        let browser = Browser::new(options).map_err(|e| launch_failed(format!("{e:#}")))?;
        debug!("Launched headless browser in {}ms", started.elapsed().as_millis());

        Ok(BrowserSession {
            browser: Some(browser),
            started,
        })
    }
}

impl Rasterizer for ChromeRasterizer {
    fn rasterize(
        &self,
        html: &str,
        options: &PdfOptions,
        slot: &SessionSlot,
    ) -> Result<Vec<u8>, Img2PdfError> {
        let session = self.launch(options.timeout)?;
        let tab = session
            .browser()?
            .new_tab()
            .map_err(|e| Img2PdfError::LaunchFailed {
                detail: format!("could not open a tab: {e:#}"),
            })?;
        tab.set_default_timeout(options.timeout);
        // From here on the tab is all we need; the browser lives in the slot.
        let started = session.started;
        slot.hold(session)?;

        let frame_id = tab
            .call_method(Page::GetFrameTree(None))
            .map_err(render_failed)?
            .frame_tree
            .frame
            .id;
        tab.call_method(Page::SetDocumentContent {
            frame_id,
            html: html.to_string(),
        })
        .map_err(render_failed)?;

        let loaded = tab
            .evaluate(WAIT_FOR_IMAGE_JS, true)
            .map_err(render_failed)?;
        if loaded.value != Some(serde_json::Value::Bool(true)) {
            return Err(Img2PdfError::RenderFailed {
                detail: "the browser could not display the embedded image".into(),
            });
        }

        let (width, height) = options.paper.inches();
        let pdf = tab
            .print_to_pdf(Some(PrintToPdfOptions {
                landscape: Some(false),
                print_background: Some(options.print_background),
                paper_width: Some(width),
                paper_height: Some(height),
                margin_top: Some(0.0),
                margin_bottom: Some(0.0),
                margin_left: Some(0.0),
                margin_right: Some(0.0),
                page_ranges: Some("1".into()),
                ..Default::default()
            }))
            .map_err(render_failed)?;

        info!(
            "Rendered {:?} PDF ({} bytes) in {}ms",
            options.paper,
            pdf.len(),
            started.elapsed().as_millis()
        );
        Ok(pdf)
    }
}

/// `headless_chrome` reports failures as `anyhow::Error`; `{:#}` keeps the
/// whole cause chain.
fn render_failed(e: impl std::fmt::Display) -> Img2PdfError {
    Img2PdfError::RenderFailed {
        detail: format!("{e:#}"),
    }
}

/// Scoped ownership of one Chromium process.
///
/// `headless_chrome` kills the child process when the last handle to its
/// `Browser` is dropped; `Drop` here performs that drop explicitly. Tabs do
/// not keep the process alive.
struct BrowserSession {
    browser: Option<Browser>,
    started: Instant,
}

impl BrowserSession {
    fn browser(&self) -> Result<&Browser, Img2PdfError> {
        self.browser
            .as_ref()
            .ok_or_else(|| Img2PdfError::Internal("browser session already closed".into()))
    }
}

impl Drop for BrowserSession {
    fn drop(&mut self) {
        if let Some(browser) = self.browser.take() {
            debug!(
                "Closing headless browser after {}ms",
                self.started.elapsed().as_millis()
            );
            drop(browser);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicBool, Ordering};

    struct StaticPdf(&'static [u8]);

    impl Rasterizer for StaticPdf {
        fn rasterize(
            &self,
            _html: &str,
            _options: &PdfOptions,
            _session: &SessionSlot,
        ) -> Result<Vec<u8>, Img2PdfError> {
            Ok(self.0.to_vec())
        }
    }

    /// Flips its flag when dropped, like a browser process exiting.
    struct FakeBrowser(Arc<AtomicBool>);

    impl Drop for FakeBrowser {
        fn drop(&mut self) {
            self.0.store(true, Ordering::SeqCst);
        }
    }

    /// Parks a [`FakeBrowser`] in the slot, then sleeps.
    struct Sleeper {
        delay: Duration,
        closed: Arc<AtomicBool>,
    }

    impl Sleeper {
        fn new(delay: Duration) -> Self {
            Self {
                delay,
                closed: Arc::new(AtomicBool::new(false)),
            }
        }
    }

    impl Rasterizer for Sleeper {
        fn rasterize(
            &self,
            _html: &str,
            _options: &PdfOptions,
            session: &SessionSlot,
        ) -> Result<Vec<u8>, Img2PdfError> {
            session.hold(FakeBrowser(self.closed.clone()))?;
            std::thread::sleep(self.delay);
            Ok(b"%PDF-1.7".to_vec())
        }
    }

    fn opts(timeout: Duration) -> PdfOptions {
        PdfOptions {
            timeout,
            ..PdfOptions::default()
        }
    }

    #[tokio::test]
    async fn returns_pdf_bytes() {
        let pdf = rasterize_html(
            Arc::new(StaticPdf(b"%PDF-1.4\n%%EOF")),
            "<html></html>".into(),
            PdfOptions::default(),
        )
        .await
        .unwrap();
        assert!(pdf.starts_with(b"%PDF-"));
    }

    #[tokio::test]
    async fn non_pdf_output_is_a_render_error() {
        let err = rasterize_html(
            Arc::new(StaticPdf(b"<html>oops</html>")),
            String::new(),
            PdfOptions::default(),
        )
        .await
        .unwrap_err();
        assert!(matches!(err, Img2PdfError::RenderFailed { .. }));
    }

    #[tokio::test]
    async fn slow_renderer_times_out() {
        let err = rasterize_html(
            Arc::new(Sleeper::new(Duration::from_millis(1500))),
            String::new(),
            opts(Duration::from_millis(100)),
        )
        .await
        .unwrap_err();
        // Sub-second deadlines never report "0s".
        assert!(matches!(err, Img2PdfError::RenderTimeout { secs: 1 }), "got {err:?}");
        assert!(err.to_string().contains("after 1s"), "got {err}");
    }

    #[tokio::test]
    async fn timeout_closes_the_browser_before_returning() {
        let sleeper = Arc::new(Sleeper::new(Duration::from_secs(3)));
        let closed = sleeper.closed.clone();

        let started = Instant::now();
        let err = rasterize_html(sleeper, String::new(), opts(Duration::from_millis(200)))
            .await
            .unwrap_err();

        assert!(matches!(err, Img2PdfError::RenderTimeout { .. }), "got {err:?}");
        assert!(
            closed.load(Ordering::SeqCst),
            "browser must be closed when the timeout is reported"
        );
        assert!(started.elapsed() < Duration::from_secs(2));
    }

    #[tokio::test]
    async fn browser_is_closed_after_success() {
        let sleeper = Arc::new(Sleeper::new(Duration::ZERO));
        let closed = sleeper.closed.clone();
        rasterize_html(sleeper, String::new(), PdfOptions::default())
            .await
            .unwrap();
        assert!(closed.load(Ordering::SeqCst));
    }

    #[test]
    fn released_slot_rejects_late_sessions() {
        let slot = SessionSlot::new();
        let closed = Arc::new(AtomicBool::new(false));
        slot.release();

        let err = slot.hold(FakeBrowser(closed.clone())).unwrap_err();
        assert!(matches!(err, Img2PdfError::RenderFailed { .. }));
        assert!(closed.load(Ordering::SeqCst), "late session must be dropped");
        assert!(!slot.is_holding());
    }

    #[test]
    fn release_drops_the_held_session() {
        let slot = SessionSlot::new();
        let closed = Arc::new(AtomicBool::new(false));
        slot.clone().hold(FakeBrowser(closed.clone())).unwrap();
        assert!(slot.is_holding());
        assert!(!closed.load(Ordering::SeqCst));

        slot.release();
        assert!(closed.load(Ordering::SeqCst));
        assert!(!slot.is_holding());
    }

    #[test]
    fn timeout_seconds_round_up() {
        assert_eq!(whole_secs_rounded_up(Duration::from_millis(100)), 1);
        assert_eq!(whole_secs_rounded_up(Duration::from_secs(60)), 60);
        assert_eq!(whole_secs_rounded_up(Duration::from_millis(60_001)), 61);
    }

    #[tokio::test]
    async fn missing_browser_binary_is_a_launch_error() {
        let chrome = ChromeRasterizer::new(Some("/definitely/not/chromium".into()), false);
        let err = rasterize_html(
            Arc::new(chrome),
            "<html></html>".into(),
            opts(Duration::from_secs(10)),
        )
        .await
        .unwrap_err();
        assert!(matches!(err, Img2PdfError::LaunchFailed { .. }), "got {err:?}");
    }

    #[test]
    fn options_follow_config() {
        let config = ConversionConfig::builder()
            .paper(PaperSize::Letter)
            .print_background(false)
            .render_timeout_secs(7)
            .build()
            .unwrap();
        let o = PdfOptions::from_config(&config);
        assert_eq!(o.paper, PaperSize::Letter);
        assert!(!o.print_background);
        assert_eq!(o.timeout, Duration::from_secs(7));
    }
}
