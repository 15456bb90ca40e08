//! HTTP transport.
//!
//! Two variants share one router shape and one pipeline:
//!
//! ```text
//! Server mode                         Function mode
//! ───────────                         ─────────────
//! POST /convert                       POST /convert
//!  ├─ read multipart (memory)          ├─ read multipart (memory)
//!  ├─ format gate                      └─ convert() ─► PDF response
//!  ├─ stage to uploads/<uuid><ext>
//!  ├─ convert_to_file() ─► out-*/<uuid>.pdf
//!  └─ read PDF ─► response, both files removed
//! GET /health ─► {"ok": true}
//! ```
//!
//! Any other method on `/convert` is answered with a JSON 405.

pub mod handlers;
pub mod staging;
pub mod upload;

use crate::config::{ConversionConfig, ServeMode, ServerConfig};
use crate::error::Img2PdfError;
use axum::{
    extract::DefaultBodyLimit,
    http::{header, Method},
    routing::{get, post},
    Router,
};
use staging::UploadDir;
use std::path::Path;
use std::sync::Arc;
use tower_http::cors::{AllowOrigin, CorsLayer};
use tower_http::trace::TraceLayer;
use tracing::info;

/// Slack on top of the file limit for multipart boundaries and headers.
const MULTIPART_OVERHEAD: usize = 64 * 1024;

/// Shared handler state.
#[derive(Debug, Clone)]
pub struct AppState {
    pub config: Arc<ConversionConfig>,
    pub mode: ServeMode,
    uploads: Option<Arc<UploadDir>>,
}

impl AppState {
    /// State for `mode`. Server mode creates its uploads directory under
    /// `upload_parent` (or the OS temp dir); function mode touches no disk.
    pub fn new(
        config: ConversionConfig,
        mode: ServeMode,
        upload_parent: Option<&Path>,
    ) -> Result<Self, Img2PdfError> {
        let uploads = match mode {
            ServeMode::Server => Some(Arc::new(UploadDir::create(upload_parent)?)),
            ServeMode::Function => None,
        };
        Ok(Self {
            config: Arc::new(config),
            mode,
            uploads,
        })
    }

    /// Where server mode stages uploads. None in function mode.
    pub fn uploads_path(&self) -> Option<&Path> {
        self.uploads.as_deref().map(UploadDir::path)
    }

    pub(crate) fn uploads(&self) -> Result<&UploadDir, Img2PdfError> {
        self.uploads
            .as_deref()
            .ok_or_else(|| Img2PdfError::Internal("uploads directory not configured".into()))
    }
}

/// Build the router for `state.mode`.
pub fn router(state: AppState) -> Router {
    let body_limit = state.config.max_upload_bytes.saturating_add(MULTIPART_OVERHEAD);

    let convert_route = match state.mode {
        ServeMode::Server => post(handlers::convert_staged),
        ServeMode::Function => post(handlers::convert_in_memory),
    }
    .fallback(handlers::method_not_allowed);

    let mut app = Router::new().route("/convert", convert_route);
    if state.mode == ServeMode::Server {
        app = app.route("/health", get(handlers::health));
    }

    let cors = CorsLayer::new()
        .allow_origin(AllowOrigin::mirror_request())
        .allow_methods([Method::POST, Method::GET, Method::OPTIONS])
        .allow_headers([header::CONTENT_TYPE]);

    app.layer(DefaultBodyLimit::max(body_limit))
        .layer(cors)
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

/// Bind and serve until Ctrl-C / SIGTERM.
///
/// The uploads directory lives as long as the router, so a clean shutdown
/// removes it along with anything still staged.
pub async fn serve(server: ServerConfig, config: ConversionConfig) -> Result<(), Img2PdfError> {
    let state = AppState::new(config, server.mode, server.upload_dir.as_deref())?;
    if let Some(dir) = state.uploads_path() {
        info!("Staging uploads in {}", dir.display());
    }
    let mode = state.mode;
    let app = router(state);

    let addr = server.bind_addr();
    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .map_err(|e| Img2PdfError::Internal(format!("Failed to bind {addr}: {e}")))?;

    info!("img2pdf listening on http://{addr} ({mode:?} mode)");
    info!("  POST /convert");
    if mode == ServeMode::Server {
        info!("  GET  /health");
    }

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .map_err(|e| Img2PdfError::Internal(format!("Server error: {e}")))?;

    info!("Server stopped");
    Ok(())
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::warn!("Failed to listen for Ctrl-C: {e}");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut s) => {
                s.recv().await;
            }
            Err(_) => std::future::pending::<()>().await,
        }
    };
    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }
    info!("Shutdown signal received");
}
