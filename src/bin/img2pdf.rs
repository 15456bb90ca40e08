//! CLI binary for edgequake-img2pdf.
//!
//! `img2pdf serve` runs the HTTP service; `img2pdf convert` runs one
//! conversion locally. Both are thin shims that map flags to
//! `ConversionConfig` / `ServerConfig`.

use anyhow::{Context, Result};
use clap::{Args, Parser, Subcommand};
use edgequake_img2pdf::output::format_bytes;
use edgequake_img2pdf::{
    convert_input, serve, ConversionConfig, PaperSize, ServeMode, ServerConfig,
};
use indicatif::{ProgressBar, ProgressStyle};
use std::io;
use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing_subscriber::EnvFilter;

// ── ANSI colour helpers (no extra deps) ──────────────────────────────────────

fn green(s: &str) -> String {
    format!("\x1b[32m{s}\x1b[0m")
}
fn dim(s: &str) -> String {
    format!("\x1b[2m{s}\x1b[0m")
}
fn bold(s: &str) -> String {
    format!("\x1b[1m{s}\x1b[0m")
}

const AFTER_HELP: &str = r#"EXAMPLES:
  # Run the HTTP service on :3000
  img2pdf serve

  # Stateless handler (no disk, no /health)
  img2pdf serve --mode function --port 8080

  # Convert one file locally
  img2pdf convert photo.heic -o photo.pdf

  # Convert from URL, print stats as JSON
  img2pdf convert https://example.com/cat.jpg --json

  # Upload through the service
  curl -F file=@photo.jpg http://localhost:3000/convert -o photo.pdf

ENVIRONMENT VARIABLES:
  PORT                   Listen port (when --port / IMG2PDF_PORT are unset)
  IMG2PDF_CHROME_PATH    Chromium/Chrome binary to launch
  RUST_LOG               Log filter, overrides -v / -q
"#;

/// Convert JPEG, PNG and HEIC images into single-page PDFs.
#[derive(Parser, Debug)]
#[command(
    name = "img2pdf",
    version,
    about = "Convert JPEG, PNG and HEIC images into single-page PDFs",
    long_about = "Convert JPEG, PNG, HEIC and HEIF images into single-page A4 PDFs using \
headless Chromium. Runs as an HTTP service (server or function mode) or converts a single \
local file or URL.",
    arg_required_else_help = true,
    color = clap::ColorChoice::Auto,
    after_long_help = AFTER_HELP
)]
struct Cli {
    #[command(subcommand)]
    command: Command,

    /// Enable DEBUG-level tracing logs.
    #[arg(short, long, global = true, env = "IMG2PDF_VERBOSE")]
    verbose: bool,

    /// Suppress all output except errors.
    #[arg(short, long, global = true, env = "IMG2PDF_QUIET")]
    quiet: bool,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Run the HTTP conversion service.
    Serve(ServeArgs),
    /// Convert one local file or URL.
    Convert(ConvertArgs),
}

/// Pipeline flags shared by both subcommands.
#[derive(Args, Debug)]
struct PipelineArgs {
    /// Output page size.
    #[arg(long, env = "IMG2PDF_PAPER", value_enum, default_value = "a4")]
    paper: PaperArg,

    /// Seconds allowed for browser launch, page load and PDF export.
    #[arg(long, env = "IMG2PDF_RENDER_TIMEOUT", default_value_t = 60)]
    render_timeout: u64,

    /// Chromium/Chrome binary. Searched for in the usual places if unset.
    #[arg(long, env = "IMG2PDF_CHROME_PATH")]
    chrome_path: Option<PathBuf>,

    /// Launch Chromium with its sandbox enabled.
    #[arg(long, env = "IMG2PDF_SANDBOX")]
    sandbox: bool,

    /// Trust the file extension without checking the content's magic bytes.
    #[arg(long, env = "IMG2PDF_NO_VERIFY_SIGNATURES")]
    no_verify_signatures: bool,
}

#[derive(Args, Debug)]
struct ServeArgs {
    /// Bind host.
    #[arg(long, env = "IMG2PDF_HOST", default_value = "0.0.0.0")]
    host: String,

    /// Bind port. Falls back to $PORT, then 3000.
    #[arg(long, env = "IMG2PDF_PORT")]
    port: Option<u16>,

    /// Transport variant.
    #[arg(long, env = "IMG2PDF_MODE", value_enum, default_value = "server")]
    mode: ModeArg,

    /// Parent directory for staged uploads (server mode). Default: OS temp dir.
    #[arg(long, env = "IMG2PDF_UPLOAD_DIR")]
    upload_dir: Option<PathBuf>,

    /// Maximum upload size in MiB.
    #[arg(long, env = "IMG2PDF_MAX_UPLOAD_MB", default_value_t = 30,
          value_parser = clap::value_parser!(u64).range(1..=1024))]
    max_upload_mb: u64,

    #[command(flatten)]
    pipeline: PipelineArgs,
}

#[derive(Args, Debug)]
struct ConvertArgs {
    /// Local image path or HTTP/HTTPS URL.
    input: String,

    /// Write the PDF here instead of `<base>.pdf` in the current directory.
    #[arg(short, long, env = "IMG2PDF_OUTPUT")]
    output: Option<PathBuf>,

    /// Print conversion details as JSON on stdout.
    #[arg(long, env = "IMG2PDF_JSON")]
    json: bool,

    /// HTTP download timeout in seconds.
    #[arg(long, env = "IMG2PDF_DOWNLOAD_TIMEOUT", default_value_t = 120)]
    download_timeout: u64,

    #[command(flatten)]
    pipeline: PipelineArgs,
}

#[derive(clap::ValueEnum, Clone, Copy, Debug)]
enum PaperArg {
    A4,
    Letter,
}

impl From<PaperArg> for PaperSize {
    fn from(v: PaperArg) -> Self {
        match v {
            PaperArg::A4 => PaperSize::A4,
            PaperArg::Letter => PaperSize::Letter,
        }
    }
}

#[derive(clap::ValueEnum, Clone, Copy, Debug)]
enum ModeArg {
    Server,
    Function,
}

impl From<ModeArg> for ServeMode {
    fn from(v: ModeArg) -> Self {
        match v {
            ModeArg::Server => ServeMode::Server,
            ModeArg::Function => ServeMode::Function,
        }
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // ── Logging setup ────────────────────────────────────────────────────
    // A one-shot conversion shows a spinner, so library INFO logs are muted
    // unless asked for. The service always logs at INFO.
    let filter = if cli.verbose {
        "debug"
    } else if cli.quiet {
        "error"
    } else {
        match &cli.command {
            Command::Serve(_) => "info,tower_http=info",
            Command::Convert(_) => "warn",
        }
    };
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(filter)),
        )
        .with_writer(io::stderr)
        .init();

    match cli.command {
        Command::Serve(args) => run_serve(args).await,
        Command::Convert(args) => run_convert(args, cli.quiet).await,
    }
}

async fn run_serve(args: ServeArgs) -> Result<()> {
    let port = match args.port {
        Some(p) => p,
        None => port_from_env()?,
    };
    let max_upload_bytes = usize::try_from(args.max_upload_mb * 1024 * 1024)
        .context("Upload limit does not fit in memory on this platform")?;

    let config = pipeline_builder(&args.pipeline)
        .max_upload_bytes(max_upload_bytes)
        .build()
        .context("Invalid configuration")?;

    let server = ServerConfig {
        host: args.host,
        port,
        mode: args.mode.into(),
        upload_dir: args.upload_dir,
    };

    serve(server, config).await.context("Server failed")?;
    Ok(())
}

async fn run_convert(args: ConvertArgs, quiet: bool) -> Result<()> {
    let config = pipeline_builder(&args.pipeline)
        .download_timeout_secs(args.download_timeout)
        .build()
        .context("Invalid configuration")?;

    let spinner = (!quiet && !args.json).then(|| {
        let bar = ProgressBar::new_spinner();
        bar.set_style(
            ProgressStyle::with_template("{spinner:.cyan} {prefix:.bold}  {msg}")
                .unwrap_or_else(|_| ProgressStyle::default_spinner())
                .tick_strings(&["⠋", "⠙", "⠹", "⠸", "⠼", "⠴", "⠦", "⠧", "⠇", "⠏", "⠿"]),
        );
        bar.set_prefix("Converting");
        bar.set_message(args.input.clone());
        bar.enable_steady_tick(Duration::from_millis(80));
        bar
    });

    let result = convert_input(&args.input, &config).await;
    if let Some(bar) = &spinner {
        bar.finish_and_clear();
    }
    let output = result.context("Conversion failed")?;

    let path = args
        .output
        .unwrap_or_else(|| PathBuf::from(&output.filename));
    edgequake_img2pdf::convert::write_pdf(&path, &output.pdf)
        .await
        .with_context(|| format!("Failed to write {}", path.display()))?;

    if args.json {
        let json = serde_json::to_string_pretty(&output).context("Failed to serialise output")?;
        println!("{json}");
    } else if !quiet {
        print_summary(&path, &output);
    }
    Ok(())
}

fn print_summary(path: &Path, output: &edgequake_img2pdf::ConversionOutput) {
    eprintln!(
        "{}  {} {}  →  {}",
        green("✔"),
        output.format,
        dim(&format_bytes(output.stats.input_bytes)),
        bold(&path.display().to_string()),
    );
    eprintln!(
        "   {} PDF  —  {}ms total ({}ms in browser)",
        dim(&format_bytes(output.stats.output_bytes)),
        output.stats.total_duration_ms,
        output.stats.render_duration_ms,
    );
}

/// Map shared pipeline flags onto a builder.
fn pipeline_builder(args: &PipelineArgs) -> edgequake_img2pdf::ConversionConfigBuilder {
    let mut builder = ConversionConfig::builder()
        .paper(args.paper.into())
        .render_timeout_secs(args.render_timeout)
        .sandbox(args.sandbox)
        .verify_signatures(!args.no_verify_signatures);
    if let Some(ref path) = args.chrome_path {
        builder = builder.chrome_path(path);
    }
    builder
}

/// `$PORT` as set by most hosting platforms, else 3000.
fn port_from_env() -> Result<u16> {
    match std::env::var("PORT") {
        Ok(v) => v
            .trim()
            .parse()
            .with_context(|| format!("Invalid PORT value: {v:?}")),
        Err(_) => Ok(ServerConfig::default().port),
    }
}
