//! CLI binary for edgequake-paste2md.
//!
//! A thin shim over the library crate that maps CLI flags
//! to `IngestConfig` and prints results.

use anyhow::{Context, Result};
use clap::Parser;
use edgequake_paste2md::ingest::write_atomic;
use edgequake_paste2md::pipeline::input::{load_payload, load_payload_json};
use edgequake_paste2md::{
    IngestConfig, IngestProgressCallback, IngestState, IngestStats, Ingestor, PastePayload,
    PayloadFiles, ProgressCallback,
};
use indicatif::{ProgressBar, ProgressStyle};
use std::io::{self, Write};
use std::path::PathBuf;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tracing_subscriber::EnvFilter;

// ── ANSI colour helpers (no extra deps) ──────────────────────────────────────

fn green(s: &str) -> String {
    format!("\x1b[32m{s}\x1b[0m")
}
fn red(s: &str) -> String {
    format!("\x1b[31m{s}\x1b[0m")
}
fn dim(s: &str) -> String {
    format!("\x1b[2m{s}\x1b[0m")
}
fn bold(s: &str) -> String {
    format!("\x1b[1m{s}\x1b[0m")
}
fn cyan(s: &str) -> String {
    format!("\x1b[36m{s}\x1b[0m")
}

const TICKS: &[&str] = &["⠋", "⠙", "⠹", "⠸", "⠼", "⠴", "⠦", "⠧", "⠇", "⠏", "⠿"];

// ── CLI progress callback using indicatif ────────────────────────────────────

/// Terminal progress callback: a spinner that shows the current stage and
/// one log line per image.
struct CliProgressCallback {
    bar: ProgressBar,
    errors: AtomicUsize,
}

impl CliProgressCallback {
    fn new() -> Arc<Self> {
        let bar = ProgressBar::new_spinner();
        bar.set_style(
            ProgressStyle::with_template("{spinner:.cyan} {prefix:.bold}  {msg}  ⏱ {elapsed}")
                .unwrap_or_else(|_| ProgressStyle::default_spinner())
                .tick_strings(TICKS),
        );
        bar.set_prefix("Idle");
        bar.enable_steady_tick(Duration::from_millis(80));

        Arc::new(Self {
            bar,
            errors: AtomicUsize::new(0),
        })
    }
}

impl IngestProgressCallback for CliProgressCallback {
    fn on_state_change(&self, state: IngestState) {
        let mut prefix = state.to_string();
        if let Some(first) = prefix.get_mut(..1) {
            first.make_ascii_uppercase();
        }
        self.bar.set_prefix(prefix);
    }

    fn on_status(&self, status: &str) {
        self.bar.set_message(status.to_string());
    }

    fn on_image_complete(&self, index: usize, total: usize, url: &str) {
        self.bar.println(format!(
            "  {} Image {:>3}/{:<3}  {}",
            green("✓"),
            index,
            total,
            dim(url)
        ));
    }

    fn on_image_error(&self, index: usize, total: usize, error: &str) {
        self.errors.fetch_add(1, Ordering::SeqCst);

        // Truncate very long error messages to keep output tidy.
        let msg = match error.char_indices().nth(79) {
            Some((cut, _)) => format!("{}\u{2026}", &error[..cut]),
            None => error.to_string(),
        };

        self.bar.println(format!(
            "  {} Image {:>3}/{:<3}  {}",
            red("✗"),
            index,
            total,
            red(&msg)
        ));
    }

    fn on_ingest_complete(&self, stats: &IngestStats) {
        self.bar.finish_and_clear();
        let mark = if self.errors.load(Ordering::SeqCst) == 0 {
            green("✔")
        } else {
            cyan("⚠")
        };
        eprintln!("{} {}", mark, bold(&stats.summary()));
    }
}

const AFTER_HELP: &str = r#"EXAMPLES:
  # Convert a saved HTML clipboard fragment (stdout)
  paste2md --html clip.html

  # HTML with a plain-text fallback, written to a file
  paste2md --html clip.html --text clip.txt -o note.md

  # Screenshot pasted on its own
  paste2md --attachment screenshot.png

  # Provide the bytes behind a blob: reference inside the HTML
  paste2md --html clip.html --blob 'blob:https://docs.example/1234=image.png'

  # Replay a recorded capture against a staging backend
  paste2md --payload capture.json --base-url https://staging.example.com/api

  # JSON output with per-image records
  paste2md --html clip.html --json > result.json

IMAGE HANDLING:
  data:, blob: and file: images          rehosted on the upload service
  images on flagged hosts                fetched via the backend proxy, then rehosted
  every other remote image               left pointing at its original URL
  failed images                          ![图片加载失败](<original>)

ENVIRONMENT VARIABLES:
  PASTE2MD_BASE_URL       Backend base URL (upload service + fetch proxy)
  PASTE2MD_UPLOAD_PATH    Upload endpoint path (default /upload)
  PASTE2MD_PROXY_PATH     Fetch-proxy endpoint path (default /proxy)
  PASTE2MD_FLAGGED_HOSTS  Comma-separated hosts routed through the proxy
  RUST_LOG                Overrides the log filter
"#;

/// Turn clipboard captures into Markdown with rehosted images.
#[derive(Parser, Debug)]
#[command(
    name = "paste2md",
    version,
    about = "Turn clipboard captures into Markdown with rehosted images",
    long_about = "Compile a rich clipboard capture (HTML fragment, plain-text fallback and raw \
attachments) to Markdown. Embedded, session-local and cross-origin images are uploaded to the \
application's upload service; ordinary remote images are left untouched.",
    arg_required_else_help = true,
    color = clap::ColorChoice::Auto,
    after_long_help = AFTER_HELP
)]
struct Cli {
    /// HTML fragment file (the text/html clipboard flavour).
    #[arg(long, conflicts_with = "payload")]
    html: Option<PathBuf>,

    /// Plain-text fallback file (the text/plain clipboard flavour).
    #[arg(long, conflicts_with = "payload")]
    text: Option<PathBuf>,

    /// Raw attachment file; repeat for several.
    #[arg(short, long = "attachment", conflicts_with = "payload")]
    attachments: Vec<PathBuf>,

    /// Session object as LOCATOR=PATH, resolving `blob:` references offline.
    #[arg(long = "blob", value_parser = parse_blob, conflicts_with = "payload")]
    blobs: Vec<(String, PathBuf)>,

    /// Recorded capture in JSON form.
    #[arg(long, env = "PASTE2MD_PAYLOAD")]
    payload: Option<PathBuf>,

    /// Write Markdown to this file instead of stdout.
    #[arg(short, long, env = "PASTE2MD_OUTPUT")]
    output: Option<PathBuf>,

    /// Base URL of the backend hosting the upload service and fetch proxy.
    #[arg(long, env = "PASTE2MD_BASE_URL", default_value = "http://127.0.0.1:8080")]
    base_url: String,

    /// Upload endpoint path.
    #[arg(long, env = "PASTE2MD_UPLOAD_PATH", default_value = "/upload")]
    upload_path: String,

    /// Fetch-proxy endpoint path.
    #[arg(long, env = "PASTE2MD_PROXY_PATH", default_value = "/proxy")]
    proxy_path: String,

    /// Multipart field name for uploads.
    #[arg(long, env = "PASTE2MD_UPLOAD_FIELD", default_value = "file")]
    upload_field: String,

    /// Hosts routed through the fetch proxy (replaces the defaults).
    #[arg(long = "flagged-host", env = "PASTE2MD_FLAGGED_HOSTS", value_delimiter = ',')]
    flagged_hosts: Vec<String>,

    /// Per-request timeout in seconds.
    #[arg(long, env = "PASTE2MD_TIMEOUT", default_value_t = 30)]
    timeout: u64,

    /// Largest image accepted for rehosting, in bytes.
    #[arg(long, env = "PASTE2MD_MAX_IMAGE_BYTES", default_value_t = 20 * 1024 * 1024)]
    max_image_bytes: usize,

    /// Normalise whitespace and strip invisible characters in the output.
    #[arg(long, env = "PASTE2MD_TIDY")]
    tidy: bool,

    /// Output structured JSON (IngestOutput) instead of Markdown.
    #[arg(long, env = "PASTE2MD_JSON")]
    json: bool,

    /// Disable progress display.
    #[arg(long, env = "PASTE2MD_NO_PROGRESS")]
    no_progress: bool,

    /// Enable DEBUG-level tracing logs.
    #[arg(short, long, env = "PASTE2MD_VERBOSE")]
    verbose: bool,

    /// Suppress all output except errors.
    #[arg(short, long, env = "PASTE2MD_QUIET")]
    quiet: bool,
}

fn parse_blob(s: &str) -> Result<(String, PathBuf), String> {
    // Locators contain ':' but never '=' before the path.
    match s.rsplit_once('=') {
        Some((locator, path)) if !locator.is_empty() && !path.is_empty() => {
            Ok((locator.to_string(), PathBuf::from(path)))
        }
        _ => Err(format!("expected LOCATOR=PATH, got '{s}'")),
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // ── Logging setup ────────────────────────────────────────────────────
    // Suppress INFO-level library logs when the progress display is active.
    let show_progress = !cli.quiet && !cli.no_progress && !cli.json;
    let filter = if cli.verbose {
        "debug"
    } else if cli.quiet || show_progress {
        "error"
    } else {
        "info"
    };

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(filter)),
        )
        .with_writer(io::stderr)
        .init();

    // ── Load capture ─────────────────────────────────────────────────────
    let payload = load_capture(&cli).await?;

    // ── Build config ─────────────────────────────────────────────────────
    let progress_cb: Option<ProgressCallback> = if show_progress {
        Some(CliProgressCallback::new() as Arc<dyn IngestProgressCallback>)
    } else {
        None
    };
    let config = build_config(&cli, progress_cb)?;
    let ingestor = Ingestor::new(config).context("Failed to set up ingestion")?;

    // ── Run ──────────────────────────────────────────────────────────────
    let output = ingestor.ingest(&payload).await;

    if let Some(ref output_path) = cli.output {
        write_atomic(output_path, &output.markdown)
            .await
            .context("Failed to write output")?;
        if !cli.quiet {
            eprintln!(
                "{}  {}  {}ms  →  {}",
                if output.stats.images_failed + output.stats.attachments_failed == 0 {
                    green("✔")
                } else {
                    cyan("⚠")
                },
                output.status,
                output.stats.total_duration_ms,
                bold(&output_path.display().to_string()),
            );
        }
    } else if cli.json {
        let json = serde_json::to_string_pretty(&output).context("Failed to serialise output")?;
        println!("{json}");
    } else {
        let stdout = io::stdout();
        let mut handle = stdout.lock();
        handle
            .write_all(output.markdown.as_bytes())
            .context("Failed to write to stdout")?;
        // Ensure a trailing newline on stdout.
        if !output.markdown.ends_with('\n') {
            handle.write_all(b"\n").ok();
        }

        if !cli.quiet && !show_progress {
            eprintln!("{}", output.status);
        }
    }

    Ok(())
}

async fn load_capture(cli: &Cli) -> Result<PastePayload> {
    if let Some(ref path) = cli.payload {
        return load_payload_json(path)
            .await
            .with_context(|| format!("Failed to load capture from {:?}", path));
    }

    if cli.html.is_none() && cli.text.is_none() && cli.attachments.is_empty() {
        anyhow::bail!("Nothing to ingest: pass --html, --text, --attachment or --payload");
    }

    let files = PayloadFiles {
        html: cli.html.clone(),
        text: cli.text.clone(),
        attachments: cli.attachments.clone(),
        session_objects: cli.blobs.clone(),
    };
    load_payload(&files).await.context("Failed to load capture")
}

/// Map CLI args to `IngestConfig`.
fn build_config(cli: &Cli, progress: Option<ProgressCallback>) -> Result<IngestConfig> {
    let mut builder = IngestConfig::builder()
        .base_url(&cli.base_url)
        .upload_path(&cli.upload_path)
        .proxy_path(&cli.proxy_path)
        .upload_field(&cli.upload_field)
        .request_timeout_secs(cli.timeout)
        .max_image_bytes(cli.max_image_bytes)
        .tidy_output(cli.tidy);

    if !cli.flagged_hosts.is_empty() {
        builder = builder.flagged_hosts(cli.flagged_hosts.iter());
    }
    if let Some(cb) = progress {
        builder = builder.progress_callback(cb);
    }

    builder.build().context("Invalid configuration")
}
