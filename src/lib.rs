//! # edgequake-paste2md
//!
//! Turn a clipboard paste into Markdown whose images live on durable storage.
//!
//! ## Why this crate?
//!
//! Content copied out of rich editors references images that will not
//! survive the paste: `data:` URLs bloat the document, `blob:` URLs die with
//! the browser session, and images served by collaborative editors sit
//! behind cross-origin restrictions or expiring signatures. This crate
//! compiles the pasted HTML to Markdown and rehosts exactly those images on
//! the application's own upload service, leaving ordinary remote images
//! pointing where they already point.
//!
//! ## Pipeline Overview
//!
//! ```text
//! PastePayload
//!  │
//!  ├─ 1. Compile      HTML fragment → Markdown text + numbered placeholders
//!  ├─ 2. Resolve      each placeholder in order: classify → fetch → upload
//!  ├─ 3. Fallback     no fragment? use the plain text verbatim
//!  ├─ 4. Attachments  upload raw image files, append image blocks
//!  └─ 5. Output       Markdown + status line + per-image records
//! ```
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use edgequake_paste2md::{ingest, IngestConfig, PastePayload};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let config = IngestConfig::builder()
//!         .base_url("https://cms.example.com/api")
//!         .build()?;
//!     let payload = PastePayload::from_html("<h2>Notes</h2><ul><li>A</li><li>B</li></ul>");
//!     let output = ingest(&payload, &config).await?;
//!     println!("{}", output.markdown);
//!     eprintln!("{}", output.status);
//!     Ok(())
//! }
//! ```
//!
//! ## Feature Flags
//!
//! | Feature | Default | Description |
//! |---------|---------|-------------|
//! | `cli`   | on      | Enables the `paste2md` binary (clap + indicatif + anyhow + tracing-subscriber) |
//!
//! Disable `cli` when using only the library:
//! ```toml
//! edgequake-paste2md = { version = "0.1", default-features = false }
//! ```

// ── Modules ──────────────────────────────────────────────────────────────

pub mod config;
pub mod dom;
pub mod error;
pub mod ingest;
pub mod markers;
pub mod output;
pub mod payload;
pub mod pipeline;
pub mod progress;

#[cfg(test)]
mod test_support;

// ── Re-exports ───────────────────────────────────────────────────────────

pub use config::{IngestConfig, IngestConfigBuilder, DEFAULT_FLAGGED_HOSTS};
pub use dom::{parse_fragment, DocumentNode, FragmentNode, NodeKind};
pub use error::{ImageError, Paste2MdError};
pub use ingest::{ingest, ingest_sync, ingest_to_file, Ingestor};
pub use output::{ImageOutcome, ImageRecord, IngestOutput, IngestStats};
pub use payload::{Attachment, PastePayload};
pub use pipeline::compile::{compile, CompiledFragment, ImagePlaceholder};
pub use pipeline::input::PayloadFiles;
pub use pipeline::locator::{LocatorClass, ResourceLocator};
pub use pipeline::resolve::{HttpResourceResolver, ResourceResolver};
pub use pipeline::upload::{HttpUploadClient, UploadClient};
pub use progress::{IngestProgressCallback, IngestState, NoopProgressCallback, ProgressCallback};
