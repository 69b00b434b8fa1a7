//! Progress-callback trait for ingestion events.
//!
//! Inject an [`Arc<dyn IngestProgressCallback>`] via
//! [`crate::config::IngestConfigBuilder::progress_callback`] to receive
//! real-time events as the pipeline walks through a capture.
//!
//! The pipeline never touches ambient UI state. Everything a host application
//! might want to display (the current stage, a running status line, each
//! image as it is rehosted) arrives through this trait, and the host decides
//! whether that means a terminal progress bar, a toast, or a log line.
//!
//! # Example
//!
//! ```rust
//! use edgequake_paste2md::{IngestConfig, IngestProgressCallback};
//! use std::sync::{Arc, Mutex};
//!
//! struct StatusLine(Mutex<String>);
//!
//! impl IngestProgressCallback for StatusLine {
//!     fn on_status(&self, status: &str) {
//!         *self.0.lock().unwrap() = status.to_string();
//!     }
//! }
//!
//! let cb = Arc::new(StatusLine(Mutex::new(String::new())));
//! let config = IngestConfig::builder()
//!     .progress_callback(cb as Arc<dyn IngestProgressCallback>)
//!     .build()
//!     .unwrap();
//! ```

use crate::output::IngestStats;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::Arc;

/// Stages of a single capture, in the order they can occur.
///
/// ```text
/// Idle → Capturing → (Compiling → ResolvingImages) | PlainTextFallback
///      → IngestingAttachments → Done
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum IngestState {
    /// Before a capture starts. Never passed to `on_state_change`; the first
    /// reported state is always `Capturing`.
    Idle,
    Capturing,
    Compiling,
    ResolvingImages,
    PlainTextFallback,
    IngestingAttachments,
    Done,
}

impl fmt::Display for IngestState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            IngestState::Idle => "idle",
            IngestState::Capturing => "capturing",
            IngestState::Compiling => "compiling",
            IngestState::ResolvingImages => "resolving images",
            IngestState::PlainTextFallback => "plain-text fallback",
            IngestState::IngestingAttachments => "ingesting attachments",
            IngestState::Done => "done",
        };
        f.write_str(s)
    }
}

/// Called by the ingestion pipeline as it processes a capture.
///
/// Implementations must be `Send + Sync`. All methods have default no-op
/// implementations so callers only override what they care about.
///
/// Images are processed strictly one at a time in document order, so
/// `on_image_start(k)` always precedes `on_image_start(k + 1)`.
pub trait IngestProgressCallback: Send + Sync {
    /// Called on every state transition.
    fn on_state_change(&self, state: IngestState) {
        let _ = state;
    }

    /// Called with a human-readable status line whenever it changes.
    fn on_status(&self, status: &str) {
        let _ = status;
    }

    /// Called just before an image (placeholder or attachment) is processed.
    ///
    /// # Arguments
    /// * `index` — 1-indexed position among images of the same kind
    /// * `total` — number of images of that kind in the capture
    fn on_image_start(&self, index: usize, total: usize) {
        let _ = (index, total);
    }

    /// Called when an image has been given its final reference.
    ///
    /// # Arguments
    /// * `url` — the rehosted URL, or the original locator for passthroughs
    fn on_image_complete(&self, index: usize, total: usize, url: &str) {
        let _ = (index, total, url);
    }

    /// Called when an image degraded (failure marker, skip, or unresolved token).
    fn on_image_error(&self, index: usize, total: usize, error: &str) {
        let _ = (index, total, error);
    }

    /// Called once when the capture reaches [`IngestState::Done`].
    fn on_ingest_complete(&self, stats: &IngestStats) {
        let _ = stats;
    }
}

/// A no-op implementation for callers that don't need progress events.
pub struct NoopProgressCallback;

impl IngestProgressCallback for NoopProgressCallback {}

/// Convenience alias matching the type stored in [`crate::config::IngestConfig`].
pub type ProgressCallback = Arc<dyn IngestProgressCallback>;
