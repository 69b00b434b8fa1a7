//! Error types for the edgequake-paste2md library.
//!
//! Two distinct error types reflect two distinct failure modes:
//!
//! * [`Paste2MdError`] — **Fatal**: the pipeline cannot be set up at all
//!   (invalid configuration, HTTP client could not be built, an input file
//!   could not be read). Returned as `Err(Paste2MdError)` from constructors
//!   and file-level entry points.
//!
//! * [`ImageError`] — **Non-fatal**: a single image could not be resolved or
//!   rehosted. The affected image degrades to a failure marker (or is skipped,
//!   for raw attachments) and the error is stored in
//!   [`crate::output::ImageRecord`] so callers can inspect what went wrong.
//!
//! Running the pipeline itself never returns an error: the worst outcome is a
//! partially degraded document.

use std::path::PathBuf;
use thiserror::Error;

/// All fatal errors returned by the edgequake-paste2md library.
///
/// Image-level failures use [`ImageError`] and are stored in
/// [`crate::output::ImageRecord`] rather than propagated here.
#[derive(Debug, Error)]
pub enum Paste2MdError {
    // ── Input errors ──────────────────────────────────────────────────────
    /// Input file was not found at the given path.
    #[error("Input file not found: '{path}'\nCheck the path exists and is readable.")]
    FileNotFound { path: PathBuf },

    /// Process does not have read permission on the file.
    #[error("Permission denied reading '{path}'\nTry: chmod +r {path:?}")]
    PermissionDenied { path: PathBuf },

    /// A capture file was read but does not describe a valid paste payload.
    #[error("Invalid paste payload in '{path}': {detail}")]
    InvalidPayload { path: PathBuf, detail: String },

    // ── Network setup errors ──────────────────────────────────────────────
    /// The shared HTTP client could not be constructed.
    #[error("Failed to build HTTP client: {0}")]
    HttpClient(String),

    // ── I/O errors ────────────────────────────────────────────────────────
    /// Could not create or write the output Markdown file.
    #[error("Failed to write output file '{path}': {source}")]
    OutputWriteFailed {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    // ── Config errors ─────────────────────────────────────────────────────
    /// Builder validation failed.
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    // ── Catch-all ─────────────────────────────────────────────────────────
    /// Unexpected internal error.
    #[error("Internal error: {0}")]
    Internal(String),
}

/// A non-fatal error for a single image.
///
/// Produced by [`crate::pipeline::resolve::ResourceResolver`] and
/// [`crate::pipeline::upload::UploadClient`] implementations and converted to
/// degraded output at the call site.
#[derive(Debug, Clone, PartialEq, Eq, Error, serde::Serialize, serde::Deserialize)]
pub enum ImageError {
    /// A `data:` locator could not be decoded.
    #[error("invalid data URL: {detail}")]
    InvalidDataUrl { detail: String },

    /// A `blob:` locator has no registered session object.
    #[error("session object '{locator}' is not available")]
    SessionObjectMissing { locator: String },

    /// A `file:` locator could not be read.
    #[error("local file '{path}' unreadable: {detail}")]
    LocalFileUnreadable { path: String, detail: String },

    /// The fetch proxy returned a non-success status or a transport error.
    #[error("proxy fetch of '{locator}' failed: {detail}")]
    ProxyFailed { locator: String, detail: String },

    /// The resolved payload exceeds the configured size limit.
    #[error("image is {bytes} bytes, limit is {limit}")]
    TooLarge { bytes: usize, limit: usize },

    /// The upload service rejected the payload or was unreachable.
    #[error("upload failed: {detail}")]
    UploadFailed { detail: String },

    /// The locator class is never resolved (generic remote passthrough).
    #[error("locator '{locator}' is not resolvable")]
    NotResolvable { locator: String },
}

/// Shorten a locator for log lines and error messages.
///
/// `data:` URLs routinely run to hundreds of kilobytes; nobody wants those in
/// a terminal.
pub fn short_locator(locator: &str) -> String {
    const MAX: usize = 80;
    if locator.chars().count() <= MAX {
        return locator.to_string();
    }
    let head: String = locator.chars().take(MAX - 1).collect();
    format!("{head}\u{2026}")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn invalid_config_display() {
        let e = Paste2MdError::InvalidConfig("base_url must not be empty".into());
        assert!(e.to_string().contains("base_url"), "got: {e}");
    }

    #[test]
    fn too_large_display() {
        let e = ImageError::TooLarge {
            bytes: 2048,
            limit: 1024,
        };
        let msg = e.to_string();
        assert!(msg.contains("2048"));
        assert!(msg.contains("1024"));
    }

    #[test]
    fn proxy_failed_display() {
        let e = ImageError::ProxyFailed {
            locator: "https://lh3.googleusercontent.com/a".into(),
            detail: "HTTP 403 Forbidden".into(),
        };
        assert!(e.to_string().contains("403"));
    }

    #[test]
    fn short_locator_keeps_short_input() {
        assert_eq!(short_locator("blob:abc"), "blob:abc");
    }

    #[test]
    fn short_locator_truncates_data_urls() {
        let long = format!("data:image/png;base64,{}", "A".repeat(500));
        let short = short_locator(&long);
        assert_eq!(short.chars().count(), 80);
        assert!(short.ends_with('\u{2026}'));
    }

    #[test]
    fn image_error_roundtrips_through_json() {
        let e = ImageError::UploadFailed {
            detail: "HTTP 500".into(),
        };
        let json = serde_json::to_string(&e).unwrap();
        let back: ImageError = serde_json::from_str(&json).unwrap();
        assert_eq!(back, e);
    }
}
