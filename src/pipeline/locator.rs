//! Locator classification: decide whether an image source needs rehosting.
//!
//! Only sources whose bytes may vanish are rehosted:
//!
//! | Class | Example | Handling |
//! |-------|---------|----------|
//! | `EmbeddedData` | `data:image/png;base64,…` | decode, upload |
//! | `SessionLocal` | `blob:https://docs…/uuid`, `file:///tmp/clip.png` | read, upload |
//! | `CrossOriginFlagged` | `https://lh3.googleusercontent.com/…` | fetch via proxy, upload |
//! | `GenericRemote` | `https://example.com/pic.png` | left as-is |
//!
//! Arbitrary external images keep pointing at their origin: rehosting every
//! remote image would cost bandwidth and storage for resources that are
//! already durable.

use serde::{Deserialize, Serialize};

/// How a source locator is handled.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum LocatorClass {
    EmbeddedData,
    SessionLocal,
    CrossOriginFlagged,
    GenericRemote,
}

impl LocatorClass {
    /// Whether bytes must be fetched and uploaded for this class.
    pub fn requires_resolution(self) -> bool {
        !matches!(self, LocatorClass::GenericRemote)
    }
}

/// A classified image source.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResourceLocator {
    pub raw: String,
    pub class: LocatorClass,
}

impl ResourceLocator {
    pub fn classify(raw: impl Into<String>, flagged_hosts: &[String]) -> Self {
        let raw = raw.into();
        let class = classify(&raw, flagged_hosts);
        Self { raw, class }
    }
}

/// Classify a raw locator against the flagged-host list.
///
/// Unparseable or relative locators fall through to `GenericRemote` and are
/// passed through untouched.
pub fn classify(locator: &str, flagged_hosts: &[String]) -> LocatorClass {
    let trimmed = locator.trim();
    // Checked before URL parsing: data URLs can be megabytes long.
    if has_scheme(trimmed, "data:") {
        return LocatorClass::EmbeddedData;
    }
    if has_scheme(trimmed, "blob:") || has_scheme(trimmed, "file:") {
        return LocatorClass::SessionLocal;
    }

    let Ok(url) = reqwest::Url::parse(trimmed) else {
        return LocatorClass::GenericRemote;
    };
    if url.scheme() != "http" && url.scheme() != "https" {
        return LocatorClass::GenericRemote;
    }
    match url.host_str() {
        Some(host) if is_flagged_host(host, flagged_hosts) => LocatorClass::CrossOriginFlagged,
        _ => LocatorClass::GenericRemote,
    }
}

fn has_scheme(locator: &str, scheme: &str) -> bool {
    locator
        .get(..scheme.len())
        .is_some_and(|p| p.eq_ignore_ascii_case(scheme))
}

/// True when `host` equals a flagged entry or is a subdomain of one.
pub fn is_flagged_host(host: &str, flagged_hosts: &[String]) -> bool {
    let host = host.trim_end_matches('.').to_ascii_lowercase();
    flagged_hosts.iter().any(|entry| {
        host == *entry
            || host
                .strip_suffix(entry.as_str())
                .is_some_and(|rest| rest.ends_with('.'))
    })
}
