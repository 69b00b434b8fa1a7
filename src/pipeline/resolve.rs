//! Resource resolution: turn an image locator into bytes.
//!
//! | Class | Source of bytes |
//! |-------|-----------------|
//! | `EmbeddedData` | base64 payload of the `data:` URL |
//! | `SessionLocal` | `blob:` → payload session objects; `file:` → local disk |
//! | `CrossOriginFlagged` | `GET {proxy}?url=<locator>` on the application backend |
//! | `GenericRemote` | never resolved |
//!
//! Flagged origins are fetched through the backend proxy rather than directly:
//! their assets are served with cross-origin restrictions or short-lived
//! signatures that the backend is positioned to satisfy.

use crate::config::IngestConfig;
use crate::error::{short_locator, ImageError};
use crate::payload::Attachment;
use crate::pipeline::locator::{LocatorClass, ResourceLocator};
use async_trait::async_trait;
use base64::{engine::general_purpose::STANDARD, Engine as _};
use std::collections::HashMap;
use tracing::debug;

/// Produces the bytes behind an image locator.
///
/// Implementations never panic on bad input; every failure is an
/// [`ImageError`], which the resolution pass turns into a failure marker.
#[async_trait]
pub trait ResourceResolver: Send + Sync {
    async fn resolve(
        &self,
        locator: &ResourceLocator,
        session: &HashMap<String, Attachment>,
    ) -> Result<Vec<u8>, ImageError>;
}

/// Default resolver: decodes data URLs, reads session objects and local
/// files, and calls the backend fetch proxy for flagged hosts.
pub struct HttpResourceResolver {
    client: reqwest::Client,
    proxy_endpoint: String,
    max_bytes: usize,
}

impl HttpResourceResolver {
    pub fn new(client: reqwest::Client, config: &IngestConfig) -> Self {
        Self {
            client,
            proxy_endpoint: config.proxy_endpoint(),
            max_bytes: config.max_image_bytes,
        }
    }

    async fn fetch_via_proxy(&self, locator: &str) -> Result<Vec<u8>, ImageError> {
        let proxy_err = |detail: String| ImageError::ProxyFailed {
            locator: short_locator(locator),
            detail,
        };

        debug!("Proxy fetch: {}", short_locator(locator));
        let response = self
            .client
            .get(&self.proxy_endpoint)
            .query(&[("url", locator)])
            .send()
            .await
            .map_err(|e| proxy_err(e.to_string()))?;

        if !response.status().is_success() {
            return Err(proxy_err(format!("HTTP {}", response.status())));
        }

        let bytes = response
            .bytes()
            .await
            .map_err(|e| proxy_err(e.to_string()))?;
        Ok(bytes.to_vec())
    }

    fn check_size(&self, bytes: Vec<u8>) -> Result<Vec<u8>, ImageError> {
        if bytes.len() > self.max_bytes {
            return Err(ImageError::TooLarge {
                bytes: bytes.len(),
                limit: self.max_bytes,
            });
        }
        Ok(bytes)
    }
}

#[async_trait]
impl ResourceResolver for HttpResourceResolver {
    async fn resolve(
        &self,
        locator: &ResourceLocator,
        session: &HashMap<String, Attachment>,
    ) -> Result<Vec<u8>, ImageError> {
        let raw = locator.raw.trim();
        let bytes = match locator.class {
            LocatorClass::EmbeddedData => decode_data_url(raw)?,
            LocatorClass::SessionLocal => read_session_local(raw, session).await?,
            LocatorClass::CrossOriginFlagged => self.fetch_via_proxy(raw).await?,
            LocatorClass::GenericRemote => {
                return Err(ImageError::NotResolvable {
                    locator: short_locator(raw),
                })
            }
        };
        self.check_size(bytes)
    }
}

/// Decode a base64 `data:` URL.
///
/// Only the `;base64` encoding is accepted; percent-encoded payloads are
/// reported as invalid.
pub fn decode_data_url(locator: &str) -> Result<Vec<u8>, ImageError> {
    let invalid = |detail: &str| ImageError::InvalidDataUrl {
        detail: detail.to_string(),
    };

    let rest = locator
        .get(..5)
        .filter(|p| p.eq_ignore_ascii_case("data:"))
        .map(|_| &locator[5..])
        .ok_or_else(|| invalid("missing data: scheme"))?;
    let (meta, data) = rest
        .split_once(',')
        .ok_or_else(|| invalid("missing ',' separator"))?;
    if !meta
        .split(';')
        .any(|param| param.trim().eq_ignore_ascii_case("base64"))
    {
        return Err(invalid("only base64 data URLs are supported"));
    }

    let cleaned: String = data.chars().filter(|c| !c.is_ascii_whitespace()).collect();
    STANDARD
        .decode(cleaned)
        .map_err(|e| invalid(&format!("base64 decode failed: {e}")))
}

async fn read_session_local(
    locator: &str,
    session: &HashMap<String, Attachment>,
) -> Result<Vec<u8>, ImageError> {
    if locator
        .get(..5)
        .is_some_and(|p| p.eq_ignore_ascii_case("file:"))
    {
        let path = reqwest::Url::parse(locator)
            .ok()
            .and_then(|u| u.to_file_path().ok())
            .ok_or_else(|| ImageError::LocalFileUnreadable {
                path: locator.to_string(),
                detail: "not a valid file URL".to_string(),
            })?;
        return tokio::fs::read(&path)
            .await
            .map_err(|e| ImageError::LocalFileUnreadable {
                path: path.display().to_string(),
                detail: e.to_string(),
            });
    }

    session
        .get(locator)
        .map(|object| object.data.clone())
        .ok_or_else(|| ImageError::SessionObjectMissing {
            locator: short_locator(locator),
        })
}
