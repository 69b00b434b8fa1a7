//! Upload client: rehost image bytes on the application's durable storage.
//!
//! One call, one multipart `POST` with a single binary field. The service
//! answers `{"url": "..."}`; anything else (non-2xx, transport error,
//! malformed body, empty URL) is a failure. No retries: a failed image
//! degrades to a failure marker and the caller can re-paste.

use crate::config::IngestConfig;
use crate::error::ImageError;
use async_trait::async_trait;
use image::ImageFormat;
use reqwest::multipart::{Form, Part};
use serde::Deserialize;
use tracing::debug;

/// Uploads a binary payload and returns its permanent URL.
#[async_trait]
pub trait UploadClient: Send + Sync {
    /// Returns the permanent URL. An `Ok` with an empty string is treated as
    /// a failure by callers.
    async fn upload(&self, payload: Vec<u8>) -> Result<String, ImageError>;
}

#[derive(Debug, Deserialize)]
struct UploadResponse {
    url: String,
}

/// Multipart HTTP upload client.
pub struct HttpUploadClient {
    client: reqwest::Client,
    endpoint: String,
    field: String,
}

impl HttpUploadClient {
    pub fn new(client: reqwest::Client, config: &IngestConfig) -> Self {
        Self {
            client,
            endpoint: config.upload_endpoint(),
            field: config.upload_field.clone(),
        }
    }
}

#[async_trait]
impl UploadClient for HttpUploadClient {
    async fn upload(&self, payload: Vec<u8>) -> Result<String, ImageError> {
        let failed = |detail: String| ImageError::UploadFailed { detail };

        let (file_name, mime) = describe_payload(&payload);
        let size = payload.len();
        let part = Part::bytes(payload)
            .file_name(file_name)
            .mime_str(mime)
            .map_err(|e| failed(e.to_string()))?;
        let form = Form::new().part(self.field.clone(), part);

        let response = self
            .client
            .post(&self.endpoint)
            .multipart(form)
            .send()
            .await
            .map_err(|e| failed(e.to_string()))?;

        if !response.status().is_success() {
            return Err(failed(format!("HTTP {}", response.status())));
        }

        let body: UploadResponse = response
            .json()
            .await
            .map_err(|e| failed(format!("malformed response: {e}")))?;
        if body.url.trim().is_empty() {
            return Err(failed("response carried an empty url".to_string()));
        }

        debug!("Uploaded {} bytes → {}", size, body.url);
        Ok(body.url)
    }
}

/// File name and MIME type for the multipart part, sniffed from magic bytes.
pub fn describe_payload(bytes: &[u8]) -> (String, &'static str) {
    match image::guess_format(bytes) {
        Ok(format) => {
            let ext = format.extensions_str().first().copied().unwrap_or("bin");
            (format!("image.{ext}"), format.to_mime_type())
        }
        Err(_) => ("image.bin".to_string(), "application/octet-stream"),
    }
}

/// MIME type for raw bytes, or `None` if they are not a recognised image.
pub fn sniff_image_mime(bytes: &[u8]) -> Option<&'static str> {
    image::guess_format(bytes)
        .ok()
        .map(|f: ImageFormat| f.to_mime_type())
}
