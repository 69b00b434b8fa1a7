//! Input loading: assemble a [`PastePayload`] from files on disk.
//!
//! A capture arrives either as separate files (an HTML fragment, a plain-text
//! fallback, raw attachments) or as a single recorded payload in JSON form.
//! Both paths validate existence and read permission up front so callers get
//! a meaningful [`Paste2MdError`] instead of a half-built payload.

use crate::error::Paste2MdError;
use crate::payload::{Attachment, PastePayload};
use crate::pipeline::upload::sniff_image_mime;
use image::ImageFormat;
use std::path::{Path, PathBuf};
use tracing::{debug, info};

/// Files making up one capture.
#[derive(Debug, Clone, Default)]
pub struct PayloadFiles {
    pub html: Option<PathBuf>,
    pub text: Option<PathBuf>,
    pub attachments: Vec<PathBuf>,
    /// `(locator, path)` pairs registered as session objects, so `blob:`
    /// references inside the HTML can be resolved offline.
    pub session_objects: Vec<(String, PathBuf)>,
}

/// Read every file in `files` and build the payload.
pub async fn load_payload(files: &PayloadFiles) -> Result<PastePayload, Paste2MdError> {
    let mut payload = PastePayload::default();

    if let Some(path) = &files.html {
        payload.html = Some(read_text(path).await?);
    }
    if let Some(path) = &files.text {
        payload.text = Some(read_text(path).await?);
    }
    for path in &files.attachments {
        payload.attachments.push(read_attachment(path).await?);
    }
    for (locator, path) in &files.session_objects {
        payload
            .session_objects
            .insert(locator.clone(), read_attachment(path).await?);
    }

    debug!(
        "Loaded payload: html={}, text={}, {} attachments, {} session objects",
        payload.html.is_some(),
        payload.text.is_some(),
        payload.attachments.len(),
        payload.session_objects.len()
    );
    Ok(payload)
}

/// Read a recorded payload (the JSON form of [`PastePayload`]).
pub async fn load_payload_json(path: &Path) -> Result<PastePayload, Paste2MdError> {
    let raw = read_bytes(path).await?;
    let payload: PastePayload =
        serde_json::from_slice(&raw).map_err(|e| Paste2MdError::InvalidPayload {
            path: path.to_path_buf(),
            detail: e.to_string(),
        })?;
    info!("Loaded recorded payload: {}", path.display());
    Ok(payload)
}

async fn read_bytes(path: &Path) -> Result<Vec<u8>, Paste2MdError> {
    tokio::fs::read(path).await.map_err(|e| match e.kind() {
        std::io::ErrorKind::PermissionDenied => Paste2MdError::PermissionDenied {
            path: path.to_path_buf(),
        },
        std::io::ErrorKind::NotFound => Paste2MdError::FileNotFound {
            path: path.to_path_buf(),
        },
        _ => Paste2MdError::InvalidPayload {
            path: path.to_path_buf(),
            detail: e.to_string(),
        },
    })
}

async fn read_text(path: &Path) -> Result<String, Paste2MdError> {
    let raw = read_bytes(path).await?;
    String::from_utf8(raw).map_err(|_| Paste2MdError::InvalidPayload {
        path: path.to_path_buf(),
        detail: "file is not valid UTF-8".to_string(),
    })
}

async fn read_attachment(path: &Path) -> Result<Attachment, Paste2MdError> {
    let data = read_bytes(path).await?;
    let mime = attachment_mime(path, &data);
    debug!("Attachment {} ({}, {} bytes)", path.display(), mime, data.len());
    Ok(Attachment::new(mime, data))
}

/// MIME type of an attachment: magic bytes first, then the file extension.
pub fn attachment_mime(path: &Path, data: &[u8]) -> String {
    if let Some(mime) = sniff_image_mime(data) {
        return mime.to_string();
    }
    match ImageFormat::from_path(path) {
        Ok(format) => format.to_mime_type().to_string(),
        Err(_) => "application/octet-stream".to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const PNG_MAGIC: &[u8] = &[137, 80, 78, 71, 13, 10, 26, 10, 0, 0, 0, 13];

    #[test]
    fn mime_prefers_magic_bytes() {
        assert_eq!(attachment_mime(Path::new("x.jpg"), PNG_MAGIC), "image/png");
        assert_eq!(attachment_mime(Path::new("x.gif"), b"junk"), "image/gif");
        assert_eq!(
            attachment_mime(Path::new("notes.txt"), b"junk"),
            "application/octet-stream"
        );
    }

    #[tokio::test]
    async fn loads_separate_files() {
        let dir = tempfile::tempdir().unwrap();
        let html = dir.path().join("clip.html");
        let text = dir.path().join("clip.txt");
        let image = dir.path().join("shot.png");
        let blob = dir.path().join("blob.bin");
        std::fs::write(&html, "<p>hi</p>").unwrap();
        std::fs::write(&text, "hi").unwrap();
        std::fs::write(&image, PNG_MAGIC).unwrap();
        std::fs::write(&blob, PNG_MAGIC).unwrap();

        let payload = load_payload(&PayloadFiles {
            html: Some(html),
            text: Some(text),
            attachments: vec![image],
            session_objects: vec![("blob:https://docs/1".to_string(), blob)],
        })
        .await
        .unwrap();

        assert_eq!(payload.html.as_deref(), Some("<p>hi</p>"));
        assert_eq!(payload.text.as_deref(), Some("hi"));
        assert_eq!(payload.attachments[0].mime, "image/png");
        assert!(payload.session_objects.contains_key("blob:https://docs/1"));
    }

    #[tokio::test]
    async fn missing_file_is_reported() {
        let result = load_payload(&PayloadFiles {
            text: Some(PathBuf::from("/definitely/not/here.txt")),
            ..Default::default()
        })
        .await;
        assert!(matches!(result, Err(Paste2MdError::FileNotFound { .. })));
    }

    #[tokio::test]
    async fn non_utf8_text_is_invalid() {
        let dir = tempfile::tempdir().unwrap();
        let text = dir.path().join("clip.txt");
        std::fs::write(&text, [0xFFu8, 0xFE]).unwrap();
        let result = load_payload(&PayloadFiles {
            text: Some(text),
            ..Default::default()
        })
        .await;
        assert!(matches!(result, Err(Paste2MdError::InvalidPayload { .. })));
    }

    #[tokio::test]
    async fn loads_recorded_json() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("capture.json");
        std::fs::write(
            &path,
            r#"{"html":"<p>x</p>","attachments":[{"mime":"image/png","data":"AQID"}]}"#,
        )
        .unwrap();

        let payload = load_payload_json(&path).await.unwrap();
        assert_eq!(payload.html.as_deref(), Some("<p>x</p>"));
        assert_eq!(payload.attachments[0].data, vec![1, 2, 3]);
        assert!(payload.text.is_none());
    }

    #[tokio::test]
    async fn malformed_json_is_invalid() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("capture.json");
        std::fs::write(&path, "{not json").unwrap();
        assert!(matches!(
            load_payload_json(&path).await,
            Err(Paste2MdError::InvalidPayload { .. })
        ));
    }
}
