//! The captured paste: rich fragment, plain-text fallback and raw attachments.
//!
//! A [`PastePayload`] is immutable once built. It serialises to JSON with
//! attachment bytes as standard base64 so captures can be recorded by a host
//! application and replayed through the CLI.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// Everything one paste event delivered.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PastePayload {
    /// Rich fragment (`text/html` flavour of the clipboard).
    #[serde(default)]
    pub html: Option<String>,

    /// Plain-text fallback (`text/plain` flavour).
    #[serde(default)]
    pub text: Option<String>,

    /// Raw clipboard items in the order they were delivered.
    #[serde(default)]
    pub attachments: Vec<Attachment>,

    /// Session-scoped objects referenced by `blob:` locators inside the rich
    /// fragment, keyed by the full locator.
    #[serde(default)]
    pub session_objects: HashMap<String, Attachment>,
}

impl PastePayload {
    /// A payload carrying only a rich fragment.
    pub fn from_html(html: impl Into<String>) -> Self {
        Self {
            html: Some(html.into()),
            ..Default::default()
        }
    }

    /// A payload carrying only plain text.
    pub fn from_text(text: impl Into<String>) -> Self {
        Self {
            text: Some(text.into()),
            ..Default::default()
        }
    }

    pub fn with_html(mut self, html: impl Into<String>) -> Self {
        self.html = Some(html.into());
        self
    }

    pub fn with_text(mut self, text: impl Into<String>) -> Self {
        self.text = Some(text.into());
        self
    }

    pub fn with_attachment(mut self, attachment: Attachment) -> Self {
        self.attachments.push(attachment);
        self
    }

    /// Register the bytes behind a `blob:` locator.
    pub fn with_session_object(mut self, locator: impl Into<String>, object: Attachment) -> Self {
        self.session_objects.insert(locator.into(), object);
        self
    }

    /// The rich fragment, if present and not blank.
    ///
    /// Browsers hand over an empty string when the source offered no HTML
    /// flavour, so blank counts as absent.
    pub fn rich_fragment(&self) -> Option<&str> {
        self.html.as_deref().filter(|h| !h.trim().is_empty())
    }
}

/// One raw clipboard item.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Attachment {
    /// MIME type as reported by the source, e.g. `image/png`.
    pub mime: String,

    #[serde(with = "base64_bytes")]
    pub data: Vec<u8>,
}

impl Attachment {
    pub fn new(mime: impl Into<String>, data: impl Into<Vec<u8>>) -> Self {
        Self {
            mime: mime.into(),
            data: data.into(),
        }
    }

    /// True when the base MIME type is `image/*` (case-insensitive,
    /// parameters ignored).
    pub fn is_image(&self) -> bool {
        is_image_mime(&self.mime)
    }
}

pub(crate) fn is_image_mime(mime: &str) -> bool {
    mime.split(';')
        .next()
        .map(|base| base.trim().to_ascii_lowercase().starts_with("image/"))
        .unwrap_or(false)
}

mod base64_bytes {
    use base64::{engine::general_purpose::STANDARD, Engine as _};
    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(bytes: &[u8], s: S) -> Result<S::Ok, S::Error> {
        s.serialize_str(&STANDARD.encode(bytes))
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(d: D) -> Result<Vec<u8>, D::Error> {
        let encoded = String::deserialize(d)?;
        STANDARD
            .decode(encoded.trim())
            .map_err(serde::de::Error::custom)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn image_mime_detection() {
        assert!(Attachment::new("image/png", vec![]).is_image());
        assert!(Attachment::new("IMAGE/JPEG; q=1", vec![]).is_image());
        assert!(!Attachment::new("text/html; charset=utf-8", vec![]).is_image());
        assert!(!Attachment::new("", vec![]).is_image());
    }

    #[test]
    fn blank_html_is_not_a_rich_fragment() {
        let p = PastePayload::from_html("  \n ");
        assert_eq!(p.rich_fragment(), None);
        let p = PastePayload::from_html("<p>x</p>");
        assert_eq!(p.rich_fragment(), Some("<p>x</p>"));
    }

    #[test]
    fn json_carries_attachment_bytes_as_base64() {
        let payload = PastePayload::from_text("hello")
            .with_attachment(Attachment::new("image/png", vec![1u8, 2, 3]));
        let json = serde_json::to_string(&payload).unwrap();
        assert!(json.contains("\"AQID\""), "got: {json}");

        let back: PastePayload = serde_json::from_str(&json).unwrap();
        assert_eq!(back, payload);
    }

    #[test]
    fn json_fields_default_when_missing() {
        let payload: PastePayload = serde_json::from_str(r#"{"text":"hi"}"#).unwrap();
        assert_eq!(payload.text.as_deref(), Some("hi"));
        assert!(payload.html.is_none());
        assert!(payload.attachments.is_empty());
        assert!(payload.session_objects.is_empty());
    }

    #[test]
    fn json_rejects_bad_base64() {
        let r: Result<PastePayload, _> =
            serde_json::from_str(r#"{"attachments":[{"mime":"image/png","data":"@@@"}]}"#);
        assert!(r.is_err());
    }
}
