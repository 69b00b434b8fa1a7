//! Result types returned by the ingestion entry points.

use crate::error::ImageError;
use serde::{Deserialize, Serialize};

/// The complete result of ingesting one capture.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IngestOutput {
    /// The final document: compiled (or plain) text followed by any
    /// attachment image blocks.
    pub markdown: String,

    /// Human-readable summary, e.g. `"Done: 3 images processed (1 failed)"`.
    pub status: String,

    /// One record per image node in the rich fragment, in document order.
    pub images: Vec<ImageRecord>,

    /// One record per raw attachment, in payload order.
    pub attachments: Vec<ImageRecord>,

    pub stats: IngestStats,
}

impl IngestOutput {
    /// Every durable URL produced by this capture, placeholders first.
    pub fn hosted_urls(&self) -> Vec<&str> {
        self.images
            .iter()
            .chain(self.attachments.iter())
            .filter_map(|r| match &r.outcome {
                ImageOutcome::Rehosted { url } => Some(url.as_str()),
                _ => None,
            })
            .collect()
    }
}

/// What happened to one image.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ImageRecord {
    /// 1-indexed position among images of the same origin.
    pub index: usize,

    /// The source locator (`src` of the image node), or `None` for raw
    /// attachments and empty locators.
    pub source: Option<String>,

    pub outcome: ImageOutcome,
}

/// Final disposition of an image.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum ImageOutcome {
    /// Bytes were fetched and uploaded; `url` is the permanent location.
    Rehosted { url: String },

    /// A generic remote image left pointing at its original location.
    Passthrough { url: String },

    /// Resolution or upload failed. Placeholders degrade to a failure marker;
    /// attachments are dropped.
    Failed { error: ImageError },

    /// The image node had no source locator; its placeholder token was left
    /// in the text verbatim.
    Unresolved,

    /// Attachment was not an image and was ignored.
    Skipped { mime: String },
}

/// Aggregate counters for one capture.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct IngestStats {
    /// Image nodes found in the rich fragment.
    pub images_total: usize,
    pub images_rehosted: usize,
    pub images_passthrough: usize,
    pub images_failed: usize,
    /// Placeholders left verbatim because their locator was empty.
    pub images_unresolved: usize,

    /// Raw attachments in the payload (image or not).
    pub attachments_total: usize,
    pub attachments_uploaded: usize,
    pub attachments_failed: usize,
    pub attachments_skipped: usize,

    /// Whether the primary text came from the rich fragment (`false` means
    /// plain text or nothing).
    pub used_rich_fragment: bool,

    pub total_duration_ms: u64,
}

impl IngestStats {
    /// Render the terminal status line.
    pub fn summary(&self) -> String {
        let mut s = format!(
            "Done: {} image{} processed",
            self.images_total,
            plural(self.images_total)
        );
        if self.images_failed > 0 {
            s.push_str(&format!(" ({} failed)", self.images_failed));
        }
        if self.images_unresolved > 0 {
            s.push_str(&format!(", {} without source", self.images_unresolved));
        }
        if self.attachments_total > 0 {
            s.push_str(&format!(
                ", {} attachment{} uploaded",
                self.attachments_uploaded,
                plural(self.attachments_uploaded)
            ));
            if self.attachments_failed > 0 {
                s.push_str(&format!(" ({} failed)", self.attachments_failed));
            }
        }
        s
    }
}

fn plural(n: usize) -> &'static str {
    if n == 1 {
        ""
    } else {
        "s"
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn summary_without_images() {
        assert_eq!(IngestStats::default().summary(), "Done: 0 images processed");
    }

    #[test]
    fn summary_with_failures_and_attachments() {
        let stats = IngestStats {
            images_total: 3,
            images_failed: 1,
            attachments_total: 2,
            attachments_uploaded: 1,
            attachments_failed: 1,
            ..Default::default()
        };
        assert_eq!(
            stats.summary(),
            "Done: 3 images processed (1 failed), 1 attachment uploaded (1 failed)"
        );
    }

    #[test]
    fn summary_mentions_unresolved() {
        let stats = IngestStats {
            images_total: 1,
            images_unresolved: 1,
            ..Default::default()
        };
        assert_eq!(stats.summary(), "Done: 1 image processed, 1 without source");
    }

    #[test]
    fn hosted_urls_lists_rehosted_only() {
        let output = IngestOutput {
            markdown: String::new(),
            status: String::new(),
            images: vec![
                ImageRecord {
                    index: 1,
                    source: Some("https://example.com/a.png".into()),
                    outcome: ImageOutcome::Passthrough {
                        url: "https://example.com/a.png".into(),
                    },
                },
                ImageRecord {
                    index: 2,
                    source: Some("blob:x".into()),
                    outcome: ImageOutcome::Rehosted {
                        url: "https://cdn/b.png".into(),
                    },
                },
            ],
            attachments: vec![ImageRecord {
                index: 1,
                source: None,
                outcome: ImageOutcome::Rehosted {
                    url: "https://cdn/c.png".into(),
                },
            }],
            stats: IngestStats::default(),
        };
        assert_eq!(output.hosted_urls(), vec!["https://cdn/b.png", "https://cdn/c.png"]);
    }

    #[test]
    fn outcome_serialises_with_kind_tag() {
        let json = serde_json::to_string(&ImageOutcome::Unresolved).unwrap();
        assert_eq!(json, r#"{"kind":"unresolved"}"#);
    }
}
