//! Raw attachment ingestion.
//!
//! Files pasted alongside (or instead of) rich content are uploaded in
//! payload order. Each upload that succeeds appends an image block to the
//! document suffix; failures and non-image attachments leave no trace in the
//! text.

use crate::markers::attachment_block;
use crate::output::{ImageOutcome, ImageRecord};
use crate::payload::Attachment;
use crate::pipeline::upload::UploadClient;
use crate::progress::IngestProgressCallback;
use tracing::{debug, warn};

/// Upload every image attachment and build the suffix that goes after all
/// compiled content.
pub async fn ingest_attachments(
    attachments: &[Attachment],
    uploader: &dyn UploadClient,
    progress: Option<&dyn IngestProgressCallback>,
) -> (String, Vec<ImageRecord>) {
    let total = attachments.len();
    let mut suffix = String::new();
    let mut records = Vec::with_capacity(total);

    for (i, attachment) in attachments.iter().enumerate() {
        let index = i + 1;

        if !attachment.is_image() {
            debug!("Skipping non-image attachment {} ({})", index, attachment.mime);
            records.push(ImageRecord {
                index,
                source: None,
                outcome: ImageOutcome::Skipped {
                    mime: attachment.mime.clone(),
                },
            });
            continue;
        }

        if let Some(cb) = progress {
            cb.on_image_start(index, total);
            cb.on_status(&format!("Uploading attachment {index}/{total}"));
        }

        let outcome = match uploader.upload(attachment.data.clone()).await {
            Ok(url) if !url.trim().is_empty() => {
                suffix.push_str(&attachment_block(&url));
                if let Some(cb) = progress {
                    cb.on_image_complete(index, total, &url);
                }
                ImageOutcome::Rehosted { url }
            }
            result => {
                let error = match result {
                    Err(e) => e,
                    Ok(_) => crate::error::ImageError::UploadFailed {
                        detail: "upload returned an empty url".to_string(),
                    },
                };
                warn!("Attachment {}/{} upload failed: {}", index, total, error);
                if let Some(cb) = progress {
                    cb.on_image_error(index, total, &error.to_string());
                }
                ImageOutcome::Failed { error }
            }
        };

        records.push(ImageRecord {
            index,
            source: None,
            outcome,
        });
    }

    (suffix, records)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ImageError;
    use async_trait::async_trait;
    use std::sync::atomic::{AtomicUsize, Ordering};

    /// Fails every call whose payload starts with `0xFF`.
    #[derive(Default)]
    struct MockUploader {
        calls: AtomicUsize,
    }

    #[async_trait]
    impl UploadClient for MockUploader {
        async fn upload(&self, payload: Vec<u8>) -> Result<String, ImageError> {
            let n = self.calls.fetch_add(1, Ordering::SeqCst) + 1;
            if payload.first() == Some(&0xFF) {
                return Err(ImageError::UploadFailed {
                    detail: "HTTP 500".into(),
                });
            }
            Ok(format!("https://cdn/{n}.png"))
        }
    }

    #[tokio::test]
    async fn uploads_images_in_order() {
        let uploader = MockUploader::default();
        let attachments = vec![
            Attachment::new("image/png", vec![1u8]),
            Attachment::new("image/jpeg", vec![2u8]),
        ];
        let (suffix, records) = ingest_attachments(&attachments, &uploader, None).await;

        assert_eq!(
            suffix,
            "\n\n![图片](https://cdn/1.png)\n\n\n\n![图片](https://cdn/2.png)\n\n"
        );
        assert_eq!(records.len(), 2);
    }

    #[tokio::test]
    async fn failures_and_non_images_are_skipped() {
        let uploader = MockUploader::default();
        let attachments = vec![
            Attachment::new("application/pdf", vec![1u8]),
            Attachment::new("image/png", vec![0xFFu8]),
            Attachment::new("IMAGE/GIF; charset=binary", vec![3u8]),
        ];
        let (suffix, records) = ingest_attachments(&attachments, &uploader, None).await;

        assert_eq!(suffix, "\n\n![图片](https://cdn/2.png)\n\n");
        assert_eq!(uploader.calls.load(Ordering::SeqCst), 2);
        assert_eq!(
            records[0].outcome,
            ImageOutcome::Skipped {
                mime: "application/pdf".into()
            }
        );
        assert!(matches!(records[1].outcome, ImageOutcome::Failed { .. }));
        assert!(matches!(records[2].outcome, ImageOutcome::Rehosted { .. }));
    }

    #[tokio::test]
    async fn no_attachments_no_suffix() {
        let uploader = MockUploader::default();
        let (suffix, records) = ingest_attachments(&[], &uploader, None).await;
        assert!(suffix.is_empty());
        assert!(records.is_empty());
    }
}
