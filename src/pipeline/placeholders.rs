//! Placeholder resolution pass: swap each pending-image token for its final
//! reference.
//!
//! Placeholders are handled strictly one at a time in document order. Each
//! one ends up as exactly one of:
//!
//! - `![图片](<hosted url>)` after a successful resolve + upload;
//! - `![图片](<original>)` for a generic remote image (no network calls);
//! - `![图片加载失败](<original>)` when resolution or upload failed;
//! - the untouched token, when the image node carried no source at all.
//!
//! Replacements are spliced in at each placeholder's recorded span, never
//! found by searching, so token-shaped text in the paste or inside a failed
//! image's original locator stays as it was.

use crate::dom::DocumentNode;
use crate::error::{short_locator, ImageError};
use crate::markers::{failure_marker, image_ref};
use crate::output::{ImageOutcome, ImageRecord};
use crate::payload::Attachment;
use crate::pipeline::compile::ImagePlaceholder;
use crate::pipeline::locator::ResourceLocator;
use crate::pipeline::resolve::ResourceResolver;
use crate::pipeline::upload::UploadClient;
use crate::progress::IngestProgressCallback;
use std::collections::HashMap;
use tracing::{debug, warn};

/// Everything the pass needs besides the text and the placeholders.
pub struct ResolutionContext<'a> {
    pub resolver: &'a dyn ResourceResolver,
    pub uploader: &'a dyn UploadClient,
    pub flagged_hosts: &'a [String],
    pub session_objects: &'a HashMap<String, Attachment>,
    pub progress: Option<&'a dyn IngestProgressCallback>,
}

/// Run the pass over `text`, returning the rewritten text and one record per
/// placeholder.
pub async fn resolve_placeholders<N: DocumentNode + Sync>(
    text: String,
    placeholders: &[ImagePlaceholder<'_, N>],
    ctx: &ResolutionContext<'_>,
) -> (String, Vec<ImageRecord>) {
    let total = placeholders.len();
    let mut out = String::with_capacity(text.len());
    let mut cursor = 0;
    let mut records = Vec::with_capacity(total);

    for placeholder in placeholders {
        let index = placeholder.index;
        if let Some(cb) = ctx.progress {
            cb.on_image_start(index, total);
            cb.on_status(&format!("Processing image {index}/{total}"));
        }

        let span = placeholder.span.clone();
        if span.start < cursor || text.get(span.clone()) != Some(placeholder.token.as_str()) {
            warn!(
                "Image {}/{} has a stale span {:?}; leaving text untouched",
                index, total, span
            );
            if let Some(cb) = ctx.progress {
                cb.on_image_error(index, total, "placeholder not found at its span");
            }
            records.push(ImageRecord {
                index,
                source: None,
                outcome: ImageOutcome::Unresolved,
            });
            continue;
        }
        // Everything before this token is final; the token itself is copied
        // along with the next segment unless it gets replaced below.
        out.push_str(&text[cursor..span.start]);
        cursor = span.start;

        let Some(source) = effective_source(placeholder.node) else {
            warn!(
                "Image {}/{} has no source; leaving {} in place",
                index, total, placeholder.token
            );
            if let Some(cb) = ctx.progress {
                cb.on_image_error(index, total, "image has no source");
            }
            records.push(ImageRecord {
                index,
                source: None,
                outcome: ImageOutcome::Unresolved,
            });
            continue;
        };

        let locator = ResourceLocator::classify(source, ctx.flagged_hosts);
        let outcome = rehost(&locator, ctx).await;

        let replacement = match &outcome {
            ImageOutcome::Rehosted { url } | ImageOutcome::Passthrough { url } => {
                if let Some(cb) = ctx.progress {
                    cb.on_image_complete(index, total, url);
                }
                image_ref(url)
            }
            ImageOutcome::Failed { error } => {
                warn!("Image {}/{} failed: {}", index, total, error);
                if let Some(cb) = ctx.progress {
                    cb.on_image_error(index, total, &error.to_string());
                }
                failure_marker(&locator.raw)
            }
            // `rehost` only yields the three outcomes above.
            ImageOutcome::Unresolved | ImageOutcome::Skipped { .. } => continue,
        };

        out.push_str(&replacement);
        cursor = span.end;
        records.push(ImageRecord {
            index,
            source: Some(locator.raw),
            outcome,
        });
    }

    out.push_str(&text[cursor..]);
    (out, records)
}

async fn rehost(locator: &ResourceLocator, ctx: &ResolutionContext<'_>) -> ImageOutcome {
    if !locator.class.requires_resolution() {
        debug!("Passthrough: {}", short_locator(&locator.raw));
        return ImageOutcome::Passthrough {
            url: locator.raw.clone(),
        };
    }

    debug!(
        "Rehosting {:?} locator: {}",
        locator.class,
        short_locator(&locator.raw)
    );
    let result = match ctx.resolver.resolve(locator, ctx.session_objects).await {
        Ok(bytes) => ctx.uploader.upload(bytes).await,
        Err(e) => Err(e),
    };

    match result {
        Ok(url) if !url.trim().is_empty() => ImageOutcome::Rehosted { url },
        Ok(_) => ImageOutcome::Failed {
            error: ImageError::UploadFailed {
                detail: "upload returned an empty url".to_string(),
            },
        },
        Err(error) => ImageOutcome::Failed { error },
    }
}

/// `src`, falling back to lazy-load `data-src`; `None` when both are blank.
fn effective_source<N: DocumentNode>(node: &N) -> Option<String> {
    ["src", "data-src"]
        .iter()
        .filter_map(|name| node.attribute(name))
        .map(str::trim)
        .find(|v| !v.is_empty())
        .map(str::to_string)
}
