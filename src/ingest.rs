//! Ingestion entry points: run one capture through the state machine.
//!
//! ```text
//! Idle → Capturing → (Compiling → ResolvingImages) | PlainTextFallback
//!      → IngestingAttachments → Done
//! ```
//!
//! Running a capture never fails. Every image-level problem degrades the
//! document (failure marker, skipped attachment, leftover token) and is
//! recorded in [`IngestOutput`]; only setup (HTTP client, input files, output
//! file) returns [`Paste2MdError`].
//!
//! ## Overlapping captures
//!
//! An [`Ingestor`] runs one capture at a time. A second call to
//! [`Ingestor::ingest`] waits on an async mutex until the first reaches
//! `Done`, so two pastes into the same document cannot interleave their
//! placeholder substitutions. Separate `Ingestor` instances are independent.

use crate::config::IngestConfig;
use crate::dom::parse_fragment;
use crate::error::Paste2MdError;
use crate::output::{ImageOutcome, ImageRecord, IngestOutput, IngestStats};
use crate::payload::PastePayload;
use crate::pipeline::attachments::ingest_attachments;
use crate::pipeline::compile::compile;
use crate::pipeline::input::{load_payload, PayloadFiles};
use crate::pipeline::placeholders::{resolve_placeholders, ResolutionContext};
use crate::pipeline::postprocess::tidy_markdown;
use crate::pipeline::resolve::{HttpResourceResolver, ResourceResolver};
use crate::pipeline::upload::{HttpUploadClient, UploadClient};
use crate::progress::{IngestProgressCallback, IngestState};
use std::path::Path;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::sync::Mutex;
use tracing::{debug, info};

/// A configured ingestion pipeline.
///
/// Holds the resolver and upload client for its lifetime; construct once and
/// reuse across captures.
pub struct Ingestor {
    config: IngestConfig,
    resolver: Arc<dyn ResourceResolver>,
    uploader: Arc<dyn UploadClient>,
    gate: Mutex<()>,
}

impl Ingestor {
    /// Build the pipeline.
    ///
    /// Injected `config.resolver` / `config.uploader` are used as-is; the HTTP
    /// implementations fill whatever is missing, sharing one `reqwest::Client`
    /// with the configured timeout.
    pub fn new(config: IngestConfig) -> Result<Self, Paste2MdError> {
        let client = match (&config.resolver, &config.uploader) {
            (Some(_), Some(_)) => None,
            _ => Some(
                reqwest::Client::builder()
                    .timeout(Duration::from_secs(config.request_timeout_secs))
                    .build()
                    .map_err(|e| Paste2MdError::HttpClient(e.to_string()))?,
            ),
        };

        let resolver: Arc<dyn ResourceResolver> = match (&config.resolver, &client) {
            (Some(r), _) => Arc::clone(r),
            (None, Some(c)) => Arc::new(HttpResourceResolver::new(c.clone(), &config)),
            (None, None) => {
                return Err(Paste2MdError::Internal("no HTTP client for resolver".into()))
            }
        };
        let uploader: Arc<dyn UploadClient> = match (&config.uploader, &client) {
            (Some(u), _) => Arc::clone(u),
            (None, Some(c)) => Arc::new(HttpUploadClient::new(c.clone(), &config)),
            (None, None) => {
                return Err(Paste2MdError::Internal("no HTTP client for uploader".into()))
            }
        };

        debug!("Ingestor ready: {:?}", config);
        Ok(Self {
            config,
            resolver,
            uploader,
            gate: Mutex::new(()),
        })
    }

    pub fn config(&self) -> &IngestConfig {
        &self.config
    }

    /// Run one capture to completion.
    pub async fn ingest(&self, payload: &PastePayload) -> IngestOutput {
        let _capture = self.gate.lock().await;
        let start = Instant::now();
        let progress = self.config.progress_callback.as_deref();
        let mut stats = IngestStats::default();

        enter(progress, IngestState::Capturing);
        info!(
            "Capture: html={}, text={}, {} attachments",
            payload.rich_fragment().is_some(),
            payload.text.is_some(),
            payload.attachments.len()
        );

        let (primary, images) = match payload.rich_fragment() {
            Some(html) => {
                stats.used_rich_fragment = true;
                self.run_rich(html, payload, progress).await
            }
            None => {
                enter(progress, IngestState::PlainTextFallback);
                let text = payload.text.clone().unwrap_or_default();
                debug!("Plain-text fallback: {} chars", text.chars().count());
                (text, Vec::new())
            }
        };

        enter(progress, IngestState::IngestingAttachments);
        let (suffix, attachments) =
            ingest_attachments(&payload.attachments, self.uploader.as_ref(), progress).await;

        let mut markdown = primary;
        markdown.push_str(&suffix);
        if self.config.tidy_output {
            markdown = tidy_markdown(&markdown);
        }

        tally(&mut stats, &images, &attachments);
        stats.total_duration_ms = start.elapsed().as_millis() as u64;
        let status = stats.summary();

        enter(progress, IngestState::Done);
        if let Some(cb) = progress {
            cb.on_status(&status);
            cb.on_ingest_complete(&stats);
        }
        info!("{} in {}ms", status, stats.total_duration_ms);

        IngestOutput {
            markdown,
            status,
            images,
            attachments,
            stats,
        }
    }

    async fn run_rich(
        &self,
        html: &str,
        payload: &PastePayload,
        progress: Option<&dyn IngestProgressCallback>,
    ) -> (String, Vec<ImageRecord>) {
        enter(progress, IngestState::Compiling);
        let root = parse_fragment(html);
        let compiled = compile(&root);
        debug!(
            "Compiled {} chars, {} image placeholders",
            compiled.text.len(),
            compiled.placeholders.len()
        );

        enter(progress, IngestState::ResolvingImages);
        let ctx = ResolutionContext {
            resolver: self.resolver.as_ref(),
            uploader: self.uploader.as_ref(),
            flagged_hosts: &self.config.flagged_hosts,
            session_objects: &payload.session_objects,
            progress,
        };
        resolve_placeholders(compiled.text, &compiled.placeholders, &ctx).await
    }
}

fn enter(progress: Option<&dyn IngestProgressCallback>, state: IngestState) {
    debug!("State → {}", state);
    if let Some(cb) = progress {
        cb.on_state_change(state);
    }
}

fn tally(stats: &mut IngestStats, images: &[ImageRecord], attachments: &[ImageRecord]) {
    stats.images_total = images.len();
    for record in images {
        match record.outcome {
            ImageOutcome::Rehosted { .. } => stats.images_rehosted += 1,
            ImageOutcome::Passthrough { .. } => stats.images_passthrough += 1,
            ImageOutcome::Failed { .. } => stats.images_failed += 1,
            ImageOutcome::Unresolved => stats.images_unresolved += 1,
            ImageOutcome::Skipped { .. } => {}
        }
    }

    stats.attachments_total = attachments.len();
    for record in attachments {
        match record.outcome {
            ImageOutcome::Rehosted { .. } => stats.attachments_uploaded += 1,
            ImageOutcome::Failed { .. } => stats.attachments_failed += 1,
            ImageOutcome::Skipped { .. } => stats.attachments_skipped += 1,
            ImageOutcome::Passthrough { .. } | ImageOutcome::Unresolved => {}
        }
    }
}

/// Ingest one capture with a throwaway [`Ingestor`].
///
/// # Errors
/// Only when the pipeline cannot be built (see [`Ingestor::new`]).
pub async fn ingest(
    payload: &PastePayload,
    config: &IngestConfig,
) -> Result<IngestOutput, Paste2MdError> {
    let ingestor = Ingestor::new(config.clone())?;
    Ok(ingestor.ingest(payload).await)
}

/// Synchronous wrapper around [`ingest`].
///
/// Creates a temporary tokio runtime internally.
pub fn ingest_sync(
    payload: &PastePayload,
    config: &IngestConfig,
) -> Result<IngestOutput, Paste2MdError> {
    tokio::runtime::Runtime::new()
        .map_err(|e| Paste2MdError::Internal(format!("Failed to create tokio runtime: {}", e)))?
        .block_on(ingest(payload, config))
}

/// Load a capture from files, ingest it and write the Markdown to
/// `output_path`.
///
/// Uses atomic write (temp file + rename) to prevent partial files.
pub async fn ingest_to_file(
    files: &PayloadFiles,
    output_path: impl AsRef<Path>,
    config: &IngestConfig,
) -> Result<IngestOutput, Paste2MdError> {
    let payload = load_payload(files).await?;
    let output = ingest(&payload, config).await?;
    write_atomic(output_path.as_ref(), &output.markdown).await?;
    Ok(output)
}

/// Write `contents` to `path` via a sibling temp file and rename.
pub async fn write_atomic(path: &Path, contents: &str) -> Result<(), Paste2MdError> {
    let write_err = |e| Paste2MdError::OutputWriteFailed {
        path: path.to_path_buf(),
        source: e,
    };

    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        tokio::fs::create_dir_all(parent).await.map_err(write_err)?;
    }

    let tmp_path = path.with_extension("md.tmp");
    tokio::fs::write(&tmp_path, contents)
        .await
        .map_err(write_err)?;
    tokio::fs::rename(&tmp_path, path).await.map_err(write_err)?;

    info!("Wrote {}", path.display());
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ImageError;
    use crate::payload::Attachment;
    use crate::pipeline::locator::ResourceLocator;
    use async_trait::async_trait;
    use std::collections::HashMap;
    use std::sync::Mutex as StdMutex;

    struct EchoResolver;

    #[async_trait]
    impl ResourceResolver for EchoResolver {
        async fn resolve(
            &self,
            locator: &ResourceLocator,
            _session: &HashMap<String, Attachment>,
        ) -> Result<Vec<u8>, ImageError> {
            Ok(locator.raw.as_bytes().to_vec())
        }
    }

    struct FixedUploader(&'static str);

    #[async_trait]
    impl UploadClient for FixedUploader {
        async fn upload(&self, _payload: Vec<u8>) -> Result<String, ImageError> {
            Ok(self.0.to_string())
        }
    }

    #[derive(Default)]
    struct StateLog(StdMutex<Vec<IngestState>>);

    impl IngestProgressCallback for StateLog {
        fn on_state_change(&self, state: IngestState) {
            self.0.lock().unwrap().push(state);
        }
    }

    fn ingestor(progress: Option<Arc<StateLog>>) -> Ingestor {
        let mut builder = IngestConfig::builder()
            .resolver(Arc::new(EchoResolver))
            .uploader(Arc::new(FixedUploader("https://cdn/x.png")));
        if let Some(p) = progress {
            builder = builder.progress_callback(p);
        }
        Ingestor::new(builder.build().unwrap()).unwrap()
    }

    #[tokio::test]
    async fn rich_path_visits_compile_and_resolve() {
        let log = Arc::new(StateLog::default());
        let output = ingestor(Some(Arc::clone(&log)))
            .ingest(&PastePayload::from_html("<p>a</p>").with_text("ignored"))
            .await;

        assert_eq!(output.markdown, "a\n\n");
        assert!(output.stats.used_rich_fragment);
        assert_eq!(
            *log.0.lock().unwrap(),
            vec![
                IngestState::Capturing,
                IngestState::Compiling,
                IngestState::ResolvingImages,
                IngestState::IngestingAttachments,
                IngestState::Done,
            ]
        );
    }

    #[tokio::test]
    async fn blank_html_falls_back_to_text() {
        let log = Arc::new(StateLog::default());
        let output = ingestor(Some(Arc::clone(&log)))
            .ingest(&PastePayload::from_html("  \n").with_text("plain"))
            .await;

        assert_eq!(output.markdown, "plain");
        assert!(!output.stats.used_rich_fragment);
        assert!(log.0.lock().unwrap().contains(&IngestState::PlainTextFallback));
        assert!(!log.0.lock().unwrap().contains(&IngestState::Idle));
    }

    #[tokio::test]
    async fn empty_payload_is_empty_document() {
        let output = ingestor(None).ingest(&PastePayload::default()).await;
        assert_eq!(output.markdown, "");
        assert_eq!(output.status, "Done: 0 images processed");
    }

    #[tokio::test]
    async fn status_and_stats_count_outcomes() {
        let payload = PastePayload::from_html(
            r#"<img src="blob:a"><img src="https://example.com/b.png"><img src="">"#,
        )
        .with_attachment(Attachment::new("image/png", vec![1u8]))
        .with_attachment(Attachment::new("text/plain", vec![2u8]));

        let output = ingestor(None).ingest(&payload).await;
        assert_eq!(output.stats.images_total, 3);
        assert_eq!(output.stats.images_rehosted, 1);
        assert_eq!(output.stats.images_passthrough, 1);
        assert_eq!(output.stats.images_unresolved, 1);
        assert_eq!(output.stats.attachments_uploaded, 1);
        assert_eq!(output.stats.attachments_skipped, 1);
        assert_eq!(
            output.status,
            "Done: 3 images processed, 1 without source, 1 attachment uploaded"
        );
        assert_eq!(
            output.hosted_urls(),
            vec!["https://cdn/x.png", "https://cdn/x.png"]
        );
    }

    #[tokio::test]
    async fn tidy_output_is_opt_in() {
        let config = IngestConfig::builder()
            .resolver(Arc::new(EchoResolver))
            .uploader(Arc::new(FixedUploader("https://cdn/x.png")))
            .tidy_output(true)
            .build()
            .unwrap();
        let output = ingest(&PastePayload::from_text("a \r\n\r\n\r\nb"), &config)
            .await
            .unwrap();
        assert_eq!(output.markdown, "a\n\nb\n");
    }

    #[test]
    fn sync_wrapper_runs_pipeline() {
        let config = IngestConfig::builder()
            .resolver(Arc::new(EchoResolver))
            .uploader(Arc::new(FixedUploader("https://cdn/x.png")))
            .build()
            .unwrap();
        let output = ingest_sync(&PastePayload::from_text("hello"), &config).unwrap();
        assert_eq!(output.markdown, "hello");
    }

    #[tokio::test]
    async fn writes_output_atomically() {
        let dir = tempfile::tempdir().unwrap();
        let text = dir.path().join("clip.txt");
        std::fs::write(&text, "hello").unwrap();
        let out = dir.path().join("nested").join("doc.md");

        let config = IngestConfig::builder()
            .resolver(Arc::new(EchoResolver))
            .uploader(Arc::new(FixedUploader("https://cdn/x.png")))
            .build()
            .unwrap();
        let files = PayloadFiles {
            text: Some(text),
            ..Default::default()
        };
        ingest_to_file(&files, &out, &config).await.unwrap();

        assert_eq!(std::fs::read_to_string(&out).unwrap(), "hello");
        assert!(!out.with_extension("md.tmp").exists());
    }
}
