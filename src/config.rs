//! Configuration types for clipboard ingestion.
//!
//! All pipeline behaviour is controlled through [`IngestConfig`], built via
//! its [`IngestConfigBuilder`]. Endpoints, host policy, limits and the
//! pluggable network seams all live in one struct so a config can be shared
//! across captures and logged as a whole.

use crate::error::Paste2MdError;
use crate::pipeline::resolve::ResourceResolver;
use crate::pipeline::upload::UploadClient;
use crate::progress::ProgressCallback;
use std::fmt;
use std::sync::Arc;

/// Hosts whose image URLs are short-lived or access-restricted and must be
/// fetched through the proxy before rehosting.
pub const DEFAULT_FLAGGED_HOSTS: &[&str] = &["googleusercontent.com", "docs.google.com"];

/// Configuration for a clipboard ingestion run.
///
/// Built via [`IngestConfig::builder()`] or using [`IngestConfig::default()`].
///
/// # Example
/// ```rust
/// use edgequake_paste2md::IngestConfig;
///
/// let config = IngestConfig::builder()
///     .base_url("https://cms.example.com/api")
///     .flagged_host("feishucdn.com")
///     .request_timeout_secs(15)
///     .build()
///     .unwrap();
/// assert_eq!(config.upload_endpoint(), "https://cms.example.com/api/upload");
/// ```
#[derive(Clone)]
pub struct IngestConfig {
    /// Base URL of the application backend hosting the upload service and the
    /// fetch proxy. Default: `http://127.0.0.1:8080`.
    pub base_url: String,

    /// Path of the upload endpoint, appended to `base_url`. Default: `/upload`.
    pub upload_path: String,

    /// Path of the fetch-proxy endpoint, appended to `base_url`. Default: `/proxy`.
    pub proxy_path: String,

    /// Name of the multipart field carrying the binary payload. Default: `file`.
    pub upload_field: String,

    /// Host suffixes routed through the fetch proxy.
    ///
    /// A host matches when it equals an entry or is a subdomain of it, so
    /// `googleusercontent.com` covers `lh3.googleusercontent.com` and
    /// `lh7-rt.googleusercontent.com`. Every other remote host is left pointing
    /// at its original location.
    pub flagged_hosts: Vec<String>,

    /// Timeout applied to every outbound request, in seconds. Default: 30.
    pub request_timeout_secs: u64,

    /// Largest resolved image accepted for rehosting, in bytes. Default: 20 MiB.
    pub max_image_bytes: usize,

    /// Run the whitespace/invisible-character tidy pass on the final text.
    /// Default: false (output is byte-exact).
    pub tidy_output: bool,

    /// Pre-constructed resolver. Takes precedence over the HTTP resolver
    /// built from `base_url` / `proxy_path`.
    pub resolver: Option<Arc<dyn ResourceResolver>>,

    /// Pre-constructed upload client. Takes precedence over the HTTP client
    /// built from `base_url` / `upload_path`.
    pub uploader: Option<Arc<dyn UploadClient>>,

    /// Receives state transitions, status lines and per-image events.
    pub progress_callback: Option<ProgressCallback>,
}

impl Default for IngestConfig {
    fn default() -> Self {
        Self {
            base_url: "http://127.0.0.1:8080".to_string(),
            upload_path: "/upload".to_string(),
            proxy_path: "/proxy".to_string(),
            upload_field: "file".to_string(),
            flagged_hosts: DEFAULT_FLAGGED_HOSTS.iter().map(|h| h.to_string()).collect(),
            request_timeout_secs: 30,
            max_image_bytes: 20 * 1024 * 1024,
            tidy_output: false,
            resolver: None,
            uploader: None,
            progress_callback: None,
        }
    }
}

impl fmt::Debug for IngestConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("IngestConfig")
            .field("base_url", &self.base_url)
            .field("upload_path", &self.upload_path)
            .field("proxy_path", &self.proxy_path)
            .field("upload_field", &self.upload_field)
            .field("flagged_hosts", &self.flagged_hosts)
            .field("request_timeout_secs", &self.request_timeout_secs)
            .field("max_image_bytes", &self.max_image_bytes)
            .field("tidy_output", &self.tidy_output)
            .field("resolver", &self.resolver.as_ref().map(|_| "<dyn ResourceResolver>"))
            .field("uploader", &self.uploader.as_ref().map(|_| "<dyn UploadClient>"))
            .field(
                "progress_callback",
                &self.progress_callback.as_ref().map(|_| "<dyn IngestProgressCallback>"),
            )
            .finish()
    }
}

impl IngestConfig {
    /// Create a new builder for `IngestConfig`.
    pub fn builder() -> IngestConfigBuilder {
        IngestConfigBuilder {
            config: Self::default(),
        }
    }

    /// Full URL of the upload endpoint.
    pub fn upload_endpoint(&self) -> String {
        join_endpoint(&self.base_url, &self.upload_path)
    }

    /// Full URL of the fetch-proxy endpoint (without the `url` query).
    pub fn proxy_endpoint(&self) -> String {
        join_endpoint(&self.base_url, &self.proxy_path)
    }
}

fn join_endpoint(base: &str, path: &str) -> String {
    let base = base.trim_end_matches('/');
    if path.is_empty() {
        base.to_string()
    } else if path.starts_with('/') {
        format!("{base}{path}")
    } else {
        format!("{base}/{path}")
    }
}

/// Builder for [`IngestConfig`].
#[derive(Debug)]
pub struct IngestConfigBuilder {
    config: IngestConfig,
}

impl IngestConfigBuilder {
    pub fn base_url(mut self, url: impl Into<String>) -> Self {
        self.config.base_url = url.into();
        self
    }

    pub fn upload_path(mut self, path: impl Into<String>) -> Self {
        self.config.upload_path = path.into();
        self
    }

    pub fn proxy_path(mut self, path: impl Into<String>) -> Self {
        self.config.proxy_path = path.into();
        self
    }

    pub fn upload_field(mut self, name: impl Into<String>) -> Self {
        self.config.upload_field = name.into();
        self
    }

    /// Replace the flagged-host list entirely.
    pub fn flagged_hosts<I, S>(mut self, hosts: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.config.flagged_hosts = hosts.into_iter().map(Into::into).collect();
        self
    }

    /// Add one host to the flagged-host list.
    pub fn flagged_host(mut self, host: impl Into<String>) -> Self {
        let host = host.into().trim().trim_start_matches('.').to_ascii_lowercase();
        if !host.is_empty() && !self.config.flagged_hosts.contains(&host) {
            self.config.flagged_hosts.push(host);
        }
        self
    }

    pub fn request_timeout_secs(mut self, secs: u64) -> Self {
        self.config.request_timeout_secs = secs.max(1);
        self
    }

    pub fn max_image_bytes(mut self, bytes: usize) -> Self {
        self.config.max_image_bytes = bytes.max(1);
        self
    }

    pub fn tidy_output(mut self, v: bool) -> Self {
        self.config.tidy_output = v;
        self
    }

    pub fn resolver(mut self, resolver: Arc<dyn ResourceResolver>) -> Self {
        self.config.resolver = Some(resolver);
        self
    }

    pub fn uploader(mut self, uploader: Arc<dyn UploadClient>) -> Self {
        self.config.uploader = Some(uploader);
        self
    }

    pub fn progress_callback(mut self, cb: ProgressCallback) -> Self {
        self.config.progress_callback = Some(cb);
        self
    }

    /// Build the configuration, validating constraints.
    pub fn build(mut self) -> Result<IngestConfig, Paste2MdError> {
        let c = &mut self.config;
        c.flagged_hosts = c
            .flagged_hosts
            .iter()
            .map(|h| h.trim().trim_start_matches('.').to_ascii_lowercase())
            .filter(|h| !h.is_empty())
            .collect();

        match reqwest::Url::parse(&c.base_url) {
            Ok(url) if url.scheme() == "http" || url.scheme() == "https" => {}
            Ok(url) => {
                return Err(Paste2MdError::InvalidConfig(format!(
                    "base_url must be http or https, got scheme '{}'",
                    url.scheme()
                )));
            }
            Err(e) => {
                return Err(Paste2MdError::InvalidConfig(format!(
                    "base_url '{}' is not a valid URL: {}",
                    c.base_url, e
                )));
            }
        }
        if c.upload_field.trim().is_empty() {
            return Err(Paste2MdError::InvalidConfig(
                "upload_field must not be empty".into(),
            ));
        }
        if c.request_timeout_secs == 0 {
            return Err(Paste2MdError::InvalidConfig(
                "request_timeout_secs must be ≥ 1".into(),
            ));
        }
        Ok(self.config)
    }
}
