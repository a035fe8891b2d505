//! Resolution of source references (local paths or remote URLs) into
//! document bytes, backed by a durable cache for remote content.

pub mod cache;
pub mod fetch;

pub use cache::{cache_key, CacheStats, CacheStore, FsCache, MemoryCache};
pub use fetch::{looks_like_pdf, Fetch, Fetched, HttpFetcher};

use crate::config::Config;
use crate::error::{FetchError, Result};
use reqwest::Url;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::{debug, warn};

/// Where a resolved document came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Origin {
    Local,
    Cache,
    Network,
}

/// A locally readable source document.
#[derive(Debug, Clone)]
pub struct SourceDocument {
    pub reference: String,
    pub origin: Origin,
    pub bytes: Arc<Vec<u8>>,
}

/// Why a reference could not be resolved.
#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
pub enum Unavailable {
    #[error("no source reference")]
    Empty,
    #[error("file not found: {}", .0.display())]
    NotFound(PathBuf),
    #[error("could not read {}: {message}", .path.display())]
    Unreadable { path: PathBuf, message: String },
    #[error("unsupported reference scheme: {0}")]
    UnsupportedScheme(String),
    #[error(transparent)]
    Fetch(#[from] FetchError),
}

/// Outcome of resolving one reference. Failure is a value, not an error:
/// callers decide whether to skip.
#[derive(Debug, Clone)]
pub enum Resolution {
    Found(SourceDocument),
    Unavailable(Unavailable),
}

impl Resolution {
    pub fn found(&self) -> Option<&SourceDocument> {
        match self {
            Resolution::Found(doc) => Some(doc),
            Resolution::Unavailable(_) => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
enum Reference {
    Local(PathBuf),
    Remote(Url),
    Unsupported(String),
}

pub struct Resolver {
    document_root: PathBuf,
    cache: Arc<dyn CacheStore>,
    fetcher: Arc<dyn Fetch>,
}

impl Resolver {
    pub fn new<P: Into<PathBuf>>(
        document_root: P,
        cache: Arc<dyn CacheStore>,
        fetcher: Arc<dyn Fetch>,
    ) -> Self {
        Self {
            document_root: document_root.into(),
            cache,
            fetcher,
        }
    }

    /// Filesystem cache and HTTP fetcher as configured.
    pub fn from_config(config: &Config) -> Result<Self> {
        let fetcher = HttpFetcher::new(config.fetch_timeout, config.fetch_attempts)?;
        Ok(Self::new(
            &config.document_root,
            Arc::new(FsCache::new(&config.cache_dir)),
            Arc::new(fetcher),
        ))
    }

    fn classify(&self, reference: &str) -> Reference {
        match Url::parse(reference) {
            Ok(url) => match url.scheme() {
                "http" | "https" => Reference::Remote(url),
                "file" => match url.to_file_path() {
                    Ok(path) => Reference::Local(path),
                    Err(()) => Reference::Unsupported(reference.to_string()),
                },
                // Windows drive letters parse as one-letter schemes
                scheme if scheme.len() == 1 => Reference::Local(PathBuf::from(reference)),
                scheme => Reference::Unsupported(scheme.to_string()),
            },
            Err(_) => {
                let path = Path::new(reference);
                if path.is_absolute() {
                    Reference::Local(path.to_path_buf())
                } else {
                    Reference::Local(self.document_root.join(path))
                }
            }
        }
    }

    /// Resolve a reference to document bytes. Never fails; problems come back
    /// as [`Resolution::Unavailable`] with a logged diagnostic.
    pub async fn resolve(&self, reference: Option<&str>) -> Resolution {
        let Some(reference) = reference.map(str::trim).filter(|r| !r.is_empty()) else {
            return Resolution::Unavailable(Unavailable::Empty);
        };

        let outcome = match self.classify(reference) {
            Reference::Local(path) => self.read_local(reference, path).await,
            Reference::Remote(url) => self.resolve_remote(reference, url).await,
            Reference::Unsupported(scheme) => Err(Unavailable::UnsupportedScheme(scheme)),
        };

        match outcome {
            Ok(doc) => {
                debug!(reference, origin = ?doc.origin, bytes = doc.bytes.len(), "resolved source");
                Resolution::Found(doc)
            }
            Err(reason) => {
                warn!(reference, %reason, "source unavailable");
                Resolution::Unavailable(reason)
            }
        }
    }

    async fn read_local(
        &self,
        reference: &str,
        path: PathBuf,
    ) -> std::result::Result<SourceDocument, Unavailable> {
        if !path.is_file() {
            return Err(Unavailable::NotFound(path));
        }
        let bytes = tokio::fs::read(&path)
            .await
            .map_err(|e| Unavailable::Unreadable {
                path,
                message: e.to_string(),
            })?;
        Ok(SourceDocument {
            reference: reference.to_string(),
            origin: Origin::Local,
            bytes: Arc::new(bytes),
        })
    }

    async fn resolve_remote(
        &self,
        reference: &str,
        url: Url,
    ) -> std::result::Result<SourceDocument, Unavailable> {
        let key = cache_key(url.as_str());

        match self.cache_lookup(&key).await {
            Some(bytes) if looks_like_pdf(&bytes) => {
                return Ok(SourceDocument {
                    reference: reference.to_string(),
                    origin: Origin::Cache,
                    bytes: Arc::new(bytes),
                });
            }
            Some(_) => warn!(reference, %key, "ignoring cached entry that is not a PDF"),
            None => {}
        }

        let fetched = self.fetcher.fetch(&url).await?;
        if !looks_like_pdf(&fetched.bytes) {
            return Err(FetchError::NotPdf {
                url: url.to_string(),
                content_type: fetched.content_type,
            }
            .into());
        }

        let bytes = Arc::new(fetched.bytes);
        self.cache_store(&key, bytes.clone()).await;

        Ok(SourceDocument {
            reference: reference.to_string(),
            origin: Origin::Network,
            bytes,
        })
    }

    async fn cache_lookup(&self, key: &str) -> Option<Vec<u8>> {
        let cache = self.cache.clone();
        let key = key.to_string();
        match tokio::task::spawn_blocking(move || cache.get(&key)).await {
            Ok(Ok(hit)) => hit,
            Ok(Err(e)) => {
                warn!(error = %e, "cache read failed; treating as miss");
                None
            }
            Err(e) => {
                warn!(error = %e, "cache read task failed; treating as miss");
                None
            }
        }
    }

    async fn cache_store(&self, key: &str, bytes: Arc<Vec<u8>>) {
        let cache = self.cache.clone();
        let key = key.to_string();
        match tokio::task::spawn_blocking(move || cache.put(&key, &bytes)).await {
            Ok(Ok(())) => {}
            Ok(Err(e)) => warn!(error = %e, "cache write failed"),
            Err(e) => warn!(error = %e, "cache write task failed"),
        }
    }
}

#[cfg(test)]
pub(crate) mod testing {
    use super::*;
    use std::collections::HashMap;
    use std::sync::atomic::{AtomicUsize, Ordering};

    /// Serves canned bodies by URL and counts every call.
    #[derive(Default)]
    pub struct CountingFetcher {
        pub bodies: HashMap<String, Vec<u8>>,
        pub calls: AtomicUsize,
    }

    impl CountingFetcher {
        pub fn with(url: &str, body: Vec<u8>) -> Self {
            let mut fetcher = Self::default();
            fetcher.bodies.insert(url.to_string(), body);
            fetcher
        }

        pub fn calls(&self) -> usize {
            self.calls.load(Ordering::SeqCst)
        }
    }

    #[async_trait::async_trait]
    impl Fetch for CountingFetcher {
        async fn fetch(&self, url: &Url) -> std::result::Result<Fetched, FetchError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            match self.bodies.get(url.as_str()) {
                Some(bytes) => Ok(Fetched {
                    bytes: bytes.clone(),
                    content_type: Some("application/pdf".into()),
                }),
                None => Err(FetchError::Status {
                    url: url.to_string(),
                    status: 404,
                }),
            }
        }
    }
}
