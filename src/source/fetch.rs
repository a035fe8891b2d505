use crate::error::{Error, FetchError, Result};
use std::time::Duration;

/// A fetched response body with the bits needed to validate it.
#[derive(Debug, Clone)]
pub struct Fetched {
    pub bytes: Vec<u8>,
    pub content_type: Option<String>,
}

/// Network access for remote references. Implementations must honor their
/// own timeout; the resolver never waits on them indefinitely.
#[async_trait::async_trait]
pub trait Fetch: Send + Sync {
    async fn fetch(&self, url: &reqwest::Url) -> std::result::Result<Fetched, FetchError>;
}

/// `reqwest`-backed fetcher with a per-attempt timeout and bounded retries.
#[derive(Debug, Clone)]
pub struct HttpFetcher {
    client: reqwest::Client,
    attempts: u32,
    backoff: Duration,
}

impl HttpFetcher {
    pub fn new(timeout: Duration, attempts: u32) -> Result<Self> {
        let client = reqwest::Client::builder()
            .user_agent(concat!("mintset/", env!("CARGO_PKG_VERSION")))
            .redirect(reqwest::redirect::Policy::limited(10))
            .connect_timeout(timeout.min(Duration::from_secs(10)))
            .timeout(timeout)
            .build()
            .map_err(|e| Error::Config(format!("http client: {e}")))?;
        Ok(Self {
            client,
            attempts: attempts.max(1),
            backoff: Duration::from_millis(250),
        })
    }

    async fn fetch_once(&self, url: &reqwest::Url) -> std::result::Result<Fetched, FetchError> {
        let resp = self
            .client
            .get(url.clone())
            .send()
            .await
            .map_err(|e| transport_error(url, e))?;

        let status = resp.status().as_u16();
        if status != 200 {
            return Err(FetchError::Status {
                url: url.to_string(),
                status,
            });
        }

        let content_type = resp
            .headers()
            .get(reqwest::header::CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .map(|s| s.to_string());
        let bytes = resp.bytes().await.map_err(|e| transport_error(url, e))?;

        Ok(Fetched {
            bytes: bytes.to_vec(),
            content_type,
        })
    }
}

#[async_trait::async_trait]
impl Fetch for HttpFetcher {
    async fn fetch(&self, url: &reqwest::Url) -> std::result::Result<Fetched, FetchError> {
        let mut attempt = 1;
        loop {
            match self.fetch_once(url).await {
                Ok(fetched) => return Ok(fetched),
                Err(e) if attempt < self.attempts && is_retryable(&e) => {
                    let delay = self.backoff * 2u32.pow(attempt - 1);
                    tracing::debug!(%url, attempt, error = %e, ?delay, "retrying fetch");
                    tokio::time::sleep(delay).await;
                    attempt += 1;
                }
                Err(e) => return Err(e),
            }
        }
    }
}

fn transport_error(url: &reqwest::Url, e: reqwest::Error) -> FetchError {
    if e.is_timeout() {
        FetchError::Timeout {
            url: url.to_string(),
        }
    } else {
        FetchError::Transport {
            url: url.to_string(),
            message: e.to_string(),
        }
    }
}

/// Timeouts, connection failures and 5xx/429 are worth another attempt; the rest aren't.
fn is_retryable(e: &FetchError) -> bool {
    match e {
        FetchError::Timeout { .. } | FetchError::Transport { .. } => true,
        FetchError::Status { status, .. } => *status == 429 || *status >= 500,
        FetchError::NotPdf { .. } => false,
    }
}

/// True when `bytes` carries the `%PDF-` header within its first KiB.
pub fn looks_like_pdf(bytes: &[u8]) -> bool {
    let head = &bytes[..bytes.len().min(1024)];
    head.windows(5).any(|w| w == b"%PDF-")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_looks_like_pdf() {
        assert!(looks_like_pdf(b"%PDF-1.7\n..."));
        assert!(looks_like_pdf(b"\xef\xbb\xbf%PDF-1.4"));
        assert!(!looks_like_pdf(b"<html>not a pdf</html>"));
        assert!(!looks_like_pdf(b""));

        let mut late = vec![b' '; 2048];
        late.extend_from_slice(b"%PDF-1.4");
        assert!(!looks_like_pdf(&late));
    }

    #[test]
    fn test_retry_policy() {
        let url = "https://example.com/a.pdf".to_string();
        assert!(is_retryable(&FetchError::Timeout { url: url.clone() }));
        assert!(is_retryable(&FetchError::Status {
            url: url.clone(),
            status: 503
        }));
        assert!(!is_retryable(&FetchError::Status {
            url: url.clone(),
            status: 404
        }));
        assert!(!is_retryable(&FetchError::NotPdf {
            url,
            content_type: Some("text/html".into())
        }));
    }

    #[tokio::test]
    async fn test_unreachable_host_fails_without_panicking() {
        let fetcher = HttpFetcher::new(Duration::from_millis(500), 1).unwrap();
        // port 9 (discard) on localhost is closed in test environments
        let url = reqwest::Url::parse("http://127.0.0.1:9/missing.pdf").unwrap();
        let err = fetcher.fetch(&url).await.unwrap_err();
        assert!(matches!(
            err,
            FetchError::Transport { .. } | FetchError::Timeout { .. } | FetchError::Status { .. }
        ));
    }
}
