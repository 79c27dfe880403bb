use crate::api::error::AppError;
use crate::config::ConfigStore;
use async_trait::async_trait;
use bytes::{Bytes, BytesMut};
use std::time::Duration;
use url::Url;

/// Retrieves edited documents from the document server's cache.
#[async_trait]
pub trait DocumentFetcher: Send + Sync {
    /// Fetch `url`, failing with `Upstream` once the body exceeds `max_bytes`.
    async fn fetch(&self, url: &str, max_bytes: usize) -> Result<Bytes, AppError>;
}

pub struct HttpDocumentFetcher {
    client: reqwest::Client,
}

impl HttpDocumentFetcher {
    pub fn new(timeout: Duration) -> Result<Self, AppError> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| AppError::Internal(format!("Failed to build HTTP client: {}", e)))?;
        Ok(Self { client })
    }

    pub fn from_config(config: &ConfigStore) -> Result<Self, AppError> {
        Self::new(config.network_timeout())
    }
}

#[async_trait]
impl DocumentFetcher for HttpDocumentFetcher {
    async fn fetch(&self, url: &str, max_bytes: usize) -> Result<Bytes, AppError> {
        let parsed = Url::parse(url)
            .map_err(|e| AppError::Upstream(format!("Invalid document url '{}': {}", url, e)))?;
        if !matches!(parsed.scheme(), "http" | "https") {
            return Err(AppError::Upstream(format!(
                "Refusing to fetch '{}': unsupported scheme",
                url
            )));
        }

        let mut response = self
            .client
            .get(parsed)
            .send()
            .await
            .map_err(|e| AppError::Upstream(format!("Request to {} failed: {}", url, e)))?;

        let status = response.status();
        if !status.is_success() {
            return Err(AppError::Upstream(format!(
                "Document server returned {} for {}",
                status, url
            )));
        }

        let too_large = || {
            AppError::Upstream(format!(
                "Document at {} exceeds the maximum allowed size of {} bytes",
                url, max_bytes
            ))
        };

        if response
            .content_length()
            .is_some_and(|len| len > max_bytes as u64)
        {
            return Err(too_large());
        }

        let mut body = BytesMut::new();
        while let Some(chunk) = response
            .chunk()
            .await
            .map_err(|e| AppError::Upstream(format!("Reading body from {} failed: {}", url, e)))?
        {
            if body.len() + chunk.len() > max_bytes {
                return Err(too_large());
            }
            body.extend_from_slice(&chunk);
        }

        Ok(body.freeze())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::{Router, http::StatusCode, routing::get};

    async fn serve(router: Router) -> String {
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            axum::serve(listener, router).await.unwrap();
        });
        format!("http://{}", addr)
    }

    #[tokio::test]
    async fn test_fetch_success() {
        let base = serve(Router::new().route("/cache/doc.docx", get(|| async { "new bytes" }))).await;
        let fetcher = HttpDocumentFetcher::new(Duration::from_secs(5)).unwrap();

        let body = fetcher.fetch(&format!("{base}/cache/doc.docx"), 1024).await.unwrap();
        assert_eq!(&body[..], b"new bytes");
    }

    #[tokio::test]
    async fn test_fetch_non_success_is_upstream_error() {
        let base = serve(Router::new().route(
            "/gone",
            get(|| async { (StatusCode::NOT_FOUND, "nope") }),
        ))
        .await;
        let fetcher = HttpDocumentFetcher::new(Duration::from_secs(5)).unwrap();

        let err = fetcher.fetch(&format!("{base}/gone"), 1024).await.unwrap_err();
        assert!(matches!(err, AppError::Upstream(_)));
    }

    #[tokio::test]
    async fn test_fetch_rejects_non_http_urls() {
        let fetcher = HttpDocumentFetcher::new(Duration::from_secs(5)).unwrap();
        assert!(matches!(
            fetcher.fetch("file:///etc/passwd", 1024).await,
            Err(AppError::Upstream(_))
        ));
        assert!(matches!(
            fetcher.fetch("not a url", 1024).await,
            Err(AppError::Upstream(_))
        ));
    }

    #[tokio::test]
    async fn test_fetch_stops_past_size_limit() {
        let base = serve(
            Router::new()
                .route("/big", get(|| async { vec![b'x'; 4096] }))
                .route("/small", get(|| async { vec![b'x'; 16] })),
        )
        .await;
        let fetcher = HttpDocumentFetcher::new(Duration::from_secs(5)).unwrap();

        let err = fetcher.fetch(&format!("{base}/big"), 1024).await.unwrap_err();
        assert!(matches!(err, AppError::Upstream(_)));

        let body = fetcher.fetch(&format!("{base}/small"), 16).await.unwrap();
        assert_eq!(body.len(), 16);
    }
}
