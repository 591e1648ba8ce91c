use std::time::Duration;

use reqwest::header::{HeaderMap, HeaderValue, ACCEPT_LANGUAGE, CONTENT_TYPE};
use reqwest::Client;

use crate::{Error, Result};

const USER_AGENT: &str = "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 \
    (KHTML, like Gecko) Chrome/124.0.0.0 Safari/537.36";

/// Upper bound on a binary download such as a figure image.
pub const MAX_ASSET_BYTES: usize = 20 * 1024 * 1024;

/// Time-bounded HTTP reads for article pages and their assets.
#[derive(Debug, Clone)]
pub struct Fetcher {
    client: Client,
    max_bytes: usize,
}

#[derive(Debug, Clone)]
pub struct FetchedBytes {
    pub bytes: Vec<u8>,
    pub content_type: Option<String>,
}

impl Fetcher {
    pub fn new(timeout: Duration) -> Result<Self> {
        let mut headers = HeaderMap::new();
        headers.insert(ACCEPT_LANGUAGE, HeaderValue::from_static("en-US,en;q=0.9"));
        let client = Client::builder()
            .user_agent(USER_AGENT)
            .default_headers(headers)
            .timeout(timeout)
            .build()
            .map_err(|e| Error::Fetch(format!("Failed to build HTTP client: {}", e)))?;
        Ok(Self {
            client,
            max_bytes: MAX_ASSET_BYTES,
        })
    }

    pub fn with_max_bytes(mut self, max_bytes: usize) -> Self {
        self.max_bytes = max_bytes;
        self
    }

    pub async fn get_text(&self, url: &str) -> Result<String> {
        let response = self.send(url).await?;
        response
            .text()
            .await
            .map_err(|e| Error::Fetch(format!("Failed to read body of {}: {}", url, e)))
    }

    /// Reads a binary body, refusing anything larger than the configured cap.
    pub async fn get_bytes(&self, url: &str) -> Result<FetchedBytes> {
        let mut response = self.send(url).await?;
        let content_type = response
            .headers()
            .get(CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .map(|v| v.to_string());

        let too_large = || {
            Error::Fetch(format!(
                "{} is larger than {} bytes",
                url, self.max_bytes
            ))
        };
        if response
            .content_length()
            .is_some_and(|len| len > self.max_bytes as u64)
        {
            return Err(too_large());
        }

        let mut bytes = Vec::new();
        while let Some(chunk) = response
            .chunk()
            .await
            .map_err(|e| Error::Fetch(format!("Failed to read body of {}: {}", url, e)))?
        {
            if bytes.len() + chunk.len() > self.max_bytes {
                return Err(too_large());
            }
            bytes.extend_from_slice(&chunk);
        }
        Ok(FetchedBytes {
            bytes,
            content_type,
        })
    }

    async fn send(&self, url: &str) -> Result<reqwest::Response> {
        let response = self.client.get(url).send().await.map_err(|e| {
            if e.is_timeout() {
                Error::Fetch(format!("Timed out fetching {}", url))
            } else {
                Error::Fetch(format!("Failed to fetch {}: {}", url, e))
            }
        })?;

        let status = response.status();
        if !status.is_success() {
            return Err(Error::Fetch(format!("{} returned HTTP {}", url, status)));
        }
        Ok(response)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::header::CONTENT_TYPE;
    use axum::{http::StatusCode, routing::get, Router};

    async fn serve(app: Router) -> String {
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            axum::serve(listener, app).await.unwrap();
        });
        format!("http://{}", addr)
    }

    fn app() -> Router {
        Router::new()
            .route("/page", get(|| async { "<h1>Hello</h1>" }))
            .route("/gone", get(|| async { (StatusCode::NOT_FOUND, "nope") }))
            .route(
                "/slow",
                get(|| async {
                    tokio::time::sleep(Duration::from_secs(3)).await;
                    "late"
                }),
            )
            .route(
                "/image",
                get(|| async { ([(CONTENT_TYPE, "image/png")], vec![1u8, 2, 3]) }),
            )
    }

    #[tokio::test]
    async fn test_get_text() {
        let base = serve(app()).await;
        let fetcher = Fetcher::new(Duration::from_secs(5)).unwrap();
        let body = fetcher.get_text(&format!("{}/page", base)).await.unwrap();
        assert_eq!(body, "<h1>Hello</h1>");
    }

    #[tokio::test]
    async fn test_non_success_status_is_fetch_error() {
        let base = serve(app()).await;
        let fetcher = Fetcher::new(Duration::from_secs(5)).unwrap();
        let err = fetcher.get_text(&format!("{}/gone", base)).await.unwrap_err();
        assert!(matches!(err, Error::Fetch(_)));
        assert!(err.to_string().contains("404"));
    }

    #[tokio::test]
    async fn test_timeout_is_fetch_error() {
        let base = serve(app()).await;
        let fetcher = Fetcher::new(Duration::from_millis(200)).unwrap();
        let err = fetcher.get_text(&format!("{}/slow", base)).await.unwrap_err();
        assert!(matches!(err, Error::Fetch(_)));
    }

    #[tokio::test]
    async fn test_get_bytes_keeps_content_type() {
        let base = serve(app()).await;
        let fetcher = Fetcher::new(Duration::from_secs(5)).unwrap();
        let fetched = fetcher.get_bytes(&format!("{}/image", base)).await.unwrap();
        assert_eq!(fetched.bytes, vec![1, 2, 3]);
        assert_eq!(fetched.content_type.as_deref(), Some("image/png"));
    }

    #[tokio::test]
    async fn test_get_bytes_rejects_oversized_body() {
        let base = serve(app()).await;
        let fetcher = Fetcher::new(Duration::from_secs(5)).unwrap().with_max_bytes(2);
        let err = fetcher.get_bytes(&format!("{}/image", base)).await.unwrap_err();
        assert!(matches!(err, Error::Fetch(_)));
        assert!(err.to_string().contains("larger than 2 bytes"));
    }
}
