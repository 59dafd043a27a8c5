//! HTTP client abstraction for the LLM provider APIs.
//!
//! The LLM client only needs "POST this JSON, give me status and body", so
//! that is all the trait exposes. Tests inject a mock instead of reqwest.

use anyhow::{Context, Result};
use async_trait::async_trait;
use reqwest::{Client, Proxy};
use std::time::Duration;
use tracing::debug;

/// Applied to every request made by [`ReqwestHttpClient::new`].
pub const REQUEST_TIMEOUT: Duration = Duration::from_secs(60);

/// Status code and body of a completed HTTP exchange.
#[derive(Debug, Clone, PartialEq)]
pub struct HttpResponse {
    pub status: u16,
    pub body: String,
}

/// Trait for HTTP communication with external APIs.
///
/// # Example
///
/// ```ignore
/// use shell_ai::http_client::{HttpClient, ReqwestHttpClient};
///
/// let client = ReqwestHttpClient::new(None)?;
/// let response = client.post_json(
///     "https://api.example.com/endpoint",
///     &[("Content-Type", "application/json")],
///     &serde_json::json!({"key": "value"}),
/// ).await?;
/// ```
#[async_trait]
pub trait HttpClient: Send + Sync {
    /// Sends a POST request with a JSON body.
    ///
    /// # Errors
    ///
    /// Returns an error if the request cannot be sent, times out, or the
    /// body cannot be read. A non-2xx status is not an error at this level.
    async fn post_json(
        &self,
        url: &str,
        headers: &[(&str, &str)],
        body: &serde_json::Value,
    ) -> Result<HttpResponse>;
}

/// HTTP client implementation using reqwest.
pub struct ReqwestHttpClient {
    client: Client,
}

impl ReqwestHttpClient {
    /// Creates a client with the 60 second request timeout and an optional proxy URL.
    pub fn new(proxy: Option<&str>) -> Result<Self> {
        Self::with_timeout(REQUEST_TIMEOUT, proxy)
    }

    pub fn with_timeout(timeout: Duration, proxy: Option<&str>) -> Result<Self> {
        let mut builder = Client::builder().timeout(timeout);

        if let Some(proxy_url) = proxy {
            debug!("Routing API requests through proxy {}", proxy_url);
            let proxy = Proxy::all(proxy_url)
                .with_context(|| format!("invalid proxy URL: {}", proxy_url))?;
            builder = builder.proxy(proxy);
        }

        let client = builder.build().context("failed to build HTTP client")?;
        Ok(Self { client })
    }
}

#[async_trait]
impl HttpClient for ReqwestHttpClient {
    async fn post_json(
        &self,
        url: &str,
        headers: &[(&str, &str)],
        body: &serde_json::Value,
    ) -> Result<HttpResponse> {
        let mut request = self.client.post(url);

        for (key, value) in headers {
            request = request.header(*key, *value);
        }

        let response = request.json(body).send().await?;
        let status = response.status().as_u16();
        let body = response.text().await?;
        Ok(HttpResponse { status, body })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_client_builds_without_proxy() {
        assert!(ReqwestHttpClient::new(None).is_ok());
    }

    #[test]
    fn test_client_builds_with_proxy() {
        assert!(ReqwestHttpClient::new(Some("http://127.0.0.1:8080")).is_ok());
    }

    #[test]
    fn test_invalid_proxy_is_rejected() {
        let err = ReqwestHttpClient::new(Some("http://[invalid")).err().unwrap();
        assert!(err.to_string().contains("invalid proxy URL"));
    }
}
