// src/services/fetcher.rs

//! Page fetching.

use async_trait::async_trait;
use reqwest::Client;

use crate::error::{AppError, Result};
use crate::models::CrawlerConfig;
use crate::utils::cancel::CancelToken;
use crate::utils::http::create_async_client;

/// Retrieves raw page bodies.
///
/// Implementations must report a non-2xx response as an error and give up
/// promptly once `cancel` fires.
#[async_trait]
pub trait Fetcher: Send + Sync {
    async fn fetch(&self, url: &str, cancel: &CancelToken) -> Result<Vec<u8>>;
}

/// [`Fetcher`] over a shared reqwest client.
#[derive(Debug, Clone)]
pub struct HttpFetcher {
    client: Client,
}

impl HttpFetcher {
    /// Build a fetcher with the crawler's user agent and timeout.
    pub fn new(config: &CrawlerConfig) -> Result<Self> {
        Ok(Self {
            client: create_async_client(config)?,
        })
    }

    pub fn with_client(client: Client) -> Self {
        Self { client }
    }

    async fn get(&self, url: &str) -> Result<Vec<u8>> {
        let response = self
            .client
            .get(url)
            .send()
            .await
            .map_err(|e| AppError::fetch(url, e))?;

        let status = response.status();
        if !status.is_success() {
            return Err(AppError::Status {
                url: url.to_string(),
                status: status.as_u16(),
            });
        }

        let body = response.bytes().await.map_err(|e| AppError::fetch(url, e))?;
        log::debug!("Fetched {} ({} bytes)", url, body.len());
        Ok(body.to_vec())
    }
}

#[async_trait]
impl Fetcher for HttpFetcher {
    async fn fetch(&self, url: &str, cancel: &CancelToken) -> Result<Vec<u8>> {
        cancel.check()?;
        tokio::select! {
            _ = cancel.cancelled() => Err(AppError::Cancelled),
            result = self.get(url) => result,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_fetch_honours_prior_cancel() {
        let fetcher = HttpFetcher::new(&CrawlerConfig::default()).unwrap();
        let cancel = CancelToken::new();
        cancel.cancel();

        let err = fetcher
            .fetch("https://syllabus.s.isct.ac.jp", &cancel)
            .await
            .unwrap_err();
        assert!(err.is_cancelled());
    }

    #[tokio::test]
    async fn test_connection_failure_names_url() {
        let fetcher = HttpFetcher::new(&CrawlerConfig::default()).unwrap();
        let err = fetcher
            .fetch("http://127.0.0.1:1/courses", &CancelToken::new())
            .await
            .unwrap_err();
        match err {
            AppError::Fetch { url, .. } => assert_eq!(url, "http://127.0.0.1:1/courses"),
            other => panic!("unexpected error: {other}"),
        }
    }
}
