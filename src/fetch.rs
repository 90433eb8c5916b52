//! Fetch capability
//!
//! The engine issues upstream requests through the [`Fetcher`] trait.
//! [`ReqwestFetcher`] is the bundled HTTP implementation.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::debug;

use crate::error::{CacheError, Result};

// == Fetch Request ==
/// Descriptor of an upstream request.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FetchRequest {
    /// HTTP method, only `GET` is cacheable
    pub method: String,
    /// Target URL
    pub url: String,
    /// Extra request headers
    #[serde(default)]
    pub headers: Vec<(String, String)>,
}

impl FetchRequest {
    /// Creates a GET request for `url`.
    pub fn get(url: impl Into<String>) -> Self {
        Self {
            method: "GET".to_string(),
            url: url.into(),
            headers: Vec::new(),
        }
    }

    /// Adds a request header.
    pub fn header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.push((name.into(), value.into()));
        self
    }

    /// Returns true if the method is GET (case-insensitive).
    pub fn is_get(&self) -> bool {
        self.method.eq_ignore_ascii_case("GET")
    }
}

// == Fetcher ==
/// Issues a GET-style request and returns its body.
#[async_trait]
pub trait Fetcher: Send + Sync {
    /// Returns `Ok(None)` when the upstream answered without a body.
    async fn fetch(&self, request: &FetchRequest) -> Result<Option<Value>>;
}

// == Reqwest Fetcher ==
/// HTTP fetcher backed by reqwest.
///
/// Non-2xx statuses are errors. JSON bodies are parsed, any other non-empty
/// body is returned as a JSON string.
#[derive(Debug, Clone)]
pub struct ReqwestFetcher {
    client: Client,
}

impl ReqwestFetcher {
    pub fn new() -> Self {
        Self::with_client(Client::new())
    }

    /// Uses a pre-configured client.
    pub fn with_client(client: Client) -> Self {
        Self { client }
    }

    /// Creates a fetcher whose requests give up after `timeout`.
    pub fn with_timeout(timeout: Duration) -> Result<Self> {
        let client = Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| CacheError::Fetch(e.to_string()))?;
        Ok(Self::with_client(client))
    }
}

impl Default for ReqwestFetcher {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl Fetcher for ReqwestFetcher {
    async fn fetch(&self, request: &FetchRequest) -> Result<Option<Value>> {
        let mut builder = self.client.get(&request.url);
        for (name, value) in &request.headers {
            builder = builder.header(name.as_str(), value.as_str());
        }

        let response = builder
            .send()
            .await
            .map_err(|e| CacheError::Fetch(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            return Err(CacheError::Fetch(format!(
                "{} returned status {}",
                request.url, status
            )));
        }

        let text = response
            .text()
            .await
            .map_err(|e| CacheError::Fetch(e.to_string()))?;
        debug!("Fetched {} bytes from {}", text.len(), request.url);

        Ok(parse_body(text))
    }
}

/// Converts a response body into a cacheable value.
fn parse_body(text: String) -> Option<Value> {
    if text.trim().is_empty() {
        return None;
    }
    match serde_json::from_str(&text) {
        Ok(Value::Null) => None,
        Ok(value) => Some(value),
        Err(_) => Some(Value::String(text)),
    }
}
