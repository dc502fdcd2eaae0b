//! HTTP capability used by the resolver
//!
//! Kept behind a trait so the resolver can be driven by a scripted client in
//! tests without a network.

use crate::error::{Error, Result};
use serde_json::Value;
use std::future::Future;
use std::time::Duration;

const USER_AGENT: &str = concat!("geocollect/", env!("CARGO_PKG_VERSION"));

/// Fetches a JSON document with a per-call timeout
pub trait HttpClient: Send + Sync {
    fn get_json(&self, url: &str, timeout: Duration) -> impl Future<Output = Result<Value>> + Send;
}

/// reqwest-backed client
#[derive(Debug, Clone)]
pub struct ReqwestHttpClient {
    client: reqwest::Client,
}

impl ReqwestHttpClient {
    pub fn new() -> Result<Self> {
        let client = reqwest::Client::builder()
            .user_agent(USER_AGENT)
            .build()?;

        Ok(Self { client })
    }
}

impl HttpClient for ReqwestHttpClient {
    async fn get_json(&self, url: &str, timeout: Duration) -> Result<Value> {
        let response = self.client.get(url).timeout(timeout).send().await?;

        if !response.status().is_success() {
            return Err(Error::ProviderUnavailable(format!(
                "HTTP {} from provider",
                response.status()
            )));
        }

        let body = response.text().await?;
        serde_json::from_str(&body)
            .map_err(|e| Error::ProviderUnavailable(format!("Invalid JSON response: {}", e)))
    }
}
