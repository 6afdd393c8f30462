// server/src/services/http.rs

//! Shared plumbing for the reqwest-based provider clients.

use anyhow::anyhow;
use reqwest::{Client, Response};
use serde::de::DeserializeOwned;
use std::time::Duration;
use storefront_core::{CoreError, CoreResult};
use tracing::warn;

const REQUEST_TIMEOUT: Duration = Duration::from_secs(20);

/// One pooled client shared by every provider.
pub fn build_client() -> anyhow::Result<Client> {
  Client::builder()
    .timeout(REQUEST_TIMEOUT)
    .build()
    .map_err(|e| anyhow!("failed to build HTTP client: {}", e))
}

/// Base URLs are stored without a trailing slash.
pub fn trim_base(url: &str) -> String {
  url.trim_end_matches('/').to_string()
}

pub fn transport_error(provider: &str, err: reqwest::Error) -> CoreError {
  warn!(provider, error = %err, "Provider request failed before a response arrived.");
  CoreError::provider(provider, err)
}

/// Fails on a non-2xx status, keeping the body for the log and error detail.
pub async fn ensure_success(provider: &str, response: Response) -> CoreResult<Response> {
  let status = response.status();
  if status.is_success() {
    return Ok(response);
  }
  let body = response.text().await.unwrap_or_default();
  warn!(provider, status = status.as_u16(), body = %body, "Provider answered with an error status.");
  Err(CoreError::provider(provider, anyhow!("HTTP {}: {}", status.as_u16(), body)))
}

pub async fn read_json<T: DeserializeOwned>(provider: &str, response: Response) -> CoreResult<T> {
  let response = ensure_success(provider, response).await?;
  response
    .json::<T>()
    .await
    .map_err(|e| CoreError::provider(provider, anyhow!("undecodable response: {}", e)))
}
