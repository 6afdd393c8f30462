// server/src/services/audience_client.rs

use anyhow::anyhow;
use async_trait::async_trait;
use reqwest::{Client, StatusCode};
use serde::{Deserialize, Serialize};
use storefront_core::{AudienceSync, CoreError, CoreResult, Subscriber};
use tracing::{debug, instrument};

use super::http::{ensure_success, transport_error, trim_base};

const PROVIDER: &str = "audience";

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct ContactRequest<'a> {
  email: &'a str,
  list_ids: [i64; 1],
  update_enabled: bool,
  attributes: ContactAttributes<'a>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
struct ContactAttributes<'a> {
  #[serde(skip_serializing_if = "Option::is_none")]
  source: Option<&'a str>,
}

#[derive(Debug, Deserialize)]
struct ProviderErrorBody {
  code: Option<String>,
}

/// Brevo contacts API.
pub struct AudienceClient {
  http: Client,
  base_url: String,
  api_key: String,
  list_id: i64,
}

impl AudienceClient {
  pub fn new(http: Client, base_url: &str, api_key: String, list_id: i64) -> Self {
    Self {
      http,
      base_url: trim_base(base_url),
      api_key,
      list_id,
    }
  }
}

#[async_trait]
impl AudienceSync for AudienceClient {
  #[instrument(name = "service::audience_upsert", skip(self, subscriber), fields(list_id = self.list_id))]
  async fn upsert_contact(&self, subscriber: &Subscriber) -> CoreResult<()> {
    let url = format!("{}/v3/contacts", self.base_url);
    let body = ContactRequest {
      email: &subscriber.email,
      list_ids: [self.list_id],
      update_enabled: true,
      attributes: ContactAttributes {
        source: subscriber.source.as_deref(),
      },
    };

    let response = self
      .http
      .post(&url)
      .header("api-key", &self.api_key)
      .json(&body)
      .send()
      .await
      .map_err(|e| transport_error(PROVIDER, e))?;

    // An already-known contact is a success for our purposes.
    if response.status() == StatusCode::BAD_REQUEST {
      let text = response.text().await.unwrap_or_default();
      return match serde_json::from_str::<ProviderErrorBody>(&text) {
        Ok(ProviderErrorBody { code: Some(code) }) if code == "duplicate_parameter" => {
          debug!("Contact already present in audience.");
          Ok(())
        }
        _ => Err(CoreError::provider(PROVIDER, anyhow!("HTTP 400: {}", text))),
      };
    }

    ensure_success(PROVIDER, response).await?;
    debug!("Contact synced to audience.");
    Ok(())
  }
}
