// server/src/services/payment_client.rs

use async_trait::async_trait;
use reqwest::Client;
use storefront_core::{CoreResult, PaymentGateway, PreferenceRequest, PreferenceResponse};
use tracing::{info, instrument};

use super::http::{read_json, transport_error, trim_base};
use crate::config::AppConfig;

const PROVIDER: &str = "payment";

/// Mercado Pago checkout preferences.
pub struct PaymentProviderClient {
  http: Client,
  base_url: String,
  access_token: String,
}

impl PaymentProviderClient {
  pub fn new(http: Client, config: &AppConfig) -> Self {
    Self {
      http,
      base_url: trim_base(&config.payment_api_url),
      access_token: config.payment_access_token.clone(),
    }
  }
}

#[async_trait]
impl PaymentGateway for PaymentProviderClient {
  #[instrument(
    name = "service::create_preference",
    skip(self, request),
    fields(external_reference = %request.external_reference, items = request.items.len())
  )]
  async fn create_preference(&self, request: &PreferenceRequest) -> CoreResult<PreferenceResponse> {
    let url = format!("{}/checkout/preferences", self.base_url);
    let response = self
      .http
      .post(&url)
      .bearer_auth(&self.access_token)
      // The order id doubles as idempotency key so a resubmitted checkout reuses the preference.
      .header("X-Idempotency-Key", &request.external_reference)
      .json(request)
      .send()
      .await
      .map_err(|e| transport_error(PROVIDER, e))?;

    let preference: PreferenceResponse = read_json(PROVIDER, response).await?;
    info!(preference_id = %preference.id, "Payment preference created.");
    Ok(preference)
  }
}
