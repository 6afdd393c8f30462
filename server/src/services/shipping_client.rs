// server/src/services/shipping_client.rs

use async_trait::async_trait;
use reqwest::header::{ACCEPT, USER_AGENT};
use reqwest::Client;
use storefront_core::shipping::{adapt_carrier_services, CarrierService};
use storefront_core::{CoreResult, ShippingOption, ShippingQuoteRequest, ShippingQuoter};
use tracing::{info, instrument};

use super::http::{read_json, transport_error, trim_base};
use crate::config::AppConfig;

const PROVIDER: &str = "shipping";

/// Carrier aggregator (Melhor Envio) rate calculator.
pub struct CarrierAggregatorClient {
  http: Client,
  base_url: String,
  token: String,
  user_agent: String,
}

impl CarrierAggregatorClient {
  pub fn new(http: Client, config: &AppConfig) -> Self {
    Self {
      http,
      base_url: trim_base(&config.shipping_api_url),
      token: config.shipping_api_token.clone(),
      user_agent: config.shipping_user_agent.clone(),
    }
  }
}

#[async_trait]
impl ShippingQuoter for CarrierAggregatorClient {
  #[instrument(name = "service::shipping_quote", skip(self, request), fields(from = %request.from, to = %request.to))]
  async fn quote(&self, request: &ShippingQuoteRequest) -> CoreResult<Vec<ShippingOption>> {
    request.validate()?;
    let url = format!("{}/api/v2/me/shipment/calculate", self.base_url);

    let response = self
      .http
      .post(&url)
      .bearer_auth(&self.token)
      .header(ACCEPT, "application/json")
      .header(USER_AGENT, &self.user_agent)
      .json(&request.to_carrier_request())
      .send()
      .await
      .map_err(|e| transport_error(PROVIDER, e))?;

    let services: Vec<CarrierService> = read_json(PROVIDER, response).await?;
    let received = services.len();
    let options = adapt_carrier_services(services);
    info!(received, usable = options.len(), "Shipping quote adapted.");
    Ok(options)
  }
}
