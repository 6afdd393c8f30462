// server/src/web/handlers/shipping_handlers.rs

use actix_web::{web, HttpResponse};
use serde::Deserialize;
use serde_json::json;
use storefront_core::shipping::PackageItem;
use storefront_core::{Cep, Money, Package, ShippingQuoteRequest};
use tracing::{info, instrument};

use crate::errors::AppError;
use crate::state::AppState;

#[derive(Deserialize, Debug)]
pub struct ShippingQuotePayload {
  pub to_cep: String,
  /// Defaults to the store's warehouse CEP.
  pub from_cep: Option<String>,
  /// Explicit package; wins over `items`.
  pub package: Option<Package>,
  #[serde(default)]
  pub items: Vec<PackageItem>,
  /// Declared value in cents.
  #[serde(default)]
  pub insurance_value: Option<Money>,
}

impl ShippingQuotePayload {
  fn into_request(self, origin: &Cep) -> Result<ShippingQuoteRequest, AppError> {
    let from = match self.from_cep.as_deref() {
      Some(raw) => Cep::parse(raw)?,
      None => origin.clone(),
    };
    let to = Cep::parse(&self.to_cep)?;
    let package = self.package.unwrap_or_else(|| Package::for_items(&self.items));
    Ok(ShippingQuoteRequest {
      from,
      to,
      package,
      insurance_value: self.insurance_value.unwrap_or(Money::ZERO),
    })
  }
}

#[instrument(name = "handler::quote_shipping", skip(app_state, payload), fields(to_cep = %payload.to_cep))]
pub async fn quote_shipping_handler(
  app_state: web::Data<AppState>,
  payload: web::Json<ShippingQuotePayload>,
) -> Result<HttpResponse, AppError> {
  let request = payload.into_inner().into_request(&app_state.config.shipping_origin_cep)?;
  request.validate()?;

  let options = app_state.shipping.quote(&request).await?;
  info!("Returning {} shipping options for CEP {}.", options.len(), request.to);

  Ok(HttpResponse::Ok().json(json!({
    "from": request.from.formatted(),
    "to": request.to.formatted(),
    "options": options
  })))
}
