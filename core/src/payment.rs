// core/src/payment.rs

//! Payment preference creation: validated checkout drafts and the payment
//! provider's preference wire shape.

use crate::catalog::ProductId;
use crate::cpf::Cpf;
use crate::error::{CoreError, CoreResult};
use crate::money::Money;
use crate::newsletter::normalize_email;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};

pub const CURRENCY_ID: &str = "BRL";
const MAX_ITEMS: usize = 50;
const MAX_QUANTITY: u32 = 99;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CheckoutLineItem {
  pub product_id: ProductId,
  pub title: String,
  pub quantity: u32,
  pub unit_price: Money,
  #[serde(default)]
  pub picture_url: Option<String>,
  #[serde(default)]
  pub size: Option<String>,
  #[serde(default)]
  pub color: Option<String>,
}

impl CheckoutLineItem {
  /// Title shown on the provider's checkout page, e.g. `Camiseta (M, Preto)`.
  pub fn display_title(&self) -> String {
    let variant: Vec<&str> = [self.size.as_deref(), self.color.as_deref()]
      .into_iter()
      .flatten()
      .filter(|s| !s.trim().is_empty())
      .collect();
    if variant.is_empty() {
      self.title.trim().to_string()
    } else {
      format!("{} ({})", self.title.trim(), variant.join(", "))
    }
  }

  pub fn subtotal(&self) -> CoreResult<Money> {
    self
      .unit_price
      .multiply(self.quantity)
      .ok_or_else(|| CoreError::validation("items", "line subtotal overflows"))
  }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReturnUrls {
  pub success: String,
  pub failure: String,
  pub pending: String,
}

impl ReturnUrls {
  /// Standard storefront result pages under `base_url`.
  pub fn for_storefront(base_url: &str) -> Self {
    let base = base_url.trim_end_matches('/');
    ReturnUrls {
      success: format!("{}/checkout/sucesso", base),
      failure: format!("{}/checkout/falha", base),
      pending: format!("{}/checkout/pendente", base),
    }
  }

  fn validate(&self) -> CoreResult<()> {
    for (name, url) in [
      ("back_urls.success", &self.success),
      ("back_urls.failure", &self.failure),
      ("back_urls.pending", &self.pending),
    ] {
      if !is_http_url(url) {
        return Err(CoreError::validation(name, format!("'{}' is not an http(s) URL", url)));
      }
    }
    Ok(())
  }
}

fn is_http_url(url: &str) -> bool {
  let rest = url
    .strip_prefix("https://")
    .or_else(|| url.strip_prefix("http://"));
  match rest {
    Some(rest) => {
      let host = rest.split(['/', '?', '#']).next().unwrap_or("");
      !host.is_empty() && !host.contains(char::is_whitespace)
    }
    None => false,
  }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Payer {
  pub name: String,
  pub email: String,
  pub cpf: Cpf,
}

/// Everything the storefront knows about a checkout before the provider sees it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PreferenceDraft {
  pub items: Vec<CheckoutLineItem>,
  #[serde(default)]
  pub payer: Option<Payer>,
  pub return_urls: ReturnUrls,
  #[serde(default)]
  pub shipping_cost: Option<Money>,
  /// Our order id, echoed back by the provider in notifications.
  pub external_reference: String,
  #[serde(default)]
  pub notification_url: Option<String>,
}

impl PreferenceDraft {
  pub fn validate(&self) -> CoreResult<()> {
    if self.items.is_empty() {
      return Err(CoreError::validation("items", "at least one item is required"));
    }
    if self.items.len() > MAX_ITEMS {
      return Err(CoreError::validation("items", format!("at most {} items per checkout", MAX_ITEMS)));
    }
    for item in &self.items {
      if item.title.trim().is_empty() {
        return Err(CoreError::validation("items.title", "must not be empty"));
      }
      if item.quantity == 0 || item.quantity > MAX_QUANTITY {
        return Err(CoreError::validation(
          "items.quantity",
          format!("must be between 1 and {}", MAX_QUANTITY),
        ));
      }
      if !item.unit_price.is_positive() {
        return Err(CoreError::validation("items.unit_price", "must be positive"));
      }
      if let Some(url) = &item.picture_url {
        if !is_http_url(url) {
          return Err(CoreError::validation("items.picture_url", "must be an http(s) URL"));
        }
      }
    }
    if let Some(cost) = self.shipping_cost {
      if cost.amount_cents < 0 {
        return Err(CoreError::validation("shipping_cost", "must not be negative"));
      }
    }
    if let Some(payer) = &self.payer {
      if payer.name.trim().is_empty() {
        return Err(CoreError::validation("payer.name", "must not be empty"));
      }
      normalize_email(&payer.email)?;
    }
    if self.external_reference.trim().is_empty() {
      return Err(CoreError::validation("external_reference", "must not be empty"));
    }
    if let Some(url) = &self.notification_url {
      if !is_http_url(url) {
        return Err(CoreError::validation("notification_url", "must be an http(s) URL"));
      }
    }
    self.return_urls.validate()?;
    self.total().map(|_| ())
  }

  /// Items plus shipping.
  pub fn total(&self) -> CoreResult<Money> {
    let mut total = self.shipping_cost.unwrap_or(Money::ZERO);
    for item in &self.items {
      total = total
        .checked_add(item.subtotal()?)
        .ok_or_else(|| CoreError::validation("items", "order total overflows"))?;
    }
    Ok(total)
  }

  /// Validates and converts into the provider request body.
  pub fn to_request(&self) -> CoreResult<PreferenceRequest> {
    self.validate()?;

    let items = self
      .items
      .iter()
      .map(|item| PreferenceItem {
        id: item.product_id.to_string(),
        title: item.display_title(),
        quantity: item.quantity,
        unit_price: item.unit_price.as_decimal(),
        currency_id: CURRENCY_ID.to_string(),
        picture_url: item.picture_url.clone(),
      })
      .collect();

    let payer = match &self.payer {
      Some(p) => Some(PreferencePayer {
        name: p.name.trim().to_string(),
        email: normalize_email(&p.email)?,
        identification: Identification {
          kind: "CPF".to_string(),
          number: p.cpf.digits().to_string(),
        },
      }),
      None => None,
    };

    Ok(PreferenceRequest {
      items,
      payer,
      back_urls: self.return_urls.clone(),
      auto_return: "approved".to_string(),
      external_reference: self.external_reference.clone(),
      shipments: self.shipping_cost.map(|cost| Shipments {
        cost: cost.as_decimal(),
        mode: "not_specified".to_string(),
      }),
      notification_url: self.notification_url.clone(),
    })
  }
}

// --- Provider wire shapes ---

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PreferenceItem {
  pub id: String,
  pub title: String,
  pub quantity: u32,
  pub unit_price: f64,
  pub currency_id: String,
  #[serde(skip_serializing_if = "Option::is_none")]
  pub picture_url: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Identification {
  #[serde(rename = "type")]
  pub kind: String,
  pub number: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PreferencePayer {
  pub name: String,
  pub email: String,
  pub identification: Identification,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Shipments {
  pub cost: f64,
  pub mode: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PreferenceRequest {
  pub items: Vec<PreferenceItem>,
  #[serde(skip_serializing_if = "Option::is_none")]
  pub payer: Option<PreferencePayer>,
  pub back_urls: ReturnUrls,
  pub auto_return: String,
  pub external_reference: String,
  #[serde(skip_serializing_if = "Option::is_none")]
  pub shipments: Option<Shipments>,
  #[serde(skip_serializing_if = "Option::is_none")]
  pub notification_url: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PreferenceResponse {
  pub id: String,
  pub init_point: String,
  #[serde(default)]
  pub sandbox_init_point: Option<String>,
}

impl PreferenceResponse {
  /// Where to send the shopper. Sandbox falls back to the live URL when absent.
  pub fn redirect_url(&self, sandbox: bool) -> &str {
    if sandbox {
      self.sandbox_init_point.as_deref().unwrap_or(&self.init_point)
    } else {
      &self.init_point
    }
  }
}

#[async_trait]
pub trait PaymentGateway: Send + Sync {
  async fn create_preference(&self, request: &PreferenceRequest) -> CoreResult<PreferenceResponse>;
}
