// core/src/shipping.rs

//! Shipping quotes: package derivation, the carrier-aggregator wire shapes,
//! and the adapter that turns an aggregator response into the short option
//! list shown at checkout.

use crate::cep::Cep;
use crate::error::{CoreError, CoreResult};
use crate::money::Money;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tracing::debug;

/// Largest side accepted by the aggregator, in centimeters.
pub const MAX_SIDE_CM: f64 = 100.0;
/// Heaviest package accepted by the aggregator, in kilograms.
pub const MAX_WEIGHT_KG: f64 = 30.0;

// Smallest box the carriers will price.
const MIN_HEIGHT_CM: f64 = 2.0;
const MIN_WIDTH_CM: f64 = 11.0;
const MIN_LENGTH_CM: f64 = 16.0;

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Package {
  pub height_cm: f64,
  pub width_cm: f64,
  pub length_cm: f64,
  pub weight_kg: f64,
}

impl Package {
  /// A folded garment in a mailer bag.
  pub const APPAREL_DEFAULT: Package = Package {
    height_cm: 4.0,
    width_cm: 20.0,
    length_cm: 30.0,
    weight_kg: 0.3,
  };

  pub fn validate(&self) -> CoreResult<()> {
    let sides = [
      ("height", self.height_cm),
      ("width", self.width_cm),
      ("length", self.length_cm),
    ];
    for (name, value) in sides {
      if !value.is_finite() || value <= 0.0 {
        return Err(CoreError::InvalidPackage(format!("{} must be positive", name)));
      }
      if value > MAX_SIDE_CM {
        return Err(CoreError::InvalidPackage(format!(
          "{} of {}cm exceeds the {}cm limit",
          name, value, MAX_SIDE_CM
        )));
      }
    }
    if !self.weight_kg.is_finite() || self.weight_kg <= 0.0 {
      return Err(CoreError::InvalidPackage("weight must be positive".to_string()));
    }
    if self.weight_kg > MAX_WEIGHT_KG {
      return Err(CoreError::InvalidPackage(format!(
        "weight of {}kg exceeds the {}kg limit",
        self.weight_kg, MAX_WEIGHT_KG
      )));
    }
    Ok(())
  }

  /// Stacks cart items into one box: heights add up, width and length take the
  /// largest item, weights add up. Sides are raised to the carrier minimums.
  /// An empty cart yields [`Package::APPAREL_DEFAULT`].
  pub fn for_items(items: &[PackageItem]) -> Package {
    let items: Vec<&PackageItem> = items.iter().filter(|i| i.quantity > 0).collect();
    if items.is_empty() {
      return Package::APPAREL_DEFAULT;
    }

    let mut package = Package {
      height_cm: 0.0,
      width_cm: 0.0,
      length_cm: 0.0,
      weight_kg: 0.0,
    };
    for item in items {
      let qty = f64::from(item.quantity);
      package.height_cm += item.height_cm * qty;
      package.width_cm = package.width_cm.max(item.width_cm);
      package.length_cm = package.length_cm.max(item.length_cm);
      package.weight_kg += item.weight_kg * qty;
    }
    package.height_cm = package.height_cm.max(MIN_HEIGHT_CM);
    package.width_cm = package.width_cm.max(MIN_WIDTH_CM);
    package.length_cm = package.length_cm.max(MIN_LENGTH_CM);
    package
  }
}

/// Per-unit dimensions of one cart line.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PackageItem {
  pub height_cm: f64,
  pub width_cm: f64,
  pub length_cm: f64,
  pub weight_kg: f64,
  pub quantity: u32,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ShippingQuoteRequest {
  pub from: Cep,
  pub to: Cep,
  pub package: Package,
  /// Declared value used for carrier insurance.
  #[serde(default)]
  pub insurance_value: Money,
}

impl ShippingQuoteRequest {
  pub fn validate(&self) -> CoreResult<()> {
    self.package.validate()?;
    if self.insurance_value.amount_cents < 0 {
      return Err(CoreError::validation("insurance_value", "must not be negative"));
    }
    Ok(())
  }

  pub fn to_carrier_request(&self) -> CarrierQuoteRequest {
    CarrierQuoteRequest {
      from: PostalCodeRef {
        postal_code: self.from.digits().to_string(),
      },
      to: PostalCodeRef {
        postal_code: self.to.digits().to_string(),
      },
      package: CarrierPackage {
        height: self.package.height_cm,
        width: self.package.width_cm,
        length: self.package.length_cm,
        weight: self.package.weight_kg,
      },
      options: CarrierOptions {
        insurance_value: self.insurance_value.as_decimal(),
        receipt: false,
        own_hand: false,
      },
    }
  }
}

// --- Aggregator wire shapes ---

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PostalCodeRef {
  pub postal_code: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CarrierPackage {
  pub height: f64,
  pub width: f64,
  pub length: f64,
  pub weight: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CarrierOptions {
  pub insurance_value: f64,
  pub receipt: bool,
  pub own_hand: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CarrierQuoteRequest {
  pub from: PostalCodeRef,
  pub to: PostalCodeRef,
  pub package: CarrierPackage,
  pub options: CarrierOptions,
}

/// Prices arrive as decimal strings, occasionally as bare numbers.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum CarrierPrice {
  Text(String),
  Number(f64),
}

impl CarrierPrice {
  pub fn to_money(&self) -> CoreResult<Money> {
    match self {
      CarrierPrice::Text(text) => Money::from_decimal_str(text),
      CarrierPrice::Number(n) => Money::from_decimal_str(&format!("{:.2}", n)),
    }
  }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CarrierCompany {
  pub id: i64,
  pub name: String,
  #[serde(default)]
  pub picture: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CarrierService {
  pub id: i64,
  pub name: String,
  #[serde(default)]
  pub price: Option<CarrierPrice>,
  #[serde(default)]
  pub custom_price: Option<CarrierPrice>,
  #[serde(default)]
  pub delivery_time: Option<u32>,
  #[serde(default)]
  pub custom_delivery_time: Option<u32>,
  pub company: CarrierCompany,
  /// Set when the service does not serve the route.
  #[serde(default)]
  pub error: Option<String>,
}

// --- Simplified shape returned to the storefront ---

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ShippingOption {
  pub id: i64,
  pub name: String,
  pub carrier: String,
  pub carrier_logo: Option<String>,
  pub price: Money,
  pub delivery_days: Option<u32>,
}

/// Reshapes aggregator services into checkout options.
///
/// Services reporting an error or lacking a parseable price are dropped. The
/// negotiated (`custom_*`) price and delivery time win over the list values.
/// Options come back cheapest first, ties broken by faster delivery.
pub fn adapt_carrier_services(services: Vec<CarrierService>) -> Vec<ShippingOption> {
  let mut options: Vec<ShippingOption> = services
    .into_iter()
    .filter_map(|service| {
      if let Some(reason) = &service.error {
        debug!(service_id = service.id, %reason, "Dropping unavailable shipping service.");
        return None;
      }
      let price = service
        .custom_price
        .as_ref()
        .or(service.price.as_ref())
        .and_then(|p| p.to_money().ok())?;
      Some(ShippingOption {
        id: service.id,
        name: service.name,
        carrier: service.company.name,
        carrier_logo: service.company.picture,
        price,
        delivery_days: service.custom_delivery_time.or(service.delivery_time),
      })
    })
    .collect();

  options.sort_by(|a, b| {
    a.price
      .cmp(&b.price)
      .then_with(|| a.delivery_days.unwrap_or(u32::MAX).cmp(&b.delivery_days.unwrap_or(u32::MAX)))
  });
  options
}

/// Quotes shipping through some carrier aggregator.
#[async_trait]
pub trait ShippingQuoter: Send + Sync {
  async fn quote(&self, request: &ShippingQuoteRequest) -> CoreResult<Vec<ShippingOption>>;
}

#[cfg(test)]
mod tests {
  use super::*;
  use serde_json::json;

  fn services_fixture() -> Vec<CarrierService> {
    serde_json::from_value(json!([
      {
        "id": 1, "name": "PAC", "price": "24.90", "custom_price": "22.10",
        "delivery_time": 9, "custom_delivery_time": 8,
        "company": {"id": 1, "name": "Correios", "picture": "https://cdn/correios.png"}
      },
      {
        "id": 2, "name": "SEDEX", "price": "41.35", "delivery_time": 3,
        "company": {"id": 1, "name": "Correios"}
      },
      {
        "id": 3, "name": ".Package", "error": "Serviço indisponível para o trecho.",
        "company": {"id": 2, "name": "Jadlog"}
      },
      {
        "id": 17, "name": "Mini Envios", "price": 22.1, "delivery_time": 12,
        "company": {"id": 1, "name": "Correios"}
      },
      {
        "id": 31, "name": "Broken", "price": "n/a",
        "company": {"id": 9, "name": "Unknown"}
      }
    ]))
    .unwrap()
  }

  #[test]
  fn adapter_drops_errors_prefers_custom_values_and_sorts() {
    let options = adapt_carrier_services(services_fixture());
    let summary: Vec<_> = options
      .iter()
      .map(|o| (o.id, o.price.amount_cents, o.delivery_days))
      .collect();
    assert_eq!(summary, vec![(1, 2210, Some(8)), (17, 2210, Some(12)), (2, 4135, Some(3))]);
    assert_eq!(options[0].carrier, "Correios");
    assert_eq!(options[0].carrier_logo.as_deref(), Some("https://cdn/correios.png"));
  }

  #[test]
  fn carrier_request_uses_raw_postal_digits() {
    let request = ShippingQuoteRequest {
      from: Cep::parse("01310-100").unwrap(),
      to: Cep::parse("22041-001").unwrap(),
      package: Package::APPAREL_DEFAULT,
      insurance_value: Money::from_cents(15990),
    };
    let wire = serde_json::to_value(request.to_carrier_request()).unwrap();
    assert_eq!(wire["from"]["postal_code"], "01310100");
    assert_eq!(wire["to"]["postal_code"], "22041001");
    assert_eq!(wire["package"]["weight"], 0.3);
    assert_eq!(wire["options"]["insurance_value"], 159.9);
    assert_eq!(wire["options"]["own_hand"], false);
  }

  #[test]
  fn package_limits() {
    assert!(Package::APPAREL_DEFAULT.validate().is_ok());
    let mut too_heavy = Package::APPAREL_DEFAULT;
    too_heavy.weight_kg = 31.0;
    assert!(matches!(too_heavy.validate(), Err(CoreError::InvalidPackage(_))));
    let mut flat = Package::APPAREL_DEFAULT;
    flat.height_cm = 0.0;
    assert!(flat.validate().is_err());
    let mut huge = Package::APPAREL_DEFAULT;
    huge.length_cm = 120.0;
    assert!(huge.validate().is_err());
  }

  #[test]
  fn package_for_items_stacks_and_applies_minimums() {
    assert_eq!(Package::for_items(&[]), Package::APPAREL_DEFAULT);

    let tee = PackageItem {
      height_cm: 1.0,
      width_cm: 10.0,
      length_cm: 15.0,
      weight_kg: 0.2,
      quantity: 3,
    };
    let jacket = PackageItem {
      height_cm: 5.0,
      width_cm: 30.0,
      length_cm: 40.0,
      weight_kg: 0.9,
      quantity: 1,
    };
    let package = Package::for_items(&[tee, jacket]);
    assert_eq!(package.height_cm, 8.0);
    assert_eq!(package.width_cm, 30.0);
    assert_eq!(package.length_cm, 40.0);
    assert!((package.weight_kg - 1.5).abs() < 1e-9);

    let single = Package::for_items(&[PackageItem { quantity: 1, ..tee }]);
    assert_eq!(single.height_cm, 2.0);
    assert_eq!(single.width_cm, 11.0);
    assert_eq!(single.length_cm, 16.0);
  }
}
