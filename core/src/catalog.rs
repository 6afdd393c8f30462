// core/src/catalog.rs

//! Catalog records shared between the cache, checkout and the HTTP layer.

use crate::money::Money;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use uuid::Uuid;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ProductId(pub Uuid);

impl ProductId {
  pub fn generate() -> Self {
    ProductId(Uuid::new_v4())
  }
}

impl From<Uuid> for ProductId {
  fn from(id: Uuid) -> Self {
    ProductId(id)
  }
}

impl fmt::Display for ProductId {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    self.0.fmt(f)
  }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Category {
  pub id: Uuid,
  pub name: String,
  pub slug: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Product {
  pub id: ProductId,
  pub name: String,
  pub slug: String,
  pub description: Option<String>,
  pub price: Money,
  /// Original price shown struck through when the product is on sale.
  pub compare_at_price: Option<Money>,
  pub category_id: Option<Uuid>,
  pub sizes: Vec<String>,
  pub stock_quantity: i32,
  pub active: bool,
  pub created_at: DateTime<Utc>,
}

impl Product {
  pub fn is_on_sale(&self) -> bool {
    matches!(self.compare_at_price, Some(original) if original > self.price)
  }

  pub fn in_stock(&self) -> bool {
    self.active && self.stock_quantity > 0
  }
}

/// One color variant photo of a product.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ColorImage {
  pub id: Uuid,
  pub product_id: ProductId,
  pub color_name: String,
  pub color_hex: Option<String>,
  pub image_url: String,
  pub position: i32,
}

/// Orders color images by gallery position, then color name.
pub fn sort_color_images(images: &mut [ColorImage]) {
  images.sort_by(|a, b| a.position.cmp(&b.position).then_with(|| a.color_name.cmp(&b.color_name)));
}
