// server/src/models/product.rs

use chrono::{DateTime, Utc};
use sqlx::FromRow;
use storefront_core::{Money, Product, ProductId};
use uuid::Uuid;

/// Column list shared by every product query.
pub const PRODUCT_COLUMNS: &str = "p.id, p.name, p.slug, p.description, p.price_cents, p.compare_at_price_cents, \
   p.category_id, p.sizes, p.stock_quantity, p.active, p.created_at";

#[derive(Debug, Clone, FromRow)]
pub struct ProductRow {
  pub id: Uuid,
  pub name: String,
  pub slug: String,
  pub description: Option<String>, // Description can be optional
  pub price_cents: i64,
  pub compare_at_price_cents: Option<i64>,
  pub category_id: Option<Uuid>,
  pub sizes: Vec<String>,
  pub stock_quantity: i32,
  pub active: bool,
  pub created_at: DateTime<Utc>,
}

impl From<ProductRow> for Product {
  fn from(row: ProductRow) -> Self {
    Product {
      id: ProductId(row.id),
      name: row.name,
      slug: row.slug,
      description: row.description,
      price: Money::from_cents(row.price_cents),
      compare_at_price: row.compare_at_price_cents.map(Money::from_cents),
      category_id: row.category_id,
      sizes: row.sizes,
      stock_quantity: row.stock_quantity,
      active: row.active,
      created_at: row.created_at,
    }
  }
}
