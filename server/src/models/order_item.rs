// server/src/models/order_item.rs

use serde::Serialize;
use sqlx::FromRow;
use uuid::Uuid;

#[derive(Debug, Clone, Serialize, FromRow)]
pub struct OrderItem {
  pub id: Uuid,
  pub order_id: Uuid,
  pub product_id: Uuid,
  pub title: String,
  pub size: Option<String>,
  pub color: Option<String>,
  pub quantity: i32,
  pub unit_price_cents: i64,
}
