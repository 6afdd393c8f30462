// server/src/models/order.rs

use chrono::{DateTime, Utc};
use serde::Serialize;
use sqlx::{FromRow, Type as SqlxType};
use uuid::Uuid; // Renamed Type to SqlxType to avoid conflict

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, SqlxType)]
#[sqlx(type_name = "order_status_enum", rename_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum OrderStatus {
  /// Preference created, buyer not yet redirected back.
  AwaitingPayment,
  Paid,
  Failed,
  Shipped,
  Delivered,
  Cancelled,
}

#[derive(Debug, Clone, Serialize, FromRow)]
pub struct Order {
  pub id: Uuid,
  pub customer_id: Option<Uuid>,
  /// Email given at checkout, which may differ from the customer's stored one.
  pub contact_email: Option<String>,
  pub status: OrderStatus,
  pub items_total_cents: i64,
  pub shipping_cents: i64,
  pub total_cents: i64,
  pub currency: String,
  pub shipping_cep: Option<String>,
  pub shipping_service: Option<String>,
  pub payment_preference_id: Option<String>,
  pub created_at: DateTime<Utc>,
  pub updated_at: DateTime<Utc>,
}
