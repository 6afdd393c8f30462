// server/src/models/customer.rs

use chrono::{DateTime, Utc};
use serde::Serialize;
use sqlx::FromRow;
use uuid::Uuid;

#[derive(Debug, Clone, Serialize, FromRow)]
pub struct Customer {
  pub id: Uuid,
  pub name: String,
  pub email: String,
  /// CPF digits only.
  pub cpf: String,
  pub created_at: DateTime<Utc>,
}
