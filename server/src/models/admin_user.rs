// server/src/models/admin_user.rs

use chrono::{DateTime, Utc};
use serde::Serialize;
use sqlx::FromRow;
use uuid::Uuid;

#[derive(Debug, Clone, Serialize, FromRow)]
pub struct AdminUser {
  pub id: Uuid,
  pub email: String,
  #[serde(skip_serializing)] // Never send password hash to client
  pub password_hash: String,
  /// Base32 secret; present once setup started, trusted only when `totp_enabled`.
  #[serde(skip_serializing)]
  pub totp_secret: Option<String>,
  pub totp_enabled: bool,
  /// Last accepted TOTP time step, rejects replays of the same code.
  #[serde(skip_serializing)]
  pub totp_last_step: Option<i64>,
  pub created_at: DateTime<Utc>,
}
