// server/src/models/subscriber.rs

use chrono::{DateTime, Utc};
use sqlx::FromRow;
use storefront_core::Subscriber;

/// Row returned by the subscribe upsert; `inserted` is false when the email already existed.
#[derive(Debug, Clone, FromRow)]
pub struct SubscriberRow {
  pub email: String,
  pub source: Option<String>,
  pub subscribed_at: DateTime<Utc>,
  pub inserted: bool,
}

impl SubscriberRow {
  pub fn to_subscriber(&self) -> Subscriber {
    Subscriber {
      email: self.email.clone(),
      source: self.source.clone(),
      subscribed_at: self.subscribed_at,
    }
  }
}
