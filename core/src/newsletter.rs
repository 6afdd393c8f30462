// core/src/newsletter.rs

use crate::error::{CoreError, CoreResult};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

const MAX_EMAIL_LEN: usize = 254;

/// Trims and lowercases an address, rejecting anything that is obviously not
/// deliverable. This is a sanity check, not RFC 5322 parsing.
pub fn normalize_email(input: &str) -> CoreResult<String> {
  let email = input.trim().to_lowercase();
  let invalid = || CoreError::InvalidEmail(input.trim().to_string());

  if email.is_empty() || email.len() > MAX_EMAIL_LEN || email.contains(char::is_whitespace) {
    return Err(invalid());
  }
  let (local, domain) = email.split_once('@').ok_or_else(invalid)?;
  if local.is_empty() || domain.contains('@') {
    return Err(invalid());
  }
  let labels: Vec<&str> = domain.split('.').collect();
  if labels.len() < 2 || labels.iter().any(|l| l.is_empty() || l.starts_with('-') || l.ends_with('-')) {
    return Err(invalid());
  }
  Ok(email)
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Subscriber {
  pub email: String,
  /// Where the signup happened (`footer`, `popup`, `checkout`, ...).
  pub source: Option<String>,
  pub subscribed_at: DateTime<Utc>,
}

/// Mailing-list provider that mirrors the subscriber table.
#[async_trait]
pub trait AudienceSync: Send + Sync {
  async fn upsert_contact(&self, subscriber: &Subscriber) -> CoreResult<()>;
}
