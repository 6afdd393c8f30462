// server/src/services/admin_sessions.rs

//! In-memory admin sessions keyed by opaque bearer tokens.

use chrono::{DateTime, Duration, Utc};
use parking_lot::Mutex;
use rand_core::{OsRng, RngCore};
use std::collections::HashMap;
use std::fmt::Write;
use tracing::debug;
use uuid::Uuid;

const TOKEN_BYTES: usize = 32;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AdminSession {
  pub admin_id: Uuid,
  pub email: String,
  pub expires_at: DateTime<Utc>,
}

pub struct AdminSessions {
  ttl: Duration,
  sessions: Mutex<HashMap<String, AdminSession>>,
}

fn new_token() -> String {
  let mut bytes = [0u8; TOKEN_BYTES];
  OsRng.fill_bytes(&mut bytes);
  bytes.iter().fold(String::with_capacity(TOKEN_BYTES * 2), |mut out, b| {
    let _ = write!(out, "{:02x}", b);
    out
  })
}

impl AdminSessions {
  pub fn new(ttl: Duration) -> Self {
    Self {
      ttl,
      sessions: Mutex::new(HashMap::new()),
    }
  }

  /// Opens a session and returns its token.
  pub fn create(&self, admin_id: Uuid, email: &str) -> (String, AdminSession) {
    self.create_at(admin_id, email, Utc::now())
  }

  fn create_at(&self, admin_id: Uuid, email: &str, now: DateTime<Utc>) -> (String, AdminSession) {
    let token = new_token();
    let session = AdminSession {
      admin_id,
      email: email.to_string(),
      expires_at: now + self.ttl,
    };
    let mut sessions = self.sessions.lock();
    // Opportunistic sweep keeps the map from growing with abandoned sessions.
    sessions.retain(|_, s| s.expires_at > now);
    sessions.insert(token.clone(), session.clone());
    debug!(%admin_id, active = sessions.len(), "Admin session created.");
    (token, session)
  }

  pub fn validate(&self, token: &str) -> Option<AdminSession> {
    self.validate_at(token, Utc::now())
  }

  fn validate_at(&self, token: &str, now: DateTime<Utc>) -> Option<AdminSession> {
    let mut sessions = self.sessions.lock();
    match sessions.get(token) {
      Some(session) if session.expires_at > now => Some(session.clone()),
      Some(_) => {
        sessions.remove(token);
        None
      }
      None => None,
    }
  }

  /// Returns whether a session was actually removed.
  pub fn revoke(&self, token: &str) -> bool {
    self.sessions.lock().remove(token).is_some()
  }

  pub fn active_count(&self) -> usize {
    self.sessions.lock().len()
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn tokens_are_random_hex() {
    let a = new_token();
    assert_eq!(a.len(), TOKEN_BYTES * 2);
    assert!(a.chars().all(|c| c.is_ascii_hexdigit()));
    assert_ne!(a, new_token());
  }

  #[test]
  fn sessions_expire_and_revoke() {
    let sessions = AdminSessions::new(Duration::minutes(10));
    let admin_id = Uuid::new_v4();
    let start = Utc::now();
    let (token, session) = sessions.create_at(admin_id, "admin@loja.com", start);
    assert_eq!(session.expires_at, start + Duration::minutes(10));

    assert_eq!(sessions.validate_at(&token, start + Duration::minutes(9)).map(|s| s.admin_id), Some(admin_id));
    assert!(sessions.validate_at(&token, start + Duration::minutes(11)).is_none());
    // Expired sessions are dropped on sight.
    assert_eq!(sessions.active_count(), 0);

    let (token, _) = sessions.create(admin_id, "admin@loja.com");
    assert!(sessions.revoke(&token));
    assert!(!sessions.revoke(&token));
    assert!(sessions.validate(&token).is_none());
  }
}
