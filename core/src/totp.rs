// core/src/totp.rs

//! Time-based one-time passwords (RFC 6238) for administrator two-factor auth.
//!
//! Parameters are the ones every authenticator app assumes by default:
//! HMAC-SHA1, 6 digits, 30 second steps.

use crate::error::{CoreError, CoreResult};
use data_encoding::BASE32_NOPAD;
use hmac::{Hmac, Mac};
use rand::{rngs::OsRng, RngCore};
use sha1::Sha1;
use std::fmt;

type HmacSha1 = Hmac<Sha1>;

pub const DIGITS: usize = 6;
pub const STEP_SECONDS: u64 = 30;
/// Steps accepted on either side of the current one, to absorb clock drift.
pub const DEFAULT_SKEW_STEPS: u64 = 1;

const GENERATED_SECRET_LEN: usize = 20;
const MIN_SECRET_LEN: usize = 10;

#[derive(Clone)]
pub struct TotpSecret {
  key: Vec<u8>,
  mac: HmacSha1,
}

impl TotpSecret {
  /// 160 random bits from the OS generator.
  pub fn generate() -> Self {
    let mut key = vec![0u8; GENERATED_SECRET_LEN];
    OsRng.fill_bytes(&mut key);
    // Length is fixed above the minimum, so this cannot fail.
    Self::from_bytes(key).unwrap_or_else(|_| unreachable!("generated TOTP secret has a valid length"))
  }

  pub fn from_bytes(key: Vec<u8>) -> CoreResult<Self> {
    if key.len() < MIN_SECRET_LEN {
      return Err(CoreError::InvalidTotpSecret(format!(
        "secret must be at least {} bytes, got {}",
        MIN_SECRET_LEN,
        key.len()
      )));
    }
    let mac = HmacSha1::new_from_slice(&key).map_err(|e| CoreError::InvalidTotpSecret(e.to_string()))?;
    Ok(Self { key, mac })
  }

  /// Accepts the base32 form shown to users, ignoring case, spaces and padding.
  pub fn from_base32(encoded: &str) -> CoreResult<Self> {
    let cleaned: String = encoded
      .chars()
      .filter(|c| !c.is_whitespace() && *c != '=')
      .map(|c| c.to_ascii_uppercase())
      .collect();
    let key = BASE32_NOPAD
      .decode(cleaned.as_bytes())
      .map_err(|e| CoreError::InvalidTotpSecret(e.to_string()))?;
    Self::from_bytes(key)
  }

  pub fn to_base32(&self) -> String {
    BASE32_NOPAD.encode(&self.key)
  }

  /// HOTP value (RFC 4226) for a counter, as a zero-padded string.
  fn hotp(&self, counter: u64) -> String {
    let mut mac = self.mac.clone();
    mac.update(&counter.to_be_bytes());
    let hash = mac.finalize().into_bytes();

    let offset = (hash[hash.len() - 1] & 0x0f) as usize;
    let binary = (u32::from(hash[offset] & 0x7f) << 24)
      | (u32::from(hash[offset + 1]) << 16)
      | (u32::from(hash[offset + 2]) << 8)
      | u32::from(hash[offset + 3]);
    let code = binary % 10u32.pow(DIGITS as u32);
    format!("{:0width$}", code, width = DIGITS)
  }

  pub fn code_at(&self, unix_seconds: u64) -> String {
    self.hotp(unix_seconds / STEP_SECONDS)
  }

  /// Checks `code` against the step containing `unix_seconds` and `skew_steps`
  /// steps on each side. Returns the matching step so callers can refuse to
  /// accept the same step twice.
  pub fn verify(&self, code: &str, unix_seconds: u64, skew_steps: u64) -> Option<u64> {
    let code: String = code.chars().filter(|c| !c.is_whitespace()).collect();
    if code.len() != DIGITS || !code.bytes().all(|b| b.is_ascii_digit()) {
      return None;
    }

    let current = unix_seconds / STEP_SECONDS;
    let first = current.saturating_sub(skew_steps);
    let last = current.saturating_add(skew_steps);
    // Walk every candidate so timing does not depend on which one matched.
    let mut matched = None;
    for step in first..=last {
      if constant_time_eq(self.hotp(step).as_bytes(), code.as_bytes()) && matched.is_none() {
        matched = Some(step);
      }
    }
    matched
  }

  /// `otpauth://` URI rendered as a QR code during enrollment.
  pub fn provisioning_uri(&self, issuer: &str, account: &str) -> String {
    format!(
      "otpauth://totp/{}:{}?secret={}&issuer={}&algorithm=SHA1&digits={}&period={}",
      percent_encode(issuer),
      percent_encode(account),
      self.to_base32(),
      percent_encode(issuer),
      DIGITS,
      STEP_SECONDS
    )
  }
}

impl fmt::Debug for TotpSecret {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    f.write_str("TotpSecret([REDACTED])")
  }
}

fn constant_time_eq(a: &[u8], b: &[u8]) -> bool {
  if a.len() != b.len() {
    return false;
  }
  a.iter().zip(b).fold(0u8, |acc, (x, y)| acc | (x ^ y)) == 0
}

fn percent_encode(input: &str) -> String {
  let mut out = String::with_capacity(input.len());
  for byte in input.bytes() {
    match byte {
      b'A'..=b'Z' | b'a'..=b'z' | b'0'..=b'9' | b'-' | b'.' | b'_' | b'~' | b'@' => out.push(byte as char),
      _ => out.push_str(&format!("%{:02X}", byte)),
    }
  }
  out
}
