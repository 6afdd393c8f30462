// core/src/cep.rs

//! CEP (Brazilian postal code) parsing and the postal lookup seam.

use crate::error::{CoreError, CoreResult};
use async_trait::async_trait;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::fmt;

/// An 8-digit postal code.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Cep(String);

impl Cep {
  /// Accepts `01310-100`, `01310100` or `01310 100`.
  pub fn parse(input: &str) -> CoreResult<Self> {
    let trimmed = input.trim();
    let mut digits = String::with_capacity(8);
    for ch in trimmed.chars() {
      match ch {
        '0'..='9' => digits.push(ch),
        '-' | ' ' | '.' => {}
        _ => return Err(CoreError::InvalidCep(input.to_string())),
      }
    }
    if digits.len() != 8 || digits.bytes().all(|b| b == b'0') {
      return Err(CoreError::InvalidCep(input.to_string()));
    }
    Ok(Cep(digits))
  }

  pub fn digits(&self) -> &str {
    &self.0
  }

  pub fn formatted(&self) -> String {
    format!("{}-{}", &self.0[..5], &self.0[5..])
  }
}

impl fmt::Display for Cep {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    f.write_str(&self.formatted())
  }
}

impl Serialize for Cep {
  fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
    serializer.serialize_str(&self.0)
  }
}

impl<'de> Deserialize<'de> for Cep {
  fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
    let raw = String::deserialize(deserializer)?;
    Cep::parse(&raw).map_err(serde::de::Error::custom)
  }
}

/// Address resolved from a CEP, used to pre-fill the checkout form.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PostalAddress {
  pub cep: Cep,
  pub street: String,
  pub neighborhood: String,
  pub city: String,
  /// Two-letter state code (`SP`, `RJ`, ...).
  pub state: String,
}

/// Resolves a CEP to an address. `Ok(None)` means the CEP is well-formed but unknown.
#[async_trait]
pub trait PostalLookup: Send + Sync {
  async fn lookup(&self, cep: &Cep) -> CoreResult<Option<PostalAddress>>;
}
