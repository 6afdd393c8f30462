// core/src/cpf.rs

//! CPF (Cadastro de Pessoas Físicas) parsing and modulo-11 check-digit validation.

use crate::error::{CoreError, CoreResult};
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::fmt;

const CPF_LEN: usize = 11;

/// Computes both check digits for the first nine digits of a CPF.
pub(crate) fn check_digits(base: &[u8; 9]) -> (u8, u8) {
  let first = check_digit(base);
  let mut with_first = [0u8; 10];
  with_first[..9].copy_from_slice(base);
  with_first[9] = first;
  (first, check_digit(&with_first))
}

/// Weights run from `len + 1` down to 2; a remainder of 10 maps to 0.
fn check_digit(digits: &[u8]) -> u8 {
  let top_weight = digits.len() as u32 + 1;
  let sum: u32 = digits
    .iter()
    .enumerate()
    .map(|(i, d)| u32::from(*d) * (top_weight - i as u32))
    .sum();
  let remainder = (sum * 10) % 11;
  if remainder == 10 {
    0
  } else {
    remainder as u8
  }
}

/// Strips the usual punctuation and returns the raw digits, or `None` when
/// anything other than digits, dots, dashes or spaces is present.
fn extract_digits(input: &str) -> Option<Vec<u8>> {
  let mut digits = Vec::with_capacity(CPF_LEN);
  for ch in input.chars() {
    match ch {
      '0'..='9' => digits.push(ch as u8 - b'0'),
      '.' | '-' | ' ' => {}
      _ => return None,
    }
  }
  Some(digits)
}

/// Returns `true` when `input` is a well-formed CPF with correct check digits.
///
/// Formatting characters (`.`, `-`, spaces) are ignored. Sequences of a single
/// repeated digit (`111.111.111-11`) satisfy the checksum but are rejected.
pub fn is_valid_cpf(input: &str) -> bool {
  let Some(digits) = extract_digits(input) else {
    return false;
  };
  if digits.len() != CPF_LEN {
    return false;
  }
  if digits.iter().all(|d| *d == digits[0]) {
    return false;
  }

  let mut base = [0u8; 9];
  base.copy_from_slice(&digits[..9]);
  let (first, second) = check_digits(&base);
  digits[9] == first && digits[10] == second
}

/// A validated CPF, stored as its 11 digits.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Cpf(String);

impl Cpf {
  pub fn parse(input: &str) -> CoreResult<Self> {
    if !is_valid_cpf(input) {
      return Err(CoreError::InvalidCpf(input.to_string()));
    }
    let digits: String = input.chars().filter(|c| c.is_ascii_digit()).collect();
    Ok(Cpf(digits))
  }

  pub fn digits(&self) -> &str {
    &self.0
  }

  /// `000.000.000-00`
  pub fn formatted(&self) -> String {
    format!("{}.{}.{}-{}", &self.0[0..3], &self.0[3..6], &self.0[6..9], &self.0[9..11])
  }
}

impl fmt::Display for Cpf {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    f.write_str(&self.formatted())
  }
}

impl Serialize for Cpf {
  fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
    serializer.serialize_str(&self.0)
  }
}

impl<'de> Deserialize<'de> for Cpf {
  fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
    let raw = String::deserialize(deserializer)?;
    Cpf::parse(&raw).map_err(serde::de::Error::custom)
  }
}

/// Progressive mask for a CPF being typed: keeps at most 11 digits and inserts
/// separators only once the following digit exists (`5299` -> `529.9`).
pub fn mask_cpf_input(partial: &str) -> String {
  let mut out = String::with_capacity(14);
  for (i, ch) in partial.chars().filter(|c| c.is_ascii_digit()).take(CPF_LEN).enumerate() {
    match i {
      3 | 6 => out.push('.'),
      9 => out.push('-'),
      _ => {}
    }
    out.push(ch);
  }
  out
}
