// core/src/money.rs

//! BRL amounts stored as integer centavos.

use crate::error::{CoreError, CoreResult};
use serde::{Deserialize, Serialize};
use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Money {
  pub amount_cents: i64,
}

impl Money {
  pub const ZERO: Money = Money { amount_cents: 0 };

  pub fn from_cents(amount_cents: i64) -> Self {
    Self { amount_cents }
  }

  /// Parses provider decimal strings such as `"23.50"`, `"23,5"` or `"23"`.
  ///
  /// At most two fraction digits are accepted and negative values are rejected.
  pub fn from_decimal_str(input: &str) -> CoreResult<Self> {
    let invalid = |reason: &str| CoreError::InvalidAmount {
      input: input.to_string(),
      reason: reason.to_string(),
    };

    let trimmed = input.trim();
    if trimmed.is_empty() {
      return Err(invalid("empty"));
    }
    if trimmed.starts_with('-') {
      return Err(invalid("negative amounts are not allowed"));
    }

    let (whole, fraction) = match trimmed.find(['.', ',']) {
      Some(idx) => (&trimmed[..idx], &trimmed[idx + 1..]),
      None => (trimmed, ""),
    };

    if whole.is_empty() || !whole.bytes().all(|b| b.is_ascii_digit()) {
      return Err(invalid("integer part must be digits"));
    }
    if fraction.len() > 2 || !fraction.bytes().all(|b| b.is_ascii_digit()) {
      return Err(invalid("fraction must be at most two digits"));
    }

    let whole_value: i64 = whole.parse().map_err(|_| invalid("integer part out of range"))?;
    let fraction_value: i64 = match fraction.len() {
      0 => 0,
      1 => fraction.parse::<i64>().map_err(|_| invalid("bad fraction"))? * 10,
      _ => fraction.parse::<i64>().map_err(|_| invalid("bad fraction"))?,
    };

    whole_value
      .checked_mul(100)
      .and_then(|cents| cents.checked_add(fraction_value))
      .map(Money::from_cents)
      .ok_or_else(|| invalid("amount out of range"))
  }

  /// Decimal value for provider APIs that take JSON numbers.
  pub fn as_decimal(&self) -> f64 {
    self.amount_cents as f64 / 100.0
  }

  pub fn checked_add(self, other: Money) -> Option<Money> {
    self.amount_cents.checked_add(other.amount_cents).map(Money::from_cents)
  }

  pub fn multiply(self, quantity: u32) -> Option<Money> {
    self.amount_cents.checked_mul(i64::from(quantity)).map(Money::from_cents)
  }

  pub fn is_positive(&self) -> bool {
    self.amount_cents > 0
  }
}

impl fmt::Display for Money {
  /// Formats as `R$ 1.234,56`.
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    let sign = if self.amount_cents < 0 { "-" } else { "" };
    let abs = self.amount_cents.unsigned_abs();
    let whole = (abs / 100).to_string();
    let cents = abs % 100;

    let mut grouped = String::with_capacity(whole.len() + whole.len() / 3);
    for (i, ch) in whole.chars().enumerate() {
      if i > 0 && (whole.len() - i) % 3 == 0 {
        grouped.push('.');
      }
      grouped.push(ch);
    }

    write!(f, "{}R$ {},{:02}", sign, grouped, cents)
  }
}
