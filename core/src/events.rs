// core/src/events.rs

//! Storefront analytics: page views and commerce funnel events, plus the
//! funnel summary shown on the admin dashboard.

use crate::catalog::ProductId;
use crate::error::{CoreError, CoreResult};
use crate::money::Money;
use serde::{Deserialize, Serialize};
use std::fmt;

const MAX_METADATA_BYTES: usize = 4 * 1024;
const MAX_PATH_LEN: usize = 2048;
const MAX_SESSION_ID_LEN: usize = 128;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EventKind {
  PageView,
  ViewItem,
  AddToCart,
  RemoveFromCart,
  BeginCheckout,
  AddShippingInfo,
  AddPaymentInfo,
  Purchase,
  Search,
  NewsletterSignup,
}

impl EventKind {
  pub const ALL: [EventKind; 10] = [
    EventKind::PageView,
    EventKind::ViewItem,
    EventKind::AddToCart,
    EventKind::RemoveFromCart,
    EventKind::BeginCheckout,
    EventKind::AddShippingInfo,
    EventKind::AddPaymentInfo,
    EventKind::Purchase,
    EventKind::Search,
    EventKind::NewsletterSignup,
  ];

  pub fn as_str(&self) -> &'static str {
    match self {
      EventKind::PageView => "page_view",
      EventKind::ViewItem => "view_item",
      EventKind::AddToCart => "add_to_cart",
      EventKind::RemoveFromCart => "remove_from_cart",
      EventKind::BeginCheckout => "begin_checkout",
      EventKind::AddShippingInfo => "add_shipping_info",
      EventKind::AddPaymentInfo => "add_payment_info",
      EventKind::Purchase => "purchase",
      EventKind::Search => "search",
      EventKind::NewsletterSignup => "newsletter_signup",
    }
  }

  pub fn parse(s: &str) -> Option<EventKind> {
    EventKind::ALL.into_iter().find(|k| k.as_str() == s)
  }

  /// Events that are about one specific product.
  pub fn requires_product(&self) -> bool {
    matches!(
      self,
      EventKind::ViewItem | EventKind::AddToCart | EventKind::RemoveFromCart
    )
  }
}

impl fmt::Display for EventKind {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    f.write_str(self.as_str())
  }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TrackedEvent {
  pub kind: EventKind,
  /// Anonymous per-browser session identifier.
  pub session_id: String,
  pub page_path: String,
  #[serde(default)]
  pub product_id: Option<ProductId>,
  #[serde(default)]
  pub value: Option<Money>,
  #[serde(default)]
  pub metadata: Option<serde_json::Value>,
}

impl TrackedEvent {
  pub fn validate(&self) -> CoreResult<()> {
    let session = self.session_id.trim();
    if session.is_empty() || session.len() > MAX_SESSION_ID_LEN {
      return Err(CoreError::validation(
        "session_id",
        format!("must be 1 to {} characters", MAX_SESSION_ID_LEN),
      ));
    }
    if !self.page_path.starts_with('/') || self.page_path.len() > MAX_PATH_LEN {
      return Err(CoreError::validation("page_path", "must be an absolute path"));
    }
    if self.kind.requires_product() && self.product_id.is_none() {
      return Err(CoreError::validation(
        "product_id",
        format!("required for '{}' events", self.kind),
      ));
    }
    if let Some(value) = self.value {
      if value.amount_cents < 0 {
        return Err(CoreError::validation("value", "must not be negative"));
      }
    }
    if let Some(metadata) = &self.metadata {
      if !metadata.is_object() {
        return Err(CoreError::validation("metadata", "must be a JSON object"));
      }
      let size = serde_json::to_vec(metadata)
        .map_err(|e| CoreError::validation("metadata", e.to_string()))?
        .len();
      if size > MAX_METADATA_BYTES {
        return Err(CoreError::validation(
          "metadata",
          format!("{} bytes exceeds the {} byte limit", size, MAX_METADATA_BYTES),
        ));
      }
    }
    Ok(())
  }
}

/// Distinct sessions that reached each funnel step within some window.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct FunnelCounts {
  pub sessions: u64,
  pub viewed_item: u64,
  pub added_to_cart: u64,
  pub began_checkout: u64,
  pub purchased: u64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FunnelStep {
  pub name: String,
  pub sessions: u64,
  /// Share of the previous step that reached this one, 0.0 to 1.0.
  pub step_rate: f64,
  /// Share of all sessions that reached this step.
  pub overall_rate: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FunnelSummary {
  pub steps: Vec<FunnelStep>,
  pub conversion_rate: f64,
}

fn ratio(part: u64, whole: u64) -> f64 {
  if whole == 0 {
    0.0
  } else {
    part as f64 / whole as f64
  }
}

impl FunnelSummary {
  pub fn from_counts(counts: FunnelCounts) -> Self {
    let ordered = [
      ("sessions", counts.sessions),
      ("view_item", counts.viewed_item),
      ("add_to_cart", counts.added_to_cart),
      ("begin_checkout", counts.began_checkout),
      ("purchase", counts.purchased),
    ];

    let mut steps = Vec::with_capacity(ordered.len());
    let mut previous = counts.sessions;
    for (name, sessions) in ordered {
      steps.push(FunnelStep {
        name: name.to_string(),
        sessions,
        step_rate: ratio(sessions, previous),
        overall_rate: ratio(sessions, counts.sessions),
      });
      previous = sessions;
    }

    FunnelSummary {
      steps,
      conversion_rate: ratio(counts.purchased, counts.sessions),
    }
  }
}
