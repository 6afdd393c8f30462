// src/lib.rs

//! Domain logic behind the clothing storefront's backend.
//!
//! No HTTP or database code lives here. The crate provides:
//!  - CPF validation and formatting (`cpf`), CEP parsing (`cep`).
//!  - BRL money handling (`money`).
//!  - Shipping quote shapes and the carrier-aggregator adapter (`shipping`).
//!  - Payment preference drafts and the provider wire shape (`payment`).
//!  - A per-product color image cache that coalesces concurrent fetches (`image_cache`).
//!  - RFC 6238 TOTP for administrator two-factor auth (`totp`).
//!  - Analytics events and funnel summaries (`events`).
//!
//! Every external provider sits behind an async trait so the server can plug
//! in real HTTP clients and tests can plug in fakes.

pub mod catalog;
pub mod cep;
pub mod cpf;
pub mod error;
pub mod events;
pub mod image_cache;
pub mod money;
pub mod newsletter;
pub mod payment;
pub mod shipping;
pub mod totp;

// --- Re-exports for the Public API ---

pub use crate::catalog::{Category, ColorImage, Product, ProductId};
pub use crate::cep::{Cep, PostalAddress, PostalLookup};
pub use crate::cpf::{is_valid_cpf, mask_cpf_input, Cpf};
pub use crate::error::{CoreError, CoreResult};
pub use crate::events::{EventKind, FunnelCounts, FunnelSummary, TrackedEvent};
pub use crate::image_cache::{ColorImageCache, ColorImageSource};
pub use crate::money::Money;
pub use crate::newsletter::{normalize_email, AudienceSync, Subscriber};
pub use crate::payment::{PaymentGateway, PreferenceDraft, PreferenceRequest, PreferenceResponse};
pub use crate::shipping::{Package, ShippingOption, ShippingQuoteRequest, ShippingQuoter};
pub use crate::totp::TotpSecret;
