// server/src/web/handlers/mod.rs

pub mod admin_handlers;
pub mod cep_handlers;
pub mod checkout_handlers;
pub mod event_handlers;
pub mod newsletter_handlers;
pub mod product_handlers;
pub mod shipping_handlers;
