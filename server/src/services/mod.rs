// server/src/services/mod.rs

//! Outbound provider clients and server-side services.

pub mod admin_sessions;
pub mod audience_client;
pub mod auth_service;
pub mod color_image_store;
pub mod email_client;
pub mod http;
pub mod payment_client;
pub mod postal_client;
pub mod shipping_client;
