// server/src/main.rs

mod config;
mod errors;
mod models;
mod services;
mod state;
#[cfg(test)]
mod test_support;
mod web;

use crate::config::AppConfig;
use crate::services::{auth_service, http};
use crate::state::AppState;

use actix_web::{web as actix_data, App, HttpServer}; // Renamed web to actix_data
use sqlx::postgres::PgPoolOptions;
use std::sync::Arc;
use std::time::Duration;
use tracing::Level;
use tracing_subscriber::fmt::format::FmtSpan; // For span events in tracing

const DB_MAX_CONNECTIONS: u32 = 10;

#[actix_web::main]
async fn main() -> std::io::Result<()> {
  tracing_subscriber::fmt()
    .with_max_level(Level::INFO) // Default level
    .with_env_filter(tracing_subscriber::EnvFilter::from_default_env()) // Allow RUST_LOG override
    .with_span_events(FmtSpan::CLOSE) // Log when spans close, showing duration
    .init();

  tracing::info!("Starting storefront server...");

  let app_config = match AppConfig::from_env() {
    Ok(cfg) => Arc::new(cfg),
    Err(e) => {
      tracing::error!(error = %e, "Failed to load application configuration.");
      return Err(std::io::Error::new(std::io::ErrorKind::InvalidInput, e.to_string()));
    }
  };

  let db_pool = match PgPoolOptions::new()
    .max_connections(DB_MAX_CONNECTIONS)
    .acquire_timeout(Duration::from_secs(5))
    .connect(&app_config.database_url)
    .await
  {
    Ok(pool) => {
      tracing::info!("Successfully connected to the database.");
      pool
    }
    Err(e) => {
      tracing::error!(error = %e, "Failed to connect to the database.");
      return Err(std::io::Error::new(std::io::ErrorKind::ConnectionRefused, e.to_string()));
    }
  };

  if let Err(e) = auth_service::ensure_bootstrap_admin(&db_pool, &app_config).await {
    tracing::error!(error = %e, "Failed to create the bootstrap admin account.");
    return Err(std::io::Error::new(std::io::ErrorKind::Other, e.to_string()));
  }

  let http_client = http::build_client().map_err(|e| std::io::Error::new(std::io::ErrorKind::Other, e.to_string()))?;
  let app_state = AppState::from_config(app_config.clone(), db_pool, http_client);
  tracing::info!(
    audience_sync = app_config.audience_enabled(),
    welcome_email = app_state.mailer.is_some(),
    "Provider clients initialized."
  );

  let server_address = format!("{}:{}", app_config.server_host, app_config.server_port);
  tracing::info!("Attempting to bind server to {}...", server_address);

  HttpServer::new(move || {
    App::new()
      .app_data(actix_data::Data::new(app_state.clone())) // Share AppState with handlers
      .wrap(tracing_actix_web::TracingLogger::default()) // Actix middleware for tracing requests
      .configure(web::configure_app_routes)
  })
  .bind(&server_address)?
  .run()
  .await
}
