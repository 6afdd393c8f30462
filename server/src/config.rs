// server/src/config.rs

use crate::errors::{AppError, Result}; // Use AppError specific Result
use dotenvy::dotenv;
use std::env;
use storefront_core::Cep;

#[derive(Debug, Clone)]
pub struct AppConfig {
  pub server_host: String,
  pub server_port: u16,
  pub database_url: String,
  /// Public storefront URL; payment return URLs hang off it.
  pub app_base_url: String,

  // Carrier aggregator
  pub shipping_api_url: String,
  pub shipping_api_token: String,
  pub shipping_origin_cep: Cep,
  pub shipping_user_agent: String,

  // Payment provider
  pub payment_api_url: String,
  pub payment_access_token: String,
  pub payment_sandbox: bool,
  pub payment_notification_url: Option<String>,

  // Mailing list sync, disabled unless key and list are both set
  pub audience_api_url: String,
  pub audience_api_key: Option<String>,
  pub audience_list_id: Option<i64>,

  // Transactional email, disabled without a key
  pub email_api_url: String,
  pub email_api_key: Option<String>,
  pub email_sender: String,

  pub cep_api_url: String,

  pub totp_issuer: String,
  pub admin_session_ttl_minutes: i64,
  /// First admin account, created at startup when it does not exist yet.
  pub admin_bootstrap_email: Option<String>,
  pub admin_bootstrap_password: Option<String>,
}

fn optional(var_name: &str) -> Option<String> {
  env::var(var_name).ok().filter(|v| !v.trim().is_empty())
}

impl AppConfig {
  pub fn from_env() -> Result<Self> {
    dotenv().ok(); // Load .env file if present

    let get_env = |var_name: &str| {
      env::var(var_name).map_err(|e| AppError::Config(format!("Missing environment variable '{}': {}", var_name, e)))
    };

    let server_host = get_env("SERVER_HOST").unwrap_or_else(|_| "127.0.0.1".to_string());
    let server_port = get_env("SERVER_PORT")
      .unwrap_or_else(|_| "8080".to_string())
      .parse::<u16>()
      .map_err(|e| AppError::Config(format!("Invalid SERVER_PORT: {}", e)))?;
    let database_url = get_env("DATABASE_URL")?;
    let app_base_url = get_env("APP_BASE_URL").unwrap_or_else(|_| format!("http://{}:{}", server_host, server_port));

    let shipping_api_url =
      get_env("SHIPPING_API_URL").unwrap_or_else(|_| "https://sandbox.melhorenvio.com.br".to_string());
    let shipping_api_token = get_env("SHIPPING_API_TOKEN")?;
    let origin_raw = get_env("SHIPPING_ORIGIN_CEP").unwrap_or_else(|_| "01310100".to_string());
    let shipping_origin_cep =
      Cep::parse(&origin_raw).map_err(|e| AppError::Config(format!("Invalid SHIPPING_ORIGIN_CEP: {}", e)))?;
    let shipping_user_agent =
      get_env("SHIPPING_USER_AGENT").unwrap_or_else(|_| "Storefront (contato@example.com)".to_string());

    let payment_api_url = get_env("PAYMENT_API_URL").unwrap_or_else(|_| "https://api.mercadopago.com".to_string());
    let payment_access_token = get_env("PAYMENT_ACCESS_TOKEN")?;
    let payment_sandbox = get_env("PAYMENT_SANDBOX")
      .unwrap_or_else(|_| "true".to_string())
      .parse::<bool>()
      .map_err(|e| AppError::Config(format!("Invalid PAYMENT_SANDBOX value: {}", e)))?;
    let payment_notification_url = optional("PAYMENT_NOTIFICATION_URL");

    let audience_api_url = get_env("AUDIENCE_API_URL").unwrap_or_else(|_| "https://api.brevo.com".to_string());
    let audience_api_key = optional("AUDIENCE_API_KEY");
    let audience_list_id = optional("AUDIENCE_LIST_ID")
      .map(|raw| raw.parse::<i64>())
      .transpose()
      .map_err(|e| AppError::Config(format!("Invalid AUDIENCE_LIST_ID: {}", e)))?;

    let email_api_url = get_env("EMAIL_API_URL").unwrap_or_else(|_| "https://api.brevo.com".to_string());
    let email_api_key = optional("EMAIL_API_KEY");
    let email_sender = get_env("EMAIL_SENDER").unwrap_or_else(|_| "noreply@example.com".to_string());

    let cep_api_url = get_env("CEP_API_URL").unwrap_or_else(|_| "https://viacep.com.br".to_string());

    let totp_issuer = get_env("TOTP_ISSUER").unwrap_or_else(|_| "Storefront Admin".to_string());
    let admin_session_ttl_minutes = get_env("ADMIN_SESSION_TTL_MINUTES")
      .unwrap_or_else(|_| "480".to_string())
      .parse::<i64>()
      .map_err(|e| AppError::Config(format!("Invalid ADMIN_SESSION_TTL_MINUTES: {}", e)))?;
    if admin_session_ttl_minutes <= 0 {
      return Err(AppError::Config("ADMIN_SESSION_TTL_MINUTES must be positive".to_string()));
    }
    let admin_bootstrap_email = optional("ADMIN_BOOTSTRAP_EMAIL");
    let admin_bootstrap_password = optional("ADMIN_BOOTSTRAP_PASSWORD");
    if admin_bootstrap_email.is_some() != admin_bootstrap_password.is_some() {
      return Err(AppError::Config(
        "ADMIN_BOOTSTRAP_EMAIL and ADMIN_BOOTSTRAP_PASSWORD must be set together".to_string(),
      ));
    }

    tracing::info!(
      audience_sync = audience_api_key.is_some() && audience_list_id.is_some(),
      welcome_email = email_api_key.is_some(),
      payment_sandbox,
      "Application configuration loaded successfully."
    );

    Ok(Self {
      server_host,
      server_port,
      database_url,
      app_base_url,
      shipping_api_url,
      shipping_api_token,
      shipping_origin_cep,
      shipping_user_agent,
      payment_api_url,
      payment_access_token,
      payment_sandbox,
      payment_notification_url,
      audience_api_url,
      audience_api_key,
      audience_list_id,
      email_api_url,
      email_api_key,
      email_sender,
      cep_api_url,
      totp_issuer,
      admin_session_ttl_minutes,
      admin_bootstrap_email,
      admin_bootstrap_password,
    })
  }

  pub fn audience_enabled(&self) -> bool {
    self.audience_api_key.is_some() && self.audience_list_id.is_some()
  }
}

#[cfg(test)]
impl AppConfig {
  /// Config used by handler tests; no outbound provider is ever reached.
  pub fn test_defaults() -> Self {
    Self {
      server_host: "127.0.0.1".to_string(),
      server_port: 8080,
      database_url: "postgres://storefront@localhost/storefront_test".to_string(),
      app_base_url: "https://loja.example.com".to_string(),
      shipping_api_url: "http://127.0.0.1:9".to_string(),
      shipping_api_token: "test-token".to_string(),
      shipping_origin_cep: Cep::parse("01310100").unwrap(),
      shipping_user_agent: "Storefront tests".to_string(),
      payment_api_url: "http://127.0.0.1:9".to_string(),
      payment_access_token: "test-token".to_string(),
      payment_sandbox: true,
      payment_notification_url: None,
      audience_api_url: "http://127.0.0.1:9".to_string(),
      audience_api_key: None,
      audience_list_id: None,
      email_api_url: "http://127.0.0.1:9".to_string(),
      email_api_key: None,
      email_sender: "noreply@example.com".to_string(),
      cep_api_url: "http://127.0.0.1:9".to_string(),
      totp_issuer: "Storefront Admin".to_string(),
      admin_session_ttl_minutes: 60,
      admin_bootstrap_email: None,
      admin_bootstrap_password: None,
    }
  }
}
