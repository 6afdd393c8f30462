// server/src/services/auth_service.rs

//! Admin credential checks: Argon2 passwords and TOTP second factor.

use crate::errors::AppError; // Application-specific error type
use argon2::{
  password_hash::{
    rand_core::OsRng, // For generating random salts
    PasswordHash,
    PasswordHasher,
    PasswordVerifier,
    SaltString,
  },
  Argon2,
};
use crate::config::AppConfig;
use sqlx::PgPool;
use std::sync::OnceLock;
use storefront_core::totp::DEFAULT_SKEW_STEPS;
use storefront_core::{normalize_email, TotpSecret};
use tracing::{debug, error, info, instrument, warn};

/// Hashes a plain-text password using Argon2 with a fresh random salt.
#[instrument(name = "auth_service::hash_password", skip(password), err(Display))]
pub fn hash_password(password: &str) -> Result<String, AppError> {
  if password.is_empty() {
    return Err(AppError::Validation("Password cannot be empty.".to_string()));
  }

  let salt = SaltString::generate(&mut OsRng);
  Argon2::default()
    .hash_password(password.as_bytes(), &salt)
    .map(|hash| hash.to_string())
    .map_err(|argon_err| {
      error!(error = %argon_err, "Argon2 password hashing failed.");
      AppError::Internal(format!("Password hashing process failed: {}", argon_err))
    })
}

/// Verifies a plain-text password against a stored Argon2 hash.
///
/// `Ok(false)` means a wrong password; `Err` means the stored hash itself is unusable.
#[instrument(name = "auth_service::verify_password", skip(stored_hash, provided_password), err(Display))]
pub fn verify_password(stored_hash: &str, provided_password: &str) -> Result<bool, AppError> {
  if provided_password.is_empty() {
    return Ok(false);
  }

  let parsed_hash = PasswordHash::new(stored_hash).map_err(|parse_err| {
    error!(error = %parse_err, "Failed to parse stored password hash string.");
    AppError::Internal(format!("Invalid stored password hash format: {}", parse_err))
  })?;

  match Argon2::default().verify_password(provided_password.as_bytes(), &parsed_hash) {
    Ok(()) => Ok(true),
    Err(argon2::password_hash::Error::Password) => {
      debug!("Password verification failed: Passwords do not match.");
      Ok(false)
    }
    Err(other_argon_err) => {
      error!(error = %other_argon_err, "Argon2 password verification process encountered an error.");
      Err(AppError::Internal(format!(
        "Password verification process failed: {}",
        other_argon_err
      )))
    }
  }
}

/// Runs a full Argon2 verification against a throwaway hash and always returns `false`.
///
/// Sign-in calls this for unknown emails so they cost the same as a wrong password.
pub fn dummy_password_check(provided_password: &str) -> bool {
  static DUMMY_HASH: OnceLock<Option<String>> = OnceLock::new();
  let hash = DUMMY_HASH.get_or_init(|| hash_password("storefront-unknown-admin").ok());
  if let Some(hash) = hash {
    let _ = verify_password(hash, provided_password);
  }
  false
}

/// Checks a TOTP code and returns the accepted time step.
///
/// A step at or before `last_step` is rejected so a code cannot be used twice.
#[instrument(name = "auth_service::check_totp", skip(secret_base32, code))]
pub fn check_totp(secret_base32: &str, code: &str, unix_seconds: u64, last_step: Option<i64>) -> Result<u64, AppError> {
  let secret = TotpSecret::from_base32(secret_base32).map_err(|e| {
    error!(error = %e, "Stored TOTP secret is unreadable.");
    AppError::Internal("Stored TOTP secret is invalid.".to_string())
  })?;

  let step = secret
    .verify(code, unix_seconds, DEFAULT_SKEW_STEPS)
    .ok_or_else(|| AppError::Auth("Invalid authentication code.".to_string()))?;

  if let Some(last) = last_step {
    if step as i64 <= last {
      warn!(step, last, "Rejected reuse of an already accepted TOTP code.");
      return Err(AppError::Auth("Authentication code already used.".to_string()));
    }
  }
  Ok(step)
}

/// Creates the configured bootstrap admin if no account uses that email yet.
#[instrument(name = "auth_service::ensure_bootstrap_admin", skip(pool, config))]
pub async fn ensure_bootstrap_admin(pool: &PgPool, config: &AppConfig) -> Result<(), AppError> {
  let (Some(email), Some(password)) = (&config.admin_bootstrap_email, &config.admin_bootstrap_password) else {
    return Ok(());
  };
  let email = normalize_email(email)?;
  let password_hash = hash_password(password)?;

  let created = sqlx::query("INSERT INTO admin_users (email, password_hash) VALUES ($1, $2) ON CONFLICT (email) DO NOTHING")
    .bind(&email)
    .bind(&password_hash)
    .execute(pool)
    .await?
    .rows_affected();

  if created > 0 {
    info!(%email, "Bootstrap admin account created. Enable TOTP from the dashboard.");
  } else {
    debug!(%email, "Bootstrap admin already exists.");
  }
  Ok(())
}
