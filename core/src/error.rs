// core/src/error.rs
use anyhow::Error as AnyhowError;
use std::sync::Arc;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum CoreError {
  #[error("Invalid CPF: {0}")]
  InvalidCpf(String),

  #[error("Invalid CEP: {0}")]
  InvalidCep(String),

  #[error("Invalid email address: {0}")]
  InvalidEmail(String),

  #[error("Invalid amount '{input}': {reason}")]
  InvalidAmount { input: String, reason: String },

  #[error("Invalid package: {0}")]
  InvalidPackage(String),

  #[error("Validation failed for '{field}': {message}")]
  Validation { field: String, message: String },

  #[error("Invalid TOTP secret: {0}")]
  InvalidTotpSecret(String),

  #[error("Not found: {0}")]
  NotFound(String),

  #[error("Provider '{provider}' failed. Source: {source}")]
  Provider {
    provider: String,
    #[source]
    source: AnyhowError,
  },

  /// An error produced once by a shared in-flight fetch and handed to every waiter.
  #[error(transparent)]
  Shared(Arc<CoreError>),
}

impl CoreError {
  pub fn validation(field: impl Into<String>, message: impl Into<String>) -> Self {
    CoreError::Validation {
      field: field.into(),
      message: message.into(),
    }
  }

  pub fn provider(provider: impl Into<String>, source: impl Into<AnyhowError>) -> Self {
    CoreError::Provider {
      provider: provider.into(),
      source: source.into(),
    }
  }

  /// Looks through `Shared` wrappers to the error that was actually raised.
  pub fn root(&self) -> &CoreError {
    match self {
      CoreError::Shared(inner) => inner.root(),
      other => other,
    }
  }
}

pub type CoreResult<T, E = CoreError> = std::result::Result<T, E>;
