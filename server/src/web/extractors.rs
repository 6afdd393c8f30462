// server/src/web/extractors.rs

use actix_web::{http::header::AUTHORIZATION, web, FromRequest, HttpRequest};
use futures_util::future::{ready, Ready};
use tracing::warn;
use uuid::Uuid;

use crate::errors::AppError;
use crate::state::AppState;

/// An admin holding a live session, taken from `Authorization: Bearer <token>`.
#[derive(Debug, Clone)]
pub struct AdminIdentity {
  pub admin_id: Uuid,
  pub email: String,
  pub token: String,
}

fn bearer_token(req: &HttpRequest) -> Option<&str> {
  req
    .headers()
    .get(AUTHORIZATION)?
    .to_str()
    .ok()?
    .strip_prefix("Bearer ")
    .map(str::trim)
    .filter(|token| !token.is_empty())
}

fn extract_admin(req: &HttpRequest) -> Result<AdminIdentity, AppError> {
  let app_state = req
    .app_data::<web::Data<AppState>>()
    .ok_or_else(|| AppError::Internal("Application state is not registered.".to_string()))?;

  let token = bearer_token(req).ok_or_else(|| {
    warn!("AdminIdentity extractor: Missing or malformed Authorization header.");
    AppError::Auth("Admin session required.".to_string())
  })?;

  let session = app_state.admin_sessions.validate(token).ok_or_else(|| {
    warn!("AdminIdentity extractor: Unknown or expired session token.");
    AppError::Auth("Admin session expired or invalid.".to_string())
  })?;

  Ok(AdminIdentity {
    admin_id: session.admin_id,
    email: session.email,
    token: token.to_string(),
  })
}

impl FromRequest for AdminIdentity {
  type Error = AppError;
  type Future = Ready<Result<Self, Self::Error>>;

  fn from_request(req: &HttpRequest, _payload: &mut actix_web::dev::Payload) -> Self::Future {
    ready(extract_admin(req))
  }
}
