// server/src/web/handlers/newsletter_handlers.rs

use actix_web::{web, HttpResponse};
use serde::Deserialize;
use serde_json::json;
use storefront_core::normalize_email;
use tracing::{info, instrument, warn};

use crate::errors::AppError;
use crate::models::SubscriberRow;
use crate::state::AppState;

const MAX_SOURCE_LEN: usize = 64;

#[derive(Deserialize, Debug)]
pub struct SubscribePayload {
  pub email: String,
  pub source: Option<String>,
}

fn clean_source(source: Option<&str>) -> Option<String> {
  source
    .map(str::trim)
    .filter(|s| !s.is_empty())
    .map(|s| s.chars().take(MAX_SOURCE_LEN).collect())
}

/// Upserts the subscriber. Mailing-list sync and the welcome email only run for new
/// addresses, and their failures are logged without failing the signup.
#[instrument(name = "handler::newsletter_subscribe", skip(app_state, payload))]
pub async fn subscribe_handler(
  app_state: web::Data<AppState>,
  payload: web::Json<SubscribePayload>,
) -> Result<HttpResponse, AppError> {
  let email = normalize_email(&payload.email)?;
  let source = clean_source(payload.source.as_deref());

  let row: SubscriberRow = sqlx::query_as(
    "INSERT INTO newsletter_subscribers (email, source) VALUES ($1, $2) \
     ON CONFLICT (email) DO UPDATE SET email = EXCLUDED.email \
     RETURNING email, source, subscribed_at, (xmax = 0) AS inserted",
  )
  .bind(&email)
  .bind(&source)
  .fetch_one(&app_state.db_pool)
  .await?;

  if !row.inserted {
    info!("Newsletter subscriber already present.");
    return Ok(HttpResponse::Ok().json(json!({ "subscribed": true, "new": false })));
  }
  info!(source = ?row.source, "New newsletter subscriber stored.");

  let subscriber = row.to_subscriber();
  let sync = async {
    if let Some(audience) = &app_state.audience {
      if let Err(e) = audience.upsert_contact(&subscriber).await {
        warn!(error = %e, "Audience sync failed; subscriber kept locally.");
      }
    }
  };
  let welcome = async {
    if let Some(mailer) = &app_state.mailer {
      if let Err(e) = mailer.send_welcome(&subscriber.email).await {
        warn!(error = %e, "Welcome email failed.");
      }
    }
  };
  tokio::join!(sync, welcome);

  Ok(HttpResponse::Created().json(json!({ "subscribed": true, "new": true })))
}
