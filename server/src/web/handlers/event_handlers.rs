// server/src/web/handlers/event_handlers.rs

use actix_web::{http::header::USER_AGENT, web, HttpRequest, HttpResponse};
use serde_json::json;
use storefront_core::TrackedEvent;
use tracing::{debug, instrument};

use crate::errors::AppError;
use crate::state::AppState;

const MAX_USER_AGENT_LEN: usize = 512;

#[instrument(name = "handler::track_event", skip(app_state, req, event), fields(kind = %event.kind))]
pub async fn track_event_handler(
  app_state: web::Data<AppState>,
  req: HttpRequest,
  event: web::Json<TrackedEvent>,
) -> Result<HttpResponse, AppError> {
  let event = event.into_inner();
  event.validate()?;

  let user_agent: Option<String> = req
    .headers()
    .get(USER_AGENT)
    .and_then(|v| v.to_str().ok())
    .map(|ua| ua.chars().take(MAX_USER_AGENT_LEN).collect());

  sqlx::query(
    "INSERT INTO analytics_events (kind, session_id, page_path, product_id, value_cents, metadata, user_agent) \
     VALUES ($1, $2, $3, $4, $5, $6, $7)",
  )
  .bind(event.kind.as_str())
  .bind(event.session_id.trim())
  .bind(&event.page_path)
  .bind(event.product_id.map(|p| p.0))
  .bind(event.value.map(|v| v.amount_cents))
  .bind(&event.metadata)
  .bind(&user_agent)
  .execute(&app_state.db_pool)
  .await?;

  debug!(session_id = %event.session_id, "Event recorded.");
  Ok(HttpResponse::Accepted().json(json!({ "accepted": true })))
}
