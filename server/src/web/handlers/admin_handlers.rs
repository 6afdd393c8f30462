// server/src/web/handlers/admin_handlers.rs

use actix_web::{web, HttpResponse};
use chrono::Utc;
use serde::Deserialize;
use serde_json::json;
use storefront_core::{normalize_email, FunnelCounts, FunnelSummary, ProductId, TotpSecret};
use tracing::{info, instrument, warn};
use uuid::Uuid;

use crate::errors::AppError;
use crate::models::AdminUser;
use crate::services::auth_service::{check_totp, dummy_password_check, verify_password};
use crate::state::AppState;
use crate::web::extractors::AdminIdentity;

const ADMIN_COLUMNS: &str = "id, email, password_hash, totp_secret, totp_enabled, totp_last_step, created_at";
const DEFAULT_FUNNEL_DAYS: i32 = 30;
const MAX_FUNNEL_DAYS: i32 = 365;

fn unix_now() -> u64 {
  Utc::now().timestamp().max(0) as u64
}

async fn load_admin(app_state: &AppState, admin_id: Uuid) -> Result<AdminUser, AppError> {
  sqlx::query_as(&format!("SELECT {} FROM admin_users WHERE id = $1", ADMIN_COLUMNS))
    .bind(admin_id)
    .fetch_optional(&app_state.db_pool)
    .await?
    .ok_or_else(|| AppError::Auth("Admin account no longer exists.".to_string()))
}

/// Stores `step` as the last accepted one. The write only lands when `step` is newer
/// than what is stored, so two requests racing with the same code cannot both pass.
async fn record_totp_step(app_state: &AppState, admin_id: Uuid, step: u64, enable: bool) -> Result<(), AppError> {
  let updated = sqlx::query(
    "UPDATE admin_users SET totp_last_step = $2, totp_enabled = totp_enabled OR $3 \
     WHERE id = $1 AND (totp_last_step IS NULL OR totp_last_step < $2)",
  )
  .bind(admin_id)
  .bind(step as i64)
  .bind(enable)
  .execute(&app_state.db_pool)
  .await?
  .rows_affected();

  if updated == 0 {
    warn!(%admin_id, step, "TOTP step already consumed by a concurrent request.");
    return Err(AppError::Auth("Authentication code already used.".to_string()));
  }
  Ok(())
}

// --- Sign in / out ---

#[derive(Deserialize, Debug)]
pub struct SigninPayload {
  pub email: String,
  pub password: String,
  /// Required once TOTP is enabled for the account.
  pub code: Option<String>,
}

#[instrument(name = "handler::admin_signin", skip(app_state, payload))]
pub async fn signin_handler(
  app_state: web::Data<AppState>,
  payload: web::Json<SigninPayload>,
) -> Result<HttpResponse, AppError> {
  let invalid = || AppError::Auth("Invalid email or password.".to_string());
  let email = normalize_email(&payload.email).map_err(|_| invalid())?;

  let admin: Option<AdminUser> = sqlx::query_as(&format!("SELECT {} FROM admin_users WHERE email = $1", ADMIN_COLUMNS))
    .bind(&email)
    .fetch_optional(&app_state.db_pool)
    .await?;
  let Some(admin) = admin else {
    dummy_password_check(&payload.password);
    warn!("Signin attempt for unknown admin email.");
    return Err(invalid());
  };

  if !verify_password(&admin.password_hash, &payload.password)? {
    warn!(admin_id = %admin.id, "Signin failed: wrong password.");
    return Err(invalid());
  }

  if admin.totp_enabled {
    let secret = admin
      .totp_secret
      .as_deref()
      .ok_or_else(|| AppError::Internal("TOTP enabled without a stored secret.".to_string()))?;
    let code = payload
      .code
      .as_deref()
      .ok_or_else(|| AppError::Auth("Authentication code required.".to_string()))?;
    let step = check_totp(secret, code, unix_now(), admin.totp_last_step)?;
    record_totp_step(&app_state, admin.id, step, false).await?;
  }

  let (token, session) = app_state.admin_sessions.create(admin.id, &admin.email);
  info!(
    admin_id = %admin.id,
    active_sessions = app_state.admin_sessions.active_count(),
    "Admin signed in."
  );

  Ok(HttpResponse::Ok().json(json!({
    "token": token,
    "expires_at": session.expires_at,
    "totp_enabled": admin.totp_enabled
  })))
}

#[instrument(name = "handler::admin_signout", skip(app_state, admin), fields(admin_id = %admin.admin_id))]
pub async fn signout_handler(app_state: web::Data<AppState>, admin: AdminIdentity) -> Result<HttpResponse, AppError> {
  let revoked = app_state.admin_sessions.revoke(&admin.token);
  info!(email = %admin.email, revoked, "Admin signed out.");
  Ok(HttpResponse::NoContent().finish())
}

// --- TOTP enrollment ---

#[instrument(name = "handler::totp_setup", skip(app_state, admin), fields(admin_id = %admin.admin_id))]
pub async fn totp_setup_handler(app_state: web::Data<AppState>, admin: AdminIdentity) -> Result<HttpResponse, AppError> {
  let account = load_admin(&app_state, admin.admin_id).await?;
  if account.totp_enabled {
    return Err(AppError::Conflict("TOTP is already enabled for this account.".to_string()));
  }

  // A new setup replaces any unconfirmed secret.
  let secret = TotpSecret::generate();
  let encoded = secret.to_base32();
  sqlx::query("UPDATE admin_users SET totp_secret = $2, totp_last_step = NULL WHERE id = $1")
    .bind(account.id)
    .bind(&encoded)
    .execute(&app_state.db_pool)
    .await?;

  info!("TOTP secret generated, awaiting confirmation.");
  Ok(HttpResponse::Ok().json(json!({
    "secret": encoded,
    "otpauth_uri": secret.provisioning_uri(&app_state.config.totp_issuer, &account.email)
  })))
}

#[derive(Deserialize, Debug)]
pub struct TotpVerifyPayload {
  pub code: String,
}

/// Confirms enrollment on first success; afterwards it just checks a code.
#[instrument(name = "handler::totp_verify", skip(app_state, admin, payload), fields(admin_id = %admin.admin_id))]
pub async fn totp_verify_handler(
  app_state: web::Data<AppState>,
  admin: AdminIdentity,
  payload: web::Json<TotpVerifyPayload>,
) -> Result<HttpResponse, AppError> {
  let account = load_admin(&app_state, admin.admin_id).await?;
  let secret = account
    .totp_secret
    .as_deref()
    .ok_or_else(|| AppError::Validation("TOTP setup has not been started.".to_string()))?;

  let step = check_totp(secret, &payload.code, unix_now(), account.totp_last_step)?;
  record_totp_step(&app_state, account.id, step, true).await?;

  if !account.totp_enabled {
    info!("TOTP enabled for admin account.");
  }
  Ok(HttpResponse::Ok().json(json!({ "verified": true, "totp_enabled": true })))
}

// --- Dashboard ---

#[derive(Deserialize, Debug)]
pub struct FunnelQuery {
  pub days: Option<i32>,
}

#[instrument(name = "handler::admin_funnel", skip(app_state, admin, query), fields(admin_id = %admin.admin_id))]
pub async fn funnel_handler(
  app_state: web::Data<AppState>,
  admin: AdminIdentity,
  query: web::Query<FunnelQuery>,
) -> Result<HttpResponse, AppError> {
  let days = query.days.unwrap_or(DEFAULT_FUNNEL_DAYS);
  if !(1..=MAX_FUNNEL_DAYS).contains(&days) {
    return Err(AppError::Validation(format!(
      "days must be between 1 and {}.",
      MAX_FUNNEL_DAYS
    )));
  }

  let (sessions, viewed_item, added_to_cart, began_checkout, purchased): (i64, i64, i64, i64, i64) = sqlx::query_as(
    "SELECT COUNT(DISTINCT session_id), \
       COUNT(DISTINCT session_id) FILTER (WHERE kind = 'view_item'), \
       COUNT(DISTINCT session_id) FILTER (WHERE kind = 'add_to_cart'), \
       COUNT(DISTINCT session_id) FILTER (WHERE kind = 'begin_checkout'), \
       COUNT(DISTINCT session_id) FILTER (WHERE kind = 'purchase') \
     FROM analytics_events WHERE created_at >= now() - make_interval(days => $1)",
  )
  .bind(days)
  .fetch_one(&app_state.db_pool)
  .await?;

  let as_count = |n: i64| n.max(0) as u64;
  let summary = FunnelSummary::from_counts(FunnelCounts {
    sessions: as_count(sessions),
    viewed_item: as_count(viewed_item),
    added_to_cart: as_count(added_to_cart),
    began_checkout: as_count(began_checkout),
    purchased: as_count(purchased),
  });

  Ok(HttpResponse::Ok().json(json!({ "days": days, "funnel": summary })))
}

// --- Image cache maintenance ---

#[instrument(name = "handler::clear_image_cache", skip(app_state, admin), fields(admin_id = %admin.admin_id))]
pub async fn clear_cache_handler(app_state: web::Data<AppState>, admin: AdminIdentity) -> Result<HttpResponse, AppError> {
  let cached = app_state.image_cache.len();
  app_state.image_cache.clear();
  info!(cached, "Color image cache cleared by admin.");
  Ok(HttpResponse::Ok().json(json!({ "cleared": cached })))
}

/// Used after uploading new photos for one product.
#[instrument(name = "handler::invalidate_product_images", skip(app_state, admin, path), fields(admin_id = %admin.admin_id))]
pub async fn invalidate_product_cache_handler(
  app_state: web::Data<AppState>,
  admin: AdminIdentity,
  path: web::Path<Uuid>,
) -> Result<HttpResponse, AppError> {
  let product_id = ProductId(path.into_inner());
  app_state.image_cache.invalidate(product_id);
  info!(%product_id, "Color images invalidated.");
  Ok(HttpResponse::NoContent().finish())
}

#[cfg(test)]
mod tests {
  use super::record_totp_step;
  use crate::errors::AppError;
  use crate::test_support::{test_app, TestDatabase, TestProviders};
  use actix_web::{http::StatusCode, test};
  use chrono::Utc;
  use serde_json::{json, Value};
  use storefront_core::{ProductId, TotpSecret};

  #[actix_web::test]
  async fn admin_routes_require_a_session() {
    let providers = TestProviders::default();
    let app = test_app!(providers.state());

    let resp = test::call_service(&app, test::TestRequest::post().uri("/api/v1/admin/cache/clear").to_request()).await;
    assert_eq!(resp.status(), StatusCode::UNAUTHORIZED);

    let resp = test::call_service(
      &app,
      test::TestRequest::get()
        .uri("/api/v1/admin/funnel")
        .insert_header(("Authorization", "Bearer not-a-session"))
        .to_request(),
    )
    .await;
    assert_eq!(resp.status(), StatusCode::UNAUTHORIZED);
  }

  #[actix_web::test]
  async fn cache_clear_and_invalidate() {
    let providers = TestProviders::default();
    let app = test_app!(providers.state());
    let bearer = providers.admin_bearer();

    let product = ProductId::generate();
    providers.image_cache.get(product).await.unwrap();
    providers.image_cache.get(ProductId::generate()).await.unwrap();
    assert_eq!(providers.image_cache.len(), 2);

    let resp = test::call_service(
      &app,
      test::TestRequest::delete()
        .uri(&format!("/api/v1/admin/cache/products/{}", product))
        .insert_header(("Authorization", bearer.as_str()))
        .to_request(),
    )
    .await;
    assert_eq!(resp.status(), StatusCode::NO_CONTENT);
    assert!(providers.image_cache.peek(product).is_none());

    let resp = test::call_service(
      &app,
      test::TestRequest::post()
        .uri("/api/v1/admin/cache/clear")
        .insert_header(("Authorization", bearer.as_str()))
        .to_request(),
    )
    .await;
    assert_eq!(resp.status(), StatusCode::OK);
    let body: Value = test::read_body_json(resp).await;
    assert_eq!(body["cleared"], 1);
    assert!(providers.image_cache.is_empty());
  }

  #[actix_web::test]
  async fn funnel_window_is_bounded_and_signout_ends_the_session() {
    let providers = TestProviders::default();
    let app = test_app!(providers.state());
    let bearer = providers.admin_bearer();

    let resp = test::call_service(
      &app,
      test::TestRequest::get()
        .uri("/api/v1/admin/funnel?days=1000")
        .insert_header(("Authorization", bearer.as_str()))
        .to_request(),
    )
    .await;
    assert_eq!(resp.status(), StatusCode::BAD_REQUEST);

    let resp = test::call_service(
      &app,
      test::TestRequest::post()
        .uri("/api/v1/admin/signout")
        .insert_header(("Authorization", bearer.as_str()))
        .to_request(),
    )
    .await;
    assert_eq!(resp.status(), StatusCode::NO_CONTENT);

    let resp = test::call_service(
      &app,
      test::TestRequest::post()
        .uri("/api/v1/admin/cache/clear")
        .insert_header(("Authorization", bearer.as_str()))
        .to_request(),
    )
    .await;
    assert_eq!(resp.status(), StatusCode::UNAUTHORIZED);
  }

  fn signin(email: &str, password: &str, code: Option<&str>) -> test::TestRequest {
    test::TestRequest::post()
      .uri("/api/v1/admin/signin")
      .set_json(json!({"email": email, "password": password, "code": code}))
  }

  #[actix_web::test]
  #[ignore = "requires TEST_DATABASE_URL and a local Postgres; non-CI integration test"]
  async fn totp_enrollment_and_signin_refuse_replayed_codes() {
    let Some(db) = TestDatabase::connect().await else {
      return;
    };
    db.insert_admin("admin@loja.com", "s3nha-forte").await;
    let providers = TestProviders::default();
    let app = test_app!(providers.state_with_pool(db.pool.clone()));

    // Unknown email and wrong password look the same.
    let attempts = [
      signin("ninguem@loja.com", "s3nha-forte", None),
      signin("admin@loja.com", "errada", None),
    ];
    for attempt in attempts {
      let resp = test::call_service(&app, attempt.to_request()).await;
      assert_eq!(resp.status(), StatusCode::UNAUTHORIZED);
      let body: Value = test::read_body_json(resp).await;
      assert_eq!(body["error"], "Invalid email or password.");
    }

    let resp = test::call_service(&app, signin("Admin@Loja.com", "s3nha-forte", None).to_request()).await;
    assert_eq!(resp.status(), StatusCode::OK);
    let body: Value = test::read_body_json(resp).await;
    assert_eq!(body["totp_enabled"], false);
    let bearer = format!("Bearer {}", body["token"].as_str().unwrap());

    let setup = || {
      test::TestRequest::post()
        .uri("/api/v1/admin/totp/setup")
        .insert_header(("Authorization", bearer.as_str()))
        .to_request()
    };
    let resp = test::call_service(&app, setup()).await;
    assert_eq!(resp.status(), StatusCode::OK);
    let body: Value = test::read_body_json(resp).await;
    assert!(body["otpauth_uri"].as_str().unwrap().starts_with("otpauth://totp/"));
    let secret = TotpSecret::from_base32(body["secret"].as_str().unwrap()).unwrap();

    let now = Utc::now().timestamp() as u64;
    let resp = test::call_service(
      &app,
      test::TestRequest::post()
        .uri("/api/v1/admin/totp/verify")
        .insert_header(("Authorization", bearer.as_str()))
        .set_json(json!({"code": secret.code_at(now)}))
        .to_request(),
    )
    .await;
    assert_eq!(resp.status(), StatusCode::OK);

    let resp = test::call_service(&app, setup()).await;
    assert_eq!(resp.status(), StatusCode::CONFLICT);

    let resp = test::call_service(&app, signin("admin@loja.com", "s3nha-forte", None).to_request()).await;
    assert_eq!(resp.status(), StatusCode::UNAUTHORIZED);
    let body: Value = test::read_body_json(resp).await;
    assert_eq!(body["error"], "Authentication code required.");

    // Next step's code is inside the drift window and newer than the enrollment code.
    let next_code = secret.code_at(now + 30);
    let resp = test::call_service(&app, signin("admin@loja.com", "s3nha-forte", Some(&next_code)).to_request()).await;
    assert_eq!(resp.status(), StatusCode::OK);

    let resp = test::call_service(&app, signin("admin@loja.com", "s3nha-forte", Some(&next_code)).to_request()).await;
    assert_eq!(resp.status(), StatusCode::UNAUTHORIZED);
    let body: Value = test::read_body_json(resp).await;
    assert_eq!(body["error"], "Authentication code already used.");

    db.drop_schema().await;
  }

  #[actix_web::test]
  #[ignore = "requires TEST_DATABASE_URL and a local Postgres; non-CI integration test"]
  async fn racing_writes_of_one_totp_step_accept_only_one() {
    let Some(db) = TestDatabase::connect().await else {
      return;
    };
    let admin_id = db.insert_admin("admin@loja.com", "s3nha-forte").await;
    let state = TestProviders::default().state_with_pool(db.pool.clone());

    let (first, second) = tokio::join!(
      record_totp_step(&state, admin_id, 100, false),
      record_totp_step(&state, admin_id, 100, false)
    );
    assert_eq!(first.is_ok() as u8 + second.is_ok() as u8, 1);
    assert!(matches!(first.and(second), Err(AppError::Auth(m)) if m.contains("already used")));

    assert!(record_totp_step(&state, admin_id, 99, false).await.is_err());
    assert!(record_totp_step(&state, admin_id, 101, false).await.is_ok());

    db.drop_schema().await;
  }

  #[actix_web::test]
  #[ignore = "requires TEST_DATABASE_URL and a local Postgres; non-CI integration test"]
  async fn funnel_counts_distinct_sessions_per_step() {
    let Some(db) = TestDatabase::connect().await else {
      return;
    };
    let providers = TestProviders::default();
    let app = test_app!(providers.state_with_pool(db.pool.clone()));
    let product = ProductId::generate();

    let events = [
      ("s1", "page_view"),
      ("s1", "view_item"),
      ("s1", "add_to_cart"),
      ("s1", "purchase"),
      ("s2", "view_item"),
      ("s2", "view_item"),
      ("s3", "page_view"),
    ];
    for (session, kind) in events {
      let req = test::TestRequest::post()
        .uri("/api/v1/events")
        .insert_header(("User-Agent", "storefront-tests"))
        .set_json(json!({"kind": kind, "session_id": session, "page_path": "/produto/vestido", "product_id": product}))
        .to_request();
      let resp = test::call_service(&app, req).await;
      assert_eq!(resp.status(), StatusCode::ACCEPTED);
    }
    assert_eq!(db.count("analytics_events").await, 7);

    let resp = test::call_service(
      &app,
      test::TestRequest::get()
        .uri("/api/v1/admin/funnel?days=7")
        .insert_header(("Authorization", providers.admin_bearer().as_str()))
        .to_request(),
    )
    .await;
    assert_eq!(resp.status(), StatusCode::OK);
    let body: Value = test::read_body_json(resp).await;
    let sessions: Vec<u64> = body["funnel"]["steps"]
      .as_array()
      .unwrap()
      .iter()
      .map(|step| step["sessions"].as_u64().unwrap())
      .collect();
    assert_eq!(sessions, [3, 2, 1, 0, 1]);

    db.drop_schema().await;
  }
}
