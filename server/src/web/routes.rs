// server/src/web/routes.rs

use actix_web::{error::InternalError, web, HttpResponse, ResponseError};
use serde_json::json;

use crate::errors::AppError;
use crate::web::handlers::{
  admin_handlers, cep_handlers, checkout_handlers, event_handlers, newsletter_handlers, product_handlers,
  shipping_handlers,
};

const MAX_JSON_BYTES: usize = 64 * 1024;

async fn health_check_handler() -> HttpResponse {
  HttpResponse::Ok().json(json!({ "status": "ok" }))
}

/// Malformed bodies, queries and paths answer with the same JSON envelope as handler errors.
fn extractor_configs(cfg: &mut web::ServiceConfig) {
  cfg
    .app_data(web::JsonConfig::default().limit(MAX_JSON_BYTES).error_handler(|err, _req| {
      let message = format!("Invalid JSON body: {}", err);
      InternalError::from_response(err, AppError::Validation(message).error_response()).into()
    }))
    .app_data(web::QueryConfig::default().error_handler(|err, _req| {
      let message = format!("Invalid query string: {}", err);
      InternalError::from_response(err, AppError::Validation(message).error_response()).into()
    }))
    .app_data(web::PathConfig::default().error_handler(|err, _req| {
      let message = format!("Invalid path parameter: {}", err);
      InternalError::from_response(err, AppError::Validation(message).error_response()).into()
    }));
}

// This function will be called in `main.rs` to configure services for the Actix App.
pub fn configure_app_routes(cfg: &mut web::ServiceConfig) {
  extractor_configs(cfg);
  cfg.service(
    web::scope("/api/v1")
      .route("/health", web::get().to(health_check_handler))
      .route("/shipping/quote", web::post().to(shipping_handlers::quote_shipping_handler))
      .route("/cep/{cep}", web::get().to(cep_handlers::lookup_cep_handler))
      .route(
        "/checkout/preference",
        web::post().to(checkout_handlers::create_preference_handler),
      )
      .route(
        "/newsletter/subscribe",
        web::post().to(newsletter_handlers::subscribe_handler),
      )
      .route("/events", web::post().to(event_handlers::track_event_handler))
      .service(
        web::scope("/products")
          .route("", web::get().to(product_handlers::list_products_handler))
          .route("/{product_id}", web::get().to(product_handlers::get_product_handler))
          .route(
            "/{product_id}/colors",
            web::get().to(product_handlers::product_colors_handler),
          ),
      )
      .service(
        web::scope("/admin")
          .route("/signin", web::post().to(admin_handlers::signin_handler))
          .route("/signout", web::post().to(admin_handlers::signout_handler))
          .route("/totp/setup", web::post().to(admin_handlers::totp_setup_handler))
          .route("/totp/verify", web::post().to(admin_handlers::totp_verify_handler))
          .route("/funnel", web::get().to(admin_handlers::funnel_handler))
          .route("/cache/clear", web::post().to(admin_handlers::clear_cache_handler))
          .route(
            "/cache/products/{product_id}",
            web::delete().to(admin_handlers::invalidate_product_cache_handler),
          ),
      ),
  );
}
