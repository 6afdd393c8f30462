// server/src/web/handlers/cep_handlers.rs

use actix_web::{web, HttpResponse};
use storefront_core::Cep;
use tracing::{info, instrument, warn};

use crate::errors::AppError;
use crate::state::AppState;

#[instrument(name = "handler::lookup_cep", skip(app_state, path), fields(cep = %path.as_ref()))]
pub async fn lookup_cep_handler(
  app_state: web::Data<AppState>,
  path: web::Path<String>,
) -> Result<HttpResponse, AppError> {
  let cep = Cep::parse(&path.into_inner())?;

  match app_state.postal.lookup(&cep).await? {
    Some(address) => {
      info!("Resolved CEP {} to {}/{}.", cep, address.city, address.state);
      Ok(HttpResponse::Ok().json(address))
    }
    None => {
      warn!("CEP {} is well-formed but unknown.", cep);
      Err(AppError::NotFound(format!("CEP {} not found.", cep.formatted())))
    }
  }
}
