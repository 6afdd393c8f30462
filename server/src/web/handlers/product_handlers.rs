// server/src/web/handlers/product_handlers.rs

use actix_web::{web, HttpResponse};
use serde::Deserialize;
use serde_json::json;
use storefront_core::{Product, ProductId};
use tracing::{error, info, instrument, warn};
use uuid::Uuid;

use crate::errors::AppError;
use crate::models::product::PRODUCT_COLUMNS;
use crate::models::ProductRow;
use crate::state::AppState;

#[derive(Deserialize, Debug)]
pub struct ListProductsQuery {
  /// Category slug.
  pub category: Option<String>,
}

#[instrument(name = "handler::list_products", skip(app_state, query_params))]
pub async fn list_products_handler(
  app_state: web::Data<AppState>,
  query_params: web::Query<ListProductsQuery>,
) -> Result<HttpResponse, AppError> {
  let category = query_params.into_inner().category.filter(|c| !c.trim().is_empty());

  let rows: Vec<ProductRow> = sqlx::query_as(&format!(
    "SELECT {} FROM products p LEFT JOIN categories c ON c.id = p.category_id \
     WHERE p.active AND ($1::text IS NULL OR c.slug = $1) ORDER BY p.created_at DESC",
    PRODUCT_COLUMNS
  ))
  .bind(&category)
  .fetch_all(&app_state.db_pool)
  .await
  .map_err(|e| {
    error!("Failed to fetch products from database: {}", e);
    AppError::Sqlx(e)
  })?;

  let products: Vec<Product> = rows.into_iter().map(Product::from).collect();
  info!("Successfully fetched {} products.", products.len());

  Ok(HttpResponse::Ok().json(json!({ "products": products })))
}

#[instrument(name = "handler::get_product", skip(app_state, path), fields(product_id = %path.as_ref()))]
pub async fn get_product_handler(
  app_state: web::Data<AppState>,
  path: web::Path<Uuid>,
) -> Result<HttpResponse, AppError> {
  let product_id = path.into_inner();

  let row: Option<ProductRow> = sqlx::query_as(&format!(
    "SELECT {} FROM products p WHERE p.id = $1 AND p.active",
    PRODUCT_COLUMNS
  ))
  .bind(product_id)
  .fetch_optional(&app_state.db_pool)
  .await?;

  match row {
    Some(row) => {
      let product = Product::from(row);
      Ok(HttpResponse::Ok().json(json!({
        "product": product,
        "on_sale": product.is_on_sale(),
        "in_stock": product.in_stock()
      })))
    }
    None => {
      warn!("Product with ID {} not found.", product_id);
      Err(AppError::NotFound(format!("Product with ID {} not found.", product_id)))
    }
  }
}

/// Color variants through the coalescing image cache. Unknown products are a 404
/// and leave nothing behind in the cache.
#[instrument(name = "handler::product_colors", skip(app_state, path), fields(product_id = %path.as_ref()))]
pub async fn product_colors_handler(
  app_state: web::Data<AppState>,
  path: web::Path<Uuid>,
) -> Result<HttpResponse, AppError> {
  let product_id = ProductId(path.into_inner());
  let images = app_state.image_cache.get(product_id).await?;

  Ok(HttpResponse::Ok().json(json!({
    "product_id": product_id,
    "colors": images.as_ref()
  })))
}
