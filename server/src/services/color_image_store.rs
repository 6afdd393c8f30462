// server/src/services/color_image_store.rs

use async_trait::async_trait;
use sqlx::PgPool;
use storefront_core::{ColorImage, ColorImageSource, CoreError, CoreResult, ProductId};
use tracing::{debug, instrument};

use crate::models::ColorImageRow;

/// Loads color images from `product_color_images`; sits behind the image cache.
///
/// Unknown or inactive products are a `NotFound` error rather than an empty list,
/// so the cache only ever holds entries for real catalog products.
pub struct DbColorImageSource {
  pool: PgPool,
}

impl DbColorImageSource {
  pub fn new(pool: PgPool) -> Self {
    Self { pool }
  }
}

#[async_trait]
impl ColorImageSource for DbColorImageSource {
  #[instrument(name = "service::fetch_color_images", skip(self), fields(product_id = %product_id))]
  async fn fetch_color_images(&self, product_id: ProductId) -> CoreResult<Vec<ColorImage>> {
    let listed: bool = sqlx::query_scalar("SELECT EXISTS (SELECT 1 FROM products WHERE id = $1 AND active)")
      .bind(product_id.0)
      .fetch_one(&self.pool)
      .await
      .map_err(|e| CoreError::provider("database", e))?;
    if !listed {
      debug!("Color images requested for an unknown or inactive product.");
      return Err(CoreError::NotFound(format!("Product {} not found.", product_id)));
    }

    let rows: Vec<ColorImageRow> = sqlx::query_as(
      "SELECT id, product_id, color_name, color_hex, image_url, position \
       FROM product_color_images WHERE product_id = $1 ORDER BY position ASC, color_name ASC",
    )
    .bind(product_id.0)
    .fetch_all(&self.pool)
    .await
    .map_err(|e| CoreError::provider("database", e))?;

    debug!(count = rows.len(), "Loaded color images from database.");
    Ok(rows.into_iter().map(ColorImage::from).collect())
  }
}
