// server/src/models/color_image.rs

use sqlx::FromRow;
use storefront_core::{ColorImage, ProductId};
use uuid::Uuid;

#[derive(Debug, Clone, FromRow)]
pub struct ColorImageRow {
  pub id: Uuid,
  pub product_id: Uuid,
  pub color_name: String,
  pub color_hex: Option<String>,
  pub image_url: String,
  pub position: i32,
}

impl From<ColorImageRow> for ColorImage {
  fn from(row: ColorImageRow) -> Self {
    ColorImage {
      id: row.id,
      product_id: ProductId(row.product_id),
      color_name: row.color_name,
      color_hex: row.color_hex,
      image_url: row.image_url,
      position: row.position,
    }
  }
}
