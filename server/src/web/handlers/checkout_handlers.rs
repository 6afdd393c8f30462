// server/src/web/handlers/checkout_handlers.rs

use actix_web::{web, HttpResponse};
use serde::Deserialize;
use serde_json::json;
use std::collections::HashMap;
use storefront_core::payment::{CheckoutLineItem, Payer, ReturnUrls};
use storefront_core::{normalize_email, Cep, Cpf, Money, PreferenceDraft, Product, ProductId};
use tracing::{error, info, instrument, warn};
use uuid::Uuid;

use crate::errors::AppError;
use crate::models::product::PRODUCT_COLUMNS;
use crate::models::{Customer, Order, OrderItem, OrderStatus, ProductRow};
use crate::state::AppState;

// --- Request DTOs ---

#[derive(Deserialize, Debug)]
pub struct CheckoutItemPayload {
  pub product_id: Uuid,
  pub quantity: u32,
  pub size: Option<String>,
  pub color: Option<String>,
}

#[derive(Deserialize, Debug)]
pub struct PayerPayload {
  pub name: String,
  pub email: String,
  pub cpf: String,
}

/// The shipping option picked from a previous quote.
#[derive(Deserialize, Debug)]
pub struct ShippingChoicePayload {
  pub cep: String,
  pub service_name: String,
  /// Cents.
  pub price: Money,
}

#[derive(Deserialize, Debug)]
pub struct CheckoutPayload {
  pub items: Vec<CheckoutItemPayload>,
  pub payer: Option<PayerPayload>,
  pub shipping: Option<ShippingChoicePayload>,
}

struct ShippingChoice {
  cep: Cep,
  service_name: String,
  price: Money,
}

/// Checks everything that does not need the database.
fn parse_payload(payload: &CheckoutPayload) -> Result<(Option<Payer>, Option<ShippingChoice>), AppError> {
  if payload.items.is_empty() {
    return Err(AppError::Validation("Checkout requires at least one item.".to_string()));
  }
  let payer = match &payload.payer {
    Some(p) => Some(Payer {
      name: p.name.trim().to_string(),
      email: normalize_email(&p.email)?,
      cpf: Cpf::parse(&p.cpf)?,
    }),
    None => None,
  };
  let shipping = match &payload.shipping {
    Some(s) => Some(ShippingChoice {
      cep: Cep::parse(&s.cep)?,
      service_name: s.service_name.trim().to_string(),
      price: s.price,
    }),
    None => None,
  };
  Ok((payer, shipping))
}

/// Quantity asked for per product, summed over every line (sizes and colors share stock).
fn requested_totals(items: &[CheckoutItemPayload]) -> HashMap<Uuid, u64> {
  let mut totals = HashMap::new();
  for item in items {
    *totals.entry(item.product_id).or_insert(0u64) += u64::from(item.quantity);
  }
  totals
}

/// Prices and titles always come from the catalog, never from the client.
/// `requested_total` is the product's quantity across the whole checkout.
fn build_line_item(
  product: &Product,
  item: &CheckoutItemPayload,
  requested_total: u64,
) -> Result<CheckoutLineItem, AppError> {
  if !product.active {
    return Err(AppError::NotFound(format!("Product {} is not available.", product.id)));
  }
  let available = u64::try_from(product.stock_quantity).unwrap_or(0);
  if requested_total.max(u64::from(item.quantity)) > available {
    return Err(AppError::Validation(format!(
      "Insufficient stock for '{}': requested {}, available {}.",
      product.name, requested_total, product.stock_quantity
    )));
  }
  if let Some(size) = item.size.as_deref() {
    if !product.sizes.is_empty() && !product.sizes.iter().any(|s| s.eq_ignore_ascii_case(size)) {
      return Err(AppError::Validation(format!(
        "Size '{}' is not offered for '{}'.",
        size, product.name
      )));
    }
  }
  Ok(CheckoutLineItem {
    product_id: product.id,
    title: product.name.clone(),
    quantity: item.quantity,
    unit_price: product.price,
    picture_url: None,
    size: item.size.clone(),
    color: item.color.clone(),
  })
}

/// Picture for the provider's checkout page: the chosen color if known, else the first image.
async fn pick_picture(app_state: &AppState, product_id: ProductId, color: Option<&str>) -> Option<String> {
  let images = app_state.image_cache.get(product_id).await.ok()?;
  let chosen = color
    .and_then(|c| images.iter().find(|img| img.color_name.eq_ignore_ascii_case(c)))
    .or_else(|| images.first());
  chosen.map(|img| img.image_url.clone())
}

#[instrument(name = "handler::create_preference", skip(app_state, payload), fields(items = payload.items.len()))]
pub async fn create_preference_handler(
  app_state: web::Data<AppState>,
  payload: web::Json<CheckoutPayload>,
) -> Result<HttpResponse, AppError> {
  let payload = payload.into_inner();
  let (payer, shipping) = parse_payload(&payload)?;

  let ids: Vec<Uuid> = payload.items.iter().map(|i| i.product_id).collect();
  let rows: Vec<ProductRow> = sqlx::query_as(&format!("SELECT {} FROM products p WHERE p.id = ANY($1)", PRODUCT_COLUMNS))
    .bind(&ids)
    .fetch_all(&app_state.db_pool)
    .await
    .map_err(|e| {
      error!("Failed to load checkout products: {}", e);
      AppError::Sqlx(e)
    })?;
  let catalog: HashMap<Uuid, Product> = rows.into_iter().map(|r| (r.id, Product::from(r))).collect();
  let totals = requested_totals(&payload.items);

  let mut items = Vec::with_capacity(payload.items.len());
  for requested in &payload.items {
    let product = catalog
      .get(&requested.product_id)
      .ok_or_else(|| AppError::NotFound(format!("Product {} not found.", requested.product_id)))?;
    let requested_total = totals.get(&requested.product_id).copied().unwrap_or(0);
    let mut line = build_line_item(product, requested, requested_total)?;
    line.picture_url = pick_picture(&app_state, product.id, requested.color.as_deref()).await;
    items.push(line);
  }

  let order_id = Uuid::new_v4();
  let draft = PreferenceDraft {
    items,
    payer: payer.clone(),
    return_urls: ReturnUrls::for_storefront(&app_state.config.app_base_url),
    shipping_cost: shipping.as_ref().map(|s| s.price),
    external_reference: order_id.to_string(),
    notification_url: app_state.config.payment_notification_url.clone(),
  };
  let request = draft.to_request()?;
  let total = draft.total()?;
  let items_total = Money::from_cents(total.amount_cents - draft.shipping_cost.unwrap_or(Money::ZERO).amount_cents);

  let preference = app_state.payments.create_preference(&request).await?;
  let redirect_url = preference.redirect_url(app_state.config.payment_sandbox).to_string();
  if redirect_url.is_empty() {
    warn!(preference_id = %preference.id, "Payment provider returned no redirect URL.");
    return Err(AppError::Payment("Payment provider did not return a checkout URL.".to_string()));
  }

  // Persist the pending order together with its buyer and lines.
  let mut tx = app_state.db_pool.begin().await?;

  // A known CPF keeps its stored name and email; the order carries the email given now.
  let customer: Option<Customer> = match &payer {
    Some(p) => Some(
      sqlx::query_as(
        "INSERT INTO customers (name, email, cpf) VALUES ($1, $2, $3) \
         ON CONFLICT (cpf) DO UPDATE SET cpf = customers.cpf \
         RETURNING id, name, email, cpf, created_at",
      )
      .bind(&p.name)
      .bind(&p.email)
      .bind(p.cpf.digits())
      .fetch_one(&mut *tx)
      .await?,
    ),
    None => None,
  };

  let order: Order = sqlx::query_as(
    "INSERT INTO orders (id, customer_id, contact_email, status, items_total_cents, shipping_cents, total_cents, \
       currency, shipping_cep, shipping_service, payment_preference_id) \
     VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11) \
     RETURNING id, customer_id, contact_email, status, items_total_cents, shipping_cents, total_cents, currency, \
       shipping_cep, shipping_service, payment_preference_id, created_at, updated_at",
  )
  .bind(order_id)
  .bind(customer.as_ref().map(|c| c.id))
  .bind(payer.as_ref().map(|p| p.email.clone()))
  .bind(OrderStatus::AwaitingPayment)
  .bind(items_total.amount_cents)
  .bind(draft.shipping_cost.unwrap_or(Money::ZERO).amount_cents)
  .bind(total.amount_cents)
  .bind(storefront_core::payment::CURRENCY_ID)
  .bind(shipping.as_ref().map(|s| s.cep.digits().to_string()))
  .bind(shipping.as_ref().map(|s| s.service_name.clone()))
  .bind(&preference.id)
  .fetch_one(&mut *tx)
  .await?;

  let mut order_items: Vec<OrderItem> = Vec::with_capacity(draft.items.len());
  for line in &draft.items {
    let item: OrderItem = sqlx::query_as(
      "INSERT INTO order_items (order_id, product_id, title, size, color, quantity, unit_price_cents) \
       VALUES ($1, $2, $3, $4, $5, $6, $7) \
       RETURNING id, order_id, product_id, title, size, color, quantity, unit_price_cents",
    )
    .bind(order.id)
    .bind(line.product_id.0)
    .bind(&line.title)
    .bind(&line.size)
    .bind(&line.color)
    .bind(line.quantity as i32)
    .bind(line.unit_price.amount_cents)
    .fetch_one(&mut *tx)
    .await?;
    order_items.push(item);
  }

  tx.commit().await?;
  info!(
    order_id = %order.id,
    preference_id = %preference.id,
    "Checkout created: {} for {} line(s).",
    total,
    order_items.len()
  );

  Ok(HttpResponse::Created().json(json!({
    "order_id": order.id,
    "preference_id": preference.id,
    "redirect_url": redirect_url,
    "total": total,
    "order": order,
    "items": order_items
  })))
}

#[cfg(test)]
mod tests {
  use super::*;
  use chrono::Utc;

  fn product(stock: i32) -> Product {
    Product {
      id: ProductId::generate(),
      name: "Vestido Midi".to_string(),
      slug: "vestido-midi".to_string(),
      description: None,
      price: Money::from_cents(25990),
      compare_at_price: None,
      category_id: None,
      sizes: vec!["P".into(), "M".into()],
      stock_quantity: stock,
      active: true,
      created_at: Utc::now(),
    }
  }

  fn requested(product: &Product, quantity: u32, size: Option<&str>) -> CheckoutItemPayload {
    CheckoutItemPayload {
      product_id: product.id.0,
      quantity,
      size: size.map(str::to_string),
      color: None,
    }
  }

  #[test]
  fn line_items_use_catalog_prices_and_check_stock_and_size() {
    let dress = product(3);
    let line = build_line_item(&dress, &requested(&dress, 2, Some("m")), 2).unwrap();
    assert_eq!(line.unit_price, Money::from_cents(25990));
    assert_eq!(line.title, "Vestido Midi");

    assert!(matches!(build_line_item(&dress, &requested(&dress, 4, None), 4), Err(AppError::Validation(m)) if m.contains("stock")));
    assert!(matches!(build_line_item(&dress, &requested(&dress, 1, Some("GG")), 1), Err(AppError::Validation(m)) if m.contains("Size")));

    let mut hidden = product(3);
    hidden.active = false;
    assert!(matches!(build_line_item(&hidden, &requested(&hidden, 1, None), 1), Err(AppError::NotFound(_))));
  }

  #[test]
  fn stock_is_checked_against_all_lines_of_a_product() {
    let dress = product(3);
    let scarf = product(10);
    let lines = vec![
      requested(&dress, 2, Some("P")),
      requested(&scarf, 1, None),
      requested(&dress, 2, Some("M")),
    ];
    let totals = requested_totals(&lines);
    assert_eq!(totals[&dress.id.0], 4);
    assert_eq!(totals[&scarf.id.0], 1);

    let first = build_line_item(&dress, &lines[0], totals[&dress.id.0]);
    assert!(matches!(first, Err(AppError::Validation(m)) if m.contains("requested 4, available 3")));
    assert!(build_line_item(&scarf, &lines[1], totals[&scarf.id.0]).is_ok());
  }
}
