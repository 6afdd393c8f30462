// server/src/test_support.rs

//! Fake providers and app wiring for handler tests. Nothing here talks to the network.
//!
//! `TestProviders::state` uses a lazy pool that never connects, which covers handlers
//! that fail before querying. Database-backed tests go through [`TestDatabase`], which
//! needs `TEST_DATABASE_URL` and gives each test its own schema with `schema.sql` applied.

use anyhow::anyhow;
use async_trait::async_trait;
use parking_lot::Mutex;
use serde_json::json;
use sqlx::postgres::{PgConnectOptions, PgPoolOptions};
use sqlx::PgPool;
use std::collections::HashSet;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Arc;
use storefront_core::shipping::{adapt_carrier_services, CarrierService};
use storefront_core::{
  AudienceSync, Cep, ColorImage, ColorImageCache, ColorImageSource, CoreError, CoreResult, PaymentGateway,
  PostalAddress, PostalLookup, PreferenceRequest, PreferenceResponse, ProductId, ShippingOption,
  ShippingQuoteRequest, ShippingQuoter, Subscriber,
};
use uuid::Uuid;

use crate::config::AppConfig;
use crate::services::admin_sessions::AdminSessions;
use crate::services::auth_service::hash_password;
use crate::services::email_client::WelcomeMailer;
use crate::state::AppState;

#[derive(Default)]
pub struct FakeQuoter {
  last: Mutex<Option<ShippingQuoteRequest>>,
  fail: AtomicBool,
}

impl FakeQuoter {
  pub fn last_request(&self) -> Option<ShippingQuoteRequest> {
    self.last.lock().clone()
  }

  pub fn fail_next(&self) {
    self.fail.store(true, Ordering::SeqCst);
  }
}

#[async_trait]
impl ShippingQuoter for FakeQuoter {
  async fn quote(&self, request: &ShippingQuoteRequest) -> CoreResult<Vec<ShippingOption>> {
    *self.last.lock() = Some(request.clone());
    if self.fail.swap(false, Ordering::SeqCst) {
      return Err(CoreError::provider("shipping", anyhow!("carrier aggregator timed out")));
    }
    let services: Vec<CarrierService> = serde_json::from_value(json!([
      {"id": 2, "name": "SEDEX", "price": "39.90", "delivery_time": 2, "company": {"id": 1, "name": "Correios"}},
      {"id": 1, "name": "PAC", "price": "19.90", "delivery_time": 7, "company": {"id": 1, "name": "Correios"}},
      {"id": 3, "name": ".Package", "error": "Serviço indisponível", "company": {"id": 2, "name": "Jadlog"}}
    ]))
    .map_err(|e| CoreError::provider("shipping", e))?;
    Ok(adapt_carrier_services(services))
  }
}

#[derive(Default)]
pub struct FakeGateway {
  last: Mutex<Option<PreferenceRequest>>,
  blank_redirect: AtomicBool,
}

impl FakeGateway {
  pub fn last_request(&self) -> Option<PreferenceRequest> {
    self.last.lock().clone()
  }

  /// The next preference comes back without any checkout URL.
  pub fn blank_redirect_next(&self) {
    self.blank_redirect.store(true, Ordering::SeqCst);
  }
}

#[async_trait]
impl PaymentGateway for FakeGateway {
  async fn create_preference(&self, request: &PreferenceRequest) -> CoreResult<PreferenceResponse> {
    *self.last.lock() = Some(request.clone());
    if self.blank_redirect.swap(false, Ordering::SeqCst) {
      return Ok(PreferenceResponse {
        id: format!("pref-{}", request.external_reference),
        init_point: String::new(),
        sandbox_init_point: None,
      });
    }
    Ok(PreferenceResponse {
      id: format!("pref-{}", request.external_reference),
      init_point: "https://pay.example.com/checkout".to_string(),
      sandbox_init_point: Some("https://sandbox.pay.example.com/checkout".to_string()),
    })
  }
}

#[derive(Default)]
pub struct FakeAudience {
  synced: Mutex<Vec<String>>,
}

impl FakeAudience {
  pub fn synced(&self) -> Vec<String> {
    self.synced.lock().clone()
  }
}

#[async_trait]
impl AudienceSync for FakeAudience {
  async fn upsert_contact(&self, subscriber: &Subscriber) -> CoreResult<()> {
    self.synced.lock().push(subscriber.email.clone());
    Ok(())
  }
}

/// Records recipients and always fails, so signups must survive a broken mailer.
#[derive(Default)]
pub struct FakeMailer {
  sent: Mutex<Vec<String>>,
}

impl FakeMailer {
  pub fn sent(&self) -> Vec<String> {
    self.sent.lock().clone()
  }
}

#[async_trait]
impl WelcomeMailer for FakeMailer {
  async fn send_welcome(&self, email: &str) -> CoreResult<()> {
    self.sent.lock().push(email.to_string());
    Err(CoreError::provider("email", anyhow!("smtp relay unavailable")))
  }
}

/// Knows a single CEP: 01310-100.
pub struct FakePostal;

#[async_trait]
impl PostalLookup for FakePostal {
  async fn lookup(&self, cep: &Cep) -> CoreResult<Option<PostalAddress>> {
    if cep.digits() != "01310100" {
      return Ok(None);
    }
    Ok(Some(PostalAddress {
      cep: cep.clone(),
      street: "Avenida Paulista".to_string(),
      neighborhood: "Bela Vista".to_string(),
      city: "São Paulo".to_string(),
      state: "SP".to_string(),
    }))
  }
}

/// Two colors per product, returned out of order. Products marked with
/// [`FakeImageSource::unlist`] are not found.
#[derive(Default)]
pub struct FakeImageSource {
  calls: AtomicUsize,
  unlisted: Mutex<HashSet<ProductId>>,
}

impl FakeImageSource {
  pub fn calls(&self) -> usize {
    self.calls.load(Ordering::SeqCst)
  }

  pub fn unlist(&self, product_id: ProductId) {
    self.unlisted.lock().insert(product_id);
  }
}

#[async_trait]
impl ColorImageSource for FakeImageSource {
  async fn fetch_color_images(&self, product_id: ProductId) -> CoreResult<Vec<ColorImage>> {
    self.calls.fetch_add(1, Ordering::SeqCst);
    if self.unlisted.lock().contains(&product_id) {
      return Err(CoreError::NotFound(format!("Product {} not found.", product_id)));
    }
    Ok(
      [("Off-white", 2), ("Preto", 1)]
        .into_iter()
        .map(|(color, position)| ColorImage {
          id: Uuid::new_v4(),
          product_id,
          color_name: color.to_string(),
          color_hex: None,
          image_url: format!("https://cdn.example.com/{}/{}.jpg", product_id, position),
          position,
        })
        .collect(),
    )
  }
}

#[derive(Clone)]
pub struct TestProviders {
  pub quoter: Arc<FakeQuoter>,
  pub gateway: Arc<FakeGateway>,
  pub audience: Arc<FakeAudience>,
  pub mailer: Arc<FakeMailer>,
  pub images: Arc<FakeImageSource>,
  pub sessions: Arc<AdminSessions>,
  pub image_cache: ColorImageCache<Arc<dyn ColorImageSource>>,
}

impl Default for TestProviders {
  fn default() -> Self {
    let images = Arc::new(FakeImageSource::default());
    let source: Arc<dyn ColorImageSource> = images.clone();
    Self {
      quoter: Arc::new(FakeQuoter::default()),
      gateway: Arc::new(FakeGateway::default()),
      audience: Arc::new(FakeAudience::default()),
      mailer: Arc::new(FakeMailer::default()),
      images,
      sessions: Arc::new(AdminSessions::new(chrono::Duration::minutes(30))),
      image_cache: ColorImageCache::new(source),
    }
  }
}

impl TestProviders {
  pub fn state(&self) -> AppState {
    let db_pool = PgPoolOptions::new()
      .connect_lazy(&AppConfig::test_defaults().database_url)
      .expect("lazy pool from a well-formed URL");
    self.state_with_pool(db_pool)
  }

  pub fn state_with_pool(&self, db_pool: PgPool) -> AppState {
    AppState {
      db_pool,
      config: Arc::new(AppConfig::test_defaults()),
      shipping: self.quoter.clone(),
      payments: self.gateway.clone(),
      postal: Arc::new(FakePostal),
      audience: Some(self.audience.clone() as Arc<dyn AudienceSync>),
      mailer: Some(self.mailer.clone() as Arc<dyn WelcomeMailer>),
      image_cache: self.image_cache.clone(),
      admin_sessions: self.sessions.clone(),
    }
  }

  /// Opens a session and returns the `Authorization` header value.
  pub fn admin_bearer(&self) -> String {
    let (token, _) = self.sessions.create(Uuid::new_v4(), "admin@loja.com");
    format!("Bearer {}", token)
  }
}

/// A throwaway schema on the Postgres server named by `TEST_DATABASE_URL`.
pub struct TestDatabase {
  pub pool: PgPool,
  admin: PgPool,
  schema: String,
}

impl TestDatabase {
  /// `None` (after a note on stderr) when `TEST_DATABASE_URL` is not set.
  pub async fn connect() -> Option<Self> {
    let url = match std::env::var("TEST_DATABASE_URL") {
      Ok(url) => url,
      Err(_) => {
        eprintln!("skipping database test: TEST_DATABASE_URL not set");
        return None;
      }
    };
    let options: PgConnectOptions = url.parse().expect("TEST_DATABASE_URL is a Postgres URL");
    let admin = PgPoolOptions::new()
      .max_connections(1)
      .connect_with(options.clone())
      .await
      .expect("connect to TEST_DATABASE_URL");

    let schema = format!("storefront_test_{}", Uuid::new_v4().simple());
    sqlx::raw_sql(&format!("CREATE SCHEMA {}", schema))
      .execute(&admin)
      .await
      .expect("create test schema");

    let pool = PgPoolOptions::new()
      .max_connections(5)
      .connect_with(options.options([("search_path", schema.as_str())]))
      .await
      .expect("connect inside test schema");
    sqlx::raw_sql(include_str!("../schema.sql"))
      .execute(&pool)
      .await
      .expect("apply schema.sql");

    Some(Self { pool, admin, schema })
  }

  pub async fn drop_schema(self) {
    self.pool.close().await;
    let _ = sqlx::raw_sql(&format!("DROP SCHEMA {} CASCADE", self.schema))
      .execute(&self.admin)
      .await;
  }

  pub async fn insert_product(&self, name: &str, stock: i32, active: bool) -> ProductId {
    let id: Uuid = sqlx::query_scalar(
      "INSERT INTO products (name, slug, price_cents, sizes, stock_quantity, active) \
       VALUES ($1, $2, 25990, ARRAY['P', 'M', 'G'], $3, $4) RETURNING id",
    )
    .bind(name)
    .bind(format!("{}-{}", name.to_lowercase().replace(' ', "-"), Uuid::new_v4().simple()))
    .bind(stock)
    .bind(active)
    .fetch_one(&self.pool)
    .await
    .expect("insert product");
    ProductId(id)
  }

  pub async fn insert_color_image(&self, product_id: ProductId, color: &str, position: i32) {
    sqlx::query("INSERT INTO product_color_images (product_id, color_name, image_url, position) VALUES ($1, $2, $3, $4)")
      .bind(product_id.0)
      .bind(color)
      .bind(format!("https://cdn.example.com/{}/{}.jpg", product_id, position))
      .bind(position)
      .execute(&self.pool)
      .await
      .expect("insert color image");
  }

  /// Inserts an admin with the given password and TOTP off.
  pub async fn insert_admin(&self, email: &str, password: &str) -> Uuid {
    sqlx::query_scalar("INSERT INTO admin_users (email, password_hash) VALUES ($1, $2) RETURNING id")
      .bind(email)
      .bind(hash_password(password).expect("hash test password"))
      .fetch_one(&self.pool)
      .await
      .expect("insert admin")
  }

  pub async fn count(&self, table: &str) -> i64 {
    sqlx::query_scalar(&format!("SELECT COUNT(*) FROM {}", table))
      .fetch_one(&self.pool)
      .await
      .expect("count rows")
  }
}

/// Builds the full route tree around an [`AppState`].
macro_rules! test_app {
  ($state:expr) => {
    actix_web::test::init_service(
      actix_web::App::new()
        .app_data(actix_web::web::Data::new($state))
        .configure(crate::web::configure_app_routes),
    )
    .await
  };
}

pub(crate) use test_app;
