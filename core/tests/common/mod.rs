// tests/common/mod.rs
#![allow(dead_code)] // Allow unused code in this common test module

use async_trait::async_trait;
use once_cell::sync::Lazy;
use std::sync::{
  atomic::{AtomicUsize, Ordering},
  Arc,
};
use std::time::Duration;
use storefront_core::{ColorImage, ColorImageSource, CoreError, CoreResult, ProductId};
use tokio::sync::Notify;
use tracing::Level;
use uuid::Uuid;

// --- Fixtures ---

pub fn color_image(product_id: ProductId, color: &str, position: i32) -> ColorImage {
  ColorImage {
    id: Uuid::new_v4(),
    product_id,
    color_name: color.to_string(),
    color_hex: None,
    image_url: format!("https://cdn.example.com/{}/{}.jpg", product_id, color),
    position,
  }
}

// --- Fake image sources ---

/// Returns two colors per product after a short delay and counts every call.
#[derive(Clone, Default)]
pub struct CountingSource {
  pub calls: Arc<AtomicUsize>,
  pub delay: Duration,
}

impl CountingSource {
  pub fn with_delay(delay: Duration) -> Self {
    Self {
      calls: Arc::new(AtomicUsize::new(0)),
      delay,
    }
  }

  pub fn calls(&self) -> usize {
    self.calls.load(Ordering::SeqCst)
  }
}

#[async_trait]
impl ColorImageSource for CountingSource {
  async fn fetch_color_images(&self, product_id: ProductId) -> CoreResult<Vec<ColorImage>> {
    self.calls.fetch_add(1, Ordering::SeqCst);
    if !self.delay.is_zero() {
      tokio::time::sleep(self.delay).await;
    }
    // Deliberately out of gallery order.
    Ok(vec![color_image(product_id, "preto", 2), color_image(product_id, "areia", 1)])
  }
}

/// Fails the first `failures` calls, then behaves like `CountingSource`.
pub struct FlakySource {
  pub calls: Arc<AtomicUsize>,
  pub failures: usize,
  pub delay: Duration,
}

impl FlakySource {
  pub fn new(failures: usize, delay: Duration) -> Self {
    Self {
      calls: Arc::new(AtomicUsize::new(0)),
      failures,
      delay,
    }
  }
}

#[async_trait]
impl ColorImageSource for FlakySource {
  async fn fetch_color_images(&self, product_id: ProductId) -> CoreResult<Vec<ColorImage>> {
    let call = self.calls.fetch_add(1, Ordering::SeqCst);
    tokio::time::sleep(self.delay).await;
    if call < self.failures {
      return Err(CoreError::provider("storage", anyhow::anyhow!("bucket unavailable (call {})", call)));
    }
    Ok(vec![color_image(product_id, "off-white", 1)])
  }
}

/// Blocks every fetch until `release` is notified.
pub struct GatedSource {
  pub calls: Arc<AtomicUsize>,
  pub release: Arc<Notify>,
}

impl GatedSource {
  pub fn new() -> Self {
    Self {
      calls: Arc::new(AtomicUsize::new(0)),
      release: Arc::new(Notify::new()),
    }
  }
}

#[async_trait]
impl ColorImageSource for GatedSource {
  async fn fetch_color_images(&self, product_id: ProductId) -> CoreResult<Vec<ColorImage>> {
    self.calls.fetch_add(1, Ordering::SeqCst);
    self.release.notified().await;
    Ok(vec![color_image(product_id, "vinho", 1)])
  }
}

// --- Helper for Tracing Setup (call once per test run if needed) ---
static TRACING_INIT: Lazy<()> = Lazy::new(|| {
  tracing_subscriber::fmt()
    .with_max_level(Level::DEBUG)
    .with_test_writer() // Important for tests to capture output
    .try_init()
    .ok(); // Allow multiple initializations in tests (ok if fails)
});

pub fn setup_tracing() {
  Lazy::force(&TRACING_INIT);
}

/// Polls `condition` until it holds or a second passes.
pub async fn wait_until<F: Fn() -> bool>(condition: F) {
  for _ in 0..200 {
    if condition() {
      return;
    }
    tokio::time::sleep(Duration::from_millis(5)).await;
  }
  panic!("condition not reached within timeout");
}
