// core/examples/image_cache_coalescing.rs

use async_trait::async_trait;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;
use storefront_core::{ColorImage, ColorImageCache, ColorImageSource, CoreResult, ProductId};
use tracing::info;
use uuid::Uuid;

// 1. A slow source standing in for the database
#[derive(Default)]
struct SlowSource {
  calls: AtomicUsize,
}

#[async_trait]
impl ColorImageSource for SlowSource {
  async fn fetch_color_images(&self, product_id: ProductId) -> CoreResult<Vec<ColorImage>> {
    self.calls.fetch_add(1, Ordering::SeqCst);
    tokio::time::sleep(Duration::from_millis(100)).await;
    Ok(
      ["Preto", "Areia", "Verde Musgo"]
        .iter()
        .enumerate()
        .map(|(i, color)| ColorImage {
          id: Uuid::new_v4(),
          product_id,
          color_name: color.to_string(),
          color_hex: None,
          image_url: format!("https://cdn.example.com/{}/{}.jpg", product_id, i),
          position: i as i32,
        })
        .collect(),
    )
  }
}

#[tokio::main]
async fn main() -> CoreResult<()> {
  tracing_subscriber::fmt().with_max_level(tracing::Level::DEBUG).init();

  info!("--- Color Image Cache Example ---");

  let source = Arc::new(SlowSource::default());
  let cache = ColorImageCache::from_arc(Arc::clone(&source));
  let product = ProductId::generate();

  // 2. Ten concurrent product cards asking for the same product
  let mut tasks = Vec::new();
  for _ in 0..10 {
    let cache = cache.clone();
    tasks.push(tokio::spawn(async move { cache.get(product).await.map(|images| images.len()) }));
  }
  for task in tasks {
    let count = task.await.expect("task panicked")?;
    info!("Card received {} color images.", count);
  }
  info!("Source was called {} time(s).", source.calls.load(Ordering::SeqCst));

  // 3. Later lookups are served from memory until the cache is cleared
  cache.get(product).await?;
  cache.clear();
  cache.get(product).await?;
  info!("After clear, source calls: {}.", source.calls.load(Ordering::SeqCst));

  Ok(())
}
