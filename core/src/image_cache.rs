// core/src/image_cache.rs

//! Per-product color image cache with request coalescing.
//!
//! The cache is cache-aside: a lookup returns the stored list when there is
//! one, joins the in-flight fetch when another caller already started one, and
//! otherwise starts the fetch itself. Concurrent callers for the same product
//! therefore share a single call to the [`ColorImageSource`].
//!
//! There is no size bound, no TTL and no eviction other than [`ColorImageCache::clear`]
//! and [`ColorImageCache::invalidate`].
//!
//! IMPORTANT: the internal mutex is a blocking `parking_lot::Mutex`. It is only
//! ever held for map operations and never across an `.await`.

use crate::catalog::{sort_color_images, ColorImage, ProductId};
use crate::error::{CoreError, CoreResult};
use async_trait::async_trait;
use futures::future::{join_all, BoxFuture, FutureExt, Shared};
use parking_lot::Mutex;
use std::collections::HashMap;
use std::sync::Arc;
use tracing::{debug, instrument, trace, warn};

/// Where color images come from when the cache misses (database, storage API, ...).
#[async_trait]
pub trait ColorImageSource: Send + Sync + 'static {
  async fn fetch_color_images(&self, product_id: ProductId) -> CoreResult<Vec<ColorImage>>;
}

#[async_trait]
impl ColorImageSource for Arc<dyn ColorImageSource> {
  async fn fetch_color_images(&self, product_id: ProductId) -> CoreResult<Vec<ColorImage>> {
    (**self).fetch_color_images(product_id).await
  }
}

type FetchOutcome = Result<Arc<[ColorImage]>, Arc<CoreError>>;
type SharedFetch = Shared<BoxFuture<'static, FetchOutcome>>;

struct PendingFetch {
  ticket: u64,
  fetch: SharedFetch,
}

#[derive(Default)]
struct CacheState {
  images: HashMap<ProductId, Arc<[ColorImage]>>,
  pending: HashMap<ProductId, PendingFetch>,
  next_ticket: u64,
}

pub struct ColorImageCache<S: ColorImageSource> {
  source: Arc<S>,
  state: Arc<Mutex<CacheState>>,
}

impl<S: ColorImageSource> Clone for ColorImageCache<S> {
  fn clone(&self) -> Self {
    Self {
      source: Arc::clone(&self.source),
      state: Arc::clone(&self.state),
    }
  }
}

impl<S: ColorImageSource> ColorImageCache<S> {
  pub fn new(source: S) -> Self {
    Self::from_arc(Arc::new(source))
  }

  pub fn from_arc(source: Arc<S>) -> Self {
    Self {
      source,
      state: Arc::new(Mutex::new(CacheState::default())),
    }
  }

  /// Returns the color images of `product_id`, fetching them at most once
  /// no matter how many callers ask concurrently.
  ///
  /// A failed fetch caches nothing: every caller that joined it receives the
  /// same error and the next call starts a fresh fetch.
  #[instrument(name = "ColorImageCache::get", skip(self), fields(product_id = %product_id))]
  pub async fn get(&self, product_id: ProductId) -> CoreResult<Arc<[ColorImage]>> {
    let fetch = {
      let mut state = self.state.lock();
      if let Some(hit) = state.images.get(&product_id) {
        trace!("Color image cache hit.");
        return Ok(Arc::clone(hit));
      }
      match state.pending.get(&product_id) {
        Some(in_flight) => {
          debug!(ticket = in_flight.ticket, "Joining in-flight color image fetch.");
          in_flight.fetch.clone()
        }
        None => {
          let ticket = state.next_ticket;
          state.next_ticket += 1;
          debug!(ticket, "Color image cache miss, starting fetch.");
          let fetch = self.start_fetch(product_id, ticket);
          state.pending.insert(
            product_id,
            PendingFetch {
              ticket,
              fetch: fetch.clone(),
            },
          );
          fetch
        }
      }
    }; // lock released before awaiting

    fetch.await.map_err(CoreError::Shared)
  }

  /// Builds the shared fetch future. On completion it evicts its own pending
  /// entry and stores the result, but only if that entry still carries its
  /// ticket; a `clear` or `invalidate` in the meantime leaves the cache alone.
  fn start_fetch(&self, product_id: ProductId, ticket: u64) -> SharedFetch {
    let source = Arc::clone(&self.source);
    let state = Arc::clone(&self.state);

    async move {
      let outcome = source.fetch_color_images(product_id).await;

      let mut guard = state.lock();
      let still_current = matches!(guard.pending.get(&product_id), Some(p) if p.ticket == ticket);
      if still_current {
        guard.pending.remove(&product_id);
      }

      match outcome {
        Ok(mut images) => {
          sort_color_images(&mut images);
          let images: Arc<[ColorImage]> = images.into();
          if still_current {
            guard.images.insert(product_id, Arc::clone(&images));
          } else {
            debug!(%product_id, ticket, "Cache was cleared during fetch, result not stored.");
          }
          Ok(images)
        }
        Err(err) => {
          warn!(%product_id, ticket, error = %err, "Color image fetch failed.");
          Err(Arc::new(err))
        }
      }
    }
    .boxed()
    .shared()
  }

  /// Cached images for `product_id` without triggering a fetch.
  pub fn peek(&self, product_id: ProductId) -> Option<Arc<[ColorImage]>> {
    self.state.lock().images.get(&product_id).cloned()
  }

  /// Warms the cache for several products concurrently. Returns how many
  /// products ended up cached; failures are logged and otherwise ignored.
  pub async fn prefetch<I>(&self, product_ids: I) -> usize
  where
    I: IntoIterator<Item = ProductId>,
  {
    let results = join_all(product_ids.into_iter().map(|id| self.get(id))).await;
    results.iter().filter(|r| r.is_ok()).count()
  }

  /// Drops every cached list and forgets every in-flight fetch.
  pub fn clear(&self) {
    let mut state = self.state.lock();
    debug!(
      cached = state.images.len(),
      pending = state.pending.len(),
      "Clearing color image cache."
    );
    state.images.clear();
    state.pending.clear();
  }

  /// Drops the cached list (and any in-flight fetch) of a single product.
  pub fn invalidate(&self, product_id: ProductId) {
    let mut state = self.state.lock();
    state.images.remove(&product_id);
    state.pending.remove(&product_id);
  }

  pub fn len(&self) -> usize {
    self.state.lock().images.len()
  }

  pub fn is_empty(&self) -> bool {
    self.len() == 0
  }

  pub fn pending_len(&self) -> usize {
    self.state.lock().pending.len()
  }
}
