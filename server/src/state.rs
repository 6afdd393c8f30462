// server/src/state.rs

use crate::config::AppConfig;
use crate::services::admin_sessions::AdminSessions;
use crate::services::audience_client::AudienceClient;
use crate::services::color_image_store::DbColorImageSource;
use crate::services::email_client::{TransactionalEmailClient, WelcomeMailer};
use crate::services::payment_client::PaymentProviderClient;
use crate::services::postal_client::PostalLookupClient;
use crate::services::shipping_client::CarrierAggregatorClient;
use sqlx::PgPool;
use std::sync::Arc;
use storefront_core::{AudienceSync, ColorImageCache, ColorImageSource, PaymentGateway, PostalLookup, ShippingQuoter};

pub type SharedImageCache = ColorImageCache<Arc<dyn ColorImageSource>>;

#[derive(Clone)]
pub struct AppState {
  pub db_pool: PgPool,
  pub config: Arc<AppConfig>, // Share loaded config
  pub shipping: Arc<dyn ShippingQuoter>,
  pub payments: Arc<dyn PaymentGateway>,
  pub postal: Arc<dyn PostalLookup>,
  /// `None` when mailing-list sync is not configured.
  pub audience: Option<Arc<dyn AudienceSync>>,
  /// `None` when welcome emails are not configured.
  pub mailer: Option<Arc<dyn WelcomeMailer>>,
  pub image_cache: SharedImageCache,
  pub admin_sessions: Arc<AdminSessions>,
}

impl AppState {
  /// Wires the real provider clients around one shared HTTP client.
  pub fn from_config(config: Arc<AppConfig>, db_pool: PgPool, http: reqwest::Client) -> Self {
    let audience: Option<Arc<dyn AudienceSync>> = match (&config.audience_api_key, config.audience_list_id) {
      (Some(key), Some(list_id)) => Some(Arc::new(AudienceClient::new(
        http.clone(),
        &config.audience_api_url,
        key.clone(),
        list_id,
      )) as Arc<dyn AudienceSync>),
      _ => None,
    };
    let mailer: Option<Arc<dyn WelcomeMailer>> = config.email_api_key.as_ref().map(|key| {
      Arc::new(TransactionalEmailClient::new(
        http.clone(),
        &config.email_api_url,
        key.clone(),
        config.email_sender.clone(),
      )) as Arc<dyn WelcomeMailer>
    });
    let image_source: Arc<dyn ColorImageSource> = Arc::new(DbColorImageSource::new(db_pool.clone()));

    Self {
      shipping: Arc::new(CarrierAggregatorClient::new(http.clone(), &config)),
      payments: Arc::new(PaymentProviderClient::new(http.clone(), &config)),
      postal: Arc::new(PostalLookupClient::new(http, &config.cep_api_url)),
      audience,
      mailer,
      image_cache: ColorImageCache::new(image_source),
      admin_sessions: Arc::new(AdminSessions::new(chrono::Duration::minutes(
        config.admin_session_ttl_minutes,
      ))),
      db_pool,
      config,
    }
  }
}
