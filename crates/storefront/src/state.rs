//! Application state shared across handlers.

use std::sync::Arc;

use chrono::{Local, NaiveDateTime};
use sqlx::PgPool;

use crate::config::StorefrontConfig;
use crate::db::PgOrderStore;
use crate::services::PaymentError;
use crate::services::catalog::ProductCatalog;
use crate::services::checkout::CheckoutService;
use crate::services::geocoding::GoogleGeocoder;
use crate::services::notify::SlackNotifier;
use crate::services::stripe::StripeClient;
use crate::settings::StoreSettings;
use crate::slack::SlackClient;

/// Production checkout wiring.
pub type Checkout = CheckoutService<PgOrderStore, StripeClient, SlackNotifier>;

/// Source of the current store-local time.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Clock {
    /// The server's local time zone.
    System,
    /// A pinned instant, for tests and previews.
    Fixed(NaiveDateTime),
}

impl Clock {
    #[must_use]
    pub fn now(&self) -> NaiveDateTime {
        match self {
            Self::System => Local::now().naive_local(),
            Self::Fixed(at) => *at,
        }
    }
}

/// Application state shared across all handlers.
///
/// This struct is cheaply cloneable via `Arc` and provides access to
/// shared resources like database connections and configuration.
#[derive(Clone)]
pub struct AppState {
    inner: Arc<AppStateInner>,
}

struct AppStateInner {
    config: StorefrontConfig,
    settings: Arc<StoreSettings>,
    pool: PgPool,
    catalog: ProductCatalog,
    geocoder: GoogleGeocoder,
    checkout: Checkout,
    clock: Clock,
}

impl AppState {
    /// Create a new application state.
    ///
    /// # Errors
    ///
    /// Returns an error if the Stripe client cannot be built.
    pub fn new(
        config: StorefrontConfig,
        settings: StoreSettings,
        pool: PgPool,
        clock: Clock,
    ) -> Result<Self, PaymentError> {
        let settings = Arc::new(settings);

        let stripe = StripeClient::new(&config.stripe)?;
        let slack = config.slack.as_ref().map(SlackClient::new);
        if slack.is_none() {
            tracing::warn!("Slack not configured, order notifications are disabled");
        }
        let notifier = SlackNotifier::new(slack, settings.currency);

        let checkout = CheckoutService::new(
            PgOrderStore::new(pool.clone()),
            stripe,
            notifier,
            Arc::clone(&settings),
        );

        Ok(Self {
            inner: Arc::new(AppStateInner {
                catalog: ProductCatalog::new(pool.clone()),
                geocoder: GoogleGeocoder::new(config.google_maps_api_key.clone()),
                config,
                settings,
                pool,
                checkout,
                clock,
            }),
        })
    }

    /// Get a reference to the storefront configuration.
    #[must_use]
    pub fn config(&self) -> &StorefrontConfig {
        &self.inner.config
    }

    /// Store settings (hours, service area, pricing).
    #[must_use]
    pub fn settings(&self) -> &StoreSettings {
        &self.inner.settings
    }

    /// Get a reference to the database connection pool.
    #[must_use]
    pub fn pool(&self) -> &PgPool {
        &self.inner.pool
    }

    #[must_use]
    pub fn catalog(&self) -> &ProductCatalog {
        &self.inner.catalog
    }

    #[must_use]
    pub fn geocoder(&self) -> &GoogleGeocoder {
        &self.inner.geocoder
    }

    #[must_use]
    pub fn checkout(&self) -> &Checkout {
        &self.inner.checkout
    }

    /// Current store-local time.
    #[must_use]
    pub fn now(&self) -> NaiveDateTime {
        self.inner.clock.now()
    }
}
