use std::sync::Arc;

use chrono::Duration;
use tokio::sync::broadcast;

use crate::broadcast::LocationBroadcaster;
use crate::cache::TtlCache;
use crate::clock::{Clock, SystemClock};
use crate::config::{CacheSettings, Config};
use crate::engine::login::OtpRateLimiter;
use crate::engine::otp::{OtpHasher, OtpVault};
use crate::error::AppError;
use crate::models::event::DomainEvent;
use crate::models::location::LocationPing;
use crate::models::matching::RankedMatch;
use crate::models::page::Page;
use crate::models::request::ParcelRequest;
use crate::notify::{LogNotifier, Notifier};
use crate::observability::metrics::Metrics;
use crate::store::{MemoryStore, Store};

/// One cache per query family, each cleared wholesale by the writes that
/// could change its answers.
pub struct Caches {
    pub feed: TtlCache<String, Page<ParcelRequest>>,
    pub search: TtlCache<String, Page<ParcelRequest>>,
    pub matching: TtlCache<String, Vec<RankedMatch>>,
    pub tracking: TtlCache<String, LocationPing>,
}

impl Caches {
    pub fn new(config: &Config, clock: Arc<dyn Clock>) -> Self {
        fn build<K, V>(name: &'static str, settings: CacheSettings, clock: Arc<dyn Clock>) -> TtlCache<K, V>
        where
            K: Eq + std::hash::Hash + Clone,
            V: Clone,
        {
            TtlCache::new(name, Duration::milliseconds(settings.ttl_ms), settings.capacity, clock)
        }

        Self {
            feed: build("feed", config.feed_cache, clock.clone()),
            search: build("search", config.search_cache, clock.clone()),
            matching: build("matching", config.matching_cache, clock.clone()),
            tracking: build("tracking", config.tracking_cache, clock),
        }
    }

    pub fn invalidate_request_views(&self) {
        self.feed.clear();
        self.search.clear();
        self.matching.clear();
    }
}

pub struct AppState {
    pub store: Arc<dyn Store>,
    pub notifier: Arc<dyn Notifier>,
    pub clock: Arc<dyn Clock>,
    pub caches: Caches,
    pub otp_hasher: OtpHasher,
    pub login_codes: OtpVault,
    pub otp_limiter: OtpRateLimiter,
    pub login_otp_ttl: Duration,
    pub broadcaster: Arc<LocationBroadcaster>,
    pub events_tx: broadcast::Sender<DomainEvent>,
    pub metrics: Metrics,
}

impl AppState {
    pub fn new(
        config: &Config,
        store: Arc<dyn Store>,
        notifier: Arc<dyn Notifier>,
        clock: Arc<dyn Clock>,
    ) -> Result<Self, AppError> {
        let (events_tx, _unused_rx) = broadcast::channel(config.event_buffer_size.max(1));

        Ok(Self {
            store,
            notifier,
            caches: Caches::new(config, clock.clone()),
            otp_hasher: OtpHasher::new(config.otp_hash_memory_kib, config.otp_hash_iterations)?,
            login_codes: OtpVault::new(clock.clone()),
            otp_limiter: OtpRateLimiter::new(
                config.otp_requests_per_hour,
                Duration::hours(1),
                clock.clone(),
            ),
            login_otp_ttl: Duration::seconds(config.login_otp_ttl_secs),
            broadcaster: Arc::new(LocationBroadcaster::new(config.room_buffer_size)),
            events_tx,
            metrics: Metrics::new(),
            clock,
        })
    }

    pub fn in_memory(config: &Config) -> Result<Self, AppError> {
        Self::new(
            config,
            Arc::new(MemoryStore::new()),
            Arc::new(LogNotifier),
            Arc::new(SystemClock),
        )
    }

    pub fn cached<K, V>(&self, cache: &TtlCache<K, V>, key: &K) -> Option<V>
    where
        K: Eq + std::hash::Hash + Clone,
        V: Clone,
    {
        let hit = cache.get(key);
        let result = if hit.is_some() { "hit" } else { "miss" };
        self.metrics
            .cache_lookups_total
            .with_label_values(&[cache.name(), result])
            .inc();
        hit
    }

    pub fn emit(&self, event: DomainEvent) {
        // no subscribers just means nobody is watching
        let _ = self.events_tx.send(event);
    }

    pub fn record_transition(&self, entity: &str, ok: bool) {
        let outcome = if ok { "success" } else { "rejected" };
        self.metrics
            .lifecycle_transitions_total
            .with_label_values(&[entity, outcome])
            .inc();
    }

    pub fn record_otp_check(&self, kind: &str, ok: bool) {
        let outcome = if ok { "accepted" } else { "rejected" };
        self.metrics
            .otp_verifications_total
            .with_label_values(&[kind, outcome])
            .inc();
    }
}
