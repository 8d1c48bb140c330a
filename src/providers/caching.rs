//! Process-wide exchange rate cache.
//!
//! Serves the cached rate while it is fresh, otherwise runs a single fetch that
//! every concurrent caller shares. A fetch tries each source in order, then the
//! persisted rate, then the configured fallback constant, so callers always get
//! a usable rate.

use crate::core::config::RatesConfig;
use crate::core::rate::{ExchangeRate, RateOrigin, RatePersistence, RateQuote, RateSource};
use chrono::{Duration, Utc};
use futures::FutureExt;
use futures::future::{BoxFuture, Shared};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use tokio::task::JoinHandle;
use tracing::{debug, error, info, warn};

type SharedFetch = Shared<BoxFuture<'static, RateQuote>>;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RateCacheSettings {
    pub freshness: Duration,
    pub fallback_rate: f64,
    pub refresh_persisted_timestamp: bool,
}

impl From<&RatesConfig> for RateCacheSettings {
    fn from(config: &RatesConfig) -> Self {
        Self {
            freshness: config.freshness(),
            fallback_rate: config.fallback_rate,
            refresh_persisted_timestamp: config.refresh_persisted_timestamp,
        }
    }
}

impl Default for RateCacheSettings {
    fn default() -> Self {
        Self::from(&RatesConfig::default())
    }
}

#[derive(Default)]
struct CacheState {
    cached: Option<ExchangeRate>,
    in_flight: Option<SharedFetch>,
}

struct Inner {
    sources: Vec<Arc<dyn RateSource>>,
    persistence: Arc<dyn RatePersistence>,
    settings: RateCacheSettings,
    // Never held across an await.
    state: Mutex<CacheState>,
}

/// Cheap to clone; clones share the same cache.
#[derive(Clone)]
pub struct RateCache {
    inner: Arc<Inner>,
}

impl RateCache {
    pub fn new(
        sources: Vec<Arc<dyn RateSource>>,
        persistence: Arc<dyn RatePersistence>,
        settings: RateCacheSettings,
    ) -> Self {
        Self {
            inner: Arc::new(Inner {
                sources,
                persistence,
                settings,
                state: Mutex::new(CacheState::default()),
            }),
        }
    }

    pub async fn get_rate(&self) -> f64 {
        self.quote().await.rate
    }

    /// Current rate along with where it came from.
    ///
    /// Must be called from within a tokio runtime: fetches run as spawned
    /// tasks so they finish even if every caller goes away.
    pub async fn quote(&self) -> RateQuote {
        let fetch = {
            let mut state = self.inner.lock_state();
            if let Some(rate) = state.cached {
                if rate.is_fresh(Utc::now(), self.inner.settings.freshness) {
                    debug!(rate = rate.rate(), "Rate cache HIT");
                    return RateQuote::from_rate(&rate, RateOrigin::Cached);
                }
            }

            match state.in_flight.clone() {
                Some(fetch) => {
                    debug!("Joining in-flight rate fetch");
                    fetch
                }
                None => {
                    debug!("Rate cache MISS, starting fetch");
                    let fetch = self.start_fetch();
                    state.in_flight = Some(fetch.clone());
                    fetch
                }
            }
        };

        fetch.await
    }

    /// Adopts the persisted rate, if any. Returns whether one was adopted.
    pub async fn load_persisted(&self) -> bool {
        match self.inner.persistence.load().await {
            Some(stored) => {
                self.inner.adopt_persisted(stored, false);
                true
            }
            None => false,
        }
    }

    /// Loads the persisted rate, then refreshes in the background.
    ///
    /// The returned handle may be dropped; the refresh outcome is only logged.
    pub async fn initialize_cache(&self) -> JoinHandle<()> {
        if self.load_persisted().await {
            debug!("Initialized rate cache from storage");
        }

        let cache = self.clone();
        tokio::spawn(async move {
            let quote = cache.quote().await;
            match quote.origin {
                RateOrigin::Live | RateOrigin::Cached => {
                    debug!(rate = quote.rate, origin = %quote.origin, "Background rate refresh done")
                }
                RateOrigin::Persisted | RateOrigin::Fallback => {
                    warn!(rate = quote.rate, origin = %quote.origin, "Background rate refresh failed")
                }
            }
        })
    }

    pub fn cached_rate(&self) -> Option<ExchangeRate> {
        self.inner.lock_state().cached
    }

    pub fn is_fetching(&self) -> bool {
        self.inner.lock_state().in_flight.is_some()
    }

    pub fn settings(&self) -> &RateCacheSettings {
        &self.inner.settings
    }

    // Called with the state lock held; the spawned task only touches the
    // state once that lock is released.
    fn start_fetch(&self) -> SharedFetch {
        let inner = Arc::clone(&self.inner);
        let handle = tokio::spawn(async move {
            let _slot = InFlightSlot(Arc::clone(&inner));
            inner.fetch().await
        });

        let fallback_rate = self.inner.settings.fallback_rate;
        async move {
            match handle.await {
                Ok(quote) => quote,
                Err(e) => {
                    error!(error = %e, "Rate fetch task failed");
                    RateQuote::fallback(fallback_rate)
                }
            }
        }
        .boxed()
        .shared()
    }
}

/// Clears the in-flight slot when the fetch task ends, even by panic.
struct InFlightSlot(Arc<Inner>);

impl Drop for InFlightSlot {
    fn drop(&mut self) {
        self.0.lock_state().in_flight = None;
    }
}

impl Inner {
    fn lock_state(&self) -> MutexGuard<'_, CacheState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Tries every source in order. When all of them fail, the persisted rate
    /// is adopted, except that a cached rate newer than it is kept and
    /// returned instead. With nothing persisted the fallback constant is
    /// returned without being cached.
    async fn fetch(&self) -> RateQuote {
        for source in &self.sources {
            let rate = match source.fetch_rate().await {
                Ok(rate) => rate,
                Err(e) => {
                    warn!(source = source.name(), error = %e, "Rate source failed");
                    continue;
                }
            };

            let rate = match ExchangeRate::new(rate, Utc::now()) {
                Ok(rate) => rate,
                Err(e) => {
                    warn!(source = source.name(), error = %e, "Rate source returned an unusable rate");
                    continue;
                }
            };

            self.lock_state().cached = Some(rate);
            self.persistence.save(&rate).await;
            info!(source = source.name(), rate = rate.rate(), "Fetched live exchange rate");
            return RateQuote::from_rate(&rate, RateOrigin::Live);
        }

        warn!("All rate sources failed, trying persisted rate");
        if let Some(stored) = self.persistence.load().await {
            let restamp = self.settings.refresh_persisted_timestamp;
            let (adopted, origin) = self.adopt_persisted(stored, restamp);
            info!(rate = adopted.rate(), timestamp = %adopted.timestamp(), "Using persisted exchange rate");
            return RateQuote::from_rate(&adopted, origin);
        }

        warn!(
            rate = self.settings.fallback_rate,
            "No persisted rate, using built-in fallback rate"
        );
        RateQuote::fallback(self.settings.fallback_rate)
    }

    /// Makes `stored` the cached rate unless the cache already holds a more
    /// recent one, and returns whichever rate is now cached. `restamp` marks
    /// `stored` as acquired now before comparing.
    fn adopt_persisted(&self, stored: ExchangeRate, restamp: bool) -> (ExchangeRate, RateOrigin) {
        let stored = if restamp {
            stored.restamped(Utc::now())
        } else {
            stored
        };

        let mut state = self.lock_state();
        match state.cached {
            Some(current) if current.timestamp() > stored.timestamp() => {
                debug!("Cached rate is newer than the persisted one, keeping it");
                (current, RateOrigin::Cached)
            }
            _ => {
                state.cached = Some(stored);
                (stored, RateOrigin::Persisted)
            }
        }
    }
}
