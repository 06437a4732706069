//! Read-through parameter cache.

use crate::source::{ParameterSource, StaticParameters};
use chrono::{DateTime, Utc};
use quotagate_core::Clock;
#[cfg(test)]
use quotagate_core::ManualClock;
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::RwLock;

/// Default time a cached parameter value stays fresh.
pub const DEFAULT_CACHE_TTL: Duration = Duration::from_secs(60);

#[derive(Debug, Clone)]
struct CacheEntry {
    value: String,
    fetched_at: DateTime<Utc>,
}

/// Read-through cache over a [`ParameterSource`].
///
/// Each entry remembers when it was fetched; a lookup past the TTL refetches.
/// A fetch failure or an unset parameter resolves to the caller-supplied
/// default (with a warning for failures), and failures are not cached, so a
/// recovering backend is picked up on the next lookup.
pub struct CachedParameters {
    source: Arc<dyn ParameterSource>,
    clock: Arc<dyn Clock>,
    ttl: Duration,
    cache: RwLock<HashMap<String, CacheEntry>>,
}

impl CachedParameters {
    /// Creates a cache with the default 60 s TTL.
    pub fn new(source: Arc<dyn ParameterSource>, clock: Arc<dyn Clock>) -> Self {
        Self::with_ttl(source, clock, DEFAULT_CACHE_TTL)
    }

    /// Creates a cache with an explicit TTL.
    pub fn with_ttl(
        source: Arc<dyn ParameterSource>,
        clock: Arc<dyn Clock>,
        ttl: Duration,
    ) -> Self {
        Self {
            source,
            clock,
            ttl,
            cache: RwLock::new(HashMap::new()),
        }
    }

    /// Cache wired to a fresh in-memory source; for tests.
    pub fn in_memory(clock: Arc<dyn Clock>) -> (Arc<Self>, Arc<StaticParameters>) {
        let source = StaticParameters::new();
        let cache = Arc::new(Self::new(Arc::clone(&source) as Arc<dyn ParameterSource>, clock));
        (cache, source)
    }

    fn fresh(&self, entry: &CacheEntry) -> bool {
        let age = self.clock.now() - entry.fetched_at;
        age.to_std().map(|age| age < self.ttl).unwrap_or(true)
    }

    /// Looks up a string parameter, falling back to `default` when the
    /// parameter is unset or the backend fails.
    pub async fn get_str(&self, name: &str, default: &str) -> String {
        {
            let cache = self.cache.read().await;
            if let Some(entry) = cache.get(name) {
                if self.fresh(entry) {
                    return entry.value.clone();
                }
            }
        }

        match self.source.fetch(name).await {
            Ok(Some(value)) => {
                let mut cache = self.cache.write().await;
                cache.insert(
                    name.to_string(),
                    CacheEntry {
                        value: value.clone(),
                        fetched_at: self.clock.now(),
                    },
                );
                tracing::debug!(parameter = name, %value, "loaded parameter");
                value
            }
            Ok(None) => {
                tracing::debug!(parameter = name, default, "parameter not set, using default");
                default.to_string()
            }
            Err(error) => {
                tracing::warn!(parameter = name, %error, default, "parameter fetch failed, using default");
                default.to_string()
            }
        }
    }

    /// Looks up an integer parameter. An unparsable stored value falls back
    /// to `default` with a warning.
    pub async fn get_u64(&self, name: &str, default: u64) -> u64 {
        let raw = self.get_str(name, &default.to_string()).await;
        match raw.trim().parse() {
            Ok(value) => value,
            Err(_) => {
                tracing::warn!(parameter = name, value = %raw, default, "invalid integer parameter, using default");
                default
            }
        }
    }

    /// Looks up a boolean parameter. Accepts `true/1/yes/on` (case-insensitive)
    /// as true; anything else is false.
    pub async fn get_bool(&self, name: &str, default: bool) -> bool {
        let raw = self.get_str(name, if default { "true" } else { "false" }).await;
        matches!(raw.trim().to_ascii_lowercase().as_str(), "true" | "1" | "yes" | "on")
    }
}

/// Manual-clock cache plus its source, for tests.
#[cfg(test)]
pub(crate) fn manual_cache() -> (Arc<CachedParameters>, Arc<StaticParameters>, ManualClock) {
    let clock = ManualClock::new();
    let (cache, source) = CachedParameters::in_memory(Arc::new(clock.clone()));
    (cache, source, clock)
}
