use super::{DEFAULT_STORE_TIMEOUT, MAX_TTL, RouteStore, SetNxOutcome, StoreError, StoreResult, bounded};
use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Mutex;
use tokio::time::Instant;

#[derive(Debug, Clone)]
struct StoredRoute {
    value: String,
    expires_at: Instant,
}

impl StoredRoute {
    fn new(value: &str, ttl: Duration, now: Instant) -> Self {
        Self {
            value: value.to_string(),
            expires_at: deadline(now, ttl),
        }
    }
}

fn deadline(now: Instant, ttl: Duration) -> Instant {
    now.checked_add(ttl).unwrap_or_else(|| now + MAX_TTL)
}

/// An in-process `RouteStore`.
///
/// Clones share the same entries, so several balancers built on clones
/// behave like independent callers of one backend. Expiry is lazy and uses
/// the tokio clock, which lets paused-time tests drive TTLs. An optional
/// per-call latency simulates the network round trip.
#[derive(Clone)]
pub struct InMemoryRouteStore {
    entries: Arc<Mutex<HashMap<String, StoredRoute>>>,
    timeout: Duration,
    latency: Option<Duration>,
}

impl Default for InMemoryRouteStore {
    fn default() -> Self {
        Self {
            entries: Arc::new(Mutex::new(HashMap::new())),
            timeout: DEFAULT_STORE_TIMEOUT,
            latency: None,
        }
    }
}

impl InMemoryRouteStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the per-call timeout.
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Delays every call by `latency` before it touches the entries.
    pub fn with_latency(mut self, latency: Duration) -> Self {
        self.latency = Some(latency);
        self
    }

    pub fn timeout(&self) -> Duration {
        self.timeout
    }

    /// Remaining time to live of a live key.
    pub async fn ttl(&self, key: &str) -> Option<Duration> {
        let now = Instant::now();
        let entries = self.entries.lock().await;
        entries
            .get(key)
            .filter(|entry| entry.expires_at > now)
            .map(|entry| entry.expires_at - now)
    }

    /// Number of live keys.
    pub async fn len(&self) -> usize {
        let now = Instant::now();
        let entries = self.entries.lock().await;
        entries.values().filter(|entry| entry.expires_at > now).count()
    }

    pub async fn is_empty(&self) -> bool {
        self.len().await == 0
    }

    /// Drops expired keys, returning how many were removed.
    pub async fn purge_expired(&self) -> usize {
        let now = Instant::now();
        let mut entries = self.entries.lock().await;
        let before = entries.len();
        entries.retain(|_, entry| entry.expires_at > now);
        before - entries.len()
    }

    async fn simulate_round_trip(&self) {
        if let Some(latency) = self.latency {
            tokio::time::sleep(latency).await;
        }
    }

    fn live_entry<'a>(
        entries: &'a mut HashMap<String, StoredRoute>,
        key: &str,
        now: Instant,
    ) -> Option<&'a mut StoredRoute> {
        if entries.get(key).is_some_and(|entry| entry.expires_at <= now) {
            entries.remove(key);
            return None;
        }
        entries.get_mut(key)
    }

    fn not_found(key: &str) -> StoreError {
        StoreError::NotFound {
            key: key.to_string(),
        }
    }
}

#[async_trait]
impl RouteStore for InMemoryRouteStore {
    async fn load(&self, key: &str) -> StoreResult<String> {
        bounded("Load", key, self.timeout, async {
            self.simulate_round_trip().await;
            let mut entries = self.entries.lock().await;
            Self::live_entry(&mut entries, key, Instant::now())
                .map(|entry| entry.value.clone())
                .ok_or_else(|| Self::not_found(key))
        })
        .await
    }

    async fn load_and_expire(&self, key: &str, ttl: Duration) -> StoreResult<String> {
        bounded("LoadAndExpire", key, self.timeout, async {
            self.simulate_round_trip().await;
            let now = Instant::now();
            let mut entries = self.entries.lock().await;
            let entry =
                Self::live_entry(&mut entries, key, now).ok_or_else(|| Self::not_found(key))?;
            entry.expires_at = deadline(now, ttl);
            Ok(entry.value.clone())
        })
        .await
    }

    async fn set(&self, key: &str, value: &str, ttl: Duration) -> StoreResult<()> {
        bounded("Set", key, self.timeout, async {
            self.simulate_round_trip().await;
            let mut entries = self.entries.lock().await;
            entries.insert(key.to_string(), StoredRoute::new(value, ttl, Instant::now()));
            Ok(())
        })
        .await
    }

    async fn get_set(&self, key: &str, value: &str, ttl: Duration) -> StoreResult<Option<String>> {
        bounded("GetSet", key, self.timeout, async {
            self.simulate_round_trip().await;
            let now = Instant::now();
            let mut entries = self.entries.lock().await;
            let previous = Self::live_entry(&mut entries, key, now).map(|entry| entry.value.clone());
            entries.insert(key.to_string(), StoredRoute::new(value, ttl, now));
            Ok(previous)
        })
        .await
    }

    async fn set_nx(&self, key: &str, value: &str, ttl: Duration) -> StoreResult<SetNxOutcome> {
        bounded("SetNx", key, self.timeout, async {
            self.simulate_round_trip().await;
            let now = Instant::now();
            let mut entries = self.entries.lock().await;
            if let Some(existing) = Self::live_entry(&mut entries, key, now) {
                return Ok(SetNxOutcome {
                    created: false,
                    current: existing.value.clone(),
                });
            }
            entries.insert(key.to_string(), StoredRoute::new(value, ttl, now));
            Ok(SetNxOutcome {
                created: true,
                current: value.to_string(),
            })
        })
        .await
    }

    async fn expire(&self, key: &str, ttl: Duration) -> StoreResult<()> {
        bounded("Expire", key, self.timeout, async {
            self.simulate_round_trip().await;
            let now = Instant::now();
            let mut entries = self.entries.lock().await;
            if let Some(entry) = Self::live_entry(&mut entries, key, now) {
                entry.expires_at = deadline(now, ttl);
            }
            Ok(())
        })
        .await
    }

    async fn del_if_same(&self, key: &str, expected: &str) -> StoreResult<()> {
        bounded("DelIfSame", key, self.timeout, async {
            self.simulate_round_trip().await;
            let mut entries = self.entries.lock().await;
            let entry =
                Self::live_entry(&mut entries, key, Instant::now()).ok_or_else(|| Self::not_found(key))?;
            if entry.value != expected {
                return Err(StoreError::ValueMismatch {
                    key: key.to_string(),
                    expected: expected.to_string(),
                });
            }
            entries.remove(key);
            Ok(())
        })
        .await
    }

    async fn del(&self, key: &str) -> StoreResult<()> {
        bounded("Del", key, self.timeout, async {
            self.simulate_round_trip().await;
            self.entries.lock().await.remove(key);
            Ok(())
        })
        .await
    }
}
