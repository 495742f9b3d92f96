#![allow(dead_code)]

use async_trait::async_trait;
use shard_router::storage::StoreResult;
use shard_router::{InMemoryRouteStore, RouteStore, SetNxOutcome};
use std::sync::Mutex;
use std::time::Duration;

const MUTATING: [&str; 6] = ["Set", "GetSet", "SetNx", "Expire", "DelIfSame", "Del"];

/// Records every call before delegating to an in-memory store.
#[derive(Default)]
pub struct RecordingRouteStore {
    pub inner: InMemoryRouteStore,
    calls: Mutex<Vec<&'static str>>,
}

impl RecordingRouteStore {
    pub fn new(inner: InMemoryRouteStore) -> Self {
        Self {
            inner,
            calls: Mutex::new(Vec::new()),
        }
    }

    pub fn calls(&self) -> Vec<&'static str> {
        self.calls.lock().unwrap().clone()
    }

    pub fn mutating_calls(&self) -> Vec<&'static str> {
        self.calls()
            .into_iter()
            .filter(|op| MUTATING.contains(op))
            .collect()
    }

    fn record(&self, op: &'static str) {
        self.calls.lock().unwrap().push(op);
    }
}

#[async_trait]
impl RouteStore for RecordingRouteStore {
    async fn load(&self, key: &str) -> StoreResult<String> {
        self.record("Load");
        self.inner.load(key).await
    }

    async fn load_and_expire(&self, key: &str, ttl: Duration) -> StoreResult<String> {
        self.record("LoadAndExpire");
        self.inner.load_and_expire(key, ttl).await
    }

    async fn set(&self, key: &str, value: &str, ttl: Duration) -> StoreResult<()> {
        self.record("Set");
        self.inner.set(key, value, ttl).await
    }

    async fn get_set(&self, key: &str, value: &str, ttl: Duration) -> StoreResult<Option<String>> {
        self.record("GetSet");
        self.inner.get_set(key, value, ttl).await
    }

    async fn set_nx(&self, key: &str, value: &str, ttl: Duration) -> StoreResult<SetNxOutcome> {
        self.record("SetNx");
        self.inner.set_nx(key, value, ttl).await
    }

    async fn expire(&self, key: &str, ttl: Duration) -> StoreResult<()> {
        self.record("Expire");
        self.inner.expire(key, ttl).await
    }

    async fn del_if_same(&self, key: &str, expected: &str) -> StoreResult<()> {
        self.record("DelIfSame");
        self.inner.del_if_same(key, expected).await
    }

    async fn del(&self, key: &str) -> StoreResult<()> {
        self.record("Del");
        self.inner.del(key).await
    }
}

/// Lets a competing writer create the key between the sticky lookup and the
/// conditional create of the next `set_nx`.
#[derive(Default)]
pub struct InterleavingRouteStore {
    pub inner: InMemoryRouteStore,
    competitor: Mutex<Option<String>>,
}

impl InterleavingRouteStore {
    pub fn with_competitor(address: &str) -> Self {
        Self {
            inner: InMemoryRouteStore::new(),
            competitor: Mutex::new(Some(address.to_string())),
        }
    }
}

#[async_trait]
impl RouteStore for InterleavingRouteStore {
    async fn load(&self, key: &str) -> StoreResult<String> {
        self.inner.load(key).await
    }

    async fn load_and_expire(&self, key: &str, ttl: Duration) -> StoreResult<String> {
        self.inner.load_and_expire(key, ttl).await
    }

    async fn set(&self, key: &str, value: &str, ttl: Duration) -> StoreResult<()> {
        self.inner.set(key, value, ttl).await
    }

    async fn get_set(&self, key: &str, value: &str, ttl: Duration) -> StoreResult<Option<String>> {
        self.inner.get_set(key, value, ttl).await
    }

    async fn set_nx(&self, key: &str, value: &str, ttl: Duration) -> StoreResult<SetNxOutcome> {
        let competitor = self.competitor.lock().unwrap().take();
        if let Some(competitor) = competitor {
            self.inner.set_nx(key, &competitor, ttl).await?;
        }
        self.inner.set_nx(key, value, ttl).await
    }

    async fn expire(&self, key: &str, ttl: Duration) -> StoreResult<()> {
        self.inner.expire(key, ttl).await
    }

    async fn del_if_same(&self, key: &str, expected: &str) -> StoreResult<()> {
        self.inner.del_if_same(key, expected).await
    }

    async fn del(&self, key: &str) -> StoreResult<()> {
        self.inner.del(key).await
    }
}
