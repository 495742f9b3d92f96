use crate::core::Result;
use crate::storage::{RouteStore, SetNxOutcome};
use std::sync::Arc;
use std::time::Duration;

/// Default lifetime of a route entry (7 days).
pub const DEFAULT_ROUTE_TTL: Duration = Duration::from_secs(7 * 24 * 60 * 60);

/// Builds the store key for an object route.
///
/// The braces are literal so sharding-aware backends can hash on a field.
pub fn route_key(table_name: &str, color: &str, oid: i64) -> String {
    format!("r_{}_{{{}}}_{{{}}}", table_name, color, oid)
}

/// Routes of one logical table, keyed by `(color, oid)`.
///
/// Store errors pass through unchanged apart from "not found", which
/// surfaces as `RouterError::RouteNotFound`.
#[derive(Clone)]
pub struct RouteTable {
    store: Arc<dyn RouteStore>,
    name: String,
    ttl: Duration,
}

impl RouteTable {
    pub fn new(name: impl Into<String>, store: Arc<dyn RouteStore>) -> Self {
        Self {
            store,
            name: name.into(),
            ttl: DEFAULT_ROUTE_TTL,
        }
    }

    /// Overrides the TTL applied by writes and sliding reads.
    pub fn with_ttl(mut self, ttl: Duration) -> Self {
        self.ttl = ttl;
        self
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn ttl(&self) -> Duration {
        self.ttl
    }

    pub fn key(&self, color: &str, oid: i64) -> String {
        route_key(&self.name, color, oid)
    }

    pub async fn load(&self, color: &str, oid: i64) -> Result<String> {
        Ok(self.store.load(&self.key(color, oid)).await?)
    }

    /// Reads the route and slides its expiry forward to the full TTL.
    pub async fn load_and_expire(&self, color: &str, oid: i64) -> Result<String> {
        Ok(self
            .store
            .load_and_expire(&self.key(color, oid), self.ttl)
            .await?)
    }

    pub async fn store(&self, color: &str, oid: i64, addr: &str) -> Result<()> {
        Ok(self.store.set(&self.key(color, oid), addr, self.ttl).await?)
    }

    pub async fn get_set(&self, color: &str, oid: i64, addr: &str) -> Result<Option<String>> {
        Ok(self
            .store
            .get_set(&self.key(color, oid), addr, self.ttl)
            .await?)
    }

    pub async fn set_nx(&self, color: &str, oid: i64, addr: &str) -> Result<SetNxOutcome> {
        Ok(self
            .store
            .set_nx(&self.key(color, oid), addr, self.ttl)
            .await?)
    }

    /// Lets the route live for `delay` more, then disappear on its own.
    pub async fn del_delay(&self, color: &str, oid: i64, delay: Duration) -> Result<()> {
        Ok(self.store.expire(&self.key(color, oid), delay).await?)
    }

    /// Deletes the route only if it still points to `addr`.
    pub async fn del_if_same(&self, color: &str, oid: i64, addr: &str) -> Result<()> {
        Ok(self.store.del_if_same(&self.key(color, oid), addr).await?)
    }

    pub async fn del(&self, color: &str, oid: i64) -> Result<()> {
        Ok(self.store.del(&self.key(color, oid)).await?)
    }
}
