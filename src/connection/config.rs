use crate::core::{Result, RouterError};
use crate::routing::{DEFAULT_ROUTE_TTL, RouteTable};
use crate::storage::{DEFAULT_STORE_TIMEOUT, InMemoryRouteStore, RouteStore};
use std::sync::Arc;
use std::time::Duration;

/// Longest route lifetime a configuration may ask for (one year).
pub const MAX_ROUTE_TTL: Duration = Duration::from_secs(365 * 24 * 60 * 60);

/// Longest bound a configuration may put on one store call.
pub const MAX_STORE_TIMEOUT: Duration = Duration::from_secs(60);

/// Router configuration
///
/// Process-level settings shared by every balancer built from one registry.
#[derive(Debug, Clone)]
pub struct RouterConfig {
    /// Route table name, the `<tableName>` part of every route key
    pub table_name: String,

    /// Locality of this process, used when a request carries no color
    pub color: Option<String>,

    /// Lifetime of a route entry, slid forward on every sticky hit
    pub route_ttl: Duration,

    /// Bound on each route store call
    pub store_timeout: Duration,

    /// Redis URL; the in-memory store is used when unset
    pub store_url: Option<String>,
}

impl RouterConfig {
    /// Create a configuration for `table_name` with default TTL and timeout
    pub fn new(table_name: &str) -> Self {
        Self {
            table_name: table_name.to_string(),
            color: None,
            route_ttl: DEFAULT_ROUTE_TTL,
            store_timeout: DEFAULT_STORE_TIMEOUT,
            store_url: None,
        }
    }

    /// Set the process color
    pub fn color(mut self, color: &str) -> Self {
        self.color = Some(color.to_string());
        self
    }

    /// Set the route TTL
    pub fn route_ttl(mut self, ttl: Duration) -> Self {
        self.route_ttl = ttl;
        self
    }

    /// Set the store timeout
    pub fn store_timeout(mut self, timeout: Duration) -> Self {
        self.store_timeout = timeout;
        self
    }

    /// Set the Redis URL
    pub fn store_url(mut self, url: &str) -> Self {
        self.store_url = Some(url.to_string());
        self
    }

    /// Parse from a router URL
    ///
    /// Format: "shardroute://table@color?ttl=<secs>&timeout_ms=<ms>"
    /// (`@color` and the query are optional)
    ///
    /// # Examples
    ///
    /// ```
    /// # use shard_router::RouterConfig;
    /// let config = RouterConfig::from_url("shardroute://player@us?ttl=3600").unwrap();
    /// assert_eq!(config.table_name, "player");
    /// assert_eq!(config.color.as_deref(), Some("us"));
    /// ```
    pub fn from_url(url: &str) -> std::result::Result<Self, String> {
        let rest = url
            .strip_prefix("shardroute://")
            .ok_or_else(|| "URL must start with 'shardroute://'".to_string())?;

        let (target, query) = match rest.split_once('?') {
            Some((target, query)) => (target, Some(query)),
            None => (rest, None),
        };

        let mut config = match target.split_once('@') {
            Some((table, color)) => Self::new(table).color(color),
            None => Self::new(target),
        };

        for pair in query.unwrap_or_default().split('&').filter(|p| !p.is_empty()) {
            let (key, value) = pair
                .split_once('=')
                .ok_or_else(|| format!("Invalid query parameter '{}'", pair))?;
            let number: u64 = value
                .parse()
                .map_err(|_| format!("Parameter '{}' must be an integer", key))?;
            match key {
                "ttl" => config.route_ttl = Duration::from_secs(number),
                "timeout_ms" => config.store_timeout = Duration::from_millis(number),
                other => return Err(format!("Unknown parameter '{}'", other)),
            }
        }

        config.validate()?;
        Ok(config)
    }

    /// Validate configuration
    pub fn validate(&self) -> std::result::Result<(), String> {
        if self.table_name.trim().is_empty() {
            return Err("table_name cannot be empty".to_string());
        }

        if self.table_name.contains(['{', '}']) {
            return Err("table_name cannot contain braces".to_string());
        }

        if self.color.as_deref().is_some_and(|color| color.trim().is_empty()) {
            return Err("color cannot be blank".to_string());
        }

        if self.route_ttl.is_zero() {
            return Err("route_ttl must be greater than 0".to_string());
        }

        if self.route_ttl > MAX_ROUTE_TTL {
            return Err(format!("route_ttl cannot exceed {:?}", MAX_ROUTE_TTL));
        }

        if self.store_timeout.is_zero() {
            return Err("store_timeout must be greater than 0".to_string());
        }

        if self.store_timeout > MAX_STORE_TIMEOUT {
            return Err(format!("store_timeout cannot exceed {:?}", MAX_STORE_TIMEOUT));
        }

        Ok(())
    }

    /// Open the configured route store
    pub async fn open_store(&self) -> Result<Arc<dyn RouteStore>> {
        self.validate().map_err(RouterError::ConfigError)?;
        match self.store_url.as_deref() {
            None => Ok(Arc::new(
                InMemoryRouteStore::new().with_timeout(self.store_timeout),
            )),
            #[cfg(feature = "redis")]
            Some(url) => {
                let store = crate::storage::RedisRouteStore::connect(url).await?;
                Ok(Arc::new(store.with_timeout(self.store_timeout)))
            }
            #[cfg(not(feature = "redis"))]
            Some(url) => Err(RouterError::ConfigError(format!(
                "store_url '{}' requires the `redis` feature",
                url
            ))),
        }
    }

    /// Build the route table over `store`
    pub fn route_table(&self, store: Arc<dyn RouteStore>) -> RouteTable {
        RouteTable::new(self.table_name.as_str(), store).with_ttl(self.route_ttl)
    }
}
