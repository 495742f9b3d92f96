// ============================================================================
// Shard Router Library
// ============================================================================

pub mod balancer;
pub mod connection;
pub mod context;
pub mod core;
pub mod routing;
pub mod storage;

// Re-export main types for convenience
pub use balancer::{Balancer, ColorFilter, NodeFilter, PickResult, PickSource};
pub use context::RequestMetadata;
pub use core::{BalancerRole, Node, Result, RouterError};
pub use routing::{RouteTable, route_key};
pub use storage::{InMemoryRouteStore, RouteStore, SetNxOutcome, StoreError};

// Re-export connection API
pub use connection::{
    RoutedConnection,
    config::RouterConfig,
    discovery::{Discovery, StaticDiscovery},
    registry::BalancerRegistry,
};

use std::sync::Arc;

// ============================================================================
// High-level Router API
// ============================================================================

/// Process-wide router: one route store, one balancer registry, one discovery source
///
/// This is the recommended entry point. Build it once at startup and
/// open a [`RoutedConnection`] per backend service.
///
/// # Examples
///
/// ```
/// use shard_router::{BalancerRole, Node, RequestMetadata, Router, RouterConfig};
///
/// # #[tokio::main(flavor = "current_thread")]
/// # async fn main() -> Result<(), Box<dyn std::error::Error>> {
/// let router = Router::open(RouterConfig::new("player").color("us")).await?;
/// router
///     .discovery()
///     .set_nodes("game", vec![Node::new("10.0.0.1:9000", 1.0).with_color("us")])
///     .await?;
///
/// let conn = router.connect("game", BalancerRole::Master)?;
/// let node = conn.select(&RequestMetadata::new().with_oid(42)).await?;
/// assert_eq!(node.address(), "10.0.0.1:9000");
/// # Ok(())
/// # }
/// ```
pub struct Router {
    config: RouterConfig,
    registry: Arc<BalancerRegistry>,
    discovery: StaticDiscovery,
}

impl Router {
    /// Open the configured route store and build the registry
    pub async fn open(config: RouterConfig) -> Result<Self> {
        let store = config.open_store().await?;
        Self::with_store(config, store)
    }

    /// Build a router over an existing store
    pub fn with_store(config: RouterConfig, store: Arc<dyn RouteStore>) -> Result<Self> {
        let registry = Arc::new(BalancerRegistry::from_config(&config, store)?);
        Ok(Self {
            config,
            registry,
            discovery: StaticDiscovery::new(),
        })
    }

    pub fn config(&self) -> &RouterConfig {
        &self.config
    }

    pub fn registry(&self) -> &Arc<BalancerRegistry> {
        &self.registry
    }

    /// Discovery source feeding every connection opened by this router
    pub fn discovery(&self) -> &StaticDiscovery {
        &self.discovery
    }

    pub fn route_table(&self) -> &Arc<RouteTable> {
        self.registry.route_table()
    }

    /// Open a connection to `service` with the shared balancer for `role`
    pub fn connect(&self, service: &str, role: BalancerRole) -> Result<RoutedConnection> {
        RoutedConnection::new(
            service,
            role,
            &self.registry,
            Arc::new(self.discovery.clone()),
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    async fn router_with_nodes() -> Router {
        let router = Router::open(RouterConfig::new("player").color("us"))
            .await
            .unwrap();
        router
            .discovery()
            .set_nodes(
                "game",
                vec![
                    Node::new("us-1", 1.0).with_color("us"),
                    Node::new("eu-1", 1.0).with_color("eu"),
                ],
            )
            .await
            .unwrap();
        router
    }

    #[tokio::test]
    async fn test_router_connect_shares_balancers() {
        let router = router_with_nodes().await;

        let a = router.connect("game", BalancerRole::Master).unwrap();
        let b = router.connect("game", BalancerRole::Master).unwrap();
        assert!(Arc::ptr_eq(a.balancer(), b.balancer()));

        let reader = router.connect("game", BalancerRole::Reader).unwrap();
        assert!(!Arc::ptr_eq(a.balancer(), reader.balancer()));
    }

    #[tokio::test]
    async fn test_router_select_writes_route() {
        let router = router_with_nodes().await;
        let conn = router.connect("game", BalancerRole::Master).unwrap();

        let node = conn
            .select(&RequestMetadata::new().with_oid(9))
            .await
            .unwrap();
        assert_eq!(node.address(), "us-1");
        assert_eq!(router.route_table().load("us", 9).await.unwrap(), "us-1");
    }

    #[tokio::test]
    async fn test_router_rejects_invalid_config() {
        let result = Router::open(RouterConfig::new("")).await;
        assert!(matches!(result, Err(RouterError::ConfigError(_))));
    }
}
