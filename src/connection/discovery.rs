use crate::core::{Node, Result, RouterError};
use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::RwLock;

/// Source of candidate nodes for a service.
#[async_trait]
pub trait Discovery: Send + Sync {
    /// Returns the current instances of `service`.
    async fn nodes(&self, service: &str) -> Result<Vec<Node>>;
}

/// A `Discovery` backed by node lists set in-process.
///
/// Clones share the same services, so a test or an external watcher can
/// update the list a connection is reading from.
#[derive(Clone, Default)]
pub struct StaticDiscovery {
    services: Arc<RwLock<HashMap<String, Vec<Node>>>>,
}

impl StaticDiscovery {
    pub fn new() -> Self {
        Self::default()
    }

    /// Replaces the instances of `service`. Every node must validate.
    pub async fn set_nodes(&self, service: impl Into<String>, nodes: Vec<Node>) -> Result<()> {
        let service = service.into();
        if service.trim().is_empty() {
            return Err(RouterError::DiscoveryError(
                "service name must not be empty".to_string(),
            ));
        }
        for node in &nodes {
            node.validate()?;
        }
        self.services.write().await.insert(service, nodes);
        Ok(())
    }

    pub async fn remove_service(&self, service: &str) -> Option<Vec<Node>> {
        self.services.write().await.remove(service)
    }
}

#[async_trait]
impl Discovery for StaticDiscovery {
    async fn nodes(&self, service: &str) -> Result<Vec<Node>> {
        let services = self.services.read().await;
        services.get(service).cloned().ok_or_else(|| {
            RouterError::DiscoveryError(format!("service '{}' is not registered", service))
        })
    }
}
