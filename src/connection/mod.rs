//! Wires discovery, node filters and a balancer into a routed connection.

pub mod config;
pub mod discovery;
pub mod registry;

use crate::balancer::{Balancer, ColorFilter, NodeFilter, PickResult};
use crate::context::RequestMetadata;
use crate::core::{BalancerRole, Node, Result};
use discovery::Discovery;
use registry::BalancerRegistry;
use std::sync::Arc;

/// A client-side view of one backend service.
///
/// Every selection pulls the current nodes from discovery, runs them
/// through the filters in order (the color filter first) and lets the
/// balancer choose. The caller then dials the returned node's address.
pub struct RoutedConnection {
    service_name: String,
    balancer: Arc<Balancer>,
    discovery: Arc<dyn Discovery>,
    filters: Vec<Arc<dyn NodeFilter>>,
}

impl RoutedConnection {
    /// Connects to `service_name` with the registry's balancer for `role`.
    pub fn new(
        service_name: impl Into<String>,
        role: BalancerRole,
        registry: &BalancerRegistry,
        discovery: Arc<dyn Discovery>,
    ) -> Result<Self> {
        let service_name = service_name.into();
        let balancer = registry.get_or_register(&service_name, role)?;
        let color_filter = ColorFilter::new(registry.default_color().unwrap_or_default());
        Ok(Self {
            service_name,
            balancer,
            discovery,
            filters: vec![Arc::new(color_filter)],
        })
    }

    /// Appends a filter that runs after the existing ones.
    pub fn with_filter(mut self, filter: Arc<dyn NodeFilter>) -> Self {
        self.filters.push(filter);
        self
    }

    pub fn service_name(&self) -> &str {
        &self.service_name
    }

    pub fn balancer(&self) -> &Arc<Balancer> {
        &self.balancer
    }

    /// Chooses the node for this request.
    pub async fn select(&self, md: &RequestMetadata) -> Result<Node> {
        Ok(self.select_detailed(md).await?.node)
    }

    pub async fn select_detailed(&self, md: &RequestMetadata) -> Result<PickResult> {
        let mut nodes = self.discovery.nodes(&self.service_name).await?;
        for filter in &self.filters {
            nodes = filter.filter(md, nodes);
        }
        self.balancer.pick_detailed(md, &nodes).await
    }
}
