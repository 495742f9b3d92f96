use super::config::RouterConfig;
use crate::balancer::Balancer;
use crate::core::{BalancerRole, Result, RouterError};
use crate::routing::RouteTable;
use crate::storage::RouteStore;
use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use tracing::info;

/// Owns the balancers of a process: one per (service, role).
///
/// Construct it once at startup and hand it to every connection.
pub struct BalancerRegistry {
    route_table: Arc<RouteTable>,
    default_color: Option<String>,
    balancers: Mutex<HashMap<(String, BalancerRole), Arc<Balancer>>>,
}

impl BalancerRegistry {
    pub fn new(route_table: Arc<RouteTable>, default_color: Option<String>) -> Self {
        Self {
            route_table,
            default_color,
            balancers: Mutex::new(HashMap::new()),
        }
    }

    /// Builds a registry whose balancers share a route table over `store`.
    pub fn from_config(config: &RouterConfig, store: Arc<dyn RouteStore>) -> Result<Self> {
        config.validate().map_err(RouterError::ConfigError)?;
        Ok(Self::new(
            Arc::new(config.route_table(store)),
            config.color.clone(),
        ))
    }

    pub fn route_table(&self) -> &Arc<RouteTable> {
        &self.route_table
    }

    pub fn default_color(&self) -> Option<&str> {
        self.default_color.as_deref()
    }

    /// Returns the balancer for `(service, role)`, creating it on first use.
    pub fn get_or_register(&self, service: &str, role: BalancerRole) -> Result<Arc<Balancer>> {
        let mut balancers = self.balancers.lock()?;
        let balancer = balancers
            .entry((service.to_string(), role))
            .or_insert_with(|| {
                info!(service, role = %role, table = %self.route_table.name(), "balancer registered");
                let balancer = Balancer::new(role, Arc::clone(&self.route_table));
                Arc::new(match self.default_color.as_deref() {
                    Some(color) => balancer.with_default_color(color),
                    None => balancer,
                })
            });
        Ok(Arc::clone(balancer))
    }

    pub fn is_registered(&self, service: &str, role: BalancerRole) -> Result<bool> {
        let balancers = self.balancers.lock()?;
        Ok(balancers.contains_key(&(service.to_string(), role)))
    }

    /// Registered `(service, role)` pairs, sorted.
    pub fn registered(&self) -> Result<Vec<(String, BalancerRole)>> {
        let balancers = self.balancers.lock()?;
        let mut keys: Vec<_> = balancers.keys().cloned().collect();
        keys.sort_by(|a, b| a.0.cmp(&b.0).then_with(|| a.1.as_str().cmp(b.1.as_str())));
        Ok(keys)
    }
}
