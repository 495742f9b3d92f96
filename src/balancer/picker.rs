use super::wrr::SmoothWeightedRoundRobin;
use crate::context::{MD_COLOR, RequestMetadata};
use crate::core::{BalancerRole, Node, Result, RouterError};
use crate::routing::RouteTable;
use std::collections::HashMap;
use std::sync::Arc;
use tracing::{debug, warn};

/// How a pick arrived at its node.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PickSource {
    /// An existing route pointed at a live candidate.
    Sticky,
    /// Weighted selection by a reader; nothing was written.
    Selected,
    /// Weighted selection by a master that created the route.
    Assigned,
    /// Another writer created the route first; its node was used instead.
    RaceLost { discarded: String },
}

/// The outcome of a pick, with the routing attributes it used.
#[derive(Debug, Clone)]
pub struct PickResult {
    pub node: Node,
    pub source: PickSource,
    pub oid: i64,
    pub color: String,
}

/// Sticky, weighted node selection for one backend service.
///
/// Share one instance per (role, service) between all request tasks; the
/// only in-process state is the weighted round-robin counters. Balancers in
/// other processes coordinate with this one solely through the route table.
pub struct Balancer {
    role: BalancerRole,
    wrr: SmoothWeightedRoundRobin,
    route_table: Arc<RouteTable>,
    default_color: Option<String>,
}

impl Balancer {
    pub fn new(role: BalancerRole, route_table: Arc<RouteTable>) -> Self {
        Self {
            role,
            wrr: SmoothWeightedRoundRobin::new(),
            route_table,
            default_color: None,
        }
    }

    /// Color used when a request does not carry one.
    pub fn with_default_color(mut self, color: impl Into<String>) -> Self {
        let color = color.into();
        self.default_color = (!color.trim().is_empty()).then_some(color);
        self
    }

    pub fn role(&self) -> BalancerRole {
        self.role
    }

    pub fn route_table(&self) -> &Arc<RouteTable> {
        &self.route_table
    }

    pub fn current_weights(&self) -> Result<HashMap<String, f64>> {
        self.wrr.snapshot()
    }

    /// Picks the node that should serve the request's object.
    pub async fn pick(&self, md: &RequestMetadata, nodes: &[Node]) -> Result<Node> {
        Ok(self.pick_detailed(md, nodes).await?.node)
    }

    /// Picks a node and reports how it was chosen.
    ///
    /// 1. A live route whose address is among `nodes` wins outright and has
    ///    its TTL slid forward.
    /// 2. Otherwise weighted round-robin chooses a node.
    /// 3. A master then tries to record it with a conditional create; if
    ///    another writer got there first, the stored address wins.
    pub async fn pick_detailed(&self, md: &RequestMetadata, nodes: &[Node]) -> Result<PickResult> {
        if nodes.is_empty() {
            return Err(RouterError::NoAvailable);
        }
        let (oid, color) = self.routing_attributes(md)?;

        match self.route_table.load_and_expire(&color, oid).await {
            Ok(addr) => {
                if let Some(node) = find_node(nodes, &addr) {
                    debug!(oid, color = %color, addr = %addr, "sticky route hit");
                    return Ok(PickResult {
                        node: node.clone(),
                        source: PickSource::Sticky,
                        oid,
                        color,
                    });
                }
                debug!(oid, color = %color, addr = %addr, "sticky route points outside candidates");
            }
            Err(err) if err.is_not_found() => {}
            Err(err) => return Err(err),
        }

        let selected = self.wrr.next(nodes)?;

        if !self.role.can_write() {
            return Ok(PickResult {
                node: selected.clone(),
                source: PickSource::Selected,
                oid,
                color,
            });
        }

        let outcome = self
            .route_table
            .set_nx(&color, oid, selected.address())
            .await?;
        if outcome.created {
            debug!(oid, color = %color, addr = %selected.address(), "route assigned");
            return Ok(PickResult {
                node: selected.clone(),
                source: PickSource::Assigned,
                oid,
                color,
            });
        }

        warn!(
            oid,
            color = %color,
            stored = %outcome.current,
            discarded = %selected.address(),
            "route table was set by another connection"
        );
        match find_node(nodes, &outcome.current) {
            Some(node) => Ok(PickResult {
                node: node.clone(),
                source: PickSource::RaceLost {
                    discarded: selected.address().to_string(),
                },
                oid,
                color,
            }),
            None => Err(RouterError::InconsistentRoute {
                oid,
                color,
                address: outcome.current,
            }),
        }
    }

    fn routing_attributes(&self, md: &RequestMetadata) -> Result<(i64, String)> {
        let oid = md.oid()?;
        let color = md
            .color()
            .or(self.default_color.as_deref())
            .ok_or_else(|| RouterError::MissingRoutingAttributes(MD_COLOR.to_string()))?;
        Ok((oid, color.to_string()))
    }
}

fn find_node<'a>(nodes: &'a [Node], addr: &str) -> Option<&'a Node> {
    nodes.iter().find(|node| node.address() == addr)
}
