//! Node selection: color filtering, sticky routes and smooth weighted round-robin.

pub mod filter;
mod picker;
pub mod wrr;

pub use filter::{ColorFilter, NodeFilter, filter_by_color};
pub use picker::{Balancer, PickResult, PickSource};
pub use wrr::SmoothWeightedRoundRobin;
