//! Object-level route table on top of a [`RouteStore`](crate::storage::RouteStore).

mod table;

pub use table::{DEFAULT_ROUTE_TTL, RouteTable, route_key};
