pub mod error;
pub mod types;

pub use error::{Result, RouterError};
pub use types::{BalancerRole, COLOR_METADATA_KEY, Node};
