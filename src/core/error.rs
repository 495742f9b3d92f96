use crate::storage::StoreError;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum RouterError {
    #[error("Missing routing attribute: {0}")]
    MissingRoutingAttributes(String),

    #[error("Invalid routing attribute: {0}")]
    InvalidRoutingAttributes(String),

    #[error("No available node")]
    NoAvailable,

    #[error("Route not found for key '{0}'")]
    RouteNotFound(String),

    #[error("Route store {operation} failed for key '{key}': {reason}")]
    StoreOperationFailed {
        operation: &'static str,
        key: String,
        reason: String,
    },

    #[error("Route '{key}' no longer holds '{expected}'")]
    ValueMismatch { key: String, expected: String },

    #[error(
        "Route for oid={oid} color={color} points to '{address}' which is not a live candidate"
    )]
    InconsistentRoute {
        oid: i64,
        color: String,
        address: String,
    },

    #[error("Configuration error: {0}")]
    ConfigError(String),

    #[error("Discovery error: {0}")]
    DiscoveryError(String),

    #[error("Lock error: {0}")]
    LockError(String),
}

impl RouterError {
    /// True for `RouteNotFound`, which callers usually treat as "no route yet".
    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::RouteNotFound(_))
    }
}

pub type Result<T> = std::result::Result<T, RouterError>;

impl<T> From<std::sync::PoisonError<T>> for RouterError {
    fn from(err: std::sync::PoisonError<T>) -> Self {
        Self::LockError(err.to_string())
    }
}

impl From<StoreError> for RouterError {
    fn from(err: StoreError) -> Self {
        match err {
            StoreError::NotFound { key } => Self::RouteNotFound(key),
            StoreError::ValueMismatch { key, expected } => Self::ValueMismatch { key, expected },
            StoreError::Timeout {
                operation,
                key,
                after,
            } => Self::StoreOperationFailed {
                operation,
                key,
                reason: format!("timed out after {:?}", after),
            },
            StoreError::Backend {
                operation,
                key,
                reason,
            } => Self::StoreOperationFailed {
                operation,
                key,
                reason,
            },
        }
    }
}
