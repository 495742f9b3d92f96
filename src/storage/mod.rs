//! Route store: a thin capability over a networked key-value backend with
//! per-key expiration.
//!
//! Implementations must execute `set_nx` (with readback) and `del_if_same`
//! as single atomic units on the backend. Every call is bounded by the
//! store's timeout; dropping the returned future cancels it.

pub mod memory;
#[cfg(feature = "redis")]
pub mod redis;

pub use memory::InMemoryRouteStore;
#[cfg(feature = "redis")]
pub use self::redis::RedisRouteStore;

use async_trait::async_trait;
use std::future::Future;
use std::time::Duration;
use thiserror::Error;

/// Default bound applied to every store call.
pub const DEFAULT_STORE_TIMEOUT: Duration = Duration::from_secs(2);

/// Expiry used when a requested TTL cannot be represented by the backend.
pub const MAX_TTL: Duration = Duration::from_secs(100 * 365 * 24 * 60 * 60);

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum StoreError {
    #[error("key '{key}' not found")]
    NotFound { key: String },

    #[error("key '{key}' does not hold '{expected}'")]
    ValueMismatch { key: String, expected: String },

    #[error("{operation} on '{key}' timed out after {after:?}")]
    Timeout {
        operation: &'static str,
        key: String,
        after: Duration,
    },

    #[error("{operation} on '{key}' failed: {reason}")]
    Backend {
        operation: &'static str,
        key: String,
        reason: String,
    },
}

pub type StoreResult<T> = std::result::Result<T, StoreError>;

/// Outcome of a conditional create.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SetNxOutcome {
    /// True when this call created the key.
    pub created: bool,
    /// Value held by the key after the call, read in the same atomic unit.
    pub current: String,
}

#[async_trait]
pub trait RouteStore: Send + Sync {
    /// Reads a value. Fails with `NotFound` when absent or expired.
    async fn load(&self, key: &str) -> StoreResult<String>;

    /// Reads a value and resets its TTL in one round trip.
    async fn load_and_expire(&self, key: &str, ttl: Duration) -> StoreResult<String>;

    /// Unconditional upsert.
    async fn set(&self, key: &str, value: &str, ttl: Duration) -> StoreResult<()>;

    /// Swaps in a new value and TTL, returning the previous value if any.
    async fn get_set(&self, key: &str, value: &str, ttl: Duration) -> StoreResult<Option<String>>;

    /// Creates the key only if absent and reports the value now stored.
    async fn set_nx(&self, key: &str, value: &str, ttl: Duration) -> StoreResult<SetNxOutcome>;

    /// Reschedules expiry without touching the value. Absent keys are ignored.
    async fn expire(&self, key: &str, ttl: Duration) -> StoreResult<()>;

    /// Deletes the key iff it still holds `expected`.
    async fn del_if_same(&self, key: &str, expected: &str) -> StoreResult<()>;

    async fn del(&self, key: &str) -> StoreResult<()>;
}

/// Runs one store call under `timeout`, mapping elapsed deadlines to `StoreError::Timeout`.
pub(crate) async fn bounded<T, F>(
    operation: &'static str,
    key: &str,
    timeout: Duration,
    call: F,
) -> StoreResult<T>
where
    F: Future<Output = StoreResult<T>>,
{
    match tokio::time::timeout(timeout, call).await {
        Ok(result) => result,
        Err(_) => Err(StoreError::Timeout {
            operation,
            key: key.to_string(),
            after: timeout,
        }),
    }
}
