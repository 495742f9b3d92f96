use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;
use std::str::FromStr;

use super::{Result, RouterError};

/// Node metadata key carrying the locality tag.
pub const COLOR_METADATA_KEY: &str = "color";

/// A backend instance as reported by service discovery.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Node {
    address: String,
    weight: f64,
    #[serde(default)]
    metadata: HashMap<String, String>,
}

impl Node {
    pub fn new(address: impl Into<String>, weight: f64) -> Self {
        Self {
            address: address.into(),
            weight,
            metadata: HashMap::new(),
        }
    }

    pub fn with_metadata(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.metadata.insert(key.into(), value.into());
        self
    }

    pub fn with_color(self, color: impl Into<String>) -> Self {
        self.with_metadata(COLOR_METADATA_KEY, color)
    }

    pub fn address(&self) -> &str {
        &self.address
    }

    pub fn weight(&self) -> f64 {
        self.weight
    }

    pub fn metadata(&self) -> &HashMap<String, String> {
        &self.metadata
    }

    pub fn color(&self) -> Option<&str> {
        self.metadata.get(COLOR_METADATA_KEY).map(String::as_str)
    }

    pub fn validate(&self) -> Result<()> {
        if self.address.trim().is_empty() {
            return Err(RouterError::DiscoveryError(
                "node address must not be empty".to_string(),
            ));
        }
        if !self.weight.is_finite() || self.weight <= 0.0 {
            return Err(RouterError::DiscoveryError(format!(
                "node '{}' has non-positive weight {}",
                self.address, self.weight
            )));
        }
        Ok(())
    }
}

/// Whether a balancer may create route entries or only consult them.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BalancerRole {
    /// Creates and owns route entries.
    Master,
    /// Reads route entries written by a master.
    Reader,
}

impl BalancerRole {
    pub fn as_str(&self) -> &'static str {
        match self {
            BalancerRole::Master => "master",
            BalancerRole::Reader => "reader",
        }
    }

    pub fn can_write(&self) -> bool {
        matches!(self, BalancerRole::Master)
    }
}

impl fmt::Display for BalancerRole {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for BalancerRole {
    type Err = RouterError;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "master" => Ok(BalancerRole::Master),
            "reader" => Ok(BalancerRole::Reader),
            other => Err(RouterError::ConfigError(format!(
                "unknown balancer role '{}'",
                other
            ))),
        }
    }
}
