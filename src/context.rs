//! Request attributes carried alongside each call.

use crate::core::{Result, RouterError};
use std::collections::HashMap;

/// Object id used to pick a sticky route.
pub const MD_OID: &str = "x-md-global-oid";
/// Locality tag selecting a node group and a route namespace.
pub const MD_COLOR: &str = "x-md-global-color";
/// Player id.
pub const MD_UID: &str = "x-md-global-uid";
/// Server id in multi-server deployments, 0 otherwise.
pub const MD_SID: &str = "x-md-global-sid";

/// String metadata attached to an outgoing request.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RequestMetadata {
    values: HashMap<String, String>,
}

impl RequestMetadata {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, key: impl Into<String>, value: impl Into<String>) {
        self.values.insert(key.into().to_ascii_lowercase(), value.into());
    }

    /// Keys are case-insensitive, as in HTTP/2 metadata.
    pub fn get(&self, key: &str) -> Option<&str> {
        self.values
            .get(&key.to_ascii_lowercase())
            .map(String::as_str)
    }

    pub fn with(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.insert(key, value);
        self
    }

    pub fn with_oid(self, oid: i64) -> Self {
        self.with(MD_OID, oid.to_string())
    }

    pub fn with_color(self, color: impl Into<String>) -> Self {
        self.with(MD_COLOR, color)
    }

    pub fn with_uid(self, uid: i64) -> Self {
        self.with(MD_UID, uid.to_string())
    }

    pub fn with_sid(self, sid: i64) -> Self {
        self.with(MD_SID, sid.to_string())
    }

    pub fn oid(&self) -> Result<i64> {
        self.parse_id(MD_OID)
    }

    pub fn uid(&self) -> Result<i64> {
        self.parse_id(MD_UID)
    }

    pub fn sid(&self) -> Result<i64> {
        self.parse_id(MD_SID)
    }

    /// Request color, ignoring blank values.
    pub fn color(&self) -> Option<&str> {
        self.get(MD_COLOR).filter(|color| !color.trim().is_empty())
    }

    fn parse_id(&self, key: &str) -> Result<i64> {
        let raw = self
            .get(key)
            .ok_or_else(|| RouterError::MissingRoutingAttributes(key.to_string()))?;
        raw.trim().parse::<i64>().map_err(|err| {
            RouterError::InvalidRoutingAttributes(format!(
                "{} must be int64, got '{}': {}",
                key, raw, err
            ))
        })
    }
}

impl<K: Into<String>, V: Into<String>> FromIterator<(K, V)> for RequestMetadata {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        let mut md = Self::new();
        for (key, value) in iter {
            md.insert(key, value);
        }
        md
    }
}
