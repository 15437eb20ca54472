//! Typed identifiers shared by planner and scheduling components.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Stable split identity (the split's path or URI).
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SplitId(
    /// Raw path/URI value.
    pub String,
);

impl SplitId {
    /// Creates a split id from any string-like path.
    pub fn new(path: impl Into<String>) -> Self {
        Self(path.into())
    }

    /// Borrow the raw path.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for SplitId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for SplitId {
    fn from(value: &str) -> Self {
        Self(value.to_string())
    }
}

/// Stable host identifier used for locality hints and pre-warm routing.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct HostId(
    /// Raw host name or executor address.
    pub String,
);

impl HostId {
    /// Creates a host id from any string-like name.
    pub fn new(host: impl Into<String>) -> Self {
        Self(host.into())
    }

    /// Borrow the raw host name.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for HostId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for HostId {
    fn from(value: &str) -> Self {
        Self(value.to_string())
    }
}
