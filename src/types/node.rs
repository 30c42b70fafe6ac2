//! Node identity and per-node record types.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Unique identifier for a node in the citation graph.
///
/// Wraps a `u64` and implements `Ord` for deterministic ordering.
/// The value `0` is reserved for the super-root and must never be used
/// for a real item (see [`NodeId::SUPER_ROOT`]).
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct NodeId(u64);

impl NodeId {
    /// Reserved id representing the universe outside the graph.
    ///
    /// It is never an addressable node; requesting a score for it is an
    /// error.
    pub const SUPER_ROOT: NodeId = NodeId(0);

    /// Create a new NodeId from a raw value.
    pub const fn new(raw: u64) -> Self {
        Self(raw)
    }

    /// Get the raw value.
    pub const fn as_u64(&self) -> u64 {
        self.0
    }

    /// Whether this is the reserved super-root id.
    pub const fn is_super_root(&self) -> bool {
        self.0 == Self::SUPER_ROOT.0
    }
}

impl fmt::Display for NodeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<u64> for NodeId {
    fn from(raw: u64) -> Self {
        Self(raw)
    }
}

/// Per-node data carried by the store.
///
/// Derived quantities (weight, volume) are not stored here: weight is a
/// pure function of the date and the graph configuration, and volumes live
/// in the engine's derived cache.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct NodeRecord {
    /// Calendar date the item was created, at day granularity.
    pub creation_date: NaiveDate,
}

impl NodeRecord {
    /// Create a record for an item created on `creation_date`.
    pub fn new(creation_date: NaiveDate) -> Self {
        Self { creation_date }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_node_id_ordering() {
        let id1 = NodeId::new(1);
        let id2 = NodeId::new(2);
        assert!(id1 < id2);
        assert_eq!(NodeId::from(1), id1);
    }

    #[test]
    fn test_super_root_is_zero() {
        assert!(NodeId::new(0).is_super_root());
        assert!(!NodeId::new(1).is_super_root());
        assert_eq!(NodeId::SUPER_ROOT.as_u64(), 0);
    }

    #[test]
    fn test_display() {
        assert_eq!(NodeId::new(42).to_string(), "42");
    }
}
