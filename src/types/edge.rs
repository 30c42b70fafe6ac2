//! Edge type for the citation graph.

use serde::{Deserialize, Serialize};

use super::node::NodeId;

/// Directed edge in the citation graph.
///
/// Runs from a *predecessor* (the referenced, older item) to a
/// *successor* (the referencing, newer item). Implements `Ord` for
/// canonical ordering: (predecessor, successor).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Edge {
    /// Referenced item (source).
    pub predecessor: NodeId,
    /// Referencing item (target).
    pub successor: NodeId,
}

impl Edge {
    /// Create a new edge from `predecessor` to `successor`.
    pub fn new(predecessor: NodeId, successor: NodeId) -> Self {
        Self {
            predecessor,
            successor,
        }
    }
}

// Canonical ordering: predecessor, then successor
impl PartialOrd for Edge {
    fn partial_cmp(&self, other: &Self) -> Option<std::cmp::Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for Edge {
    fn cmp(&self, other: &Self) -> std::cmp::Ordering {
        self.predecessor
            .cmp(&other.predecessor)
            .then_with(|| self.successor.cmp(&other.successor))
    }
}
