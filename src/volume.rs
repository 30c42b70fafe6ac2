//! Volume propagation over the reverse topological order.
//!
//! A node's volume is the weighted attention flowing to it from its
//! descendants: each successor contributes its own weight plus an equal
//! share of its volume, split across its predecessors. Sinks carry zero
//! volume. The graph-wide volume sums `weight + volume` over root nodes
//! and is the normalizer of every KQI score.

use std::collections::BTreeMap;

use crate::store::GraphStore;
use crate::types::NodeId;

/// Cached volumes for every sorted node plus the graph-wide normalizer.
#[derive(Debug, Clone, Default)]
pub struct VolumeTable {
    volumes: BTreeMap<NodeId, f64>,
    graph_volume: f64,
}

impl VolumeTable {
    /// Volume of a node. Nodes absent from the table (never sorted, e.g.
    /// tolerated future-dated nodes) read as 0.
    pub fn volume(&self, id: NodeId) -> f64 {
        self.volumes.get(&id).copied().unwrap_or(0.0)
    }

    /// Total knowledge volume flowing from root nodes through the DAG.
    pub fn graph_volume(&self) -> f64 {
        self.graph_volume
    }

    /// Number of nodes with a computed volume.
    pub fn len(&self) -> usize {
        self.volumes.len()
    }

    /// Whether no volumes have been computed.
    pub fn is_empty(&self) -> bool {
        self.volumes.is_empty()
    }
}

/// Propagate volumes bottom-up along `order` (a topological order of the
/// store) and compute the graph-wide normalizer.
///
/// Dynamic programming over the reverse order: successors are always
/// processed before their predecessors, so each successor's volume is
/// final when read.
pub fn propagate(store: &GraphStore, order: &[NodeId]) -> VolumeTable {
    let mut volumes: BTreeMap<NodeId, f64> = BTreeMap::new();

    for &v in order.iter().rev() {
        let mut volume = 0.0;
        for s in store.successors(v) {
            volume += store.weight(s);
            volume += volumes.get(&s).copied().unwrap_or(0.0) / store.in_degree(s) as f64;
        }
        volumes.insert(v, volume);
    }

    let graph_volume = store
        .nodes()
        .filter(|&v| store.in_degree(v) == 0)
        .map(|v| store.weight(v) + volumes.get(&v).copied().unwrap_or(0.0))
        .sum();

    VolumeTable {
        volumes,
        graph_volume,
    }
}
