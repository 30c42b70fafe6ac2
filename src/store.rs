//! Mutable directed-graph store for citation data.
//!
//! The store keeps the successor relation twice — as predecessor sets and
//! as successor sets — so both neighbor directions are O(log n) lookups.
//! The two views are exact inverses of each other after every mutation;
//! all edge changes go through [`GraphStore::insert_edge`] and
//! [`GraphStore::remove_edge`] so no caller can desynchronize them.
//!
//! Node existence is defined by the node-record map, not by the adjacency
//! maps: a node may reference parents that were never added (or were
//! removed later). Such dangling edges stay in the adjacency views until
//! cycle resolution prunes them.
//!
//! Uses `BTreeMap`/`BTreeSet` for deterministic iteration order.

use std::collections::{BTreeMap, BTreeSet};

use chrono::{NaiveDate, Utc};

use crate::types::{Edge, NodeId, NodeRecord};

/// Days per decade, the unit of the decay exponent.
const DAYS_PER_DECADE: f64 = 3650.0;

/// Error type for store mutations.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum GraphError {
    /// A node with this id already exists.
    #[error("node already exists: {0}")]
    DuplicateNode(NodeId),
    /// No node with this id exists.
    #[error("node not found: {0}")]
    MissingNode(NodeId),
}

/// Adjacency-list directed graph keyed by opaque node ids.
///
/// Owns predecessor/successor sets, creation dates, the reference date
/// and decay configuration, and the dirty flag that gates the engine's
/// derived cache.
#[derive(Debug, Clone)]
pub struct GraphStore {
    /// Node records by id. Presence here defines node existence.
    records: BTreeMap<NodeId, NodeRecord>,
    /// Node -> set of referenced (older) nodes.
    preds: BTreeMap<NodeId, BTreeSet<NodeId>>,
    /// Node -> set of referencing (newer) nodes.
    succs: BTreeMap<NodeId, BTreeSet<NodeId>>,
    /// Reference date for age computation.
    today: NaiveDate,
    /// Attenuation per decade, in [0, 1]. 1 means no attenuation.
    decay: f64,
    /// Set on every mutation; cleared by the engine after recomputing
    /// derived data.
    dirty: bool,
}

impl GraphStore {
    /// Create an empty store with `today` set to the current date and no
    /// decay.
    ///
    /// The store starts dirty so the first derived-data access computes
    /// the (empty) cache.
    pub fn new() -> Self {
        Self {
            records: BTreeMap::new(),
            preds: BTreeMap::new(),
            succs: BTreeMap::new(),
            today: Utc::now().date_naive(),
            decay: 1.0,
            dirty: true,
        }
    }

    // ── Mutation ────────────────────────────────────────────────────────

    /// Add a node with its referenced parents and creation date.
    ///
    /// The parent list is deduplicated into a set. Parent ids that do not
    /// exist in the final graph are accepted here and pruned during cycle
    /// resolution, not at insertion time.
    ///
    /// # Errors
    ///
    /// [`GraphError::DuplicateNode`] if `id` already exists. The store is
    /// unchanged on error.
    pub fn add_node(
        &mut self,
        id: NodeId,
        parents: &[NodeId],
        creation_date: NaiveDate,
    ) -> Result<(), GraphError> {
        if self.records.contains_key(&id) {
            return Err(GraphError::DuplicateNode(id));
        }

        let parent_set: BTreeSet<NodeId> = parents.iter().copied().collect();
        for &parent in &parent_set {
            self.succs.entry(parent).or_default().insert(id);
        }
        self.preds.insert(id, parent_set);
        self.records.insert(id, NodeRecord::new(creation_date));
        self.dirty = true;
        Ok(())
    }

    /// Remove a node.
    ///
    /// Removes the node's record and predecessor set, and removes the
    /// node from the successor sets of its former predecessors. Nodes
    /// that referenced the removed node keep their (now dangling)
    /// references until cycle resolution prunes them.
    ///
    /// # Errors
    ///
    /// [`GraphError::MissingNode`] if `id` does not exist. The store is
    /// unchanged on error.
    pub fn remove_node(&mut self, id: NodeId) -> Result<(), GraphError> {
        if !self.records.contains_key(&id) {
            return Err(GraphError::MissingNode(id));
        }

        if let Some(parents) = self.preds.remove(&id) {
            for parent in parents {
                if let Some(children) = self.succs.get_mut(&parent) {
                    children.remove(&id);
                }
            }
        }
        self.records.remove(&id);
        self.dirty = true;
        Ok(())
    }

    /// Set the reference date used for age computation.
    ///
    /// Marks derived data stale: weights depend on the reference date.
    pub fn set_today(&mut self, today: NaiveDate) {
        self.today = today;
        self.dirty = true;
    }

    /// Set the attenuation factor per decade, clamped into [0, 1].
    ///
    /// Marks derived data stale: weights depend on the decay factor.
    pub fn set_decay(&mut self, decay: f64) {
        self.decay = decay.clamp(0.0, 1.0);
        self.dirty = true;
    }

    /// Insert an edge into both directional views.
    pub(crate) fn insert_edge(&mut self, predecessor: NodeId, successor: NodeId) {
        self.preds.entry(successor).or_default().insert(predecessor);
        self.succs.entry(predecessor).or_default().insert(successor);
        self.dirty = true;
    }

    /// Remove an edge from both directional views. Returns whether the
    /// edge was present.
    pub(crate) fn remove_edge(&mut self, predecessor: NodeId, successor: NodeId) -> bool {
        let in_preds = self
            .preds
            .get_mut(&successor)
            .is_some_and(|set| set.remove(&predecessor));
        let in_succs = self
            .succs
            .get_mut(&predecessor)
            .is_some_and(|set| set.remove(&successor));
        if in_preds || in_succs {
            self.dirty = true;
        }
        in_preds || in_succs
    }

    // ── Dirty flag ──────────────────────────────────────────────────────

    /// Whether derived data (topological order, volumes) is stale.
    pub fn is_dirty(&self) -> bool {
        self.dirty
    }

    pub(crate) fn mark_dirty(&mut self) {
        self.dirty = true;
    }

    pub(crate) fn clear_dirty(&mut self) {
        self.dirty = false;
    }

    // ── Queries ─────────────────────────────────────────────────────────

    /// Whether a node with this id exists.
    pub fn exists(&self, id: NodeId) -> bool {
        self.records.contains_key(&id)
    }

    /// Creation date of a node, if it exists.
    pub fn creation_date(&self, id: NodeId) -> Option<NaiveDate> {
        self.records.get(&id).map(|record| record.creation_date)
    }

    /// The configured reference date.
    pub fn today(&self) -> NaiveDate {
        self.today
    }

    /// The configured attenuation factor.
    pub fn decay(&self) -> f64 {
        self.decay
    }

    /// Decay-adjusted weight of a node: `decay ^ (age_in_decades)`.
    ///
    /// Equal to 1 for every node when decay is 1. Returns 0 for an id
    /// that is not a node.
    pub fn weight(&self, id: NodeId) -> f64 {
        match self.records.get(&id) {
            Some(record) => {
                let age_days = (self.today - record.creation_date).num_days() as f64;
                self.decay.powf(age_days / DAYS_PER_DECADE)
            }
            None => 0.0,
        }
    }

    /// Number of references a node makes (predecessor count).
    pub fn in_degree(&self, id: NodeId) -> usize {
        self.preds.get(&id).map_or(0, BTreeSet::len)
    }

    /// Number of nodes referencing this one (successor count).
    pub fn out_degree(&self, id: NodeId) -> usize {
        self.succs.get(&id).map_or(0, BTreeSet::len)
    }

    /// Sum of successor weights: the direct attention a node receives.
    pub fn weighted_out_degree(&self, id: NodeId) -> f64 {
        self.successors(id).map(|s| self.weight(s)).sum()
    }

    /// Iterate over the nodes a node references, in id order.
    ///
    /// The iterator borrows the store; it is finite and restartable, and
    /// must not be held across mutations.
    pub fn predecessors(&self, id: NodeId) -> impl Iterator<Item = NodeId> + '_ {
        self.preds.get(&id).into_iter().flatten().copied()
    }

    /// Iterate over the nodes referencing this one, in id order.
    pub fn successors(&self, id: NodeId) -> impl Iterator<Item = NodeId> + '_ {
        self.succs.get(&id).into_iter().flatten().copied()
    }

    /// All nodes reachable backward through predecessor edges, excluding
    /// the start node. Iterative: depth does not grow the call stack.
    pub fn ancestors(&self, id: NodeId) -> BTreeSet<NodeId> {
        Self::reach(&self.preds, id)
    }

    /// All nodes reachable forward through successor edges, excluding the
    /// start node. Iterative: depth does not grow the call stack.
    pub fn descendants(&self, id: NodeId) -> BTreeSet<NodeId> {
        Self::reach(&self.succs, id)
    }

    fn reach(adjacency: &BTreeMap<NodeId, BTreeSet<NodeId>>, start: NodeId) -> BTreeSet<NodeId> {
        let mut seen: BTreeSet<NodeId> = BTreeSet::new();
        seen.insert(start);
        let mut work = vec![start];
        while let Some(node) = work.pop() {
            for &next in adjacency.get(&node).into_iter().flatten() {
                if seen.insert(next) {
                    work.push(next);
                }
            }
        }
        seen.remove(&start);
        seen
    }

    /// Iterate over all node ids, in id order.
    pub fn nodes(&self) -> impl Iterator<Item = NodeId> + '_ {
        self.records.keys().copied()
    }

    /// Number of nodes.
    pub fn node_count(&self) -> usize {
        self.records.len()
    }

    /// Number of edges, including edges whose predecessor id is dangling.
    pub fn edge_count(&self) -> usize {
        self.preds.values().map(BTreeSet::len).sum()
    }

    /// All edges in canonical order, derived from the predecessor view.
    pub fn edges(&self) -> Vec<Edge> {
        let mut edges: Vec<Edge> = self
            .preds
            .iter()
            .flat_map(|(&successor, parents)| {
                parents
                    .iter()
                    .map(move |&predecessor| Edge::new(predecessor, successor))
            })
            .collect();
        edges.sort();
        edges
    }

    /// Check that the predecessor and successor views are exact inverses.
    #[cfg(test)]
    pub(crate) fn assert_mirrored(&self) {
        for (&successor, parents) in &self.preds {
            for parent in parents {
                assert!(
                    self.succs
                        .get(parent)
                        .is_some_and(|set| set.contains(&successor)),
                    "edge {parent}->{successor} missing from successor view"
                );
            }
        }
        for (&predecessor, children) in &self.succs {
            for child in children {
                assert!(
                    self.preds
                        .get(child)
                        .is_some_and(|set| set.contains(&predecessor)),
                    "edge {predecessor}->{child} missing from predecessor view"
                );
            }
        }
    }
}

impl Default for GraphStore {
    fn default() -> Self {
        Self::new()
    }
}
