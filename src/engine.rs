//! The KQI engine: owns the store and the derived cache, computes scores.
//!
//! The engine wraps a [`GraphStore`] together with one cache of derived
//! data (topological order, volumes, graph volume). The store's dirty
//! flag is the only cache gate: any mutation sets it; any derived-data
//! access rebuilds everything and clears it. There is no incremental
//! invalidation — recomputation is wholesale, which keeps the cache
//! trivially consistent at O(graph) cost on the first access after a
//! mutation.

use chrono::NaiveDate;
use tracing::debug;

use crate::fingerprint::graph_fingerprint;
use crate::order::{self, CycleError};
use crate::resolver::{self, ResolutionStats};
use crate::store::{GraphError, GraphStore};
use crate::types::NodeId;
use crate::volume::{self, VolumeTable};

/// Error type for engine operations.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum KqiError {
    /// A store mutation failed.
    #[error(transparent)]
    Graph(#[from] GraphError),
    /// A residual cycle among already-due nodes blocked the topological
    /// sort.
    #[error(transparent)]
    Cycle(#[from] CycleError),
    /// A score was requested for the reserved super-root id.
    #[error("cannot access the super root")]
    SuperRootAccess,
}

/// Derived data rebuilt as a unit whenever the store is dirty.
#[derive(Debug, Clone, Default)]
struct DerivedCache {
    order: Vec<NodeId>,
    volumes: VolumeTable,
}

/// Knowledge-quantification engine over a citation graph.
///
/// ## Usage
///
/// 1. Populate with [`KqiEngine::add_node`] (one call per item).
/// 2. Call [`KqiEngine::resolve_cycles`] once to repair the graph into a
///    DAG.
/// 3. Configure [`KqiEngine::set_today`] / [`KqiEngine::set_decay`].
/// 4. Read [`KqiEngine::score`] per item; the derived cache is built
///    lazily on first access and reused until the next mutation.
#[derive(Debug, Clone, Default)]
pub struct KqiEngine {
    store: GraphStore,
    cache: DerivedCache,
}

impl KqiEngine {
    /// Create an engine over an empty graph.
    pub fn new() -> Self {
        Self::default()
    }

    /// Create an engine over an already-populated store.
    pub fn with_store(store: GraphStore) -> Self {
        Self {
            store,
            cache: DerivedCache::default(),
        }
    }

    /// Read access to the underlying store.
    pub fn store(&self) -> &GraphStore {
        &self.store
    }

    // ── Mutation ────────────────────────────────────────────────────────

    /// Add a node with its referenced parents and creation date.
    ///
    /// # Errors
    ///
    /// [`GraphError::DuplicateNode`] if the id exists.
    pub fn add_node(
        &mut self,
        id: NodeId,
        parents: &[NodeId],
        creation_date: NaiveDate,
    ) -> Result<(), GraphError> {
        self.store.add_node(id, parents, creation_date)
    }

    /// Remove a node.
    ///
    /// # Errors
    ///
    /// [`GraphError::MissingNode`] if the id does not exist.
    pub fn remove_node(&mut self, id: NodeId) -> Result<(), GraphError> {
        self.store.remove_node(id)
    }

    /// Repair the graph into a DAG in place. Idempotent.
    pub fn resolve_cycles(&mut self) -> ResolutionStats {
        resolver::resolve(&mut self.store)
    }

    /// Set the reference date for age computation.
    pub fn set_today(&mut self, today: NaiveDate) {
        self.store.set_today(today);
    }

    /// Set the attenuation factor per decade, in [0, 1].
    pub fn set_decay(&mut self, decay: f64) {
        self.store.set_decay(decay);
    }

    // ── Derived data ────────────────────────────────────────────────────

    /// Rebuild the derived cache if the store is dirty.
    ///
    /// The dirty flag is cleared only after a successful rebuild, so a
    /// failing sort leaves the cache stale and the error repeats on the
    /// next access.
    fn refresh(&mut self) -> Result<(), CycleError> {
        if !self.store.is_dirty() {
            return Ok(());
        }
        let order = order::topological_order(&self.store)?;
        let volumes = volume::propagate(&self.store, &order);
        debug!(
            nodes = order.len(),
            graph_volume = volumes.graph_volume(),
            "rebuilt derived cache"
        );
        self.cache = DerivedCache { order, volumes };
        self.store.clear_dirty();
        Ok(())
    }

    /// The cached topological order, recomputed if stale.
    ///
    /// Nodes tolerated with residual in-degree (dated on/after the
    /// reference date) are absent from the order.
    ///
    /// # Errors
    ///
    /// [`KqiError::Cycle`] when an unresolved cycle remains among
    /// already-due nodes.
    pub fn topological_order(&mut self) -> Result<&[NodeId], KqiError> {
        self.refresh()?;
        Ok(&self.cache.order)
    }

    /// A node's propagated volume, recomputed if stale.
    pub fn volume(&mut self, id: NodeId) -> Result<f64, KqiError> {
        self.refresh()?;
        Ok(self.cache.volumes.volume(id))
    }

    /// The graph-wide volume (the score normalizer), recomputed if stale.
    pub fn graph_volume(&mut self) -> Result<f64, KqiError> {
        self.refresh()?;
        Ok(self.cache.volumes.graph_volume())
    }

    /// The knowledge quantification index of a node.
    ///
    /// The score is the Shannon information content of the node's share
    /// of total knowledge volume. For a root node with volume V and
    /// graph volume G it is `-(V/G)·log2(V/G)`; for a node with d
    /// predecessors, each predecessor u contributes
    /// `-(V/d/G)·log2((V/d)/volume(u))`. A node with zero volume scores
    /// zero.
    ///
    /// # Errors
    ///
    /// [`KqiError::SuperRootAccess`] for the reserved super-root id;
    /// [`KqiError::Cycle`] when the cache cannot be rebuilt.
    pub fn score(&mut self, id: NodeId) -> Result<f64, KqiError> {
        if id.is_super_root() {
            return Err(KqiError::SuperRootAccess);
        }
        self.refresh()?;

        let node_volume = self.cache.volumes.volume(id);
        if node_volume == 0.0 {
            return Ok(0.0);
        }
        let graph_volume = self.cache.volumes.graph_volume();

        let in_degree = self.store.in_degree(id);
        if in_degree == 0 {
            let share = node_volume / graph_volume;
            return Ok(-share * share.log2());
        }

        let per_parent = node_volume / in_degree as f64;
        let mut score = 0.0;
        for parent in self.store.predecessors(id) {
            let parent_volume = self.cache.volumes.volume(parent);
            score += -(per_parent / graph_volume) * (per_parent / parent_volume).log2();
        }
        Ok(score)
    }

    /// Deterministic fingerprint of the current graph state (nodes,
    /// edges, reference date, decay). Two engines with identical state
    /// produce identical fingerprints.
    pub fn fingerprint(&self) -> String {
        graph_fingerprint(&self.store)
    }
}
