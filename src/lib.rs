//! # kqi-kernel
//!
//! Information-theoretic knowledge quantification (KQI) over citation
//! DAGs.
//!
//! The engine answers one question:
//!
//! > Given a directed graph of timestamped items referencing each other,
//! > how much **knowledge volume** flows through each item?
//!
//! ## Core Contract
//!
//! 1. Ingest (id, parent ids, creation date) triples into a mutable
//!    graph store
//! 2. Repair temporal violations and citation cycles into a true DAG
//! 3. Propagate decay-weighted volumes bottom-up through the topological
//!    layering
//! 4. Convert volumes into an entropy-style score per node
//!
//! ## Architecture
//!
//! ```text
//! add_node → GraphStore → CycleResolver → TopologicalSorter
//!                                              ↓
//!                    score ← KqiEngine ← VolumePropagator
//! ```
//!
//! Derived data (order, volumes, graph volume) is one cache gated by the
//! store's dirty flag: mutations set it, the first derived-data access
//! afterwards recomputes everything wholesale.
//!
//! ## Determinism Guarantees
//!
//! - Adjacency lives in `BTreeMap`/`BTreeSet`: iteration order is the id
//!   order, never hash order
//! - Cycle repair is deterministic, including the greedy feedback-arc-set
//!   tie-break (smallest id)
//! - Same nodes + same configuration → identical fingerprint

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod engine;
pub mod fingerprint;
pub mod order;
pub mod resolver;
pub mod store;
pub mod types;
pub mod volume;

// Re-exports
pub use engine::{KqiEngine, KqiError};
pub use fingerprint::{canonical_hash, graph_fingerprint};
pub use order::{topological_order, CycleError};
pub use resolver::{resolve, ResolutionStats};
pub use store::{GraphError, GraphStore};
pub use types::{Edge, NodeId, NodeRecord};
pub use volume::{propagate, VolumeTable};

/// Schema version for the engine's public types.
/// Increment on breaking changes to any serialized type.
pub const KQI_SCHEMA_VERSION: &str = "1.0.0";
