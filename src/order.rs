//! Topological ordering via Kahn's algorithm.

use std::collections::HashMap;

use crate::store::GraphStore;
use crate::types::NodeId;

/// A residual cycle survived resolution among nodes that are already due
/// (created strictly before the reference date).
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
#[error("unresolved cycle among {unresolved} already-due node(s)")]
pub struct CycleError {
    /// Number of already-due nodes left with positive in-degree.
    pub unresolved: usize,
}

/// Compute a linear order consistent with the successor relation.
///
/// Tie-breaking among equally-ready nodes is implementation-defined; the
/// order is not unique. Nodes dated on or after the store's reference
/// date are tolerated with residual in-degree (treated as not yet due for
/// complete resolution) and are simply absent from the order.
///
/// # Errors
///
/// [`CycleError`] when a node with residual in-degree is dated strictly
/// before the reference date — resolution failed to eliminate a cycle it
/// participates in.
pub fn topological_order(store: &GraphStore) -> Result<Vec<NodeId>, CycleError> {
    let mut remaining: HashMap<NodeId, usize> = HashMap::new();
    let mut ready: Vec<NodeId> = Vec::new();
    for v in store.nodes() {
        match store.in_degree(v) {
            0 => ready.push(v),
            d => {
                remaining.insert(v, d);
            }
        }
    }

    let mut order: Vec<NodeId> = Vec::with_capacity(store.node_count());
    while let Some(v) = ready.pop() {
        for s in store.successors(v) {
            if let Some(d) = remaining.get_mut(&s) {
                *d -= 1;
                if *d == 0 {
                    remaining.remove(&s);
                    ready.push(s);
                }
            }
        }
        order.push(v);
    }

    let today = store.today();
    let unresolved = remaining
        .keys()
        .filter(|&&v| store.creation_date(v).is_some_and(|date| date < today))
        .count();
    if unresolved > 0 {
        return Err(CycleError { unresolved });
    }
    Ok(order)
}
