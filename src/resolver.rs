//! Cycle resolution: repairs a raw citation graph into a DAG.
//!
//! Raw inputs are not acyclic: references may point at items "created"
//! later, at ids that never appear, or form mutual-citation loops. Repair
//! runs in two phases:
//!
//! 1. **Structural/temporal pruning** — drop references to absent ids,
//!    self-references, and references that go forward in time at year
//!    granularity.
//! 2. **De-looping** — find strongly connected components with an
//!    iterative Tarjan pass. Small components (2–9 members) are treated
//!    as functionally simultaneous and collapsed onto their shared
//!    outside neighborhood; large components (10+) get an approximate
//!    feedback arc set: a greedy vertex ordering whose backward edges are
//!    deleted.
//!
//! Resolution is idempotent: running it again on an already-resolved
//! graph removes nothing.

use std::collections::{BTreeSet, HashMap};

use chrono::Datelike;
use tracing::{debug, info};

use crate::store::GraphStore;
use crate::types::NodeId;

/// A component is "small" below this member count and gets collapsed;
/// at or above it, the feedback-arc-set heuristic runs instead.
const LARGE_SCC_THRESHOLD: usize = 10;

/// Counters describing what one resolution pass removed or rewired.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ResolutionStats {
    /// Edges dropped in the pruning phase (absent ids, self-references,
    /// year-order violations).
    pub edges_pruned: usize,
    /// Strongly connected components collapsed (size 2–9).
    pub sccs_collapsed: usize,
    /// Edges deleted by the feedback-arc-set heuristic (size 10+).
    pub feedback_edges_removed: usize,
}

impl ResolutionStats {
    /// Whether the pass changed the graph at all.
    pub fn is_noop(&self) -> bool {
        *self == Self::default()
    }
}

/// Repair the store into a DAG in place.
///
/// After this returns, the successor relation restricted to existing
/// nodes contains no directed cycle and no self-loops. Always marks
/// derived data stale, even when nothing was removed.
pub fn resolve(store: &mut GraphStore) -> ResolutionStats {
    let mut stats = ResolutionStats::default();

    stats.edges_pruned = prune_invalid_references(store);
    info!(
        edges = stats.edges_pruned,
        nodes = store.node_count(),
        "pruned structural/temporal violations"
    );

    for scc in strongly_connected_components(store) {
        if scc.len() < 2 {
            continue;
        }
        if scc.len() < LARGE_SCC_THRESHOLD {
            debug!(size = scc.len(), "collapsing small component");
            collapse_component(store, &scc);
            stats.sccs_collapsed += 1;
        } else {
            let removed = break_large_component(store, &scc);
            info!(
                size = scc.len(),
                removed, "applied feedback arc set to large component"
            );
            stats.feedback_edges_removed += removed;
        }
    }

    store.mark_dirty();
    stats
}

/// Phase 1: drop, for every node v, any predecessor u where u == v, u is
/// not a node, or u's creation year is strictly after v's.
///
/// Returns the number of edges removed.
fn prune_invalid_references(store: &mut GraphStore) -> usize {
    let mut doomed: Vec<(NodeId, NodeId)> = Vec::new();
    for v in store.nodes() {
        let v_year = match store.creation_date(v) {
            Some(date) => date.year(),
            None => continue,
        };
        for u in store.predecessors(v) {
            let violates = u == v
                || match store.creation_date(u) {
                    Some(date) => date.year() > v_year,
                    None => true,
                };
            if violates {
                doomed.push((u, v));
            }
        }
    }
    for &(u, v) in &doomed {
        store.remove_edge(u, v);
    }
    doomed.len()
}

/// Phase 2a: collapse a small component onto its shared outside
/// neighborhood.
///
/// Every member ends up with the union of the component's outside
/// predecessors and the union of its outside successors; internal edges
/// disappear because the new sets only reference outside nodes.
fn collapse_component(store: &mut GraphStore, scc: &[NodeId]) {
    let members: BTreeSet<NodeId> = scc.iter().copied().collect();

    let mut outside_preds: BTreeSet<NodeId> = BTreeSet::new();
    let mut outside_succs: BTreeSet<NodeId> = BTreeSet::new();
    for &m in scc {
        outside_preds.extend(store.predecessors(m).filter(|u| !members.contains(u)));
        outside_succs.extend(store.successors(m).filter(|s| !members.contains(s)));
    }

    for &m in scc {
        let old_preds: Vec<NodeId> = store.predecessors(m).collect();
        for u in old_preds {
            store.remove_edge(u, m);
        }
        let old_succs: Vec<NodeId> = store.successors(m).collect();
        for s in old_succs {
            store.remove_edge(m, s);
        }
    }
    for &m in scc {
        for &u in &outside_preds {
            store.insert_edge(u, m);
        }
        for &s in &outside_succs {
            store.insert_edge(m, s);
        }
    }
}

/// Phase 2b: delete an approximate feedback arc set from a large
/// component.
///
/// Orders the members greedily — each step places the remaining vertex
/// with the largest (remaining out-degree − remaining in-degree), ties
/// broken by smallest id — then deletes every internal edge that runs
/// backward against the ordering. Exact minimality is NP-hard and not
/// required; acyclicity of the induced subgraph is.
///
/// Returns the number of edges deleted.
fn break_large_component(store: &mut GraphStore, scc: &[NodeId]) -> usize {
    let n = scc.len();
    let index: HashMap<NodeId, usize> = scc.iter().enumerate().map(|(i, &v)| (v, i)).collect();

    let mut out_adj: Vec<Vec<usize>> = vec![Vec::new(); n];
    let mut in_adj: Vec<Vec<usize>> = vec![Vec::new(); n];
    for (i, &v) in scc.iter().enumerate() {
        for s in store.successors(v) {
            if let Some(&j) = index.get(&s) {
                out_adj[i].push(j);
                in_adj[j].push(i);
            }
        }
    }

    let mut out_deg: Vec<i64> = out_adj.iter().map(|a| a.len() as i64).collect();
    let mut in_deg: Vec<i64> = in_adj.iter().map(|a| a.len() as i64).collect();
    let mut placed = vec![false; n];
    let mut position = vec![0usize; n];

    for next_pos in 0..n {
        let mut best: Option<usize> = None;
        for i in 0..n {
            if placed[i] {
                continue;
            }
            // scc is sorted by id, so strict > keeps the smallest id on
            // ties.
            let better = match best {
                Some(b) => out_deg[i] - in_deg[i] > out_deg[b] - in_deg[b],
                None => true,
            };
            if better {
                best = Some(i);
            }
        }
        let Some(chosen) = best else { break };
        placed[chosen] = true;
        position[chosen] = next_pos;
        for &j in &out_adj[chosen] {
            if !placed[j] {
                in_deg[j] -= 1;
            }
        }
        for &j in &in_adj[chosen] {
            if !placed[j] {
                out_deg[j] -= 1;
            }
        }
    }

    let mut removed = 0;
    for (i, &u) in scc.iter().enumerate() {
        for &j in &out_adj[i] {
            if position[i] > position[j] {
                store.remove_edge(u, scc[j]);
                removed += 1;
            }
        }
    }
    removed
}

/// Strongly connected components of the successor relation, via an
/// iterative Tarjan pass (explicit frame stack, no recursion).
///
/// Each returned component is sorted by id; components come out in
/// Tarjan emission order.
fn strongly_connected_components(store: &GraphStore) -> Vec<Vec<NodeId>> {
    let ids: Vec<NodeId> = store.nodes().collect();
    let n = ids.len();
    let index_of: HashMap<NodeId, usize> = ids.iter().enumerate().map(|(i, &v)| (v, i)).collect();

    let mut adj: Vec<Vec<usize>> = vec![Vec::new(); n];
    for (i, &v) in ids.iter().enumerate() {
        for s in store.successors(v) {
            if let Some(&j) = index_of.get(&s) {
                adj[i].push(j);
            }
        }
    }

    let mut order = vec![usize::MAX; n];
    let mut lowlink = vec![usize::MAX; n];
    let mut on_stack = vec![false; n];
    let mut stack: Vec<usize> = Vec::new();
    let mut counter = 0usize;
    let mut components: Vec<Vec<NodeId>> = Vec::new();

    for root in 0..n {
        if order[root] != usize::MAX {
            continue;
        }

        // (vertex, next-neighbor cursor)
        let mut frames: Vec<(usize, usize)> = vec![(root, 0)];
        order[root] = counter;
        lowlink[root] = counter;
        counter += 1;
        stack.push(root);
        on_stack[root] = true;

        while let Some(&mut (v, ref mut cursor)) = frames.last_mut() {
            if *cursor < adj[v].len() {
                let w = adj[v][*cursor];
                *cursor += 1;
                if order[w] == usize::MAX {
                    order[w] = counter;
                    lowlink[w] = counter;
                    counter += 1;
                    stack.push(w);
                    on_stack[w] = true;
                    frames.push((w, 0));
                } else if on_stack[w] {
                    lowlink[v] = lowlink[v].min(order[w]);
                }
            } else {
                if lowlink[v] == order[v] {
                    let mut component = Vec::new();
                    loop {
                        let w = match stack.pop() {
                            Some(w) => w,
                            None => break,
                        };
                        on_stack[w] = false;
                        component.push(ids[w]);
                        if w == v {
                            break;
                        }
                    }
                    component.sort();
                    components.push(component);
                }
                let low = lowlink[v];
                frames.pop();
                if let Some(&mut (parent, _)) = frames.last_mut() {
                    lowlink[parent] = lowlink[parent].min(low);
                }
            }
        }
    }

    components
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    fn date(y: i32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, 1, 1).unwrap()
    }

    fn id(raw: u64) -> NodeId {
        NodeId::new(raw)
    }

    /// Build a store from (id, parents, year) triples.
    fn build(rows: &[(u64, &[u64], i32)]) -> GraphStore {
        let mut store = GraphStore::new();
        for &(node, parents, year) in rows {
            let parents: Vec<NodeId> = parents.iter().copied().map(NodeId::new).collect();
            store.add_node(id(node), &parents, date(year)).unwrap();
        }
        store
    }

    #[test]
    fn test_prunes_reference_to_absent_node() {
        let mut store = build(&[(1, &[9], 2001)]);
        let stats = resolve(&mut store);
        assert_eq!(stats.edges_pruned, 1);
        assert_eq!(store.in_degree(id(1)), 0);
        store.assert_mirrored();
    }

    #[test]
    fn test_prunes_time_reversed_reference() {
        // Node 1 (2010) references node 2 (2015): a data error.
        let mut store = build(&[(2, &[], 2015), (1, &[2], 2010)]);
        let stats = resolve(&mut store);
        assert_eq!(stats.edges_pruned, 1);
        assert_eq!(store.in_degree(id(1)), 0);
        assert_eq!(store.out_degree(id(2)), 0);
    }

    #[test]
    fn test_same_year_reference_survives() {
        let mut store = build(&[(1, &[], 2000), (2, &[1], 2000)]);
        let stats = resolve(&mut store);
        assert_eq!(stats.edges_pruned, 0);
        assert_eq!(store.in_degree(id(2)), 1);
    }

    #[test]
    fn test_prunes_self_reference() {
        let mut store = build(&[(1, &[1], 2000)]);
        resolve(&mut store);
        assert_eq!(store.in_degree(id(1)), 0);
        assert_eq!(store.out_degree(id(1)), 0);
    }

    #[test]
    fn test_small_scc_collapsed_to_shared_neighborhood() {
        // 3-cycle: 1 refs 2, 2 refs 3, 3 refs 1, all dated 2000.
        // Outside: root 10 referenced by 1, leaf 20 referencing 2.
        let mut store = build(&[
            (10, &[], 1990),
            (1, &[2, 10], 2000),
            (2, &[3], 2000),
            (3, &[1], 2000),
            (20, &[2], 2005),
        ]);
        let stats = resolve(&mut store);
        assert_eq!(stats.sccs_collapsed, 1);

        for member in [1, 2, 3] {
            let preds: Vec<NodeId> = store.predecessors(id(member)).collect();
            let succs: Vec<NodeId> = store.successors(id(member)).collect();
            assert_eq!(preds, vec![id(10)], "member {member} preds");
            assert_eq!(succs, vec![id(20)], "member {member} succs");
        }
        assert_eq!(store.out_degree(id(10)), 3);
        assert_eq!(store.in_degree(id(20)), 3);
        store.assert_mirrored();
    }

    #[test]
    fn test_isolated_small_scc_collapses_to_nothing() {
        let mut store = build(&[(1, &[3], 2000), (2, &[1], 2000), (3, &[2], 2000)]);
        resolve(&mut store);
        for member in [1, 2, 3] {
            assert_eq!(store.in_degree(id(member)), 0);
            assert_eq!(store.out_degree(id(member)), 0);
        }
    }

    #[test]
    fn test_large_scc_broken_by_feedback_arc_set() {
        // A 12-cycle: i refs i+1, 12 refs 1.
        let mut rows: Vec<(u64, Vec<u64>, i32)> = Vec::new();
        for i in 1..=12u64 {
            let parent = if i == 12 { 1 } else { i + 1 };
            rows.push((i, vec![parent], 2000));
        }
        let mut store = GraphStore::new();
        for (node, parents, year) in &rows {
            let parents: Vec<NodeId> = parents.iter().copied().map(NodeId::new).collect();
            store.add_node(id(*node), &parents, date(*year)).unwrap();
        }

        let stats = resolve(&mut store);
        assert_eq!(stats.sccs_collapsed, 0);
        // A simple cycle needs exactly one edge removed.
        assert_eq!(stats.feedback_edges_removed, 1);
        assert!(scc_free(&store));
        store.assert_mirrored();
    }

    #[test]
    fn test_resolution_idempotent() {
        let mut store = build(&[
            (1, &[2], 2000),
            (2, &[3], 2000),
            (3, &[1], 2000),
            (4, &[99], 2001),
            (5, &[4], 2002),
        ]);
        let first = resolve(&mut store);
        assert!(!first.is_noop());

        let before = store.edges();
        let second = resolve(&mut store);
        assert!(second.is_noop());
        assert_eq!(store.edges(), before);
    }

    #[test]
    fn test_deep_cycle_does_not_overflow_stack() {
        // One giant cycle: Tarjan must not recurse.
        let mut store = GraphStore::new();
        let n = 100_000u64;
        for i in 1..=n {
            let parent = if i == n { 1 } else { i + 1 };
            store.add_node(id(i), &[id(parent)], date(2000)).unwrap();
        }
        let stats = resolve(&mut store);
        assert_eq!(stats.feedback_edges_removed, 1);
        assert!(scc_free(&store));
    }

    /// True when every SCC of the store has a single member.
    fn scc_free(store: &GraphStore) -> bool {
        strongly_connected_components(store)
            .iter()
            .all(|scc| scc.len() == 1)
    }
}
