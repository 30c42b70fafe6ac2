//! Property-based invariant checks over randomly generated citation
//! graphs.

use chrono::NaiveDate;
use kqi_kernel::{KqiEngine, NodeId};
use proptest::prelude::*;

fn date(y: i32) -> NaiveDate {
    NaiveDate::from_ymd_opt(y, 1, 1).unwrap()
}

/// Rows of (parent ids, creation year); node ids are assigned 1..=n.
/// Parent ids may be absent, self-referencing, or time-reversed, so the
/// generated graphs exercise every repair path.
fn graph_rows() -> impl Strategy<Value = Vec<(Vec<u64>, i32)>> {
    prop::collection::vec(
        (prop::collection::vec(1u64..=30, 0..5), 1990i32..2020),
        1..30,
    )
}

fn build(rows: &[(Vec<u64>, i32)], decay: f64) -> KqiEngine {
    let mut engine = KqiEngine::new();
    engine.set_today(date(2025));
    engine.set_decay(decay);
    for (i, (parents, year)) in rows.iter().enumerate() {
        let id = NodeId::new(i as u64 + 1);
        let parents: Vec<NodeId> = parents.iter().copied().map(NodeId::new).collect();
        engine.add_node(id, &parents, date(*year)).unwrap();
    }
    engine
}

proptest! {
    /// After resolution the adjacency views mirror each other exactly.
    #[test]
    fn prop_adjacency_views_mirror(rows in graph_rows()) {
        let mut engine = build(&rows, 1.0);
        engine.resolve_cycles();

        let store = engine.store();
        for v in store.nodes() {
            for u in store.predecessors(v) {
                prop_assert!(store.successors(u).any(|s| s == v));
            }
            for s in store.successors(v) {
                prop_assert!(store.predecessors(s).any(|u| u == v));
            }
        }
    }

    /// Resolution yields an acyclic graph: the sort succeeds and places
    /// every node (all generated dates are before the reference date).
    #[test]
    fn prop_resolution_yields_dag(rows in graph_rows()) {
        let mut engine = build(&rows, 1.0);
        engine.resolve_cycles();

        let order = engine.topological_order().unwrap().to_vec();
        prop_assert_eq!(order.len(), rows.len());
        // Predecessors appear before their successors.
        let position = |needle: NodeId| order.iter().position(|&v| v == needle).unwrap();
        let store = engine.store();
        for v in store.nodes() {
            for u in store.predecessors(v) {
                prop_assert!(position(u) < position(v));
            }
        }
    }

    /// A second resolution pass finds nothing to repair.
    #[test]
    fn prop_resolution_idempotent(rows in graph_rows()) {
        let mut engine = build(&rows, 1.0);
        engine.resolve_cycles();
        let edges = engine.store().edges();

        let stats = engine.resolve_cycles();
        prop_assert!(stats.is_noop());
        prop_assert_eq!(engine.store().edges(), edges);
    }

    /// With decay 1 every weight is exactly 1; with decay < 1 weights lie
    /// in (0, 1] and older nodes never weigh more than newer ones.
    #[test]
    fn prop_weight_decays_with_age(rows in graph_rows(), decay in 0.1f64..0.99) {
        let flat = build(&rows, 1.0);
        for v in flat.store().nodes() {
            prop_assert_eq!(flat.store().weight(v), 1.0);
        }

        let decayed = build(&rows, decay);
        let store = decayed.store();
        let mut dated: Vec<(NaiveDate, f64)> = store
            .nodes()
            .map(|v| (store.creation_date(v).unwrap(), store.weight(v)))
            .collect();
        dated.sort_by_key(|&(d, _)| d);
        for pair in dated.windows(2) {
            prop_assert!(pair[0].1 <= pair[1].1);
        }
        for &(_, w) in &dated {
            prop_assert!(w > 0.0 && w <= 1.0);
        }
    }

    /// The graph-wide volume equals the sum over roots of weight plus
    /// volume.
    #[test]
    fn prop_graph_volume_conserved(rows in graph_rows(), decay in 0.5f64..=1.0) {
        let mut engine = build(&rows, decay);
        engine.resolve_cycles();

        let total = engine.graph_volume().unwrap();
        let roots: Vec<NodeId> = engine
            .store()
            .nodes()
            .filter(|&v| engine.store().in_degree(v) == 0)
            .collect();
        let mut by_roots = 0.0;
        for v in roots {
            by_roots += engine.store().weight(v) + engine.volume(v).unwrap();
        }
        prop_assert!((total - by_roots).abs() < 1e-9);
    }

    /// Every score is finite and non-negative.
    #[test]
    fn prop_scores_finite_nonnegative(rows in graph_rows(), decay in 0.5f64..=1.0) {
        let mut engine = build(&rows, decay);
        engine.resolve_cycles();

        for i in 1..=rows.len() as u64 {
            let score = engine.score(NodeId::new(i)).unwrap();
            prop_assert!(score.is_finite());
            prop_assert!(score >= 0.0);
        }
    }

    /// The fingerprint is a pure function of graph state.
    #[test]
    fn prop_fingerprint_deterministic(rows in graph_rows()) {
        let mut a = build(&rows, 0.8);
        let mut b = build(&rows, 0.8);
        a.resolve_cycles();
        b.resolve_cycles();
        prop_assert_eq!(a.fingerprint(), b.fingerprint());
    }
}
