//! Deterministic fingerprints of graph state.
//!
//! A fingerprint hashes the canonical serialization of everything that
//! feeds a score: node records, edges, the reference date, and the decay
//! factor. Callers can tag score outputs with the fingerprint of the
//! graph that produced them.
//!
//! Determinism relies on `BTreeMap`-ordered node iteration and the
//! canonical `Ord` on [`Edge`]; no `HashMap` data enters the hash.

use chrono::NaiveDate;
use serde::Serialize;
use xxhash_rust::xxh64::xxh64;

use crate::store::GraphStore;
use crate::types::{Edge, NodeId};

#[derive(Serialize)]
struct FingerprintInput {
    nodes: Vec<(NodeId, NaiveDate)>,
    edges: Vec<Edge>,
    today: NaiveDate,
    decay: f64,
}

/// Compute the canonical hash of a serializable value.
pub fn canonical_hash<T: Serialize>(value: &T) -> u64 {
    let bytes = serde_json::to_vec(value).expect("canonical serialization failed");
    xxh64(&bytes, 0)
}

/// Fingerprint of the store's current state, as a 16-digit hex string.
pub fn graph_fingerprint(store: &GraphStore) -> String {
    let input = FingerprintInput {
        nodes: store
            .nodes()
            .filter_map(|v| store.creation_date(v).map(|date| (v, date)))
            .collect(),
        edges: store.edges(),
        today: store.today(),
        decay: store.decay(),
    };
    format!("{:016x}", canonical_hash(&input))
}
