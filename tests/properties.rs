//! Property-based tests for index invariants: add/remove cancellation,
//! the dimension guard, and brute-force exactness.

mod common;

use std::sync::Arc;

use common::{chunk, StubEmbedding};
use proptest::prelude::*;
use quiver::{
    BruteForceCosineIndex, Index, IvfConfig, IvfIndex, NswConfig, NswIndex, Record,
};

fn vector(dim: usize) -> impl Strategy<Value = Vec<f32>> {
    proptest::collection::vec(-1.0f32..1.0f32, dim)
}

/// The three variants over a shared provider, for guard properties that
/// must hold uniformly.
fn all_indexes(provider: &Arc<StubEmbedding>) -> Vec<Box<dyn Index>> {
    vec![
        Box::new(BruteForceCosineIndex::new(provider.clone())),
        Box::new(IvfIndex::new(provider.clone(), IvfConfig::default())),
        Box::new(NswIndex::new(provider.clone(), NswConfig::default())),
    ]
}

proptest! {
    /// Invariant: for a record not in the index, `add` then `remove`
    /// leaves the index observably equal for any query.
    #[test]
    fn prop_add_remove_cancels(extra in vector(3), query in vector(3)) {
        let provider = Arc::new(StubEmbedding::new(3));
        provider.set("q", query);

        for index in all_indexes(&provider) {
            index.add(&chunk("a", vec![1.0, 0.0, 0.0])).unwrap();
            index.add(&chunk("b", vec![0.0, 1.0, 0.0])).unwrap();
            index.add(&chunk("c", vec![0.5, 0.5, 0.0])).unwrap();

            let before = index.search("q", 10).unwrap();

            let transient = chunk("transient", extra.clone());
            index.add(&transient).unwrap();
            index.remove(transient.id).unwrap();

            let after = index.search("q", 10).unwrap();

            prop_assert_eq!(before.len(), after.len());
            for (x, y) in before.iter().zip(after.iter()) {
                prop_assert_eq!(x.id, y.id);
                prop_assert_eq!(x.score, y.score);
            }
        }
    }

    /// Invariant: a vector of the wrong dimension is rejected and the
    /// index state is unchanged, on every variant.
    #[test]
    fn prop_dimension_guard(bad_dim in 1usize..8, query in vector(3)) {
        prop_assume!(bad_dim != 3);

        let provider = Arc::new(StubEmbedding::new(3));
        provider.set("q", query);

        for index in all_indexes(&provider) {
            index.add(&chunk("good", vec![1.0, 0.0, 0.0])).unwrap();

            let bad = chunk("bad", vec![0.5; bad_dim]);
            let err = index.add(&bad).unwrap_err();
            prop_assert!(err.is_validation());

            prop_assert_eq!(index.len(), 1);
            let results = index.search("q", 10).unwrap();
            prop_assert!(results.iter().all(|r| r.id != bad.id));
        }
    }

    /// Invariant: brute-force results are sorted non-increasingly and
    /// contain the true top-k (no excluded record outranks a returned one).
    #[test]
    fn prop_brute_force_exactness(
        vectors in proptest::collection::vec(vector(4), 1..20),
        k in 1usize..10,
    ) {
        let provider = Arc::new(StubEmbedding::new(4));
        let index = BruteForceCosineIndex::new(provider.clone());

        let records: Vec<Record> = vectors
            .iter()
            .enumerate()
            .map(|(i, v)| chunk(&format!("r{}", i), v.clone()))
            .collect();
        index.rebuild(&records).unwrap();

        provider.set("q", vec![1.0, 0.0, 0.0, 0.0]);

        let top = index.search("q", k).unwrap();
        let all = index.search("q", records.len()).unwrap();

        prop_assert_eq!(top.len(), k.min(all.len()));
        for w in top.windows(2) {
            prop_assert!(w[0].score >= w[1].score);
        }

        if let Some(worst_returned) = top.last() {
            for result in &all {
                if !top.iter().any(|t| t.id == result.id) {
                    prop_assert!(result.score <= worst_returned.score);
                }
            }
        }
    }
}
