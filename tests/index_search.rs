//! Scenario tests for the three index variants: exact retrieval, IVF
//! partition locality, and NSW graph self-hits.

mod common;

use std::sync::Arc;

use common::{chunk, StubEmbedding};
use quiver::{
    BruteForceCosineIndex, Index, IvfConfig, IvfIndex, NswConfig, NswIndex, Record, RecordId,
};

// ============================================================================
// Exact retrieval (brute force)
// ============================================================================

#[test]
fn test_brute_force_exact_retrieval() {
    let provider = Arc::new(StubEmbedding::new(3));
    let index = BruteForceCosineIndex::new(provider.clone());
    let sqrt2_inv = 1.0 / 2.0f32.sqrt();

    let a = chunk("a", vec![1.0, 0.0, 0.0]);
    let b = chunk("b", vec![0.0, 1.0, 0.0]);
    let c = chunk("c", vec![sqrt2_inv, sqrt2_inv, 0.0]);
    for record in [&a, &b, &c] {
        index.add(record).unwrap();
    }

    provider.set("q", vec![1.0, 0.0, 0.0]);
    let results = index.search("q", 2).unwrap();

    assert_eq!(results.len(), 2);
    assert_eq!(results[0].id, a.id);
    assert!((results[0].score - 1.0).abs() < 1e-6);
    assert_eq!(results[1].id, c.id);
    assert!((results[1].score - 0.707).abs() < 1e-3);
}

#[test]
fn test_brute_force_contains_true_top_k() {
    // Exactness: the returned k results dominate everything excluded.
    let provider = Arc::new(StubEmbedding::new(4));
    let index = BruteForceCosineIndex::new(provider.clone());

    let records: Vec<Record> = (0..30u64)
        .map(|i| chunk(&format!("r{}", i), common::make_embedding(i, 4)))
        .collect();
    index.rebuild(&records).unwrap();

    let query = common::make_embedding(11, 4);
    provider.set("q", query.clone());

    let top = index.search("q", 5).unwrap();
    assert_eq!(top.len(), 5);
    for w in top.windows(2) {
        assert!(w[0].score >= w[1].score);
    }

    // Every excluded record scores no better than the worst returned one
    let worst_returned = top.last().unwrap().score;
    let returned_ids: Vec<RecordId> = top.iter().map(|r| r.id).collect();
    let all = index.search("q", records.len()).unwrap();
    for result in all {
        if !returned_ids.contains(&result.id) {
            assert!(result.score <= worst_returned + 1e-6);
        }
    }
}

// ============================================================================
// IVF partition locality
// ============================================================================

/// 100 vectors forming 4 visible clusters in R^8. Deterministic jitter
/// stands in for Gaussian noise.
fn four_clusters() -> Vec<Vec<Record>> {
    let anchors: [[f32; 8]; 4] = [
        [10.0, 0.0, 0.0, 0.0, 0.0, 0.0, 0.0, 0.0],
        [0.0, 10.0, 0.0, 0.0, 0.0, 0.0, 0.0, 0.0],
        [0.0, 0.0, 10.0, 0.0, 0.0, 0.0, 0.0, 0.0],
        [0.0, 0.0, 0.0, 10.0, 0.0, 0.0, 0.0, 0.0],
    ];
    anchors
        .iter()
        .enumerate()
        .map(|(c, anchor)| {
            (0..25usize)
                .map(|i| {
                    let v: Vec<f32> = anchor
                        .iter()
                        .enumerate()
                        .map(|(d, a)| a + 0.3 * ((c * 31 + i * 7 + d) as f32).sin())
                        .collect();
                    chunk(&format!("cluster{}-{}", c, i), v)
                })
                .collect()
        })
        .collect()
}

#[test]
fn test_ivf_probes_only_nearby_partitions() {
    let provider = Arc::new(StubEmbedding::new(8));
    let index = IvfIndex::new(
        provider.clone(),
        IvfConfig {
            n_clusters: 4,
            nprobe: 3,
        },
    );

    let groups = four_clusters();
    let snapshot: Vec<Record> = groups.iter().flatten().cloned().collect();
    index.rebuild(&snapshot).unwrap();
    assert_eq!(index.cluster_count(), 4);

    // Query sits inside cluster 0; cluster 1 happens to be the farthest
    // centroid (all four anchors are equidistant in L2, so the jittered
    // centroids decide, so we assert against ids from the probed union
    // instead of a hardcoded loser).
    let query: Vec<f32> = vec![9.9, 0.1, 0.0, 0.0, 0.0, 0.0, 0.0, 0.0];
    provider.set("near cluster 0", query);

    let results = index.search("near cluster 0", 5).unwrap();
    assert_eq!(results.len(), 5);

    // At least cluster 0's members dominate the ranking
    let cluster0_ids: Vec<RecordId> = groups[0].iter().map(|r| r.id).collect();
    assert!(
        cluster0_ids.contains(&results[0].id),
        "nearest partition lost its own query"
    );
    for result in &results {
        assert!(
            cluster0_ids.contains(&result.id),
            "a top-5 hit for an in-cluster query came from a foreign partition"
        );
    }
}

#[test]
fn test_ivf_single_probe_excludes_far_partition() {
    let provider = Arc::new(StubEmbedding::new(8));
    let index = IvfIndex::new(
        provider.clone(),
        IvfConfig {
            n_clusters: 4,
            nprobe: 1,
        },
    );

    let groups = four_clusters();
    let snapshot: Vec<Record> = groups.iter().flatten().cloned().collect();
    index.rebuild(&snapshot).unwrap();

    provider.set("q", vec![9.9, 0.1, 0.0, 0.0, 0.0, 0.0, 0.0, 0.0]);
    let results = index.search("q", 30).unwrap();

    // Exactly one partition is probed, so nothing from the three far
    // blobs can appear even with a generous k
    assert!(!results.is_empty());
    assert!(results.len() <= 25);
    let cluster0_ids: Vec<RecordId> = groups[0].iter().map(|r| r.id).collect();
    for result in &results {
        assert!(
            cluster0_ids.contains(&result.id),
            "single-probe search surfaced a member of a far partition"
        );
    }
}

// ============================================================================
// NSW graph self-hits
// ============================================================================

#[test]
fn test_nsw_self_hit_on_twenty_unit_vectors() {
    let provider = Arc::new(StubEmbedding::new(4));
    let index = NswIndex::new(provider.clone(), NswConfig::default());

    // Unit vectors around a circle: the similarity landscape toward any
    // stored vector is unimodal, so the greedy walk cannot strand.
    let records: Vec<Record> = (0..20)
        .map(|i| {
            let theta = 2.0 * std::f32::consts::PI * i as f32 / 20.0;
            chunk(
                &format!("node-{}", i),
                vec![theta.cos(), theta.sin(), 0.0, 0.0],
            )
        })
        .collect();
    for record in &records {
        index.add(record).unwrap();
    }
    assert_eq!(index.len(), 20);

    for record in &records {
        provider.set(&record.content, record.embedding.clone().unwrap());
        let results = index.search(&record.content, 1).unwrap();
        assert_eq!(results.len(), 1);
        assert_eq!(results[0].id, record.id, "{} missed itself", record.content);
        assert!((results[0].score - 1.0).abs() < 1e-4);
    }
}

#[test]
fn test_nsw_top_k_sorted_and_duplicate_free() {
    // The entry node is arbitrary, so only entry-independent facts are
    // asserted: rank-1 self-hit, descending order, no duplicate ids.
    let provider = Arc::new(StubEmbedding::new(4));
    let index = NswIndex::new(provider.clone(), NswConfig::default());

    let records: Vec<Record> = (0..12)
        .map(|i| {
            let theta = 2.0 * std::f32::consts::PI * i as f32 / 12.0;
            chunk(
                &format!("node-{}", i),
                vec![theta.cos(), theta.sin(), 0.0, 0.0],
            )
        })
        .collect();
    for record in &records {
        index.add(record).unwrap();
    }

    provider.set("node-6", records[6].embedding.clone().unwrap());
    let results = index.search("node-6", 3).unwrap();

    assert!(!results.is_empty());
    assert!(results.len() <= 3);
    assert_eq!(results[0].id, records[6].id);
    for w in results.windows(2) {
        assert!(w[0].score >= w[1].score, "results not sorted descending");
    }
    let mut ids: Vec<RecordId> = results.iter().map(|r| r.id).collect();
    ids.sort();
    ids.dedup();
    assert_eq!(ids.len(), results.len(), "duplicate ids in results");
}

// ============================================================================
// Zero-norm handling (all variants)
// ============================================================================

#[test]
fn test_zero_vector_never_outranks_nonzero() {
    let provider = Arc::new(StubEmbedding::new(3));
    let brute = BruteForceCosineIndex::new(provider.clone());

    let live = chunk("live", vec![0.5, 0.5, 0.0]);
    let zero = chunk("zero", vec![0.0, 0.0, 0.0]);
    brute.add(&live).unwrap();
    brute.add(&zero).unwrap();

    provider.set("q", vec![1.0, 1.0, 0.0]);
    let results = brute.search("q", 10).unwrap();

    // The zero vector is skipped outright
    assert_eq!(results.len(), 1);
    assert_eq!(results[0].id, live.id);
    assert!(results[0].score > 0.0);
}
