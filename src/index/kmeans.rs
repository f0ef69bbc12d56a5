//! Seeded k-means used by the IVF index for partition training.
//!
//! Lloyd's algorithm with k-means++ initialisation. All randomness flows
//! from a caller-supplied seed, so the same input and seed always yield
//! the same centroids. Assignment ties break on the smaller centroid id
//! (strict comparison while scanning centroids in id order).

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

use crate::distance::euclidean_distance;

/// Iteration cap when assignments keep shifting.
const MAX_ITERATIONS: usize = 100;

/// A trained k-means partitioner: an ordered set of centroids.
#[derive(Clone, Debug)]
pub(crate) struct KMeans {
    centroids: Vec<Vec<f32>>,
}

impl KMeans {
    /// Creates a partitioner directly from pre-chosen centroids.
    ///
    /// Used for the trivial one-centroid case when a vector is added to an
    /// untrained IVF index.
    pub(crate) fn from_centroids(centroids: Vec<Vec<f32>>) -> Self {
        Self { centroids }
    }

    /// Trains `k` centroids on the given vectors.
    ///
    /// `k` is capped at `data.len()`. Runs to convergence (no assignment
    /// changes) or [`MAX_ITERATIONS`], whichever comes first.
    pub(crate) fn train(data: &[Vec<f32>], k: usize, seed: u64) -> Self {
        if data.is_empty() || k == 0 {
            return Self {
                centroids: Vec::new(),
            };
        }

        let k = k.min(data.len());
        let mut rng = StdRng::seed_from_u64(seed);
        let mut centroids = init_centroids(data, k, &mut rng);

        let mut assignments = vec![usize::MAX; data.len()];
        for _ in 0..MAX_ITERATIONS {
            // Assignment step
            let mut changed = false;
            for (i, vector) in data.iter().enumerate() {
                let nearest = nearest_centroid(&centroids, vector);
                if assignments[i] != nearest {
                    assignments[i] = nearest;
                    changed = true;
                }
            }
            if !changed {
                break;
            }

            // Update step: each centroid moves to the mean of its members.
            // Empty clusters keep their previous centroid.
            let dim = data[0].len();
            let mut sums = vec![vec![0.0f32; dim]; centroids.len()];
            let mut counts = vec![0usize; centroids.len()];
            for (vector, &cluster) in data.iter().zip(&assignments) {
                counts[cluster] += 1;
                for (s, v) in sums[cluster].iter_mut().zip(vector) {
                    *s += v;
                }
            }
            for (cluster, centroid) in centroids.iter_mut().enumerate() {
                if counts[cluster] > 0 {
                    let n = counts[cluster] as f32;
                    *centroid = sums[cluster].iter().map(|s| s / n).collect();
                }
            }
        }

        Self { centroids }
    }

    /// Returns the id of the nearest centroid by Euclidean distance.
    pub(crate) fn predict(&self, vector: &[f32]) -> usize {
        nearest_centroid(&self.centroids, vector)
    }

    /// Returns the centroids in id order.
    pub(crate) fn centroids(&self) -> &[Vec<f32>] {
        &self.centroids
    }

    /// Returns the number of centroids.
    pub(crate) fn len(&self) -> usize {
        self.centroids.len()
    }
}

/// Returns the index of the centroid nearest to `vector`.
///
/// Strict `<` while scanning in id order means distance ties resolve to
/// the smaller centroid id.
fn nearest_centroid(centroids: &[Vec<f32>], vector: &[f32]) -> usize {
    let mut best = 0;
    let mut best_dist = f32::INFINITY;
    for (i, centroid) in centroids.iter().enumerate() {
        let dist = euclidean_distance(vector, centroid);
        if dist < best_dist {
            best_dist = dist;
            best = i;
        }
    }
    best
}

/// k-means++ initialisation: the first centroid is sampled uniformly, each
/// subsequent one with probability proportional to the squared distance
/// from its nearest already-chosen centroid.
fn init_centroids(data: &[Vec<f32>], k: usize, rng: &mut StdRng) -> Vec<Vec<f32>> {
    let mut centroids = Vec::with_capacity(k);

    let first = rng.gen_range(0..data.len());
    centroids.push(data[first].clone());

    while centroids.len() < k {
        let weights: Vec<f32> = data
            .iter()
            .map(|vector| {
                let d = centroids
                    .iter()
                    .map(|c| euclidean_distance(vector, c))
                    .fold(f32::INFINITY, f32::min);
                d * d
            })
            .collect();

        let total: f32 = weights.iter().sum();
        if total == 0.0 {
            // All remaining points coincide with a chosen centroid; pick
            // uniformly so the requested k is still honored.
            let idx = rng.gen_range(0..data.len());
            centroids.push(data[idx].clone());
            continue;
        }

        let threshold = rng.gen::<f32>() * total;
        let mut cumulative = 0.0;
        let mut chosen = data.len() - 1;
        for (i, w) in weights.iter().enumerate() {
            cumulative += w;
            if cumulative >= threshold {
                chosen = i;
                break;
            }
        }
        centroids.push(data[chosen].clone());
    }

    centroids
}

#[cfg(test)]
mod tests {
    use super::*;

    fn two_blobs() -> Vec<Vec<f32>> {
        let mut data = Vec::new();
        for i in 0..10 {
            let jitter = i as f32 * 0.01;
            data.push(vec![0.0 + jitter, 0.0]);
            data.push(vec![10.0 + jitter, 10.0]);
        }
        data
    }

    #[test]
    fn test_train_empty_data() {
        let model = KMeans::train(&[], 4, 42);
        assert_eq!(model.len(), 0);
    }

    #[test]
    fn test_k_capped_at_point_count() {
        let data = vec![vec![0.0, 0.0], vec![1.0, 1.0]];
        let model = KMeans::train(&data, 100, 42);
        assert_eq!(model.len(), 2);
    }

    #[test]
    fn test_deterministic_for_same_seed() {
        let data = two_blobs();
        let a = KMeans::train(&data, 2, 42);
        let b = KMeans::train(&data, 2, 42);
        assert_eq!(a.centroids(), b.centroids());
    }

    #[test]
    fn test_separates_visible_clusters() {
        let data = two_blobs();
        let model = KMeans::train(&data, 2, 42);
        assert_eq!(model.len(), 2);

        // Points from the same blob route to the same centroid; points
        // from different blobs route to different centroids.
        let low = model.predict(&[0.05, 0.0]);
        let high = model.predict(&[10.05, 10.0]);
        assert_ne!(low, high);
        assert_eq!(model.predict(&[0.5, 0.5]), low);
        assert_eq!(model.predict(&[9.5, 9.5]), high);
    }

    #[test]
    fn test_predict_tie_breaks_on_smaller_id() {
        let model = KMeans::from_centroids(vec![vec![1.0, 0.0], vec![1.0, 0.0]]);
        assert_eq!(model.predict(&[0.0, 0.0]), 0);
    }

    #[test]
    fn test_from_centroids_single_point() {
        let model = KMeans::from_centroids(vec![vec![3.0, 4.0]]);
        assert_eq!(model.len(), 1);
        assert_eq!(model.predict(&[100.0, -5.0]), 0);
    }

    #[test]
    fn test_duplicate_points_still_yield_k_centroids() {
        let data = vec![vec![1.0, 1.0]; 5];
        let model = KMeans::train(&data, 3, 42);
        assert_eq!(model.len(), 3);
    }
}
