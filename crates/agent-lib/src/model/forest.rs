//! Bagged regression-tree ensemble
//!
//! A deterministic, seedable batch regressor: each tree is fit on a bootstrap
//! resample of the training set, splits greedily minimize the summed squared
//! error of the two sides, and the forest prediction is the mean over trees.
//! The same seed and the same multiset of examples always reproduce the same
//! model, which the override contract depends on.

use crate::features::{FeatureVector, NUM_FEATURES};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use serde::{Deserialize, Serialize};

/// Number of trees in the ensemble
pub const DEFAULT_TREES: usize = 100;

/// Base seed for bootstrap sampling
pub const DEFAULT_SEED: u64 = 42;

const MAX_DEPTH: usize = 12;

/// Tuning knobs for a forest fit
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ForestParams {
    pub trees: usize,
    pub max_depth: usize,
    pub seed: u64,
}

impl Default for ForestParams {
    fn default() -> Self {
        Self {
            trees: DEFAULT_TREES,
            max_depth: MAX_DEPTH,
            seed: DEFAULT_SEED,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
enum Node {
    Leaf {
        value: f64,
    },
    Split {
        feature: usize,
        threshold: f64,
        left: usize,
        right: usize,
    },
}

/// A single regression tree stored as an index arena
#[derive(Debug, Clone, Serialize, Deserialize)]
struct Tree {
    nodes: Vec<Node>,
    root: usize,
}

impl Tree {
    fn predict(&self, features: &FeatureVector) -> f64 {
        let mut node = self.root;
        loop {
            match &self.nodes[node] {
                Node::Leaf { value } => return *value,
                Node::Split {
                    feature,
                    threshold,
                    left,
                    right,
                } => {
                    node = if features[*feature] <= *threshold {
                        *left
                    } else {
                        *right
                    };
                }
            }
        }
    }
}

/// Trained ensemble state, persisted as the model half of the artifact pair
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RegressionForest {
    trees: Vec<Tree>,
    params: ForestParams,
}

impl RegressionForest {
    /// Fit the ensemble on a batch of scaled feature vectors and labels.
    ///
    /// Precondition: `samples` is non-empty and the same length as `labels`;
    /// the caller (SetpointModel) guards the empty-dataset case.
    pub fn fit(samples: &[FeatureVector], labels: &[f64], params: ForestParams) -> Self {
        debug_assert!(!samples.is_empty());
        debug_assert_eq!(samples.len(), labels.len());

        let n = samples.len();
        let trees = (0..params.trees)
            .map(|tree_index| {
                let mut rng = StdRng::seed_from_u64(params.seed.wrapping_add(tree_index as u64));
                let indices: Vec<usize> = (0..n).map(|_| rng.gen_range(0..n)).collect();
                grow_tree(samples, labels, &indices, params.max_depth)
            })
            .collect();

        Self { trees, params }
    }

    /// Mean prediction over all trees
    pub fn predict(&self, features: &FeatureVector) -> f64 {
        let sum: f64 = self.trees.iter().map(|t| t.predict(features)).sum();
        sum / self.trees.len() as f64
    }

    pub fn num_trees(&self) -> usize {
        self.trees.len()
    }
}

fn grow_tree(samples: &[FeatureVector], labels: &[f64], indices: &[usize], max_depth: usize) -> Tree {
    let mut nodes = Vec::new();
    let root = grow_node(&mut nodes, samples, labels, indices, 0, max_depth);
    Tree { nodes, root }
}

fn grow_node(
    nodes: &mut Vec<Node>,
    samples: &[FeatureVector],
    labels: &[f64],
    indices: &[usize],
    depth: usize,
    max_depth: usize,
) -> usize {
    let mean = indices.iter().map(|&i| labels[i]).sum::<f64>() / indices.len() as f64;

    let splittable = depth < max_depth
        && indices.len() >= 2
        && indices.iter().any(|&i| labels[i] != labels[indices[0]]);

    if let Some((feature, threshold)) = splittable
        .then(|| best_split(samples, labels, indices))
        .flatten()
    {
        let (left_idx, right_idx): (Vec<usize>, Vec<usize>) = indices
            .iter()
            .partition(|&&i| samples[i][feature] <= threshold);

        let left = grow_node(nodes, samples, labels, &left_idx, depth + 1, max_depth);
        let right = grow_node(nodes, samples, labels, &right_idx, depth + 1, max_depth);
        nodes.push(Node::Split {
            feature,
            threshold,
            left,
            right,
        });
    } else {
        nodes.push(Node::Leaf { value: mean });
    }

    nodes.len() - 1
}

/// Pick the (feature, threshold) minimizing the summed squared error of the
/// two sides. Thresholds are midpoints between consecutive distinct values;
/// returns None when every feature is constant over `indices`.
fn best_split(
    samples: &[FeatureVector],
    labels: &[f64],
    indices: &[usize],
) -> Option<(usize, f64)> {
    let mut best: Option<(usize, f64, f64)> = None;

    for feature in 0..NUM_FEATURES {
        let mut pairs: Vec<(f64, f64)> = indices
            .iter()
            .map(|&i| (samples[i][feature], labels[i]))
            .collect();
        pairs.sort_by(|a, b| a.0.partial_cmp(&b.0).unwrap_or(std::cmp::Ordering::Equal));

        // Prefix sums over labels for O(1) SSE at each candidate split
        let n = pairs.len();
        let mut prefix_sum = vec![0.0; n + 1];
        let mut prefix_sum_sq = vec![0.0; n + 1];
        for (i, &(_, label)) in pairs.iter().enumerate() {
            prefix_sum[i + 1] = prefix_sum[i] + label;
            prefix_sum_sq[i + 1] = prefix_sum_sq[i] + label * label;
        }
        let sse = |lo: usize, hi: usize| -> f64 {
            let count = (hi - lo) as f64;
            let sum = prefix_sum[hi] - prefix_sum[lo];
            let sum_sq = prefix_sum_sq[hi] - prefix_sum_sq[lo];
            sum_sq - sum * sum / count
        };

        for i in 1..n {
            if pairs[i - 1].0 >= pairs[i].0 {
                continue;
            }
            let score = sse(0, i) + sse(i, n);
            let improves = match best {
                Some((_, _, best_score)) => score < best_score,
                None => true,
            };
            if improves {
                let threshold = (pairs[i - 1].0 + pairs[i].0) / 2.0;
                best = Some((feature, threshold, score));
            }
        }
    }

    best.map(|(feature, threshold, _)| (feature, threshold))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn vector(t: f64) -> FeatureVector {
        [t, 50.0, 400.0, 0.0]
    }

    #[test]
    fn test_constant_labels_predict_constant() {
        let samples: Vec<FeatureVector> = (0..10).map(|i| vector(i as f64)).collect();
        let labels = vec![22.0; 10];
        let forest = RegressionForest::fit(&samples, &labels, ForestParams::default());

        assert!((forest.predict(&vector(3.5)) - 22.0).abs() < 1e-9);
    }

    #[test]
    fn test_single_example_predicts_its_label() {
        let samples = vec![vector(24.0)];
        let labels = vec![25.0];
        let forest = RegressionForest::fit(&samples, &labels, ForestParams::default());

        assert!((forest.predict(&vector(24.0)) - 25.0).abs() < 1e-9);
    }

    #[test]
    fn test_same_seed_is_deterministic() {
        let samples: Vec<FeatureVector> = (0..20).map(|i| vector(i as f64 / 2.0)).collect();
        let labels: Vec<f64> = (0..20).map(|i| 18.0 + (i % 7) as f64).collect();

        let a = RegressionForest::fit(&samples, &labels, ForestParams::default());
        let b = RegressionForest::fit(&samples, &labels, ForestParams::default());

        for i in 0..20 {
            let input = vector(i as f64 / 3.0);
            assert_eq!(a.predict(&input), b.predict(&input));
        }
    }

    #[test]
    fn test_learns_a_step_function() {
        // Cold readings want heat, hot readings want cooling
        let samples: Vec<FeatureVector> = (0..30).map(|i| vector(15.0 + i as f64 * 0.5)).collect();
        let labels: Vec<f64> = samples
            .iter()
            .map(|v| if v[0] < 22.0 { 24.0 } else { 20.0 })
            .collect();
        let forest = RegressionForest::fit(&samples, &labels, ForestParams::default());

        assert!(forest.predict(&vector(16.0)) > forest.predict(&vector(28.0)));
    }

    #[test]
    fn test_serde_round_trip_preserves_predictions() {
        let samples: Vec<FeatureVector> = (0..15).map(|i| vector(18.0 + i as f64)).collect();
        let labels: Vec<f64> = (0..15).map(|i| 20.0 + (i % 5) as f64).collect();
        let forest = RegressionForest::fit(&samples, &labels, ForestParams::default());

        let json = serde_json::to_string(&forest).unwrap();
        let restored: RegressionForest = serde_json::from_str(&json).unwrap();

        for i in 0..15 {
            let input = vector(17.5 + i as f64);
            assert!((forest.predict(&input) - restored.predict(&input)).abs() < 1e-6);
        }
    }

    #[test]
    fn test_forest_has_configured_tree_count() {
        let samples = vec![vector(20.0), vector(25.0)];
        let labels = vec![21.0, 23.0];
        let params = ForestParams {
            trees: 10,
            ..ForestParams::default()
        };
        let forest = RegressionForest::fit(&samples, &labels, params);
        assert_eq!(forest.num_trees(), 10);
    }
}
