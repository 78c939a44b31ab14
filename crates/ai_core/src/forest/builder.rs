//! CART (Classification and Regression Tree) builder
//!
//! Grows one classification tree on a bootstrap sample using weighted
//! Gini impurity and a random feature subset per split. All randomness
//! comes from the tree's own seeded generator.

use super::tree::{Node, Tree};
use crate::deterministic::{LcgRng, SplitTieBreaker};
use crate::features::{Label, NUM_CLASSES};

/// Splits must reduce weighted impurity by more than this
const MIN_GAIN: f64 = 1e-12;

/// Training parameters for a single tree
#[derive(Clone, Debug)]
pub struct TreeConfig {
    pub max_depth: usize,
    pub min_samples_split: usize,
    pub max_features: usize,
}

impl Default for TreeConfig {
    fn default() -> Self {
        Self {
            max_depth: 15,
            min_samples_split: 2,
            max_features: 1,
        }
    }
}

/// Split candidate with gain and tie-breaker
#[derive(Debug, Clone)]
struct SplitCandidate {
    feature_idx: usize,
    threshold: f64,
    gain: f64,
    tie_breaker: SplitTieBreaker,
}

impl SplitCandidate {
    fn new(feature_idx: usize, threshold: f64, gain: f64) -> Self {
        Self {
            feature_idx,
            threshold,
            gain,
            tie_breaker: SplitTieBreaker::new(feature_idx, threshold),
        }
    }

    fn beats(&self, other: &SplitCandidate) -> bool {
        self.gain > other.gain || (self.gain == other.gain && self.tie_breaker < other.tie_breaker)
    }
}

/// Weighted per-class totals
type ClassWeights = [f64; NUM_CLASSES];

/// Weighted Gini impurity scaled by node weight: W - sum(w_c^2) / W
fn weighted_gini(counts: &ClassWeights) -> f64 {
    let total: f64 = counts.iter().sum();
    if total <= 0.0 {
        return 0.0;
    }
    total - counts.iter().map(|w| w * w).sum::<f64>() / total
}

/// Build a classification tree using exact-greedy CART
pub(crate) struct CartBuilder<'a> {
    config: TreeConfig,
    features: &'a [Vec<f64>],
    labels: &'a [Label],
    class_weights: ClassWeights,
    feature_count: usize,
    rng: LcgRng,
}

impl<'a> CartBuilder<'a> {
    pub(crate) fn new(
        features: &'a [Vec<f64>],
        labels: &'a [Label],
        class_weights: ClassWeights,
        config: TreeConfig,
        rng: LcgRng,
    ) -> Self {
        debug_assert_eq!(features.len(), labels.len());

        let feature_count = features.first().map_or(0, Vec::len);

        Self {
            config,
            features,
            labels,
            class_weights,
            feature_count,
            rng,
        }
    }

    /// Grow a tree over the given sample rows (duplicates allowed)
    pub(crate) fn build(mut self, sample: &[usize]) -> Tree {
        let mut nodes = Vec::new();
        self.build_node(sample, 0, &mut nodes);
        Tree { nodes }
    }

    fn class_totals(&self, indices: &[usize]) -> ClassWeights {
        let mut totals = [0.0; NUM_CLASSES];
        for &idx in indices {
            let class = self.labels[idx].index();
            totals[class] += self.class_weights[class];
        }
        totals
    }

    /// Recursively build tree nodes, returning the index of the new node
    fn build_node(&mut self, indices: &[usize], depth: usize, nodes: &mut Vec<Node>) -> i32 {
        let current_idx = nodes.len() as i32;
        let totals = self.class_totals(indices);

        // Real wins ties
        let majority = if totals[Label::Fake.index()] > totals[Label::Real.index()] {
            Label::Fake
        } else {
            Label::Real
        };

        let pure = totals.iter().filter(|&&w| w > 0.0).count() <= 1;
        if depth >= self.config.max_depth || indices.len() < self.config.min_samples_split || pure
        {
            nodes.push(Node::leaf(current_idx, majority));
            return current_idx;
        }

        let Some(split) = self.find_best_split(indices, &totals) else {
            nodes.push(Node::leaf(current_idx, majority));
            return current_idx;
        };

        let (left_indices, right_indices) =
            self.split_samples(indices, split.feature_idx, split.threshold);

        // Reserve space for current node
        nodes.push(Node::internal(
            current_idx,
            split.feature_idx as i32,
            split.threshold,
            -1,
            -1,
        ));

        let left_idx = self.build_node(&left_indices, depth + 1, nodes);
        let right_idx = self.build_node(&right_indices, depth + 1, nodes);

        nodes[current_idx as usize].left = left_idx;
        nodes[current_idx as usize].right = right_idx;

        current_idx
    }

    /// Search a random feature subset; if none of it yields a positive
    /// gain, keep scanning the remaining features in drawn order
    fn find_best_split(&mut self, indices: &[usize], totals: &ClassWeights) -> Option<SplitCandidate> {
        let order = self
            .rng
            .sample_indices(self.feature_count, self.feature_count);
        let parent = weighted_gini(totals);
        let mut best: Option<SplitCandidate> = None;

        for (visited, &feature_idx) in order.iter().enumerate() {
            if visited >= self.config.max_features && best.is_some() {
                break;
            }

            if let Some(candidate) = self.best_split_for_feature(indices, feature_idx, parent) {
                best = match best {
                    Some(current) if !candidate.beats(&current) => Some(current),
                    _ => Some(candidate),
                };
            }
        }

        best
    }

    /// Sweep sorted values of one feature, scoring every midpoint
    fn best_split_for_feature(
        &self,
        indices: &[usize],
        feature_idx: usize,
        parent: f64,
    ) -> Option<SplitCandidate> {
        let mut column: Vec<(f64, usize)> = indices
            .iter()
            .map(|&idx| (self.features[idx][feature_idx], self.labels[idx].index()))
            .collect();
        column.sort_by(|a, b| a.0.total_cmp(&b.0));

        let mut right = [0.0; NUM_CLASSES];
        for &(_, class) in &column {
            right[class] += self.class_weights[class];
        }
        let mut left = [0.0; NUM_CLASSES];
        let mut best: Option<SplitCandidate> = None;

        for pair in 0..column.len().saturating_sub(1) {
            let (value, class) = column[pair];
            left[class] += self.class_weights[class];
            right[class] -= self.class_weights[class];

            let next = column[pair + 1].0;
            if next <= value {
                continue;
            }

            let gain = parent - weighted_gini(&left) - weighted_gini(&right);
            if gain <= MIN_GAIN {
                continue;
            }

            let mut threshold = value + (next - value) / 2.0;
            if threshold >= next {
                threshold = value;
            }

            let candidate = SplitCandidate::new(feature_idx, threshold, gain);
            if best.as_ref().map_or(true, |current| candidate.beats(current)) {
                best = Some(candidate);
            }
        }

        best
    }

    /// Split samples based on threshold
    fn split_samples(
        &self,
        indices: &[usize],
        feature_idx: usize,
        threshold: f64,
    ) -> (Vec<usize>, Vec<usize>) {
        indices
            .iter()
            .partition(|&&idx| self.features[idx][feature_idx] <= threshold)
    }
}
