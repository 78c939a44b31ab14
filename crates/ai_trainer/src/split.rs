//! Stratified train/test partitioning
//!
//! Each class is shuffled independently with the seeded RNG and a fixed
//! share of it goes to the test partition, so both partitions keep the
//! class ratio of the full dataset. Partitions list rows in their
//! original order.

use profileguard_ai_core::deterministic::LcgRng;
use profileguard_ai_core::features::NUM_CLASSES;
use profileguard_ai_core::{AiCoreError, Label};

/// Row indices of the two partitions, ascending
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct StratifiedSplit {
    pub train: Vec<usize>,
    pub test: Vec<usize>,
}

impl StratifiedSplit {
    /// Split `labels` so that `test_fraction` of every class is held out
    pub fn new(
        labels: &[Label],
        test_fraction: f64,
        seed: i64,
    ) -> Result<Self, AiCoreError> {
        if !(test_fraction > 0.0 && test_fraction < 1.0) {
            return Err(AiCoreError::Configuration(format!(
                "test_fraction must be in (0, 1), got {test_fraction}"
            )));
        }

        let mut by_class: [Vec<usize>; NUM_CLASSES] = Default::default();
        for (row, label) in labels.iter().enumerate() {
            by_class[label.index()].push(row);
        }

        let present = by_class.iter().filter(|rows| !rows.is_empty()).count();
        if present < NUM_CLASSES {
            return Err(AiCoreError::Configuration(format!(
                "dataset contains {present} label class(es); need {NUM_CLASSES} to stratify"
            )));
        }

        let mut rng = LcgRng::new(seed);
        let mut train = Vec::with_capacity(labels.len());
        let mut test = Vec::new();

        for (class, rows) in by_class.iter_mut().enumerate() {
            if rows.len() < 2 {
                return Err(AiCoreError::Configuration(format!(
                    "class {} has {} row(s); need at least 2 to split",
                    Label::from_index(class).map_or("?", Label::as_str),
                    rows.len()
                )));
            }

            let n_test = ((rows.len() as f64 * test_fraction).round() as usize)
                .clamp(1, rows.len() - 1);
            rng.shuffle(rows);
            test.extend_from_slice(&rows[..n_test]);
            train.extend_from_slice(&rows[n_test..]);
        }

        train.sort_unstable();
        test.sort_unstable();
        Ok(Self { train, test })
    }

    /// Gather the rows of one partition
    pub fn select<T: Clone>(items: &[T], indices: &[usize]) -> Vec<T> {
        indices.iter().map(|&i| items[i].clone()).collect()
    }
}
