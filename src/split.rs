//! Group-aware train/val/test partitioning.
//!
//! Splitting is keyed by image identity so all polygon records for one image
//! land in exactly one partition. The algorithm is consumed behind
//! [`GroupSplitter`]; the seeded default shuffles ids and cuts by ratio.

use crate::types::{DatasetError, DatasetResult, ImageId};
use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rand::SeedableRng;
use serde::{Deserialize, Serialize};

/// Opaque split parameters, passed through to the splitter.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SplitConfig {
    pub train_ratio: f64,
    pub val_ratio: f64,
    pub seed: u64,
}

impl Default for SplitConfig {
    fn default() -> Self {
        Self {
            train_ratio: 0.7,
            val_ratio: 0.15,
            seed: 42,
        }
    }
}

/// Three disjoint image-identity partitions. Together they are exhaustive
/// over the ids handed to the splitter.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SplitPartitions {
    pub train: Vec<ImageId>,
    pub val: Vec<ImageId>,
    pub test: Vec<ImageId>,
}

/// The group-split collaborator. Implementations must return disjoint,
/// exhaustive partitions and be deterministic for fixed inputs.
pub trait GroupSplitter {
    fn split(&self, ids: &[ImageId]) -> SplitPartitions;
}

/// Default splitter: seeded shuffle, then ratio cut. Whatever the ratios
/// leave after train and val becomes test.
#[derive(Debug, Clone)]
pub struct SeededGroupSplit {
    cfg: SplitConfig,
}

impl SeededGroupSplit {
    pub fn new(cfg: SplitConfig) -> DatasetResult<Self> {
        let in_unit = |v: f64| (0.0..=1.0).contains(&v);
        if !in_unit(cfg.train_ratio) || !in_unit(cfg.val_ratio) {
            return Err(DatasetError::Precondition(format!(
                "split ratios must be within [0, 1]: train={} val={}",
                cfg.train_ratio, cfg.val_ratio
            )));
        }
        if cfg.train_ratio + cfg.val_ratio > 1.0 {
            return Err(DatasetError::Precondition(format!(
                "train_ratio + val_ratio must not exceed 1: {} + {}",
                cfg.train_ratio, cfg.val_ratio
            )));
        }
        Ok(Self { cfg })
    }
}

impl GroupSplitter for SeededGroupSplit {
    fn split(&self, ids: &[ImageId]) -> SplitPartitions {
        let mut shuffled = ids.to_vec();
        let mut rng = StdRng::seed_from_u64(self.cfg.seed);
        shuffled.shuffle(&mut rng);

        let n = shuffled.len();
        let n_train = ((n as f64 * self.cfg.train_ratio).round() as usize).min(n);
        let n_val = ((n as f64 * self.cfg.val_ratio).round() as usize).min(n - n_train);

        let test = shuffled.split_off(n_train + n_val);
        let val = shuffled.split_off(n_train);
        SplitPartitions {
            train: shuffled,
            val,
            test,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    fn ids(n: usize) -> Vec<ImageId> {
        (0..n).map(|i| ImageId::from(format!("img_{i}"))).collect()
    }

    #[test]
    fn partitions_are_disjoint_and_exhaustive() {
        let splitter = SeededGroupSplit::new(SplitConfig::default()).unwrap();
        let all = ids(100);
        let parts = splitter.split(&all);

        let mut seen: HashSet<&ImageId> = HashSet::new();
        for id in parts.train.iter().chain(&parts.val).chain(&parts.test) {
            assert!(seen.insert(id), "{id} appears in more than one partition");
        }
        assert_eq!(seen.len(), all.len());
        assert_eq!(parts.train.len(), 70);
        assert_eq!(parts.val.len(), 15);
        assert_eq!(parts.test.len(), 15);
    }

    #[test]
    fn same_seed_reproduces_the_same_split() {
        let splitter = SeededGroupSplit::new(SplitConfig::default()).unwrap();
        let all = ids(37);
        assert_eq!(splitter.split(&all), splitter.split(&all));
    }

    #[test]
    fn different_seeds_usually_differ() {
        let a = SeededGroupSplit::new(SplitConfig {
            seed: 1,
            ..SplitConfig::default()
        })
        .unwrap();
        let b = SeededGroupSplit::new(SplitConfig {
            seed: 2,
            ..SplitConfig::default()
        })
        .unwrap();
        let all = ids(50);
        assert_ne!(a.split(&all).train, b.split(&all).train);
    }

    #[test]
    fn empty_input_yields_empty_partitions() {
        let splitter = SeededGroupSplit::new(SplitConfig::default()).unwrap();
        let parts = splitter.split(&[]);
        assert!(parts.train.is_empty() && parts.val.is_empty() && parts.test.is_empty());
    }

    #[test]
    fn bad_ratios_fail_fast() {
        let err = SeededGroupSplit::new(SplitConfig {
            train_ratio: 0.9,
            val_ratio: 0.3,
            seed: 0,
        })
        .unwrap_err();
        assert!(matches!(err, crate::types::DatasetError::Precondition(_)));
    }
}
