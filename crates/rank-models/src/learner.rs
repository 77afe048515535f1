// The three base-learner families of the voting ensemble

use ndarray::{Array1, ArrayView2};
use rank_core::config::{ParamSpace, TrainingConfig};
use rank_core::Result;
use serde::{Deserialize, Serialize};
use std::fmt;

use crate::base::Classifier;
use crate::boosting::{BoostingParams, GradientBoosting};
use crate::forest::{Forest, ForestParams};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum LearnerKind {
    BaggedTrees,
    BoostedTrees,
    ExtraRandomTrees,
}

impl LearnerKind {
    /// Ensemble order; matches the order of `TrainingConfig::ensemble_weights`.
    pub const ALL: [LearnerKind; 3] = [
        LearnerKind::BaggedTrees,
        LearnerKind::BoostedTrees,
        LearnerKind::ExtraRandomTrees,
    ];

    pub fn search_space<'a>(&self, config: &'a TrainingConfig) -> &'a ParamSpace {
        match self {
            LearnerKind::BaggedTrees => &config.bagged_space,
            LearnerKind::BoostedTrees => &config.boosted_space,
            LearnerKind::ExtraRandomTrees => &config.extra_space,
        }
    }
}

impl fmt::Display for LearnerKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            LearnerKind::BaggedTrees => "bagged_trees",
            LearnerKind::BoostedTrees => "boosted_trees",
            LearnerKind::ExtraRandomTrees => "extra_random_trees",
        };
        write!(f, "{name}")
    }
}

/// Searchable hyperparameters shared by all families.
///
/// `min_samples_leaf` is unused by extra trees and `n_jobs` only affects
/// forests; both keep their defaults when a family does not search them.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct LearnerParams {
    pub max_depth: usize,
    pub n_estimators: usize,
    pub min_samples_leaf: usize,
    pub n_jobs: usize,
}

impl Default for LearnerParams {
    fn default() -> Self {
        Self {
            max_depth: 8,
            n_estimators: 10,
            min_samples_leaf: 1,
            n_jobs: 1,
        }
    }
}

impl fmt::Display for LearnerParams {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "max_depth={} n_estimators={} min_samples_leaf={} n_jobs={}",
            self.max_depth, self.n_estimators, self.min_samples_leaf, self.n_jobs
        )
    }
}

/// A base learner of one of the three families.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum BaseLearner {
    BaggedTrees(Forest),
    BoostedTrees(GradientBoosting),
    ExtraRandomTrees(Forest),
}

impl BaseLearner {
    pub fn new(kind: LearnerKind, params: &LearnerParams, seed: u64) -> Self {
        match kind {
            LearnerKind::BaggedTrees => BaseLearner::BaggedTrees(Forest::new(ForestParams::bagged(
                params.n_estimators,
                params.max_depth,
                params.min_samples_leaf,
                seed,
            ))),
            LearnerKind::BoostedTrees => BaseLearner::BoostedTrees(GradientBoosting::new(
                BoostingParams::new(params.n_estimators, params.max_depth, params.min_samples_leaf, seed),
            )),
            LearnerKind::ExtraRandomTrees => BaseLearner::ExtraRandomTrees(Forest::new(
                ForestParams::extra(params.n_estimators, params.max_depth, params.n_jobs, seed),
            )),
        }
    }

    pub fn kind(&self) -> LearnerKind {
        match self {
            BaseLearner::BaggedTrees(_) => LearnerKind::BaggedTrees,
            BaseLearner::BoostedTrees(_) => LearnerKind::BoostedTrees,
            BaseLearner::ExtraRandomTrees(_) => LearnerKind::ExtraRandomTrees,
        }
    }

    fn inner(&self) -> &dyn Classifier {
        match self {
            BaseLearner::BaggedTrees(m) | BaseLearner::ExtraRandomTrees(m) => m,
            BaseLearner::BoostedTrees(m) => m,
        }
    }

    fn inner_mut(&mut self) -> &mut dyn Classifier {
        match self {
            BaseLearner::BaggedTrees(m) | BaseLearner::ExtraRandomTrees(m) => m,
            BaseLearner::BoostedTrees(m) => m,
        }
    }
}

impl Classifier for BaseLearner {
    fn fit(&mut self, x: ArrayView2<f32>, y: &[u8]) -> Result<()> {
        self.inner_mut().fit(x, y)
    }

    fn predict_proba(&self, x: ArrayView2<f32>) -> Result<Array1<f64>> {
        self.inner().predict_proba(x)
    }

    fn is_fitted(&self) -> bool {
        self.inner().is_fitted()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fixed_parameters_per_family() {
        let params = LearnerParams {
            max_depth: 2,
            n_estimators: 7,
            min_samples_leaf: 3,
            n_jobs: 4,
        };

        match BaseLearner::new(LearnerKind::BaggedTrees, &params, 42) {
            BaseLearner::BaggedTrees(f) => {
                let p = f.params();
                assert!(p.bootstrap);
                assert_eq!(p.min_samples_split, 4);
                assert_eq!(p.min_samples_leaf, 3);
                assert_eq!(p.n_estimators, 7);
            }
            other => panic!("unexpected learner {:?}", other.kind()),
        }

        match BaseLearner::new(LearnerKind::BoostedTrees, &params, 42) {
            BaseLearner::BoostedTrees(g) => {
                assert_eq!(g.params().learning_rate, 0.0008);
                assert_eq!(g.params().min_samples_split, 3);
            }
            other => panic!("unexpected learner {:?}", other.kind()),
        }

        match BaseLearner::new(LearnerKind::ExtraRandomTrees, &params, 42) {
            BaseLearner::ExtraRandomTrees(f) => {
                let p = f.params();
                assert!(!p.bootstrap);
                assert_eq!(p.n_jobs, 4);
                assert_eq!(p.min_samples_leaf, 1);
            }
            other => panic!("unexpected learner {:?}", other.kind()),
        }
    }

    #[test]
    fn test_kind_display() {
        assert_eq!(LearnerKind::BoostedTrees.to_string(), "boosted_trees");
        assert_eq!(LearnerKind::ALL.len(), 3);
    }
}
