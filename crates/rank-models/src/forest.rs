// Randomized tree forests: bootstrap-bagged trees and extremely randomized trees

use ndarray::{Array1, ArrayView2};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use rayon::prelude::*;
use rank_core::{RankError, Result};
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::base::{check_width, derive_seed, sqrt_features, validate_training_set, Classifier};
use crate::tree::{Criterion, DecisionTree, Splitter, TreeParams};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ForestParams {
    pub n_estimators: usize,
    pub max_depth: usize,
    pub min_samples_split: usize,
    pub min_samples_leaf: usize,
    pub bootstrap: bool,
    pub criterion: Criterion,
    pub splitter: Splitter,
    /// Worker threads used to grow trees.
    pub n_jobs: usize,
    pub seed: u64,
}

impl ForestParams {
    /// Bootstrap-resampled gini trees with exhaustive splits.
    pub fn bagged(n_estimators: usize, max_depth: usize, min_samples_leaf: usize, seed: u64) -> Self {
        Self {
            n_estimators,
            max_depth,
            min_samples_split: 4,
            min_samples_leaf,
            bootstrap: true,
            criterion: Criterion::Gini,
            splitter: Splitter::Best,
            n_jobs: 1,
            seed,
        }
    }

    /// Entropy trees on the full sample with random thresholds.
    pub fn extra(n_estimators: usize, max_depth: usize, n_jobs: usize, seed: u64) -> Self {
        Self {
            n_estimators,
            max_depth,
            min_samples_split: 2,
            min_samples_leaf: 1,
            bootstrap: false,
            criterion: Criterion::Entropy,
            splitter: Splitter::Random,
            n_jobs,
            seed,
        }
    }
}

/// Averaging ensemble of classification trees.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Forest {
    params: ForestParams,
    trees: Vec<DecisionTree>,
    n_features: usize,
}

impl Forest {
    pub fn new(params: ForestParams) -> Self {
        Self {
            params,
            trees: Vec::new(),
            n_features: 0,
        }
    }

    pub fn params(&self) -> &ForestParams {
        &self.params
    }

    pub fn n_trees(&self) -> usize {
        self.trees.len()
    }

    fn grow_tree(&self, index: usize, x: ArrayView2<f32>, targets: &[f64]) -> DecisionTree {
        let mut rng = StdRng::seed_from_u64(derive_seed(self.params.seed, index as u64));
        let n = x.nrows();
        let rows: Vec<usize> = if self.params.bootstrap {
            (0..n).map(|_| rng.gen_range(0..n)).collect()
        } else {
            (0..n).collect()
        };
        let tree_params = TreeParams {
            max_depth: self.params.max_depth,
            min_samples_split: self.params.min_samples_split,
            min_samples_leaf: self.params.min_samples_leaf,
            max_features: Some(sqrt_features(x.ncols())),
            criterion: self.params.criterion,
            splitter: self.params.splitter,
        };
        DecisionTree::grow(&tree_params, x, targets, &rows, &mut rng)
    }
}

impl Classifier for Forest {
    fn fit(&mut self, x: ArrayView2<f32>, y: &[u8]) -> Result<()> {
        validate_training_set(x, y)?;
        if self.params.n_estimators == 0 {
            return Err(RankError::Fit("forest needs at least one tree".to_string()));
        }

        let targets: Vec<f64> = y.iter().map(|&l| f64::from(l)).collect();
        let pool = rayon::ThreadPoolBuilder::new()
            .num_threads(self.params.n_jobs.max(1))
            .build()
            .map_err(|e| RankError::Fit(format!("failed to build thread pool: {e}")))?;

        let this = &*self;
        let trees: Vec<DecisionTree> = pool.install(|| {
            (0..this.params.n_estimators)
                .into_par_iter()
                .map(|i| this.grow_tree(i, x, &targets))
                .collect()
        });

        debug!(
            "Grew {} trees ({:?}, max_depth={}, n_jobs={})",
            trees.len(),
            self.params.splitter,
            self.params.max_depth,
            self.params.n_jobs
        );
        self.trees = trees;
        self.n_features = x.ncols();
        Ok(())
    }

    fn predict_proba(&self, x: ArrayView2<f32>) -> Result<Array1<f64>> {
        if !self.is_fitted() {
            return Err(RankError::Fit("forest is not fitted".to_string()));
        }
        check_width(self.n_features, x)?;

        let n_trees = self.trees.len() as f64;
        Ok(x.outer_iter()
            .map(|row| self.trees.iter().map(|t| t.predict_row(row)).sum::<f64>() / n_trees)
            .collect())
    }

    fn is_fitted(&self) -> bool {
        !self.trees.is_empty()
    }
}
