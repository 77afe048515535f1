//! Gradient-boosted regression trees under the exponential (AdaBoost) loss.
//!
//! With labels mapped to `s = 2y - 1`, each stage fits a squared-error tree to
//! the negative gradient `s * exp(-s * f)` and then replaces every leaf value
//! with the Newton step `sum(s * exp(-s * f)) / sum(exp(-s * f))` over the rows
//! in that leaf. The positive-class probability is `sigmoid(2 f)`.

use ndarray::{Array1, ArrayView2};
use rand::rngs::StdRng;
use rand::SeedableRng;
use rank_core::{RankError, Result};
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::base::{check_width, derive_seed, sigmoid, sqrt_features, validate_training_set, Classifier};
use crate::tree::{Criterion, DecisionTree, Splitter, TreeParams};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BoostingParams {
    pub n_estimators: usize,
    pub learning_rate: f64,
    pub max_depth: usize,
    pub min_samples_split: usize,
    pub min_samples_leaf: usize,
    pub seed: u64,
}

impl BoostingParams {
    pub fn new(n_estimators: usize, max_depth: usize, min_samples_leaf: usize, seed: u64) -> Self {
        Self {
            n_estimators,
            learning_rate: 0.0008,
            max_depth,
            min_samples_split: 3,
            min_samples_leaf,
            seed,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GradientBoosting {
    params: BoostingParams,
    init: f64,
    stages: Vec<DecisionTree>,
    n_features: usize,
}

impl GradientBoosting {
    pub fn new(params: BoostingParams) -> Self {
        Self {
            params,
            init: 0.0,
            stages: Vec::new(),
            n_features: 0,
        }
    }

    pub fn params(&self) -> &BoostingParams {
        &self.params
    }

    pub fn n_stages(&self) -> usize {
        self.stages.len()
    }

    /// Raw additive score `f(x)` for every row.
    pub fn decision_function(&self, x: ArrayView2<f32>) -> Result<Array1<f64>> {
        if !self.is_fitted() {
            return Err(RankError::Fit("boosted model is not fitted".to_string()));
        }
        check_width(self.n_features, x)?;

        let lr = self.params.learning_rate;
        Ok(x.outer_iter()
            .map(|row| {
                self.init
                    + self
                        .stages
                        .iter()
                        .map(|t| lr * t.predict_row(row))
                        .sum::<f64>()
            })
            .collect())
    }
}

impl Classifier for GradientBoosting {
    fn fit(&mut self, x: ArrayView2<f32>, y: &[u8]) -> Result<()> {
        validate_training_set(x, y)?;
        if self.params.n_estimators == 0 {
            return Err(RankError::Fit("boosting needs at least one stage".to_string()));
        }

        let n = x.nrows();
        let signs: Vec<f64> = y.iter().map(|&l| 2.0 * f64::from(l) - 1.0).collect();
        let p = y.iter().filter(|&&l| l == 1).count() as f64 / n as f64;
        self.init = 0.5 * (p / (1.0 - p)).ln();

        let tree_params = TreeParams {
            max_depth: self.params.max_depth,
            min_samples_split: self.params.min_samples_split,
            min_samples_leaf: self.params.min_samples_leaf,
            max_features: Some(sqrt_features(x.ncols())),
            criterion: Criterion::SquaredError,
            splitter: Splitter::Best,
        };

        let rows: Vec<usize> = (0..n).collect();
        let mut raw = vec![self.init; n];
        let mut stages = Vec::with_capacity(self.params.n_estimators);

        for stage in 0..self.params.n_estimators {
            let weights: Vec<f64> = signs
                .iter()
                .zip(&raw)
                .map(|(s, f)| (-s * f).exp())
                .collect();
            let residuals: Vec<f64> = signs.iter().zip(&weights).map(|(s, w)| s * w).collect();

            let mut rng = StdRng::seed_from_u64(derive_seed(self.params.seed, stage as u64));
            let mut tree = DecisionTree::grow(&tree_params, x, &residuals, &rows, &mut rng);

            let leaves: Vec<usize> = x.outer_iter().map(|row| tree.leaf_index(row)).collect();
            let mut numerator = vec![0.0; tree.n_leaves()];
            let mut denominator = vec![0.0; tree.n_leaves()];
            for (i, &leaf) in leaves.iter().enumerate() {
                numerator[leaf] += residuals[i];
                denominator[leaf] += weights[i];
            }
            let values: Vec<f64> = numerator
                .iter()
                .zip(&denominator)
                .map(|(num, den)| if *den > 0.0 { num / den } else { 0.0 })
                .collect();
            for (leaf, &value) in values.iter().enumerate() {
                tree.set_leaf_value(leaf, value);
            }

            for (f, &leaf) in raw.iter_mut().zip(&leaves) {
                *f += self.params.learning_rate * values[leaf];
            }
            stages.push(tree);
        }

        debug!(
            "Boosted {} stages (max_depth={}, init={:.4})",
            stages.len(),
            self.params.max_depth,
            self.init
        );
        self.stages = stages;
        self.n_features = x.ncols();
        Ok(())
    }

    fn predict_proba(&self, x: ArrayView2<f32>) -> Result<Array1<f64>> {
        Ok(self.decision_function(x)?.mapv(|f| sigmoid(2.0 * f)))
    }

    fn is_fitted(&self) -> bool {
        !self.stages.is_empty()
    }
}
