// Shared model plumbing: the classifier contract and label/metric helpers

use ndarray::{Array1, ArrayView2};
use rank_core::{RankError, Result};

/// Binary probabilistic classifier over a dense `f32` feature matrix.
pub trait Classifier {
    /// Train on rows of `x` with labels in {0, 1}.
    fn fit(&mut self, x: ArrayView2<f32>, y: &[u8]) -> Result<()>;

    /// Probability of the positive class for every row of `x`.
    fn predict_proba(&self, x: ArrayView2<f32>) -> Result<Array1<f64>>;

    fn is_fitted(&self) -> bool;

    /// Hard 0/1 predictions at the 0.5 cut.
    fn predict(&self, x: ArrayView2<f32>) -> Result<Vec<u8>> {
        Ok(self
            .predict_proba(x)?
            .iter()
            .map(|&p| u8::from(p >= 0.5))
            .collect())
    }
}

/// Checks a training set before any learner sees it.
///
/// Labels must be 0/1, both classes must occur and the matrix must match the
/// label count.
pub fn validate_training_set(x: ArrayView2<f32>, y: &[u8]) -> Result<()> {
    if x.nrows() != y.len() {
        return Err(RankError::Fit(format!(
            "feature matrix has {} rows but {} labels",
            x.nrows(),
            y.len()
        )));
    }
    if x.ncols() == 0 {
        return Err(RankError::Fit("feature matrix has no columns".to_string()));
    }
    if let Some(bad) = y.iter().find(|&&l| l > 1) {
        return Err(RankError::Fit(format!("label {bad} is not binary")));
    }
    let positives = y.iter().filter(|&&l| l == 1).count();
    if positives == 0 || positives == y.len() {
        return Err(RankError::Fit(
            "training labels contain a single class".to_string(),
        ));
    }
    Ok(())
}

pub fn check_width(expected: usize, x: ArrayView2<f32>) -> Result<()> {
    if x.ncols() != expected {
        return Err(RankError::Schema(format!(
            "model expects {} features, got {}",
            expected,
            x.ncols()
        )));
    }
    Ok(())
}

/// Fraction of predictions equal to the labels.
pub fn accuracy(predicted: &[u8], actual: &[u8]) -> f64 {
    if actual.is_empty() {
        return f64::NAN;
    }
    let hits = predicted
        .iter()
        .zip(actual)
        .filter(|(p, a)| p == a)
        .count();
    hits as f64 / actual.len() as f64
}

/// Features examined per split: `max(1, floor(sqrt(n)))`.
pub fn sqrt_features(n_features: usize) -> usize {
    ((n_features as f64).sqrt() as usize).max(1)
}

/// Independent RNG seed for stream `index` under a base seed (splitmix64).
pub fn derive_seed(seed: u64, index: u64) -> u64 {
    let mut z = seed
        .wrapping_add(index.wrapping_add(1).wrapping_mul(0x9E37_79B9_7F4A_7C15));
    z = (z ^ (z >> 30)).wrapping_mul(0xBF58_476D_1CE4_E5B9);
    z = (z ^ (z >> 27)).wrapping_mul(0x94D0_49BB_1331_11EB);
    z ^ (z >> 31)
}

pub fn sigmoid(x: f64) -> f64 {
    1.0 / (1.0 + (-x).exp())
}
