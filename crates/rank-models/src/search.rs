//! Randomized hyperparameter search scored by stratified k-fold accuracy.

use ndarray::{ArrayView2, Axis};
use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rand::{Rng, SeedableRng};
use rank_core::config::{IntRange, ParamSpace};
use rank_core::{RankError, Result};
use tracing::{debug, info, warn};

use crate::base::{accuracy, Classifier};
use crate::learner::{BaseLearner, LearnerKind, LearnerParams};

/// Held-out row indices for each of `k` stratified folds.
///
/// Rows of each class are taken in their original order and cut into `k`
/// contiguous chunks whose sizes differ by at most one; no shuffling.
pub fn stratified_folds(y: &[u8], k: usize) -> Result<Vec<Vec<usize>>> {
    if k < 2 {
        return Err(RankError::Configuration(format!("need at least 2 folds, got {k}")));
    }
    if y.len() < k {
        return Err(RankError::InsufficientData(format!(
            "{} rows cannot fill {} folds",
            y.len(),
            k
        )));
    }

    let mut folds = vec![Vec::new(); k];
    for class in [0u8, 1] {
        let members: Vec<usize> = (0..y.len()).filter(|&i| y[i] == class).collect();
        if members.len() < k {
            return Err(RankError::InsufficientData(format!(
                "class {} has {} members, fewer than {} folds",
                class,
                members.len(),
                k
            )));
        }
        let base = members.len() / k;
        let extra = members.len() % k;
        let mut start = 0;
        for (fold, test) in folds.iter_mut().enumerate() {
            let size = base + usize::from(fold < extra);
            test.extend_from_slice(&members[start..start + size]);
            start += size;
        }
    }
    for fold in &mut folds {
        fold.sort_unstable();
    }
    Ok(folds)
}

fn draw(range: &IntRange, rng: &mut StdRng) -> usize {
    rng.gen_range(range.low..=range.high)
}

/// Draw one candidate from `space`; parameters the space leaves out keep
/// their defaults.
pub fn sample_params(space: &ParamSpace, rng: &mut StdRng) -> LearnerParams {
    let defaults = LearnerParams::default();
    let max_depth = space
        .max_depth
        .choose(rng)
        .copied()
        .unwrap_or(defaults.max_depth);
    let n_estimators = draw(&space.n_estimators, rng);
    let min_samples_leaf = space
        .min_samples_leaf
        .as_ref()
        .map_or(defaults.min_samples_leaf, |r| draw(r, rng));
    let n_jobs = space.n_jobs.as_ref().map_or(defaults.n_jobs, |r| draw(r, rng));
    LearnerParams {
        max_depth,
        n_estimators,
        min_samples_leaf,
        n_jobs,
    }
}

#[derive(Debug, Clone)]
pub struct Candidate {
    pub params: LearnerParams,
    pub fold_scores: Vec<f64>,
    pub mean_score: f64,
}

#[derive(Debug, Clone)]
pub struct SearchOutcome {
    pub kind: LearnerKind,
    pub best: LearnerParams,
    pub best_score: f64,
    pub candidates: Vec<Candidate>,
}

#[derive(Debug, Clone)]
pub struct RandomizedSearch {
    pub iterations: usize,
    pub folds: usize,
    pub seed: u64,
}

impl RandomizedSearch {
    pub fn new(iterations: usize, folds: usize, seed: u64) -> Self {
        Self {
            iterations,
            folds,
            seed,
        }
    }

    /// Mean held-out accuracy of one parameter set. A fold whose fit fails
    /// scores NaN.
    pub fn cross_validate(
        &self,
        kind: LearnerKind,
        params: &LearnerParams,
        x: ArrayView2<f32>,
        y: &[u8],
        folds: &[Vec<usize>],
    ) -> Vec<f64> {
        folds
            .iter()
            .map(|test| {
                let train: Vec<usize> = (0..y.len()).filter(|i| test.binary_search(i).is_err()).collect();
                let x_train = x.select(Axis(0), &train);
                let y_train: Vec<u8> = train.iter().map(|&i| y[i]).collect();
                let x_test = x.select(Axis(0), test);
                let y_test: Vec<u8> = test.iter().map(|&i| y[i]).collect();

                let mut learner = BaseLearner::new(kind, params, self.seed);
                let score = learner
                    .fit(x_train.view(), &y_train)
                    .and_then(|_| learner.predict(x_test.view()));
                match score {
                    Ok(pred) => accuracy(&pred, &y_test),
                    Err(e) => {
                        warn!("{} fold fit failed ({}): {}", kind, params, e);
                        f64::NAN
                    }
                }
            })
            .collect()
    }

    /// Score `iterations` random candidates and keep the best mean accuracy.
    /// The earliest candidate wins ties.
    pub fn run(
        &self,
        kind: LearnerKind,
        space: &ParamSpace,
        x: ArrayView2<f32>,
        y: &[u8],
    ) -> Result<SearchOutcome> {
        let folds = stratified_folds(y, self.folds)?;
        let mut rng = StdRng::seed_from_u64(self.seed);
        let start = std::time::Instant::now();

        let mut candidates = Vec::with_capacity(self.iterations);
        let mut best: Option<(usize, f64)> = None;
        for i in 0..self.iterations {
            let params = sample_params(space, &mut rng);
            let fold_scores = self.cross_validate(kind, &params, x, y, &folds);
            let mean_score = fold_scores.iter().sum::<f64>() / fold_scores.len() as f64;
            debug!("{} candidate {}: {} -> {:.4}", kind, i, params, mean_score);

            if mean_score.is_finite() && best.map_or(true, |(_, score)| mean_score > score) {
                best = Some((i, mean_score));
            }
            candidates.push(Candidate {
                params,
                fold_scores,
                mean_score,
            });
        }

        let Some((best, _)) = best else {
            return Err(RankError::Fit(format!(
                "no {kind} candidate produced a finite cross-validation score"
            )));
        };

        let winner = &candidates[best];
        info!(
            "{} search: best {} (accuracy {:.4}) after {} candidates, {:.2}s",
            kind,
            winner.params,
            winner.mean_score,
            candidates.len(),
            start.elapsed().as_secs_f64()
        );

        Ok(SearchOutcome {
            kind,
            best: winner.params,
            best_score: winner.mean_score,
            candidates,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::Array2;

    #[test]
    fn test_stratified_folds_no_shuffle() {
        let y = [0, 0, 1, 0, 1, 1, 0, 1, 0, 1];
        let folds = stratified_folds(&y, 3).unwrap();
        assert_eq!(folds.len(), 3);
        // zeros: 0,1,3,6,8 -> [0,1] [3,6] [8]; ones: 2,4,5,7,9 -> [2,4] [5,7] [9]
        assert_eq!(folds[0], vec![0, 1, 2, 4]);
        assert_eq!(folds[1], vec![3, 5, 6, 7]);
        assert_eq!(folds[2], vec![8, 9]);
    }

    #[test]
    fn test_stratified_folds_insufficient() {
        assert!(matches!(stratified_folds(&[0, 1], 3), Err(RankError::InsufficientData(_))));
        assert!(matches!(
            stratified_folds(&[0, 0, 0, 0, 1, 1], 3),
            Err(RankError::InsufficientData(_))
        ));
    }

    #[test]
    fn test_sample_params_within_space() {
        let space = ParamSpace::bagged_default();
        let mut rng = StdRng::seed_from_u64(1);
        for _ in 0..50 {
            let p = sample_params(&space, &mut rng);
            assert!(p.max_depth == 2 || p.max_depth == 8);
            assert!((1..=99).contains(&p.n_estimators));
            assert!((1..=9).contains(&p.min_samples_leaf));
            assert_eq!(p.n_jobs, 1);
        }

        let extra = ParamSpace::extra_default();
        let p = sample_params(&extra, &mut rng);
        assert_eq!(p.min_samples_leaf, 1);
        assert!((1..=99).contains(&p.n_jobs));
    }

    #[test]
    fn test_search_is_deterministic() {
        let x = Array2::from_shape_fn((30, 4), |(i, j)| ((i * (j + 3)) % 17) as f32 + if j == 0 { i as f32 } else { 0.0 });
        let y: Vec<u8> = (0..30).map(|i| u8::from(i % 2 == 0 || i > 24)).collect();
        let space = ParamSpace {
            max_depth: vec![2, 8],
            n_estimators: IntRange::new(1, 5),
            min_samples_leaf: Some(IntRange::new(1, 3)),
            n_jobs: None,
        };
        let search = RandomizedSearch::new(4, 3, 42);
        let a = search.run(LearnerKind::BaggedTrees, &space, x.view(), &y).unwrap();
        let b = search.run(LearnerKind::BaggedTrees, &space, x.view(), &y).unwrap();

        assert_eq!(a.candidates.len(), 4);
        assert_eq!(a.best, b.best);
        assert_eq!(a.best_score, b.best_score);
        let max = a.candidates.iter().map(|c| c.mean_score).fold(f64::MIN, f64::max);
        assert_eq!(a.best_score, max);
        let first_best = a.candidates.iter().position(|c| c.mean_score == max).unwrap();
        assert_eq!(a.best, a.candidates[first_best].params);
    }
}
