//! Weighted soft-voting ensemble and the trainer that builds it.

use chrono::{DateTime, Utc};
use ndarray::{Array1, ArrayView2};
use polars::prelude::DataFrame;
use rank_core::config::TrainingConfig;
use rank_core::{Outcome, RankError, Result};
use rank_data::frame::{feature_matrix, label_values};
use serde::{Deserialize, Serialize};
use tracing::{debug, info};
use uuid::Uuid;

use crate::base::{derive_seed, Classifier};
use crate::learner::{BaseLearner, LearnerKind, LearnerParams};
use crate::search::RandomizedSearch;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EnsembleMember {
    pub kind: LearnerKind,
    /// Normalized voting weight.
    pub weight: f64,
    pub params: LearnerParams,
    /// Mean cross-validated accuracy of `params`.
    pub cv_score: f64,
    pub learner: BaseLearner,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ModelMetadata {
    pub run_id: Uuid,
    pub trained_at: DateTime<Utc>,
    pub outcome: Outcome,
    pub training_rows: usize,
    pub seed: u64,
}

/// Soft-voting ensemble: the weighted mean of the members' positive-class
/// probabilities. Immutable once trained.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VotingEnsemble {
    members: Vec<EnsembleMember>,
    feature_names: Vec<String>,
    metadata: ModelMetadata,
}

impl VotingEnsemble {
    pub fn members(&self) -> &[EnsembleMember] {
        &self.members
    }

    pub fn feature_names(&self) -> &[String] {
        &self.feature_names
    }

    pub fn metadata(&self) -> &ModelMetadata {
        &self.metadata
    }

    pub fn outcome(&self) -> Outcome {
        self.metadata.outcome
    }

    pub fn predict_proba(&self, x: ArrayView2<f32>) -> Result<Array1<f64>> {
        let mut combined = Array1::<f64>::zeros(x.nrows());
        for member in &self.members {
            let proba = member.learner.predict_proba(x)?;
            combined.scaled_add(member.weight, &proba);
        }
        Ok(combined)
    }

    /// Probabilities for every row of `df`, projected onto the training features.
    pub fn predict_frame(&self, df: &DataFrame) -> Result<Array1<f64>> {
        let x = feature_matrix(df, &self.feature_names)?;
        self.predict_proba(x.view())
    }
}

/// Scale weights to sum to one.
pub fn normalize_weights(weights: &[f64]) -> Result<Vec<f64>> {
    let total: f64 = weights.iter().sum();
    if !(total > 0.0) || weights.iter().any(|w| *w < 0.0) {
        return Err(RankError::Configuration(format!(
            "ensemble weights must be non-negative with a positive sum, got {weights:?}"
        )));
    }
    Ok(weights.iter().map(|w| w / total).collect())
}

/// Searches, refits and combines the three learner families.
pub struct EnsembleTrainer<'a> {
    config: &'a TrainingConfig,
}

impl<'a> EnsembleTrainer<'a> {
    pub fn new(config: &'a TrainingConfig) -> Self {
        Self { config }
    }

    /// Train an ensemble for `outcome` on a balanced subset.
    pub fn train(
        &self,
        subset: &DataFrame,
        features: &[String],
        outcome: Outcome,
    ) -> Result<VotingEnsemble> {
        let x = feature_matrix(subset, features)?;
        let y = label_values(subset, outcome.column())?;
        self.train_matrix(x.view(), &y, features, outcome)
    }

    pub fn train_matrix(
        &self,
        x: ArrayView2<f32>,
        y: &[u8],
        features: &[String],
        outcome: Outcome,
    ) -> Result<VotingEnsemble> {
        crate::base::validate_training_set(x, y)?;
        crate::base::check_width(features.len(), x)?;
        let weights = normalize_weights(&self.config.ensemble_weights)?;
        let start = std::time::Instant::now();
        info!(
            "Training the {} ensemble on {} rows x {} features",
            outcome,
            x.nrows(),
            x.ncols()
        );

        let mut members = Vec::with_capacity(LearnerKind::ALL.len());
        for (index, (kind, weight)) in LearnerKind::ALL.into_iter().zip(weights).enumerate() {
            let seed = derive_seed(self.config.seed, index as u64);
            let search =
                RandomizedSearch::new(self.config.search_iterations, self.config.cv_folds, seed);
            let found = search.run(kind, kind.search_space(self.config), x, y)?;

            let mut learner = BaseLearner::new(kind, &found.best, seed);
            learner.fit(x, y)?;
            debug!("Refit {} with {}", kind, found.best);

            members.push(EnsembleMember {
                kind,
                weight,
                params: found.best,
                cv_score: found.best_score,
                learner,
            });
        }

        info!(
            "{} ensemble trained in {:.2}s",
            outcome,
            start.elapsed().as_secs_f64()
        );

        Ok(VotingEnsemble {
            members,
            feature_names: features.to_vec(),
            metadata: ModelMetadata {
                run_id: Uuid::new_v4(),
                trained_at: Utc::now(),
                outcome,
                training_rows: x.nrows(),
                seed: self.config.seed,
            },
        })
    }
}
