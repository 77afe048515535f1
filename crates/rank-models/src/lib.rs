//! Models for the hotel ranking pipeline.
//!
//! - `tree`: CART trees grown over row indices
//! - `forest` / `boosting`: the tree ensembles behind each base learner
//! - `learner`: the closed set of base-learner families
//! - `search`: randomized hyperparameter search with stratified k-fold CV
//! - `ensemble`: the soft-voting ensemble and its trainer
//! - `ranking`: per-search ordering from booking and click probabilities
//! - `pipeline`: load, train, persist and predict

pub mod base;
pub mod boosting;
pub mod ensemble;
pub mod forest;
pub mod learner;
pub mod pipeline;
pub mod ranking;
pub mod search;
pub mod tree;

pub use base::Classifier;
pub use ensemble::{EnsembleTrainer, VotingEnsemble};
pub use learner::{BaseLearner, LearnerKind, LearnerParams};
pub use ranking::{rank_entries, score_and_rank, ScoreEntry};
