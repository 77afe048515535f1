// Core configuration structures for the ranking pipeline

use serde::{Deserialize, Serialize};
use std::path::PathBuf;

use crate::domain::{DatasetKind, Outcome, RankError, Result};

/// Locations of every file the pipeline reads or writes
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct PathsConfig {
    pub train_path: PathBuf,
    pub test_path: PathBuf,
    pub model_path_book: PathBuf,
    pub model_path_click: PathBuf,
    pub submission_path: PathBuf,
}

impl Default for PathsConfig {
    fn default() -> Self {
        Self {
            train_path: PathBuf::from("data/train.csv"),
            test_path: PathBuf::from("data/test.csv"),
            model_path_book: PathBuf::from("models/model_book.json"),
            model_path_click: PathBuf::from("models/model_click.json"),
            submission_path: PathBuf::from("output/submission.csv"),
        }
    }
}

impl PathsConfig {
    pub fn dataset_path(&self, kind: DatasetKind) -> &PathBuf {
        match kind {
            DatasetKind::Train => &self.train_path,
            DatasetKind::Test => &self.test_path,
        }
    }

    pub fn model_path(&self, outcome: Outcome) -> &PathBuf {
        match outcome {
            Outcome::Book => &self.model_path_book,
            Outcome::Click => &self.model_path_click,
        }
    }
}

/// Dataset loading and pre-sampling
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct DataConfig {
    /// Rows read from each CSV file; 0 reads everything.
    pub max_rows: usize,
    /// Rows drawn from the enriched training set before balancing; 0 keeps all.
    pub train_sample_rows: usize,
}

impl Default for DataConfig {
    fn default() -> Self {
        Self {
            max_rows: 10_000,
            train_sample_rows: 1_000,
        }
    }
}

impl DataConfig {
    pub fn row_limit(&self) -> Option<usize> {
        (self.max_rows > 0).then_some(self.max_rows)
    }

    pub fn sample_limit(&self) -> Option<usize> {
        (self.train_sample_rows > 0).then_some(self.train_sample_rows)
    }
}

/// Inclusive integer range sampled uniformly during hyperparameter search
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct IntRange {
    pub low: usize,
    pub high: usize,
}

impl IntRange {
    pub const fn new(low: usize, high: usize) -> Self {
        Self { low, high }
    }

    pub fn is_valid(&self) -> bool {
        self.low >= 1 && self.low <= self.high
    }
}

/// Hyperparameter distributions searched for one learner family.
/// `None` keeps the learner's fixed value for that parameter.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ParamSpace {
    pub max_depth: Vec<usize>,
    pub n_estimators: IntRange,
    pub min_samples_leaf: Option<IntRange>,
    pub n_jobs: Option<IntRange>,
}

impl ParamSpace {
    pub fn bagged_default() -> Self {
        Self {
            max_depth: vec![2, 8],
            n_estimators: IntRange::new(1, 99),
            min_samples_leaf: Some(IntRange::new(1, 9)),
            n_jobs: None,
        }
    }

    pub fn boosted_default() -> Self {
        Self {
            max_depth: vec![2, 8],
            n_estimators: IntRange::new(1, 999),
            min_samples_leaf: Some(IntRange::new(1, 9)),
            n_jobs: None,
        }
    }

    pub fn extra_default() -> Self {
        Self {
            max_depth: vec![2, 8],
            n_estimators: IntRange::new(1, 99),
            min_samples_leaf: None,
            n_jobs: Some(IntRange::new(1, 99)),
        }
    }

    fn validate(&self, family: &str) -> Result<()> {
        if self.max_depth.is_empty() || self.max_depth.iter().any(|&d| d == 0) {
            return Err(RankError::Configuration(format!(
                "{family}: max_depth choices must be non-empty and positive"
            )));
        }
        let ranges = [Some(self.n_estimators), self.min_samples_leaf, self.n_jobs];
        if ranges.iter().flatten().any(|r| !r.is_valid()) {
            return Err(RankError::Configuration(format!(
                "{family}: ranges must satisfy 1 <= low <= high"
            )));
        }
        Ok(())
    }
}

/// Ensemble training configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct TrainingConfig {
    pub seed: u64,
    pub cv_folds: usize,
    pub search_iterations: usize,
    /// Relative voting weights, bagged:boosted:extra.
    pub ensemble_weights: [f64; 3],
    pub bagged_space: ParamSpace,
    pub boosted_space: ParamSpace,
    pub extra_space: ParamSpace,
}

impl Default for TrainingConfig {
    fn default() -> Self {
        Self {
            seed: 42,
            cv_folds: 3,
            search_iterations: 10,
            ensemble_weights: [3.0, 5.0, 2.0],
            bagged_space: ParamSpace::bagged_default(),
            boosted_space: ParamSpace::boosted_default(),
            extra_space: ParamSpace::extra_default(),
        }
    }
}

impl TrainingConfig {
    pub fn validate(&self) -> Result<()> {
        if self.cv_folds < 2 {
            return Err(RankError::Configuration(format!(
                "cv_folds must be at least 2, got {}",
                self.cv_folds
            )));
        }
        if self.search_iterations == 0 {
            return Err(RankError::Configuration(
                "search_iterations must be positive".to_string(),
            ));
        }
        let total: f64 = self.ensemble_weights.iter().sum();
        if self.ensemble_weights.iter().any(|w| !w.is_finite() || *w < 0.0) || total <= 0.0 {
            return Err(RankError::Configuration(format!(
                "ensemble_weights must be non-negative with a positive sum, got {:?}",
                self.ensemble_weights
            )));
        }
        self.bagged_space.validate("bagged_space")?;
        self.boosted_space.validate("boosted_space")?;
        self.extra_space.validate("extra_space")?;
        Ok(())
    }
}

/// Main settings structure
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Settings {
    pub paths: PathsConfig,
    pub data: DataConfig,
    pub training: TrainingConfig,
}

impl Settings {
    /// Load settings from YAML config file
    pub fn from_yaml(path: impl AsRef<std::path::Path>) -> Result<Self> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path)?;
        let settings: Settings = serde_yaml_ng::from_str(&content).map_err(|e| {
            RankError::Configuration(format!("{}: {}", path.display(), e))
        })?;
        settings.training.validate()?;
        Ok(settings)
    }

    /// Load settings from environment variable CONFIG_FILE or default config.yaml.
    /// A missing default file yields the built-in defaults.
    pub fn load() -> Result<Self> {
        match std::env::var("CONFIG_FILE") {
            Ok(config_file) => Self::from_yaml(config_file),
            Err(_) => {
                let default_file = std::path::Path::new("config.yaml");
                if default_file.exists() {
                    Self::from_yaml(default_file)
                } else {
                    Ok(Self::default())
                }
            }
        }
    }

    /// Load settings with environment variable overrides
    pub fn load_with_env() -> Result<Self> {
        let mut settings = Self::load()?;
        settings.apply_env_overrides()?;
        Ok(settings)
    }

    pub fn apply_env_overrides(&mut self) -> Result<()> {
        if let Ok(seed) = std::env::var("HOTEL_RANK_SEED") {
            self.training.seed = seed.trim().parse().map_err(|_| {
                RankError::Configuration(format!("HOTEL_RANK_SEED is not an integer: {seed}"))
            })?;
        }

        if let Ok(path) = std::env::var("HOTEL_RANK_TRAIN_PATH") {
            self.paths.train_path = PathBuf::from(path);
        }

        if let Ok(path) = std::env::var("HOTEL_RANK_TEST_PATH") {
            self.paths.test_path = PathBuf::from(path);
        }

        Ok(())
    }

    /// Save settings to YAML file
    pub fn save(&self, path: impl AsRef<std::path::Path>) -> Result<()> {
        let yaml = serde_yaml_ng::to_string(self)
            .map_err(|e| RankError::Configuration(e.to_string()))?;
        std::fs::write(path, yaml)?;
        Ok(())
    }
}
