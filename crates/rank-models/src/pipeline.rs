// End-to-end training and inference runs

use polars::prelude::DataFrame;
use rand::rngs::StdRng;
use rand::SeedableRng;
use rank_core::{DatasetKind, ModelStore, Outcome, RankError, Result, Settings};
use rank_data::frame::{count_missing, label_values};
use rank_data::schema::{BOOKED, CLICKED};
use rank_data::{
    balance, load_dataset, sample_rows, select_features, write_ranking, DatasetSchema,
    FeatureTransformer,
};
use tracing::{debug, info, warn};

use crate::ensemble::{EnsembleTrainer, VotingEnsemble};
use crate::ranking::score_and_rank;

/// Enrich `df` in place and return its feature list under `schema`.
pub fn prepare(df: &mut DataFrame, schema: &DatasetSchema, rng: &mut StdRng) -> Result<Vec<String>> {
    let summary = FeatureTransformer::new().transform(df, rng)?;
    for fill in summary.affinity.iter().chain(&summary.distance) {
        info!(
            "'{}' imputed {} rows of support '{}' with {:.4}",
            fill.target, fill.filled, fill.support, fill.value
        );
    }

    let missing = count_missing(df);
    if missing == 0 {
        info!("No missing values after feature engineering");
    } else {
        warn!("{} missing values remain after feature engineering", missing);
    }

    let features = select_features(df, schema)?;
    info!("Using {} features", features.len());
    Ok(features)
}

/// Count rows booked without a click. The relation is expected, never enforced.
pub fn booked_without_click(df: &DataFrame) -> Result<usize> {
    let booked = label_values(df, BOOKED)?;
    let clicked = label_values(df, CLICKED)?;
    Ok(booked
        .iter()
        .zip(&clicked)
        .filter(|(b, c)| **b == 1 && **c == 0)
        .count())
}

/// Train the booking model then the click model on an already loaded frame.
pub fn train_frame(mut df: DataFrame, settings: &Settings) -> Result<Vec<VotingEnsemble>> {
    let mut rng = StdRng::seed_from_u64(settings.training.seed);
    let schema = DatasetSchema::of(&df);
    if !schema.is_labelled() {
        return Err(RankError::Schema(format!(
            "training data needs both '{}' and '{}' columns",
            Outcome::Book.column(),
            Outcome::Click.column()
        )));
    }
    prepare(&mut df, &schema, &mut rng)?;

    let violations = booked_without_click(&df)?;
    if violations > 0 {
        debug!("{} rows are booked but not clicked", violations);
    }

    let sample = match settings.data.sample_limit() {
        Some(n) => sample_rows(&df, n, &mut rng)?,
        None => df,
    };
    info!("Training sample: {} rows", sample.height());

    let trainer = EnsembleTrainer::new(&settings.training);
    let mut models = Vec::with_capacity(Outcome::ALL.len());
    for outcome in Outcome::ALL {
        info!("Training the {} classifier...", outcome);
        let balanced = balance(&sample, outcome, &mut rng)?;
        let features = select_features(&balanced, &schema)?;
        models.push(trainer.train(&balanced, &features, outcome)?);
    }
    Ok(models)
}

/// Load the training set, train both models and persist them.
pub fn train(settings: &Settings) -> Result<Vec<VotingEnsemble>> {
    let start = std::time::Instant::now();
    let df = load_dataset(DatasetKind::Train, settings)?;
    let models = train_frame(df, settings)?;

    let store = ModelStore::from_paths(&settings.paths);
    for model in &models {
        store.save(model, model.outcome())?;
    }
    info!("Training finished in {:.2}s", start.elapsed().as_secs_f64());
    Ok(models)
}

/// Rank an already loaded inference frame with both models.
pub fn rank_frame(
    mut df: DataFrame,
    settings: &Settings,
    click_model: &VotingEnsemble,
    book_model: &VotingEnsemble,
) -> Result<Vec<(i64, i64)>> {
    let mut rng = StdRng::seed_from_u64(settings.training.seed);
    let schema = DatasetSchema::of(&df);
    let features = prepare(&mut df, &schema, &mut rng)?;
    score_and_rank(&df, &features, click_model, book_model)
}

/// Load the test set and both persisted models, rank, and write the ranking.
pub fn predict(settings: &Settings) -> Result<Vec<(i64, i64)>> {
    let start = std::time::Instant::now();
    let store = ModelStore::from_paths(&settings.paths);
    let book_model: VotingEnsemble = store.load(Outcome::Book)?;
    let click_model: VotingEnsemble = store.load(Outcome::Click)?;

    let df = load_dataset(DatasetKind::Test, settings)?;
    let ranking = rank_frame(df, settings, &click_model, &book_model)?;
    write_ranking(&ranking, &settings.paths.submission_path)?;

    info!("Prediction finished in {:.2}s", start.elapsed().as_secs_f64());
    Ok(ranking)
}

/// Canonical feature list of the configured training set.
pub fn feature_columns(settings: &Settings) -> Result<Vec<String>> {
    let mut df = load_dataset(DatasetKind::Train, settings)?;
    let mut rng = StdRng::seed_from_u64(settings.training.seed);
    let schema = DatasetSchema::of(&df);
    prepare(&mut df, &schema, &mut rng)
}
