// Integration tests for the training and ranking pipeline
// Synthetic search/listing data goes through the same path the CLI uses

use std::fs::File;
use std::path::Path;

use polars::prelude::*;
use rand::rngs::StdRng;
use rand::SeedableRng;
use rank_core::config::{IntRange, ParamSpace, TrainingConfig};
use rank_core::{ModelStore, Outcome, RankError, Settings};
use rank_data::frame::{feature_matrix, id_values, label_values};
use rank_data::schema::*;
use rank_data::{balance, select_features, DatasetSchema, FeatureTransformer};
use rank_models::{pipeline, VotingEnsemble};
use tempfile::TempDir;

fn gappy(n: usize, every: usize, f: impl Fn(usize) -> f64) -> Vec<Option<f64>> {
    (0..n)
        .map(|i| if i % every == every - 1 { None } else { Some(f(i)) })
        .collect()
}

/// Raw export with five listings per search; labels depend on price and score.
fn raw_frame(n: usize, labelled: bool) -> DataFrame {
    let price: Vec<f64> = (0..n).map(|i| 60.0 + ((i * 37) % 90) as f64).collect();
    let booked: Vec<i64> = (0..n).map(|i| i64::from(i % 4 == 0)).collect();
    let clicked: Vec<i64> = (0..n).map(|i| i64::from(i % 4 == 0 || i % 3 == 0)).collect();

    let mut columns = vec![
        Column::new(SEARCH_ID.into(), (0..n).map(|i| (i / 5) as i64 + 100).collect::<Vec<_>>()),
        Column::new(
            DATE_TIME.into(),
            (0..n)
                .map(|i| format!("2013-{:02}-{:02} {:02}:{:02}:{:02}", 1 + i % 12, 1 + i % 28, i % 24, i % 60, i % 60))
                .collect::<Vec<_>>(),
        ),
        Column::new(SITE_ID.into(), (0..n).map(|i| (i % 4) as i64 + 1).collect::<Vec<_>>()),
        Column::new(VISITOR_COUNTRY_ID.into(), (0..n).map(|i| [219i64, 100, 55][i % 3]).collect::<Vec<_>>()),
        Column::new(VISITOR_STARRATING.into(), gappy(n, 2, |i| 3.0 + (i % 2) as f64)),
        Column::new(VISITOR_ADR.into(), gappy(n, 3, |i| 120.0 + (i % 10) as f64)),
        Column::new(PROP_COUNTRY_ID.into(), (0..n).map(|i| (i % 3) as i64 + 200).collect::<Vec<_>>()),
        Column::new(LISTING_ID.into(), (0..n).map(|i| 5000 + ((i * 7) % n) as i64).collect::<Vec<_>>()),
        Column::new("prop_starrating".into(), (0..n).map(|i| (i % 5) as i64 + 1).collect::<Vec<_>>()),
        Column::new(REVIEW_SCORE.into(), gappy(n, 7, |i| 3.0 + (i % 5) as f64 * 0.5)),
        Column::new("prop_location_score1".into(), (0..n).map(|i| 1.5 + (i % 6) as f64 * 0.4).collect::<Vec<_>>()),
        Column::new(LOCATION_SCORE2.into(), gappy(n, 4, |i| 0.02 * (i % 8) as f64)),
        Column::new(HISTORICAL_PRICE.into(), (0..n).map(|i| if i % 6 == 0 { 0.0 } else { 4.8 }).collect::<Vec<_>>()),
        Column::new("price_usd".into(), price),
        Column::new(DESTINATION_ID.into(), (0..n).map(|i| 9000 + (i % 6) as i64).collect::<Vec<_>>()),
        Column::new(AFFINITY_SCORE.into(), gappy(n, 3, |i| -30.0 + (i % 17) as f64)),
        Column::new(DISTANCE.into(), gappy(n, 5, |i| 200.0 + ((i * 13) % 500) as f64)),
    ];
    for c in 1..=N_COMPETITORS {
        columns.push(Column::new(comp_rate_column(c).into(), gappy(n, 3, |i| ((i + c) % 3) as f64 - 1.0)));
        columns.push(Column::new(comp_inv_column(c).into(), gappy(n, 4, |i| ((i * c) % 3) as f64 - 1.0)));
        columns.push(Column::new(comp_diff_column(c).into(), gappy(n, 2, |i| 3.0 + (i % 9) as f64)));
    }
    if labelled {
        columns.push(Column::new(POSITION.into(), (0..n).map(|i| (i % 5) as i64 + 1).collect::<Vec<_>>()));
        columns.push(Column::new(CLICKED.into(), clicked));
        columns.push(Column::new(
            GROSS_BOOKINGS.into(),
            booked.iter().map(|&b| (b == 1).then_some(210.5)).collect::<Vec<_>>(),
        ));
        columns.push(Column::new(BOOKED.into(), booked));
    }
    DataFrame::new(columns).unwrap()
}

fn quick_settings(dir: &Path) -> Settings {
    let space = |jobs: Option<IntRange>, leaf: Option<IntRange>| ParamSpace {
        max_depth: vec![2, 8],
        n_estimators: IntRange::new(1, 4),
        min_samples_leaf: leaf,
        n_jobs: jobs,
    };
    let mut settings = Settings::default();
    settings.training = TrainingConfig {
        search_iterations: 2,
        bagged_space: space(None, Some(IntRange::new(1, 3))),
        boosted_space: space(None, Some(IntRange::new(1, 3))),
        extra_space: space(Some(IntRange::new(1, 2)), None),
        ..TrainingConfig::default()
    };
    settings.paths.train_path = dir.join("train.csv");
    settings.paths.test_path = dir.join("test.csv");
    settings.paths.model_path_book = dir.join("models").join("book.json");
    settings.paths.model_path_click = dir.join("models").join("click.json");
    settings.paths.submission_path = dir.join("out").join("submission.csv");
    settings
}

fn write_csv(df: &mut DataFrame, path: &Path) {
    let mut file = File::create(path).unwrap();
    CsvWriter::new(&mut file).include_header(true).finish(df).unwrap();
}

#[test]
fn test_training_is_deterministic_for_fixed_seed() {
    let dir = TempDir::new().unwrap();
    let settings = quick_settings(dir.path());

    let first = pipeline::train_frame(raw_frame(120, true), &settings).unwrap();
    let second = pipeline::train_frame(raw_frame(120, true), &settings).unwrap();

    assert_eq!(first.len(), 2);
    assert_eq!(first[0].outcome(), Outcome::Book);
    assert_eq!(first[1].outcome(), Outcome::Click);

    let mut test = raw_frame(40, false);
    let mut rng = StdRng::seed_from_u64(1);
    FeatureTransformer::new().transform(&mut test, &mut rng).unwrap();
    for (a, b) in first.iter().zip(&second) {
        let params_a: Vec<_> = a.members().iter().map(|m| m.params).collect();
        let params_b: Vec<_> = b.members().iter().map(|m| m.params).collect();
        assert_eq!(params_a, params_b);
        assert_eq!(a.predict_frame(&test).unwrap(), b.predict_frame(&test).unwrap());
    }
}

#[test]
fn test_training_without_position_or_revenue() {
    let dir = TempDir::new().unwrap();
    let settings = quick_settings(dir.path());

    let full = pipeline::train_frame(raw_frame(120, true), &settings).unwrap();
    let trimmed = raw_frame(120, true).drop_many([POSITION, GROSS_BOOKINGS]);
    let models = pipeline::train_frame(trimmed, &settings).unwrap();

    assert_eq!(models.len(), 2);
    for (model, reference) in models.iter().zip(&full) {
        assert_eq!(model.feature_names(), reference.feature_names());
        assert!(!model.feature_names().iter().any(|f| f == POSITION || f == GROSS_BOOKINGS));
    }
}

#[test]
fn test_training_requires_both_labels() {
    let dir = TempDir::new().unwrap();
    let settings = quick_settings(dir.path());

    let unlabelled = raw_frame(60, true).drop_many([BOOKED]);
    assert!(matches!(
        pipeline::train_frame(unlabelled, &settings),
        Err(RankError::Schema(_))
    ));
}

#[test]
fn test_balanced_subset_has_equal_classes() {
    let mut df = raw_frame(120, true);
    let mut rng = StdRng::seed_from_u64(42);
    FeatureTransformer::new().transform(&mut df, &mut rng).unwrap();

    for outcome in Outcome::ALL {
        let positives = label_values(&df, outcome.column())
            .unwrap()
            .iter()
            .filter(|&&l| l == 1)
            .count();
        let balanced = balance(&df, outcome, &mut rng).unwrap();
        let labels = label_values(&balanced, outcome.column()).unwrap();
        assert_eq!(balanced.height(), 2 * positives);
        assert_eq!(labels.iter().filter(|&&l| l == 1).count(), positives);
    }
}

#[test]
fn test_feature_list_is_shared_between_train_and_test() {
    let mut rng = StdRng::seed_from_u64(0);
    let mut train = raw_frame(60, true);
    let mut test = raw_frame(25, false);
    let transformer = FeatureTransformer::new();
    transformer.transform(&mut train, &mut rng).unwrap();
    transformer.transform(&mut test, &mut rng).unwrap();

    let train_features = select_features(&train, &DatasetSchema::of(&train)).unwrap();
    let test_features = select_features(&test, &DatasetSchema::inference()).unwrap();
    assert_eq!(train_features, test_features);

    let matrix = feature_matrix(&test, &test_features).unwrap();
    assert_eq!(matrix.shape(), &[25, test_features.len()]);
}

#[test]
fn test_train_then_predict_through_files() {
    let dir = TempDir::new().unwrap();
    let settings = quick_settings(dir.path());
    write_csv(&mut raw_frame(150, true), &settings.paths.train_path);
    let mut test = raw_frame(35, false);
    write_csv(&mut test, &settings.paths.test_path);

    let models = pipeline::train(&settings).unwrap();
    assert!(settings.paths.model_path_book.exists());
    assert!(settings.paths.model_path_click.exists());

    let store = ModelStore::from_paths(&settings.paths);
    let reloaded: VotingEnsemble = store.load(Outcome::Book).unwrap();
    assert_eq!(reloaded.feature_names(), models[0].feature_names());
    assert_eq!(reloaded.metadata().run_id, models[0].metadata().run_id);

    let ranking = pipeline::predict(&settings).unwrap();
    assert_eq!(ranking.len(), 35);

    // Searches appear in first-appearance order, each as one contiguous block.
    let expected_searches: Vec<i64> = {
        let ids = id_values(&test, SEARCH_ID).unwrap();
        let mut seen = Vec::new();
        for id in ids {
            if !seen.contains(&id) {
                seen.push(id);
            }
        }
        seen
    };
    let mut blocks: Vec<i64> = ranking.iter().map(|p| p.0).collect();
    blocks.dedup();
    assert_eq!(blocks, expected_searches);

    let mut listed: Vec<i64> = ranking.iter().map(|p| p.1).collect();
    let mut expected_listings = id_values(&test, LISTING_ID).unwrap();
    listed.sort_unstable();
    expected_listings.sort_unstable();
    assert_eq!(listed, expected_listings);

    let text = std::fs::read_to_string(&settings.paths.submission_path).unwrap();
    assert_eq!(text.lines().next(), Some("SearchId,PropertyId"));
    assert_eq!(text.lines().count(), 36);
}

#[test]
fn test_predict_without_models_fails() {
    let dir = TempDir::new().unwrap();
    let settings = quick_settings(dir.path());
    write_csv(&mut raw_frame(10, false), &settings.paths.test_path);
    assert!(pipeline::predict(&settings).is_err());
}
