use anyhow::{Context, Result};
use rank_core::logging::setup_logging;
use rank_core::Settings;
use rank_models::pipeline;
use tracing::info;

fn main() -> Result<()> {
    let args: Vec<String> = std::env::args().collect();
    if args.len() < 2 {
        print_help();
        return Ok(());
    }
    match args[1].as_str() {
        "train" => cmd_train(&args[2..]),
        "predict" => cmd_predict(&args[2..]),
        "features" => cmd_features(&args[2..]),
        "config" => cmd_config(&args[2..]),
        _ => {
            print_help();
            Ok(())
        }
    }
}

fn cmd_train(args: &[String]) -> Result<()> {
    let _guard = setup_logging(has_flag(args, "--verbose"))?;
    let settings = load_settings(args)?;
    info!(
        "Training from {} (seed {})",
        settings.paths.train_path.display(),
        settings.training.seed
    );

    let models = pipeline::train(&settings).context("training failed")?;
    for model in &models {
        println!("{} model:", model.outcome());
        for member in model.members() {
            println!(
                "  {:<20} weight={:.2} cv_accuracy={:.4} {}",
                member.kind.to_string(),
                member.weight,
                member.cv_score,
                member.params
            );
        }
        println!(
            "  saved to {}",
            settings.paths.model_path(model.outcome()).display()
        );
    }
    Ok(())
}

fn cmd_predict(args: &[String]) -> Result<()> {
    let _guard = setup_logging(has_flag(args, "--verbose"))?;
    let settings = load_settings(args)?;

    let ranking = pipeline::predict(&settings).context("prediction failed")?;
    println!(
        "Ranked {} listings -> {}",
        ranking.len(),
        settings.paths.submission_path.display()
    );
    Ok(())
}

fn cmd_features(args: &[String]) -> Result<()> {
    rank_core::logging::setup_minimal_logging(has_flag(args, "--verbose"))?;
    let settings = load_settings(args)?;

    let features = pipeline::feature_columns(&settings)?;
    println!("Features ({}):", features.len());
    for name in features {
        println!("  {}", name);
    }
    Ok(())
}

fn cmd_config(args: &[String]) -> Result<()> {
    let settings = load_settings(args)?;
    let out = parse_flag(args, "--out").unwrap_or_else(|| "config.yaml".to_string());
    settings
        .save(&out)
        .with_context(|| format!("failed to write {out}"))?;
    println!("Settings written to {}", out);
    Ok(())
}

fn load_settings(args: &[String]) -> Result<Settings> {
    let mut settings = match parse_flag(args, "--config") {
        Some(path) => {
            let mut settings = Settings::from_yaml(&path)
                .with_context(|| format!("failed to read config {path}"))?;
            settings.apply_env_overrides()?;
            settings
        }
        None => Settings::load_with_env()?,
    };

    if let Some(seed) = parse_flag(args, "--seed") {
        settings.training.seed = seed
            .parse()
            .with_context(|| format!("--seed expects an integer, got {seed}"))?;
    }
    Ok(settings)
}

fn has_flag(args: &[String], name: &str) -> bool {
    args.iter().any(|a| a == name)
}

fn parse_flag(args: &[String], name: &str) -> Option<String> {
    let mut iter = args.iter();
    while let Some(arg) = iter.next() {
        if arg == name {
            return iter.next().cloned();
        }
    }
    None
}

fn print_help() {
    println!("rank-cli");
    println!("  train [--config config.yaml] [--seed 42] [--verbose]");
    println!("  predict [--config config.yaml] [--verbose]");
    println!("  features [--config config.yaml]");
    println!("  config [--config config.yaml] [--out config.yaml]");
    println!();
    println!("Environment: CONFIG_FILE, HOTEL_RANK_SEED, HOTEL_RANK_TRAIN_PATH, HOTEL_RANK_TEST_PATH, LOG_DIR, RUST_LOG");
}
