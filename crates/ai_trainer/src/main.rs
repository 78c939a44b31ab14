//! ProfileGuard trainer CLI
//!
//! Trains the profile classifier from a dataset directory and writes the
//! scaler/model artifact pair.

use anyhow::{Context, Result};
use clap::Parser;
use profileguard_ai_core::ClassWeight;
use profileguard_ai_trainer::{DatasetPreparer, TrainingParams, TrainingPipeline};
use std::path::PathBuf;
use tracing::info;
use tracing_subscriber::{EnvFilter, FmtSubscriber};

#[derive(Parser, Debug)]
#[command(name = "profileguard-train")]
#[command(author = "ProfileGuard Contributors")]
#[command(version = env!("CARGO_PKG_VERSION"))]
#[command(about = "Train the fake/real profile classifier", long_about = None)]
struct Args {
    /// Directory holding the labelled dataset (first .csv file is used)
    #[arg(short, long)]
    input: PathBuf,

    /// Output directory for the artifact pair
    #[arg(short, long, default_value = "models/profileguard")]
    output: PathBuf,

    /// TOML file with training parameters
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Number of trees
    #[arg(long)]
    trees: Option<usize>,

    /// Maximum tree depth
    #[arg(long)]
    max_depth: Option<usize>,

    /// Random seed for splitting and bagging
    #[arg(long)]
    seed: Option<i64>,

    /// Held-out fraction of every class
    #[arg(long)]
    test_fraction: Option<f64>,

    /// Features tried per split (default: sqrt of the feature count)
    #[arg(long)]
    max_features: Option<usize>,

    /// Weight every row equally instead of balancing classes
    #[arg(long)]
    no_balance: bool,

    /// Write the training report as JSON to this file
    #[arg(long)]
    report: Option<PathBuf>,

    /// Verbose logging
    #[arg(short, long)]
    verbose: bool,
}

impl Args {
    fn training_params(&self) -> Result<TrainingParams> {
        let mut params = match &self.config {
            Some(path) => TrainingParams::load_from_file(path)
                .with_context(|| format!("Failed to load config {}", path.display()))?,
            None => TrainingParams::default(),
        };
        params.apply_env();

        if let Some(trees) = self.trees {
            params.tree_count = trees;
        }
        if let Some(depth) = self.max_depth {
            params.max_depth = depth;
        }
        if let Some(seed) = self.seed {
            params.seed = seed;
        }
        if let Some(fraction) = self.test_fraction {
            params.test_fraction = fraction;
        }
        if self.max_features.is_some() {
            params.max_features = self.max_features;
        }
        if self.no_balance {
            params.class_weight = ClassWeight::Uniform;
        }

        params.validate().context("Invalid training parameters")?;
        Ok(params)
    }
}

fn main() -> Result<()> {
    let args = Args::parse();

    let default_level = if args.verbose { "debug" } else { "info" };
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));
    let subscriber = FmtSubscriber::builder()
        .with_env_filter(filter)
        .with_target(false)
        .finish();

    tracing::subscriber::set_global_default(subscriber)
        .context("Failed to set tracing subscriber")?;

    info!("ProfileGuard Trainer v{}", env!("CARGO_PKG_VERSION"));

    let params = args.training_params()?;
    info!(
        trees = params.tree_count,
        max_depth = params.max_depth,
        seed = params.seed,
        test_fraction = params.test_fraction,
        class_weight = ?params.class_weight,
        "training configuration"
    );

    let preparer = DatasetPreparer::new(&args.input);
    let mut pipeline = TrainingPipeline::new(params);
    let report = pipeline
        .run(&preparer, &args.output)
        .with_context(|| format!("Training failed at stage {}", pipeline.stage()))?;

    let [real, fake] = report.evaluation.support();
    info!(
        rows = report.rows,
        skipped = report.skipped_rows,
        train = report.train_rows,
        test = report.test_rows,
        "dataset summary"
    );
    info!(
        accuracy = %format!("{:.4}", report.evaluation.accuracy),
        real_support = real,
        fake_support = fake,
        "evaluation"
    );
    info!(
        output = %args.output.display(),
        model_hash = %report.manifest.model_hash,
        scaler_hash = %report.manifest.scaler_hash,
        "training completed"
    );

    if let Some(path) = &args.report {
        let json = serde_json::to_string_pretty(&report).context("Failed to encode report")?;
        std::fs::write(path, json)
            .with_context(|| format!("Failed to write report {}", path.display()))?;
        info!(path = %path.display(), "report written");
    }

    Ok(())
}
