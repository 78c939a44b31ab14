//! ProfileGuard predictor CLI
//!
//! Prints exactly one JSON response line and exits 0 for every input.
//! Logs go to stderr.

use std::io::Read;
use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Parser;
use profileguard_ai_service::{
    InferenceService, PredictionResponse, ServiceConfig, ServiceMode,
};
use tracing::{debug, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

#[derive(Parser, Debug)]
#[command(name = "profileguard-predict")]
#[command(author = "ProfileGuard Contributors")]
#[command(version = env!("CARGO_PKG_VERSION"))]
#[command(about = "Classify a social profile as Fake or Real", long_about = None)]
struct Args {
    /// JSON object of feature values; read from stdin when omitted
    features: Option<String>,

    /// Profile URL to derive features from
    #[arg(long, conflicts_with = "features")]
    url: Option<String>,

    /// Platform of the profile URL (instagram, linkedin, ...)
    #[arg(long, default_value = "unknown", requires = "url")]
    platform: String,

    /// Artifact directory (overrides PROFILEGUARD_MODEL_DIR)
    #[arg(long)]
    model_dir: Option<PathBuf>,

    /// auto, loaded or bootstrap (overrides PROFILEGUARD_MODE)
    #[arg(long)]
    mode: Option<ServiceMode>,

    /// TOML service configuration (overrides PROFILEGUARD_CONFIG)
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Verbose logging
    #[arg(short, long)]
    verbose: bool,
}

fn main() {
    let args = match Args::try_parse() {
        Ok(args) => args,
        Err(e) if e.use_stderr() => {
            eprintln!("{e}");
            emit(&PredictionResponse::sentinel());
            return;
        }
        Err(e) => e.exit(),
    };

    let response = run(&args);
    emit(&response);
}

fn run(args: &Args) -> PredictionResponse {
    let config = load_config(args);
    init_logging(&config, args.verbose);
    debug!(?config, "service configuration");

    let service = InferenceService::from_config(&config);
    debug!(source = %service.source(), "model ready");

    match &args.url {
        Some(url) => service.predict_url(url, &args.platform),
        None => match request_payload(args) {
            Ok(payload) => service.predict_json(&payload),
            Err(e) => {
                warn!(error = %e, "no request payload, returning sentinel");
                PredictionResponse::sentinel()
            }
        },
    }
}

fn load_config(args: &Args) -> ServiceConfig {
    let loaded = match &args.config {
        Some(path) => ServiceConfig::load_from_file(path).map(|mut config| {
            config.apply_overrides(|key| std::env::var(key).ok());
            config
        }),
        None => ServiceConfig::from_env(),
    };
    let mut config = loaded.unwrap_or_else(|e| {
        eprintln!("profileguard-predict: {e}; using defaults");
        ServiceConfig::default()
    });

    if let Some(dir) = &args.model_dir {
        config.model_dir = dir.clone();
    }
    if let Some(mode) = args.mode {
        config.mode = mode;
    }
    config
}

fn request_payload(args: &Args) -> Result<String> {
    if let Some(features) = &args.features {
        return Ok(features.clone());
    }
    let mut payload = String::new();
    std::io::stdin()
        .read_to_string(&mut payload)
        .context("Failed to read request from stdin")?;
    Ok(payload)
}

fn init_logging(config: &ServiceConfig, verbose: bool) {
    let default_level = if verbose { "debug" } else { config.log_level.as_str() };
    let filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(default_level))
        .unwrap_or_else(|_| EnvFilter::new("warn"));

    // A second init only happens in tests; ignore it.
    let _ = tracing_subscriber::registry()
        .with(filter)
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .try_init();
}

fn emit(response: &PredictionResponse) {
    println!("{}", response.to_json());
}
