//! Ensemble demo
//!
//! Fits a scaler and a small forest on synthetic profiles, persists the
//! pair, reloads it and classifies two accounts.

use profileguard_ai_core::{
    ArtifactPair, EnsembleClassifier, FeatureSchema, ForestConfig, Label, StandardScaler,
    TRAINING_FEATURES,
};

fn main() -> Result<(), Box<dyn std::error::Error>> {
    println!("=== Profile Ensemble Demo ===\n");

    println!("1. Building synthetic training data...");
    let mut rows = Vec::new();
    let mut labels = Vec::new();
    for i in 0..60 {
        let k = i as f64;
        if i % 3 == 0 {
            rows.push(vec![k % 7.0, 1_200.0 + k, 4.0, 0.0, 0.0, 13.0, 0.0, 0.0, 0.0]);
            labels.push(Label::Fake);
        } else {
            rows.push(vec![
                350.0 + 11.0 * k,
                180.0 + k,
                2_400.0 + 5.0 * k,
                75.0,
                3.0,
                8.0,
                1.0,
                0.0,
                0.0,
            ]);
            labels.push(Label::Real);
        }
    }
    println!("   {} rows over {} features\n", rows.len(), TRAINING_FEATURES.len());

    println!("2. Fitting scaler and forest...");
    let scaler = StandardScaler::fit(&rows)?;
    let scaled = scaler.transform(&rows)?;
    let config = ForestConfig {
        tree_count: 25,
        max_depth: 6,
        ..ForestConfig::default()
    };
    let model = EnsembleClassifier::fit(&scaled, &labels, config)?;
    println!("   {} trees, model hash {}\n", model.num_trees(), model.hash_hex()?);

    println!("3. Persisting and reloading the pair...");
    let dir = tempfile::tempdir()?;
    let pair = ArtifactPair::new(FeatureSchema::Training, scaler, model)?;
    let manifest = pair.save_atomic(dir.path(), None)?;
    let (reloaded, _) = ArtifactPair::load(dir.path())?;
    println!("   manifest model hash {}\n", manifest.model_hash);

    println!("4. Classifying...");
    let probes = [
        ("follow-spam bot", [2.0, 1_300.0, 1.0, 0.0, 0.0, 14.0, 0.0, 0.0, 0.0]),
        ("regular user", [900.0, 200.0, 2_600.0, 70.0, 4.0, 7.0, 1.0, 0.0, 0.0]),
    ];
    for (name, row) in probes {
        let (label, confidence) = reloaded.predict_row(&row)?;
        println!("   {name:<16} -> {label} ({confidence:.2})");
    }

    println!("\n=== Demo Complete ===");
    Ok(())
}
