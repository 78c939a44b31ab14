//! Integration tests for the training pipeline
//!
//! Runs the full pipeline against CSV datasets written to temporary
//! directories and checks reproducibility and all-or-nothing persistence.

use anyhow::Result;
use profileguard_ai_core::{ArtifactPair, FeatureSchema, Label, TRAINING_FEATURES};
use profileguard_ai_trainer::{
    train_from_dir, DatasetPreparer, PipelineStage, TrainerError, TrainingParams,
    TrainingPipeline,
};
use std::fs;
use std::io::Write;
use std::path::Path;
use tempfile::tempdir;

const HEADER: &str = "id,dataset,name,screen_name,profile_image_url_https,followers_count,\
friends_count,statuses_count,favourites_count,listed_count,protected,verified";

/// Synthetic profile dump: every third account is a follow-spam bot
fn write_profiles(dir: &Path, rows: usize, all_fake: bool) -> Result<()> {
    let mut file = fs::File::create(dir.join("users.csv"))?;
    writeln!(file, "{HEADER}")?;

    for i in 0..rows {
        let fake = all_fake || i % 3 == 0;
        if fake {
            writeln!(
                file,
                "{i},fake,Bot {i},bot{i:05},,{},{},{},0,0,False,False",
                i % 9,
                800 + 7 * i,
                i % 20
            )?;
        } else {
            writeln!(
                file,
                "{i},real,Person {i},person{i},https://pbs.example/{i}.jpg,{},{},{},{},{},False,{}",
                200 + 13 * i,
                150 + i % 60,
                1_000 + 29 * i,
                50 + i % 40,
                1 + i % 5,
                if i % 17 == 0 { "True" } else { "False" }
            )?;
        }
    }

    file.flush()?;
    Ok(())
}

fn small_params() -> TrainingParams {
    TrainingParams {
        tree_count: 20,
        max_depth: 6,
        ..TrainingParams::default()
    }
}

#[test]
fn test_end_to_end_training() -> Result<()> {
    let data = tempdir()?;
    let out = tempdir()?;
    let model_dir = out.path().join("model");
    write_profiles(data.path(), 90, false)?;

    let report = train_from_dir(data.path(), &model_dir, small_params())?;

    assert_eq!(report.rows, 90);
    assert_eq!(report.test_rows, 18);
    assert_eq!(report.train_rows, 72);
    assert_eq!(report.evaluation.support(), [12, 6]);
    assert!(report.evaluation.accuracy >= 0.9);
    assert_eq!(report.manifest.schema, FeatureSchema::Training);
    assert_eq!(report.manifest.feature_names, TRAINING_FEATURES);

    let (pair, manifest) = ArtifactPair::load(&model_dir)?;
    assert_eq!(manifest, report.manifest);
    assert_eq!(pair.model.num_trees(), 20);
    assert_eq!(pair.scaler.n_features(), TRAINING_FEATURES.len());

    Ok(())
}

#[test]
fn test_deterministic_training() -> Result<()> {
    let data = tempdir()?;
    let out = tempdir()?;
    write_profiles(data.path(), 60, false)?;

    let first = train_from_dir(data.path(), &out.path().join("a"), small_params())?;
    let second = train_from_dir(data.path(), &out.path().join("b"), small_params())?;

    assert_eq!(first.manifest.model_hash, second.manifest.model_hash);
    assert_eq!(first.manifest.scaler_hash, second.manifest.scaler_hash);

    let (pair_a, _) = ArtifactPair::load(&out.path().join("a"))?;
    let (pair_b, _) = ArtifactPair::load(&out.path().join("b"))?;
    let probe = [4.0, 900.0, 3.0, 0.0, 0.0, 8.0, 0.0, 0.0, 0.0];
    let (label_a, conf_a) = pair_a.predict_row(&probe)?;
    let (label_b, conf_b) = pair_b.predict_row(&probe)?;
    assert_eq!(label_a, label_b);
    assert_eq!(conf_a.to_bits(), conf_b.to_bits());
    assert_eq!(label_a, Label::Fake);

    Ok(())
}

#[test]
fn test_single_class_writes_nothing() -> Result<()> {
    let data = tempdir()?;
    let out = tempdir()?;
    let model_dir = out.path().join("model");
    write_profiles(data.path(), 30, true)?;

    let err = train_from_dir(data.path(), &model_dir, small_params()).unwrap_err();
    assert!(err.is_configuration(), "unexpected error: {err}");
    assert!(!model_dir.exists());
    assert_eq!(fs::read_dir(out.path())?.count(), 0);

    Ok(())
}

#[test]
fn test_failed_run_keeps_previous_pair() -> Result<()> {
    let data = tempdir()?;
    let out = tempdir()?;
    let model_dir = out.path().join("model");
    write_profiles(data.path(), 60, false)?;
    let good = train_from_dir(data.path(), &model_dir, small_params())?;

    write_profiles(data.path(), 30, true)?;
    assert!(train_from_dir(data.path(), &model_dir, small_params()).is_err());

    let (_, manifest) = ArtifactPair::load(&model_dir)?;
    assert_eq!(manifest.model_hash, good.manifest.model_hash);

    Ok(())
}

#[test]
fn test_failed_write_keeps_previous_pair() -> Result<()> {
    let data = tempdir()?;
    let out = tempdir()?;
    let model_dir = out.path().join("model");
    write_profiles(data.path(), 60, false)?;
    let good = train_from_dir(data.path(), &model_dir, small_params())?;

    // a file where the swap wants its backup directory
    fs::write(out.path().join("model.old"), "occupied")?;
    let retrain = TrainingParams {
        seed: 7,
        ..small_params()
    };
    let err = train_from_dir(data.path(), &model_dir, retrain).unwrap_err();
    assert!(matches!(err, TrainerError::Core(_)), "unexpected error: {err}");

    let (_, manifest) = ArtifactPair::load(&model_dir)?;
    assert_eq!(manifest.model_hash, good.manifest.model_hash);
    assert!(!out.path().join("model.tmp").exists());

    Ok(())
}

#[test]
fn test_output_under_regular_file_writes_nothing() -> Result<()> {
    let data = tempdir()?;
    let out = tempdir()?;
    write_profiles(data.path(), 45, false)?;
    let blocker = out.path().join("blocker");
    fs::write(&blocker, "not a directory")?;

    let preparer = DatasetPreparer::new(data.path());
    let mut pipeline = TrainingPipeline::new(small_params());
    assert!(pipeline.run(&preparer, &blocker.join("model")).is_err());
    assert_eq!(pipeline.stage(), PipelineStage::Evaluated);
    assert_eq!(fs::read_dir(out.path())?.count(), 1);

    Ok(())
}

#[test]
fn test_missing_dataset_is_data_source_error() -> Result<()> {
    let data = tempdir()?;
    let out = tempdir()?;

    let preparer = DatasetPreparer::new(data.path());
    let mut pipeline = TrainingPipeline::new(small_params());
    let err = pipeline.run(&preparer, &out.path().join("model")).unwrap_err();

    assert!(matches!(err, TrainerError::DataSource(_)));
    assert_eq!(pipeline.stage(), PipelineStage::Idle);
    Ok(())
}

#[test]
fn test_missing_column_is_schema_error() -> Result<()> {
    let data = tempdir()?;
    let out = tempdir()?;
    fs::write(
        data.path().join("users.csv"),
        "dataset,screen_name,followers_count\nfake,bot,1\nreal,alice,300\n",
    )?;

    let err = train_from_dir(data.path(), &out.path().join("model"), small_params()).unwrap_err();
    assert!(matches!(err, TrainerError::Schema(_)));
    Ok(())
}

#[test]
fn test_pipeline_reaches_persisted() -> Result<()> {
    let data = tempdir()?;
    let out = tempdir()?;
    write_profiles(data.path(), 45, false)?;

    let preparer = DatasetPreparer::new(data.path());
    let mut pipeline = TrainingPipeline::new(small_params());
    pipeline.run(&preparer, &out.path().join("model"))?;

    assert_eq!(pipeline.stage(), PipelineStage::Persisted);
    Ok(())
}
