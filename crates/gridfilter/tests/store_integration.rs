//! Integration tests for the persistent result store and preset file.
//!
//! These tests verify that results and presets survive across engine
//! instances and that the on-disk formats stay readable.

use std::fs;
use std::time::Duration;

use gridfilter::config::EngineConfig;
use gridfilter::prelude::*;
use gridfilter::store::ResultFile;
use serde_json::{json, Value};
use tempfile::tempdir;

fn rows() -> Vec<Row> {
    (0..50).map(|i| json!({ "n": i, "label": format!("row-{i}") })).collect()
}

fn even() -> FilterModel {
    FilterModel::new().with(
        "n",
        ColumnFilter::new(Filter::number(NumberOperator::IsEven, 0.0)),
    )
}

async fn wait_for_entries(store: &ResultStore, count: usize) {
    for _ in 0..100 {
        if store.load().map(|f| f.entries.len()).unwrap_or(0) >= count {
            return;
        }
        tokio::time::sleep(Duration::from_millis(10)).await;
    }
    panic!("expected {count} persisted results");
}

#[tokio::test]
async fn test_results_persist_across_engines() {
    let temp_dir = tempdir().expect("failed to create temp dir");
    let store = ResultStore::with_path(temp_dir.path().join("results.json"));

    let mut first = FilterEngine::new()
        .with_data_source(Dataset::new(rows()))
        .with_result_store(store.clone());
    let expected = first.apply_filters(&even()).await.unwrap();
    wait_for_entries(&store, 1).await;

    let mut second = FilterEngine::new()
        .with_data_source(Dataset::new(rows()))
        .with_result_store(store.clone());
    let actual = second.apply_filters(&even()).await.unwrap();

    assert_eq!(actual, expected);
    assert_eq!(second.performance_metrics().persistent_hit_rate, 1.0);
}

#[tokio::test]
async fn test_changed_dataset_misses_persistent_cache() {
    let temp_dir = tempdir().expect("failed to create temp dir");
    let store = ResultStore::with_path(temp_dir.path().join("results.json"));

    let mut first = FilterEngine::new()
        .with_data_source(Dataset::new(rows()))
        .with_result_store(store.clone());
    first.apply_filters(&even()).await.unwrap();
    wait_for_entries(&store, 1).await;

    let mut shorter = rows();
    shorter.pop();
    let mut second = FilterEngine::new()
        .with_data_source(Dataset::new(shorter))
        .with_result_store(store.clone());
    let result = second.apply_filters(&even()).await.unwrap();

    assert_eq!(result.len(), 25);
    assert_eq!(second.performance_metrics().persistent_hit_rate, 0.0);
}

#[tokio::test]
async fn test_result_file_stores_indices_and_timestamps() {
    let temp_dir = tempdir().expect("failed to create temp dir");
    let path = temp_dir.path().join("results.json");
    let store = ResultStore::with_path(&path);

    let mut engine = FilterEngine::new()
        .with_data_source(Dataset::new(rows()))
        .with_result_store(store.clone());
    engine.apply_filters(&even()).await.unwrap();
    wait_for_entries(&store, 1).await;

    let contents: ResultFile =
        serde_json::from_str(&fs::read_to_string(&path).unwrap()).expect("result file is JSON");
    let (key, entry) = contents.entries.iter().next().unwrap();

    assert_eq!(key.split(':').count(), 3, "key has filter hash, length and sample hash");
    assert_eq!(entry.rows.len(), 25);
    assert_eq!(entry.rows[..3], [0, 2, 4]);
}

#[tokio::test]
async fn test_expired_results_are_not_served() {
    let temp_dir = tempdir().expect("failed to create temp dir");
    let store =
        ResultStore::with_path(temp_dir.path().join("results.json")).with_ttl(Duration::ZERO);

    let mut first = FilterEngine::new()
        .with_data_source(Dataset::new(rows()))
        .with_result_store(store.clone());
    first.apply_filters(&even()).await.unwrap();
    wait_for_entries(&store, 1).await;
    tokio::time::sleep(Duration::from_millis(5)).await;

    let mut second = FilterEngine::new()
        .with_data_source(Dataset::new(rows()))
        .with_result_store(store.clone());
    second.apply_filters(&even()).await.unwrap();

    assert_eq!(second.performance_metrics().persistent_hit_rate, 0.0);
}

#[tokio::test]
async fn test_engine_from_config_uses_configured_paths() {
    let temp_dir = tempdir().expect("failed to create temp dir");
    let config_path = temp_dir.path().join("config.toml");
    let results = temp_dir.path().join("results.json");
    let presets = temp_dir.path().join("presets.json");

    fs::write(
        &config_path,
        format!(
            "[persistent]\nenabled = true\npath = {results:?}\n\n[presets]\npath = {presets:?}\n"
        ),
    )
    .unwrap();

    let config = EngineConfig::load_from(&config_path).expect("load config");
    let mut engine = FilterEngine::from_config(config)
        .unwrap()
        .with_data_source(Dataset::new(rows()));

    let below_five = ColumnFilter::new(Filter::number(NumberOperator::LessThan, 5.0));
    engine.apply_filter("n", Some(below_five)).await.unwrap();
    engine
        .save_preset("small", Some("n below five".to_string()), vec!["demo".to_string()])
        .unwrap();

    let saved: Value = serde_json::from_str(&fs::read_to_string(&presets).unwrap()).unwrap();
    assert_eq!(saved["presets"][0]["name"], "small");
    assert_eq!(saved["presets"][0]["filterModel"]["n"]["condition1"]["operator"], "lessThan");

    let store = ResultStore::with_path(&results);
    wait_for_entries(&store, 1).await;
}

#[test]
fn test_presets_reload_from_disk() {
    let temp_dir = tempdir().expect("failed to create temp dir");
    let path = temp_dir.path().join("presets.json");

    {
        let mut engine = FilterEngine::new()
            .with_preset_store(PresetStore::open(&path).expect("open preset store"));
        engine.save_preset("first", None, vec![]).unwrap();
        engine.save_preset("second", None, vec!["x".to_string()]).unwrap();
        engine.delete_preset("first").unwrap();
    }

    let reopened = PresetStore::open(&path).expect("reopen preset store");
    let names: Vec<&str> = reopened.list().iter().map(|p| p.name.as_str()).collect();
    assert_eq!(names, vec!["second"]);
    assert_eq!(reopened.list()[0].tags, vec!["x"]);
}

#[test]
fn test_corrupt_preset_file_is_an_error() {
    let temp_dir = tempdir().expect("failed to create temp dir");
    let path = temp_dir.path().join("presets.json");
    fs::write(&path, "not json").unwrap();

    let err = PresetStore::open(&path).unwrap_err();
    assert!(matches!(err, EngineError::Store(_)), "unexpected error: {err:?}");
}
