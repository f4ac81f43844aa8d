//! Integration test: Full pipeline end-to-end
//!
//! Raw CSV → cleaning → feature derivation → training → dashboard export,
//! driven through `PipelineDriver` with artifacts in a temporary directory.

use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use vehicle_telematics::config::{DriverConfig, PipelineConfig};
use vehicle_telematics::error::TelematicsError;
use vehicle_telematics::feature_engineering::{
    FeatureConfig, ZeroFuelPolicy, HIGH_ENGINE_LOAD, IDLE_TIME,
};
use vehicle_telematics::pipeline::{
    PipelineDriver, RunOutcome, CLEANED_FILE, DASHBOARD_FILE, FEATURES_FILE, METRICS_FILE,
    MODEL_FILE,
};
use vehicle_telematics::source::{read_csv, MemoryTableSource};
use vehicle_telematics::table::{
    Schema, Table, ENGINE_LOAD, FUEL_EFFICIENCY, MAINTENANCE_REQUIRED, VEHICLE_ID,
};
use vehicle_telematics::training::{MaintenanceModel, TrainerConfig};

// Two vehicles, four trips each. Row 3 burns no fuel, row 5 lost its engine
// load reading, rows 1 and 2 sit on either side of the 80% load threshold.
const RAW: &str = "\
vehicle_id,fuel_efficiency,average_speed,engine_load,distance_traveled,fuel_consumed,maintenance_required
v1,12.0,0,80,100,10,0
v1,13.5,65,80.01,120,9,1
v1,11.0,0,70,90,0,0
v1,12.5,85,60,130,11,1
v2,9.0,40,,80,9,0
v2,8.5,0,90,70,8,1
v2,10.0,0,50,95,10,0
v2,9.5,90,85,100,10,0
";

fn write_raw(dir: &Path) -> PathBuf {
    let path = dir.join("vehicle_performance_data.csv");
    fs::write(&path, RAW).unwrap();
    path
}

fn config(input: PathBuf, output: PathBuf) -> PipelineConfig {
    PipelineConfig::new()
        .with_training(TrainerConfig::new().with_n_trees(20).with_seed(42))
        .with_driver(
            DriverConfig::default()
                .with_inputs(vec![input])
                .with_output_dir(output),
        )
}

fn values(table: &Table, name: &str) -> Vec<f64> {
    table.f64_values(name).unwrap().iter().map(|v| v.unwrap()).collect()
}

fn assert_close(actual: f64, expected: f64) {
    assert!((actual - expected).abs() < 1e-9, "expected {}, got {}", expected, actual);
}

#[test]
fn test_full_run_writes_every_artifact() {
    let dir = tempfile::tempdir().unwrap();
    let input = write_raw(dir.path());
    let out = dir.path().join("out");

    let driver = PipelineDriver::new(config(input, out.clone())).unwrap();
    let outcome = driver.run_configured().unwrap();
    let report = outcome.report().expect("run should complete");

    assert_eq!(report.rows_raw, 8);
    assert_eq!(report.rows_cleaned, 8);
    assert_eq!(report.rows_features, 7);
    assert_eq!(report.vehicles, 2);
    assert_eq!(report.cleaning.imputed_medians.get(ENGINE_LOAD), Some(&80.0));
    assert_eq!(report.training.n_test, 2);
    assert_eq!(report.training.n_train, 5);
    assert_eq!(report.metrics.confusion.total(), 2);

    for name in [CLEANED_FILE, FEATURES_FILE, MODEL_FILE, METRICS_FILE, DASHBOARD_FILE] {
        assert!(out.join(name).exists(), "missing artifact {}", name);
    }
    let leftovers: Vec<_> = fs::read_dir(&out)
        .unwrap()
        .filter_map(|e| e.ok())
        .filter(|e| e.file_name().to_string_lossy().ends_with(".tmp"))
        .collect();
    assert!(leftovers.is_empty());
}

#[test]
fn test_cleaned_and_feature_artifacts() {
    let dir = tempfile::tempdir().unwrap();
    let input = write_raw(dir.path());
    let out = dir.path().join("out");
    PipelineDriver::new(config(input, out.clone()))
        .unwrap()
        .run_configured()
        .unwrap();

    let cleaned = read_csv(out.join(CLEANED_FILE), &Schema::telematics()).unwrap();
    assert_eq!(cleaned.n_rows(), 8);
    assert_eq!(values(&cleaned, ENGINE_LOAD)[4], 80.0);

    let features = read_csv(out.join(FEATURES_FILE), &Schema::telematics()).unwrap();
    assert_eq!(features.n_rows(), 7);
    // Imputed 80 and exactly 80 are not high; 80.01 is
    assert_eq!(values(&features, HIGH_ENGINE_LOAD), vec![0.0, 1.0, 0.0, 0.0, 1.0, 0.0, 1.0]);
    assert_eq!(values(&features, IDLE_TIME), vec![1.0, 1.0, 1.0, 2.0, 2.0, 2.0, 2.0]);

    let model = MaintenanceModel::load(out.join(MODEL_FILE)).unwrap();
    let predictions = model.score_table(&features).unwrap();
    assert_eq!(predictions.len(), 7);

    let metrics: serde_json::Value =
        serde_json::from_str(&fs::read_to_string(out.join(METRICS_FILE)).unwrap()).unwrap();
    assert!(metrics["metrics"]["accuracy"].is_number());
    assert_eq!(metrics["training"]["n_test"], 2);
}

#[test]
fn test_dashboard_per_vehicle() {
    let dir = tempfile::tempdir().unwrap();
    let input = write_raw(dir.path());
    let out = dir.path().join("out");
    PipelineDriver::new(config(input, out.clone()))
        .unwrap()
        .run_configured()
        .unwrap();

    let dashboard = read_csv(out.join(DASHBOARD_FILE), &Schema::telematics()).unwrap();
    assert_eq!(dashboard.n_rows(), 2);
    let ids: Vec<&str> = dashboard
        .text_values(VEHICLE_ID)
        .unwrap()
        .iter()
        .map(|v| v.as_deref().unwrap())
        .collect();
    assert_eq!(ids, vec!["v1", "v2"]);

    let efficiency = values(&dashboard, FUEL_EFFICIENCY);
    assert_close(efficiency[0], 38.0 / 3.0);
    assert_close(efficiency[1], 9.25);

    assert_eq!(values(&dashboard, MAINTENANCE_REQUIRED), vec![2.0, 1.0]);

    let load = values(&dashboard, ENGINE_LOAD);
    assert_close(load[0], 220.01 / 3.0);
    assert_close(load[1], 76.25);

    // Broadcast idle counts summed over each vehicle's rows
    assert_eq!(values(&dashboard, IDLE_TIME), vec![3.0, 8.0]);
}

#[test]
fn test_same_input_same_metrics() {
    let dir = tempfile::tempdir().unwrap();
    let input = write_raw(dir.path());

    let first = PipelineDriver::new(config(input.clone(), dir.path().join("a")))
        .unwrap()
        .run_configured()
        .unwrap();
    let second = PipelineDriver::new(config(input, dir.path().join("b")))
        .unwrap()
        .run_configured()
        .unwrap();

    let (first, second) = (first.report().unwrap(), second.report().unwrap());
    assert_eq!(first.metrics, second.metrics);
    assert_eq!(first.feature_importances, second.feature_importances);
}

#[test]
fn test_empty_source_is_no_work() {
    let dir = tempfile::tempdir().unwrap();
    let out = dir.path().join("out");
    let driver = PipelineDriver::new(config(dir.path().join("unused.csv"), out.clone())).unwrap();

    let source = MemoryTableSource::new(Table::empty(&Schema::telematics()));
    let outcome = driver.run_once(&source).unwrap();

    assert!(matches!(outcome, RunOutcome::NoWork));
    assert!(!out.exists());
}

#[test]
fn test_failed_run_writes_nothing() {
    let dir = tempfile::tempdir().unwrap();
    let input = write_raw(dir.path());
    let out = dir.path().join("out");
    let config = config(input, out.clone())
        .with_features(FeatureConfig::new().with_zero_fuel_policy(ZeroFuelPolicy::Fail));

    let err = PipelineDriver::new(config).unwrap().run_configured().unwrap_err();
    assert!(matches!(err, TelematicsError::FeatureComputationError(_)));
    assert!(!out.exists());
}

#[test]
fn test_blocked_artifact_leaves_no_partial_output() {
    let dir = tempfile::tempdir().unwrap();
    let input = write_raw(dir.path());
    let out = dir.path().join("out");
    let blocked = out.join(DASHBOARD_FILE);
    fs::create_dir_all(&blocked).unwrap();
    fs::write(blocked.join("keep.txt"), "occupied").unwrap();

    let err = PipelineDriver::new(config(input, out.clone()))
        .unwrap()
        .run_configured()
        .unwrap_err();
    assert!(matches!(err, TelematicsError::ExportError(_)));

    for name in [CLEANED_FILE, FEATURES_FILE, MODEL_FILE, METRICS_FILE] {
        assert!(!out.join(name).exists(), "{} written by a failed run", name);
    }
    let hidden: Vec<_> = fs::read_dir(&out)
        .unwrap()
        .filter_map(|e| e.ok())
        .filter(|e| e.file_name().to_string_lossy().starts_with('.'))
        .collect();
    assert!(hidden.is_empty());
    assert!(blocked.join("keep.txt").exists());
}

#[test]
fn test_watch_runs_fresh_input_once() {
    let dir = tempfile::tempdir().unwrap();
    let input = write_raw(dir.path());
    let out = dir.path().join("out");
    let mut config = config(input, out.clone());
    config.driver = config.driver.with_poll_interval(Duration::from_secs(1));

    let driver = PipelineDriver::new(config).unwrap();
    let summary = driver.watch(&driver.configured_source(), Some(2)).unwrap();

    assert_eq!(summary.iterations, 2);
    assert_eq!(summary.runs_completed, 1);
    assert_eq!(summary.skipped, 1);
    assert!(out.join(DASHBOARD_FILE).exists());
}

#[test]
fn test_watch_skips_stale_input() {
    let dir = tempfile::tempdir().unwrap();
    let input = write_raw(dir.path());
    let out = dir.path().join("out");
    let mut config = config(input, out.clone());
    config.driver = config
        .driver
        .with_poll_interval(Duration::from_secs(1))
        .with_freshness(Duration::ZERO);

    let driver = PipelineDriver::new(config).unwrap();
    let summary = driver.watch(&driver.configured_source(), Some(1)).unwrap();

    assert_eq!(summary.runs_completed, 0);
    assert_eq!(summary.skipped, 1);
    assert!(!out.exists());
}
