//! Integration test: Training and evaluating the maintenance classifier

use ndarray::{Array1, Array2};
use vehicle_telematics::error::TelematicsError;
use vehicle_telematics::table::{Column, Table, MAINTENANCE_REQUIRED, VEHICLE_ID};
use vehicle_telematics::training::{
    partition, split_features_and_label, FeatureMatrix, MaintenanceModel, ScalerFit, Trainer,
    TrainerConfig,
};

/// Separable data: maintenance is needed when engine load is high
fn feature_table(n: usize) -> Table {
    let load: Vec<f64> = (0..n).map(|i| i as f64).collect();
    let speed: Vec<f64> = (0..n).map(|i| ((i * 7) % 11) as f64).collect();
    let label: Vec<Option<f64>> = (0..n).map(|i| Some(if i >= n / 2 { 1.0 } else { 0.0 })).collect();
    Table::new(vec![
        Column::identifier(VEHICLE_ID, (0..n).map(|i| Some(format!("v{}", i % 5))).collect()),
        Column::numeric_dense("engine_load", &load),
        Column::numeric_dense("average_speed", &speed),
        Column::label(MAINTENANCE_REQUIRED, label),
    ])
    .unwrap()
}

fn config() -> TrainerConfig {
    TrainerConfig::new().with_n_trees(25).with_seed(7)
}

#[test]
fn test_fit_and_evaluate_separable() {
    let outcome = Trainer::new(config()).fit_and_evaluate(&feature_table(40)).unwrap();

    assert_eq!(outcome.summary.n_test, 8);
    assert_eq!(outcome.summary.n_train, 32);
    assert_eq!(outcome.summary.n_features, 2);
    assert_eq!(outcome.report.confusion.total(), 8);
    assert!(outcome.report.accuracy >= 0.75, "accuracy {}", outcome.report.accuracy);

    let importances = outcome.model.feature_importances();
    assert_eq!(importances[0].0, "engine_load");
    let total: f64 = importances.iter().map(|(_, v)| v).sum();
    assert!((total - 1.0).abs() < 1e-9);
}

#[test]
fn test_same_seed_same_result() {
    let table = feature_table(40);
    let a = Trainer::new(config()).fit_and_evaluate(&table).unwrap();
    let b = Trainer::new(config()).fit_and_evaluate(&table).unwrap();

    assert_eq!(a.report, b.report);
    assert_eq!(a.model.feature_importances(), b.model.feature_importances());
    assert_eq!(
        a.model.score_table(&table).unwrap(),
        b.model.score_table(&table).unwrap()
    );
}

#[test]
fn test_partition_is_deterministic_and_covers_every_row() {
    let (features, label) = split_features_and_label(&feature_table(23), MAINTENANCE_REQUIRED, VEHICLE_ID).unwrap();

    let a = partition(&features, &label, 0.2, 11).unwrap();
    let b = partition(&features, &label, 0.2, 11).unwrap();
    assert_eq!(a.test_indices, b.test_indices);
    assert_eq!(a.test_indices.len(), 5);

    let mut all: Vec<usize> = a.train_indices.iter().chain(&a.test_indices).copied().collect();
    all.sort_unstable();
    assert_eq!(all, (0..23).collect::<Vec<_>>());

    let c = partition(&features, &label, 0.2, 12).unwrap();
    assert_ne!(a.test_indices, c.test_indices);
}

#[test]
fn test_single_class_rejected() {
    let table = Table::new(vec![
        Column::identifier(VEHICLE_ID, vec![Some("v1"), Some("v2"), Some("v3"), Some("v4"), Some("v5")]),
        Column::numeric_dense("engine_load", &[1.0, 2.0, 3.0, 4.0, 5.0]),
        Column::label(MAINTENANCE_REQUIRED, vec![Some(0.0); 5]),
    ])
    .unwrap();

    let err = Trainer::new(config()).fit_and_evaluate(&table).unwrap_err();
    assert!(matches!(err, TelematicsError::TrainingError(_)));
}

#[test]
fn test_train_requires_two_classes() {
    let features = FeatureMatrix::new(
        vec!["engine_load".to_string()],
        Array2::from_shape_vec((3, 1), vec![1.0, 2.0, 3.0]).unwrap(),
    )
    .unwrap();
    let label = Array1::from_vec(vec![1.0, 1.0, 1.0]);
    let err = Trainer::new(config()).train(&features, &label).unwrap_err();
    assert!(matches!(err, TelematicsError::TrainingError(_)));
}

#[test]
fn test_scaler_fit_modes_differ_on_shifted_test_rows() {
    let train = FeatureMatrix::new(
        vec!["engine_load".to_string()],
        Array2::from_shape_vec((20, 1), (0..20).map(|i| i as f64).collect()).unwrap(),
    )
    .unwrap();
    let train_label = Array1::from_iter((0..20).map(|i| if i >= 10 { 1.0 } else { 0.0 }));

    // Every test row is far above the training boundary
    let test = FeatureMatrix::new(
        vec!["engine_load".to_string()],
        Array2::from_shape_vec((4, 1), vec![100.0, 101.0, 102.0, 103.0]).unwrap(),
    )
    .unwrap();
    let test_label = Array1::from_vec(vec![1.0; 4]);

    let train_only = Trainer::new(config().with_scaler_fit(ScalerFit::TrainOnly));
    let model = train_only.train(&train, &train_label).unwrap();
    let report = train_only.evaluate(&model, &test, &test_label).unwrap();
    assert_eq!(report.accuracy, 1.0);

    // Re-centred on their own mean, half the rows fall below the boundary
    let per_partition = Trainer::new(config().with_scaler_fit(ScalerFit::PerPartition));
    let report = per_partition.evaluate(&model, &test, &test_label).unwrap();
    assert_eq!(report.accuracy, 0.5);
}

#[test]
fn test_model_save_load_and_score() {
    let table = feature_table(40);
    let outcome = Trainer::new(config()).fit_and_evaluate(&table).unwrap();

    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("model.json");
    outcome.model.save(&path).unwrap();
    let loaded = MaintenanceModel::load(&path).unwrap();

    assert_eq!(loaded.feature_names(), outcome.model.feature_names());
    assert_eq!(loaded.n_train_samples(), 32);

    let original = outcome.model.score_table(&table).unwrap();
    let restored = loaded.score_table(&table).unwrap();
    assert_eq!(original, restored);
    assert!(restored.iter().all(|p| *p == 0.0 || *p == 1.0));

    let proba = loaded
        .predict_maintenance_probability(&FeatureMatrix::from_table(&table, loaded.feature_names()).unwrap())
        .unwrap();
    assert!(proba.iter().all(|p| (0.0..=1.0).contains(p)));
}

#[test]
fn test_score_table_missing_feature() {
    let table = feature_table(40);
    let outcome = Trainer::new(config()).fit_and_evaluate(&table).unwrap();
    let err = outcome.model.score_table(&table.without_column("average_speed")).unwrap_err();
    assert!(matches!(err, TelematicsError::TrainingError(_)));
}
