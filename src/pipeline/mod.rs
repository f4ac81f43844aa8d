//! Pipeline driver
//!
//! Runs clean → derive features → train/evaluate → aggregate, then persists
//! the artifacts. Nothing is written until every stage has succeeded. Every
//! artifact is then staged as a temporary file, and only when all of them are
//! written are they renamed into place together.

use crate::config::PipelineConfig;
use crate::error::{Result, TelematicsError};
use crate::export::aggregate_for_dashboard;
use crate::feature_engineering::FeatureDeriver;
use crate::preprocessing::{Cleaner, CleaningReport};
use crate::source::{write_csv, CsvTableSource, MergedTableSource, TableSource};
use crate::table::Table;
use crate::training::{ClassificationReport, Trainer, TrainingSummary};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use std::time::{Duration, SystemTime};
use tracing::{debug, error, info, warn};

pub const CLEANED_FILE: &str = "cleaned.csv";
pub const FEATURES_FILE: &str = "features.csv";
pub const MODEL_FILE: &str = "model.json";
pub const METRICS_FILE: &str = "metrics.json";
pub const DASHBOARD_FILE: &str = "dashboard.csv";

/// Everything a completed run measured
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RunReport {
    pub started_at: DateTime<Utc>,
    pub finished_at: DateTime<Utc>,
    pub source: String,
    pub rows_raw: usize,
    pub rows_cleaned: usize,
    pub rows_features: usize,
    pub vehicles: usize,
    pub cleaning: CleaningReport,
    pub training: TrainingSummary,
    pub metrics: ClassificationReport,
    pub feature_importances: Vec<(String, f64)>,
    pub artifacts: Vec<PathBuf>,
}

#[derive(Debug, Clone)]
pub enum RunOutcome {
    /// The source had no rows
    NoWork,
    Completed(Box<RunReport>),
}

impl RunOutcome {
    pub fn report(&self) -> Option<&RunReport> {
        match self {
            RunOutcome::NoWork => None,
            RunOutcome::Completed(report) => Some(report.as_ref()),
        }
    }
}

/// Counts from a polling session
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct WatchSummary {
    pub iterations: usize,
    pub runs_completed: usize,
    pub runs_failed: usize,
    pub no_work: usize,
    pub skipped: usize,
}

/// True when `path` was modified less than `max_age` ago
pub fn is_fresh(path: impl AsRef<Path>, max_age: Duration) -> Result<bool> {
    let modified = fs::metadata(path.as_ref())?.modified()?;
    let age = SystemTime::now()
        .duration_since(modified)
        .unwrap_or(Duration::ZERO);
    Ok(age < max_age)
}

/// Sequences the stages of one pipeline run
#[derive(Debug, Clone)]
pub struct PipelineDriver {
    config: PipelineConfig,
    cleaner: Cleaner,
    deriver: FeatureDeriver,
    trainer: Trainer,
}

impl PipelineDriver {
    /// Validate the configuration and build the stages
    pub fn new(config: PipelineConfig) -> Result<Self> {
        config.validate()?;
        Ok(Self {
            cleaner: Cleaner::new(config.cleaning.clone()),
            deriver: FeatureDeriver::new(config.features.clone()),
            trainer: Trainer::new(config.training.clone()),
            config,
        })
    }

    pub fn config(&self) -> &PipelineConfig {
        &self.config
    }

    /// Merged CSV source over the configured inputs
    pub fn configured_source(&self) -> MergedTableSource {
        self.config
            .driver
            .inputs
            .iter()
            .fold(MergedTableSource::new(), |merged, path| {
                merged.with_source(CsvTableSource::new(path))
            })
    }

    /// Run every stage on `source` and persist the artifacts
    pub fn run_once(&self, source: &dyn TableSource) -> Result<RunOutcome> {
        let started_at = Utc::now();
        let raw = source.load()?;
        if raw.is_empty() {
            info!(source = %source.name(), "No rows available; skipping run");
            return Ok(RunOutcome::NoWork);
        }

        info!(source = %source.name(), rows = raw.n_rows(), "Starting pipeline run");
        let result = self.compute(&raw).and_then(|computed| {
            let artifacts = self.persist(&computed)?;
            Ok((computed, artifacts))
        });

        let (computed, artifacts) = match result {
            Ok(done) => done,
            Err(e) => {
                error!(stage = %e.stage(), error = %e, "Pipeline run failed");
                return Err(e);
            }
        };

        let report = RunReport {
            started_at,
            finished_at: Utc::now(),
            source: source.name(),
            rows_raw: raw.n_rows(),
            rows_cleaned: computed.cleaned.n_rows(),
            rows_features: computed.features.n_rows(),
            vehicles: computed.dashboard.n_rows(),
            cleaning: computed.cleaning,
            training: computed.summary,
            metrics: computed.metrics,
            feature_importances: computed.feature_importances,
            artifacts,
        };

        info!(
            rows_raw = report.rows_raw,
            rows_features = report.rows_features,
            accuracy = report.metrics.accuracy,
            "Pipeline run completed"
        );
        Ok(RunOutcome::Completed(Box::new(report)))
    }

    /// [`Self::run_once`] over the configured CSV inputs
    pub fn run_configured(&self) -> Result<RunOutcome> {
        self.run_once(&self.configured_source())
    }

    fn compute(&self, raw: &Table) -> Result<ComputedRun> {
        let (cleaned, cleaning) = self.cleaner.clean_with_report(raw)?;
        let features = self.deriver.derive_features(&cleaned)?;
        let outcome = self.trainer.fit_and_evaluate(&features)?;
        let dashboard = aggregate_for_dashboard(&features)?;
        let model_json = outcome.model.to_json()?;

        Ok(ComputedRun {
            cleaned,
            features,
            dashboard,
            cleaning,
            summary: outcome.summary,
            feature_importances: outcome.model.feature_importances(),
            metrics: outcome.report,
            model_json,
        })
    }

    fn persist(&self, run: &ComputedRun) -> Result<Vec<PathBuf>> {
        let dir = &self.config.driver.output_dir;
        fs::create_dir_all(dir)?;

        let metrics = MetricsArtifact {
            metrics: &run.metrics,
            training: &run.summary,
            cleaning: &run.cleaning,
            feature_importances: &run.feature_importances,
        };
        let metrics_json = serde_json::to_string_pretty(&metrics)?;

        let mut staged = StagedArtifacts::new(dir);
        staged.stage(CLEANED_FILE, |tmp| write_csv(&run.cleaned, tmp))?;
        staged.stage(FEATURES_FILE, |tmp| write_csv(&run.features, tmp))?;
        staged.stage(MODEL_FILE, |tmp| Ok(fs::write(tmp, &run.model_json)?))?;
        staged.stage(METRICS_FILE, |tmp| Ok(fs::write(tmp, &metrics_json)?))?;
        staged.stage(DASHBOARD_FILE, |tmp| write_csv(&run.dashboard, tmp))?;
        let artifacts = staged.commit()?;
        debug!(dir = %dir.display(), files = artifacts.len(), "Persisted run artifacts");
        Ok(artifacts)
    }

    /// Poll the watched input and run whenever it is fresh and has changed
    /// since the last run. Runs never overlap; a failed run is logged and the
    /// loop continues. Stops after `max_iterations` polls when given.
    pub fn watch(&self, source: &dyn TableSource, max_iterations: Option<usize>) -> Result<WatchSummary> {
        let watched = self.config.driver.watched().map(Path::to_path_buf).ok_or_else(|| {
            TelematicsError::ConfigError("no watch path or input configured".to_string())
        })?;
        let max_age = self.config.driver.freshness();
        let interval = self.config.driver.poll_interval();

        let mut summary = WatchSummary::default();
        let mut last_processed: Option<SystemTime> = None;

        loop {
            summary.iterations += 1;

            match self.poll(&watched, max_age, last_processed) {
                Ok(Some(modified)) => match self.run_once(source) {
                    Ok(RunOutcome::Completed(_)) => {
                        summary.runs_completed += 1;
                        last_processed = Some(modified);
                    }
                    Ok(RunOutcome::NoWork) => {
                        summary.no_work += 1;
                        last_processed = Some(modified);
                    }
                    Err(_) => summary.runs_failed += 1,
                },
                Ok(None) => {
                    debug!(path = %watched.display(), "No new data");
                    summary.skipped += 1;
                }
                Err(e) => {
                    warn!(path = %watched.display(), error = %e, "Cannot check watched input");
                    summary.skipped += 1;
                }
            }

            if max_iterations.map_or(false, |max| summary.iterations >= max) {
                break;
            }
            std::thread::sleep(interval);
        }

        info!(
            iterations = summary.iterations,
            completed = summary.runs_completed,
            failed = summary.runs_failed,
            "Stopped watching"
        );
        Ok(summary)
    }

    /// Modification time of the watched file when it holds unprocessed fresh data
    fn poll(
        &self,
        watched: &Path,
        max_age: Duration,
        last_processed: Option<SystemTime>,
    ) -> Result<Option<SystemTime>> {
        if !is_fresh(watched, max_age)? {
            return Ok(None);
        }
        let modified = fs::metadata(watched)?.modified()?;
        if last_processed == Some(modified) {
            return Ok(None);
        }
        Ok(Some(modified))
    }
}

struct ComputedRun {
    cleaned: Table,
    features: Table,
    dashboard: Table,
    cleaning: CleaningReport,
    summary: TrainingSummary,
    metrics: ClassificationReport,
    feature_importances: Vec<(String, f64)>,
    model_json: String,
}

#[derive(Serialize)]
struct MetricsArtifact<'a> {
    metrics: &'a ClassificationReport,
    training: &'a TrainingSummary,
    cleaning: &'a CleaningReport,
    feature_importances: &'a [(String, f64)],
}

struct StagedFile {
    tmp: PathBuf,
    backup: PathBuf,
    target: PathBuf,
}

/// Artifacts written to hidden temporary files and renamed into place together.
/// Dropping an uncommitted batch removes its temporary files.
struct StagedArtifacts {
    dir: PathBuf,
    files: Vec<StagedFile>,
}

impl StagedArtifacts {
    fn new(dir: &Path) -> Self {
        Self {
            dir: dir.to_path_buf(),
            files: Vec::new(),
        }
    }

    /// Write `name` through `write` into its temporary file
    fn stage<F>(&mut self, name: &str, write: F) -> Result<()>
    where
        F: FnOnce(&Path) -> Result<()>,
    {
        let target = self.dir.join(name);
        if target.is_dir() {
            return Err(TelematicsError::ExportError(format!(
                "artifact target {} is a directory",
                target.display()
            )));
        }
        let file = StagedFile {
            tmp: self.dir.join(format!(".{}.tmp", name)),
            backup: self.dir.join(format!(".{}.bak", name)),
            target,
        };
        let written = write(&file.tmp);
        self.files.push(file);
        written
    }

    /// Rename every staged file into place. If any rename fails, the files
    /// already moved are removed and the previous artifacts restored.
    fn commit(mut self) -> Result<Vec<PathBuf>> {
        let files = std::mem::take(&mut self.files);
        let mut replaced: Vec<&StagedFile> = Vec::new();
        let mut committed: Vec<&StagedFile> = Vec::new();

        for file in &files {
            if let Err(e) = replace(file, &mut replaced) {
                for done in &committed {
                    let _ = fs::remove_file(&done.target);
                }
                for old in &replaced {
                    let _ = fs::rename(&old.backup, &old.target);
                }
                for file in &files {
                    let _ = fs::remove_file(&file.tmp);
                }
                return Err(e);
            }
            committed.push(file);
        }

        for old in &replaced {
            let _ = fs::remove_file(&old.backup);
        }
        Ok(files.iter().map(|file| file.target.clone()).collect())
    }
}

impl Drop for StagedArtifacts {
    fn drop(&mut self) {
        for file in &self.files {
            let _ = fs::remove_file(&file.tmp);
        }
    }
}

/// Move an existing target aside, then rename the staged file over it
fn replace<'a>(file: &'a StagedFile, replaced: &mut Vec<&'a StagedFile>) -> Result<()> {
    if file.target.exists() {
        fs::rename(&file.target, &file.backup)?;
        replaced.push(file);
    }
    fs::rename(&file.tmp, &file.target)?;
    Ok(())
}
