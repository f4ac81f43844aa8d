//! Telematics CLI Module
//!
//! Command-line interface for running the pipeline and its individual stages.

use clap::{Parser, Subcommand};
use colored::*;
use std::path::{Path, PathBuf};
use std::time::{Duration, Instant};

use crate::analysis::{correlation_matrix, describe};
use crate::config::PipelineConfig;
use crate::export::export_dashboard;
use crate::feature_engineering::{FeatureDeriver, ZeroFuelPolicy};
use crate::pipeline::{PipelineDriver, RunOutcome, RunReport, MODEL_FILE};
use crate::preprocessing::Cleaner;
use crate::source::{read_csv, write_csv, CsvTableSource, TableSource};
use crate::table::{Schema, Table};
use crate::training::{ClassificationReport, MaintenanceModel, ScalerFit, Trainer};

// ─── Styling helpers ───────────────────────────────────────────────────────────

const W: usize = 58; // box inner width

fn dim(s: &str) -> ColoredString   { s.truecolor(100, 100, 100) }
fn accent(s: &str) -> ColoredString { s.truecolor(120, 170, 255) }
fn muted(s: &str) -> ColoredString  { s.truecolor(140, 140, 140) }
fn ok(s: &str) -> ColoredString     { s.truecolor(100, 210, 120) }

fn line_box_top()    { println!("  {}", dim("┌─────────────────────────────────────────────────────────┐")); }
fn line_box_bottom() { println!("  {}", dim("└─────────────────────────────────────────────────────────┘")); }
fn line_box_sep()    { println!("  {}", dim("├─────────────────────────────────────────────────────────┤")); }

fn line_box(content: &str) {
    let visible_len = strip_ansi(content).chars().count();
    let pad = W.saturating_sub(visible_len);
    println!("  {}  {}{} {}", dim("│"), content, " ".repeat(pad), dim("│"));
}

fn line_box_center(content: &str) {
    let visible_len = strip_ansi(content).chars().count();
    let total_pad = W.saturating_sub(visible_len);
    let left = total_pad / 2;
    let right = total_pad - left;
    println!("  {}  {}{}{} {}", dim("│"), " ".repeat(left), content, " ".repeat(right), dim("│"));
}

fn line_box_empty() { line_box(""); }

fn strip_ansi(s: &str) -> String {
    let mut out = String::new();
    let mut in_escape = false;
    for c in s.chars() {
        if c == '\x1b' { in_escape = true; continue; }
        if in_escape { if c == 'm' { in_escape = false; } continue; }
        out.push(c);
    }
    out
}

fn kv(key: &str, val: &str) -> String {
    format!("{} {}", muted(key), val.white())
}

fn step_run(msg: &str) {
    print!("  {} {}... ", accent("›"), msg);
}

fn step_done(detail: &str) {
    println!("{} {}", ok("done"), dim(detail));
}

fn section(title: &str) {
    println!();
    println!("  {}", title.white().bold());
    println!("  {}", dim(&"─".repeat(56)));
}

// ─── CLI definition ────────────────────────────────────────────────────────────

#[derive(Parser)]
#[command(name = "telematics")]
#[command(version = env!("CARGO_PKG_VERSION"))]
#[command(about = "Vehicle telematics cleaning, feature derivation and maintenance prediction")]
#[command(long_about = None)]
pub struct Cli {
    /// Pipeline configuration file (JSON)
    #[arg(short, long, global = true)]
    pub config: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Run the full pipeline once
    Run {
        /// Input CSV files, merged in order (overrides the configuration)
        #[arg(short, long)]
        input: Vec<PathBuf>,

        /// Output directory (overrides the configuration)
        #[arg(short, long)]
        output: Option<PathBuf>,
    },

    /// Re-run the pipeline whenever the watched input is fresh
    Watch {
        /// Stop after this many polls
        #[arg(long)]
        iterations: Option<usize>,

        /// Seconds between polls (overrides the configuration)
        #[arg(long)]
        interval: Option<u64>,
    },

    /// Impute, reject outliers and optionally standardize a raw table
    Clean {
        #[arg(short, long)]
        data: PathBuf,

        #[arg(short, long)]
        output: PathBuf,

        /// Z-score threshold for outlier rejection
        #[arg(long)]
        threshold: Option<f64>,

        /// Standardize numeric columns as the last step
        #[arg(long)]
        standardize: bool,
    },

    /// Derive efficiency, idle time and maintenance flags from a cleaned table
    Features {
        #[arg(short, long)]
        data: PathBuf,

        #[arg(short, long)]
        output: PathBuf,

        /// What to do with zero fuel_consumed rows (drop, fail)
        #[arg(long)]
        zero_fuel: Option<String>,
    },

    /// Train and evaluate the maintenance classifier on a feature table
    Train {
        #[arg(short, long)]
        data: PathBuf,

        /// Where to save the fitted model (JSON)
        #[arg(short, long)]
        output: Option<PathBuf>,

        #[arg(long)]
        trees: Option<usize>,

        #[arg(long)]
        seed: Option<u64>,

        #[arg(long)]
        test_fraction: Option<f64>,

        /// Fit the scaler separately on train and test partitions
        #[arg(long)]
        per_partition_scaling: bool,
    },

    /// Score a feature table with a saved model
    Predict {
        #[arg(short, long)]
        model: PathBuf,

        #[arg(short, long)]
        data: PathBuf,

        /// Output CSV with a `predicted_maintenance` column
        #[arg(short, long)]
        output: Option<PathBuf>,
    },

    /// Aggregate a feature table per vehicle for dashboards
    Export {
        #[arg(short, long)]
        data: PathBuf,

        #[arg(short, long)]
        output: PathBuf,
    },

    /// Descriptive statistics and strongest correlations
    Describe {
        #[arg(short, long)]
        data: PathBuf,
    },

    /// Print the effective configuration
    Config {
        /// Also write it to this file
        #[arg(short, long)]
        write: Option<PathBuf>,
    },
}

// ─── Helpers ───────────────────────────────────────────────────────────────────

pub fn load_config(path: Option<&Path>) -> anyhow::Result<PipelineConfig> {
    let config = match path {
        Some(p) => PipelineConfig::load(p)?,
        None => PipelineConfig::default(),
    };
    Ok(config)
}

fn load_table(path: &Path) -> anyhow::Result<Table> {
    step_run(&format!("Loading {}", path.display()));
    let start = Instant::now();
    let table = CsvTableSource::new(path).load()?;
    step_done(&format!(
        "{} rows × {} cols in {:?}",
        table.n_rows(),
        table.n_cols(),
        start.elapsed()
    ));
    Ok(table)
}

fn save_table(table: &Table, path: &Path) -> anyhow::Result<()> {
    step_run(&format!("Saving → {}", path.display()));
    write_csv(table, path)?;
    step_done(&format!("{} rows × {} cols", table.n_rows(), table.n_cols()));
    Ok(())
}

fn print_report(report: &ClassificationReport) {
    println!();
    for line in report.summary().lines() {
        println!("  {}", line);
    }
    let cm = report.confusion.as_matrix();
    println!();
    println!("  {:<16} {}", muted("Confusion"), format!("{:?}", cm).white());
    println!(
        "  {:<16} {}",
        muted("Accuracy"),
        format!("{:.4}", report.accuracy).white().bold()
    );
}

fn print_run_summary(report: &RunReport) {
    println!();
    line_box_top();
    line_box_empty();
    line_box_center(&format!("{}", "Pipeline run complete".white().bold()));
    line_box_center(&format!("{}", dim(&report.finished_at.format("%Y-%m-%d %H:%M:%S UTC").to_string())));
    line_box_empty();
    line_box_sep();
    line_box_empty();
    line_box(&kv("Raw rows     ", &report.rows_raw.to_string()));
    line_box(&kv("Cleaned rows ", &report.rows_cleaned.to_string()));
    line_box(&kv("Feature rows ", &report.rows_features.to_string()));
    line_box(&kv("Vehicles     ", &report.vehicles.to_string()));
    line_box(&kv("Accuracy     ", &format!("{:.4}", report.metrics.accuracy)));
    line_box(&kv("F1 (class 1) ", &format!("{:.4}", report.metrics.positive.f1)));
    line_box_empty();
    line_box_sep();
    line_box_empty();
    for path in &report.artifacts {
        let name = path.file_name().map(|n| n.to_string_lossy().to_string()).unwrap_or_default();
        line_box(&format!("{} {}", ok("✓"), name));
    }
    line_box_empty();
    line_box_bottom();
    println!();
}

// ─── Commands ──────────────────────────────────────────────────────────────────

pub fn cmd_run(
    config: PipelineConfig,
    inputs: Vec<PathBuf>,
    output: Option<PathBuf>,
) -> anyhow::Result<()> {
    section("Run");

    let mut config = config;
    if !inputs.is_empty() {
        config.driver.inputs = inputs;
    }
    if let Some(dir) = output {
        config.driver.output_dir = dir;
    }

    let driver = PipelineDriver::new(config)?;
    let source = driver.configured_source();

    step_run(&format!("Running pipeline on {} input(s)", source.len()));
    let start = Instant::now();
    let outcome = driver.run_once(&source)?;
    step_done(&format!("{:?}", start.elapsed()));

    match outcome {
        RunOutcome::NoWork => {
            println!();
            println!("  {}", "No data available; nothing was written".yellow());
            println!();
        }
        RunOutcome::Completed(report) => print_run_summary(&report),
    }
    Ok(())
}

pub fn cmd_watch(
    config: PipelineConfig,
    iterations: Option<usize>,
    interval: Option<u64>,
) -> anyhow::Result<()> {
    section("Watch");

    let mut config = config;
    if let Some(secs) = interval {
        config.driver = config.driver.with_poll_interval(Duration::from_secs(secs));
    }

    let driver = PipelineDriver::new(config)?;
    let watched = driver
        .config()
        .driver
        .watched()
        .map(|p| p.display().to_string())
        .unwrap_or_default();

    println!("  {:<16} {}", muted("Watching"), watched.white());
    println!("  {:<16} {}s", muted("Interval"), driver.config().driver.poll_interval_secs);
    println!();

    let source = driver.configured_source();
    let summary = driver.watch(&source, iterations)?;

    println!("  {:<16} {}", muted("Polls"), summary.iterations);
    println!("  {:<16} {}", muted("Completed"), ok(&summary.runs_completed.to_string()));
    println!("  {:<16} {}", muted("Failed"), summary.runs_failed.to_string().red());
    println!("  {:<16} {}", muted("Skipped"), summary.skipped + summary.no_work);
    println!();
    Ok(())
}

pub fn cmd_clean(
    config: PipelineConfig,
    data: &Path,
    output: &Path,
    threshold: Option<f64>,
    standardize: bool,
) -> anyhow::Result<()> {
    section("Clean");

    let mut cleaning = config.cleaning;
    if let Some(t) = threshold {
        cleaning = cleaning.with_outlier_threshold(t);
    }
    if standardize {
        cleaning = cleaning.with_standardize(true);
    }

    let table = load_table(data)?;

    step_run("Cleaning");
    let (cleaned, report) = Cleaner::new(cleaning).clean_with_report(&table)?;
    step_done(&format!("{:.3}s", report.elapsed_secs));

    println!();
    for (column, median) in &report.imputed_medians {
        println!("  {:<24} {}", muted(&format!("median {}", column)), format!("{:.3}", median).white());
    }
    println!("  {:<24} {}", muted("Incomplete rows dropped"), report.rows_dropped_incomplete);
    println!("  {:<24} {}", muted("Outlier rows dropped"), report.outliers.rows_removed);
    println!();

    save_table(&cleaned, output)?;
    println!();
    Ok(())
}

pub fn cmd_features(
    config: PipelineConfig,
    data: &Path,
    output: &Path,
    zero_fuel: Option<&str>,
) -> anyhow::Result<()> {
    section("Features");

    let mut features = config.features;
    if let Some(policy) = zero_fuel {
        features = features.with_zero_fuel_policy(match policy {
            "drop" => ZeroFuelPolicy::Drop,
            "fail" => ZeroFuelPolicy::Fail,
            _ => anyhow::bail!("Invalid zero-fuel policy: {}", policy),
        });
    }

    let table = load_table(data)?;

    step_run("Deriving features");
    let start = Instant::now();
    let derived = FeatureDeriver::new(features).derive_features(&table)?;
    step_done(&format!("{:?}", start.elapsed()));

    save_table(&derived, output)?;
    println!();
    Ok(())
}

#[allow(clippy::too_many_arguments)]
pub fn cmd_train(
    config: PipelineConfig,
    data: &Path,
    output: Option<&Path>,
    trees: Option<usize>,
    seed: Option<u64>,
    test_fraction: Option<f64>,
    per_partition_scaling: bool,
) -> anyhow::Result<()> {
    section("Train");

    let mut training = config.training;
    if let Some(n) = trees {
        training = training.with_n_trees(n);
    }
    if let Some(s) = seed {
        training = training.with_seed(s);
    }
    if let Some(f) = test_fraction {
        training = training.with_test_fraction(f);
    }
    if per_partition_scaling {
        training = training.with_scaler_fit(ScalerFit::PerPartition);
    }

    let table = load_table(data)?;

    step_run(&format!("Training {} trees", training.n_trees.to_string().cyan()));
    let outcome = Trainer::new(training).fit_and_evaluate(&table)?;
    step_done(&format!(
        "{} train / {} test rows in {:.3}s",
        outcome.summary.n_train, outcome.summary.n_test, outcome.summary.training_time_secs
    ));

    print_report(&outcome.report);

    section("Feature importances");
    for (name, importance) in outcome.model.feature_importances() {
        println!("  {:<28} {:.4}", name, importance);
    }
    println!();

    let path = output.map(Path::to_path_buf).unwrap_or_else(|| PathBuf::from(MODEL_FILE));
    step_run(&format!("Saving model → {}", path.display()));
    outcome.model.save(&path)?;
    step_done("");
    println!();
    Ok(())
}

pub fn cmd_predict(model_path: &Path, data: &Path, output: Option<&Path>) -> anyhow::Result<()> {
    section("Predict");

    step_run(&format!("Loading model {}", model_path.display()));
    let model = MaintenanceModel::load(model_path)?;
    step_done(&format!("{} features", model.feature_names().len()));

    let table = load_table(data)?;
    let predictions = model.score_table(&table)?;
    let flagged = predictions.iter().filter(|p| **p > 0.5).count();

    println!();
    println!("  {:<20} {}", muted("Rows scored"), predictions.len());
    println!("  {:<20} {}", muted("Need maintenance"), flagged.to_string().yellow().bold());
    println!();

    if let Some(path) = output {
        let scored = table.with_column(crate::table::Column::numeric_dense(
            "predicted_maintenance",
            &predictions.to_vec(),
        ))?;
        save_table(&scored, path)?;
        println!();
    }
    Ok(())
}

pub fn cmd_export(data: &Path, output: &Path) -> anyhow::Result<()> {
    section("Export");

    let table = load_table(data)?;

    step_run(&format!("Aggregating → {}", output.display()));
    let dashboard = export_dashboard(&table, output)?;
    step_done(&format!("{} vehicles", dashboard.n_rows()));
    println!();
    Ok(())
}

pub fn cmd_describe(data: &Path) -> anyhow::Result<()> {
    section("Describe");

    let table = read_csv(data, &Schema::telematics())?;

    println!("  {:<12} {}", muted("File"), data.display());
    println!("  {:<12} {}", muted("Rows"), table.n_rows());
    println!("  {:<12} {}", muted("Columns"), table.n_cols());
    println!();

    println!(
        "  {:<26} {:>6} {:>6} {:>10} {:>10} {:>10} {:>10} {:>10}",
        muted("Column"), muted("Count"), muted("Nulls"), muted("Mean"),
        muted("Median"), muted("Std"), muted("Min"), muted("Max")
    );
    println!("  {}", dim(&"─".repeat(96)));
    for s in describe(&table) {
        println!(
            "  {:<26} {:>6} {:>6} {:>10.3} {:>10.3} {:>10.3} {:>10.3} {:>10.3}",
            s.name, s.count, s.missing, s.mean, s.median, s.std, s.min, s.max
        );
    }

    section("Strongest correlations");
    for (a, b, r) in correlation_matrix(&table).strongest_pairs(5) {
        let value = format!("{:+.3}", r);
        let value = if r.abs() >= 0.7 { value.yellow().bold() } else { value.white() };
        println!("  {:<26} {:<26} {}", a, b, value);
    }
    println!();
    Ok(())
}

pub fn cmd_config(config: &PipelineConfig, write: Option<&Path>) -> anyhow::Result<()> {
    section("Configuration");
    println!("{}", config.to_json()?);
    if let Some(path) = write {
        config.save(path)?;
        println!();
        println!("  {} {}", ok("✓"), path.display());
    }
    println!();
    Ok(())
}
