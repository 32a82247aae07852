//! Academic stress CLI module
//!
//! Command-line interface for training, prediction and serving.

use clap::{Parser, Subcommand};
use colored::*;
use serde_json::Value;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Instant;

use crate::config::AppConfig;
use crate::error::StressError;
use crate::inference::{ClassifierService, PREDICTION_COLUMN};
use crate::preprocessing::{records_from_dataframe, RawRecord};
use crate::training::MetricsReport;
use crate::utils::{DataLoader, DatasetSource};

// ─── Styling helpers ───────────────────────────────────────────────────────────

fn dim(s: &str) -> ColoredString { s.truecolor(100, 100, 100) }
fn accent(s: &str) -> ColoredString { s.truecolor(120, 170, 255) }
fn muted(s: &str) -> ColoredString { s.truecolor(140, 140, 140) }
fn ok(s: &str) -> ColoredString { s.truecolor(100, 210, 120) }

fn kv(key: &str, val: &str) -> String {
    format!("  {:<18} {}", muted(key), val.white())
}

fn step_ok(msg: &str) {
    println!("  {} {}", ok("✓"), msg);
}

fn step_warn(msg: &str) {
    println!("  {} {}", "!".yellow(), msg);
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
#[command(name = "academic-stress")]
#[command(version = env!("CARGO_PKG_VERSION"))]
#[command(about = "Decision-tree classifier for student academic stress levels")]
#[command(long_about = None)]
pub struct Cli {
    /// Dataset location: CSV file, dataset directory or http(s) URL
    #[arg(long, global = true, env = "STRESS_DATASET")]
    pub dataset: Option<String>,

    /// Model snapshot path
    #[arg(long, global = true, env = "STRESS_MODEL_PATH")]
    pub model_path: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Train on the dataset, save the snapshot and print the evaluation
    Train,

    /// Predict the stress level of one record
    Predict {
        /// JSON file holding one object of feature values
        #[arg(short, long)]
        input: Option<PathBuf>,

        /// Feature value as name=value (repeatable)
        #[arg(short, long = "field", value_name = "NAME=VALUE")]
        fields: Vec<String>,
    },

    /// Predict every row of a CSV file
    PredictBatch {
        /// Input CSV file
        #[arg(short, long)]
        data: PathBuf,

        /// Write the rows with predictions as JSON lines to this file
        #[arg(short, long)]
        output: Option<PathBuf>,
    },

    /// Train and evaluate in memory without replacing the snapshot
    Metrics,

    /// Show the feature schema of the saved model
    Schema,

    /// Start the HTTP API server
    Serve {
        /// Host to bind
        #[arg(long, env = "API_HOST", default_value = "0.0.0.0")]
        host: String,

        /// Port to listen on
        #[arg(short, long, env = "API_PORT", default_value = "5000")]
        port: u16,

        /// Train at startup when no snapshot can be loaded
        #[arg(long)]
        train_if_missing: bool,
    },
}

impl Cli {
    /// Environment configuration with the global flags applied
    pub fn app_config(&self) -> AppConfig {
        let mut config = AppConfig::from_env();
        if let Some(dataset) = &self.dataset {
            config.classifier.dataset = DatasetSource::parse(dataset);
        }
        if let Some(path) = &self.model_path {
            config.classifier.model_path = path.clone();
        }
        config
    }
}

// ─── Commands ──────────────────────────────────────────────────────────────────

pub fn cmd_train(config: &AppConfig) -> anyhow::Result<()> {
    section("Train");
    println!("{}", kv("Dataset", &config.classifier.dataset.to_string()));
    println!();

    let service = ClassifierService::new(config.classifier.clone());

    step_run("Loading data");
    let start = Instant::now();
    let dataset = service.load_dataset()?;
    step_done(&format!(
        "{} rows × {} cols, {} dropped in {:?}",
        dataset.n_rows(),
        dataset.n_columns(),
        dataset.dropped_rows(),
        start.elapsed()
    ));

    step_run("Training decision tree");
    let start = Instant::now();
    let metrics = service.train_on(&dataset)?;
    step_done(&format!("{:?}", start.elapsed()));
    step_ok(&format!(
        "Snapshot saved to {}",
        config.classifier.model_path.display()
    ));

    print_metrics(&metrics);
    Ok(())
}

pub fn cmd_metrics(config: &AppConfig) -> anyhow::Result<()> {
    section("Metrics");

    let service = ClassifierService::new(config.classifier.clone());
    step_run("Training and evaluating");
    let start = Instant::now();
    let metrics = service.evaluate()?;
    step_done(&format!("{:?}", start.elapsed()));

    print_metrics(&metrics);
    Ok(())
}

pub fn cmd_predict(config: &AppConfig, input: Option<&Path>, fields: &[String]) -> anyhow::Result<()> {
    section("Predict");

    let service = load_service(config)?;
    let record = build_record(input, fields)?;
    let prediction = service.predict(&record)?;

    for diagnostic in &prediction.diagnostics {
        step_warn(&diagnostic.to_string());
    }

    let classes = service
        .snapshot_info()
        .map(|info| info.classes)
        .unwrap_or_default();

    println!();
    println!(
        "  {:<18} {}",
        muted("Stress level"),
        prediction.class.to_string().white().bold()
    );
    println!("{}", kv("Confidence", &format!("{:.1}%", prediction.confidence() * 100.0)));
    for (class, p) in classes.iter().zip(&prediction.probabilities) {
        println!("{}", kv(&format!("  P({})", class), &format!("{:.4}", p)));
    }
    println!();
    Ok(())
}

pub fn cmd_predict_batch(config: &AppConfig, data: &Path, output: Option<&Path>) -> anyhow::Result<()> {
    section("Predict batch");

    let service = load_service(config)?;

    step_run("Loading data");
    let df = DataLoader::new().load_csv(data)?;
    let mut records = records_from_dataframe(&df)?;
    step_done(&format!("{} rows", records.len()));

    step_run("Predicting");
    let start = Instant::now();
    let predictions = service.predict_batch(&records)?;
    step_done(&format!("{:?}", start.elapsed()));

    for (record, &class) in records.iter_mut().zip(&predictions) {
        record.insert(PREDICTION_COLUMN.to_string(), Value::from(class));
    }

    match output {
        Some(path) => {
            let lines = records
                .iter()
                .map(serde_json::to_string)
                .collect::<Result<Vec<_>, _>>()?;
            std::fs::write(path, lines.join("\n") + "\n")?;
            step_ok(&format!("{} predictions written to {}", predictions.len(), path.display()));
        }
        None => {
            println!();
            for (i, class) in predictions.iter().enumerate().take(50) {
                println!("{}", kv(&format!("row {}", i), &class.to_string()));
            }
            if predictions.len() > 50 {
                println!("  {}", dim(&format!("… {} more rows", predictions.len() - 50)));
            }
        }
    }

    let mut counts = std::collections::BTreeMap::new();
    for class in &predictions {
        *counts.entry(*class).or_insert(0usize) += 1;
    }
    section("Distribution");
    for (class, count) in counts {
        println!("{}", kv(&format!("Level {}", class), &count.to_string()));
    }
    println!();
    Ok(())
}

pub fn cmd_schema(config: &AppConfig) -> anyhow::Result<()> {
    section("Schema");

    let service = load_service(config)?;
    if let Some(info) = service.snapshot_info() {
        println!("{}", kv("Target", &info.target_column));
        println!("{}", kv("Trained at", &info.trained_at.to_rfc3339()));
        println!(
            "{}",
            kv("Classes", &info.classes.iter().map(|c| c.to_string()).collect::<Vec<_>>().join(", "))
        );
        println!("{}", kv("Tree", &format!("depth {}, {} leaves", info.tree_depth, info.n_leaves)));
    }

    section("Features");
    for name in service.feature_schema() {
        let categories = service.category_values(&name);
        if categories.is_empty() {
            println!("  {} {}", name.white(), dim("numeric"));
        } else {
            println!("  {} {}", name.white(), dim(&categories.join(" | ")));
        }
    }
    println!();
    Ok(())
}

pub async fn cmd_serve(
    config: AppConfig,
    host: &str,
    port: u16,
    train_if_missing: bool,
) -> anyhow::Result<()> {
    use crate::server::run_server;

    let service = Arc::new(ClassifierService::new(config.classifier.clone()));
    match service.load_snapshot() {
        Ok(info) => step_ok(&format!("Model loaded (trained {})", info.trained_at.to_rfc3339())),
        Err(e) if train_if_missing => {
            step_warn(&format!("{}; training at startup", e));
            let trainer = Arc::clone(&service);
            let metrics = tokio::task::spawn_blocking(move || trainer.train()).await??;
            step_ok(&format!("Model trained (accuracy {:.4})", metrics.accuracy));
        }
        Err(e) => step_warn(&format!("{}; POST /api/train to train a model", e)),
    }

    println!();
    println!("  {}", "Academic Stress API".white().bold());
    println!("  {}", dim(&format!("v{}", env!("CARGO_PKG_VERSION"))));
    println!("{}", kv("API", &format!("http://{}:{}/api", host, port)));
    println!("{}", kv("Health", &format!("http://{}:{}/api/health", host, port)));
    println!("  {}", dim("ctrl+c to stop"));
    println!();

    let server_config = config.server.with_host(host).with_port(port);
    run_server(server_config, service).await
}

// ─── Helpers ───────────────────────────────────────────────────────────────────

fn load_service(config: &AppConfig) -> anyhow::Result<ClassifierService> {
    let service = ClassifierService::new(config.classifier.clone());
    match service.load_snapshot() {
        Ok(_) => Ok(service),
        Err(StressError::NotFound(path)) => {
            anyhow::bail!("No model snapshot at {}. Run `academic-stress train` first.", path)
        }
        Err(e) => Err(e.into()),
    }
}

/// Record from a JSON file and/or `name=value` pairs; pairs win on conflict
fn build_record(input: Option<&Path>, fields: &[String]) -> anyhow::Result<RawRecord> {
    let mut record = match input {
        Some(path) => {
            let text = std::fs::read_to_string(path)?;
            match serde_json::from_str::<Value>(&text)? {
                Value::Object(map) => map,
                _ => anyhow::bail!("{} must hold a JSON object", path.display()),
            }
        }
        None => RawRecord::new(),
    };

    for field in fields {
        let (name, value) = field
            .split_once('=')
            .ok_or_else(|| anyhow::anyhow!("Expected NAME=VALUE, got '{}'", field))?;
        record.insert(name.trim().to_string(), parse_field_value(value));
    }

    Ok(record)
}

fn parse_field_value(raw: &str) -> Value {
    let trimmed = raw.trim();
    if let Ok(i) = trimmed.parse::<i64>() {
        Value::from(i)
    } else if let Some(x) = trimmed.parse::<f64>().ok().filter(|x| x.is_finite()) {
        Value::from(x)
    } else {
        Value::String(raw.to_string())
    }
}

fn print_metrics(metrics: &MetricsReport) {
    section("Evaluation");
    println!("{}", kv("Accuracy", &format!("{:.4}", metrics.accuracy)));
    println!("{}", kv("Baseline", &format!("{:.4}", metrics.baseline_accuracy)));
    println!("{}", kv("Test rows", &metrics.n_test.to_string()));

    section("Classification report");
    println!(
        "  {:<12}{:>10}{:>10}{:>10}{:>10}",
        muted(""), muted("precision"), muted("recall"), muted("f1"), muted("support")
    );
    for c in &metrics.classes {
        println!(
            "  {:<12}{:>10.2}{:>10.2}{:>10.2}{:>10}",
            c.label, c.precision, c.recall, c.f1_score, c.support
        );
    }
    for (name, avg) in [("macro avg", &metrics.macro_avg), ("weighted avg", &metrics.weighted_avg)] {
        println!(
            "  {:<12}{:>10.2}{:>10.2}{:>10.2}{:>10}",
            name, avg.precision, avg.recall, avg.f1_score, avg.support
        );
    }

    section("Confusion matrix");
    for row in &metrics.confusion_matrix {
        let cells: Vec<String> = row.iter().map(|v| format!("{:>5}", v)).collect();
        println!("  {}", cells.join(""));
    }

    section("Feature importance");
    for f in &metrics.feature_importance {
        println!("{}", kv(&f.feature, &format!("{:.4}", f.importance)));
    }
    println!();
}
