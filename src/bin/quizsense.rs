//! Quizsense CLI
//!
//! Commands:
//! - analyze: Run the full analysis pipeline for one quiz
//! - model-info: Describe the loaded model artifact and its feature schema
//! - validate: Validate a record-store file
//! - doctor: Diagnose artifact, metadata, and store health

use clap::{Parser, Subcommand, ValueEnum};
use serde::Serialize;
use std::path::PathBuf;
use std::process::ExitCode;
use thiserror::Error;

use quizsense::classifier::{Classifier as _, LogisticModel, ModelMetadata};
use quizsense::error::AnalysisError;
use quizsense::pipeline::AnalysisEngine;
use quizsense::store::MemoryStore;
use quizsense::types::QuizAnalysis;
use quizsense::{ENGINE_VERSION, PRODUCER_NAME};

/// Quizsense - quiz-session stress analysis engine
#[derive(Parser)]
#[command(name = "quizsense")]
#[command(version = ENGINE_VERSION)]
#[command(about = "Analyze quiz sessions into study recommendations", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run the full analysis pipeline for one quiz
    Analyze {
        /// Record-store JSON file
        #[arg(short, long)]
        store: PathBuf,

        /// Model artifact JSON file
        #[arg(short, long)]
        model: PathBuf,

        /// Model metadata JSON file (artifact defaults when omitted)
        #[arg(long)]
        metadata: Option<PathBuf>,

        /// Quiz to analyze
        #[arg(long)]
        quiz_id: i64,

        /// Output format
        #[arg(long, default_value = "json")]
        output_format: OutputFormat,

        /// Write the updated store (with upserted analyses) back to this file
        #[arg(long)]
        save_store: Option<PathBuf>,
    },

    /// Describe the loaded model artifact and its feature schema
    ModelInfo {
        /// Model artifact JSON file
        #[arg(short, long)]
        model: PathBuf,

        /// Model metadata JSON file
        #[arg(long)]
        metadata: Option<PathBuf>,

        /// Output as JSON
        #[arg(long)]
        json: bool,
    },

    /// Validate a record-store file
    Validate {
        /// Record-store JSON file
        #[arg(short, long)]
        store: PathBuf,

        /// Output validation report as JSON
        #[arg(long)]
        json: bool,
    },

    /// Diagnose artifact, metadata, and store health
    Doctor {
        /// Model artifact JSON file
        #[arg(short, long)]
        model: PathBuf,

        /// Model metadata JSON file
        #[arg(long)]
        metadata: Option<PathBuf>,

        /// Record-store JSON file to check
        #[arg(long)]
        store: Option<PathBuf>,

        /// Output report as JSON
        #[arg(long)]
        json: bool,
    },
}

#[derive(Clone, Copy, ValueEnum)]
enum OutputFormat {
    Json,
    JsonPretty,
    Ndjson,
}

#[derive(Debug, Error)]
enum CliError {
    #[error("{0}")]
    Analysis(#[from] AnalysisError),

    #[error("Invalid JSON: {0}")]
    Json(#[from] serde_json::Error),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("doctor checks failed")]
    DoctorFailed,
}

fn main() -> ExitCode {
    let cli = Cli::parse();

    let result = match cli.command {
        Commands::Analyze {
            store,
            model,
            metadata,
            quiz_id,
            output_format,
            save_store,
        } => cmd_analyze(store, model, metadata, quiz_id, output_format, save_store),
        Commands::ModelInfo {
            model,
            metadata,
            json,
        } => cmd_model_info(model, metadata, json),
        Commands::Validate { store, json } => cmd_validate(store, json),
        Commands::Doctor {
            model,
            metadata,
            store,
            json,
        } => cmd_doctor(model, metadata, store, json),
    };

    match result {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("error: {}", e);
            ExitCode::FAILURE
        }
    }
}

fn load_metadata(path: Option<PathBuf>) -> Result<ModelMetadata, CliError> {
    match path {
        Some(path) => Ok(ModelMetadata::load(&path)?),
        None => Ok(ModelMetadata::default()),
    }
}

fn cmd_analyze(
    store_path: PathBuf,
    model_path: PathBuf,
    metadata_path: Option<PathBuf>,
    quiz_id: i64,
    output_format: OutputFormat,
    save_store: Option<PathBuf>,
) -> Result<(), CliError> {
    let model = LogisticModel::load(&model_path)?;
    let metadata = load_metadata(metadata_path)?;
    let mut store = MemoryStore::load(&store_path)?;

    let engine = AnalysisEngine::new(model, metadata);
    let report = engine.analyze_quiz(&mut store, quiz_id)?;

    print!("{}", format_report(&report, output_format)?);

    if let Some(path) = save_store {
        store.save(&path)?;
    }

    Ok(())
}

fn format_report(report: &QuizAnalysis, format: OutputFormat) -> Result<String, CliError> {
    match format {
        OutputFormat::Json => {
            // Pretty-print for humans, compact for pipes
            if atty::is(atty::Stream::Stdout) {
                Ok(serde_json::to_string_pretty(report)? + "\n")
            } else {
                Ok(serde_json::to_string(report)? + "\n")
            }
        }
        OutputFormat::JsonPretty => Ok(serde_json::to_string_pretty(report)? + "\n"),
        OutputFormat::Ndjson => {
            let mut lines: Vec<String> = Vec::with_capacity(report.results.len());
            for result in &report.results {
                lines.push(serde_json::to_string(result)?);
            }
            Ok(lines.join("\n") + "\n")
        }
    }
}

fn cmd_model_info(
    model_path: PathBuf,
    metadata_path: Option<PathBuf>,
    json: bool,
) -> Result<(), CliError> {
    let model = LogisticModel::load(&model_path)?;
    let metadata = load_metadata(metadata_path)?;
    let engine = AnalysisEngine::new(model, metadata);
    let info = engine.model_info();

    if json {
        println!("{}", serde_json::to_string_pretty(&info)?);
    } else {
        println!("Model:    {}", info.model);
        println!(
            "Labels:   {}",
            info.labels
                .iter()
                .map(|l| l.as_str())
                .collect::<Vec<_>>()
                .join(", ")
        );
        println!("Numeric:  {}", info.num_features.join(", "));
        println!("Categorical: {}", info.cat_features.join(", "));
    }

    Ok(())
}

#[derive(Serialize)]
struct ValidationReport {
    store: String,
    quizzes: usize,
    responses: usize,
    analyses: usize,
}

fn cmd_validate(store_path: PathBuf, json: bool) -> Result<(), CliError> {
    let store = MemoryStore::load(&store_path)?;

    let report = ValidationReport {
        store: store_path.display().to_string(),
        quizzes: store.quiz_count(),
        responses: store.response_count(),
        analyses: store.analysis_count(),
    };

    if json {
        println!("{}", serde_json::to_string_pretty(&report)?);
    } else {
        println!("Store:     {}", report.store);
        println!("Quizzes:   {}", report.quizzes);
        println!("Responses: {}", report.responses);
        println!("Analyses:  {}", report.analyses);
    }

    Ok(())
}

#[derive(Serialize)]
enum CheckStatus {
    Ok,
    Warning,
    Error,
}

#[derive(Serialize)]
struct DoctorCheck {
    name: String,
    status: CheckStatus,
    message: String,
}

#[derive(Serialize)]
struct DoctorReport {
    producer: String,
    version: String,
    checks: Vec<DoctorCheck>,
}

fn cmd_doctor(
    model_path: PathBuf,
    metadata_path: Option<PathBuf>,
    store_path: Option<PathBuf>,
    json: bool,
) -> Result<(), CliError> {
    let mut checks = Vec::new();

    let model = match LogisticModel::load(&model_path) {
        Ok(model) => {
            checks.push(DoctorCheck {
                name: "artifact".to_string(),
                status: CheckStatus::Ok,
                message: format!("{} classes", model.classes().len()),
            });
            Some(model)
        }
        Err(e) => {
            checks.push(DoctorCheck {
                name: "artifact".to_string(),
                status: CheckStatus::Error,
                message: e.to_string(),
            });
            None
        }
    };

    match load_metadata(metadata_path) {
        Ok(metadata) => {
            let mut status = CheckStatus::Ok;
            let mut message = format!(
                "{} labels, {} numeric features",
                metadata.labels.len(),
                metadata.num_features.len()
            );
            if let Some(model) = &model {
                let missing = metadata
                    .labels
                    .iter()
                    .any(|label| !model.classes().contains(label));
                if missing {
                    status = CheckStatus::Warning;
                    message = "metadata labels not all known to the artifact".to_string();
                }
            }
            checks.push(DoctorCheck {
                name: "metadata".to_string(),
                status,
                message,
            });
        }
        Err(e) => checks.push(DoctorCheck {
            name: "metadata".to_string(),
            status: CheckStatus::Error,
            message: e.to_string(),
        }),
    }

    if let Some(path) = store_path {
        match MemoryStore::load(&path) {
            Ok(store) => {
                let status = if store.response_count() == 0 {
                    CheckStatus::Warning
                } else {
                    CheckStatus::Ok
                };
                checks.push(DoctorCheck {
                    name: "store".to_string(),
                    status,
                    message: format!(
                        "{} quizzes, {} responses",
                        store.quiz_count(),
                        store.response_count()
                    ),
                });
            }
            Err(e) => checks.push(DoctorCheck {
                name: "store".to_string(),
                status: CheckStatus::Error,
                message: e.to_string(),
            }),
        }
    }

    let report = DoctorReport {
        producer: PRODUCER_NAME.to_string(),
        version: ENGINE_VERSION.to_string(),
        checks,
    };

    if json {
        println!("{}", serde_json::to_string_pretty(&report)?);
    } else {
        println!("Quizsense Doctor Report");
        println!("=======================");
        println!("Producer: {}", report.producer);
        println!("Version:  {}", report.version);
        println!("\nChecks:");

        for check in &report.checks {
            let status_icon = match check.status {
                CheckStatus::Ok => "[OK]",
                CheckStatus::Warning => "[WARN]",
                CheckStatus::Error => "[ERR]",
            };
            println!("  {} {}: {}", status_icon, check.name, check.message);
        }
    }

    let has_errors = report
        .checks
        .iter()
        .any(|c| matches!(c.status, CheckStatus::Error));
    if has_errors {
        Err(CliError::DoctorFailed)
    } else {
        Ok(())
    }
}
