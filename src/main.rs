//! Fraud Scoring Pipeline - Main Entry Point
//!
//! `evaluate` scores a CSV batch, ranks the three strategies and optionally
//! exports the scored rows and requests a narrative report. `stream` consumes
//! transactions from NATS and publishes fraud alerts.

use anyhow::Result;
use clap::{Parser, Subcommand};
use fraud_scoring_pipeline::{
    config::{AppConfig, LoggingConfig},
    export, ingest,
    report::{unique_triggers, LlmReportGenerator, ReportGenerator},
    service, BatchPipeline,
};
use std::path::PathBuf;
use tracing::info;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "fraud-scoring-pipeline", version, about)]
struct Cli {
    /// Configuration file
    #[arg(long, global = true, default_value = "config/config.toml")]
    config: PathBuf,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Score a CSV batch and compare the scoring strategies
    Evaluate {
        /// Transaction CSV (step, type, amount, nameOrig, nameDest, isFraud)
        #[arg(long)]
        input: PathBuf,
        /// Write the scored transactions to this CSV
        #[arg(long)]
        export: Option<PathBuf>,
        /// Request a narrative report for the batch
        #[arg(long)]
        report: bool,
    },
    /// Score transactions from NATS and publish alerts
    Stream,
}

fn init_logging(logging: &LoggingConfig) -> Result<()> {
    let filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(format!("fraud_scoring_pipeline={}", logging.level)))?;

    let builder = tracing_subscriber::fmt().with_env_filter(filter);
    if logging.format.eq_ignore_ascii_case("json") {
        builder.json().init();
    } else {
        builder.init();
    }
    Ok(())
}

async fn evaluate(
    config: &AppConfig,
    input: PathBuf,
    export_path: Option<PathBuf>,
    report: bool,
) -> Result<()> {
    let transactions = ingest::read_transactions(&input)?;
    let evaluation = BatchPipeline::new().evaluate(&transactions);

    println!("{}", serde_json::to_string_pretty(&evaluation)?);

    if let Some(path) = export_path {
        export::export_csv(path, &evaluation.records)?;
    }

    if report {
        let generator = LlmReportGenerator::new(config.report.clone());
        let triggers = unique_triggers(&evaluation.records);
        let text = generator.generate(&evaluation.summary, &triggers).await;
        println!("\n{text}");
    }

    Ok(())
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    let config = AppConfig::load_from_path(&cli.config)?;
    init_logging(&config.logging)?;

    info!(config = %cli.config.display(), "Starting Fraud Scoring Pipeline");

    match cli.command {
        Command::Evaluate {
            input,
            export,
            report,
        } => evaluate(&config, input, export, report).await,
        Command::Stream => {
            info!(
                alert_threshold = config.detection.alert_threshold,
                workers = config.pipeline.workers,
                "Streaming mode"
            );
            service::run(&config).await
        }
    }
}
