//! Test Transaction Producer
//!
//! Generates step-based payment transactions for a pool of clients and either
//! publishes them to NATS for the streaming scorer or writes them as a CSV
//! batch for `fraud-scoring-pipeline evaluate`.

use anyhow::{Context, Result};
use clap::Parser;
use fraud_scoring_pipeline::ingest::step_to_timestamp;
use fraud_scoring_pipeline::Transaction;
use rand::rngs::ThreadRng;
use rand::Rng;
use std::path::PathBuf;
use std::time::Duration;
use tracing::{info, warn};

const CATEGORIES: [&str; 5] = ["PAYMENT", "TRANSFER", "CASH_OUT", "DEBIT", "CASH_IN"];

#[derive(Parser)]
#[command(name = "test_producer", about = "Generate test transactions")]
struct Args {
    #[arg(long, default_value = "nats://localhost:4222")]
    nats_url: String,
    #[arg(long, default_value = "transactions")]
    subject: String,
    /// Number of transactions to generate
    #[arg(long, default_value_t = 100)]
    count: u64,
    /// Share of generated transactions that are fraudulent
    #[arg(long, default_value_t = 0.1)]
    fraud_rate: f64,
    /// Size of the client pool
    #[arg(long, default_value_t = 20)]
    clients: usize,
    /// Pause between published messages
    #[arg(long, default_value_t = 100)]
    delay_ms: u64,
    /// Write a CSV batch to this path instead of publishing
    #[arg(long)]
    csv: Option<PathBuf>,
}

/// Transaction generator for testing
struct TransactionGenerator {
    rng: ThreadRng,
    transaction_counter: u64,
    clients: Vec<String>,
    /// Next hour step per client
    steps: Vec<i64>,
}

impl TransactionGenerator {
    fn new(clients: usize) -> Self {
        let mut rng = rand::thread_rng();
        let clients: Vec<String> = (0..clients.max(1))
            .map(|_| format!("C{}", rng.gen_range(100_000_000u64..999_999_999)))
            .collect();
        let steps = vec![1; clients.len()];
        Self {
            rng,
            transaction_counter: 0,
            clients,
            steps,
        }
    }

    fn next_id(&mut self) -> String {
        self.transaction_counter += 1;
        format!("tx_{:012}", self.transaction_counter)
    }

    fn pick_client(&mut self) -> usize {
        self.rng.gen_range(0..self.clients.len())
    }

    fn merchant(&mut self) -> String {
        format!("M{}", self.rng.gen_range(100_000_000u64..999_999_999))
    }

    /// Ordinary spending, several hours after the client's previous transaction
    fn generate_legitimate(&mut self) -> Transaction {
        let client = self.pick_client();
        self.steps[client] += self.rng.gen_range(2..12);

        let amount = (self.rng.gen_range(10.0..500.0f64) * 100.0).round() / 100.0;
        let category = CATEGORIES[self.rng.gen_range(0..CATEGORIES.len())];
        let merchant = self.merchant();

        Transaction::new(
            self.next_id(),
            self.clients[client].clone(),
            amount,
            step_to_timestamp(self.steps[client]),
        )
        .with_category(category)
        .with_merchant(merchant)
        .with_label(0)
    }

    /// A large round-amount drain in the same hour as the previous transaction
    fn generate_suspicious(&mut self) -> Transaction {
        let client = self.pick_client();
        let amount = f64::from(self.rng.gen_range(20u32..200)) * 100.0;
        let category = if self.rng.gen_bool(0.5) { "TRANSFER" } else { "CASH_OUT" };
        let merchant = self.merchant();

        Transaction::new(
            self.next_id(),
            self.clients[client].clone(),
            amount,
            step_to_timestamp(self.steps[client]),
        )
        .with_category(category)
        .with_merchant(merchant)
        .with_label(1)
    }

    fn generate(&mut self, fraud_rate: f64) -> Transaction {
        if self.rng.gen_bool(fraud_rate.clamp(0.0, 1.0)) {
            self.generate_suspicious()
        } else {
            self.generate_legitimate()
        }
    }
}

/// Write a CSV in the `step,type,amount,nameOrig,nameDest,isFraud` layout
fn write_csv(path: &PathBuf, args: &Args) -> Result<()> {
    let mut generator = TransactionGenerator::new(args.clients);
    let mut wtr = csv::Writer::from_path(path).with_context(|| format!("Failed to create {:?}", path))?;
    wtr.write_record(["step", "type", "amount", "nameOrig", "nameDest", "isFraud"])?;

    let mut suspicious = 0;
    for _ in 0..args.count {
        let tx = generator.generate(args.fraud_rate);
        let step = (tx.timestamp - step_to_timestamp(0)).num_hours();
        let label = tx.true_label.unwrap_or(0);
        suspicious += u64::from(label);
        wtr.write_record([
            step.to_string(),
            tx.category.clone(),
            tx.amount.to_string(),
            tx.client_id.clone(),
            tx.merchant.clone().unwrap_or_default(),
            label.to_string(),
        ])?;
    }
    wtr.flush()?;

    info!(
        path = %path.display(),
        count = args.count,
        suspicious = suspicious,
        "CSV batch written"
    );
    Ok(())
}

async fn run_dry_mode(args: &Args) -> Result<()> {
    info!("Running in dry-run mode (no NATS connection)");
    let mut generator = TransactionGenerator::new(args.clients);

    for i in 0..args.count {
        let transaction = generator.generate(args.fraud_rate);
        if (i + 1) % 10 == 0 || i == 0 {
            info!("Sample transaction {}:\n{}", i + 1, serde_json::to_string_pretty(&transaction)?);
        }
        tokio::time::sleep(Duration::from_millis(args.delay_ms)).await;
    }
    Ok(())
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive("test_producer=info".parse()?),
        )
        .init();

    let args = Args::parse();
    info!(
        nats_url = %args.nats_url,
        subject = %args.subject,
        count = args.count,
        fraud_rate = args.fraud_rate,
        clients = args.clients,
        "Starting Test Transaction Producer"
    );

    if let Some(path) = &args.csv {
        return write_csv(path, &args);
    }

    let client = match async_nats::connect(&args.nats_url).await {
        Ok(c) => {
            info!("Connected to NATS");
            c
        }
        Err(e) => {
            warn!(error = %e, "Failed to connect to NATS. Running in dry-run mode.");
            return run_dry_mode(&args).await;
        }
    };

    let mut generator = TransactionGenerator::new(args.clients);
    let mut suspicious_count = 0u64;

    for i in 0..args.count {
        let transaction = generator.generate(args.fraud_rate);
        if transaction.true_label == Some(1) {
            suspicious_count += 1;
        }

        let payload = serde_json::to_vec(&transaction)?;
        client.publish(args.subject.clone(), payload.into()).await?;

        if (i + 1) % 10 == 0 {
            info!(
                "Published {}/{} transactions ({} suspicious)",
                i + 1,
                args.count,
                suspicious_count
            );
        }

        tokio::time::sleep(Duration::from_millis(args.delay_ms)).await;
    }
    client.flush().await?;

    info!(
        "Completed! Published {} transactions ({} suspicious)",
        args.count, suspicious_count
    );
    Ok(())
}
