//! Streaming service: NATS in, scored alerts out.
//!
//! Incoming transactions are routed to a fixed pool of workers by a stable
//! hash of the client id. Each worker owns a [`StreamScorer`] and therefore
//! the only copy of its clients' incremental state.

use crate::config::AppConfig;
use crate::consumer::TransactionConsumer;
use crate::metrics::{MetricsReporter, PipelineMetrics, MILESTONE_INTERVAL};
use crate::pipeline::StreamScorer;
use crate::producer::AlertProducer;
use crate::types::{EnrichedTransaction, FraudAlert, Transaction};
use anyhow::Result;
use futures::StreamExt;
use std::sync::Arc;
use std::time::Instant;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::{debug, error, info, warn};

/// Worker index for a client (FNV-1a, stable across runs).
pub fn shard_for(client_id: &str, workers: usize) -> usize {
    let mut hash: u64 = 0xcbf2_9ce4_8422_2325;
    for byte in client_id.bytes() {
        hash ^= u64::from(byte);
        hash = hash.wrapping_mul(0x0000_0100_0000_01b3);
    }
    (hash % workers.max(1) as u64) as usize
}

/// Whether a running total lands exactly on a milestone.
///
/// Totals come from the counter's own increment, so each milestone is seen
/// by exactly one worker.
pub fn is_milestone(processed: u64) -> bool {
    processed > 0 && processed % MILESTONE_INTERVAL == 0
}

/// Score a transaction and decide whether it should be published.
pub fn score_for_alert(
    scorer: &mut StreamScorer,
    transaction: Transaction,
    alert_threshold: f64,
) -> (EnrichedTransaction, Option<FraudAlert>) {
    let record = scorer.process(transaction);
    let alert = (record.analysis.fraud_score >= alert_threshold)
        .then(|| FraudAlert::from_enriched(&record));
    (record, alert)
}

fn spawn_worker(
    id: usize,
    mut rx: mpsc::Receiver<Transaction>,
    producer: AlertProducer,
    metrics: Arc<PipelineMetrics>,
    alert_threshold: f64,
) -> JoinHandle<()> {
    tokio::spawn(async move {
        let mut scorer = StreamScorer::new();

        while let Some(transaction) = rx.recv().await {
            let start = Instant::now();
            let (record, alert) = score_for_alert(&mut scorer, transaction, alert_threshold);
            let processed = metrics.record_transaction(start.elapsed(), &record);
            if is_milestone(processed) {
                info!(
                    worker = id,
                    processed = processed,
                    throughput = format!("{:.1} tx/s", metrics.get_throughput()),
                    "Processing milestone"
                );
            }

            match alert {
                Some(alert) => match producer.publish(&alert).await {
                    Ok(()) => {
                        metrics.record_alert();
                        info!(
                            worker = id,
                            transaction_id = %alert.transaction_id,
                            risk_score = alert.risk_score,
                            risk_level = %alert.risk_level,
                            "Fraud alert published"
                        );
                    }
                    Err(e) => error!(
                        worker = id,
                        transaction_id = %alert.transaction_id,
                        error = %e,
                        "Failed to publish fraud alert"
                    ),
                },
                None => debug!(
                    worker = id,
                    transaction_id = %record.transaction.transaction_id,
                    risk_score = record.analysis.fraud_score,
                    "Transaction scored (below threshold)"
                ),
            }
        }

        info!(
            worker = id,
            processed = scorer.processed(),
            clients = scorer.client_count(),
            "Worker stopped"
        );
    })
}

/// Consume transactions until the subscription ends.
pub async fn run(config: &AppConfig) -> Result<()> {
    let client = async_nats::connect(&config.nats.url).await?;
    info!(url = %config.nats.url, "Connected to NATS");

    let consumer = TransactionConsumer::new(client.clone(), &config.nats.transaction_subject);
    let producer = AlertProducer::new(client, &config.nats.alert_subject);
    let metrics = Arc::new(PipelineMetrics::new());

    let reporter = MetricsReporter::new(metrics.clone(), config.pipeline.report_interval_secs);
    let reporter_task = tokio::spawn(reporter.start());

    let workers = config.pipeline.workers.max(1);
    let mut senders = Vec::with_capacity(workers);
    let mut handles = Vec::with_capacity(workers);
    for id in 0..workers {
        let (tx, rx) = mpsc::channel(config.pipeline.queue_capacity.max(1));
        senders.push(tx);
        handles.push(spawn_worker(
            id,
            rx,
            producer.clone(),
            metrics.clone(),
            config.detection.alert_threshold,
        ));
    }
    info!(
        workers = workers,
        subject = %consumer.subject(),
        alerts = %producer.subject(),
        "Streaming scorer started"
    );

    let mut subscription = consumer.subscribe().await?;
    while let Some(message) = subscription.next().await {
        let transaction = match TransactionConsumer::decode(&message.payload) {
            Ok(tx) => tx,
            Err(e) => {
                metrics.record_decode_failure();
                warn!(error = %e, "Failed to deserialize transaction");
                continue;
            }
        };

        let shard = shard_for(&transaction.client_id, workers);
        if senders[shard].send(transaction).await.is_err() {
            error!(worker = shard, "Worker channel closed");
            break;
        }
    }

    info!("Subscription closed, draining workers");
    drop(senders);
    for handle in handles {
        if let Err(e) = handle.await {
            error!(error = %e, "Worker task failed");
        }
    }
    reporter_task.abort();
    metrics.print_summary();

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, TimeZone, Utc};

    #[test]
    fn test_shard_is_stable_and_in_range() {
        for workers in 1..8 {
            let shard = shard_for("C1231006815", workers);
            assert!(shard < workers);
            assert_eq!(shard, shard_for("C1231006815", workers));
        }
        assert_eq!(shard_for("anything", 0), 0);
    }

    #[test]
    fn test_each_milestone_reached_once() {
        let metrics = PipelineMetrics::new();
        let mut scorer = StreamScorer::new();
        let base = Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap();

        let mut milestones = Vec::new();
        for i in 0..2_500 {
            let record = scorer.process(Transaction::new(format!("t{i}"), "C1", 10.0, base));
            let processed = metrics.record_transaction(std::time::Duration::ZERO, &record);
            if is_milestone(processed) {
                milestones.push(processed);
            }
        }
        assert_eq!(milestones, vec![1_000, 2_000]);
        assert!(!is_milestone(0));
    }

    #[test]
    fn test_alert_only_above_threshold() {
        let base = Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap();
        let mut scorer = StreamScorer::new();

        let (_, alert) = score_for_alert(&mut scorer, Transaction::new("a", "C1", 10.0, base), 0.5);
        assert!(alert.is_none());

        // Rapid, new maximum and a round amount: 0.2 + 0.25 + 0.1
        let (record, alert) = score_for_alert(
            &mut scorer,
            Transaction::new("b", "C1", 5000.0, base + Duration::minutes(5)),
            0.5,
        );
        assert_eq!(record.analysis.fraud_score, 0.55);
        let alert = alert.unwrap();
        assert_eq!(alert.transaction_id, "b");
        assert_eq!(alert.model_scores.len(), 2);
    }
}
