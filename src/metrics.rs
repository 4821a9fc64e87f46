//! Operational statistics for the streaming scorer.

use crate::types::alert::RiskLevel;
use crate::types::enriched::EnrichedTransaction;
use std::collections::BTreeMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, RwLock};
use std::time::{Duration, Instant};
use tracing::info;

/// Most recent latency samples kept for percentiles
const LATENCY_SAMPLES: usize = 10_000;
/// Most recent agreement samples kept for the average
const AGREEMENT_SAMPLES: usize = 1_000;
/// Processed-transaction interval between milestone log lines
pub const MILESTONE_INTERVAL: u64 = 1_000;

/// Metrics collector shared by all streaming workers
pub struct PipelineMetrics {
    /// Total transactions scored
    pub transactions_processed: AtomicU64,
    /// Total alerts published
    pub alerts_published: AtomicU64,
    /// Messages that could not be decoded
    pub decode_failures: AtomicU64,
    /// Scored transactions by risk level
    by_level: RwLock<BTreeMap<RiskLevel, u64>>,
    /// Scoring latency (in microseconds)
    processing_times: RwLock<Vec<u64>>,
    /// Rule-based score distribution buckets
    score_buckets: RwLock<[u64; 10]>,
    /// How closely the three strategies agree per transaction
    strategy_agreements: RwLock<Vec<f64>>,
    start_time: Instant,
}

impl PipelineMetrics {
    pub fn new() -> Self {
        Self {
            transactions_processed: AtomicU64::new(0),
            alerts_published: AtomicU64::new(0),
            decode_failures: AtomicU64::new(0),
            by_level: RwLock::new(BTreeMap::new()),
            processing_times: RwLock::new(Vec::with_capacity(1000)),
            score_buckets: RwLock::new([0; 10]),
            strategy_agreements: RwLock::new(Vec::with_capacity(1000)),
            start_time: Instant::now(),
        }
    }

    /// Record a scored transaction and return the running total including it
    pub fn record_transaction(&self, processing_time: Duration, record: &EnrichedTransaction) -> u64 {
        let processed = self.transactions_processed.fetch_add(1, Ordering::Relaxed) + 1;

        if let Ok(mut times) = self.processing_times.write() {
            times.push(processing_time.as_micros() as u64);
            if times.len() > LATENCY_SAMPLES {
                times.drain(0..LATENCY_SAMPLES / 2);
            }
        }

        let bucket = ((record.analysis.fraud_score * 10.0) as usize).min(9);
        if let Ok(mut buckets) = self.score_buckets.write() {
            buckets[bucket] += 1;
        }

        if let Ok(mut by_level) = self.by_level.write() {
            *by_level.entry(record.analysis.risk_level).or_insert(0) += 1;
        }

        let scores: Vec<f64> = [
            Some(record.analysis.fraud_score),
            record.analysis.iso_forest_score,
            record.analysis.log_reg_score,
        ]
        .into_iter()
        .flatten()
        .collect();
        self.record_strategy_agreement(&scores);
        processed
    }

    pub fn record_alert(&self) {
        self.alerts_published.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_decode_failure(&self) {
        self.decode_failures.fetch_add(1, Ordering::Relaxed);
    }

    /// Record agreement as 1 - population std of the strategy scores
    pub fn record_strategy_agreement(&self, scores: &[f64]) {
        if scores.len() < 2 {
            return;
        }

        let mean = scores.iter().sum::<f64>() / scores.len() as f64;
        let variance =
            scores.iter().map(|s| (s - mean).powi(2)).sum::<f64>() / scores.len() as f64;
        let agreement = 1.0 - variance.sqrt().min(1.0);

        if let Ok(mut agreements) = self.strategy_agreements.write() {
            agreements.push(agreement);
            if agreements.len() > AGREEMENT_SAMPLES {
                agreements.drain(0..AGREEMENT_SAMPLES / 2);
            }
        }
    }

    /// Latency percentiles over the retained samples
    pub fn get_processing_stats(&self) -> ProcessingStats {
        let Ok(times) = self.processing_times.read() else {
            return ProcessingStats::default();
        };
        if times.is_empty() {
            return ProcessingStats::default();
        }

        let mut sorted: Vec<u64> = times.clone();
        sorted.sort_unstable();

        let count = sorted.len();
        let sum: u64 = sorted.iter().sum();
        let percentile = |p: f64| sorted[((count as f64 * p) as usize).min(count - 1)];

        ProcessingStats {
            count: count as u64,
            mean_us: sum / count as u64,
            p50_us: sorted[count / 2],
            p95_us: percentile(0.95),
            p99_us: percentile(0.99),
            max_us: sorted[count - 1],
        }
    }

    pub fn get_avg_agreement(&self) -> f64 {
        match self.strategy_agreements.read() {
            Ok(agreements) if !agreements.is_empty() => {
                agreements.iter().sum::<f64>() / agreements.len() as f64
            }
            _ => 0.0,
        }
    }

    /// Transactions per second since start
    pub fn get_throughput(&self) -> f64 {
        let elapsed = self.start_time.elapsed().as_secs_f64();
        if elapsed > 0.0 {
            self.transactions_processed.load(Ordering::Relaxed) as f64 / elapsed
        } else {
            0.0
        }
    }

    pub fn get_score_distribution(&self) -> [u64; 10] {
        self.score_buckets.read().map(|b| *b).unwrap_or([0; 10])
    }

    pub fn get_counts_by_level(&self) -> BTreeMap<RiskLevel, u64> {
        self.by_level.read().map(|m| m.clone()).unwrap_or_default()
    }

    /// Log a summary of everything collected so far
    pub fn print_summary(&self) {
        let tx_count = self.transactions_processed.load(Ordering::Relaxed);
        let alert_count = self.alerts_published.load(Ordering::Relaxed);
        let alert_rate = if tx_count > 0 {
            (alert_count as f64 / tx_count as f64) * 100.0
        } else {
            0.0
        };
        let processing = self.get_processing_stats();

        info!(
            transactions = tx_count,
            alerts = alert_count,
            alert_rate_pct = format!("{:.1}", alert_rate),
            decode_failures = self.decode_failures.load(Ordering::Relaxed),
            throughput = format!("{:.1} tx/s", self.get_throughput()),
            "Streaming summary"
        );
        info!(
            mean_us = processing.mean_us,
            p50_us = processing.p50_us,
            p95_us = processing.p95_us,
            p99_us = processing.p99_us,
            max_us = processing.max_us,
            strategy_agreement_pct = format!("{:.1}", self.get_avg_agreement() * 100.0),
            "Scoring latency"
        );

        for (level, count) in self.get_counts_by_level() {
            info!(risk_level = %level, count = count, "Risk level count");
        }

        let distribution = self.get_score_distribution();
        let total: u64 = distribution.iter().sum();
        for (i, &count) in distribution.iter().enumerate() {
            if count == 0 {
                continue;
            }
            let pct = if total > 0 { (count as f64 / total as f64) * 100.0 } else { 0.0 };
            info!(
                "  {:.1}-{:.1}: {:>6} ({:>5.1}%) {}",
                i as f64 / 10.0,
                (i + 1) as f64 / 10.0,
                count,
                pct,
                "█".repeat(((pct / 5.0) as usize).min(20))
            );
        }
    }
}

impl Default for PipelineMetrics {
    fn default() -> Self {
        Self::new()
    }
}

/// Processing time statistics
#[derive(Debug, Default)]
pub struct ProcessingStats {
    pub count: u64,
    pub mean_us: u64,
    pub p50_us: u64,
    pub p95_us: u64,
    pub p99_us: u64,
    pub max_us: u64,
}

/// Prints a summary at a fixed interval
pub struct MetricsReporter {
    metrics: Arc<PipelineMetrics>,
    interval_secs: u64,
}

impl MetricsReporter {
    pub fn new(metrics: Arc<PipelineMetrics>, interval_secs: u64) -> Self {
        Self {
            metrics,
            interval_secs,
        }
    }

    /// Run until the task is dropped
    pub async fn start(self) {
        let mut interval = tokio::time::interval(Duration::from_secs(self.interval_secs.max(1)));
        // The first tick completes immediately
        interval.tick().await;
        loop {
            interval.tick().await;
            self.metrics.print_summary();
        }
    }
}
