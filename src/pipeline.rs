//! Batch evaluation and streaming scoring built from the core components.

use crate::evaluation::{GroundTruth, MetricsEvaluator, ModelMetrics};
use crate::feature_extractor::{ClientStateStore, EngineeredTransaction, FeatureEngineer};
use crate::models::{
    IsolationForestSimulator, LogisticRegressionSimulator, ModelSelector, ModelSimulator,
    Stage3Results,
};
use crate::report::DashboardSummary;
use crate::scoring::RuleScorer;
use crate::types::enriched::EnrichedTransaction;
use crate::types::transaction::Transaction;
use serde::Serialize;
use std::time::Instant;
use tracing::{debug, info};

/// Everything a batch run produces
#[derive(Debug, Clone, Serialize)]
pub struct BatchEvaluation {
    pub results: Stage3Results,
    /// Whether metrics were computed against recorded labels or the score heuristic
    pub labeled_ground_truth: bool,
    pub summary: DashboardSummary,
    #[serde(skip)]
    pub records: Vec<EnrichedTransaction>,
}

/// Runs feature engineering, scoring, evaluation and selection over a batch.
#[derive(Default)]
pub struct BatchPipeline {
    engineer: FeatureEngineer,
    scorer: RuleScorer,
    isolation: IsolationForestSimulator,
    logistic: LogisticRegressionSimulator,
    evaluator: MetricsEvaluator,
    selector: ModelSelector,
}

impl BatchPipeline {
    pub fn new() -> Self {
        Self::default()
    }

    /// Engineer features and attach the rule score and both simulator scores.
    pub fn score(&self, transactions: &[Transaction]) -> Vec<EnrichedTransaction> {
        let mut records: Vec<EnrichedTransaction> = self
            .engineer
            .engineer(transactions)
            .into_iter()
            .map(|EngineeredTransaction { mut record, context }| {
                self.scorer.apply(&mut record, &context);
                record
            })
            .collect();

        self.isolation.apply(&mut records);
        self.logistic.apply(&mut records);
        records
    }

    /// Score a batch and rank the three strategies against ground truth.
    pub fn evaluate(&self, transactions: &[Transaction]) -> BatchEvaluation {
        let start = Instant::now();
        let records = self.score(transactions);
        let truth = GroundTruth::resolve(&records);
        let labels = truth.labels();

        let rule_based = self.evaluator.evaluate(
            &records.iter().map(|r| r.analysis.is_suspicious).collect::<Vec<_>>(),
            &records.iter().map(|r| r.analysis.fraud_score).collect::<Vec<_>>(),
            labels,
        );
        let isolation_forest = self.evaluate_simulator(&self.isolation, &records, labels);
        let logistic_regression = self.evaluate_simulator(&self.logistic, &records, labels);

        let results = self
            .selector
            .select(rule_based, isolation_forest, logistic_regression);
        let summary = DashboardSummary::from_records(&records);

        info!(
            transactions = records.len(),
            positives = truth.positives(),
            labeled = truth.is_labeled(),
            best_model = %results.best_model,
            elapsed_ms = start.elapsed().as_millis() as u64,
            "Batch evaluation complete"
        );

        BatchEvaluation {
            results,
            labeled_ground_truth: truth.is_labeled(),
            summary,
            records,
        }
    }

    fn evaluate_simulator<M: ModelSimulator>(
        &self,
        simulator: &M,
        records: &[EnrichedTransaction],
        labels: &[bool],
    ) -> ModelMetrics {
        let scores: Vec<f64> = records
            .iter()
            .map(|r| simulator.stored(&r.analysis).unwrap_or(0.0))
            .collect();
        let predicted: Vec<bool> = scores.iter().map(|&s| simulator.predict(s)).collect();

        let metrics = self.evaluator.evaluate(&predicted, &scores, labels);
        debug!(
            strategy = %simulator.strategy(),
            roc_auc = metrics.roc_auc,
            f1 = metrics.f1_score,
            "Strategy evaluated"
        );
        metrics
    }
}

/// Scores transactions one at a time using incremental per-client state.
///
/// Owns its [`ClientStateStore`]; a service that runs several scorers must
/// route each client to exactly one of them.
#[derive(Default)]
pub struct StreamScorer {
    store: ClientStateStore,
    scorer: RuleScorer,
    isolation: IsolationForestSimulator,
    logistic: LogisticRegressionSimulator,
    processed: u64,
}

impl StreamScorer {
    pub fn new() -> Self {
        Self::default()
    }

    /// Fold one arrival into its client's state and score it.
    pub fn process(&mut self, transaction: Transaction) -> EnrichedTransaction {
        let EngineeredTransaction { mut record, context } = self.store.observe(transaction);
        self.scorer.apply(&mut record, &context);

        for simulator in [&self.isolation as &dyn ModelSimulator, &self.logistic] {
            let score = simulator.score(&record.features, record.amount());
            simulator.store(&mut record.analysis, score);
        }

        self.processed += 1;
        record
    }

    pub fn processed(&self) -> u64 {
        self.processed
    }

    pub fn client_count(&self) -> usize {
        self.store.client_count()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::Strategy;
    use crate::types::alert::RiskLevel;
    use chrono::{DateTime, Duration, TimeZone, Utc};

    fn base() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap()
    }

    fn labeled(id: &str, client: &str, amount: f64, hours: i64, label: u8) -> Transaction {
        Transaction::new(id, client, amount, base() + Duration::hours(hours)).with_label(label)
    }

    fn sample_batch() -> Vec<Transaction> {
        let mut txs = Vec::new();
        for i in 0..10 {
            txs.push(labeled(&format!("a{i}"), "C1", 20.0 + i as f64, i * 5, 0));
        }
        txs.push(labeled("a-spike", "C1", 4500.0, 51, 1));
        txs.push(labeled("b0", "C2", 300.0, 0, 0));
        txs.push(labeled("b1", "C2", 310.0, 10, 0));
        txs
    }

    #[test]
    fn test_score_attaches_all_scores() {
        let records = BatchPipeline::new().score(&sample_batch());

        assert_eq!(records.len(), 13);
        for record in &records {
            assert!(record.analysis.iso_forest_score.is_some());
            assert!(record.analysis.log_reg_score.is_some());
            assert!((0.0..=1.0).contains(&record.analysis.fraud_score));
        }

        let spike = records.iter().find(|r| r.id() == "a-spike").unwrap();
        assert!(spike.analysis.is_suspicious);
        assert!(spike
            .analysis
            .rule_triggered
            .iter()
            .any(|t| t.starts_with("Z-Score Anomaly")));
        assert!(spike
            .analysis
            .rule_triggered
            .contains(&"Max Amount for Client".to_string()));
        assert!(spike.analysis.risk_level >= RiskLevel::High);
    }

    #[test]
    fn test_evaluate_uses_labels() {
        let evaluation = BatchPipeline::new().evaluate(&sample_batch());

        assert!(evaluation.labeled_ground_truth);
        assert_eq!(evaluation.records.len(), 13);
        assert_eq!(evaluation.summary.total_transactions, 13);
        assert_eq!(evaluation.results.rule_based.recall, 1.0);
        assert_eq!(evaluation.results.feature_importance.len(), 4);
        for strategy in Strategy::ALL {
            let auc = evaluation.results.metrics(strategy).roc_auc;
            assert!((0.0..=1.0).contains(&auc));
        }
    }

    #[test]
    fn test_evaluate_empty_batch() {
        let evaluation = BatchPipeline::new().evaluate(&[]);

        assert!(evaluation.records.is_empty());
        assert!(!evaluation.labeled_ground_truth);
        assert_eq!(evaluation.results.rule_based.roc_auc, 0.5);
        assert_eq!(evaluation.results.best_model, Strategy::RuleBased);
    }

    #[test]
    fn test_stream_scorer_tracks_clients() {
        let mut scorer = StreamScorer::new();
        let first = scorer.process(labeled("s0", "C1", 100.0, 0, 0));
        let second = scorer.process(Transaction::new(
            "s1",
            "C1",
            90.0,
            base() + Duration::minutes(30),
        ));
        scorer.process(labeled("s2", "C2", 5.0, 0, 0));

        assert_eq!(first.analysis.fraud_score, 0.0);
        assert!(second.features.is_rapid_transaction);
        assert_eq!(second.features.time_since_last_trans, 0.5);
        assert_eq!(second.analysis.fraud_score, 0.2);
        assert!(second.analysis.log_reg_score.is_some());
        assert_eq!(scorer.processed(), 3);
        assert_eq!(scorer.client_count(), 2);
    }
}
