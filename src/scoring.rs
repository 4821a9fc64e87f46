//! Deterministic rule-based fraud scoring.

use crate::feature_extractor::{ScoringContext, OUTLIER_ZSCORE};
use crate::stats::round_to;
use crate::types::alert::RiskLevel;
use crate::types::enriched::{EnrichedTransaction, FraudAnalysis};

/// Score at or above which a transaction is suspicious.
pub const SUSPICIOUS_THRESHOLD: f64 = 0.5;

const ZSCORE_WEIGHT: f64 = 0.30;
const MAX_AMOUNT_WEIGHT: f64 = 0.25;
const RAPID_WEIGHT: f64 = 0.20;
const ROLLING_DEVIATION_WEIGHT: f64 = 0.20;
const ROUND_AMOUNT_WEIGHT: f64 = 0.10;

const ROLLING_DEVIATION_LIMIT: f64 = 2.0;
const ROUND_AMOUNT_MINIMUM: f64 = 1000.0;
const ROUND_AMOUNT_STEP: f64 = 100.0;

/// Converts engineered features into a bounded score, a risk level and the
/// ordered list of rules that fired.
///
/// Contributions are additive and independent:
///
/// | rule                                   | weight | trigger text                  |
/// |----------------------------------------|--------|-------------------------------|
/// | `|z| > 3`                              | 0.30   | `Z-Score Anomaly (Xσ)`        |
/// | client maximum, group size > 1         | 0.25   | `Max Amount for Client`       |
/// | rapid follow-up                        | 0.20   | `Rapid Sequence (Same Step)`  |
/// | `|rolling deviation| > 2`              | 0.20   | `Rolling Deviation (Xσ)`      |
/// | amount > 1000 and a multiple of 100    | 0.10   | none                          |
#[derive(Debug, Clone, Copy, Default)]
pub struct RuleScorer;

impl RuleScorer {
    pub fn new() -> Self {
        Self
    }

    /// Score one record.
    pub fn score(&self, record: &EnrichedTransaction, context: &ScoringContext) -> FraudAnalysis {
        let features = &record.features;
        let amount = record.amount();
        let mut total = 0.0;
        let mut triggers = Vec::new();

        if features.amount_zscore.abs() > OUTLIER_ZSCORE {
            total += ZSCORE_WEIGHT;
            triggers.push(format!(
                "Z-Score Anomaly ({:.1}σ)",
                round_to(features.amount_zscore, 1)
            ));
        }

        if context.is_max_for_client && context.client_group_size > 1 {
            total += MAX_AMOUNT_WEIGHT;
            triggers.push("Max Amount for Client".to_string());
        }

        if features.is_rapid_transaction {
            total += RAPID_WEIGHT;
            triggers.push("Rapid Sequence (Same Step)".to_string());
        }

        if context.amount_vs_rolling_mean.abs() > ROLLING_DEVIATION_LIMIT {
            total += ROLLING_DEVIATION_WEIGHT;
            triggers.push(format!(
                "Rolling Deviation ({:.1}σ)",
                round_to(context.amount_vs_rolling_mean, 1)
            ));
        }

        if amount > ROUND_AMOUNT_MINIMUM && amount % ROUND_AMOUNT_STEP == 0.0 {
            total += ROUND_AMOUNT_WEIGHT;
        }

        let fraud_score = round_to(f64::min(total, 1.0), 2);

        FraudAnalysis {
            fraud_score,
            is_suspicious: fraud_score >= SUSPICIOUS_THRESHOLD,
            risk_level: RiskLevel::from_score(fraud_score),
            rule_triggered: triggers,
            ..FraudAnalysis::default()
        }
    }

    /// Score a record in place, keeping any strategy scores already attached.
    pub fn apply(&self, record: &mut EnrichedTransaction, context: &ScoringContext) {
        let analysis = self.score(record, context);
        record.analysis = FraudAnalysis {
            iso_forest_score: record.analysis.iso_forest_score,
            log_reg_score: record.analysis.log_reg_score,
            ..analysis
        };
    }
}
