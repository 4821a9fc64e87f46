//! Engineered features, scoring results and the combined enriched record

use crate::types::alert::RiskLevel;
use crate::types::transaction::Transaction;
use serde::{Deserialize, Serialize};

/// Behavioral features derived from a client's transaction history.
///
/// Every field is computed from same-client transactions only, and the
/// transaction itself is always part of its own aggregates.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EngineeredFeatures {
    pub client_amount_mean: f64,
    /// Population std of the client's amounts; zero is replaced by 1
    pub client_amount_std: f64,
    pub client_transaction_count: usize,
    pub amount_zscore: f64,
    pub is_amount_outlier: bool,
    /// Hours since the client's previous transaction, 0 for the first
    pub time_since_last_trans: f64,
    pub amount_rolling_mean_5: f64,
    /// Population std of the trailing window; zero is replaced by 1
    pub amount_rolling_std_5: f64,
    pub is_rapid_transaction: bool,
    /// Reserved; never computed by this pipeline
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub category_freq: Option<f64>,
}

/// Outcome of rule-based scoring plus the optional alternative strategy scores
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FraudAnalysis {
    pub fraud_score: f64,
    pub is_suspicious: bool,
    pub risk_level: RiskLevel,
    /// Human-readable descriptions of the rules that fired, in rule order
    pub rule_triggered: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub iso_forest_score: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub log_reg_score: Option<f64>,
}

impl Default for FraudAnalysis {
    fn default() -> Self {
        Self {
            fraud_score: 0.0,
            is_suspicious: false,
            risk_level: RiskLevel::Low,
            rule_triggered: Vec::new(),
            iso_forest_score: None,
            log_reg_score: None,
        }
    }
}

/// A transaction together with its features and scores
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EnrichedTransaction {
    #[serde(flatten)]
    pub transaction: Transaction,
    #[serde(flatten)]
    pub features: EngineeredFeatures,
    #[serde(flatten)]
    pub analysis: FraudAnalysis,
}

impl EnrichedTransaction {
    /// Attach features to a transaction; the analysis starts unscored
    pub fn new(transaction: Transaction, features: EngineeredFeatures) -> Self {
        Self {
            transaction,
            features,
            analysis: FraudAnalysis::default(),
        }
    }

    pub fn id(&self) -> &str {
        &self.transaction.transaction_id
    }

    pub fn amount(&self) -> f64 {
        self.transaction.amount
    }
}
