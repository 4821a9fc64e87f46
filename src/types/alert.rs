//! Risk classification and fraud alert data structures

use crate::types::enriched::EnrichedTransaction;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;

/// Risk level classification
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum RiskLevel {
    Low,
    Medium,
    High,
    Critical,
}

impl RiskLevel {
    /// Score above which a transaction is critical
    pub const CRITICAL_ABOVE: f64 = 0.8;
    /// Score at or above which a transaction is high risk (and suspicious)
    pub const HIGH_FROM: f64 = 0.5;
    /// Score above which a transaction is medium risk
    pub const MEDIUM_ABOVE: f64 = 0.3;

    /// Determine risk level from a rounded fraud score
    pub fn from_score(score: f64) -> Self {
        if score > Self::CRITICAL_ABOVE {
            RiskLevel::Critical
        } else if score >= Self::HIGH_FROM {
            RiskLevel::High
        } else if score > Self::MEDIUM_ABOVE {
            RiskLevel::Medium
        } else {
            RiskLevel::Low
        }
    }

    /// Upper-case label used in exports and reports
    pub fn as_str(&self) -> &'static str {
        match self {
            RiskLevel::Low => "LOW",
            RiskLevel::Medium => "MEDIUM",
            RiskLevel::High => "HIGH",
            RiskLevel::Critical => "CRITICAL",
        }
    }
}

impl fmt::Display for RiskLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Fraud alert published when a streamed transaction is suspicious
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FraudAlert {
    /// Unique alert identifier
    pub alert_id: String,

    /// Associated transaction ID
    pub transaction_id: String,

    /// Owning client
    pub client_id: String,

    /// Transaction amount
    pub amount: f64,

    /// Rule-based fraud score (0.0 - 1.0)
    pub risk_score: f64,

    /// Risk level classification
    pub risk_level: RiskLevel,

    /// Scores from the alternative strategies
    pub model_scores: HashMap<String, f64>,

    /// Rules that contributed to the alert
    pub triggered_rules: Vec<String>,

    /// Alert generation timestamp
    pub timestamp: DateTime<Utc>,
}

impl FraudAlert {
    /// Create a new fraud alert
    pub fn new(
        transaction_id: String,
        client_id: String,
        amount: f64,
        risk_score: f64,
        risk_level: RiskLevel,
    ) -> Self {
        Self {
            alert_id: uuid::Uuid::new_v4().to_string(),
            transaction_id,
            client_id,
            amount,
            risk_score,
            risk_level,
            model_scores: HashMap::new(),
            triggered_rules: Vec::new(),
            timestamp: Utc::now(),
        }
    }

    /// Build an alert from a scored record
    pub fn from_enriched(record: &EnrichedTransaction) -> Self {
        let mut model_scores = HashMap::new();
        if let Some(score) = record.analysis.iso_forest_score {
            model_scores.insert("isolation_forest".to_string(), score);
        }
        if let Some(score) = record.analysis.log_reg_score {
            model_scores.insert("logistic_regression".to_string(), score);
        }

        Self::new(
            record.transaction.transaction_id.clone(),
            record.transaction.client_id.clone(),
            record.transaction.amount,
            record.analysis.fraud_score,
            record.analysis.risk_level,
        )
        .with_model_scores(model_scores)
        .with_triggered_rules(record.analysis.rule_triggered.clone())
    }

    /// Add alternative strategy scores to the alert
    pub fn with_model_scores(mut self, model_scores: HashMap<String, f64>) -> Self {
        self.model_scores = model_scores;
        self
    }

    /// Add triggered rules to the alert
    pub fn with_triggered_rules(mut self, rules: Vec<String>) -> Self {
        self.triggered_rules = rules;
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_risk_level_from_score() {
        assert_eq!(RiskLevel::from_score(0.1), RiskLevel::Low);
        assert_eq!(RiskLevel::from_score(0.45), RiskLevel::Medium);
        assert_eq!(RiskLevel::from_score(0.75), RiskLevel::High);
        assert_eq!(RiskLevel::from_score(0.95), RiskLevel::Critical);
    }

    #[test]
    fn test_risk_level_boundaries() {
        assert_eq!(RiskLevel::from_score(0.3), RiskLevel::Low);
        assert_eq!(RiskLevel::from_score(0.31), RiskLevel::Medium);
        assert_eq!(RiskLevel::from_score(0.5), RiskLevel::High);
        assert_eq!(RiskLevel::from_score(0.8), RiskLevel::High);
        assert_eq!(RiskLevel::from_score(0.81), RiskLevel::Critical);
    }

    #[test]
    fn test_fraud_alert_serialization() {
        let alert = FraudAlert::new(
            "tx_123".to_string(),
            "C1".to_string(),
            5000.0,
            0.75,
            RiskLevel::High,
        )
        .with_triggered_rules(vec!["Max Amount for Client".to_string()]);

        let json = serde_json::to_string(&alert).unwrap();
        assert!(json.contains("\"HIGH\""));

        let deserialized: FraudAlert = serde_json::from_str(&json).unwrap();
        assert_eq!(alert.transaction_id, deserialized.transaction_id);
        assert_eq!(alert.risk_score, deserialized.risk_score);
        assert_eq!(alert.risk_level, deserialized.risk_level);
        assert_eq!(deserialized.triggered_rules.len(), 1);
    }
}
