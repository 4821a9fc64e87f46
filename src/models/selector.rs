//! Ranking of the three scoring strategies

use super::LogisticRegressionSimulator;
use crate::evaluation::ModelMetrics;
use serde::{Deserialize, Serialize};
use std::fmt;
use tracing::info;

/// The three candidate scoring strategies, in evaluation order
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Strategy {
    #[serde(rename = "Rule-Based")]
    RuleBased,
    #[serde(rename = "IsolationForest")]
    IsolationForest,
    #[serde(rename = "LogisticRegression")]
    LogisticRegression,
}

impl Strategy {
    /// Evaluation order; earlier strategies win exact AUC ties
    pub const ALL: [Strategy; 3] = [
        Strategy::RuleBased,
        Strategy::IsolationForest,
        Strategy::LogisticRegression,
    ];

    pub fn name(&self) -> &'static str {
        match self {
            Strategy::RuleBased => "Rule-Based",
            Strategy::IsolationForest => "IsolationForest",
            Strategy::LogisticRegression => "LogisticRegression",
        }
    }
}

impl fmt::Display for Strategy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Descriptive feature weight, not derived from data
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FeatureImportance {
    pub feature: String,
    pub coefficient: f64,
}

/// Importance table read off the logistic weights, largest first
pub fn feature_importance() -> Vec<FeatureImportance> {
    let weights = *LogisticRegressionSimulator::new().weights();
    [
        ("amount_zscore", weights.zscore),
        ("is_rapid_transaction", weights.rapid),
        ("amount_rolling_deviation", weights.rolling_deviation),
        ("amount", weights.amount),
    ]
    .into_iter()
    .map(|(feature, coefficient)| FeatureImportance {
        feature: feature.to_string(),
        coefficient,
    })
    .collect()
}

/// Metrics for every strategy plus the selected winner
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Stage3Results {
    pub rule_based: ModelMetrics,
    pub isolation_forest: ModelMetrics,
    pub logistic_regression: ModelMetrics,
    pub best_model: Strategy,
    pub feature_importance: Vec<FeatureImportance>,
}

impl Stage3Results {
    pub fn metrics(&self, strategy: Strategy) -> &ModelMetrics {
        match strategy {
            Strategy::RuleBased => &self.rule_based,
            Strategy::IsolationForest => &self.isolation_forest,
            Strategy::LogisticRegression => &self.logistic_regression,
        }
    }

    pub fn best_metrics(&self) -> &ModelMetrics {
        self.metrics(self.best_model)
    }
}

/// Picks the strategy with the highest ROC-AUC.
#[derive(Debug, Clone, Copy, Default)]
pub struct ModelSelector;

impl ModelSelector {
    pub fn new() -> Self {
        Self
    }

    /// Compare by AUC with strict greater-than in [`Strategy::ALL`] order.
    pub fn select(
        &self,
        rule_based: ModelMetrics,
        isolation_forest: ModelMetrics,
        logistic_regression: ModelMetrics,
    ) -> Stage3Results {
        let candidates = [
            (Strategy::RuleBased, &rule_based),
            (Strategy::IsolationForest, &isolation_forest),
            (Strategy::LogisticRegression, &logistic_regression),
        ];

        let (mut best, mut best_auc) = (Strategy::RuleBased, f64::NEG_INFINITY);
        for (strategy, metrics) in candidates {
            if metrics.roc_auc > best_auc {
                best = strategy;
                best_auc = metrics.roc_auc;
            }
        }

        info!(best_model = %best, roc_auc = best_auc, "Selected best scoring strategy");

        Stage3Results {
            rule_based,
            isolation_forest,
            logistic_regression,
            best_model: best,
            feature_importance: feature_importance(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::evaluation::ConfusionMatrix;

    fn metrics(auc: f64) -> ModelMetrics {
        ModelMetrics {
            roc_auc: auc,
            precision: 0.0,
            recall: 0.0,
            f1_score: 0.0,
            confusion: ConfusionMatrix::default(),
        }
    }

    #[test]
    fn test_highest_auc_wins() {
        let results = ModelSelector::new().select(metrics(0.6), metrics(0.7), metrics(0.9));
        assert_eq!(results.best_model, Strategy::LogisticRegression);
        assert_eq!(results.best_metrics().roc_auc, 0.9);
    }

    #[test]
    fn test_ties_prefer_earlier_strategy() {
        let results = ModelSelector::new().select(metrics(0.8), metrics(0.8), metrics(0.8));
        assert_eq!(results.best_model, Strategy::RuleBased);

        let results = ModelSelector::new().select(metrics(0.5), metrics(0.8), metrics(0.8));
        assert_eq!(results.best_model, Strategy::IsolationForest);
    }

    #[test]
    fn test_strategy_names_serialize() {
        assert_eq!(serde_json::to_string(&Strategy::RuleBased).unwrap(), "\"Rule-Based\"");
        assert_eq!(Strategy::LogisticRegression.to_string(), "LogisticRegression");
    }

    #[test]
    fn test_static_feature_importance() {
        let table = feature_importance();
        assert_eq!(table.len(), 4);
        assert_eq!(table[0].feature, "amount_zscore");
        assert_eq!(table[0].coefficient, 2.45);
        assert_eq!(table[1].coefficient, 1.89);
        assert_eq!(table[2].coefficient, 1.2);
        assert_eq!(table[3].coefficient, 0.0001);
    }
}
