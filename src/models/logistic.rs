//! Fixed-weight logistic score standing in for a logistic regression

use super::{ModelSimulator, Strategy};
use crate::stats::{round_to, sigmoid};
use crate::types::enriched::{EngineeredFeatures, FraudAnalysis};

/// Hand-tuned linear weights
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LogisticWeights {
    pub zscore: f64,
    pub rapid: f64,
    pub amount: f64,
    pub rolling_deviation: f64,
    pub bias: f64,
}

impl Default for LogisticWeights {
    fn default() -> Self {
        Self {
            zscore: 2.45,
            rapid: 1.89,
            amount: 0.0001,
            rolling_deviation: 1.2,
            bias: -4.5,
        }
    }
}

/// Sigmoid of a weighted sum over four inputs.
#[derive(Debug, Clone, Copy, Default)]
pub struct LogisticRegressionSimulator {
    weights: LogisticWeights,
}

impl LogisticRegressionSimulator {
    pub const THRESHOLD: f64 = 0.5;

    pub fn new() -> Self {
        Self::default()
    }

    pub fn weights(&self) -> &LogisticWeights {
        &self.weights
    }

    /// Linear predictor before the sigmoid.
    pub fn logit(&self, features: &EngineeredFeatures, amount: f64) -> f64 {
        let w = &self.weights;
        let rapid = if features.is_rapid_transaction { 1.0 } else { 0.0 };
        let rolling_deviation =
            (amount - features.amount_rolling_mean_5).abs() / features.amount_rolling_std_5;

        w.zscore * features.amount_zscore.abs()
            + w.rapid * rapid
            + w.amount * amount
            + w.rolling_deviation * rolling_deviation
            + w.bias
    }
}

impl ModelSimulator for LogisticRegressionSimulator {
    fn strategy(&self) -> Strategy {
        Strategy::LogisticRegression
    }

    fn score(&self, features: &EngineeredFeatures, amount: f64) -> f64 {
        round_to(sigmoid(self.logit(features, amount)), 4)
    }

    fn threshold(&self) -> f64 {
        Self::THRESHOLD
    }

    fn store(&self, analysis: &mut FraudAnalysis, score: f64) {
        analysis.log_reg_score = Some(score);
    }

    fn stored(&self, analysis: &FraudAnalysis) -> Option<f64> {
        analysis.log_reg_score
    }
}
