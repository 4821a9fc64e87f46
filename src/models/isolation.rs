//! Distance-based anomaly score standing in for an isolation forest

use super::{ModelSimulator, Strategy};
use crate::stats::round_to;
use crate::types::enriched::{EngineeredFeatures, FraudAnalysis};

/// Scores a record by the length of its normalized anomaly vector.
///
/// Three components, each clipped to `[0, 1]`:
/// - `|z| / 10`
/// - rolling std relative to the client mean
/// - 1 when the transaction is a rapid follow-up
///
/// The Euclidean norm is divided by `sqrt(3)` so the score stays in `[0, 1]`.
#[derive(Debug, Clone, Copy, Default)]
pub struct IsolationForestSimulator;

impl IsolationForestSimulator {
    pub const THRESHOLD: f64 = 0.4;

    pub fn new() -> Self {
        Self
    }
}

impl ModelSimulator for IsolationForestSimulator {
    fn strategy(&self) -> Strategy {
        Strategy::IsolationForest
    }

    fn score(&self, features: &EngineeredFeatures, _amount: f64) -> f64 {
        let zscore_term = (features.amount_zscore.abs() / 10.0).min(1.0);

        let mean = if features.client_amount_mean == 0.0 {
            1.0
        } else {
            features.client_amount_mean
        };
        let volatility_term = (features.amount_rolling_std_5 / mean).min(1.0);

        let rapid_term: f64 = if features.is_rapid_transaction { 1.0 } else { 0.0 };

        let norm = (zscore_term.powi(2) + volatility_term.powi(2) + rapid_term.powi(2)).sqrt();
        round_to(norm / 3f64.sqrt(), 4)
    }

    fn threshold(&self) -> f64 {
        Self::THRESHOLD
    }

    fn store(&self, analysis: &mut FraudAnalysis, score: f64) {
        analysis.iso_forest_score = Some(score);
    }

    fn stored(&self, analysis: &FraudAnalysis) -> Option<f64> {
        analysis.iso_forest_score
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn features(zscore: f64, rolling_std: f64, mean: f64, rapid: bool) -> EngineeredFeatures {
        EngineeredFeatures {
            client_amount_mean: mean,
            client_amount_std: 1.0,
            client_transaction_count: 2,
            amount_zscore: zscore,
            is_amount_outlier: zscore.abs() > 3.0,
            time_since_last_trans: 0.0,
            amount_rolling_mean_5: mean,
            amount_rolling_std_5: rolling_std,
            is_rapid_transaction: rapid,
            category_freq: None,
        }
    }

    #[test]
    fn test_all_components_saturated() {
        let sim = IsolationForestSimulator::new();
        let score = sim.score(&features(-12.0, 500.0, 100.0, true), 0.0);

        assert_eq!(score, 1.0);
        assert!(sim.predict(score));
    }

    #[test]
    fn test_quiet_record() {
        let sim = IsolationForestSimulator::new();
        // rolling_std 1 over mean 100 -> 0.01 only
        let score = sim.score(&features(0.0, 1.0, 100.0, false), 0.0);

        assert_eq!(score, round_to(0.01 / 3f64.sqrt(), 4));
        assert!(!sim.predict(score));
    }

    #[test]
    fn test_rapid_alone_crosses_threshold() {
        let sim = IsolationForestSimulator::new();
        let score = sim.score(&features(0.0, 1.0, 1.0e9, true), 0.0);

        assert_eq!(score, 0.5774);
        assert!(sim.predict(score));
    }

    #[test]
    fn test_zero_mean_uses_unit_denominator() {
        let sim = IsolationForestSimulator::new();
        let score = sim.score(&features(0.0, 1.0, 0.0, false), 0.0);

        assert!(score.is_finite());
        assert_eq!(score, 0.5774);
    }

    #[test]
    fn test_deterministic() {
        let sim = IsolationForestSimulator::new();
        let f = features(2.5, 37.0, 80.0, true);
        assert_eq!(sim.score(&f, 0.0).to_bits(), sim.score(&f, 0.0).to_bits());
    }
}
