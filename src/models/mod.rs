//! Closed-form scoring strategies and strategy selection

pub mod isolation;
pub mod logistic;
pub mod selector;

pub use isolation::IsolationForestSimulator;
pub use logistic::LogisticRegressionSimulator;
pub use selector::{FeatureImportance, ModelSelector, Stage3Results, Strategy};

use crate::types::enriched::{EngineeredFeatures, EnrichedTransaction, FraudAnalysis};

/// A deterministic scoring function over engineered features.
///
/// Implementations hold no mutable state; identical inputs always produce
/// bit-identical scores.
pub trait ModelSimulator {
    /// Strategy this simulator stands in for
    fn strategy(&self) -> Strategy;

    /// Score a single record's features
    fn score(&self, features: &EngineeredFeatures, amount: f64) -> f64;

    /// Score above which a record is predicted positive
    fn threshold(&self) -> f64;

    /// Store a score on the analysis slot owned by this strategy
    fn store(&self, analysis: &mut FraudAnalysis, score: f64);

    /// Read back the score stored by [`ModelSimulator::store`]
    fn stored(&self, analysis: &FraudAnalysis) -> Option<f64>;

    fn predict(&self, score: f64) -> bool {
        score > self.threshold()
    }

    /// Score every record and write the score onto it.
    fn apply(&self, records: &mut [EnrichedTransaction]) {
        for record in records.iter_mut() {
            let score = self.score(&record.features, record.amount());
            self.store(&mut record.analysis, score);
        }
    }
}
