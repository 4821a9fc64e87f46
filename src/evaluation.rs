//! Classification metrics for comparing scoring strategies against ground truth.

use crate::stats::round_to;
use crate::types::enriched::EnrichedTransaction;
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

/// Fraud score above which an unlabeled batch treats a record as positive.
pub const HEURISTIC_LABEL_THRESHOLD: f64 = 0.7;

/// AUC reported when either class is absent.
pub const UNDEFINED_AUC: f64 = 0.5;

/// Four-way tally of predictions against truth
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConfusionMatrix {
    pub true_positives: usize,
    pub false_positives: usize,
    pub false_negatives: usize,
    pub true_negatives: usize,
}

impl ConfusionMatrix {
    /// Tally parallel prediction and truth labels.
    pub fn from_labels(predicted: &[bool], truth: &[bool]) -> Self {
        let mut matrix = Self::default();
        for (&pred, &actual) in predicted.iter().zip(truth) {
            match (actual, pred) {
                (true, true) => matrix.true_positives += 1,
                (false, true) => matrix.false_positives += 1,
                (true, false) => matrix.false_negatives += 1,
                (false, false) => matrix.true_negatives += 1,
            }
        }
        matrix
    }

    pub fn total(&self) -> usize {
        self.true_positives + self.false_positives + self.false_negatives + self.true_negatives
    }

    /// tp / (tp + fp), or 0 when nothing was predicted positive
    pub fn precision(&self) -> f64 {
        ratio(self.true_positives, self.true_positives + self.false_positives)
    }

    /// tp / (tp + fn), or 0 when there are no positives
    pub fn recall(&self) -> f64 {
        ratio(self.true_positives, self.true_positives + self.false_negatives)
    }

    /// Harmonic mean of precision and recall, or 0 when both are 0
    pub fn f1(&self) -> f64 {
        let (p, r) = (self.precision(), self.recall());
        if p + r == 0.0 {
            0.0
        } else {
            2.0 * p * r / (p + r)
        }
    }
}

fn ratio(numerator: usize, denominator: usize) -> f64 {
    if denominator == 0 {
        0.0
    } else {
        numerator as f64 / denominator as f64
    }
}

/// Rank-based ROC-AUC (Mann-Whitney U).
///
/// Records are walked by descending score; every negative adds the number of
/// positives already seen. Ties keep input order. Returns
/// [`UNDEFINED_AUC`] when either class is empty. Not rounded.
pub fn roc_auc(scores: &[f64], truth: &[bool]) -> f64 {
    let mut pairs: Vec<(f64, bool)> = scores.iter().copied().zip(truth.iter().copied()).collect();

    let positives = pairs.iter().filter(|(_, t)| *t).count();
    let negatives = pairs.len() - positives;
    if positives == 0 || negatives == 0 {
        return UNDEFINED_AUC;
    }

    pairs.sort_by(|a, b| b.0.total_cmp(&a.0));

    let mut seen_positives = 0usize;
    let mut concordant = 0usize;
    for (_, is_positive) in &pairs {
        if *is_positive {
            seen_positives += 1;
        } else {
            concordant += seen_positives;
        }
    }

    concordant as f64 / (positives as f64 * negatives as f64)
}

/// Metrics for one strategy, rounded to 4 decimals
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ModelMetrics {
    pub roc_auc: f64,
    pub precision: f64,
    pub recall: f64,
    pub f1_score: f64,
    pub confusion: ConfusionMatrix,
}

/// Where a batch's ground-truth labels came from.
///
/// Chosen once per batch: if any record carries a label, every record is
/// judged by its label (missing labels count as negative). Otherwise every
/// record is judged by the rule-based score heuristic.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum GroundTruth {
    Labeled(Vec<bool>),
    Heuristic(Vec<bool>),
}

impl GroundTruth {
    pub fn resolve(records: &[EnrichedTransaction]) -> Self {
        let labeled = records
            .iter()
            .filter(|r| r.transaction.true_label.is_some())
            .count();

        if labeled == 0 {
            debug!(
                threshold = HEURISTIC_LABEL_THRESHOLD,
                "No labeled records, using heuristic ground truth"
            );
            return GroundTruth::Heuristic(
                records
                    .iter()
                    .map(|r| r.analysis.fraud_score > HEURISTIC_LABEL_THRESHOLD)
                    .collect(),
            );
        }

        if labeled < records.len() {
            warn!(
                labeled = labeled,
                unlabeled = records.len() - labeled,
                "Partially labeled batch, treating unlabeled records as legitimate"
            );
        }
        GroundTruth::Labeled(
            records
                .iter()
                .map(|r| r.transaction.true_label.unwrap_or(0) == 1)
                .collect(),
        )
    }

    pub fn labels(&self) -> &[bool] {
        match self {
            GroundTruth::Labeled(labels) | GroundTruth::Heuristic(labels) => labels,
        }
    }

    pub fn is_labeled(&self) -> bool {
        matches!(self, GroundTruth::Labeled(_))
    }

    pub fn positives(&self) -> usize {
        self.labels().iter().filter(|&&l| l).count()
    }
}

/// Computes [`ModelMetrics`] for one strategy's predictions.
#[derive(Debug, Clone, Copy, Default)]
pub struct MetricsEvaluator;

impl MetricsEvaluator {
    pub fn new() -> Self {
        Self
    }

    /// Evaluate parallel predicted labels and scores against truth.
    pub fn evaluate(&self, predicted: &[bool], scores: &[f64], truth: &[bool]) -> ModelMetrics {
        let confusion = ConfusionMatrix::from_labels(predicted, truth);
        let auc = roc_auc(scores, truth);

        ModelMetrics {
            roc_auc: round_to(auc, 4),
            precision: round_to(confusion.precision(), 4),
            recall: round_to(confusion.recall(), 4),
            f1_score: round_to(confusion.f1(), 4),
            confusion,
        }
    }
}
