//! Per-client behavioral feature engineering.
//!
//! Batch mode groups a whole collection by client, orders every group by
//! timestamp (stable on input order) and derives aggregate, rolling and
//! temporal features for each transaction. Streaming mode keeps one
//! [`ClientState`] per client and derives the same features incrementally
//! from the history seen so far.

use crate::stats::{floor_std, floored_std, mean};
use crate::types::enriched::{EngineeredFeatures, EnrichedTransaction};
use crate::types::transaction::Transaction;
use chrono::{DateTime, Utc};
use std::collections::{HashMap, VecDeque};
use tracing::{debug, trace};

/// Number of trailing same-client amounts in the rolling window.
pub const ROLLING_WINDOW: usize = 5;

/// Absolute z-score above which an amount is an outlier.
pub const OUTLIER_ZSCORE: f64 = 3.0;

/// Gap (in hours) at or below which a transaction is a rapid follow-up.
pub const RAPID_GAP_HOURS: f64 = 1.0;

/// Facts about a transaction's client group that the rule scorer needs but
/// that are not stored on the enriched record.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ScoringContext {
    /// Amount equals the client's maximum amount (exact comparison)
    pub is_max_for_client: bool,
    /// Number of transactions in the client's group
    pub client_group_size: usize,
    /// (amount - rolling mean) / rolling std
    pub amount_vs_rolling_mean: f64,
}

/// An enriched record paired with its scoring context.
#[derive(Debug, Clone)]
pub struct EngineeredTransaction {
    pub record: EnrichedTransaction,
    pub context: ScoringContext,
}

/// Trailing window of the most recent amounts for one client.
#[derive(Debug, Clone, Default)]
pub struct RollingWindow {
    amounts: VecDeque<f64>,
}

impl RollingWindow {
    pub fn new() -> Self {
        Self {
            amounts: VecDeque::with_capacity(ROLLING_WINDOW),
        }
    }

    /// Push the current amount and return the window's (mean, floored std).
    pub fn push(&mut self, amount: f64) -> (f64, f64) {
        if self.amounts.len() == ROLLING_WINDOW {
            self.amounts.pop_front();
        }
        self.amounts.push_back(amount);

        let values = self.amounts.make_contiguous();
        let window_mean = mean(values);
        (window_mean, floored_std(values, window_mean))
    }

    pub fn len(&self) -> usize {
        self.amounts.len()
    }

    pub fn is_empty(&self) -> bool {
        self.amounts.is_empty()
    }
}

/// Hours elapsed between two instants.
fn hours_between(earlier: DateTime<Utc>, later: DateTime<Utc>) -> f64 {
    (later - earlier).num_milliseconds() as f64 / 3_600_000.0
}

/// Feature engineer that transforms transactions into enriched records.
pub struct FeatureEngineer;

impl FeatureEngineer {
    /// Create a new feature engineer.
    pub fn new() -> Self {
        Self
    }

    /// Engineer features for a batch of transactions.
    ///
    /// Records come out client group by client group (groups in order of first
    /// appearance), each group sorted by timestamp ascending.
    pub fn engineer(&self, transactions: &[Transaction]) -> Vec<EngineeredTransaction> {
        let groups = Self::group_by_client(transactions);
        debug!(
            transactions = transactions.len(),
            clients = groups.len(),
            "Grouped transactions by client"
        );

        let mut out = Vec::with_capacity(transactions.len());
        for mut group in groups {
            group.sort_by_key(|tx| tx.timestamp);
            self.engineer_group(&group, &mut out);
        }
        out
    }

    /// Split transactions into per-client groups, preserving input order.
    fn group_by_client(transactions: &[Transaction]) -> Vec<Vec<&Transaction>> {
        let mut index: HashMap<&str, usize> = HashMap::new();
        let mut groups: Vec<Vec<&Transaction>> = Vec::new();

        for tx in transactions {
            let slot = *index.entry(tx.client_id.as_str()).or_insert_with(|| {
                groups.push(Vec::new());
                groups.len() - 1
            });
            groups[slot].push(tx);
        }
        groups
    }

    /// Engineer one chronologically sorted client group.
    fn engineer_group(&self, group: &[&Transaction], out: &mut Vec<EngineeredTransaction>) {
        let amounts: Vec<f64> = group.iter().map(|tx| tx.amount).collect();
        let client_mean = mean(&amounts);
        let client_std = floored_std(&amounts, client_mean);
        let client_max = amounts.iter().copied().fold(f64::NEG_INFINITY, f64::max);
        let size = group.len();

        let mut window = RollingWindow::new();
        let mut previous: Option<DateTime<Utc>> = None;

        for tx in group {
            let zscore = (tx.amount - client_mean) / client_std;
            let time_since_last = previous.map_or(0.0, |prev| hours_between(prev, tx.timestamp));
            let (rolling_mean, rolling_std) = window.push(tx.amount);

            let features = EngineeredFeatures {
                client_amount_mean: client_mean,
                client_amount_std: client_std,
                client_transaction_count: size,
                amount_zscore: zscore,
                is_amount_outlier: zscore.abs() > OUTLIER_ZSCORE,
                time_since_last_trans: time_since_last,
                amount_rolling_mean_5: rolling_mean,
                amount_rolling_std_5: rolling_std,
                is_rapid_transaction: previous.is_some() && time_since_last <= RAPID_GAP_HOURS,
                category_freq: None,
            };
            let context = ScoringContext {
                is_max_for_client: tx.amount == client_max,
                client_group_size: size,
                amount_vs_rolling_mean: (tx.amount - rolling_mean) / rolling_std,
            };

            trace!(
                transaction_id = %tx.transaction_id,
                zscore = zscore,
                rolling_window = window.len(),
                "Engineered features"
            );

            out.push(EngineeredTransaction {
                record: EnrichedTransaction::new((*tx).clone(), features),
                context,
            });
            previous = Some(tx.timestamp);
        }
    }
}

impl Default for FeatureEngineer {
    fn default() -> Self {
        Self::new()
    }
}

/// Incremental aggregate state for one client in streaming mode.
///
/// Holds the running count, mean and sum of squared deviations (Welford
/// form), the running maximum, the last timestamp and the trailing window.
/// Each arrival is folded in with constant work.
#[derive(Debug, Clone, Default)]
pub struct ClientState {
    count: usize,
    mean: f64,
    m2: f64,
    max_amount: f64,
    last_timestamp: Option<DateTime<Utc>>,
    window: RollingWindow,
}

impl ClientState {
    pub fn new() -> Self {
        Self::default()
    }

    /// Fold a new arrival into the state and return its features.
    ///
    /// Aggregates cover every transaction seen so far for this client,
    /// including the current one. An arrival older than the last seen
    /// timestamp gets a gap of zero.
    pub fn observe(&mut self, tx: &Transaction) -> (EngineeredFeatures, ScoringContext) {
        self.count += 1;
        let delta = tx.amount - self.mean;
        self.mean += delta / self.count as f64;
        self.m2 += delta * (tx.amount - self.mean);
        if self.count == 1 || tx.amount > self.max_amount {
            self.max_amount = tx.amount;
        }

        let std = floor_std((self.m2 / self.count as f64).max(0.0).sqrt());
        let zscore = (tx.amount - self.mean) / std;

        let time_since_last = self
            .last_timestamp
            .map_or(0.0, |prev| hours_between(prev, tx.timestamp).max(0.0));
        let is_rapid = self.last_timestamp.is_some() && time_since_last <= RAPID_GAP_HOURS;
        self.last_timestamp = Some(match self.last_timestamp {
            Some(prev) if prev > tx.timestamp => prev,
            _ => tx.timestamp,
        });

        let (rolling_mean, rolling_std) = self.window.push(tx.amount);

        let features = EngineeredFeatures {
            client_amount_mean: self.mean,
            client_amount_std: std,
            client_transaction_count: self.count,
            amount_zscore: zscore,
            is_amount_outlier: zscore.abs() > OUTLIER_ZSCORE,
            time_since_last_trans: time_since_last,
            amount_rolling_mean_5: rolling_mean,
            amount_rolling_std_5: rolling_std,
            is_rapid_transaction: is_rapid,
            category_freq: None,
        };
        let context = ScoringContext {
            is_max_for_client: tx.amount == self.max_amount,
            client_group_size: self.count,
            amount_vs_rolling_mean: (tx.amount - rolling_mean) / rolling_std,
        };
        (features, context)
    }

    pub fn count(&self) -> usize {
        self.count
    }
}

/// Per-client streaming state keyed by client id.
///
/// A store has exactly one owner; callers that fan out across workers must
/// route every client to the same store.
#[derive(Debug, Default)]
pub struct ClientStateStore {
    clients: HashMap<String, ClientState>,
}

impl ClientStateStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Fold a transaction into its client's state and return the enriched record.
    pub fn observe(&mut self, tx: Transaction) -> EngineeredTransaction {
        let state = self.clients.entry(tx.client_id.clone()).or_default();
        let (features, context) = state.observe(&tx);
        EngineeredTransaction {
            record: EnrichedTransaction::new(tx, features),
            context,
        }
    }

    /// Number of distinct clients seen.
    pub fn client_count(&self) -> usize {
        self.clients.len()
    }

    pub fn get(&self, client_id: &str) -> Option<&ClientState> {
        self.clients.get(client_id)
    }
}
