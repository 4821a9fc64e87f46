//! Type definitions for the fraud scoring pipeline

pub mod alert;
pub mod enriched;
pub mod transaction;

pub use alert::{FraudAlert, RiskLevel};
pub use enriched::{EngineeredFeatures, EnrichedTransaction, FraudAnalysis};
pub use transaction::{Transaction, TransactionKind};
