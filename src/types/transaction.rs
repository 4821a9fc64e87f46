//! Transaction data structures for fraud scoring

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Direction of funds for a transaction
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "UPPERCASE")]
pub enum TransactionKind {
    /// Money leaving the client's account
    #[default]
    Debit,
    /// Money arriving in the client's account
    Credit,
}

impl TransactionKind {
    /// Derive the direction from a payment-type label (`CASH_IN` is the only credit)
    pub fn from_category(category: &str) -> Self {
        if category.eq_ignore_ascii_case("CASH_IN") {
            TransactionKind::Credit
        } else {
            TransactionKind::Debit
        }
    }
}

/// A single financial transaction to be scored for fraud risk
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Transaction {
    /// Unique transaction identifier
    #[serde(alias = "id")]
    pub transaction_id: String,

    /// Owning client identifier
    #[serde(alias = "clientId", alias = "nameOrig")]
    pub client_id: String,

    /// Transaction amount (non-negative)
    pub amount: f64,

    /// ISO currency code
    #[serde(default = "default_currency")]
    pub currency: String,

    /// Time the transaction happened
    pub timestamp: DateTime<Utc>,

    /// Payment category (e.g. PAYMENT, TRANSFER, CASH_OUT)
    #[serde(default = "default_category")]
    pub category: String,

    /// Free-form location
    #[serde(default = "default_location")]
    pub location: String,

    /// Counterparty merchant, when known
    #[serde(default)]
    pub merchant: Option<String>,

    /// Direction tag
    #[serde(default, rename = "type")]
    pub kind: TransactionKind,

    /// Known fraud label (0/1), used only for evaluation
    #[serde(default, alias = "trueLabel", alias = "isFraud")]
    pub true_label: Option<u8>,
}

fn default_currency() -> String {
    "USD".to_string()
}

fn default_category() -> String {
    "PAYMENT".to_string()
}

fn default_location() -> String {
    "Unknown".to_string()
}

impl Transaction {
    /// Create a new transaction with required fields
    pub fn new(
        transaction_id: impl Into<String>,
        client_id: impl Into<String>,
        amount: f64,
        timestamp: DateTime<Utc>,
    ) -> Self {
        Self {
            transaction_id: transaction_id.into(),
            client_id: client_id.into(),
            amount,
            currency: default_currency(),
            timestamp,
            category: default_category(),
            location: default_location(),
            merchant: None,
            kind: TransactionKind::Debit,
            true_label: None,
        }
    }

    /// Set the payment category, deriving the direction tag from it
    pub fn with_category(mut self, category: impl Into<String>) -> Self {
        self.category = category.into();
        self.kind = TransactionKind::from_category(&self.category);
        self
    }

    /// Attach a ground-truth label
    pub fn with_label(mut self, label: u8) -> Self {
        self.true_label = Some(label);
        self
    }

    /// Attach a merchant
    pub fn with_merchant(mut self, merchant: impl Into<String>) -> Self {
        self.merchant = Some(merchant.into());
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn test_transaction_serialization() {
        let ts = Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap();
        let tx = Transaction::new("tx_123", "C1", 250.0, ts).with_label(1);

        let json = serde_json::to_string(&tx).unwrap();
        let deserialized: Transaction = serde_json::from_str(&json).unwrap();

        assert_eq!(tx.transaction_id, deserialized.transaction_id);
        assert_eq!(tx.client_id, deserialized.client_id);
        assert_eq!(tx.amount, deserialized.amount);
        assert_eq!(deserialized.true_label, Some(1));
    }

    #[test]
    fn test_minimal_json_uses_defaults() {
        let json = r#"{
            "id": "tx_9",
            "clientId": "C42",
            "amount": 12.5,
            "timestamp": "2024-01-01T05:00:00Z"
        }"#;
        let tx: Transaction = serde_json::from_str(json).unwrap();

        assert_eq!(tx.currency, "USD");
        assert_eq!(tx.category, "PAYMENT");
        assert_eq!(tx.kind, TransactionKind::Debit);
        assert!(tx.true_label.is_none());
    }

    #[test]
    fn test_kind_from_category() {
        assert_eq!(TransactionKind::from_category("CASH_IN"), TransactionKind::Credit);
        assert_eq!(TransactionKind::from_category("TRANSFER"), TransactionKind::Debit);
    }
}
