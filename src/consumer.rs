//! NATS consumer for incoming transactions

use crate::types::transaction::Transaction;
use anyhow::{Context, Result};
use async_nats::{Client, Subscriber};
use tracing::info;

/// Consumer for receiving JSON transactions from NATS
pub struct TransactionConsumer {
    client: Client,
    subject: String,
}

impl TransactionConsumer {
    pub fn new(client: Client, subject: &str) -> Self {
        Self {
            client,
            subject: subject.to_string(),
        }
    }

    /// Subscribe to the transaction subject
    pub async fn subscribe(&self) -> Result<Subscriber> {
        let subscriber = self
            .client
            .subscribe(self.subject.clone())
            .await
            .with_context(|| format!("Failed to subscribe to {}", self.subject))?;
        info!(subject = %self.subject, "Subscribed to transaction subject");
        Ok(subscriber)
    }

    /// Decode a message payload into a transaction; negative amounts are clamped to 0
    pub fn decode(payload: &[u8]) -> Result<Transaction> {
        let mut tx: Transaction =
            serde_json::from_slice(payload).context("Invalid transaction payload")?;
        tx.amount = tx.amount.max(0.0);
        Ok(tx)
    }

    pub fn subject(&self) -> &str {
        &self.subject
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_decode_payload() {
        let payload = br#"{"transaction_id":"tx_1","client_id":"C1","amount":42.0,"timestamp":"2024-01-01T00:00:00Z"}"#;
        let tx = TransactionConsumer::decode(payload).unwrap();
        assert_eq!(tx.transaction_id, "tx_1");
        assert_eq!(tx.amount, 42.0);
    }

    #[test]
    fn test_decode_clamps_negative_amount() {
        let payload = br#"{"transaction_id":"tx_2","client_id":"C1","amount":-15.5,"timestamp":"2024-01-01T00:00:00Z"}"#;
        let tx = TransactionConsumer::decode(payload).unwrap();
        assert_eq!(tx.amount, 0.0);
    }

    #[test]
    fn test_decode_rejects_garbage() {
        assert!(TransactionConsumer::decode(b"not json").is_err());
    }
}
