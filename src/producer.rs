//! NATS producer for fraud alerts

use crate::types::alert::FraudAlert;
use anyhow::{Context, Result};
use async_nats::{Client, HeaderMap};
use tracing::debug;

/// Header carrying the alert's risk level, for subscribers that filter without decoding
pub const RISK_LEVEL_HEADER: &str = "Fraud-Risk-Level";

/// Publishes [`FraudAlert`]s as JSON on a single subject.
///
/// Cloning is cheap; every streaming worker holds its own handle.
#[derive(Clone)]
pub struct AlertProducer {
    client: Client,
    subject: String,
}

impl AlertProducer {
    pub fn new(client: Client, subject: &str) -> Self {
        Self {
            client,
            subject: subject.to_string(),
        }
    }

    /// Serialize an alert into its wire payload
    pub fn encode(alert: &FraudAlert) -> Result<Vec<u8>> {
        serde_json::to_vec(alert)
            .with_context(|| format!("Failed to encode alert for {}", alert.transaction_id))
    }

    pub async fn publish(&self, alert: &FraudAlert) -> Result<()> {
        let payload = Self::encode(alert)?;
        let mut headers = HeaderMap::new();
        headers.insert(RISK_LEVEL_HEADER, alert.risk_level.as_str());

        self.client
            .publish_with_headers(self.subject.clone(), headers, payload.into())
            .await
            .with_context(|| format!("Failed to publish alert {}", alert.alert_id))?;

        debug!(
            alert_id = %alert.alert_id,
            client_id = %alert.client_id,
            risk_level = %alert.risk_level,
            "Published fraud alert"
        );
        Ok(())
    }

    pub fn subject(&self) -> &str {
        &self.subject
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::alert::RiskLevel;

    #[test]
    fn test_encode_alert() {
        let alert = FraudAlert::new("tx_7".into(), "C1".into(), 5000.0, 0.85, RiskLevel::Critical)
            .with_triggered_rules(vec!["Max Amount for Client".to_string()]);

        let payload = AlertProducer::encode(&alert).unwrap();
        let value: serde_json::Value = serde_json::from_slice(&payload).unwrap();

        assert_eq!(value["transaction_id"], "tx_7");
        assert_eq!(value["risk_level"], "CRITICAL");
        assert_eq!(value["triggered_rules"][0], "Max Amount for Client");
    }
}
