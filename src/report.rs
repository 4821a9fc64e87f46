//! Narrative report generation over aggregate dashboard statistics.
//!
//! The report service is an external collaborator: it only ever sees the
//! summary and the distinct trigger reasons, and any failure degrades to
//! [`REPORT_UNAVAILABLE`] instead of reaching the scoring pipeline.

use crate::config::ReportConfig;
use crate::stats::round_to;
use crate::types::alert::RiskLevel;
use crate::types::enriched::EnrichedTransaction;
use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashSet};
use std::time::Duration;
use tracing::{debug, warn};

/// Text returned whenever a report cannot be produced.
pub const REPORT_UNAVAILABLE: &str =
    "Report unavailable: the narrative report service is not configured or did not respond.";

/// Aggregate statistics describing a scored batch
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DashboardSummary {
    pub total_transactions: usize,
    pub total_volume: f64,
    pub suspicious_transactions: usize,
    /// Suspicious share of all transactions (0.0 - 1.0)
    pub fraud_rate: f64,
    pub unique_clients: usize,
    pub average_fraud_score: f64,
    /// Transaction count per risk level
    pub risk_levels: BTreeMap<RiskLevel, usize>,
}

impl DashboardSummary {
    pub fn from_records(records: &[EnrichedTransaction]) -> Self {
        let total = records.len();
        let suspicious = records.iter().filter(|r| r.analysis.is_suspicious).count();
        let clients: HashSet<&str> = records
            .iter()
            .map(|r| r.transaction.client_id.as_str())
            .collect();

        let mut risk_levels = BTreeMap::new();
        for record in records {
            *risk_levels.entry(record.analysis.risk_level).or_insert(0) += 1;
        }

        let (fraud_rate, average_fraud_score) = if total > 0 {
            (
                suspicious as f64 / total as f64,
                records.iter().map(|r| r.analysis.fraud_score).sum::<f64>() / total as f64,
            )
        } else {
            (0.0, 0.0)
        };

        Self {
            total_transactions: total,
            total_volume: round_to(records.iter().map(|r| r.amount()).sum(), 2),
            suspicious_transactions: suspicious,
            fraud_rate: round_to(fraud_rate, 4),
            unique_clients: clients.len(),
            average_fraud_score: round_to(average_fraud_score, 4),
            risk_levels,
        }
    }
}

/// Distinct trigger reasons across a batch, in order of first appearance
pub fn unique_triggers(records: &[EnrichedTransaction]) -> Vec<String> {
    let mut seen = HashSet::new();
    records
        .iter()
        .flat_map(|r| r.analysis.rule_triggered.iter())
        .filter(|t| seen.insert(t.as_str()))
        .cloned()
        .collect()
}

/// Produces a free-text report from batch statistics.
#[allow(async_fn_in_trait)]
pub trait ReportGenerator {
    /// Never fails: errors become [`REPORT_UNAVAILABLE`].
    async fn generate(&self, summary: &DashboardSummary, triggers: &[String]) -> String;
}

/// Build the instruction text sent to the report service.
pub fn build_prompt(summary: &DashboardSummary, triggers: &[String]) -> String {
    let levels = summary
        .risk_levels
        .iter()
        .map(|(level, count)| format!("{level}: {count}"))
        .collect::<Vec<_>>()
        .join(", ");
    let reasons = if triggers.is_empty() {
        "none".to_string()
    } else {
        triggers.join("; ")
    };

    format!(
        "You are a fraud analyst. Write a short executive summary of this transaction batch.\n\
         Transactions: {}\n\
         Total volume: {:.2}\n\
         Suspicious transactions: {} ({:.2}%)\n\
         Distinct clients: {}\n\
         Average fraud score: {:.4}\n\
         Risk levels: {}\n\
         Trigger reasons: {}",
        summary.total_transactions,
        summary.total_volume,
        summary.suspicious_transactions,
        summary.fraud_rate * 100.0,
        summary.unique_clients,
        summary.average_fraud_score,
        levels,
        reasons
    )
}

#[derive(Serialize)]
struct GenerateRequest {
    contents: Vec<Content>,
}

#[derive(Serialize, Deserialize)]
struct Content {
    parts: Vec<Part>,
}

#[derive(Serialize, Deserialize)]
struct Part {
    text: String,
}

#[derive(Deserialize)]
struct GenerateResponse {
    #[serde(default)]
    candidates: Vec<Candidate>,
}

#[derive(Deserialize)]
struct Candidate {
    content: Content,
}

/// Report generator backed by a hosted generative-language HTTP API.
///
/// The API key is part of the [`ReportConfig`] handed to the constructor.
pub struct LlmReportGenerator {
    client: reqwest::Client,
    config: ReportConfig,
}

impl LlmReportGenerator {
    pub fn new(config: ReportConfig) -> Self {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_millis(config.timeout_ms))
            .build()
            .unwrap_or_else(|e| {
                warn!(error = %e, "Failed to build HTTP client, using defaults");
                reqwest::Client::new()
            });
        Self { client, config }
    }

    pub fn is_configured(&self) -> bool {
        self.config
            .api_key
            .as_deref()
            .is_some_and(|key| !key.trim().is_empty())
    }

    async fn request(&self, api_key: &str, prompt: String) -> Result<String> {
        let url = format!(
            "{}/models/{}:generateContent",
            self.config.endpoint.trim_end_matches('/'),
            self.config.model
        );
        let body = GenerateRequest {
            contents: vec![Content {
                parts: vec![Part { text: prompt }],
            }],
        };

        let resp = self
            .client
            .post(&url)
            .query(&[("key", api_key)])
            .json(&body)
            .send()
            .await
            .context("Failed to send report request")?;

        let status = resp.status();
        if !status.is_success() {
            anyhow::bail!("Report service returned {status}");
        }

        let parsed: GenerateResponse = resp
            .json()
            .await
            .context("Failed to decode report response")?;

        parsed
            .candidates
            .into_iter()
            .flat_map(|c| c.content.parts)
            .map(|p| p.text)
            .find(|t| !t.trim().is_empty())
            .context("Report response contained no text")
    }
}

impl ReportGenerator for LlmReportGenerator {
    async fn generate(&self, summary: &DashboardSummary, triggers: &[String]) -> String {
        let Some(api_key) = self.config.api_key.as_deref().filter(|k| !k.trim().is_empty()) else {
            debug!("No report API key configured");
            return REPORT_UNAVAILABLE.to_string();
        };

        match self.request(api_key, build_prompt(summary, triggers)).await {
            Ok(text) => text,
            Err(e) => {
                warn!(error = %e, "Report generation failed");
                REPORT_UNAVAILABLE.to_string()
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pipeline::BatchPipeline;
    use crate::types::transaction::Transaction;
    use chrono::{Duration as ChronoDuration, TimeZone, Utc};

    fn scored() -> Vec<EnrichedTransaction> {
        let base = Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap();
        let txs = vec![
            Transaction::new("a", "C1", 100.0, base),
            Transaction::new("b", "C1", 120.0, base + ChronoDuration::minutes(20)),
            Transaction::new("c", "C1", 110.0, base + ChronoDuration::minutes(40)),
            Transaction::new("d", "C2", 80.0, base),
        ];
        BatchPipeline::new().score(&txs)
    }

    #[test]
    fn test_summary_counts() {
        let records = scored();
        let summary = DashboardSummary::from_records(&records);

        assert_eq!(summary.total_transactions, 4);
        assert_eq!(summary.total_volume, 410.0);
        assert_eq!(summary.unique_clients, 2);
        assert_eq!(summary.risk_levels.values().sum::<usize>(), 4);
    }

    #[test]
    fn test_summary_of_empty_batch() {
        let summary = DashboardSummary::from_records(&[]);
        assert_eq!(summary.fraud_rate, 0.0);
        assert_eq!(summary.average_fraud_score, 0.0);
    }

    #[test]
    fn test_unique_triggers_are_deduplicated() {
        let records = scored();
        let triggers = unique_triggers(&records);

        let rapid = triggers
            .iter()
            .filter(|t| *t == "Rapid Sequence (Same Step)")
            .count();
        assert_eq!(rapid, 1);
    }

    #[test]
    fn test_prompt_mentions_statistics() {
        let records = scored();
        let summary = DashboardSummary::from_records(&records);
        let prompt = build_prompt(&summary, &["Max Amount for Client".to_string()]);

        assert!(prompt.contains("Transactions: 4"));
        assert!(prompt.contains("Max Amount for Client"));
    }

    #[tokio::test]
    async fn test_missing_key_returns_placeholder() {
        let generator = LlmReportGenerator::new(ReportConfig::default());
        assert!(!generator.is_configured());

        let summary = DashboardSummary::from_records(&scored());
        let text = generator.generate(&summary, &[]).await;
        assert_eq!(text, REPORT_UNAVAILABLE);
    }

    #[tokio::test]
    async fn test_unreachable_service_returns_placeholder() {
        let config = ReportConfig {
            api_key: Some("test-key".to_string()),
            endpoint: "http://127.0.0.1:9".to_string(),
            timeout_ms: 500,
            ..ReportConfig::default()
        };
        let generator = LlmReportGenerator::new(config);

        let summary = DashboardSummary::from_records(&[]);
        let text = generator.generate(&summary, &[]).await;
        assert_eq!(text, REPORT_UNAVAILABLE);
    }
}
