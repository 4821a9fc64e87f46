//! Tabular export of scored transactions.

use crate::types::enriched::EnrichedTransaction;
use anyhow::{Context, Result};
use std::fs::File;
use std::io::Write;
use std::path::Path;
use tracing::info;

/// Column order of the export.
pub const EXPORT_COLUMNS: [&str; 20] = [
    "transaction_id",
    "client_id",
    "amount",
    "timestamp",
    "fraud_score",
    "iso_forest_score",
    "log_reg_score",
    "is_suspicious",
    "risk_level",
    "rule_triggered",
    "client_amount_mean",
    "client_amount_std",
    "client_transaction_count",
    "amount_zscore",
    "is_amount_outlier",
    "time_since_last_trans",
    "amount_rolling_mean_5",
    "amount_rolling_std_5",
    "is_rapid_transaction",
    "category_freq",
];

fn optional(value: Option<f64>) -> String {
    value.map(|v| v.to_string()).unwrap_or_default()
}

fn row(record: &EnrichedTransaction) -> Vec<String> {
    let tx = &record.transaction;
    let f = &record.features;
    let a = &record.analysis;
    vec![
        tx.transaction_id.clone(),
        tx.client_id.clone(),
        tx.amount.to_string(),
        tx.timestamp.to_rfc3339(),
        a.fraud_score.to_string(),
        optional(a.iso_forest_score),
        optional(a.log_reg_score),
        a.is_suspicious.to_string(),
        a.risk_level.to_string(),
        a.rule_triggered.join("; "),
        f.client_amount_mean.to_string(),
        f.client_amount_std.to_string(),
        f.client_transaction_count.to_string(),
        f.amount_zscore.to_string(),
        f.is_amount_outlier.to_string(),
        f.time_since_last_trans.to_string(),
        f.amount_rolling_mean_5.to_string(),
        f.amount_rolling_std_5.to_string(),
        f.is_rapid_transaction.to_string(),
        optional(f.category_freq),
    ]
}

/// Write scored records as CSV with a header row.
pub fn write_records<W: Write>(writer: W, records: &[EnrichedTransaction]) -> Result<()> {
    let mut wtr = csv::Writer::from_writer(writer);
    wtr.write_record(EXPORT_COLUMNS)
        .context("Failed to write CSV header")?;
    for record in records {
        wtr.write_record(row(record))
            .with_context(|| format!("Failed to write record {}", record.id()))?;
    }
    wtr.flush().context("Failed to flush CSV output")?;
    Ok(())
}

/// Export scored records to a CSV file
pub fn export_csv<P: AsRef<Path>>(path: P, records: &[EnrichedTransaction]) -> Result<()> {
    let path = path.as_ref();
    let file = File::create(path).context(format!("Failed to create {:?}", path))?;
    write_records(file, records)?;

    info!(path = %path.display(), rows = records.len(), "Exported scored transactions");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pipeline::BatchPipeline;
    use crate::types::transaction::Transaction;
    use chrono::{Duration, TimeZone, Utc};

    #[test]
    fn test_export_has_header_and_rows() {
        let base = Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap();
        let txs = vec![
            Transaction::new("a", "C1", 100.0, base),
            Transaction::new("b", "C1", 2000.0, base + Duration::minutes(10)),
        ];
        let records = BatchPipeline::new().score(&txs);

        let mut buf = Vec::new();
        write_records(&mut buf, &records).unwrap();
        let text = String::from_utf8(buf).unwrap();
        let lines: Vec<&str> = text.lines().collect();

        assert_eq!(lines.len(), 3);
        assert!(lines[0].starts_with("transaction_id,client_id,amount"));
        assert!(lines[2].starts_with("b,C1,2000,"));
        assert!(lines[2].contains("Max Amount for Client; Rapid Sequence (Same Step)"));
    }
}
