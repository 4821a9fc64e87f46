//! Lenient CSV ingestion of step-based transaction logs.
//!
//! Expected columns: `step`, `type`, `amount`, `nameOrig`, `nameDest`,
//! `isFraud`. Missing columns and malformed values fall back to defaults so
//! a batch never partially fails.

use crate::types::transaction::{Transaction, TransactionKind};
use anyhow::{Context, Result};
use chrono::{DateTime, Duration, Utc};
use std::fs::File;
use std::io::Read;
use std::path::Path;
use tracing::{debug, info};

/// Seconds since the Unix epoch of 2024-01-01T00:00:00Z, the instant of step 0.
pub const BASE_EPOCH_SECS: i64 = 1_704_067_200;

/// Category used when the `type` column is missing or empty.
pub const DEFAULT_CATEGORY: &str = "PAYMENT";

/// Instant of step 0.
pub fn base_epoch() -> DateTime<Utc> {
    DateTime::<Utc>::UNIX_EPOCH + Duration::seconds(BASE_EPOCH_SECS)
}

/// Convert an hour step to an instant; out-of-range steps pin to the base epoch.
pub fn step_to_timestamp(step: i64) -> DateTime<Utc> {
    let base = base_epoch();
    Duration::try_hours(step)
        .and_then(|offset| base.checked_add_signed(offset))
        .unwrap_or(base)
}

/// Parse a number, mapping anything malformed or non-finite to 0.
fn parse_number(raw: Option<&str>) -> f64 {
    raw.and_then(|v| v.trim().parse::<f64>().ok())
        .filter(|v| v.is_finite())
        .unwrap_or(0.0)
}

/// Resolved positions of the known columns in the header row.
#[derive(Debug, Default)]
struct ColumnMap {
    step: Option<usize>,
    kind: Option<usize>,
    amount: Option<usize>,
    name_orig: Option<usize>,
    name_dest: Option<usize>,
    is_fraud: Option<usize>,
}

impl ColumnMap {
    fn from_headers(headers: &[String]) -> Self {
        let find = |name: &str| headers.iter().position(|h| h.trim().eq_ignore_ascii_case(name));
        Self {
            step: find("step"),
            kind: find("type"),
            amount: find("amount"),
            name_orig: find("nameOrig"),
            name_dest: find("nameDest"),
            is_fraud: find("isFraud"),
        }
    }
}

/// Build one transaction from a decoded row.
fn row_to_transaction(row: &[String], columns: &ColumnMap, index: usize) -> Transaction {
    let field = |col: Option<usize>| {
        col.and_then(|i| row.get(i))
            .map(|v| v.trim())
            .filter(|v| !v.is_empty())
    };

    let step = parse_number(field(columns.step)).trunc() as i64;
    let amount = parse_number(field(columns.amount)).max(0.0);
    let client_id = field(columns.name_orig)
        .map(str::to_string)
        .unwrap_or_else(|| format!("Unknown-{index}"));
    let category = field(columns.kind).unwrap_or(DEFAULT_CATEGORY).to_string();
    let label = if parse_number(field(columns.is_fraud)) == 1.0 { 1 } else { 0 };

    let mut tx = Transaction::new(format!("TX-{index}"), client_id, amount, step_to_timestamp(step))
        .with_label(label);
    tx.kind = TransactionKind::from_category(&category);
    tx.category = category;
    tx.merchant = field(columns.name_dest).map(str::to_string);
    tx
}

/// Parse transactions from any CSV source with a header row.
pub fn parse_transactions<R: Read>(reader: R) -> Result<Vec<Transaction>> {
    let mut rdr = csv::ReaderBuilder::new()
        .flexible(true)
        .trim(csv::Trim::All)
        .from_reader(reader);

    let headers: Vec<String> = rdr
        .byte_headers()
        .context("Failed to read CSV header row")?
        .iter()
        .map(|h| String::from_utf8_lossy(h).into_owned())
        .collect();
    let columns = ColumnMap::from_headers(&headers);
    debug!(?columns, "Resolved CSV columns");

    let mut transactions = Vec::new();
    for (index, record) in rdr.byte_records().enumerate() {
        let record = record.with_context(|| format!("Failed to read CSV row {index}"))?;
        let row: Vec<String> = record
            .iter()
            .map(|v| String::from_utf8_lossy(v).into_owned())
            .collect();
        transactions.push(row_to_transaction(&row, &columns, index));
    }

    Ok(transactions)
}

/// Read transactions from a CSV file
pub fn read_transactions<P: AsRef<Path>>(path: P) -> Result<Vec<Transaction>> {
    let path = path.as_ref();
    let file = File::open(path).context(format!("Failed to open {:?}", path))?;
    let transactions = parse_transactions(file)?;

    info!(
        path = %path.display(),
        count = transactions.len(),
        "Loaded transactions"
    );
    Ok(transactions)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_well_formed_rows() {
        let csv = "step,type,amount,nameOrig,oldbalanceOrg,nameDest,isFraud\n\
                   1,PAYMENT,9839.64,C1231006815,170136.0,M1979787155,0\n\
                   3,CASH_IN,181.0,C840083671,181.0,C38997010,1\n";
        let txs = parse_transactions(csv.as_bytes()).unwrap();

        assert_eq!(txs.len(), 2);
        assert_eq!(txs[0].transaction_id, "TX-0");
        assert_eq!(txs[0].client_id, "C1231006815");
        assert_eq!(txs[0].amount, 9839.64);
        assert_eq!(txs[0].timestamp, base_epoch() + Duration::hours(1));
        assert_eq!(txs[0].merchant.as_deref(), Some("M1979787155"));
        assert_eq!(txs[0].true_label, Some(0));
        assert_eq!(txs[1].kind, TransactionKind::Credit);
        assert_eq!(txs[1].true_label, Some(1));
    }

    #[test]
    fn test_missing_columns_use_defaults() {
        let csv = "step,amount\n2,50\n";
        let txs = parse_transactions(csv.as_bytes()).unwrap();

        assert_eq!(txs[0].client_id, "Unknown-0");
        assert_eq!(txs[0].category, "PAYMENT");
        assert_eq!(txs[0].true_label, Some(0));
        assert_eq!(txs[0].amount, 50.0);
    }

    #[test]
    fn test_malformed_values_become_zero() {
        let csv = "step,type,amount,nameOrig,nameDest,isFraud\n\
                   abc,TRANSFER,not-a-number,,X,maybe\n\
                   5,TRANSFER,NaN,C2,X\n";
        let txs = parse_transactions(csv.as_bytes()).unwrap();

        assert_eq!(txs.len(), 2);
        assert_eq!(txs[0].amount, 0.0);
        assert_eq!(txs[0].timestamp, base_epoch());
        assert_eq!(txs[0].client_id, "Unknown-0");
        assert_eq!(txs[0].true_label, Some(0));
        assert_eq!(txs[1].amount, 0.0);
        assert_eq!(txs[1].client_id, "C2");
    }

    #[test]
    fn test_step_conversion() {
        assert_eq!(base_epoch().to_rfc3339(), "2024-01-01T00:00:00+00:00");
        assert_eq!(step_to_timestamp(24), base_epoch() + Duration::days(1));
        assert_eq!(step_to_timestamp(i64::MAX), base_epoch());
    }
}
