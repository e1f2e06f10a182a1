use std::collections::BTreeMap;

use chrono::{Datelike, NaiveDate};
use serde::Serialize;

pub const REQUIRED_COLUMNS: [&str; 4] = ["Date", "Description", "Amount", "Category"];

/// One ledger row after parsing. `date` is the parsed calendar date; the raw cell text is
/// kept in `raw_date` so the output echoes what the caller sent.
#[derive(Debug, Clone, Serialize)]
pub struct TransactionRecord {
    #[serde(rename = "Date")]
    pub raw_date: String,
    #[serde(skip)]
    pub date: NaiveDate,
    #[serde(rename = "Description")]
    pub description: String,
    #[serde(rename = "Amount")]
    pub amount: f64,
    /// `None` when the cell was empty.
    #[serde(rename = "Category")]
    pub category: Option<String>,
    /// Columns outside the required set, passed through untouched.
    #[serde(flatten)]
    pub extra: BTreeMap<String, String>,
}

impl TransactionRecord {
    pub fn is_income(&self) -> bool {
        self.amount > 0.0
    }

    pub fn is_expense(&self) -> bool {
        self.amount < 0.0
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct EnrichedTransaction {
    #[serde(flatten)]
    pub record: TransactionRecord,
    pub is_anomaly: u8,
    pub month: String,
}

impl EnrichedTransaction {
    pub fn new(record: TransactionRecord, is_anomaly: bool) -> Self {
        let month = month_name(record.date).to_string();
        Self {
            record,
            is_anomaly: u8::from(is_anomaly),
            month,
        }
    }

    pub fn is_anomaly(&self) -> bool {
        self.is_anomaly == 1
    }
}

pub fn month_name(date: NaiveDate) -> &'static str {
    match date.month() {
        1 => "January",
        2 => "February",
        3 => "March",
        4 => "April",
        5 => "May",
        6 => "June",
        7 => "July",
        8 => "August",
        9 => "September",
        10 => "October",
        11 => "November",
        _ => "December",
    }
}

#[cfg(test)]
pub(crate) fn record(date: &str, description: &str, amount: f64, category: &str) -> TransactionRecord {
    TransactionRecord {
        raw_date: date.to_string(),
        date: NaiveDate::parse_from_str(date, "%Y-%m-%d").unwrap(),
        description: description.to_string(),
        amount,
        category: if category.is_empty() {
            None
        } else {
            Some(category.to_string())
        },
        extra: BTreeMap::new(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_month_name() {
        let d = NaiveDate::from_ymd_opt(2024, 1, 6).unwrap();
        assert_eq!(month_name(d), "January");
        let d = NaiveDate::from_ymd_opt(2023, 12, 31).unwrap();
        assert_eq!(month_name(d), "December");
    }

    #[test]
    fn test_enriched_serializes_with_original_column_names() {
        let mut r = record("2024-01-06", "Coffee", -5.0, "Dining");
        r.extra.insert("Account".into(), "Checking".into());
        let e = EnrichedTransaction::new(r, true);
        let v = serde_json::to_value(&e).unwrap();
        assert_eq!(v["Date"], "2024-01-06");
        assert_eq!(v["Description"], "Coffee");
        assert_eq!(v["Amount"], -5.0);
        assert_eq!(v["Category"], "Dining");
        assert_eq!(v["Account"], "Checking");
        assert_eq!(v["is_anomaly"], 1);
        assert_eq!(v["month"], "January");
    }

    #[test]
    fn test_missing_category_serializes_as_null() {
        let e = EnrichedTransaction::new(record("2024-03-01", "Misc", -1.0, ""), false);
        let v = serde_json::to_value(&e).unwrap();
        assert!(v["Category"].is_null());
        assert_eq!(v["is_anomaly"], 0);
    }
}
