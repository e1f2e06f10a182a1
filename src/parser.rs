use std::collections::BTreeMap;
use std::io::Read;
use std::path::Path;

use chrono::{DateTime, NaiveDate, NaiveDateTime};
use tracing::debug;

use crate::error::{LensError, Result};
use crate::models::{TransactionRecord, REQUIRED_COLUMNS};

// ---------------------------------------------------------------------------
// Field coercion
// ---------------------------------------------------------------------------

/// Lenient: anything that is not a plain finite number becomes 0. Currency symbols,
/// thousands separators and accounting parentheses are not interpreted.
pub fn parse_amount(raw: &str) -> f64 {
    raw.trim()
        .parse::<f64>()
        .ok()
        .filter(|v| v.is_finite())
        .unwrap_or(0.0)
}

const DATE_FORMATS: &[&str] = &["%Y-%m-%d", "%Y/%m/%d", "%m/%d/%Y"];
const DATETIME_FORMATS: &[&str] = &[
    "%Y-%m-%d %H:%M:%S",
    "%Y-%m-%dT%H:%M:%S",
    "%Y-%m-%d %H:%M",
    "%Y-%m-%dT%H:%M",
];

/// Strict: returns `None` for anything that is not a real calendar date.
pub fn parse_date(raw: &str) -> Option<NaiveDate> {
    let s = raw.trim();
    if s.is_empty() {
        return None;
    }
    DATE_FORMATS
        .iter()
        .find_map(|fmt| NaiveDate::parse_from_str(s, fmt).ok())
        .or_else(|| {
            DATETIME_FORMATS
                .iter()
                .find_map(|fmt| NaiveDateTime::parse_from_str(s, fmt).ok())
                .map(|dt| dt.date())
        })
        .or_else(|| DateTime::parse_from_rfc3339(s).ok().map(|dt| dt.date_naive()))
}

// ---------------------------------------------------------------------------
// Header handling
// ---------------------------------------------------------------------------

struct ColumnIndex {
    date: usize,
    description: usize,
    amount: usize,
    category: usize,
    extra: Vec<(usize, String)>,
}

// Names the pipeline adds to each output row; an input column with the same name would be
// shadowed, so it is not passed through.
const OUTPUT_COLUMNS: [&str; 2] = ["is_anomaly", "month"];

fn index_columns(headers: &csv::StringRecord) -> Result<ColumnIndex> {
    let find = |name: &str| headers.iter().position(|h| h == name);

    let missing: Vec<String> = REQUIRED_COLUMNS
        .into_iter()
        .filter(|&c| find(c).is_none())
        .map(String::from)
        .collect();
    if !missing.is_empty() {
        return Err(LensError::Schema(missing));
    }

    let extra = headers
        .iter()
        .enumerate()
        .filter(|(_, h)| !REQUIRED_COLUMNS.contains(h) && !OUTPUT_COLUMNS.contains(h))
        .map(|(i, h)| (i, h.to_string()))
        .collect();

    // Every required column was found above.
    Ok(ColumnIndex {
        date: find("Date").unwrap_or_default(),
        description: find("Description").unwrap_or_default(),
        amount: find("Amount").unwrap_or_default(),
        category: find("Category").unwrap_or_default(),
        extra,
    })
}

// ---------------------------------------------------------------------------
// parse
// ---------------------------------------------------------------------------

fn cell<'r>(record: &'r csv::StringRecord, idx: usize, name: &str, line: usize) -> Result<&'r str> {
    record
        .get(idx)
        .ok_or_else(|| LensError::Data(format!("row {line}: missing value for {name}")))
}

/// Parse a CSV ledger. The whole batch fails on a missing column or a bad date; a bad
/// amount only zeroes that amount.
pub fn parse<R: Read>(reader: R) -> Result<Vec<TransactionRecord>> {
    let mut rdr = csv::ReaderBuilder::new()
        .has_headers(true)
        .flexible(true)
        .from_reader(reader);
    let headers = rdr.headers()?.clone();
    let cols = index_columns(&headers)?;

    let mut records = Vec::new();
    for (i, result) in rdr.records().enumerate() {
        let record = result?;
        // Header is line 1.
        let line = i + 2;
        let raw_date = cell(&record, cols.date, "Date", line)?;
        let date = parse_date(raw_date).ok_or_else(|| {
            LensError::Data(format!("row {line}: cannot parse Date {raw_date:?}"))
        })?;
        let description = cell(&record, cols.description, "Description", line)?.to_string();
        let amount = parse_amount(cell(&record, cols.amount, "Amount", line)?);
        let category = cell(&record, cols.category, "Category", line)?;
        let category = (!category.is_empty()).then(|| category.to_string());

        let extra: BTreeMap<String, String> = cols
            .extra
            .iter()
            .filter_map(|(idx, name)| record.get(*idx).map(|v| (name.clone(), v.to_string())))
            .collect();

        records.push(TransactionRecord {
            raw_date: raw_date.to_string(),
            date,
            description,
            amount,
            category,
            extra,
        });
    }

    debug!(rows = records.len(), "Parsed transactions");
    Ok(records)
}

pub fn parse_path(file_path: &Path) -> Result<Vec<TransactionRecord>> {
    let is_csv = file_path
        .extension()
        .map_or(false, |e| e.eq_ignore_ascii_case("csv"));
    if !is_csv {
        return Err(LensError::InvalidFileType(file_path.display().to_string()));
    }
    let file = std::fs::File::open(file_path)?;
    parse(std::io::BufReader::new(file))
}
