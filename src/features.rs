//! Feature engineering for anomaly scoring.
//!
//! Every transaction is turned into a fixed-width numeric row whose columns follow the
//! scorer's [`FeatureSchema`] exactly. Derived features the schema does not name are
//! dropped; schema columns with no derived value are filled with zero.

use std::collections::HashMap;

use chrono::{Datelike, NaiveDate, Weekday};
use tracing::debug;

use crate::error::{LensError, Result};
use crate::models::TransactionRecord;

pub const CATEGORY_PREFIX: &str = "cat_";
pub const DAY_OF_WEEK: &str = "day_of_week";
pub const DAY_OF_MONTH: &str = "day_of_month";
pub const IS_WEEKEND: &str = "is_weekend";
pub const AMOUNT: &str = "Amount";

/// Ordered list of the feature names a scorer was trained on.
#[derive(Debug, Clone, PartialEq)]
pub struct FeatureSchema {
    columns: Vec<String>,
    index: HashMap<String, usize>,
}

impl FeatureSchema {
    pub fn new<I, S>(columns: I) -> Result<Self>
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let columns: Vec<String> = columns.into_iter().map(Into::into).collect();
        let mut index = HashMap::with_capacity(columns.len());
        for (i, name) in columns.iter().enumerate() {
            if index.insert(name.clone(), i).is_some() {
                return Err(LensError::Model(format!("duplicate feature column {name:?}")));
            }
        }
        Ok(Self { columns, index })
    }

    pub fn columns(&self) -> &[String] {
        &self.columns
    }

    pub fn len(&self) -> usize {
        self.columns.len()
    }

    pub fn is_empty(&self) -> bool {
        self.columns.is_empty()
    }

    pub fn position(&self, name: &str) -> Option<usize> {
        self.index.get(name).copied()
    }

    /// Category values the schema has a one-hot column for.
    pub fn categories(&self) -> impl Iterator<Item = &str> {
        self.columns
            .iter()
            .filter_map(|c| c.strip_prefix(CATEGORY_PREFIX))
    }
}

/// Row-major numeric matrix, one row per transaction, columns in schema order.
#[derive(Debug, Clone, PartialEq)]
pub struct FeatureMatrix {
    schema: FeatureSchema,
    rows: Vec<Vec<f64>>,
}

impl FeatureMatrix {
    pub fn schema(&self) -> &FeatureSchema {
        &self.schema
    }

    pub fn rows(&self) -> &[Vec<f64>] {
        &self.rows
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    pub fn get(&self, row: usize, column: &str) -> Option<f64> {
        let col = self.schema.position(column)?;
        self.rows.get(row).map(|r| r[col])
    }
}

pub fn category_column(category: &str) -> String {
    format!("{CATEGORY_PREFIX}{category}")
}

fn is_weekend(date: NaiveDate) -> bool {
    matches!(date.weekday(), Weekday::Sat | Weekday::Sun)
}

/// Every feature derivable from one transaction, before alignment.
pub fn derive(tx: &TransactionRecord) -> Vec<(String, f64)> {
    let mut features = vec![
        // Monday = 0
        (
            DAY_OF_WEEK.to_string(),
            tx.date.weekday().num_days_from_monday() as f64,
        ),
        (DAY_OF_MONTH.to_string(), tx.date.day() as f64),
        (IS_WEEKEND.to_string(), if is_weekend(tx.date) { 1.0 } else { 0.0 }),
        (AMOUNT.to_string(), tx.amount),
    ];
    if let Some(category) = &tx.category {
        features.push((category_column(category), 1.0));
    }
    features
}

/// Build the aligned feature matrix for a batch.
pub fn engineer(transactions: &[TransactionRecord], schema: &FeatureSchema) -> FeatureMatrix {
    let mut unknown_categories = 0usize;
    let rows = transactions
        .iter()
        .map(|tx| {
            let mut row = vec![0.0; schema.len()];
            for (name, value) in derive(tx) {
                match schema.position(&name) {
                    Some(i) => row[i] = value,
                    None if name.starts_with(CATEGORY_PREFIX) => unknown_categories += 1,
                    None => {}
                }
            }
            row
        })
        .collect();

    if unknown_categories > 0 {
        debug!(
            rows = unknown_categories,
            "Categories outside the model vocabulary encoded as all-zero"
        );
    }

    FeatureMatrix {
        schema: schema.clone(),
        rows,
    }
}

/// Reindex a matrix onto another schema with the same fill/drop rules as [`engineer`].
pub fn align(matrix: &FeatureMatrix, schema: &FeatureSchema) -> FeatureMatrix {
    let sources: Vec<Option<usize>> = schema
        .columns()
        .iter()
        .map(|c| matrix.schema.position(c))
        .collect();
    let rows = matrix
        .rows
        .iter()
        .map(|row| {
            sources
                .iter()
                .map(|src| src.map_or(0.0, |i| row[i]))
                .collect()
        })
        .collect();
    FeatureMatrix {
        schema: schema.clone(),
        rows,
    }
}
