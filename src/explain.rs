use std::collections::BTreeMap;

use serde::Serialize;

use crate::fmt::money;
use crate::models::{EnrichedTransaction, TransactionRecord};
use crate::pipeline::AnalysisReport;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ExplainConfig {
    pub large_income_threshold: f64,
    pub expense_multiple: f64,
}

impl Default for ExplainConfig {
    fn default() -> Self {
        Self {
            large_income_threshold: 50_000.0,
            expense_multiple: 1.5,
        }
    }
}

/// Why a flagged transaction probably stood out.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Explanation {
    LargeIncome {
        amount: f64,
    },
    AboveCategoryAverage {
        category: String,
        amount: f64,
        average: f64,
        multiple: f64,
    },
    UnusualPattern,
}

impl Explanation {
    pub fn describe(&self, currency: &str) -> String {
        match self {
            Self::LargeIncome { .. } => "This is a large income transaction, which is \
                statistically rare compared to your regular expenses."
                .to_string(),
            Self::AboveCategoryAverage {
                category,
                amount,
                average,
                multiple,
            } => format!(
                "This expense of {} is {multiple:.1} times higher than your average spend \
                 of {} for the '{category}' category.",
                money(*amount, currency),
                money(*average, currency),
            ),
            Self::UnusualPattern => "This transaction is flagged as a potential anomaly \
                because its spending pattern is statistically different from your other \
                transactions."
                .to_string(),
        }
    }
}

pub fn explain(
    tx: &TransactionRecord,
    category_averages: &BTreeMap<String, f64>,
    config: &ExplainConfig,
) -> Explanation {
    if tx.is_income() && tx.amount > config.large_income_threshold {
        return Explanation::LargeIncome { amount: tx.amount };
    }

    if tx.is_expense() {
        let average = tx
            .category
            .as_deref()
            .and_then(|c| category_averages.get(c))
            .copied()
            .filter(|avg| *avg > 0.0);
        if let (Some(average), Some(category)) = (average, tx.category.as_ref()) {
            let amount = tx.amount.abs();
            // Compared at one decimal, as displayed.
            let multiple = (amount / average * 10.0).round() / 10.0;
            if multiple > config.expense_multiple {
                return Explanation::AboveCategoryAverage {
                    category: category.clone(),
                    amount,
                    average,
                    multiple,
                };
            }
        }
    }

    Explanation::UnusualPattern
}

/// Explanations for every anomalous transaction in a report, in input order.
pub fn explain_anomalies<'a>(
    report: &'a AnalysisReport,
    config: &ExplainConfig,
) -> Vec<(&'a EnrichedTransaction, Explanation)> {
    report
        .transactions
        .iter()
        .filter(|t| t.is_anomaly())
        .map(|t| (t, explain(&t.record, &report.analysis.category_averages, config)))
        .collect()
}
