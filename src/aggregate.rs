use std::collections::BTreeMap;

use serde::Serialize;

use crate::models::EnrichedTransaction;

// ---------------------------------------------------------------------------
// Summary
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SummaryStatistics {
    pub anomalies_found: usize,
    pub total_income: f64,
    pub total_expenses: f64,
    pub balance: f64,
    pub total_transactions: usize,
}

fn summarize(transactions: &[EnrichedTransaction]) -> SummaryStatistics {
    let total_income: f64 = transactions
        .iter()
        .filter(|t| t.record.is_income())
        .map(|t| t.record.amount)
        .sum();
    let total_expenses: f64 = transactions
        .iter()
        .filter(|t| t.record.is_expense())
        .map(|t| t.record.amount.abs())
        .sum();
    SummaryStatistics {
        anomalies_found: transactions.iter().filter(|t| t.is_anomaly()).count(),
        total_income,
        total_expenses,
        balance: total_income - total_expenses,
        total_transactions: transactions.len(),
    }
}

// ---------------------------------------------------------------------------
// Expense breakdowns
// ---------------------------------------------------------------------------

/// Sum and mean of absolute expense amount per raw category string.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct CategoryStats {
    pub spending: BTreeMap<String, f64>,
    pub averages: BTreeMap<String, f64>,
}

/// Sum of absolute expense amount per calendar month name. Years are merged.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct MonthlyStats {
    pub spending: BTreeMap<String, f64>,
}

fn category_stats(transactions: &[EnrichedTransaction]) -> CategoryStats {
    let mut groups: BTreeMap<&str, (f64, usize)> = BTreeMap::new();
    for t in transactions.iter().filter(|t| t.record.is_expense()) {
        let Some(category) = t.record.category.as_deref() else {
            continue;
        };
        let entry = groups.entry(category).or_default();
        entry.0 += t.record.amount.abs();
        entry.1 += 1;
    }

    let mut stats = CategoryStats::default();
    for (name, (sum, count)) in groups {
        stats.spending.insert(name.to_string(), sum);
        stats.averages.insert(name.to_string(), sum / count as f64);
    }
    stats
}

fn monthly_stats(transactions: &[EnrichedTransaction]) -> MonthlyStats {
    let mut spending: BTreeMap<String, f64> = BTreeMap::new();
    for t in transactions.iter().filter(|t| t.record.is_expense()) {
        *spending.entry(t.month.clone()).or_default() += t.record.amount.abs();
    }
    MonthlyStats { spending }
}

// ---------------------------------------------------------------------------
// aggregate
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq)]
pub struct Aggregates {
    pub summary: SummaryStatistics,
    pub categories: CategoryStats,
    pub monthly: MonthlyStats,
}

pub fn aggregate(transactions: &[EnrichedTransaction]) -> Aggregates {
    Aggregates {
        summary: summarize(transactions),
        categories: category_stats(transactions),
        monthly: monthly_stats(transactions),
    }
}
