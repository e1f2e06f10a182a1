use clap::ValueEnum;

use crate::models::EnrichedTransaction;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, ValueEnum)]
pub enum StatusFilter {
    #[default]
    All,
    Anomalies,
    Normal,
}

impl StatusFilter {
    fn accepts(&self, tx: &EnrichedTransaction) -> bool {
        match self {
            Self::All => true,
            Self::Anomalies => tx.is_anomaly(),
            Self::Normal => !tx.is_anomaly(),
        }
    }
}

/// Case-insensitive match on description and category; the amount matches on its text.
fn matches_search(tx: &EnrichedTransaction, needle: &str) -> bool {
    let r = &tx.record;
    r.description.to_lowercase().contains(needle)
        || r.category
            .as_deref()
            .is_some_and(|c| c.to_lowercase().contains(needle))
        || r.amount.to_string().contains(needle)
}

pub fn filter_transactions<'a>(
    transactions: &'a [EnrichedTransaction],
    status: StatusFilter,
    search: Option<&str>,
) -> Vec<&'a EnrichedTransaction> {
    let needle = search
        .map(|s| s.trim().to_lowercase())
        .filter(|s| !s.is_empty());
    transactions
        .iter()
        .filter(|t| status.accepts(t))
        .filter(|t| needle.as_deref().map_or(true, |n| matches_search(t, n)))
        .collect()
}
