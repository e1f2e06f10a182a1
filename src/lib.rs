//! Transaction anomaly and spending analysis.
//!
//! [`pipeline::Pipeline`] turns a CSV ledger into an [`pipeline::AnalysisReport`]: each
//! transaction flagged by an [`scorer::AnomalyScorer`], plus income/expense totals and
//! per-category and per-month spending.

pub mod aggregate;
pub mod error;
pub mod explain;
pub mod features;
pub mod filter;
pub mod fmt;
pub mod forest;
pub mod models;
pub mod parser;
pub mod pipeline;
pub mod scorer;
pub mod settings;

pub use error::{LensError, Result};
pub use pipeline::{AnalysisReport, Pipeline};
pub use scorer::{AnomalyLabel, AnomalyScorer, ScorerHandle};
