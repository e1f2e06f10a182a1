//! End-to-end analysis: parse, engineer features, score, enrich, aggregate.
//!
//! A run is all-or-nothing. The first failing stage ends it and no partial report is
//! produced. [`Pipeline`] keeps no per-run state, so one instance can serve concurrent
//! callers.

use std::collections::BTreeMap;
use std::io::Read;
use std::path::Path;

use serde::Serialize;
use tracing::{debug, info, warn};

use crate::aggregate::{aggregate, SummaryStatistics};
use crate::error::{LensError, Result};
use crate::features;
use crate::models::{EnrichedTransaction, TransactionRecord};
use crate::parser;
use crate::scorer::ScorerHandle;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Stage {
    Received,
    Parsed,
    FeatureEngineered,
    Scored,
    Enriched,
    Aggregated,
    Done,
}

#[derive(Debug, Clone, Serialize)]
pub struct ChartsData {
    pub category_spending: BTreeMap<String, f64>,
    pub monthly_spending: BTreeMap<String, f64>,
}

#[derive(Debug, Clone, Serialize)]
pub struct Analysis {
    pub category_averages: BTreeMap<String, f64>,
}

#[derive(Debug, Clone, Serialize)]
pub struct AnalysisReport {
    pub transactions: Vec<EnrichedTransaction>,
    pub summary: SummaryStatistics,
    pub charts_data: ChartsData,
    pub analysis: Analysis,
}

/// Caller-facing failure payload.
#[derive(Debug, Clone, Serialize)]
pub struct ErrorBody {
    pub error: String,
}

impl From<&LensError> for ErrorBody {
    fn from(e: &LensError) -> Self {
        Self {
            error: e.to_string(),
        }
    }
}

/// Typed errors pass through; anything else becomes `Unexpected`.
fn into_caller_error(e: LensError) -> LensError {
    match e {
        LensError::Schema(_)
        | LensError::Data(_)
        | LensError::ServiceUnavailable(_)
        | LensError::InvalidFileType(_)
        | LensError::Unexpected(_) => e,
        other => LensError::Unexpected(other.to_string()),
    }
}

fn advance(stage: &mut Stage, next: Stage) {
    debug!(from = ?*stage, to = ?next, "Pipeline stage");
    *stage = next;
}

#[derive(Debug, Clone)]
pub struct Pipeline {
    scorer: ScorerHandle,
}

impl Pipeline {
    pub fn new(scorer: ScorerHandle) -> Self {
        Self { scorer }
    }

    pub fn scorer(&self) -> &ScorerHandle {
        &self.scorer
    }

    pub fn run<R: Read>(&self, reader: R) -> Result<AnalysisReport> {
        self.analyze(|| parser::parse(reader))
    }

    pub fn run_path(&self, file_path: &Path) -> Result<AnalysisReport> {
        self.analyze(|| parser::parse_path(file_path))
    }

    fn analyze<F>(&self, source: F) -> Result<AnalysisReport>
    where
        F: FnOnce() -> Result<Vec<TransactionRecord>>,
    {
        let mut stage = Stage::Received;
        self.execute(source, &mut stage).map_err(|e| {
            let e = into_caller_error(e);
            warn!(last_stage = ?stage, error = %e, "Analysis failed");
            e
        })
    }

    fn execute<F>(&self, source: F, stage: &mut Stage) -> Result<AnalysisReport>
    where
        F: FnOnce() -> Result<Vec<TransactionRecord>>,
    {
        // Checked before touching the input.
        let scorer = self.scorer.get()?;

        let records = source()?;
        advance(stage, Stage::Parsed);

        let matrix = features::engineer(&records, scorer.schema());
        advance(stage, Stage::FeatureEngineered);

        let labels = scorer.score(&matrix)?;
        if labels.len() != records.len() {
            return Err(LensError::Unexpected(format!(
                "scorer {} returned {} labels for {} transactions",
                scorer.name(),
                labels.len(),
                records.len()
            )));
        }
        advance(stage, Stage::Scored);

        let outlier = scorer.outlier_label();
        let transactions: Vec<EnrichedTransaction> = records
            .into_iter()
            .zip(labels)
            .map(|(record, label)| EnrichedTransaction::new(record, label == outlier))
            .collect();
        advance(stage, Stage::Enriched);

        let agg = aggregate(&transactions);
        advance(stage, Stage::Aggregated);

        info!(
            transactions = agg.summary.total_transactions,
            anomalies = agg.summary.anomalies_found,
            "Analysis complete"
        );
        let report = AnalysisReport {
            transactions,
            summary: agg.summary,
            charts_data: ChartsData {
                category_spending: agg.categories.spending,
                monthly_spending: agg.monthly.spending,
            },
            analysis: Analysis {
                category_averages: agg.categories.averages,
            },
        };
        advance(stage, Stage::Done);
        Ok(report)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::features::{FeatureMatrix, FeatureSchema};
    use crate::forest::{IsolationForest, WEEKEND_FOREST};
    use crate::scorer::testing::{ColumnFlagScorer, ConstantScorer};
    use crate::scorer::{AnomalyLabel, AnomalyScorer};

    const LEDGER: &str = "\
Date,Description,Amount,Category
2024-01-06,Coffee,-5,Dining
2024-01-07,Payroll,2000,Income
";

    fn schema() -> FeatureSchema {
        FeatureSchema::new(["day_of_week", "day_of_month", "is_weekend", "cat_Dining", "cat_Income"])
            .unwrap()
    }

    fn forest_pipeline() -> Pipeline {
        Pipeline::new(ScorerHandle::new(IsolationForest::from_json(WEEKEND_FOREST).unwrap()))
    }

    #[test]
    fn test_end_to_end_example() {
        let report = forest_pipeline().run(LEDGER.as_bytes()).unwrap();
        assert_eq!(report.summary.total_income, 2000.0);
        assert_eq!(report.summary.total_expenses, 5.0);
        assert_eq!(report.summary.balance, 1995.0);
        assert_eq!(report.charts_data.category_spending["Dining"], 5.0);
        assert_eq!(report.charts_data.monthly_spending["January"], 5.0);
        assert_eq!(report.analysis.category_averages["Dining"], 5.0);
        assert_eq!(report.transactions.len(), 2);
        assert_eq!(report.transactions[0].month, "January");
    }

    #[test]
    fn test_json_payload_shape() {
        let report = forest_pipeline().run(LEDGER.as_bytes()).unwrap();
        let v = serde_json::to_value(&report).unwrap();
        assert_eq!(v["summary"]["balance"], 1995.0);
        assert_eq!(v["summary"]["anomalies_found"], 2);
        assert_eq!(v["charts_data"]["category_spending"]["Dining"], 5.0);
        assert_eq!(v["analysis"]["category_averages"]["Dining"], 5.0);
        assert_eq!(v["transactions"][1]["Description"], "Payroll");
        assert_eq!(v["transactions"][1]["is_anomaly"], 1);
    }

    #[test]
    fn test_anomaly_count_matches_flags() {
        let pipeline = Pipeline::new(ScorerHandle::new(ColumnFlagScorer {
            schema: schema(),
            flag_column: "cat_Income".into(),
        }));
        let report = pipeline.run(LEDGER.as_bytes()).unwrap();
        let flagged = report.transactions.iter().filter(|t| t.is_anomaly == 1).count();
        assert_eq!(report.summary.anomalies_found, flagged);
        assert_eq!(flagged, 1);
        assert!(report.transactions[1].is_anomaly());
    }

    #[test]
    fn test_all_normal_scorer_means_no_anomalies() {
        let pipeline = Pipeline::new(ScorerHandle::new(ConstantScorer {
            schema: schema(),
            label: AnomalyLabel::INLIER,
        }));
        let report = pipeline.run(LEDGER.as_bytes()).unwrap();
        assert_eq!(report.summary.anomalies_found, 0);
    }

    #[test]
    fn test_uninitialized_scorer_fails_before_parsing() {
        let pipeline = Pipeline::new(ScorerHandle::uninitialized());
        // Input is malformed too; the scorer check must win.
        let err = pipeline.run("Date\nnope\n".as_bytes()).unwrap_err();
        assert!(matches!(err, LensError::ServiceUnavailable(_)));
    }

    #[test]
    fn test_missing_column_is_schema_error() {
        let csv = "Date,Description,Amount\n2024-01-06,Coffee,-5\n";
        let err = forest_pipeline().run(csv.as_bytes()).unwrap_err();
        assert!(matches!(err, LensError::Schema(_)));
    }

    #[test]
    fn test_bad_date_is_data_error() {
        let csv = "Date,Description,Amount,Category\n2024-13-01,Coffee,-5,Dining\n";
        let err = forest_pipeline().run(csv.as_bytes()).unwrap_err();
        assert!(matches!(err, LensError::Data(_)));
    }

    #[test]
    fn test_non_numeric_amount_is_retained() {
        let csv = "\
Date,Description,Amount,Category
2024-01-08,Mystery,abc,Dining
2024-01-09,Lunch,-12,Dining
";
        let report = forest_pipeline().run(csv.as_bytes()).unwrap();
        assert_eq!(report.transactions.len(), 2);
        assert_eq!(report.transactions[0].record.amount, 0.0);
        assert_eq!(report.summary.total_expenses, 12.0);
        assert_eq!(report.summary.total_income, 0.0);
    }

    #[test]
    fn test_unknown_categories_still_score() {
        let csv = "Date,Description,Amount,Category\n2024-01-09,Gadget,-300,Electronics\n";
        let report = forest_pipeline().run(csv.as_bytes()).unwrap();
        assert_eq!(report.transactions.len(), 1);
        assert_eq!(report.charts_data.category_spending["Electronics"], 300.0);
    }

    struct ShortScorer(FeatureSchema);

    impl AnomalyScorer for ShortScorer {
        fn name(&self) -> &str {
            "short"
        }

        fn schema(&self) -> &FeatureSchema {
            &self.0
        }

        fn score(&self, _matrix: &FeatureMatrix) -> Result<Vec<AnomalyLabel>> {
            Ok(vec![AnomalyLabel::INLIER])
        }
    }

    #[test]
    fn test_label_count_mismatch_is_unexpected() {
        let pipeline = Pipeline::new(ScorerHandle::new(ShortScorer(schema())));
        let err = pipeline.run(LEDGER.as_bytes()).unwrap_err();
        assert!(matches!(err, LensError::Unexpected(_)));
    }

    #[test]
    fn test_malformed_csv_is_wrapped_as_unexpected() {
        let bytes: &[u8] = b"Date,Description,Amount,Category\n2024-01-06,\xff\xfe,-5,Dining\n";
        let err = forest_pipeline().run(bytes).unwrap_err();
        assert!(matches!(err, LensError::Unexpected(_)));
        assert!(err.to_string().starts_with("An error occurred during processing"));
    }

    #[test]
    fn test_error_body() {
        let body = ErrorBody::from(&LensError::Schema(vec!["Category".into()]));
        let v = serde_json::to_value(&body).unwrap();
        assert_eq!(v["error"], "CSV is missing required columns: Category");
    }

    #[test]
    fn test_run_path_rejects_non_csv() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("ledger.txt");
        std::fs::write(&path, LEDGER).unwrap();
        let err = forest_pipeline().run_path(&path).unwrap_err();
        assert!(matches!(err, LensError::InvalidFileType(_)));
    }
}
