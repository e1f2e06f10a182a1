//! The anomaly-scoring boundary.
//!
//! The pipeline only knows [`AnomalyScorer`]'s contract: one label per row, in order,
//! deterministic for identical input. The process owns a single [`ScorerHandle`],
//! created at startup and read-only afterwards.

use std::fmt;
use std::path::Path;
use std::sync::Arc;

use serde::{Deserialize, Serialize};
use tracing::{error, info};

use crate::error::{LensError, Result};
use crate::features::{FeatureMatrix, FeatureSchema};
use crate::forest::IsolationForest;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct AnomalyLabel(pub i32);

impl AnomalyLabel {
    pub const OUTLIER: Self = Self(-1);
    pub const INLIER: Self = Self(1);
}

pub trait AnomalyScorer: Send + Sync {
    fn name(&self) -> &str;

    /// Feature columns, in the order the scorer expects them.
    fn schema(&self) -> &FeatureSchema;

    /// The label value that means "anomalous".
    fn outlier_label(&self) -> AnomalyLabel {
        AnomalyLabel::OUTLIER
    }

    fn score(&self, matrix: &FeatureMatrix) -> Result<Vec<AnomalyLabel>>;
}

/// Shared, possibly-uninitialized handle to the process scorer.
#[derive(Clone, Default)]
pub struct ScorerHandle {
    inner: Option<Arc<dyn AnomalyScorer>>,
}

impl ScorerHandle {
    pub fn uninitialized() -> Self {
        Self { inner: None }
    }

    pub fn new<S: AnomalyScorer + 'static>(scorer: S) -> Self {
        Self {
            inner: Some(Arc::new(scorer)),
        }
    }

    /// Load an isolation-forest artifact. A failed load is logged and leaves the handle
    /// uninitialized, so requests fail with `ServiceUnavailable` instead of the process
    /// refusing to start.
    pub fn load(path: &Path) -> Self {
        match IsolationForest::from_path(path) {
            Ok(forest) => {
                info!(
                    model = %forest.name(),
                    columns = forest.schema().len(),
                    "Anomaly model ready"
                );
                Self::new(forest)
            }
            Err(e) => {
                error!(path = %path.display(), error = %e, "Could not load anomaly model");
                Self::uninitialized()
            }
        }
    }

    pub fn is_initialized(&self) -> bool {
        self.inner.is_some()
    }

    pub fn get(&self) -> Result<&dyn AnomalyScorer> {
        self.inner
            .as_deref()
            .ok_or_else(|| LensError::ServiceUnavailable("no anomaly model is initialized".into()))
    }
}

impl fmt::Debug for ScorerHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.inner {
            Some(s) => f.debug_tuple("ScorerHandle").field(&s.name()).finish(),
            None => f.write_str("ScorerHandle(uninitialized)"),
        }
    }
}

#[cfg(test)]
pub(crate) mod testing {
    use super::*;

    /// Labels a row as an outlier when `flag_column` is non-zero.
    pub struct ColumnFlagScorer {
        pub schema: FeatureSchema,
        pub flag_column: String,
    }

    impl AnomalyScorer for ColumnFlagScorer {
        fn name(&self) -> &str {
            "column-flag"
        }

        fn schema(&self) -> &FeatureSchema {
            &self.schema
        }

        fn score(&self, matrix: &FeatureMatrix) -> Result<Vec<AnomalyLabel>> {
            Ok((0..matrix.len())
                .map(|i| match matrix.get(i, &self.flag_column) {
                    Some(v) if v != 0.0 => AnomalyLabel::OUTLIER,
                    _ => AnomalyLabel::INLIER,
                })
                .collect())
        }
    }

    /// Returns the same label for every row.
    pub struct ConstantScorer {
        pub schema: FeatureSchema,
        pub label: AnomalyLabel,
    }

    impl AnomalyScorer for ConstantScorer {
        fn name(&self) -> &str {
            "constant"
        }

        fn schema(&self) -> &FeatureSchema {
            &self.schema
        }

        fn score(&self, matrix: &FeatureMatrix) -> Result<Vec<AnomalyLabel>> {
            Ok(vec![self.label; matrix.len()])
        }
    }
}
