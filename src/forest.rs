//! Isolation-forest scorer loaded from a JSON artifact.
//!
//! Artifact layout:
//!
//! ```json
//! {
//!   "name": "personal-finance",
//!   "columns": ["day_of_week", "day_of_month", "is_weekend", "cat_Dining"],
//!   "max_samples": 256,
//!   "offset": -0.5,
//!   "trees": [
//!     { "nodes": [
//!         { "feature": 2, "threshold": 0.5, "left": 1, "right": 2 },
//!         { "size": 250 },
//!         { "size": 6 }
//!     ] }
//!   ]
//! }
//! ```
//!
//! Nodes are stored parent-before-child; a row goes left when
//! `row[feature] <= threshold`.

use std::path::Path;

use serde::Deserialize;
use sha2::{Digest, Sha256};
use tracing::info;

use crate::error::{LensError, Result};
use crate::features::{FeatureMatrix, FeatureSchema};
use crate::scorer::{AnomalyLabel, AnomalyScorer};

const EULER_GAMMA: f64 = 0.577_215_664_901_532_9;

#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
enum Node {
    Split {
        feature: usize,
        threshold: f64,
        left: usize,
        right: usize,
    },
    Leaf {
        size: usize,
    },
}

#[derive(Debug, Clone, Deserialize)]
struct Tree {
    nodes: Vec<Node>,
}

#[derive(Debug, Deserialize)]
struct Artifact {
    #[serde(default = "default_name")]
    name: String,
    columns: Vec<String>,
    max_samples: usize,
    #[serde(default = "default_offset")]
    offset: f64,
    trees: Vec<Tree>,
}

fn default_name() -> String {
    "isolation-forest".to_string()
}

fn default_offset() -> f64 {
    -0.5
}

/// Expected path length of an unsuccessful BST search among `n` points.
pub fn average_path_length(n: usize) -> f64 {
    match n {
        0 | 1 => 0.0,
        2 => 1.0,
        _ => {
            let n = n as f64;
            2.0 * ((n - 1.0).ln() + EULER_GAMMA) - 2.0 * (n - 1.0) / n
        }
    }
}

impl Tree {
    fn validate(&self, t: usize, width: usize) -> Result<()> {
        if self.nodes.is_empty() {
            return Err(LensError::Model(format!("tree {t} has no nodes")));
        }
        for (i, node) in self.nodes.iter().enumerate() {
            if let Node::Split {
                feature,
                left,
                right,
                ..
            } = node
            {
                if *feature >= width {
                    return Err(LensError::Model(format!(
                        "tree {t} node {i}: feature {feature} out of range"
                    )));
                }
                for child in [left, right] {
                    if *child <= i || *child >= self.nodes.len() {
                        return Err(LensError::Model(format!(
                            "tree {t} node {i}: bad child index {child}"
                        )));
                    }
                }
            }
        }
        Ok(())
    }

    fn path_length(&self, row: &[f64]) -> f64 {
        let mut idx = 0;
        let mut depth = 0.0;
        loop {
            match &self.nodes[idx] {
                Node::Split {
                    feature,
                    threshold,
                    left,
                    right,
                } => {
                    idx = if row[*feature] <= *threshold { *left } else { *right };
                    depth += 1.0;
                }
                Node::Leaf { size } => return depth + average_path_length(*size),
            }
        }
    }
}

pub struct IsolationForest {
    name: String,
    schema: FeatureSchema,
    trees: Vec<Tree>,
    normalizer: f64,
    offset: f64,
}

impl IsolationForest {
    pub fn from_json(json: &str) -> Result<Self> {
        let artifact: Artifact = serde_json::from_str(json)
            .map_err(|e| LensError::Model(format!("unreadable artifact: {e}")))?;
        Self::from_artifact(artifact)
    }

    pub fn from_path(path: &Path) -> Result<Self> {
        let data = std::fs::read(path)?;
        let checksum = hex::encode(Sha256::digest(&data));
        let json = std::str::from_utf8(&data)
            .map_err(|e| LensError::Model(format!("artifact is not UTF-8: {e}")))?;
        let forest = Self::from_json(json)?;
        info!(
            path = %path.display(),
            sha256 = %checksum,
            trees = forest.trees.len(),
            "Loaded isolation forest"
        );
        Ok(forest)
    }

    fn from_artifact(artifact: Artifact) -> Result<Self> {
        if artifact.trees.is_empty() {
            return Err(LensError::Model("artifact has no trees".into()));
        }
        if artifact.max_samples == 0 {
            return Err(LensError::Model("max_samples must be at least 1".into()));
        }
        let schema = FeatureSchema::new(artifact.columns)?;
        for (t, tree) in artifact.trees.iter().enumerate() {
            tree.validate(t, schema.len())?;
        }
        // A single-sample forest has c(n) == 0; treat every path as depth-normalized by 1.
        let normalizer = average_path_length(artifact.max_samples).max(1.0);
        Ok(Self {
            name: artifact.name,
            schema,
            trees: artifact.trees,
            normalizer,
            offset: artifact.offset,
        })
    }

    /// Raw anomaly score in [-1, 0]; lower is more anomalous.
    pub fn score_row(&self, row: &[f64]) -> f64 {
        let mean_depth = self.trees.iter().map(|t| t.path_length(row)).sum::<f64>()
            / self.trees.len() as f64;
        -(2f64.powf(-mean_depth / self.normalizer))
    }

    pub fn decision(&self, row: &[f64]) -> f64 {
        self.score_row(row) - self.offset
    }
}

impl AnomalyScorer for IsolationForest {
    fn name(&self) -> &str {
        &self.name
    }

    fn schema(&self) -> &FeatureSchema {
        &self.schema
    }

    fn score(&self, matrix: &FeatureMatrix) -> Result<Vec<AnomalyLabel>> {
        if matrix.schema() != &self.schema {
            return Err(LensError::Unexpected(
                "feature matrix is not aligned to the model schema".into(),
            ));
        }
        Ok(matrix
            .rows()
            .iter()
            .map(|row| {
                if self.decision(row) < 0.0 {
                    AnomalyLabel::OUTLIER
                } else {
                    AnomalyLabel::INLIER
                }
            })
            .collect())
    }
}

#[cfg(test)]
pub(crate) const WEEKEND_FOREST: &str = r#"{
    "name": "weekend-outliers",
    "columns": ["day_of_week", "day_of_month", "is_weekend", "cat_Dining", "cat_Income"],
    "max_samples": 256,
    "offset": -0.5,
    "trees": [
        { "nodes": [
            { "feature": 2, "threshold": 0.5, "left": 1, "right": 2 },
            { "size": 256 },
            { "size": 1 }
        ] }
    ]
}"#;

#[cfg(test)]
mod tests {
    use super::*;
    use crate::features::engineer;
    use crate::models::record;

    #[test]
    fn test_average_path_length() {
        assert_eq!(average_path_length(1), 0.0);
        assert_eq!(average_path_length(2), 1.0);
        let c256 = average_path_length(256);
        assert!((c256 - 10.2448).abs() < 1e-3, "c(256) = {c256}");
    }

    #[test]
    fn test_isolated_row_is_outlier() {
        let forest = IsolationForest::from_json(WEEKEND_FOREST).unwrap();
        let txs = [
            record("2024-01-08", "Groceries", -40.0, "Dining"),
            record("2024-01-06", "Coffee", -5.0, "Dining"),
        ];
        let m = engineer(&txs, forest.schema());
        let labels = forest.score(&m).unwrap();
        assert_eq!(labels, vec![AnomalyLabel::INLIER, AnomalyLabel::OUTLIER]);
    }

    #[test]
    fn test_scores_are_deterministic() {
        let forest = IsolationForest::from_json(WEEKEND_FOREST).unwrap();
        let row = [5.0, 6.0, 1.0, 1.0, 0.0];
        assert_eq!(forest.score_row(&row), forest.score_row(&row));
        assert!(forest.score_row(&row) >= -1.0 && forest.score_row(&row) <= 0.0);
    }

    #[test]
    fn test_rejects_unaligned_matrix() {
        let forest = IsolationForest::from_json(WEEKEND_FOREST).unwrap();
        let other = FeatureSchema::new(["is_weekend"]).unwrap();
        let m = engineer(&[record("2024-01-06", "Coffee", -5.0, "Dining")], &other);
        assert!(matches!(forest.score(&m), Err(LensError::Unexpected(_))));
    }

    #[test]
    fn test_rejects_feature_out_of_range() {
        let json = r#"{"columns": ["is_weekend"], "max_samples": 8,
            "trees": [{"nodes": [{"feature": 3, "threshold": 0.5, "left": 1, "right": 2},
                                 {"size": 4}, {"size": 4}]}]}"#;
        assert!(matches!(IsolationForest::from_json(json), Err(LensError::Model(_))));
    }

    #[test]
    fn test_rejects_backward_child() {
        let json = r#"{"columns": ["is_weekend"], "max_samples": 8,
            "trees": [{"nodes": [{"feature": 0, "threshold": 0.5, "left": 0, "right": 1},
                                 {"size": 4}]}]}"#;
        assert!(matches!(IsolationForest::from_json(json), Err(LensError::Model(_))));
    }

    #[test]
    fn test_rejects_empty_forest() {
        let json = r#"{"columns": ["is_weekend"], "max_samples": 8, "trees": []}"#;
        assert!(matches!(IsolationForest::from_json(json), Err(LensError::Model(_))));
    }

    #[test]
    fn test_rejects_malformed_json() {
        assert!(matches!(IsolationForest::from_json("{"), Err(LensError::Model(_))));
    }

    #[test]
    fn test_from_path_reads_artifact() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("model.json");
        std::fs::write(&path, WEEKEND_FOREST).unwrap();
        let forest = IsolationForest::from_path(&path).unwrap();
        assert_eq!(forest.name(), "weekend-outliers");
        assert_eq!(forest.schema().len(), 5);
    }
}
