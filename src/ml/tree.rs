use ndarray::ArrayView1;
use serde::{Deserialize, Serialize};

use super::PredictionError;

/// Node of a fitted binary decision tree.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum TreeNode {
    /// Go to `left` when `features[feature] <= threshold`, else `right`.
    Split {
        /// Index into the feature vector.
        feature: usize,
        threshold: f64,
        /// Node index taken when the feature is at or below `threshold`.
        left: usize,
        right: usize,
    },
    /// Positive-class probability for classification trees, raw score for
    /// boosting trees.
    Leaf { value: f64 },
}

/// Flat node list rooted at index 0. Children always follow their parent.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DecisionTree {
    /// Nodes in preorder; index 0 is the root.
    pub nodes: Vec<TreeNode>,
}

impl DecisionTree {
    pub fn validate(&self, n_features: usize) -> Result<(), String> {
        if self.nodes.is_empty() {
            return Err("tree has no nodes".to_string());
        }
        let len = self.nodes.len();
        for (idx, node) in self.nodes.iter().enumerate() {
            match node {
                TreeNode::Split {
                    feature,
                    threshold,
                    left,
                    right,
                } => {
                    if *feature >= n_features {
                        return Err(format!(
                            "node {idx} splits on feature {feature} of {n_features}"
                        ));
                    }
                    if threshold.is_nan() {
                        return Err(format!("node {idx} has a NaN threshold"));
                    }
                    for child in [*left, *right] {
                        if child <= idx || child >= len {
                            return Err(format!("node {idx} has invalid child {child}"));
                        }
                    }
                }
                TreeNode::Leaf { value } => {
                    if !value.is_finite() {
                        return Err(format!("leaf {idx} is not finite"));
                    }
                }
            }
        }
        Ok(())
    }

    /// Walk from the root to a leaf.
    pub fn predict(&self, features: ArrayView1<'_, f64>) -> Result<f64, PredictionError> {
        let mut idx = 0usize;
        // Children follow their parent, so a leaf is reached within `nodes.len()` hops.
        for _ in 0..self.nodes.len() {
            match self.nodes.get(idx) {
                Some(TreeNode::Leaf { value }) => return Ok(*value),
                Some(TreeNode::Split {
                    feature,
                    threshold,
                    left,
                    right,
                }) => {
                    let value = features.get(*feature).copied().ok_or_else(|| {
                        PredictionError::InvalidModel(format!(
                            "node {idx} splits on feature {feature} of {}",
                            features.len()
                        ))
                    })?;
                    idx = if value <= *threshold { *left } else { *right };
                }
                None => {
                    return Err(PredictionError::InvalidModel(format!(
                        "tree references missing node {idx}"
                    )));
                }
            }
        }
        Err(PredictionError::InvalidModel(
            "tree walk did not reach a leaf".to_string(),
        ))
    }
}
