//! Stacking ensemble: base estimators feed positive-class probabilities to a
//! logistic-regression meta learner.

use ndarray::{ArrayView1, aview1};
use serde::{Deserialize, Serialize};

use super::linear::{LogisticModel, sigmoid};
use super::tree::DecisionTree;
use super::{BinaryClassifier, PredictionError};
use crate::transform::FeatureVector;

/// Current classifier exchange format version.
pub const CLASSIFIER_FORMAT_VERSION: i64 = 1;

/// A fitted first-level estimator.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum BaseEstimator {
    LogisticRegression(LogisticModel),
    DecisionTree(DecisionTree),
    /// Mean of the trees' leaf probabilities.
    RandomForest {
        trees: Vec<DecisionTree>,
    },
    /// Binary log-loss boosting over regression trees.
    GradientBoosting {
        /// Log-odds before the first tree.
        init_raw: f64,
        learning_rate: f64,
        /// Trees whose leaves hold raw log-odds increments.
        trees: Vec<DecisionTree>,
    },
}

impl BaseEstimator {
    fn validate(&self, n_features: usize) -> Result<(), String> {
        match self {
            BaseEstimator::LogisticRegression(model) => model.validate(n_features),
            BaseEstimator::DecisionTree(tree) => tree.validate(n_features),
            BaseEstimator::RandomForest { trees } => {
                if trees.is_empty() {
                    return Err("random_forest has no trees".to_string());
                }
                validate_trees(trees, n_features)
            }
            BaseEstimator::GradientBoosting {
                init_raw,
                learning_rate,
                trees,
            } => {
                if !init_raw.is_finite() || !learning_rate.is_finite() {
                    return Err("gradient_boosting parameters must be finite".to_string());
                }
                validate_trees(trees, n_features)
            }
        }
    }

    /// Probability of the second class.
    pub fn positive_proba(&self, features: ArrayView1<'_, f64>) -> Result<f64, PredictionError> {
        match self {
            BaseEstimator::LogisticRegression(model) => model.proba(features),
            BaseEstimator::DecisionTree(tree) => tree.predict(features),
            BaseEstimator::RandomForest { trees } => {
                if trees.is_empty() {
                    return Err(PredictionError::InvalidModel(
                        "random_forest has no trees".to_string(),
                    ));
                }
                let total = sum_trees(trees, features)?;
                Ok(total / trees.len() as f64)
            }
            BaseEstimator::GradientBoosting {
                init_raw,
                learning_rate,
                trees,
            } => {
                let boosted = sum_trees(trees, features)?;
                Ok(sigmoid(init_raw + learning_rate * boosted))
            }
        }
    }
}

fn sum_trees(trees: &[DecisionTree], features: ArrayView1<'_, f64>) -> Result<f64, PredictionError> {
    trees.iter().map(|tree| tree.predict(features)).sum()
}

fn validate_trees(trees: &[DecisionTree], n_features: usize) -> Result<(), String> {
    for (idx, tree) in trees.iter().enumerate() {
        tree.validate(n_features)
            .map_err(|err| format!("tree {idx}: {err}"))?;
    }
    Ok(())
}

/// Base estimator with the name it was given at fit time.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NamedEstimator {
    /// Used in error messages and logs.
    pub name: String,
    pub model: BaseEstimator,
}

/// Fitted stacking classifier as shipped in `stacking_clf.json`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StackingClassifier {
    /// Must equal [`CLASSIFIER_FORMAT_VERSION`].
    pub format_version: i64,
    /// `[negative, positive]` class values.
    pub classes: Vec<i64>,
    /// Width of the feature vector every base estimator reads.
    pub n_features: usize,
    /// First-level estimators, in meta-feature order.
    pub estimators: Vec<NamedEstimator>,
    /// Meta learner over the base probabilities (and the raw features with `passthrough`).
    pub final_estimator: LogisticModel,
    /// Append the original features to the meta learner's inputs.
    #[serde(default)]
    pub passthrough: bool,
}

impl StackingClassifier {
    pub fn validate(&self) -> Result<(), String> {
        if self.format_version != CLASSIFIER_FORMAT_VERSION {
            return Err(format!(
                "Unsupported format_version {} (expected {})",
                self.format_version, CLASSIFIER_FORMAT_VERSION
            ));
        }
        if self.classes.len() != 2 || self.classes[0] == self.classes[1] {
            return Err("classifier must have exactly two distinct classes".to_string());
        }
        if self.estimators.is_empty() {
            return Err("no base estimators".to_string());
        }
        for estimator in &self.estimators {
            estimator
                .model
                .validate(self.n_features)
                .map_err(|err| format!("estimator \"{}\": {err}", estimator.name))?;
        }
        self.final_estimator
            .validate(self.meta_width())
            .map_err(|err| format!("final_estimator: {err}"))
    }

    fn meta_width(&self) -> usize {
        self.estimators.len() + if self.passthrough { self.n_features } else { 0 }
    }

    /// Meta learner margin for one feature vector.
    pub fn decision_function(&self, features: &FeatureVector) -> Result<f64, PredictionError> {
        if features.len() != self.n_features {
            return Err(PredictionError::FeatureWidth {
                expected: self.n_features,
                found: features.len(),
            });
        }
        let view = features.view();
        let mut meta = Vec::with_capacity(self.meta_width());
        for estimator in &self.estimators {
            let proba = estimator.model.positive_proba(view)?;
            if !proba.is_finite() {
                return Err(PredictionError::NonFinite {
                    stage: estimator.name.clone(),
                });
            }
            meta.push(proba);
        }
        if self.passthrough {
            meta.extend(view.iter().copied());
        }
        let margin = self.final_estimator.decision(aview1(&meta))?;
        if margin.is_nan() {
            return Err(PredictionError::NonFinite {
                stage: "final_estimator".to_string(),
            });
        }
        Ok(margin)
    }

    pub fn predict_proba(&self, features: &FeatureVector) -> Result<f64, PredictionError> {
        self.decision_function(features).map(sigmoid)
    }
}

impl BinaryClassifier for StackingClassifier {
    fn classify(&self, features: &FeatureVector) -> Result<i64, PredictionError> {
        let &[negative, positive] = self.classes.as_slice() else {
            return Err(PredictionError::InvalidModel(format!(
                "expected two classes, found {}",
                self.classes.len()
            )));
        };
        let margin = self.decision_function(features)?;
        let class = if margin > 0.0 { positive } else { negative };
        tracing::debug!(margin, class, "stacking classifier decision");
        Ok(class)
    }
}
