//! Inference over fitted binary classifiers.
//!
//! Models are trained elsewhere and exported as JSON; this module only loads,
//! validates and evaluates them.

pub mod linear;
pub mod stacking;
pub mod tree;

use thiserror::Error;

use crate::transform::FeatureVector;

pub use stacking::{BaseEstimator, NamedEstimator, StackingClassifier};

/// Failure while invoking a classifier on a feature vector.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum PredictionError {
    #[error("Classifier expects {expected} features, got {found}")]
    FeatureWidth { expected: usize, found: usize },
    #[error("Non-finite score from {stage}")]
    NonFinite { stage: String },
    /// The model was built without passing `validate`.
    #[error("Invalid model: {0}")]
    InvalidModel(String),
}

/// Capability to assign one class value to a feature vector.
pub trait BinaryClassifier {
    fn classify(&self, features: &FeatureVector) -> Result<i64, PredictionError>;
}
