//! Pass/fail prediction for student records over fitted, externally trained artifacts.
/// Application directory resolution.
pub mod app_dirs;
/// Fitted artifact loading and compatibility checks.
pub mod artifacts;
/// TOML configuration.
pub mod config;
/// Categorical label encoding.
pub mod encoding;
/// Front-end form choices and validation.
pub mod form;
/// Logging setup.
pub mod logging;
/// Classifier inference.
pub mod ml;
/// End-to-end request pipeline.
pub mod predict;
/// Raw records and the input schema.
pub mod record;
/// Preprocessing pipeline evaluation.
pub mod transform;

pub use artifacts::{ArtifactError, ArtifactPaths, Artifacts};
pub use predict::{PredictError, Prediction, predict};
pub use record::{Field, FieldValue, RawInputRecord};
