//! Loading and cross-checking the three fitted artifacts.
//!
//! Artifacts are read once at startup and never mutated afterwards. The
//! resulting [`Artifacts`] value is the context every prediction borrows.

use std::path::{Path, PathBuf};

use serde::de::DeserializeOwned;
use thiserror::Error;

use crate::encoding::EncoderMap;
use crate::ml::StackingClassifier;
use crate::record::{Field, FieldKind};
use crate::transform::{FeatureTransform, PreprocessingPipeline};

pub const ENCODERS_FILE_NAME: &str = "label_encoders.json";
pub const PIPELINE_FILE_NAME: &str = "preprocessing_pipeline.json";
pub const CLASSIFIER_FILE_NAME: &str = "stacking_clf.json";
/// Demo artifacts shipped in the source tree.
pub const BUNDLED_ARTIFACTS_DIR: &str = concat!(env!("CARGO_MANIFEST_DIR"), "/assets/artifacts");

/// Errors raised while loading artifacts.
#[derive(Debug, Error)]
pub enum ArtifactError {
    #[error("Failed to read artifact {path}: {source}")]
    Read {
        path: PathBuf,
        source: std::io::Error,
    },
    #[error("Malformed artifact {path}: {source}")]
    Parse {
        path: PathBuf,
        source: serde_json::Error,
    },
    #[error("Invalid artifact {path}: {reason}")]
    Invalid { path: PathBuf, reason: String },
    /// The artifacts are individually valid but do not fit together.
    #[error("Incompatible artifacts: {0}")]
    Mismatch(String),
}

/// File locations of the three artifacts.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ArtifactPaths {
    /// `label_encoders.json`: column name to fitted classes.
    pub encoders: PathBuf,
    /// `preprocessing_pipeline.json`: column transformer.
    pub pipeline: PathBuf,
    /// `stacking_clf.json`: stacking ensemble.
    pub classifier: PathBuf,
}

impl ArtifactPaths {
    /// Default file names inside `dir`.
    pub fn in_dir(dir: &Path) -> Self {
        Self {
            encoders: dir.join(ENCODERS_FILE_NAME),
            pipeline: dir.join(PIPELINE_FILE_NAME),
            classifier: dir.join(CLASSIFIER_FILE_NAME),
        }
    }
}

/// Encoder map, preprocessing pipeline and classifier, validated together.
#[derive(Debug, Clone)]
pub struct Artifacts {
    encoders: EncoderMap,
    pipeline: PreprocessingPipeline,
    classifier: StackingClassifier,
}

impl Artifacts {
    pub fn load(paths: &ArtifactPaths) -> Result<Self, ArtifactError> {
        let encoders: EncoderMap = read_json(&paths.encoders)?;
        encoders.validate().map_err(|reason| ArtifactError::Invalid {
            path: paths.encoders.clone(),
            reason,
        })?;
        let pipeline: PreprocessingPipeline = read_json(&paths.pipeline)?;
        pipeline.validate().map_err(|reason| ArtifactError::Invalid {
            path: paths.pipeline.clone(),
            reason,
        })?;
        let classifier: StackingClassifier = read_json(&paths.classifier)?;
        classifier.validate().map_err(|reason| ArtifactError::Invalid {
            path: paths.classifier.clone(),
            reason,
        })?;

        let artifacts = Self::check_compatible(encoders, pipeline, classifier)?;
        tracing::info!(
            encoders = %paths.encoders.display(),
            pipeline = %paths.pipeline.display(),
            classifier = %paths.classifier.display(),
            features = artifacts.classifier.n_features,
            "Loaded fitted artifacts"
        );
        Ok(artifacts)
    }

    pub fn load_dir(dir: &Path) -> Result<Self, ArtifactError> {
        Self::load(&ArtifactPaths::in_dir(dir))
    }

    /// Assemble from already-parsed parts, running the same validation as [`Artifacts::load`].
    pub fn from_parts(
        encoders: EncoderMap,
        pipeline: PreprocessingPipeline,
        classifier: StackingClassifier,
    ) -> Result<Self, ArtifactError> {
        encoders.validate().map_err(ArtifactError::Mismatch)?;
        pipeline.validate().map_err(ArtifactError::Mismatch)?;
        classifier.validate().map_err(ArtifactError::Mismatch)?;
        Self::check_compatible(encoders, pipeline, classifier)
    }

    fn check_compatible(
        encoders: EncoderMap,
        pipeline: PreprocessingPipeline,
        classifier: StackingClassifier,
    ) -> Result<Self, ArtifactError> {
        let schema: Vec<&str> = Field::ALL.iter().map(|field| field.name()).collect();
        if pipeline.feature_names_in() != schema.as_slice() {
            return Err(ArtifactError::Mismatch(format!(
                "pipeline columns {:?} differ from input schema {schema:?}",
                pipeline.feature_names_in()
            )));
        }
        if let Some(field) = Field::ALL.into_iter().find(|field| {
            field.kind() == FieldKind::Categorical && encoders.classes(field.name()).is_none()
        }) {
            return Err(ArtifactError::Mismatch(format!(
                "no encoder for categorical column \"{field}\""
            )));
        }
        if pipeline.output_width() != classifier.n_features {
            return Err(ArtifactError::Mismatch(format!(
                "pipeline produces {} features, classifier expects {}",
                pipeline.output_width(),
                classifier.n_features
            )));
        }
        Ok(Self {
            encoders,
            pipeline,
            classifier,
        })
    }

    pub fn encoders(&self) -> &EncoderMap {
        &self.encoders
    }

    pub fn pipeline(&self) -> &PreprocessingPipeline {
        &self.pipeline
    }

    pub fn classifier(&self) -> &StackingClassifier {
        &self.classifier
    }
}

fn read_json<T: DeserializeOwned>(path: &Path) -> Result<T, ArtifactError> {
    let bytes = std::fs::read(path).map_err(|source| ArtifactError::Read {
        path: path.to_path_buf(),
        source,
    })?;
    serde_json::from_slice(&bytes).map_err(|source| ArtifactError::Parse {
        path: path.to_path_buf(),
        source,
    })
}
