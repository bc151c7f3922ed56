//! The request pipeline: normalize → encode → transform → classify → label.

use std::fmt;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::artifacts::Artifacts;
use crate::encoding::{CategoryEncoder, EncodeError, UnknownCategoryError, encode_row};
use crate::ml::{BinaryClassifier, PredictionError};
use crate::record::{RawInputRecord, SchemaError, normalize};
use crate::transform::{FeatureTransform, TransformError};

/// Message shown to end users for any pipeline failure.
pub const GENERIC_FAILURE_MESSAGE: &str =
    "Unable to make a prediction for these inputs. Please check them and try again.";

/// Outcome label for one student.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Prediction {
    Pass,
    Fail,
}

impl Prediction {
    /// Class `1` is a pass; every other value is treated as a fail.
    pub fn from_class(class: i64) -> Self {
        if class == 1 {
            Prediction::Pass
        } else {
            Prediction::Fail
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            Prediction::Pass => "Pass",
            Prediction::Fail => "Fail",
        }
    }
}

impl fmt::Display for Prediction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// Any failure along the request pipeline.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum PredictError {
    #[error(transparent)]
    Schema(#[from] SchemaError),
    #[error(transparent)]
    UnknownCategory(#[from] UnknownCategoryError),
    #[error(transparent)]
    Transform(#[from] TransformError),
    #[error(transparent)]
    Prediction(#[from] PredictionError),
}

impl From<EncodeError> for PredictError {
    fn from(error: EncodeError) -> Self {
        match error {
            EncodeError::Schema(err) => PredictError::Schema(err),
            EncodeError::UnknownCategory(err) => PredictError::UnknownCategory(err),
        }
    }
}

impl PredictError {
    /// What end users see; the detailed error goes to the log.
    pub fn user_message(&self) -> &'static str {
        GENERIC_FAILURE_MESSAGE
    }

    /// Short stage tag for logs.
    pub fn stage(&self) -> &'static str {
        match self {
            PredictError::Schema(_) => "normalize",
            PredictError::UnknownCategory(_) => "encode",
            PredictError::Transform(_) => "transform",
            PredictError::Prediction(_) => "classify",
        }
    }
}

/// Run the pipeline against arbitrary encoder, transform and classifier capabilities.
pub fn predict_with<E, T, C>(
    encoder: &E,
    transform: &T,
    classifier: &C,
    record: &RawInputRecord,
) -> Result<Prediction, PredictError>
where
    E: CategoryEncoder + ?Sized,
    T: FeatureTransform + ?Sized,
    C: BinaryClassifier + ?Sized,
{
    let row = normalize(record)?;
    let encoded = encode_row(encoder, &row)?;
    let features = transform.transform(&encoded)?;
    let class = classifier.classify(&features)?;
    Ok(Prediction::from_class(class))
}

/// Predict a label for `record` with the loaded artifacts.
pub fn predict(artifacts: &Artifacts, record: &RawInputRecord) -> Result<Prediction, PredictError> {
    let result = predict_with(
        artifacts.encoders(),
        artifacts.pipeline(),
        artifacts.classifier(),
        record,
    );
    match &result {
        Ok(prediction) => tracing::debug!(%prediction, "prediction complete"),
        Err(err) => tracing::warn!(stage = err.stage(), "prediction failed: {err}"),
    }
    result
}

impl Artifacts {
    pub fn predict(&self, record: &RawInputRecord) -> Result<Prediction, PredictError> {
        predict(self, record)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::encoding::EncodedRow;
    use crate::record::Field;
    use crate::transform::FeatureVector;
    use ndarray::Array1;
    use std::cell::Cell;

    /// Encodes every category as its byte length.
    struct LengthEncoder;

    impl CategoryEncoder for LengthEncoder {
        fn encodes(&self, column: &str) -> bool {
            Field::from_name(column)
                .is_some_and(|field| field.kind() == crate::record::FieldKind::Categorical)
        }

        fn encode(&self, column: &str, value: &str) -> Result<i64, UnknownCategoryError> {
            if value == "Unknown" {
                return Err(UnknownCategoryError {
                    column: column.to_string(),
                    value: value.to_string(),
                });
            }
            Ok(value.len() as i64)
        }
    }

    struct Identity {
        columns: Vec<String>,
    }

    impl FeatureTransform for Identity {
        fn feature_names_in(&self) -> &[String] {
            &self.columns
        }

        fn transform(&self, row: &EncodedRow) -> Result<FeatureVector, TransformError> {
            if row.columns().iter().zip(&self.columns).any(|(a, b)| a != b) {
                return Err(TransformError::ColumnMismatch {
                    expected: self.columns.clone(),
                    found: row.columns().iter().map(|c| c.to_string()).collect(),
                });
            }
            Ok(Array1::from(row.values().to_vec()))
        }
    }

    /// Returns a fixed class and counts invocations.
    struct Fixed {
        class: i64,
        calls: Cell<usize>,
    }

    impl BinaryClassifier for Fixed {
        fn classify(&self, features: &FeatureVector) -> Result<i64, PredictionError> {
            self.calls.set(self.calls.get() + 1);
            if features.len() != 7 {
                return Err(PredictionError::FeatureWidth {
                    expected: 7,
                    found: features.len(),
                });
            }
            Ok(self.class)
        }
    }

    fn identity() -> Identity {
        Identity {
            columns: Field::ALL.iter().map(|f| f.name().to_string()).collect(),
        }
    }

    fn fixed(class: i64) -> Fixed {
        Fixed {
            class,
            calls: Cell::new(0),
        }
    }

    fn record() -> RawInputRecord {
        RawInputRecord::new()
            .with(Field::Gender, "female")
            .with(Field::Nationality, "Saudi")
            .with(Field::ClassLevel, 2)
            .with(Field::Age, 18)
            .with(Field::SchoolType, "Public")
            .with(Field::MainAdministration, "Riyadh")
            .with(Field::CandidacyType, "Self-Candidacy")
    }

    #[test]
    fn class_one_is_pass_everything_else_fails() {
        assert_eq!(Prediction::from_class(1), Prediction::Pass);
        assert_eq!(Prediction::from_class(0), Prediction::Fail);
        assert_eq!(Prediction::from_class(2), Prediction::Fail);
        assert_eq!(Prediction::from_class(-1), Prediction::Fail);
        assert_eq!(Prediction::Pass.to_string(), "Pass");
    }

    #[test]
    fn pipeline_maps_classifier_output_to_label() {
        let pass = predict_with(&LengthEncoder, &identity(), &fixed(1), &record());
        assert_eq!(pass, Ok(Prediction::Pass));
        let fail = predict_with(&LengthEncoder, &identity(), &fixed(0), &record());
        assert_eq!(fail, Ok(Prediction::Fail));
    }

    #[test]
    fn schema_error_short_circuits_before_classifier() {
        let classifier = fixed(1);
        let mut missing_age = record();
        missing_age.remove("Age");
        let err = predict_with(&LengthEncoder, &identity(), &classifier, &missing_age).unwrap_err();
        assert_eq!(err, PredictError::Schema(SchemaError::MissingField(Field::Age)));
        assert_eq!(err.stage(), "normalize");
        assert_eq!(classifier.calls.get(), 0);
    }

    #[test]
    fn unknown_category_is_reported_not_defaulted() {
        let classifier = fixed(1);
        let record = record().with(Field::SchoolType, "Unknown");
        let err = predict_with(&LengthEncoder, &identity(), &classifier, &record).unwrap_err();
        assert!(matches!(err, PredictError::UnknownCategory(_)));
        assert_eq!(classifier.calls.get(), 0);
    }

    #[test]
    fn transform_mismatch_surfaces_as_transform_error() {
        let mut reversed = identity();
        reversed.columns.reverse();
        let err = predict_with(&LengthEncoder, &reversed, &fixed(1), &record()).unwrap_err();
        assert!(matches!(err, PredictError::Transform(TransformError::ColumnMismatch { .. })));
        assert_eq!(err.user_message(), GENERIC_FAILURE_MESSAGE);
    }

    #[test]
    fn classifier_failure_is_wrapped() {
        struct Shrink;
        impl FeatureTransform for Shrink {
            fn feature_names_in(&self) -> &[String] {
                &[]
            }
            fn transform(&self, _row: &EncodedRow) -> Result<FeatureVector, TransformError> {
                Ok(Array1::zeros(3))
            }
        }
        let err = predict_with(&LengthEncoder, &Shrink, &fixed(1), &record()).unwrap_err();
        assert_eq!(
            err,
            PredictError::Prediction(PredictionError::FeatureWidth {
                expected: 7,
                found: 3
            })
        );
        assert_eq!(err.stage(), "classify");
    }

    #[test]
    fn prediction_serializes_as_bare_label() {
        assert_eq!(serde_json::to_string(&Prediction::Fail).unwrap(), "\"Fail\"");
    }
}
