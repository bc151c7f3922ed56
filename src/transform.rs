//! Fitted preprocessing pipeline, evaluated as a column transformer.
//!
//! The pipeline is exported by the training side as JSON: named groups of
//! input columns, each with an ordered chain of fitted steps. Group outputs are
//! concatenated in declaration order, then the remainder columns (if kept).

use ndarray::Array1;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::encoding::EncodedRow;

/// Current pipeline exchange format version.
pub const PIPELINE_FORMAT_VERSION: i64 = 1;

/// Numeric features handed to the classifier.
pub type FeatureVector = Array1<f64>;

#[derive(Debug, Clone, PartialEq, Error)]
pub enum TransformError {
    #[error("Row columns {found:?} do not match pipeline columns {expected:?}")]
    ColumnMismatch {
        expected: Vec<String>,
        found: Vec<String>,
    },
    #[error("Step {step} of group \"{group}\" expects {expected} inputs, got {found}")]
    WidthMismatch {
        group: String,
        step: usize,
        expected: usize,
        found: usize,
    },
    #[error("Unknown category {value} in input {input} of group \"{group}\"")]
    UnknownCategory {
        group: String,
        input: usize,
        value: f64,
    },
}

/// Capability to turn an encoded row into a feature vector.
pub trait FeatureTransform {
    /// Columns, in order, the transform was fitted on.
    fn feature_names_in(&self) -> &[String];

    fn transform(&self, row: &EncodedRow) -> Result<FeatureVector, TransformError>;
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum HandleUnknown {
    #[default]
    Error,
    Ignore,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Remainder {
    #[default]
    Drop,
    Passthrough,
}

/// One fitted preprocessing step.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Step {
    /// `(x - mean) / scale` per input.
    StandardScaler {
        mean: Vec<f64>,
        scale: Vec<f64>,
    },
    /// `x * scale + min` per input.
    MinMaxScaler {
        min: Vec<f64>,
        scale: Vec<f64>,
    },
    /// One indicator column per fitted category of each input.
    OneHot {
        /// Known codes per input, in output order.
        categories: Vec<Vec<f64>>,
        #[serde(default)]
        handle_unknown: HandleUnknown,
    },
}

impl Step {
    fn input_width(&self) -> usize {
        match self {
            Step::StandardScaler { mean, .. } => mean.len(),
            Step::MinMaxScaler { min, .. } => min.len(),
            Step::OneHot { categories, .. } => categories.len(),
        }
    }

    fn output_width(&self) -> usize {
        match self {
            Step::OneHot { categories, .. } => categories.iter().map(Vec::len).sum(),
            other => other.input_width(),
        }
    }

    fn validate(&self) -> Result<(), String> {
        match self {
            Step::StandardScaler { mean, scale } => {
                if mean.len() != scale.len() {
                    return Err("standard_scaler mean/scale length mismatch".to_string());
                }
                if scale.iter().any(|s| !s.is_finite() || *s == 0.0) {
                    return Err("standard_scaler scale must be finite and non-zero".to_string());
                }
            }
            Step::MinMaxScaler { min, scale } => {
                if min.len() != scale.len() {
                    return Err("min_max_scaler min/scale length mismatch".to_string());
                }
            }
            Step::OneHot { categories, .. } => {
                if categories.iter().any(Vec::is_empty) {
                    return Err("one_hot input without categories".to_string());
                }
            }
        }
        Ok(())
    }

    fn apply(&self, group: &str, step: usize, input: &[f64]) -> Result<Vec<f64>, TransformError> {
        if input.len() != self.input_width() {
            return Err(TransformError::WidthMismatch {
                group: group.to_string(),
                step,
                expected: self.input_width(),
                found: input.len(),
            });
        }
        let output = match self {
            Step::StandardScaler { mean, scale } => input
                .iter()
                .zip(mean.iter().zip(scale))
                .map(|(x, (m, s))| (x - m) / s)
                .collect(),
            Step::MinMaxScaler { min, scale } => input
                .iter()
                .zip(min.iter().zip(scale))
                .map(|(x, (m, s))| x * s + m)
                .collect(),
            Step::OneHot {
                categories,
                handle_unknown,
            } => {
                let mut out = Vec::with_capacity(self.output_width());
                for (idx, (value, known)) in input.iter().zip(categories).enumerate() {
                    let hit = known.iter().position(|category| category == value);
                    if hit.is_none() && *handle_unknown == HandleUnknown::Error {
                        return Err(TransformError::UnknownCategory {
                            group: group.to_string(),
                            input: idx,
                            value: *value,
                        });
                    }
                    out.extend((0..known.len()).map(|pos| if Some(pos) == hit { 1.0 } else { 0.0 }));
                }
                out
            }
        };
        Ok(output)
    }
}

/// Named set of input columns and the steps applied to them.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ColumnGroup {
    /// Used in error messages.
    pub name: String,
    /// Input columns fed to the first step, in this order.
    pub columns: Vec<String>,
    /// Applied in sequence. No steps passes the columns through.
    #[serde(default)]
    pub steps: Vec<Step>,
}

impl ColumnGroup {
    fn output_width(&self) -> usize {
        self.steps
            .last()
            .map(Step::output_width)
            .unwrap_or(self.columns.len())
    }
}

/// Fitted preprocessing pipeline as shipped in `preprocessing_pipeline.json`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PreprocessingPipeline {
    /// Must equal [`PIPELINE_FORMAT_VERSION`].
    pub format_version: i64,
    /// Columns, in order, the pipeline was fitted on.
    pub feature_names_in: Vec<String>,
    /// Output blocks, concatenated in declaration order.
    pub groups: Vec<ColumnGroup>,
    /// What happens to columns no group selects.
    #[serde(default)]
    pub remainder: Remainder,
}

impl PreprocessingPipeline {
    /// Check column references and that each step's width matches its input.
    pub fn validate(&self) -> Result<(), String> {
        if self.format_version != PIPELINE_FORMAT_VERSION {
            return Err(format!(
                "Unsupported format_version {} (expected {})",
                self.format_version, PIPELINE_FORMAT_VERSION
            ));
        }
        let mut claimed = vec![false; self.feature_names_in.len()];
        for group in &self.groups {
            if group.columns.is_empty() {
                return Err(format!("group \"{}\" selects no columns", group.name));
            }
            for column in &group.columns {
                let idx = self.column_index(column).ok_or_else(|| {
                    format!("group \"{}\" selects unknown column \"{column}\"", group.name)
                })?;
                claimed[idx] = true;
            }
            let mut width = group.columns.len();
            for (step_idx, step) in group.steps.iter().enumerate() {
                step.validate()
                    .map_err(|err| format!("group \"{}\" step {step_idx}: {err}", group.name))?;
                if step.input_width() != width {
                    return Err(format!(
                        "group \"{}\" step {step_idx} expects {} inputs, got {width}",
                        group.name,
                        step.input_width()
                    ));
                }
                width = step.output_width();
            }
        }
        if self.remainder == Remainder::Drop && claimed.iter().all(|used| !used) {
            return Err("pipeline produces no features".to_string());
        }
        Ok(())
    }

    /// Width of the produced feature vector.
    pub fn output_width(&self) -> usize {
        let grouped: usize = self.groups.iter().map(ColumnGroup::output_width).sum();
        grouped + self.remainder_indices().len()
    }

    fn column_index(&self, column: &str) -> Option<usize> {
        self.feature_names_in.iter().position(|name| name == column)
    }

    fn remainder_indices(&self) -> Vec<usize> {
        if self.remainder == Remainder::Drop {
            return Vec::new();
        }
        (0..self.feature_names_in.len())
            .filter(|idx| {
                let name = &self.feature_names_in[*idx];
                !self.groups.iter().any(|group| group.columns.contains(name))
            })
            .collect()
    }
}

impl FeatureTransform for PreprocessingPipeline {
    fn feature_names_in(&self) -> &[String] {
        &self.feature_names_in
    }

    fn transform(&self, row: &EncodedRow) -> Result<FeatureVector, TransformError> {
        if row.columns().len() != self.feature_names_in.len()
            || row
                .columns()
                .iter()
                .zip(&self.feature_names_in)
                .any(|(found, expected)| found != expected)
        {
            return Err(TransformError::ColumnMismatch {
                expected: self.feature_names_in.clone(),
                found: row.columns().iter().map(|c| c.to_string()).collect(),
            });
        }

        let values = row.values();
        let mut features = Vec::with_capacity(self.output_width());
        for group in &self.groups {
            let mut current: Vec<f64> = group
                .columns
                .iter()
                .filter_map(|column| self.column_index(column))
                .map(|idx| values[idx])
                .collect();
            for (step_idx, step) in group.steps.iter().enumerate() {
                current = step.apply(&group.name, step_idx, &current)?;
            }
            features.extend(current);
        }
        features.extend(self.remainder_indices().into_iter().map(|idx| values[idx]));
        tracing::debug!(width = features.len(), "transformed encoded row");
        Ok(Array1::from(features))
    }
}
