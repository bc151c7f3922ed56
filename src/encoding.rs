//! Fitted label encoders for the categorical columns.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::record::{Field, FieldKind, InputRow, SchemaError};

/// Value outside the classes an encoder was fitted on.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("Unknown category \"{value}\" for column \"{column}\"")]
pub struct UnknownCategoryError {
    pub column: String,
    pub value: String,
}

/// Failure while encoding a normalized row.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum EncodeError {
    #[error(transparent)]
    Schema(#[from] SchemaError),
    #[error(transparent)]
    UnknownCategory(#[from] UnknownCategoryError),
}

/// Capability to map a categorical value to its integer code.
pub trait CategoryEncoder {
    /// Whether `column` has a fitted encoder.
    fn encodes(&self, column: &str) -> bool;

    fn encode(&self, column: &str, value: &str) -> Result<i64, UnknownCategoryError>;
}

/// Fitted classes for one column. The code of a class is its position.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LabelEncoder {
    /// Fitted classes in ascending order.
    pub classes: Vec<String>,
}

impl LabelEncoder {
    pub fn new(classes: Vec<String>) -> Self {
        Self { classes }
    }

    /// Classes must be non-empty, strictly ascending and therefore unique.
    pub fn validate(&self) -> Result<(), String> {
        if self.classes.is_empty() {
            return Err("encoder has no classes".to_string());
        }
        if let Some(pair) = self.classes.windows(2).find(|pair| pair[0] >= pair[1]) {
            return Err(format!(
                "classes must be sorted and unique (\"{}\" precedes \"{}\")",
                pair[0], pair[1]
            ));
        }
        Ok(())
    }

    pub fn code_of(&self, value: &str) -> Option<i64> {
        self.classes
            .binary_search_by(|class| class.as_str().cmp(value))
            .ok()
            .map(|idx| idx as i64)
    }
}

/// Column name to fitted encoder, as shipped in `label_encoders.json`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct EncoderMap {
    encoders: BTreeMap<String, LabelEncoder>,
}

impl EncoderMap {
    pub fn new(encoders: BTreeMap<String, LabelEncoder>) -> Self {
        Self { encoders }
    }

    /// Every encoder must be well-formed and target a categorical field.
    pub fn validate(&self) -> Result<(), String> {
        for (column, encoder) in &self.encoders {
            match Field::from_name(column) {
                Some(field) if field.kind() == FieldKind::Categorical => {}
                Some(_) => return Err(format!("column \"{column}\" is numeric")),
                None => return Err(format!("column \"{column}\" is not a known field")),
            }
            encoder
                .validate()
                .map_err(|err| format!("column \"{column}\": {err}"))?;
        }
        Ok(())
    }

    /// Fitted classes for a column, in code order.
    pub fn classes(&self, column: &str) -> Option<&[String]> {
        self.encoders
            .get(column)
            .map(|encoder| encoder.classes.as_slice())
    }

    pub fn columns(&self) -> impl Iterator<Item = &str> {
        self.encoders.keys().map(String::as_str)
    }
}

impl CategoryEncoder for EncoderMap {
    fn encodes(&self, column: &str) -> bool {
        self.encoders.contains_key(column)
    }

    fn encode(&self, column: &str, value: &str) -> Result<i64, UnknownCategoryError> {
        self.encoders
            .get(column)
            .and_then(|encoder| encoder.code_of(value))
            .ok_or_else(|| UnknownCategoryError {
                column: column.to_string(),
                value: value.to_string(),
            })
    }
}

/// Row after categorical encoding: column names and numeric values in order.
#[derive(Debug, Clone, PartialEq)]
pub struct EncodedRow {
    columns: Vec<&'static str>,
    values: Vec<f64>,
}

impl EncodedRow {
    pub fn new(columns: Vec<&'static str>, values: Vec<f64>) -> Self {
        Self { columns, values }
    }

    pub fn columns(&self) -> &[&'static str] {
        &self.columns
    }

    pub fn values(&self) -> &[f64] {
        &self.values
    }
}

/// Replace each encoded column's label with its code; other columns pass through.
pub fn encode_row<E: CategoryEncoder + ?Sized>(
    encoder: &E,
    row: &InputRow,
) -> Result<EncodedRow, EncodeError> {
    let mut columns = Vec::with_capacity(row.cells().len());
    let mut values = Vec::with_capacity(row.cells().len());
    for cell in row.cells() {
        let column = cell.field.name();
        let value = if encoder.encodes(column) {
            let label = cell.value.as_text().ok_or(SchemaError::WrongType {
                field: cell.field,
                expected: "string",
                found: "integer",
            })?;
            encoder.encode(column, label)? as f64
        } else {
            match cell.value.as_integer() {
                Some(number) => number as f64,
                None => {
                    // Categorical field without a fitted encoder.
                    return Err(UnknownCategoryError {
                        column: column.to_string(),
                        value: cell.value.to_string(),
                    }
                    .into());
                }
            }
        };
        columns.push(column);
        values.push(value);
    }
    tracing::debug!(columns = columns.len(), "encoded categorical columns");
    Ok(EncodedRow { columns, values })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::record::{RawInputRecord, normalize};

    fn encoder(classes: &[&str]) -> LabelEncoder {
        LabelEncoder::new(classes.iter().map(|class| class.to_string()).collect())
    }

    fn encoders() -> EncoderMap {
        let mut map = BTreeMap::new();
        map.insert("Gender".to_string(), encoder(&["female", "male"]));
        map.insert("Nationality".to_string(), encoder(&["Non-Saudi", "Saudi"]));
        map.insert("School Type".to_string(), encoder(&["Private", "Public"]));
        map.insert(
            "Main Administration".to_string(),
            encoder(&["Jeddah", "Makkah", "Riyadh"]),
        );
        map.insert(
            "Candidacy type".to_string(),
            encoder(&["Self-Candidacy", "Talented-Candidacy"]),
        );
        EncoderMap::new(map)
    }

    fn row(school_type: &str) -> InputRow {
        let record = RawInputRecord::new()
            .with(Field::Gender, "female")
            .with(Field::Nationality, "Saudi")
            .with(Field::ClassLevel, 2)
            .with(Field::Age, 18)
            .with(Field::SchoolType, school_type)
            .with(Field::MainAdministration, "Riyadh")
            .with(Field::CandidacyType, "Self-Candidacy");
        normalize(&record).unwrap()
    }

    #[test]
    fn codes_follow_sorted_class_positions() {
        let encoded = encode_row(&encoders(), &row("Public")).unwrap();
        assert_eq!(
            encoded.columns(),
            Field::ALL.map(Field::name).as_slice()
        );
        assert_eq!(encoded.values(), &[0.0, 1.0, 2.0, 18.0, 1.0, 2.0, 0.0]);
    }

    #[test]
    fn unknown_school_type_is_surfaced() {
        let err = encode_row(&encoders(), &row("Unknown")).unwrap_err();
        assert_eq!(
            err,
            EncodeError::UnknownCategory(UnknownCategoryError {
                column: "School Type".into(),
                value: "Unknown".into(),
            })
        );
    }

    #[test]
    fn category_matching_is_case_sensitive() {
        assert!(encoders().encode("Gender", "Female").is_err());
        assert_eq!(encoders().encode("Gender", "male"), Ok(1));
    }

    #[test]
    fn categorical_column_without_encoder_is_not_silently_coded() {
        let mut map = encoders();
        map.encoders.remove("Gender");
        assert!(matches!(
            encode_row(&map, &row("Public")),
            Err(EncodeError::UnknownCategory(_))
        ));
    }

    #[test]
    fn validate_rejects_unsorted_and_numeric_columns() {
        assert!(encoder(&["b", "a"]).validate().is_err());
        assert!(encoder(&["a", "a"]).validate().is_err());
        assert!(encoder(&[]).validate().is_err());

        let mut map = BTreeMap::new();
        map.insert("Age".to_string(), encoder(&["15", "16"]));
        assert!(EncoderMap::new(map).validate().is_err());

        assert!(encoders().validate().is_ok());
    }

    #[test]
    fn classes_are_exposed_for_choice_lists() {
        assert_eq!(
            encoders().classes("School Type"),
            Some(&["Private".to_string(), "Public".to_string()][..])
        );
        assert_eq!(encoders().classes("Age"), None);
    }
}
