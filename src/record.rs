//! Raw request records and the fixed training-time column schema.
//!
//! A [`RawInputRecord`] is whatever the caller collected, keyed by field name.
//! [`normalize`] turns it into an [`InputRow`] whose cells follow [`Field::ALL`].

use std::collections::BTreeMap;
use std::fmt;

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Whether a column holds category labels or plain integers.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FieldKind {
    Categorical,
    Numeric,
}

/// The seven attributes the classifier was trained on.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Field {
    Gender,
    Nationality,
    ClassLevel,
    Age,
    SchoolType,
    MainAdministration,
    CandidacyType,
}

impl Field {
    /// Training-time column order.
    pub const ALL: [Field; 7] = [
        Field::Gender,
        Field::Nationality,
        Field::ClassLevel,
        Field::Age,
        Field::SchoolType,
        Field::MainAdministration,
        Field::CandidacyType,
    ];

    /// Column name exactly as it appeared in the training frame.
    pub fn name(self) -> &'static str {
        match self {
            Field::Gender => "Gender",
            Field::Nationality => "Nationality",
            Field::ClassLevel => "Class Level",
            Field::Age => "Age",
            Field::SchoolType => "School Type",
            Field::MainAdministration => "Main Administration",
            Field::CandidacyType => "Candidacy type",
        }
    }

    pub fn kind(self) -> FieldKind {
        match self {
            Field::ClassLevel | Field::Age => FieldKind::Numeric,
            _ => FieldKind::Categorical,
        }
    }

    pub fn from_name(name: &str) -> Option<Field> {
        Field::ALL.into_iter().find(|field| field.name() == name)
    }
}

impl fmt::Display for Field {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// A single raw cell value.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum FieldValue {
    Integer(i64),
    Text(String),
}

impl FieldValue {
    pub fn as_text(&self) -> Option<&str> {
        match self {
            FieldValue::Text(text) => Some(text),
            FieldValue::Integer(_) => None,
        }
    }

    pub fn as_integer(&self) -> Option<i64> {
        match self {
            FieldValue::Integer(value) => Some(*value),
            FieldValue::Text(_) => None,
        }
    }

    fn type_name(&self) -> &'static str {
        match self {
            FieldValue::Integer(_) => "integer",
            FieldValue::Text(_) => "string",
        }
    }
}

impl fmt::Display for FieldValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FieldValue::Integer(value) => write!(f, "{value}"),
            FieldValue::Text(text) => f.write_str(text),
        }
    }
}

impl From<&str> for FieldValue {
    fn from(value: &str) -> Self {
        FieldValue::Text(value.to_string())
    }
}

impl From<String> for FieldValue {
    fn from(value: String) -> Self {
        FieldValue::Text(value)
    }
}

impl From<i64> for FieldValue {
    fn from(value: i64) -> Self {
        FieldValue::Integer(value)
    }
}

/// Field-name to value mapping as collected from the caller.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RawInputRecord {
    values: BTreeMap<String, FieldValue>,
}

impl RawInputRecord {
    pub fn new() -> Self {
        Self::default()
    }

    /// Builder-style insert keyed by a known field.
    pub fn with(mut self, field: Field, value: impl Into<FieldValue>) -> Self {
        self.insert(field.name(), value);
        self
    }

    pub fn insert(&mut self, name: impl Into<String>, value: impl Into<FieldValue>) {
        self.values.insert(name.into(), value.into());
    }

    pub fn remove(&mut self, name: &str) -> Option<FieldValue> {
        self.values.remove(name)
    }

    pub fn get(&self, name: &str) -> Option<&FieldValue> {
        self.values.get(name)
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }
}

/// Missing or malformed fields in a [`RawInputRecord`].
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SchemaError {
    #[error("Missing required field \"{0}\"")]
    MissingField(Field),
    #[error("Field \"{field}\" must be {expected}, got {found}")]
    WrongType {
        field: Field,
        expected: &'static str,
        found: &'static str,
    },
    #[error("Unexpected field \"{0}\"")]
    UnexpectedField(String),
}

/// One cell of a normalized row.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Cell {
    pub field: Field,
    pub value: FieldValue,
}

/// Single-row table in [`Field::ALL`] order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InputRow {
    cells: Vec<Cell>,
}

impl InputRow {
    pub fn cells(&self) -> &[Cell] {
        &self.cells
    }

    pub fn get(&self, field: Field) -> Option<&FieldValue> {
        self.cells
            .iter()
            .find(|cell| cell.field == field)
            .map(|cell| &cell.value)
    }
}

/// Reorder a raw record into the training-time schema.
pub fn normalize(record: &RawInputRecord) -> Result<InputRow, SchemaError> {
    if let Some(unknown) = record
        .values
        .keys()
        .find(|name| Field::from_name(name).is_none())
    {
        return Err(SchemaError::UnexpectedField(unknown.clone()));
    }

    let mut cells = Vec::with_capacity(Field::ALL.len());
    for field in Field::ALL {
        let value = record
            .get(field.name())
            .ok_or(SchemaError::MissingField(field))?;
        let expected = match field.kind() {
            FieldKind::Numeric => "integer",
            FieldKind::Categorical => "string",
        };
        if value.type_name() != expected {
            return Err(SchemaError::WrongType {
                field,
                expected,
                found: value.type_name(),
            });
        }
        cells.push(Cell {
            field,
            value: value.clone(),
        });
    }
    Ok(InputRow { cells })
}
