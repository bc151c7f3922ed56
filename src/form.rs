//! Input form for the front end: allowed choices, defaults and the
//! hand-off into a [`RawInputRecord`].
//!
//! These domain checks belong to the presentation side. The pipeline itself
//! only enforces what the fitted artifacts know about.

use std::ops::RangeInclusive;

use thiserror::Error;

use crate::encoding::EncoderMap;
use crate::record::{Field, RawInputRecord};

pub const GENDERS: [&str; 2] = ["Female", "Male"];
pub const NATIONALITIES: [&str; 2] = ["Saudi", "Non-Saudi"];
pub const CLASS_LEVELS: [i64; 3] = [1, 2, 3];
pub const AGE_RANGE: RangeInclusive<i64> = 15..=30;
pub const DEFAULT_AGE: i64 = 20;
pub const CANDIDACY_TYPES: [&str; 2] = ["Self-Candidacy", "Talented-Candidacy"];

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum FormError {
    #[error("{field} \"{value}\" is not allowed; choose one of: {}", .allowed.join(", "))]
    NotAllowed {
        field: Field,
        value: String,
        allowed: Vec<String>,
    },
    #[error("Age must be between 15 and 30, got {0}")]
    AgeOutOfRange(i64),
    #[error("No fitted classes available for {0}")]
    NoChoices(Field),
}

/// Values as picked by the user, before Gender is lower-cased.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StudentForm {
    pub gender: String,
    pub nationality: String,
    pub class_level: i64,
    pub age: i64,
    pub school_type: String,
    pub main_administration: String,
    pub candidacy_type: String,
}

impl StudentForm {
    /// First choice of every list and the default age.
    pub fn defaults(encoders: &EncoderMap) -> Result<Self, FormError> {
        Ok(Self {
            gender: GENDERS[0].to_string(),
            nationality: NATIONALITIES[0].to_string(),
            class_level: CLASS_LEVELS[0],
            age: DEFAULT_AGE,
            school_type: first_class(encoders, Field::SchoolType)?,
            main_administration: first_class(encoders, Field::MainAdministration)?,
            candidacy_type: CANDIDACY_TYPES[0].to_string(),
        })
    }

    pub fn validate(&self, encoders: &EncoderMap) -> Result<(), FormError> {
        one_of(Field::Gender, &self.gender, &GENDERS)?;
        one_of(Field::Nationality, &self.nationality, &NATIONALITIES)?;
        if !CLASS_LEVELS.contains(&self.class_level) {
            return Err(FormError::NotAllowed {
                field: Field::ClassLevel,
                value: self.class_level.to_string(),
                allowed: CLASS_LEVELS.iter().map(i64::to_string).collect(),
            });
        }
        if !AGE_RANGE.contains(&self.age) {
            return Err(FormError::AgeOutOfRange(self.age));
        }
        for (field, value) in [
            (Field::SchoolType, &self.school_type),
            (Field::MainAdministration, &self.main_administration),
        ] {
            let classes = encoders
                .classes(field.name())
                .ok_or(FormError::NoChoices(field))?;
            one_of(field, value, classes)?;
        }
        one_of(Field::CandidacyType, &self.candidacy_type, &CANDIDACY_TYPES)
    }

    /// Build the pipeline input. Gender is lower-cased to match its encoder.
    pub fn to_record(&self) -> RawInputRecord {
        RawInputRecord::new()
            .with(Field::Gender, self.gender.to_lowercase())
            .with(Field::Nationality, self.nationality.as_str())
            .with(Field::ClassLevel, self.class_level)
            .with(Field::Age, self.age)
            .with(Field::SchoolType, self.school_type.as_str())
            .with(Field::MainAdministration, self.main_administration.as_str())
            .with(Field::CandidacyType, self.candidacy_type.as_str())
    }
}

fn first_class(encoders: &EncoderMap, field: Field) -> Result<String, FormError> {
    encoders
        .classes(field.name())
        .and_then(|classes| classes.first())
        .cloned()
        .ok_or(FormError::NoChoices(field))
}

fn one_of<S: AsRef<str>>(field: Field, value: &str, allowed: &[S]) -> Result<(), FormError> {
    if allowed.iter().any(|choice| choice.as_ref() == value) {
        return Ok(());
    }
    Err(FormError::NotAllowed {
        field,
        value: value.to_string(),
        allowed: allowed.iter().map(|choice| choice.as_ref().to_string()).collect(),
    })
}
