use std::path::{Path, PathBuf};

use gradecast::artifacts::{
    BUNDLED_ARTIFACTS_DIR, CLASSIFIER_FILE_NAME, ENCODERS_FILE_NAME, PIPELINE_FILE_NAME,
};
use gradecast::{Field, RawInputRecord};
use serde_json::Value;
use tempfile::TempDir;

/// Directory of the demo artifacts shipped with the crate.
pub fn bundled_artifacts_dir() -> PathBuf {
    PathBuf::from(BUNDLED_ARTIFACTS_DIR)
}

/// Copy the bundled artifacts into a fresh temp dir so tests can corrupt them.
pub fn artifacts_copy() -> TempDir {
    let temp = tempfile::tempdir().expect("create tempdir");
    for name in [ENCODERS_FILE_NAME, PIPELINE_FILE_NAME, CLASSIFIER_FILE_NAME] {
        std::fs::copy(bundled_artifacts_dir().join(name), temp.path().join(name))
            .expect("copy artifact");
    }
    temp
}

/// Rewrite one JSON artifact in place.
pub fn edit_json(path: &Path, edit: impl FnOnce(&mut Value)) {
    let text = std::fs::read_to_string(path).expect("read artifact");
    let mut value: Value = serde_json::from_str(&text).expect("parse artifact");
    edit(&mut value);
    std::fs::write(path, serde_json::to_string_pretty(&value).expect("serialize"))
        .expect("write artifact");
}

/// The reference record: female, Saudi, class 2, age 18, public school in Riyadh.
pub fn example_record() -> RawInputRecord {
    RawInputRecord::new()
        .with(Field::Gender, "female")
        .with(Field::Nationality, "Saudi")
        .with(Field::ClassLevel, 2)
        .with(Field::Age, 18)
        .with(Field::SchoolType, "Public")
        .with(Field::MainAdministration, "Riyadh")
        .with(Field::CandidacyType, "Self-Candidacy")
}
