//! TOML settings stored in the app directory.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::app_dirs::{AppDirError, AppDirs};
use crate::artifacts::{
    ArtifactPaths, CLASSIFIER_FILE_NAME, ENCODERS_FILE_NAME, PIPELINE_FILE_NAME,
};

/// Default filename used to store the app configuration.
pub const CONFIG_FILE_NAME: &str = "gradecast.toml";

/// Errors that may occur while loading configuration.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// No usable config directory found.
    #[error("No suitable config directory found: {0}")]
    NoConfigDir(#[from] AppDirError),
    /// Failed to read a config file.
    #[error("Failed to read {path}: {source}")]
    Read {
        path: PathBuf,
        source: std::io::Error,
    },
    /// Failed to parse TOML config.
    #[error("Invalid config at {path}: {source}")]
    ParseToml {
        path: PathBuf,
        source: toml::de::Error,
    },
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct AppConfig {
    #[serde(default)]
    pub artifacts: ArtifactSettings,
}

/// Where the three fitted artifacts live.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ArtifactSettings {
    /// Directory holding the artifacts; defaults to `<app root>/artifacts`.
    #[serde(default)]
    pub dir: Option<PathBuf>,
    /// Label encoder file name inside `dir`.
    #[serde(default = "default_encoders")]
    pub encoders: String,
    /// Preprocessing pipeline file name inside `dir`.
    #[serde(default = "default_pipeline")]
    pub pipeline: String,
    /// Stacking classifier file name inside `dir`.
    #[serde(default = "default_classifier")]
    pub classifier: String,
}

impl Default for ArtifactSettings {
    fn default() -> Self {
        Self {
            dir: None,
            encoders: default_encoders(),
            pipeline: default_pipeline(),
            classifier: default_classifier(),
        }
    }
}

fn default_encoders() -> String {
    ENCODERS_FILE_NAME.to_string()
}

fn default_pipeline() -> String {
    PIPELINE_FILE_NAME.to_string()
}

fn default_classifier() -> String {
    CLASSIFIER_FILE_NAME.to_string()
}

impl ArtifactSettings {
    /// Resolve artifact file paths. `dir_override` wins over the configured dir.
    pub fn resolve(&self, dir_override: Option<&Path>) -> Result<ArtifactPaths, ConfigError> {
        let dir = match dir_override.or(self.dir.as_deref()) {
            Some(dir) => dir.to_path_buf(),
            None => AppDirs::locate()?.artifacts(),
        };
        Ok(self.paths_in(&dir))
    }

    /// Same as [`resolve`](Self::resolve), except that when no directory was
    /// chosen and the default one has no encoders yet, `bundled` is used.
    pub fn resolve_or_bundled(
        &self,
        dir_override: Option<&Path>,
        bundled: &Path,
    ) -> Result<ArtifactPaths, ConfigError> {
        let paths = self.resolve(dir_override)?;
        let chosen = dir_override.is_some() || self.dir.is_some();
        if chosen || paths.encoders.exists() || !bundled.is_dir() {
            return Ok(paths);
        }
        tracing::info!(
            "No artifacts at {}; using bundled demo artifacts from {}",
            paths.encoders.display(),
            bundled.display()
        );
        Ok(self.paths_in(bundled))
    }

    fn paths_in(&self, dir: &Path) -> ArtifactPaths {
        ArtifactPaths {
            encoders: dir.join(&self.encoders),
            pipeline: dir.join(&self.pipeline),
            classifier: dir.join(&self.classifier),
        }
    }
}

/// Resolve the configuration file path inside the app root.
pub fn config_path() -> Result<PathBuf, ConfigError> {
    Ok(AppDirs::locate()?.root().join(CONFIG_FILE_NAME))
}

/// Load configuration from the app root, returning defaults if missing.
pub fn load_or_default() -> Result<AppConfig, ConfigError> {
    load_from(&config_path()?)
}

/// Load configuration from `path`, returning defaults if the file is missing.
pub fn load_from(path: &Path) -> Result<AppConfig, ConfigError> {
    if !path.exists() {
        tracing::debug!("No config at {}; using defaults", path.display());
        return Ok(AppConfig::default());
    }
    let text = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
        path: path.to_path_buf(),
        source,
    })?;
    toml::from_str(&text).map_err(|source| ConfigError::ParseToml {
        path: path.to_path_buf(),
        source,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn missing_file_yields_defaults() {
        let dir = tempdir().unwrap();
        let config = load_from(&dir.path().join(CONFIG_FILE_NAME)).unwrap();
        assert_eq!(config, AppConfig::default());
        assert_eq!(config.artifacts.encoders, "label_encoders.json");
    }

    #[test]
    fn partial_artifacts_table_keeps_other_defaults() {
        let dir = tempdir().unwrap();
        let path = dir.path().join(CONFIG_FILE_NAME);
        std::fs::write(
            &path,
            "[artifacts]\ndir = \"/srv/models\"\nclassifier = \"stacking_v2.json\"\n",
        )
        .unwrap();

        let config = load_from(&path).unwrap();
        let paths = config.artifacts.resolve(None).unwrap();
        assert_eq!(paths.classifier, Path::new("/srv/models/stacking_v2.json"));
        assert_eq!(paths.pipeline, Path::new("/srv/models/preprocessing_pipeline.json"));

        let overridden = config.artifacts.resolve(Some(Path::new("/tmp/other"))).unwrap();
        assert_eq!(overridden.encoders, Path::new("/tmp/other/label_encoders.json"));
    }

    #[test]
    fn configured_dir_is_never_swapped_for_bundled() {
        let bundled = tempdir().unwrap();
        let settings = ArtifactSettings {
            dir: Some(PathBuf::from("/srv/missing")),
            ..ArtifactSettings::default()
        };
        let paths = settings.resolve_or_bundled(None, bundled.path()).unwrap();
        assert_eq!(paths.encoders, Path::new("/srv/missing/label_encoders.json"));

        let overridden = ArtifactSettings::default()
            .resolve_or_bundled(Some(Path::new("/tmp/other")), bundled.path())
            .unwrap();
        assert_eq!(overridden.classifier, Path::new("/tmp/other/stacking_clf.json"));
    }

    #[test]
    fn invalid_toml_reports_path() {
        let dir = tempdir().unwrap();
        let path = dir.path().join(CONFIG_FILE_NAME);
        std::fs::write(&path, "[artifacts\n").unwrap();
        let err = load_from(&path).unwrap_err();
        assert!(matches!(err, ConfigError::ParseToml { .. }));
        assert!(err.to_string().contains(CONFIG_FILE_NAME));
    }
}
