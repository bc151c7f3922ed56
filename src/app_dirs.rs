//! Where gradecast keeps its files.
//!
//! Everything lives below one `.gradecast` root: `gradecast.toml`, `logs/` and
//! the default `artifacts/` directory. The root sits in the OS config directory
//! unless `GRADECAST_CONFIG_HOME` names another base.

use std::path::{Path, PathBuf};

use directories::BaseDirs;
use thiserror::Error;

/// Name of the application directory that lives under the config base.
pub const APP_DIR_NAME: &str = ".gradecast";
/// Environment variable that replaces the OS config base.
pub const CONFIG_HOME_ENV: &str = "GRADECAST_CONFIG_HOME";

const LOGS_DIR_NAME: &str = "logs";
const ARTIFACTS_DIR_NAME: &str = "artifacts";

#[derive(Debug, Error)]
pub enum AppDirError {
    #[error("No config directory found; set GRADECAST_CONFIG_HOME to choose one")]
    NoBaseDir,
    #[error("Failed to create directory {path}: {source}")]
    CreateDir {
        path: PathBuf,
        source: std::io::Error,
    },
}

/// Resolved `.gradecast` root.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AppDirs {
    root: PathBuf,
}

impl AppDirs {
    /// Locate the root from `GRADECAST_CONFIG_HOME` or the OS config dir, creating it.
    pub fn locate() -> Result<Self, AppDirError> {
        let base = std::env::var_os(CONFIG_HOME_ENV)
            .filter(|value| !value.is_empty())
            .map(PathBuf::from)
            .or_else(|| BaseDirs::new().map(|dirs| dirs.config_dir().to_path_buf()))
            .ok_or(AppDirError::NoBaseDir)?;
        Self::under(&base)
    }

    /// Use `<base>/.gradecast` as the root, creating it.
    pub fn under(base: &Path) -> Result<Self, AppDirError> {
        let root = base.join(APP_DIR_NAME);
        create(&root)?;
        Ok(Self { root })
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Log directory, created on demand.
    pub fn logs(&self) -> Result<PathBuf, AppDirError> {
        let dir = self.root.join(LOGS_DIR_NAME);
        create(&dir)?;
        Ok(dir)
    }

    /// Default artifact directory. Left for the user to populate.
    pub fn artifacts(&self) -> PathBuf {
        self.root.join(ARTIFACTS_DIR_NAME)
    }
}

fn create(dir: &Path) -> Result<(), AppDirError> {
    std::fs::create_dir_all(dir).map_err(|source| AppDirError::CreateDir {
        path: dir.to_path_buf(),
        source,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn root_logs_and_artifacts_hang_off_one_dir() {
        let base = tempdir().unwrap();
        let dirs = AppDirs::under(base.path()).unwrap();
        assert_eq!(dirs.root(), base.path().join(".gradecast"));
        assert!(dirs.root().is_dir());

        let logs = dirs.logs().unwrap();
        assert_eq!(logs, dirs.root().join("logs"));
        assert!(logs.is_dir());

        assert_eq!(dirs.artifacts(), dirs.root().join("artifacts"));
        assert!(!dirs.artifacts().exists());
    }

    #[test]
    fn unwritable_base_is_reported() {
        let base = tempdir().unwrap();
        let file = base.path().join("plain-file");
        std::fs::write(&file, "").unwrap();
        assert!(matches!(
            AppDirs::under(&file),
            Err(AppDirError::CreateDir { .. })
        ));
    }
}
