//! Duplication run configuration.
//!
//! # Responsibility
//! - Load the input parameters of one duplication run from JSON.
//! - Validate them before any host call is made.
//!
//! # Invariants
//! - Folder names are stored trimmed.
//! - `parent_folder` is empty when no parent is requested.

use crate::report::MANIFEST_FILE_NAME;
use crate::service::duplicate_service::MemoScope;
use serde::{Deserialize, Serialize};
use std::error::Error;
use std::fmt::{Display, Formatter};
use std::path::{Path, PathBuf};

/// Errors from loading or validating configuration.
#[derive(Debug)]
pub enum ConfigError {
    Io { path: PathBuf, source: std::io::Error },
    Json { path: PathBuf, source: serde_json::Error },
    /// Required field is blank after trim.
    MissingField(&'static str),
    /// Source and target folder names are identical.
    SameFolder(String),
}

impl Display for ConfigError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Io { path, source } => {
                write!(f, "failed to read config `{}`: {source}", path.display())
            }
            Self::Json { path, source } => {
                write!(f, "invalid config json `{}`: {source}", path.display())
            }
            Self::MissingField(field) => write!(f, "config field `{field}` must not be blank"),
            Self::SameFolder(name) => {
                write!(f, "sourceFolderName and targetFolderName must differ: `{name}`")
            }
        }
    }
}

impl Error for ConfigError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Io { source, .. } => Some(source),
            Self::Json { source, .. } => Some(source),
            Self::MissingField(_) | Self::SameFolder(_) => None,
        }
    }
}

/// Input parameters for one container-level duplication.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DuplicationConfig {
    pub source_folder_name: String,
    pub target_folder_name: String,
    #[serde(default)]
    pub parent_folder: String,
    #[serde(default)]
    pub memo_scope: MemoScope,
    #[serde(default)]
    pub manifest_file: Option<PathBuf>,
}

impl DuplicationConfig {
    pub fn new(source_folder_name: impl Into<String>, target_folder_name: impl Into<String>) -> Self {
        Self {
            source_folder_name: source_folder_name.into(),
            target_folder_name: target_folder_name.into(),
            parent_folder: String::new(),
            memo_scope: MemoScope::default(),
            manifest_file: None,
        }
    }

    /// Reads and validates a JSON config file.
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        let config: Self = serde_json::from_str(&text).map_err(|source| ConfigError::Json {
            path: path.to_path_buf(),
            source,
        })?;
        config.validated()
    }

    /// Trims names and checks required fields.
    pub fn validated(mut self) -> Result<Self, ConfigError> {
        self.source_folder_name = self.source_folder_name.trim().to_string();
        self.target_folder_name = self.target_folder_name.trim().to_string();
        self.parent_folder = self.parent_folder.trim().to_string();

        if self.source_folder_name.is_empty() {
            return Err(ConfigError::MissingField("sourceFolderName"));
        }
        if self.target_folder_name.is_empty() {
            return Err(ConfigError::MissingField("targetFolderName"));
        }
        if self.source_folder_name == self.target_folder_name {
            return Err(ConfigError::SameFolder(self.source_folder_name));
        }
        Ok(self)
    }

    /// Manifest destination, defaulting to [`MANIFEST_FILE_NAME`] in `dir`.
    pub fn manifest_path(&self, dir: impl AsRef<Path>) -> PathBuf {
        match &self.manifest_file {
            Some(path) if path.is_absolute() => path.clone(),
            Some(path) => dir.as_ref().join(path),
            None => dir.as_ref().join(MANIFEST_FILE_NAME),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::{ConfigError, DuplicationConfig};
    use crate::service::duplicate_service::MemoScope;
    use std::path::PathBuf;

    #[test]
    fn parses_minimal_config_with_defaults() {
        let config: DuplicationConfig = serde_json::from_str(
            r#"{"sourceFolderName": " Templates ", "targetFolderName": "Render1"}"#,
        )
        .unwrap();
        let config = config.validated().unwrap();

        assert_eq!(config.source_folder_name, "Templates");
        assert_eq!(config.parent_folder, "");
        assert_eq!(config.memo_scope, MemoScope::Destination);
        assert!(config.manifest_file.is_none());
    }

    #[test]
    fn parses_project_scope() {
        let config: DuplicationConfig = serde_json::from_str(
            r#"{"sourceFolderName": "A", "targetFolderName": "B", "memoScope": "project"}"#,
        )
        .unwrap();
        assert_eq!(config.memo_scope, MemoScope::Project);
    }

    #[test]
    fn rejects_blank_and_identical_folders() {
        let err = DuplicationConfig::new("  ", "Render1").validated().unwrap_err();
        assert!(matches!(err, ConfigError::MissingField("sourceFolderName")));

        let err = DuplicationConfig::new("Templates", "").validated().unwrap_err();
        assert!(matches!(err, ConfigError::MissingField("targetFolderName")));

        let err = DuplicationConfig::new("Templates", " Templates")
            .validated()
            .unwrap_err();
        assert!(matches!(err, ConfigError::SameFolder(name) if name == "Templates"));
    }

    #[test]
    fn manifest_path_defaults_into_dir() {
        let mut config = DuplicationConfig::new("Templates", "Render1");
        assert_eq!(
            config.manifest_path("/tmp/cache"),
            PathBuf::from("/tmp/cache/duplicate_folder_items.json")
        );

        config.manifest_file = Some(PathBuf::from("out/run.json"));
        assert_eq!(
            config.manifest_path("/tmp/cache"),
            PathBuf::from("/tmp/cache/out/run.json")
        );
    }
}
