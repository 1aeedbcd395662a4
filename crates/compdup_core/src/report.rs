//! Duplication manifest model and persistence.
//!
//! # Responsibility
//! - Describe the outcome of one container-level duplication run.
//! - Persist and reload the manifest as JSON.
//!
//! # Invariants
//! - One entry per top-level item collected from the source folder, in scan
//!   order, regardless of how many nested items were produced.

use crate::model::item::{FolderId, ItemId, ItemKind};
use serde::{Deserialize, Serialize};
use std::error::Error;
use std::fmt::{Display, Formatter};
use std::fs::File;
use std::io::{BufReader, BufWriter, Write};
use std::path::{Path, PathBuf};

/// Default file name used when persisting a manifest.
pub const MANIFEST_FILE_NAME: &str = "duplicate_folder_items.json";

/// How one item was produced.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DuplicationOutcome {
    /// A new duplicate was created in this run.
    Created,
    /// A previously produced duplicate was found by name and reused.
    Reused,
    /// The host rejected the duplicate; the original item stands in.
    FellBack,
}

/// One manifest record.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ManifestEntry {
    pub original_identity: ItemId,
    pub original_name: String,
    pub new_identity: ItemId,
    pub new_name: String,
    pub kind: ItemKind,
    pub outcome: DuplicationOutcome,
}

/// Ordered report of one duplication run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DuplicationManifest {
    pub source_folder: String,
    pub target_folder: String,
    pub target_folder_id: FolderId,
    pub entries: Vec<ManifestEntry>,
}

impl DuplicationManifest {
    pub fn new(
        source_folder: impl Into<String>,
        target_folder: impl Into<String>,
        target_folder_id: FolderId,
    ) -> Self {
        Self {
            source_folder: source_folder.into(),
            target_folder: target_folder.into(),
            target_folder_id,
            entries: Vec::new(),
        }
    }

    pub fn push(&mut self, entry: ManifestEntry) {
        self.entries.push(entry);
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Finds the entry produced for one original item name.
    pub fn entry_for(&self, original_name: &str) -> Option<&ManifestEntry> {
        self.entries
            .iter()
            .find(|entry| entry.original_name == original_name)
    }

    /// Counts entries with the given outcome.
    pub fn count(&self, outcome: DuplicationOutcome) -> usize {
        self.entries
            .iter()
            .filter(|entry| entry.outcome == outcome)
            .count()
    }
}

/// Errors from manifest persistence.
#[derive(Debug)]
pub enum ReportError {
    Io { path: PathBuf, source: std::io::Error },
    Json { path: PathBuf, source: serde_json::Error },
}

impl Display for ReportError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Io { path, source } => {
                write!(f, "manifest io failed at `{}`: {source}", path.display())
            }
            Self::Json { path, source } => {
                write!(f, "manifest json invalid at `{}`: {source}", path.display())
            }
        }
    }
}

impl Error for ReportError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Io { source, .. } => Some(source),
            Self::Json { source, .. } => Some(source),
        }
    }
}

/// Writes the manifest as pretty JSON, replacing any existing file.
pub fn write_manifest(
    path: impl AsRef<Path>,
    manifest: &DuplicationManifest,
) -> Result<(), ReportError> {
    let path = path.as_ref();
    let io_err = |source| ReportError::Io {
        path: path.to_path_buf(),
        source,
    };

    if let Some(parent) = path.parent().filter(|parent| !parent.as_os_str().is_empty()) {
        std::fs::create_dir_all(parent).map_err(io_err)?;
    }
    let file = File::create(path).map_err(io_err)?;
    let mut writer = BufWriter::new(file);
    serde_json::to_writer_pretty(&mut writer, manifest).map_err(|source| ReportError::Json {
        path: path.to_path_buf(),
        source,
    })?;
    writer.write_all(b"\n").map_err(io_err)?;
    writer.flush().map_err(io_err)
}

/// Loads a manifest previously written by [`write_manifest`].
pub fn read_manifest(path: impl AsRef<Path>) -> Result<DuplicationManifest, ReportError> {
    let path = path.as_ref();
    let file = File::open(path).map_err(|source| ReportError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    serde_json::from_reader(BufReader::new(file)).map_err(|source| ReportError::Json {
        path: path.to_path_buf(),
        source,
    })
}

#[cfg(test)]
mod tests {
    use super::{DuplicationManifest, DuplicationOutcome, ManifestEntry};
    use crate::model::item::ItemKind;
    use uuid::Uuid;

    fn entry(name: &str, outcome: DuplicationOutcome) -> ManifestEntry {
        ManifestEntry {
            original_identity: Uuid::new_v4(),
            original_name: name.to_string(),
            new_identity: Uuid::new_v4(),
            new_name: format!("render1-{}", name.to_lowercase()),
            kind: ItemKind::Composition,
            outcome,
        }
    }

    #[test]
    fn manifest_serializes_with_camel_case_keys() {
        let mut manifest = DuplicationManifest::new("Templates", "Render1", Uuid::new_v4());
        manifest.push(entry("Intro", DuplicationOutcome::FellBack));

        let value = serde_json::to_value(&manifest).unwrap();
        let first = &value["entries"][0];
        assert_eq!(value["sourceFolder"], "Templates");
        assert_eq!(first["originalName"], "Intro");
        assert_eq!(first["newName"], "render1-intro");
        assert_eq!(first["kind"], "Composition");
        assert_eq!(first["outcome"], "fell_back");
        assert!(first["newIdentity"].is_string());
    }

    #[test]
    fn entry_lookup_and_counts() {
        let mut manifest = DuplicationManifest::new("Templates", "Render1", Uuid::new_v4());
        manifest.push(entry("Intro", DuplicationOutcome::Created));
        manifest.push(entry("Outro", DuplicationOutcome::Reused));

        assert_eq!(manifest.len(), 2);
        assert_eq!(manifest.count(DuplicationOutcome::Created), 1);
        assert_eq!(
            manifest.entry_for("Outro").map(|entry| entry.outcome),
            Some(DuplicationOutcome::Reused)
        );
        assert!(manifest.entry_for("Missing").is_none());
    }
}
