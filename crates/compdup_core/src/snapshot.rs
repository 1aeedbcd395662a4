//! Project snapshot import.
//!
//! # Responsibility
//! - Describe a host project (folders, items, layers) as portable JSON.
//! - Replay a snapshot into a repository through [`ProjectService`], so every
//!   authoring invariant is enforced on import.
//!
//! # Invariants
//! - Folders are created before items; a folder's parent must be declared
//!   earlier in the file or already exist.
//! - A layer source is resolved by name and must be declared earlier in the
//!   file or already exist.

use crate::model::item::{
    Folder, FolderId, ItemId, ItemKind, NewItem, NewLayer, ROOT_FOLDER_NAME,
};
use crate::repo::project_repo::ProjectRepository;
use crate::service::project_service::{ProjectService, ProjectServiceError};
use log::info;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::error::Error;
use std::fmt::{Display, Formatter};
use std::path::{Path, PathBuf};

/// Portable description of a host project.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ProjectSnapshot {
    #[serde(default)]
    pub folders: Vec<SnapshotFolder>,
    #[serde(default)]
    pub items: Vec<SnapshotItem>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SnapshotFolder {
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub parent: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SnapshotItem {
    pub name: String,
    pub kind: ItemKind,
    /// Owning folder name; absent or `Root` places the item at root.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub folder: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub duration_ms: Option<i64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub metadata: Option<serde_json::Value>,
    #[serde(default)]
    pub layers: Vec<SnapshotLayer>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SnapshotLayer {
    pub name: String,
    /// Source item name.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub source: Option<String>,
    #[serde(default = "default_enabled")]
    pub enabled: bool,
    #[serde(default)]
    pub is_null: bool,
    #[serde(default)]
    pub start_ms: i64,
    #[serde(default)]
    pub in_ms: i64,
    #[serde(default)]
    pub out_ms: i64,
}

fn default_enabled() -> bool {
    true
}

/// Counts of records created by one import.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ImportSummary {
    pub folders: usize,
    pub items: usize,
    pub layers: usize,
}

/// Errors from snapshot loading and import.
#[derive(Debug)]
pub enum SnapshotError {
    Io { path: PathBuf, source: std::io::Error },
    Json { path: PathBuf, source: serde_json::Error },
    /// Folder referenced by name was neither declared earlier nor present.
    UnknownFolder(String),
    /// Layer source referenced by name was neither declared earlier nor present.
    UnknownSource { item: String, source_name: String },
    /// Layers declared on an item that is not a composition.
    LayersOnNonComposition(String),
    /// Authoring validation rejected a record.
    Service(ProjectServiceError),
}

impl Display for SnapshotError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Io { path, source } => {
                write!(f, "failed to read snapshot `{}`: {source}", path.display())
            }
            Self::Json { path, source } => {
                write!(f, "invalid snapshot json `{}`: {source}", path.display())
            }
            Self::UnknownFolder(name) => write!(f, "snapshot references unknown folder `{name}`"),
            Self::UnknownSource { item, source_name } => write!(
                f,
                "item `{item}` has a layer sourcing unknown item `{source_name}`"
            ),
            Self::LayersOnNonComposition(name) => {
                write!(f, "item `{name}` declares layers but is not a composition")
            }
            Self::Service(err) => write!(f, "{err}"),
        }
    }
}

impl Error for SnapshotError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Io { source, .. } => Some(source),
            Self::Json { source, .. } => Some(source),
            Self::Service(err) => Some(err),
            Self::UnknownFolder(_)
            | Self::UnknownSource { .. }
            | Self::LayersOnNonComposition(_) => None,
        }
    }
}

impl From<ProjectServiceError> for SnapshotError {
    fn from(value: ProjectServiceError) -> Self {
        Self::Service(value)
    }
}

/// Reads a snapshot JSON file.
pub fn load_snapshot(path: impl AsRef<Path>) -> Result<ProjectSnapshot, SnapshotError> {
    let path = path.as_ref();
    let text = std::fs::read_to_string(path).map_err(|source| SnapshotError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    serde_json::from_str(&text).map_err(|source| SnapshotError::Json {
        path: path.to_path_buf(),
        source,
    })
}

/// Replays `snapshot` into the service's repository.
pub fn import_snapshot<R: ProjectRepository>(
    service: &ProjectService<R>,
    snapshot: &ProjectSnapshot,
) -> Result<ImportSummary, SnapshotError> {
    let mut summary = ImportSummary::default();
    let mut folders: HashMap<String, FolderId> = HashMap::new();

    for declared in &snapshot.folders {
        let parent_uuid = match declared.parent.as_deref() {
            Some(parent) => resolve_folder(service, &folders, parent)?,
            None => None,
        };
        let folder = service.create_folder(parent_uuid, declared.name.as_str())?;
        folders.entry(folder.name).or_insert(folder.folder_uuid);
        summary.folders += 1;
    }

    let mut items: HashMap<String, ItemId> = HashMap::new();
    for declared in &snapshot.items {
        if !declared.layers.is_empty() && !declared.kind.is_composition() {
            return Err(SnapshotError::LayersOnNonComposition(declared.name.clone()));
        }
        let parent_uuid = match declared.folder.as_deref() {
            Some(folder) => resolve_folder(service, &folders, folder)?,
            None => None,
        };

        let mut new_item =
            NewItem::new(declared.kind, declared.name.as_str()).in_folder(parent_uuid);
        new_item.duration_ms = declared.duration_ms;
        if let Some(metadata) = &declared.metadata {
            new_item = new_item.with_metadata(metadata.to_string());
        }
        let item = service.create_item(new_item)?;
        summary.items += 1;

        for layer in &declared.layers {
            let source_uuid = match layer.source.as_deref() {
                Some(source_name) => {
                    let found = match items.get(source_name) {
                        Some(id) => Some(*id),
                        None => service
                            .repo()
                            .find_item_id_by_name(source_name)
                            .map_err(|err| SnapshotError::Service(err.into()))?,
                    };
                    Some(found.ok_or_else(|| SnapshotError::UnknownSource {
                        item: declared.name.clone(),
                        source_name: source_name.to_string(),
                    })?)
                }
                None => None,
            };
            let new_layer = NewLayer {
                name: layer.name.clone(),
                source_uuid,
                enabled: layer.enabled,
                is_null: layer.is_null,
                start_ms: layer.start_ms,
                in_ms: layer.in_ms,
                out_ms: layer.out_ms,
            };
            service.add_layer(item.item_uuid, new_layer)?;
            summary.layers += 1;
        }

        items.entry(item.name).or_insert(item.item_uuid);
    }

    info!(
        "event=snapshot_import module=snapshot status=ok folders={} items={} layers={}",
        summary.folders, summary.items, summary.layers
    );
    Ok(summary)
}

fn resolve_folder<R: ProjectRepository>(
    service: &ProjectService<R>,
    declared: &HashMap<String, FolderId>,
    name: &str,
) -> Result<Option<FolderId>, SnapshotError> {
    let name = name.trim();
    if name == ROOT_FOLDER_NAME {
        return Ok(None);
    }
    if let Some(folder_uuid) = declared.get(name) {
        return Ok(Some(*folder_uuid));
    }
    let existing: Option<Folder> = service
        .repo()
        .find_folder_by_name(name)
        .map_err(|err| SnapshotError::Service(err.into()))?;
    existing
        .map(|folder| Some(folder.folder_uuid))
        .ok_or_else(|| SnapshotError::UnknownFolder(name.to_string()))
}
