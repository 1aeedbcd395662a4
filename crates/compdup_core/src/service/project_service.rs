//! Project authoring and inspection service.
//!
//! # Responsibility
//! - Validate project tree invariants above repository layer.
//! - Provide folder/composition/item/layer create operations.
//! - Produce flat folder listings and the whole-project map.
//!
//! # Invariants
//! - Names are trimmed and must not be blank.
//! - Parent folders must exist when provided.
//! - Layer sources must not make a composition contain itself.
//! - Null layers never carry a source.

use crate::model::item::{
    Folder, FolderId, ItemId, ItemKind, Layer, NewItem, NewLayer, ProjectItem, ROOT_FOLDER_NAME,
};
use crate::repo::project_repo::{ProjectRepoError, ProjectRepository};
use serde::{Deserialize, Serialize};
use std::collections::{HashMap, HashSet};
use std::error::Error;
use std::fmt::{Display, Formatter};

/// Errors from project service operations.
#[derive(Debug)]
pub enum ProjectServiceError {
    /// Name is blank after trim.
    InvalidName,
    /// Target item does not exist.
    ItemNotFound(ItemId),
    /// Folder does not exist.
    FolderNotFound(FolderId),
    /// Layer owner exists but is not a composition.
    NotComposition(ItemId),
    /// Null layers cannot reference a source.
    NullLayerWithSource,
    /// Layer source would make a composition (indirectly) contain itself.
    SourceCycle { comp_uuid: ItemId, source_uuid: ItemId },
    /// Repository-level failure.
    Repo(ProjectRepoError),
}

impl Display for ProjectServiceError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::InvalidName => write!(f, "name must not be blank"),
            Self::ItemNotFound(id) => write!(f, "project item not found: {id}"),
            Self::FolderNotFound(id) => write!(f, "folder not found: {id}"),
            Self::NotComposition(id) => write!(f, "project item is not a composition: {id}"),
            Self::NullLayerWithSource => write!(f, "null layer cannot reference a source"),
            Self::SourceCycle {
                comp_uuid,
                source_uuid,
            } => write!(
                f,
                "layer source {source_uuid} would make composition {comp_uuid} contain itself"
            ),
            Self::Repo(err) => write!(f, "{err}"),
        }
    }
}

impl Error for ProjectServiceError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Repo(err) => Some(err),
            _ => None,
        }
    }
}

impl From<ProjectRepoError> for ProjectServiceError {
    fn from(value: ProjectRepoError) -> Self {
        match value {
            ProjectRepoError::ItemNotFound(id) => Self::ItemNotFound(id),
            ProjectRepoError::FolderNotFound(id) => Self::FolderNotFound(id),
            ProjectRepoError::NotComposition(id) => Self::NotComposition(id),
            other => Self::Repo(other),
        }
    }
}

/// Flat listing record for one project item.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FolderItemSummary {
    pub id: ItemId,
    pub name: String,
    #[serde(rename = "type")]
    pub kind: ItemKind,
    pub parent_folder: String,
    pub parent_id: Option<FolderId>,
}

/// Project authoring service facade.
pub struct ProjectService<R: ProjectRepository> {
    repo: R,
}

impl<R: ProjectRepository> ProjectService<R> {
    /// Creates service from repository implementation.
    pub fn new(repo: R) -> Self {
        Self { repo }
    }

    /// Borrows the underlying repository.
    pub fn repo(&self) -> &R {
        &self.repo
    }

    /// Creates one folder under optional parent.
    pub fn create_folder(
        &self,
        parent_uuid: Option<FolderId>,
        name: impl Into<String>,
    ) -> Result<Folder, ProjectServiceError> {
        let normalized = normalize_name(name.into())?;
        if let Some(parent_uuid) = parent_uuid {
            self.ensure_folder_exists(parent_uuid)?;
        }
        let folder = self.repo.create_folder(normalized.as_str())?;
        if parent_uuid.is_some() {
            self.repo
                .set_folder_parent(folder.folder_uuid, parent_uuid)?;
            return self.require_folder(folder.folder_uuid);
        }
        Ok(folder)
    }

    /// Creates one empty composition.
    pub fn create_composition(
        &self,
        parent_uuid: Option<FolderId>,
        name: impl Into<String>,
        duration_ms: Option<i64>,
    ) -> Result<ProjectItem, ProjectServiceError> {
        let mut item = NewItem::new(ItemKind::Composition, name).in_folder(parent_uuid);
        item.duration_ms = duration_ms;
        self.create_item(item)
    }

    /// Creates one project item.
    pub fn create_item(&self, item: NewItem) -> Result<ProjectItem, ProjectServiceError> {
        let mut item = item;
        item.name = normalize_name(item.name)?;
        if let Some(parent_uuid) = item.parent_uuid {
            self.ensure_folder_exists(parent_uuid)?;
        }
        self.repo.create_item(&item).map_err(Into::into)
    }

    /// Appends one layer to a composition.
    pub fn add_layer(
        &self,
        comp_uuid: ItemId,
        layer: NewLayer,
    ) -> Result<Layer, ProjectServiceError> {
        let mut layer = layer;
        layer.name = normalize_name(layer.name)?;
        let owner = self.require_item(comp_uuid)?;
        if !owner.is_composition() {
            return Err(ProjectServiceError::NotComposition(comp_uuid));
        }

        if let Some(source_uuid) = layer.source_uuid {
            if layer.is_null {
                return Err(ProjectServiceError::NullLayerWithSource);
            }
            let source = self.require_item(source_uuid)?;
            if source.is_composition() && self.composition_reaches(source_uuid, comp_uuid)? {
                return Err(ProjectServiceError::SourceCycle {
                    comp_uuid,
                    source_uuid,
                });
            }
        }

        self.repo.add_layer(comp_uuid, &layer).map_err(Into::into)
    }

    /// Lists direct children of every folder carrying `folder_name`.
    pub fn search_folder_items(
        &self,
        folder_name: &str,
    ) -> Result<Vec<FolderItemSummary>, ProjectServiceError> {
        let items = self.repo.list_items_in_folder_named(folder_name)?;
        self.summarize(items)
    }

    /// Lists every item in the project with its immediate folder.
    pub fn project_map(&self) -> Result<Vec<FolderItemSummary>, ProjectServiceError> {
        let items = self.repo.list_items()?;
        self.summarize(items)
    }

    fn summarize(
        &self,
        items: Vec<ProjectItem>,
    ) -> Result<Vec<FolderItemSummary>, ProjectServiceError> {
        let folder_names: HashMap<FolderId, String> = self
            .repo
            .list_folders()?
            .into_iter()
            .map(|folder| (folder.folder_uuid, folder.name))
            .collect();

        Ok(items
            .into_iter()
            .map(|item| FolderItemSummary {
                id: item.item_uuid,
                parent_folder: item
                    .parent_uuid
                    .and_then(|id| folder_names.get(&id).cloned())
                    .unwrap_or_else(|| ROOT_FOLDER_NAME.to_string()),
                parent_id: item.parent_uuid,
                name: item.name,
                kind: item.kind,
            })
            .collect())
    }

    fn require_item(&self, item_uuid: ItemId) -> Result<ProjectItem, ProjectServiceError> {
        self.repo
            .get_item(item_uuid)?
            .ok_or(ProjectServiceError::ItemNotFound(item_uuid))
    }

    fn require_folder(&self, folder_uuid: FolderId) -> Result<Folder, ProjectServiceError> {
        self.repo
            .get_folder(folder_uuid)?
            .ok_or(ProjectServiceError::FolderNotFound(folder_uuid))
    }

    fn ensure_folder_exists(&self, folder_uuid: FolderId) -> Result<(), ProjectServiceError> {
        self.require_folder(folder_uuid).map(|_| ())
    }

    /// Returns whether `target` is reachable from `start` through layer sources.
    fn composition_reaches(
        &self,
        start: ItemId,
        target: ItemId,
    ) -> Result<bool, ProjectServiceError> {
        let mut visited = HashSet::new();
        let mut stack = vec![start];
        while let Some(current) = stack.pop() {
            if current == target {
                return Ok(true);
            }
            if !visited.insert(current) {
                continue;
            }
            for layer in self.repo.list_layers(current)? {
                if let Some(source_uuid) = layer.source_uuid {
                    stack.push(source_uuid);
                }
            }
        }
        Ok(false)
    }
}

fn normalize_name(value: String) -> Result<String, ProjectServiceError> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        return Err(ProjectServiceError::InvalidName);
    }
    Ok(trimmed.to_string())
}
