//! Destination folder resolution.
//!
//! # Responsibility
//! - Return an existing folder by name or create it.
//! - Nest freshly created folders under an optional named parent.
//!
//! # Invariants
//! - Existing folders are returned untouched, never re-parented.
//! - Folder lookups consider folders only; an item sharing the name does not
//!   satisfy resolution.

use crate::model::item::Folder;
use crate::repo::project_repo::{ProjectRepoError, ProjectRepository};
use log::{debug, info};
use std::error::Error;
use std::fmt::{Display, Formatter};

/// Errors from folder resolution.
#[derive(Debug)]
pub enum FolderResolveError {
    /// Requested folder name is blank after trim.
    InvalidFolderName,
    /// Named parent folder does not exist.
    ParentFolderNotFound(String),
    /// Repository-level failure.
    Repo(ProjectRepoError),
}

impl Display for FolderResolveError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::InvalidFolderName => write!(f, "folder name must not be blank"),
            Self::ParentFolderNotFound(name) => write!(f, "parent folder not found: `{name}`"),
            Self::Repo(err) => write!(f, "{err}"),
        }
    }
}

impl Error for FolderResolveError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Repo(err) => Some(err),
            _ => None,
        }
    }
}

impl From<ProjectRepoError> for FolderResolveError {
    fn from(value: ProjectRepoError) -> Self {
        Self::Repo(value)
    }
}

/// Outcome of one resolution.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedFolder {
    pub folder: Folder,
    /// `true` when this call created the folder.
    pub created: bool,
}

/// Find-or-create resolver over a borrowed repository.
pub struct FolderResolver<'r, R: ProjectRepository> {
    repo: &'r R,
}

impl<'r, R: ProjectRepository> FolderResolver<'r, R> {
    pub fn new(repo: &'r R) -> Self {
        Self { repo }
    }

    /// Resolves `name`, creating it (under `parent_name` when non-empty) if
    /// no folder carries that name yet.
    pub fn resolve(
        &self,
        name: &str,
        parent_name: &str,
    ) -> Result<ResolvedFolder, FolderResolveError> {
        let name = name.trim();
        if name.is_empty() {
            return Err(FolderResolveError::InvalidFolderName);
        }

        if let Some(folder) = self.repo.find_folder_by_name(name)? {
            debug!("event=folder_resolve module=folder status=reused folder={name}");
            return Ok(ResolvedFolder {
                folder,
                created: false,
            });
        }

        let parent_name = parent_name.trim();
        let parent = if parent_name.is_empty() {
            None
        } else {
            Some(
                self.repo
                    .find_folder_by_name(parent_name)?
                    .ok_or_else(|| FolderResolveError::ParentFolderNotFound(parent_name.into()))?,
            )
        };

        let created = self.repo.create_folder(name)?;
        let folder = match parent {
            Some(parent) => {
                self.repo
                    .set_folder_parent(created.folder_uuid, Some(parent.folder_uuid))?;
                self.repo
                    .get_folder(created.folder_uuid)?
                    .ok_or(ProjectRepoError::FolderNotFound(created.folder_uuid))?
            }
            None => created,
        };

        info!(
            "event=folder_resolve module=folder status=created folder={} parent={}",
            folder.name,
            if parent_name.is_empty() { "-" } else { parent_name }
        );
        Ok(ResolvedFolder {
            folder,
            created: true,
        })
    }
}
