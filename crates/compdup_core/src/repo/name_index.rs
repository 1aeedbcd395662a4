//! Name-keyed lookup contract over the host project.
//!
//! # Responsibility
//! - Resolve human-readable names to at most one item or folder.
//! - Serve as the memoization oracle for the duplication engine.
//!
//! # Invariants
//! - Lookups are exact-match and deterministic when several rows share a
//!   name: the earliest-created row wins.
//! - Writes made through the same handle are visible to subsequent lookups.

use crate::model::item::{Folder, FolderId, ItemId, ProjectItem};
use crate::repo::project_repo::ProjectRepoResult;

/// Name index over project items and folders.
pub trait NameIndex {
    /// Finds the first item with exactly this name, anywhere in the project.
    fn find_item_by_name(&self, name: &str) -> ProjectRepoResult<Option<ProjectItem>>;

    /// Finds the id of the first item with exactly this name.
    fn find_item_id_by_name(&self, name: &str) -> ProjectRepoResult<Option<ItemId>> {
        Ok(self.find_item_by_name(name)?.map(|item| item.item_uuid))
    }

    /// Finds the first item with this name directly inside one folder.
    ///
    /// `None` addresses the root folder.
    fn find_item_by_name_in(
        &self,
        folder_uuid: Option<FolderId>,
        name: &str,
    ) -> ProjectRepoResult<Option<ProjectItem>>;

    /// Finds the first folder with exactly this name.
    fn find_folder_by_name(&self, name: &str) -> ProjectRepoResult<Option<Folder>>;
}
