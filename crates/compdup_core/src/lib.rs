//! Core logic for recursive project-item duplication.
//! This crate owns the host project model, the duplication engine, and its
//! reporting; the CLI is a thin shell over it.

pub mod config;
pub mod db;
pub mod logging;
pub mod model;
pub mod naming;
pub mod report;
pub mod repo;
pub mod service;
pub mod snapshot;

pub use config::{ConfigError, DuplicationConfig};
pub use db::{open_db, open_db_in_memory, DbError, DbResult};
pub use logging::{default_log_level, init_logging, init_stderr_logging};
pub use model::item::{
    Folder, FolderId, ItemId, ItemKind, Layer, LayerId, NewItem, NewLayer, ProjectItem,
    SourceTiming, ROOT_FOLDER_NAME,
};
pub use naming::{derive_name, slugify};
pub use report::{
    read_manifest, write_manifest, DuplicationManifest, DuplicationOutcome, ManifestEntry,
    ReportError, MANIFEST_FILE_NAME,
};
pub use repo::name_index::NameIndex;
pub use repo::project_repo::{
    ProjectRepoError, ProjectRepoResult, ProjectRepository, SqliteProjectRepository,
};
pub use service::duplicate_service::{
    DuplicateError, DuplicateService, DuplicatedItem, DuplicationEngine, DuplicationRun,
    DuplicationStats, HostOperation, HostOperationFailed, MemoScope,
};
pub use service::folder_resolver::{FolderResolveError, FolderResolver, ResolvedFolder};
pub use service::project_service::{FolderItemSummary, ProjectService, ProjectServiceError};
pub use snapshot::{import_snapshot, load_snapshot, ImportSummary, ProjectSnapshot, SnapshotError};

/// Returns the core crate version.
pub fn core_version() -> &'static str {
    env!("CARGO_PKG_VERSION")
}

#[cfg(test)]
mod tests {
    use super::core_version;

    #[test]
    fn version_is_not_empty() {
        assert!(!core_version().is_empty());
    }
}
