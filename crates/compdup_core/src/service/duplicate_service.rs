//! Recursive folder duplication.
//!
//! # Responsibility
//! - Duplicate every direct child of a source folder into a destination.
//! - Duplicate the composition subgraph reachable through enabled, non-null
//!   layers exactly once per destination, relinking layers to the copies.
//! - Report one manifest entry per top-level item.
//!
//! # Invariants
//! - The derived name is the memoization key; a name hit is reused as-is.
//! - A duplicate is renamed before its layers are traversed, so re-entering the
//!   same `(destination, source)` pair always hits the memo.
//! - Source items are never mutated and nothing is deleted.
//! - Host failures are recovered per composition by falling back to the
//!   original; they never abort the run.

use crate::config::DuplicationConfig;
use crate::model::item::{Folder, ItemId, LayerId, ProjectItem, SourceTiming};
use crate::naming::derive_name;
use crate::report::{DuplicationManifest, DuplicationOutcome, ManifestEntry};
use crate::repo::project_repo::{ProjectRepoError, ProjectRepoResult, ProjectRepository};
use crate::service::folder_resolver::{FolderResolveError, FolderResolver};
use log::{debug, info, warn};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::error::Error;
use std::fmt::{Display, Formatter};
use std::time::Instant;

/// Where a memo hit must live to count as "already duplicated".
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MemoScope {
    /// Any item in the project carrying the derived name.
    Project,
    /// Only items directly inside the destination folder.
    #[default]
    Destination,
}

/// Host primitive that failed during duplication.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HostOperation {
    Lookup,
    Duplicate,
    SetParent,
    Rename,
    ListLayers,
    LoadSource,
    ReplaceSource,
}

impl Display for HostOperation {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        let label = match self {
            Self::Lookup => "lookup",
            Self::Duplicate => "duplicate",
            Self::SetParent => "set_parent",
            Self::Rename => "rename",
            Self::ListLayers => "list_layers",
            Self::LoadSource => "load_source",
            Self::ReplaceSource => "replace_source",
        };
        f.write_str(label)
    }
}

/// Recoverable host failure; logged and absorbed by the engine.
#[derive(Debug)]
pub struct HostOperationFailed {
    pub operation: HostOperation,
    pub item_uuid: ItemId,
    pub source: ProjectRepoError,
}

impl Display for HostOperationFailed {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "host {} failed for item {}: {}",
            self.operation, self.item_uuid, self.source
        )
    }
}

impl Error for HostOperationFailed {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        Some(&self.source)
    }
}

trait HostResultExt<T> {
    fn host(self, operation: HostOperation, item_uuid: ItemId) -> Result<T, HostOperationFailed>;
}

impl<T> HostResultExt<T> for ProjectRepoResult<T> {
    fn host(self, operation: HostOperation, item_uuid: ItemId) -> Result<T, HostOperationFailed> {
        self.map_err(|source| HostOperationFailed {
            operation,
            item_uuid,
            source,
        })
    }
}

/// Fatal errors of a container-level run.
#[derive(Debug)]
pub enum DuplicateError {
    /// Source and target folder names are identical.
    SameFolder(String),
    /// Destination folder could not be resolved or created.
    Destination(FolderResolveError),
    /// Source folder could not be scanned.
    Scan(ProjectRepoError),
}

impl Display for DuplicateError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::SameFolder(name) => {
                write!(f, "source and target folder must differ: `{name}`")
            }
            Self::Destination(err) => write!(f, "destination folder: {err}"),
            Self::Scan(err) => write!(f, "source folder scan: {err}"),
        }
    }
}

impl Error for DuplicateError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::SameFolder(_) => None,
            Self::Destination(err) => Some(err),
            Self::Scan(err) => Some(err),
        }
    }
}

impl From<FolderResolveError> for DuplicateError {
    fn from(value: FolderResolveError) -> Self {
        Self::Destination(value)
    }
}

/// Item produced (or stood in) for one source item.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DuplicatedItem {
    pub item: ProjectItem,
    pub outcome: DuplicationOutcome,
}

/// Counters over every node touched in one run, nested ones included.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DuplicationStats {
    pub created: usize,
    pub reused: usize,
    pub fell_back: usize,
    pub relinked_layers: usize,
    pub failed_relinks: usize,
}

impl DuplicationStats {
    fn record(&mut self, outcome: DuplicationOutcome) {
        match outcome {
            DuplicationOutcome::Created => self.created += 1,
            DuplicationOutcome::Reused => self.reused += 1,
            DuplicationOutcome::FellBack => self.fell_back += 1,
        }
    }
}

/// Depth-first duplication engine over a borrowed host repository.
///
/// Single-threaded by construction: the memo check and the create step are
/// not atomic, so two engines must never target the same destination at once.
pub struct DuplicationEngine<'r, R: ProjectRepository> {
    repo: &'r R,
    scope: MemoScope,
    in_progress: HashSet<ItemId>,
    stats: DuplicationStats,
}

impl<'r, R: ProjectRepository> DuplicationEngine<'r, R> {
    pub fn new(repo: &'r R, scope: MemoScope) -> Self {
        Self {
            repo,
            scope,
            in_progress: HashSet::new(),
            stats: DuplicationStats::default(),
        }
    }

    pub fn stats(&self) -> DuplicationStats {
        self.stats
    }

    /// Duplicates one composition and its reachable nested compositions into
    /// `destination`, reusing any duplicate already present under the derived
    /// name.
    pub fn duplicate_graph(
        &mut self,
        source: &ProjectItem,
        destination: &Folder,
    ) -> DuplicatedItem {
        let name = derive_name(&destination.name, &source.name);

        match self.memo_lookup(&name, destination) {
            Ok(Some(existing)) => {
                debug!(
                    "event=duplicate_graph module=duplicate status=reused source={} name={name}",
                    source.item_uuid
                );
                self.finish(existing, DuplicationOutcome::Reused)
            }
            Ok(None) if self.in_progress.contains(&source.item_uuid) => {
                warn!(
                    "event=duplicate_graph module=duplicate status=fell_back reason=reentered source={} name={name}",
                    source.item_uuid
                );
                self.finish(source.clone(), DuplicationOutcome::FellBack)
            }
            Ok(None) => self.create_graph(source, destination, &name),
            Err(err) => self.fall_back(source, err),
        }
    }

    /// Shallow, unconditional duplicate of a non-composition item.
    pub fn duplicate_flat(&mut self, item: &ProjectItem, destination: &Folder) -> DuplicatedItem {
        let attempt = self
            .repo
            .duplicate_item(item.item_uuid)
            .host(HostOperation::Duplicate, item.item_uuid)
            .and_then(|copy| {
                self.repo
                    .set_item_parent(copy.item_uuid, Some(destination.folder_uuid))
                    .host(HostOperation::SetParent, copy.item_uuid)?;
                self.reload(copy.item_uuid)
            });

        match attempt {
            Ok(copy) => {
                debug!(
                    "event=duplicate_flat module=duplicate status=ok source={} copy={}",
                    item.item_uuid, copy.item_uuid
                );
                self.finish(copy, DuplicationOutcome::Created)
            }
            Err(err) => self.fall_back(item, err),
        }
    }

    fn memo_lookup(
        &self,
        name: &str,
        destination: &Folder,
    ) -> Result<Option<ProjectItem>, HostOperationFailed> {
        let found = match self.scope {
            MemoScope::Project => self.repo.find_item_by_name(name),
            MemoScope::Destination => self
                .repo
                .find_item_by_name_in(Some(destination.folder_uuid), name),
        };
        found.host(HostOperation::Lookup, destination.folder_uuid)
    }

    fn create_graph(
        &mut self,
        source: &ProjectItem,
        destination: &Folder,
        name: &str,
    ) -> DuplicatedItem {
        let copy = match self.create_copy(source, destination, name) {
            Ok(copy) => copy,
            Err(err) => return self.fall_back(source, err),
        };

        self.in_progress.insert(source.item_uuid);
        self.relink_layers(&copy, destination);
        self.in_progress.remove(&source.item_uuid);

        debug!(
            "event=duplicate_graph module=duplicate status=created source={} copy={} name={name}",
            source.item_uuid, copy.item_uuid
        );
        self.finish(copy, DuplicationOutcome::Created)
    }

    fn create_copy(
        &self,
        source: &ProjectItem,
        destination: &Folder,
        name: &str,
    ) -> Result<ProjectItem, HostOperationFailed> {
        let copy = self
            .repo
            .duplicate_item(source.item_uuid)
            .host(HostOperation::Duplicate, source.item_uuid)?;
        self.repo
            .set_item_parent(copy.item_uuid, Some(destination.folder_uuid))
            .host(HostOperation::SetParent, copy.item_uuid)?;
        self.repo
            .rename_item(copy.item_uuid, name)
            .host(HostOperation::Rename, copy.item_uuid)?;
        self.reload(copy.item_uuid)
    }

    fn relink_layers(&mut self, copy: &ProjectItem, destination: &Folder) {
        let layers = match self
            .repo
            .list_layers(copy.item_uuid)
            .host(HostOperation::ListLayers, copy.item_uuid)
        {
            Ok(layers) => layers,
            Err(err) => {
                warn!(
                    "event=relink module=duplicate status=error copy={} error={err}",
                    copy.item_uuid
                );
                return;
            }
        };

        for layer in layers.iter().filter(|layer| layer.is_traversable()) {
            let Some(source_uuid) = layer.source_uuid else {
                continue;
            };
            let nested = match self
                .repo
                .get_item(source_uuid)
                .host(HostOperation::LoadSource, source_uuid)
            {
                Ok(Some(nested)) if nested.is_composition() => nested,
                Ok(_) => continue,
                Err(err) => {
                    self.relink_failed(layer.layer_uuid, &err);
                    continue;
                }
            };

            let child = self.duplicate_graph(&nested, destination);
            if child.item.item_uuid == source_uuid {
                continue;
            }
            match self
                .repo
                .replace_layer_source(
                    layer.layer_uuid,
                    child.item.item_uuid,
                    SourceTiming::Preserve,
                )
                .host(HostOperation::ReplaceSource, child.item.item_uuid)
            {
                Ok(()) => self.stats.relinked_layers += 1,
                Err(err) => self.relink_failed(layer.layer_uuid, &err),
            }
        }
    }

    fn relink_failed(&mut self, layer_uuid: LayerId, err: &HostOperationFailed) {
        self.stats.failed_relinks += 1;
        warn!("event=relink module=duplicate status=error layer={layer_uuid} error={err}");
    }

    fn reload(&self, item_uuid: ItemId) -> Result<ProjectItem, HostOperationFailed> {
        self.repo
            .get_item(item_uuid)
            .and_then(|item| item.ok_or(ProjectRepoError::ItemNotFound(item_uuid)))
            .host(HostOperation::LoadSource, item_uuid)
    }

    fn fall_back(&mut self, original: &ProjectItem, err: HostOperationFailed) -> DuplicatedItem {
        warn!(
            "event=duplicate module=duplicate status=fell_back source={} name={} error={err}",
            original.item_uuid, original.name
        );
        self.finish(original.clone(), DuplicationOutcome::FellBack)
    }

    fn finish(&mut self, item: ProjectItem, outcome: DuplicationOutcome) -> DuplicatedItem {
        self.stats.record(outcome);
        DuplicatedItem { item, outcome }
    }
}

/// Result of one container-level run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DuplicationRun {
    pub manifest: DuplicationManifest,
    pub stats: DuplicationStats,
}

/// Container-level duplication service facade.
pub struct DuplicateService<R: ProjectRepository> {
    repo: R,
    scope: MemoScope,
}

impl<R: ProjectRepository> DuplicateService<R> {
    /// Creates service with destination-scoped memoization.
    pub fn new(repo: R) -> Self {
        Self {
            repo,
            scope: MemoScope::default(),
        }
    }

    pub fn with_memo_scope(mut self, scope: MemoScope) -> Self {
        self.scope = scope;
        self
    }

    /// Borrows the underlying repository.
    pub fn repo(&self) -> &R {
        &self.repo
    }

    /// Duplicates every direct child of `source_folder` into `target_folder`.
    ///
    /// `parent_folder` nests the target only when this call creates it.
    pub fn duplicate_container(
        &self,
        source_folder: &str,
        target_folder: &str,
        parent_folder: &str,
    ) -> Result<DuplicationManifest, DuplicateError> {
        self.execute(self.scope, source_folder, target_folder, parent_folder)
            .map(|run| run.manifest)
    }

    /// Runs a configured duplication and returns manifest plus counters.
    pub fn run(&self, config: &DuplicationConfig) -> Result<DuplicationRun, DuplicateError> {
        self.execute(
            config.memo_scope,
            &config.source_folder_name,
            &config.target_folder_name,
            &config.parent_folder,
        )
    }

    fn execute(
        &self,
        scope: MemoScope,
        source_folder: &str,
        target_folder: &str,
        parent_folder: &str,
    ) -> Result<DuplicationRun, DuplicateError> {
        let started_at = Instant::now();
        let source_folder = source_folder.trim();
        let target_folder = target_folder.trim();
        if source_folder == target_folder {
            return Err(DuplicateError::SameFolder(source_folder.to_string()));
        }
        info!(
            "event=duplicate_container module=duplicate status=start source={source_folder} target={target_folder} scope={scope:?}"
        );

        let destination = FolderResolver::new(&self.repo).resolve(target_folder, parent_folder)?;
        let items = self
            .repo
            .list_items_in_folder_named(source_folder)
            .map_err(DuplicateError::Scan)?;

        let mut engine = DuplicationEngine::new(&self.repo, scope);
        let mut manifest = DuplicationManifest::new(
            source_folder,
            destination.folder.name.clone(),
            destination.folder.folder_uuid,
        );
        for item in &items {
            let produced = if item.is_composition() {
                engine.duplicate_graph(item, &destination.folder)
            } else {
                engine.duplicate_flat(item, &destination.folder)
            };
            manifest.push(ManifestEntry {
                original_identity: item.item_uuid,
                original_name: item.name.clone(),
                new_identity: produced.item.item_uuid,
                kind: produced.item.kind,
                new_name: produced.item.name,
                outcome: produced.outcome,
            });
        }

        let stats = engine.stats();
        info!(
            "event=duplicate_container module=duplicate status=ok source={source_folder} target={target_folder} entries={} created={} reused={} fell_back={} relinked={} duration_ms={}",
            manifest.len(),
            stats.created,
            stats.reused,
            stats.fell_back,
            stats.relinked_layers,
            started_at.elapsed().as_millis()
        );
        Ok(DuplicationRun { manifest, stats })
    }
}
