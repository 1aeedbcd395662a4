//! Project item domain model.
//!
//! # Responsibility
//! - Define the typed records read from the host project tree.
//! - Fix the item kind tag once at read time.
//!
//! # Invariants
//! - `item_uuid`, `folder_uuid` and `layer_uuid` are stable and never reused.
//! - Only `ItemKind::Composition` items own layers.
//! - A null layer never carries a source.

use serde::{Deserialize, Serialize};
use std::fmt::{Display, Formatter};
use uuid::Uuid;

/// Stable identifier for project items (compositions and other assets).
pub type ItemId = Uuid;

/// Stable identifier for folders.
pub type FolderId = Uuid;

/// Stable identifier for composition layers.
pub type LayerId = Uuid;

/// Name the host uses for the implicit top-level folder.
pub const ROOT_FOLDER_NAME: &str = "Root";

/// Closed item kind tag.
///
/// Folders are not items; they are modelled by [`Folder`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ItemKind {
    /// Item owning an ordered layer stack; duplicated recursively.
    Composition,
    /// Any other asset (footage, audio, solids); duplicated shallowly.
    Other,
}

impl ItemKind {
    /// Storage tag used in `project_items.kind`.
    pub fn as_storage_str(self) -> &'static str {
        match self {
            Self::Composition => "composition",
            Self::Other => "other",
        }
    }

    /// Parses the storage tag.
    pub fn from_storage_str(value: &str) -> Option<Self> {
        match value {
            "composition" => Some(Self::Composition),
            "other" => Some(Self::Other),
            _ => None,
        }
    }

    pub fn is_composition(self) -> bool {
        self == Self::Composition
    }
}

impl Display for ItemKind {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Composition => write!(f, "Composition"),
            Self::Other => write!(f, "Other"),
        }
    }
}

/// Project item read model.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProjectItem {
    /// Stable item id.
    pub item_uuid: ItemId,
    /// Kind tag decided when the row was read.
    pub kind: ItemKind,
    /// Owning folder. `None` means the root folder.
    pub parent_uuid: Option<FolderId>,
    /// User-facing name. Not guaranteed unique across the project.
    pub name: String,
    /// Duration in milliseconds, when the asset has one.
    pub duration_ms: Option<i64>,
    /// Opaque host properties (JSON text), copied verbatim on duplicate.
    pub metadata: String,
    /// Stable order key within one folder.
    pub sort_order: i64,
    /// Epoch ms creation timestamp.
    pub created_at: i64,
    /// Epoch ms update timestamp.
    pub updated_at: i64,
}

impl ProjectItem {
    pub fn is_composition(&self) -> bool {
        self.kind.is_composition()
    }
}

/// Folder (container) read model.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Folder {
    /// Stable folder id.
    pub folder_uuid: FolderId,
    /// Parent folder. `None` means the root folder.
    pub parent_uuid: Option<FolderId>,
    /// User-facing name.
    pub name: String,
    /// Stable order key within one parent.
    pub sort_order: i64,
    /// Epoch ms creation timestamp.
    pub created_at: i64,
    /// Epoch ms update timestamp.
    pub updated_at: i64,
}

/// Composition layer read model.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Layer {
    /// Stable layer id.
    pub layer_uuid: LayerId,
    /// Owning composition.
    pub comp_uuid: ItemId,
    /// 1-based position in the owner's layer stack.
    pub layer_index: i64,
    /// Layer label.
    pub name: String,
    /// Disabled layers are skipped by graph traversal.
    pub enabled: bool,
    /// Structural placeholder with no media source.
    pub is_null: bool,
    /// Source item, absent for null layers.
    pub source_uuid: Option<ItemId>,
    /// Layer start offset in the owner timeline (ms).
    pub start_ms: i64,
    /// In point (ms).
    pub in_ms: i64,
    /// Out point (ms).
    pub out_ms: i64,
}

impl Layer {
    /// Returns whether traversal should follow this layer's source.
    pub fn is_traversable(&self) -> bool {
        self.enabled && !self.is_null && self.source_uuid.is_some()
    }
}

/// Input model for creating one project item.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewItem {
    pub kind: ItemKind,
    pub name: String,
    pub parent_uuid: Option<FolderId>,
    pub duration_ms: Option<i64>,
    pub metadata: String,
}

impl NewItem {
    pub fn new(kind: ItemKind, name: impl Into<String>) -> Self {
        Self {
            kind,
            name: name.into(),
            parent_uuid: None,
            duration_ms: None,
            metadata: "{}".to_string(),
        }
    }

    pub fn in_folder(mut self, parent_uuid: Option<FolderId>) -> Self {
        self.parent_uuid = parent_uuid;
        self
    }

    pub fn with_duration(mut self, duration_ms: i64) -> Self {
        self.duration_ms = Some(duration_ms);
        self
    }

    pub fn with_metadata(mut self, metadata: impl Into<String>) -> Self {
        self.metadata = metadata.into();
        self
    }
}

/// Input model for appending one layer to a composition.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct NewLayer {
    pub name: String,
    pub source_uuid: Option<ItemId>,
    pub enabled: bool,
    pub is_null: bool,
    pub start_ms: i64,
    pub in_ms: i64,
    pub out_ms: i64,
}

impl NewLayer {
    /// Enabled layer sourcing one item.
    pub fn sourced(name: impl Into<String>, source_uuid: ItemId) -> Self {
        Self {
            name: name.into(),
            source_uuid: Some(source_uuid),
            enabled: true,
            ..Self::default()
        }
    }

    /// Enabled null layer.
    pub fn null(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            enabled: true,
            is_null: true,
            ..Self::default()
        }
    }

    pub fn disabled(mut self) -> Self {
        self.enabled = false;
        self
    }

    pub fn timed(mut self, start_ms: i64, in_ms: i64, out_ms: i64) -> Self {
        self.start_ms = start_ms;
        self.in_ms = in_ms;
        self.out_ms = out_ms;
        self
    }
}

/// How a layer's timing reacts to a source replacement.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SourceTiming {
    /// Keep start/in/out points untouched.
    Preserve,
    /// Stretch the out point to `in_ms + source.duration_ms`.
    FitToSource,
}
