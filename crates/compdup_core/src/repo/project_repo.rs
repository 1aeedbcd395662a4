//! Host project repository contracts and SQLite implementation.
//!
//! # Responsibility
//! - Provide the host primitives the duplication engine consumes: lookup,
//!   folder creation, shallow duplicate, re-parent, rename, source replacement.
//! - Keep SQL details and ordering behavior inside repository boundary.
//!
//! # Invariants
//! - Child listing is deterministic: `sort_order ASC, rowid ASC`.
//! - `duplicate_item` never touches the source rows.
//! - Null layers never receive a source.

use crate::db::migrations::latest_version;
use crate::db::DbError;
use crate::model::item::{
    Folder, FolderId, ItemId, ItemKind, Layer, LayerId, NewItem, NewLayer, ProjectItem,
    SourceTiming, ROOT_FOLDER_NAME,
};
use crate::repo::name_index::NameIndex;
use rusqlite::{params, Connection, OptionalExtension, Row, Transaction, TransactionBehavior};
use std::error::Error;
use std::fmt::{Display, Formatter};
use uuid::Uuid;

const ITEM_SELECT_SQL: &str = "SELECT
    item_uuid,
    kind,
    parent_uuid,
    name,
    duration_ms,
    metadata,
    sort_order,
    created_at,
    updated_at
FROM project_items";

const FOLDER_SELECT_SQL: &str = "SELECT
    folder_uuid,
    parent_uuid,
    name,
    sort_order,
    created_at,
    updated_at
FROM folders";

const LAYER_SELECT_SQL: &str = "SELECT
    layer_uuid,
    comp_uuid,
    layer_index,
    name,
    enabled,
    is_null,
    source_uuid,
    start_ms,
    in_ms,
    out_ms
FROM layers";

/// Result type used by host project repository operations.
pub type ProjectRepoResult<T> = Result<T, ProjectRepoError>;

/// Errors from host project repository operations.
#[derive(Debug)]
pub enum ProjectRepoError {
    /// Underlying SQLite/bootstrap error.
    Db(DbError),
    /// Target item does not exist.
    ItemNotFound(ItemId),
    /// Target folder does not exist.
    FolderNotFound(FolderId),
    /// Target layer does not exist.
    LayerNotFound(LayerId),
    /// Layer-level operation requires a composition owner.
    NotComposition(ItemId),
    /// Source replacement attempted on a null layer.
    NullLayer(LayerId),
    /// Connection schema is not at the expected migrated version.
    UninitializedConnection {
        expected_version: u32,
        actual_version: u32,
    },
    /// Required table is missing.
    MissingRequiredTable(&'static str),
    /// Required column is missing from expected table.
    MissingRequiredColumn {
        table: &'static str,
        column: &'static str,
    },
    /// Persisted data cannot be converted to valid read model.
    InvalidData(String),
}

impl Display for ProjectRepoError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Db(err) => write!(f, "{err}"),
            Self::ItemNotFound(id) => write!(f, "project item not found: {id}"),
            Self::FolderNotFound(id) => write!(f, "folder not found: {id}"),
            Self::LayerNotFound(id) => write!(f, "layer not found: {id}"),
            Self::NotComposition(id) => write!(f, "project item is not a composition: {id}"),
            Self::NullLayer(id) => write!(f, "null layer cannot carry a source: {id}"),
            Self::UninitializedConnection {
                expected_version,
                actual_version,
            } => write!(
                f,
                "project repository requires schema version {expected_version}, got {actual_version}"
            ),
            Self::MissingRequiredTable(table) => {
                write!(f, "project repository requires table `{table}`")
            }
            Self::MissingRequiredColumn { table, column } => write!(
                f,
                "project repository requires column `{column}` in table `{table}`"
            ),
            Self::InvalidData(message) => write!(f, "invalid project data: {message}"),
        }
    }
}

impl Error for ProjectRepoError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Db(err) => Some(err),
            _ => None,
        }
    }
}

impl From<DbError> for ProjectRepoError {
    fn from(value: DbError) -> Self {
        Self::Db(value)
    }
}

impl From<rusqlite::Error> for ProjectRepoError {
    fn from(value: rusqlite::Error) -> Self {
        Self::Db(DbError::Sqlite(value))
    }
}

/// Host project primitives consumed by services and the duplication engine.
pub trait ProjectRepository: NameIndex {
    /// Loads one item by id.
    fn get_item(&self, item_uuid: ItemId) -> ProjectRepoResult<Option<ProjectItem>>;
    /// Loads one folder by id.
    fn get_folder(&self, folder_uuid: FolderId) -> ProjectRepoResult<Option<Folder>>;
    /// Lists every item in creation order.
    fn list_items(&self) -> ProjectRepoResult<Vec<ProjectItem>>;
    /// Lists every folder in creation order.
    fn list_folders(&self) -> ProjectRepoResult<Vec<Folder>>;
    /// Lists items whose immediate parent folder carries this name.
    ///
    /// Flat scan: nested folders are not descended into.
    fn list_items_in_folder_named(&self, folder_name: &str)
        -> ProjectRepoResult<Vec<ProjectItem>>;
    /// Creates one root-level folder.
    fn create_folder(&self, name: &str) -> ProjectRepoResult<Folder>;
    /// Moves one folder under another folder (`None` = root).
    fn set_folder_parent(
        &self,
        folder_uuid: FolderId,
        parent_uuid: Option<FolderId>,
    ) -> ProjectRepoResult<()>;
    /// Creates one item.
    fn create_item(&self, item: &NewItem) -> ProjectRepoResult<ProjectItem>;
    /// Host-native shallow duplicate; the copy lands at root.
    fn duplicate_item(&self, item_uuid: ItemId) -> ProjectRepoResult<ProjectItem>;
    /// Moves one item into a folder (`None` = root).
    fn set_item_parent(
        &self,
        item_uuid: ItemId,
        folder_uuid: Option<FolderId>,
    ) -> ProjectRepoResult<()>;
    /// Renames one item.
    fn rename_item(&self, item_uuid: ItemId, name: &str) -> ProjectRepoResult<()>;
    /// Lists the layer stack of one composition in layer order.
    fn list_layers(&self, comp_uuid: ItemId) -> ProjectRepoResult<Vec<Layer>>;
    /// Loads one layer by id.
    fn get_layer(&self, layer_uuid: LayerId) -> ProjectRepoResult<Option<Layer>>;
    /// Appends one layer to a composition.
    fn add_layer(&self, comp_uuid: ItemId, layer: &NewLayer) -> ProjectRepoResult<Layer>;
    /// Points one layer at another source item.
    fn replace_layer_source(
        &self,
        layer_uuid: LayerId,
        source_uuid: ItemId,
        timing: SourceTiming,
    ) -> ProjectRepoResult<()>;
}

/// SQLite-backed host project repository.
pub struct SqliteProjectRepository<'conn> {
    conn: &'conn Connection,
}

impl<'conn> SqliteProjectRepository<'conn> {
    /// Creates repository from migrated connection.
    pub fn try_new(conn: &'conn Connection) -> ProjectRepoResult<Self> {
        ensure_project_connection_ready(conn)?;
        Ok(Self { conn })
    }
}

impl NameIndex for SqliteProjectRepository<'_> {
    fn find_item_by_name(&self, name: &str) -> ProjectRepoResult<Option<ProjectItem>> {
        let sql = format!("{ITEM_SELECT_SQL} WHERE name = ?1 ORDER BY rowid ASC LIMIT 1;");
        query_optional(self.conn, &sql, params![name], parse_item_row)
    }

    fn find_item_id_by_name(&self, name: &str) -> ProjectRepoResult<Option<ItemId>> {
        let value: Option<String> = self
            .conn
            .query_row(
                "SELECT item_uuid
                 FROM project_items
                 WHERE name = ?1
                 ORDER BY rowid ASC
                 LIMIT 1;",
                [name],
                |row| row.get(0),
            )
            .optional()?;
        value
            .map(|text| parse_uuid(&text, "project_items.item_uuid"))
            .transpose()
    }

    fn find_item_by_name_in(
        &self,
        folder_uuid: Option<FolderId>,
        name: &str,
    ) -> ProjectRepoResult<Option<ProjectItem>> {
        match folder_uuid {
            Some(folder_uuid) => {
                let sql = format!(
                    "{ITEM_SELECT_SQL} WHERE parent_uuid = ?1 AND name = ?2 ORDER BY rowid ASC LIMIT 1;"
                );
                query_optional(
                    self.conn,
                    &sql,
                    params![folder_uuid.to_string(), name],
                    parse_item_row,
                )
            }
            None => {
                let sql = format!(
                    "{ITEM_SELECT_SQL} WHERE parent_uuid IS NULL AND name = ?1 ORDER BY rowid ASC LIMIT 1;"
                );
                query_optional(self.conn, &sql, params![name], parse_item_row)
            }
        }
    }

    fn find_folder_by_name(&self, name: &str) -> ProjectRepoResult<Option<Folder>> {
        let sql = format!("{FOLDER_SELECT_SQL} WHERE name = ?1 ORDER BY rowid ASC LIMIT 1;");
        query_optional(self.conn, &sql, params![name], parse_folder_row)
    }
}

impl ProjectRepository for SqliteProjectRepository<'_> {
    fn get_item(&self, item_uuid: ItemId) -> ProjectRepoResult<Option<ProjectItem>> {
        let sql = format!("{ITEM_SELECT_SQL} WHERE item_uuid = ?1;");
        query_optional(
            self.conn,
            &sql,
            params![item_uuid.to_string()],
            parse_item_row,
        )
    }

    fn get_folder(&self, folder_uuid: FolderId) -> ProjectRepoResult<Option<Folder>> {
        let sql = format!("{FOLDER_SELECT_SQL} WHERE folder_uuid = ?1;");
        query_optional(
            self.conn,
            &sql,
            params![folder_uuid.to_string()],
            parse_folder_row,
        )
    }

    fn list_items(&self) -> ProjectRepoResult<Vec<ProjectItem>> {
        let sql = format!("{ITEM_SELECT_SQL} ORDER BY rowid ASC;");
        query_all(self.conn, &sql, params![], parse_item_row)
    }

    fn list_folders(&self) -> ProjectRepoResult<Vec<Folder>> {
        let sql = format!("{FOLDER_SELECT_SQL} ORDER BY rowid ASC;");
        query_all(self.conn, &sql, params![], parse_folder_row)
    }

    fn list_items_in_folder_named(
        &self,
        folder_name: &str,
    ) -> ProjectRepoResult<Vec<ProjectItem>> {
        let mut items = Vec::new();
        if folder_name == ROOT_FOLDER_NAME {
            let sql = format!(
                "{ITEM_SELECT_SQL} WHERE parent_uuid IS NULL ORDER BY sort_order ASC, rowid ASC;"
            );
            items.extend(query_all(self.conn, &sql, params![], parse_item_row)?);
        }

        let sql = "SELECT
                i.item_uuid AS item_uuid,
                i.kind AS kind,
                i.parent_uuid AS parent_uuid,
                i.name AS name,
                i.duration_ms AS duration_ms,
                i.metadata AS metadata,
                i.sort_order AS sort_order,
                i.created_at AS created_at,
                i.updated_at AS updated_at
             FROM project_items i
             INNER JOIN folders f ON f.folder_uuid = i.parent_uuid
             WHERE f.name = ?1
             ORDER BY f.rowid ASC, i.sort_order ASC, i.rowid ASC;";
        items.extend(query_all(
            self.conn,
            sql,
            params![folder_name],
            parse_item_row,
        )?);
        Ok(items)
    }

    fn create_folder(&self, name: &str) -> ProjectRepoResult<Folder> {
        let folder_uuid = Uuid::new_v4();
        let sort_order = next_folder_sort_order(self.conn, None)?;
        self.conn.execute(
            "INSERT INTO folders (folder_uuid, parent_uuid, name, sort_order)
             VALUES (?1, NULL, ?2, ?3);",
            params![folder_uuid.to_string(), name, sort_order],
        )?;
        load_required_folder(self.conn, folder_uuid)
    }

    fn set_folder_parent(
        &self,
        folder_uuid: FolderId,
        parent_uuid: Option<FolderId>,
    ) -> ProjectRepoResult<()> {
        if let Some(parent_uuid) = parent_uuid {
            load_required_folder(self.conn, parent_uuid)?;
        }
        let sort_order = next_folder_sort_order(self.conn, parent_uuid)?;
        let changed = self.conn.execute(
            "UPDATE folders
             SET parent_uuid = ?2,
                 sort_order = ?3,
                 updated_at = (strftime('%s', 'now') * 1000)
             WHERE folder_uuid = ?1;",
            params![
                folder_uuid.to_string(),
                parent_uuid.map(|value| value.to_string()),
                sort_order,
            ],
        )?;
        if changed == 0 {
            return Err(ProjectRepoError::FolderNotFound(folder_uuid));
        }
        Ok(())
    }

    fn create_item(&self, item: &NewItem) -> ProjectRepoResult<ProjectItem> {
        if let Some(parent_uuid) = item.parent_uuid {
            load_required_folder(self.conn, parent_uuid)?;
        }
        let item_uuid = Uuid::new_v4();
        let sort_order = next_item_sort_order(self.conn, item.parent_uuid)?;
        self.conn.execute(
            "INSERT INTO project_items (
                item_uuid,
                kind,
                parent_uuid,
                name,
                duration_ms,
                metadata,
                sort_order
            ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7);",
            params![
                item_uuid.to_string(),
                item.kind.as_storage_str(),
                item.parent_uuid.map(|value| value.to_string()),
                item.name,
                item.duration_ms,
                item.metadata,
                sort_order,
            ],
        )?;
        load_required_item(self.conn, item_uuid)
    }

    fn duplicate_item(&self, item_uuid: ItemId) -> ProjectRepoResult<ProjectItem> {
        let source = load_required_item(self.conn, item_uuid)?;
        let source_layers = if source.is_composition() {
            self.list_layers(item_uuid)?
        } else {
            Vec::new()
        };

        let tx = Transaction::new_unchecked(self.conn, TransactionBehavior::Immediate)?;
        let copy_uuid = Uuid::new_v4();
        let sort_order = next_item_sort_order(&tx, None)?;
        tx.execute(
            "INSERT INTO project_items (
                item_uuid,
                kind,
                parent_uuid,
                name,
                duration_ms,
                metadata,
                sort_order
            ) VALUES (?1, ?2, NULL, ?3, ?4, ?5, ?6);",
            params![
                copy_uuid.to_string(),
                source.kind.as_storage_str(),
                source.name,
                source.duration_ms,
                source.metadata,
                sort_order,
            ],
        )?;

        for layer in &source_layers {
            tx.execute(
                "INSERT INTO layers (
                    layer_uuid,
                    comp_uuid,
                    layer_index,
                    name,
                    enabled,
                    is_null,
                    source_uuid,
                    start_ms,
                    in_ms,
                    out_ms
                ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10);",
                params![
                    Uuid::new_v4().to_string(),
                    copy_uuid.to_string(),
                    layer.layer_index,
                    layer.name,
                    layer.enabled,
                    layer.is_null,
                    layer.source_uuid.map(|value| value.to_string()),
                    layer.start_ms,
                    layer.in_ms,
                    layer.out_ms,
                ],
            )?;
        }

        tx.commit()?;
        load_required_item(self.conn, copy_uuid)
    }

    fn set_item_parent(
        &self,
        item_uuid: ItemId,
        folder_uuid: Option<FolderId>,
    ) -> ProjectRepoResult<()> {
        if let Some(folder_uuid) = folder_uuid {
            load_required_folder(self.conn, folder_uuid)?;
        }
        let sort_order = next_item_sort_order(self.conn, folder_uuid)?;
        let changed = self.conn.execute(
            "UPDATE project_items
             SET parent_uuid = ?2,
                 sort_order = ?3,
                 updated_at = (strftime('%s', 'now') * 1000)
             WHERE item_uuid = ?1;",
            params![
                item_uuid.to_string(),
                folder_uuid.map(|value| value.to_string()),
                sort_order,
            ],
        )?;
        if changed == 0 {
            return Err(ProjectRepoError::ItemNotFound(item_uuid));
        }
        Ok(())
    }

    fn rename_item(&self, item_uuid: ItemId, name: &str) -> ProjectRepoResult<()> {
        let changed = self.conn.execute(
            "UPDATE project_items
             SET name = ?2,
                 updated_at = (strftime('%s', 'now') * 1000)
             WHERE item_uuid = ?1;",
            params![item_uuid.to_string(), name],
        )?;
        if changed == 0 {
            return Err(ProjectRepoError::ItemNotFound(item_uuid));
        }
        Ok(())
    }

    fn list_layers(&self, comp_uuid: ItemId) -> ProjectRepoResult<Vec<Layer>> {
        let sql = format!("{LAYER_SELECT_SQL} WHERE comp_uuid = ?1 ORDER BY layer_index ASC;");
        query_all(
            self.conn,
            &sql,
            params![comp_uuid.to_string()],
            parse_layer_row,
        )
    }

    fn get_layer(&self, layer_uuid: LayerId) -> ProjectRepoResult<Option<Layer>> {
        let sql = format!("{LAYER_SELECT_SQL} WHERE layer_uuid = ?1;");
        query_optional(
            self.conn,
            &sql,
            params![layer_uuid.to_string()],
            parse_layer_row,
        )
    }

    fn add_layer(&self, comp_uuid: ItemId, layer: &NewLayer) -> ProjectRepoResult<Layer> {
        let owner = load_required_item(self.conn, comp_uuid)?;
        if !owner.is_composition() {
            return Err(ProjectRepoError::NotComposition(comp_uuid));
        }

        let layer_uuid = Uuid::new_v4();
        let layer_index: i64 = self.conn.query_row(
            "SELECT COALESCE(MAX(layer_index), 0) + 1
             FROM layers
             WHERE comp_uuid = ?1;",
            [comp_uuid.to_string()],
            |row| row.get(0),
        )?;
        self.conn.execute(
            "INSERT INTO layers (
                layer_uuid,
                comp_uuid,
                layer_index,
                name,
                enabled,
                is_null,
                source_uuid,
                start_ms,
                in_ms,
                out_ms
            ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10);",
            params![
                layer_uuid.to_string(),
                comp_uuid.to_string(),
                layer_index,
                layer.name,
                layer.enabled,
                layer.is_null,
                layer.source_uuid.map(|value| value.to_string()),
                layer.start_ms,
                layer.in_ms,
                layer.out_ms,
            ],
        )?;
        self.get_layer(layer_uuid)?
            .ok_or(ProjectRepoError::LayerNotFound(layer_uuid))
    }

    fn replace_layer_source(
        &self,
        layer_uuid: LayerId,
        source_uuid: ItemId,
        timing: SourceTiming,
    ) -> ProjectRepoResult<()> {
        let layer = self
            .get_layer(layer_uuid)?
            .ok_or(ProjectRepoError::LayerNotFound(layer_uuid))?;
        if layer.is_null {
            return Err(ProjectRepoError::NullLayer(layer_uuid));
        }
        let source = load_required_item(self.conn, source_uuid)?;

        let out_ms = match (timing, source.duration_ms) {
            (SourceTiming::FitToSource, Some(duration_ms)) => layer.in_ms + duration_ms,
            _ => layer.out_ms,
        };
        self.conn.execute(
            "UPDATE layers
             SET source_uuid = ?2,
                 out_ms = ?3
             WHERE layer_uuid = ?1;",
            params![layer_uuid.to_string(), source_uuid.to_string(), out_ms],
        )?;
        Ok(())
    }
}

fn query_optional<T>(
    conn: &Connection,
    sql: &str,
    params: impl rusqlite::Params,
    parse: fn(&Row<'_>) -> ProjectRepoResult<T>,
) -> ProjectRepoResult<Option<T>> {
    let mut stmt = conn.prepare(sql)?;
    let mut rows = stmt.query(params)?;
    if let Some(row) = rows.next()? {
        return Ok(Some(parse(row)?));
    }
    Ok(None)
}

fn query_all<T>(
    conn: &Connection,
    sql: &str,
    params: impl rusqlite::Params,
    parse: fn(&Row<'_>) -> ProjectRepoResult<T>,
) -> ProjectRepoResult<Vec<T>> {
    let mut stmt = conn.prepare(sql)?;
    let mut rows = stmt.query(params)?;
    let mut result = Vec::new();
    while let Some(row) = rows.next()? {
        result.push(parse(row)?);
    }
    Ok(result)
}

fn load_required_item(conn: &Connection, item_uuid: ItemId) -> ProjectRepoResult<ProjectItem> {
    let sql = format!("{ITEM_SELECT_SQL} WHERE item_uuid = ?1;");
    query_optional(conn, &sql, params![item_uuid.to_string()], parse_item_row)?
        .ok_or(ProjectRepoError::ItemNotFound(item_uuid))
}

fn load_required_folder(conn: &Connection, folder_uuid: FolderId) -> ProjectRepoResult<Folder> {
    let sql = format!("{FOLDER_SELECT_SQL} WHERE folder_uuid = ?1;");
    query_optional(
        conn,
        &sql,
        params![folder_uuid.to_string()],
        parse_folder_row,
    )?
    .ok_or(ProjectRepoError::FolderNotFound(folder_uuid))
}

fn next_item_sort_order(conn: &Connection, parent_uuid: Option<FolderId>) -> ProjectRepoResult<i64> {
    let next = match parent_uuid {
        Some(parent_uuid) => conn.query_row(
            "SELECT COALESCE(MAX(sort_order), -1) + 1
             FROM project_items
             WHERE parent_uuid = ?1;",
            [parent_uuid.to_string()],
            |row| row.get(0),
        )?,
        None => conn.query_row(
            "SELECT COALESCE(MAX(sort_order), -1) + 1
             FROM project_items
             WHERE parent_uuid IS NULL;",
            [],
            |row| row.get(0),
        )?,
    };
    Ok(next)
}

fn next_folder_sort_order(
    conn: &Connection,
    parent_uuid: Option<FolderId>,
) -> ProjectRepoResult<i64> {
    let next = match parent_uuid {
        Some(parent_uuid) => conn.query_row(
            "SELECT COALESCE(MAX(sort_order), -1) + 1
             FROM folders
             WHERE parent_uuid = ?1;",
            [parent_uuid.to_string()],
            |row| row.get(0),
        )?,
        None => conn.query_row(
            "SELECT COALESCE(MAX(sort_order), -1) + 1
             FROM folders
             WHERE parent_uuid IS NULL;",
            [],
            |row| row.get(0),
        )?,
    };
    Ok(next)
}

fn parse_item_row(row: &Row<'_>) -> ProjectRepoResult<ProjectItem> {
    let item_uuid_text: String = row.get("item_uuid")?;
    let kind_text: String = row.get("kind")?;
    let kind = ItemKind::from_storage_str(&kind_text).ok_or_else(|| {
        ProjectRepoError::InvalidData(format!(
            "invalid item kind `{kind_text}` in project_items.kind"
        ))
    })?;

    Ok(ProjectItem {
        item_uuid: parse_uuid(&item_uuid_text, "project_items.item_uuid")?,
        kind,
        parent_uuid: parse_optional_uuid(row, "parent_uuid", "project_items.parent_uuid")?,
        name: row.get("name")?,
        duration_ms: row.get("duration_ms")?,
        metadata: row.get("metadata")?,
        sort_order: row.get("sort_order")?,
        created_at: row.get("created_at")?,
        updated_at: row.get("updated_at")?,
    })
}

fn parse_folder_row(row: &Row<'_>) -> ProjectRepoResult<Folder> {
    let folder_uuid_text: String = row.get("folder_uuid")?;
    Ok(Folder {
        folder_uuid: parse_uuid(&folder_uuid_text, "folders.folder_uuid")?,
        parent_uuid: parse_optional_uuid(row, "parent_uuid", "folders.parent_uuid")?,
        name: row.get("name")?,
        sort_order: row.get("sort_order")?,
        created_at: row.get("created_at")?,
        updated_at: row.get("updated_at")?,
    })
}

fn parse_layer_row(row: &Row<'_>) -> ProjectRepoResult<Layer> {
    let layer_uuid_text: String = row.get("layer_uuid")?;
    let comp_uuid_text: String = row.get("comp_uuid")?;
    Ok(Layer {
        layer_uuid: parse_uuid(&layer_uuid_text, "layers.layer_uuid")?,
        comp_uuid: parse_uuid(&comp_uuid_text, "layers.comp_uuid")?,
        layer_index: row.get("layer_index")?,
        name: row.get("name")?,
        enabled: parse_flag(row.get("enabled")?, "layers.enabled")?,
        is_null: parse_flag(row.get("is_null")?, "layers.is_null")?,
        source_uuid: parse_optional_uuid(row, "source_uuid", "layers.source_uuid")?,
        start_ms: row.get("start_ms")?,
        in_ms: row.get("in_ms")?,
        out_ms: row.get("out_ms")?,
    })
}

fn parse_optional_uuid(
    row: &Row<'_>,
    name: &str,
    column: &'static str,
) -> ProjectRepoResult<Option<Uuid>> {
    row.get::<_, Option<String>>(name)?
        .map(|value| parse_uuid(&value, column))
        .transpose()
}

fn parse_flag(value: i64, column: &'static str) -> ProjectRepoResult<bool> {
    match value {
        0 => Ok(false),
        1 => Ok(true),
        other => Err(ProjectRepoError::InvalidData(format!(
            "invalid flag value `{other}` in {column}"
        ))),
    }
}

fn parse_uuid(value: &str, column: &'static str) -> ProjectRepoResult<Uuid> {
    Uuid::parse_str(value)
        .map_err(|_| ProjectRepoError::InvalidData(format!("invalid uuid `{value}` in {column}")))
}

fn ensure_project_connection_ready(conn: &Connection) -> ProjectRepoResult<()> {
    let expected_version = latest_version();
    let actual_version: u32 = conn.query_row("PRAGMA user_version;", [], |row| row.get(0))?;
    if actual_version != expected_version {
        return Err(ProjectRepoError::UninitializedConnection {
            expected_version,
            actual_version,
        });
    }

    const REQUIRED: &[(&str, &[&str])] = &[
        (
            "folders",
            &["folder_uuid", "parent_uuid", "name", "sort_order"],
        ),
        (
            "project_items",
            &[
                "item_uuid",
                "kind",
                "parent_uuid",
                "name",
                "duration_ms",
                "metadata",
                "sort_order",
            ],
        ),
        (
            "layers",
            &[
                "layer_uuid",
                "comp_uuid",
                "layer_index",
                "enabled",
                "is_null",
                "source_uuid",
            ],
        ),
    ];

    for &(table, columns) in REQUIRED {
        if !table_exists(conn, table)? {
            return Err(ProjectRepoError::MissingRequiredTable(table));
        }
        for &column in columns {
            if !table_has_column(conn, table, column)? {
                return Err(ProjectRepoError::MissingRequiredColumn { table, column });
            }
        }
    }

    Ok(())
}

fn table_exists(conn: &Connection, table: &str) -> ProjectRepoResult<bool> {
    let exists: i64 = conn.query_row(
        "SELECT EXISTS(
            SELECT 1
            FROM sqlite_master
            WHERE type = 'table' AND name = ?1
        );",
        [table],
        |row| row.get(0),
    )?;
    Ok(exists == 1)
}

fn table_has_column(conn: &Connection, table: &str, column: &str) -> ProjectRepoResult<bool> {
    let mut stmt = conn.prepare(&format!("PRAGMA table_info({table});"))?;
    let mut rows = stmt.query([])?;
    while let Some(row) = rows.next()? {
        let current: String = row.get(1)?;
        if current == column {
            return Ok(true);
        }
    }
    Ok(false)
}
