//! Schema migrations for the project store.
//!
//! # Responsibility
//! - Bring a project database up to the schema this build understands.
//!
//! # Invariants
//! - Versions in [`MIGRATIONS`] increase strictly; `PRAGMA user_version`
//!   holds the last applied one.
//! - All pending steps commit together or not at all.
//! - A database newer than this build is refused, never downgraded.

use crate::db::{DbError, DbResult};
use log::{debug, info};
use rusqlite::{Connection, Transaction};

/// One additive schema step.
struct Migration {
    version: u32,
    name: &'static str,
    sql: &'static str,
}

impl Migration {
    fn apply(&self, tx: &Transaction<'_>) -> rusqlite::Result<()> {
        tx.execute_batch(self.sql)?;
        tx.pragma_update(None, "user_version", self.version)
    }
}

const MIGRATIONS: &[Migration] = &[
    Migration {
        version: 1,
        name: "folders_and_items",
        sql: include_str!("0001_init.sql"),
    },
    Migration {
        version: 2,
        name: "layers",
        sql: include_str!("0002_layers.sql"),
    },
];

/// Schema version written by the last known migration.
pub fn latest_version() -> u32 {
    MIGRATIONS.last().map_or(0, |migration| migration.version)
}

/// Applies every migration newer than the database's `user_version`.
pub fn apply_migrations(conn: &mut Connection) -> DbResult<()> {
    let db_version: u32 = conn.pragma_query_value(None, "user_version", |row| row.get(0))?;
    let latest = latest_version();
    if db_version > latest {
        return Err(DbError::UnsupportedSchemaVersion {
            db_version,
            latest_supported: latest,
        });
    }

    let pending: Vec<&Migration> = MIGRATIONS
        .iter()
        .filter(|migration| migration.version > db_version)
        .collect();
    if pending.is_empty() {
        debug!("event=db_migrate module=db status=up_to_date version={db_version}");
        return Ok(());
    }

    let tx = conn.transaction()?;
    for migration in &pending {
        migration.apply(&tx)?;
        debug!(
            "event=db_migrate module=db status=applied version={} name={}",
            migration.version, migration.name
        );
    }
    tx.commit()?;

    info!(
        "event=db_migrate module=db status=ok from={db_version} to={latest} applied={}",
        pending.len()
    );
    Ok(())
}
