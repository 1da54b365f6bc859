//! Entity schema migrations.
//!
//! # Responsibility
//! - Declare the entity and association tables as ordered, named SQL steps.
//! - Upgrade a connection to the latest step inside one transaction.
//!
//! # Invariants
//! - `version` values are strictly increasing, starting at 1.
//! - The applied version is mirrored to `PRAGMA user_version` after each step.
//! - A database newer than [`latest_version`] is never touched.

use crate::db::{DbError, DbResult};
use log::{debug, error, info};
use rusqlite::Connection;

#[derive(Debug, Clone, Copy)]
struct Migration {
    version: u32,
    name: &'static str,
    sql: &'static str,
}

const MIGRATIONS: &[Migration] = &[
    Migration {
        version: 1,
        name: "entities",
        sql: include_str!("0001_entities.sql"),
    },
    Migration {
        version: 2,
        name: "person_collections",
        sql: include_str!("0002_person_collections.sql"),
    },
];

/// Latest schema version this build can produce.
pub fn latest_version() -> u32 {
    MIGRATIONS.last().map_or(0, |migration| migration.version)
}

/// Applies every step newer than the connection's `user_version`.
///
/// All pending steps share one transaction, so a failure leaves the schema
/// at the version it had before the call.
pub fn apply_migrations(conn: &mut Connection) -> DbResult<()> {
    let from_version = current_user_version(conn)?;
    let latest = latest_version();

    if from_version > latest {
        return Err(DbError::UnsupportedSchemaVersion {
            db_version: from_version,
            latest_supported: latest,
        });
    }
    if from_version == latest {
        return Ok(());
    }

    let tx = conn.transaction()?;
    for migration in MIGRATIONS
        .iter()
        .filter(|migration| migration.version > from_version)
    {
        let step = format!(
            "{}\nPRAGMA user_version = {};",
            migration.sql, migration.version
        );
        if let Err(source) = tx.execute_batch(&step) {
            error!(
                "event=db_migrate module=db status=error version={} name={} error={source}",
                migration.version, migration.name
            );
            return Err(DbError::Migration {
                version: migration.version,
                name: migration.name,
                source,
            });
        }
        debug!(
            "event=db_migrate_step module=db status=ok version={} name={}",
            migration.version, migration.name
        );
    }
    tx.commit()?;

    info!("event=db_migrate module=db status=ok from_version={from_version} to_version={latest}");
    Ok(())
}

/// Schema version recorded in `PRAGMA user_version`.
pub fn current_user_version(conn: &Connection) -> DbResult<u32> {
    let version = conn.query_row("PRAGMA user_version;", [], |row| row.get::<_, u32>(0))?;
    Ok(version)
}
