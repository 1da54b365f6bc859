//! Repository layer abstractions and persistence implementations.
//!
//! # Responsibility
//! - Define per-entity data access contracts and their SQLite implementations.
//! - Expose the [`Entity`] seam the session uses to persist and load any entity.
//!
//! # Invariants
//! - Identities are assigned by SQLite on insert and written back exactly once.
//! - Associations are only stored for records that already have an identity.
//! - Repository APIs return semantic errors (`NotFound`, `AlreadyPersisted`)
//!   in addition to DB transport errors.

use crate::config::ConfigError;
use crate::db::migrations::{current_user_version, latest_version};
use crate::db::DbError;
use crate::model::EntityId;
use rusqlite::types::Value;
use rusqlite::Connection;
use std::error::Error;
use std::fmt::{Display, Formatter};

pub mod address_repo;
pub mod bookmark_repo;
pub mod person_repo;
pub mod pet_repo;

pub type RepoResult<T> = Result<T, RepoError>;

/// Repository error shared by all entity repositories.
#[derive(Debug)]
pub enum RepoError {
    Db(DbError),
    /// A persistence unit was configured with invalid values.
    InvalidConfig(ConfigError),
    NotFound {
        entity: &'static str,
        id: EntityId,
    },
    /// The record already carries an identity and cannot be inserted again.
    AlreadyPersisted {
        entity: &'static str,
        id: EntityId,
    },
    /// An update or delete was requested for a record without identity.
    NotPersisted(&'static str),
    /// An owner references an associated record that has no identity yet.
    TransientReference {
        owner: &'static str,
        association: &'static str,
    },
    InvalidData(String),
    UninitializedConnection {
        expected_version: u32,
        actual_version: u32,
    },
    MissingRequiredTable(&'static str),
    MissingRequiredColumn {
        table: &'static str,
        column: &'static str,
    },
}

impl Display for RepoError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Db(err) => write!(f, "{err}"),
            Self::InvalidConfig(err) => write!(f, "invalid configuration: {err}"),
            Self::NotFound { entity, id } => write!(f, "{entity} not found: {id}"),
            Self::AlreadyPersisted { entity, id } => {
                write!(f, "{entity} already persisted with id {id}")
            }
            Self::NotPersisted(entity) => write!(f, "{entity} has no identity yet"),
            Self::TransientReference { owner, association } => write!(
                f,
                "{owner}.{association} references a record that has not been persisted"
            ),
            Self::InvalidData(message) => write!(f, "invalid persisted data: {message}"),
            Self::UninitializedConnection {
                expected_version,
                actual_version,
            } => write!(
                f,
                "connection schema version {actual_version} does not match required {expected_version}"
            ),
            Self::MissingRequiredTable(table) => write!(f, "missing required table `{table}`"),
            Self::MissingRequiredColumn { table, column } => {
                write!(f, "missing required column `{table}.{column}`")
            }
        }
    }
}

impl Error for RepoError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Db(err) => Some(err),
            Self::InvalidConfig(err) => Some(err),
            _ => None,
        }
    }
}

impl From<DbError> for RepoError {
    fn from(value: DbError) -> Self {
        Self::Db(value)
    }
}

impl From<ConfigError> for RepoError {
    fn from(value: ConfigError) -> Self {
        Self::InvalidConfig(value)
    }
}

impl From<rusqlite::Error> for RepoError {
    fn from(value: rusqlite::Error) -> Self {
        Self::Db(DbError::Sqlite(value))
    }
}

/// A persistable record type.
///
/// Implemented by every model type so that sessions and queries can persist
/// and hydrate entities without knowing their concrete repository.
pub trait Entity: Sized {
    /// Entity name used in diagnostics and named-query registration.
    const NAME: &'static str;
    /// Root table holding the entity identity.
    const TABLE: &'static str;

    /// Returns the assigned identity, `None` while transient.
    fn id(&self) -> Option<EntityId>;

    /// Inserts the record and writes the generated identity back into it.
    fn insert(conn: &Connection, entity: &mut Self) -> RepoResult<EntityId>;

    /// Loads one record by identity with its associations resolved.
    fn load(conn: &Connection, id: EntityId) -> RepoResult<Option<Self>>;
}

/// Pagination options for list operations. Results are ordered by id.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ListQuery {
    pub limit: Option<u32>,
    pub offset: u32,
}

/// Expected table shape checked before a repository accepts a connection.
#[derive(Debug, Clone, Copy)]
pub(crate) struct TableSchema {
    pub table: &'static str,
    pub columns: &'static [&'static str],
}

pub(crate) const ADDRESSES: TableSchema = TableSchema {
    table: "addresses",
    columns: &["id", "city", "street"],
};

pub(crate) const BOOKMARKS: TableSchema = TableSchema {
    table: "bookmarks",
    columns: &["id", "title", "url"],
};

pub(crate) const PETS: TableSchema = TableSchema {
    table: "pets",
    columns: &["id", "name"],
};

pub(crate) const PERSONS: TableSchema = TableSchema {
    table: "persons",
    columns: &["id", "nickname", "email", "sex", "birthday", "address_id"],
};

pub(crate) const PERSON_HOBBIES: TableSchema = TableSchema {
    table: "person_hobbies",
    columns: &["person_id", "position", "hobby"],
};

pub(crate) const PERSON_BOOKMARKS: TableSchema = TableSchema {
    table: "person_bookmarks",
    columns: &["person_id", "bookmark_id", "position"],
};

pub(crate) const PERSON_PETS: TableSchema = TableSchema {
    table: "person_pets",
    columns: &["person_id", "pet_id", "position"],
};

/// Every table the schema defines, in migration order.
pub(crate) const ALL_TABLES: &[TableSchema] = &[
    ADDRESSES,
    BOOKMARKS,
    PETS,
    PERSONS,
    PERSON_HOBBIES,
    PERSON_BOOKMARKS,
    PERSON_PETS,
];

/// Verifies that `conn` is migrated and exposes the given tables and columns.
pub(crate) fn ensure_connection_ready(conn: &Connection, tables: &[TableSchema]) -> RepoResult<()> {
    let expected_version = latest_version();
    let actual_version = current_user_version(conn)?;
    if actual_version != expected_version {
        return Err(RepoError::UninitializedConnection {
            expected_version,
            actual_version,
        });
    }

    for schema in tables {
        if !table_exists(conn, schema.table)? {
            return Err(RepoError::MissingRequiredTable(schema.table));
        }
        for &column in schema.columns {
            if !table_has_column(conn, schema.table, column)? {
                return Err(RepoError::MissingRequiredColumn {
                    table: schema.table,
                    column,
                });
            }
        }
    }

    Ok(())
}

/// Appends `ORDER BY id` and pagination clauses to a list statement.
pub(crate) fn push_pagination(sql: &mut String, bind_values: &mut Vec<Value>, query: &ListQuery) {
    sql.push_str(" ORDER BY id ASC");

    if let Some(limit) = query.limit {
        sql.push_str(" LIMIT ?");
        bind_values.push(Value::Integer(i64::from(limit)));
        if query.offset > 0 {
            sql.push_str(" OFFSET ?");
            bind_values.push(Value::Integer(i64::from(query.offset)));
        }
    } else if query.offset > 0 {
        sql.push_str(" LIMIT -1 OFFSET ?");
        bind_values.push(Value::Integer(i64::from(query.offset)));
    }
}

/// Rejects a second insert of a record that already has an identity.
pub(crate) fn ensure_transient(entity: &'static str, id: Option<EntityId>) -> RepoResult<()> {
    match id {
        Some(id) => Err(RepoError::AlreadyPersisted { entity, id }),
        None => Ok(()),
    }
}

fn table_exists(conn: &Connection, table: &str) -> RepoResult<bool> {
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

fn table_has_column(conn: &Connection, table: &str, column: &str) -> RepoResult<bool> {
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
