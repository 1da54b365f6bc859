//! Entity queries: parameterized SQL, named queries and criteria.
//!
//! # Responsibility
//! - Run identity-selecting statements and hydrate full entities from them.
//! - Report binding mistakes (unknown, unbound, out-of-range) before execution.
//!
//! # Invariants
//! - The first result column of every entity query is the root identity.
//! - Results keep statement order; repeated identities (e.g. from joins) are
//!   returned once, at their first position.

use crate::model::EntityId;
use crate::repo::{Entity, RepoError};
use rusqlite::types::{ToSqlOutput, Value};
use rusqlite::{Connection, Rows, ToSql};
use std::collections::HashSet;
use std::error::Error;
use std::fmt::{Display, Formatter};

pub mod criteria;
pub mod named;
pub mod typed_query;

pub type QueryResult<T> = Result<T, QueryError>;

/// Query construction and execution error.
#[derive(Debug)]
pub enum QueryError {
    Repo(RepoError),
    /// A named parameter was set that the statement does not declare.
    UnknownParameter(String),
    /// A positional parameter index is zero or beyond the statement's count.
    PositionOutOfRange {
        position: usize,
        parameter_count: usize,
    },
    /// A statement placeholder was left without a value.
    UnboundParameter(String),
    /// A parameter value could not be converted into an SQLite value.
    InvalidValue(String),
    UnknownNamedQuery(String),
    /// A named query was requested for a different entity than it selects.
    EntityMismatch {
        query: String,
        expected: &'static str,
        actual: &'static str,
    },
    /// The first result column is missing or not an integer identity.
    InvalidIdentityColumn,
    /// The statement returned an identity with no matching entity row.
    DanglingIdentity {
        entity: &'static str,
        id: EntityId,
    },
    NoResult,
    NonUniqueResult(usize),
}

impl Display for QueryError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Repo(err) => write!(f, "{err}"),
            Self::UnknownParameter(name) => write!(f, "unknown query parameter `{name}`"),
            Self::PositionOutOfRange {
                position,
                parameter_count,
            } => write!(
                f,
                "parameter position {position} is out of range 1..={parameter_count}"
            ),
            Self::UnboundParameter(name) => write!(f, "query parameter `{name}` is not bound"),
            Self::InvalidValue(message) => write!(f, "invalid parameter value: {message}"),
            Self::UnknownNamedQuery(name) => write!(f, "unknown named query `{name}`"),
            Self::EntityMismatch {
                query,
                expected,
                actual,
            } => write!(
                f,
                "named query `{query}` selects {expected}, not {actual}"
            ),
            Self::InvalidIdentityColumn => {
                write!(f, "first result column must be an integer entity id")
            }
            Self::DanglingIdentity { entity, id } => {
                write!(f, "query returned {entity} id {id} with no stored row")
            }
            Self::NoResult => write!(f, "query returned no result"),
            Self::NonUniqueResult(count) => {
                write!(f, "query returned {count} results where one was expected")
            }
        }
    }
}

impl Error for QueryError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Repo(err) => Some(err),
            _ => None,
        }
    }
}

impl From<RepoError> for QueryError {
    fn from(value: RepoError) -> Self {
        Self::Repo(value)
    }
}

impl From<rusqlite::Error> for QueryError {
    fn from(value: rusqlite::Error) -> Self {
        Self::Repo(RepoError::from(value))
    }
}

/// Converts a bindable value into an owned SQLite value.
pub(crate) fn to_owned_value(value: &dyn ToSql) -> Result<Value, String> {
    match value.to_sql().map_err(|err| err.to_string())? {
        ToSqlOutput::Borrowed(value_ref) => Ok(Value::from(value_ref)),
        ToSqlOutput::Owned(value) => Ok(value),
        #[allow(unreachable_patterns)]
        _ => Err("unsupported parameter kind".to_string()),
    }
}

/// Reads the identity column of every row, dropping repeats.
pub(crate) fn collect_ids(mut rows: Rows<'_>) -> QueryResult<Vec<EntityId>> {
    let mut seen = HashSet::new();
    let mut ids = Vec::new();
    while let Some(row) = rows.next()? {
        let id: EntityId = row
            .get(0)
            .map_err(|_| QueryError::InvalidIdentityColumn)?;
        if seen.insert(id) {
            ids.push(id);
        }
    }
    Ok(ids)
}

/// Loads the entity behind each identity, preserving order.
pub(crate) fn hydrate<E: Entity>(conn: &Connection, ids: &[EntityId]) -> QueryResult<Vec<E>> {
    let mut entities = Vec::with_capacity(ids.len());
    for &id in ids {
        let entity = E::load(conn, id)?.ok_or(QueryError::DanglingIdentity {
            entity: E::NAME,
            id,
        })?;
        entities.push(entity);
    }
    Ok(entities)
}

/// Narrows a result list to exactly one entity.
pub(crate) fn expect_single<E>(mut entities: Vec<E>) -> QueryResult<E> {
    match entities.len() {
        0 => Err(QueryError::NoResult),
        1 => Ok(entities.remove(0)),
        count => Err(QueryError::NonUniqueResult(count)),
    }
}
