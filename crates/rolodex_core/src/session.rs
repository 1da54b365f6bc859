//! Persistence units, sessions and units of work.
//!
//! # Responsibility
//! - Turn a [`PersistenceUnitConfig`] into ready SQLite sessions.
//! - Demarcate transactions and route persist/find/query calls to the
//!   repository and query layers.
//!
//! # Invariants
//! - A session only wraps a migrated connection.
//! - Sessions of one unit share one store. A memory unit keeps an anchor
//!   connection so its database lives as long as the unit or any clone of it.
//! - A unit of work holds the session exclusively until it commits, rolls
//!   back or is dropped; dropping it without `commit` rolls back.
//! - Identities assigned inside a rolled-back unit refer to no stored row;
//!   such records must be discarded by the caller.

use crate::config::{PersistenceUnitConfig, StorageConfig};
use crate::db::{open_db, open_db_shared_memory};
use crate::model::EntityId;
use crate::query::criteria::{CriteriaEntity, CriteriaQuery};
use crate::query::named::named_query;
use crate::query::typed_query::TypedQuery;
use crate::query::{collect_ids, hydrate, QueryError, QueryResult};
use crate::repo::{ensure_connection_ready, Entity, RepoResult, ALL_TABLES};
use log::{debug, info, warn};
use rusqlite::{params_from_iter, Connection, Transaction, TransactionBehavior};
use std::path::PathBuf;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Instant;

static NEXT_MEMORY_UNIT: AtomicU64 = AtomicU64::new(1);

/// Factory for sessions sharing one configuration and one store.
#[derive(Debug, Clone)]
pub struct PersistenceUnit {
    config: PersistenceUnitConfig,
    store: UnitStore,
}

#[derive(Debug, Clone)]
enum UnitStore {
    File(PathBuf),
    Memory {
        db_name: String,
        _anchor: Arc<Mutex<Connection>>,
    },
}

impl PersistenceUnit {
    /// Validates `config` and prepares its store.
    ///
    /// Memory units create and migrate their database here; it is private to
    /// this unit even when another unit uses the same name.
    pub fn new(config: PersistenceUnitConfig) -> RepoResult<Self> {
        config.validate()?;
        let store = match &config.storage {
            StorageConfig::Memory => {
                let db_name = memory_db_name(&config.name);
                let anchor = open_db_shared_memory(&db_name)?;
                UnitStore::Memory {
                    db_name,
                    _anchor: Arc::new(Mutex::new(anchor)),
                }
            }
            StorageConfig::File { path } => UnitStore::File(path.clone()),
        };
        Ok(Self { config, store })
    }

    pub fn name(&self) -> &str {
        &self.config.name
    }

    pub fn config(&self) -> &PersistenceUnitConfig {
        &self.config
    }

    /// Opens a new session, applying pending migrations.
    pub fn create_session(&self) -> RepoResult<Session> {
        let conn = match &self.store {
            UnitStore::Memory { db_name, .. } => open_db_shared_memory(db_name)?,
            UnitStore::File(path) => open_db(path)?,
        };
        info!(
            "event=session_open module=session status=ok unit={}",
            self.config.name
        );
        Ok(Session { conn })
    }
}

/// One open connection to a persistence unit.
pub struct Session {
    conn: Connection,
}

impl Session {
    /// Wraps an already migrated connection.
    pub fn from_connection(conn: Connection) -> RepoResult<Self> {
        ensure_connection_ready(&conn, ALL_TABLES)?;
        Ok(Self { conn })
    }

    /// Borrows the underlying connection for repository use.
    pub fn connection(&self) -> &Connection {
        &self.conn
    }

    /// Starts a unit of work. Writes become visible to other connections only
    /// after [`UnitOfWork::commit`].
    pub fn begin(&mut self) -> RepoResult<UnitOfWork<'_>> {
        let tx = self
            .conn
            .transaction_with_behavior(TransactionBehavior::Immediate)?;
        debug!("event=tx_begin module=session status=ok");
        Ok(UnitOfWork {
            tx,
            persisted: 0,
            started_at: Instant::now(),
        })
    }

    /// Loads an entity by identity outside any unit of work.
    pub fn find<E: Entity>(&self, id: EntityId) -> RepoResult<Option<E>> {
        E::load(&self.conn, id)
    }

    /// Creates a parameterized query over raw SQL.
    pub fn create_query<E: Entity>(&self, sql: impl Into<String>) -> TypedQuery<'_, E> {
        TypedQuery::new(&self.conn, sql)
    }

    /// Creates a query from the named-query registry.
    pub fn create_named_query<E: Entity>(&self, name: &str) -> QueryResult<TypedQuery<'_, E>> {
        named_typed_query(&self.conn, name)
    }

    /// Runs a criteria query and hydrates the matching entities.
    pub fn execute_criteria<E: CriteriaEntity>(
        &self,
        query: &CriteriaQuery<E>,
    ) -> QueryResult<Vec<E>> {
        run_criteria(&self.conn, query)
    }
}

/// A transaction-scoped unit of work.
pub struct UnitOfWork<'session> {
    tx: Transaction<'session>,
    persisted: usize,
    started_at: Instant,
}

impl UnitOfWork<'_> {
    /// Inserts a transient entity and assigns its identity.
    pub fn persist<E: Entity>(&mut self, entity: &mut E) -> RepoResult<EntityId> {
        let id = E::insert(&self.tx, entity)?;
        self.persisted += 1;
        Ok(id)
    }

    /// Loads an entity, seeing writes made earlier in this unit.
    pub fn find<E: Entity>(&self, id: EntityId) -> RepoResult<Option<E>> {
        E::load(&self.tx, id)
    }

    /// Borrows the transaction connection for repository use.
    pub fn connection(&self) -> &Connection {
        &self.tx
    }

    pub fn create_query<E: Entity>(&self, sql: impl Into<String>) -> TypedQuery<'_, E> {
        TypedQuery::new(&self.tx, sql)
    }

    pub fn create_named_query<E: Entity>(&self, name: &str) -> QueryResult<TypedQuery<'_, E>> {
        named_typed_query(&self.tx, name)
    }

    pub fn execute_criteria<E: CriteriaEntity>(
        &self,
        query: &CriteriaQuery<E>,
    ) -> QueryResult<Vec<E>> {
        run_criteria(&self.tx, query)
    }

    /// Commits every write made in this unit.
    pub fn commit(self) -> RepoResult<()> {
        let persisted = self.persisted;
        let started_at = self.started_at;
        if let Err(err) = self.tx.commit() {
            warn!(
                "event=tx_commit module=session status=error persisted={persisted} error={err}"
            );
            return Err(err.into());
        }
        info!(
            "event=tx_commit module=session status=ok persisted={persisted} duration_ms={}",
            started_at.elapsed().as_millis()
        );
        Ok(())
    }

    /// Discards every write made in this unit.
    pub fn rollback(self) -> RepoResult<()> {
        let persisted = self.persisted;
        self.tx.rollback()?;
        info!("event=tx_rollback module=session status=ok discarded={persisted}");
        Ok(())
    }
}

fn memory_db_name(unit_name: &str) -> String {
    let safe: String = unit_name
        .chars()
        .map(|ch| {
            if ch.is_ascii_alphanumeric() || ch == '-' || ch == '_' {
                ch
            } else {
                '_'
            }
        })
        .collect();
    format!(
        "rolodex-{safe}-{}-{}",
        std::process::id(),
        NEXT_MEMORY_UNIT.fetch_add(1, Ordering::Relaxed)
    )
}

fn named_typed_query<'conn, E: Entity>(
    conn: &'conn Connection,
    name: &str,
) -> QueryResult<TypedQuery<'conn, E>> {
    let declared =
        named_query(name).ok_or_else(|| QueryError::UnknownNamedQuery(name.to_string()))?;
    if declared.entity != E::NAME {
        return Err(QueryError::EntityMismatch {
            query: name.to_string(),
            expected: declared.entity,
            actual: E::NAME,
        });
    }
    Ok(TypedQuery::new(conn, declared.sql))
}

fn run_criteria<E: CriteriaEntity>(
    conn: &Connection,
    query: &CriteriaQuery<E>,
) -> QueryResult<Vec<E>> {
    let started_at = Instant::now();
    let (sql, bind_values) = query.to_sql()?;
    let mut stmt = conn.prepare(&sql)?;
    let ids = collect_ids(stmt.query(params_from_iter(bind_values))?)?;
    debug!(
        "event=query_execute module=query status=ok entity={} kind=criteria rows={} duration_ms={}",
        E::NAME,
        ids.len(),
        started_at.elapsed().as_millis()
    );
    hydrate(conn, &ids)
}
