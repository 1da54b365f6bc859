//! Core persistence layer for Rolodex.
//! Entities, their SQLite mapping, units of work and queries live here.

pub mod config;
pub mod db;
pub mod logging;
pub mod model;
pub mod query;
pub mod repo;
pub mod session;

pub use config::{ConfigError, PersistenceUnitConfig, StorageConfig};
pub use logging::{default_log_level, init_logging, logging_status, LogLevel};
pub use model::address::Address;
pub use model::bookmark::Bookmark;
pub use model::person::{Person, Sex};
pub use model::pet::Pet;
pub use model::EntityId;
pub use query::criteria::{
    AddressField, BookmarkField, CriteriaEntity, CriteriaQuery, PersonField, PetField, Predicate,
    SortDirection,
};
pub use query::named::{named_query, named_query_names, NamedQuery};
pub use query::typed_query::TypedQuery;
pub use query::{QueryError, QueryResult};
pub use repo::address_repo::{AddressRepository, SqliteAddressRepository};
pub use repo::bookmark_repo::{BookmarkRepository, SqliteBookmarkRepository};
pub use repo::person_repo::{PersonRepository, SqlitePersonRepository};
pub use repo::pet_repo::{PetRepository, SqlitePetRepository};
pub use repo::{Entity, ListQuery, RepoError, RepoResult};
pub use session::{PersistenceUnit, Session, UnitOfWork};

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
