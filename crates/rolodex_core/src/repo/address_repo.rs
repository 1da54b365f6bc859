//! Address repository contract and SQLite implementation.

use crate::model::address::Address;
use crate::model::EntityId;
use crate::repo::{ensure_connection_ready, ensure_transient, Entity, RepoResult, ADDRESSES};
use log::debug;
use rusqlite::{params, Connection, Row};

/// Repository interface for address persistence.
pub trait AddressRepository {
    fn create_address(&self, address: &mut Address) -> RepoResult<EntityId>;
    fn get_address(&self, id: EntityId) -> RepoResult<Option<Address>>;
}

/// SQLite-backed address repository.
pub struct SqliteAddressRepository<'conn> {
    conn: &'conn Connection,
}

impl<'conn> SqliteAddressRepository<'conn> {
    pub fn try_new(conn: &'conn Connection) -> RepoResult<Self> {
        ensure_connection_ready(conn, &[ADDRESSES])?;
        Ok(Self { conn })
    }

    pub(crate) fn on_ready(conn: &'conn Connection) -> Self {
        Self { conn }
    }
}

impl AddressRepository for SqliteAddressRepository<'_> {
    fn create_address(&self, address: &mut Address) -> RepoResult<EntityId> {
        ensure_transient(Address::NAME, address.id)?;

        self.conn.execute(
            "INSERT INTO addresses (city, street) VALUES (?1, ?2);",
            params![address.city.as_str(), address.street.as_str()],
        )?;
        let id = self.conn.last_insert_rowid();
        address.id = Some(id);

        debug!("event=entity_insert module=repo status=ok entity=address id={id}");
        Ok(id)
    }

    fn get_address(&self, id: EntityId) -> RepoResult<Option<Address>> {
        let mut stmt = self
            .conn
            .prepare("SELECT id, city, street FROM addresses WHERE id = ?1;")?;
        let mut rows = stmt.query([id])?;
        if let Some(row) = rows.next()? {
            return Ok(Some(parse_address_row(row)?));
        }
        Ok(None)
    }
}

impl Entity for Address {
    const NAME: &'static str = "address";
    const TABLE: &'static str = "addresses";

    fn id(&self) -> Option<EntityId> {
        self.id
    }

    fn insert(conn: &Connection, entity: &mut Self) -> RepoResult<EntityId> {
        SqliteAddressRepository::on_ready(conn).create_address(entity)
    }

    fn load(conn: &Connection, id: EntityId) -> RepoResult<Option<Self>> {
        SqliteAddressRepository::on_ready(conn).get_address(id)
    }
}

fn parse_address_row(row: &Row<'_>) -> RepoResult<Address> {
    Ok(Address {
        id: Some(row.get("id")?),
        city: row.get("city")?,
        street: row.get("street")?,
    })
}
