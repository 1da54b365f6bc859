//! Pet repository contract and SQLite implementation.
//!
//! # Invariants
//! - Pets are written without owners; ownership rows belong to the person
//!   repository.
//! - Loaded pets always carry the current owner identities.

use crate::model::pet::Pet;
use crate::model::EntityId;
use crate::repo::{
    ensure_connection_ready, ensure_transient, push_pagination, Entity, ListQuery, RepoResult,
    PERSON_PETS, PETS,
};
use log::debug;
use rusqlite::types::Value;
use rusqlite::{params_from_iter, Connection, Row};

/// Repository interface for pet persistence.
pub trait PetRepository {
    /// Inserts a transient pet. Any `owners` on the input are ignored.
    fn create_pet(&self, pet: &mut Pet) -> RepoResult<EntityId>;
    fn get_pet(&self, id: EntityId) -> RepoResult<Option<Pet>>;
    fn list_pets(&self, query: &ListQuery) -> RepoResult<Vec<Pet>>;
}

/// SQLite-backed pet repository.
pub struct SqlitePetRepository<'conn> {
    conn: &'conn Connection,
}

impl<'conn> SqlitePetRepository<'conn> {
    pub fn try_new(conn: &'conn Connection) -> RepoResult<Self> {
        ensure_connection_ready(conn, &[PETS, PERSON_PETS])?;
        Ok(Self { conn })
    }

    pub(crate) fn on_ready(conn: &'conn Connection) -> Self {
        Self { conn }
    }
}

impl PetRepository for SqlitePetRepository<'_> {
    fn create_pet(&self, pet: &mut Pet) -> RepoResult<EntityId> {
        ensure_transient(Pet::NAME, pet.id)?;

        self.conn
            .execute("INSERT INTO pets (name) VALUES (?1);", [pet.name.as_str()])?;
        let id = self.conn.last_insert_rowid();
        pet.id = Some(id);
        debug!(
            "event=entity_insert module=repo status=ok entity=pet id={id} ignored_owners={}",
            pet.owners.len()
        );
        Ok(id)
    }

    fn get_pet(&self, id: EntityId) -> RepoResult<Option<Pet>> {
        let mut stmt = self.conn.prepare("SELECT id, name FROM pets WHERE id = ?1;")?;
        let mut rows = stmt.query([id])?;
        if let Some(row) = rows.next()? {
            return Ok(Some(parse_pet_row(self.conn, row)?));
        }
        Ok(None)
    }

    fn list_pets(&self, query: &ListQuery) -> RepoResult<Vec<Pet>> {
        let mut sql = String::from("SELECT id, name FROM pets");
        let mut bind_values: Vec<Value> = Vec::new();
        push_pagination(&mut sql, &mut bind_values, query);

        let mut stmt = self.conn.prepare(&sql)?;
        let mut rows = stmt.query(params_from_iter(bind_values))?;
        let mut pets = Vec::new();
        while let Some(row) = rows.next()? {
            pets.push(parse_pet_row(self.conn, row)?);
        }
        Ok(pets)
    }
}

impl Entity for Pet {
    const NAME: &'static str = "pet";
    const TABLE: &'static str = "pets";

    fn id(&self) -> Option<EntityId> {
        self.id
    }

    fn insert(conn: &Connection, entity: &mut Self) -> RepoResult<EntityId> {
        SqlitePetRepository::on_ready(conn).create_pet(entity)
    }

    fn load(conn: &Connection, id: EntityId) -> RepoResult<Option<Self>> {
        SqlitePetRepository::on_ready(conn).get_pet(id)
    }
}

/// Maps a row exposing `id` and `name`, resolving owners from `person_pets`.
pub(crate) fn parse_pet_row(conn: &Connection, row: &Row<'_>) -> RepoResult<Pet> {
    let id: EntityId = row.get("id")?;
    Ok(Pet {
        id: Some(id),
        name: row.get("name")?,
        owners: load_owner_ids(conn, id)?,
    })
}

/// Owning person ids of a pet, ascending and without repeats.
pub(crate) fn load_owner_ids(conn: &Connection, pet_id: EntityId) -> RepoResult<Vec<EntityId>> {
    let mut stmt = conn.prepare(
        "SELECT DISTINCT person_id
         FROM person_pets
         WHERE pet_id = ?1
         ORDER BY person_id ASC;",
    )?;
    let mut rows = stmt.query([pet_id])?;
    let mut owners = Vec::new();
    while let Some(row) = rows.next()? {
        owners.push(row.get(0)?);
    }
    Ok(owners)
}
