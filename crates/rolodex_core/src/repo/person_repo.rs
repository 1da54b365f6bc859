//! Person repository contract and SQLite implementation.
//!
//! # Responsibility
//! - Persist person rows together with their owned collections.
//! - Resolve address, hobbies, bookmarks and pets when loading.
//!
//! # Invariants
//! - Person is the owning side of `person_pets`; pets never write it. After a
//!   write, the caller's `pets[i].owners` mirror the stored ownership rows.
//! - Collection rows carry a `position` so reads return insertion order.
//! - A person write is atomic: it runs inside its own savepoint, so a failed
//!   collection insert leaves no partial person behind.
//! - Referenced address/bookmark/pet records must already have identities.

use crate::model::address::Address;
use crate::model::bookmark::Bookmark;
use crate::model::person::{Person, Sex};
use crate::model::pet::Pet;
use crate::model::EntityId;
use crate::repo::address_repo::{AddressRepository, SqliteAddressRepository};
use crate::repo::bookmark_repo::parse_bookmark_row;
use crate::repo::pet_repo::{load_owner_ids, parse_pet_row};
use crate::repo::{
    ensure_connection_ready, ensure_transient, push_pagination, Entity, ListQuery, RepoError,
    RepoResult, ALL_TABLES,
};
use log::{debug, warn};
use rusqlite::types::{ToSqlOutput, Value};
use rusqlite::{params, params_from_iter, Connection, Row, ToSql};

const PERSON_SELECT_SQL: &str = "SELECT
    id,
    nickname,
    email,
    sex,
    birthday,
    address_id
FROM persons";

/// Repository interface for person persistence.
pub trait PersonRepository {
    /// Inserts a transient person with all owned collections.
    fn create_person(&self, person: &mut Person) -> RepoResult<EntityId>;
    /// Replaces scalar fields and every owned collection of a stored person.
    fn update_person(&self, person: &mut Person) -> RepoResult<()>;
    fn get_person(&self, id: EntityId) -> RepoResult<Option<Person>>;
    fn list_persons(&self, query: &ListQuery) -> RepoResult<Vec<Person>>;
    /// Deletes a person and its join rows. Referenced records are kept.
    fn delete_person(&self, id: EntityId) -> RepoResult<()>;
}

/// SQLite-backed person repository.
pub struct SqlitePersonRepository<'conn> {
    conn: &'conn Connection,
}

impl<'conn> SqlitePersonRepository<'conn> {
    /// Constructs a repository from a migrated connection.
    ///
    /// Persons touch every table, so the full schema is checked.
    pub fn try_new(conn: &'conn Connection) -> RepoResult<Self> {
        ensure_connection_ready(conn, ALL_TABLES)?;
        Ok(Self { conn })
    }

    pub(crate) fn on_ready(conn: &'conn Connection) -> Self {
        Self { conn }
    }
}

impl PersonRepository for SqlitePersonRepository<'_> {
    fn create_person(&self, person: &mut Person) -> RepoResult<EntityId> {
        ensure_transient(Person::NAME, person.id)?;
        ensure_references_persisted(person)?;

        let id = with_savepoint(self.conn, || {
            self.conn.execute(
                "INSERT INTO persons (
                    nickname,
                    email,
                    sex,
                    birthday,
                    address_id
                ) VALUES (?1, ?2, ?3, ?4, ?5);",
                params![
                    person.nickname.as_str(),
                    person.email.as_deref(),
                    person.sex,
                    person.birthday,
                    person.address.as_ref().and_then(|address| address.id),
                ],
            )?;
            let id = self.conn.last_insert_rowid();
            write_collections(self.conn, id, person)?;
            sync_pet_owners(self.conn, &mut person.pets)?;
            Ok(id)
        })?;
        person.id = Some(id);

        debug!(
            "event=entity_insert module=repo status=ok entity=person id={id} hobbies={} bookmarks={} pets={}",
            person.hobbies.len(),
            person.bookmarks.len(),
            person.pets.len()
        );
        Ok(id)
    }

    fn update_person(&self, person: &mut Person) -> RepoResult<()> {
        let id = person.id.ok_or(RepoError::NotPersisted(Person::NAME))?;
        ensure_references_persisted(person)?;

        with_savepoint(self.conn, || {
            let changed = self.conn.execute(
                "UPDATE persons
                 SET
                    nickname = ?1,
                    email = ?2,
                    sex = ?3,
                    birthday = ?4,
                    address_id = ?5
                 WHERE id = ?6;",
                params![
                    person.nickname.as_str(),
                    person.email.as_deref(),
                    person.sex,
                    person.birthday,
                    person.address.as_ref().and_then(|address| address.id),
                    id,
                ],
            )?;
            if changed == 0 {
                return Err(RepoError::NotFound {
                    entity: Person::NAME,
                    id,
                });
            }

            clear_collections(self.conn, id)?;
            write_collections(self.conn, id, person)?;
            sync_pet_owners(self.conn, &mut person.pets)
        })?;

        debug!("event=entity_update module=repo status=ok entity=person id={id}");
        Ok(())
    }

    fn get_person(&self, id: EntityId) -> RepoResult<Option<Person>> {
        let mut stmt = self
            .conn
            .prepare(&format!("{PERSON_SELECT_SQL} WHERE id = ?1;"))?;
        let mut rows = stmt.query([id])?;
        if let Some(row) = rows.next()? {
            return Ok(Some(parse_person_row(self.conn, row)?));
        }
        Ok(None)
    }

    fn list_persons(&self, query: &ListQuery) -> RepoResult<Vec<Person>> {
        let mut sql = PERSON_SELECT_SQL.to_string();
        let mut bind_values: Vec<Value> = Vec::new();
        push_pagination(&mut sql, &mut bind_values, query);

        let mut stmt = self.conn.prepare(&sql)?;
        let mut rows = stmt.query(params_from_iter(bind_values))?;
        let mut persons = Vec::new();
        while let Some(row) = rows.next()? {
            persons.push(parse_person_row(self.conn, row)?);
        }
        Ok(persons)
    }

    fn delete_person(&self, id: EntityId) -> RepoResult<()> {
        let changed = self
            .conn
            .execute("DELETE FROM persons WHERE id = ?1;", [id])?;
        if changed == 0 {
            return Err(RepoError::NotFound {
                entity: Person::NAME,
                id,
            });
        }

        debug!("event=entity_delete module=repo status=ok entity=person id={id}");
        Ok(())
    }
}

impl Entity for Person {
    const NAME: &'static str = "person";
    const TABLE: &'static str = "persons";

    fn id(&self) -> Option<EntityId> {
        self.id
    }

    fn insert(conn: &Connection, entity: &mut Self) -> RepoResult<EntityId> {
        SqlitePersonRepository::on_ready(conn).create_person(entity)
    }

    fn load(conn: &Connection, id: EntityId) -> RepoResult<Option<Self>> {
        SqlitePersonRepository::on_ready(conn).get_person(id)
    }
}

fn ensure_references_persisted(person: &Person) -> RepoResult<()> {
    let transient = |association: &'static str| RepoError::TransientReference {
        owner: Person::NAME,
        association,
    };

    if person.address.as_ref().is_some_and(|address| address.id.is_none()) {
        return Err(transient("address"));
    }
    if person.bookmarks.iter().any(|bookmark| bookmark.id.is_none()) {
        return Err(transient("bookmarks"));
    }
    if person.pets.iter().any(|pet| pet.id.is_none()) {
        return Err(transient("pets"));
    }
    Ok(())
}

/// Runs `work` inside a named savepoint, rolling back to it on failure.
///
/// Savepoints nest inside an open transaction and behave like a transaction
/// on an autocommit connection.
fn with_savepoint<T>(conn: &Connection, work: impl FnOnce() -> RepoResult<T>) -> RepoResult<T> {
    conn.execute_batch("SAVEPOINT person_write;")?;
    match work() {
        Ok(value) => {
            conn.execute_batch("RELEASE person_write;")?;
            Ok(value)
        }
        Err(err) => {
            if let Err(rollback_err) =
                conn.execute_batch("ROLLBACK TO person_write; RELEASE person_write;")
            {
                warn!(
                    "event=savepoint_rollback module=repo status=error entity=person error={rollback_err}"
                );
            }
            Err(err)
        }
    }
}

fn write_collections(conn: &Connection, person_id: EntityId, person: &Person) -> RepoResult<()> {
    for (position, hobby) in person.hobbies.iter().enumerate() {
        conn.execute(
            "INSERT INTO person_hobbies (person_id, position, hobby) VALUES (?1, ?2, ?3);",
            params![person_id, position_to_db(position), hobby.as_str()],
        )?;
    }

    for (position, bookmark) in person.bookmarks.iter().enumerate() {
        conn.execute(
            "INSERT INTO person_bookmarks (person_id, bookmark_id, position) VALUES (?1, ?2, ?3);",
            params![person_id, bookmark.id, position_to_db(position)],
        )?;
    }

    for (position, pet) in person.pets.iter().enumerate() {
        conn.execute(
            "INSERT INTO person_pets (person_id, pet_id, position) VALUES (?1, ?2, ?3);",
            params![person_id, pet.id, position_to_db(position)],
        )?;
    }

    Ok(())
}

/// Refreshes the inverse side of every referenced pet from `person_pets`.
fn sync_pet_owners(conn: &Connection, pets: &mut [Pet]) -> RepoResult<()> {
    for pet in pets {
        if let Some(pet_id) = pet.id {
            pet.owners = load_owner_ids(conn, pet_id)?;
        }
    }
    Ok(())
}

fn clear_collections(conn: &Connection, person_id: EntityId) -> RepoResult<()> {
    for table in ["person_hobbies", "person_bookmarks", "person_pets"] {
        conn.execute(
            &format!("DELETE FROM {table} WHERE person_id = ?1;"),
            [person_id],
        )?;
    }
    Ok(())
}

fn parse_person_row(conn: &Connection, row: &Row<'_>) -> RepoResult<Person> {
    let id: EntityId = row.get("id")?;

    let sex = match row.get::<_, Option<String>>("sex")? {
        Some(value) => Some(parse_sex(&value).ok_or_else(|| {
            RepoError::InvalidData(format!("invalid sex `{value}` in persons.sex"))
        })?),
        None => None,
    };

    let address = match row.get::<_, Option<EntityId>>("address_id")? {
        Some(address_id) => Some(load_address(conn, address_id)?),
        None => None,
    };

    Ok(Person {
        id: Some(id),
        nickname: row.get("nickname")?,
        email: row.get("email")?,
        sex,
        birthday: row.get("birthday")?,
        address,
        hobbies: load_hobbies(conn, id)?,
        bookmarks: load_bookmarks(conn, id)?,
        pets: load_pets(conn, id)?,
    })
}

fn load_address(conn: &Connection, address_id: EntityId) -> RepoResult<Address> {
    SqliteAddressRepository::on_ready(conn)
        .get_address(address_id)?
        .ok_or_else(|| {
            RepoError::InvalidData(format!(
                "persons.address_id references missing address {address_id}"
            ))
        })
}

fn load_hobbies(conn: &Connection, person_id: EntityId) -> RepoResult<Vec<String>> {
    let mut stmt = conn.prepare(
        "SELECT hobby
         FROM person_hobbies
         WHERE person_id = ?1
         ORDER BY position ASC;",
    )?;
    let mut rows = stmt.query([person_id])?;
    let mut hobbies = Vec::new();
    while let Some(row) = rows.next()? {
        hobbies.push(row.get(0)?);
    }
    Ok(hobbies)
}

fn load_bookmarks(conn: &Connection, person_id: EntityId) -> RepoResult<Vec<Bookmark>> {
    let mut stmt = conn.prepare(
        "SELECT b.id, b.title, b.url
         FROM person_bookmarks pb
         INNER JOIN bookmarks b ON b.id = pb.bookmark_id
         WHERE pb.person_id = ?1
         ORDER BY pb.position ASC;",
    )?;
    let mut rows = stmt.query([person_id])?;
    let mut bookmarks = Vec::new();
    while let Some(row) = rows.next()? {
        bookmarks.push(parse_bookmark_row(row)?);
    }
    Ok(bookmarks)
}

fn load_pets(conn: &Connection, person_id: EntityId) -> RepoResult<Vec<Pet>> {
    let mut stmt = conn.prepare(
        "SELECT p.id, p.name
         FROM person_pets pp
         INNER JOIN pets p ON p.id = pp.pet_id
         WHERE pp.person_id = ?1
         ORDER BY pp.position ASC;",
    )?;
    let mut rows = stmt.query([person_id])?;
    let mut pets = Vec::new();
    while let Some(row) = rows.next()? {
        pets.push(parse_pet_row(conn, row)?);
    }
    Ok(pets)
}

impl ToSql for Sex {
    fn to_sql(&self) -> rusqlite::Result<ToSqlOutput<'_>> {
        Ok(ToSqlOutput::from(sex_to_db(*self)))
    }
}

fn position_to_db(position: usize) -> i64 {
    i64::try_from(position).unwrap_or(i64::MAX)
}

fn sex_to_db(sex: Sex) -> &'static str {
    match sex {
        Sex::Male => "male",
        Sex::Female => "female",
    }
}

fn parse_sex(value: &str) -> Option<Sex> {
    match value {
        "male" => Some(Sex::Male),
        "female" => Some(Sex::Female),
        _ => None,
    }
}
