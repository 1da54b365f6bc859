use rolodex_core::db::open_db_in_memory;
use rolodex_core::{
    Address, AddressRepository, Bookmark, BookmarkRepository, ListQuery, Person,
    PersonRepository, Pet, PetRepository, RepoError, Session, SqliteAddressRepository,
    SqliteBookmarkRepository, SqlitePersonRepository, SqlitePetRepository,
};
use rusqlite::Connection;

fn setup_conn() -> Connection {
    open_db_in_memory().unwrap()
}

#[test]
fn create_and_get_bookmark() {
    let conn = setup_conn();
    let repo = SqliteBookmarkRepository::try_new(&conn).unwrap();

    let mut bookmark = Bookmark::new("A website", "http://www.hascode.com");
    let id = repo.create_bookmark(&mut bookmark).unwrap();

    assert_eq!(bookmark.id, Some(id));
    let loaded = repo.get_bookmark(id).unwrap().unwrap();
    assert_eq!(loaded, bookmark);
    assert!(repo.get_bookmark(id + 100).unwrap().is_none());
}

#[test]
fn create_rejects_records_with_identity() {
    let conn = setup_conn();
    let repo = SqliteAddressRepository::try_new(&conn).unwrap();

    let mut address = Address::new("Paris", "Rue de St. Denis");
    address.id = Some(7);
    let err = repo.create_address(&mut address).unwrap_err();
    assert!(matches!(
        err,
        RepoError::AlreadyPersisted {
            entity: "address",
            id: 7
        }
    ));
}

#[test]
fn list_pets_supports_limit_and_offset() {
    let conn = setup_conn();
    let repo = SqlitePetRepository::try_new(&conn).unwrap();

    for name in ["one", "two", "three", "four"] {
        let mut pet = Pet::new(name);
        repo.create_pet(&mut pet).unwrap();
    }

    let page = repo
        .list_pets(&ListQuery {
            limit: Some(2),
            offset: 1,
        })
        .unwrap();
    let names: Vec<&str> = page.iter().map(|pet| pet.name.as_str()).collect();
    assert_eq!(names, vec!["two", "three"]);

    let tail = repo
        .list_pets(&ListQuery {
            limit: None,
            offset: 3,
        })
        .unwrap();
    assert_eq!(tail.len(), 1);
    assert_eq!(tail[0].name, "four");

    let all = repo.list_pets(&ListQuery::default()).unwrap();
    assert_eq!(all.len(), 4);
}

#[test]
fn update_person_rewrites_fields_and_collections() {
    let conn = setup_conn();
    let bookmarks = SqliteBookmarkRepository::try_new(&conn).unwrap();
    let persons = SqlitePersonRepository::try_new(&conn).unwrap();

    let mut first = Bookmark::new("first", "http://first.example");
    let mut second = Bookmark::new("second", "http://second.example");
    bookmarks.create_bookmark(&mut first).unwrap();
    bookmarks.create_bookmark(&mut second).unwrap();

    let mut person = Person::new("mickey");
    person.hobbies = vec!["Coding".to_string(), "Not sleeping".to_string()];
    person.bookmarks = vec![first];
    let id = persons.create_person(&mut person).unwrap();

    person.nickname = "mickey mouse".to_string();
    person.hobbies = vec!["drinking coffee".to_string()];
    person.bookmarks = vec![second.clone()];
    persons.update_person(&mut person).unwrap();

    let loaded = persons.get_person(id).unwrap().unwrap();
    assert_eq!(loaded.nickname, "mickey mouse");
    assert_eq!(loaded.hobbies, vec!["drinking coffee".to_string()]);
    assert_eq!(loaded.bookmarks, vec![second]);
    assert_eq!(loaded, person);
}

#[test]
fn update_person_refreshes_owners_of_new_pets() {
    let conn = setup_conn();
    let pets = SqlitePetRepository::try_new(&conn).unwrap();
    let persons = SqlitePersonRepository::try_new(&conn).unwrap();

    let mut dog = Pet::new("Doggie Dog");
    pets.create_pet(&mut dog).unwrap();

    let mut person = Person::new("mickey");
    let id = persons.create_person(&mut person).unwrap();
    person.pets = vec![dog];
    persons.update_person(&mut person).unwrap();

    assert_eq!(person.pets[0].owners, vec![id]);
    assert_eq!(persons.get_person(id).unwrap().unwrap(), person);
}

#[test]
fn update_person_requires_stored_identity() {
    let conn = setup_conn();
    let persons = SqlitePersonRepository::try_new(&conn).unwrap();

    let mut transient = Person::new("nobody");
    let err = persons.update_person(&mut transient).unwrap_err();
    assert!(matches!(err, RepoError::NotPersisted("person")));

    let mut missing = Person::new("ghost");
    missing.id = Some(404);
    let err = persons.update_person(&mut missing).unwrap_err();
    assert!(matches!(
        err,
        RepoError::NotFound {
            entity: "person",
            id: 404
        }
    ));
}

#[test]
fn delete_person_keeps_pets_and_drops_ownership() {
    let conn = setup_conn();
    let pets = SqlitePetRepository::try_new(&conn).unwrap();
    let persons = SqlitePersonRepository::try_new(&conn).unwrap();

    let mut bunny = Pet::new("Nanny the bunny");
    let pet_id = pets.create_pet(&mut bunny).unwrap();

    let mut mickey = Person::new("Mickey");
    mickey.pets = vec![bunny.clone()];
    let mickey_id = persons.create_person(&mut mickey).unwrap();
    let mut minny = Person::new("Minny");
    minny.pets = vec![bunny];
    let minny_id = persons.create_person(&mut minny).unwrap();

    persons.delete_person(mickey_id).unwrap();

    assert!(persons.get_person(mickey_id).unwrap().is_none());
    let remaining = pets.get_pet(pet_id).unwrap().unwrap();
    assert_eq!(remaining.owners, vec![minny_id]);

    let err = persons.delete_person(mickey_id).unwrap_err();
    assert!(matches!(err, RepoError::NotFound { .. }));
}

#[test]
fn list_persons_returns_loaded_associations() {
    let conn = setup_conn();
    let addresses = SqliteAddressRepository::try_new(&conn).unwrap();
    let persons = SqlitePersonRepository::try_new(&conn).unwrap();

    let mut paris = Address::new("Paris", "Rue de St. Denis");
    addresses.create_address(&mut paris).unwrap();

    let mut donald = Person::new("Donald");
    donald.address = Some(paris.clone());
    persons.create_person(&mut donald).unwrap();
    let mut ronald = Person::new("Ronald");
    persons.create_person(&mut ronald).unwrap();

    let listed = persons.list_persons(&ListQuery::default()).unwrap();
    assert_eq!(listed.len(), 2);
    assert_eq!(listed[0].address, Some(paris));
    assert_eq!(listed[1].address, None);
}

#[test]
fn repository_rejects_unmigrated_connection() {
    let conn = Connection::open_in_memory().unwrap();

    let result = SqlitePersonRepository::try_new(&conn);
    assert!(matches!(
        result,
        Err(RepoError::UninitializedConnection {
            actual_version: 0,
            ..
        })
    ));

    assert!(matches!(
        Session::from_connection(Connection::open_in_memory().unwrap()),
        Err(RepoError::UninitializedConnection { .. })
    ));
}

#[test]
fn repository_rejects_missing_table() {
    let conn = setup_conn();
    conn.execute_batch("DROP TABLE person_hobbies;").unwrap();

    let result = SqlitePersonRepository::try_new(&conn);
    assert!(matches!(
        result,
        Err(RepoError::MissingRequiredTable("person_hobbies"))
    ));

    // Bookmarks do not depend on the dropped table.
    assert!(SqliteBookmarkRepository::try_new(&conn).is_ok());
}

#[test]
fn repository_rejects_missing_column() {
    let conn = setup_conn();
    conn.execute_batch(
        "DROP TABLE pets;
         CREATE TABLE pets (id INTEGER PRIMARY KEY AUTOINCREMENT);",
    )
    .unwrap();

    let result = SqlitePetRepository::try_new(&conn);
    assert!(matches!(
        result,
        Err(RepoError::MissingRequiredColumn {
            table: "pets",
            column: "name"
        })
    ));
}

#[test]
fn session_wraps_migrated_connection() {
    let session = Session::from_connection(setup_conn()).unwrap();
    let repo = SqliteBookmarkRepository::try_new(session.connection()).unwrap();

    let mut bookmark = Bookmark::new("direct", "http://direct.example");
    let id = repo.create_bookmark(&mut bookmark).unwrap();
    assert_eq!(session.find::<Bookmark>(id).unwrap(), Some(bookmark));
}
