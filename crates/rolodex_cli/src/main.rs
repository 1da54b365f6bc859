//! Walkthrough entry point.
//!
//! # Responsibility
//! - Store the sample person/bookmark/pet data set in one unit of work.
//! - Print the result of each lookup style: find, string query, join fetch,
//!   named query and criteria query.
//!
//! Usage: `rolodex_cli [--db <path>] [--log-dir <absolute dir>]`

use clap::Parser;
use log::info;
use rolodex_core::{
    default_log_level, init_logging, Address, Bookmark, CriteriaQuery, PersistenceUnit,
    PersistenceUnitConfig, Person, PersonField, Pet, Predicate, Session, Sex,
};
use std::error::Error;
use std::path::PathBuf;
use std::process::ExitCode;

const UNIT_NAME: &str = "rolodex-walkthrough";

#[derive(Debug, Parser)]
#[command(name = "rolodex_cli")]
#[command(about = "Rolodex - entity mapping and query walkthrough", long_about = None)]
struct CliArgs {
    /// SQLite database file; an in-memory unit is used when omitted
    #[arg(long)]
    db: Option<PathBuf>,

    /// Absolute directory for rotating log files
    #[arg(long)]
    log_dir: Option<String>,
}

fn main() -> ExitCode {
    let args = CliArgs::parse();

    match run(&args) {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            eprintln!("rolodex_cli failed: {err}");
            ExitCode::FAILURE
        }
    }
}

fn run(args: &CliArgs) -> Result<(), Box<dyn Error>> {
    if let Some(log_dir) = &args.log_dir {
        init_logging(default_log_level().as_str(), log_dir)?;
    }

    let config = match &args.db {
        Some(path) => PersistenceUnitConfig::file(UNIT_NAME, path),
        None => PersistenceUnitConfig::in_memory(UNIT_NAME),
    };
    let unit = PersistenceUnit::new(config)?;
    let mut session = unit.create_session()?;
    info!("event=walkthrough module=cli status=start unit={}", unit.name());

    let hal_id = store_sample_data(&mut session)?;
    println!("rolodex_core version={}", rolodex_core::core_version());

    if let Some(hal) = session.find::<Person>(hal_id)? {
        println!(
            "find person id={} nickname={} hobbies={} bookmarks={} pets={}",
            hal_id,
            hal.nickname,
            hal.hobbies.len(),
            hal.bookmarks.len(),
            hal.pets.len()
        );
    }

    let by_name = session
        .create_query::<Person>("SELECT id FROM persons WHERE nickname = :name")
        .set_parameter("name", "HAL9000")
        .single_result()?;
    println!("named parameter query -> person id={:?}", by_name.id);

    let by_position = session
        .create_query::<Person>("SELECT id FROM persons WHERE nickname = ?1")
        .set_positional(1, "HAL9000")
        .single_result()?;
    println!("positional parameter query -> person id={:?}", by_position.id);

    let joined = session
        .create_query::<Person>(
            "SELECT p.id
             FROM persons p
             LEFT JOIN person_bookmarks pb ON pb.person_id = p.id
             LEFT JOIN bookmarks b ON b.id = pb.bookmark_id
             WHERE b.title = :title",
        )
        .set_parameter("title", "Snoring for experts")
        .result_list()?;
    for person in &joined {
        println!(
            "join fetch by bookmark title -> person id={:?} bookmarks={:?}",
            person.id,
            person
                .bookmarks
                .iter()
                .map(|bookmark| bookmark.title.as_str())
                .collect::<Vec<_>>()
        );
    }

    let everyone = session.create_named_query::<Person>("findAll")?.result_list()?;
    println!("named query findAll -> {} persons", everyone.len());

    let ronald = session
        .create_named_query::<Person>("findByNickname")?
        .set_parameter("name", "Ronald")
        .single_result()?;
    println!("named query findByNickname -> person id={:?}", ronald.id);

    let criteria = CriteriaQuery::<Person>::new()
        .filter(Predicate::equal(PersonField::Nickname, "Ronald"));
    let matches = session.execute_criteria(&criteria)?;
    println!(
        "criteria nickname = Ronald -> ids={:?}",
        matches.iter().map(|person| person.id).collect::<Vec<_>>()
    );

    let hal_pets = session
        .create_named_query::<Pet>("findPetsByOwner")?
        .set_parameter("owner", hal_id)
        .result_list()?;
    for pet in hal_pets {
        println!("pet {} owned by persons {:?}", pet.name, pet.owners);
    }

    info!("event=walkthrough module=cli status=ok unit={}", unit.name());
    Ok(())
}

/// Stores the sample data set and returns the identity of `HAL9000`.
fn store_sample_data(session: &mut Session) -> Result<i64, Box<dyn Error>> {
    let mut uow = session.begin()?;

    let mut address = Address::new("Paris", "Rue de St. Denis");
    uow.persist(&mut address)?;

    let mut bookmark = Bookmark::new("Snoring for experts", "http://www.hascode.com");
    uow.persist(&mut bookmark)?;

    let mut bunny = Pet::new("Nanny the bunny");
    let mut dog = Pet::new("Doggie Dog");
    uow.persist(&mut bunny)?;
    uow.persist(&mut dog)?;

    let mut hal = Person::new("HAL9000");
    hal.email = Some("hal@discovery.one".to_string());
    hal.sex = Some(Sex::Male);
    hal.birthday = Some(694_224_000_000);
    hal.address = Some(address);
    hal.hobbies = vec!["Coding".to_string(), "Not sleeping".to_string()];
    hal.bookmarks = vec![bookmark];
    hal.pets = vec![bunny.clone(), dog.clone()];
    let hal_id = uow.persist(&mut hal)?;

    let mut minny = Person::new("Minny");
    minny.pets = vec![bunny, dog];
    uow.persist(&mut minny)?;

    uow.persist(&mut Person::new("Donald"))?;
    uow.persist(&mut Person::new("Ronald"))?;

    uow.commit()?;
    Ok(hal_id)
}

#[cfg(test)]
mod tests {
    use super::CliArgs;
    use clap::Parser;
    use std::path::Path;

    #[test]
    fn reads_known_flags() {
        let parsed = CliArgs::try_parse_from([
            "rolodex_cli",
            "--db",
            "/tmp/r.db",
            "--log-dir",
            "/tmp/logs",
        ])
        .unwrap();
        assert_eq!(parsed.db.as_deref(), Some(Path::new("/tmp/r.db")));
        assert_eq!(parsed.log_dir.as_deref(), Some("/tmp/logs"));
    }

    #[test]
    fn flags_are_optional() {
        let parsed = CliArgs::try_parse_from(["rolodex_cli"]).unwrap();
        assert!(parsed.db.is_none());
        assert!(parsed.log_dir.is_none());
    }

    #[test]
    fn rejects_unknown_and_incomplete_flags() {
        assert!(CliArgs::try_parse_from(["rolodex_cli", "--verbose"]).is_err());
        assert!(CliArgs::try_parse_from(["rolodex_cli", "--db"]).is_err());
    }
}
