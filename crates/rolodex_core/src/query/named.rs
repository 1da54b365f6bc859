//! Registry of statically declared named queries.
//!
//! Names are unique across the whole persistence unit. Each query selects
//! identities of a single entity type and declares its parameters by name.

use crate::model::address::Address;
use crate::model::bookmark::Bookmark;
use crate::model::person::Person;
use crate::model::pet::Pet;
use crate::repo::Entity;
use once_cell::sync::Lazy;
use std::collections::BTreeMap;

/// A named, reusable entity query.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct NamedQuery {
    pub name: &'static str,
    /// `Entity::NAME` of the selected entity.
    pub entity: &'static str,
    pub sql: &'static str,
}

const DECLARED: &[NamedQuery] = &[
    NamedQuery {
        name: "findAll",
        entity: Person::NAME,
        sql: "SELECT id FROM persons ORDER BY id ASC",
    },
    NamedQuery {
        name: "findByNickname",
        entity: Person::NAME,
        sql: "SELECT id FROM persons WHERE nickname = :name ORDER BY id ASC",
    },
    NamedQuery {
        name: "findByCity",
        entity: Person::NAME,
        sql: "SELECT p.id
              FROM persons p
              INNER JOIN addresses a ON a.id = p.address_id
              WHERE a.city = :city
              ORDER BY p.id ASC",
    },
    NamedQuery {
        name: "findBookmarksByTitle",
        entity: Bookmark::NAME,
        sql: "SELECT id FROM bookmarks WHERE title = :title ORDER BY id ASC",
    },
    NamedQuery {
        name: "findPetsByOwner",
        entity: Pet::NAME,
        sql: "SELECT pet_id FROM person_pets WHERE person_id = :owner ORDER BY position ASC",
    },
    NamedQuery {
        name: "findAddressesByCity",
        entity: Address::NAME,
        sql: "SELECT id FROM addresses WHERE city = :city ORDER BY id ASC",
    },
];

static REGISTRY: Lazy<BTreeMap<&'static str, NamedQuery>> = Lazy::new(|| {
    DECLARED
        .iter()
        .map(|query| (query.name, *query))
        .collect()
});

/// Looks up a named query by exact name.
pub fn named_query(name: &str) -> Option<&'static NamedQuery> {
    REGISTRY.get(name)
}

/// Returns all registered query names in sorted order.
pub fn named_query_names() -> Vec<&'static str> {
    REGISTRY.keys().copied().collect()
}

#[cfg(test)]
mod tests {
    use super::{named_query, named_query_names, DECLARED};

    #[test]
    fn registry_names_are_unique() {
        assert_eq!(named_query_names().len(), DECLARED.len());
    }

    #[test]
    fn lookup_is_case_sensitive() {
        assert!(named_query("findAll").is_some());
        assert!(named_query("findall").is_none());
    }
}
