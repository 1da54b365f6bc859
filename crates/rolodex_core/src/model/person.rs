//! Person entity.
//!
//! # Responsibility
//! - Aggregate the scalar profile fields and all associations of a person.
//!
//! # Invariants
//! - `hobbies`, `bookmarks` and `pets` keep caller-provided order through
//!   persistence.
//! - Person is the owning side of the person/pet association.

use crate::model::address::Address;
use crate::model::bookmark::Bookmark;
use crate::model::pet::Pet;
use crate::model::EntityId;
use serde::{Deserialize, Serialize};

/// Enumerated sex, stored by name.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Sex {
    Male,
    Female,
}

/// A person with profile data and owned associations.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Person {
    /// Generated on first persist.
    pub id: Option<EntityId>,
    pub nickname: String,
    pub email: Option<String>,
    pub sex: Option<Sex>,
    /// Unix epoch milliseconds.
    pub birthday: Option<i64>,
    /// Many-to-one; the address must be persisted before the person.
    pub address: Option<Address>,
    #[serde(default)]
    pub hobbies: Vec<String>,
    /// One-to-many through `person_bookmarks`; a bookmark belongs to one person.
    #[serde(default)]
    pub bookmarks: Vec<Bookmark>,
    /// Many-to-many owning side.
    #[serde(default)]
    pub pets: Vec<Pet>,
}

impl Person {
    /// Creates a transient person with empty optional fields and collections.
    pub fn new(nickname: impl Into<String>) -> Self {
        Self {
            id: None,
            nickname: nickname.into(),
            email: None,
            sex: None,
            birthday: None,
            address: None,
            hobbies: Vec::new(),
            bookmarks: Vec::new(),
            pets: Vec::new(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::{Person, Sex};

    #[test]
    fn new_person_is_transient_and_empty() {
        let person = Person::new("mickey");
        assert_eq!(person.id, None);
        assert_eq!(person.nickname, "mickey");
        assert!(person.email.is_none());
        assert!(person.sex.is_none());
        assert!(person.hobbies.is_empty());
        assert!(person.bookmarks.is_empty());
        assert!(person.pets.is_empty());
    }

    #[test]
    fn sex_serializes_as_snake_case() {
        let json = serde_json::to_value(Sex::Female).unwrap();
        assert_eq!(json, "female");
    }
}
