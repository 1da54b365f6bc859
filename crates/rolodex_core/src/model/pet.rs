//! Pet entity.
//!
//! # Invariants
//! - `owners` is the inverse side of `Person::pets`. It is filled on read from
//!   the owning side's join rows and never written by the pet repository.

use crate::model::EntityId;
use serde::{Deserialize, Serialize};

/// A pet that may be owned by several persons.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Pet {
    pub id: Option<EntityId>,
    pub name: String,
    /// Identities of owning persons, in ascending id order.
    #[serde(default)]
    pub owners: Vec<EntityId>,
}

impl Pet {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            id: None,
            name: name.into(),
            owners: Vec::new(),
        }
    }
}
