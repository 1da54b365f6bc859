//! Address entity.

use crate::model::EntityId;
use serde::{Deserialize, Serialize};

/// Postal address. Several persons may share one row.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Address {
    pub id: Option<EntityId>,
    pub city: String,
    pub street: String,
}

impl Address {
    pub fn new(city: impl Into<String>, street: impl Into<String>) -> Self {
        Self {
            id: None,
            city: city.into(),
            street: street.into(),
        }
    }
}
