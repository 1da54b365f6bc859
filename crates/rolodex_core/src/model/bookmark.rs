//! Bookmark entity.

use crate::model::EntityId;
use serde::{Deserialize, Serialize};

/// A titled link owned by at most one person.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Bookmark {
    /// Generated on first persist.
    pub id: Option<EntityId>,
    pub title: String,
    pub url: String,
}

impl Bookmark {
    /// Creates a transient bookmark.
    pub fn new(title: impl Into<String>, url: impl Into<String>) -> Self {
        Self {
            id: None,
            title: title.into(),
            url: url.into(),
        }
    }
}
