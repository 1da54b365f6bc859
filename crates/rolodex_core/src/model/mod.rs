//! Entity model for persons and the records they own.
//!
//! # Responsibility
//! - Define the plain data shapes persisted by the repository layer.
//! - Keep associations explicit: owned collections by value, inverse sides by id.
//!
//! # Invariants
//! - `id` is `None` for transient records and is assigned once by persistence.
//! - Model types carry no storage or validation logic.

pub mod address;
pub mod bookmark;
pub mod person;
pub mod pet;

/// Surrogate identity generated by the storage layer.
pub type EntityId = i64;
