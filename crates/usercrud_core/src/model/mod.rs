//! Domain model for the user store.
//!
//! # Responsibility
//! - Define the data structures passed between service and repository.
//!
//! # Invariants
//! - A user is identified by a store-assigned `UserId` once persisted.
//! - Deletion is a hard delete; removed ids are never reissued.

pub mod user;
