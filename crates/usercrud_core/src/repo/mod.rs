//! Repository layer abstractions and persistence implementations.
//!
//! # Responsibility
//! - Define the data access contract used by the service layer.
//! - Isolate SQLite queries and transaction handling from orchestration.
//!
//! # Invariants
//! - Every store failure is surfaced as `PersistenceError` with its cause.
//! - Read-path absence is data (`None`), not an error.

pub mod user_repo;
