//! Core domain logic for the user store.
//! This crate owns the entity, its persistence, and partial-update rules.

pub mod config;
pub mod db;
pub mod logging;
pub mod model;
pub mod repo;
pub mod service;

pub use config::{StoreConfig, StoreLocation};
pub use db::{open_factory, open_factory_in_memory, ConnectionFactory, DbError};
pub use logging::{default_log_level, init_logging, logging_status, LoggingError};
pub use model::user::{
    normalize_email, validate_age, User, UserId, UserValidationError, MAX_AGE, MIN_AGE,
};
pub use repo::user_repo::{
    ConstraintViolation, PersistenceError, PersistenceResult, SqliteUserRepository,
    UserRepository,
};
pub use service::user_service::{ServiceError, ServiceResult, UserService};

/// Returns the core crate version.
pub fn core_version() -> &'static str {
    env!("CARGO_PKG_VERSION")
}
