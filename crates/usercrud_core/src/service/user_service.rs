//! User use-case service.
//!
//! # Responsibility
//! - Provide entity-level entry points for the console and other callers.
//! - Apply partial-update semantics on top of full-row repository writes.
//! - Turn a missing target of `update_user` into an explicit error.
//!
//! # Invariants
//! - Persistence errors keep their original kind when surfaced.
//! - Read-path absence stays `Ok(None)`.
//! - `delete_user` on a missing id succeeds, unlike `update_user`.
//! - `update_user` is load-merge-write without locking: concurrent updates
//!   to the same id are last-writer-wins.
//! - No email pre-check before insert; the store's unique index decides.

use crate::model::user::{User, UserId, UserValidationError};
use crate::repo::user_repo::{PersistenceError, UserRepository};
use log::info;
use std::error::Error;
use std::fmt::{Display, Formatter};

pub type ServiceResult<T> = Result<T, ServiceError>;

/// Service error for user use-cases.
#[derive(Debug)]
pub enum ServiceError {
    /// Input does not satisfy the entity shape.
    Validation(UserValidationError),
    /// Target user of a mutating operation does not exist.
    NotFound(UserId),
    /// Persistence-layer failure, unchanged.
    Persistence(PersistenceError),
}

impl Display for ServiceError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Validation(err) => write!(f, "invalid user: {err}"),
            Self::NotFound(id) => write!(f, "user not found with id: {id}"),
            Self::Persistence(err) => write!(f, "{err}"),
        }
    }
}

impl Error for ServiceError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Validation(err) => Some(err),
            Self::NotFound(_) => None,
            Self::Persistence(err) => Some(err),
        }
    }
}

impl From<UserValidationError> for ServiceError {
    fn from(value: UserValidationError) -> Self {
        Self::Validation(value)
    }
}

impl From<PersistenceError> for ServiceError {
    fn from(value: PersistenceError) -> Self {
        Self::Persistence(value)
    }
}

/// User service facade over a repository implementation.
pub struct UserService<R: UserRepository> {
    repo: R,
}

impl<R: UserRepository> UserService<R> {
    /// Creates a service using the provided repository implementation.
    pub fn new(repo: R) -> Self {
        Self { repo }
    }

    /// Borrows the underlying repository.
    pub fn repository(&self) -> &R {
        &self.repo
    }

    /// Builds a transient user from raw fields and persists it.
    ///
    /// Name and email are trimmed; `id` and `created_at` come from the store.
    pub fn create_user(
        &self,
        name: &str,
        email: &str,
        age: Option<i32>,
    ) -> ServiceResult<User> {
        let user = User::new(name.trim(), email.trim(), age);
        user.validate()?;

        let created = self.repo.create(&user)?;
        info!(
            "event=user_created module=service status=ok id={}",
            created.id.unwrap_or_default()
        );
        Ok(created)
    }

    /// Gets one user by id; absence is not an error.
    pub fn get_user_by_id(&self, id: UserId) -> ServiceResult<Option<User>> {
        Ok(self.repo.find_by_id(id)?)
    }

    /// Gets one user by email, ignoring case and surrounding whitespace.
    pub fn get_user_by_email(&self, email: &str) -> ServiceResult<Option<User>> {
        Ok(self.repo.find_by_email(email)?)
    }

    /// Lists every user in insertion order.
    pub fn get_all_users(&self) -> ServiceResult<Vec<User>> {
        Ok(self.repo.find_all()?)
    }

    /// Overwrites only the supplied fields of an existing user.
    ///
    /// # Errors
    /// - `NotFound` when `id` does not exist; the write path is not reached.
    /// - `Validation` when the merged user has an invalid shape.
    /// - `Persistence` when the store rejects the write.
    pub fn update_user(
        &self,
        id: UserId,
        name: Option<&str>,
        email: Option<&str>,
        age: Option<i32>,
    ) -> ServiceResult<User> {
        let mut user = self
            .repo
            .find_by_id(id)?
            .ok_or(ServiceError::NotFound(id))?;

        if let Some(name) = name {
            user.name = name.trim().to_string();
        }
        if let Some(email) = email {
            user.email = email.trim().to_string();
        }
        if let Some(age) = age {
            user.age = Some(age);
        }
        user.validate()?;

        let updated = self.repo.update(&user)?;
        info!("event=user_updated module=service status=ok id={id}");
        Ok(updated)
    }

    /// Deletes a user by id. A missing id is a silent no-op.
    pub fn delete_user(&self, id: UserId) -> ServiceResult<()> {
        self.repo.delete(id)?;
        info!("event=user_deleted module=service status=ok id={id}");
        Ok(())
    }
}
