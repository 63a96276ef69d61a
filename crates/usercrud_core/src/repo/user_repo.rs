//! User repository contract and SQLite implementation.
//!
//! # Responsibility
//! - Provide the CRUD surface over the `users` table.
//! - Keep SQL, transactions and connection handling inside this module.
//!
//! # Invariants
//! - Every operation checks out its own pooled connection and releases it
//!   on every exit path.
//! - Writes run in one `IMMEDIATE` transaction, rolled back before any
//!   error is returned.
//! - Reads run without an explicit transaction.
//! - Read-path absence is `Ok(None)`, never an error.
//! - Email addresses are never written to logs.
//! - `email_normalized` is always derived from `email` via
//!   [`normalize_email`]; lookups bind the same normalized value.

use crate::db::{ConnectionFactory, PooledConn};
use crate::model::user::{normalize_email, User, UserId};
use log::{debug, error, warn};
use rusqlite::{ffi, params, ErrorCode, OptionalExtension, Row, Transaction, TransactionBehavior};
use std::error::Error;
use std::fmt::{Display, Formatter};
use std::time::Instant;

const USER_COLUMNS: &str = "id, name, email, age, created_at";

pub type PersistenceResult<T> = Result<T, PersistenceError>;

/// Any failure raised while talking to the store.
#[derive(Debug)]
pub enum PersistenceError {
    /// No pooled connection could be checked out.
    Pool(r2d2::Error),
    /// The store rejected or failed a statement.
    Sqlite(rusqlite::Error),
    /// `update` was called on a user that was never persisted.
    MissingId,
    /// `create` was called on a user that already has an identity.
    AlreadyPersisted(UserId),
    /// `update` targeted a row that no longer exists.
    MissingRow(UserId),
    /// A stored row does not satisfy the entity shape.
    InvalidData(String),
}

/// Structured classification of a store constraint failure.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConstraintViolation {
    /// A unique index rejected the row (the normalized email index).
    Unique,
    /// A required column was null.
    NotNull,
    /// A CHECK constraint rejected a field value.
    Check,
    /// The primary key collided.
    PrimaryKey,
    /// Some other constraint kind reported by the store.
    Other,
}

impl PersistenceError {
    /// Classifies a constraint failure from the SQLite extended result code.
    ///
    /// Returns `None` when the error is not a constraint violation.
    pub fn constraint_violation(&self) -> Option<ConstraintViolation> {
        let Self::Sqlite(rusqlite::Error::SqliteFailure(failure, _)) = self else {
            return None;
        };
        if failure.code != ErrorCode::ConstraintViolation {
            return None;
        }

        Some(match failure.extended_code {
            ffi::SQLITE_CONSTRAINT_UNIQUE => ConstraintViolation::Unique,
            ffi::SQLITE_CONSTRAINT_NOTNULL => ConstraintViolation::NotNull,
            ffi::SQLITE_CONSTRAINT_CHECK => ConstraintViolation::Check,
            ffi::SQLITE_CONSTRAINT_PRIMARYKEY => ConstraintViolation::PrimaryKey,
            _ => ConstraintViolation::Other,
        })
    }

    fn code(&self) -> &'static str {
        match self {
            Self::Pool(_) => "pool_unavailable",
            Self::Sqlite(_) => match self.constraint_violation() {
                Some(ConstraintViolation::Unique) => "unique_violation",
                Some(ConstraintViolation::NotNull) => "not_null_violation",
                Some(ConstraintViolation::Check) => "check_violation",
                Some(ConstraintViolation::PrimaryKey) => "primary_key_violation",
                Some(ConstraintViolation::Other) => "constraint_violation",
                None => "sqlite_error",
            },
            Self::MissingId => "missing_id",
            Self::AlreadyPersisted(_) => "already_persisted",
            Self::MissingRow(_) => "missing_row",
            Self::InvalidData(_) => "invalid_data",
        }
    }
}

impl Display for PersistenceError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Pool(err) => write!(f, "could not acquire a database connection: {err}"),
            Self::Sqlite(err) => write!(f, "database error: {err}"),
            Self::MissingId => write!(f, "cannot update a user that has no id"),
            Self::AlreadyPersisted(id) => write!(f, "user {id} is already persisted"),
            Self::MissingRow(id) => write!(f, "user row {id} no longer exists"),
            Self::InvalidData(message) => write!(f, "invalid persisted user data: {message}"),
        }
    }
}

impl Error for PersistenceError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Pool(err) => Some(err),
            Self::Sqlite(err) => Some(err),
            _ => None,
        }
    }
}

impl From<rusqlite::Error> for PersistenceError {
    fn from(value: rusqlite::Error) -> Self {
        Self::Sqlite(value)
    }
}

impl From<r2d2::Error> for PersistenceError {
    fn from(value: r2d2::Error) -> Self {
        Self::Pool(value)
    }
}

/// Repository interface for user persistence.
pub trait UserRepository {
    /// Inserts `user` and returns the committed row with `id` and
    /// `created_at` assigned.
    fn create(&self, user: &User) -> PersistenceResult<User>;
    /// Looks up one user by primary key.
    fn find_by_id(&self, id: UserId) -> PersistenceResult<Option<User>>;
    /// Looks up one user by email, ignoring case and surrounding whitespace.
    fn find_by_email(&self, email: &str) -> PersistenceResult<Option<User>>;
    /// Returns every user in insertion order.
    fn find_all(&self) -> PersistenceResult<Vec<User>>;
    /// Overwrites the row for `user.id` and returns the committed row.
    fn update(&self, user: &User) -> PersistenceResult<User>;
    /// Removes the row for `id`. Succeeds whether or not the row existed.
    fn delete(&self, id: UserId) -> PersistenceResult<()>;
}

/// SQLite-backed user repository.
///
/// Holds only a factory handle, so it can be cloned and shared across
/// threads; no connection outlives a single call.
#[derive(Debug, Clone)]
pub struct SqliteUserRepository {
    factory: ConnectionFactory,
}

impl SqliteUserRepository {
    pub fn new(factory: ConnectionFactory) -> Self {
        Self { factory }
    }

    fn read<T>(
        &self,
        event: &'static str,
        work: impl FnOnce(&PooledConn) -> PersistenceResult<T>,
    ) -> PersistenceResult<T> {
        let started_at = Instant::now();
        let result = self
            .factory
            .acquire()
            .map_err(PersistenceError::from)
            .and_then(|conn| work(&conn));

        match &result {
            Ok(_) => debug!(
                "event={event} module=repo status=ok duration_ms={}",
                started_at.elapsed().as_millis()
            ),
            Err(err) => error!(
                "event={event} module=repo status=error duration_ms={} error_code={} error={err}",
                started_at.elapsed().as_millis(),
                err.code()
            ),
        }
        result
    }

    fn write<T>(
        &self,
        event: &'static str,
        work: impl FnOnce(&Transaction<'_>) -> PersistenceResult<T>,
    ) -> PersistenceResult<T> {
        let started_at = Instant::now();
        let result = self.run_in_transaction(event, work);

        match &result {
            Ok(_) => debug!(
                "event={event} module=repo status=ok duration_ms={}",
                started_at.elapsed().as_millis()
            ),
            Err(err) => error!(
                "event={event} module=repo status=error duration_ms={} error_code={} error={err}",
                started_at.elapsed().as_millis(),
                err.code()
            ),
        }
        result
    }

    fn run_in_transaction<T>(
        &self,
        event: &'static str,
        work: impl FnOnce(&Transaction<'_>) -> PersistenceResult<T>,
    ) -> PersistenceResult<T> {
        let mut conn = self.factory.acquire()?;
        let tx = conn.transaction_with_behavior(TransactionBehavior::Immediate)?;

        match work(&tx) {
            Ok(value) => {
                // A failed commit drops `tx`, which rolls back.
                tx.commit()?;
                Ok(value)
            }
            Err(err) => {
                if let Err(rollback_err) = tx.rollback() {
                    warn!(
                        "event={event} module=repo status=rollback_failed error={rollback_err}"
                    );
                }
                Err(err)
            }
        }
    }
}

impl UserRepository for SqliteUserRepository {
    fn create(&self, user: &User) -> PersistenceResult<User> {
        if let Some(id) = user.id {
            return Err(PersistenceError::AlreadyPersisted(id));
        }

        let created = self.write("user_create", |tx| {
            let row = tx.query_row(
                &format!(
                    "INSERT INTO users (name, email, email_normalized, age, created_at)
                     VALUES (?1, ?2, ?3, ?4, COALESCE(?5, strftime('%s', 'now') * 1000))
                     RETURNING {USER_COLUMNS};"
                ),
                params![
                    user.name,
                    user.email,
                    normalize_email(&user.email),
                    user.age,
                    user.created_at
                ],
                user_from_row,
            )?;
            Ok(row)
        })?;

        debug!(
            "event=user_create module=repo status=committed id={}",
            created.id.unwrap_or_default()
        );
        Ok(created)
    }

    fn find_by_id(&self, id: UserId) -> PersistenceResult<Option<User>> {
        self.read("user_find_by_id", |conn| {
            let user = conn
                .query_row(
                    &format!("SELECT {USER_COLUMNS} FROM users WHERE id = ?1;"),
                    [id],
                    user_from_row,
                )
                .optional()?;
            user.map(ensure_valid).transpose()
        })
    }

    fn find_by_email(&self, email: &str) -> PersistenceResult<Option<User>> {
        self.read("user_find_by_email", |conn| {
            let user = conn
                .query_row(
                    &format!(
                        "SELECT {USER_COLUMNS}
                         FROM users
                         WHERE email_normalized = ?1;"
                    ),
                    [normalize_email(email)],
                    user_from_row,
                )
                .optional()?;
            user.map(ensure_valid).transpose()
        })
    }

    fn find_all(&self) -> PersistenceResult<Vec<User>> {
        self.read("user_find_all", |conn| {
            let mut stmt = conn.prepare(&format!(
                "SELECT {USER_COLUMNS} FROM users ORDER BY id ASC;"
            ))?;
            let mut rows = stmt.query([])?;
            let mut users = Vec::new();

            while let Some(row) = rows.next()? {
                users.push(ensure_valid(user_from_row(row)?)?);
            }

            Ok(users)
        })
    }

    fn update(&self, user: &User) -> PersistenceResult<User> {
        let id = user.id.ok_or(PersistenceError::MissingId)?;

        self.write("user_update", |tx| {
            // `created_at` is deliberately absent from the SET list.
            tx.query_row(
                &format!(
                    "UPDATE users
                     SET
                        name = ?2,
                        email = ?3,
                        email_normalized = ?4,
                        age = ?5
                     WHERE id = ?1
                     RETURNING {USER_COLUMNS};"
                ),
                params![id, user.name, user.email, normalize_email(&user.email), user.age],
                user_from_row,
            )
            .optional()?
            .ok_or(PersistenceError::MissingRow(id))
        })
    }

    fn delete(&self, id: UserId) -> PersistenceResult<()> {
        let removed = self.write("user_delete", |tx| {
            let changed = tx.execute("DELETE FROM users WHERE id = ?1;", [id])?;
            Ok(changed)
        })?;

        debug!("event=user_delete module=repo status=committed id={id} removed={removed}");
        Ok(())
    }
}

fn user_from_row(row: &Row<'_>) -> rusqlite::Result<User> {
    Ok(User {
        id: Some(row.get("id")?),
        name: row.get("name")?,
        email: row.get("email")?,
        age: row.get("age")?,
        created_at: Some(row.get("created_at")?),
    })
}

fn ensure_valid(user: User) -> PersistenceResult<User> {
    user.validate().map_err(|err| {
        PersistenceError::InvalidData(format!(
            "row {} in users: {err}",
            user.id.unwrap_or_default()
        ))
    })?;
    Ok(user)
}
