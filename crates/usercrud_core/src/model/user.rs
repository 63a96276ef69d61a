//! User domain model.
//!
//! # Responsibility
//! - Define the single persisted record managed by the core.
//! - Provide shape validation shared by service and presentation layers.
//!
//! # Invariants
//! - `id` is `Some` if and only if the record has been persisted.
//! - `created_at` is assigned once by the store and never rewritten.
//! - Email uniqueness is owned by the store, never by this type.

use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::error::Error;
use std::fmt::{Display, Formatter};

/// Lowest accepted age, inclusive.
pub const MIN_AGE: i32 = 0;
/// Highest accepted age, inclusive.
pub const MAX_AGE: i32 = 150;

static EMAIL_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^[^\s@]+@[^\s@]+$").expect("valid email regex"));

/// Store-assigned primary key.
pub type UserId = i64;

/// Shape violations detected by [`User::validate`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum UserValidationError {
    /// Name is empty or whitespace only.
    EmptyName,
    /// Email does not look like `local@domain`.
    InvalidEmail(String),
    /// Age is outside `[MIN_AGE, MAX_AGE]`.
    AgeOutOfRange(i32),
}

impl Display for UserValidationError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::EmptyName => write!(f, "name cannot be empty"),
            Self::InvalidEmail(value) => {
                write!(f, "email `{value}` must have the form local@domain")
            }
            Self::AgeOutOfRange(age) => {
                write!(f, "age {age} must be between {MIN_AGE} and {MAX_AGE}")
            }
        }
    }
}

impl Error for UserValidationError {}

/// Canonical user record.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct User {
    /// `None` until the store assigns an identity on insert.
    pub id: Option<UserId>,
    pub name: String,
    /// Compared case- and whitespace-insensitively by lookups.
    pub email: String,
    pub age: Option<i32>,
    /// Unix epoch milliseconds, set by the store on insert when absent.
    pub created_at: Option<i64>,
}

impl User {
    /// Creates a transient user that has not been persisted yet.
    pub fn new(name: impl Into<String>, email: impl Into<String>, age: Option<i32>) -> Self {
        Self {
            id: None,
            name: name.into(),
            email: email.into(),
            age,
            created_at: None,
        }
    }

    /// Returns whether the store has assigned an identity.
    pub fn is_persisted(&self) -> bool {
        self.id.is_some()
    }

    /// Checks field shape: non-blank name, `local@domain` email, bounded age.
    pub fn validate(&self) -> Result<(), UserValidationError> {
        if self.name.trim().is_empty() {
            return Err(UserValidationError::EmptyName);
        }

        if !EMAIL_RE.is_match(self.email.trim()) {
            return Err(UserValidationError::InvalidEmail(self.email.clone()));
        }

        if let Some(age) = self.age {
            validate_age(age)?;
        }

        Ok(())
    }
}

/// Canonical form used for email lookups and uniqueness.
///
/// Strips Unicode whitespace on both ends and applies full Unicode
/// lowercasing, so `" JÖRG@Test.de\t"` and `"jörg@test.de"` compare equal.
pub fn normalize_email(email: &str) -> String {
    email.trim().to_lowercase()
}

/// Checks that `age` lies in `[MIN_AGE, MAX_AGE]`.
pub fn validate_age(age: i32) -> Result<(), UserValidationError> {
    if (MIN_AGE..=MAX_AGE).contains(&age) {
        Ok(())
    } else {
        Err(UserValidationError::AgeOutOfRange(age))
    }
}
