//! The module contains the error the engine can throw.
//!
//! The errors are:
//!
//! - [`InvalidAmount`] thrown when a money movement is not strictly positive.
//! - [`TargetNotFound`] thrown when a principal is absent or blocked.
//! - [`Unauthorized`] thrown when the actor has no admin/ancestor relation
//!   to the target.
//! - [`DuplicateLoginName`] thrown when a login name is already taken for a
//!   principal kind.
//! - [`PersistenceFailure`] and [`Database`] thrown when the store cannot
//!   complete an operation. Nothing is partially applied in that case.
//!
//!  [`InvalidAmount`]: EngineError::InvalidAmount
//!  [`TargetNotFound`]: EngineError::TargetNotFound
//!  [`Unauthorized`]: EngineError::Unauthorized
//!  [`DuplicateLoginName`]: EngineError::DuplicateLoginName
//!  [`PersistenceFailure`]: EngineError::PersistenceFailure
//!  [`Database`]: EngineError::Database
use sea_orm::{DbErr, SqlErr};
use thiserror::Error;

/// Engine custom errors.
#[derive(Error, Debug)]
pub enum EngineError {
    #[error("Invalid amount: {0}")]
    InvalidAmount(String),
    #[error("\"{0}\" not found!")]
    TargetNotFound(String),
    #[error("Unauthorized: {0}")]
    Unauthorized(String),
    #[error("\"{0}\" already present!")]
    DuplicateLoginName(String),
    #[error("Invalid parent: {0}")]
    InvalidParent(String),
    #[error("Invalid input: {0}")]
    InvalidInput(String),
    #[error("Persistence failure: {0}")]
    PersistenceFailure(String),
    #[error(transparent)]
    Database(#[from] DbErr),
}

impl EngineError {
    /// Returns `true` when the store, not the caller, is at fault.
    #[must_use]
    pub fn is_persistence_failure(&self) -> bool {
        matches!(self, Self::PersistenceFailure(_) | Self::Database(_))
    }

    /// Maps a unique-constraint violation on `(kind, login_name)` to
    /// [`EngineError::DuplicateLoginName`], leaving other errors untouched.
    pub(crate) fn from_insert(err: DbErr, login_name: &str) -> Self {
        match err.sql_err() {
            Some(SqlErr::UniqueConstraintViolation(_)) => {
                Self::DuplicateLoginName(login_name.to_string())
            }
            _ => Self::Database(err),
        }
    }
}

impl PartialEq for EngineError {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (Self::InvalidAmount(a), Self::InvalidAmount(b)) => a == b,
            (Self::TargetNotFound(a), Self::TargetNotFound(b)) => a == b,
            (Self::Unauthorized(a), Self::Unauthorized(b)) => a == b,
            (Self::DuplicateLoginName(a), Self::DuplicateLoginName(b)) => a == b,
            (Self::InvalidParent(a), Self::InvalidParent(b)) => a == b,
            (Self::InvalidInput(a), Self::InvalidInput(b)) => a == b,
            (Self::PersistenceFailure(a), Self::PersistenceFailure(b)) => a == b,
            (Self::Database(a), Self::Database(b)) => a.to_string() == b.to_string(),
            _ => false,
        }
    }
}
