//! Password hashing and verification.
//!
//! The engine never compares passwords itself; it asks the registered
//! [`CredentialVerifier`].

use std::fmt;

use crate::{EngineError, ResultEngine};

pub trait CredentialVerifier: Send + Sync + fmt::Debug {
    fn hash_password(&self, password: &str) -> ResultEngine<String>;

    /// Returns `Ok(false)` for a wrong password. Errors are reserved for
    /// malformed stored hashes.
    fn verify_password(&self, password: &str, password_hash: &str) -> ResultEngine<bool>;
}

/// `bcrypt` backed verifier.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct BcryptCredentials {
    cost: u32,
}

impl BcryptCredentials {
    #[must_use]
    pub const fn new(cost: u32) -> Self {
        Self { cost }
    }

    #[must_use]
    pub const fn cost(&self) -> u32 {
        self.cost
    }
}

impl Default for BcryptCredentials {
    fn default() -> Self {
        Self::new(bcrypt::DEFAULT_COST)
    }
}

impl CredentialVerifier for BcryptCredentials {
    fn hash_password(&self, password: &str) -> ResultEngine<String> {
        if password.is_empty() {
            return Err(EngineError::InvalidInput(
                "password must not be empty".to_string(),
            ));
        }
        bcrypt::hash(password, self.cost)
            .map_err(|err| EngineError::InvalidInput(format!("cannot hash password: {err}")))
    }

    fn verify_password(&self, password: &str, password_hash: &str) -> ResultEngine<bool> {
        bcrypt::verify(password, password_hash)
            .map_err(|err| EngineError::InvalidInput(format!("stored password hash: {err}")))
    }
}

/// The non-persisted admin role's login, checked by
/// [`Engine::authenticate_admin`](crate::Engine::authenticate_admin).
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct AdminAccount {
    pub login_name: String,
    pub password_hash: String,
}
