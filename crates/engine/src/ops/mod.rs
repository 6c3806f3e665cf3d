use std::{sync::Arc, time::Duration};

use sea_orm::DatabaseConnection;

use crate::{
    AdminAccount, BcryptCredentials, CredentialVerifier, NoopHook, ResultEngine, TransactionHook,
    locks::TargetLocks,
};

mod accounts;
mod hierarchy;
mod ledger;
mod queries;
mod transactions;

pub use queries::{DashboardStats, Reconciliation};

/// Default bound on waiting for another operation on the same target.
pub const DEFAULT_LOCK_TIMEOUT: Duration = Duration::from_secs(5);

/// Run a block inside a DB transaction, committing on success and rolling back on error.
macro_rules! with_tx {
    ($self:expr, |$tx:ident| $body:expr) => {{
        let $tx = $self.database.begin().await?;
        let result: $crate::ResultEngine<_> = $body;
        match result {
            Ok(value) => {
                $tx.commit().await?;
                Ok(value)
            }
            Err(err) => Err(err),
        }
    }};
}

pub(crate) use with_tx;

/// Entry point of the balance and ledger engine.
///
/// Every public operation takes the calling [`Actor`](crate::Actor)
/// explicitly.
#[derive(Debug)]
pub struct Engine {
    database: DatabaseConnection,
    credentials: Arc<dyn CredentialVerifier>,
    hook: Arc<dyn TransactionHook>,
    locks: TargetLocks,
    lock_timeout: Duration,
    admin: Option<AdminAccount>,
}

impl Engine {
    /// Return a builder for `Engine`. Help to build the struct.
    pub fn builder() -> EngineBuilder {
        EngineBuilder::default()
    }
}

/// The builder for `Engine`
#[derive(Default)]
pub struct EngineBuilder {
    database: DatabaseConnection,
    credentials: Option<Arc<dyn CredentialVerifier>>,
    hook: Option<Arc<dyn TransactionHook>>,
    lock_timeout: Option<Duration>,
    admin: Option<AdminAccount>,
}

impl EngineBuilder {
    /// Pass the required database
    pub fn database(mut self, db: DatabaseConnection) -> EngineBuilder {
        self.database = db;
        self
    }

    /// Replace the default `bcrypt` verifier.
    pub fn credentials(mut self, credentials: impl CredentialVerifier + 'static) -> EngineBuilder {
        self.credentials = Some(Arc::new(credentials));
        self
    }

    pub fn hook(mut self, hook: Arc<dyn TransactionHook>) -> EngineBuilder {
        self.hook = Some(hook);
        self
    }

    pub fn lock_timeout(mut self, timeout: Duration) -> EngineBuilder {
        self.lock_timeout = Some(timeout);
        self
    }

    /// Configure the admin login. Without it `authenticate_admin` always
    /// fails.
    pub fn admin(mut self, admin: AdminAccount) -> EngineBuilder {
        self.admin = Some(admin);
        self
    }

    /// Construct `Engine`
    pub async fn build(self) -> ResultEngine<Engine> {
        Ok(Engine {
            database: self.database,
            credentials: self
                .credentials
                .unwrap_or_else(|| Arc::new(BcryptCredentials::default())),
            hook: self.hook.unwrap_or_else(|| Arc::new(NoopHook)),
            locks: TargetLocks::default(),
            lock_timeout: self.lock_timeout.unwrap_or(DEFAULT_LOCK_TIMEOUT),
            admin: self.admin,
        })
    }
}
