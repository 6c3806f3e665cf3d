#![allow(dead_code, clippy::unwrap_used, clippy::expect_used)]

use std::sync::{
    Arc,
    atomic::{AtomicBool, AtomicUsize, Ordering},
};

use sea_orm::{Database, DatabaseConnection};

use engine::{
    Actor, BcryptCredentials, Commission, CredentialVerifier, EngineError, Engine, LedgerEntry,
    NewPrincipal, Principal, PrincipalKind, PrincipalRef, ResultEngine, TransactionHook,
};
use migration::MigratorTrait;

pub async fn memory_db() -> DatabaseConnection {
    let db = Database::connect("sqlite::memory:").await.unwrap();
    migration::Migrator::up(&db, None).await.unwrap();
    db
}

pub async fn engine_with_db() -> Engine {
    Engine::builder()
        .database(memory_db().await)
        .credentials(BcryptCredentials::new(4))
        .build()
        .await
        .unwrap()
}

pub async fn engine_with_hook(hook: Arc<dyn TransactionHook>) -> Engine {
    Engine::builder()
        .database(memory_db().await)
        .credentials(BcryptCredentials::new(4))
        .hook(hook)
        .build()
        .await
        .unwrap()
}

/// Bcrypt at test cost, counting how many hashes were computed.
#[derive(Debug, Default, Clone)]
pub struct CountingCredentials {
    pub hashes: Arc<AtomicUsize>,
}

impl CredentialVerifier for CountingCredentials {
    fn hash_password(&self, password: &str) -> ResultEngine<String> {
        self.hashes.fetch_add(1, Ordering::SeqCst);
        BcryptCredentials::new(4).hash_password(password)
    }

    fn verify_password(&self, password: &str, password_hash: &str) -> ResultEngine<bool> {
        BcryptCredentials::new(4).verify_password(password, password_hash)
    }
}

pub async fn engine_with_credentials(credentials: CountingCredentials) -> Engine {
    Engine::builder()
        .database(memory_db().await)
        .credentials(credentials)
        .build()
        .await
        .unwrap()
}

pub async fn engine_with_file_db() -> (Engine, std::path::PathBuf) {
    let root = std::path::PathBuf::from(env!("CARGO_MANIFEST_DIR")).join("../../target/test_dbs");
    std::fs::create_dir_all(&root).unwrap();

    let path = root.join(format!("engine_{}.db", uuid::Uuid::new_v4()));
    let url = format!("sqlite:{}?mode=rwc", path.display());

    let db = Database::connect(&url).await.unwrap();
    migration::Migrator::up(&db, None).await.unwrap();
    let engine = Engine::builder()
        .database(db)
        .credentials(BcryptCredentials::new(4))
        .build()
        .await
        .unwrap();
    (engine, path)
}

pub fn rate(percent: f64) -> Commission {
    Commission::try_from_percent(percent).unwrap()
}

pub async fn create(
    engine: &Engine,
    actor: &Actor,
    kind: PrincipalKind,
    login: &str,
    parent: Option<&Principal>,
) -> Principal {
    let mut cmd = NewPrincipal::new(kind, login.to_uppercase(), login, "password")
        .commissions(rate(10.0), rate(5.0));
    if let Some(parent) = parent {
        cmd = cmd.parent(parent.id);
    }
    engine.create_principal(actor, cmd).await.unwrap()
}

/// SM1 → M1 → A1 → C1
pub struct Chain {
    pub sm: Principal,
    pub m: Principal,
    pub a: Principal,
    pub c: Principal,
}

pub async fn chain(engine: &Engine, suffix: &str) -> Chain {
    let admin = Actor::Admin;
    let sm = create(engine, &admin, PrincipalKind::SuperMaster, &format!("sm{suffix}"), None).await;
    let m = create(engine, &admin, PrincipalKind::Master, &format!("m{suffix}"), Some(&sm)).await;
    let a = create(engine, &admin, PrincipalKind::Agent, &format!("a{suffix}"), Some(&m)).await;
    let c = create(engine, &admin, PrincipalKind::Client, &format!("c{suffix}"), Some(&a)).await;
    Chain { sm, m, a, c }
}

pub fn as_actor(principal: &Principal) -> Actor {
    Actor::Principal(principal.reference())
}

/// Hook whose staged callbacks fail while the matching switch is on.
#[derive(Debug, Default)]
pub struct FaultSwitch {
    pub fail_after_balance: AtomicBool,
    pub fail_after_ledger: AtomicBool,
    pub committed: AtomicUsize,
}

impl FaultSwitch {
    pub fn arm(&self, after_balance: bool, after_ledger: bool) {
        self.fail_after_balance.store(after_balance, Ordering::SeqCst);
        self.fail_after_ledger.store(after_ledger, Ordering::SeqCst);
    }
}

impl TransactionHook for FaultSwitch {
    fn balance_staged(&self, target: PrincipalRef, _new_balance: i64) -> ResultEngine<()> {
        if self.fail_after_balance.load(Ordering::SeqCst) {
            return Err(EngineError::PersistenceFailure(format!(
                "injected after balance of {target}"
            )));
        }
        Ok(())
    }

    fn ledger_staged(&self, entry: &LedgerEntry) -> ResultEngine<()> {
        if self.fail_after_ledger.load(Ordering::SeqCst) {
            return Err(EngineError::PersistenceFailure(format!(
                "injected after ledger entry {}",
                entry.id
            )));
        }
        Ok(())
    }

    fn committed(&self, _entry: &LedgerEntry, _new_balance: i64) {
        self.committed.fetch_add(1, Ordering::SeqCst);
    }
}
