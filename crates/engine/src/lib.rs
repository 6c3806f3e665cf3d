//! Balance and ledger engine for the admin → super-master → master → agent →
//! client reseller hierarchy.
//!
//! Balances are materialized running totals. Every deposit or withdrawal
//! updates the balance, appends one ledger entry and one transaction record
//! in a single database transaction. Visibility and authority follow the
//! parent links: a principal sees and acts on itself and its subtree, the
//! admin on everything.

pub use commands::{NewPrincipal, TransactionCmd, TransactionReceipt};
pub use commission::Commission;
pub use credentials::{AdminAccount, BcryptCredentials, CredentialVerifier};
pub use error::EngineError;
pub use hooks::{NoopHook, TransactionHook};
pub use ledger::{LedgerEntry, LedgerEntryDraft, LedgerFilter, LedgerKind, TransactionKind};
pub use money::{Money, format_minor};
pub use ops::{DEFAULT_LOCK_TIMEOUT, DashboardStats, Engine, EngineBuilder, Reconciliation};
pub use principals::{Actor, Identifier, Principal, PrincipalKind, PrincipalRef, Target};
pub use transactions::TransactionRecord;

mod commands;
mod commission;
mod credentials;
mod error;
mod hooks;
mod ledger;
mod locks;
mod money;
mod ops;
mod principals;
mod transactions;
mod util;

pub type ResultEngine<T> = Result<T, EngineError>;
