//! Callbacks around the atomic unit of a money movement.
//!
//! ```text
//! UPDATE balance -> balance_staged -> INSERT ledger entry -> ledger_staged
//!     -> INSERT transaction record -> COMMIT -> committed
//! ```
//!
//! An error from either staged callback aborts the unit and nothing is
//! persisted. `committed` only observes.

use std::fmt;

use crate::{LedgerEntry, PrincipalRef, ResultEngine};

pub trait TransactionHook: Send + Sync + fmt::Debug {
    fn balance_staged(&self, _target: PrincipalRef, _new_balance: i64) -> ResultEngine<()> {
        Ok(())
    }

    fn ledger_staged(&self, _entry: &LedgerEntry) -> ResultEngine<()> {
        Ok(())
    }

    fn committed(&self, _entry: &LedgerEntry, _new_balance: i64) {}
}

#[derive(Clone, Copy, Debug, Default)]
pub struct NoopHook;

impl TransactionHook for NoopHook {}
