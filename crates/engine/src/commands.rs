//! Command structs for engine operations.
//!
//! These types group parameters for write operations (principal creation,
//! deposit/withdraw), keeping call sites readable and avoiding long argument
//! lists.

use chrono::NaiveDate;
use uuid::Uuid;

use crate::{Commission, LedgerEntry, PrincipalKind, Target, TransactionKind};

/// Create a principal under `parent_id`.
#[derive(Clone, Debug)]
pub struct NewPrincipal {
    pub kind: PrincipalKind,
    pub username: String,
    pub login_name: String,
    pub password: String,
    pub parent_id: Option<Uuid>,
    pub win_commission: Commission,
    pub loss_commission: Commission,
    pub opening_balance: i64,
}

impl NewPrincipal {
    #[must_use]
    pub fn new(
        kind: PrincipalKind,
        username: impl Into<String>,
        login_name: impl Into<String>,
        password: impl Into<String>,
    ) -> Self {
        Self {
            kind,
            username: username.into(),
            login_name: login_name.into(),
            password: password.into(),
            parent_id: None,
            win_commission: Commission::ZERO,
            loss_commission: Commission::ZERO,
            opening_balance: 0,
        }
    }

    #[must_use]
    pub fn parent(mut self, parent_id: Uuid) -> Self {
        self.parent_id = Some(parent_id);
        self
    }

    #[must_use]
    pub fn commissions(mut self, win: Commission, loss: Commission) -> Self {
        self.win_commission = win;
        self.loss_commission = loss;
        self
    }

    #[must_use]
    pub fn opening_balance(mut self, amount_minor: i64) -> Self {
        self.opening_balance = amount_minor;
        self
    }
}

/// Deposit into or withdraw from one principal.
#[derive(Clone, Debug)]
pub struct TransactionCmd {
    pub target: Target,
    pub kind: TransactionKind,
    pub amount_minor: i64,
    pub description: Option<String>,
    /// Calendar day recorded on the ledger entry. Defaults to today (UTC).
    pub date: Option<NaiveDate>,
}

impl TransactionCmd {
    #[must_use]
    pub fn new(target: Target, kind: TransactionKind, amount_minor: i64) -> Self {
        Self {
            target,
            kind,
            amount_minor,
            description: None,
            date: None,
        }
    }

    #[must_use]
    pub fn deposit(target: Target, amount_minor: i64) -> Self {
        Self::new(target, TransactionKind::Deposit, amount_minor)
    }

    #[must_use]
    pub fn withdraw(target: Target, amount_minor: i64) -> Self {
        Self::new(target, TransactionKind::Withdraw, amount_minor)
    }

    #[must_use]
    pub fn description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    #[must_use]
    pub fn date(mut self, date: NaiveDate) -> Self {
        self.date = Some(date);
        self
    }
}

/// Outcome of a committed deposit/withdraw.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct TransactionReceipt {
    pub event_id: Uuid,
    pub new_balance: i64,
    pub entry: LedgerEntry,
}
