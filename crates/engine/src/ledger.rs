//! Ledger ("khata book") primitives.
//!
//! A `LedgerEntry` is an immutable record of one event against a principal:
//! a deposit, a withdrawal or a zero-amount note. Entries are only ever
//! appended; the administrative purge deletes rows without touching
//! balances.

use chrono::{DateTime, NaiveDate, Utc};
use sea_orm::{ActiveValue, entity::prelude::*};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::{
    EngineError, PrincipalKind, PrincipalRef, ResultEngine,
    util::parse_uuid,
};

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LedgerKind {
    Deposit,
    Withdraw,
    Note,
}

impl LedgerKind {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Deposit => "deposit",
            Self::Withdraw => "withdraw",
            Self::Note => "note",
        }
    }

    /// Signed balance effect of `amount` for this kind.
    #[must_use]
    pub fn signed(self, amount: i64) -> i64 {
        match self {
            Self::Deposit => amount,
            Self::Withdraw => -amount,
            Self::Note => 0,
        }
    }
}

impl TryFrom<&str> for LedgerKind {
    type Error = EngineError;

    fn try_from(value: &str) -> Result<Self, Self::Error> {
        match value {
            "deposit" => Ok(Self::Deposit),
            "withdraw" => Ok(Self::Withdraw),
            "note" => Ok(Self::Note),
            other => Err(EngineError::InvalidInput(format!(
                "invalid ledger kind: {other}"
            ))),
        }
    }
}

/// Money-moving subset of [`LedgerKind`] accepted by the transaction engine.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TransactionKind {
    Deposit,
    Withdraw,
}

impl TransactionKind {
    pub fn as_str(self) -> &'static str {
        LedgerKind::from(self).as_str()
    }
}

impl From<TransactionKind> for LedgerKind {
    fn from(value: TransactionKind) -> Self {
        match value {
            TransactionKind::Deposit => Self::Deposit,
            TransactionKind::Withdraw => Self::Withdraw,
        }
    }
}

/// An entry as handed to the ledger store; id and `created_at` are assigned
/// on append.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct LedgerEntryDraft {
    pub event_id: Uuid,
    pub principal: PrincipalRef,
    pub kind: LedgerKind,
    pub amount: i64,
    pub date: NaiveDate,
    pub description: String,
    pub created_by: String,
}

impl LedgerEntryDraft {
    pub(crate) fn validate(&self) -> ResultEngine<()> {
        match self.kind {
            LedgerKind::Note if self.amount != 0 => Err(EngineError::InvalidAmount(
                "notes carry no amount".to_string(),
            )),
            LedgerKind::Deposit | LedgerKind::Withdraw if self.amount <= 0 => Err(
                EngineError::InvalidAmount("amount must be > 0".to_string()),
            ),
            _ => Ok(()),
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct LedgerEntry {
    pub id: i64,
    pub event_id: Uuid,
    pub user_id: Uuid,
    pub user_type: PrincipalKind,
    pub kind: LedgerKind,
    pub amount: i64,
    pub date: NaiveDate,
    pub description: String,
    pub created_by: String,
    pub created_at: DateTime<Utc>,
}

impl LedgerEntry {
    #[must_use]
    pub fn principal(&self) -> PrincipalRef {
        PrincipalRef::new(self.user_type, self.user_id)
    }
}

/// Selection for ledger queries. Unset fields do not filter.
///
/// `from`/`to` bound the calendar `date` of entries, both inclusive.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct LedgerFilter {
    pub user_id: Option<Uuid>,
    pub user_type: Option<PrincipalKind>,
    pub kinds: Option<Vec<LedgerKind>>,
    pub from: Option<NaiveDate>,
    pub to: Option<NaiveDate>,
    pub limit: Option<u64>,
}

impl LedgerFilter {
    #[must_use]
    pub fn principal(principal: PrincipalRef) -> Self {
        Self {
            user_id: Some(principal.id),
            user_type: Some(principal.kind),
            ..Self::default()
        }
    }

    #[must_use]
    pub fn dates(mut self, from: Option<NaiveDate>, to: Option<NaiveDate>) -> Self {
        self.from = from;
        self.to = to;
        self
    }
}

#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel)]
#[sea_orm(table_name = "ledger_entries")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i64,
    pub event_id: String,
    pub user_id: String,
    pub user_type: String,
    pub transaction_type: String,
    pub amount: i64,
    pub date: Date,
    pub description: String,
    pub created_by: String,
    pub created_at: DateTimeUtc,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {}

impl ActiveModelBehavior for ActiveModel {}

impl ActiveModel {
    pub(crate) fn from_draft(draft: &LedgerEntryDraft, created_at: DateTime<Utc>) -> Self {
        Self {
            id: ActiveValue::NotSet,
            event_id: ActiveValue::Set(draft.event_id.to_string()),
            user_id: ActiveValue::Set(draft.principal.id.to_string()),
            user_type: ActiveValue::Set(draft.principal.kind.as_str().to_string()),
            transaction_type: ActiveValue::Set(draft.kind.as_str().to_string()),
            amount: ActiveValue::Set(draft.amount),
            date: ActiveValue::Set(draft.date),
            description: ActiveValue::Set(draft.description.clone()),
            created_by: ActiveValue::Set(draft.created_by.clone()),
            created_at: ActiveValue::Set(created_at),
        }
    }
}

impl TryFrom<Model> for LedgerEntry {
    type Error = EngineError;

    fn try_from(model: Model) -> Result<Self, Self::Error> {
        Ok(Self {
            id: model.id,
            event_id: parse_uuid(&model.event_id, "event")?,
            user_id: parse_uuid(&model.user_id, "principal")?,
            user_type: PrincipalKind::try_from(model.user_type.as_str())?,
            kind: LedgerKind::try_from(model.transaction_type.as_str())?,
            amount: model.amount,
            date: model.date,
            description: model.description,
            created_by: model.created_by,
            created_at: model.created_at,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn draft(kind: LedgerKind, amount: i64) -> LedgerEntryDraft {
        LedgerEntryDraft {
            event_id: Uuid::new_v4(),
            principal: PrincipalRef::new(PrincipalKind::Client, Uuid::new_v4()),
            kind,
            amount,
            date: NaiveDate::default(),
            description: String::new(),
            created_by: "admin".to_string(),
        }
    }

    #[test]
    fn notes_must_be_zero_and_money_must_be_positive() {
        assert!(draft(LedgerKind::Note, 0).validate().is_ok());
        assert!(draft(LedgerKind::Note, 5).validate().is_err());
        assert!(draft(LedgerKind::Deposit, 1).validate().is_ok());
        assert!(draft(LedgerKind::Deposit, 0).validate().is_err());
        assert!(draft(LedgerKind::Withdraw, -3).validate().is_err());
    }

    #[test]
    fn signed_effect() {
        assert_eq!(LedgerKind::Deposit.signed(300), 300);
        assert_eq!(LedgerKind::Withdraw.signed(300), -300);
        assert_eq!(LedgerKind::Note.signed(300), 0);
    }
}
