//! Transaction records.
//!
//! A `TransactionRecord` is the durable audit twin of a deposit/withdraw
//! ledger entry. Both rows share the same `event_id`. Records are never
//! purged, so reconciliation still works after ledger rows are deleted.

use chrono::{DateTime, Utc};
use sea_orm::{ActiveValue, entity::prelude::*};
use serde::Serialize;
use uuid::Uuid;

use crate::{
    EngineError, LedgerEntry, PrincipalKind, TransactionKind, util::parse_uuid,
};

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct TransactionRecord {
    pub id: i64,
    pub event_id: Uuid,
    pub user_id: Uuid,
    pub user_type: PrincipalKind,
    pub kind: TransactionKind,
    pub amount: i64,
    pub description: String,
    pub created_by: String,
    pub created_at: DateTime<Utc>,
}

#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel)]
#[sea_orm(table_name = "transactions")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i64,
    pub event_id: String,
    pub user_id: String,
    pub user_type: String,
    pub transaction_type: String,
    pub amount: i64,
    pub description: String,
    pub created_by: String,
    pub created_at: DateTimeUtc,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {}

impl ActiveModelBehavior for ActiveModel {}

impl ActiveModel {
    /// Twin row for a money-moving ledger entry.
    pub(crate) fn twin_of(entry: &LedgerEntry, kind: TransactionKind) -> Self {
        Self {
            id: ActiveValue::NotSet,
            event_id: ActiveValue::Set(entry.event_id.to_string()),
            user_id: ActiveValue::Set(entry.user_id.to_string()),
            user_type: ActiveValue::Set(entry.user_type.as_str().to_string()),
            transaction_type: ActiveValue::Set(kind.as_str().to_string()),
            amount: ActiveValue::Set(entry.amount),
            description: ActiveValue::Set(entry.description.clone()),
            created_by: ActiveValue::Set(entry.created_by.clone()),
            created_at: ActiveValue::Set(entry.created_at),
        }
    }
}

impl TryFrom<Model> for TransactionRecord {
    type Error = EngineError;

    fn try_from(model: Model) -> Result<Self, Self::Error> {
        let kind = match model.transaction_type.as_str() {
            "deposit" => TransactionKind::Deposit,
            "withdraw" => TransactionKind::Withdraw,
            other => {
                return Err(EngineError::InvalidInput(format!(
                    "invalid transaction kind: {other}"
                )));
            }
        };
        Ok(Self {
            id: model.id,
            event_id: parse_uuid(&model.event_id, "event")?,
            user_id: parse_uuid(&model.user_id, "principal")?,
            user_type: PrincipalKind::try_from(model.user_type.as_str())?,
            kind,
            amount: model.amount,
            description: model.description,
            created_by: model.created_by,
            created_at: model.created_at,
        })
    }
}
