//! Ledger store: append, query, purge.
//!
//! Rows are returned most recent first (`created_at DESC, id DESC`); both the
//! khata view and reconciliation rely on that order.

use chrono::{NaiveDate, Utc};
use sea_orm::{ConnectionTrait, QueryFilter, QueryOrder, QuerySelect, TransactionTrait, prelude::*};
use tracing::{info, warn};

use crate::{
    Actor, EngineError, LedgerEntry, LedgerEntryDraft, LedgerFilter, PrincipalRef, ResultEngine,
    Target, TransactionRecord, ledger, transactions,
};

use super::{Engine, with_tx};

impl Engine {
    /// The only write path into `ledger_entries`.
    pub(super) async fn append_entry<C: ConnectionTrait>(
        &self,
        db: &C,
        draft: &LedgerEntryDraft,
    ) -> ResultEngine<LedgerEntry> {
        draft.validate()?;
        let model = ledger::ActiveModel::from_draft(draft, Utc::now())
            .insert(db)
            .await?;
        LedgerEntry::try_from(model)
    }

    pub(super) async fn query_entries<C: ConnectionTrait>(
        &self,
        db: &C,
        filter: &LedgerFilter,
    ) -> ResultEngine<Vec<LedgerEntry>> {
        let mut query = ledger::Entity::find();
        if let Some(user_id) = filter.user_id {
            query = query.filter(ledger::Column::UserId.eq(user_id.to_string()));
        }
        if let Some(user_type) = filter.user_type {
            query = query.filter(ledger::Column::UserType.eq(user_type.as_str()));
        }
        if let Some(kinds) = &filter.kinds {
            query = query.filter(
                ledger::Column::TransactionType.is_in(kinds.iter().map(|k| k.as_str())),
            );
        }
        if let Some(from) = filter.from {
            query = query.filter(ledger::Column::Date.gte(from));
        }
        if let Some(to) = filter.to {
            query = query.filter(ledger::Column::Date.lte(to));
        }
        if let Some(limit) = filter.limit {
            query = query.limit(limit);
        }
        query
            .order_by_desc(ledger::Column::CreatedAt)
            .order_by_desc(ledger::Column::Id)
            .all(db)
            .await?
            .into_iter()
            .map(LedgerEntry::try_from)
            .collect()
    }

    pub(super) async fn delete_entries<C: ConnectionTrait>(
        &self,
        db: &C,
        ids: &[i64],
    ) -> ResultEngine<u64> {
        if ids.is_empty() {
            return Ok(0);
        }
        let res = ledger::Entity::delete_many()
            .filter(ledger::Column::Id.is_in(ids.iter().copied()))
            .exec(db)
            .await?;
        Ok(res.rows_affected)
    }

    pub(super) async fn records_for<C: ConnectionTrait>(
        &self,
        db: &C,
        principal: PrincipalRef,
    ) -> ResultEngine<Vec<TransactionRecord>> {
        transactions::Entity::find()
            .filter(transactions::Column::UserId.eq(principal.id.to_string()))
            .filter(transactions::Column::UserType.eq(principal.kind.as_str()))
            .order_by_desc(transactions::Column::CreatedAt)
            .order_by_desc(transactions::Column::Id)
            .all(db)
            .await?
            .into_iter()
            .map(TransactionRecord::try_from)
            .collect()
    }

    /// Khata book of one principal, most recent first.
    ///
    /// `from`/`to` restrict the ledger `date`, both inclusive. Blocked
    /// principals keep a readable khata.
    pub async fn list_khata(
        &self,
        actor: &Actor,
        target: &Target,
        from: Option<NaiveDate>,
        to: Option<NaiveDate>,
    ) -> ResultEngine<Vec<LedgerEntry>> {
        with_tx!(self, |db_tx| {
            let principal = self.require_principal(&db_tx, target).await?;
            self.require_view(&db_tx, actor, &principal).await?;
            let filter = LedgerFilter::principal(principal.reference()).dates(from, to);
            self.query_entries(&db_tx, &filter).await
        })
    }

    /// Ledger rows across every principal visible to `actor`.
    pub async fn ledger_report(
        &self,
        actor: &Actor,
        filter: &LedgerFilter,
    ) -> ResultEngine<Vec<LedgerEntry>> {
        with_tx!(self, |db_tx| {
            self.require_actor(&db_tx, actor).await?;
            let Some(visible) = self.visible_ids_in(&db_tx, actor).await? else {
                return self.query_entries(&db_tx, filter).await;
            };
            // Limit applies after visibility filtering.
            let unlimited = LedgerFilter {
                limit: None,
                ..filter.clone()
            };
            let mut entries: Vec<LedgerEntry> = self
                .query_entries(&db_tx, &unlimited)
                .await?
                .into_iter()
                .filter(|entry| visible.contains(&entry.user_id))
                .collect();
            if let Some(limit) = filter.limit {
                entries.truncate(usize::try_from(limit).unwrap_or(usize::MAX));
            }
            Ok(entries)
        })
    }

    /// Administrative deletion of ledger rows.
    ///
    /// Audit-only: balances and transaction records are left untouched, so a
    /// purged principal no longer reconciles against its ledger but still
    /// does against its transaction records.
    pub async fn purge_ledger_entries(&self, actor: &Actor, ids: &[i64]) -> ResultEngine<u64> {
        if !actor.is_admin() {
            warn!(actor = %actor.identity(), "purge denied");
            return Err(EngineError::Unauthorized(
                "only the admin can purge ledger entries".to_string(),
            ));
        }
        let deleted = with_tx!(self, |db_tx| self.delete_entries(&db_tx, ids).await)?;
        info!(requested = ids.len(), deleted, "purged ledger entries");
        Ok(deleted)
    }

    /// Transaction records of one principal, most recent first.
    pub async fn transaction_records(
        &self,
        actor: &Actor,
        target: &Target,
    ) -> ResultEngine<Vec<TransactionRecord>> {
        with_tx!(self, |db_tx| {
            let principal = self.require_principal(&db_tx, target).await?;
            self.require_view(&db_tx, actor, &principal).await?;
            self.records_for(&db_tx, principal.reference()).await
        })
    }
}
