//! The transaction engine: the only code that moves a balance.
//!
//! One money movement is one database transaction holding the balance
//! update, the ledger entry and its transaction record. Movements on the
//! same principal are serialized through [`TargetLocks`](crate::locks);
//! different principals never share a lock.

use chrono::{NaiveDate, Utc};
use sea_orm::{ConnectionTrait, QueryFilter, TransactionTrait, prelude::*, sea_query::Expr};
use tracing::{error, info};
use uuid::Uuid;

use crate::{
    Actor, EngineError, LedgerEntry, LedgerEntryDraft, LedgerKind, PrincipalRef, ResultEngine,
    Target, TransactionCmd, TransactionKind, TransactionReceipt, principals, transactions,
    util::{normalize_optional_text, normalize_required_text},
};

use super::{Engine, with_tx};

impl Engine {
    /// Deposit into or withdraw from one principal and return its new
    /// balance.
    ///
    /// Checks, in order: positive amount, target exists and is not blocked,
    /// `actor` may act on the target. Withdrawals are not floored at zero.
    pub async fn execute(
        &self,
        actor: &Actor,
        cmd: TransactionCmd,
    ) -> ResultEngine<TransactionReceipt> {
        if cmd.amount_minor <= 0 {
            return Err(EngineError::InvalidAmount(format!(
                "amount must be > 0, got {}",
                cmd.amount_minor
            )));
        }
        let target = with_tx!(self, |db_tx| {
            let principal = self.require_active_principal(&db_tx, &cmd.target).await?;
            self.require_act(&db_tx, actor, &principal).await?;
            Ok(principal.reference())
        })?;

        let kind = cmd.kind;
        let description = normalize_optional_text(cmd.description.as_deref())
            .unwrap_or_else(|| format!("{} by {}", title(kind), actor.identity()));
        let draft = LedgerEntryDraft {
            event_id: Uuid::new_v4(),
            principal: target,
            kind: kind.into(),
            amount: cmd.amount_minor,
            date: cmd.date.unwrap_or_else(|| Utc::now().date_naive()),
            description,
            created_by: actor.identity(),
        };

        let _guard = self.locks.acquire(target, self.lock_timeout).await?;
        let result = with_tx!(self, |db_tx| {
            self.apply_movement(&db_tx, target, kind, &draft).await
        });

        let (entry, new_balance) = result.inspect_err(|err| {
            if err.is_persistence_failure() {
                error!(principal = %target, error = %err, "transaction rolled back");
            }
        })?;
        info!(
            principal = %target,
            kind = kind.as_str(),
            amount = entry.amount,
            new_balance,
            created_by = %entry.created_by,
            "transaction committed"
        );
        self.hook.committed(&entry, new_balance);
        Ok(TransactionReceipt {
            event_id: entry.event_id,
            new_balance,
            entry,
        })
    }

    /// The atomic unit: balance first, then the ledger entry, then its
    /// transaction record.
    ///
    /// The balance UPDATE only matches rows whose new balance stays inside
    /// `i64`; a live row it skipped is an overflow.
    async fn apply_movement<C: ConnectionTrait>(
        &self,
        db: &C,
        target: PrincipalRef,
        kind: TransactionKind,
        draft: &LedgerEntryDraft,
    ) -> ResultEngine<(LedgerEntry, i64)> {
        let delta = LedgerKind::from(kind).signed(draft.amount);
        let in_range = if delta >= 0 {
            principals::Column::Balance.lte(i64::MAX - delta)
        } else {
            principals::Column::Balance.gte(i64::MIN - delta)
        };
        let res = principals::Entity::update_many()
            .col_expr(
                principals::Column::Balance,
                Expr::col(principals::Column::Balance).add(delta),
            )
            .filter(principals::Column::Id.eq(target.id.to_string()))
            .filter(principals::Column::Kind.eq(target.kind.as_str()))
            .filter(principals::Column::Blocked.eq(false))
            .filter(in_range)
            .exec(db)
            .await?;
        if res.rows_affected == 0 {
            let live = principals::Entity::find_by_id(target.id.to_string())
                .filter(principals::Column::Kind.eq(target.kind.as_str()))
                .filter(principals::Column::Blocked.eq(false))
                .one(db)
                .await?;
            return Err(match live {
                Some(row) => EngineError::InvalidAmount(format!(
                    "{} of {} would overflow balance {}",
                    kind.as_str(),
                    draft.amount,
                    row.balance
                )),
                None => EngineError::TargetNotFound(target.to_string()),
            });
        }
        let new_balance = principals::Entity::find_by_id(target.id.to_string())
            .one(db)
            .await?
            .map(|model| model.balance)
            .ok_or_else(|| EngineError::TargetNotFound(target.to_string()))?;
        self.hook.balance_staged(target, new_balance)?;

        let entry = self.append_entry(db, draft).await?;
        self.hook.ledger_staged(&entry)?;

        transactions::ActiveModel::twin_of(&entry, kind)
            .insert(db)
            .await?;
        Ok((entry, new_balance))
    }

    pub async fn deposit(
        &self,
        actor: &Actor,
        target: Target,
        amount_minor: i64,
    ) -> ResultEngine<TransactionReceipt> {
        self.execute(actor, TransactionCmd::deposit(target, amount_minor))
            .await
    }

    pub async fn withdraw(
        &self,
        actor: &Actor,
        target: Target,
        amount_minor: i64,
    ) -> ResultEngine<TransactionReceipt> {
        self.execute(actor, TransactionCmd::withdraw(target, amount_minor))
            .await
    }

    /// Append a zero-amount note. Needs view permission only, and blocked
    /// targets can still be annotated.
    pub async fn annotate(
        &self,
        actor: &Actor,
        target: &Target,
        note: &str,
        date: Option<NaiveDate>,
    ) -> ResultEngine<LedgerEntry> {
        let note = normalize_required_text(note, "note")?;
        let entry = with_tx!(self, |db_tx| {
            let principal = self.require_principal(&db_tx, target).await?;
            self.require_view(&db_tx, actor, &principal).await?;
            let draft = LedgerEntryDraft {
                event_id: Uuid::new_v4(),
                principal: principal.reference(),
                kind: LedgerKind::Note,
                amount: 0,
                date: date.unwrap_or_else(|| Utc::now().date_naive()),
                description: note,
                created_by: actor.identity(),
            };
            self.append_entry(&db_tx, &draft).await
        })?;
        info!(principal = %entry.principal(), created_by = %entry.created_by, "note added");
        Ok(entry)
    }

    pub async fn add_note(
        &self,
        actor: &Actor,
        target: PrincipalRef,
        note: &str,
        date: Option<NaiveDate>,
    ) -> ResultEngine<LedgerEntry> {
        self.annotate(actor, &Target::from(target), note, date).await
    }
}

fn title(kind: TransactionKind) -> &'static str {
    match kind {
        TransactionKind::Deposit => "Deposit",
        TransactionKind::Withdraw => "Withdraw",
    }
}
