//! Read-side aggregation: subordinate lists, dashboards, reconciliation.

use std::collections::HashSet;

use sea_orm::{QueryFilter, TransactionTrait, prelude::*};
use serde::Serialize;
use tracing::{debug, warn};

use crate::{
    Actor, EngineError, LedgerFilter, LedgerKind, Principal, PrincipalKind, PrincipalRef,
    ResultEngine, Target, TransactionKind, principals,
};

use super::{Engine, with_tx};

/// Counts and balance rollup over the principals below an actor.
///
/// Blocked principals are left out of every figure.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize)]
pub struct DashboardStats {
    pub subordinate_count: u64,
    pub direct_subordinate_count: u64,
    pub super_master_count: u64,
    pub master_count: u64,
    pub agent_count: u64,
    pub client_count: u64,
    /// Counted clients holding a positive balance.
    pub active_client_count: u64,
    /// Sum of the counted principals' balances, wider than one balance.
    pub total_balance: i128,
    /// The actor's own balance; zero for the admin.
    pub own_balance: i64,
}

impl DashboardStats {
    fn count(&mut self, principal: &Principal, direct: bool) {
        self.subordinate_count += 1;
        if direct {
            self.direct_subordinate_count += 1;
        }
        match principal.kind {
            PrincipalKind::SuperMaster => self.super_master_count += 1,
            PrincipalKind::Master => self.master_count += 1,
            PrincipalKind::Agent => self.agent_count += 1,
            PrincipalKind::Client => {
                self.client_count += 1;
                if principal.balance > 0 {
                    self.active_client_count += 1;
                }
            }
        }
        self.total_balance += i128::from(principal.balance);
    }
}

/// Stored balance checked against both audit trails of one principal.
///
/// Trail sums are `i128`: deposits and withdrawals can each exceed the
/// range of a single balance while the net stays inside it.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct Reconciliation {
    pub principal: PrincipalRef,
    pub opening_balance: i64,
    pub balance: i64,
    pub ledger_deposits: i128,
    pub ledger_withdrawals: i128,
    pub record_deposits: i128,
    pub record_withdrawals: i128,
    pub ledger_reconciles: bool,
    pub records_reconcile: bool,
}

impl Reconciliation {
    #[must_use]
    pub fn expected_from_ledger(&self) -> i128 {
        i128::from(self.opening_balance) + self.ledger_deposits - self.ledger_withdrawals
    }

    #[must_use]
    pub fn expected_from_records(&self) -> i128 {
        i128::from(self.opening_balance) + self.record_deposits - self.record_withdrawals
    }
}

fn newest_first(principals: &mut [Principal]) {
    principals.sort_by(|a, b| {
        b.created_at
            .cmp(&a.created_at)
            .then_with(|| b.id.cmp(&a.id))
    });
}

impl Engine {
    /// Principals below `actor`, optionally of one kind, newest first.
    ///
    /// Blocked principals are included so they can be unblocked.
    pub async fn subordinates_of(
        &self,
        actor: &Actor,
        kind: Option<PrincipalKind>,
    ) -> ResultEngine<Vec<Principal>> {
        with_tx!(self, |db_tx| {
            self.require_actor(&db_tx, actor).await?;
            let mut out: Vec<Principal> = self
                .descendants_in(&db_tx, actor)
                .await?
                .into_iter()
                .filter(|p| kind.is_none_or(|k| p.kind == k))
                .collect();
            newest_first(&mut out);
            Ok(out)
        })
    }

    /// Admin figures are global; a principal's figures cover its subtree.
    pub async fn dashboard(&self, actor: &Actor) -> ResultEngine<DashboardStats> {
        with_tx!(self, |db_tx| {
            let me = self.require_actor(&db_tx, actor).await?;
            let mut stats = DashboardStats::default();
            match me {
                None => {
                    let active = principals::Entity::find()
                        .filter(principals::Column::Blocked.eq(false))
                        .all(&db_tx)
                        .await?;
                    for model in active {
                        let principal = Principal::try_from(model)?;
                        let direct = principal.kind == PrincipalKind::SuperMaster;
                        stats.count(&principal, direct);
                    }
                }
                Some(me) => {
                    let below = self.descendants_in(&db_tx, actor).await?;
                    for principal in below.iter().filter(|p| !p.blocked) {
                        stats.count(principal, principal.parent() == Some(me.reference()));
                    }
                    stats.own_balance = me.balance;
                }
            }
            debug!(actor = %actor.identity(), ?stats, "dashboard");
            Ok(stats)
        })
    }

    /// Compare the stored balance with the opening balance plus the net of
    /// the ledger and, separately, of the transaction records.
    pub async fn reconcile(&self, actor: &Actor, target: &Target) -> ResultEngine<Reconciliation> {
        let report = with_tx!(self, |db_tx| {
            let principal = self.require_principal(&db_tx, target).await?;
            self.require_view(&db_tx, actor, &principal).await?;
            let reference = principal.reference();

            let entries = self
                .query_entries(&db_tx, &LedgerFilter::principal(reference))
                .await?;
            let sum_entries = |kind: LedgerKind| {
                entries
                    .iter()
                    .filter(|e| e.kind == kind)
                    .map(|e| i128::from(e.amount))
                    .sum::<i128>()
            };
            let records = self.records_for(&db_tx, reference).await?;
            let sum_records = |kind: TransactionKind| {
                records
                    .iter()
                    .filter(|r| r.kind == kind)
                    .map(|r| i128::from(r.amount))
                    .sum::<i128>()
            };

            let mut report = Reconciliation {
                principal: reference,
                opening_balance: principal.opening_balance,
                balance: principal.balance,
                ledger_deposits: sum_entries(LedgerKind::Deposit),
                ledger_withdrawals: sum_entries(LedgerKind::Withdraw),
                record_deposits: sum_records(TransactionKind::Deposit),
                record_withdrawals: sum_records(TransactionKind::Withdraw),
                ledger_reconciles: false,
                records_reconcile: false,
            };
            let balance = i128::from(report.balance);
            report.ledger_reconciles = report.expected_from_ledger() == balance;
            report.records_reconcile = report.expected_from_records() == balance;
            Ok(report)
        })?;
        if !report.records_reconcile {
            warn!(principal = %report.principal, ?report, "balance does not reconcile");
        }
        Ok(report)
    }

    /// Principals whose parent row no longer exists. Admin only.
    pub async fn orphaned_principals(&self, actor: &Actor) -> ResultEngine<Vec<Principal>> {
        if !actor.is_admin() {
            return Err(EngineError::Unauthorized(
                "only the admin can list orphans".to_string(),
            ));
        }
        with_tx!(self, |db_tx| {
            let all: Vec<Principal> = principals::Entity::find()
                .all(&db_tx)
                .await?
                .into_iter()
                .map(Principal::try_from)
                .collect::<ResultEngine<_>>()?;
            let present: HashSet<PrincipalRef> = all.iter().map(Principal::reference).collect();
            let mut orphans: Vec<Principal> = all
                .into_iter()
                .filter(|p| p.parent().is_some_and(|parent| !present.contains(&parent)))
                .collect();
            newest_first(&mut orphans);
            Ok(orphans)
        })
    }
}
