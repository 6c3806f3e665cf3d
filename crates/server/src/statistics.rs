//! Statistics API endpoints

use api_types::{
    PrincipalKind,
    stats::{Dashboard, Reconciliation},
};
use axum::{
    Extension, Json,
    extract::{Path, State},
};
use engine::Actor;
use uuid::Uuid;

use crate::{
    ServerError,
    principals::{kind_to_api, target},
    server::ServerState,
};

/// Handle requests for the caller's dashboard
pub async fn dashboard(
    Extension(actor): Extension<Actor>,
    State(state): State<ServerState>,
) -> Result<Json<Dashboard>, ServerError> {
    let stats = state.engine.dashboard(&actor).await?;

    Ok(Json(Dashboard {
        subordinate_count: stats.subordinate_count,
        direct_subordinate_count: stats.direct_subordinate_count,
        super_master_count: stats.super_master_count,
        master_count: stats.master_count,
        agent_count: stats.agent_count,
        client_count: stats.client_count,
        active_client_count: stats.active_client_count,
        total_balance: stats.total_balance,
        own_balance: stats.own_balance,
    }))
}

pub async fn reconcile(
    Extension(actor): Extension<Actor>,
    State(state): State<ServerState>,
    Path((kind, id)): Path<(PrincipalKind, Uuid)>,
) -> Result<Json<Reconciliation>, ServerError> {
    let report = state.engine.reconcile(&actor, &target(kind, id)).await?;

    Ok(Json(Reconciliation {
        user_id: report.principal.id,
        user_type: kind_to_api(report.principal.kind),
        opening_balance: report.opening_balance,
        balance: report.balance,
        ledger_deposits: report.ledger_deposits,
        ledger_withdrawals: report.ledger_withdrawals,
        record_deposits: report.record_deposits,
        record_withdrawals: report.record_withdrawals,
        expected_from_ledger: report.expected_from_ledger(),
        expected_from_records: report.expected_from_records(),
        ledger_reconciles: report.ledger_reconciles,
        records_reconcile: report.records_reconcile,
    }))
}
