//! Principal API endpoints

use api_types::{
    PrincipalKind,
    principal::{PrincipalList, PrincipalNew, PrincipalView},
};
use axum::{
    Extension, Json,
    extract::{Path, Query, State},
    http::StatusCode,
};
use engine::{Actor, Commission, NewPrincipal, Principal, Target};
use uuid::Uuid;

use crate::{ServerError, server::ServerState};

pub(crate) fn kind_from_api(kind: PrincipalKind) -> engine::PrincipalKind {
    match kind {
        PrincipalKind::SuperMaster => engine::PrincipalKind::SuperMaster,
        PrincipalKind::Master => engine::PrincipalKind::Master,
        PrincipalKind::Agent => engine::PrincipalKind::Agent,
        PrincipalKind::Client => engine::PrincipalKind::Client,
    }
}

pub(crate) fn kind_to_api(kind: engine::PrincipalKind) -> PrincipalKind {
    match kind {
        engine::PrincipalKind::SuperMaster => PrincipalKind::SuperMaster,
        engine::PrincipalKind::Master => PrincipalKind::Master,
        engine::PrincipalKind::Agent => PrincipalKind::Agent,
        engine::PrincipalKind::Client => PrincipalKind::Client,
    }
}

pub(crate) fn target(kind: PrincipalKind, id: Uuid) -> Target {
    Target::id(kind_from_api(kind), id)
}

fn view(principal: Principal) -> PrincipalView {
    PrincipalView {
        id: principal.id,
        kind: kind_to_api(principal.kind),
        username: principal.username,
        login_name: principal.login_name,
        parent_id: principal.parent_id,
        win_commission: principal.win_commission.percent(),
        loss_commission: principal.loss_commission.percent(),
        opening_balance: principal.opening_balance,
        balance: principal.balance,
        blocked: principal.blocked,
        created_at: principal.created_at,
        last_login_at: principal.last_login_at,
    }
}

fn views(principals: Vec<Principal>) -> Json<Vec<PrincipalView>> {
    Json(principals.into_iter().map(view).collect())
}

pub async fn create(
    Extension(actor): Extension<Actor>,
    State(state): State<ServerState>,
    Json(payload): Json<PrincipalNew>,
) -> Result<(StatusCode, Json<PrincipalView>), ServerError> {
    let mut cmd = NewPrincipal::new(
        kind_from_api(payload.kind),
        payload.username,
        payload.login_name,
        payload.password,
    )
    .commissions(
        Commission::try_from_percent(payload.win_commission)?,
        Commission::try_from_percent(payload.loss_commission)?,
    )
    .opening_balance(payload.opening_balance);
    if let Some(parent_id) = payload.parent_id {
        cmd = cmd.parent(parent_id);
    }

    let principal = state.engine.create_principal(&actor, cmd).await?;
    Ok((StatusCode::CREATED, Json(view(principal))))
}

/// Subordinates of the caller, blocked ones included.
pub async fn list(
    Extension(actor): Extension<Actor>,
    State(state): State<ServerState>,
    Query(params): Query<PrincipalList>,
) -> Result<Json<Vec<PrincipalView>>, ServerError> {
    let subordinates = state
        .engine
        .subordinates_of(&actor, params.kind.map(kind_from_api))
        .await?;
    Ok(views(subordinates))
}

pub async fn get(
    Extension(actor): Extension<Actor>,
    State(state): State<ServerState>,
    Path((kind, id)): Path<(PrincipalKind, Uuid)>,
) -> Result<Json<PrincipalView>, ServerError> {
    let principal = state.engine.principal(&actor, &target(kind, id)).await?;
    Ok(Json(view(principal)))
}

pub async fn delete(
    Extension(actor): Extension<Actor>,
    State(state): State<ServerState>,
    Path((kind, id)): Path<(PrincipalKind, Uuid)>,
) -> Result<StatusCode, ServerError> {
    state
        .engine
        .delete_principal(&actor, &target(kind, id))
        .await?;
    Ok(StatusCode::NO_CONTENT)
}

pub async fn block(
    Extension(actor): Extension<Actor>,
    State(state): State<ServerState>,
    Path((kind, id)): Path<(PrincipalKind, Uuid)>,
) -> Result<Json<PrincipalView>, ServerError> {
    let principal = state
        .engine
        .block_principal(&actor, &target(kind, id))
        .await?;
    Ok(Json(view(principal)))
}

pub async fn unblock(
    Extension(actor): Extension<Actor>,
    State(state): State<ServerState>,
    Path((kind, id)): Path<(PrincipalKind, Uuid)>,
) -> Result<Json<PrincipalView>, ServerError> {
    let principal = state
        .engine
        .unblock_principal(&actor, &target(kind, id))
        .await?;
    Ok(Json(view(principal)))
}

/// Principals the caller may pick as parent for a new principal of `kind`.
pub async fn parents(
    Extension(actor): Extension<Actor>,
    State(state): State<ServerState>,
    Path(kind): Path<PrincipalKind>,
) -> Result<Json<Vec<PrincipalView>>, ServerError> {
    let parents = state
        .engine
        .available_parents(&actor, kind_from_api(kind))
        .await?;
    Ok(views(parents))
}

pub async fn orphans(
    Extension(actor): Extension<Actor>,
    State(state): State<ServerState>,
) -> Result<Json<Vec<PrincipalView>>, ServerError> {
    let orphans = state.engine.orphaned_principals(&actor).await?;
    Ok(views(orphans))
}
