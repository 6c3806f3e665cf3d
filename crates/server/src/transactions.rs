//! Deposit and withdraw API endpoints

use api_types::transaction::{TransactionCreated, TransactionNew};
use axum::{Extension, Json, extract::State, http::StatusCode};
use engine::{Actor, Target, TransactionCmd, TransactionKind};

use crate::{ServerError, khata::entry_view, principals::kind_from_api, server::ServerState};

async fn handle(
    actor: Actor,
    state: ServerState,
    kind: TransactionKind,
    payload: TransactionNew,
) -> Result<(StatusCode, Json<TransactionCreated>), ServerError> {
    let user_type = kind_from_api(payload.user_type);
    let target = match (payload.user_id, payload.login_name) {
        (Some(id), _) => Target::id(user_type, id),
        (None, Some(login_name)) => Target::login(user_type, login_name),
        (None, None) => {
            return Err(ServerError::Generic(
                "user_id or login_name required".to_string(),
            ));
        }
    };

    let mut cmd = TransactionCmd::new(target, kind, payload.amount);
    if let Some(description) = payload.description {
        cmd = cmd.description(description);
    }
    if let Some(date) = payload.date {
        cmd = cmd.date(date);
    }

    let receipt = state.engine.execute(&actor, cmd).await?;
    Ok((
        StatusCode::CREATED,
        Json(TransactionCreated {
            event_id: receipt.event_id,
            new_balance: receipt.new_balance,
            entry: entry_view(receipt.entry),
        }),
    ))
}

pub async fn deposit(
    Extension(actor): Extension<Actor>,
    State(state): State<ServerState>,
    Json(payload): Json<TransactionNew>,
) -> Result<(StatusCode, Json<TransactionCreated>), ServerError> {
    handle(actor, state, TransactionKind::Deposit, payload).await
}

pub async fn withdraw(
    Extension(actor): Extension<Actor>,
    State(state): State<ServerState>,
    Json(payload): Json<TransactionNew>,
) -> Result<(StatusCode, Json<TransactionCreated>), ServerError> {
    handle(actor, state, TransactionKind::Withdraw, payload).await
}
