//! Khata (ledger book) API endpoints

use api_types::{
    LedgerKind, PrincipalKind,
    ledger::{DateRange, LedgerEntryView, LedgerQuery, NoteNew, Purge, Purged, TransactionRecordView},
};
use axum::{
    Extension, Json,
    extract::{Path, Query, State},
    http::StatusCode,
};
use engine::{Actor, LedgerEntry, LedgerFilter, TransactionKind, TransactionRecord};
use uuid::Uuid;

use crate::{
    ServerError,
    principals::{kind_from_api, kind_to_api, target},
    server::ServerState,
};

fn ledger_kind_from_api(kind: LedgerKind) -> engine::LedgerKind {
    match kind {
        LedgerKind::Deposit => engine::LedgerKind::Deposit,
        LedgerKind::Withdraw => engine::LedgerKind::Withdraw,
        LedgerKind::Note => engine::LedgerKind::Note,
    }
}

fn ledger_kind_to_api(kind: engine::LedgerKind) -> LedgerKind {
    match kind {
        engine::LedgerKind::Deposit => LedgerKind::Deposit,
        engine::LedgerKind::Withdraw => LedgerKind::Withdraw,
        engine::LedgerKind::Note => LedgerKind::Note,
    }
}

pub(crate) fn entry_view(entry: LedgerEntry) -> LedgerEntryView {
    LedgerEntryView {
        id: entry.id,
        user_id: entry.user_id,
        user_type: kind_to_api(entry.user_type),
        transaction_type: ledger_kind_to_api(entry.kind),
        amount: entry.amount,
        date: entry.date,
        description: entry.description,
        created_by: entry.created_by,
        created_at: entry.created_at,
    }
}

fn record_view(record: TransactionRecord) -> TransactionRecordView {
    let transaction_type = match record.kind {
        TransactionKind::Deposit => LedgerKind::Deposit,
        TransactionKind::Withdraw => LedgerKind::Withdraw,
    };
    TransactionRecordView {
        id: record.id,
        event_id: record.event_id,
        user_id: record.user_id,
        user_type: kind_to_api(record.user_type),
        transaction_type,
        amount: record.amount,
        description: record.description,
        created_by: record.created_by,
        created_at: record.created_at,
    }
}

fn entry_views(entries: Vec<LedgerEntry>) -> Json<Vec<LedgerEntryView>> {
    Json(entries.into_iter().map(entry_view).collect())
}

/// Khata of one principal, most recent first.
pub async fn list(
    Extension(actor): Extension<Actor>,
    State(state): State<ServerState>,
    Path((kind, id)): Path<(PrincipalKind, Uuid)>,
    Query(range): Query<DateRange>,
) -> Result<Json<Vec<LedgerEntryView>>, ServerError> {
    let entries = state
        .engine
        .list_khata(&actor, &target(kind, id), range.from, range.to)
        .await?;
    Ok(entry_views(entries))
}

pub async fn add_note(
    Extension(actor): Extension<Actor>,
    State(state): State<ServerState>,
    Path((kind, id)): Path<(PrincipalKind, Uuid)>,
    Json(payload): Json<NoteNew>,
) -> Result<(StatusCode, Json<LedgerEntryView>), ServerError> {
    let entry = state
        .engine
        .annotate(&actor, &target(kind, id), &payload.note, payload.date)
        .await?;
    Ok((StatusCode::CREATED, Json(entry_view(entry))))
}

pub async fn report(
    Extension(actor): Extension<Actor>,
    State(state): State<ServerState>,
    Query(query): Query<LedgerQuery>,
) -> Result<Json<Vec<LedgerEntryView>>, ServerError> {
    let filter = LedgerFilter {
        user_id: query.user_id,
        user_type: query.user_type.map(kind_from_api),
        kinds: query
            .transaction_type
            .map(|kind| vec![ledger_kind_from_api(kind)]),
        from: query.from,
        to: query.to,
        limit: query.limit,
    };
    let entries = state.engine.ledger_report(&actor, &filter).await?;
    Ok(entry_views(entries))
}

pub async fn purge(
    Extension(actor): Extension<Actor>,
    State(state): State<ServerState>,
    Json(payload): Json<Purge>,
) -> Result<Json<Purged>, ServerError> {
    let deleted = state
        .engine
        .purge_ledger_entries(&actor, &payload.ids)
        .await?;
    Ok(Json(Purged { deleted }))
}

pub async fn records(
    Extension(actor): Extension<Actor>,
    State(state): State<ServerState>,
    Path((kind, id)): Path<(PrincipalKind, Uuid)>,
) -> Result<Json<Vec<TransactionRecordView>>, ServerError> {
    let records = state
        .engine
        .transaction_records(&actor, &target(kind, id))
        .await?;
    Ok(Json(records.into_iter().map(record_view).collect()))
}
