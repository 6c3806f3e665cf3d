use axum::{Json, http::StatusCode, response::IntoResponse};
use engine::EngineError;

use serde::Serialize;
pub use server::{ServerState, router, run, run_with_listener, spawn_with_listener};

mod khata;
mod principals;
mod server;
mod statistics;
mod transactions;

pub mod types {
    pub use api_types::{LedgerKind, PrincipalKind};

    pub mod principal {
        pub use api_types::principal::{PrincipalList, PrincipalNew, PrincipalView};
    }

    pub mod ledger {
        pub use api_types::ledger::{
            DateRange, LedgerEntryView, LedgerQuery, NoteNew, Purge, Purged,
            TransactionRecordView,
        };
    }

    pub mod transaction {
        pub use api_types::transaction::{TransactionCreated, TransactionNew};
    }

    pub mod stats {
        pub use api_types::stats::{Dashboard, Reconciliation};
    }
}

pub enum ServerError {
    Engine(EngineError),
    Generic(String),
}

#[derive(Serialize)]
struct Error {
    error: String,
}

fn status_for_engine_error(err: &EngineError) -> StatusCode {
    match err {
        EngineError::Unauthorized(_) => StatusCode::FORBIDDEN,
        EngineError::TargetNotFound(_) => StatusCode::NOT_FOUND,
        EngineError::DuplicateLoginName(_) => StatusCode::CONFLICT,
        EngineError::PersistenceFailure(_) => StatusCode::SERVICE_UNAVAILABLE,
        EngineError::Database(_) => StatusCode::INTERNAL_SERVER_ERROR,
        EngineError::InvalidAmount(_)
        | EngineError::InvalidParent(_)
        | EngineError::InvalidInput(_) => StatusCode::UNPROCESSABLE_ENTITY,
    }
}

fn message_for_engine_error(err: EngineError) -> String {
    match err {
        EngineError::Database(db_err) => {
            tracing::error!("database error: {db_err}");
            "internal server error".to_string()
        }
        other => other.to_string(),
    }
}

impl IntoResponse for ServerError {
    fn into_response(self) -> axum::response::Response {
        let (status, error) = match self {
            ServerError::Engine(err) => (status_for_engine_error(&err), message_for_engine_error(err)),
            ServerError::Generic(err) => (StatusCode::BAD_REQUEST, err),
        };

        (status, Json(Error { error })).into_response()
    }
}

impl From<EngineError> for ServerError {
    fn from(value: EngineError) -> Self {
        Self::Engine(value)
    }
}
