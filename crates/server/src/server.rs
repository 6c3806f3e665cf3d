use axum::{
    Router,
    extract::{Request, State},
    http::StatusCode,
    middleware::{self, Next},
    response::Response,
    routing::{get, post},
};
use axum_extra::{
    TypedHeader,
    headers::{Authorization, Error as AxumError, Header, authorization::Basic},
};

use std::{net::SocketAddr, sync::Arc};

use crate::{khata, principals, statistics, transactions};
use engine::{Actor, Engine, EngineError, PrincipalKind};

static PRINCIPAL_KIND_HEADER: axum::http::HeaderName =
    axum::http::HeaderName::from_static("x-principal-kind");

#[derive(Clone)]
pub struct ServerState {
    pub engine: Arc<Engine>,
}

/// Who the Basic credentials belong to.
///
/// Requests without this header, or with `admin`, authenticate against the
/// configured admin account.
#[derive(Debug)]
struct PrincipalKindHeader(Option<PrincipalKind>);

impl Header for PrincipalKindHeader {
    fn name() -> &'static axum::http::HeaderName {
        &PRINCIPAL_KIND_HEADER
    }

    fn decode<'i, I>(values: &mut I) -> Result<Self, AxumError>
    where
        Self: Sized,
        I: Iterator<Item = &'i axum::http::HeaderValue>,
    {
        let value = values.next().ok_or_else(AxumError::invalid)?;
        let Ok(value) = value.to_str() else {
            return Err(AxumError::invalid());
        };
        if value == "admin" {
            return Ok(PrincipalKindHeader(None));
        }
        let Ok(kind) = PrincipalKind::try_from(value) else {
            return Err(AxumError::invalid());
        };

        Ok(PrincipalKindHeader(Some(kind)))
    }

    fn encode<E: Extend<axum::http::HeaderValue>>(&self, values: &mut E) {
        let value = self.0.map_or("admin", PrincipalKind::as_str);
        values.extend(std::iter::once(axum::http::HeaderValue::from_static(value)));
    }
}

async fn auth(
    auth_header: TypedHeader<Authorization<Basic>>,
    kind_header: Option<TypedHeader<PrincipalKindHeader>>,
    State(state): State<ServerState>,
    mut request: Request,
    next: Next,
) -> Result<Response, StatusCode> {
    if auth_header.username().is_empty() || auth_header.password().is_empty() {
        return Err(StatusCode::UNAUTHORIZED);
    }

    let kind = kind_header.and_then(|header| header.0.0);
    let actor = match kind {
        None => {
            state
                .engine
                .authenticate_admin(auth_header.username(), auth_header.password())
                .await
        }
        Some(kind) => state
            .engine
            .authenticate(auth_header.username(), auth_header.password(), kind)
            .await
            .map(|principal| Actor::Principal(principal.reference())),
    };
    let actor = match actor {
        Ok(actor) => actor,
        Err(EngineError::TargetNotFound(_) | EngineError::InvalidInput(_)) => {
            return Err(StatusCode::UNAUTHORIZED);
        }
        Err(err) => {
            tracing::error!("authentication failed: {err}");
            return Err(StatusCode::SERVICE_UNAVAILABLE);
        }
    };

    request.extensions_mut().insert(actor);
    Ok(next.run(request).await)
}

pub fn router(state: ServerState) -> Router {
    Router::new()
        .route("/principals", post(principals::create).get(principals::list))
        .route(
            "/principals/{kind}/{id}",
            get(principals::get).delete(principals::delete),
        )
        .route("/principals/{kind}/{id}/block", post(principals::block))
        .route("/principals/{kind}/{id}/unblock", post(principals::unblock))
        .route("/principals/{kind}/{id}/records", get(khata::records))
        .route("/parents/{kind}", get(principals::parents))
        .route("/orphans", get(principals::orphans))
        .route("/deposit", post(transactions::deposit))
        .route("/withdraw", post(transactions::withdraw))
        .route("/khata/{kind}/{id}", get(khata::list))
        .route("/khata/{kind}/{id}/notes", post(khata::add_note))
        .route("/ledger", get(khata::report))
        .route("/ledger/purge", post(khata::purge))
        .route("/dashboard", get(statistics::dashboard))
        .route("/reconcile/{kind}/{id}", get(statistics::reconcile))
        .route_layer(middleware::from_fn_with_state(state.clone(), auth))
        .with_state(state)
}

pub async fn run(engine: Engine, addr: SocketAddr) {
    let listener = match tokio::net::TcpListener::bind(addr).await {
        Ok(listener) => listener,
        Err(err) => {
            tracing::error!("failed to bind server listener: {err}");
            return;
        }
    };
    if let Err(err) = run_with_listener(engine, listener).await {
        tracing::error!("server failed: {err}");
    }
}

pub async fn run_with_listener(
    engine: Engine,
    listener: tokio::net::TcpListener,
) -> Result<(), std::io::Error> {
    let addr = listener.local_addr()?;
    tracing::info!("Server listening on {}", addr);

    let state = ServerState {
        engine: Arc::new(engine),
    };

    axum::serve(listener, router(state)).await
}

pub fn spawn_with_listener(
    engine: Engine,
    listener: tokio::net::TcpListener,
) -> Result<SocketAddr, std::io::Error> {
    let addr = listener.local_addr()?;

    tokio::spawn(async move {
        if let Err(err) = run_with_listener(engine, listener).await {
            tracing::error!("server failed: {err}");
        }
    });

    Ok(addr)
}
