#![allow(clippy::unwrap_used)]

use std::sync::Arc;

use axum::{
    Router,
    body::Body,
    http::{Method, Request, StatusCode, header::CONTENT_TYPE},
};
use axum_extra::headers::{Authorization, HeaderMapExt};
use http_body_util::BodyExt;
use sea_orm::Database;
use serde_json::{Value, json};
use tower::ServiceExt;

use engine::{AdminAccount, BcryptCredentials, CredentialVerifier, Engine};
use migration::MigratorTrait;
use server::{ServerState, router};

const ADMIN: (&str, &str) = ("root", "hunter2");

async fn app() -> Router {
    let db = Database::connect("sqlite::memory:").await.unwrap();
    migration::Migrator::up(&db, None).await.unwrap();
    let credentials = BcryptCredentials::new(4);
    let engine = Engine::builder()
        .database(db)
        .credentials(credentials)
        .admin(AdminAccount {
            login_name: ADMIN.0.to_string(),
            password_hash: credentials.hash_password(ADMIN.1).unwrap(),
        })
        .build()
        .await
        .unwrap();
    router(ServerState {
        engine: Arc::new(engine),
    })
}

struct As<'a> {
    login: &'a str,
    password: &'a str,
    kind: Option<&'a str>,
}

const AS_ADMIN: As<'static> = As {
    login: ADMIN.0,
    password: ADMIN.1,
    kind: None,
};

fn principal<'a>(kind: &'a str, login: &'a str) -> As<'a> {
    As {
        login,
        password: "password",
        kind: Some(kind),
    }
}

async fn call(app: &Router, who: &As<'_>, method: Method, uri: &str, body: Option<Value>) -> (StatusCode, Value) {
    let body = body.map_or_else(Body::empty, |body| Body::from(body.to_string()));
    let mut request = Request::builder()
        .method(method)
        .uri(uri)
        .header(CONTENT_TYPE, "application/json")
        .body(body)
        .unwrap();
    request
        .headers_mut()
        .typed_insert(Authorization::basic(who.login, who.password));
    if let Some(kind) = who.kind {
        request
            .headers_mut()
            .insert("x-principal-kind", kind.parse().unwrap());
    }

    let response = app.clone().oneshot(request).await.unwrap();
    let status = response.status();
    let bytes = response.into_body().collect().await.unwrap().to_bytes();
    let value = if bytes.is_empty() {
        Value::Null
    } else {
        serde_json::from_slice(&bytes).unwrap()
    };
    (status, value)
}

async fn create(app: &Router, who: &As<'_>, kind: &str, login: &str, parent: Option<&str>) -> String {
    let (status, body) = call(
        app,
        who,
        Method::POST,
        "/principals",
        Some(json!({
            "kind": kind,
            "username": login.to_uppercase(),
            "login_name": login,
            "password": "password",
            "parent_id": parent,
            "win_commission": 10.0,
            "loss_commission": 5.0,
        })),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED, "{body}");
    body["id"].as_str().unwrap().to_string()
}

/// super-master -> master -> agent -> client, all created by the admin.
async fn chain(app: &Router, suffix: &str) -> [String; 4] {
    let sm = create(app, &AS_ADMIN, "superMaster", &format!("sm{suffix}"), None).await;
    let m = create(app, &AS_ADMIN, "master", &format!("m{suffix}"), Some(&sm)).await;
    let a = create(app, &AS_ADMIN, "agent", &format!("a{suffix}"), Some(&m)).await;
    let c = create(app, &AS_ADMIN, "client", &format!("c{suffix}"), Some(&a)).await;
    [sm, m, a, c]
}

#[tokio::test]
async fn rejects_bad_credentials() {
    let app = app().await;
    let wrong = As {
        login: ADMIN.0,
        password: "nope",
        kind: None,
    };
    let (status, _) = call(&app, &wrong, Method::GET, "/dashboard", None).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);

    let (status, _) = call(&app, &principal("agent", "ghost"), Method::GET, "/dashboard", None).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);

    let (status, _) = call(&app, &AS_ADMIN, Method::GET, "/dashboard", None).await;
    assert_eq!(status, StatusCode::OK);
}

#[tokio::test]
async fn deposit_and_withdraw_show_up_in_the_khata() {
    let app = app().await;
    let [_, _, _, client] = chain(&app, "1").await;

    let (status, body) = call(
        &app,
        &AS_ADMIN,
        Method::POST,
        "/deposit",
        Some(json!({ "user_type": "client", "login_name": "c1", "amount": 1_000 })),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED, "{body}");
    assert_eq!(body["new_balance"], 1_000);
    assert_eq!(body["entry"]["description"], "Deposit by admin");
    assert_eq!(body["entry"]["created_by"], "admin");

    let (status, body) = call(
        &app,
        &principal("agent", "a1"),
        Method::POST,
        "/withdraw",
        Some(json!({
            "user_type": "client",
            "user_id": client,
            "amount": 300,
            "description": "cash out",
            "date": "2025-03-01",
        })),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED, "{body}");
    assert_eq!(body["new_balance"], 700);

    let (status, body) = call(
        &app,
        &principal("master", "m1"),
        Method::GET,
        &format!("/khata/client/{client}"),
        None,
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    let rows = body.as_array().unwrap();
    assert_eq!(rows.len(), 2);
    assert_eq!(rows[0]["transaction_type"], "withdraw");
    assert_eq!(rows[0]["amount"], 300);
    assert_eq!(rows[0]["date"], "2025-03-01");
    assert_eq!(rows[0]["user_type"], "client");
    assert_eq!(rows[1]["transaction_type"], "deposit");

    let (_, body) = call(
        &app,
        &AS_ADMIN,
        Method::GET,
        &format!("/khata/client/{client}?from=2025-03-01&to=2025-03-01"),
        None,
    )
    .await;
    assert_eq!(body.as_array().unwrap().len(), 1);

    let (_, body) = call(
        &app,
        &AS_ADMIN,
        Method::GET,
        &format!("/reconcile/client/{client}"),
        None,
    )
    .await;
    assert_eq!(body["balance"], 700);
    assert_eq!(body["ledger_reconciles"], true);
    assert_eq!(body["records_reconcile"], true);
}

#[tokio::test]
async fn engine_errors_map_to_status_codes() {
    let app = app().await;
    let [sm, _, _, client] = chain(&app, "1").await;
    chain(&app, "2").await;

    let (status, _) = call(
        &app,
        &AS_ADMIN,
        Method::POST,
        "/deposit",
        Some(json!({ "user_type": "client", "user_id": client, "amount": 0 })),
    )
    .await;
    assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);

    let (status, _) = call(
        &app,
        &AS_ADMIN,
        Method::POST,
        "/deposit",
        Some(json!({ "user_type": "client", "login_name": "nobody", "amount": 5 })),
    )
    .await;
    assert_eq!(status, StatusCode::NOT_FOUND);

    let (status, _) = call(
        &app,
        &AS_ADMIN,
        Method::POST,
        "/deposit",
        Some(json!({ "user_type": "client", "amount": 5 })),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (status, body) = call(
        &app,
        &principal("agent", "a2"),
        Method::POST,
        "/deposit",
        Some(json!({ "user_type": "client", "user_id": client, "amount": 5 })),
    )
    .await;
    assert_eq!(status, StatusCode::FORBIDDEN);
    assert!(body["error"].is_string());

    let huge = json!({ "user_type": "client", "user_id": client, "amount": i64::MAX });
    let (status, _) = call(&app, &AS_ADMIN, Method::POST, "/deposit", Some(huge.clone())).await;
    assert_eq!(status, StatusCode::CREATED);
    let (status, body) = call(&app, &AS_ADMIN, Method::POST, "/deposit", Some(huge)).await;
    assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY, "{body}");
    let (status, body) = call(&app, &AS_ADMIN, Method::GET, "/dashboard", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["total_balance"], json!(i64::MAX));

    let (status, _) = call(
        &app,
        &AS_ADMIN,
        Method::POST,
        "/principals",
        Some(json!({
            "kind": "superMaster",
            "username": "dup",
            "login_name": "sm1",
            "password": "password",
        })),
    )
    .await;
    assert_eq!(status, StatusCode::CONFLICT);

    let (status, _) = call(
        &app,
        &AS_ADMIN,
        Method::POST,
        "/principals",
        Some(json!({
            "kind": "client",
            "username": "skip",
            "login_name": "skip",
            "password": "password",
            "parent_id": sm,
        })),
    )
    .await;
    assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
}

#[tokio::test]
async fn principals_are_scoped_to_the_caller() {
    let app = app().await;
    let [_, master, agent, client] = chain(&app, "1").await;
    chain(&app, "2").await;

    let me = principal("master", "m1");
    let (status, body) = call(&app, &me, Method::GET, "/principals", None).await;
    assert_eq!(status, StatusCode::OK);
    let ids: Vec<&str> = body
        .as_array()
        .unwrap()
        .iter()
        .map(|p| p["id"].as_str().unwrap())
        .collect();
    assert_eq!(ids, vec![client.as_str(), agent.as_str()]);

    let (_, body) = call(&app, &me, Method::GET, "/principals?kind=client", None).await;
    assert_eq!(body.as_array().unwrap().len(), 1);

    let (status, body) = call(&app, &me, Method::GET, "/parents/client", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body[0]["id"], agent.as_str());

    let (status, _) = call(
        &app,
        &me,
        Method::POST,
        &format!("/principals/client/{client}/block"),
        None,
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    let (status, _) = call(&app, &principal("client", "c1"), Method::GET, "/dashboard", None).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);

    let (_, body) = call(&app, &me, Method::GET, "/dashboard", None).await;
    assert_eq!(body["subordinate_count"], 1);
    assert_eq!(body["direct_subordinate_count"], 1);

    let (status, _) = call(
        &app,
        &principal("agent", "a2"),
        Method::GET,
        &format!("/principals/master/{master}"),
        None,
    )
    .await;
    assert_eq!(status, StatusCode::FORBIDDEN);
}

#[tokio::test]
async fn only_the_admin_purges_and_sees_orphans() {
    let app = app().await;
    let [_, master, _, client] = chain(&app, "1").await;

    let (_, body) = call(
        &app,
        &AS_ADMIN,
        Method::POST,
        "/deposit",
        Some(json!({ "user_type": "client", "user_id": client, "amount": 50 })),
    )
    .await;
    let entry_id = body["entry"]["id"].as_i64().unwrap();

    let (status, _) = call(
        &app,
        &principal("superMaster", "sm1"),
        Method::POST,
        "/ledger/purge",
        Some(json!({ "ids": [entry_id] })),
    )
    .await;
    assert_eq!(status, StatusCode::FORBIDDEN);

    let (status, body) = call(
        &app,
        &AS_ADMIN,
        Method::POST,
        "/ledger/purge",
        Some(json!({ "ids": [entry_id] })),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["deleted"], 1);

    let (status, body) = call(
        &app,
        &AS_ADMIN,
        Method::GET,
        &format!("/principals/client/{client}/records"),
        None,
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body.as_array().unwrap().len(), 1);

    let (status, _) = call(
        &app,
        &AS_ADMIN,
        Method::DELETE,
        &format!("/principals/master/{master}"),
        None,
    )
    .await;
    assert_eq!(status, StatusCode::NO_CONTENT);

    let (status, body) = call(&app, &AS_ADMIN, Method::GET, "/orphans", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body.as_array().unwrap().len(), 1);

    let (status, _) = call(&app, &principal("superMaster", "sm1"), Method::GET, "/orphans", None).await;
    assert_eq!(status, StatusCode::FORBIDDEN);
}

#[tokio::test]
async fn notes_and_ledger_report() {
    let app = app().await;
    let [sm, _, _, client] = chain(&app, "1").await;

    let (status, body) = call(
        &app,
        &principal("agent", "a1"),
        Method::POST,
        &format!("/khata/client/{client}/notes"),
        Some(json!({ "note": "called about payout", "date": null })),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED, "{body}");
    assert_eq!(body["amount"], 0);
    assert_eq!(body["transaction_type"], "note");

    call(
        &app,
        &AS_ADMIN,
        Method::POST,
        "/deposit",
        Some(json!({ "user_type": "superMaster", "user_id": sm, "amount": 20 })),
    )
    .await;

    let (_, body) = call(
        &app,
        &principal("master", "m1"),
        Method::GET,
        "/ledger",
        None,
    )
    .await;
    assert_eq!(body.as_array().unwrap().len(), 1);

    let (_, body) = call(&app, &AS_ADMIN, Method::GET, "/ledger?transaction_type=deposit", None).await;
    let rows = body.as_array().unwrap();
    assert_eq!(rows.len(), 1);
    assert_eq!(rows[0]["user_type"], "superMaster");
}
