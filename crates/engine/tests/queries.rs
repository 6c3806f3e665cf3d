use chrono::NaiveDate;

use engine::{Actor, EngineError, LedgerFilter, LedgerKind, PrincipalKind, TransactionCmd};

mod common;
use common::{as_actor, chain, engine_with_db};

#[tokio::test]
async fn admin_dashboard_is_global_and_skips_blocked() {
    let engine = engine_with_db().await;
    let admin = Actor::Admin;
    let one = chain(&engine, "1").await;
    let two = chain(&engine, "2").await;
    engine.deposit(&admin, one.c.reference().into(), 100).await.unwrap();
    engine.deposit(&admin, two.c.reference().into(), 50).await.unwrap();
    engine
        .block_principal(&admin, &two.c.reference().into())
        .await
        .unwrap();

    let stats = engine.dashboard(&admin).await.unwrap();
    assert_eq!(stats.super_master_count, 2);
    assert_eq!(stats.direct_subordinate_count, 2);
    assert_eq!(stats.master_count, 2);
    assert_eq!(stats.agent_count, 2);
    assert_eq!(stats.client_count, 1);
    assert_eq!(stats.active_client_count, 1);
    assert_eq!(stats.subordinate_count, 7);
    assert_eq!(stats.total_balance, 100);
    assert_eq!(stats.own_balance, 0);

    let stats = engine.dashboard(&as_actor(&one.a)).await.unwrap();
    assert_eq!(stats.client_count, 1);
    assert_eq!(stats.direct_subordinate_count, 1);
    assert_eq!(stats.total_balance, 100);
}

#[tokio::test]
async fn subordinates_include_blocked_principals() {
    let engine = engine_with_db().await;
    let one = chain(&engine, "1").await;
    engine
        .block_principal(&as_actor(&one.m), &one.c.reference().into())
        .await
        .unwrap();

    let subs = engine.subordinates_of(&as_actor(&one.m), None).await.unwrap();
    assert_eq!(subs.len(), 2);
    assert_eq!(subs[0].id, one.c.id);
    assert!(subs[0].blocked);

    let stats = engine.dashboard(&as_actor(&one.m)).await.unwrap();
    assert_eq!(stats.subordinate_count, 1);
}

#[tokio::test]
async fn ledger_report_is_scoped_to_visible_principals() {
    let engine = engine_with_db().await;
    let admin = Actor::Admin;
    let one = chain(&engine, "1").await;
    let two = chain(&engine, "2").await;
    let day = NaiveDate::from_ymd_opt(2025, 1, 10).unwrap();

    engine
        .execute(&admin, TransactionCmd::deposit(one.c.reference().into(), 10).date(day))
        .await
        .unwrap();
    engine.deposit(&admin, one.a.reference().into(), 20).await.unwrap();
    engine.deposit(&admin, two.c.reference().into(), 30).await.unwrap();
    engine
        .add_note(&admin, one.sm.reference(), "settled", None)
        .await
        .unwrap();

    let everything = engine
        .ledger_report(&admin, &LedgerFilter::default())
        .await
        .unwrap();
    assert_eq!(everything.len(), 4);

    let mine = engine
        .ledger_report(&as_actor(&one.m), &LedgerFilter::default())
        .await
        .unwrap();
    let amounts: Vec<i64> = mine.iter().map(|e| e.amount).collect();
    assert_eq!(amounts, vec![20, 10]);

    let notes = engine
        .ledger_report(
            &as_actor(&one.sm),
            &LedgerFilter {
                kinds: Some(vec![LedgerKind::Note]),
                ..LedgerFilter::default()
            },
        )
        .await
        .unwrap();
    assert_eq!(notes.len(), 1);

    let dated = engine
        .ledger_report(&admin, &LedgerFilter::default().dates(Some(day), Some(day)))
        .await
        .unwrap();
    assert_eq!(dated.len(), 1);
    assert_eq!(dated[0].user_id, one.c.id);

    let limited = engine
        .ledger_report(
            &as_actor(&one.m),
            &LedgerFilter {
                limit: Some(1),
                ..LedgerFilter::default()
            },
        )
        .await
        .unwrap();
    assert_eq!(limited.len(), 1);
    assert_eq!(limited[0].amount, 20);
}

#[tokio::test]
async fn purge_is_audit_only() {
    let engine = engine_with_db().await;
    let admin = Actor::Admin;
    let one = chain(&engine, "1").await;
    let target = one.c.reference();

    let first = engine.deposit(&admin, target.into(), 500).await.unwrap();
    engine.withdraw(&admin, target.into(), 200).await.unwrap();

    let err = engine
        .purge_ledger_entries(&as_actor(&one.sm), &[first.entry.id])
        .await
        .unwrap_err();
    assert!(matches!(err, EngineError::Unauthorized(_)));

    let deleted = engine
        .purge_ledger_entries(&admin, &[first.entry.id, 9_999])
        .await
        .unwrap();
    assert_eq!(deleted, 1);
    assert_eq!(engine.purge_ledger_entries(&admin, &[]).await.unwrap(), 0);

    let report = engine.reconcile(&admin, &target.into()).await.unwrap();
    assert_eq!(report.balance, 300);
    assert_eq!(report.ledger_deposits, 0);
    assert!(!report.ledger_reconciles);
    assert!(report.records_reconcile);
    assert_eq!(report.expected_from_records(), 300);

    let records = engine
        .transaction_records(&admin, &target.into())
        .await
        .unwrap();
    assert_eq!(records.len(), 2);
}

#[tokio::test]
async fn reconcile_counts_opening_balance() {
    let engine = engine_with_db().await;
    let admin = Actor::Admin;
    let one = chain(&engine, "1").await;
    let client = engine
        .create_principal(
            &as_actor(&one.a),
            engine::NewPrincipal::new(PrincipalKind::Client, "Opening", "opening", "pw")
                .parent(one.a.id)
                .opening_balance(1_000),
        )
        .await
        .unwrap();
    engine.withdraw(&admin, client.reference().into(), 250).await.unwrap();

    let report = engine
        .reconcile(&as_actor(&one.a), &client.reference().into())
        .await
        .unwrap();
    assert_eq!(report.opening_balance, 1_000);
    assert_eq!(report.balance, 750);
    assert!(report.ledger_reconciles && report.records_reconcile);

    let err = engine
        .reconcile(&as_actor(&one.c), &client.reference().into())
        .await
        .unwrap_err();
    assert!(matches!(err, EngineError::Unauthorized(_)));
}

#[tokio::test]
async fn rollups_hold_totals_past_one_balance() {
    let engine = engine_with_db().await;
    let admin = Actor::Admin;
    let one = chain(&engine, "1").await;
    let two = chain(&engine, "2").await;
    engine.deposit(&admin, one.c.reference().into(), i64::MAX).await.unwrap();
    engine.deposit(&admin, one.a.reference().into(), 1).await.unwrap();
    engine.withdraw(&admin, two.c.reference().into(), 10).await.unwrap();

    let stats = engine.dashboard(&admin).await.unwrap();
    assert_eq!(stats.total_balance, i128::from(i64::MAX) + 1 - 10);
    assert_eq!(stats.client_count, 2);
    assert_eq!(stats.active_client_count, 1);

    let stats = engine.dashboard(&as_actor(&one.m)).await.unwrap();
    assert_eq!(stats.total_balance, i128::from(i64::MAX) + 1);
}

#[tokio::test]
async fn reconcile_sums_past_one_balance() {
    let engine = engine_with_db().await;
    let admin = Actor::Admin;
    let one = chain(&engine, "1").await;
    let client: engine::Target = one.c.reference().into();
    engine.deposit(&admin, client.clone(), i64::MAX).await.unwrap();
    engine.withdraw(&admin, client.clone(), 1).await.unwrap();
    engine.deposit(&admin, client.clone(), 1).await.unwrap();

    let report = engine.reconcile(&admin, &client).await.unwrap();
    assert_eq!(report.balance, i64::MAX);
    assert_eq!(report.ledger_deposits, i128::from(i64::MAX) + 1);
    assert_eq!(report.ledger_withdrawals, 1);
    assert_eq!(report.record_deposits, i128::from(i64::MAX) + 1);
    assert_eq!(report.expected_from_ledger(), i128::from(i64::MAX));
    assert!(report.ledger_reconciles && report.records_reconcile);
}
