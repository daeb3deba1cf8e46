//! End-to-end settlement through the domain service and the in-memory store.

mod support;

use std::sync::Arc;

use chrono::Duration;
use cogtrain::domain::ports::SessionSettlementCommand;
use cogtrain::domain::{ErrorCode, GameMode};
use futures::future::join_all;
use rstest::rstest;
use serde_json::json;

use support::{
    SteppingClock, casual_numeric_payload, monday_morning, settle_request, settlement_service,
    store_with,
};

const ATTEMPTS: usize = 7;

#[rstest]
#[tokio::test]
async fn concurrent_settlements_match_sequential_ones() {
    let (sequential_store, sequential_ids) = store_with(&[("Ada", 0, 0)]).await;
    let (concurrent_store, concurrent_ids) = store_with(&[("Ada", 0, 0)]).await;
    let clock = SteppingClock::at(monday_morning());

    let sequential = settlement_service(sequential_store.clone(), clock.clone());
    let mut sequential_failures = Vec::new();
    for _ in 0..ATTEMPTS {
        let request = settle_request(&sequential_ids[0], casual_numeric_payload(), None);
        if let Err(err) = sequential.settle(request).await {
            sequential_failures.push(err.code());
        }
    }

    let concurrent = Arc::new(settlement_service(concurrent_store.clone(), clock));
    let tasks = (0..ATTEMPTS).map(|_| {
        let service = Arc::clone(&concurrent);
        let request = settle_request(&concurrent_ids[0], casual_numeric_payload(), None);
        tokio::spawn(async move { service.settle(request).await })
    });
    let concurrent_failures: Vec<_> = join_all(tasks)
        .await
        .into_iter()
        .map(|joined| joined.expect("task joins"))
        .filter_map(|result| result.err().map(|err| err.code()))
        .collect();

    let after_sequential = sequential_store
        .account(&sequential_ids[0])
        .await
        .expect("account exists");
    let after_concurrent = concurrent_store
        .account(&concurrent_ids[0])
        .await
        .expect("account exists");

    assert_eq!(sequential_failures, concurrent_failures);
    assert_eq!(sequential_failures, vec![ErrorCode::EnergyExhausted; 2]);
    assert_eq!(after_sequential.xp, after_concurrent.xp);
    assert_eq!(after_sequential.currency, after_concurrent.currency);
    assert_eq!(after_concurrent.energy.current, 0);
    assert_eq!(
        sequential_store.session_count().await,
        concurrent_store.session_count().await
    );
}

#[rstest]
#[tokio::test]
async fn retried_requests_replay_the_first_response() {
    let (store, ids) = store_with(&[("Ada", 0, 0)]).await;
    let service = settlement_service(store.clone(), SteppingClock::at(monday_morning()));
    let key = "6f1c3c8e-2f4b-4a57-9e0e-5a1d0c9b7e21";

    let first = service
        .settle(settle_request(&ids[0], casual_numeric_payload(), Some(key)))
        .await
        .expect("first attempt settles");
    let retry = service
        .settle(settle_request(&ids[0], casual_numeric_payload(), Some(key)))
        .await
        .expect("retry replays");

    assert!(!first.replayed);
    assert!(retry.replayed);
    assert_eq!(retry.session_id, first.session_id);
    assert_eq!(retry.xp, first.xp);
    assert_eq!(store.session_count().await, 1);
}

#[rstest]
#[tokio::test]
async fn reusing_a_key_for_a_different_outcome_conflicts() {
    let (store, ids) = store_with(&[("Ada", 0, 0)]).await;
    let service = settlement_service(store.clone(), SteppingClock::at(monday_morning()));
    let key = "0b8f54e4-5d55-4f0e-8a4d-2b7b9f3c1d10";

    service
        .settle(settle_request(&ids[0], casual_numeric_payload(), Some(key)))
        .await
        .expect("first attempt settles");
    let mut altered = casual_numeric_payload();
    altered["accuracy"] = json!(70);
    let err = service
        .settle(settle_request(&ids[0], altered, Some(key)))
        .await
        .expect_err("payload differs");

    assert_eq!(err.code(), ErrorCode::Conflict);
    assert_eq!(store.session_count().await, 1);
}

#[rstest]
#[tokio::test]
async fn locked_configurations_are_refused_without_spending_energy() {
    let (store, ids) = store_with(&[("Ada", 0, 0)]).await;
    let service = settlement_service(store.clone(), SteppingClock::at(monday_morning()));
    let payload = json!({
        "accuracy": 95,
        "config": {"mode": "numeric", "depth": 6, "totalRounds": 5},
        "correctCount": 5,
        "durationMs": 30_000
    });

    let err = service
        .settle(settle_request(&ids[0], payload, None))
        .await
        .expect_err("depth 6 is locked for a new account");

    assert_eq!(err.code(), ErrorCode::ConfigLocked);
    let account = store.account(&ids[0]).await.expect("account exists");
    assert_eq!(account.energy.current, 5);
    assert_eq!(store.session_count().await, 0);
}

#[rstest]
#[tokio::test]
async fn energy_recovers_between_sessions() {
    let (store, ids) = store_with(&[("Ada", 0, 0)]).await;
    let clock = SteppingClock::at(monday_morning());
    let service = settlement_service(store.clone(), clock.clone());

    for _ in 0..5 {
        service
            .settle(settle_request(&ids[0], casual_numeric_payload(), None))
            .await
            .expect("energy available");
    }
    let exhausted = service
        .settle(settle_request(&ids[0], casual_numeric_payload(), None))
        .await
        .expect_err("bar is empty");
    assert_eq!(exhausted.code(), ErrorCode::EnergyExhausted);

    clock.advance(Duration::minutes(30));
    let response = service
        .settle(settle_request(&ids[0], casual_numeric_payload(), None))
        .await
        .expect("one unit regenerated");

    assert_eq!(response.mode, GameMode::Numeric);
    assert_eq!(response.energy.current, 0);
}
