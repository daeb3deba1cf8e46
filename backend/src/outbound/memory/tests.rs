//! Tests for the in-memory store.

use std::sync::Arc;

use chrono::{Duration, TimeZone};
use rstest::{fixture, rstest};
use serde_json::json;
use uuid::Uuid;

use super::*;
use crate::domain::leaderboard::{LeaderboardKind, LeaderboardScope};
use crate::domain::ports::IdempotencyClaim;
use crate::domain::settlement::SessionOutcomePayload;
use crate::domain::PayloadHash;

#[fixture]
fn now() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2026, 4, 20, 10, 0, 0)
        .single()
        .expect("valid timestamp")
}

fn attempt(account_id: &AccountId, claim: Option<IdempotencyClaim>) -> SettlementAttempt {
    let payload: SessionOutcomePayload = serde_json::from_value(json!({
        "accuracy": 50,
        "config": {"mode": "numeric", "depth": 1, "totalRounds": 5},
        "correctCount": 5,
        "incorrectCount": 0,
        "missedCount": 0,
        "durationMs": 30_000
    }))
    .expect("payload decodes");
    SettlementAttempt {
        session_id: Uuid::new_v4(),
        account_id: account_id.clone(),
        outcome: payload.validate().expect("valid outcome"),
        idempotency: claim,
    }
}

fn claim(byte: u8) -> IdempotencyClaim {
    IdempotencyClaim {
        key: IdempotencyKey::from_uuid(Uuid::from_u128(7)),
        payload_hash: PayloadHash::try_from_bytes(&[byte; 32]).expect("32 bytes"),
    }
}

fn rank_all_time() -> BoardKey {
    BoardKey::new(LeaderboardKind::Rank, LeaderboardScope::AllTime).expect("supported")
}

fn rank_weekly() -> BoardKey {
    BoardKey::new(LeaderboardKind::Rank, LeaderboardScope::Weekly).expect("supported")
}

async fn seeded(accounts: &[(&AccountId, &str, u64)]) -> MemoryStore {
    let store = MemoryStore::new();
    for (id, name, xp) in accounts {
        let mut account = AccountAggregate::new((*id).clone(), *name, 5);
        account.xp = *xp;
        store.seed_account(account).await;
    }
    store
}

#[rstest]
#[tokio::test]
async fn unknown_accounts_are_reported(now: DateTime<Utc>) {
    let store = MemoryStore::new();
    let result = store
        .settle(&attempt(&AccountId::random(), None), &EnergyPolicy::default(), now)
        .await
        .expect("settle runs");
    assert_eq!(result, SettlementResult::AccountNotFound);
    assert_eq!(store.session_count().await, 0);
}

#[rstest]
#[tokio::test]
async fn commits_write_account_session_and_receipt(now: DateTime<Utc>) {
    let id = AccountId::random();
    let store = seeded(&[(&id, "Ada", 0)]).await;

    let result = store
        .settle(&attempt(&id, Some(claim(1))), &EnergyPolicy::default(), now)
        .await
        .expect("settle runs");

    let SettlementResult::Settled(response) = result else {
        panic!("expected a settled session, got {result:?}");
    };
    let account = store.account(&id).await.expect("account exists");
    assert_eq!(account.xp, response.xp);
    assert_eq!(account.energy.current, 4);
    assert_eq!(store.session_count().await, 1);
    assert_eq!(store.receipt_count().await, 1);
}

#[rstest]
#[tokio::test]
async fn receipts_replay_or_conflict(now: DateTime<Utc>) {
    let id = AccountId::random();
    let store = seeded(&[(&id, "Ada", 0)]).await;
    let policy = EnergyPolicy::default();

    let first = store
        .settle(&attempt(&id, Some(claim(1))), &policy, now)
        .await
        .expect("settle runs");
    let replay = store
        .settle(&attempt(&id, Some(claim(1))), &policy, now)
        .await
        .expect("settle runs");
    let conflict = store
        .settle(&attempt(&id, Some(claim(2))), &policy, now)
        .await
        .expect("settle runs");

    let SettlementResult::Settled(original) = first else {
        panic!("expected a settled session");
    };
    assert_eq!(replay, SettlementResult::Replayed(original.into_replay()));
    assert_eq!(conflict, SettlementResult::IdempotencyConflict);
    assert_eq!(store.session_count().await, 1);
}

#[rstest]
#[tokio::test]
async fn refresh_reports_busy_while_locked(now: DateTime<Utc>) {
    let store = MemoryStore::new();
    let key = rank_all_time();
    let config = SnapshotConfig { top_n: 10, version: 1 };

    let guard = store.try_lock_board(key).expect("lock is free");
    let busy = store
        .refresh_snapshot(&key, config, now)
        .await
        .expect("refresh runs");
    assert_eq!(busy, RefreshOutcome::LockBusy);

    drop(guard);
    let refreshed = store
        .refresh_snapshot(&key, config, now)
        .await
        .expect("refresh runs");
    assert!(matches!(refreshed, RefreshOutcome::Refreshed(_)));
    assert!(store.load_snapshot(&key).await.expect("load runs").is_some());
}

#[rstest]
#[tokio::test]
async fn refresh_ranks_and_truncates(now: DateTime<Utc>) {
    let (a, b, c) = (AccountId::random(), AccountId::random(), AccountId::random());
    let store = seeded(&[(&a, "A", 100), (&b, "B", 300), (&c, "C", 200)]).await;

    let outcome = store
        .refresh_snapshot(&rank_all_time(), SnapshotConfig { top_n: 2, version: 1 }, now)
        .await
        .expect("refresh runs");
    let RefreshOutcome::Refreshed(stored) = outcome else {
        panic!("expected a refresh");
    };
    let payload = stored.decode().expect("payload decodes");
    let names: Vec<_> = payload
        .entries
        .iter()
        .map(|entry| entry.display_name.as_str())
        .collect();
    assert_eq!(names, ["B", "C"]);
}

#[rstest]
#[tokio::test]
async fn weekly_standing_only_counts_the_window(now: DateTime<Utc>) {
    let (active, idle) = (AccountId::random(), AccountId::random());
    let store = seeded(&[(&active, "Active", 0), (&idle, "Idle", 9_000)]).await;
    let policy = EnergyPolicy::default();
    store
        .settle(&attempt(&active, None), &policy, now)
        .await
        .expect("settle runs");
    store
        .settle(&attempt(&idle, None), &policy, now - Duration::days(8))
        .await
        .expect("settle runs");

    let viewer = store
        .viewer_standing(&rank_weekly(), &active, now)
        .await
        .expect("standing loads")
        .expect("active account is ranked");
    assert_eq!(viewer.entry.position, 1);
    assert_eq!(viewer.entry.weekly_sessions, Some(1));

    let missing = store
        .viewer_standing(&rank_weekly(), &idle, now)
        .await
        .expect("standing loads");
    assert!(missing.is_none());
}

#[rstest]
#[tokio::test]
async fn progress_lists_only_played_modes() {
    let id = AccountId::random();
    let store = seeded(&[(&id, "Ada", 0)]).await;
    store
        .seed_unlocks(&id, UnlockState::default_for(GameMode::Mouse))
        .await;

    let progress = store
        .load_progress(&id)
        .await
        .expect("progress loads")
        .expect("account exists");
    let modes: Vec<_> = progress.unlocks.iter().map(UnlockState::mode).collect();
    assert_eq!(modes, [GameMode::Mouse]);
}

#[rstest]
#[tokio::test]
async fn feature_rows_filter_by_prefix() {
    let store = MemoryStore::new();
    store.set_feature("leaderboard.top_n", json!(5)).await;
    store.set_feature("shop.enabled", json!(true)).await;

    let rows = store.load_prefixed("leaderboard.").await.expect("rows load");
    assert_eq!(rows.len(), 1);
    assert_eq!(rows.get("leaderboard.top_n"), Some(&json!(5)));
}

#[rstest]
#[tokio::test]
async fn concurrent_settlements_serialise(now: DateTime<Utc>) {
    let id = AccountId::random();
    let store = Arc::new(seeded(&[(&id, "Ada", 0)]).await);
    let policy = EnergyPolicy::default();

    let tasks: Vec<_> = (0..5)
        .map(|_| {
            let store = Arc::clone(&store);
            let id = id.clone();
            tokio::spawn(async move { store.settle(&attempt(&id, None), &policy, now).await })
        })
        .collect();
    for task in tasks {
        task.await.expect("task joins").expect("settle runs");
    }

    let account = store.account(&id).await.expect("account exists");
    assert_eq!(account.energy.current, 0);
    assert_eq!(store.session_count().await, 5);
}
