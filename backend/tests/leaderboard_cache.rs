//! Snapshot cache behaviour of the leaderboard service over the in-memory
//! store.

mod support;

use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Duration, Utc};
use cogtrain::domain::leaderboard::{BoardKey, SnapshotConfig, StoredSnapshot};
use cogtrain::domain::ports::{
    LeaderboardQuery, LeaderboardRepository, LeaderboardRepositoryError, RefreshOutcome,
    SessionSettlementCommand, ViewerStanding,
};
use cogtrain::domain::{
    AccountAggregate, AccountId, ErrorCode, LeaderboardKind, LeaderboardScope, LeaderboardService,
};
use cogtrain::outbound::memory::MemoryStore;
use rstest::rstest;
use serde_json::json;

use support::{
    SteppingClock, casual_numeric_payload, monday_morning, settle_request, settlement_service,
    store_with,
};

fn board(kind: LeaderboardKind, scope: LeaderboardScope) -> BoardKey {
    BoardKey::new(kind, scope).expect("supported board")
}

fn names(view: &cogtrain::domain::ports::LeaderboardView) -> Vec<&str> {
    view.entries
        .iter()
        .map(|entry| entry.display_name.as_str())
        .collect()
}

/// Delegates to the store but never wins the refresh lock.
struct ContendedBoards {
    inner: Arc<MemoryStore>,
}

#[async_trait]
impl LeaderboardRepository for ContendedBoards {
    async fn load_snapshot(
        &self,
        key: &BoardKey,
    ) -> Result<Option<StoredSnapshot>, LeaderboardRepositoryError> {
        self.inner.load_snapshot(key).await
    }

    async fn refresh_snapshot(
        &self,
        _key: &BoardKey,
        _config: SnapshotConfig,
        _now: DateTime<Utc>,
    ) -> Result<RefreshOutcome, LeaderboardRepositoryError> {
        Ok(RefreshOutcome::LockBusy)
    }

    async fn viewer_standing(
        &self,
        key: &BoardKey,
        account_id: &AccountId,
        now: DateTime<Utc>,
    ) -> Result<Option<ViewerStanding>, LeaderboardRepositoryError> {
        self.inner.viewer_standing(key, account_id, now).await
    }
}

#[rstest]
#[tokio::test]
async fn fresh_snapshots_are_served_until_they_expire() {
    let (store, _) = store_with(&[("Ada", 100, 0), ("Grace", 300, 0)]).await;
    let clock = SteppingClock::at(monday_morning());
    let service = LeaderboardService::new(store.clone(), store.clone(), clock.clone());
    let key = board(LeaderboardKind::Rank, LeaderboardScope::AllTime);

    let first = service.top(key).await.expect("board computes");
    assert_eq!(names(&first), ["Grace", "Ada"]);

    let mut newcomer = AccountAggregate::new(AccountId::random(), "Linus", 5);
    newcomer.xp = 900;
    store.seed_account(newcomer).await;

    clock.advance(Duration::seconds(30));
    let cached = service.top(key).await.expect("board is cached");
    assert_eq!(cached.computed_at, first.computed_at);
    assert_eq!(names(&cached), ["Grace", "Ada"]);
    assert!(!cached.stale);

    clock.advance(Duration::seconds(31));
    let refreshed = service.top(key).await.expect("board recomputes");
    assert_eq!(names(&refreshed), ["Linus", "Grace", "Ada"]);
    assert!(refreshed.computed_at > first.computed_at);
}

#[rstest]
#[tokio::test]
async fn version_bumps_invalidate_cached_snapshots() {
    let (store, _) = store_with(&[("Ada", 100, 40), ("Grace", 300, 10)]).await;
    let clock = SteppingClock::at(monday_morning());
    let service = LeaderboardService::new(store.clone(), store.clone(), clock);
    let key = board(LeaderboardKind::Currency, LeaderboardScope::AllTime);

    let first = service.top(key).await.expect("board computes");
    assert_eq!(names(&first), ["Ada", "Grace"]);

    store.set_feature("leaderboard.version", json!(2)).await;
    store.set_feature("leaderboard.top_n", json!(1)).await;
    let bumped = service.top(key).await.expect("board recomputes");

    assert_eq!(bumped.top_n, 1);
    assert_eq!(names(&bumped), ["Ada"]);
}

#[rstest]
#[tokio::test]
async fn stale_snapshots_are_served_while_another_refresh_runs() {
    let (store, _) = store_with(&[("Ada", 100, 0), ("Grace", 300, 0)]).await;
    let clock = SteppingClock::at(monday_morning());
    let key = board(LeaderboardKind::Rank, LeaderboardScope::AllTime);

    let primed = LeaderboardService::new(store.clone(), store.clone(), clock.clone());
    let first = primed.top(key).await.expect("board computes");

    clock.advance(Duration::minutes(5));
    let contended = LeaderboardService::new(
        Arc::new(ContendedBoards {
            inner: store.clone(),
        }),
        store.clone(),
        clock,
    );
    let view = contended.top(key).await.expect("stale board served");

    assert!(view.stale);
    assert_eq!(view.computed_at, first.computed_at);
    assert_eq!(names(&view), ["Grace", "Ada"]);
}

#[rstest]
#[tokio::test]
async fn busy_boards_without_a_snapshot_ask_callers_to_retry() {
    let (store, _) = store_with(&[("Ada", 100, 0)]).await;
    let service = LeaderboardService::new(
        Arc::new(ContendedBoards {
            inner: store.clone(),
        }),
        store,
        SteppingClock::at(monday_morning()),
    );

    let err = service
        .top(board(LeaderboardKind::Rank, LeaderboardScope::AllTime))
        .await
        .expect_err("nothing cached yet");

    assert_eq!(err.code(), ErrorCode::ServiceUnavailable);
}

#[rstest]
#[tokio::test]
async fn weekly_positions_follow_settled_sessions() {
    let (store, ids) = store_with(&[("Ada", 5_000, 0), ("Grace", 0, 0)]).await;
    let clock = SteppingClock::at(monday_morning());
    let settlement = settlement_service(store.clone(), clock.clone());
    let leaderboards = LeaderboardService::new(store.clone(), store.clone(), clock);
    let weekly = board(LeaderboardKind::Rank, LeaderboardScope::Weekly);

    let before = leaderboards
        .position(weekly, ids[1].clone())
        .await
        .expect("position computes");
    assert_eq!(before.position, None);

    settlement
        .settle(settle_request(&ids[1], casual_numeric_payload(), None))
        .await
        .expect("session settles");
    let after = leaderboards
        .position(weekly, ids[1].clone())
        .await
        .expect("position computes");
    let ada = leaderboards
        .position(weekly, ids[0].clone())
        .await
        .expect("position computes");

    assert_eq!(after.position, Some(1));
    assert_eq!(after.entry.and_then(|entry| entry.weekly_sessions), Some(1));
    assert_eq!(ada.position, None);
}

#[rstest]
#[tokio::test]
async fn disabled_leaderboards_are_unavailable() {
    let store = Arc::new(MemoryStore::new());
    store.set_feature("leaderboard.enabled", json!(false)).await;
    let service = LeaderboardService::new(
        store.clone(),
        store,
        SteppingClock::at(monday_morning()),
    );

    let err = service
        .top(board(LeaderboardKind::Currency, LeaderboardScope::AllTime))
        .await
        .expect_err("feature is off");

    assert_eq!(err.code(), ErrorCode::ServiceUnavailable);
}
