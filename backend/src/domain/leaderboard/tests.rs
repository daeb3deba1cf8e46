//! Tests for board ordering and the snapshot cache service.

use std::collections::BTreeMap;
use std::sync::Arc;

use chrono::{DateTime, Duration, Local, TimeZone, Utc};
use mockable::Clock;
use rstest::{fixture, rstest};
use serde_json::json;
use uuid::Uuid;

use super::*;
use crate::domain::ports::{
    FeatureConfigRepositoryError, MockFeatureConfigRepository, MockLeaderboardRepository,
    ViewerStanding,
};
use crate::domain::{AccountId, ErrorCode};

struct FixtureClock {
    utc_now: DateTime<Utc>,
}

impl Clock for FixtureClock {
    fn local(&self) -> DateTime<Local> {
        self.utc_now.with_timezone(&Local)
    }

    fn utc(&self) -> DateTime<Utc> {
        self.utc_now
    }
}

#[fixture]
fn now() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2026, 6, 1, 8, 30, 0)
        .single()
        .expect("valid timestamp")
}

fn rank_all_time() -> BoardKey {
    BoardKey::new(LeaderboardKind::Rank, LeaderboardScope::AllTime).expect("supported board")
}

fn rank_weekly() -> BoardKey {
    BoardKey::new(LeaderboardKind::Rank, LeaderboardScope::Weekly).expect("supported board")
}

fn currency() -> BoardKey {
    BoardKey::new(LeaderboardKind::Currency, LeaderboardScope::AllTime).expect("supported board")
}

fn account(n: u128) -> AccountId {
    AccountId::from_uuid(Uuid::from_u128(n))
}

fn standing(n: u128, xp: u64, coins: u64, weekly_xp: u64, weekly_sessions: u32) -> Standing {
    Standing {
        account_id: account(n),
        display_name: format!("player-{n}"),
        xp,
        currency: coins,
        weekly_xp,
        weekly_sessions,
    }
}

fn snapshot_at(computed_at: DateTime<Utc>, entries: usize) -> StoredSnapshot {
    let key = rank_all_time();
    let standings: Vec<Standing> = (1..=entries as u128)
        .map(|n| standing(n, 100 * n as u64, 0, 0, 0))
        .collect();
    let settings = LeaderboardSettings::default();
    StoredSnapshot::encode(
        computed_at,
        &SnapshotPayload {
            config: SnapshotConfig::from(&settings),
            entries: rank_standings(key, &standings, settings.top_n),
        },
    )
    .expect("payload encodes")
}

fn default_config() -> MockFeatureConfigRepository {
    let mut config = MockFeatureConfigRepository::new();
    config
        .expect_load_prefixed()
        .returning(|_| Ok(BTreeMap::new()));
    config
}

fn config_with(rows: Vec<(&'static str, serde_json::Value)>) -> MockFeatureConfigRepository {
    let map: BTreeMap<String, serde_json::Value> = rows
        .into_iter()
        .map(|(key, value)| (key.to_owned(), value))
        .collect();
    let mut config = MockFeatureConfigRepository::new();
    config
        .expect_load_prefixed()
        .returning(move |_| Ok(map.clone()));
    config
}

fn service(
    repo: MockLeaderboardRepository,
    config: MockFeatureConfigRepository,
    now: DateTime<Utc>,
) -> LeaderboardService<MockLeaderboardRepository, MockFeatureConfigRepository> {
    LeaderboardService::new(
        Arc::new(repo),
        Arc::new(config),
        Arc::new(FixtureClock { utc_now: now }),
    )
}

#[rstest]
fn currency_board_orders_by_coins_then_xp() {
    let standings = vec![
        standing(1, 900, 10, 0, 0),
        standing(2, 100, 40, 0, 0),
        standing(3, 500, 40, 0, 0),
    ];
    let entries = rank_standings(currency(), &standings, 10);
    let order: Vec<AccountId> = entries.iter().map(|entry| entry.account_id.clone()).collect();
    assert_eq!(order, vec![account(3), account(2), account(1)]);
    assert_eq!(
        entries.iter().map(|entry| entry.position).collect::<Vec<_>>(),
        vec![1, 2, 3]
    );
}

#[rstest]
fn full_ties_fall_back_to_account_id() {
    let standings = vec![standing(9, 700, 5, 0, 0), standing(4, 700, 5, 0, 0)];
    let entries = rank_standings(rank_all_time(), &standings, 10);
    assert_eq!(entries[0].account_id, account(4));
    assert_eq!(entries[1].account_id, account(9));
}

#[rstest]
fn weekly_board_skips_inactive_accounts() {
    let standings = vec![
        standing(1, 90_000, 0, 0, 0),
        standing(2, 10, 0, 120, 3),
        standing(3, 20, 0, 120, 4),
    ];
    let entries = rank_standings(rank_weekly(), &standings, 10);
    assert_eq!(entries.len(), 2);
    assert_eq!(entries[0].account_id, account(3));
    assert_eq!(entries[0].weekly_sessions, Some(4));
    assert_eq!(entries[1].weekly_xp, Some(120));

    let all_time = rank_standings(rank_all_time(), &standings, 10);
    assert_eq!(all_time[0].rank_level, 7);
    assert_eq!(all_time[0].weekly_xp, None);
}

#[rstest]
fn top_n_truncates_after_ordering() {
    let standings: Vec<Standing> = (1..=5).map(|n| standing(n, n as u64, 0, 0, 0)).collect();
    let entries = rank_standings(rank_all_time(), &standings, 2);
    assert_eq!(entries.len(), 2);
    assert_eq!(entries[0].account_id, account(5));
}

#[rstest]
fn viewer_position_matches_ranked_list() {
    let standings = vec![
        standing(1, 300, 0, 0, 0),
        standing(2, 200, 0, 0, 0),
        standing(3, 200, 0, 0, 0),
        standing(4, 100, 0, 0, 0),
    ];
    let key = rank_all_time();
    let entries = rank_standings(key, &standings, 100);
    for viewer in &standings {
        let listed = entries
            .iter()
            .find(|entry| entry.account_id == viewer.account_id)
            .map(|entry| entry.position);
        assert_eq!(viewer_position(key, &standings, viewer), listed);
    }
}

#[rstest]
fn inactive_viewer_has_no_weekly_position() {
    let viewer = standing(7, 5_000, 0, 0, 0);
    assert_eq!(
        viewer_position(rank_weekly(), std::slice::from_ref(&viewer), &viewer),
        None
    );
}

#[rstest]
#[case("rank", None, Ok("rank:all-time"))]
#[case("xp", Some("weekly"), Ok("rank:weekly"))]
#[case("coins", Some("all_time"), Ok("currency:all-time"))]
#[case("currency", Some("weekly"), Err(()))]
#[case("streak", None, Err(()))]
#[case("rank", Some("monthly"), Err(()))]
fn board_keys_parse(
    #[case] kind: &str,
    #[case] scope: Option<&str>,
    #[case] expected: Result<&str, ()>,
) {
    let parsed = BoardKey::parse(kind, scope).map(|key| key.cache_key());
    assert_eq!(parsed.as_deref().map_err(|_| ()), expected);
}

#[rstest]
#[tokio::test]
async fn fresh_snapshot_is_served_without_refresh(now: DateTime<Utc>) {
    let stored = snapshot_at(now - Duration::seconds(30), 3);
    let mut repo = MockLeaderboardRepository::new();
    repo.expect_load_snapshot()
        .times(1)
        .returning(move |_| Ok(Some(stored.clone())));
    repo.expect_refresh_snapshot().times(0);

    let view = service(repo, default_config(), now)
        .top(rank_all_time())
        .await
        .expect("board served");

    assert!(!view.stale);
    assert_eq!(view.entries.len(), 3);
    assert_eq!(view.computed_at, now - Duration::seconds(30));
    assert_eq!(view.top_n, 50);
}

#[rstest]
#[tokio::test]
async fn stale_snapshot_is_refreshed(now: DateTime<Utc>) {
    let old = snapshot_at(now - Duration::minutes(5), 1);
    let fresh = snapshot_at(now, 4);
    let mut repo = MockLeaderboardRepository::new();
    repo.expect_load_snapshot()
        .returning(move |_| Ok(Some(old.clone())));
    repo.expect_refresh_snapshot()
        .times(1)
        .withf(move |key, config, at| {
            key.cache_key() == "rank:all-time" && config.top_n == 50 && *at == now
        })
        .returning(move |_, _, _| Ok(RefreshOutcome::Refreshed(fresh.clone())));

    let view = service(repo, default_config(), now)
        .top(rank_all_time())
        .await
        .expect("board served");

    assert!(!view.stale);
    assert_eq!(view.entries.len(), 4);
    assert_eq!(view.computed_at, now);
}

#[rstest]
#[tokio::test]
async fn busy_lock_serves_stale_snapshot(now: DateTime<Utc>) {
    let old = snapshot_at(now - Duration::minutes(5), 2);
    let mut repo = MockLeaderboardRepository::new();
    repo.expect_load_snapshot()
        .returning(move |_| Ok(Some(old.clone())));
    repo.expect_refresh_snapshot()
        .returning(|_, _, _| Ok(RefreshOutcome::LockBusy));

    let view = service(repo, default_config(), now)
        .top(rank_all_time())
        .await
        .expect("stale board served");

    assert!(view.stale);
    assert_eq!(view.entries.len(), 2);
    assert_eq!(view.computed_at, now - Duration::minutes(5));
}

#[rstest]
#[tokio::test]
async fn failed_refresh_serves_stale_snapshot(now: DateTime<Utc>) {
    let old = snapshot_at(now - Duration::minutes(5), 2);
    let mut repo = MockLeaderboardRepository::new();
    repo.expect_load_snapshot()
        .returning(move |_| Ok(Some(old.clone())));
    repo.expect_refresh_snapshot()
        .returning(|_, _, _| Err(LeaderboardRepositoryError::query("deadlock detected")));

    let view = service(repo, default_config(), now)
        .top(rank_all_time())
        .await
        .expect("stale board served");
    assert!(view.stale);
}

#[rstest]
#[tokio::test]
async fn missing_snapshot_with_busy_lock_is_unavailable(now: DateTime<Utc>) {
    let mut repo = MockLeaderboardRepository::new();
    repo.expect_load_snapshot().returning(|_| Ok(None));
    repo.expect_refresh_snapshot()
        .returning(|_, _, _| Ok(RefreshOutcome::LockBusy));

    let err = service(repo, default_config(), now)
        .top(rank_all_time())
        .await
        .expect_err("nothing to serve");
    assert_eq!(err.code(), ErrorCode::ServiceUnavailable);
}

#[rstest]
#[tokio::test]
async fn unreadable_snapshot_read_still_refreshes(now: DateTime<Utc>) {
    let fresh = snapshot_at(now, 1);
    let mut repo = MockLeaderboardRepository::new();
    repo.expect_load_snapshot()
        .returning(|_| Err(LeaderboardRepositoryError::connection("pool timed out")));
    repo.expect_refresh_snapshot()
        .times(1)
        .returning(move |_, _, _| Ok(RefreshOutcome::Refreshed(fresh.clone())));

    let view = service(repo, default_config(), now)
        .top(rank_all_time())
        .await
        .expect("board served");
    assert_eq!(view.entries.len(), 1);
}

#[rstest]
#[tokio::test]
async fn settings_change_invalidates_fresh_snapshot(now: DateTime<Utc>) {
    let old = snapshot_at(now - Duration::seconds(5), 3);
    let mut repo = MockLeaderboardRepository::new();
    repo.expect_load_snapshot()
        .returning(move |_| Ok(Some(old.clone())));
    repo.expect_refresh_snapshot()
        .times(1)
        .withf(|_, config, _| config.top_n == 2 && config.version == 1)
        .returning(|_, _, _| Ok(RefreshOutcome::LockBusy));

    let config = config_with(vec![("leaderboard.top_n", json!(2))]);
    let view = service(repo, config, now)
        .top(rank_all_time())
        .await
        .expect("stale board served");
    assert!(view.stale);
}

#[rstest]
#[tokio::test]
async fn disabled_boards_are_unavailable(now: DateTime<Utc>) {
    let mut repo = MockLeaderboardRepository::new();
    repo.expect_load_snapshot().times(0);
    repo.expect_viewer_standing().times(0);

    let svc = service(
        repo,
        config_with(vec![("leaderboard.enabled", json!(false))]),
        now,
    );
    let top = svc.top(rank_all_time()).await.expect_err("disabled");
    assert_eq!(top.code(), ErrorCode::ServiceUnavailable);
    let position = svc
        .position(rank_all_time(), account(1))
        .await
        .expect_err("disabled");
    assert_eq!(position.code(), ErrorCode::ServiceUnavailable);
}

#[rstest]
#[tokio::test]
async fn weekly_scope_can_be_switched_off(now: DateTime<Utc>) {
    let mut repo = MockLeaderboardRepository::new();
    repo.expect_load_snapshot().times(0);

    let svc = service(
        repo,
        config_with(vec![("leaderboard.weekly_enabled", json!(false))]),
        now,
    );
    let err = svc.top(rank_weekly()).await.expect_err("weekly off");
    assert_eq!(err.code(), ErrorCode::InvalidRequest);
}

#[rstest]
#[tokio::test]
async fn config_failures_fall_back_to_defaults(now: DateTime<Utc>) {
    let fresh = snapshot_at(now - Duration::seconds(1), 1);
    let mut repo = MockLeaderboardRepository::new();
    repo.expect_load_snapshot()
        .returning(move |_| Ok(Some(fresh.clone())));
    repo.expect_refresh_snapshot().times(0);

    let mut config = MockFeatureConfigRepository::new();
    config
        .expect_load_prefixed()
        .returning(|_| Err(FeatureConfigRepositoryError::connection("refused")));

    let view = service(repo, config, now)
        .top(rank_all_time())
        .await
        .expect("defaults apply");
    assert!(!view.stale);
}

#[rstest]
#[tokio::test]
async fn position_reports_viewer_entry(now: DateTime<Utc>) {
    let viewer = account(42);
    let entry = standing(42, 2_600, 12, 0, 0).to_entry(rank_all_time(), 7);
    let expected = entry.clone();
    let mut repo = MockLeaderboardRepository::new();
    repo.expect_viewer_standing()
        .withf(move |key, id, at| {
            key.cache_key() == "rank:all-time" && *id == account(42) && *at == now
        })
        .returning(move |_, _, _| {
            Ok(Some(ViewerStanding {
                entry: entry.clone(),
            }))
        });

    let position = service(repo, default_config(), now)
        .position(rank_all_time(), viewer)
        .await
        .expect("position served");

    assert_eq!(position.position, Some(7));
    assert_eq!(position.entry, Some(expected));
    assert_eq!(position.kind, LeaderboardKind::Rank);
}

#[rstest]
#[tokio::test]
async fn unranked_viewer_has_no_position(now: DateTime<Utc>) {
    let mut repo = MockLeaderboardRepository::new();
    repo.expect_viewer_standing().returning(|_, _, _| Ok(None));

    let position = service(repo, default_config(), now)
        .position(rank_weekly(), account(3))
        .await
        .expect("position served");
    assert_eq!(position.position, None);
    assert_eq!(position.scope, LeaderboardScope::Weekly);
}

#[rstest]
#[case(LeaderboardRepositoryError::connection("down"), ErrorCode::ServiceUnavailable)]
#[case(LeaderboardRepositoryError::query("bad sql"), ErrorCode::InternalError)]
#[tokio::test]
async fn position_maps_repository_errors(
    now: DateTime<Utc>,
    #[case] error: LeaderboardRepositoryError,
    #[case] expected: ErrorCode,
) {
    let mut repo = MockLeaderboardRepository::new();
    repo.expect_viewer_standing()
        .times(1)
        .return_once(move |_, _, _| Err(error));

    let err = service(repo, default_config(), now)
        .position(rank_all_time(), account(1))
        .await
        .expect_err("repository failed");
    assert_eq!(err.code(), expected);
}

#[rstest]
fn weekly_window_spans_seven_utc_days(now: DateTime<Utc>) {
    let window = weekly_window(now);
    assert_eq!(*window.end(), now.date_naive());
    assert_eq!(
        window.start().iter_days().take_while(|day| window.contains(day)).count(),
        7
    );
    assert!(!window.contains(&(now - Duration::days(7)).date_naive()));
    assert!(window.contains(&(now - Duration::days(6)).date_naive()));
}
