//! PostgreSQL-backed `LeaderboardRepository`.
//!
//! Refreshes take a transaction-scoped advisory lock keyed by the board's
//! cache key with `pg_try_advisory_xact_lock`, so at most one caller
//! recomputes a board and the lock is released on commit or rollback. Every
//! ranking query orders by the same total order as
//! [`compare_standings`](crate::domain::leaderboard::compare_standings).

use async_trait::async_trait;
use chrono::{DateTime, NaiveDate, Utc};
use diesel::prelude::*;
use diesel::sql_query;
use diesel::sql_types::{BigInt, Date, Text, Uuid as SqlUuid};
use diesel::upsert::excluded;
use diesel_async::scoped_futures::ScopedFutureExt as _;
use diesel_async::{AsyncConnection as _, AsyncPgConnection, RunQueryDsl};

use crate::domain::AccountId;
use crate::domain::leaderboard::{
    BoardKey, LeaderboardKind, LeaderboardScope, SnapshotConfig, SnapshotPayload, Standing,
    StoredSnapshot, rank_standings, weekly_window,
};
use crate::domain::ports::{
    LeaderboardRepository, LeaderboardRepositoryError, RefreshOutcome, ViewerStanding,
};

use super::diesel_basic_error_mapping::{encode_failure, map_basic_diesel_error, map_basic_pool_error};
use super::models::{
    CountRow, LeaderboardSnapshotRow, LockRow, NewLeaderboardSnapshotRow, StandingRow, to_db_i64,
};
use super::pool::{DbPool, PoolError};
use super::schema::leaderboard_snapshots;

const TRY_LOCK_SQL: &str =
    "SELECT pg_try_advisory_xact_lock(hashtextextended($1, 0)) AS locked";

const ALL_TIME_COLUMNS: &str = r#"
SELECT a.id AS account_id, a.display_name, a.xp, a.currency,
       0::BIGINT AS weekly_xp, 0::BIGINT AS weekly_sessions
FROM accounts a
"#;

const CURRENCY_TOP_SQL: &str = "ORDER BY a.currency DESC, a.xp DESC, a.id ASC LIMIT $1";
const RANK_TOP_SQL: &str = "ORDER BY a.xp DESC, a.currency DESC, a.id ASC LIMIT $1";

/// Accounts with at least one session in `[$1, $2]`, with their totals.
const WEEKLY_CTE: &str = r#"
WITH weekly AS (
    SELECT d.account_id,
           SUM(d.xp_earned)::BIGINT AS weekly_xp,
           SUM(d.session_count)::BIGINT AS weekly_sessions
    FROM daily_activity d
    WHERE d.activity_date BETWEEN $1 AND $2
    GROUP BY d.account_id
    HAVING SUM(d.session_count) > 0
)
SELECT a.id AS account_id, a.display_name, a.xp, a.currency,
       w.weekly_xp, w.weekly_sessions
FROM weekly w
JOIN accounts a ON a.id = w.account_id
"#;

const WEEKLY_TOP_SQL: &str =
    "ORDER BY w.weekly_xp DESC, w.weekly_sessions DESC, a.id ASC LIMIT $3";

/// Diesel-backed implementation of the leaderboard port.
#[derive(Clone)]
pub struct DieselLeaderboardRepository {
    pool: DbPool,
}

impl DieselLeaderboardRepository {
    /// Create a new repository with the given connection pool.
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }
}

fn map_pool_error(error: PoolError) -> LeaderboardRepositoryError {
    map_basic_pool_error(error, LeaderboardRepositoryError::connection)
}

fn map_diesel_error(error: diesel::result::Error) -> LeaderboardRepositoryError {
    map_basic_diesel_error(
        error,
        LeaderboardRepositoryError::query,
        LeaderboardRepositoryError::connection,
    )
}

fn limit(top_n: u32) -> i64 {
    i64::from(top_n)
}

async fn load_top(
    conn: &mut AsyncPgConnection,
    key: BoardKey,
    top_n: u32,
    now: DateTime<Utc>,
) -> QueryResult<Vec<Standing>> {
    let rows: Vec<StandingRow> = match (key.kind(), key.scope()) {
        (LeaderboardKind::Currency, _) => {
            sql_query(format!("{ALL_TIME_COLUMNS} {CURRENCY_TOP_SQL}"))
                .bind::<BigInt, _>(limit(top_n))
                .load(conn)
                .await?
        }
        (LeaderboardKind::Rank, LeaderboardScope::AllTime) => {
            sql_query(format!("{ALL_TIME_COLUMNS} {RANK_TOP_SQL}"))
                .bind::<BigInt, _>(limit(top_n))
                .load(conn)
                .await?
        }
        (LeaderboardKind::Rank, LeaderboardScope::Weekly) => {
            let window = weekly_window(now);
            sql_query(format!("{WEEKLY_CTE} {WEEKLY_TOP_SQL}"))
                .bind::<Date, _>(*window.start())
                .bind::<Date, _>(*window.end())
                .bind::<BigInt, _>(limit(top_n))
                .load(conn)
                .await?
        }
    };
    Ok(rows.into_iter().map(Standing::from).collect())
}

async fn load_viewer(
    conn: &mut AsyncPgConnection,
    key: BoardKey,
    account_id: &AccountId,
    window: (NaiveDate, NaiveDate),
) -> QueryResult<Option<Standing>> {
    let row: Option<StandingRow> = match key.scope() {
        LeaderboardScope::AllTime => sql_query(format!("{ALL_TIME_COLUMNS} WHERE a.id = $1"))
            .bind::<SqlUuid, _>(*account_id.as_uuid())
            .get_result(conn)
            .await
            .optional()?,
        LeaderboardScope::Weekly => sql_query(format!("{WEEKLY_CTE} WHERE a.id = $3"))
            .bind::<Date, _>(window.0)
            .bind::<Date, _>(window.1)
            .bind::<SqlUuid, _>(*account_id.as_uuid())
            .get_result(conn)
            .await
            .optional()?,
    };
    Ok(row.map(Standing::from))
}

/// Count accounts strictly ahead of `viewer` under the board's total order.
///
/// Descending metrics are negated so one row comparison expresses the whole
/// tie-break chain.
async fn count_ahead(
    conn: &mut AsyncPgConnection,
    key: BoardKey,
    viewer: &Standing,
    window: (NaiveDate, NaiveDate),
) -> QueryResult<i64> {
    let id = *viewer.account_id.as_uuid();
    let row: CountRow = match (key.kind(), key.scope()) {
        (LeaderboardKind::Currency, _) => sql_query(
            "SELECT COUNT(*) AS count FROM accounts a \
             WHERE (-a.currency, -a.xp, a.id) < (-$1::BIGINT, -$2::BIGINT, $3::UUID)",
        )
        .bind::<BigInt, _>(to_db_i64(viewer.currency))
        .bind::<BigInt, _>(to_db_i64(viewer.xp))
        .bind::<SqlUuid, _>(id)
        .get_result(conn)
        .await?,
        (LeaderboardKind::Rank, LeaderboardScope::AllTime) => sql_query(
            "SELECT COUNT(*) AS count FROM accounts a \
             WHERE (-a.xp, -a.currency, a.id) < (-$1::BIGINT, -$2::BIGINT, $3::UUID)",
        )
        .bind::<BigInt, _>(to_db_i64(viewer.xp))
        .bind::<BigInt, _>(to_db_i64(viewer.currency))
        .bind::<SqlUuid, _>(id)
        .get_result(conn)
        .await?,
        (LeaderboardKind::Rank, LeaderboardScope::Weekly) => sql_query(
            "WITH weekly AS ( \
                 SELECT d.account_id, \
                        SUM(d.xp_earned)::BIGINT AS weekly_xp, \
                        SUM(d.session_count)::BIGINT AS weekly_sessions \
                 FROM daily_activity d \
                 WHERE d.activity_date BETWEEN $1 AND $2 \
                 GROUP BY d.account_id \
                 HAVING SUM(d.session_count) > 0 \
             ) \
             SELECT COUNT(*) AS count FROM weekly w \
             WHERE (-w.weekly_xp, -w.weekly_sessions, w.account_id) \
                 < (-$3::BIGINT, -$4::BIGINT, $5::UUID)",
        )
        .bind::<Date, _>(window.0)
        .bind::<Date, _>(window.1)
        .bind::<BigInt, _>(to_db_i64(viewer.weekly_xp))
        .bind::<BigInt, _>(i64::from(viewer.weekly_sessions))
        .bind::<SqlUuid, _>(id)
        .get_result(conn)
        .await?,
    };
    Ok(row.count)
}

#[async_trait]
impl LeaderboardRepository for DieselLeaderboardRepository {
    async fn load_snapshot(
        &self,
        key: &BoardKey,
    ) -> Result<Option<StoredSnapshot>, LeaderboardRepositoryError> {
        let mut conn = self.pool.get().await.map_err(map_pool_error)?;
        let row: Option<LeaderboardSnapshotRow> = leaderboard_snapshots::table
            .filter(
                leaderboard_snapshots::kind
                    .eq(key.kind().as_str())
                    .and(leaderboard_snapshots::scope.eq(key.scope().as_str())),
            )
            .select(LeaderboardSnapshotRow::as_select())
            .first(&mut conn)
            .await
            .optional()
            .map_err(map_diesel_error)?;

        Ok(row.map(|row| StoredSnapshot {
            computed_at: row.computed_at,
            payload: row.payload,
        }))
    }

    async fn refresh_snapshot(
        &self,
        key: &BoardKey,
        config: SnapshotConfig,
        now: DateTime<Utc>,
    ) -> Result<RefreshOutcome, LeaderboardRepositoryError> {
        let key = *key;
        let mut conn = self.pool.get().await.map_err(map_pool_error)?;

        conn.transaction(|conn| {
            async move {
                let lock: LockRow = sql_query(TRY_LOCK_SQL)
                    .bind::<Text, _>(key.cache_key())
                    .get_result(conn)
                    .await?;
                if !lock.locked {
                    return Ok(RefreshOutcome::LockBusy);
                }

                let standings = load_top(conn, key, config.top_n, now).await?;
                let payload = SnapshotPayload {
                    config,
                    entries: rank_standings(key, &standings, config.top_n),
                };
                let stored = StoredSnapshot::encode(now, &payload).map_err(encode_failure)?;

                diesel::insert_into(leaderboard_snapshots::table)
                    .values(&NewLeaderboardSnapshotRow {
                        kind: key.kind().as_str(),
                        scope: key.scope().as_str(),
                        computed_at: stored.computed_at,
                        payload: &stored.payload,
                    })
                    .on_conflict((leaderboard_snapshots::kind, leaderboard_snapshots::scope))
                    .do_update()
                    .set((
                        leaderboard_snapshots::computed_at
                            .eq(excluded(leaderboard_snapshots::computed_at)),
                        leaderboard_snapshots::payload.eq(excluded(leaderboard_snapshots::payload)),
                    ))
                    .execute(conn)
                    .await?;

                Ok(RefreshOutcome::Refreshed(stored))
            }
            .scope_boxed()
        })
        .await
        .map_err(map_diesel_error)
    }

    async fn viewer_standing(
        &self,
        key: &BoardKey,
        account_id: &AccountId,
        now: DateTime<Utc>,
    ) -> Result<Option<ViewerStanding>, LeaderboardRepositoryError> {
        let key = *key;
        let window = weekly_window(now);
        let window = (*window.start(), *window.end());
        let mut conn = self.pool.get().await.map_err(map_pool_error)?;

        let Some(viewer) = load_viewer(&mut conn, key, account_id, window)
            .await
            .map_err(map_diesel_error)?
        else {
            return Ok(None);
        };
        let ahead = count_ahead(&mut conn, key, &viewer, window)
            .await
            .map_err(map_diesel_error)?;
        let position = u32::try_from(ahead)
            .unwrap_or(u32::MAX)
            .saturating_add(1);

        Ok(Some(ViewerStanding {
            entry: viewer.to_entry(key, position),
        }))
    }
}
