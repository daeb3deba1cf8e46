//! PostgreSQL-backed `SettlementRepository`.
//!
//! One call runs one transaction. The account row is locked `FOR UPDATE`
//! before anything else is read, so concurrent settlements for the same
//! account serialise and each sees the previous one's writes.

use async_trait::async_trait;
use chrono::{DateTime, Duration, NaiveTime, Utc};
use diesel::dsl::exists;
use diesel::prelude::*;
use diesel::upsert::excluded;
use diesel_async::scoped_futures::ScopedFutureExt as _;
use diesel_async::{AsyncConnection as _, AsyncPgConnection, RunQueryDsl};
use tracing::debug;

use crate::domain::ports::{
    IdempotencyClaim, SettlementAttempt, SettlementRepository, SettlementRepositoryError,
    SettlementResult,
};
use crate::domain::settlement::{
    SettlementDecision, SettlementPlan, SettlementResponse, SettlementSnapshot, StoredReceipt,
    decide,
};
use crate::domain::unlocks::normalize_unlock_state;
use crate::domain::{AccountAggregate, EnergyPolicy, PayloadHash};

use super::diesel_basic_error_mapping::{
    decode_failure, encode_failure, map_basic_diesel_error, map_basic_pool_error,
};
use super::models::{
    AccountProgressUpdate, AccountRow, NewDailyActivityRow, NewGameSessionRow,
    NewSettlementReceiptRow, NewUnlockStateRow, SettlementReceiptRow, UnlockStateRow, to_db_i64,
};
use super::pool::{DbPool, PoolError};
use super::schema::{accounts, daily_activity, game_sessions, settlement_receipts, unlock_states};

/// Diesel-backed implementation of the settlement port.
#[derive(Clone)]
pub struct DieselSettlementRepository {
    pool: DbPool,
}

impl DieselSettlementRepository {
    /// Create a new repository with the given connection pool.
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }
}

fn map_pool_error(error: PoolError) -> SettlementRepositoryError {
    map_basic_pool_error(error, SettlementRepositoryError::connection)
}

fn map_diesel_error(error: diesel::result::Error) -> SettlementRepositoryError {
    map_basic_diesel_error(
        error,
        SettlementRepositoryError::query,
        SettlementRepositoryError::connection,
    )
}

/// Start of the UTC day containing `now`, and the start of the next one.
fn utc_day_bounds(now: DateTime<Utc>) -> (DateTime<Utc>, DateTime<Utc>) {
    let start = now.date_naive().and_time(NaiveTime::MIN).and_utc();
    (start, start + Duration::days(1))
}

async fn load_receipt(
    conn: &mut AsyncPgConnection,
    attempt: &SettlementAttempt,
) -> QueryResult<Option<StoredReceipt>> {
    let Some(claim) = &attempt.idempotency else {
        return Ok(None);
    };
    let row: Option<SettlementReceiptRow> = settlement_receipts::table
        .filter(
            settlement_receipts::account_id
                .eq(attempt.account_id.as_uuid())
                .and(settlement_receipts::idempotency_key.eq(claim.key.as_uuid())),
        )
        .select(SettlementReceiptRow::as_select())
        .first(conn)
        .await
        .optional()?;

    row.map(|row| {
        let payload_hash = PayloadHash::try_from_bytes(&row.payload_hash).map_err(decode_failure)?;
        let response: SettlementResponse =
            serde_json::from_value(row.response_snapshot).map_err(decode_failure)?;
        Ok(StoredReceipt {
            payload_hash,
            response,
        })
    })
    .transpose()
}

/// Read everything `decide` needs, locking the account row first.
async fn load_snapshot(
    conn: &mut AsyncPgConnection,
    attempt: &SettlementAttempt,
    now: DateTime<Utc>,
) -> QueryResult<Option<SettlementSnapshot>> {
    let account_id = attempt.account_id.as_uuid();
    let Some(row) = accounts::table
        .filter(accounts::id.eq(account_id))
        .select(AccountRow::as_select())
        .for_update()
        .first(conn)
        .await
        .optional()?
    else {
        return Ok(None);
    };

    let receipt = load_receipt(conn, attempt).await?;

    let mode = attempt.outcome.config.mode();
    let stored: Option<UnlockStateRow> = unlock_states::table
        .filter(
            unlock_states::account_id
                .eq(account_id)
                .and(unlock_states::mode.eq(mode.as_str())),
        )
        .select(UnlockStateRow::as_select())
        .first(conn)
        .await
        .optional()?;
    let unlocks = normalize_unlock_state(mode, stored.as_ref().map(|row| &row.state));

    let sessions_today: Option<i32> = daily_activity::table
        .filter(
            daily_activity::account_id
                .eq(account_id)
                .and(daily_activity::activity_date.eq(now.date_naive())),
        )
        .select(daily_activity::session_count)
        .first(conn)
        .await
        .optional()?;

    let (day_start, day_end) = utc_day_bounds(now);
    let perfect_recorded_today: bool = diesel::select(exists(
        game_sessions::table.filter(
            game_sessions::account_id
                .eq(account_id)
                .and(game_sessions::accuracy.ge(100.0))
                .and(game_sessions::created_at.ge(day_start))
                .and(game_sessions::created_at.lt(day_end)),
        ),
    ))
    .get_result(conn)
    .await?;

    Ok(Some(SettlementSnapshot {
        account: AccountAggregate::from(row),
        unlocks,
        sessions_today: u32::try_from(sessions_today.unwrap_or(0)).unwrap_or(0),
        perfect_recorded_today,
        receipt,
    }))
}

/// Write a committed plan: session log, account, daily rollup, unlocks and
/// the receipt, in that order.
async fn persist_plan(
    conn: &mut AsyncPgConnection,
    plan: &SettlementPlan,
    claim: Option<&IdempotencyClaim>,
    now: DateTime<Utc>,
) -> QueryResult<()> {
    let account_id = *plan.account.id.as_uuid();

    let session = NewGameSessionRow::try_from_record(&plan.session).map_err(encode_failure)?;
    diesel::insert_into(game_sessions::table)
        .values(&session)
        .execute(conn)
        .await?;

    diesel::update(accounts::table.filter(accounts::id.eq(account_id)))
        .set(&AccountProgressUpdate::new(&plan.account, now))
        .execute(conn)
        .await?;

    diesel::insert_into(daily_activity::table)
        .values(&NewDailyActivityRow {
            account_id,
            activity_date: plan.activity_date,
            xp_earned: to_db_i64(plan.session.xp_earned),
            session_count: 1,
        })
        .on_conflict((daily_activity::account_id, daily_activity::activity_date))
        .do_update()
        .set((
            daily_activity::xp_earned
                .eq(daily_activity::xp_earned + excluded(daily_activity::xp_earned)),
            daily_activity::session_count.eq(daily_activity::session_count + 1),
        ))
        .execute(conn)
        .await?;

    if let Some(unlocks) = &plan.unlocks {
        let row = NewUnlockStateRow {
            account_id,
            mode: unlocks.mode().as_str(),
            state: unlocks.to_document().map_err(encode_failure)?,
            updated_at: now,
        };
        diesel::insert_into(unlock_states::table)
            .values(&row)
            .on_conflict((unlock_states::account_id, unlock_states::mode))
            .do_update()
            .set((
                unlock_states::state.eq(excluded(unlock_states::state)),
                unlock_states::updated_at.eq(excluded(unlock_states::updated_at)),
            ))
            .execute(conn)
            .await?;
    }

    if let Some(claim) = claim {
        let receipt = NewSettlementReceiptRow {
            idempotency_key: *claim.key.as_uuid(),
            account_id,
            payload_hash: claim.payload_hash.as_bytes(),
            response_snapshot: serde_json::to_value(&plan.response).map_err(encode_failure)?,
        };
        diesel::insert_into(settlement_receipts::table)
            .values(&receipt)
            .execute(conn)
            .await?;
    }

    Ok(())
}

#[async_trait]
impl SettlementRepository for DieselSettlementRepository {
    async fn settle(
        &self,
        attempt: &SettlementAttempt,
        policy: &EnergyPolicy,
        now: DateTime<Utc>,
    ) -> Result<SettlementResult, SettlementRepositoryError> {
        let mut conn = self.pool.get().await.map_err(map_pool_error)?;

        conn.transaction(|conn| {
            async move {
                let Some(snapshot) = load_snapshot(conn, attempt, now).await? else {
                    return Ok(SettlementResult::AccountNotFound);
                };

                match decide(&snapshot, attempt, policy, now) {
                    SettlementDecision::Replay(response) => Ok(SettlementResult::Replayed(response)),
                    SettlementDecision::Conflict => Ok(SettlementResult::IdempotencyConflict),
                    SettlementDecision::Reject(rejection) => {
                        debug!(account_id = %attempt.account_id, %rejection, "settlement refused");
                        Ok(SettlementResult::Rejected(rejection))
                    }
                    SettlementDecision::Commit(plan) => {
                        persist_plan(conn, &plan, attempt.idempotency.as_ref(), now).await?;
                        Ok(SettlementResult::Settled(plan.response))
                    }
                }
            }
            .scope_boxed()
        })
        .await
        .map_err(map_diesel_error)
    }
}
