//! Internal Diesel row structs for database operations.
//!
//! These types are implementation details of the persistence layer and must
//! never be exposed to the domain. Unsigned domain counters are stored in
//! signed columns; conversions saturate instead of wrapping.

use std::collections::BTreeMap;

use chrono::{DateTime, NaiveDate, Utc};
use diesel::prelude::*;
use diesel::sql_types::{BigInt, Bool, Text, Uuid as SqlUuid};
use serde_json::Value;
use uuid::Uuid;

use crate::domain::leaderboard::Standing;
use crate::domain::settlement::SessionRecord;
use crate::domain::{AccountAggregate, AccountId, CheckinState, EnergyState};

use super::schema::{
    accounts, daily_activity, feature_config, game_sessions, leaderboard_snapshots,
    settlement_receipts, unlock_states,
};

/// Store an unsigned counter in a signed column.
pub(crate) fn to_db_i64(value: u64) -> i64 {
    i64::try_from(value).unwrap_or(i64::MAX)
}

/// Store an unsigned counter in a 32-bit column.
pub(crate) fn to_db_i32(value: u32) -> i32 {
    i32::try_from(value).unwrap_or(i32::MAX)
}

/// Read a signed column as an unsigned counter; negatives read as zero.
pub(crate) fn from_db_u64(value: i64) -> u64 {
    u64::try_from(value).unwrap_or(0)
}

/// Read a signed column as an unsigned 32-bit counter.
pub(crate) fn from_db_u32(value: i64) -> u32 {
    u32::try_from(value.max(0)).unwrap_or(u32::MAX)
}

// ---------------------------------------------------------------------------
// Accounts
// ---------------------------------------------------------------------------

/// Row struct for reading from the accounts table.
#[derive(Debug, Clone, Queryable, Selectable)]
#[diesel(table_name = accounts)]
#[diesel(check_for_backend(diesel::pg::Pg))]
pub(crate) struct AccountRow {
    pub id: Uuid,
    pub display_name: String,
    pub xp: i64,
    pub currency: i64,
    pub energy: i32,
    pub energy_updated_at: Option<DateTime<Utc>>,
    pub unlimited_energy_until: Option<DateTime<Utc>>,
    pub checkin_streak: i32,
    pub last_checkin_on: Option<NaiveDate>,
    pub owned_items: Vec<String>,
    pub inventory: Value,
}

impl From<AccountRow> for AccountAggregate {
    fn from(row: AccountRow) -> Self {
        let inventory: BTreeMap<String, u32> =
            serde_json::from_value(row.inventory).unwrap_or_default();
        Self {
            id: AccountId::from_uuid(row.id),
            display_name: row.display_name,
            xp: from_db_u64(row.xp),
            currency: from_db_u64(row.currency),
            energy: EnergyState {
                current: from_db_u32(i64::from(row.energy)),
                updated_at: row.energy_updated_at,
                unlimited_until: row.unlimited_energy_until,
            },
            checkin: CheckinState {
                streak: from_db_u32(i64::from(row.checkin_streak)),
                last_checkin_on: row.last_checkin_on,
            },
            owned_items: row.owned_items,
            inventory,
        }
    }
}

/// Columns settlement rewrites on the account row. `rank_level` always
/// travels with `xp`.
#[derive(Debug, Clone, AsChangeset)]
#[diesel(table_name = accounts)]
#[diesel(treat_none_as_null = true)]
pub(crate) struct AccountProgressUpdate {
    pub xp: i64,
    pub rank_level: i16,
    pub currency: i64,
    pub energy: i32,
    pub energy_updated_at: Option<DateTime<Utc>>,
    pub updated_at: DateTime<Utc>,
}

impl AccountProgressUpdate {
    pub fn new(account: &AccountAggregate, now: DateTime<Utc>) -> Self {
        Self {
            xp: to_db_i64(account.xp),
            rank_level: i16::from(account.rank_level()),
            currency: to_db_i64(account.currency),
            energy: to_db_i32(account.energy.current),
            energy_updated_at: account.energy.updated_at,
            updated_at: now,
        }
    }
}

// ---------------------------------------------------------------------------
// Unlock states
// ---------------------------------------------------------------------------

/// Row struct for reading from the unlock_states table.
#[derive(Debug, Clone, Queryable, Selectable)]
#[diesel(table_name = unlock_states)]
#[diesel(check_for_backend(diesel::pg::Pg))]
pub(crate) struct UnlockStateRow {
    pub mode: String,
    pub state: Value,
}

/// Insertable struct for upserting an unlock document.
#[derive(Debug, Clone, Insertable)]
#[diesel(table_name = unlock_states)]
pub(crate) struct NewUnlockStateRow {
    pub account_id: Uuid,
    pub mode: &'static str,
    pub state: Value,
    pub updated_at: DateTime<Utc>,
}

// ---------------------------------------------------------------------------
// Session log and daily rollup
// ---------------------------------------------------------------------------

/// Insertable struct for appending to the session log.
#[derive(Debug, Clone, Insertable)]
#[diesel(table_name = game_sessions)]
pub(crate) struct NewGameSessionRow {
    pub id: Uuid,
    pub account_id: Uuid,
    pub mode: &'static str,
    pub depth: i32,
    pub rounds: i32,
    pub score: i64,
    pub accuracy: f64,
    pub reported_score: Option<f64>,
    pub config: Value,
    pub avg_reaction_time_ms: Option<f64>,
    pub correct_count: i32,
    pub incorrect_count: i32,
    pub missed_count: i32,
    pub duration_ms: i64,
    pub mode_specific_details: Option<Value>,
    pub xp_earned: i64,
    pub currency_earned: i64,
    pub created_at: DateTime<Utc>,
}

impl NewGameSessionRow {
    pub fn try_from_record(record: &SessionRecord) -> Result<Self, serde_json::Error> {
        Ok(Self {
            id: record.id,
            account_id: *record.account_id.as_uuid(),
            mode: record.config.mode().as_str(),
            depth: to_db_i32(record.config.depth()),
            rounds: to_db_i32(record.config.rounds()),
            score: to_db_i64(record.score),
            accuracy: record.accuracy,
            reported_score: record.reported_score,
            config: serde_json::to_value(record.config)?,
            avg_reaction_time_ms: record.avg_reaction_time_ms,
            correct_count: to_db_i32(record.counts.correct),
            incorrect_count: to_db_i32(record.counts.incorrect),
            missed_count: to_db_i32(record.counts.missed),
            duration_ms: to_db_i64(record.counts.duration_ms),
            mode_specific_details: record.mode_specific_details.clone(),
            xp_earned: to_db_i64(record.xp_earned),
            currency_earned: to_db_i64(record.currency_earned),
            created_at: record.created_at,
        })
    }
}

/// Insertable struct for the first session of a day.
#[derive(Debug, Clone, Insertable)]
#[diesel(table_name = daily_activity)]
pub(crate) struct NewDailyActivityRow {
    pub account_id: Uuid,
    pub activity_date: NaiveDate,
    pub xp_earned: i64,
    pub session_count: i32,
}

// ---------------------------------------------------------------------------
// Settlement receipts
// ---------------------------------------------------------------------------

/// Row struct for reading from the settlement_receipts table.
#[derive(Debug, Clone, Queryable, Selectable)]
#[diesel(table_name = settlement_receipts)]
#[diesel(check_for_backend(diesel::pg::Pg))]
pub(crate) struct SettlementReceiptRow {
    pub payload_hash: Vec<u8>,
    pub response_snapshot: Value,
}

/// Insertable struct for storing a receipt.
#[derive(Debug, Clone, Insertable)]
#[diesel(table_name = settlement_receipts)]
pub(crate) struct NewSettlementReceiptRow<'a> {
    pub idempotency_key: Uuid,
    pub account_id: Uuid,
    pub payload_hash: &'a [u8],
    pub response_snapshot: Value,
}

// ---------------------------------------------------------------------------
// Leaderboards and feature configuration
// ---------------------------------------------------------------------------

/// Row struct for reading from the leaderboard_snapshots table.
#[derive(Debug, Clone, Queryable, Selectable)]
#[diesel(table_name = leaderboard_snapshots)]
#[diesel(check_for_backend(diesel::pg::Pg))]
pub(crate) struct LeaderboardSnapshotRow {
    pub computed_at: DateTime<Utc>,
    pub payload: Value,
}

/// Insertable struct for replacing a snapshot.
#[derive(Debug, Clone, Insertable)]
#[diesel(table_name = leaderboard_snapshots)]
pub(crate) struct NewLeaderboardSnapshotRow<'a> {
    pub kind: &'a str,
    pub scope: &'a str,
    pub computed_at: DateTime<Utc>,
    pub payload: &'a Value,
}

/// Row struct for reading from the feature_config table.
#[derive(Debug, Clone, Queryable, Selectable)]
#[diesel(table_name = feature_config)]
#[diesel(check_for_backend(diesel::pg::Pg))]
pub(crate) struct FeatureConfigRow {
    pub key: String,
    pub value: Value,
}

/// Ranking inputs returned by the raw leaderboard queries.
#[derive(Debug, Clone, QueryableByName)]
pub(crate) struct StandingRow {
    #[diesel(sql_type = SqlUuid)]
    pub account_id: Uuid,
    #[diesel(sql_type = Text)]
    pub display_name: String,
    #[diesel(sql_type = BigInt)]
    pub xp: i64,
    #[diesel(sql_type = BigInt)]
    pub currency: i64,
    #[diesel(sql_type = BigInt)]
    pub weekly_xp: i64,
    #[diesel(sql_type = BigInt)]
    pub weekly_sessions: i64,
}

impl From<StandingRow> for Standing {
    fn from(row: StandingRow) -> Self {
        Self {
            account_id: AccountId::from_uuid(row.account_id),
            display_name: row.display_name,
            xp: from_db_u64(row.xp),
            currency: from_db_u64(row.currency),
            weekly_xp: from_db_u64(row.weekly_xp),
            weekly_sessions: from_db_u32(row.weekly_sessions),
        }
    }
}

/// Count row for raw SQL queries.
#[derive(Debug, Clone, Copy, QueryableByName)]
pub(crate) struct CountRow {
    #[diesel(sql_type = BigInt)]
    pub count: i64,
}

/// Result of a non-blocking advisory lock attempt.
#[derive(Debug, Clone, Copy, QueryableByName)]
pub(crate) struct LockRow {
    #[diesel(sql_type = Bool)]
    pub locked: bool,
}
