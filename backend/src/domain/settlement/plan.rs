//! Pure core of the settlement transaction.
//!
//! Adapters load a [`SettlementSnapshot`] inside their transaction, call
//! [`decide`] and persist whatever a [`SettlementDecision::Commit`] carries.
//! Nothing here touches storage or the clock.

use chrono::{DateTime, NaiveDate, Utc};
use serde_json::Value;
use uuid::Uuid;

use super::input::{OutcomeCounts, SessionOutcome};
use super::response::{SettlementResponse, StoredReceipt};
use crate::domain::account::{AccountAggregate, AccountId};
use crate::domain::energy::EnergyPolicy;
use crate::domain::game_mode::GameConfig;
use crate::domain::ports::SettlementAttempt;
use crate::domain::rewards::{self, BonusContext};
use crate::domain::unlocks::UnlockState;

/// Everything loaded for one settlement.
#[derive(Debug, Clone, PartialEq)]
pub struct SettlementSnapshot {
    /// The account row, read under lock.
    pub account: AccountAggregate,
    /// Normalised unlock state for the played mode.
    pub unlocks: UnlockState,
    /// Sessions already settled today (UTC).
    pub sessions_today: u32,
    /// Whether a 100% session was already recorded today (UTC).
    pub perfect_recorded_today: bool,
    /// Receipt already stored for the attempt's idempotency key.
    pub receipt: Option<StoredReceipt>,
}

/// Business reasons a settlement is refused.
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
pub enum SettlementRejection {
    /// Energy is empty and no unlimited window is active.
    #[error("no energy left to play")]
    EnergyExhausted,
    /// The configuration uses a level the account has not unlocked.
    #[error("session configuration is locked")]
    ConfigLocked,
}

/// Append-only log entry for a settled session.
#[derive(Debug, Clone, PartialEq)]
pub struct SessionRecord {
    /// Session identifier.
    pub id: Uuid,
    /// Account that played the session.
    pub account_id: AccountId,
    /// Configuration played.
    pub config: GameConfig,
    /// Percentage of correct answers.
    pub accuracy: f64,
    /// Server-computed score.
    pub score: u64,
    /// Client-computed score, kept for audit.
    pub reported_score: Option<f64>,
    /// Mean reaction time, when measured.
    pub avg_reaction_time_ms: Option<f64>,
    /// Answer counters and duration.
    pub counts: OutcomeCounts,
    /// Mode-specific extras, stored verbatim.
    pub mode_specific_details: Option<Value>,
    /// Experience credited, bonuses included.
    pub xp_earned: u64,
    /// Currency credited.
    pub currency_earned: u64,
    /// Settlement time.
    pub created_at: DateTime<Utc>,
}

impl SessionRecord {
    /// Whether every answer was correct.
    pub fn is_perfect(&self) -> bool {
        self.accuracy >= 100.0
    }
}

/// Writes produced by a successful settlement.
#[derive(Debug, Clone, PartialEq)]
pub struct SettlementPlan {
    /// Account with new xp, currency and energy.
    pub account: AccountAggregate,
    /// Present only when something was newly unlocked.
    pub unlocks: Option<UnlockState>,
    /// Session log entry to append.
    pub session: SessionRecord,
    /// UTC day the daily rollup is credited to.
    pub activity_date: NaiveDate,
    /// Response returned to the client and stored on the receipt.
    pub response: SettlementResponse,
}

/// What the adapter should do with a loaded snapshot.
#[derive(Debug, Clone, PartialEq)]
pub enum SettlementDecision {
    /// A receipt with the same payload exists; return it unchanged.
    Replay(SettlementResponse),
    /// A receipt exists for a different payload.
    Conflict,
    /// Refuse the session; nothing is written.
    Reject(SettlementRejection),
    /// Apply the plan.
    Commit(Box<SettlementPlan>),
}

/// Decide the fate of an attempt against its loaded snapshot.
pub fn decide(
    snapshot: &SettlementSnapshot,
    attempt: &SettlementAttempt,
    policy: &EnergyPolicy,
    now: DateTime<Utc>,
) -> SettlementDecision {
    if let (Some(claim), Some(receipt)) = (&attempt.idempotency, &snapshot.receipt) {
        return if claim.payload_hash == receipt.payload_hash {
            SettlementDecision::Replay(receipt.response.clone().into_replay())
        } else {
            SettlementDecision::Conflict
        };
    }
    match plan_settlement(snapshot, attempt.session_id, &attempt.outcome, policy, now) {
        Ok(plan) => SettlementDecision::Commit(Box::new(plan)),
        Err(rejection) => SettlementDecision::Reject(rejection),
    }
}

/// Apply energy, gate, rewards and unlock progression to a snapshot.
///
/// Steps run in a fixed order: recover energy, refuse when empty, gate the
/// configuration, advance unlocks on a qualifying clear, price the session,
/// then spend one unit of energy (returned when something unlocked).
/// Accounts with active unlimited energy neither spend nor recover.
pub fn plan_settlement(
    snapshot: &SettlementSnapshot,
    session_id: Uuid,
    outcome: &SessionOutcome,
    policy: &EnergyPolicy,
    now: DateTime<Utc>,
) -> Result<SettlementPlan, SettlementRejection> {
    let account = &snapshot.account;
    let unlimited = account.energy.is_unlimited_at(now);

    let (available, anchor) = if unlimited {
        (account.energy.current, account.energy.updated_at)
    } else {
        policy.recover(account.energy.current, account.energy.updated_at, now)
    };
    if !unlimited && available == 0 {
        return Err(SettlementRejection::EnergyExhausted);
    }

    if !snapshot.unlocks.is_unlocked(&outcome.config) {
        return Err(SettlementRejection::ConfigLocked);
    }

    let (next_unlocks, newly_unlocked) = if outcome.is_qualifying() {
        snapshot.unlocks.advance(&outcome.config)
    } else {
        (snapshot.unlocks.clone(), Vec::new())
    };

    let breakdown = rewards::calculate(
        outcome.accuracy,
        &outcome.config,
        BonusContext {
            first_session_today: snapshot.sessions_today == 0,
            perfect_recorded_today: snapshot.perfect_recorded_today,
            new_unlocks: newly_unlocked.len(),
        },
    );

    let energy_refunded = !unlimited && !newly_unlocked.is_empty();
    let mut updated = account.clone();
    updated.xp = account.xp.saturating_add(breakdown.xp_earned);
    updated.currency = account.currency.saturating_add(breakdown.currency_earned);
    if !unlimited {
        updated.energy.current = if energy_refunded {
            available
        } else {
            available.saturating_sub(1)
        };
        updated.energy.updated_at = anchor.or(Some(now));
    }

    let session = SessionRecord {
        id: session_id,
        account_id: account.id.clone(),
        config: outcome.config,
        accuracy: outcome.accuracy,
        score: breakdown.score,
        reported_score: outcome.reported_score,
        avg_reaction_time_ms: outcome.avg_reaction_time_ms,
        counts: outcome.counts,
        mode_specific_details: outcome.mode_specific_details.clone(),
        xp_earned: breakdown.xp_earned,
        currency_earned: breakdown.currency_earned,
        created_at: now,
    };

    let response = SettlementResponse {
        session_id,
        mode: outcome.config.mode(),
        rewards: breakdown,
        xp: updated.xp,
        rank_level: updated.rank_level(),
        currency: updated.currency,
        energy: policy.read(&updated.energy, now),
        energy_refunded,
        unlocks: next_unlocks.clone(),
        newly_unlocked: newly_unlocked.clone(),
        replayed: false,
    };

    Ok(SettlementPlan {
        account: updated,
        unlocks: (!newly_unlocked.is_empty()).then_some(next_unlocks),
        session,
        activity_date: now.date_naive(),
        response,
    })
}
