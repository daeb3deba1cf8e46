//! In-process store implementing every driven port.
//!
//! Used when no database is configured and as the integration-test double.
//! Settlement holds one async mutex over the whole store for the duration of
//! a call, which gives the same serialisation as the `FOR UPDATE` row lock.
//! Leaderboard refreshes take a keyed, non-blocking try-lock per board.

use std::collections::{BTreeMap, HashMap, HashSet};
use std::sync::{Mutex as StdMutex, PoisonError};

use async_trait::async_trait;
use chrono::{DateTime, NaiveDate, Utc};
use serde_json::Value;
use tokio::sync::Mutex;
use tracing::debug;

use crate::domain::leaderboard::{
    BoardKey, SnapshotConfig, SnapshotPayload, Standing, StoredSnapshot, rank_standings,
    viewer_position, weekly_window,
};
use crate::domain::ports::{
    AccountProgress, FeatureConfigRepository, FeatureConfigRepositoryError, LeaderboardRepository,
    LeaderboardRepositoryError, ProgressRepository, ProgressRepositoryError, RefreshOutcome,
    SettlementAttempt, SettlementRepository, SettlementRepositoryError, SettlementResult,
    ViewerStanding,
};
use crate::domain::settlement::{
    SessionRecord, SettlementDecision, SettlementPlan, SettlementSnapshot, StoredReceipt, decide,
};
use crate::domain::{AccountAggregate, AccountId, EnergyPolicy, GameMode, IdempotencyKey, UnlockState};

#[cfg(test)]
mod tests;

/// Daily rollup for one account and UTC day.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
struct DailyActivity {
    xp_earned: u64,
    session_count: u32,
}

#[derive(Debug, Default)]
struct StoreState {
    accounts: HashMap<AccountId, AccountAggregate>,
    unlocks: HashMap<(AccountId, GameMode), UnlockState>,
    sessions: Vec<SessionRecord>,
    daily: HashMap<(AccountId, NaiveDate), DailyActivity>,
    receipts: HashMap<(AccountId, IdempotencyKey), StoredReceipt>,
    snapshots: HashMap<BoardKey, StoredSnapshot>,
    feature_config: BTreeMap<String, Value>,
}

impl StoreState {
    fn snapshot_for(&self, attempt: &SettlementAttempt, now: DateTime<Utc>) -> Option<SettlementSnapshot> {
        let account = self.accounts.get(&attempt.account_id)?.clone();
        let mode = attempt.outcome.config.mode();
        let today = now.date_naive();
        let receipt = attempt.idempotency.as_ref().and_then(|claim| {
            self.receipts
                .get(&(attempt.account_id.clone(), claim.key.clone()))
                .cloned()
        });
        Some(SettlementSnapshot {
            unlocks: self
                .unlocks
                .get(&(attempt.account_id.clone(), mode))
                .cloned()
                .unwrap_or_else(|| UnlockState::default_for(mode)),
            sessions_today: self
                .daily
                .get(&(attempt.account_id.clone(), today))
                .map_or(0, |day| day.session_count),
            perfect_recorded_today: self.sessions.iter().any(|session| {
                session.account_id == attempt.account_id
                    && session.created_at.date_naive() == today
                    && session.is_perfect()
            }),
            account,
            receipt,
        })
    }

    fn apply(&mut self, plan: &SettlementPlan, attempt: &SettlementAttempt) {
        let id = plan.account.id.clone();
        self.accounts.insert(id.clone(), plan.account.clone());
        let day = self
            .daily
            .entry((id.clone(), plan.activity_date))
            .or_default();
        day.xp_earned = day.xp_earned.saturating_add(plan.session.xp_earned);
        day.session_count = day.session_count.saturating_add(1);
        if let Some(unlocks) = &plan.unlocks {
            self.unlocks.insert((id.clone(), unlocks.mode()), unlocks.clone());
        }
        if let Some(claim) = &attempt.idempotency {
            self.receipts.insert(
                (id, claim.key.clone()),
                StoredReceipt {
                    payload_hash: claim.payload_hash,
                    response: plan.response.clone(),
                },
            );
        }
        self.sessions.push(plan.session.clone());
    }

    fn standings(&self, now: DateTime<Utc>) -> Vec<Standing> {
        let window = weekly_window(now);
        self.accounts
            .values()
            .map(|account| {
                let (weekly_xp, weekly_sessions) = self
                    .daily
                    .iter()
                    .filter(|((owner, date), _)| *owner == account.id && window.contains(date))
                    .fold((0_u64, 0_u32), |(xp, count), (_, day)| {
                        (
                            xp.saturating_add(day.xp_earned),
                            count.saturating_add(day.session_count),
                        )
                    });
                Standing {
                    account_id: account.id.clone(),
                    display_name: account.display_name.clone(),
                    xp: account.xp,
                    currency: account.currency,
                    weekly_xp,
                    weekly_sessions,
                }
            })
            .collect()
    }
}

/// Releases a board's refresh lock when dropped.
struct RefreshGuard<'a> {
    held: &'a StdMutex<HashSet<BoardKey>>,
    key: BoardKey,
}

impl Drop for RefreshGuard<'_> {
    fn drop(&mut self) {
        self.held
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .remove(&self.key);
    }
}

/// Shared in-memory store. Wrap in an `Arc` and hand the same instance to
/// every service.
#[derive(Debug, Default)]
pub struct MemoryStore {
    state: Mutex<StoreState>,
    refreshing: StdMutex<HashSet<BoardKey>>,
}

impl MemoryStore {
    /// Empty store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert or replace an account.
    pub async fn seed_account(&self, account: AccountAggregate) {
        let mut state = self.state.lock().await;
        state.accounts.insert(account.id.clone(), account);
    }

    /// Store an unlock state for its mode.
    pub async fn seed_unlocks(&self, account_id: &AccountId, unlocks: UnlockState) {
        let mut state = self.state.lock().await;
        state
            .unlocks
            .insert((account_id.clone(), unlocks.mode()), unlocks);
    }

    /// Set a feature configuration row.
    pub async fn set_feature(&self, key: impl Into<String>, value: Value) {
        let mut state = self.state.lock().await;
        state.feature_config.insert(key.into(), value);
    }

    /// Current account state, if known.
    pub async fn account(&self, account_id: &AccountId) -> Option<AccountAggregate> {
        self.state.lock().await.accounts.get(account_id).cloned()
    }

    /// Number of stored session records.
    pub async fn session_count(&self) -> usize {
        self.state.lock().await.sessions.len()
    }

    /// Number of stored idempotency receipts.
    pub async fn receipt_count(&self) -> usize {
        self.state.lock().await.receipts.len()
    }

    fn try_lock_board(&self, key: BoardKey) -> Option<RefreshGuard<'_>> {
        let mut held = self
            .refreshing
            .lock()
            .unwrap_or_else(PoisonError::into_inner);
        if !held.insert(key) {
            return None;
        }
        Some(RefreshGuard {
            held: &self.refreshing,
            key,
        })
    }
}

#[async_trait]
impl SettlementRepository for MemoryStore {
    async fn settle(
        &self,
        attempt: &SettlementAttempt,
        policy: &EnergyPolicy,
        now: DateTime<Utc>,
    ) -> Result<SettlementResult, SettlementRepositoryError> {
        let mut state = self.state.lock().await;
        let Some(snapshot) = state.snapshot_for(attempt, now) else {
            return Ok(SettlementResult::AccountNotFound);
        };

        Ok(match decide(&snapshot, attempt, policy, now) {
            SettlementDecision::Replay(response) => SettlementResult::Replayed(response),
            SettlementDecision::Conflict => SettlementResult::IdempotencyConflict,
            SettlementDecision::Reject(rejection) => {
                debug!(account_id = %attempt.account_id, %rejection, "settlement refused");
                SettlementResult::Rejected(rejection)
            }
            SettlementDecision::Commit(plan) => {
                state.apply(&plan, attempt);
                SettlementResult::Settled(plan.response)
            }
        })
    }
}

#[async_trait]
impl LeaderboardRepository for MemoryStore {
    async fn load_snapshot(
        &self,
        key: &BoardKey,
    ) -> Result<Option<StoredSnapshot>, LeaderboardRepositoryError> {
        Ok(self.state.lock().await.snapshots.get(key).cloned())
    }

    async fn refresh_snapshot(
        &self,
        key: &BoardKey,
        config: SnapshotConfig,
        now: DateTime<Utc>,
    ) -> Result<RefreshOutcome, LeaderboardRepositoryError> {
        let Some(_guard) = self.try_lock_board(*key) else {
            return Ok(RefreshOutcome::LockBusy);
        };

        let mut state = self.state.lock().await;
        let payload = SnapshotPayload {
            config,
            entries: rank_standings(*key, &state.standings(now), config.top_n),
        };
        let stored = StoredSnapshot::encode(now, &payload)
            .map_err(|err| LeaderboardRepositoryError::query(err.to_string()))?;
        state.snapshots.insert(*key, stored.clone());
        Ok(RefreshOutcome::Refreshed(stored))
    }

    async fn viewer_standing(
        &self,
        key: &BoardKey,
        account_id: &AccountId,
        now: DateTime<Utc>,
    ) -> Result<Option<ViewerStanding>, LeaderboardRepositoryError> {
        let standings = self.state.lock().await.standings(now);
        let Some(viewer) = standings
            .iter()
            .find(|standing| standing.account_id == *account_id)
        else {
            return Ok(None);
        };
        Ok(viewer_position(*key, &standings, viewer).map(|position| ViewerStanding {
            entry: viewer.to_entry(*key, position),
        }))
    }
}

#[async_trait]
impl ProgressRepository for MemoryStore {
    async fn load_progress(
        &self,
        account_id: &AccountId,
    ) -> Result<Option<AccountProgress>, ProgressRepositoryError> {
        let state = self.state.lock().await;
        let Some(account) = state.accounts.get(account_id).cloned() else {
            return Ok(None);
        };
        let unlocks = GameMode::ALL
            .into_iter()
            .filter_map(|mode| state.unlocks.get(&(account_id.clone(), mode)).cloned())
            .collect();
        Ok(Some(AccountProgress { account, unlocks }))
    }
}

#[async_trait]
impl FeatureConfigRepository for MemoryStore {
    async fn load_prefixed(
        &self,
        prefix: &str,
    ) -> Result<BTreeMap<String, Value>, FeatureConfigRepositoryError> {
        let state = self.state.lock().await;
        Ok(state
            .feature_config
            .iter()
            .filter(|(key, _)| key.starts_with(prefix))
            .map(|(key, value)| (key.clone(), value.clone()))
            .collect())
    }
}
