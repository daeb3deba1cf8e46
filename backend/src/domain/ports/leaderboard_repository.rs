//! Port for leaderboard snapshot storage and on-demand viewer ranking.

use async_trait::async_trait;
use chrono::{DateTime, Utc};

use crate::domain::AccountId;
use crate::domain::leaderboard::{BoardKey, LeaderboardEntry, SnapshotConfig, StoredSnapshot};

use super::define_port_error;

define_port_error! {
    /// Errors raised by leaderboard repository adapters.
    pub enum LeaderboardRepositoryError {
        /// Repository connection could not be established.
        Connection { message: String } =>
            "leaderboard repository connection failed: {message}",
        /// Query or mutation failed during execution.
        Query { message: String } =>
            "leaderboard repository query failed: {message}",
    }
}

/// Outcome of a refresh attempt.
#[derive(Debug, Clone, PartialEq)]
pub enum RefreshOutcome {
    /// The snapshot was recomputed and stored.
    Refreshed(StoredSnapshot),
    /// Another caller holds the refresh lock for this board.
    LockBusy,
}

/// The viewer's own row on a board.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ViewerStanding {
    /// Entry with `position` filled in.
    pub entry: LeaderboardEntry,
}

/// Port for reading and recomputing leaderboard snapshots.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait LeaderboardRepository: Send + Sync {
    /// Read the cached snapshot for a board, if any.
    async fn load_snapshot(
        &self,
        key: &BoardKey,
    ) -> Result<Option<StoredSnapshot>, LeaderboardRepositoryError>;

    /// Recompute and store the board under a non-blocking, board-scoped
    /// lock. Returns [`RefreshOutcome::LockBusy`] instead of waiting.
    async fn refresh_snapshot(
        &self,
        key: &BoardKey,
        config: SnapshotConfig,
        now: DateTime<Utc>,
    ) -> Result<RefreshOutcome, LeaderboardRepositoryError>;

    /// Rank one account against live data; `None` when it is not on the
    /// board (unknown, or no activity in a weekly window).
    async fn viewer_standing(
        &self,
        key: &BoardKey,
        account_id: &AccountId,
        now: DateTime<Utc>,
    ) -> Result<Option<ViewerStanding>, LeaderboardRepositoryError>;
}

/// Fixture implementation holding no data and never locked.
#[derive(Debug, Default, Clone, Copy)]
pub struct FixtureLeaderboardRepository;

#[async_trait]
impl LeaderboardRepository for FixtureLeaderboardRepository {
    async fn load_snapshot(
        &self,
        _key: &BoardKey,
    ) -> Result<Option<StoredSnapshot>, LeaderboardRepositoryError> {
        Ok(None)
    }

    async fn refresh_snapshot(
        &self,
        _key: &BoardKey,
        config: SnapshotConfig,
        now: DateTime<Utc>,
    ) -> Result<RefreshOutcome, LeaderboardRepositoryError> {
        let payload = crate::domain::leaderboard::SnapshotPayload {
            config,
            entries: Vec::new(),
        };
        StoredSnapshot::encode(now, &payload)
            .map(RefreshOutcome::Refreshed)
            .map_err(|err| LeaderboardRepositoryError::query(err.to_string()))
    }

    async fn viewer_standing(
        &self,
        _key: &BoardKey,
        _account_id: &AccountId,
        _now: DateTime<Utc>,
    ) -> Result<Option<ViewerStanding>, LeaderboardRepositoryError> {
        Ok(None)
    }
}
