//! Driving port for leaderboard reads.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use crate::domain::leaderboard::{BoardKey, LeaderboardEntry, LeaderboardKind, LeaderboardScope};
use crate::domain::{AccountId, Error};

/// Top of a board.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct LeaderboardView {
    /// Board kind.
    pub kind: LeaderboardKind,
    /// Board scope.
    pub scope: LeaderboardScope,
    /// When the served snapshot was computed.
    pub computed_at: DateTime<Utc>,
    /// True when a refresh was due but could not run, so older data is served.
    pub stale: bool,
    /// Row limit the snapshot was computed with.
    pub top_n: u32,
    /// Ranked rows, best first.
    pub entries: Vec<LeaderboardEntry>,
}

/// The caller's own position on a board.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct ViewerPosition {
    /// Board kind.
    pub kind: LeaderboardKind,
    /// Board scope.
    pub scope: LeaderboardScope,
    /// `None` when the caller is not ranked on this board.
    pub position: Option<u32>,
    /// The caller's row, when ranked.
    pub entry: Option<LeaderboardEntry>,
}

/// Driving port for leaderboard reads.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait LeaderboardQuery: Send + Sync {
    /// Serve the cached top of a board, refreshing it when stale.
    async fn top(&self, key: BoardKey) -> Result<LeaderboardView, Error>;

    /// Rank the caller against live data.
    async fn position(
        &self,
        key: BoardKey,
        account_id: AccountId,
    ) -> Result<ViewerPosition, Error>;
}

/// Fixture query that reports leaderboards as unavailable.
#[derive(Debug, Default, Clone, Copy)]
pub struct FixtureLeaderboardQuery;

#[async_trait]
impl LeaderboardQuery for FixtureLeaderboardQuery {
    async fn top(&self, _key: BoardKey) -> Result<LeaderboardView, Error> {
        Err(Error::service_unavailable("leaderboards are disabled"))
    }

    async fn position(
        &self,
        _key: BoardKey,
        _account_id: AccountId,
    ) -> Result<ViewerPosition, Error> {
        Err(Error::service_unavailable("leaderboards are disabled"))
    }
}
