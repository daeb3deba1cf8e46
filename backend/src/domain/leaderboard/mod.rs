//! Leaderboard snapshot cache.
//!
//! Reads serve a cached snapshot while it is fresh. A stale or missing
//! snapshot triggers a refresh under a non-blocking per-board lock; when the
//! lock is taken or the refresh fails, whatever snapshot exists is served
//! with `stale: true`. Only a board with no snapshot at all reports
//! `service_unavailable`.

mod board;
mod settings;
mod snapshot;

pub use board::{
    BoardKey, BoardKeyError, LeaderboardEntry, LeaderboardKind, LeaderboardScope, Standing,
    WEEKLY_WINDOW_DAYS, compare_standings, rank_standings, viewer_position, weekly_window,
};
pub use settings::{LeaderboardSettings, SETTINGS_PREFIX};
pub use snapshot::{SnapshotConfig, SnapshotPayload, StoredSnapshot};

use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use mockable::Clock;
use tracing::{debug, info, warn};

use crate::domain::ports::{
    FeatureConfigRepository, LeaderboardQuery, LeaderboardRepository, LeaderboardRepositoryError,
    LeaderboardView, RefreshOutcome, ViewerPosition,
};
use crate::domain::{AccountId, Error};

fn map_repository_error(error: LeaderboardRepositoryError) -> Error {
    match error {
        LeaderboardRepositoryError::Connection { message } => {
            Error::service_unavailable(format!("leaderboard repository unavailable: {message}"))
        }
        LeaderboardRepositoryError::Query { message } => {
            Error::internal(format!("leaderboard repository error: {message}"))
        }
    }
}

fn view(
    key: BoardKey,
    computed_at: DateTime<Utc>,
    payload: SnapshotPayload,
    stale: bool,
) -> LeaderboardView {
    LeaderboardView {
        kind: key.kind(),
        scope: key.scope(),
        computed_at,
        stale,
        top_n: payload.config.top_n,
        entries: payload.entries,
    }
}

/// Leaderboard service implementing the leaderboard driving port.
#[derive(Clone)]
pub struct LeaderboardService<L, F> {
    leaderboard_repo: Arc<L>,
    feature_config_repo: Arc<F>,
    clock: Arc<dyn Clock>,
}

impl<L, F> LeaderboardService<L, F> {
    /// Create a service over snapshot storage and feature configuration.
    pub fn new(
        leaderboard_repo: Arc<L>,
        feature_config_repo: Arc<F>,
        clock: Arc<dyn Clock>,
    ) -> Self {
        Self {
            leaderboard_repo,
            feature_config_repo,
            clock,
        }
    }
}

impl<L, F> LeaderboardService<L, F>
where
    L: LeaderboardRepository,
    F: FeatureConfigRepository,
{
    /// Current settings; unreadable configuration falls back to defaults.
    async fn settings(&self) -> LeaderboardSettings {
        match self.feature_config_repo.load_prefixed(SETTINGS_PREFIX).await {
            Ok(rows) => LeaderboardSettings::from_entries(&rows),
            Err(err) => {
                warn!(error = %err, "feature config unavailable; using leaderboard defaults");
                LeaderboardSettings::default()
            }
        }
    }

    async fn enabled_settings(&self, key: BoardKey) -> Result<LeaderboardSettings, Error> {
        let settings = self.settings().await;
        if !settings.enabled {
            return Err(Error::service_unavailable("leaderboards are disabled"));
        }
        if key.scope() == LeaderboardScope::Weekly && !settings.weekly_enabled {
            return Err(Error::invalid_request("weekly leaderboards are disabled"));
        }
        Ok(settings)
    }
}

#[async_trait]
impl<L, F> LeaderboardQuery for LeaderboardService<L, F>
where
    L: LeaderboardRepository,
    F: FeatureConfigRepository,
{
    async fn top(&self, key: BoardKey) -> Result<LeaderboardView, Error> {
        let settings = self.enabled_settings(key).await?;
        let now = self.clock.utc();

        let existing = match self.leaderboard_repo.load_snapshot(&key).await {
            Ok(found) => found,
            Err(err) => {
                warn!(board = %key.cache_key(), error = %err, "snapshot read failed");
                None
            }
        };

        if let Some(stored) = &existing {
            if let Some(payload) = stored.fresh_payload(&settings, now) {
                return Ok(view(key, stored.computed_at, payload, false));
            }
        }

        match self
            .leaderboard_repo
            .refresh_snapshot(&key, SnapshotConfig::from(&settings), now)
            .await
        {
            Ok(RefreshOutcome::Refreshed(fresh)) => {
                if let Some(payload) = fresh.decode() {
                    info!(
                        board = %key.cache_key(),
                        entries = payload.entries.len(),
                        "leaderboard snapshot refreshed"
                    );
                    return Ok(view(key, fresh.computed_at, payload, false));
                }
                warn!(board = %key.cache_key(), "refreshed snapshot is unreadable");
            }
            Ok(RefreshOutcome::LockBusy) => {
                debug!(board = %key.cache_key(), "refresh lock busy; serving cached snapshot");
            }
            Err(err) => {
                warn!(board = %key.cache_key(), error = %err, "snapshot refresh failed");
            }
        }

        existing
            .as_ref()
            .and_then(|stored| stored.decode().map(|payload| (stored.computed_at, payload)))
            .map(|(computed_at, payload)| view(key, computed_at, payload, true))
            .ok_or_else(|| {
                Error::service_unavailable("leaderboard is being computed; retry shortly")
            })
    }

    async fn position(
        &self,
        key: BoardKey,
        account_id: AccountId,
    ) -> Result<ViewerPosition, Error> {
        self.enabled_settings(key).await?;
        let standing = self
            .leaderboard_repo
            .viewer_standing(&key, &account_id, self.clock.utc())
            .await
            .map_err(map_repository_error)?;

        Ok(ViewerPosition {
            kind: key.kind(),
            scope: key.scope(),
            position: standing.as_ref().map(|found| found.entry.position),
            entry: standing.map(|found| found.entry),
        })
    }
}

#[cfg(test)]
mod tests;
