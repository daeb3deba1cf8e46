//! Shared HTTP adapter state.
//!
//! HTTP handlers accept this state via `actix_web::web::Data` so they only
//! depend on domain ports (use-cases) and remain testable without I/O.

use std::sync::Arc;

use crate::domain::ports::{
    FixtureLeaderboardQuery, FixtureProgressQuery, FixtureSessionSettlementCommand,
    LeaderboardQuery, ProgressQuery, SessionSettlementCommand,
};

/// Dependency bundle for HTTP handlers.
#[derive(Clone)]
pub struct HttpState {
    /// Settlement transaction.
    pub settlement: Arc<dyn SessionSettlementCommand>,
    /// Leaderboard reads.
    pub leaderboards: Arc<dyn LeaderboardQuery>,
    /// Progress reads.
    pub progress: Arc<dyn ProgressQuery>,
}

impl HttpState {
    /// Construct state from the three driving ports.
    ///
    /// # Examples
    /// ```
    /// use std::sync::Arc;
    ///
    /// use cogtrain::domain::ports::{
    ///     FixtureLeaderboardQuery, FixtureProgressQuery, FixtureSessionSettlementCommand,
    /// };
    /// use cogtrain::inbound::http::state::HttpState;
    ///
    /// let state = HttpState::new(
    ///     Arc::new(FixtureSessionSettlementCommand),
    ///     Arc::new(FixtureLeaderboardQuery),
    ///     Arc::new(FixtureProgressQuery),
    /// );
    /// let _leaderboards = state.leaderboards.clone();
    /// ```
    pub fn new(
        settlement: Arc<dyn SessionSettlementCommand>,
        leaderboards: Arc<dyn LeaderboardQuery>,
        progress: Arc<dyn ProgressQuery>,
    ) -> Self {
        Self {
            settlement,
            leaderboards,
            progress,
        }
    }
}

impl Default for HttpState {
    /// Fixture ports only; every request fails with a domain error.
    fn default() -> Self {
        Self::new(
            Arc::new(FixtureSessionSettlementCommand),
            Arc::new(FixtureLeaderboardQuery),
            Arc::new(FixtureProgressQuery),
        )
    }
}
