//! Domain ports and supporting types for the hexagonal boundary.
//!
//! Driven ports (`*Repository`) are implemented by the Diesel and in-memory
//! adapters in `outbound`; driving ports (`*Command`, `*Query`) are
//! implemented by the domain services and consumed by the HTTP handlers.

mod macros;
pub(crate) use macros::define_port_error;

mod feature_config_repository;
mod leaderboard_query;
mod leaderboard_repository;
mod progress_query;
mod progress_repository;
mod settlement_command;
mod settlement_repository;

#[cfg(test)]
pub use feature_config_repository::MockFeatureConfigRepository;
pub use feature_config_repository::{
    FeatureConfigRepository, FeatureConfigRepositoryError, FixtureFeatureConfigRepository,
};
#[cfg(test)]
pub use leaderboard_query::MockLeaderboardQuery;
pub use leaderboard_query::{
    FixtureLeaderboardQuery, LeaderboardQuery, LeaderboardView, ViewerPosition,
};
#[cfg(test)]
pub use leaderboard_repository::MockLeaderboardRepository;
pub use leaderboard_repository::{
    FixtureLeaderboardRepository, LeaderboardRepository, LeaderboardRepositoryError,
    RefreshOutcome, ViewerStanding,
};
#[cfg(test)]
pub use progress_query::MockProgressQuery;
pub use progress_query::{FixtureProgressQuery, ProgressQuery, ProgressView};
#[cfg(test)]
pub use progress_repository::MockProgressRepository;
pub use progress_repository::{
    AccountProgress, FixtureProgressRepository, ProgressRepository, ProgressRepositoryError,
};
#[cfg(test)]
pub use settlement_command::MockSessionSettlementCommand;
pub use settlement_command::{
    FixtureSessionSettlementCommand, SessionSettlementCommand, SettleSessionRequest,
};
#[cfg(test)]
pub use settlement_repository::MockSettlementRepository;
pub use settlement_repository::{
    FixtureSettlementRepository, IdempotencyClaim, SettlementAttempt, SettlementRepository,
    SettlementRepositoryError, SettlementResult,
};
