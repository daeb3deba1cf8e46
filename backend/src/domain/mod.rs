//! Domain primitives, pure settlement logic and driving services.
//!
//! Purpose: keep every rule about energy, unlocks, rewards and rankings free
//! of I/O so it can be exercised directly in tests. Adapters reach the
//! domain only through the traits in [`ports`].
//!
//! Public surface:
//! - Error / ErrorCode — transport-agnostic failure payload.
//! - AccountAggregate / AccountId — durable per-account progression.
//! - EnergyPolicy — lazy energy recovery.
//! - GameConfig / UnlockState — validated session configuration and the
//!   per-mode unlock trees it is gated on.
//! - SettlementService, LeaderboardService, ProgressService — driving port
//!   implementations wired by the server.

pub mod account;
pub mod energy;
pub mod error;
pub mod game_mode;
pub mod idempotency;
pub mod leaderboard;
pub mod ports;
pub mod progress;
pub mod rewards;
pub mod settlement;
pub mod trace_id;
pub mod unlocks;

pub use self::account::{
    AccountAggregate, AccountId, AccountValidationError, CheckinState, EnergyState,
};
pub use self::energy::{EnergyPolicy, EnergyPolicyError, EnergyReading};
pub use self::error::{Error, ErrorCode, ErrorValidationError, TRACE_ID_HEADER};
pub use self::game_mode::{
    GameConfig, GameMode, HouseConfig, HouseSpeed, MouseConfig, MouseDifficulty, NumericConfig,
    SpatialConfig, UnknownGameMode,
};
pub use self::idempotency::{
    IdempotencyKey, IdempotencyKeyValidationError, PayloadHash, PayloadHashError,
    canonicalize_and_hash,
};
pub use self::leaderboard::{BoardKey, LeaderboardKind, LeaderboardScope, LeaderboardService};
pub use self::progress::ProgressService;
pub use self::settlement::SettlementService;
pub use self::trace_id::TraceId;
pub use self::unlocks::{UnlockState, UnlockTrees};

/// Convenient API result alias.
///
/// # Examples
/// ```
/// use cogtrain::domain::{ApiResult, Error};
///
/// fn handler() -> ApiResult<u32> {
///     Err(Error::energy_exhausted("no energy left"))
/// }
///
/// assert!(handler().is_err());
/// ```
pub type ApiResult<T> = Result<T, Error>;
