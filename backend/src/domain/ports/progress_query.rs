//! Driving port for the progress screen.

use async_trait::async_trait;
use serde::Serialize;
use utoipa::ToSchema;

use crate::domain::unlocks::UnlockTrees;
use crate::domain::{AccountId, EnergyReading, Error};

/// Everything the progress screen shows for one account.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct ProgressView {
    /// Signed-in account.
    #[schema(value_type = String)]
    pub account_id: AccountId,
    /// Name shown on leaderboards.
    pub display_name: String,
    /// Lifetime experience.
    pub xp: u64,
    /// Derived from `xp` on every read.
    pub rank_level: u8,
    /// Currency balance.
    pub currency: u64,
    /// Recovered to the read time; nothing is written back.
    pub energy: EnergyReading,
    /// Unlock trees for all four modes.
    pub unlocks: UnlockTrees,
}

/// Driving port for progress reads.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait ProgressQuery: Send + Sync {
    /// Read the caller's progression.
    async fn progress(&self, account_id: &AccountId) -> Result<ProgressView, Error>;
}

/// Fixture query that knows no accounts.
#[derive(Debug, Default, Clone, Copy)]
pub struct FixtureProgressQuery;

#[async_trait]
impl ProgressQuery for FixtureProgressQuery {
    async fn progress(&self, account_id: &AccountId) -> Result<ProgressView, Error> {
        Err(Error::account_not_found(format!(
            "account {account_id} not found"
        )))
    }
}
