//! Port for reading an account's progression state without locking it.

use async_trait::async_trait;

use crate::domain::{AccountAggregate, AccountId, UnlockState};

use super::define_port_error;

define_port_error! {
    /// Errors raised by progress repository adapters.
    pub enum ProgressRepositoryError {
        /// Repository connection could not be established.
        Connection { message: String } =>
            "progress repository connection failed: {message}",
        /// Query failed during execution.
        Query { message: String } =>
            "progress repository query failed: {message}",
    }
}

/// Account row plus every stored unlock state, already normalised.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AccountProgress {
    /// Stored account row.
    pub account: AccountAggregate,
    /// Modes never played are absent.
    pub unlocks: Vec<UnlockState>,
}

/// Read-only access to progression state.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait ProgressRepository: Send + Sync {
    /// Load the account and its unlock states, or `None` for unknown ids.
    async fn load_progress(
        &self,
        account_id: &AccountId,
    ) -> Result<Option<AccountProgress>, ProgressRepositoryError>;
}

/// Fixture implementation that knows no accounts.
#[derive(Debug, Default, Clone, Copy)]
pub struct FixtureProgressRepository;

#[async_trait]
impl ProgressRepository for FixtureProgressRepository {
    async fn load_progress(
        &self,
        _account_id: &AccountId,
    ) -> Result<Option<AccountProgress>, ProgressRepositoryError> {
        Ok(None)
    }
}
