//! Driving port for settling finished sessions.

use async_trait::async_trait;

use crate::domain::settlement::{SessionOutcomePayload, SettlementResponse};
use crate::domain::{AccountId, Error, IdempotencyKey};

/// Request to settle one finished session.
#[derive(Debug, Clone, PartialEq)]
pub struct SettleSessionRequest {
    /// Caller resolved from the session cookie.
    pub account_id: AccountId,
    /// Makes retries replay the first response.
    pub idempotency_key: Option<IdempotencyKey>,
    /// Outcome as submitted by the client.
    pub payload: SessionOutcomePayload,
}

/// Driving port for the settlement transaction.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait SessionSettlementCommand: Send + Sync {
    /// Validate, gate, price and persist a finished session.
    ///
    /// Refusals surface as `energy_exhausted`, `config_locked`,
    /// `account_not_found` or `conflict` errors; unknown modes as
    /// `invalid_request`.
    async fn settle(&self, request: SettleSessionRequest) -> Result<SettlementResponse, Error>;
}

/// Fixture command for handler tests that do not settle anything.
#[derive(Debug, Default, Clone, Copy)]
pub struct FixtureSessionSettlementCommand;

#[async_trait]
impl SessionSettlementCommand for FixtureSessionSettlementCommand {
    async fn settle(&self, request: SettleSessionRequest) -> Result<SettlementResponse, Error> {
        Err(Error::account_not_found(format!(
            "account {} not found",
            request.account_id
        )))
    }
}
