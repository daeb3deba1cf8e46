//! Port for the transactional settlement unit of work.
//!
//! One call is one transaction: lock the account, load a
//! [`SettlementSnapshot`](crate::domain::settlement::SettlementSnapshot), run
//! [`decide`](crate::domain::settlement::decide) and persist the resulting
//! plan. Same-account calls must serialise.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use uuid::Uuid;

use crate::domain::settlement::{SessionOutcome, SettlementRejection, SettlementResponse};
use crate::domain::{AccountId, EnergyPolicy, IdempotencyKey, PayloadHash};

use super::define_port_error;

define_port_error! {
    /// Errors raised by settlement repository adapters.
    pub enum SettlementRepositoryError {
        /// Repository connection could not be established.
        Connection { message: String } =>
            "settlement repository connection failed: {message}",
        /// Query or mutation failed during execution.
        Query { message: String } =>
            "settlement repository query failed: {message}",
    }
}

/// Idempotency key and payload fingerprint attached to an attempt.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IdempotencyClaim {
    /// Client-supplied key.
    pub key: IdempotencyKey,
    /// Fingerprint of the canonical request body.
    pub payload_hash: PayloadHash,
}

/// A validated session ready to be settled.
#[derive(Debug, Clone, PartialEq)]
pub struct SettlementAttempt {
    /// Identifier assigned to the session record if it commits.
    pub session_id: Uuid,
    /// Account being settled.
    pub account_id: AccountId,
    /// Validated outcome.
    pub outcome: SessionOutcome,
    /// Present when the client sent an idempotency key.
    pub idempotency: Option<IdempotencyClaim>,
}

/// Terminal state of one settlement transaction.
#[derive(Debug, Clone, PartialEq)]
pub enum SettlementResult {
    /// Committed now.
    Settled(SettlementResponse),
    /// Stored response for a repeated key and payload.
    Replayed(SettlementResponse),
    /// Refused; nothing was written.
    Rejected(SettlementRejection),
    /// No row for the account.
    AccountNotFound,
    /// Key already used for a different payload.
    IdempotencyConflict,
}

/// Port that runs the settlement transaction.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait SettlementRepository: Send + Sync {
    /// Settle `attempt` atomically at `now`; business refusals roll back and
    /// are reported as [`SettlementResult`] variants rather than errors.
    async fn settle(
        &self,
        attempt: &SettlementAttempt,
        policy: &EnergyPolicy,
        now: DateTime<Utc>,
    ) -> Result<SettlementResult, SettlementRepositoryError>;
}

/// Fixture implementation for tests that never reach storage.
#[derive(Debug, Default, Clone, Copy)]
pub struct FixtureSettlementRepository;

#[async_trait]
impl SettlementRepository for FixtureSettlementRepository {
    async fn settle(
        &self,
        _attempt: &SettlementAttempt,
        _policy: &EnergyPolicy,
        _now: DateTime<Utc>,
    ) -> Result<SettlementResult, SettlementRepositoryError> {
        Ok(SettlementResult::AccountNotFound)
    }
}
