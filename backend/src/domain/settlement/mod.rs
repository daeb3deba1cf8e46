//! Session settlement: validate, load, check energy, gate, price, persist.
//!
//! [`SettlementService`] owns the steps that need no storage (validation,
//! payload fingerprinting, error mapping). The locked load and the writes
//! happen in one [`SettlementRepository`] call, which delegates the business
//! decision back to [`decide`].

mod input;
mod plan;
mod response;

pub use input::{
    OutcomeCounts, SessionConfigPayload, SessionOutcome, SessionOutcomePayload,
    SessionValidationError,
};
pub use plan::{
    SessionRecord, SettlementDecision, SettlementPlan, SettlementRejection, SettlementSnapshot,
    decide, plan_settlement,
};
pub use response::{SettlementResponse, StoredReceipt};

use std::sync::Arc;

use async_trait::async_trait;
use mockable::Clock;
use tracing::{info, warn};
use uuid::Uuid;

use crate::domain::ports::{
    IdempotencyClaim, SessionSettlementCommand, SettleSessionRequest, SettlementAttempt,
    SettlementRepository, SettlementRepositoryError, SettlementResult,
};
use crate::domain::rewards::session_score;
use crate::domain::{EnergyPolicy, Error, PayloadHash, canonicalize_and_hash};

fn map_repository_error(error: SettlementRepositoryError) -> Error {
    match error {
        SettlementRepositoryError::Connection { message } => {
            Error::service_unavailable(format!("settlement repository unavailable: {message}"))
        }
        SettlementRepositoryError::Query { message } => {
            Error::internal(format!("settlement repository error: {message}"))
        }
    }
}

fn hash_payload(payload: &SessionOutcomePayload) -> Result<PayloadHash, Error> {
    let value = serde_json::to_value(payload).map_err(|err| {
        Error::internal(format!("failed to serialize settlement payload: {err}"))
    })?;
    canonicalize_and_hash(&value)
        .map_err(|err| Error::internal(format!("failed to hash settlement payload: {err}")))
}

/// Settlement service implementing the settlement driving port.
#[derive(Clone)]
pub struct SettlementService<R> {
    settlement_repo: Arc<R>,
    policy: EnergyPolicy,
    clock: Arc<dyn Clock>,
}

impl<R> SettlementService<R> {
    /// Create a service over a settlement repository.
    pub fn new(settlement_repo: Arc<R>, policy: EnergyPolicy, clock: Arc<dyn Clock>) -> Self {
        Self {
            settlement_repo,
            policy,
            clock,
        }
    }
}

#[async_trait]
impl<R> SessionSettlementCommand for SettlementService<R>
where
    R: SettlementRepository,
{
    async fn settle(&self, request: SettleSessionRequest) -> Result<SettlementResponse, Error> {
        let outcome = request
            .payload
            .validate()
            .map_err(|err| Error::invalid_request(format!("invalid session outcome: {err}")))?;

        if let Some(reported) = outcome.reported_score {
            let computed = session_score(
                outcome.accuracy,
                outcome.config.depth(),
                outcome.config.rounds(),
            );
            if (reported - computed as f64).abs() >= 1.0 {
                warn!(
                    account_id = %request.account_id,
                    reported,
                    computed,
                    "reported score diverges from recomputed score"
                );
            }
        }

        let idempotency = match request.idempotency_key {
            Some(key) => Some(IdempotencyClaim {
                key,
                payload_hash: hash_payload(&request.payload)?,
            }),
            None => None,
        };

        let attempt = SettlementAttempt {
            session_id: Uuid::new_v4(),
            account_id: request.account_id,
            outcome,
            idempotency,
        };

        let result = self
            .settlement_repo
            .settle(&attempt, &self.policy, self.clock.utc())
            .await
            .map_err(map_repository_error)?;

        match result {
            SettlementResult::Settled(response) => {
                info!(
                    account_id = %attempt.account_id,
                    session_id = %response.session_id,
                    mode = %response.mode,
                    xp_earned = response.rewards.xp_earned,
                    unlocked = response.newly_unlocked.len(),
                    "session settled"
                );
                Ok(response)
            }
            SettlementResult::Replayed(response) => Ok(response.into_replay()),
            SettlementResult::Rejected(SettlementRejection::EnergyExhausted) => Err(
                Error::energy_exhausted("no energy left; wait for recovery before playing"),
            ),
            SettlementResult::Rejected(SettlementRejection::ConfigLocked) => Err(
                Error::config_locked("this session configuration has not been unlocked"),
            ),
            SettlementResult::AccountNotFound => Err(Error::account_not_found(format!(
                "account {} not found",
                attempt.account_id
            ))),
            SettlementResult::IdempotencyConflict => Err(Error::conflict(
                "idempotency key was already used for a different session",
            )),
        }
    }
}
