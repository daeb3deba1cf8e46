//! What a settled session reports back, and what a receipt replays.

use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use uuid::Uuid;

use crate::domain::energy::EnergyReading;
use crate::domain::game_mode::GameMode;
use crate::domain::idempotency::PayloadHash;
use crate::domain::rewards::RewardBreakdown;
use crate::domain::unlocks::UnlockState;

/// Result of settling one session.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct SettlementResponse {
    /// Identifier of the session record.
    pub session_id: Uuid,
    /// Mode that was played.
    pub mode: GameMode,
    /// What the session earned.
    pub rewards: RewardBreakdown,
    /// Experience total after this session.
    pub xp: u64,
    /// Rank level derived from `xp`.
    pub rank_level: u8,
    /// Currency balance after this session.
    pub currency: u64,
    /// Energy after the session, recovered to settlement time.
    pub energy: EnergyReading,
    /// True when the spent unit was returned because something unlocked.
    pub energy_refunded: bool,
    /// Unlock tree for the played mode after this session.
    pub unlocks: UnlockState,
    /// Ids unlocked by this session, such as `numeric:depth:2`.
    pub newly_unlocked: Vec<String>,
    /// True when this response was replayed from an idempotency receipt.
    #[serde(default)]
    pub replayed: bool,
}

impl SettlementResponse {
    /// Mark the response as served from a receipt.
    pub fn into_replay(mut self) -> Self {
        self.replayed = true;
        self
    }
}

/// Stored receipt for an idempotency key.
#[derive(Debug, Clone, PartialEq)]
pub struct StoredReceipt {
    /// Fingerprint of the request that produced the response.
    pub payload_hash: PayloadHash,
    /// Response to replay.
    pub response: SettlementResponse,
}
