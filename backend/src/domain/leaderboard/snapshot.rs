//! Cached snapshot payloads and their freshness rule.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use utoipa::ToSchema;

use super::board::LeaderboardEntry;
use super::settings::LeaderboardSettings;

/// Settings a snapshot was computed under.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct SnapshotConfig {
    /// Rows kept in the snapshot.
    pub top_n: u32,
    /// Settings version in force when it was computed.
    pub version: u32,
}

impl From<&LeaderboardSettings> for SnapshotConfig {
    fn from(settings: &LeaderboardSettings) -> Self {
        Self {
            top_n: settings.top_n,
            version: settings.version,
        }
    }
}

/// Decoded snapshot body.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SnapshotPayload {
    /// Settings the entries were computed under.
    pub config: SnapshotConfig,
    /// Ranked rows, best first.
    pub entries: Vec<LeaderboardEntry>,
}

/// Snapshot row as stored; the payload stays raw until it is needed.
#[derive(Debug, Clone, PartialEq)]
pub struct StoredSnapshot {
    /// When the snapshot was computed.
    pub computed_at: DateTime<Utc>,
    /// Undecoded [`SnapshotPayload`] JSON.
    pub payload: Value,
}

impl StoredSnapshot {
    /// Encode a freshly computed payload.
    pub fn encode(
        computed_at: DateTime<Utc>,
        payload: &SnapshotPayload,
    ) -> Result<Self, serde_json::Error> {
        Ok(Self {
            computed_at,
            payload: serde_json::to_value(payload)?,
        })
    }

    /// Decode the payload, or `None` when it is unreadable.
    pub fn decode(&self) -> Option<SnapshotPayload> {
        serde_json::from_value(self.payload.clone()).ok()
    }

    /// Fresh iff younger than the TTL, computed under the current settings,
    /// and readable. Returns the decoded payload when fresh.
    pub fn fresh_payload(
        &self,
        settings: &LeaderboardSettings,
        now: DateTime<Utc>,
    ) -> Option<SnapshotPayload> {
        if now - self.computed_at >= settings.ttl {
            return None;
        }
        self.decode()
            .filter(|payload| payload.config == SnapshotConfig::from(settings))
    }
}
