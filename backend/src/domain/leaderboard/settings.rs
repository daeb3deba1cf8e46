//! Leaderboard feature flags, read from the externally owned config table.

use std::collections::BTreeMap;

use chrono::Duration;
use serde_json::Value;

/// Key prefix shared by every leaderboard flag.
pub const SETTINGS_PREFIX: &str = "leaderboard.";

const ENABLED: &str = "leaderboard.enabled";
const TOP_N: &str = "leaderboard.top_n";
const TTL_SECONDS: &str = "leaderboard.ttl_seconds";
const VERSION: &str = "leaderboard.version";
const WEEKLY_ENABLED: &str = "leaderboard.weekly_enabled";

const DEFAULT_TOP_N: u32 = 50;
const MAX_TOP_N: u32 = 500;
const DEFAULT_TTL_SECONDS: i64 = 60;

/// Effective leaderboard settings for one request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LeaderboardSettings {
    /// Off means every leaderboard read is `service_unavailable`.
    pub enabled: bool,
    /// Rows kept per snapshot.
    pub top_n: u32,
    /// Age after which a snapshot is recomputed.
    pub ttl: Duration,
    /// Bumped by operators to invalidate every cached snapshot.
    pub version: u32,
    /// Off means weekly boards are rejected.
    pub weekly_enabled: bool,
}

impl Default for LeaderboardSettings {
    fn default() -> Self {
        Self {
            enabled: true,
            top_n: DEFAULT_TOP_N,
            ttl: Duration::seconds(DEFAULT_TTL_SECONDS),
            version: 1,
            weekly_enabled: true,
        }
    }
}

fn flag(value: &Value) -> Option<bool> {
    match value {
        Value::Bool(flag) => Some(*flag),
        Value::Number(number) => number.as_i64().map(|raw| raw != 0),
        Value::String(raw) => match raw.trim().to_ascii_lowercase().as_str() {
            "true" | "1" | "yes" | "on" => Some(true),
            "false" | "0" | "no" | "off" => Some(false),
            _ => None,
        },
        _ => None,
    }
}

fn integer(value: &Value) -> Option<i64> {
    match value {
        Value::Number(number) => number.as_i64(),
        Value::String(raw) => raw.trim().parse().ok(),
        _ => None,
    }
}

impl LeaderboardSettings {
    /// Build settings from raw config rows.
    ///
    /// Missing or unreadable values keep their defaults; `top_n` is clamped
    /// to `1..=500`, a negative TTL counts as zero and a TTL too large for
    /// [`Duration`] keeps the default.
    ///
    /// # Examples
    /// ```
    /// use std::collections::BTreeMap;
    /// use cogtrain::domain::leaderboard::LeaderboardSettings;
    /// use serde_json::json;
    ///
    /// let rows = BTreeMap::from([
    ///     ("leaderboard.top_n".to_owned(), json!("10")),
    ///     ("leaderboard.enabled".to_owned(), json!(false)),
    /// ]);
    /// let settings = LeaderboardSettings::from_entries(&rows);
    /// assert_eq!(settings.top_n, 10);
    /// assert!(!settings.enabled);
    /// ```
    pub fn from_entries(entries: &BTreeMap<String, Value>) -> Self {
        let defaults = Self::default();
        let read_flag = |key: &str, fallback: bool| entries.get(key).and_then(flag).unwrap_or(fallback);
        let read_int = |key: &str| entries.get(key).and_then(integer);

        Self {
            enabled: read_flag(ENABLED, defaults.enabled),
            top_n: read_int(TOP_N)
                .map(|raw| raw.clamp(1, i64::from(MAX_TOP_N)))
                .and_then(|raw| u32::try_from(raw).ok())
                .unwrap_or(defaults.top_n),
            ttl: read_int(TTL_SECONDS)
                .and_then(|raw| Duration::try_seconds(raw.max(0)))
                .unwrap_or(defaults.ttl),
            version: read_int(VERSION)
                .and_then(|raw| u32::try_from(raw).ok())
                .unwrap_or(defaults.version),
            weekly_enabled: read_flag(WEEKLY_ENABLED, defaults.weekly_enabled),
        }
    }
}
