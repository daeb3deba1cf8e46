//! Leaderboard identity, entries and ordering.

use std::cmp::Ordering;
use std::fmt;
use std::ops::RangeInclusive;
use std::str::FromStr;

use chrono::{DateTime, Days, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use crate::domain::account::AccountId;
use crate::domain::rewards::rank_level;

/// Metric a board ranks by.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "lowercase")]
pub enum LeaderboardKind {
    /// Currency balance.
    Currency,
    /// Lifetime experience, shown as rank level.
    Rank,
}

/// Time window a board covers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "kebab-case")]
pub enum LeaderboardScope {
    /// Lifetime totals.
    #[default]
    AllTime,
    /// Rolling seven UTC days, today included.
    Weekly,
}

impl LeaderboardKind {
    /// Path segment and storage name of the kind.
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Currency => "currency",
            Self::Rank => "rank",
        }
    }
}

impl LeaderboardScope {
    /// Query value and storage name of the scope.
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::AllTime => "all-time",
            Self::Weekly => "weekly",
        }
    }
}

impl fmt::Display for LeaderboardKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl fmt::Display for LeaderboardScope {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Raised for unknown kinds, scopes or unsupported combinations.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum BoardKeyError {
    /// Kind name not recognised.
    #[error("unknown leaderboard kind: {0}")]
    UnknownKind(String),
    /// Scope name not recognised.
    #[error("unknown leaderboard scope: {0}")]
    UnknownScope(String),
    /// Known kind and scope that cannot be combined.
    #[error("the {kind} leaderboard has no {scope} scope")]
    UnsupportedScope {
        /// Requested kind.
        kind: LeaderboardKind,
        /// Scope the kind does not offer.
        scope: LeaderboardScope,
    },
}

impl FromStr for LeaderboardKind {
    type Err = BoardKeyError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "currency" | "coins" => Ok(Self::Currency),
            "rank" | "xp" => Ok(Self::Rank),
            _ => Err(BoardKeyError::UnknownKind(s.to_owned())),
        }
    }
}

impl FromStr for LeaderboardScope {
    type Err = BoardKeyError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "all-time" | "all_time" | "alltime" => Ok(Self::AllTime),
            "weekly" | "week" => Ok(Self::Weekly),
            _ => Err(BoardKeyError::UnknownScope(s.to_owned())),
        }
    }
}

/// Days in the weekly window, today included.
pub const WEEKLY_WINDOW_DAYS: u64 = 7;

/// UTC days the weekly board covers at `now`: the last seven, today included.
pub fn weekly_window(now: DateTime<Utc>) -> RangeInclusive<NaiveDate> {
    let today = now.date_naive();
    let first = today
        .checked_sub_days(Days::new(WEEKLY_WINDOW_DAYS - 1))
        .unwrap_or(NaiveDate::MIN);
    first..=today
}

/// A supported `(kind, scope)` pair; doubles as the snapshot cache key.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct BoardKey {
    kind: LeaderboardKind,
    scope: LeaderboardScope,
}

impl BoardKey {
    /// Validate a pair. Currency boards are all-time only.
    ///
    /// # Examples
    /// ```
    /// use cogtrain::domain::leaderboard::{BoardKey, LeaderboardKind, LeaderboardScope};
    ///
    /// let key = BoardKey::new(LeaderboardKind::Rank, LeaderboardScope::Weekly).expect("supported");
    /// assert_eq!(key.cache_key(), "rank:weekly");
    /// assert!(BoardKey::new(LeaderboardKind::Currency, LeaderboardScope::Weekly).is_err());
    /// ```
    pub fn new(kind: LeaderboardKind, scope: LeaderboardScope) -> Result<Self, BoardKeyError> {
        match (kind, scope) {
            (LeaderboardKind::Currency, LeaderboardScope::Weekly) => {
                Err(BoardKeyError::UnsupportedScope { kind, scope })
            }
            _ => Ok(Self { kind, scope }),
        }
    }

    /// Parse raw path and query values; a missing scope means all-time.
    pub fn parse(kind: &str, scope: Option<&str>) -> Result<Self, BoardKeyError> {
        let scope = scope.map_or(Ok(LeaderboardScope::AllTime), str::parse::<LeaderboardScope>)?;
        Self::new(kind.parse()?, scope)
    }

    /// Board kind.
    pub fn kind(&self) -> LeaderboardKind {
        self.kind
    }

    /// Board scope.
    pub fn scope(&self) -> LeaderboardScope {
        self.scope
    }

    /// Stable `kind:scope` string used for storage and locking.
    pub fn cache_key(&self) -> String {
        format!("{}:{}", self.kind, self.scope)
    }
}

/// One ranked row as cached in a snapshot.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct LeaderboardEntry {
    /// 1-based rank on the board.
    pub position: u32,
    /// Ranked account.
    #[schema(value_type = String)]
    pub account_id: AccountId,
    /// Name shown for the account.
    pub display_name: String,
    /// Rank level derived from `xp`.
    pub rank_level: u8,
    /// Lifetime experience.
    pub xp: u64,
    /// Currency balance.
    pub currency: u64,
    /// Experience earned in the weekly window; weekly boards only.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub weekly_xp: Option<u64>,
    /// Sessions played in the weekly window; weekly boards only.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub weekly_sessions: Option<u32>,
}

/// Ranking inputs for one account.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Standing {
    /// Account being ranked.
    pub account_id: AccountId,
    /// Name shown for the account.
    pub display_name: String,
    /// Lifetime experience.
    pub xp: u64,
    /// Currency balance.
    pub currency: u64,
    /// Experience earned in the weekly window.
    pub weekly_xp: u64,
    /// Sessions played in the weekly window.
    pub weekly_sessions: u32,
}

impl Standing {
    /// Whether the account appears on `key`'s board at all. Weekly boards
    /// only list accounts with activity inside the window.
    pub fn is_ranked_on(&self, key: BoardKey) -> bool {
        key.scope != LeaderboardScope::Weekly || self.weekly_sessions > 0
    }

    /// Materialise as an entry at `position`.
    pub fn to_entry(&self, key: BoardKey, position: u32) -> LeaderboardEntry {
        let weekly = key.scope == LeaderboardScope::Weekly;
        LeaderboardEntry {
            position,
            account_id: self.account_id.clone(),
            display_name: self.display_name.clone(),
            rank_level: rank_level(self.xp),
            xp: self.xp,
            currency: self.currency,
            weekly_xp: weekly.then_some(self.weekly_xp),
            weekly_sessions: weekly.then_some(self.weekly_sessions),
        }
    }
}

/// Total order for `key`'s board: `Less` means `a` ranks above `b`.
///
/// Currency boards order by currency, then xp; all-time rank boards by xp,
/// then currency; weekly boards by weekly xp, then weekly sessions. Account
/// id breaks every remaining tie.
pub fn compare_standings(key: BoardKey, a: &Standing, b: &Standing) -> Ordering {
    let primary = match (key.kind, key.scope) {
        (LeaderboardKind::Currency, _) => b
            .currency
            .cmp(&a.currency)
            .then_with(|| b.xp.cmp(&a.xp)),
        (LeaderboardKind::Rank, LeaderboardScope::AllTime) => b
            .xp
            .cmp(&a.xp)
            .then_with(|| b.currency.cmp(&a.currency)),
        (LeaderboardKind::Rank, LeaderboardScope::Weekly) => b
            .weekly_xp
            .cmp(&a.weekly_xp)
            .then_with(|| b.weekly_sessions.cmp(&a.weekly_sessions)),
    };
    primary.then_with(|| a.account_id.as_uuid().cmp(b.account_id.as_uuid()))
}

/// Order standings for `key` and keep the first `top_n`.
pub fn rank_standings(key: BoardKey, standings: &[Standing], top_n: u32) -> Vec<LeaderboardEntry> {
    let mut ranked: Vec<&Standing> = standings
        .iter()
        .filter(|standing| standing.is_ranked_on(key))
        .collect();
    ranked.sort_by(|a, b| compare_standings(key, a, b));
    ranked
        .into_iter()
        .zip(1_u32..)
        .take(usize::try_from(top_n).unwrap_or(usize::MAX))
        .map(|(standing, position)| standing.to_entry(key, position))
        .collect()
}

/// Position of `viewer` on `key`'s board: one plus everyone ranked above.
///
/// Returns `None` when the viewer is not on the board.
pub fn viewer_position(key: BoardKey, standings: &[Standing], viewer: &Standing) -> Option<u32> {
    if !viewer.is_ranked_on(key) {
        return None;
    }
    let ahead = standings
        .iter()
        .filter(|other| other.is_ranked_on(key))
        .filter(|other| compare_standings(key, other, viewer) == Ordering::Less)
        .count();
    Some(u32::try_from(ahead).unwrap_or(u32::MAX).saturating_add(1))
}
