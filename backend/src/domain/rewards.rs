//! Reward formulas: score, experience, currency, bonuses and rank level.
//!
//! Everything here is pure. The settlement transaction supplies the facts it
//! loaded (is this the first session today, was a perfect session already
//! recorded, how many items just unlocked) through [`BonusContext`].

use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use super::game_mode::GameConfig;

/// Experience needed for each rank level, starting at level 1.
pub const RANK_THRESHOLDS: [u64; 7] = [0, 500, 2_500, 10_000, 25_000, 50_000, 80_000];
/// Most currency a single session can earn.
pub const SESSION_CURRENCY_CAP: u64 = 100;
/// Experience for the first session of a UTC day.
pub const DAILY_FIRST_SESSION_BONUS: u64 = 20;
/// Experience for the first perfect session of a UTC day.
pub const DAILY_PERFECT_BONUS: u64 = 50;
/// Experience per newly unlocked item.
pub const UNLOCK_BONUS: u64 = 10;

const BASE_XP: f64 = 20.0;
const DEPTH_STEP: f64 = 0.2;
const LONG_SESSION_ROUNDS: u32 = 20;
const CURRENCY_RATE: f64 = 0.05;

/// Rank level for an experience total.
///
/// # Examples
/// ```
/// use cogtrain::domain::rewards::rank_level;
///
/// assert_eq!(rank_level(499), 1);
/// assert_eq!(rank_level(500), 2);
/// assert_eq!(rank_level(80_000), 7);
/// ```
pub fn rank_level(xp: u64) -> u8 {
    let reached = RANK_THRESHOLDS
        .iter()
        .take_while(|threshold| xp >= **threshold)
        .count();
    u8::try_from(reached.max(1)).unwrap_or(u8::MAX)
}

#[expect(
    clippy::cast_possible_truncation,
    reason = "float-to-int `as` saturates; the value is finite and positive"
)]
fn rounded(value: f64) -> u64 {
    if value.is_finite() && value > 0.0 {
        value.round() as u64
    } else {
        0
    }
}

/// `round(accuracy × depth × rounds / 10)`.
pub fn session_score(accuracy: f64, depth: u32, rounds: u32) -> u64 {
    rounded(accuracy * f64::from(depth) * f64::from(rounds) / 10.0)
}

/// Experience before bonuses.
///
/// Deeper sessions earn 20% more per extra level and sessions of at least
/// twenty rounds earn a flat length bonus.
pub fn base_xp(accuracy: f64, depth: u32, rounds: u32) -> u64 {
    let depth_coeff = 1.0 + f64::from(depth.saturating_sub(1)) * DEPTH_STEP;
    let length_coeff = if rounds >= LONG_SESSION_ROUNDS { 1.5 } else { 1.0 };
    rounded(BASE_XP * (depth_coeff + length_coeff) * accuracy / 100.0)
}

/// Currency for a score, capped per session.
#[expect(
    clippy::cast_precision_loss,
    reason = "scores stay far below 2^53"
)]
pub fn currency_earned(score: u64) -> u64 {
    rounded(score as f64 * CURRENCY_RATE).min(SESSION_CURRENCY_CAP)
}

/// Facts about the account's day that gate the bonuses.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct BonusContext {
    /// No session has been settled today yet.
    pub first_session_today: bool,
    /// A 100% session was already recorded today.
    pub perfect_recorded_today: bool,
    /// Items unlocked by this session.
    pub new_unlocks: usize,
}

/// Bonus experience, by source.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct Bonuses {
    /// First session of the UTC day.
    pub daily_first_session: u64,
    /// First perfect session of the UTC day.
    pub daily_perfect: u64,
    /// Newly unlocked items, per item.
    pub unlocks: u64,
}

impl Bonuses {
    /// Sum of every bonus.
    pub fn total(&self) -> u64 {
        self.daily_first_session + self.daily_perfect + self.unlocks
    }
}

/// Everything a settled session earned.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct RewardBreakdown {
    /// Server-computed score.
    pub score: u64,
    /// Experience before bonuses.
    pub base_xp: u64,
    /// Bonus experience, by source.
    pub bonuses: Bonuses,
    /// Base experience plus bonuses.
    pub xp_earned: u64,
    /// Currency credited, capped per session.
    pub currency_earned: u64,
}

/// Compute the rewards for a session played with `config` at `accuracy`.
pub fn calculate(accuracy: f64, config: &GameConfig, context: BonusContext) -> RewardBreakdown {
    let accuracy = accuracy.clamp(0.0, 100.0);
    let score = session_score(accuracy, config.depth(), config.rounds());
    let base_xp = base_xp(accuracy, config.depth(), config.rounds());
    let perfect = accuracy >= 100.0;

    let bonuses = Bonuses {
        daily_first_session: if context.first_session_today {
            DAILY_FIRST_SESSION_BONUS
        } else {
            0
        },
        daily_perfect: if perfect && !context.perfect_recorded_today {
            DAILY_PERFECT_BONUS
        } else {
            0
        },
        unlocks: UNLOCK_BONUS.saturating_mul(u64::try_from(context.new_unlocks).unwrap_or(u64::MAX)),
    };

    RewardBreakdown {
        score,
        base_xp,
        bonuses,
        xp_earned: base_xp.saturating_add(bonuses.total()),
        currency_earned: currency_earned(score),
    }
}
