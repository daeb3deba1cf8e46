//! Numeric n-back unlock tree.

use serde::Serialize;
use utoipa::ToSchema;

use super::ladder::DepthLadder;
use crate::domain::game_mode::NumericConfig;

/// Deepest numeric n-back level.
pub const NUMERIC_DEPTH_LIMIT: u32 = 12;

/// Unlocked depths and round counts for numeric sessions.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, ToSchema)]
pub struct NumericUnlocks {
    #[serde(flatten)]
    pub(crate) ladder: DepthLadder,
}

impl NumericUnlocks {
    /// Borrow the underlying depth ladder.
    pub fn ladder(&self) -> &DepthLadder {
        &self.ladder
    }

    /// Whether a session with `config` may be played.
    pub fn is_unlocked(&self, config: &NumericConfig) -> bool {
        self.ladder.allows(config.depth, config.rounds)
    }

    /// Progress after a qualifying clear of `config`.
    ///
    /// # Examples
    /// ```
    /// use cogtrain::domain::NumericConfig;
    /// use cogtrain::domain::unlocks::NumericUnlocks;
    ///
    /// let (next, unlocked) = NumericUnlocks::default().advance(&NumericConfig { depth: 1, rounds: 10 });
    /// assert_eq!(next.ladder().max_depth(), 2);
    /// assert!(unlocked.contains(&"numeric:depth:2".to_owned()));
    /// ```
    pub fn advance(&self, config: &NumericConfig) -> (Self, Vec<String>) {
        let (ladder, unlocked) =
            self.ladder
                .advance(config.depth, config.rounds, NUMERIC_DEPTH_LIMIT, "numeric");
        (Self { ladder }, unlocked)
    }
}
