//! Mouse-chase unlock tree.

use serde::Serialize;
use utoipa::ToSchema;

use crate::domain::game_mode::{MouseConfig, MouseDifficulty};

/// Starting and maximum simultaneous targets.
pub const MOUSE_TARGETS: (u32, u32) = (3, 9);
/// Starting and maximum rounds.
pub const MOUSE_ROUNDS: (u32, u32) = (3, 5);

/// Unlocked difficulty tier and target/round caps.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct MouseUnlocks {
    pub(crate) max_difficulty: MouseDifficulty,
    pub(crate) max_targets: u32,
    pub(crate) max_rounds: u32,
}

impl Default for MouseUnlocks {
    fn default() -> Self {
        Self {
            max_difficulty: MouseDifficulty::Easy,
            max_targets: MOUSE_TARGETS.0,
            max_rounds: MOUSE_ROUNDS.0,
        }
    }
}

impl MouseUnlocks {
    /// Highest unlocked difficulty.
    pub fn max_difficulty(&self) -> MouseDifficulty {
        self.max_difficulty
    }

    /// Most simultaneous targets allowed.
    pub fn max_targets(&self) -> u32 {
        self.max_targets
    }

    /// Most rounds allowed.
    pub fn max_rounds(&self) -> u32 {
        self.max_rounds
    }

    /// Whether a session with `config` may be played.
    pub fn is_unlocked(&self, config: &MouseConfig) -> bool {
        config.difficulty <= self.max_difficulty
            && (1..=self.max_targets).contains(&config.targets)
            && (1..=self.max_rounds).contains(&config.rounds)
    }

    /// Progress after a qualifying clear of `config`.
    ///
    /// A tier opens only when the highest unlocked tier was played; the
    /// target cap grows only when cleared at the cap; the round cap grows on
    /// every qualifying clear.
    pub fn advance(&self, config: &MouseConfig) -> (Self, Vec<String>) {
        let mut next = self.clone();
        let mut unlocked = Vec::new();

        if config.difficulty == self.max_difficulty {
            if let Some(tier) = self.max_difficulty.next() {
                next.max_difficulty = tier;
                unlocked.push(format!("mouse:difficulty:{tier}"));
            }
        }
        if config.targets == self.max_targets && self.max_targets < MOUSE_TARGETS.1 {
            next.max_targets += 1;
            unlocked.push(format!("mouse:targets:{}", next.max_targets));
        }
        if self.max_rounds < MOUSE_ROUNDS.1 {
            next.max_rounds += 1;
            unlocked.push(format!("mouse:rounds:{}", next.max_rounds));
        }

        (next, unlocked)
    }
}
