//! Per-mode unlock trees.
//!
//! Each tree answers two pure questions: may this configuration be played
//! (`is_unlocked`), and what opens after a qualifying clear (`advance`). No
//! field ever shrinks across `advance`, and anything `advance` reports as
//! unlocked passes `is_unlocked` against the returned state.

mod house;
mod ladder;
mod mouse;
mod normalize;
mod numeric;
mod spatial;

pub use house::{
    HOUSE_EVENT_COUNT, HOUSE_EVENT_STEP, HOUSE_INITIAL_COUNT, HOUSE_ROUNDS, HouseUnlocks,
};
pub use ladder::{
    BREAKTHROUGH_ROUNDS, DepthLadder, MAX_ROUNDS, ROUND_STEP, breakthrough_rounds,
    min_rounds_for, seeded_rounds,
};
pub use mouse::{MOUSE_ROUNDS, MOUSE_TARGETS, MouseUnlocks};
pub use normalize::normalize_unlock_state;
pub use numeric::{NUMERIC_DEPTH_LIMIT, NumericUnlocks};
pub use spatial::{GRID_DEPTH_LIMITS, SpatialUnlocks, grid_depth_limit};

use serde::de::Error as _;
use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;
use utoipa::ToSchema;

use super::game_mode::{GameConfig, GameMode};

/// Minimum accuracy (percent) for a clear to advance unlock trees.
pub const QUALIFYING_ACCURACY: f64 = 90.0;

/// Unlock state of one mode, tagged by mode.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, ToSchema)]
#[serde(tag = "mode", rename_all = "lowercase")]
pub enum UnlockState {
    /// Numeric n-back tree.
    Numeric(NumericUnlocks),
    /// Spatial n-back tree.
    Spatial(SpatialUnlocks),
    /// Mouse tracking tree.
    Mouse(MouseUnlocks),
    /// House counting tree.
    House(HouseUnlocks),
}

impl UnlockState {
    /// Minimum defaults for a mode never played before.
    pub fn default_for(mode: GameMode) -> Self {
        match mode {
            GameMode::Numeric => Self::Numeric(NumericUnlocks::default()),
            GameMode::Spatial => Self::Spatial(SpatialUnlocks::default()),
            GameMode::Mouse => Self::Mouse(MouseUnlocks::default()),
            GameMode::House => Self::House(HouseUnlocks::default()),
        }
    }

    /// Mode this state belongs to.
    pub fn mode(&self) -> GameMode {
        match self {
            Self::Numeric(_) => GameMode::Numeric,
            Self::Spatial(_) => GameMode::Spatial,
            Self::Mouse(_) => GameMode::Mouse,
            Self::House(_) => GameMode::House,
        }
    }

    /// Gate a session configuration. A configuration for another mode is
    /// never unlocked.
    pub fn is_unlocked(&self, config: &GameConfig) -> bool {
        match (self, config) {
            (Self::Numeric(state), GameConfig::Numeric(played)) => state.is_unlocked(played),
            (Self::Spatial(state), GameConfig::Spatial(played)) => state.is_unlocked(played),
            (Self::Mouse(state), GameConfig::Mouse(played)) => state.is_unlocked(played),
            (Self::House(state), GameConfig::House(played)) => state.is_unlocked(played),
            _ => false,
        }
    }

    /// Progress after a qualifying clear of `config`.
    ///
    /// Returns the next state and the ids of everything newly unlocked. A
    /// configuration for another mode leaves the state unchanged.
    pub fn advance(&self, config: &GameConfig) -> (Self, Vec<String>) {
        match (self, config) {
            (Self::Numeric(state), GameConfig::Numeric(played)) => {
                let (next, ids) = state.advance(played);
                (Self::Numeric(next), ids)
            }
            (Self::Spatial(state), GameConfig::Spatial(played)) => {
                let (next, ids) = state.advance(played);
                (Self::Spatial(next), ids)
            }
            (Self::Mouse(state), GameConfig::Mouse(played)) => {
                let (next, ids) = state.advance(played);
                (Self::Mouse(next), ids)
            }
            (Self::House(state), GameConfig::House(played)) => {
                let (next, ids) = state.advance(played);
                (Self::House(next), ids)
            }
            _ => (self.clone(), Vec::new()),
        }
    }

    /// Canonical storage document, without the mode tag.
    pub fn to_document(&self) -> Result<Value, serde_json::Error> {
        match self {
            Self::Numeric(state) => serde_json::to_value(state),
            Self::Spatial(state) => serde_json::to_value(state),
            Self::Mouse(state) => serde_json::to_value(state),
            Self::House(state) => serde_json::to_value(state),
        }
    }
}

/// Tagged documents decode through [`normalize_unlock_state`], so replayed
/// or hand-edited snapshots get the same repair as stored rows.
impl<'de> Deserialize<'de> for UnlockState {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let document = Value::deserialize(deserializer)?;
        let mode = document
            .get("mode")
            .and_then(Value::as_str)
            .ok_or_else(|| D::Error::missing_field("mode"))?
            .parse::<GameMode>()
            .map_err(D::Error::custom)?;
        Ok(normalize_unlock_state(mode, Some(&document)))
    }
}

/// Unlock trees for every mode, as shown on the progress screen.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct UnlockTrees {
    /// Numeric n-back tree.
    pub numeric: NumericUnlocks,
    /// Spatial n-back tree.
    pub spatial: SpatialUnlocks,
    /// Mouse tracking tree.
    pub mouse: MouseUnlocks,
    /// House counting tree.
    pub house: HouseUnlocks,
}

impl UnlockTrees {
    /// Collect per-mode states; missing modes keep their defaults.
    pub fn from_states(states: impl IntoIterator<Item = UnlockState>) -> Self {
        let mut trees = Self::default();
        for state in states {
            match state {
                UnlockState::Numeric(value) => trees.numeric = value,
                UnlockState::Spatial(value) => trees.spatial = value,
                UnlockState::Mouse(value) => trees.mouse = value,
                UnlockState::House(value) => trees.house = value,
            }
        }
        trees
    }
}
