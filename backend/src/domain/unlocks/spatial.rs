//! Spatial n-back unlock tree: one depth ladder per grid size.

use std::collections::BTreeMap;

use serde::Serialize;
use utoipa::ToSchema;

use super::ladder::DepthLadder;
use crate::domain::game_mode::SpatialConfig;

/// Grid sizes in unlock order with their depth limits.
pub const GRID_DEPTH_LIMITS: [(u32, u32); 3] = [(3, 5), (4, 12), (5, 12)];

/// Depth a grid must be cleared at to open the next grid size.
const GRID_GATES: [(u32, u32, u32); 2] = [(3, 3, 4), (4, 4, 5)];

/// Depth limit for a grid size, if the size exists.
pub fn grid_depth_limit(grid_size: u32) -> Option<u32> {
    GRID_DEPTH_LIMITS
        .iter()
        .find(|(size, _)| *size == grid_size)
        .map(|(_, limit)| *limit)
}

/// Unlocked grid sizes and their per-grid ladders.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct SpatialUnlocks {
    #[schema(value_type = Object)]
    pub(crate) grids: BTreeMap<u32, DepthLadder>,
}

impl Default for SpatialUnlocks {
    fn default() -> Self {
        Self {
            grids: BTreeMap::from([(3, DepthLadder::default())]),
        }
    }
}

impl SpatialUnlocks {
    /// Ladder for an unlocked grid size.
    pub fn grid(&self, grid_size: u32) -> Option<&DepthLadder> {
        self.grids.get(&grid_size)
    }

    /// Unlocked grid sizes in ascending order.
    pub fn unlocked_grids(&self) -> impl Iterator<Item = u32> + '_ {
        self.grids.keys().copied()
    }

    /// Whether a session with `config` may be played.
    pub fn is_unlocked(&self, config: &SpatialConfig) -> bool {
        self.grids
            .get(&config.grid_size)
            .is_some_and(|ladder| ladder.allows(config.depth, config.rounds))
    }

    /// Progress after a qualifying clear of `config`.
    pub fn advance(&self, config: &SpatialConfig) -> (Self, Vec<String>) {
        let mut next = self.clone();
        let mut unlocked = Vec::new();
        let (Some(limit), Some(ladder)) = (
            grid_depth_limit(config.grid_size),
            self.grids.get(&config.grid_size),
        ) else {
            return (next, unlocked);
        };

        let prefix = format!("spatial:grid:{}", config.grid_size);
        let (advanced, ids) = ladder.advance(config.depth, config.rounds, limit, &prefix);
        next.grids.insert(config.grid_size, advanced);
        unlocked.extend(ids);

        for (from, required_depth, opened) in GRID_GATES {
            if config.grid_size == from
                && config.depth >= required_depth
                && !next.grids.contains_key(&opened)
            {
                next.grids.insert(opened, DepthLadder::default());
                unlocked.push(format!("spatial:grid:{opened}"));
            }
        }

        (next, unlocked)
    }
}
