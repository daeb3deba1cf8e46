//! House-counting unlock tree.

use serde::Serialize;
use utoipa::ToSchema;

use crate::domain::game_mode::{HouseConfig, HouseSpeed};

/// Starting and maximum initial occupants.
pub const HOUSE_INITIAL_COUNT: (u32, u32) = (3, 7);
/// Starting and maximum enter/leave events.
pub const HOUSE_EVENT_COUNT: (u32, u32) = (12, 24);
/// Event cap growth per qualifying clear at the cap.
pub const HOUSE_EVENT_STEP: u32 = 3;
/// Starting and maximum rounds.
pub const HOUSE_ROUNDS: (u32, u32) = (3, 5);

/// Unlocked speed tier and count/round caps.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct HouseUnlocks {
    pub(crate) max_speed: HouseSpeed,
    pub(crate) max_initial_count: u32,
    pub(crate) max_event_count: u32,
    pub(crate) max_rounds: u32,
}

impl Default for HouseUnlocks {
    fn default() -> Self {
        Self {
            max_speed: HouseSpeed::Easy,
            max_initial_count: HOUSE_INITIAL_COUNT.0,
            max_event_count: HOUSE_EVENT_COUNT.0,
            max_rounds: HOUSE_ROUNDS.0,
        }
    }
}

impl HouseUnlocks {
    /// Highest unlocked speed.
    pub fn max_speed(&self) -> HouseSpeed {
        self.max_speed
    }

    /// Most initial occupants allowed.
    pub fn max_initial_count(&self) -> u32 {
        self.max_initial_count
    }

    /// Most events allowed.
    pub fn max_event_count(&self) -> u32 {
        self.max_event_count
    }

    /// Most rounds allowed.
    pub fn max_rounds(&self) -> u32 {
        self.max_rounds
    }

    /// Whether a session with `config` may be played.
    pub fn is_unlocked(&self, config: &HouseConfig) -> bool {
        config.speed <= self.max_speed
            && (1..=self.max_initial_count).contains(&config.initial_count)
            && (1..=self.max_event_count).contains(&config.event_count)
            && (1..=self.max_rounds).contains(&config.rounds)
    }

    /// Progress after a qualifying clear of `config`.
    pub fn advance(&self, config: &HouseConfig) -> (Self, Vec<String>) {
        let mut next = self.clone();
        let mut unlocked = Vec::new();

        if config.speed == self.max_speed {
            if let Some(speed) = self.max_speed.next() {
                next.max_speed = speed;
                unlocked.push(format!("house:speed:{speed}"));
            }
        }
        if config.initial_count == self.max_initial_count
            && self.max_initial_count < HOUSE_INITIAL_COUNT.1
        {
            next.max_initial_count += 1;
            unlocked.push(format!("house:initial:{}", next.max_initial_count));
        }
        if config.event_count == self.max_event_count && self.max_event_count < HOUSE_EVENT_COUNT.1
        {
            next.max_event_count =
                (self.max_event_count + HOUSE_EVENT_STEP).min(HOUSE_EVENT_COUNT.1);
            unlocked.push(format!("house:events:{}", next.max_event_count));
        }
        if self.max_rounds < HOUSE_ROUNDS.1 {
            next.max_rounds += 1;
            unlocked.push(format!("house:rounds:{}", next.max_rounds));
        }

        (next, unlocked)
    }
}
