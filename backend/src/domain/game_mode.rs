//! Game modes and the strongly typed configuration of a played session.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

/// Minigame families with their own unlock trees.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "lowercase")]
pub enum GameMode {
    /// Numeric n-back.
    Numeric,
    /// Spatial n-back on a grid.
    Spatial,
    /// Tracking moving targets.
    Mouse,
    /// Counting people in and out of a house.
    House,
}

impl GameMode {
    /// Every mode, in storage order.
    pub const ALL: [Self; 4] = [Self::Numeric, Self::Spatial, Self::Mouse, Self::House];

    /// Stable lowercase identifier used in storage and unlock ids.
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Numeric => "numeric",
            Self::Spatial => "spatial",
            Self::Mouse => "mouse",
            Self::House => "house",
        }
    }
}

impl fmt::Display for GameMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Raised when a mode string is not recognised.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unknown game mode: {0}")]
pub struct UnknownGameMode(pub String);

impl FromStr for GameMode {
    type Err = UnknownGameMode;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "numeric" => Ok(Self::Numeric),
            "spatial" => Ok(Self::Spatial),
            "mouse" => Ok(Self::Mouse),
            "house" => Ok(Self::House),
            _ => Err(UnknownGameMode(s.to_owned())),
        }
    }
}

/// Defines an ordered tier ladder with string conversions.
macro_rules! tier_ladder {
    (
        $(#[$meta:meta])*
        pub enum $name:ident { $($variant:ident => $text:literal),+ $(,)? }
    ) => {
        $(#[$meta])*
        #[derive(
            Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize,
            ToSchema,
        )]
        #[serde(rename_all = "lowercase")]
        pub enum $name {
            $($variant),+
        }

        impl $name {
            /// Tiers from easiest to hardest.
            pub const LADDER: &'static [Self] = &[$(Self::$variant),+];

            /// Stable lowercase identifier.
            pub const fn as_str(self) -> &'static str {
                match self {
                    $(Self::$variant => $text),+
                }
            }

            /// The tier directly above this one, if any.
            pub fn next(self) -> Option<Self> {
                let position = Self::LADDER.iter().position(|tier| *tier == self)?;
                Self::LADDER.get(position + 1).copied()
            }

            /// Lenient parse used for requests and legacy storage.
            pub fn parse(raw: &str) -> Option<Self> {
                let lowered = raw.trim().to_ascii_lowercase();
                Self::LADDER.iter().copied().find(|tier| tier.as_str() == lowered)
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str(self.as_str())
            }
        }
    };
}

tier_ladder! {
    /// Mouse-chase difficulty tiers.
    pub enum MouseDifficulty {
        Easy => "easy",
        Medium => "medium",
        Hard => "hard",
        Hell => "hell",
    }
}

tier_ladder! {
    /// House-counting playback speeds.
    pub enum HouseSpeed {
        Easy => "easy",
        Normal => "normal",
        Fast => "fast",
    }
}

/// N-back over digits.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct NumericConfig {
    /// How many steps back the player must remember.
    pub depth: u32,
    /// Number of rounds played.
    pub rounds: u32,
}

/// N-back over grid positions.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct SpatialConfig {
    /// Side length of the square grid.
    pub grid_size: u32,
    /// How many steps back the player must remember.
    pub depth: u32,
    /// Number of rounds played.
    pub rounds: u32,
}

/// Track moving targets.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct MouseConfig {
    /// Target speed tier.
    pub difficulty: MouseDifficulty,
    /// Number of targets to track.
    pub targets: u32,
    /// Number of rounds played.
    pub rounds: u32,
}

/// Count people entering and leaving a house.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct HouseConfig {
    /// Pace of arrivals and departures.
    pub speed: HouseSpeed,
    /// People inside before the first event.
    pub initial_count: u32,
    /// Arrivals and departures per round.
    pub event_count: u32,
    /// Number of rounds played.
    pub rounds: u32,
}

/// Validated configuration of a played session, tagged by mode.
///
/// Serialised with a `mode` tag; this is the audit snapshot written to the
/// session log.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(tag = "mode", rename_all = "lowercase")]
pub enum GameConfig {
    /// Numeric n-back settings.
    Numeric(NumericConfig),
    /// Spatial n-back settings.
    Spatial(SpatialConfig),
    /// Mouse tracking settings.
    Mouse(MouseConfig),
    /// House counting settings.
    House(HouseConfig),
}

impl GameConfig {
    /// Mode this configuration belongs to.
    pub fn mode(&self) -> GameMode {
        match self {
            Self::Numeric(_) => GameMode::Numeric,
            Self::Spatial(_) => GameMode::Spatial,
            Self::Mouse(_) => GameMode::Mouse,
            Self::House(_) => GameMode::House,
        }
    }

    /// Difficulty scalar fed into reward formulas.
    ///
    /// N-back modes use their depth; mouse uses the target count; house uses
    /// the initial occupant count.
    pub fn depth(&self) -> u32 {
        match self {
            Self::Numeric(config) => config.depth,
            Self::Spatial(config) => config.depth,
            Self::Mouse(config) => config.targets,
            Self::House(config) => config.initial_count,
        }
    }

    /// Number of rounds played.
    pub fn rounds(&self) -> u32 {
        match self {
            Self::Numeric(config) => config.rounds,
            Self::Spatial(config) => config.rounds,
            Self::Mouse(config) => config.rounds,
            Self::House(config) => config.rounds,
        }
    }
}
