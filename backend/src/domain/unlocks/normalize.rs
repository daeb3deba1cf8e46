//! Lenient decoding of stored unlock JSON.
//!
//! Stored blobs predate the typed model and come in several shapes: camelCase
//! or snake_case keys, numbers encoded as strings, whole documents encoded as
//! a JSON string, and older field names. Decoding never fails; anything
//! unreadable falls back to the minimum defaults and every value is clamped
//! into its legal range.

use std::collections::{BTreeMap, BTreeSet};

use serde_json::{Map, Value};

use super::house::{HOUSE_EVENT_COUNT, HOUSE_INITIAL_COUNT, HOUSE_ROUNDS, HouseUnlocks};
use super::ladder::DepthLadder;
use super::mouse::{MOUSE_ROUNDS, MOUSE_TARGETS, MouseUnlocks};
use super::numeric::{NUMERIC_DEPTH_LIMIT, NumericUnlocks};
use super::spatial::{GRID_DEPTH_LIMITS, SpatialUnlocks, grid_depth_limit};
use super::UnlockState;
use crate::domain::game_mode::{GameMode, HouseSpeed, MouseDifficulty};

/// Decode a stored unlock blob for `mode`, repairing it where needed.
///
/// # Examples
/// ```
/// use cogtrain::domain::GameMode;
/// use cogtrain::domain::unlocks::{UnlockState, normalize_unlock_state};
/// use serde_json::json;
///
/// let legacy = json!({"max_depth": "2", "rounds_by_depth": {"1": [5, 10, 15]}});
/// let UnlockState::Numeric(numeric) = normalize_unlock_state(GameMode::Numeric, Some(&legacy))
/// else {
///     panic!("numeric mode decodes to numeric unlocks");
/// };
/// assert_eq!(numeric.ladder().max_depth(), 2);
/// ```
pub fn normalize_unlock_state(mode: GameMode, stored: Option<&Value>) -> UnlockState {
    let decoded = stored.and_then(unwrap_document);
    let empty = Map::new();
    let object = decoded.as_ref().and_then(Value::as_object).unwrap_or(&empty);

    match mode {
        GameMode::Numeric => UnlockState::Numeric(numeric(object)),
        GameMode::Spatial => UnlockState::Spatial(spatial(object)),
        GameMode::Mouse => UnlockState::Mouse(mouse(object)),
        GameMode::House => UnlockState::House(house(object)),
    }
}

/// Accept either a JSON object or a JSON string holding one.
fn unwrap_document(value: &Value) -> Option<Value> {
    match value {
        Value::String(raw) => serde_json::from_str::<Value>(raw)
            .ok()
            .filter(Value::is_object),
        Value::Object(_) => Some(value.clone()),
        _ => None,
    }
}

fn field<'a>(object: &'a Map<String, Value>, aliases: &[&str]) -> Option<&'a Value> {
    aliases.iter().find_map(|alias| object.get(*alias))
}

#[expect(
    clippy::cast_possible_truncation,
    reason = "float-to-int `as` saturates before the u32 narrowing"
)]
fn as_u32(value: &Value) -> Option<u32> {
    match value {
        Value::Number(number) => number
            .as_u64()
            .or_else(|| {
                number
                    .as_f64()
                    .filter(|float| float.is_finite() && *float >= 0.0)
                    .map(|float| float.round() as u64)
            })
            .map(|wide| u32::try_from(wide).unwrap_or(u32::MAX)),
        Value::String(raw) => raw.trim().parse::<u32>().ok(),
        _ => None,
    }
}

fn u32_field(object: &Map<String, Value>, aliases: &[&str]) -> Option<u32> {
    field(object, aliases).and_then(as_u32)
}

fn u32_list(value: &Value) -> BTreeSet<u32> {
    value
        .as_array()
        .map(|items| items.iter().filter_map(as_u32).collect())
        .unwrap_or_default()
}

/// Read `{"1": [5, 10]}` or `[{"depth": 1, "rounds": [5, 10]}]`.
fn rounds_map(value: Option<&Value>) -> BTreeMap<u32, BTreeSet<u32>> {
    let mut rounds: BTreeMap<u32, BTreeSet<u32>> = BTreeMap::new();
    match value {
        Some(Value::Object(entries)) => {
            for (depth, allowed) in entries {
                if let Ok(depth) = depth.trim().parse::<u32>() {
                    rounds.entry(depth).or_default().extend(u32_list(allowed));
                }
            }
        }
        Some(Value::Array(entries)) => {
            for entry in entries.iter().filter_map(Value::as_object) {
                let depth = u32_field(entry, &["depth", "level"]);
                let allowed = field(entry, &["rounds", "roundCounts", "round_counts"]);
                if let (Some(depth), Some(allowed)) = (depth, allowed) {
                    rounds.entry(depth).or_default().extend(u32_list(allowed));
                }
            }
        }
        _ => {}
    }
    rounds
}

fn ladder(object: &Map<String, Value>, depth_limit: u32) -> DepthLadder {
    let rounds = rounds_map(field(
        object,
        &["roundsByDepth", "rounds_by_depth", "unlockedRounds", "unlocked_rounds"],
    ));
    let highest_listed = rounds.keys().next_back().copied().unwrap_or(1);
    let max_depth = u32_field(object, &["maxDepth", "max_depth", "maxLevel", "max_level"])
        .unwrap_or(highest_listed);
    DepthLadder::repaired(max_depth, rounds, depth_limit)
}

fn numeric(object: &Map<String, Value>) -> NumericUnlocks {
    NumericUnlocks {
        ladder: ladder(object, NUMERIC_DEPTH_LIMIT),
    }
}

fn spatial(object: &Map<String, Value>) -> SpatialUnlocks {
    let mut grids: BTreeMap<u32, DepthLadder> = BTreeMap::new();

    if let Some(Value::Object(by_grid)) = field(object, &["grids", "byGrid", "by_grid"]) {
        for (size, stored) in by_grid {
            let (Ok(size), Some(stored)) = (size.trim().parse::<u32>(), stored.as_object()) else {
                continue;
            };
            if let Some(limit) = grid_depth_limit(size) {
                grids.insert(size, ladder(stored, limit));
            }
        }
    }

    // Flat legacy layout: unlocked sizes plus per-grid depth caps.
    if let Some(listed) = field(object, &["unlockedGrids", "unlocked_grids", "gridSizes"]) {
        let caps = field(object, &["maxDepthByGrid", "max_depth_by_grid", "depthCaps"])
            .and_then(Value::as_object);
        let rounds = field(object, &["roundsByGrid", "rounds_by_grid"]).and_then(Value::as_object);
        for size in u32_list(listed) {
            let Some(limit) = grid_depth_limit(size) else {
                continue;
            };
            if grids.contains_key(&size) {
                continue;
            }
            let key = size.to_string();
            let cap = caps.and_then(|caps| caps.get(&key)).and_then(as_u32).unwrap_or(1);
            let per_depth = rounds_map(rounds.and_then(|rounds| rounds.get(&key)));
            grids.insert(size, DepthLadder::repaired(cap, per_depth, limit));
        }
    }

    // A larger grid implies every smaller grid was unlocked on the way.
    let largest = grids.keys().next_back().copied().unwrap_or(3);
    for (size, _) in GRID_DEPTH_LIMITS {
        if size <= largest {
            grids.entry(size).or_default();
        }
    }

    SpatialUnlocks { grids }
}

fn highest_tier<T: Copy + Ord>(
    object: &Map<String, Value>,
    single: &[&str],
    listed: &[&str],
    parse: fn(&str) -> Option<T>,
) -> Option<T> {
    let from_single = field(object, single)
        .and_then(Value::as_str)
        .and_then(parse);
    let from_list = field(object, listed)
        .and_then(Value::as_array)
        .and_then(|items| items.iter().filter_map(Value::as_str).filter_map(parse).max());
    from_single.into_iter().chain(from_list).max()
}

fn clamped(value: Option<u32>, (minimum, maximum): (u32, u32)) -> u32 {
    value.unwrap_or(minimum).clamp(minimum, maximum)
}

fn mouse(object: &Map<String, Value>) -> MouseUnlocks {
    MouseUnlocks {
        max_difficulty: highest_tier(
            object,
            &["maxDifficulty", "max_difficulty", "difficulty"],
            &["unlockedDifficulties", "unlocked_difficulties"],
            MouseDifficulty::parse,
        )
        .unwrap_or(MouseDifficulty::Easy),
        max_targets: clamped(
            u32_field(
                object,
                &["maxTargets", "max_targets", "maxCreatures", "max_creatures"],
            ),
            MOUSE_TARGETS,
        ),
        max_rounds: clamped(u32_field(object, &["maxRounds", "max_rounds"]), MOUSE_ROUNDS),
    }
}

fn house(object: &Map<String, Value>) -> HouseUnlocks {
    HouseUnlocks {
        max_speed: highest_tier(
            object,
            &["maxSpeed", "max_speed", "speed"],
            &["unlockedSpeeds", "unlocked_speeds"],
            HouseSpeed::parse,
        )
        .unwrap_or(HouseSpeed::Easy),
        max_initial_count: clamped(
            u32_field(
                object,
                &["maxInitialCount", "max_initial_count", "maxInitial", "max_initial"],
            ),
            HOUSE_INITIAL_COUNT,
        ),
        max_event_count: clamped(
            u32_field(
                object,
                &["maxEventCount", "max_event_count", "maxEvents", "max_events"],
            ),
            HOUSE_EVENT_COUNT,
        ),
        max_rounds: clamped(u32_field(object, &["maxRounds", "max_rounds"]), HOUSE_ROUNDS),
    }
}
