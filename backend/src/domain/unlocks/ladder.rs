//! Depth and round-count ladder shared by the n-back modes.

use std::collections::{BTreeMap, BTreeSet};

use serde::Serialize;
use utoipa::ToSchema;

/// Step between selectable round counts.
pub const ROUND_STEP: u32 = 5;
/// Longest selectable session.
pub const MAX_ROUNDS: u32 = 30;
/// Round length that unlocks the next depth when cleared at the cap.
pub const BREAKTHROUGH_ROUNDS: u32 = 10;

/// Smallest round count in `{5, 10, ..., 30}` that is at least `depth + 1`.
///
/// # Examples
/// ```
/// use cogtrain::domain::unlocks::min_rounds_for;
///
/// assert_eq!(min_rounds_for(2), 5);
/// assert_eq!(min_rounds_for(5), 10);
/// assert_eq!(min_rounds_for(12), 15);
/// ```
pub fn min_rounds_for(depth: u32) -> u32 {
    let needed = depth.saturating_add(1);
    let steps = needed.div_ceil(ROUND_STEP).max(1);
    (steps * ROUND_STEP).min(MAX_ROUNDS)
}

/// Round length whose clear at the depth cap opens the next depth.
///
/// This is [`BREAKTHROUGH_ROUNDS`] unless the depth cannot be played at that
/// length, in which case the depth's minimum length is used.
pub fn breakthrough_rounds(depth: u32) -> u32 {
    BREAKTHROUGH_ROUNDS.max(min_rounds_for(depth))
}

/// Round counts available when a depth is first unlocked.
pub fn seeded_rounds(depth: u32) -> BTreeSet<u32> {
    let min = min_rounds_for(depth);
    [min, min + ROUND_STEP]
        .into_iter()
        .filter(|rounds| *rounds <= MAX_ROUNDS)
        .collect()
}

/// Unlocked depths and the round counts allowed at each.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct DepthLadder {
    pub(crate) max_depth: u32,
    #[schema(value_type = Object)]
    pub(crate) rounds_by_depth: BTreeMap<u32, BTreeSet<u32>>,
}

impl Default for DepthLadder {
    fn default() -> Self {
        Self {
            max_depth: 1,
            rounds_by_depth: BTreeMap::from([(1, seeded_rounds(1))]),
        }
    }
}

impl DepthLadder {
    /// Highest unlocked depth.
    pub fn max_depth(&self) -> u32 {
        self.max_depth
    }

    /// Round counts unlocked at `depth`.
    pub fn rounds_at(&self, depth: u32) -> Option<&BTreeSet<u32>> {
        self.rounds_by_depth.get(&depth)
    }

    /// Whether `rounds` may be played at `depth`.
    pub fn allows(&self, depth: u32, rounds: u32) -> bool {
        depth >= 1
            && depth <= self.max_depth
            && self
                .rounds_by_depth
                .get(&depth)
                .is_some_and(|allowed| allowed.contains(&rounds))
    }

    /// Apply a qualifying clear of (`depth`, `rounds`).
    ///
    /// `depth_limit` bounds how far the ladder may grow; `prefix` namespaces
    /// the emitted unlock ids (for example `numeric` or `spatial:grid:3`).
    pub fn advance(
        &self,
        depth: u32,
        rounds: u32,
        depth_limit: u32,
        prefix: &str,
    ) -> (Self, Vec<String>) {
        let mut next = self.clone();
        let mut unlocked = Vec::new();

        let longer = rounds + ROUND_STEP;
        if longer <= MAX_ROUNDS {
            let allowed = next.rounds_by_depth.entry(depth).or_default();
            if allowed.insert(longer) {
                unlocked.push(format!("{prefix}:depth:{depth}:rounds:{longer}"));
            }
        }

        if rounds == breakthrough_rounds(depth)
            && depth == next.max_depth
            && next.max_depth < depth_limit
        {
            let opened = depth + 1;
            next.max_depth = opened;
            next.rounds_by_depth
                .entry(opened)
                .or_default()
                .extend(seeded_rounds(opened));
            unlocked.push(format!("{prefix}:depth:{opened}"));
        }

        (next, unlocked)
    }

    /// Build a ladder from loosely validated parts, repairing gaps.
    ///
    /// Depths are clamped into `1..=depth_limit`, unknown round counts are
    /// dropped and every unlocked depth keeps at least its seeded rounds.
    pub(crate) fn repaired(
        max_depth: u32,
        rounds_by_depth: BTreeMap<u32, BTreeSet<u32>>,
        depth_limit: u32,
    ) -> Self {
        let max_depth = max_depth.clamp(1, depth_limit.max(1));
        let mut repaired: BTreeMap<u32, BTreeSet<u32>> = rounds_by_depth
            .into_iter()
            .filter(|(depth, _)| (1..=max_depth).contains(depth))
            .map(|(depth, rounds)| {
                let valid = rounds
                    .into_iter()
                    .filter(|value| {
                        *value >= ROUND_STEP && *value <= MAX_ROUNDS && value % ROUND_STEP == 0
                    })
                    .collect();
                (depth, valid)
            })
            .collect();
        for depth in 1..=max_depth {
            repaired.entry(depth).or_default().extend(seeded_rounds(depth));
        }
        Self {
            max_depth,
            rounds_by_depth: repaired,
        }
    }

    /// True when every unlock in `self` is still present in `later`.
    pub fn is_subset_of(&self, later: &Self) -> bool {
        self.max_depth <= later.max_depth
            && self.rounds_by_depth.iter().all(|(depth, rounds)| {
                later
                    .rounds_by_depth
                    .get(depth)
                    .is_some_and(|kept| rounds.is_subset(kept))
            })
    }
}
