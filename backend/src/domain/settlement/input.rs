//! Session outcome payloads and their validation.
//!
//! Clients submit loosely typed numbers. Validation resolves the mode first,
//! then clamps every numeric field into its legal range so later stages only
//! ever see a well-formed [`SessionOutcome`].

use serde::{Deserialize, Serialize};
use serde_json::Value;
use utoipa::ToSchema;

use crate::domain::game_mode::{
    GameConfig, GameMode, HouseConfig, HouseSpeed, MouseConfig, MouseDifficulty, NumericConfig,
    SpatialConfig, UnknownGameMode,
};
use crate::domain::unlocks::{
    HOUSE_EVENT_COUNT, MAX_ROUNDS, NUMERIC_DEPTH_LIMIT, QUALIFYING_ACCURACY,
};

const MIN_GRID: u32 = 3;
const MAX_GRID: u32 = 5;

/// Configuration of the played session as submitted by the client.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct SessionConfigPayload {
    /// Game mode name, such as `numeric`.
    pub mode: String,
    /// N-back depth.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub depth: Option<f64>,
    /// Rounds configured for the session.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub total_rounds: Option<f64>,
    /// Grid side length; spatial only.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub grid_size: Option<f64>,
    /// Target speed tier; mouse only.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub difficulty: Option<String>,
    /// Pace tier; house only.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub speed: Option<String>,
    /// Events per round; house only.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub event_count: Option<f64>,
}

/// Finished session as submitted by the client.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct SessionOutcomePayload {
    /// Percentage of correct answers.
    pub accuracy: f64,
    /// Rounds actually played, when they differ from the configuration.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub total_rounds: Option<f64>,
    /// Client-computed score. Stored for audit only.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reported_score: Option<f64>,
    /// Mean reaction time, when the mode measures it.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub avg_reaction_time_ms: Option<f64>,
    /// Configuration the session was played with.
    pub config: SessionConfigPayload,
    /// Correct answers.
    #[serde(default)]
    pub correct_count: f64,
    /// Wrong answers.
    #[serde(default)]
    pub incorrect_count: f64,
    /// Unanswered prompts.
    #[serde(default)]
    pub missed_count: f64,
    /// Wall-clock length of the session.
    #[serde(default)]
    pub duration_ms: f64,
    /// Mode-specific extras, stored verbatim.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    #[schema(value_type = Option<Object>)]
    pub mode_specific_details: Option<Value>,
}

/// Reasons a payload cannot be settled at all.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum SessionValidationError {
    /// Mode name is not one of the four minigames.
    #[error(transparent)]
    UnknownMode(#[from] UnknownGameMode),
    /// Neither the outcome nor its configuration gives a round count.
    #[error("total rounds must be provided")]
    MissingRounds,
    /// Mouse difficulty outside the known tiers.
    #[error("unknown mouse difficulty: {0}")]
    UnknownDifficulty(String),
    /// House speed outside the known tiers.
    #[error("unknown house speed: {0}")]
    UnknownSpeed(String),
}

/// Outcome counters kept on the session log.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct OutcomeCounts {
    /// Correct answers.
    pub correct: u32,
    /// Wrong answers.
    pub incorrect: u32,
    /// Unanswered prompts.
    pub missed: u32,
    /// Wall-clock length of the session.
    pub duration_ms: u64,
}

/// Validated session outcome.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionOutcome {
    /// Percentage of correct answers, clamped to `0..=100`.
    pub accuracy: f64,
    /// Validated configuration.
    pub config: GameConfig,
    /// Client-computed score, kept for audit.
    pub reported_score: Option<f64>,
    /// Mean reaction time, when measured.
    pub avg_reaction_time_ms: Option<f64>,
    /// Answer counters and duration.
    pub counts: OutcomeCounts,
    /// Mode-specific extras, stored verbatim.
    pub mode_specific_details: Option<Value>,
}

impl SessionOutcome {
    /// Whether the clear is good enough to advance unlock trees.
    pub fn is_qualifying(&self) -> bool {
        self.accuracy >= QUALIFYING_ACCURACY
    }

    /// Whether every answer was correct.
    pub fn is_perfect(&self) -> bool {
        self.accuracy >= 100.0
    }
}

#[expect(
    clippy::cast_possible_truncation,
    reason = "the rounded value is already clamped into u32 range"
)]
fn clamp_whole(value: f64, min: u32, max: u32) -> u32 {
    if !value.is_finite() {
        return min;
    }
    value.round().clamp(f64::from(min), f64::from(max)) as u32
}

fn non_negative(value: Option<f64>) -> Option<f64> {
    value.filter(|raw| raw.is_finite()).map(|raw| raw.max(0.0))
}

#[expect(
    clippy::cast_possible_truncation,
    reason = "float-to-int `as` saturates at u64::MAX"
)]
fn whole_millis(value: f64) -> u64 {
    non_negative(Some(value)).map_or(0, |duration| duration.round() as u64)
}

impl SessionOutcomePayload {
    /// Resolve the mode and coerce every field into range.
    ///
    /// # Examples
    /// ```
    /// use cogtrain::domain::settlement::{SessionConfigPayload, SessionOutcomePayload};
    /// use cogtrain::domain::GameConfig;
    ///
    /// let payload = SessionOutcomePayload {
    ///     accuracy: 140.0,
    ///     total_rounds: None,
    ///     reported_score: None,
    ///     avg_reaction_time_ms: None,
    ///     config: SessionConfigPayload {
    ///         mode: "numeric".to_owned(),
    ///         depth: Some(40.0),
    ///         total_rounds: Some(10.0),
    ///         grid_size: None,
    ///         difficulty: None,
    ///         speed: None,
    ///         event_count: None,
    ///     },
    ///     correct_count: 10.0,
    ///     incorrect_count: 0.0,
    ///     missed_count: 0.0,
    ///     duration_ms: 60_000.0,
    ///     mode_specific_details: None,
    /// };
    /// let outcome = payload.validate().expect("numeric is a known mode");
    /// assert_eq!(outcome.accuracy, 100.0);
    /// assert_eq!(outcome.config.depth(), 12);
    /// ```
    pub fn validate(&self) -> Result<SessionOutcome, SessionValidationError> {
        let mode: GameMode = self.config.mode.parse()?;
        let rounds = self
            .config
            .total_rounds
            .or(self.total_rounds)
            .map(|raw| clamp_whole(raw, 1, MAX_ROUNDS))
            .ok_or(SessionValidationError::MissingRounds)?;
        let depth = clamp_whole(self.config.depth.unwrap_or(1.0), 1, NUMERIC_DEPTH_LIMIT);

        let config = match mode {
            GameMode::Numeric => GameConfig::Numeric(NumericConfig { depth, rounds }),
            GameMode::Spatial => GameConfig::Spatial(SpatialConfig {
                grid_size: clamp_whole(
                    self.config.grid_size.unwrap_or(f64::from(MIN_GRID)),
                    MIN_GRID,
                    MAX_GRID,
                ),
                depth,
                rounds,
            }),
            GameMode::Mouse => GameConfig::Mouse(MouseConfig {
                difficulty: match self.config.difficulty.as_deref() {
                    None => MouseDifficulty::Easy,
                    Some(raw) => MouseDifficulty::parse(raw)
                        .ok_or_else(|| SessionValidationError::UnknownDifficulty(raw.to_owned()))?,
                },
                targets: depth,
                rounds,
            }),
            GameMode::House => GameConfig::House(HouseConfig {
                speed: match self.config.speed.as_deref() {
                    None => HouseSpeed::Easy,
                    Some(raw) => HouseSpeed::parse(raw)
                        .ok_or_else(|| SessionValidationError::UnknownSpeed(raw.to_owned()))?,
                },
                initial_count: depth,
                event_count: clamp_whole(
                    self.config
                        .event_count
                        .unwrap_or(f64::from(HOUSE_EVENT_COUNT.0)),
                    1,
                    u32::MAX,
                ),
                rounds,
            }),
        };

        let accuracy = if self.accuracy.is_finite() {
            self.accuracy.clamp(0.0, 100.0)
        } else {
            0.0
        };

        Ok(SessionOutcome {
            accuracy,
            config,
            reported_score: self.reported_score.filter(|score| score.is_finite()),
            avg_reaction_time_ms: non_negative(self.avg_reaction_time_ms),
            counts: OutcomeCounts {
                correct: clamp_whole(self.correct_count, 0, u32::MAX),
                incorrect: clamp_whole(self.incorrect_count, 0, u32::MAX),
                missed: clamp_whole(self.missed_count, 0, u32::MAX),
                duration_ms: whole_millis(self.duration_ms),
            },
            mode_specific_details: self.mode_specific_details.clone(),
        })
    }
}

#[cfg(test)]
mod tests {
    //! Regression coverage for this module.
    use super::*;
    use rstest::{fixture, rstest};
    use serde_json::json;

    #[fixture]
    fn payload() -> SessionOutcomePayload {
        serde_json::from_value(json!({
            "accuracy": 92.5,
            "config": {"mode": "numeric", "depth": 2, "totalRounds": 10},
            "correctCount": 9,
            "incorrectCount": 1,
            "missedCount": 0,
            "durationMs": 61_000
        }))
        .expect("payload decodes")
    }

    #[rstest]
    fn unknown_modes_are_rejected(mut payload: SessionOutcomePayload) {
        payload.config.mode = "chess".to_owned();
        assert!(matches!(
            payload.validate(),
            Err(SessionValidationError::UnknownMode(_))
        ));
    }

    #[rstest]
    fn rounds_fall_back_to_the_top_level_field(mut payload: SessionOutcomePayload) {
        payload.config.total_rounds = None;
        payload.total_rounds = Some(15.0);
        assert_eq!(payload.validate().expect("valid").config.rounds(), 15);

        payload.total_rounds = None;
        assert_eq!(payload.validate(), Err(SessionValidationError::MissingRounds));
    }

    #[rstest]
    #[case(-20.0, 0.0)]
    #[case(92.5, 92.5)]
    #[case(180.0, 100.0)]
    fn accuracy_is_clamped(
        mut payload: SessionOutcomePayload,
        #[case] raw: f64,
        #[case] expected: f64,
    ) {
        payload.accuracy = raw;
        assert_eq!(payload.validate().expect("valid").accuracy, expected);
    }

    #[rstest]
    fn spatial_grid_is_clamped(mut payload: SessionOutcomePayload) {
        payload.config.mode = "spatial".to_owned();
        payload.config.grid_size = Some(9.0);
        payload.config.total_rounds = Some(99.0);
        let outcome = payload.validate().expect("valid");
        assert_eq!(
            outcome.config,
            GameConfig::Spatial(SpatialConfig {
                grid_size: 5,
                depth: 2,
                rounds: 30,
            })
        );
    }

    #[rstest]
    fn mouse_and_house_defaults_apply(mut payload: SessionOutcomePayload) {
        payload.config.mode = "mouse".to_owned();
        payload.config.total_rounds = Some(3.0);
        assert_eq!(
            payload.validate().expect("valid").config,
            GameConfig::Mouse(MouseConfig {
                difficulty: MouseDifficulty::Easy,
                targets: 2,
                rounds: 3,
            })
        );

        payload.config.mode = "house".to_owned();
        assert_eq!(
            payload.validate().expect("valid").config,
            GameConfig::House(HouseConfig {
                speed: HouseSpeed::Easy,
                initial_count: 2,
                event_count: 12,
                rounds: 3,
            })
        );
    }

    #[rstest]
    fn unknown_tiers_are_rejected(mut payload: SessionOutcomePayload) {
        payload.config.mode = "house".to_owned();
        payload.config.speed = Some("warp".to_owned());
        assert_eq!(
            payload.validate(),
            Err(SessionValidationError::UnknownSpeed("warp".to_owned()))
        );
    }

    #[rstest]
    fn negative_counters_are_floored(mut payload: SessionOutcomePayload) {
        payload.missed_count = -3.0;
        payload.duration_ms = -1.0;
        payload.avg_reaction_time_ms = Some(-5.0);
        let outcome = payload.validate().expect("valid");
        assert_eq!(outcome.counts.missed, 0);
        assert_eq!(outcome.counts.duration_ms, 0);
        assert_eq!(outcome.avg_reaction_time_ms, Some(0.0));
    }

    #[rstest]
    fn oversized_counters_saturate(mut payload: SessionOutcomePayload) {
        payload.correct_count = 1e12;
        payload.incorrect_count = f64::NAN;
        payload.missed_count = 2.5;
        payload.duration_ms = 1e30;
        let outcome = payload.validate().expect("valid");
        assert_eq!(outcome.counts.correct, u32::MAX);
        assert_eq!(outcome.counts.incorrect, 0);
        assert_eq!(outcome.counts.missed, 3);
        assert_eq!(outcome.counts.duration_ms, u64::MAX);
    }
}
