//! Time-based regeneration of the capped energy resource.
//!
//! Recovery is pull-based: nothing ticks in the background. Every read or
//! settlement calls [`EnergyPolicy::recover`], which uses division and modulo
//! over the elapsed time so arbitrarily long gaps cost the same as short ones.

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use super::account::EnergyState;

/// Default energy capacity.
pub const DEFAULT_MAX_ENERGY: u32 = 5;
/// Default time needed to regenerate one unit.
pub const DEFAULT_RECOVERY_MINUTES: i64 = 30;
/// Longest accepted recovery interval.
pub const MAX_RECOVERY_DAYS: i64 = 7;

/// Validation errors for [`EnergyPolicy::new`].
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum EnergyPolicyError {
    /// The capacity was zero.
    #[error("energy capacity must be positive")]
    ZeroCapacity,
    /// The recovery interval was shorter than one millisecond.
    #[error("energy recovery interval must be at least one millisecond")]
    NonPositiveInterval,
    /// The recovery interval exceeded [`MAX_RECOVERY_DAYS`].
    #[error("energy recovery interval must not exceed {MAX_RECOVERY_DAYS} days")]
    IntervalTooLong,
}

/// Capacity and regeneration rate for account energy.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EnergyPolicy {
    max: u32,
    recovery_interval: Duration,
}

impl Default for EnergyPolicy {
    fn default() -> Self {
        Self {
            max: DEFAULT_MAX_ENERGY,
            recovery_interval: Duration::minutes(DEFAULT_RECOVERY_MINUTES),
        }
    }
}

impl EnergyPolicy {
    /// Build a policy. The interval must lie between one millisecond and
    /// [`MAX_RECOVERY_DAYS`], since recovery counts whole milliseconds.
    pub fn new(max: u32, recovery_interval: Duration) -> Result<Self, EnergyPolicyError> {
        if max == 0 {
            return Err(EnergyPolicyError::ZeroCapacity);
        }
        if recovery_interval.num_milliseconds() < 1 {
            return Err(EnergyPolicyError::NonPositiveInterval);
        }
        if recovery_interval > Duration::days(MAX_RECOVERY_DAYS) {
            return Err(EnergyPolicyError::IntervalTooLong);
        }
        Ok(Self {
            max,
            recovery_interval,
        })
    }

    /// Maximum balance reachable through regeneration.
    pub fn max(&self) -> u32 {
        self.max
    }

    /// Time needed to regenerate one unit.
    pub fn recovery_interval(&self) -> Duration {
        self.recovery_interval
    }

    /// Apply regeneration between `last_updated` and `now`.
    ///
    /// Only whole intervals count. The clock advances by exactly the whole
    /// intervals consumed, so the remainder carries forward, and intervals
    /// elapsed while already at capacity are still consumed. A missing
    /// anchor means no time has elapsed. Balances above the cap (granted by
    /// items) are never reduced.
    ///
    /// # Examples
    /// ```
    /// use chrono::{Duration, TimeZone, Utc};
    /// use cogtrain::domain::EnergyPolicy;
    ///
    /// let policy = EnergyPolicy::default();
    /// let start = Utc.with_ymd_and_hms(2026, 1, 1, 0, 0, 0).unwrap();
    /// let now = start + Duration::minutes(75);
    /// let (current, anchor) = policy.recover(1, Some(start), now);
    /// assert_eq!(current, 3);
    /// assert_eq!(anchor, Some(start + Duration::minutes(60)));
    /// ```
    pub fn recover(
        &self,
        current: u32,
        last_updated: Option<DateTime<Utc>>,
        now: DateTime<Utc>,
    ) -> (u32, Option<DateTime<Utc>>) {
        let Some(anchor) = last_updated else {
            return (current, None);
        };
        let elapsed_ms = (now - anchor).num_milliseconds().max(0);
        let interval_ms = self.recovery_interval.num_milliseconds();
        let whole_units = elapsed_ms / interval_ms;
        if whole_units <= 0 {
            return (current, last_updated);
        }

        let gained = u32::try_from(whole_units).unwrap_or(u32::MAX);
        let recovered = current.saturating_add(gained).min(self.max).max(current);
        let consumed = Duration::milliseconds(elapsed_ms - elapsed_ms % interval_ms);
        (recovered, Some(anchor + consumed))
    }

    /// Produce the externally visible energy view at `now`.
    pub fn read(&self, state: &EnergyState, now: DateTime<Utc>) -> EnergyReading {
        if state.is_unlimited_at(now) {
            return EnergyReading {
                current: self.max.max(state.current),
                max: self.max,
                unlimited: true,
                updated_at: state.updated_at,
                unlimited_until: state.unlimited_until,
                next_unit_at: None,
            };
        }

        let (current, updated_at) = self.recover(state.current, state.updated_at, now);
        let next_unit_at = match updated_at {
            Some(anchor) if current < self.max => Some(anchor + self.recovery_interval),
            _ => None,
        };
        EnergyReading {
            current,
            max: self.max,
            unlimited: false,
            updated_at,
            unlimited_until: state.unlimited_until,
            next_unit_at,
        }
    }
}

/// Energy as presented to clients after recovery has been applied.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct EnergyReading {
    /// Balance after recovery.
    pub current: u32,
    /// Cap reachable through regeneration.
    pub max: u32,
    /// True while an unlimited-energy item is active.
    pub unlimited: bool,
    /// Anchor of the regeneration clock.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub updated_at: Option<DateTime<Utc>>,
    /// End of the unlimited-energy window.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub unlimited_until: Option<DateTime<Utc>>,
    /// When the next unit regenerates; absent at the cap.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub next_unit_at: Option<DateTime<Utc>>,
}

#[cfg(test)]
mod tests {
    //! Regression coverage for energy regeneration arithmetic.
    use super::*;
    use chrono::TimeZone;
    use rstest::{fixture, rstest};

    #[fixture]
    fn policy() -> EnergyPolicy {
        EnergyPolicy::default()
    }

    #[fixture]
    fn start() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2026, 3, 1, 8, 0, 0)
            .single()
            .expect("valid timestamp")
    }

    #[rstest]
    fn partial_interval_leaves_state_untouched(policy: EnergyPolicy, start: DateTime<Utc>) {
        let now = start + Duration::minutes(29);
        assert_eq!(policy.recover(2, Some(start), now), (2, Some(start)));
    }

    #[rstest]
    fn missing_anchor_is_zero_elapsed(policy: EnergyPolicy, start: DateTime<Utc>) {
        assert_eq!(policy.recover(1, None, start), (1, None));
    }

    #[rstest]
    fn clock_in_the_future_is_ignored(policy: EnergyPolicy, start: DateTime<Utc>) {
        let anchor = start + Duration::hours(1);
        assert_eq!(policy.recover(1, Some(anchor), start), (1, Some(anchor)));
    }

    #[rstest]
    fn capped_recovery_still_advances_clock(policy: EnergyPolicy, start: DateTime<Utc>) {
        let now = start + Duration::minutes(30 * 10 + 7);
        let (current, anchor) = policy.recover(4, Some(start), now);
        assert_eq!(current, 5);
        assert_eq!(anchor, Some(start + Duration::minutes(300)));
    }

    #[rstest]
    fn huge_gaps_do_not_overflow(policy: EnergyPolicy, start: DateTime<Utc>) {
        let now = start + Duration::days(365 * 200);
        let (current, anchor) = policy.recover(0, Some(start), now);
        assert_eq!(current, 5);
        assert!(anchor.is_some_and(|value| value <= now));
    }

    #[rstest]
    fn balances_above_cap_are_kept(policy: EnergyPolicy, start: DateTime<Utc>) {
        let now = start + Duration::minutes(60);
        assert_eq!(policy.recover(8, Some(start), now).0, 8);
    }

    #[rstest]
    fn splitting_the_interval_does_not_change_the_result(
        policy: EnergyPolicy,
        start: DateTime<Utc>,
    ) {
        let end = start + Duration::minutes(30 * 7 + 19);
        for current in 0..=5 {
            let direct = policy.recover(current, Some(start), end);
            for split_minutes in (0..=(30 * 7 + 19)).step_by(7) {
                let split = start + Duration::minutes(split_minutes);
                let (mid_current, mid_anchor) = policy.recover(current, Some(start), split);
                let stepped = policy.recover(mid_current, mid_anchor, end);
                assert_eq!(stepped, direct, "current={current} split={split_minutes}");
            }
        }
    }

    #[rstest]
    fn unlimited_reads_full_without_advancing(policy: EnergyPolicy, start: DateTime<Utc>) {
        let state = EnergyState {
            current: 0,
            updated_at: Some(start),
            unlimited_until: Some(start + Duration::days(1)),
        };
        let reading = policy.read(&state, start + Duration::hours(2));
        assert!(reading.unlimited);
        assert_eq!(reading.current, 5);
        assert_eq!(reading.updated_at, Some(start));
    }

    #[rstest]
    fn reading_reports_next_unit(policy: EnergyPolicy, start: DateTime<Utc>) {
        let state = EnergyState {
            current: 1,
            updated_at: Some(start),
            unlimited_until: None,
        };
        let reading = policy.read(&state, start + Duration::minutes(45));
        assert_eq!(reading.current, 2);
        assert_eq!(reading.next_unit_at, Some(start + Duration::minutes(60)));
    }

    #[rstest]
    #[case(0, Duration::minutes(30), EnergyPolicyError::ZeroCapacity)]
    #[case(5, Duration::zero(), EnergyPolicyError::NonPositiveInterval)]
    #[case(5, Duration::microseconds(500), EnergyPolicyError::NonPositiveInterval)]
    #[case(5, Duration::minutes(-30), EnergyPolicyError::NonPositiveInterval)]
    #[case(5, Duration::days(8), EnergyPolicyError::IntervalTooLong)]
    fn rejects_invalid_policies(
        #[case] max: u32,
        #[case] interval: Duration,
        #[case] expected: EnergyPolicyError,
    ) {
        assert_eq!(EnergyPolicy::new(max, interval), Err(expected));
    }

    #[rstest]
    fn millisecond_intervals_recover_without_panicking() {
        let policy = EnergyPolicy::new(5, Duration::milliseconds(1)).expect("valid policy");
        let start = Utc
            .with_ymd_and_hms(2026, 1, 1, 0, 0, 0)
            .single()
            .expect("valid timestamp");

        let (current, anchor) = policy.recover(1, Some(start), start + Duration::seconds(1));

        assert_eq!(current, 5);
        assert_eq!(anchor, Some(start + Duration::seconds(1)));
    }
}
