//! RPM estimation from encoder snapshots.

use crate::state::{Direction, EncoderSnapshot};

const MICROS_PER_SECOND: f32 = 1_000_000.0;
const SECONDS_PER_MINUTE: f32 = 60.0;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum RateStrategy {
    /// Speed from the time between the two latest pulses. Forced to zero
    /// when no pulse arrived for `stall_timeout_us`.
    Interval { stall_timeout_us: u32 },
    /// Speed from the position change over the sample period.
    Delta,
}

/// `None` for a zero interval.
pub fn rpm_from_interval(interval_us: u32, counts_per_rev: f32, direction: Direction) -> Option<f32> {
    if interval_us == 0 || counts_per_rev <= 0.0 {
        return None;
    }
    let counts_per_s = MICROS_PER_SECOND / interval_us as f32;
    Some(counts_per_s / counts_per_rev * SECONDS_PER_MINUTE * direction.as_f32())
}

/// `None` for a zero (or negative) sample period.
pub fn rpm_from_delta(delta_counts: i32, dt_s: f32, counts_per_rev: f32) -> Option<f32> {
    if dt_s <= 0.0 || counts_per_rev <= 0.0 {
        return None;
    }
    let rpm = (delta_counts as f32 / dt_s) / counts_per_rev * SECONDS_PER_MINUTE;
    rpm.is_finite().then_some(rpm)
}

/// Age of the latest pulse at `now_us`, both on the monotonic µs clock.
///
/// A pulse stamped after `now_us` (the edge landed between reading the
/// clock and taking the snapshot) has age zero.
pub fn pulse_age_us(now_us: u64, last_pulse_us: u64) -> u64 {
    now_us.saturating_sub(last_pulse_us)
}

#[derive(Clone, Copy, Debug, Default, PartialEq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct RateEstimate {
    pub rpm: f32,
    /// Interval strategy only: no pulse within the stall window.
    pub stalled: bool,
    /// The estimate could not be formed this cycle and carries the previous value.
    pub held: bool,
}

/// Stateful RPM estimator. Keeps the previous position and the last valid
/// estimate so degenerate cycles can carry it forward.
#[derive(Clone, Copy, Debug)]
pub struct RateEstimator {
    strategy: RateStrategy,
    counts_per_rev: f32,
    prev_position: i32,
    last_rpm: f32,
}

impl RateEstimator {
    pub fn new(strategy: RateStrategy, counts_per_rev: f32) -> Self {
        Self {
            strategy,
            counts_per_rev,
            prev_position: 0,
            last_rpm: 0.0,
        }
    }

    pub fn strategy(&self) -> RateStrategy {
        self.strategy
    }

    pub fn last_rpm(&self) -> f32 {
        self.last_rpm
    }

    pub fn estimate(&mut self, snapshot: &EncoderSnapshot, now_us: u64, dt_s: f32) -> RateEstimate {
        let (fresh, stalled) = match self.strategy {
            RateStrategy::Interval { stall_timeout_us } => {
                if pulse_age_us(now_us, snapshot.last_pulse_us) > u64::from(stall_timeout_us) {
                    (Some(0.0), true)
                } else {
                    let rpm = rpm_from_interval(
                        snapshot.pulse_interval_us,
                        self.counts_per_rev,
                        snapshot.direction,
                    );
                    (rpm, false)
                }
            }
            RateStrategy::Delta => {
                let delta = snapshot.position.wrapping_sub(self.prev_position);
                let rpm = rpm_from_delta(delta, dt_s, self.counts_per_rev);
                if rpm.is_some() {
                    self.prev_position = snapshot.position;
                }
                (rpm, false)
            }
        };

        match fresh {
            Some(rpm) => {
                self.last_rpm = rpm;
                RateEstimate { rpm, stalled, held: false }
            }
            None => RateEstimate {
                rpm: self.last_rpm,
                stalled,
                held: true,
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn close(a: f32, b: f32) -> bool {
        (a - b).abs() < 1e-3
    }

    fn snap(position: i32, last_pulse_us: u64, pulse_interval_us: u32, direction: Direction) -> EncoderSnapshot {
        EncoderSnapshot {
            position,
            last_pulse_us,
            pulse_interval_us,
            direction,
        }
    }

    #[test]
    fn interval_formula() {
        // 1000 µs between pulses → 1000 counts/s; 500 counts/rev → 2 rev/s → 120 RPM.
        assert!(close(rpm_from_interval(1_000, 500.0, Direction::Forward).unwrap(), 120.0));
        assert!(close(rpm_from_interval(1_000, 500.0, Direction::Reverse).unwrap(), -120.0));
        assert_eq!(rpm_from_interval(0, 500.0, Direction::Forward), None);
    }

    #[test]
    fn delta_formula() {
        // 35 counts in 0.1 s at 350 counts/rev → 1 rev/s → 60 RPM.
        assert!(close(rpm_from_delta(35, 0.1, 350.0).unwrap(), 60.0));
        assert!(close(rpm_from_delta(-35, 0.1, 350.0).unwrap(), -60.0));
        assert_eq!(rpm_from_delta(35, 0.0, 350.0), None);
    }

    #[test]
    fn pulse_after_clock_read_is_fresh() {
        assert_eq!(pulse_age_us(1_000, 1_010), 0);
        assert_eq!(pulse_age_us(1_000, 400), 600);
        let past_u32 = u64::from(u32::MAX) + 100;
        assert_eq!(pulse_age_us(past_u32, u64::from(u32::MAX) - 99), 200);
    }

    #[test]
    fn interval_stall_forces_zero() {
        let mut est = RateEstimator::new(RateStrategy::Interval { stall_timeout_us: 200_000 }, 500.0);
        let running = est.estimate(&snap(10, 1_000_000, 1_000, Direction::Forward), 1_050_000, 0.05);
        assert!(close(running.rpm, 120.0));
        assert!(!running.stalled);

        let silent = est.estimate(&snap(10, 1_000_000, 1_000, Direction::Forward), 1_250_000, 0.05);
        assert!(silent.stalled);
        assert_eq!(silent.rpm, 0.0);
        assert!(!silent.held);
    }

    #[test]
    fn stall_holds_through_long_silence() {
        const MINUTE_US: u64 = 60_000_000;
        let mut est = RateEstimator::new(RateStrategy::Interval { stall_timeout_us: 200_000 }, 374.0);
        let spinning = snap(2, 1_002_000, 2_000, Direction::Forward);
        assert!(!est.estimate(&spinning, 1_010_000, 0.05).stalled);

        // Well past 2^31 and 2^32 µs without a pulse.
        for minutes in [36, 40, 72, 80] {
            let silent = est.estimate(&spinning, 1_002_000 + minutes * MINUTE_US, 0.05);
            assert!(silent.stalled, "not stalled after {minutes} min");
            assert_eq!(silent.rpm, 0.0);
        }
    }

    #[test]
    fn zero_interval_holds_previous() {
        let mut est = RateEstimator::new(RateStrategy::Interval { stall_timeout_us: 200_000 }, 500.0);
        est.estimate(&snap(2, 10_000, 1_000, Direction::Forward), 20_000, 0.05);
        let held = est.estimate(&snap(2, 10_000, 0, Direction::Forward), 30_000, 0.05);
        assert!(held.held);
        assert!(close(held.rpm, 120.0));
    }

    #[test]
    fn delta_tracks_previous_position() {
        let mut est = RateEstimator::new(RateStrategy::Delta, 350.0);
        assert!(close(est.estimate(&snap(35, 0, 0, Direction::Forward), 0, 0.1).rpm, 60.0));
        assert!(close(est.estimate(&snap(105, 0, 0, Direction::Forward), 0, 0.1).rpm, 120.0));
        // dt == 0: carry forward, keep the baseline.
        let held = est.estimate(&snap(140, 0, 0, Direction::Forward), 0, 0.0);
        assert!(held.held);
        assert!(close(held.rpm, 120.0));
        assert!(close(est.estimate(&snap(140, 0, 0, Direction::Forward), 0, 0.1).rpm, 60.0));
    }
}
