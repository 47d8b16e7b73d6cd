//! Compiled-in controller configuration.
//!
//! Two presets cover the observed tunings: count-delta estimation with a
//! two-stage filter, and pulse-interval estimation with stall detection.

use core::fmt;

use crate::drivers::encoder::DecodeMode;
use crate::drivers::filter::LowPassCoefficients;
use crate::drivers::rate::RateStrategy;
use crate::drivers::telemetry::TelemetryFormat;

#[derive(Clone, Copy, Debug, PartialEq)]
pub struct ControllerConfig {
    /// Encoder counts per output shaft revolution (per counted edge type).
    pub counts_per_rev: f32,
    pub target_rpm: f32,
    pub kp: f32,
    pub ki: f32,
    pub kd: f32,
    /// Exponential smoothing coefficient, strictly inside (0, 1).
    pub alpha: f32,
    /// Optional low-pass stage ahead of the smoother.
    pub prefilter: Option<LowPassCoefficients>,
    pub sample_period_us: u32,
    /// PWM ceiling in logical duty units.
    pub max_duty: u16,
    pub rate: RateStrategy,
    pub decode: DecodeMode,
    /// Outputs stay at zero and the encoder is not armed until this has elapsed.
    pub settle_ms: u32,
    pub telemetry: TelemetryFormat,
}

impl ControllerConfig {
    pub const DELTA_VARIANT: Self = Self {
        counts_per_rev: 349.2,
        target_rpm: 120.0,
        kp: 0.5,
        ki: 2.0,
        kd: 0.001,
        alpha: 0.3,
        prefilter: Some(LowPassCoefficients::HZ25_AT_1KHZ),
        sample_period_us: 100_000,
        max_duty: 255,
        rate: RateStrategy::Delta,
        decode: DecodeMode::LevelMatch,
        settle_ms: 1_000,
        telemetry: TelemetryFormat::Plain,
    };

    pub const INTERVAL_VARIANT: Self = Self {
        counts_per_rev: 374.0,
        target_rpm: 100.0,
        kp: 1.5,
        ki: 2.5,
        kd: 0.0,
        alpha: 0.2,
        prefilter: None,
        sample_period_us: 50_000,
        max_duty: 255,
        rate: RateStrategy::Interval {
            stall_timeout_us: 200_000,
        },
        decode: DecodeMode::RisingEdge,
        settle_ms: 1_000,
        telemetry: TelemetryFormat::Labeled,
    };

    pub fn sample_period_s(&self) -> f32 {
        self.sample_period_us as f32 / 1_000_000.0
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if !(self.counts_per_rev.is_finite() && self.counts_per_rev > 0.0) {
            return Err(ConfigError::CountsPerRev);
        }
        if !self.target_rpm.is_finite() {
            return Err(ConfigError::TargetRpm);
        }
        if !(self.kp.is_finite() && self.ki.is_finite() && self.kd.is_finite()) {
            return Err(ConfigError::Gain);
        }
        if !(self.alpha > 0.0 && self.alpha < 1.0) {
            return Err(ConfigError::Alpha);
        }
        if let Some(c) = self.prefilter {
            let finite = c.a1.is_finite() && c.b0.is_finite() && c.b1.is_finite();
            // |a1| < 1 keeps the recursive stage stable.
            if !finite || !(c.a1 > -1.0 && c.a1 < 1.0) {
                return Err(ConfigError::Prefilter);
            }
        }
        if self.sample_period_us == 0 {
            return Err(ConfigError::SamplePeriod);
        }
        if self.max_duty == 0 {
            return Err(ConfigError::MaxDuty);
        }
        if let RateStrategy::Interval { stall_timeout_us } = self.rate {
            if stall_timeout_us == 0 {
                return Err(ConfigError::StallTimeout);
            }
        }
        Ok(())
    }
}

impl Default for ControllerConfig {
    fn default() -> Self {
        Self::INTERVAL_VARIANT
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum ConfigError {
    CountsPerRev,
    TargetRpm,
    Gain,
    Alpha,
    Prefilter,
    SamplePeriod,
    MaxDuty,
    StallTimeout,
}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let msg = match self {
            Self::CountsPerRev => "counts per revolution must be positive",
            Self::TargetRpm => "target rpm must be finite",
            Self::Gain => "pid gains must be finite",
            Self::Alpha => "smoothing alpha must be in (0, 1)",
            Self::Prefilter => "prefilter must be finite with |a1| < 1",
            Self::SamplePeriod => "sample period must be non-zero",
            Self::MaxDuty => "pwm ceiling must be non-zero",
            Self::StallTimeout => "stall timeout must be non-zero",
        };
        f.write_str(msg)
    }
}
