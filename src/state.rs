//! Plain data shared between the encoder, the control loop and telemetry.
//!
//! All types are `Copy` so they can cross a critical section or a channel
//! by value.

// ── Direction ─────────────────────────────────────────────────────────────────

/// Rotation (or drive) direction. Forward is the positive sense.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum Direction {
    #[default]
    Forward,
    Reverse,
}

impl Direction {
    /// `+1` for forward, `-1` for reverse.
    pub const fn sign(self) -> i32 {
        match self {
            Self::Forward => 1,
            Self::Reverse => -1,
        }
    }

    pub fn as_f32(self) -> f32 {
        self.sign() as f32
    }

    /// Zero and positive values map to forward.
    pub fn from_output(value: f32) -> Self {
        if value < 0.0 {
            Self::Reverse
        } else {
            Self::Forward
        }
    }
}

// ── Encoder ───────────────────────────────────────────────────────────────────

/// Consistent copy of the encoder state, taken by the control loop.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct EncoderSnapshot {
    /// Signed edge count since boot.
    pub position: i32,
    /// Timestamp of the latest qualifying edge (µs since boot).
    pub last_pulse_us: u64,
    /// Time between the two latest qualifying edges; 0 until two edges are
    /// seen, `u32::MAX` past ~71 minutes.
    pub pulse_interval_us: u32,
    /// Sign of the latest increment.
    pub direction: Direction,
}

// ── Controller ────────────────────────────────────────────────────────────────

/// Read-only view of the speed controller's internal state.
#[derive(Clone, Copy, Debug, Default, PartialEq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct ControllerState {
    pub rpm_raw: f32,
    pub rpm_filtered: f32,
    /// Previous input of the pre-filter stage (raw RPM of the last cycle).
    pub rpm_previous: f32,
    pub integral_error: f32,
    pub previous_error: f32,
    pub target_rpm: f32,
}

// ── Telemetry ─────────────────────────────────────────────────────────────────

/// One line of telemetry, published once per control period.
#[derive(Clone, Copy, Debug, Default, PartialEq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct TelemetrySample {
    pub raw_rpm: f32,
    pub filtered_rpm: f32,
    pub target_rpm: f32,
}
