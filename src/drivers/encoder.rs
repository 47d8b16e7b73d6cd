//! Interrupt-side quadrature encoder tracking.
//!
//! `on_edge` is the whole interrupt contract: integer work, one timestamp,
//! no floats, no blocking. The control loop reads the result with
//! [`EncoderTracker::snapshot`], which copies all fields inside a critical
//! section so a concurrent edge can never tear the read.

use core::cell::Cell;

use critical_section::Mutex;

use crate::state::{Direction, EncoderSnapshot};

/// Which primary-channel edges count and how direction is derived.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum DecodeMode {
    /// Every primary change counts. Forward when both channels read the same level.
    LevelMatch,
    /// Only rising primary edges count. Forward when the secondary channel is high.
    RisingEdge,
}

impl DecodeMode {
    pub const fn trigger(self) -> EdgeTrigger {
        match self {
            Self::LevelMatch => EdgeTrigger::Any,
            Self::RisingEdge => EdgeTrigger::Rising,
        }
    }

    /// Direction for an edge, or `None` if the edge does not qualify.
    ///
    /// Single-edge decode can misread direction on the secondary channel's
    /// own transitions at very high pulse rates.
    pub const fn decode(self, primary_high: bool, secondary_high: bool) -> Option<Direction> {
        match self {
            Self::LevelMatch => {
                if primary_high == secondary_high {
                    Some(Direction::Forward)
                } else {
                    Some(Direction::Reverse)
                }
            }
            Self::RisingEdge => {
                if !primary_high {
                    None
                } else if secondary_high {
                    Some(Direction::Forward)
                } else {
                    Some(Direction::Reverse)
                }
            }
        }
    }
}

/// Primary-channel edges the edge handler waits on.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum EdgeTrigger {
    Rising,
    Any,
}

impl EdgeTrigger {
    /// Primary level to decode for an awaited edge. A rising edge is high by
    /// definition; the pin may already have fallen by the time it is read.
    pub const fn primary_level(self, sampled_high: bool) -> bool {
        match self {
            Self::Rising => true,
            Self::Any => sampled_high,
        }
    }
}

#[derive(Clone, Copy)]
struct EncoderState {
    position: i32,
    last_pulse_us: u64,
    pulse_interval_us: u32,
    direction: Direction,
    seen_pulse: bool,
}

impl EncoderState {
    const ZERO: Self = Self {
        position: 0,
        last_pulse_us: 0,
        pulse_interval_us: 0,
        direction: Direction::Forward,
        seen_pulse: false,
    };

    fn record(&mut self, direction: Direction, now_us: u64) {
        self.position = self.position.wrapping_add(direction.sign());
        if self.seen_pulse {
            let interval = now_us.saturating_sub(self.last_pulse_us);
            self.pulse_interval_us = u32::try_from(interval).unwrap_or(u32::MAX);
        }
        self.last_pulse_us = now_us;
        self.direction = direction;
        self.seen_pulse = true;
    }

    fn snapshot(&self) -> EncoderSnapshot {
        EncoderSnapshot {
            position: self.position,
            last_pulse_us: self.last_pulse_us,
            pulse_interval_us: self.pulse_interval_us,
            direction: self.direction,
        }
    }
}

/// Shared encoder state. Written from the edge handler, read by the control loop.
///
/// `new` is `const`, so the tracker can live in a `static` shared between
/// the interrupt side and the main loop.
pub struct EncoderTracker {
    mode: DecodeMode,
    state: Mutex<Cell<EncoderState>>,
}

impl EncoderTracker {
    pub const fn new(mode: DecodeMode) -> Self {
        Self {
            mode,
            state: Mutex::new(Cell::new(EncoderState::ZERO)),
        }
    }

    pub fn mode(&self) -> DecodeMode {
        self.mode
    }

    /// Edge handler. `primary_high`/`secondary_high` are the channel levels
    /// sampled right after the primary transition; `now_us` is the monotonic
    /// time since boot.
    ///
    /// Returns the counted direction, or `None` when the edge does not
    /// qualify under the decode mode.
    pub fn on_edge(&self, primary_high: bool, secondary_high: bool, now_us: u64) -> Option<Direction> {
        let direction = self.mode.decode(primary_high, secondary_high)?;
        critical_section::with(|cs| {
            let cell = self.state.borrow(cs);
            let mut state = cell.get();
            state.record(direction, now_us);
            cell.set(state);
        });
        Some(direction)
    }

    /// Copy of every field, taken with interrupts suspended.
    pub fn snapshot(&self) -> EncoderSnapshot {
        critical_section::with(|cs| self.state.borrow(cs).get().snapshot())
    }
}
