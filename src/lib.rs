//! Closed-loop speed control for a single brushed DC motor.
//!
//! A quadrature encoder is tracked from interrupt context
//! ([`drivers::encoder::EncoderTracker`]); a fixed-period loop
//! ([`controller::SpeedController`]) turns encoder snapshots into an RPM
//! estimate, filters it, runs a PID against the target speed, and drives a
//! direction + PWM output pair.
//!
//! Everything in this crate is `no_std` and hardware-free. The embedded
//! binary (`--features firmware`) binds it to an STM32F405 through embassy.

#![cfg_attr(not(test), no_std)]

#[macro_use]
mod fmt;

pub mod config;
pub mod controller;
pub mod drivers;
pub mod state;

pub use config::{ConfigError, ControllerConfig};
pub use controller::{CycleReport, SpeedController};
pub use state::{ControllerState, Direction, EncoderSnapshot, TelemetrySample};
