//! Fixed-period speed loop: sample → estimate → filter → PID → actuate → observe.

use crate::config::{ConfigError, ControllerConfig};
use crate::drivers::filter::RpmFilter;
use crate::drivers::motor::{MotorCommand, MotorDriver};
use crate::drivers::pid::{PidOutput, SpeedPid};
use crate::drivers::rate::RateEstimator;
use crate::drivers::telemetry::TelemetrySink;
use crate::state::{ControllerState, EncoderSnapshot, TelemetrySample};

/// What one call to [`SpeedController::step`] did.
#[derive(Clone, Copy, Debug, Default, PartialEq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct CycleReport {
    pub dt_s: f32,
    pub raw_rpm: f32,
    pub filtered_rpm: f32,
    pub pid: PidOutput,
    pub command: MotorCommand,
    pub stalled: bool,
    /// `dt` was zero: nothing was recomputed and the actuator was left alone.
    pub skipped: bool,
}

pub struct SpeedController {
    config: ControllerConfig,
    estimator: RateEstimator,
    filter: RpmFilter,
    pid: SpeedPid,
    last_sample_us: Option<u64>,
    raw_rpm: f32,
    last_pid: PidOutput,
    last_command: MotorCommand,
    stalled: bool,
}

impl SpeedController {
    pub fn new(config: ControllerConfig) -> Result<Self, ConfigError> {
        config.validate()?;
        info!(
            "speed controller: target={} rpm kp={} ki={} kd={} period={}us",
            config.target_rpm,
            config.kp,
            config.ki,
            config.kd,
            config.sample_period_us
        );
        Ok(Self {
            config,
            estimator: RateEstimator::new(config.rate, config.counts_per_rev),
            filter: RpmFilter::new(config.alpha, config.prefilter),
            pid: SpeedPid::new(config.kp, config.ki, config.kd, f32::from(config.max_duty)),
            last_sample_us: None,
            raw_rpm: 0.0,
            last_pid: PidOutput::default(),
            last_command: MotorCommand::STOP,
            stalled: false,
        })
    }

    pub fn config(&self) -> &ControllerConfig {
        &self.config
    }

    pub fn last_command(&self) -> MotorCommand {
        self.last_command
    }

    pub fn state(&self) -> ControllerState {
        ControllerState {
            rpm_raw: self.raw_rpm,
            rpm_filtered: self.filter.value(),
            rpm_previous: self.filter.previous_raw(),
            integral_error: self.pid.integral(),
            previous_error: self.pid.previous_error(),
            target_rpm: self.config.target_rpm,
        }
    }

    /// Drive the outputs to forward / zero duty.
    pub fn stop<M: MotorDriver>(&mut self, motor: &mut M) {
        motor.apply(MotorCommand::STOP);
        self.last_command = MotorCommand::STOP;
    }

    /// Run one control period.
    ///
    /// `now_us` is the loop's monotonic clock (µs since boot) and `snapshot` the
    /// encoder state read at the same point. The first call uses the
    /// configured period as `dt`.
    pub fn step<M, S>(&mut self, now_us: u64, snapshot: EncoderSnapshot, motor: &mut M, sink: &mut S) -> CycleReport
    where
        M: MotorDriver,
        S: TelemetrySink,
    {
        let dt_us = match self.last_sample_us {
            Some(prev) => now_us.saturating_sub(prev),
            None => u64::from(self.config.sample_period_us),
        };
        self.last_sample_us = Some(now_us);

        if dt_us == 0 {
            debug!("control cycle skipped: dt == 0");
            let report = CycleReport {
                dt_s: 0.0,
                raw_rpm: self.raw_rpm,
                filtered_rpm: self.filter.value(),
                pid: self.last_pid,
                command: self.last_command,
                stalled: self.stalled,
                skipped: true,
            };
            self.publish(&report, sink);
            return report;
        }
        let dt_s = dt_us as f32 / 1_000_000.0;

        let estimate = self.estimator.estimate(&snapshot, now_us, dt_s);
        if estimate.stalled != self.stalled {
            if estimate.stalled {
                info!("encoder silent, speed forced to zero");
            } else {
                info!("encoder pulses resumed");
            }
            self.stalled = estimate.stalled;
        }
        self.raw_rpm = estimate.rpm;

        let filtered = self.filter.filter(estimate.rpm);
        let pid = self.pid.update(self.config.target_rpm, filtered, dt_s);
        if pid.saturated && !self.last_pid.saturated {
            debug!("output saturated ({}), integral frozen", pid.output);
        }
        self.last_pid = pid;

        let command = MotorCommand::from_output(pid.output, self.config.max_duty);
        motor.apply(command);
        self.last_command = command;

        trace!(
            "dt={} raw={} filt={} out={} duty={}",
            dt_s,
            estimate.rpm,
            filtered,
            pid.output,
            command.duty
        );

        let report = CycleReport {
            dt_s,
            raw_rpm: estimate.rpm,
            filtered_rpm: filtered,
            pid,
            command,
            stalled: estimate.stalled,
            skipped: false,
        };
        self.publish(&report, sink);
        report
    }

    fn publish<S: TelemetrySink>(&self, report: &CycleReport, sink: &mut S) {
        sink.publish(&TelemetrySample {
            raw_rpm: report.raw_rpm,
            filtered_rpm: report.filtered_rpm,
            target_rpm: self.config.target_rpm,
        });
    }
}
