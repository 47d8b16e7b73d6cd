use motor_speed_pid::drivers::encoder::{DecodeMode, EncoderTracker};
use motor_speed_pid::drivers::motor::{MotorCommand, MotorDriver};
use motor_speed_pid::drivers::rate::RateStrategy;
use motor_speed_pid::drivers::telemetry::TelemetrySink;
use motor_speed_pid::{ControllerConfig, Direction, EncoderSnapshot, SpeedController, TelemetrySample};

#[derive(Default)]
struct MockMotor {
    command: MotorCommand,
    writes: usize,
}

impl MockMotor {
    fn signed_duty(&self) -> f32 {
        f32::from(self.command.duty) * self.command.direction.as_f32()
    }
}

impl MotorDriver for MockMotor {
    fn set_direction(&mut self, direction: Direction) {
        self.command.direction = direction;
        self.writes += 1;
    }

    fn set_duty(&mut self, duty: u16) {
        self.command.duty = duty;
        self.writes += 1;
    }
}

#[derive(Default)]
struct VecSink(Vec<TelemetrySample>);

impl TelemetrySink for VecSink {
    fn publish(&mut self, sample: &TelemetrySample) {
        self.0.push(*sample);
    }
}

fn scenario_config() -> ControllerConfig {
    ControllerConfig {
        target_rpm: 100.0,
        kp: 1.5,
        ki: 2.5,
        kd: 0.0,
        ..ControllerConfig::INTERVAL_VARIANT
    }
}

#[test]
fn first_cycle_from_rest() {
    let mut ctrl = SpeedController::new(scenario_config()).unwrap();
    let mut motor = MockMotor::default();
    let mut sink = VecSink::default();

    let report = ctrl.step(50_000, EncoderSnapshot::default(), &mut motor, &mut sink);

    assert_eq!(report.raw_rpm, 0.0);
    assert_eq!(report.filtered_rpm, 0.0);
    assert_eq!(report.pid.error, 100.0);
    assert_eq!(report.pid.output, 150.0);
    assert_eq!(report.command, MotorCommand { direction: Direction::Forward, duty: 150 });
    assert_eq!(motor.command, report.command);
    assert_eq!(
        sink.0,
        [TelemetrySample { raw_rpm: 0.0, filtered_rpm: 0.0, target_rpm: 100.0 }]
    );

    let state = ctrl.state();
    assert_eq!(state.previous_error, 100.0);
    // error * dt, dt = one configured period on the first cycle
    assert!((state.integral_error - 5.0).abs() < 1e-5);
}

#[test]
fn silence_past_stall_threshold_zeroes_speed() {
    let cfg = ControllerConfig {
        rate: RateStrategy::Interval { stall_timeout_us: 200_000 },
        sample_period_us: 50_000,
        ..scenario_config()
    };
    let encoder = EncoderTracker::new(DecodeMode::RisingEdge);
    let mut ctrl = SpeedController::new(cfg).unwrap();
    let mut motor = MockMotor::default();
    let mut sink = VecSink::default();

    // Spin at a steady 2 ms pulse interval for half a second.
    let mut now = 0u64;
    for _ in 0..10 {
        for _ in 0..25 {
            now += 2_000;
            encoder.on_edge(true, true, now);
        }
        ctrl.step(now, encoder.snapshot(), &mut motor, &mut sink);
    }
    let spinning = ctrl.state().rpm_filtered;
    assert!(spinning > 0.0);

    // 250 ms without a pulse.
    let last_pulse = now;
    let mut previous = spinning;
    let mut stalled_report = None;
    while now - last_pulse < 250_000 {
        now += 50_000;
        let report = ctrl.step(now, encoder.snapshot(), &mut motor, &mut sink);
        assert!(report.filtered_rpm.is_finite());
        assert!(report.filtered_rpm >= 0.0);
        if now - last_pulse > 200_000 {
            assert!(report.stalled);
            assert_eq!(report.raw_rpm, 0.0);
            assert!(report.filtered_rpm < previous);
            stalled_report = Some(report);
        }
        previous = report.filtered_rpm;
    }
    let report = stalled_report.expect("stall window was crossed");
    assert_eq!(report.raw_rpm, 0.0);
    assert_eq!(sink.0.last().map(|s| s.raw_rpm), Some(0.0));
}

#[test]
fn stopped_motor_stays_at_zero_for_hours() {
    let encoder = EncoderTracker::new(DecodeMode::RisingEdge);
    let mut ctrl = SpeedController::new(scenario_config()).unwrap();
    let mut motor = MockMotor::default();
    let mut sink = VecSink::default();

    encoder.on_edge(true, true, 1_000_000);
    encoder.on_edge(true, true, 1_002_000);
    let snapshot = encoder.snapshot();
    ctrl.step(1_010_000, snapshot, &mut motor, &mut sink);

    // One cycle a minute for two hours, past both 2^31 and 2^32 µs.
    let mut now = 1_010_000u64;
    for _ in 0..120 {
        now += 60_000_000;
        let report = ctrl.step(now, snapshot, &mut motor, &mut sink);
        assert!(report.stalled, "phantom speed at t={now}us");
        assert_eq!(report.raw_rpm, 0.0);
    }
}

#[test]
fn zero_dt_skips_the_cycle() {
    let mut ctrl = SpeedController::new(scenario_config()).unwrap();
    let mut motor = MockMotor::default();
    let mut sink = VecSink::default();

    let first = ctrl.step(10_000, EncoderSnapshot::default(), &mut motor, &mut sink);
    let writes = motor.writes;
    let state = ctrl.state();

    let second = ctrl.step(10_000, EncoderSnapshot::default(), &mut motor, &mut sink);
    assert!(second.skipped);
    assert_eq!(second.command, first.command);
    assert_eq!(second.filtered_rpm, first.filtered_rpm);
    assert_eq!(motor.writes, writes);
    assert_eq!(ctrl.state(), state);
    // Telemetry still gets its line for the period.
    assert_eq!(sink.0.len(), 2);
}

#[test]
fn stop_drives_outputs_to_zero() {
    let mut ctrl = SpeedController::new(scenario_config()).unwrap();
    let mut motor = MockMotor {
        command: MotorCommand { direction: Direction::Reverse, duty: 99 },
        writes: 0,
    };
    ctrl.stop(&mut motor);
    assert_eq!(motor.command, MotorCommand::STOP);
    assert_eq!(ctrl.last_command(), MotorCommand::STOP);
}

#[test]
fn invalid_config_is_rejected() {
    let cfg = ControllerConfig { alpha: 1.5, ..ControllerConfig::default() };
    assert!(SpeedController::new(cfg).is_err());
}

/// First-order motor: `d(rpm)/dt = (gain * signed_duty - rpm) / tau`, with an
/// encoder that emits `counts_per_rev` edges per revolution.
struct SimMotor {
    rpm: f32,
    counts: f64,
    gain: f32,
    tau_s: f32,
}

impl SimMotor {
    fn advance(&mut self, signed_duty: f32, dt_s: f32, counts_per_rev: f32) {
        self.rpm += (self.gain * signed_duty - self.rpm) * dt_s / self.tau_s;
        self.counts += f64::from(self.rpm / 60.0 * counts_per_rev * dt_s);
    }
}

#[test]
fn delta_loop_settles_on_target() {
    let cfg = ControllerConfig {
        target_rpm: 100.0,
        kp: 0.5,
        ki: 2.0,
        kd: 0.0,
        alpha: 0.3,
        prefilter: None,
        sample_period_us: 50_000,
        ..ControllerConfig::DELTA_VARIANT
    };
    let mut ctrl = SpeedController::new(cfg).unwrap();
    let mut motor = MockMotor::default();
    let mut sink = VecSink::default();
    let mut plant = SimMotor { rpm: 0.0, counts: 0.0, gain: 1.0, tau_s: 0.2 };

    let dt_s = cfg.sample_period_s();
    let mut now = 0u64;
    for _ in 0..600 {
        plant.advance(motor.signed_duty(), dt_s, cfg.counts_per_rev);
        now += u64::from(cfg.sample_period_us);
        let snapshot = EncoderSnapshot {
            position: plant.counts.floor() as i32,
            ..EncoderSnapshot::default()
        };
        ctrl.step(now, snapshot, &mut motor, &mut sink);
    }

    let tail = &sink.0[sink.0.len() - 100..];
    let mean = tail.iter().map(|s| s.filtered_rpm).sum::<f32>() / tail.len() as f32;
    assert!((mean - 100.0).abs() < 2.0, "settled at {mean}");
    assert!((plant.rpm - 100.0).abs() < 5.0, "plant at {}", plant.rpm);
}
