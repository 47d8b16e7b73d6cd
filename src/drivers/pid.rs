use micromath::F32Ext;

#[derive(Clone, Copy, Debug, Default, PartialEq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct PidOutput {
    pub error: f32,
    pub derivative: f32,
    /// `kp·e + ki·∫e + kd·de/dt` before any clamping.
    pub output: f32,
    /// `|output|` exceeded the actuator range; the integral was frozen.
    pub saturated: bool,
}

/// Speed PID with conditional-integration anti-windup.
///
/// The output uses the integral accumulated up to the previous cycle. The
/// current error is then folded in only if the unclamped output fits the
/// actuator range, so the accumulator stops growing while saturated.
#[derive(Clone, Copy, Debug)]
pub struct SpeedPid {
    kp: f32,
    ki: f32,
    kd: f32,
    output_limit: f32,
    integral: f32,
    previous_error: f32,
}

impl SpeedPid {
    pub fn new(kp: f32, ki: f32, kd: f32, output_limit: f32) -> Self {
        Self {
            kp,
            ki,
            kd,
            output_limit: output_limit.abs(),
            integral: 0.0,
            previous_error: 0.0,
        }
    }

    pub fn integral(&self) -> f32 {
        self.integral
    }

    pub fn previous_error(&self) -> f32 {
        self.previous_error
    }

    /// `dt` in seconds. A non-positive `dt` drops the derivative and skips integration.
    pub fn update(&mut self, setpoint: f32, measured: f32, dt: f32) -> PidOutput {
        let error = setpoint - measured;
        let derivative = if dt > 0.0 {
            (error - self.previous_error) / dt
        } else {
            0.0
        };

        let output = self.kp * error + self.ki * self.integral + self.kd * derivative;
        let saturated = !output.is_finite() || output.abs() > self.output_limit;

        if !saturated && dt > 0.0 && self.ki != 0.0 {
            self.integral += error * dt;
        }
        self.previous_error = error;

        PidOutput {
            error,
            derivative,
            output,
            saturated,
        }
    }
}
