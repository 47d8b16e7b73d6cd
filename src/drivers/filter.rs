/// Exponential smoothing: `y = α·x + (1 − α)·y_prev`.
///
/// Starts from zero rather than the first sample, so a motor at rest reads
/// zero from the first cycle.
#[derive(Clone, Copy, Debug)]
pub struct ExpSmoother {
    alpha: f32,
    state: f32,
}

impl ExpSmoother {
    pub fn new(alpha: f32) -> Self {
        Self {
            alpha: alpha.clamp(0.0, 1.0),
            state: 0.0,
        }
    }

    /// Alpha from a cutoff frequency (PT1 discretisation).
    pub fn from_cutoff(cutoff_hz: f32, sample_hz: f32) -> Self {
        let dt = 1.0 / sample_hz;
        let rc = 1.0 / (2.0 * core::f32::consts::PI * cutoff_hz);
        Self::new(dt / (rc + dt))
    }

    pub fn alpha(&self) -> f32 {
        self.alpha
    }

    /// Non-finite input leaves the state untouched.
    pub fn filter(&mut self, input: f32) -> f32 {
        if input.is_finite() {
            self.state = self.alpha * input + (1.0 - self.alpha) * self.state;
        }
        self.state
    }

    pub fn value(&self) -> f32 {
        self.state
    }
}

/// Fixed-coefficient first order low-pass:
/// `y = a1·y_prev + b0·x + b1·x_prev`.
#[derive(Clone, Copy, Debug, PartialEq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct LowPassCoefficients {
    pub a1: f32,
    pub b0: f32,
    pub b1: f32,
}

impl LowPassCoefficients {
    /// 25 Hz cutoff at a 1 kHz sample rate, rounded so that
    /// `b0 + b1 == 1 - a1` (unity DC gain).
    pub const HZ25_AT_1KHZ: Self = Self {
        a1: 0.854,
        b0: 0.073,
        b1: 0.073,
    };

    /// Bilinear (Tustin) discretisation of `1 / (1 + s/ωc)`. DC gain is exactly one.
    pub fn from_cutoff(cutoff_hz: f32, sample_hz: f32) -> Self {
        let k = 2.0 * core::f32::consts::PI * cutoff_hz / sample_hz;
        let b = k / (2.0 + k);
        Self {
            a1: (2.0 - k) / (2.0 + k),
            b0: b,
            b1: b,
        }
    }

    pub fn dc_gain(&self) -> f32 {
        (self.b0 + self.b1) / (1.0 - self.a1)
    }
}

#[derive(Clone, Copy, Debug)]
pub struct LowPassFilter {
    coeffs: LowPassCoefficients,
    prev_input: f32,
    prev_output: f32,
}

impl LowPassFilter {
    pub fn new(coeffs: LowPassCoefficients) -> Self {
        Self {
            coeffs,
            prev_input: 0.0,
            prev_output: 0.0,
        }
    }

    pub fn filter(&mut self, input: f32) -> f32 {
        if !input.is_finite() {
            return self.prev_output;
        }
        let c = self.coeffs;
        let output = c.a1 * self.prev_output + c.b0 * input + c.b1 * self.prev_input;
        self.prev_input = input;
        self.prev_output = output;
        output
    }

    pub fn prev_input(&self) -> f32 {
        self.prev_input
    }
}

/// RPM filter cascade: optional low-pass stage, then exponential smoothing.
#[derive(Clone, Copy, Debug)]
pub struct RpmFilter {
    pre: Option<LowPassFilter>,
    smooth: ExpSmoother,
}

impl RpmFilter {
    pub fn new(alpha: f32, pre: Option<LowPassCoefficients>) -> Self {
        Self {
            pre: pre.map(LowPassFilter::new),
            smooth: ExpSmoother::new(alpha),
        }
    }

    pub fn filter(&mut self, raw_rpm: f32) -> f32 {
        let staged = match self.pre.as_mut() {
            Some(lpf) => lpf.filter(raw_rpm),
            None => raw_rpm,
        };
        self.smooth.filter(staged)
    }

    pub fn value(&self) -> f32 {
        self.smooth.value()
    }

    /// Last raw input seen by the pre-filter (0 without a pre-filter).
    pub fn previous_raw(&self) -> f32 {
        self.pre.map_or(0.0, |lpf| lpf.prev_input())
    }
}
