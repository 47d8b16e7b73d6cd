//! Direction + PWM actuator model.

use micromath::F32Ext;

use crate::state::Direction;

/// One actuator command: a direction and a duty in `0..=max_duty`.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct MotorCommand {
    pub direction: Direction,
    pub duty: u16,
}

impl MotorCommand {
    pub const STOP: Self = Self {
        direction: Direction::Forward,
        duty: 0,
    };

    /// Direction from the sign of `output` (zero is forward), magnitude
    /// clamped to `max_duty` and truncated. NaN maps to [`Self::STOP`].
    pub fn from_output(output: f32, max_duty: u16) -> Self {
        if output.is_nan() {
            return Self::STOP;
        }
        let magnitude = output.abs().min(max_duty as f32);
        Self {
            direction: Direction::from_output(output),
            duty: magnitude as u16,
        }
    }
}

/// Hardware side of the actuator.
///
/// Implementors only provide the two pin writes; [`MotorDriver::apply`]
/// fixes the order (direction first, then duty).
pub trait MotorDriver {
    fn set_direction(&mut self, direction: Direction);

    /// `duty` is in the logical range `0..=max_duty` of the controller config.
    fn set_duty(&mut self, duty: u16);

    fn apply(&mut self, command: MotorCommand) {
        self.set_direction(command.direction);
        self.set_duty(command.duty);
    }
}

/// Rescale a logical duty (`0..=max_duty`) to a timer compare value (`0..=timer_max`).
pub fn scale_duty(duty: u16, max_duty: u16, timer_max: u16) -> u16 {
    if max_duty == 0 {
        return 0;
    }
    let duty = u32::from(duty.min(max_duty));
    let scaled = duty * u32::from(timer_max) / u32::from(max_duty);
    scaled as u16
}
