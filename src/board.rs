use embassy_stm32::gpio::{Level, Output};
use embassy_stm32::peripherals::{PB5, TIM3};
use embassy_stm32::rcc::*;
use embassy_stm32::time::Hertz as TimeHertz;
use embassy_stm32::timer::simple_pwm::SimplePwm;
use embassy_stm32::timer::Channel as PwmChannel;
use embassy_stm32::Config;

use motor_speed_pid::drivers::motor::{scale_duty, MotorDriver};
use motor_speed_pid::Direction;

pub struct Board {
    pub p: embassy_stm32::Peripherals,
}

impl Board {
    /// 8 MHz HSE → 168 MHz SYSCLK, 48 MHz for USB.
    pub fn init() -> Self {
        let mut config = Config::default();
        config.rcc.hse = Some(Hse {
            freq: TimeHertz(8_000_000),
            mode: HseMode::Oscillator,
        });
        config.rcc.pll_src = PllSource::HSE;
        config.rcc.pll = Some(Pll {
            prediv: PllPreDiv::DIV4,
            mul: PllMul::MUL168,
            divp: Some(PllPDiv::DIV2),
            divq: Some(PllQDiv::DIV7),
            divr: None,
        });
        config.rcc.sys = Sysclk::PLL1_P;
        config.rcc.ahb_pre = AHBPrescaler::DIV1;
        config.rcc.apb1_pre = APBPrescaler::DIV4;
        config.rcc.apb2_pre = APBPrescaler::DIV2;

        Self {
            p: embassy_stm32::init(config),
        }
    }
}

// ── Motor driver outputs ──────────────────────────────────────────────────────
//  DIR on PB5 (high = forward), PWM on TIM3_CH3 / PB0.

pub const PWM_CHANNEL: PwmChannel = PwmChannel::Ch3;

pub struct MotorOutputs {
    dir: Output<'static, PB5>,
    pwm: SimplePwm<'static, TIM3>,
    max_duty: u16,
}

impl MotorOutputs {
    /// `max_duty` is the controller's logical ceiling; it is rescaled to the
    /// timer's compare range on every write.
    pub fn new(dir: Output<'static, PB5>, mut pwm: SimplePwm<'static, TIM3>, max_duty: u16) -> Self {
        pwm.set_duty(PWM_CHANNEL, 0);
        pwm.enable(PWM_CHANNEL);
        Self { dir, pwm, max_duty }
    }
}

impl MotorDriver for MotorOutputs {
    fn set_direction(&mut self, direction: Direction) {
        let level = match direction {
            Direction::Forward => Level::High,
            Direction::Reverse => Level::Low,
        };
        self.dir.set_level(level);
    }

    fn set_duty(&mut self, duty: u16) {
        let compare = scale_duty(duty, self.max_duty, self.pwm.get_max_duty());
        self.pwm.set_duty(PWM_CHANNEL, compare);
    }
}
