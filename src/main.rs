#![no_std]
#![no_main]

mod board;
mod tasks;
mod usb;

use defmt::{info, unwrap};
use embassy_executor::{InterruptExecutor, Spawner};
use embassy_stm32::exti::ExtiInput;
use embassy_stm32::gpio::{Input, Level, Output, OutputType, Pull, Speed};
use embassy_stm32::interrupt;
use embassy_stm32::interrupt::{InterruptExt, Priority};
use embassy_stm32::time::khz;
use embassy_stm32::timer::simple_pwm::{PwmPin, SimplePwm};
use embassy_stm32::timer::CountingMode;
use embassy_sync::blocking_mutex::raw::CriticalSectionRawMutex;
use embassy_sync::channel::Channel;
use embassy_time::{Duration, Timer};
use {defmt_rtt as _, panic_probe as _};

use motor_speed_pid::drivers::encoder::EncoderTracker;
use motor_speed_pid::{ControllerConfig, SpeedController, TelemetrySample};

use crate::board::{Board, MotorOutputs};

// ── Configuration ─────────────────────────────────────────────────────────────

const CONFIG: ControllerConfig = ControllerConfig::INTERVAL_VARIANT;
/// Motor driver PWM carrier.
const PWM_FREQ_KHZ: u32 = 20;

// ── Shared state ──────────────────────────────────────────────────────────────

/// Written by the encoder task (interrupt priority), read by the control loop.
static ENCODER: EncoderTracker = EncoderTracker::new(CONFIG.decode);

//  Cap=1: telemetry only ever wants the latest sample.
static TELEMETRY_CHAN: Channel<CriticalSectionRawMutex, TelemetrySample, 1> = Channel::new();

// ── Edge-handler executor ─────────────────────────────────────────────────────
//  UART5 is unused on this board; its vector drives the high-priority executor.

static EXECUTOR_HIGH: InterruptExecutor = InterruptExecutor::new();

#[interrupt]
unsafe fn UART5() {
    EXECUTOR_HIGH.on_interrupt()
}

// ── Main ──────────────────────────────────────────────────────────────────────

#[embassy_executor::main]
async fn main(spawner: Spawner) {
    // 1. Clocks
    let board = Board::init();
    let p = board.p;
    info!("motor-speed-pid starting");

    // 2. USB CDC-ACM telemetry port
    let (usb_dev, usb_serial) = usb::init(p.USB_OTG_FS, p.PA12, p.PA11);
    unwrap!(spawner.spawn(usb::usb_task(usb_dev)));

    // 3. Motor outputs, held at forward / zero duty
    let dir = Output::new(p.PB5, Level::High, Speed::Low);
    let pwm = SimplePwm::new(
        p.TIM3,
        None,
        None,
        Some(PwmPin::new_ch3(p.PB0, OutputType::PushPull)),
        None,
        khz(PWM_FREQ_KHZ),
        CountingMode::EdgeAlignedUp,
    );
    let mut motor = MotorOutputs::new(dir, pwm, CONFIG.max_duty);

    let mut controller = unwrap!(SpeedController::new(CONFIG));
    controller.stop(&mut motor);

    // 4. Let the motor and driver settle before arming the encoder
    Timer::after(Duration::from_millis(u64::from(CONFIG.settle_ms))).await;

    // 5. Encoder A (PB6, EXTI6) / B (PB7) on the interrupt executor
    let channel_a = ExtiInput::new(Input::new(p.PB6, Pull::Up), p.EXTI6);
    let channel_b = Input::new(p.PB7, Pull::Up);
    interrupt::UART5.set_priority(Priority::P6);
    let high_spawner = EXECUTOR_HIGH.start(interrupt::UART5);
    unwrap!(high_spawner.spawn(tasks::encoder_task::encoder_task(channel_a, channel_b, &ENCODER)));

    // 6. Control loop and telemetry
    unwrap!(spawner.spawn(tasks::control_task::control_task(
        motor,
        controller,
        &ENCODER,
        TELEMETRY_CHAN.sender(),
    )));
    unwrap!(spawner.spawn(tasks::telemetry_task::telemetry_task(
        usb_serial,
        CONFIG.telemetry,
        TELEMETRY_CHAN.receiver(),
    )));
    info!("control loop running, target {} rpm", CONFIG.target_rpm);

    // 7. Heartbeat LED @ 1 Hz
    let mut led = Output::new(p.PC13, Level::High, Speed::Low);
    loop {
        led.toggle();
        Timer::after(Duration::from_millis(500)).await;
    }
}
