use embassy_executor::task;
use embassy_stm32::exti::ExtiInput;
use embassy_stm32::gpio::Input;
use embassy_stm32::peripherals::{PB6, PB7};
use embassy_time::Instant;

use motor_speed_pid::drivers::encoder::{EdgeTrigger, EncoderTracker};

/// Encoder edge handler. Runs on the interrupt executor so it preempts the
/// control loop; each wake does one timestamp read and one integer update.
#[task]
pub async fn encoder_task(
    mut channel_a: ExtiInput<'static, PB6>,
    channel_b: Input<'static, PB7>,
    tracker: &'static EncoderTracker,
) {
    let trigger = tracker.mode().trigger();
    loop {
        match trigger {
            EdgeTrigger::Rising => channel_a.wait_for_rising_edge().await,
            EdgeTrigger::Any => channel_a.wait_for_any_edge().await,
        }
        let now_us = Instant::now().as_micros();
        let primary_high = trigger.primary_level(channel_a.is_high());
        tracker.on_edge(primary_high, channel_b.is_high(), now_us);
    }
}
