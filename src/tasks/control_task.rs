use embassy_executor::task;
use embassy_sync::blocking_mutex::raw::CriticalSectionRawMutex;
use embassy_sync::channel::Sender;
use embassy_time::{Duration, Instant, Ticker};

use motor_speed_pid::drivers::encoder::EncoderTracker;
use motor_speed_pid::drivers::telemetry::TelemetrySink;
use motor_speed_pid::{SpeedController, TelemetrySample};

use crate::board::MotorOutputs;

pub type TelemetrySender = Sender<'static, CriticalSectionRawMutex, TelemetrySample, 1>;

/// Hands samples to the telemetry task. A full channel drops the sample;
/// the loop never waits on USB.
struct ChannelSink(TelemetrySender);

impl TelemetrySink for ChannelSink {
    fn publish(&mut self, sample: &TelemetrySample) {
        let _ = self.0.try_send(*sample);
    }
}

/// Speed loop, one step per configured sample period.
#[task]
pub async fn control_task(
    mut motor: MotorOutputs,
    mut controller: SpeedController,
    tracker: &'static EncoderTracker,
    telemetry_tx: TelemetrySender,
) {
    let mut sink = ChannelSink(telemetry_tx);
    let period = Duration::from_micros(u64::from(controller.config().sample_period_us));
    let mut ticker = Ticker::every(period);

    loop {
        ticker.next().await;

        let now_us = Instant::now().as_micros();
        let snapshot = tracker.snapshot();
        controller.step(now_us, snapshot, &mut motor, &mut sink);
    }
}
