use embassy_executor::task;
use embassy_sync::blocking_mutex::raw::CriticalSectionRawMutex;
use embassy_sync::channel::Receiver;

use motor_speed_pid::drivers::telemetry::{format_line, TelemetryFormat};
use motor_speed_pid::TelemetrySample;

use crate::usb::{UsbSerial, MAX_PACKET_SIZE};

/// Writes one line per control period to the USB serial port while a host
/// has it open (DTR set). Samples arriving with no host attached are dropped.
#[task]
pub async fn telemetry_task(
    mut usb_serial: UsbSerial<'static>,
    format: TelemetryFormat,
    telemetry_rx: Receiver<'static, CriticalSectionRawMutex, TelemetrySample, 1>,
) {
    loop {
        let sample = telemetry_rx.receive().await;
        if !usb_serial.dtr() {
            continue;
        }
        let line = format_line(&sample, format);
        let _ = usb_serial.write_packet(line.as_bytes()).await;
        if line.len() == usize::from(MAX_PACKET_SIZE) {
            // A full packet does not end the transfer on its own.
            let _ = usb_serial.write_packet(&[]).await;
        }
    }
}
