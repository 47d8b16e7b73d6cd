use core::fmt::Write;

use crate::state::TelemetrySample;

/// Longest line; one full-speed CDC-ACM packet.
pub const MAX_LINE_LEN: usize = 64;

pub type TelemetryLine = heapless::String<MAX_LINE_LEN>;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum TelemetryFormat {
    /// `raw filtered target`
    Plain,
    /// `raw:…,filtered:…,target:…`, understood by serial plotters as named series.
    Labeled,
}

/// Destination for per-cycle telemetry. Publishing must not block the loop.
pub trait TelemetrySink {
    fn publish(&mut self, sample: &TelemetrySample);
}

/// Discards every sample.
pub struct NullSink;

impl TelemetrySink for NullSink {
    fn publish(&mut self, _sample: &TelemetrySample) {}
}

/// Render one CRLF-terminated line of at most [`MAX_LINE_LEN`] bytes.
/// Values too long for the buffer are cut off, the terminator is kept.
pub fn format_line(sample: &TelemetrySample, format: TelemetryFormat) -> TelemetryLine {
    let mut line = TelemetryLine::new();
    let written = match format {
        TelemetryFormat::Plain => write!(
            line,
            "{:.2} {:.2} {:.2}\r\n",
            sample.raw_rpm, sample.filtered_rpm, sample.target_rpm
        ),
        TelemetryFormat::Labeled => write!(
            line,
            "raw:{:.2},filtered:{:.2},target:{:.2}\r\n",
            sample.raw_rpm, sample.filtered_rpm, sample.target_rpm
        ),
    };
    if written.is_err() {
        line.truncate(MAX_LINE_LEN - 2);
        let _ = line.push_str("\r\n");
    }
    line
}
