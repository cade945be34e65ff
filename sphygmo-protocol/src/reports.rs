//! Report line encoding
//!
//! Everything the firmware streams back to the host is a short
//! comma-separated ASCII line. Samples carry a sequence number and the
//! stepper position they were taken at, in the field order the host-side
//! tooling expects (`R,<seq>,<position>,<mpsi>`).

use core::fmt::Write;

use heapless::String;

use sphygmo_core::pressure::{convert_temp_counts, PressureSample};
use sphygmo_core::report::StatusEvent;
use sphygmo_core::waveform::WaveformStatus;

/// One encoded report line, terminator included
pub type ReportLine = String<64>;

/// Encode a pressure sample
pub fn encode_sample(seq: u32, sample: &PressureSample) -> ReportLine {
    let mut line = ReportLine::new();
    // 64 bytes always fits the widest possible fields
    let _ = write!(
        line,
        "R,{},{},{}",
        seq, sample.position_steps, sample.pressure_mpsi
    );
    if let Some(temp) = sample.temp_counts {
        let _ = write!(line, ",{}", convert_temp_counts(temp));
    }
    let _ = line.push_str("\r\n");
    line
}

/// Encode a status event
pub fn encode_status(event: &StatusEvent) -> ReportLine {
    let mut line = ReportLine::new();
    let _ = match event {
        StatusEvent::ModeChanged(mode) => write!(line, "S,{}", mode.name()),
        StatusEvent::Fault(fault) => write!(line, "F,{}", fault.code()),
        StatusEvent::CommandRejected { mode } => write!(line, "E,REJ,{}", mode.name()),
        StatusEvent::LinkTimeout => write!(line, "E,TIMEOUT"),
        StatusEvent::Version(version) => write!(line, "V,{}", version),
        StatusEvent::Waveform(status) => match status {
            WaveformStatus::Loaded { len } => write!(line, "W,LOADED,{}", len),
            WaveformStatus::PointRejected => write!(line, "W,REJ,RANGE"),
            WaveformStatus::Overflow => write!(line, "W,REJ,FULL"),
            WaveformStatus::InvalidTransition => write!(line, "W,REJ,STATE"),
            WaveformStatus::NoWaveform => write!(line, "W,REJ,EMPTY"),
            WaveformStatus::Stopped => write!(line, "W,STOPPED"),
        },
    };
    let _ = line.push_str("\r\n");
    line
}
