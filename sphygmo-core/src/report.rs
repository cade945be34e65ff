//! Status events streamed to the host data reporter
//!
//! The reporter itself is a thin transport shim in the firmware crate; the
//! core only defines what flows to it. Pressure samples travel on their own
//! channel directly from the measurement manager.

use crate::fault::FaultCondition;
use crate::mode::Mode;
use crate::waveform::WaveformStatus;

/// Non-sample traffic for the host data stream
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum StatusEvent {
    /// The controller changed mode
    ModeChanged(Mode),
    /// A downstream fault forced the controller to idle
    Fault(FaultCondition),
    /// A host command was rejected as invalid for the mode it arrived in
    CommandRejected { mode: Mode },
    /// Waveform synthesizer status (load results, rejections)
    Waveform(WaveformStatus),
    /// The host link went silent mid-mode and the controller aborted to idle
    LinkTimeout,
    /// Identification reply
    Version(&'static str),
}
