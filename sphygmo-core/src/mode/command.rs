//! Host command and session parameter types
//!
//! The transport framing that carries these over the virtual serial link is
//! out of scope here (see the protocol crate); the core consumes commands
//! already parsed into this enum.

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

use crate::motion::FULL_SCALE;

/// Identifier of a per-session parameter
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub enum ParamId {
    /// Zero-reference offset in steps
    Home,
    /// Cardiac rate in beats per minute
    HeartRate,
    /// Respiratory rate in breaths per minute
    RespRate,
    /// Upper clamp applied to synthesized waveform targets, in steps
    CalMax,
}

/// A single parameter assignment from the host
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct WaveformParameter {
    pub id: ParamId,
    pub value: u16,
}

/// The full per-session parameter set with its power-on defaults
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct SessionParams {
    pub home: u16,
    pub heart_rate: u16,
    pub resp_rate: u16,
    pub cal_max: u16,
}

impl Default for SessionParams {
    fn default() -> Self {
        Self {
            home: 0,
            heart_rate: 60,
            resp_rate: 12,
            cal_max: (FULL_SCALE - 1) as u16,
        }
    }
}

impl SessionParams {
    /// Apply one assignment
    pub fn apply(&mut self, param: WaveformParameter) {
        match param.id {
            ParamId::Home => self.home = param.value,
            ParamId::HeartRate => self.heart_rate = param.value,
            ParamId::RespRate => self.resp_rate = param.value,
            ParamId::CalMax => self.cal_max = param.value,
        }
    }
}

/// A command from the host, already parsed off the transport
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum HostCommand {
    /// Return to idle, aborting playback and pending motion
    Idle,
    /// Enter read-only mode, sampling at the given cadence in reference ticks
    ReadOnly { interval_ticks: u32 },
    /// Move to the home offset, then return to idle
    GoHome,
    /// Capture the current position as the new home offset
    SetHome,
    /// Relative move by the given step delta
    Increment { delta: i32 },
    /// Absolute move, permitted to retarget an in-flight move
    Override { target: u16 },
    /// Enter waveform mode (playback driven by separate play commands)
    Waveform,
    /// Begin streaming waveform points
    LoadStart,
    /// One waveform point
    LoadPoint(u16),
    /// Finalize the streamed waveform
    LoadEnd,
    /// Replay the single current point at the paced cadence
    PlayPoint,
    /// Cyclically replay the loaded waveform
    PlayWaveform,
    /// Assign a session parameter
    SetParam(WaveformParameter),
    /// Trigger one immediate sensor read
    ReadNow,
    /// Identify the firmware
    Version,
}
