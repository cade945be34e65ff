//! Waveform synthesizer
//!
//! Load/replay state machine for parameterized pressure waveforms. The host
//! streams target positions one point per command; once finalized, playback
//! emits one position request per cycle at a cadence derived from the
//! cardiac and respiratory rate parameters, clamped so inter-request spacing
//! never violates the actuator's minimum step and stride intervals.
//!
//! Pacing is closed-loop: the synthesizer task waits for the measurement
//! manager's measurement-ready acknowledgment before emitting the next
//! request, so motion can never outrun sensor sampling.

use heapless::Vec;

use crate::mode::{SessionParams, WaveformParameter};
use crate::motion::{
    PositionRequest, FULL_SCALE, MIN_STEP_TIME, MIN_STRIDE_TIME, TICKS_PER_SEC,
};

/// Maximum number of loadable waveform points
pub const MAX_POINTS: usize = FULL_SCALE as usize;

/// Step delta at or above which a move counts as a full stride
pub const STRIDE_STEPS: i32 = FULL_SCALE / 2;

/// Peak-to-center excursion of the respiratory baseline modulation, in steps
const RESP_SWING: i32 = FULL_SCALE / 32;

/// Synthesizer state
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum WaveformState {
    /// No playback; buffer retained from any previous load
    Idle,
    /// Accepting streamed points
    Load,
    /// Buffer finalized, ready to play
    EndLoad,
    /// Replaying the single current point each cycle
    PlayPoint,
    /// Cyclically replaying the full sequence
    PlayWaveform,
}

/// Command to the synthesizer, issued by the mode controller
///
/// Control, point data and parameters share one ordered channel so that a
/// `Load`/`Point`/`EndLoad` exchange cannot be reordered in flight.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum WaveformCommand {
    /// Begin a new load, discarding the previous buffer
    Load,
    /// One streamed point
    Point(u16),
    /// Finalize the buffer
    EndLoad,
    /// Enter single-point replay
    PlayPoint,
    /// Enter cyclic replay
    PlayWaveform,
    /// Stop playback and return to idle (buffer retained)
    Stop,
    /// Update a session parameter
    SetParam(WaveformParameter),
}

/// Status reported back to the mode controller
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum WaveformStatus {
    /// Load finalized with the given point count
    Loaded { len: u16 },
    /// Point outside `[0, FULL_SCALE)` rejected; buffer unchanged
    PointRejected,
    /// Point beyond capacity rejected; buffer unchanged
    Overflow,
    /// Command not valid in the current state; no state change
    InvalidTransition,
    /// Play requested with an empty buffer
    NoWaveform,
    /// Playback stopped
    Stopped,
}

/// The waveform synthesis state machine
///
/// Pure logic: the owning task drives [`handle`](Self::handle) from its
/// command channel and [`next_request`](Self::next_request) from its pacing
/// loop.
pub struct Synth {
    state: WaveformState,
    buffer: Vec<u16, MAX_POINTS>,
    cursor: usize,
    params: SessionParams,
    last_target: Option<i32>,
    /// Position within the respiratory cycle, in reference ticks
    resp_phase_ticks: u64,
}

impl Default for Synth {
    fn default() -> Self {
        Self::new()
    }
}

impl Synth {
    pub fn new() -> Self {
        Self {
            state: WaveformState::Idle,
            buffer: Vec::new(),
            cursor: 0,
            params: SessionParams::default(),
            last_target: None,
            resp_phase_ticks: 0,
        }
    }

    /// Current state
    pub fn state(&self) -> WaveformState {
        self.state
    }

    /// Number of loaded points
    pub fn len(&self) -> usize {
        self.buffer.len()
    }

    /// Whether no points are loaded
    pub fn is_empty(&self) -> bool {
        self.buffer.is_empty()
    }

    /// Whether the machine is in a playback state
    pub fn is_playing(&self) -> bool {
        matches!(
            self.state,
            WaveformState::PlayPoint | WaveformState::PlayWaveform
        )
    }

    /// Process one command; returns a status worth reporting upstream
    pub fn handle(&mut self, command: WaveformCommand) -> Option<WaveformStatus> {
        use WaveformState::*;
        match command {
            WaveformCommand::Load => match self.state {
                Idle | EndLoad => {
                    self.buffer.clear();
                    self.cursor = 0;
                    self.state = Load;
                    None
                }
                _ => Some(WaveformStatus::InvalidTransition),
            },
            WaveformCommand::Point(value) => {
                if self.state != Load {
                    return Some(WaveformStatus::InvalidTransition);
                }
                if (value as i32) >= FULL_SCALE {
                    return Some(WaveformStatus::PointRejected);
                }
                match self.buffer.push(value) {
                    Ok(()) => None,
                    Err(_) => Some(WaveformStatus::Overflow),
                }
            }
            WaveformCommand::EndLoad => {
                if self.state != Load {
                    return Some(WaveformStatus::InvalidTransition);
                }
                self.cursor = 0;
                self.state = EndLoad;
                Some(WaveformStatus::Loaded {
                    len: self.buffer.len() as u16,
                })
            }
            WaveformCommand::PlayPoint | WaveformCommand::PlayWaveform => {
                if self.state == Load {
                    return Some(WaveformStatus::InvalidTransition);
                }
                if self.buffer.is_empty() {
                    return Some(WaveformStatus::NoWaveform);
                }
                self.last_target = None;
                self.resp_phase_ticks = 0;
                self.state = if command == WaveformCommand::PlayPoint {
                    PlayPoint
                } else {
                    PlayWaveform
                };
                None
            }
            WaveformCommand::Stop => {
                let was_playing = self.is_playing();
                self.state = Idle;
                self.cursor = 0;
                was_playing.then_some(WaveformStatus::Stopped)
            }
            WaveformCommand::SetParam(param) => {
                self.params.apply(param);
                None
            }
        }
    }

    /// Produce the next position request and the inter-request interval in
    /// reference ticks
    ///
    /// Only meaningful while playing; the caller must still wait for the
    /// measurement-ready acknowledgment before invoking this again.
    pub fn next_request(&mut self) -> Option<(PositionRequest, u32)> {
        if !self.is_playing() || self.buffer.is_empty() {
            return None;
        }

        let point = self.buffer[self.cursor] as i32;
        let interval = self.cycle_interval_ticks();

        // Respiratory baseline swell superimposed on the cardiac profile;
        // single-point replay verifies a static calibration point and gets
        // no modulation
        let offset = if self.state == WaveformState::PlayWaveform {
            self.resp_offset()
        } else {
            0
        };
        let target =
            (point + offset).clamp(0, (self.params.cal_max as i32).min(FULL_SCALE - 1));

        // Spacing floor depends on how far this request travels
        let delta = (target - self.last_target.unwrap_or(target)).abs();
        let floor = if delta >= STRIDE_STEPS {
            MIN_STRIDE_TIME
        } else {
            MIN_STEP_TIME
        };
        let interval = interval.max(floor as u64).min(u32::MAX as u64) as u32;

        if self.state == WaveformState::PlayWaveform {
            self.cursor = (self.cursor + 1) % self.buffer.len();
            self.resp_phase_ticks =
                (self.resp_phase_ticks + interval as u64) % self.resp_period_ticks();
        }
        self.last_target = Some(target);

        Some((PositionRequest::move_to(target), interval))
    }

    /// Nominal inter-request interval: one cardiac cycle spread across the
    /// loaded points (or one full cycle per request in single-point replay)
    fn cycle_interval_ticks(&self) -> u64 {
        let beat_ticks = 60 * TICKS_PER_SEC / self.params.heart_rate.max(1) as u64;
        let per_cycle = match self.state {
            WaveformState::PlayWaveform => self.buffer.len() as u64,
            _ => 1,
        };
        beat_ticks / per_cycle.max(1)
    }

    fn resp_period_ticks(&self) -> u64 {
        60 * TICKS_PER_SEC / self.params.resp_rate.max(1) as u64
    }

    /// Triangle-wave baseline offset over the respiratory cycle
    ///
    /// A respiratory rate of zero disables the modulation.
    fn resp_offset(&self) -> i32 {
        if self.params.resp_rate == 0 {
            return 0;
        }
        let period = self.resp_period_ticks();
        let phase = (self.resp_phase_ticks * 4096 / period) as i32; // 0..4096
        // Zero at inhale onset, +swing at quarter cycle, -swing at three
        // quarters
        let tri = if phase < 1024 {
            phase
        } else if phase < 3072 {
            2048 - phase
        } else {
            phase - 4096
        }; // -1024..=1024
        tri * RESP_SWING / 1024
    }
}
