//! The concurrent control pipeline
//!
//! Each component runs as an independent task; all coordination is via
//! typed, ordered, point-to-point channels. The task functions here are
//! generic over the channel mutex and the hardware port traits so the
//! firmware wraps them in `#[embassy_executor::task]` with concrete types
//! while host tests drive them over `NoopRawMutex` channels with mock ports.
//!
//! Channel topology (arrows are the only coupling between tasks):
//!
//! ```text
//! host ──cmd──▶ config ──wf cmds──▶ waveform
//!                 │ ▲ ▲                │ ▲
//!            mode,│ │ │wf status       │ │ready(wf)
//!             req │ │fault,ready(cfg)  │ │
//!                 ▼ │ │            req ▼ │
//!               measurement ◀───────────┘
//!                 │ ▲      │
//!          step cmd│ │outcome└──samples──▶ reporter
//!                 ▼ │
//!               stepper
//! ```

mod config;
mod measurement;
mod stepper;
mod waveform;

pub use config::{config_task, ConfigLinks, DEFAULT_READ_INTERVAL};
pub use measurement::{measurement_task, MeasurementLinks, MAX_READ_ATTEMPTS};
pub use stepper::{stepper_task, StepperLinks};
pub use waveform::{waveform_task, WaveformLinks};

/// Depth of every inter-task channel
///
/// Small and uniform: the pipeline is paced by explicit handshakes, so
/// channels only ever hold a short burst of messages.
pub const CHANNEL_DEPTH: usize = 8;

/// Acknowledgment that a measurement cycle finished
///
/// Sent by the measurement manager back to whichever source issued the
/// request once the sample has been reported (or sensing was skipped). This
/// is the sole pacing signal the waveform synthesizer waits on.
///
/// The token echoes the one the mode controller stamped on its request, so
/// an ack can never be attributed to the wrong request when several were
/// issued in quick succession. Waveform-side acks carry token 0; playback
/// pacing needs no correlation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct MeasureReady {
    pub token: u32,
}
