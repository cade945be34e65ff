//! Inter-task communication channels
//!
//! Defines the static channels used for communication between Embassy tasks.
//! Every link is typed, point-to-point and FIFO; the topology mirrors the
//! diagram in `sphygmo_core::tasks`.

use embassy_sync::blocking_mutex::raw::CriticalSectionRawMutex;
use embassy_sync::channel::Channel;

use sphygmo_core::fault::FaultCondition;
use sphygmo_core::mode::{HostCommand, Mode};
use sphygmo_core::motion::{ManagerRequest, MotionOutcome, PositionRequest, StepperCommand};
use sphygmo_core::pressure::PressureSample;
use sphygmo_core::report::StatusEvent;
use sphygmo_core::tasks::{MeasureReady, CHANNEL_DEPTH};
use sphygmo_core::waveform::{WaveformCommand, WaveformStatus};

type Chan<T> = Channel<CriticalSectionRawMutex, T, CHANNEL_DEPTH>;

/// Parsed host commands: transport -> mode controller
pub static HOST_COMMANDS: Chan<HostCommand> = Channel::new();

/// Faults: measurement manager -> mode controller
pub static FAULTS: Chan<FaultCondition> = Channel::new();

/// Measurement-ready acks for controller-issued requests
pub static READY_CONFIG: Chan<MeasureReady> = Channel::new();

/// Measurement-ready acks pacing waveform playback
pub static READY_WAVEFORM: Chan<MeasureReady> = Channel::new();

/// Synthesizer status: waveform -> mode controller
pub static WF_STATUS: Chan<WaveformStatus> = Channel::new();

/// Active-source selection: mode controller -> measurement manager
pub static MODE_SELECT: Chan<Mode> = Channel::new();

/// Requests: mode controller -> measurement manager
pub static CONFIG_REQUESTS: Chan<ManagerRequest> = Channel::new();

/// Requests: waveform synthesizer -> measurement manager
pub static WF_REQUESTS: Chan<PositionRequest> = Channel::new();

/// Control, points and parameters: mode controller -> waveform synthesizer
pub static WF_COMMANDS: Chan<WaveformCommand> = Channel::new();

/// Commands: measurement manager -> stepper actuator
pub static STEPPER_COMMANDS: Chan<StepperCommand> = Channel::new();

/// Outcomes: stepper actuator -> measurement manager
pub static STEPPER_OUTCOMES: Chan<MotionOutcome> = Channel::new();

/// Pressure samples: measurement manager -> data reporter
pub static SAMPLES: Chan<PressureSample> = Channel::new();

/// Status stream: mode controller -> data reporter
pub static STATUS_EVENTS: Chan<StatusEvent> = Channel::new();
