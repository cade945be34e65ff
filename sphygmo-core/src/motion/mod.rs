//! Motion types shared between the mode controller, measurement manager and
//! stepper actuator
//!
//! Positions are counted in stepper steps over the addressable travel range
//! `[0, FULL_SCALE)`. Position 0 sits at the near limit switch; larger
//! positions move toward the far switch (and higher cuff pressure).

mod planner;

pub use planner::{PlannerVerdict, StepPlanner};

use crate::fault::FaultCondition;
use crate::traits::StepDirection;

/// Addressable travel range in steps
pub const FULL_SCALE: i32 = 8192;

/// Minimum interval between step pulses, in 10 ns reference-clock ticks
pub const MIN_STEP_TIME: u32 = 20_000;

/// Minimum interval between full-stride waveform moves, in reference ticks
pub const MIN_STRIDE_TIME: u32 = 80_000;

/// Pulses issued for one request without progress before motor power is
/// presumed lost
pub const MAX_STEP_COUNT: u32 = 50_000;

/// Reference-clock ticks per microsecond (100 MHz host timer)
pub const TICKS_PER_US: u32 = 100;

/// Reference-clock ticks per second
pub const TICKS_PER_SEC: u64 = 100_000_000;

/// Convert reference-clock ticks to an [`embassy_time::Duration`]
pub fn ticks_to_duration(ticks: u32) -> embassy_time::Duration {
    embassy_time::Duration::from_micros((ticks / TICKS_PER_US) as u64)
}

/// How a position request interprets its target value
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum MoveStyle {
    /// Move by a signed delta relative to the current position
    Increment,
    /// Move to the home offset established by SET_HOME
    GotoZero,
    /// Move to an absolute target position
    MoveOnly,
    /// Move to an absolute target; additionally permitted to retarget a
    /// request already in flight, including reversing its direction
    Override,
}

/// Whether a sensor read follows the motion
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum ReadTrigger {
    /// No read; measurement-ready is acknowledged immediately on completion
    None,
    /// Read once motion has settled
    ReadAfterMove,
    /// Read immediately without commanding any motion
    ReadNow,
}

/// A request to move the actuator, issued by the mode controller or the
/// waveform synthesizer
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct PositionRequest {
    /// Absolute target for MoveOnly/Override, signed delta for Increment,
    /// ignored for GotoZero
    pub target_steps: i32,
    /// Target interpretation
    pub style: MoveStyle,
    /// Sensor read behavior once the motion completes
    pub read_trigger: ReadTrigger,
}

impl PositionRequest {
    /// Relative move by `delta` steps, sampling pressure afterwards
    pub fn increment(delta: i32) -> Self {
        Self {
            target_steps: delta,
            style: MoveStyle::Increment,
            read_trigger: ReadTrigger::ReadAfterMove,
        }
    }

    /// Return to the home offset, sampling pressure afterwards
    pub fn goto_zero() -> Self {
        Self {
            target_steps: 0,
            style: MoveStyle::GotoZero,
            read_trigger: ReadTrigger::ReadAfterMove,
        }
    }

    /// Absolute move without preemption rights
    pub fn move_to(target_steps: i32) -> Self {
        Self {
            target_steps,
            style: MoveStyle::MoveOnly,
            read_trigger: ReadTrigger::ReadAfterMove,
        }
    }

    /// Absolute move that may retarget an in-flight request
    pub fn override_to(target_steps: i32) -> Self {
        Self {
            target_steps,
            style: MoveStyle::Override,
            read_trigger: ReadTrigger::ReadAfterMove,
        }
    }

    /// Pure sensor read, no motion
    pub fn read_now() -> Self {
        Self {
            target_steps: 0,
            style: MoveStyle::MoveOnly,
            read_trigger: ReadTrigger::ReadNow,
        }
    }

    /// Replace the read trigger
    pub fn with_trigger(mut self, trigger: ReadTrigger) -> Self {
        self.read_trigger = trigger;
        self
    }
}

/// Snapshot of the two end-of-travel switches
///
/// Persistent engagement during an active move is a fault condition, not a
/// normal stop.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct LimitSwitchState {
    /// Switch at the position-0 end of travel
    pub near_engaged: bool,
    /// Switch at the far end of travel
    pub far_engaged: bool,
}

impl LimitSwitchState {
    /// Both switches clear
    pub const CLEAR: Self = Self {
        near_engaged: false,
        far_engaged: false,
    };

    /// Is the switch in the given direction of travel engaged?
    pub fn engaged_toward(&self, dir: StepDirection) -> bool {
        match dir {
            StepDirection::Near => self.near_engaged,
            StepDirection::Far => self.far_engaged,
        }
    }
}

/// Actuator-owned state; mutated only by the stepper task
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct StepperState {
    /// Current position in steps; `[0, FULL_SCALE)` at rest
    pub position_steps: i32,
    /// Last commanded direction
    pub direction: StepDirection,
    /// Whether the driver enable line is asserted
    pub enabled: bool,
    /// Zero-reference position established by SET_HOME
    pub home_offset: i32,
}

impl Default for StepperState {
    fn default() -> Self {
        Self::new()
    }
}

impl StepperState {
    /// State at power-on: parked at the near end, driver disabled
    pub fn new() -> Self {
        Self {
            position_steps: 0,
            direction: StepDirection::Far,
            enabled: false,
            home_offset: 0,
        }
    }
}

/// Request from the mode controller to the measurement manager
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum ManagerRequest {
    /// Forward a position request to the actuator; the token comes back in
    /// the measurement-ready acknowledgment
    Move {
        token: u32,
        request: PositionRequest,
    },
    /// Redefine the home offset: `None` captures the current position,
    /// `Some` sets an explicit offset from a host parameter
    SetHome(Option<i32>),
}

/// Command from the measurement manager to the stepper actuator
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum StepperCommand {
    /// Execute a position request
    Move(PositionRequest),
    /// Redefine the home offset (see [`ManagerRequest::SetHome`])
    SetHome(Option<i32>),
    /// Abort any in-flight pulse train and de-assert the enable line
    Halt,
}

/// Outcome of a stepper command, reported back to the measurement manager
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum MotionOutcome {
    /// Motion finished cleanly at the reported position
    Complete { position: i32 },
    /// Home offset updated; position unchanged
    HomeSet { position: i32 },
    /// Motion halted on request; enable de-asserted
    Aborted { position: i32 },
    /// Motion aborted by a fault; enable de-asserted
    Fault(FaultCondition),
}
