//! Pulse-by-pulse step planning
//!
//! [`StepPlanner`] turns one position request into a bounded pulse sequence.
//! It is a pure state machine: the owning task feeds it the observed position
//! and limit-switch snapshot before every pulse and acts on the verdict, so
//! the safety logic is testable without hardware or timers.

use super::{
    LimitSwitchState, MoveStyle, PositionRequest, StepperState, FULL_SCALE, MAX_STEP_COUNT,
};
use crate::fault::FaultCondition;
use crate::traits::StepDirection;

/// What the actuator should do next for the current request
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum PlannerVerdict {
    /// Issue one pulse in the given direction
    Pulse(StepDirection),
    /// Target reached; report motion complete
    Complete,
    /// Abort: de-assert enable and report the fault
    Fault(FaultCondition),
}

/// Planner for a single position request
#[derive(Debug, Clone)]
pub struct StepPlanner {
    target: i32,
    pulses_issued: u32,
    /// Pulses issued since the observed position last changed
    stalled_pulses: u32,
    last_position: Option<i32>,
}

impl StepPlanner {
    /// Resolve the request's target against the actuator state
    pub fn new(request: &PositionRequest, state: &StepperState) -> Self {
        Self {
            target: Self::resolve_target(request, state),
            pulses_issued: 0,
            stalled_pulses: 0,
            last_position: None,
        }
    }

    fn resolve_target(request: &PositionRequest, state: &StepperState) -> i32 {
        match request.style {
            MoveStyle::Increment => state.position_steps + request.target_steps,
            MoveStyle::GotoZero => state.home_offset,
            MoveStyle::MoveOnly | MoveStyle::Override => request.target_steps,
        }
    }

    /// Resolved absolute target
    pub fn target(&self) -> i32 {
        self.target
    }

    /// Total pulses issued so far for this request
    pub fn pulses_issued(&self) -> u32 {
        self.pulses_issued
    }

    /// Replace the target mid-flight (OVERRIDE preemption)
    ///
    /// The watchdog counters restart: the override begins a new request even
    /// though the pulse train never stopped.
    pub fn retarget(&mut self, request: &PositionRequest, state: &StepperState) {
        self.target = Self::resolve_target(request, state);
        self.pulses_issued = 0;
        self.stalled_pulses = 0;
        self.last_position = None;
    }

    /// Decide the next action given the observed position and switches
    ///
    /// Must be called once before every pulse; the fault checks here are the
    /// per-pulse supervision the actuator contract requires.
    pub fn next(&mut self, position: i32, limits: LimitSwitchState) -> PlannerVerdict {
        // A target past the switches would be reached only by overshooting
        // the mechanical range: fault now instead of clamping.
        if !(0..FULL_SCALE).contains(&self.target) {
            return PlannerVerdict::Fault(FaultCondition::LimitExceeded);
        }

        if position == self.target {
            return PlannerVerdict::Complete;
        }

        let dir = if self.target < position {
            StepDirection::Near
        } else {
            StepDirection::Far
        };

        // Limit switch engaged in the direction of travel before the target:
        // mechanical reality disagrees with the position estimate.
        if limits.engaged_toward(dir) {
            return PlannerVerdict::Fault(FaultCondition::LimitExceeded);
        }

        // Motor-power-loss watchdog: a bounded pulse counter, reset whenever
        // the observed position confirms progress.
        match self.last_position {
            Some(last) if last == position => self.stalled_pulses += 1,
            _ => self.stalled_pulses = 0,
        }
        self.last_position = Some(position);
        if self.stalled_pulses >= MAX_STEP_COUNT || self.pulses_issued >= MAX_STEP_COUNT {
            return PlannerVerdict::Fault(FaultCondition::MotorPower);
        }

        self.pulses_issued += 1;
        PlannerVerdict::Pulse(dir)
    }
}
