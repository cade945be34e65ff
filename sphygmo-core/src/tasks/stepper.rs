//! Stepper actuator task
//!
//! Owns the step/dir/enable port and the limit switches exclusively.
//! Translates position requests into pulse trains paced at MIN_STEP_TIME,
//! checking the limit switches and the motor-power watchdog before every
//! pulse. On any fault the enable line is de-asserted and the fault is
//! reported upstream; a fresh request re-asserts enable and resumes normal
//! operation.

use embassy_sync::blocking_mutex::raw::RawMutex;
use embassy_sync::channel::{Receiver, Sender};
use embassy_time::Timer;

use crate::motion::{
    ticks_to_duration, MotionOutcome, MoveStyle, PlannerVerdict, PositionRequest, StepPlanner,
    StepperCommand, StepperState, MIN_STEP_TIME,
};
use crate::traits::{LimitSwitches, StepPort};

use super::CHANNEL_DEPTH;

/// Channel endpoints of the actuator task
pub struct StepperLinks<'a, M: RawMutex> {
    /// Commands from the measurement manager
    pub command_rx: Receiver<'a, M, StepperCommand, CHANNEL_DEPTH>,
    /// Motion outcomes back to the measurement manager
    pub outcome_tx: Sender<'a, M, MotionOutcome, CHANNEL_DEPTH>,
}

/// Stepper actuator task
pub async fn stepper_task<M: RawMutex, P: StepPort, L: LimitSwitches>(
    mut port: P,
    mut limits: L,
    links: StepperLinks<'_, M>,
) -> ! {
    let mut state = StepperState::new();
    port.set_enabled(false);
    port.set_direction(state.direction);

    loop {
        match links.command_rx.receive().await {
            StepperCommand::SetHome(offset) => {
                state.home_offset = offset.unwrap_or(state.position_steps);
                links
                    .outcome_tx
                    .send(MotionOutcome::HomeSet {
                        position: state.position_steps,
                    })
                    .await;
            }
            StepperCommand::Halt => {
                // Nothing in flight; just make sure the driver is released
                port.set_enabled(false);
                state.enabled = false;
            }
            StepperCommand::Move(request) => {
                let outcome =
                    run_move(&mut port, &mut limits, &links, &mut state, request).await;
                links.outcome_tx.send(outcome).await;
            }
        }
    }
}

/// Execute one position request to completion, fault, or halt
async fn run_move<M: RawMutex, P: StepPort, L: LimitSwitches>(
    port: &mut P,
    limits: &mut L,
    links: &StepperLinks<'_, M>,
    state: &mut StepperState,
    request: PositionRequest,
) -> MotionOutcome {
    let mut planner = StepPlanner::new(&request, state);

    // A fresh request clears any fault-latched disable
    port.set_enabled(true);
    state.enabled = true;

    loop {
        // Commands arriving mid-move: OVERRIDE retargets the in-flight
        // pulse train (direction reversal allowed), Halt aborts it. Any
        // other style must wait its turn and is dropped here.
        while let Ok(next) = links.command_rx.try_receive() {
            match next {
                StepperCommand::Move(r) if r.style == MoveStyle::Override => {
                    planner.retarget(&r, state);
                }
                StepperCommand::Halt => {
                    port.set_enabled(false);
                    state.enabled = false;
                    return MotionOutcome::Aborted {
                        position: state.position_steps,
                    };
                }
                _ => {}
            }
        }

        match planner.next(state.position_steps, limits.read()) {
            PlannerVerdict::Pulse(dir) => {
                if state.direction != dir {
                    port.set_direction(dir);
                    state.direction = dir;
                }
                port.step_pulse();
                state.position_steps += dir.step_delta();
                Timer::after(ticks_to_duration(MIN_STEP_TIME)).await;
            }
            PlannerVerdict::Complete => {
                return MotionOutcome::Complete {
                    position: state.position_steps,
                };
            }
            PlannerVerdict::Fault(fault) => {
                port.set_enabled(false);
                state.enabled = false;
                return MotionOutcome::Fault(fault);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fault::FaultCondition;
    use crate::motion::LimitSwitchState;
    use crate::traits::StepDirection;
    use core::cell::{Cell, RefCell};
    use embassy_futures::select::{select, Either};
    use embassy_sync::blocking_mutex::raw::NoopRawMutex;
    use embassy_sync::channel::Channel;
    use futures_lite::future::block_on;
    use std::rc::Rc;
    use std::vec::Vec;

    /// Recording mock of the step/dir/enable port
    #[derive(Default)]
    struct PortLog {
        pulses: Cell<u32>,
        enabled: Cell<bool>,
        directions: RefCell<Vec<StepDirection>>,
    }

    #[derive(Clone)]
    struct MockPort(Rc<PortLog>);

    impl StepPort for MockPort {
        fn set_direction(&mut self, dir: StepDirection) {
            self.0.directions.borrow_mut().push(dir);
        }
        fn step_pulse(&mut self) {
            self.0.pulses.set(self.0.pulses.get() + 1);
        }
        fn set_enabled(&mut self, enabled: bool) {
            self.0.enabled.set(enabled);
        }
    }

    /// Limit switches whose state the test flips mid-move
    #[derive(Clone)]
    struct MockLimits {
        state: Rc<Cell<LimitSwitchState>>,
        /// Engage the far switch after this many reads (None = never)
        engage_far_after: Rc<Cell<Option<u32>>>,
        reads: Rc<Cell<u32>>,
    }

    impl MockLimits {
        fn clear() -> Self {
            Self {
                state: Rc::new(Cell::new(LimitSwitchState::CLEAR)),
                engage_far_after: Rc::new(Cell::new(None)),
                reads: Rc::new(Cell::new(0)),
            }
        }
    }

    impl LimitSwitches for MockLimits {
        fn read(&mut self) -> LimitSwitchState {
            let n = self.reads.get() + 1;
            self.reads.set(n);
            if let Some(after) = self.engage_far_after.get() {
                if n > after {
                    self.state.set(LimitSwitchState {
                        near_engaged: false,
                        far_engaged: true,
                    });
                }
            }
            self.state.get()
        }
    }

    struct Harness {
        commands: Channel<NoopRawMutex, StepperCommand, CHANNEL_DEPTH>,
        outcomes: Channel<NoopRawMutex, MotionOutcome, CHANNEL_DEPTH>,
    }

    impl Harness {
        fn new() -> Self {
            Self {
                commands: Channel::new(),
                outcomes: Channel::new(),
            }
        }

        fn links(&self) -> StepperLinks<'_, NoopRawMutex> {
            StepperLinks {
                command_rx: self.commands.receiver(),
                outcome_tx: self.outcomes.sender(),
            }
        }
    }

    /// Run the task against a scenario future until the scenario finishes
    fn run(harness: &Harness, port: MockPort, limits: MockLimits, scenario: impl core::future::Future<Output = ()>) {
        block_on(async {
            match select(stepper_task(port, limits, harness.links()), scenario).await {
                Either::First(never) => match never {},
                Either::Second(()) => {}
            }
        });
    }

    #[test]
    fn test_clean_move_reports_final_position() {
        let harness = Harness::new();
        let log = Rc::new(PortLog::default());
        let port = MockPort(log.clone());
        run(&harness, port, MockLimits::clear(), async {
            harness
                .commands
                .send(StepperCommand::Move(PositionRequest::move_to(5)))
                .await;
            let outcome = harness.outcomes.receive().await;
            assert_eq!(outcome, MotionOutcome::Complete { position: 5 });
        });
        assert_eq!(log.pulses.get(), 5);
        // Enable stays asserted after a clean completion
        assert!(log.enabled.get());
    }

    #[test]
    fn test_limit_engaged_mid_move_faults_and_disables() {
        let harness = Harness::new();
        let log = Rc::new(PortLog::default());
        let port = MockPort(log.clone());
        let limits = MockLimits::clear();
        limits.engage_far_after.set(Some(3));
        run(&harness, port, limits, async {
            harness
                .commands
                .send(StepperCommand::Move(PositionRequest::increment(10)))
                .await;
            let outcome = harness.outcomes.receive().await;
            assert_eq!(
                outcome,
                MotionOutcome::Fault(FaultCondition::LimitExceeded)
            );
        });
        // Aborted before the target, enable de-asserted
        assert!(log.pulses.get() < 10);
        assert!(!log.enabled.get());
    }

    #[test]
    fn test_fresh_request_after_fault_resumes() {
        let harness = Harness::new();
        let log = Rc::new(PortLog::default());
        let port = MockPort(log.clone());
        let limits = MockLimits::clear();
        limits.state.set(LimitSwitchState {
            near_engaged: true,
            far_engaged: false,
        });
        run(&harness, port, limits.clone(), async {
            // Near switch stuck: moving near faults immediately
            harness
                .commands
                .send(StepperCommand::Move(PositionRequest::move_to(0).with_trigger(
                    crate::motion::ReadTrigger::None,
                )))
                .await;
            // position starts at 0, so move away first
            harness
                .commands
                .send(StepperCommand::Move(PositionRequest::move_to(4)))
                .await;
            // First move: position 0 == target 0, completes without pulsing
            assert_eq!(
                harness.outcomes.receive().await,
                MotionOutcome::Complete { position: 0 }
            );
            // Second move goes far; the near switch does not matter
            assert_eq!(
                harness.outcomes.receive().await,
                MotionOutcome::Complete { position: 4 }
            );
            // Now command a near move into the stuck switch
            harness
                .commands
                .send(StepperCommand::Move(PositionRequest::move_to(1)))
                .await;
            assert_eq!(
                harness.outcomes.receive().await,
                MotionOutcome::Fault(FaultCondition::LimitExceeded)
            );
            // Clear the switch; a fresh request re-asserts enable and works
            limits.state.set(LimitSwitchState::CLEAR);
            harness
                .commands
                .send(StepperCommand::Move(PositionRequest::move_to(1)))
                .await;
            assert_eq!(
                harness.outcomes.receive().await,
                MotionOutcome::Complete { position: 1 }
            );
        });
        assert!(log.enabled.get());
    }

    #[test]
    fn test_set_home_captures_current_position() {
        let harness = Harness::new();
        let log = Rc::new(PortLog::default());
        let port = MockPort(log.clone());
        run(&harness, port, MockLimits::clear(), async {
            harness
                .commands
                .send(StepperCommand::Move(PositionRequest::move_to(7)))
                .await;
            assert_eq!(
                harness.outcomes.receive().await,
                MotionOutcome::Complete { position: 7 }
            );
            harness.commands.send(StepperCommand::SetHome(None)).await;
            assert_eq!(
                harness.outcomes.receive().await,
                MotionOutcome::HomeSet { position: 7 }
            );
            // GotoZero now targets the captured offset: no pulses needed
            harness
                .commands
                .send(StepperCommand::Move(PositionRequest::goto_zero()))
                .await;
            assert_eq!(
                harness.outcomes.receive().await,
                MotionOutcome::Complete { position: 7 }
            );
        });
        assert_eq!(log.pulses.get(), 7);
    }

    #[test]
    fn test_override_retargets_in_flight_move() {
        let harness = Harness::new();
        let log = Rc::new(PortLog::default());
        let port = MockPort(log.clone());
        run(&harness, port, MockLimits::clear(), async {
            harness
                .commands
                .send(StepperCommand::Move(PositionRequest::move_to(100)))
                .await;
            assert_eq!(
                harness.outcomes.receive().await,
                MotionOutcome::Complete { position: 100 }
            );
            // Queue the override behind the long move; the pulse loop picks
            // it up mid-flight and reverses toward the new target
            harness
                .commands
                .send(StepperCommand::Move(PositionRequest::move_to(2000)))
                .await;
            harness
                .commands
                .send(StepperCommand::Move(PositionRequest::override_to(10)))
                .await;
            let outcome = harness.outcomes.receive().await;
            assert_eq!(outcome, MotionOutcome::Complete { position: 10 });
        });
        // Far toward 2000 at first, near after the reversal
        assert!(log.directions.borrow().contains(&StepDirection::Near));
    }

    #[test]
    fn test_halt_aborts_and_disables() {
        let harness = Harness::new();
        let log = Rc::new(PortLog::default());
        let port = MockPort(log.clone());
        run(&harness, port, MockLimits::clear(), async {
            harness
                .commands
                .send(StepperCommand::Move(PositionRequest::move_to(4000)))
                .await;
            harness.commands.send(StepperCommand::Halt).await;
            let outcome = harness.outcomes.receive().await;
            assert!(matches!(outcome, MotionOutcome::Aborted { .. }));
        });
        assert!(!log.enabled.get());
        assert!(log.pulses.get() < 4000);
    }
}
