//! Measurement manager task
//!
//! Arbitrates between the mode controller and the waveform synthesizer
//! (exactly one source is live at a time, selected by the current mode),
//! forwards motion to the stepper actuator, and owns the sensor bus. Sensor
//! reads retry up to [`MAX_READ_ATTEMPTS`] times; exhaustion raises a single
//! SensorComm fault and aborts the request without reporting a partial
//! sample. Every completed request is acknowledged back to its source with a
//! measurement-ready message - the pacing handshake for waveform playback.

use embassy_futures::select::{select, select3, Either, Either3};
use embassy_sync::blocking_mutex::raw::RawMutex;
use embassy_sync::channel::{Receiver, Sender};

use crate::fault::FaultCondition;
use crate::mode::Mode;
use crate::motion::{
    ManagerRequest, MotionOutcome, MoveStyle, PositionRequest, ReadTrigger, StepperCommand,
};
use crate::pressure::{convert_counts, counts_in_range, PressureSample};
use crate::traits::PressureSensor;

use super::{MeasureReady, CHANNEL_DEPTH};

/// Consecutive failed sensor reads tolerated per request
pub const MAX_READ_ATTEMPTS: u32 = 16;

/// Channel endpoints of the measurement manager
pub struct MeasurementLinks<'a, M: RawMutex> {
    /// Active-source selection from the mode controller
    pub mode_rx: Receiver<'a, M, Mode, CHANNEL_DEPTH>,
    /// Requests from the mode controller (live outside waveform mode)
    pub config_rx: Receiver<'a, M, ManagerRequest, CHANNEL_DEPTH>,
    /// Requests from the waveform synthesizer (live in waveform mode)
    pub waveform_rx: Receiver<'a, M, PositionRequest, CHANNEL_DEPTH>,
    /// Commands to the stepper actuator
    pub stepper_tx: Sender<'a, M, StepperCommand, CHANNEL_DEPTH>,
    /// Outcomes from the stepper actuator
    pub stepper_rx: Receiver<'a, M, MotionOutcome, CHANNEL_DEPTH>,
    /// Samples to the data reporter
    pub sample_tx: Sender<'a, M, PressureSample, CHANNEL_DEPTH>,
    /// Measurement-ready acks to the mode controller
    pub ready_config_tx: Sender<'a, M, MeasureReady, CHANNEL_DEPTH>,
    /// Measurement-ready acks to the waveform synthesizer
    pub ready_waveform_tx: Sender<'a, M, MeasureReady, CHANNEL_DEPTH>,
    /// Faults to the mode controller
    pub fault_tx: Sender<'a, M, FaultCondition, CHANNEL_DEPTH>,
}

/// Which upstream issued the request being serviced
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Source {
    Config,
    Waveform,
}

/// Measurement manager task
pub async fn measurement_task<M: RawMutex, S: PressureSensor>(
    mut sensor: S,
    links: MeasurementLinks<'_, M>,
) -> ! {
    let mut active = Mode::Idle;
    // Last position confirmed by the actuator; samples are stamped with it
    let mut position = 0i32;

    loop {
        if active == Mode::Waveform {
            // The mode arm is polled first, so a pending mode change always
            // wins over a queued request
            match select(links.mode_rx.receive(), links.waveform_rx.receive()).await {
                Either::First(mode) => active = mode,
                Either::Second(request) => {
                    handle_request(
                        &mut sensor,
                        &links,
                        &mut active,
                        &mut position,
                        request,
                        Source::Waveform,
                        0,
                    )
                    .await;
                }
            }
        } else {
            match select3(
                links.mode_rx.receive(),
                links.config_rx.receive(),
                links.waveform_rx.receive(),
            )
            .await
            {
                Either3::First(mode) => active = mode,
                Either3::Second(ManagerRequest::SetHome(offset)) => {
                    set_home(&links, &mut position, offset).await;
                }
                Either3::Second(ManagerRequest::Move { token, request }) => {
                    handle_request(
                        &mut sensor,
                        &links,
                        &mut active,
                        &mut position,
                        request,
                        Source::Config,
                        token,
                    )
                    .await;
                }
                // Playback requests from a cancelled session are stale the
                // moment the synthesizer stops being the active source
                Either3::Third(_stale) => {}
            }
        }
    }
}

/// SET_HOME emits no motion and no measurement, so it gets no ready ack;
/// only a failure to apply it is worth reporting.
async fn set_home<M: RawMutex>(
    links: &MeasurementLinks<'_, M>,
    position: &mut i32,
    offset: Option<i32>,
) {
    links.stepper_tx.send(StepperCommand::SetHome(offset)).await;
    match links.stepper_rx.receive().await {
        MotionOutcome::HomeSet { position: p } => *position = p,
        MotionOutcome::Fault(fault) => links.fault_tx.send(fault).await,
        _ => {}
    }
}

/// Service one position request end to end: motion, sensing, acknowledgment
#[allow(clippy::too_many_arguments)]
async fn handle_request<M: RawMutex, S: PressureSensor>(
    sensor: &mut S,
    links: &MeasurementLinks<'_, M>,
    active: &mut Mode,
    position: &mut i32,
    request: PositionRequest,
    source: Source,
    mut token: u32,
) {
    // Motion phase - skipped entirely for immediate reads
    if request.read_trigger != ReadTrigger::ReadNow {
        links.stepper_tx.send(StepperCommand::Move(request)).await;
        let completed = wait_motion(links, active, position, source, &mut token).await;
        if !completed {
            return; // fault already propagated, or move aborted
        }
    }

    // Sensing phase
    match request.read_trigger {
        ReadTrigger::None => ack_ready(links, source, token).await,
        ReadTrigger::ReadAfterMove | ReadTrigger::ReadNow => {
            let mut attempts: u32 = 0;
            let reading = loop {
                // Stay responsive to mode changes so an abort to idle
                // cancels pending retries instead of stalling behind them
                match select(sensor.read(), links.mode_rx.receive()).await {
                    Either::First(result) => {
                        attempts += 1;
                        match result {
                            Ok(r) if counts_in_range(r.pressure_counts) => break Some(r),
                            // Bus errors, stale flags, and out-of-range
                            // counts all burn one attempt
                            _ => {
                                if attempts >= MAX_READ_ATTEMPTS {
                                    break None;
                                }
                            }
                        }
                    }
                    Either::Second(mode) => {
                        *active = mode;
                        if mode == Mode::Idle {
                            return;
                        }
                    }
                }
            };

            match reading {
                Some(r) => {
                    links
                        .sample_tx
                        .send(PressureSample {
                            raw_counts: r.pressure_counts,
                            pressure_mpsi: convert_counts(r.pressure_counts),
                            temp_counts: r.temp_counts,
                            position_steps: *position,
                        })
                        .await;
                    ack_ready(links, source, token).await;
                }
                // Raised exactly once; the request is aborted with no
                // partial sample and no ready ack
                None => links.fault_tx.send(FaultCondition::SensorComm).await,
            }
        }
    }
}

/// Wait for the in-flight move to finish while staying responsive to mode
/// changes and OVERRIDE preemption. Returns false if the request ended
/// without a clean completion.
async fn wait_motion<M: RawMutex>(
    links: &MeasurementLinks<'_, M>,
    active: &mut Mode,
    position: &mut i32,
    source: Source,
    token: &mut u32,
) -> bool {
    loop {
        let outcome = if source == Source::Config {
            match select3(
                links.stepper_rx.receive(),
                links.mode_rx.receive(),
                links.config_rx.receive(),
            )
            .await
            {
                Either3::First(outcome) => outcome,
                Either3::Second(mode) => {
                    *active = mode;
                    if mode == Mode::Idle {
                        links.stepper_tx.send(StepperCommand::Halt).await;
                    }
                    continue;
                }
                Either3::Third(ManagerRequest::Move {
                    token: new_token,
                    request,
                }) if request.style == MoveStyle::Override => {
                    // OVERRIDE may displace the in-flight request; the ack
                    // belongs to the newest one
                    *token = new_token;
                    links.stepper_tx.send(StepperCommand::Move(request)).await;
                    continue;
                }
                Either3::Third(_) => continue,
            }
        } else {
            match select(links.stepper_rx.receive(), links.mode_rx.receive()).await {
                Either::First(outcome) => outcome,
                Either::Second(mode) => {
                    *active = mode;
                    if mode == Mode::Idle {
                        links.stepper_tx.send(StepperCommand::Halt).await;
                    }
                    continue;
                }
            }
        };

        match outcome {
            MotionOutcome::Complete { position: p } => {
                *position = p;
                return true;
            }
            MotionOutcome::Aborted { position: p } => {
                *position = p;
                return false;
            }
            MotionOutcome::HomeSet { position: p } => {
                *position = p;
                continue;
            }
            MotionOutcome::Fault(fault) => {
                links.fault_tx.send(fault).await;
                return false;
            }
        }
    }
}

async fn ack_ready<M: RawMutex>(links: &MeasurementLinks<'_, M>, source: Source, token: u32) {
    match source {
        Source::Config => links.ready_config_tx.send(MeasureReady { token }).await,
        Source::Waveform => {
            links
                .ready_waveform_tx
                .send(MeasureReady { token: 0 })
                .await;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pressure::{HSC_OUTPUT_MAX, HSC_OUTPUT_MIN, HSC_RANGE};
    use crate::traits::{SensorError, SensorReading};
    use core::cell::RefCell;
    use embassy_sync::blocking_mutex::raw::NoopRawMutex;
    use embassy_sync::channel::Channel;
    use futures_lite::future::block_on;
    use std::collections::VecDeque;
    use std::rc::Rc;

    fn moved(token: u32, request: PositionRequest) -> ManagerRequest {
        ManagerRequest::Move { token, request }
    }

    /// Sensor fed from a scripted queue of results
    #[derive(Clone)]
    struct MockSensor {
        script: Rc<RefCell<VecDeque<Result<SensorReading, SensorError>>>>,
    }

    impl MockSensor {
        fn new(script: impl IntoIterator<Item = Result<SensorReading, SensorError>>) -> Self {
            Self {
                script: Rc::new(RefCell::new(script.into_iter().collect())),
            }
        }

        fn ok(counts: u16) -> Result<SensorReading, SensorError> {
            Ok(SensorReading {
                pressure_counts: counts,
                temp_counts: None,
            })
        }
    }

    impl PressureSensor for MockSensor {
        async fn read(&mut self) -> Result<SensorReading, SensorError> {
            self.script
                .borrow_mut()
                .pop_front()
                .unwrap_or(Self::ok(HSC_OUTPUT_MIN))
        }
    }

    struct Harness {
        mode: Channel<NoopRawMutex, Mode, CHANNEL_DEPTH>,
        config: Channel<NoopRawMutex, ManagerRequest, CHANNEL_DEPTH>,
        waveform: Channel<NoopRawMutex, PositionRequest, CHANNEL_DEPTH>,
        stepper_cmd: Channel<NoopRawMutex, StepperCommand, CHANNEL_DEPTH>,
        stepper_out: Channel<NoopRawMutex, MotionOutcome, CHANNEL_DEPTH>,
        samples: Channel<NoopRawMutex, PressureSample, CHANNEL_DEPTH>,
        ready_cfg: Channel<NoopRawMutex, MeasureReady, CHANNEL_DEPTH>,
        ready_wf: Channel<NoopRawMutex, MeasureReady, CHANNEL_DEPTH>,
        faults: Channel<NoopRawMutex, FaultCondition, CHANNEL_DEPTH>,
    }

    impl Harness {
        fn new() -> Self {
            Self {
                mode: Channel::new(),
                config: Channel::new(),
                waveform: Channel::new(),
                stepper_cmd: Channel::new(),
                stepper_out: Channel::new(),
                samples: Channel::new(),
                ready_cfg: Channel::new(),
                ready_wf: Channel::new(),
                faults: Channel::new(),
            }
        }

        fn links(&self) -> MeasurementLinks<'_, NoopRawMutex> {
            MeasurementLinks {
                mode_rx: self.mode.receiver(),
                config_rx: self.config.receiver(),
                waveform_rx: self.waveform.receiver(),
                stepper_tx: self.stepper_cmd.sender(),
                stepper_rx: self.stepper_out.receiver(),
                sample_tx: self.samples.sender(),
                ready_config_tx: self.ready_cfg.sender(),
                ready_waveform_tx: self.ready_wf.sender(),
                fault_tx: self.faults.sender(),
            }
        }

        fn run(&self, sensor: MockSensor, scenario: impl core::future::Future<Output = ()>) {
            block_on(async {
                match select(measurement_task(sensor, self.links()), scenario).await {
                    Either::First(never) => match never {},
                    Either::Second(()) => {}
                }
            });
        }
    }

    #[test]
    fn test_read_now_skips_motion_and_reports_sample() {
        let h = Harness::new();
        let sensor = MockSensor::new([MockSensor::ok(HSC_OUTPUT_MAX)]);
        h.run(sensor, async {
            h.config.send(moved(1, PositionRequest::read_now())).await;
            let sample = h.samples.receive().await;
            assert_eq!(sample.raw_counts, HSC_OUTPUT_MAX);
            assert_eq!(sample.pressure_mpsi, HSC_RANGE);
            assert_eq!(h.ready_cfg.receive().await, MeasureReady { token: 1 });
            // No motion command was issued
            assert!(h.stepper_cmd.try_receive().is_err());
        });
    }

    #[test]
    fn test_retry_exhaustion_raises_single_fault() {
        let h = Harness::new();
        // Exactly MAX_READ_ATTEMPTS consecutive bus failures
        let sensor = MockSensor::new(
            (0..MAX_READ_ATTEMPTS).map(|_| Err::<SensorReading, _>(SensorError::Bus)),
        );
        h.run(sensor, async {
            h.config.send(moved(1, PositionRequest::read_now())).await;
            assert_eq!(h.faults.receive().await, FaultCondition::SensorComm);
            // No sample, no ready ack, and no further retries: a fresh
            // request succeeds off the sensor's default reading
            assert!(h.samples.try_receive().is_err());
            assert!(h.ready_cfg.try_receive().is_err());
            h.config.send(moved(2, PositionRequest::read_now())).await;
            let _ = h.samples.receive().await;
            assert_eq!(h.ready_cfg.receive().await, MeasureReady { token: 2 });
            assert!(h.faults.try_receive().is_err());
        });
    }

    #[test]
    fn test_failures_below_limit_recover() {
        let h = Harness::new();
        let sensor = MockSensor::new([
            Err(SensorError::Bus),
            Err(SensorError::Stale),
            // Out-of-range counts burn an attempt too
            MockSensor::ok(HSC_OUTPUT_MAX + 1),
            MockSensor::ok(0x2000),
        ]);
        h.run(sensor, async {
            h.config.send(moved(1, PositionRequest::read_now())).await;
            let sample = h.samples.receive().await;
            assert_eq!(sample.raw_counts, 0x2000);
            let _ = h.ready_cfg.receive().await;
            assert!(h.faults.try_receive().is_err());
        });
    }

    #[test]
    fn test_move_then_read_stamps_sample_with_position() {
        let h = Harness::new();
        let sensor = MockSensor::new([MockSensor::ok(0x1000)]);
        h.run(sensor, async {
            h.config
                .send(moved(1, PositionRequest::move_to(1234)))
                .await;
            // Play the actuator's role
            assert_eq!(
                h.stepper_cmd.receive().await,
                StepperCommand::Move(PositionRequest::move_to(1234))
            );
            h.stepper_out
                .send(MotionOutcome::Complete { position: 1234 })
                .await;
            let sample = h.samples.receive().await;
            assert_eq!(sample.position_steps, 1234);
            let _ = h.ready_cfg.receive().await;
        });
    }

    #[test]
    fn test_trigger_none_acks_without_sensing() {
        let h = Harness::new();
        // Any read would fail loudly; None must never touch the sensor
        let sensor = MockSensor::new([Err::<SensorReading, _>(SensorError::Bus)]);
        h.run(sensor, async {
            h.config
                .send(moved(
                    7,
                    PositionRequest::move_to(5).with_trigger(ReadTrigger::None),
                ))
                .await;
            let _ = h.stepper_cmd.receive().await;
            h.stepper_out
                .send(MotionOutcome::Complete { position: 5 })
                .await;
            assert_eq!(h.ready_cfg.receive().await, MeasureReady { token: 7 });
            assert!(h.samples.try_receive().is_err());
            assert!(h.faults.try_receive().is_err());
        });
    }

    #[test]
    fn test_actuator_fault_propagates_without_ready() {
        let h = Harness::new();
        let sensor = MockSensor::new([]);
        h.run(sensor, async {
            h.config
                .send(moved(1, PositionRequest::increment(50)))
                .await;
            let _ = h.stepper_cmd.receive().await;
            h.stepper_out
                .send(MotionOutcome::Fault(FaultCondition::LimitExceeded))
                .await;
            assert_eq!(h.faults.receive().await, FaultCondition::LimitExceeded);
            assert!(h.ready_cfg.try_receive().is_err());
            assert!(h.samples.try_receive().is_err());
        });
    }

    #[test]
    fn test_waveform_source_selected_in_waveform_mode() {
        let h = Harness::new();
        let sensor = MockSensor::new([MockSensor::ok(0x1500), MockSensor::ok(0x1600)]);
        h.run(sensor, async {
            h.mode.send(Mode::Waveform).await;
            h.waveform.send(PositionRequest::move_to(300)).await;
            let _ = h.stepper_cmd.receive().await;
            h.stepper_out
                .send(MotionOutcome::Complete { position: 300 })
                .await;
            let _ = h.samples.receive().await;
            // The ack lands on the waveform side, not the config side
            assert_eq!(h.ready_wf.receive().await, MeasureReady { token: 0 });
            assert!(h.ready_cfg.try_receive().is_err());
        });
    }

    #[test]
    fn test_set_home_forwards_without_ready_ack() {
        let h = Harness::new();
        let sensor = MockSensor::new([]);
        h.run(sensor, async {
            h.config.send(ManagerRequest::SetHome(None)).await;
            assert_eq!(h.stepper_cmd.receive().await, StepperCommand::SetHome(None));
            h.stepper_out
                .send(MotionOutcome::HomeSet { position: 3000 })
                .await;
            // No motion, no measurement: nothing to acknowledge. The next
            // real request's ack carries its own token untainted.
            h.config.send(moved(4, PositionRequest::read_now())).await;
            let _ = h.samples.receive().await;
            assert_eq!(h.ready_cfg.receive().await, MeasureReady { token: 4 });
        });
    }

    #[test]
    fn test_override_preemption_acks_newest_token() {
        let h = Harness::new();
        let sensor = MockSensor::new([MockSensor::ok(0x1800)]);
        h.run(sensor, async {
            h.config
                .send(moved(1, PositionRequest::override_to(4000)))
                .await;
            let _ = h.stepper_cmd.receive().await;
            // Second override lands while the first is still in flight
            h.config
                .send(moved(2, PositionRequest::override_to(100)))
                .await;
            assert_eq!(
                h.stepper_cmd.receive().await,
                StepperCommand::Move(PositionRequest::override_to(100))
            );
            h.stepper_out
                .send(MotionOutcome::Complete { position: 100 })
                .await;
            let _ = h.samples.receive().await;
            assert_eq!(h.ready_cfg.receive().await, MeasureReady { token: 2 });
        });
    }
}
