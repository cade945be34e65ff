//! Mode/config controller task
//!
//! Top of the pipeline: consumes parsed host commands, enforces the mode
//! transition table, routes work to the measurement manager and the
//! waveform synthesizer, and is the single place downstream faults land.
//! Any fault forces the mode back to idle and is surfaced to the host; a
//! silent host link mid-mode does the same (the original instrument resets
//! its configuration interface when the host application dies).

use core::future::pending;

use embassy_futures::select::{select, select4, Either, Either4};
use embassy_sync::blocking_mutex::raw::RawMutex;
use embassy_sync::channel::{Receiver, Sender};
use embassy_time::{Duration, Instant, Timer};

use crate::fault::FaultCondition;
use crate::mode::{HostCommand, Mode, ParamId, SessionParams};
use crate::motion::{
    ticks_to_duration, ManagerRequest, PositionRequest, FULL_SCALE, MIN_STEP_TIME,
};
use crate::report::StatusEvent;
use crate::waveform::{WaveformCommand, WaveformStatus};

use super::{MeasureReady, CHANNEL_DEPTH};

/// Read-only sampling cadence when the host does not specify one:
/// 100 ms in reference ticks (the cadence the original host tooling polls at)
pub const DEFAULT_READ_INTERVAL: u32 = 10_000_000;

/// Channel endpoints of the mode controller
pub struct ConfigLinks<'a, M: RawMutex> {
    /// Parsed host commands from the transport
    pub host_rx: Receiver<'a, M, HostCommand, CHANNEL_DEPTH>,
    /// Faults from the measurement manager
    pub fault_rx: Receiver<'a, M, FaultCondition, CHANNEL_DEPTH>,
    /// Measurement-ready acks for controller-issued requests
    pub ready_rx: Receiver<'a, M, MeasureReady, CHANNEL_DEPTH>,
    /// Status from the waveform synthesizer
    pub wf_status_rx: Receiver<'a, M, WaveformStatus, CHANNEL_DEPTH>,
    /// Active-source selection to the measurement manager
    pub mode_tx: Sender<'a, M, Mode, CHANNEL_DEPTH>,
    /// Requests to the measurement manager
    pub request_tx: Sender<'a, M, ManagerRequest, CHANNEL_DEPTH>,
    /// Commands to the waveform synthesizer
    pub waveform_tx: Sender<'a, M, WaveformCommand, CHANNEL_DEPTH>,
    /// Status stream to the data reporter
    pub status_tx: Sender<'a, M, StatusEvent, CHANNEL_DEPTH>,
}

enum TimerWake {
    ReadTick,
    LinkTimeout,
}

/// Controller state threaded through the command handler
struct Controller {
    mode: Mode,
    params: SessionParams,
    read_interval: u32,
    /// Monotonic token stamped on every request issued downstream
    next_token: u32,
    /// Token of the outstanding GO_HOME request, if any
    gohome_token: Option<u32>,
}

impl Controller {
    fn new() -> Self {
        Self {
            mode: Mode::Idle,
            params: SessionParams::default(),
            read_interval: DEFAULT_READ_INTERVAL,
            next_token: 0,
            gohome_token: None,
        }
    }

    fn take_token(&mut self) -> u32 {
        self.next_token = self.next_token.wrapping_add(1);
        self.next_token
    }
}

/// Mode/config controller task
///
/// `version` is echoed in identification replies; `host_timeout` bounds how
/// long a non-idle mode survives host silence.
pub async fn config_task<M: RawMutex>(
    links: ConfigLinks<'_, M>,
    version: &'static str,
    host_timeout: Duration,
) -> ! {
    let mut ctl = Controller::new();
    let mut last_host = Instant::now();

    loop {
        let wake = select4(
            links.host_rx.receive(),
            links.fault_rx.receive(),
            select(links.ready_rx.receive(), links.wf_status_rx.receive()),
            timer_arm(ctl.mode, ctl.read_interval, last_host, host_timeout),
        )
        .await;

        match wake {
            Either4::First(command) => {
                last_host = Instant::now();
                handle_command(&links, &mut ctl, version, command).await;
            }

            Either4::Second(fault) => {
                // Never cleared here: the host must issue a fresh command
                enter_idle(&links, &mut ctl).await;
                links.status_tx.send(StatusEvent::Fault(fault)).await;
            }

            Either4::Third(Either::First(MeasureReady { token })) => {
                // GO_HOME auto-returns to idle once its own request (and
                // only its own - the token says so) completes
                if ctl.mode == Mode::GoHome && ctl.gohome_token == Some(token) {
                    enter_idle(&links, &mut ctl).await;
                }
            }

            Either4::Third(Either::Second(status)) => {
                links.status_tx.send(StatusEvent::Waveform(status)).await;
            }

            Either4::Fourth(TimerWake::ReadTick) => {
                let token = ctl.take_token();
                links
                    .request_tx
                    .send(ManagerRequest::Move {
                        token,
                        request: PositionRequest::read_now(),
                    })
                    .await;
            }

            Either4::Fourth(TimerWake::LinkTimeout) => {
                enter_idle(&links, &mut ctl).await;
                links.status_tx.send(StatusEvent::LinkTimeout).await;
                last_host = Instant::now();
            }
        }
    }
}

/// The controller's only timer needs: the read-only sampling tick and the
/// host-link watchdog. Idle has neither.
async fn timer_arm(
    mode: Mode,
    read_interval: u32,
    last_host: Instant,
    host_timeout: Duration,
) -> TimerWake {
    match mode {
        Mode::Idle => pending().await,
        Mode::ReadOnly => {
            match select(
                Timer::after(ticks_to_duration(read_interval)),
                Timer::at(last_host + host_timeout),
            )
            .await
            {
                Either::First(()) => TimerWake::ReadTick,
                Either::Second(()) => TimerWake::LinkTimeout,
            }
        }
        _ => {
            Timer::at(last_host + host_timeout).await;
            TimerWake::LinkTimeout
        }
    }
}

/// Force the controller (and everything downstream) back to idle
async fn enter_idle<M: RawMutex>(links: &ConfigLinks<'_, M>, ctl: &mut Controller) {
    ctl.mode = Mode::Idle;
    ctl.gohome_token = None;
    links.waveform_tx.send(WaveformCommand::Stop).await;
    links.mode_tx.send(Mode::Idle).await;
    links
        .status_tx
        .send(StatusEvent::ModeChanged(Mode::Idle))
        .await;
}

async fn set_mode<M: RawMutex>(links: &ConfigLinks<'_, M>, ctl: &mut Controller, next: Mode) {
    if ctl.mode != next {
        ctl.mode = next;
        links.mode_tx.send(next).await;
        links.status_tx.send(StatusEvent::ModeChanged(next)).await;
    }
}

async fn send_move<M: RawMutex>(
    links: &ConfigLinks<'_, M>,
    ctl: &mut Controller,
    request: PositionRequest,
) -> u32 {
    let token = ctl.take_token();
    links
        .request_tx
        .send(ManagerRequest::Move { token, request })
        .await;
    token
}

async fn reject<M: RawMutex>(links: &ConfigLinks<'_, M>, ctl: &Controller) {
    links
        .status_tx
        .send(StatusEvent::CommandRejected { mode: ctl.mode })
        .await;
}

async fn handle_command<M: RawMutex>(
    links: &ConfigLinks<'_, M>,
    ctl: &mut Controller,
    version: &'static str,
    command: HostCommand,
) {
    // Invalid for the current state: rejected, reported, no state change
    if !ctl.mode.accepts(&command) {
        reject(links, ctl).await;
        return;
    }

    match command {
        HostCommand::Idle => enter_idle(links, ctl).await,

        HostCommand::ReadOnly { interval_ticks } => {
            ctl.read_interval = interval_ticks.max(MIN_STEP_TIME);
            set_mode(links, ctl, Mode::ReadOnly).await;
        }

        HostCommand::GoHome => {
            set_mode(links, ctl, Mode::GoHome).await;
            let token = send_move(links, ctl, PositionRequest::goto_zero()).await;
            ctl.gohome_token = Some(token);
        }

        HostCommand::SetHome => {
            // Transient excursion: no motion is emitted, the capture
            // request goes downstream and the controller is back in idle
            // before the next command is read
            set_mode(links, ctl, Mode::SetHome).await;
            links.request_tx.send(ManagerRequest::SetHome(None)).await;
            set_mode(links, ctl, Mode::Idle).await;
        }

        HostCommand::Increment { delta } => {
            set_mode(links, ctl, Mode::Increment).await;
            send_move(links, ctl, PositionRequest::increment(delta)).await;
        }

        HostCommand::Override { target } => {
            if (target as i32) >= FULL_SCALE {
                reject(links, ctl).await;
                return;
            }
            set_mode(links, ctl, Mode::Override).await;
            send_move(links, ctl, PositionRequest::override_to(target as i32)).await;
        }

        HostCommand::Waveform => set_mode(links, ctl, Mode::Waveform).await,

        HostCommand::LoadStart => links.waveform_tx.send(WaveformCommand::Load).await,
        HostCommand::LoadPoint(value) => {
            links.waveform_tx.send(WaveformCommand::Point(value)).await;
        }
        HostCommand::LoadEnd => links.waveform_tx.send(WaveformCommand::EndLoad).await,
        HostCommand::PlayPoint => links.waveform_tx.send(WaveformCommand::PlayPoint).await,
        HostCommand::PlayWaveform => {
            links.waveform_tx.send(WaveformCommand::PlayWaveform).await;
        }

        HostCommand::SetParam(param) => {
            // The home offset lives in the actuator and only moves while
            // everything is parked
            if param.id == ParamId::Home && ctl.mode != Mode::Idle {
                reject(links, ctl).await;
                return;
            }
            ctl.params.apply(param);
            if param.id == ParamId::Home {
                links
                    .request_tx
                    .send(ManagerRequest::SetHome(Some(param.value as i32)))
                    .await;
            } else {
                links
                    .waveform_tx
                    .send(WaveformCommand::SetParam(param))
                    .await;
            }
        }

        HostCommand::ReadNow => {
            send_move(links, ctl, PositionRequest::read_now()).await;
        }

        HostCommand::Version => {
            links.status_tx.send(StatusEvent::Version(version)).await;
        }
    }
}
