//! Waveform synthesizer task
//!
//! Wraps the [`Synth`] state machine in the pacing loop: one position
//! request per cycle, each gated on the measurement manager's ready
//! acknowledgment and on the cadence interval derived from the session
//! parameters. A stop command (or the mode controller aborting to idle)
//! cancels playback at the next suspension point.

use embassy_futures::select::{select, Either};
use embassy_sync::blocking_mutex::raw::RawMutex;
use embassy_sync::channel::{Receiver, Sender};
use embassy_time::{Instant, Timer};

use crate::motion::{ticks_to_duration, PositionRequest};
use crate::waveform::{Synth, WaveformCommand, WaveformStatus};

use super::{MeasureReady, CHANNEL_DEPTH};

/// Channel endpoints of the synthesizer task
pub struct WaveformLinks<'a, M: RawMutex> {
    /// Commands from the mode controller (control, points, parameters)
    pub command_rx: Receiver<'a, M, WaveformCommand, CHANNEL_DEPTH>,
    /// Measurement-ready acks from the measurement manager
    pub ready_rx: Receiver<'a, M, MeasureReady, CHANNEL_DEPTH>,
    /// Position requests to the measurement manager
    pub request_tx: Sender<'a, M, PositionRequest, CHANNEL_DEPTH>,
    /// Status reports back to the mode controller
    pub status_tx: Sender<'a, M, WaveformStatus, CHANNEL_DEPTH>,
}

/// Waveform synthesizer task
pub async fn waveform_task<M: RawMutex>(links: WaveformLinks<'_, M>) -> ! {
    let mut synth = Synth::new();

    loop {
        if !synth.is_playing() {
            let command = links.command_rx.receive().await;
            let started = apply(&mut synth, &links, command);
            if started {
                // Acks left over from an earlier session must not pace
                // this one
                while links.ready_rx.try_receive().is_ok() {}
            }
            continue;
        }

        let Some((request, interval_ticks)) = synth.next_request() else {
            continue;
        };
        let deadline = Instant::now() + ticks_to_duration(interval_ticks);
        links.request_tx.send(request).await;

        // Gate 1: the measurement-ready handshake. Commands keep flowing so
        // a stop cancels playback instead of queueing behind it.
        loop {
            match select(links.ready_rx.receive(), links.command_rx.receive()).await {
                Either::First(MeasureReady { .. }) => break,
                Either::Second(command) => {
                    apply(&mut synth, &links, command);
                    if !synth.is_playing() {
                        break;
                    }
                }
            }
        }
        if !synth.is_playing() {
            continue;
        }

        // Gate 2: the remainder of the cadence interval
        loop {
            match select(Timer::at(deadline), links.command_rx.receive()).await {
                Either::First(()) => break,
                Either::Second(command) => {
                    apply(&mut synth, &links, command);
                    if !synth.is_playing() {
                        break;
                    }
                }
            }
        }
    }
}

/// Feed one command to the machine, forward any status, and report whether
/// playback just started
fn apply<M: RawMutex>(
    synth: &mut Synth,
    links: &WaveformLinks<'_, M>,
    command: WaveformCommand,
) -> bool {
    let was_playing = synth.is_playing();
    if let Some(status) = synth.handle(command) {
        // Status is advisory; a full status channel must never block the
        // command path
        let _ = links.status_tx.try_send(status);
    }
    !was_playing && synth.is_playing()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mode::{ParamId, WaveformParameter};
    use embassy_sync::blocking_mutex::raw::NoopRawMutex;
    use embassy_sync::channel::Channel;
    use embassy_time::Duration;
    use futures_lite::future::block_on;

    struct Harness {
        commands: Channel<NoopRawMutex, WaveformCommand, CHANNEL_DEPTH>,
        ready: Channel<NoopRawMutex, MeasureReady, CHANNEL_DEPTH>,
        requests: Channel<NoopRawMutex, PositionRequest, CHANNEL_DEPTH>,
        status: Channel<NoopRawMutex, WaveformStatus, CHANNEL_DEPTH>,
    }

    impl Harness {
        fn new() -> Self {
            Self {
                commands: Channel::new(),
                ready: Channel::new(),
                requests: Channel::new(),
                status: Channel::new(),
            }
        }

        fn links(&self) -> WaveformLinks<'_, NoopRawMutex> {
            WaveformLinks {
                command_rx: self.commands.receiver(),
                ready_rx: self.ready.receiver(),
                request_tx: self.requests.sender(),
                status_tx: self.status.sender(),
            }
        }

        fn run(&self, scenario: impl core::future::Future<Output = ()>) {
            block_on(async {
                match select(waveform_task(self.links()), scenario).await {
                    Either::First(never) => match never {},
                    Either::Second(()) => {}
                }
            });
        }

        async fn load(&self, points: &[u16]) {
            // Flat baseline so emitted targets equal the loaded points
            self.commands
                .send(WaveformCommand::SetParam(WaveformParameter {
                    id: ParamId::RespRate,
                    value: 0,
                }))
                .await;
            self.commands.send(WaveformCommand::Load).await;
            for &p in points {
                self.commands.send(WaveformCommand::Point(p)).await;
            }
            self.commands.send(WaveformCommand::EndLoad).await;
            assert_eq!(
                self.status.receive().await,
                WaveformStatus::Loaded {
                    len: points.len() as u16
                }
            );
        }
    }

    #[test]
    fn test_no_request_before_ready_ack() {
        let h = Harness::new();
        h.run(async {
            h.load(&[100, 200]).await;
            h.commands.send(WaveformCommand::PlayWaveform).await;

            let first = h.requests.receive().await;
            assert_eq!(first.target_steps, 100);

            // Ready withheld: the synthesizer must not emit a second
            // request no matter how long we wait
            Timer::after(Duration::from_millis(10)).await;
            assert!(h.requests.try_receive().is_err());

            // The handshake releases the next request
            h.ready.send(MeasureReady { token: 0 }).await;
            let second = h.requests.receive().await;
            assert_eq!(second.target_steps, 200);
        });
    }

    #[test]
    fn test_stop_cancels_playback_while_awaiting_ready() {
        let h = Harness::new();
        h.run(async {
            h.load(&[100]).await;
            h.commands.send(WaveformCommand::PlayWaveform).await;
            let _ = h.requests.receive().await;

            // Never acknowledge; stop instead
            h.commands.send(WaveformCommand::Stop).await;
            assert_eq!(h.status.receive().await, WaveformStatus::Stopped);
            Timer::after(Duration::from_millis(5)).await;
            assert!(h.requests.try_receive().is_err());
        });
    }

    #[test]
    fn test_stale_ready_does_not_pace_next_session() {
        let h = Harness::new();
        h.run(async {
            h.load(&[100, 200]).await;
            h.commands.send(WaveformCommand::PlayWaveform).await;
            let _ = h.requests.receive().await;
            h.commands.send(WaveformCommand::Stop).await;
            assert_eq!(h.status.receive().await, WaveformStatus::Stopped);

            // The abandoned ack from the aborted session arrives late
            h.ready.send(MeasureReady { token: 0 }).await;

            // A new session still emits exactly one request up front and
            // then waits for its own ack
            h.commands.send(WaveformCommand::PlayWaveform).await;
            let _ = h.requests.receive().await;
            Timer::after(Duration::from_millis(10)).await;
            assert!(h.requests.try_receive().is_err());
        });
    }

    #[test]
    fn test_load_rejections_are_reported_not_fatal() {
        let h = Harness::new();
        h.run(async {
            h.commands.send(WaveformCommand::Load).await;
            h.commands.send(WaveformCommand::Point(60_000)).await;
            assert_eq!(h.status.receive().await, WaveformStatus::PointRejected);
            h.commands.send(WaveformCommand::Point(500)).await;
            h.commands.send(WaveformCommand::EndLoad).await;
            assert_eq!(h.status.receive().await, WaveformStatus::Loaded { len: 1 });
        });
    }
}
