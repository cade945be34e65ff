//! Mode transition table
//!
//! Exactly one mode is active at a time. All transitions go through
//! [`Mode::accepts`]; a command invalid for the current mode is rejected and
//! reported, with no state change. Any downstream fault forces the mode back
//! to [`Mode::Idle`] regardless of the table.

use super::command::HostCommand;

/// Top-level operating state, selected by the host
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum Mode {
    /// No motion, no sampling; the only state new modes start from
    Idle,
    /// Periodic sensor sampling without motion
    ReadOnly,
    /// Single move to the home offset, auto-returns to idle
    GoHome,
    /// Transient: captures the current position as the home offset and
    /// returns to idle without motion
    SetHome,
    /// Relative moves per host-specified deltas
    Increment,
    /// Absolute moves that may preempt one another
    Override,
    /// Playback delegated to the waveform synthesizer
    Waveform,
}

impl Mode {
    /// Whether `command` is valid in this mode
    ///
    /// This is the full transition table: active modes are entered from idle
    /// only, idle is reachable from anywhere, and in-mode commands
    /// (increment deltas, override targets, waveform play selection) are
    /// valid only while their mode is active.
    pub fn accepts(self, command: &HostCommand) -> bool {
        use Mode::*;
        match command {
            // Idle and identification are always honored
            HostCommand::Idle | HostCommand::Version => true,

            // Mode entry points, from idle only
            HostCommand::ReadOnly { .. } => self == Idle,
            HostCommand::GoHome => self == Idle,
            HostCommand::SetHome => self == Idle,
            HostCommand::Waveform => self == Idle,

            // Delta/target moves enter their mode from idle and repeat in it
            HostCommand::Increment { .. } => matches!(self, Idle | Increment),
            HostCommand::Override { .. } => matches!(self, Idle | Override),

            // Waveform loading never moves the actuator; allowed while idle
            // or while waveform mode is selected (the synthesizer's own
            // state machine gates loading against active playback)
            HostCommand::LoadStart | HostCommand::LoadPoint(_) | HostCommand::LoadEnd => {
                matches!(self, Idle | Waveform)
            }

            // Playback selection requires waveform mode
            HostCommand::PlayPoint | HostCommand::PlayWaveform => self == Waveform,

            // Parameters may be retuned while idle or during playback
            HostCommand::SetParam(_) => matches!(self, Idle | Waveform),

            // One-shot reads while idle or in read-only mode
            HostCommand::ReadNow => matches!(self, Idle | ReadOnly),
        }
    }

    /// The mode an accepted command leaves the controller in
    pub fn after(self, command: &HostCommand) -> Mode {
        use Mode::*;
        match command {
            HostCommand::Idle => Idle,
            HostCommand::ReadOnly { .. } => ReadOnly,
            HostCommand::GoHome => GoHome,
            // SET_HOME emits no motion; the controller leaves it for idle
            // as soon as the capture request is issued
            HostCommand::SetHome => SetHome,
            HostCommand::Increment { .. } => Increment,
            HostCommand::Override { .. } => Override,
            HostCommand::Waveform => Waveform,
            _ => self,
        }
    }

    /// Short wire name used in host status reports
    pub fn name(&self) -> &'static str {
        match self {
            Mode::Idle => "IDLE",
            Mode::ReadOnly => "READ_ONLY",
            Mode::GoHome => "GO_HOME",
            Mode::SetHome => "SET_HOME",
            Mode::Increment => "INCREMENT",
            Mode::Override => "OVERRIDE",
            Mode::Waveform => "WAVEFORM",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mode::command::{ParamId, WaveformParameter};

    const ALL_MODES: [Mode; 7] = [
        Mode::Idle,
        Mode::ReadOnly,
        Mode::GoHome,
        Mode::SetHome,
        Mode::Increment,
        Mode::Override,
        Mode::Waveform,
    ];

    fn all_commands() -> [HostCommand; 15] {
        [
            HostCommand::Idle,
            HostCommand::ReadOnly {
                interval_ticks: 10_000_000,
            },
            HostCommand::GoHome,
            HostCommand::SetHome,
            HostCommand::Increment { delta: 10 },
            HostCommand::Override { target: 100 },
            HostCommand::Waveform,
            HostCommand::LoadStart,
            HostCommand::LoadPoint(0),
            HostCommand::LoadEnd,
            HostCommand::PlayPoint,
            HostCommand::PlayWaveform,
            HostCommand::SetParam(WaveformParameter {
                id: ParamId::HeartRate,
                value: 60,
            }),
            HostCommand::ReadNow,
            HostCommand::Version,
        ]
    }

    #[test]
    fn test_idle_accepts_every_mode_entry() {
        for cmd in [
            HostCommand::ReadOnly {
                interval_ticks: 10_000_000,
            },
            HostCommand::GoHome,
            HostCommand::SetHome,
            HostCommand::Increment { delta: 1 },
            HostCommand::Override { target: 1 },
            HostCommand::Waveform,
        ] {
            assert!(Mode::Idle.accepts(&cmd), "idle rejected {:?}", cmd);
        }
    }

    #[test]
    fn test_idle_reachable_from_every_mode() {
        for mode in ALL_MODES {
            assert!(mode.accepts(&HostCommand::Idle));
            assert_eq!(mode.after(&HostCommand::Idle), Mode::Idle);
        }
    }

    #[test]
    fn test_active_modes_reject_cross_entry() {
        // Active modes must be left via idle before another can start
        for mode in [
            Mode::ReadOnly,
            Mode::GoHome,
            Mode::SetHome,
            Mode::Increment,
            Mode::Override,
        ] {
            assert!(!mode.accepts(&HostCommand::Waveform));
            assert!(!mode.accepts(&HostCommand::GoHome) || mode == Mode::GoHome);
        }
        assert!(!Mode::Waveform.accepts(&HostCommand::Increment { delta: 1 }));
        assert!(!Mode::Increment.accepts(&HostCommand::Override { target: 1 }));
    }

    #[test]
    fn test_play_requires_waveform_mode() {
        for mode in ALL_MODES {
            let accepted = mode.accepts(&HostCommand::PlayWaveform);
            assert_eq!(accepted, mode == Mode::Waveform);
        }
    }

    #[test]
    fn test_after_is_total_over_accepted_commands() {
        // after() must land every accepted (mode, command) pair in a
        // defined mode; idle must remain reachable from whatever it is
        for mode in ALL_MODES {
            for cmd in all_commands() {
                if mode.accepts(&cmd) {
                    let next = mode.after(&cmd);
                    assert!(next.accepts(&HostCommand::Idle));
                }
            }
        }
    }

    #[test]
    fn test_set_home_is_a_transient_excursion() {
        assert!(Mode::Idle.accepts(&HostCommand::SetHome));
        assert_eq!(Mode::Idle.after(&HostCommand::SetHome), Mode::SetHome);
        // Idle is always reachable to complete the excursion
        assert!(Mode::SetHome.accepts(&HostCommand::Idle));
    }

    #[test]
    fn test_in_mode_repetition() {
        assert!(Mode::Increment.accepts(&HostCommand::Increment { delta: -5 }));
        assert_eq!(
            Mode::Increment.after(&HostCommand::Increment { delta: -5 }),
            Mode::Increment
        );
        assert!(Mode::Override.accepts(&HostCommand::Override { target: 9 }));
    }
}
