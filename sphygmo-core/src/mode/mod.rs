//! Mode state machine and host command types

mod command;
mod machine;

pub use command::{HostCommand, ParamId, SessionParams, WaveformParameter};
pub use machine::Mode;
