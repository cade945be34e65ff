//! Host-link protocol for the Sphygmo pressure waveform generator
//!
//! Line-oriented ASCII over the virtual serial link: the host sends
//! single-letter commands with optional decimal arguments, the firmware
//! answers with comma-separated report lines. The format is deliberately
//! simple enough to drive from a terminal.
//!
//! # Command surface
//!
//! ```text
//! Q            idle / abort          V            identify
//! r            read once             R [ticks]    read-only mode
//! H            go home               M            mark current position home
//! I <delta>    increment move        O <target>   override move
//! W            waveform mode         L / D <v> / E  load start/point/end
//! p            play single point     P            play waveform
//! S <id> <v>   set parameter (1=home 2=heart rate 3=resp rate 4=cal max)
//! ```
//!
//! # Report lines
//!
//! ```text
//! R,<seq>,<position>,<mpsi>[,<temp>]   pressure sample
//! F,<code>                             fault
//! S,<mode>                             mode change
//! E,...                                rejections / link events
//! W,...                                waveform load results
//! V,<version>                          identification
//! ```

#![no_std]
#![deny(unsafe_code)]

#[cfg(test)]
#[macro_use]
extern crate std;

pub mod commands;
pub mod reports;

pub use commands::{parse_command, LineReader, ParseError, MAX_LINE_LEN};
pub use reports::{encode_sample, encode_status, ReportLine};
