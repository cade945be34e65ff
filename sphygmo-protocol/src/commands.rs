//! Host command parsing
//!
//! A [`LineReader`] accumulates transport bytes into lines, tolerating
//! garbage, blank lines and both LF and CRLF endings; [`parse_command`]
//! turns one complete line into a [`HostCommand`].

use heapless::Vec;

use sphygmo_core::mode::{HostCommand, ParamId, WaveformParameter};

/// Longest accepted command line (letter, arguments, terminator)
pub const MAX_LINE_LEN: usize = 32;

/// Errors from command parsing
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum ParseError {
    /// Line did not terminate within [`MAX_LINE_LEN`] bytes
    LineTooLong,
    /// Unknown command letter
    UnknownCommand,
    /// Argument missing, malformed, or out of range
    BadArgument,
}

/// Accumulates bytes into newline-terminated lines
#[derive(Debug, Default)]
pub struct LineReader {
    buffer: Vec<u8, MAX_LINE_LEN>,
    overflowed: bool,
}

impl LineReader {
    pub fn new() -> Self {
        Self::default()
    }

    /// Feed one byte
    ///
    /// Returns `Ok(Some(line))` when a complete non-empty line is ready,
    /// `Ok(None)` when more bytes are needed. An over-long line is reported
    /// once and then discarded up to its terminator.
    pub fn feed(&mut self, byte: u8) -> Result<Option<Vec<u8, MAX_LINE_LEN>>, ParseError> {
        match byte {
            b'\n' => {
                let overflowed = self.overflowed;
                self.overflowed = false;
                let mut line = core::mem::take(&mut self.buffer);
                if overflowed {
                    return Err(ParseError::LineTooLong);
                }
                // Tolerate CRLF endings and skip blank lines
                if line.last() == Some(&b'\r') {
                    line.pop();
                }
                if line.is_empty() {
                    Ok(None)
                } else {
                    Ok(Some(line))
                }
            }
            _ if self.overflowed => Ok(None),
            _ => {
                if self.buffer.push(byte).is_err() {
                    self.overflowed = true;
                }
                Ok(None)
            }
        }
    }
}

/// Parse one complete line into a host command
pub fn parse_command(line: &[u8]) -> Result<HostCommand, ParseError> {
    let (letter, rest) = line.split_first().ok_or(ParseError::UnknownCommand)?;
    let mut args = Args::new(rest);

    let command = match letter {
        b'Q' => HostCommand::Idle,
        b'V' => HostCommand::Version,
        b'r' => HostCommand::ReadNow,
        b'R' => HostCommand::ReadOnly {
            interval_ticks: args
                .next_u32()?
                .unwrap_or(sphygmo_core::tasks::DEFAULT_READ_INTERVAL),
        },
        b'H' => HostCommand::GoHome,
        b'M' => HostCommand::SetHome,
        b'I' => HostCommand::Increment {
            delta: args.next_i32()?.ok_or(ParseError::BadArgument)?,
        },
        b'O' => HostCommand::Override {
            target: args.require_u16()?,
        },
        b'W' => HostCommand::Waveform,
        b'L' => HostCommand::LoadStart,
        b'D' => HostCommand::LoadPoint(args.require_u16()?),
        b'E' => HostCommand::LoadEnd,
        b'p' => HostCommand::PlayPoint,
        b'P' => HostCommand::PlayWaveform,
        b'S' => {
            let id = match args.require_u16()? {
                1 => ParamId::Home,
                2 => ParamId::HeartRate,
                3 => ParamId::RespRate,
                4 => ParamId::CalMax,
                _ => return Err(ParseError::BadArgument),
            };
            HostCommand::SetParam(WaveformParameter {
                id,
                value: args.require_u16()?,
            })
        }
        _ => return Err(ParseError::UnknownCommand),
    };

    // Trailing junk after the arguments is a malformed line
    if args.next_token().is_some() {
        return Err(ParseError::BadArgument);
    }
    Ok(command)
}

/// Whitespace-separated decimal argument scanner
struct Args<'a> {
    rest: &'a [u8],
}

impl<'a> Args<'a> {
    fn new(rest: &'a [u8]) -> Self {
        Self { rest }
    }

    fn next_token(&mut self) -> Option<&'a [u8]> {
        let start = self.rest.iter().position(|b| !b.is_ascii_whitespace())?;
        let rest = &self.rest[start..];
        let end = rest
            .iter()
            .position(|b| b.is_ascii_whitespace())
            .unwrap_or(rest.len());
        self.rest = &rest[end..];
        Some(&rest[..end])
    }

    fn next_u32(&mut self) -> Result<Option<u32>, ParseError> {
        match self.next_token() {
            None => Ok(None),
            Some(token) => parse_decimal(token)
                .and_then(|v| u32::try_from(v).ok())
                .map(Some)
                .ok_or(ParseError::BadArgument),
        }
    }

    fn next_i32(&mut self) -> Result<Option<i32>, ParseError> {
        match self.next_token() {
            None => Ok(None),
            Some(token) => parse_decimal(token)
                .and_then(|v| i32::try_from(v).ok())
                .map(Some)
                .ok_or(ParseError::BadArgument),
        }
    }

    fn require_u16(&mut self) -> Result<u16, ParseError> {
        self.next_u32()?
            .and_then(|v| u16::try_from(v).ok())
            .ok_or(ParseError::BadArgument)
    }
}

/// Parse a signed decimal integer without std
fn parse_decimal(token: &[u8]) -> Option<i64> {
    let (negative, digits) = match token.split_first()? {
        (b'-', rest) => (true, rest),
        (b'+', rest) => (false, rest),
        _ => (false, token),
    };
    if digits.is_empty() || digits.len() > 10 {
        return None;
    }
    let mut value: i64 = 0;
    for &b in digits {
        if !b.is_ascii_digit() {
            return None;
        }
        value = value * 10 + (b - b'0') as i64;
    }
    Some(if negative { -value } else { value })
}
