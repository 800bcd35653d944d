//! Cover command and state vocabulary.
//!
//! Inbound payloads on `<topic_base>/set` map to a [`Command`] by exact,
//! case-sensitive match; the letters are the ones the discovery document
//! advertises as `payload_open` / `payload_close` / `payload_stop`.

use core::fmt;

/// A command the bridge can send to a shutter.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Command {
    /// Open (`u`).
    Up,
    /// Close (`d`).
    Down,
    /// Stop, or go to the favourite position on Somfy motors (`s`).
    Stop,
    /// Somfy pairing press (`p`).  Not available on DiO.
    Program,
}

impl Command {
    pub const ALL: [Command; 4] = [Self::Up, Self::Down, Self::Stop, Self::Program];

    /// Parse an MQTT payload.  Anything but an exact match is rejected.
    pub fn from_payload(payload: &[u8]) -> Option<Self> {
        match payload {
            b"u" => Some(Self::Up),
            b"d" => Some(Self::Down),
            b"s" => Some(Self::Stop),
            b"p" => Some(Self::Program),
            _ => None,
        }
    }

    /// Payload that selects this command.
    pub fn payload(self) -> &'static str {
        match self {
            Self::Up => "u",
            Self::Down => "d",
            Self::Stop => "s",
            Self::Program => "p",
        }
    }

    /// State the cover is reported in after this command.  Programming
    /// does not move the cover.
    pub fn resulting_state(self) -> Option<CoverState> {
        match self {
            Self::Up => Some(CoverState::Open),
            Self::Down => Some(CoverState::Closed),
            Self::Stop => Some(CoverState::Stopped),
            Self::Program => None,
        }
    }
}

/// State published on `<topic_base>/state`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CoverState {
    Open,
    Closed,
    Stopped,
}

impl CoverState {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Open => "open",
            Self::Closed => "closed",
            Self::Stopped => "stopped",
        }
    }
}

impl fmt::Display for CoverState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
