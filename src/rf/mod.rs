//! 433.42 MHz frame encoding.
//!
//! ```text
//!   Command + EncodeTarget ──FrameEncoder──▶ RfFrame ──waveform──▶ [Pulse] ──▶ RadioPort
//! ```
//!
//! Encoders are pure: they produce the payload bytes and repeat count of
//! one burst.  Timing lives in [`waveform`] so the same frame can be
//! replayed on hardware or inspected in tests.

pub mod dio;
pub mod somfy;
pub mod waveform;

use core::fmt;

use crate::app::commands::Command;
use crate::catalog::RemoteType;

/// Longest payload of any protocol (Somfy: 7 bytes).
pub const MAX_PAYLOAD: usize = 8;

/// One encoded burst, ready for the radio.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RfFrame {
    pub protocol: RemoteType,
    /// Protocol-specific payload bytes (see [`somfy`] and [`dio`]).
    pub payload: heapless::Vec<u8, MAX_PAYLOAD>,
    /// Frames sent after the first one.
    pub repeats: u8,
}

/// Addressing data an encoder needs for one remote.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EncodeTarget {
    Somfy { address: u32, rolling_code: u16 },
    Dio { sender: u32, interruptor: u8 },
}

/// Frame encoding errors.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EncodeError {
    /// The protocol has no such command.
    UnsupportedCommand {
        command: Command,
        protocol: RemoteType,
    },
    /// The target belongs to the other protocol.
    TargetMismatch { protocol: RemoteType },
    /// Address wider than the protocol's field.
    AddressOutOfRange,
}

impl fmt::Display for EncodeError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::UnsupportedCommand { command, protocol } => {
                write!(f, "{:?} not supported by {}", command, protocol)
            }
            Self::TargetMismatch { protocol } => write!(f, "target is not a {} remote", protocol),
            Self::AddressOutOfRange => write!(f, "address out of range"),
        }
    }
}

/// Builds frames for one protocol.
pub trait FrameEncoder {
    fn protocol(&self) -> RemoteType;

    fn supports(&self, command: Command) -> bool;

    fn encode(&self, command: Command, target: &EncodeTarget) -> Result<RfFrame, EncodeError>;
}

/// Encoder for `protocol`.
pub fn encoder_for(protocol: RemoteType) -> &'static dyn FrameEncoder {
    match protocol {
        RemoteType::Somfy => &somfy::SomfyEncoder,
        RemoteType::Dio => &dio::DioEncoder,
    }
}
