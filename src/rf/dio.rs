//! Chacon DiO 1.0 frame layout.
//!
//! A 32-bit word, most significant bit first:
//!
//! ```text
//!   [ sender:26 | group:1 | on:1 | interruptor:4 ]
//! ```
//!
//! The payload carries the word big-endian followed by an action byte.
//! The action selects how the `on` bit is rendered on air: a normal on/off
//! bit, or the "dim" symbol that DiO 1.0 receivers treat as a stop.

use crate::app::commands::Command;
use crate::catalog::RemoteType;

use super::{EncodeError, EncodeTarget, FrameEncoder, RfFrame};

/// Largest 26-bit emitter address.
pub const MAX_SENDER: u32 = (1 << 26) - 1;
/// Largest receiver channel.
pub const MAX_INTERRUPTOR: u8 = 15;

pub const FRAME_LEN: usize = 5;

/// Frames after the first.  DiO receivers need several copies to latch.
pub const REPEATS: u8 = 4;

/// How the `on` bit is sent.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum Action {
    Off = 0,
    On = 1,
    Dim = 2,
}

impl Action {
    pub fn from_byte(b: u8) -> Option<Self> {
        match b {
            0 => Some(Self::Off),
            1 => Some(Self::On),
            2 => Some(Self::Dim),
            _ => None,
        }
    }
}

fn action(command: Command) -> Option<Action> {
    match command {
        Command::Up => Some(Action::On),
        Command::Down => Some(Action::Off),
        Command::Stop => Some(Action::Dim),
        Command::Program => None,
    }
}

/// Pack the 32-bit word.  Group mode is never used: groups are expanded
/// to their members before encoding.
pub fn word(sender: u32, on: bool, interruptor: u8) -> u32 {
    (sender & MAX_SENDER) << 6 | u32::from(on) << 4 | u32::from(interruptor & 0x0F)
}

/// DiO encoder.  `Program` has no DiO equivalent.
pub struct DioEncoder;

impl FrameEncoder for DioEncoder {
    fn protocol(&self) -> RemoteType {
        RemoteType::Dio
    }

    fn supports(&self, command: Command) -> bool {
        action(command).is_some()
    }

    fn encode(&self, command: Command, target: &EncodeTarget) -> Result<RfFrame, EncodeError> {
        let EncodeTarget::Dio {
            sender,
            interruptor,
        } = *target
        else {
            return Err(EncodeError::TargetMismatch {
                protocol: RemoteType::Dio,
            });
        };
        let Some(action) = action(command) else {
            return Err(EncodeError::UnsupportedCommand {
                command,
                protocol: RemoteType::Dio,
            });
        };
        if sender > MAX_SENDER || interruptor > MAX_INTERRUPTOR {
            return Err(EncodeError::AddressOutOfRange);
        }

        let w = word(sender, action == Action::On, interruptor);
        let mut payload = heapless::Vec::new();
        payload.extend(w.to_be_bytes());
        payload.extend([action as u8]);

        Ok(RfFrame {
            protocol: RemoteType::Dio,
            payload,
            repeats: REPEATS,
        })
    }
}
