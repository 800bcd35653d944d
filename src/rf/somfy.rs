//! Somfy RTS frame layout.
//!
//! Seven bytes, obfuscated before transmission:
//!
//! | byte | content                               |
//! |------|---------------------------------------|
//! | 0    | key, always `0xA7`                    |
//! | 1    | button (high nibble), checksum (low)  |
//! | 2–3  | rolling code, big-endian              |
//! | 4–6  | address, little-endian                |
//!
//! The checksum is the XOR of every nibble of the clear frame.  Obfuscation
//! XORs each byte with the previous *obfuscated* byte.

use crate::app::commands::Command;
use crate::catalog::RemoteType;

use super::{EncodeError, EncodeTarget, FrameEncoder, RfFrame};

/// Largest 24-bit remote address.
pub const MAX_ADDRESS: u32 = 0x00FF_FFFF;

pub const FRAME_LEN: usize = 7;

const KEY: u8 = 0xA7;

/// Frames after the first for a normal press.
pub const REPEATS: u8 = 2;
/// A long press is needed for a motor to enter pairing mode.
pub const PROGRAM_REPEATS: u8 = 12;

/// Button code carried in the high nibble of byte 1.
fn button(command: Command) -> u8 {
    match command {
        // "My": stops a moving motor, goes to the favourite position otherwise.
        Command::Stop => 0x1,
        Command::Up => 0x2,
        Command::Down => 0x4,
        Command::Program => 0x8,
    }
}

/// Clear (not yet obfuscated) frame with checksum.
pub fn build_frame(command: Command, rolling_code: u16, address: u32) -> [u8; FRAME_LEN] {
    let [code_hi, code_lo] = rolling_code.to_be_bytes();
    let [a0, a1, a2, _] = address.to_le_bytes();
    let mut frame = [KEY, button(command) << 4, code_hi, code_lo, a0, a1, a2];
    frame[1] |= checksum(&frame);
    frame
}

/// XOR of all nibbles.
pub fn checksum(frame: &[u8]) -> u8 {
    frame.iter().fold(0u8, |c, &b| c ^ b ^ (b >> 4)) & 0x0F
}

pub fn obfuscate(frame: &mut [u8]) {
    for i in 1..frame.len() {
        frame[i] ^= frame[i - 1];
    }
}

/// Inverse of [`obfuscate`].
pub fn deobfuscate(frame: &mut [u8]) {
    for i in (1..frame.len()).rev() {
        frame[i] ^= frame[i - 1];
    }
}

/// Somfy RTS encoder.  Every command is supported.
pub struct SomfyEncoder;

impl FrameEncoder for SomfyEncoder {
    fn protocol(&self) -> RemoteType {
        RemoteType::Somfy
    }

    fn supports(&self, _command: Command) -> bool {
        true
    }

    fn encode(&self, command: Command, target: &EncodeTarget) -> Result<RfFrame, EncodeError> {
        let EncodeTarget::Somfy {
            address,
            rolling_code,
        } = *target
        else {
            return Err(EncodeError::TargetMismatch {
                protocol: RemoteType::Somfy,
            });
        };
        if address > MAX_ADDRESS {
            return Err(EncodeError::AddressOutOfRange);
        }

        let mut frame = build_frame(command, rolling_code, address);
        obfuscate(&mut frame);

        Ok(RfFrame {
            protocol: RemoteType::Somfy,
            payload: frame.into_iter().collect(),
            repeats: if command == Command::Program {
                PROGRAM_REPEATS
            } else {
                REPEATS
            },
        })
    }
}
