//! On-air timings.
//!
//! Turns an [`RfFrame`] into the OOK pulse train of the whole burst
//! (first frame plus repeats).  The radio adapter replays the train on the
//! transmitter's data pin; tests inspect it directly.

use crate::catalog::RemoteType;

use super::{RfFrame, dio, somfy};

/// One constant-level segment of the carrier.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Pulse {
    pub high: bool,
    pub micros: u32,
}

impl Pulse {
    const fn high(micros: u32) -> Self {
        Self { high: true, micros }
    }

    const fn low(micros: u32) -> Self {
        Self { high: false, micros }
    }
}

// Somfy RTS
const SOMFY_SYMBOL: u32 = 640;
const SOMFY_WAKEUP_HIGH: u32 = 9415;
const SOMFY_WAKEUP_LOW: u32 = 89_565;
const SOMFY_HW_SYNC: u32 = 4 * SOMFY_SYMBOL;
const SOMFY_SW_SYNC: u32 = 4550;
const SOMFY_GAP: u32 = 30_415;
const SOMFY_FIRST_SYNCS: usize = 2;
const SOMFY_REPEAT_SYNCS: usize = 7;

// DiO 1.0
const DIO_PULSE: u32 = 275;
const DIO_ONE_LOW: u32 = 1225;
const DIO_ZERO_LOW: u32 = 275;
const DIO_LATCH_1: u32 = 9900;
const DIO_LATCH_2: u32 = 2675;
const DIO_END: u32 = 10_000;

/// Pulse train of a complete burst, or `None` if the payload does not
/// match the protocol's frame length.
pub fn render(frame: &RfFrame) -> Option<Vec<Pulse>> {
    let mut out = Vec::new();
    match frame.protocol {
        RemoteType::Somfy => {
            let bytes: &[u8; somfy::FRAME_LEN] = frame.payload.as_slice().try_into().ok()?;
            somfy_frame(bytes, true, &mut out);
            for _ in 0..frame.repeats {
                somfy_frame(bytes, false, &mut out);
            }
        }
        RemoteType::Dio => {
            let bytes: &[u8; dio::FRAME_LEN] = frame.payload.as_slice().try_into().ok()?;
            let word = u32::from_be_bytes([bytes[0], bytes[1], bytes[2], bytes[3]]);
            let action = dio::Action::from_byte(bytes[4])?;
            for _ in 0..=frame.repeats {
                dio_frame(word, action, &mut out);
            }
        }
    }
    Some(out)
}

/// Total on-air time of a pulse train.
pub fn duration_micros(pulses: &[Pulse]) -> u64 {
    pulses.iter().map(|p| u64::from(p.micros)).sum()
}

fn somfy_frame(bytes: &[u8; somfy::FRAME_LEN], first: bool, out: &mut Vec<Pulse>) {
    if first {
        out.push(Pulse::high(SOMFY_WAKEUP_HIGH));
        out.push(Pulse::low(SOMFY_WAKEUP_LOW));
    }
    let syncs = if first {
        SOMFY_FIRST_SYNCS
    } else {
        SOMFY_REPEAT_SYNCS
    };
    for _ in 0..syncs {
        out.push(Pulse::high(SOMFY_HW_SYNC));
        out.push(Pulse::low(SOMFY_HW_SYNC));
    }
    out.push(Pulse::high(SOMFY_SW_SYNC));
    out.push(Pulse::low(SOMFY_SYMBOL));

    // Manchester, MSB first: a rising edge is a 1.
    for &byte in bytes {
        for bit in (0..8).rev() {
            if byte >> bit & 1 == 1 {
                out.push(Pulse::low(SOMFY_SYMBOL));
                out.push(Pulse::high(SOMFY_SYMBOL));
            } else {
                out.push(Pulse::high(SOMFY_SYMBOL));
                out.push(Pulse::low(SOMFY_SYMBOL));
            }
        }
    }
    out.push(Pulse::low(SOMFY_GAP));
}

fn dio_frame(word: u32, action: dio::Action, out: &mut Vec<Pulse>) {
    out.push(Pulse::high(DIO_PULSE));
    out.push(Pulse::low(DIO_LATCH_1));
    out.push(Pulse::high(DIO_PULSE));
    out.push(Pulse::low(DIO_LATCH_2));

    for bit in (0..32).rev() {
        // Bit 4 is the on/off bit; the dim symbol replaces it.
        if bit == 4 && action == dio::Action::Dim {
            dio_symbol(false, out);
            dio_symbol(false, out);
            continue;
        }
        let one = word >> bit & 1 == 1;
        dio_symbol(one, out);
        dio_symbol(!one, out);
    }

    out.push(Pulse::high(DIO_PULSE));
    out.push(Pulse::low(DIO_END));
}

fn dio_symbol(one: bool, out: &mut Vec<Pulse>) {
    out.push(Pulse::high(DIO_PULSE));
    out.push(Pulse::low(if one { DIO_ONE_LOW } else { DIO_ZERO_LOW }));
}
