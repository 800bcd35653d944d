//! Fuzz target: `codes::decode_slot`
//!
//! Feeds arbitrary flash contents to the slot decoder and asserts that a
//! slot reported valid re-encodes to a slot carrying the same code.
//!
//! cargo fuzz run fuzz_code_slot

#![no_main]

use libfuzzer_sys::fuzz_target;
use shutterbox::codes::{CodeSlot, SlotState, decode_slot};

fuzz_target!(|data: &[u8]| {
    match decode_slot(data) {
        SlotState::Valid(code) => {
            assert_eq!(CodeSlot::new(code).code(), Some(code));
        }
        SlotState::Corrupt => {}
        SlotState::Uninitialized => panic!("present bytes decoded as an empty slot"),
    }
});
