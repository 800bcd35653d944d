//! GPIO assignments for the bridge board.
//!
//! Single source of truth — drivers reference this module rather than
//! hard-coding pin numbers.  The constants are documentation for the
//! wiring; `main.rs` takes the matching typed pins from `Peripherals`.

// ---------------------------------------------------------------------------
// 433.42 MHz transmitter
// ---------------------------------------------------------------------------

/// Data input of the OOK transmitter module.  HIGH keys the carrier.
pub const RF_TX_GPIO: i32 = 4;

// ---------------------------------------------------------------------------
// Status LED
// ---------------------------------------------------------------------------

/// On-board LED of the common ESP32 DevKit boards.
pub const STATUS_LED_GPIO: i32 = 2;
/// The DevKit LED is wired active-high.
pub const STATUS_LED_ACTIVE_LOW: bool = false;
