//! Application core — pure domain logic, zero I/O.
//!
//! This module holds the bridge's business rules: command parsing, the
//! per-target dispatch sequence, and the last-state cache.  All
//! interaction with flash, the radio and the broker happens through
//! **port traits** defined in [`ports`], keeping this layer fully testable
//! without real peripherals.

pub mod commands;
pub mod dispatcher;
pub mod events;
pub mod ports;
pub mod publisher;
