//! Shutterbox firmware library.
//!
//! Exposes the pure-logic modules for integration testing and fuzzing.
//! All ESP-IDF-specific code is guarded by `#[cfg(target_os = "espidf")]`
//! within each module; host builds get simulation backends.

#![deny(unused_must_use)]

pub mod app;
pub mod catalog;
pub mod codes;
pub mod config;
pub mod discovery;
pub mod error;
pub mod pins;
pub mod rf;

pub mod adapters;
pub mod drivers;

pub use app::commands::{Command, CoverState};
pub use app::dispatcher::{DispatchReport, Dispatcher};
pub use catalog::Catalog;
pub use config::BridgeConfig;
pub use error::{ConfigError, DispatchError};
