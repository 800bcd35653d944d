//! Status LED driver and its pattern generator.

pub mod led_patterns;
pub mod status_led;
