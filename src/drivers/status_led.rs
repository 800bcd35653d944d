//! Status LED driver.
//!
//! One GPIO, generic over `embedded-hal`'s `OutputPin`.  Many ESP32 dev
//! boards wire the on-board LED active-low; the polarity is a constructor
//! argument.

use embedded_hal::digital::OutputPin;

pub struct StatusLed<P> {
    pin: P,
    active_low: bool,
    lit: bool,
}

impl<P: OutputPin> StatusLed<P> {
    pub fn new(pin: P, active_low: bool) -> Self {
        let mut led = Self {
            pin,
            active_low,
            lit: true,
        };
        led.set(false);
        led
    }

    /// Light or clear the LED.  Pin errors are ignored: the LED is
    /// informational only.
    pub fn set(&mut self, on: bool) {
        if on == self.lit {
            return;
        }
        let _ = if on != self.active_low {
            self.pin.set_high()
        } else {
            self.pin.set_low()
        };
        self.lit = on;
    }

    pub fn is_lit(&self) -> bool {
        self.lit
    }
}
