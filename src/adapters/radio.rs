//! 433.42 MHz OOK transmitter adapter.
//!
//! Implements [`RadioPort`] by replaying the pulse train of
//! [`waveform::render`] on the data pin of a transmitter module (FS1000A
//! or similar, with a 433.42 MHz resonator for Somfy).  Generic over
//! `embedded-hal` traits; on the device the pin is an esp-idf-hal
//! `PinDriver` and the delay is `Ets` (busy-wait, microsecond resolution).
//!
//! A burst lasts up to about a second (Somfy PROG).  The caller's task is
//! blocked for that time, which is what keeps bursts from overlapping.

use embedded_hal::delay::DelayNs;
use embedded_hal::digital::OutputPin;
use log::debug;

use crate::app::ports::{RadioPort, TransmitError};
use crate::rf::{RfFrame, waveform};

pub struct RfRadio<P, D> {
    pin: P,
    delay: D,
    bursts: u32,
}

impl<P: OutputPin, D: DelayNs> RfRadio<P, D> {
    /// Takes ownership of the data pin and drives it low (carrier off).
    pub fn new(mut pin: P, delay: D) -> Result<Self, TransmitError> {
        pin.set_low().map_err(|_| TransmitError::Pin)?;
        Ok(Self {
            pin,
            delay,
            bursts: 0,
        })
    }

    /// Bursts sent since boot.
    pub fn bursts(&self) -> u32 {
        self.bursts
    }
}

impl<P: OutputPin, D: DelayNs> RadioPort for RfRadio<P, D> {
    fn transmit(&mut self, frame: &RfFrame) -> Result<(), TransmitError> {
        let pulses = waveform::render(frame).ok_or(TransmitError::MalformedFrame)?;

        for pulse in &pulses {
            let level = if pulse.high {
                self.pin.set_high()
            } else {
                self.pin.set_low()
            };
            if level.is_err() {
                // Never leave the carrier keyed.
                let _ = self.pin.set_low();
                return Err(TransmitError::Pin);
            }
            self.delay.delay_us(pulse.micros);
        }
        self.pin.set_low().map_err(|_| TransmitError::Pin)?;

        self.bursts = self.bursts.wrapping_add(1);
        debug!(
            "Radio: {} burst, {} pulses, {} us",
            frame.protocol,
            pulses.len(),
            waveform::duration_micros(&pulses)
        );
        Ok(())
    }
}
