//! LED pattern engine with priority-based pattern selection.
//!
//! Generates the on/off level of the single status LED.  The main loop
//! calls `tick()` each cycle and feeds the result to
//! [`StatusLed::set`](super::status_led::StatusLed::set).
//!
//! ## Priority hierarchy (highest first)
//!
//! 1. **Error** — rapid flash (8 Hz): configuration rejected, the bridge
//!    will not serve commands.
//! 2. **Connectivity** — slow blink while WiFi / MQTT are coming up,
//!    solid once the bridge is subscribed.
//!
//! ## Pattern types
//!
//! | Pattern     | Description                    | Rate |
//! |-------------|--------------------------------|------|
//! | Solid       | Constantly on                  | —    |
//! | SlowBlink   | On/off square wave             | 1 Hz |
//! | DoubleBlink | Two quick flashes, then pause  | 1 Hz |
//! | RapidFlash  | Very fast on/off               | 8 Hz |

/// Pattern identifier.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PatternId {
    Solid,
    SlowBlink,
    DoubleBlink,
    RapidFlash,
}

/// What the bridge is doing, as far as the LED is concerned.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BridgeStatus {
    /// Waiting for WiFi.
    Connecting,
    /// WiFi up, waiting for the broker.
    BrokerConnecting,
    /// Subscribed and serving commands.
    Ready,
}

impl BridgeStatus {
    pub fn pattern(self) -> PatternId {
        match self {
            Self::Connecting => PatternId::SlowBlink,
            Self::BrokerConnecting => PatternId::DoubleBlink,
            Self::Ready => PatternId::Solid,
        }
    }
}

/// LED pattern engine. Stack-allocated, no heap.
pub struct LedPatternEngine {
    phase_ms: u32,
    active: Option<PatternId>,
    status: Option<PatternId>,
    error: bool,
}

impl LedPatternEngine {
    pub fn new() -> Self {
        Self {
            phase_ms: 0,
            active: None,
            status: None,
            error: false,
        }
    }

    /// Set the connectivity-layer pattern.
    pub fn set_status(&mut self, status: BridgeStatus) {
        self.status = Some(status.pattern());
    }

    /// Set or clear the error pattern.
    pub fn set_error(&mut self, active: bool) {
        self.error = active;
    }

    /// Advance the pattern phase and return whether the LED is lit.
    pub fn tick(&mut self, delta_ms: u32) -> bool {
        self.phase_ms = self.phase_ms.wrapping_add(delta_ms);

        let selected = if self.error {
            Some(PatternId::RapidFlash)
        } else {
            self.status
        };
        if selected != self.active {
            self.phase_ms = 0;
        }
        self.active = selected;

        self.active.is_some_and(|p| self.level(p))
    }

    fn level(&self, pattern: PatternId) -> bool {
        match pattern {
            PatternId::Solid => true,
            PatternId::SlowBlink => (self.phase_ms % 1000) < 500,
            PatternId::DoubleBlink => {
                let cycle = self.phase_ms % 1000;
                cycle < 100 || (200..300).contains(&cycle)
            }
            PatternId::RapidFlash => (self.phase_ms % 125) < 63,
        }
    }
}

impl Default for LedPatternEngine {
    fn default() -> Self {
        Self::new()
    }
}
