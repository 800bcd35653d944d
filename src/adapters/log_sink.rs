//! Log-based event sink adapter.
//!
//! Implements [`EventSink`] by writing one line per bridge event to the
//! ESP-IDF logger (UART / USB-CDC in production, stderr on the host).

use log::{info, warn};

use crate::app::events::AppEvent;
use crate::app::ports::EventSink;

/// Adapter that logs every [`AppEvent`] to the serial console.
#[derive(Debug, Default)]
pub struct LogEventSink;

impl LogEventSink {
    pub fn new() -> Self {
        Self
    }
}

impl EventSink for LogEventSink {
    fn emit(&mut self, event: &AppEvent) {
        match event {
            AppEvent::Started { entities } => {
                info!("START | entities={}", entities);
            }
            AppEvent::CodesReset { slots, code } => {
                warn!("CODES | reset {} slots to {}", slots, code);
            }
            AppEvent::SlotRecovered { storage_key, code } => {
                warn!("CODES | slot {} corrupt, re-seeded with {}", storage_key, code);
            }
            AppEvent::MessageDropped { topic, reason } => {
                info!("DROP  | {} | {}", topic, reason);
            }
            AppEvent::Transmitted {
                entity,
                command,
                rolling_code,
            } => match rolling_code {
                Some(code) => info!("TX    | entity={} cmd={:?} code={}", entity, command, code),
                None => info!("TX    | entity={} cmd={:?}", entity, command),
            },
            AppEvent::StatePublished { entity, state } => {
                info!("STATE | entity={} -> {}", entity, state);
            }
            AppEvent::TargetFailed {
                entity,
                command,
                error,
            } => {
                warn!("FAIL  | entity={} cmd={:?} | {}", entity, command, error);
            }
        }
    }
}
