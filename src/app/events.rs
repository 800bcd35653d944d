//! Outbound application events.
//!
//! The [`Dispatcher`](super::dispatcher::Dispatcher) emits these through the
//! [`EventSink`](super::ports::EventSink) port.  Adapters on the other
//! side decide what to do with them — log to serial, count them, etc.

use crate::app::commands::{Command, CoverState};
use crate::catalog::EntityId;
use crate::error::DispatchError;

/// Structured events emitted by the bridge core.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AppEvent {
    /// The dispatcher is ready with a built catalog.
    Started { entities: usize },

    /// Every known rolling-code slot was overwritten at boot.
    CodesReset { slots: usize, code: u16 },

    /// A rolling-code slot held garbage and was re-seeded.
    SlotRecovered { storage_key: u16, code: u16 },

    /// An inbound message was dropped before reaching any entity.
    MessageDropped { topic: String, reason: DispatchError },

    /// One frame went out for one remote.
    Transmitted {
        entity: EntityId,
        command: Command,
        rolling_code: Option<u16>,
    },

    /// A new state was handed to the broker.
    StatePublished { entity: EntityId, state: CoverState },

    /// One target of a dispatch failed; the others are unaffected.
    TargetFailed {
        entity: EntityId,
        command: Command,
        error: DispatchError,
    },
}
