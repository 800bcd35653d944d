//! Port traits: what the bridge core needs from the outside world.
//!
//! ```text
//!   Adapter ──▶ Port trait ──▶ Dispatcher (domain)
//! ```
//!
//! Driven adapters (NVS, radio, MQTT, log) implement these traits.  The
//! [`Dispatcher`](super::dispatcher::Dispatcher) takes them as generic
//! parameters at each call, so the core never touches hardware directly
//! and runs unchanged against the mocks in `tests/integration/`.
//!
//! ## Serialisation
//!
//! Every port method takes `&mut self` (or `&self` for reads) and the
//! dispatcher borrows each port mutably for the whole of one dispatch.
//! One RF burst is therefore in flight at a time, and the read → transmit
//! → advance sequence of a rolling-code slot cannot interleave with
//! another dispatch, whatever task the caller runs on.

use core::fmt;

use crate::rf::RfFrame;

// ── Storage ─────────────────────────────────────────────────

/// Blob storage for the rolling-code slots, addressed by namespace and key.
///
/// A write either lands whole or not at all.  Flash NVS commits give that
/// for free; the in-memory stores used on the host are trivially atomic.
pub trait StoragePort {
    /// Copy the blob into `buf` and return its length.  A blob larger
    /// than `buf` is [`StorageError::Oversized`], never truncated.
    fn read(&self, namespace: &str, key: &str, buf: &mut [u8]) -> Result<usize, StorageError>;

    fn write(&mut self, namespace: &str, key: &str, data: &[u8]) -> Result<(), StorageError>;

    fn exists(&self, namespace: &str, key: &str) -> bool;
}

// ── Radio ───────────────────────────────────────────────────

/// Fire-and-forget RF transmitter.
///
/// `Ok(())` means the burst was emitted, not that a motor heard it: there
/// is no return channel.
pub trait RadioPort {
    fn transmit(&mut self, frame: &RfFrame) -> Result<(), TransmitError>;
}

// ── State ───────────────────────────────────────────────────

/// Outbound MQTT publishing.
pub trait StatePort {
    fn publish(&mut self, topic: &str, payload: &str, retain: bool) -> Result<(), PublishError>;
}

// ── Events ──────────────────────────────────────────────────

/// The domain emits structured [`AppEvent`](super::events::AppEvent)s
/// through this port.  Adapters decide where they go.
pub trait EventSink {
    fn emit(&mut self, event: &super::events::AppEvent);
}

// ── Errors ──────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StorageError {
    NotFound,
    /// The stored blob does not fit the read buffer.
    Oversized,
    /// No room left in the partition.
    Full,
    IoError,
}

/// Errors from [`RadioPort`] operations.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TransmitError {
    /// The data pin could not be driven.
    Pin,
    /// The frame's payload does not fit its protocol.
    MalformedFrame,
}

/// Errors from [`StatePort`] operations.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PublishError {
    /// No broker session.
    Disconnected,
    /// The client rejected the message (queue full, topic too long).
    Rejected,
}

impl fmt::Display for StorageError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::NotFound => write!(f, "no such slot"),
            Self::Oversized => write!(f, "stored blob larger than expected"),
            Self::Full => write!(f, "NVS partition full"),
            Self::IoError => write!(f, "flash access failed"),
        }
    }
}

impl fmt::Display for TransmitError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Pin => write!(f, "RF data pin error"),
            Self::MalformedFrame => write!(f, "malformed frame"),
        }
    }
}

impl fmt::Display for PublishError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Disconnected => write!(f, "broker disconnected"),
            Self::Rejected => write!(f, "publish rejected"),
        }
    }
}
