//! Mock adapters for integration tests.
//!
//! Records every radio burst, broker publish and core event so tests can
//! assert on the full history without touching GPIO, flash or a network.

use std::collections::HashMap;

use shutterbox::app::events::AppEvent;
use shutterbox::app::ports::{
    EventSink, PublishError, RadioPort, StatePort, StorageError, StoragePort, TransmitError,
};
use shutterbox::rf::RfFrame;

// ── MockNvs ───────────────────────────────────────────────────

#[derive(Default)]
pub struct MockNvs {
    store: HashMap<String, Vec<u8>>,
    pub fail_writes: bool,
}

#[allow(dead_code)]
impl MockNvs {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn raw(&self, namespace: &str, key: &str) -> Option<&[u8]> {
        self.store
            .get(&format!("{}::{}", namespace, key))
            .map(Vec::as_slice)
    }

    pub fn put_raw(&mut self, namespace: &str, key: &str, data: &[u8]) {
        self.store
            .insert(format!("{}::{}", namespace, key), data.to_vec());
    }
}

impl StoragePort for MockNvs {
    fn read(&self, namespace: &str, key: &str, buf: &mut [u8]) -> Result<usize, StorageError> {
        match self.store.get(&format!("{}::{}", namespace, key)) {
            Some(v) if v.len() > buf.len() => Err(StorageError::Oversized),
            Some(v) => {
                buf[..v.len()].copy_from_slice(v);
                Ok(v.len())
            }
            None => Err(StorageError::NotFound),
        }
    }

    fn write(&mut self, namespace: &str, key: &str, data: &[u8]) -> Result<(), StorageError> {
        if self.fail_writes {
            return Err(StorageError::IoError);
        }
        self.store
            .insert(format!("{}::{}", namespace, key), data.to_vec());
        Ok(())
    }

    fn exists(&self, namespace: &str, key: &str) -> bool {
        self.store.contains_key(&format!("{}::{}", namespace, key))
    }
}

// ── MockRadio ─────────────────────────────────────────────────

/// Records every burst handed to it.  Bursts listed in `fail_on`
/// (0-based attempt index) are refused.
#[derive(Default)]
pub struct MockRadio {
    pub frames: Vec<RfFrame>,
    pub attempts: usize,
    pub fail_on: Vec<usize>,
}

#[allow(dead_code)]
impl MockRadio {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn failing_on(attempts: &[usize]) -> Self {
        Self {
            fail_on: attempts.to_vec(),
            ..Self::default()
        }
    }
}

impl RadioPort for MockRadio {
    fn transmit(&mut self, frame: &RfFrame) -> Result<(), TransmitError> {
        let attempt = self.attempts;
        self.attempts += 1;
        if self.fail_on.contains(&attempt) {
            return Err(TransmitError::Pin);
        }
        self.frames.push(frame.clone());
        Ok(())
    }
}

// ── MockBroker ────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Publication {
    pub topic: String,
    pub payload: String,
    pub retain: bool,
}

pub struct MockBroker {
    pub published: Vec<Publication>,
    pub connected: bool,
}

#[allow(dead_code)]
impl MockBroker {
    pub fn new() -> Self {
        Self {
            published: Vec::new(),
            connected: true,
        }
    }

    pub fn topics(&self) -> Vec<&str> {
        self.published.iter().map(|p| p.topic.as_str()).collect()
    }
}

impl Default for MockBroker {
    fn default() -> Self {
        Self::new()
    }
}

impl StatePort for MockBroker {
    fn publish(&mut self, topic: &str, payload: &str, retain: bool) -> Result<(), PublishError> {
        if !self.connected {
            return Err(PublishError::Disconnected);
        }
        self.published.push(Publication {
            topic: topic.into(),
            payload: payload.into(),
            retain,
        });
        Ok(())
    }
}

// ── RecordingSink ─────────────────────────────────────────────

#[derive(Default)]
pub struct RecordingSink {
    pub events: Vec<AppEvent>,
}

#[allow(dead_code)]
impl RecordingSink {
    pub fn new() -> Self {
        Self::default()
    }
}

impl EventSink for RecordingSink {
    fn emit(&mut self, event: &AppEvent) {
        self.events.push(event.clone());
    }
}
