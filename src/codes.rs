//! Persisted Somfy rolling codes.
//!
//! One NVS blob per storage key, in the `rolling` namespace under `c<key>`.
//! A slot is a postcard-encoded [`CodeSlot`]: the counter framed by a magic
//! number and a check word, so that "never written" (key absent), "written"
//! and "garbage" are three distinct states.  A stored code of 0 is a valid
//! value, not a sentinel.
//!
//! ```text
//!   get_or_init ──▶ Uninitialized ──seed(default)──▶ Valid(code)
//!               ──▶ Corrupt       ──seed(default)──▶ Valid(code)   (warn!)
//!               ──▶ Valid(code)
//!   advance     ──▶ write(code + 1)
//! ```
//!
//! Each update is a single blob write, which NVS commits atomically.  A
//! power cut mid-update leaves the previous value; the slot is never left
//! half-written.

use log::{info, warn};
use serde::{Deserialize, Serialize};

use crate::app::ports::{StorageError, StoragePort};

/// NVS namespace holding the code slots.
pub const NAMESPACE: &str = "rolling";

const SLOT_MAGIC: u16 = 0x5C0D;
const SLOT_BUF: usize = 16;

/// On-flash layout of one slot.  Field order is part of the stored format.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct CodeSlot {
    magic: u16,
    code: u16,
    check: u16,
}

impl CodeSlot {
    pub fn new(code: u16) -> Self {
        Self {
            magic: SLOT_MAGIC,
            code,
            check: check_word(code),
        }
    }

    /// Code carried by the slot, if the framing is intact.
    pub fn code(&self) -> Option<u16> {
        (self.magic == SLOT_MAGIC && self.check == check_word(self.code)).then_some(self.code)
    }
}

fn check_word(code: u16) -> u16 {
    !(code ^ SLOT_MAGIC)
}

/// What a slot held when it was read.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SlotState {
    Uninitialized,
    Valid(u16),
    Corrupt,
}

/// Decode raw slot bytes.
pub fn decode_slot(bytes: &[u8]) -> SlotState {
    match postcard::take_from_bytes::<CodeSlot>(bytes) {
        Ok((slot, [])) => slot.code().map_or(SlotState::Corrupt, SlotState::Valid),
        _ => SlotState::Corrupt,
    }
}

pub fn slot_key(storage_key: u16) -> String {
    format!("c{}", storage_key)
}

/// Rolling-code slots of every Somfy remote in the catalog.
#[derive(Debug, Clone)]
pub struct RollingCodeStore {
    default_code: u16,
    keys: Vec<u16>,
}

impl RollingCodeStore {
    pub fn new(default_code: u16, keys: impl IntoIterator<Item = u16>) -> Self {
        Self {
            default_code,
            keys: keys.into_iter().collect(),
        }
    }

    pub fn default_code(&self) -> u16 {
        self.default_code
    }

    /// Storage keys [`reset_all`](Self::reset_all) covers.
    pub fn keys(&self) -> &[u16] {
        &self.keys
    }

    /// Read and classify a slot without modifying it.  A blob too large to
    /// be a slot is corrupt, like any other garbage.
    pub fn load<S: StoragePort>(
        &self,
        storage: &S,
        storage_key: u16,
    ) -> Result<SlotState, StorageError> {
        let mut buf = [0u8; SLOT_BUF];
        match storage.read(NAMESPACE, &slot_key(storage_key), &mut buf) {
            Ok(len) => Ok(decode_slot(&buf[..len])),
            Err(StorageError::NotFound) => Ok(SlotState::Uninitialized),
            Err(StorageError::Oversized) => Ok(SlotState::Corrupt),
            Err(e) => Err(e),
        }
    }

    /// Current code of a slot, seeding it with the default first if it is
    /// empty or corrupt.  Also returns the state the slot was found in.
    pub fn fetch<S: StoragePort>(
        &self,
        storage: &mut S,
        storage_key: u16,
    ) -> Result<(u16, SlotState), StorageError> {
        let state = self.load(storage, storage_key)?;
        match state {
            SlotState::Valid(code) => Ok((code, state)),
            SlotState::Uninitialized => {
                self.store(storage, storage_key, self.default_code)?;
                Ok((self.default_code, state))
            }
            SlotState::Corrupt => {
                warn!(
                    "Codes: slot {} corrupt, re-seeding with {}",
                    storage_key, self.default_code
                );
                self.store(storage, storage_key, self.default_code)?;
                Ok((self.default_code, state))
            }
        }
    }

    /// Code to transmit next for `storage_key`.
    pub fn get_or_init<S: StoragePort>(
        &self,
        storage: &mut S,
        storage_key: u16,
    ) -> Result<u16, StorageError> {
        self.fetch(storage, storage_key).map(|(code, _)| code)
    }

    /// Step the slot by one and return the new value.
    pub fn advance<S: StoragePort>(
        &self,
        storage: &mut S,
        storage_key: u16,
    ) -> Result<u16, StorageError> {
        let next = self.get_or_init(storage, storage_key)?.wrapping_add(1);
        self.store(storage, storage_key, next)?;
        Ok(next)
    }

    /// Overwrite a slot.
    pub fn store<S: StoragePort>(
        &self,
        storage: &mut S,
        storage_key: u16,
        code: u16,
    ) -> Result<(), StorageError> {
        let bytes = postcard::to_allocvec(&CodeSlot::new(code)).map_err(|_| StorageError::IoError)?;
        storage.write(NAMESPACE, &slot_key(storage_key), &bytes)
    }

    /// Overwrite every known slot with `code`.  Returns the number of slots
    /// written; stops at the first storage failure.
    pub fn reset_all<S: StoragePort>(&self, storage: &mut S, code: u16) -> Result<usize, StorageError> {
        for &key in &self.keys {
            self.store(storage, key, code)?;
        }
        info!("Codes: {} slots reset to {}", self.keys.len(), code);
        Ok(self.keys.len())
    }
}
