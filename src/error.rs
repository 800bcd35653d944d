//! Error types for the bridge core.
//!
//! Two families, matching how they are handled:
//!
//! - [`ConfigError`] — fatal at boot.  The catalog refuses to build and the
//!   firmware parks on a rapid-flash status LED.
//! - [`DispatchError`] — per message or per target.  Logged and dropped;
//!   the dispatcher never stops serving because of one.
//!
//! Variants are plain data with hand-written `Display`, cheap to copy into
//! events and reports.

use core::fmt;

use crate::app::commands::Command;
use crate::app::ports::{PublishError, StorageError, TransmitError};
use crate::catalog::{EntityId, RemoteType};
use crate::rf::EncodeError;

// ---------------------------------------------------------------------------
// Configuration errors
// ---------------------------------------------------------------------------

/// A violated catalog rule, naming the offending entity.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConfigError {
    /// More entities than the id space can address.
    TooManyEntities { count: usize },
    /// Topic base is empty, contains a wildcard, or ends with `/`.
    InvalidTopic { entity: EntityId, topic: String },
    /// Two entities share a topic base.
    DuplicateTopic {
        entity: EntityId,
        topic: String,
        first: EntityId,
    },
    /// Two Somfy remotes share a rolling-code slot.
    DuplicateStorageKey {
        entity: EntityId,
        storage_key: u16,
        first: EntityId,
    },
    /// Storage key beyond the reserved slot table.
    StorageKeyOutOfRange { entity: EntityId, storage_key: u16 },
    /// Somfy address does not fit in 24 bits.
    AddressOutOfRange { entity: EntityId, address: u64 },
    /// DiO sender above 26 bits or interruptor above 15.
    InvalidDioAddress {
        entity: EntityId,
        sender: u64,
        interruptor: u8,
    },
    /// Group without members.
    EmptyGroup { entity: EntityId },
    /// Group lists more distinct members than a group can hold.
    GroupTooLarge { entity: EntityId, len: usize },
    /// Member id does not exist.
    UnknownMember { entity: EntityId, member: u16 },
    /// Member id names another group.
    MemberIsGroup { entity: EntityId, member: EntityId },
    /// Member id is a remote of the other protocol.
    MemberTypeMismatch {
        entity: EntityId,
        member: EntityId,
        expected: RemoteType,
    },
}

impl ConfigError {
    /// Entity the error is about, when there is one.
    pub fn entity(&self) -> Option<EntityId> {
        match self {
            Self::TooManyEntities { .. } => None,
            Self::InvalidTopic { entity, .. }
            | Self::DuplicateTopic { entity, .. }
            | Self::DuplicateStorageKey { entity, .. }
            | Self::StorageKeyOutOfRange { entity, .. }
            | Self::AddressOutOfRange { entity, .. }
            | Self::InvalidDioAddress { entity, .. }
            | Self::EmptyGroup { entity }
            | Self::GroupTooLarge { entity, .. }
            | Self::UnknownMember { entity, .. }
            | Self::MemberIsGroup { entity, .. }
            | Self::MemberTypeMismatch { entity, .. } => Some(*entity),
        }
    }
}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::TooManyEntities { count } => {
                write!(f, "{} entities declared, id space exhausted", count)
            }
            Self::InvalidTopic { entity, topic } => {
                write!(f, "entity {}: invalid topic base '{}'", entity, topic)
            }
            Self::DuplicateTopic { entity, topic, first } => write!(
                f,
                "entity {}: topic base '{}' already used by entity {}",
                entity, topic, first
            ),
            Self::DuplicateStorageKey {
                entity,
                storage_key,
                first,
            } => write!(
                f,
                "entity {}: storage key {} already used by entity {}",
                entity, storage_key, first
            ),
            Self::StorageKeyOutOfRange {
                entity,
                storage_key,
            } => write!(
                f,
                "entity {}: storage key {} outside the slot table",
                entity, storage_key
            ),
            Self::AddressOutOfRange { entity, address } => write!(
                f,
                "entity {}: Somfy address 0x{:X} exceeds 24 bits",
                entity, address
            ),
            Self::InvalidDioAddress {
                entity,
                sender,
                interruptor,
            } => write!(
                f,
                "entity {}: DiO sender {} / interruptor {} out of range",
                entity, sender, interruptor
            ),
            Self::EmptyGroup { entity } => write!(f, "entity {}: group has no members", entity),
            Self::GroupTooLarge { entity, len } => {
                write!(f, "entity {}: group lists {} members", entity, len)
            }
            Self::UnknownMember { entity, member } => {
                write!(f, "entity {}: member {} does not exist", entity, member)
            }
            Self::MemberIsGroup { entity, member } => {
                write!(f, "entity {}: member {} is a group", entity, member)
            }
            Self::MemberTypeMismatch {
                entity,
                member,
                expected,
            } => write!(
                f,
                "entity {}: member {} is not a {} remote",
                entity, member, expected
            ),
        }
    }
}

// ---------------------------------------------------------------------------
// Dispatch errors
// ---------------------------------------------------------------------------

/// Why a dispatch (or one target of it) failed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DispatchError {
    /// Payload is not in the command vocabulary.
    UnknownCommand,
    /// No entity subscribes to this topic.
    UnknownTopic,
    /// The target's protocol has no such command.
    UnsupportedCommand {
        command: Command,
        remote_type: RemoteType,
    },
    /// Frame could not be built for another reason.
    Encode(EncodeError),
    /// Rolling-code slot could not be read or written.
    Storage(StorageError),
    /// Radio refused the frame.
    Transmit(TransmitError),
    /// State could not be handed to the broker.
    Publish(PublishError),
}

impl fmt::Display for DispatchError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::UnknownCommand => write!(f, "unknown command"),
            Self::UnknownTopic => write!(f, "unknown topic"),
            Self::UnsupportedCommand {
                command,
                remote_type,
            } => write!(f, "{:?} not supported by {} remotes", command, remote_type),
            Self::Encode(e) => write!(f, "encode: {}", e),
            Self::Storage(e) => write!(f, "storage: {}", e),
            Self::Transmit(e) => write!(f, "transmit: {}", e),
            Self::Publish(e) => write!(f, "publish: {}", e),
        }
    }
}

impl From<EncodeError> for DispatchError {
    fn from(e: EncodeError) -> Self {
        match e {
            EncodeError::UnsupportedCommand { command, protocol } => Self::UnsupportedCommand {
                command,
                remote_type: protocol,
            },
            other => Self::Encode(other),
        }
    }
}

impl From<StorageError> for DispatchError {
    fn from(e: StorageError) -> Self {
        Self::Storage(e)
    }
}

impl From<TransmitError> for DispatchError {
    fn from(e: TransmitError) -> Self {
        Self::Transmit(e)
    }
}

impl From<PublishError> for DispatchError {
    fn from(e: PublishError) -> Self {
        Self::Publish(e)
    }
}
