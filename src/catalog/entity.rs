//! Catalog entities — one per addressable remote or group.
//!
//! Protocol-specific data lives in the [`EntityKind`] variant, so a DiO
//! entity cannot carry a storage key and a Somfy entity cannot carry a
//! sender address.

use core::fmt;

use crate::config::MAX_GROUP_MEMBERS;

/// Stable index into the catalog table.
pub type EntityId = u16;

/// Bounded, ordered member list of a group.
pub type Members = heapless::Vec<EntityId, MAX_GROUP_MEMBERS>;

/// Suffix of the topic the bridge subscribes to for commands.
pub const SET_SUFFIX: &str = "/set";
/// Suffix of the topic the bridge publishes cover state on.
pub const STATE_SUFFIX: &str = "/state";

/// Radio protocol family.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum RemoteType {
    /// Somfy RTS, rolling code.
    Somfy,
    /// Chacon DiO 1.0, fixed code.
    Dio,
}

impl fmt::Display for RemoteType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Somfy => write!(f, "Somfy"),
            Self::Dio => write!(f, "DiO"),
        }
    }
}

/// What an entity is, with the fields that only make sense for that kind.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EntityKind {
    Somfy {
        /// Rolling-code slot.
        storage_key: u16,
        /// 24-bit RTS address (`somfy_base_id + id`).
        address: u32,
    },
    Dio {
        /// 26-bit emitter address.
        sender: u32,
        /// Receiver channel, 0–15.
        interruptor: u8,
    },
    Group {
        remote_type: RemoteType,
        members: Members,
    },
}

/// An addressable unit: a single remote or a group of remotes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Entity {
    id: EntityId,
    topic_base: String,
    description: String,
    set_topic: String,
    state_topic: String,
    kind: EntityKind,
}

impl Entity {
    /// Derives both MQTT topics from `topic_base`.
    pub(crate) fn new(id: EntityId, topic_base: &str, description: &str, kind: EntityKind) -> Self {
        Self {
            id,
            topic_base: topic_base.to_owned(),
            description: description.to_owned(),
            set_topic: format!("{}{}", topic_base, SET_SUFFIX),
            state_topic: format!("{}{}", topic_base, STATE_SUFFIX),
            kind,
        }
    }

    pub fn id(&self) -> EntityId {
        self.id
    }

    pub fn topic_base(&self) -> &str {
        &self.topic_base
    }

    pub fn description(&self) -> &str {
        &self.description
    }

    pub fn set_topic(&self) -> &str {
        &self.set_topic
    }

    pub fn state_topic(&self) -> &str {
        &self.state_topic
    }

    pub fn kind(&self) -> &EntityKind {
        &self.kind
    }

    pub fn remote_type(&self) -> RemoteType {
        match &self.kind {
            EntityKind::Somfy { .. } => RemoteType::Somfy,
            EntityKind::Dio { .. } => RemoteType::Dio,
            EntityKind::Group { remote_type, .. } => *remote_type,
        }
    }

    pub fn is_group(&self) -> bool {
        matches!(self.kind, EntityKind::Group { .. })
    }

    /// Rolling-code slot, for non-group Somfy entities only.
    pub fn storage_key(&self) -> Option<u16> {
        match self.kind {
            EntityKind::Somfy { storage_key, .. } => Some(storage_key),
            _ => None,
        }
    }

    /// Member ids, for groups only.
    pub fn members(&self) -> Option<&[EntityId]> {
        match &self.kind {
            EntityKind::Group { members, .. } => Some(members.as_slice()),
            _ => None,
        }
    }
}
