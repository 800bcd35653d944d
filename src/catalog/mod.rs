//! Remote / group catalog.
//!
//! Built once at boot from [`BridgeConfig`] and read-only afterwards.  Ids
//! are assigned in declaration order — Somfy remotes, Somfy groups, DiO
//! remotes, DiO groups — so an id never changes unless the tables do.
//!
//! ```text
//!   BridgeConfig ──build()──▶ Catalog ──lookup_by_set_topic()──▶ &Entity
//!                                   └──resolve_targets(group)──▶ [&Entity]
//! ```
//!
//! Construction fails closed: the first violated rule aborts the build with
//! a [`ConfigError`] naming the entity.

pub mod entity;

pub use entity::{Entity, EntityId, EntityKind, Members, RemoteType};

use std::collections::HashMap;

use log::{debug, info};

use crate::config::{BridgeConfig, GroupConfig, MAX_CODE_SLOTS};
use crate::error::ConfigError;
use crate::rf::{dio, somfy};

/// Immutable table of every addressable entity.
#[derive(Debug, Clone)]
pub struct Catalog {
    entities: Vec<Entity>,
    by_set_topic: HashMap<String, EntityId>,
}

/// Id ranges of the four declaration blocks.
struct IdLayout {
    somfy_remotes: core::ops::Range<usize>,
    somfy_groups: core::ops::Range<usize>,
    dio_remotes: core::ops::Range<usize>,
    dio_groups: core::ops::Range<usize>,
}

impl IdLayout {
    fn new(config: &BridgeConfig) -> Self {
        let a = config.somfy_remotes.len();
        let b = a + config.somfy_groups.len();
        let c = b + config.dio_remotes.len();
        let d = c + config.dio_groups.len();
        Self {
            somfy_remotes: 0..a,
            somfy_groups: a..b,
            dio_remotes: b..c,
            dio_groups: c..d,
        }
    }

    /// Protocol and group flag of an id, `None` if out of range.
    fn classify(&self, id: usize) -> Option<(RemoteType, bool)> {
        if self.somfy_remotes.contains(&id) {
            Some((RemoteType::Somfy, false))
        } else if self.somfy_groups.contains(&id) {
            Some((RemoteType::Somfy, true))
        } else if self.dio_remotes.contains(&id) {
            Some((RemoteType::Dio, false))
        } else if self.dio_groups.contains(&id) {
            Some((RemoteType::Dio, true))
        } else {
            None
        }
    }
}

impl Catalog {
    /// Validate the tables and build the catalog.
    pub fn build(config: &BridgeConfig) -> Result<Self, ConfigError> {
        let count = config.entity_count();
        if count > usize::from(EntityId::MAX) + 1 {
            return Err(ConfigError::TooManyEntities { count });
        }

        let layout = IdLayout::new(config);
        let mut entities = Vec::with_capacity(count);
        let mut storage_keys: HashMap<u16, EntityId> = HashMap::new();

        for (i, remote) in config.somfy_remotes.iter().enumerate() {
            let id = (layout.somfy_remotes.start + i) as EntityId;
            if remote.storage_key >= MAX_CODE_SLOTS {
                return Err(ConfigError::StorageKeyOutOfRange {
                    entity: id,
                    storage_key: remote.storage_key,
                });
            }
            if let Some(&first) = storage_keys.get(&remote.storage_key) {
                return Err(ConfigError::DuplicateStorageKey {
                    entity: id,
                    storage_key: remote.storage_key,
                    first,
                });
            }
            storage_keys.insert(remote.storage_key, id);

            let address = u64::from(config.somfy_base_id) + u64::from(id);
            if address > u64::from(somfy::MAX_ADDRESS) {
                return Err(ConfigError::AddressOutOfRange { entity: id, address });
            }
            entities.push(Entity::new(
                id,
                &remote.topic_base,
                &remote.description,
                EntityKind::Somfy {
                    storage_key: remote.storage_key,
                    address: address as u32,
                },
            ));
        }

        for (i, group) in config.somfy_groups.iter().enumerate() {
            let id = (layout.somfy_groups.start + i) as EntityId;
            entities.push(build_group(&layout, id, group, RemoteType::Somfy)?);
        }

        for (i, remote) in config.dio_remotes.iter().enumerate() {
            let id = (layout.dio_remotes.start + i) as EntityId;
            let sender = u64::from(remote.sender);
            if sender > u64::from(dio::MAX_SENDER) || remote.interruptor > dio::MAX_INTERRUPTOR {
                return Err(ConfigError::InvalidDioAddress {
                    entity: id,
                    sender,
                    interruptor: remote.interruptor,
                });
            }
            entities.push(Entity::new(
                id,
                &remote.topic_base,
                &remote.description,
                EntityKind::Dio {
                    sender: sender as u32,
                    interruptor: remote.interruptor,
                },
            ));
        }

        for (i, group) in config.dio_groups.iter().enumerate() {
            let id = (layout.dio_groups.start + i) as EntityId;
            entities.push(build_group(&layout, id, group, RemoteType::Dio)?);
        }

        let by_set_topic = index_topics(&entities)?;

        info!(
            "Catalog: {} entities (Somfy {}+{} groups, DiO {}+{} groups)",
            entities.len(),
            config.somfy_remotes.len(),
            config.somfy_groups.len(),
            config.dio_remotes.len(),
            config.dio_groups.len(),
        );

        Ok(Self {
            entities,
            by_set_topic,
        })
    }

    /// Entity subscribed to `topic`, if any.
    pub fn lookup_by_set_topic(&self, topic: &str) -> Option<&Entity> {
        self.by_set_topic
            .get(topic)
            .and_then(|&id| self.lookup_by_id(id))
    }

    pub fn lookup_by_id(&self, id: EntityId) -> Option<&Entity> {
        self.entities.get(usize::from(id))
    }

    /// Non-group entities a command to `entity` must reach, in order.
    ///
    /// A remote resolves to itself.  A group resolves to its members in
    /// declaration order; a member reached twice is only returned once.
    pub fn resolve_targets<'a>(&'a self, entity: &'a Entity) -> Vec<&'a Entity> {
        let Some(members) = entity.members() else {
            return vec![entity];
        };
        let mut targets: Vec<&Entity> = Vec::with_capacity(members.len());
        for &id in members {
            let Some(member) = self.lookup_by_id(id) else {
                continue;
            };
            if member.is_group() {
                for nested in self.resolve_targets(member) {
                    if !targets.iter().any(|t| t.id() == nested.id()) {
                        targets.push(nested);
                    }
                }
            } else if !targets.iter().any(|t| t.id() == member.id()) {
                targets.push(member);
            }
        }
        targets
    }

    pub fn entities(&self) -> impl Iterator<Item = &Entity> {
        self.entities.iter()
    }

    pub fn len(&self) -> usize {
        self.entities.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entities.is_empty()
    }

    /// Every rolling-code slot in use, in id order.
    pub fn storage_keys(&self) -> impl Iterator<Item = u16> + '_ {
        self.entities.iter().filter_map(Entity::storage_key)
    }

    /// Topics the MQTT client must subscribe to.
    pub fn set_topics(&self) -> impl Iterator<Item = &str> {
        self.entities.iter().map(Entity::set_topic)
    }
}

fn build_group(
    layout: &IdLayout,
    id: EntityId,
    group: &GroupConfig,
    remote_type: RemoteType,
) -> Result<Entity, ConfigError> {
    if group.members.is_empty() {
        return Err(ConfigError::EmptyGroup { entity: id });
    }

    let mut members = Members::new();
    for &member in &group.members {
        match layout.classify(usize::from(member)) {
            None => return Err(ConfigError::UnknownMember { entity: id, member }),
            Some((_, true)) => return Err(ConfigError::MemberIsGroup { entity: id, member }),
            Some((kind, false)) if kind != remote_type => {
                return Err(ConfigError::MemberTypeMismatch {
                    entity: id,
                    member,
                    expected: remote_type,
                });
            }
            Some(_) => {}
        }
        if members.contains(&member) {
            debug!("Catalog: group {} lists member {} twice", id, member);
            continue;
        }
        if members.push(member).is_err() {
            return Err(ConfigError::GroupTooLarge {
                entity: id,
                len: group.members.len(),
            });
        }
    }

    Ok(Entity::new(
        id,
        &group.topic_base,
        &group.description,
        EntityKind::Group {
            remote_type,
            members,
        },
    ))
}

/// Check every topic base and index entities by set topic.
fn index_topics(entities: &[Entity]) -> Result<HashMap<String, EntityId>, ConfigError> {
    let mut by_base: HashMap<&str, EntityId> = HashMap::with_capacity(entities.len());
    let mut by_set_topic = HashMap::with_capacity(entities.len());
    for e in entities {
        if !is_valid_topic_base(e.topic_base()) {
            return Err(ConfigError::InvalidTopic {
                entity: e.id(),
                topic: e.topic_base().to_owned(),
            });
        }
        if let Some(&first) = by_base.get(e.topic_base()) {
            return Err(ConfigError::DuplicateTopic {
                entity: e.id(),
                topic: e.topic_base().to_owned(),
                first,
            });
        }
        by_base.insert(e.topic_base(), e.id());
        by_set_topic.insert(e.set_topic().to_owned(), e.id());
    }
    Ok(by_set_topic)
}

/// MQTT topic names may not contain wildcards; a trailing `/` would yield
/// `base//set`.
fn is_valid_topic_base(topic: &str) -> bool {
    !topic.is_empty() && !topic.ends_with('/') && !topic.contains(['+', '#', '\0'])
}
