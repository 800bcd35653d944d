//! State publisher — reflects dispatch outcomes onto `<topic_base>/state`.
//!
//! States are published retained so Home Assistant recovers them after a
//! broker or HA restart.  The last state handed to the broker is kept per
//! entity; it is what the bridge believes, not what the motor did.

use std::collections::HashMap;

use log::debug;

use crate::catalog::{Entity, EntityId};

use super::commands::CoverState;
use super::ports::{PublishError, StatePort};

#[derive(Debug, Default)]
pub struct StatePublisher {
    last: HashMap<EntityId, CoverState>,
}

impl StatePublisher {
    pub fn new() -> Self {
        Self::default()
    }

    /// Publish `state` on the entity's state topic.
    pub fn publish(
        &mut self,
        entity: &Entity,
        state: CoverState,
        port: &mut impl StatePort,
    ) -> Result<(), PublishError> {
        port.publish(entity.state_topic(), state.as_str(), true)?;
        debug!("Publisher: {} <- {}", entity.state_topic(), state);
        self.last.insert(entity.id(), state);
        Ok(())
    }

    /// Last state successfully published for `id`.
    pub fn last_state(&self, id: EntityId) -> Option<CoverState> {
        self.last.get(&id).copied()
    }
}
