//! Command dispatcher — the bridge core.
//!
//! One inbound MQTT message runs to completion through these stages:
//!
//! ```text
//!   Received ──▶ Resolved ──▶ ┌ per target, in order ─────────────────────────┐
//!      │            │         │ Encoding ──▶ Transmitting ──▶ Advancing ──▶ Published │
//!      ▼            ▼         └───────────────────────────────────────────────┘
//!  UnknownCommand UnknownTopic        any stage ──▶ Failed(stage, error)
//! ```
//!
//! A group fans out to its members sequentially; one RF burst is in flight
//! at a time.  A failing member is recorded in the [`DispatchReport`] and
//! the remaining members still run.
//!
//! For Somfy targets the frame carries the code read *before* the advance,
//! and the slot is advanced once the transmission attempt returned, whether
//! or not the radio reported an error: there is no acknowledgement, so a
//! burst that may have left the antenna must never have its code reused.

use log::{debug, info, warn};

use crate::catalog::{Catalog, Entity, EntityId, EntityKind};
use crate::codes::{RollingCodeStore, SlotState};
use crate::config::BridgeConfig;
use crate::error::DispatchError;
use crate::rf::{EncodeTarget, encoder_for};

use super::commands::{Command, CoverState};
use super::events::AppEvent;
use super::ports::{EventSink, RadioPort, StatePort, StorageError, StoragePort};
use super::publisher::StatePublisher;

/// Where a dispatch (or one target of it) stopped.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DispatchStage {
    Received,
    Resolved,
    Encoding,
    Transmitting,
    Advancing,
    Published,
}

/// Outcome for one resolved target.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TargetReport {
    pub entity: EntityId,
    /// Code carried by the frame (Somfy only).
    pub rolling_code: Option<u16>,
    /// The radio accepted the burst.
    pub transmitted: bool,
    /// State handed to the broker.
    pub published: Option<CoverState>,
    pub failure: Option<(DispatchStage, DispatchError)>,
}

impl TargetReport {
    fn new(entity: EntityId) -> Self {
        Self {
            entity,
            rolling_code: None,
            transmitted: false,
            published: None,
            failure: None,
        }
    }

    pub fn is_ok(&self) -> bool {
        self.failure.is_none()
    }
}

/// Aggregated outcome of one inbound command.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DispatchReport {
    /// Entity the message was addressed to (a remote or a group).
    pub entity: EntityId,
    pub command: Command,
    pub targets: Vec<TargetReport>,
    /// The group's own state topic was published.
    pub group_state_published: bool,
}

impl DispatchReport {
    pub fn all_ok(&self) -> bool {
        self.targets.iter().all(TargetReport::is_ok)
    }

    pub fn failures(&self) -> impl Iterator<Item = &TargetReport> {
        self.targets.iter().filter(|t| !t.is_ok())
    }
}

/// Owns the catalog and the rolling-code bookkeeping.  Ports are borrowed
/// per call.
pub struct Dispatcher {
    catalog: Catalog,
    codes: RollingCodeStore,
    publisher: StatePublisher,
    publish_group_state: bool,
}

impl Dispatcher {
    pub fn new(catalog: Catalog, config: &BridgeConfig) -> Self {
        let codes = RollingCodeStore::new(config.default_rolling_code, catalog.storage_keys());
        Self {
            catalog,
            codes,
            publisher: StatePublisher::new(),
            publish_group_state: config.publish_group_state,
        }
    }

    pub fn catalog(&self) -> &Catalog {
        &self.catalog
    }

    pub fn codes(&self) -> &RollingCodeStore {
        &self.codes
    }

    pub fn publisher(&self) -> &StatePublisher {
        &self.publisher
    }

    pub fn start(&self, sink: &mut impl EventSink) {
        sink.emit(&AppEvent::Started {
            entities: self.catalog.len(),
        });
        info!("Dispatcher started with {} entities", self.catalog.len());
    }

    /// Overwrite every Somfy slot with the configured default.  Only run at
    /// boot, when the installation asks for it.
    pub fn reset_codes(
        &self,
        storage: &mut impl StoragePort,
        sink: &mut impl EventSink,
    ) -> Result<usize, StorageError> {
        let code = self.codes.default_code();
        let slots = self.codes.reset_all(storage, code)?;
        sink.emit(&AppEvent::CodesReset { slots, code });
        Ok(slots)
    }

    /// Handle one inbound `(topic, payload)` pair.
    ///
    /// `Err` only for messages dropped before any entity was touched;
    /// per-target failures are in the returned report.
    pub fn handle_message(
        &mut self,
        topic: &str,
        payload: &[u8],
        storage: &mut impl StoragePort,
        radio: &mut impl RadioPort,
        states: &mut impl StatePort,
        sink: &mut impl EventSink,
    ) -> Result<DispatchReport, DispatchError> {
        // Received
        let Some(command) = Command::from_payload(payload) else {
            debug!("Dispatch: {} unknown payload {:?}", topic, payload);
            sink.emit(&AppEvent::MessageDropped {
                topic: topic.into(),
                reason: DispatchError::UnknownCommand,
            });
            return Err(DispatchError::UnknownCommand);
        };

        // Resolved
        let Some(entity) = self.catalog.lookup_by_set_topic(topic) else {
            debug!("Dispatch: no entity for {}", topic);
            sink.emit(&AppEvent::MessageDropped {
                topic: topic.into(),
                reason: DispatchError::UnknownTopic,
            });
            return Err(DispatchError::UnknownTopic);
        };

        let targets = self.catalog.resolve_targets(entity);
        info!(
            "Dispatch: {:?} -> '{}' ({} target{})",
            command,
            entity.description(),
            targets.len(),
            if targets.len() == 1 { "" } else { "s" }
        );

        let mut report = DispatchReport {
            entity: entity.id(),
            command,
            targets: Vec::with_capacity(targets.len()),
            group_state_published: false,
        };

        for target in targets {
            let mut outcome = run_target(&self.codes, target, command, storage, radio, sink);

            // Published
            if let (None, Some(state)) = (outcome.failure, command.resulting_state()) {
                match self.publisher.publish(target, state, states) {
                    Ok(()) => {
                        outcome.published = Some(state);
                        sink.emit(&AppEvent::StatePublished {
                            entity: target.id(),
                            state,
                        });
                    }
                    Err(e) => fail(&mut outcome, DispatchStage::Published, e.into(), command, sink),
                }
            }
            report.targets.push(outcome);
        }

        if self.publish_group_state && entity.is_group() && report.all_ok() {
            if let Some(state) = command.resulting_state() {
                match self.publisher.publish(entity, state, states) {
                    Ok(()) => {
                        report.group_state_published = true;
                        sink.emit(&AppEvent::StatePublished {
                            entity: entity.id(),
                            state,
                        });
                    }
                    Err(e) => warn!("Dispatch: group state for '{}' not published: {}", entity.description(), e),
                }
            }
        }

        Ok(report)
    }
}

/// Encode, transmit and (Somfy) advance for one non-group entity.
fn run_target(
    codes: &RollingCodeStore,
    target: &Entity,
    command: Command,
    storage: &mut impl StoragePort,
    radio: &mut impl RadioPort,
    sink: &mut impl EventSink,
) -> TargetReport {
    let mut report = TargetReport::new(target.id());
    let encoder = encoder_for(target.remote_type());

    // Encoding
    if !encoder.supports(command) {
        let error = DispatchError::UnsupportedCommand {
            command,
            remote_type: target.remote_type(),
        };
        fail(&mut report, DispatchStage::Encoding, error, command, sink);
        return report;
    }

    let (encode_target, storage_key) = match *target.kind() {
        EntityKind::Somfy {
            storage_key,
            address,
        } => match codes.fetch(storage, storage_key) {
            Ok((rolling_code, state)) => {
                if state == SlotState::Corrupt {
                    sink.emit(&AppEvent::SlotRecovered {
                        storage_key,
                        code: rolling_code,
                    });
                }
                report.rolling_code = Some(rolling_code);
                (
                    EncodeTarget::Somfy {
                        address,
                        rolling_code,
                    },
                    Some(storage_key),
                )
            }
            Err(e) => {
                fail(&mut report, DispatchStage::Encoding, e.into(), command, sink);
                return report;
            }
        },
        EntityKind::Dio {
            sender,
            interruptor,
        } => (
            EncodeTarget::Dio {
                sender,
                interruptor,
            },
            None,
        ),
        // Groups are expanded by the catalog before reaching here.
        EntityKind::Group { .. } => {
            fail(
                &mut report,
                DispatchStage::Resolved,
                DispatchError::UnknownTopic,
                command,
                sink,
            );
            return report;
        }
    };

    let frame = match encoder.encode(command, &encode_target) {
        Ok(frame) => frame,
        Err(e) => {
            fail(&mut report, DispatchStage::Encoding, e.into(), command, sink);
            return report;
        }
    };

    // Transmitting
    let sent = radio.transmit(&frame);
    report.transmitted = sent.is_ok();
    if sent.is_ok() {
        sink.emit(&AppEvent::Transmitted {
            entity: target.id(),
            command,
            rolling_code: report.rolling_code,
        });
    }

    // Advancing: the attempt was issued, so its code is spent.
    if let Some(key) = storage_key {
        if let Err(e) = codes.advance(storage, key) {
            fail(&mut report, DispatchStage::Advancing, e.into(), command, sink);
            return report;
        }
    }

    if let Err(e) = sent {
        fail(&mut report, DispatchStage::Transmitting, e.into(), command, sink);
    }
    report
}

fn fail(
    report: &mut TargetReport,
    stage: DispatchStage,
    error: DispatchError,
    command: Command,
    sink: &mut impl EventSink,
) {
    warn!(
        "Dispatch: entity {} failed at {:?}: {}",
        report.entity, stage, error
    );
    report.failure = Some((stage, error));
    sink.emit(&AppEvent::TargetFailed {
        entity: report.entity,
        command,
        error,
    });
}
