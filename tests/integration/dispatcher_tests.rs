//! Integration tests for the MQTT message → catalog → encoder → radio →
//! state pipeline.

use super::mock_hw::{MockBroker, MockNvs, MockRadio, Publication, RecordingSink};

use shutterbox::app::dispatcher::DispatchStage;
use shutterbox::app::events::AppEvent;
use shutterbox::app::ports::{StoragePort, TransmitError};
use shutterbox::catalog::RemoteType;
use shutterbox::codes::{NAMESPACE, SlotState, slot_key};
use shutterbox::config::{DioRemoteConfig, GroupConfig, SomfyRemoteConfig};
use shutterbox::rf::{dio, somfy};
use shutterbox::{BridgeConfig, Catalog, Command, CoverState, DispatchError, Dispatcher};

struct Rig {
    dispatcher: Dispatcher,
    nvs: MockNvs,
    radio: MockRadio,
    broker: MockBroker,
    sink: RecordingSink,
}

impl Rig {
    fn new(config: &BridgeConfig) -> Self {
        let catalog = Catalog::build(config).expect("valid tables");
        let mut sink = RecordingSink::new();
        let dispatcher = Dispatcher::new(catalog, config);
        dispatcher.start(&mut sink);
        Self {
            dispatcher,
            nvs: MockNvs::new(),
            radio: MockRadio::new(),
            broker: MockBroker::new(),
            sink,
        }
    }

    fn send(
        &mut self,
        topic: &str,
        payload: &[u8],
    ) -> Result<shutterbox::DispatchReport, DispatchError> {
        self.dispatcher.handle_message(
            topic,
            payload,
            &mut self.nvs,
            &mut self.radio,
            &mut self.broker,
            &mut self.sink,
        )
    }

    fn code(&self, storage_key: u16) -> SlotState {
        self.dispatcher
            .codes()
            .load(&self.nvs, storage_key)
            .expect("mock storage reads")
    }
}

fn somfy_remote(topic_base: &str, description: &str, storage_key: u16) -> SomfyRemoteConfig {
    SomfyRemoteConfig {
        topic_base: topic_base.into(),
        description: description.into(),
        storage_key,
    }
}

fn expected_somfy_payload(command: Command, code: u16, address: u32) -> Vec<u8> {
    let mut frame = somfy::build_frame(command, code, address);
    somfy::obfuscate(&mut frame);
    frame.to_vec()
}

/// Three Somfy blinds and a group over all of them.
fn three_blinds() -> BridgeConfig {
    BridgeConfig {
        somfy_remotes: vec![
            somfy_remote("home/cover/a", "A", 0),
            somfy_remote("home/cover/b", "B", 1),
            somfy_remote("home/cover/c", "C", 2),
        ],
        somfy_groups: vec![GroupConfig {
            topic_base: "home/cover/all".into(),
            description: "All".into(),
            members: vec![0, 1, 2],
        }],
        ..BridgeConfig::default()
    }
}

/// Two DiO receivers and their group.
fn dio_tables() -> BridgeConfig {
    BridgeConfig {
        somfy_remotes: Vec::new(),
        somfy_groups: Vec::new(),
        dio_remotes: vec![
            DioRemoteConfig {
                topic_base: "home/switch/lamp".into(),
                description: "Lamp".into(),
                sender: 12_345_678,
                interruptor: 1,
            },
            DioRemoteConfig {
                topic_base: "home/switch/fan".into(),
                description: "Fan".into(),
                sender: 0x20_0001,
                interruptor: 2,
            },
        ],
        dio_groups: vec![GroupConfig {
            topic_base: "home/switch/both".into(),
            description: "Both".into(),
            members: vec![0, 1],
        }],
        ..BridgeConfig::default()
    }
}

// ── Group fan-out ────────────────────────────────────────────

#[test]
fn group_down_reaches_every_member_in_order() {
    let mut rig = Rig::new(&BridgeConfig::default());

    let report = rig
        .send("homeassistant/cover/group/main/set", b"d")
        .unwrap();

    assert!(report.all_ok());
    assert_eq!(report.entity, 2);
    assert_eq!(report.command, Command::Down);
    assert_eq!(
        report.targets.iter().map(|t| t.entity).collect::<Vec<_>>(),
        vec![0, 1]
    );

    // Kitchen first, then Desktop, each with its own address and fresh slot.
    assert_eq!(rig.radio.frames.len(), 2);
    assert_eq!(
        rig.radio.frames[0].payload.as_slice(),
        expected_somfy_payload(Command::Down, 1, 0x10_0000).as_slice()
    );
    assert_eq!(
        rig.radio.frames[1].payload.as_slice(),
        expected_somfy_payload(Command::Down, 1, 0x10_0001).as_slice()
    );
    assert!(rig.radio.frames.iter().all(|f| f.repeats == somfy::REPEATS));

    assert_eq!(
        rig.broker.published,
        vec![
            Publication {
                topic: "homeassistant/cover/kitchen/state".into(),
                payload: "closed".into(),
                retain: true,
            },
            Publication {
                topic: "homeassistant/cover/desktop/state".into(),
                payload: "closed".into(),
                retain: true,
            },
        ]
    );

    assert_eq!(rig.code(0), SlotState::Valid(2));
    assert_eq!(rig.code(1), SlotState::Valid(2));
}

#[test]
fn group_state_is_published_only_when_enabled() {
    let mut rig = Rig::new(&BridgeConfig::default());
    let report = rig.send("homeassistant/cover/group/main/set", b"u").unwrap();
    assert!(!report.group_state_published);
    assert!(!rig
        .broker
        .topics()
        .contains(&"homeassistant/cover/group/main/state"));

    let config = BridgeConfig {
        publish_group_state: true,
        ..BridgeConfig::default()
    };
    let mut rig = Rig::new(&config);
    let report = rig.send("homeassistant/cover/group/main/set", b"u").unwrap();
    assert!(report.group_state_published);
    assert_eq!(
        rig.broker.published.last(),
        Some(&Publication {
            topic: "homeassistant/cover/group/main/state".into(),
            payload: "open".into(),
            retain: true,
        })
    );
}

#[test]
fn failing_member_does_not_stop_the_group() {
    let mut rig = Rig::new(&three_blinds());
    rig.radio = MockRadio::failing_on(&[1]);

    let report = rig.send("home/cover/all/set", b"u").unwrap();

    // All three attempted, the second refused by the radio.
    assert_eq!(rig.radio.attempts, 3);
    assert_eq!(rig.radio.frames.len(), 2);
    assert_eq!(report.targets.len(), 3);
    assert_eq!(report.failures().count(), 1);

    let failed = &report.targets[1];
    assert_eq!(failed.entity, 1);
    assert!(!failed.transmitted);
    assert_eq!(failed.published, None);
    assert_eq!(
        failed.failure,
        Some((
            DispatchStage::Transmitting,
            DispatchError::Transmit(TransmitError::Pin)
        ))
    );

    assert_eq!(rig.broker.topics(), vec!["home/cover/a/state", "home/cover/c/state"]);

    // A burst may have left the antenna: every code is spent.
    for key in 0..3 {
        assert_eq!(rig.code(key), SlotState::Valid(2));
    }

    assert!(rig.sink.events.iter().any(|e| matches!(
        e,
        AppEvent::TargetFailed { entity: 1, command: Command::Up, .. }
    )));
}

#[test]
fn group_of_three_succeeds_with_three_bursts() {
    let mut rig = Rig::new(&three_blinds());
    let report = rig.send("home/cover/all/set", b"s").unwrap();

    assert!(report.all_ok());
    assert_eq!(rig.radio.frames.len(), 3);
    assert_eq!(rig.broker.published.len(), 3);
    assert!(rig.broker.published.iter().all(|p| p.payload == "stopped"));
}

// ── Rolling codes ────────────────────────────────────────────

#[test]
fn each_command_spends_exactly_one_code() {
    let mut rig = Rig::new(&BridgeConfig::default());

    for n in 0..10u16 {
        let report = rig.send("homeassistant/cover/kitchen/set", b"u").unwrap();
        // The frame carries the value read before the advance.
        assert_eq!(report.targets[0].rolling_code, Some(1 + n));
        assert_eq!(
            rig.radio.frames.last().unwrap().payload.as_slice(),
            expected_somfy_payload(Command::Up, (1 + n) as u16, 0x10_0000).as_slice()
        );
    }

    assert_eq!(rig.code(0), SlotState::Valid(11));
    // Desktop was never addressed.
    assert_eq!(rig.code(1), SlotState::Uninitialized);
}

#[test]
fn first_frame_matches_reference_vector() {
    let mut rig = Rig::new(&BridgeConfig::default());
    rig.send("homeassistant/cover/kitchen/set", b"u").unwrap();
    assert_eq!(
        rig.radio.frames[0].payload.as_slice(),
        &[0xA7, 0x88, 0x88, 0x89, 0x89, 0x89, 0x99]
    );
}

#[test]
fn program_uses_long_burst_and_publishes_nothing() {
    let mut rig = Rig::new(&BridgeConfig::default());
    let report = rig.send("homeassistant/cover/desktop/set", b"p").unwrap();

    assert!(report.all_ok());
    assert_eq!(rig.radio.frames[0].repeats, somfy::PROGRAM_REPEATS);
    assert!(rig.broker.published.is_empty());
    assert_eq!(rig.code(1), SlotState::Valid(2));
}

#[test]
fn storage_failure_blocks_transmission() {
    let mut rig = Rig::new(&BridgeConfig::default());
    rig.nvs.fail_writes = true;

    let report = rig.send("homeassistant/cover/kitchen/set", b"d").unwrap();

    // An unseeded slot cannot be persisted, so no code is put on air.
    assert!(rig.radio.frames.is_empty());
    assert!(matches!(
        report.targets[0].failure,
        Some((DispatchStage::Encoding, DispatchError::Storage(_)))
    ));
    assert!(rig.broker.published.is_empty());
}

#[test]
fn broker_outage_is_reported_but_code_is_spent() {
    let mut rig = Rig::new(&BridgeConfig::default());
    rig.broker.connected = false;

    let report = rig.send("homeassistant/cover/kitchen/set", b"u").unwrap();

    assert!(report.targets[0].transmitted);
    assert!(matches!(
        report.targets[0].failure,
        Some((DispatchStage::Published, DispatchError::Publish(_)))
    ));
    assert_eq!(rig.code(0), SlotState::Valid(2));
    assert_eq!(rig.dispatcher.publisher().last_state(0), None);
}

// ── DiO ──────────────────────────────────────────────────────

#[test]
fn dio_program_is_unsupported() {
    let mut rig = Rig::new(&dio_tables());
    let report = rig.send("home/switch/lamp/set", b"p").unwrap();

    assert!(rig.radio.frames.is_empty());
    assert!(rig.broker.published.is_empty());
    assert_eq!(
        report.targets[0].failure,
        Some((
            DispatchStage::Encoding,
            DispatchError::UnsupportedCommand {
                command: Command::Program,
                remote_type: RemoteType::Dio,
            }
        ))
    );
}

#[test]
fn dio_is_stateless_and_deterministic() {
    let mut rig = Rig::new(&dio_tables());

    rig.send("home/switch/lamp/set", b"u").unwrap();
    rig.send("home/switch/lamp/set", b"u").unwrap();

    assert_eq!(rig.radio.frames.len(), 2);
    assert_eq!(rig.radio.frames[0], rig.radio.frames[1]);

    let mut expected = dio::word(12_345_678, true, 1).to_be_bytes().to_vec();
    expected.push(dio::Action::On as u8);
    assert_eq!(rig.radio.frames[0].payload.as_slice(), expected.as_slice());
    assert_eq!(rig.radio.frames[0].repeats, dio::REPEATS);

    // Nothing persisted for DiO.
    assert!(!rig.nvs.exists(NAMESPACE, &slot_key(0)));
    assert_eq!(rig.broker.published[0].payload, "open");
}

#[test]
fn dio_sender_survives_new_somfy_remotes() {
    // Adding Somfy remotes in front shifts the fan's entity id, not the
    // address its receiver was paired with.
    let mut config = dio_tables();
    config.somfy_remotes = vec![SomfyRemoteConfig {
        topic_base: "home/cover/new".into(),
        description: "New".into(),
        storage_key: 0,
    }];
    config.dio_groups[0].members = vec![1, 2];
    let mut rig = Rig::new(&config);
    rig.send("home/switch/fan/set", b"d").unwrap();

    let mut expected = dio::word(0x20_0001, false, 2)
        .to_be_bytes()
        .to_vec();
    expected.push(dio::Action::Off as u8);
    assert_eq!(rig.radio.frames[0].payload.as_slice(), expected.as_slice());
    assert_eq!(rig.broker.published[0].payload, "closed");
}

#[test]
fn dio_group_program_fails_every_member() {
    let mut rig = Rig::new(&dio_tables());
    let report = rig.send("home/switch/both/set", b"p").unwrap();

    assert_eq!(report.targets.len(), 2);
    assert_eq!(report.failures().count(), 2);
    assert!(rig.radio.frames.is_empty());
}

// ── Dropped messages ─────────────────────────────────────────

#[test]
fn unknown_topic_is_dropped_without_side_effects() {
    let mut rig = Rig::new(&BridgeConfig::default());
    let err = rig.send("homeassistant/cover/garage/set", b"u").unwrap_err();

    assert_eq!(err, DispatchError::UnknownTopic);
    assert!(rig.radio.frames.is_empty());
    assert!(rig.broker.published.is_empty());
    assert_eq!(rig.code(0), SlotState::Uninitialized);
    assert!(rig.sink.events.iter().any(|e| matches!(
        e,
        AppEvent::MessageDropped { reason: DispatchError::UnknownTopic, .. }
    )));
}

#[test]
fn unknown_payload_is_dropped_without_side_effects() {
    let mut rig = Rig::new(&BridgeConfig::default());
    for payload in [&b"x"[..], b"", b"up", b"U", b"d "] {
        let err = rig
            .send("homeassistant/cover/kitchen/set", payload)
            .unwrap_err();
        assert_eq!(err, DispatchError::UnknownCommand);
    }
    assert!(rig.radio.frames.is_empty());
    assert_eq!(rig.code(0), SlotState::Uninitialized);
}

#[test]
fn state_topic_is_not_a_command_topic() {
    let mut rig = Rig::new(&BridgeConfig::default());
    assert_eq!(
        rig.send("homeassistant/cover/kitchen/state", b"d").unwrap_err(),
        DispatchError::UnknownTopic
    );
}

#[test]
fn last_state_tracks_publishes() {
    let mut rig = Rig::new(&BridgeConfig::default());
    rig.send("homeassistant/cover/kitchen/set", b"d").unwrap();
    rig.send("homeassistant/cover/kitchen/set", b"s").unwrap();
    assert_eq!(
        rig.dispatcher.publisher().last_state(0),
        Some(CoverState::Stopped)
    );
    assert_eq!(rig.dispatcher.publisher().last_state(1), None);
}
