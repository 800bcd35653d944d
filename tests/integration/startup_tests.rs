//! Boot sequence against the simulated broker: tables → catalog →
//! discovery → subscribe, then commands arriving through the inbox.

use super::mock_hw::{MockNvs, MockRadio, RecordingSink};

use shutterbox::adapters::device_id;
use shutterbox::adapters::mqtt::{self, MqttAdapter};
use shutterbox::app::ports::StatePort;
use shutterbox::config::{GroupConfig, SomfyRemoteConfig};
use shutterbox::discovery::{self, Announcement};
use shutterbox::{BridgeConfig, Catalog, ConfigError, Dispatcher};

/// What the main loop does on every new broker session.
fn on_session(broker: &mut MqttAdapter, catalog: &Catalog, announcements: &[Announcement]) {
    for topic in catalog.set_topics() {
        broker.subscribe(topic).unwrap();
    }
    for a in announcements {
        broker.publish(&a.topic, &a.payload, true).unwrap();
    }
}

#[test]
fn session_subscribes_and_announces_every_entity() {
    let config = BridgeConfig::default();
    let catalog = Catalog::build(&config).unwrap();
    let announcements = discovery::announcements(&config.mqtt, &catalog).unwrap();

    let mut broker = MqttAdapter::new();
    broker.sim_connect();
    assert!(broker.take_new_session());
    on_session(&mut broker, &catalog, &announcements);

    assert_eq!(
        broker.sim().subscriptions,
        vec![
            "homeassistant/cover/kitchen/set",
            "homeassistant/cover/desktop/set",
            "homeassistant/cover/group/main/set",
        ]
    );
    let published = &broker.sim().published;
    assert_eq!(published.len(), 3);
    assert!(published.iter().all(|(topic, _, retain)| *retain && topic.ends_with("/config")));
    let doc: serde_json::Value = serde_json::from_str(&published[2].1).unwrap();
    assert_eq!(doc["name"], "All");
    assert_eq!(doc["~"], "homeassistant/cover/group/main");
}

#[test]
fn reconnect_triggers_a_fresh_subscription() {
    let config = BridgeConfig::default();
    let catalog = Catalog::build(&config).unwrap();
    let announcements = discovery::announcements(&config.mqtt, &catalog).unwrap();

    let mut broker = MqttAdapter::new();
    broker.sim_connect();
    assert!(broker.take_new_session());
    on_session(&mut broker, &catalog, &announcements);

    broker.sim().connected = false;
    assert!(!broker.take_new_session());
    broker.sim_connect();
    assert!(broker.sim().subscriptions.is_empty());
    assert!(broker.take_new_session());
    on_session(&mut broker, &catalog, &announcements);
    assert_eq!(broker.sim().subscriptions.len(), 3);
    assert_eq!(broker.sim().published.len(), 6);
}

#[test]
fn inbox_messages_drive_the_dispatcher() {
    let config = BridgeConfig::default();
    let mut dispatcher = Dispatcher::new(Catalog::build(&config).unwrap(), &config);
    let mut broker = MqttAdapter::new();
    broker.sim_connect();
    let mut nvs = MockNvs::new();
    let mut radio = MockRadio::new();
    let mut sink = RecordingSink::new();

    while mqtt::poll_inbound().is_some() {}
    assert!(mqtt::enqueue("homeassistant/cover/kitchen/set", b"u"));
    assert!(mqtt::enqueue("homeassistant/cover/nowhere/set", b"u"));
    assert!(mqtt::enqueue("homeassistant/cover/desktop/set", b"s"));

    let mut handled = 0;
    let mut dropped = 0;
    while let Some(msg) = mqtt::poll_inbound() {
        match dispatcher.handle_message(
            &msg.topic,
            &msg.payload,
            &mut nvs,
            &mut radio,
            &mut broker,
            &mut sink,
        ) {
            Ok(report) => {
                assert!(report.all_ok());
                handled += 1;
            }
            Err(_) => dropped += 1,
        }
    }

    assert_eq!((handled, dropped), (2, 1));
    assert_eq!(radio.frames.len(), 2);
    let states: Vec<(&str, &str)> = broker
        .sim()
        .published
        .iter()
        .map(|(t, p, _)| (t.as_str(), p.as_str()))
        .collect();
    assert_eq!(
        states,
        vec![
            ("homeassistant/cover/kitchen/state", "open"),
            ("homeassistant/cover/desktop/state", "stopped"),
        ]
    );
}

#[test]
fn bad_tables_are_rejected_before_anything_runs() {
    let mut config = BridgeConfig::default();
    config.somfy_remotes.push(SomfyRemoteConfig {
        topic_base: "homeassistant/cover/kitchen".into(),
        description: "Kitchen again".into(),
        storage_key: 5,
    });
    assert!(matches!(
        Catalog::build(&config),
        Err(ConfigError::DuplicateTopic { .. })
    ));

    let mut config = BridgeConfig::default();
    config.somfy_groups.push(GroupConfig {
        topic_base: "homeassistant/cover/group/empty".into(),
        description: "Empty".into(),
        members: Vec::new(),
    });
    assert!(matches!(
        Catalog::build(&config),
        Err(ConfigError::EmptyGroup { .. })
    ));
}

#[test]
fn client_id_is_derived_from_mac() {
    let config = BridgeConfig::default();
    let name = device_id::hostname(&config.wifi.hostname_prefix, &device_id::read_mac());
    assert_eq!(name.as_str(), "box-somfy-dio-efcafe");
}
