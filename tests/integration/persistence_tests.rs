//! Rolling-code persistence across reboots, resets and flash damage.

use super::mock_hw::{MockBroker, MockNvs, MockRadio, RecordingSink};

use shutterbox::app::events::AppEvent;
use shutterbox::codes::{CodeSlot, NAMESPACE, SlotState, slot_key};
use shutterbox::rf::somfy;
use shutterbox::{BridgeConfig, Catalog, Command, Dispatcher};

fn boot(config: &BridgeConfig) -> Dispatcher {
    Dispatcher::new(Catalog::build(config).unwrap(), config)
}

fn press(dispatcher: &mut Dispatcher, nvs: &mut MockNvs, radio: &mut MockRadio, topic: &str) {
    let report = dispatcher
        .handle_message(
            topic,
            b"u",
            nvs,
            radio,
            &mut MockBroker::new(),
            &mut RecordingSink::new(),
        )
        .unwrap();
    assert!(report.all_ok());
}

/// Rolling code carried by a Somfy payload.
fn code_on_air(payload: &[u8]) -> u16 {
    let mut frame = [0u8; somfy::FRAME_LEN];
    frame.copy_from_slice(payload);
    somfy::deobfuscate(&mut frame);
    u16::from_be_bytes([frame[2], frame[3]])
}

#[test]
fn codes_survive_a_reboot() {
    let config = BridgeConfig::default();
    let mut nvs = MockNvs::new();
    let mut radio = MockRadio::new();

    let mut first = boot(&config);
    for _ in 0..5 {
        press(&mut first, &mut nvs, &mut radio, "homeassistant/cover/kitchen/set");
    }
    drop(first);

    // Same flash, fresh firmware image.
    let mut second = boot(&config);
    press(&mut second, &mut nvs, &mut radio, "homeassistant/cover/kitchen/set");

    let codes: Vec<u16> = radio.frames.iter().map(|f| code_on_air(&f.payload)).collect();
    assert_eq!(codes, vec![1, 2, 3, 4, 5, 6]);
    assert_eq!(second.codes().load(&nvs, 0).unwrap(), SlotState::Valid(7));
}

#[test]
fn reset_overwrites_every_slot() {
    let config = BridgeConfig {
        default_rolling_code: 100,
        ..BridgeConfig::default()
    };
    let mut nvs = MockNvs::new();
    let mut radio = MockRadio::new();
    let mut sink = RecordingSink::new();

    let mut dispatcher = boot(&config);
    for _ in 0..3 {
        press(&mut dispatcher, &mut nvs, &mut radio, "homeassistant/cover/desktop/set");
    }

    let slots = dispatcher.reset_codes(&mut nvs, &mut sink).unwrap();
    assert_eq!(slots, 2);
    assert_eq!(sink.events, vec![AppEvent::CodesReset { slots: 2, code: 100 }]);

    for key in [0, 1] {
        assert_eq!(dispatcher.codes().load(&nvs, key).unwrap(), SlotState::Valid(100));
    }
}

#[test]
fn corrupt_slot_is_reseeded_and_reported() {
    let config = BridgeConfig::default();
    let mut nvs = MockNvs::new();
    nvs.put_raw(NAMESPACE, &slot_key(0), &[0xFF, 0x13, 0x37]);

    let mut dispatcher = boot(&config);
    assert_eq!(dispatcher.codes().load(&nvs, 0).unwrap(), SlotState::Corrupt);

    let mut radio = MockRadio::new();
    let mut sink = RecordingSink::new();
    let report = dispatcher
        .handle_message(
            "homeassistant/cover/kitchen/set",
            b"d",
            &mut nvs,
            &mut radio,
            &mut MockBroker::new(),
            &mut sink,
        )
        .unwrap();

    assert!(report.all_ok());
    assert_eq!(report.targets[0].rolling_code, Some(config.default_rolling_code));
    assert!(sink.events.contains(&AppEvent::SlotRecovered {
        storage_key: 0,
        code: config.default_rolling_code,
    }));
    assert_eq!(
        dispatcher.codes().load(&nvs, 0).unwrap(),
        SlotState::Valid(config.default_rolling_code + 1)
    );
}

#[test]
fn oversized_slot_does_not_lock_out_the_remote() {
    let config = BridgeConfig::default();
    let mut nvs = MockNvs::new();
    nvs.put_raw(NAMESPACE, &slot_key(1), &[0xA5; 32]);

    let mut dispatcher = boot(&config);
    assert_eq!(dispatcher.codes().load(&nvs, 1).unwrap(), SlotState::Corrupt);

    let mut radio = MockRadio::new();
    press(&mut dispatcher, &mut nvs, &mut radio, "homeassistant/cover/desktop/set");
    press(&mut dispatcher, &mut nvs, &mut radio, "homeassistant/cover/desktop/set");

    let codes: Vec<u16> = radio.frames.iter().map(|f| code_on_air(&f.payload)).collect();
    assert_eq!(codes, vec![config.default_rolling_code, config.default_rolling_code + 1]);
    assert_eq!(
        dispatcher.codes().load(&nvs, 1).unwrap(),
        SlotState::Valid(config.default_rolling_code + 2)
    );
}

#[test]
fn zero_is_a_valid_stored_code() {
    let mut nvs = MockNvs::new();
    let bytes = postcard::to_allocvec(&CodeSlot::new(0)).unwrap();
    nvs.put_raw(NAMESPACE, &slot_key(1), &bytes);

    let mut dispatcher = boot(&BridgeConfig::default());
    let mut radio = MockRadio::new();
    press(&mut dispatcher, &mut nvs, &mut radio, "homeassistant/cover/desktop/set");

    assert_eq!(code_on_air(&radio.frames[0].payload), 0);
}

#[test]
fn counter_wraps_after_the_last_code() {
    let mut nvs = MockNvs::new();
    let mut dispatcher = boot(&BridgeConfig::default());
    dispatcher.codes().store(&mut nvs, 0, u16::MAX).unwrap();

    let mut radio = MockRadio::new();
    press(&mut dispatcher, &mut nvs, &mut radio, "homeassistant/cover/kitchen/set");
    press(&mut dispatcher, &mut nvs, &mut radio, "homeassistant/cover/kitchen/set");

    assert_eq!(code_on_air(&radio.frames[0].payload), 0xFFFF);
    assert_eq!(code_on_air(&radio.frames[1].payload), 0);
    assert_eq!(dispatcher.codes().load(&nvs, 0).unwrap(), SlotState::Valid(1));
}

#[test]
fn program_spends_a_code_like_any_command() {
    let mut nvs = MockNvs::new();
    let mut radio = MockRadio::new();
    let mut dispatcher = boot(&BridgeConfig::default());

    for payload in [&b"p"[..], b"u", b"s", b"d"] {
        dispatcher
            .handle_message(
                "homeassistant/cover/kitchen/set",
                payload,
                &mut nvs,
                &mut radio,
                &mut MockBroker::new(),
                &mut RecordingSink::new(),
            )
            .unwrap();
    }

    let codes: Vec<u16> = radio.frames.iter().map(|f| code_on_air(&f.payload)).collect();
    assert_eq!(codes, vec![1, 2, 3, 4]);
    assert_eq!(Command::from_payload(b"p"), Some(Command::Program));
}
