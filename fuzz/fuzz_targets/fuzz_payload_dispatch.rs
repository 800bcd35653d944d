//! Fuzz target: `Dispatcher::handle_message`
//!
//! Splits the input into a topic and a payload and runs it through the
//! dispatcher with the shipped tables.  The dispatcher must never panic,
//! must only transmit for known topics with a known command, and must
//! spend exactly one rolling code per Somfy burst attempt.
//!
//! cargo fuzz run fuzz_payload_dispatch

#![no_main]

use libfuzzer_sys::fuzz_target;
use shutterbox::adapters::log_sink::LogEventSink;
use shutterbox::adapters::nvs::NvsAdapter;
use shutterbox::app::ports::{PublishError, RadioPort, StatePort, TransmitError};
use shutterbox::rf::RfFrame;
use shutterbox::{BridgeConfig, Catalog, Command, Dispatcher};

#[derive(Default)]
struct CountingRadio(usize);

impl RadioPort for CountingRadio {
    fn transmit(&mut self, _frame: &RfFrame) -> Result<(), TransmitError> {
        self.0 += 1;
        Ok(())
    }
}

struct NullBroker;

impl StatePort for NullBroker {
    fn publish(&mut self, _topic: &str, _payload: &str, _retain: bool) -> Result<(), PublishError> {
        Ok(())
    }
}

fuzz_target!(|data: &[u8]| {
    let split = data.iter().position(|&b| b == 0).unwrap_or(data.len());
    let (topic, payload) = data.split_at(split);
    let payload = payload.get(1..).unwrap_or_default();
    let Ok(topic) = core::str::from_utf8(topic) else {
        return;
    };

    let config = BridgeConfig::default();
    let Ok(catalog) = Catalog::build(&config) else {
        return;
    };
    let mut dispatcher = Dispatcher::new(catalog, &config);
    let Ok(mut nvs) = NvsAdapter::new() else {
        return;
    };
    let mut radio = CountingRadio::default();

    let result = dispatcher.handle_message(
        topic,
        payload,
        &mut nvs,
        &mut radio,
        &mut NullBroker,
        &mut LogEventSink::new(),
    );

    match result {
        Ok(report) => {
            assert!(Command::from_payload(payload).is_some());
            assert_eq!(radio.0, report.targets.len());
            for t in &report.targets {
                let code = t.rolling_code.expect("default tables are all Somfy");
                let key = dispatcher
                    .catalog()
                    .lookup_by_id(t.entity)
                    .and_then(|e| e.storage_key())
                    .expect("target has a slot");
                assert_eq!(
                    dispatcher.codes().load(&nvs, key),
                    Ok(shutterbox::codes::SlotState::Valid(code.wrapping_add(1)))
                );
            }
        }
        Err(_) => assert_eq!(radio.0, 0),
    }
});
