//! Shutterbox Firmware — Main Entry Point
//!
//! Somfy RTS / Chacon DiO to MQTT bridge, hexagonal architecture.
//!
//! ```text
//! ┌────────────────────────────────────────────────────────────────┐
//! │                      Adapters (outer ring)                     │
//! │                                                                │
//! │  MqttAdapter    RfRadio      NvsAdapter    LogEventSink        │
//! │  (StatePort)    (RadioPort)  (StoragePort) (EventSink)         │
//! │  WifiAdapter    StatusLed                                      │
//! │  (Connectivity)                                                │
//! │                                                                │
//! │  ──────────────── Port Trait Boundary ───────────────────      │
//! │                                                                │
//! │  ┌────────────────────────────────────────────────────────┐    │
//! │  │              Dispatcher (pure logic)                   │    │
//! │  │  Catalog · RollingCodeStore · Encoders · Publisher     │    │
//! │  └────────────────────────────────────────────────────────┘    │
//! └────────────────────────────────────────────────────────────────┘
//! ```
//!
//! The MQTT connection task only queues inbound messages; every dispatch
//! runs on this task, one at a time.
#![deny(unused_must_use)]

use std::time::Instant;

use anyhow::{Result, anyhow};
use embedded_hal::digital::OutputPin;
use esp_idf_svc::eventloop::EspSystemEventLoop;
use esp_idf_svc::hal::delay::{Ets, FreeRtos};
use esp_idf_svc::hal::gpio::PinDriver;
use esp_idf_svc::hal::peripherals::Peripherals;
use esp_idf_svc::nvs::EspDefaultNvsPartition;
use log::{debug, error, info, warn};

use shutterbox::adapters::device_id;
use shutterbox::adapters::log_sink::LogEventSink;
use shutterbox::adapters::mqtt::{self, MqttAdapter};
use shutterbox::adapters::nvs::NvsAdapter;
use shutterbox::adapters::radio::RfRadio;
use shutterbox::adapters::wifi::{ConnectivityPort, Credentials, WifiAdapter};
use shutterbox::app::ports::StatePort;
use shutterbox::discovery;
use shutterbox::drivers::led_patterns::{BridgeStatus, LedPatternEngine};
use shutterbox::drivers::status_led::StatusLed;
use shutterbox::pins;
use shutterbox::{BridgeConfig, Catalog, Dispatcher};

const LOOP_INTERVAL_MS: u32 = 20;

/// Park the firmware with the error pattern on the LED.  Used when the
/// installation tables are unusable: serving commands with a wrong
/// catalog could drive the wrong motors.
fn halt<P: OutputPin>(led: &mut StatusLed<P>, engine: &mut LedPatternEngine) -> ! {
    engine.set_error(true);
    loop {
        led.set(engine.tick(LOOP_INTERVAL_MS));
        FreeRtos::delay_ms(LOOP_INTERVAL_MS);
    }
}

fn main() -> Result<()> {
    // ── 1. ESP-IDF bootstrap ──────────────────────────────────
    esp_idf_svc::sys::link_patches();
    esp_idf_logger::init()?;

    info!("Shutterbox v{}", env!("CARGO_PKG_VERSION"));

    let peripherals = Peripherals::take()?;
    let sysloop = EspSystemEventLoop::take()?;
    let nvs_partition = EspDefaultNvsPartition::take()?;

    // ── 2. Status LED ─────────────────────────────────────────
    let mut led = StatusLed::new(
        PinDriver::output(peripherals.pins.gpio2)?,
        pins::STATUS_LED_ACTIVE_LOW,
    );
    let mut led_engine = LedPatternEngine::new();
    led_engine.set_status(BridgeStatus::Connecting);

    // ── 3. Installation tables ────────────────────────────────
    let config = match BridgeConfig::from_json(include_str!("../config/bridge.json")) {
        Ok(c) => c,
        Err(e) => {
            error!("Config: bridge.json unreadable: {}", e);
            halt(&mut led, &mut led_engine);
        }
    };
    let catalog = match Catalog::build(&config) {
        Ok(c) => c,
        Err(e) => {
            error!("Config: rejected: {}", e);
            halt(&mut led, &mut led_engine);
        }
    };
    let announcements = match discovery::announcements(&config.mqtt, &catalog) {
        Ok(a) => a,
        Err(e) => {
            error!("Config: {}", e);
            halt(&mut led, &mut led_engine);
        }
    };

    // ── 4. Rolling codes + dispatcher ─────────────────────────
    let mut storage = NvsAdapter::new().map_err(|e| anyhow!("NVS init failed: {}", e))?;
    let mut sink = LogEventSink::new();
    let mut dispatcher = Dispatcher::new(catalog, &config);

    if config.reset_rolling_codes {
        warn!("Rolling codes: reset requested, re-pair every motor afterwards");
        if let Err(e) = dispatcher.reset_codes(&mut storage, &mut sink) {
            error!("Rolling codes: reset failed: {}", e);
        }
    }
    dispatcher.start(&mut sink);

    // ── 5. Radio ──────────────────────────────────────────────
    let mut radio = RfRadio::new(PinDriver::output(peripherals.pins.gpio4)?, Ets)
        .map_err(|e| anyhow!("RF pin init failed: {}", e))?;
    info!("RF: transmitter on GPIO{}", pins::RF_TX_GPIO);

    // ── 6. Network ────────────────────────────────────────────
    let mac = device_id::read_mac();
    let hostname = device_id::hostname(&config.wifi.hostname_prefix, &mac);
    info!("Device: {}", hostname);

    let credentials = match Credentials::new(&config.wifi.ssid, &config.wifi.password) {
        Ok(c) => c,
        Err(e) => {
            error!("WiFi: {}", e);
            halt(&mut led, &mut led_engine);
        }
    };
    let mut wifi = WifiAdapter::new(
        peripherals.modem,
        sysloop,
        nvs_partition,
        &hostname,
        credentials,
    )?;
    let boot = Instant::now();
    if let Err(e) = wifi.join(0) {
        warn!("WiFi: first attempt failed ({}), will retry", e);
    }

    let mut broker = MqttAdapter::new(&config.mqtt, &hostname)?;

    info!("System ready. Entering main loop.");

    // ── 7. Main loop ──────────────────────────────────────────
    loop {
        let now_ms = boot.elapsed().as_millis() as u64;
        wifi.poll(now_ms);

        if broker.take_new_session() {
            for topic in dispatcher.catalog().set_topics() {
                if let Err(e) = broker.subscribe(topic) {
                    warn!("MQTT: subscribe {} failed: {}", topic, e);
                }
            }
            for a in &announcements {
                if let Err(e) = broker.publish(&a.topic, &a.payload, true) {
                    warn!("MQTT: discovery {} failed: {}", a.topic, e);
                }
            }
            info!(
                "MQTT: subscribed to {} topics, {} announcements sent",
                dispatcher.catalog().len(),
                announcements.len()
            );
        }

        while let Some(msg) = mqtt::poll_inbound() {
            match dispatcher.handle_message(
                &msg.topic,
                &msg.payload,
                &mut storage,
                &mut radio,
                &mut broker,
                &mut sink,
            ) {
                Ok(report) if !report.all_ok() => warn!(
                    "Dispatch: {} of {} targets failed on {}",
                    report.failures().count(),
                    report.targets.len(),
                    msg.topic
                ),
                Ok(_) => {}
                Err(e) => debug!("Dispatch: {} dropped: {}", msg.topic, e),
            }
        }

        let status = if !wifi.is_connected() {
            BridgeStatus::Connecting
        } else if !broker.is_connected() {
            BridgeStatus::BrokerConnecting
        } else {
            BridgeStatus::Ready
        };
        led_engine.set_status(status);
        led.set(led_engine.tick(LOOP_INTERVAL_MS));

        FreeRtos::delay_ms(LOOP_INTERVAL_MS);
    }
}
