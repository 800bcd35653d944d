//! MQTT client adapter.
//!
//! Implements [`StatePort`] (outbound publishes) and feeds inbound command
//! messages to the main loop through a static `embassy-sync` channel:
//!
//! ```text
//! ┌────────────────┐  InboundMessage  ┌──────────────┐
//! │ MQTT conn task │────── INBOX ────▶│  Main loop   │──▶ Dispatcher
//! │ (esp-mqtt)     │                  │  (sync)      │
//! └────────────────┘                  └──────────────┘
//! ```
//!
//! The main loop is the only consumer and handles one message at a time,
//! so dispatches never overlap.  When the inbox is full the connection
//! task drops the message with a warning rather than block the client.
//!
//! ## Sessions
//!
//! The broker forgets subscriptions when a clean session reconnects.  Every
//! `Connected` event starts a new session; [`MqttAdapter::take_new_session`]
//! tells the main loop to subscribe and announce again.

use embassy_sync::blocking_mutex::raw::CriticalSectionRawMutex;
use embassy_sync::channel::Channel;
use log::warn;

use crate::app::ports::{PublishError, StatePort};

#[cfg(target_os = "espidf")]
use core::sync::atomic::{AtomicBool, AtomicU32, Ordering};
#[cfg(target_os = "espidf")]
use esp_idf_svc::mqtt::client::{EspMqttClient, EventPayload, MqttClientConfiguration, QoS};
#[cfg(target_os = "espidf")]
use log::info;

#[cfg(target_os = "espidf")]
use crate::config::MqttSettings;

/// Longest topic the bridge accepts.
pub const MAX_TOPIC_LEN: usize = 128;
/// Command payloads are a single letter; anything longer is noise.
pub const MAX_PAYLOAD_LEN: usize = 16;
/// Messages buffered between the connection task and the main loop.
pub const INBOX_DEPTH: usize = 8;

/// One message received on a subscribed topic.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InboundMessage {
    pub topic: heapless::String<MAX_TOPIC_LEN>,
    pub payload: heapless::Vec<u8, MAX_PAYLOAD_LEN>,
}

impl InboundMessage {
    /// `None` if the topic or payload exceeds the inbox limits.
    pub fn new(topic: &str, payload: &[u8]) -> Option<Self> {
        let mut t = heapless::String::new();
        t.push_str(topic).ok()?;
        Some(Self {
            topic: t,
            payload: heapless::Vec::from_slice(payload).ok()?,
        })
    }
}

/// Inbound channel: MQTT connection task → main loop.
pub static INBOX: Channel<CriticalSectionRawMutex, InboundMessage, INBOX_DEPTH> = Channel::new();

/// Queue a received message for the main loop.  Returns `false` if it was
/// dropped (oversized, or inbox full).
pub fn enqueue(topic: &str, payload: &[u8]) -> bool {
    let Some(msg) = InboundMessage::new(topic, payload) else {
        warn!("MQTT: dropping oversized message on '{}'", topic);
        return false;
    };
    if INBOX.try_send(msg).is_err() {
        warn!("MQTT: inbox full, dropping message on '{}'", topic);
        return false;
    }
    true
}

/// Next queued message, if any.  Never blocks.
pub fn poll_inbound() -> Option<InboundMessage> {
    INBOX.try_receive().ok()
}

#[cfg(target_os = "espidf")]
static CONNECTED: AtomicBool = AtomicBool::new(false);
/// Bumped on every `Connected` event.
#[cfg(target_os = "espidf")]
static SESSION: AtomicU32 = AtomicU32::new(0);

pub struct MqttAdapter {
    seen_session: u32,
    #[cfg(target_os = "espidf")]
    client: EspMqttClient<'static>,
    #[cfg(not(target_os = "espidf"))]
    sim: SimBroker,
}

/// In-memory broker session used on the host.
#[cfg(not(target_os = "espidf"))]
#[derive(Debug, Default)]
pub struct SimBroker {
    pub connected: bool,
    pub session: u32,
    pub subscriptions: Vec<String>,
    /// `(topic, payload, retain)` in publish order.
    pub published: Vec<(String, String, bool)>,
}

impl MqttAdapter {
    /// Create the client and start its connection task.
    #[cfg(target_os = "espidf")]
    pub fn new(settings: &MqttSettings, client_id: &str) -> anyhow::Result<Self> {
        let url = format!("mqtt://{}:{}", settings.server, settings.port);
        let conf = MqttClientConfiguration {
            client_id: Some(client_id),
            username: (!settings.user.is_empty()).then_some(settings.user.as_str()),
            password: (!settings.password.is_empty()).then_some(settings.password.as_str()),
            keep_alive_interval: Some(core::time::Duration::from_secs(30)),
            reconnect_timeout: Some(core::time::Duration::from_secs(5)),
            ..Default::default()
        };
        let (client, mut connection) = EspMqttClient::new(&url, &conf)?;

        std::thread::Builder::new()
            .name("mqtt-conn".into())
            .stack_size(6 * 1024)
            .spawn(move || {
                info!("MQTT: connection task started");
                while let Ok(event) = connection.next() {
                    match event.payload() {
                        EventPayload::Connected(_) => {
                            CONNECTED.store(true, Ordering::Release);
                            SESSION.fetch_add(1, Ordering::AcqRel);
                            info!("MQTT: connected");
                        }
                        EventPayload::Disconnected => {
                            CONNECTED.store(false, Ordering::Release);
                            warn!("MQTT: disconnected, client will retry");
                        }
                        EventPayload::Received {
                            topic: Some(topic),
                            data,
                            ..
                        } => {
                            enqueue(topic, data);
                        }
                        EventPayload::Error(e) => warn!("MQTT: {:?}", e),
                        _ => {}
                    }
                }
                CONNECTED.store(false, Ordering::Release);
                warn!("MQTT: connection task ended");
            })?;

        info!("MQTT: client '{}' -> {}", client_id, url);
        Ok(Self {
            seen_session: 0,
            client,
        })
    }

    #[cfg(not(target_os = "espidf"))]
    pub fn new() -> Self {
        Self {
            seen_session: 0,
            sim: SimBroker::default(),
        }
    }

    /// Simulation: inspect or script the broker side.
    #[cfg(not(target_os = "espidf"))]
    pub fn sim(&mut self) -> &mut SimBroker {
        &mut self.sim
    }

    /// Simulation: the broker accepted a (re)connection.
    #[cfg(not(target_os = "espidf"))]
    pub fn sim_connect(&mut self) {
        self.sim.connected = true;
        self.sim.session += 1;
        self.sim.subscriptions.clear();
    }

    #[cfg(target_os = "espidf")]
    pub fn is_connected(&self) -> bool {
        CONNECTED.load(Ordering::Acquire)
    }

    #[cfg(not(target_os = "espidf"))]
    pub fn is_connected(&self) -> bool {
        self.sim.connected
    }

    #[cfg(target_os = "espidf")]
    fn session(&self) -> u32 {
        SESSION.load(Ordering::Acquire)
    }

    #[cfg(not(target_os = "espidf"))]
    fn session(&self) -> u32 {
        self.sim.session
    }

    /// `true` once per broker session, the first time it is asked while
    /// connected.
    pub fn take_new_session(&mut self) -> bool {
        let session = self.session();
        if self.is_connected() && session != self.seen_session {
            self.seen_session = session;
            true
        } else {
            false
        }
    }

    pub fn subscribe(&mut self, topic: &str) -> Result<(), PublishError> {
        if !self.is_connected() {
            return Err(PublishError::Disconnected);
        }

        #[cfg(target_os = "espidf")]
        {
            self.client
                .subscribe(topic, QoS::AtLeastOnce)
                .map(|_| ())
                .map_err(|e| {
                    warn!("MQTT: subscribe '{}' failed: {}", topic, e);
                    PublishError::Rejected
                })
        }

        #[cfg(not(target_os = "espidf"))]
        {
            self.sim.subscriptions.push(topic.to_owned());
            Ok(())
        }
    }
}

#[cfg(not(target_os = "espidf"))]
impl Default for MqttAdapter {
    fn default() -> Self {
        Self::new()
    }
}

impl StatePort for MqttAdapter {
    fn publish(&mut self, topic: &str, payload: &str, retain: bool) -> Result<(), PublishError> {
        if !self.is_connected() {
            return Err(PublishError::Disconnected);
        }

        #[cfg(target_os = "espidf")]
        {
            self.client
                .enqueue(topic, QoS::AtLeastOnce, retain, payload.as_bytes())
                .map(|_| ())
                .map_err(|e| {
                    warn!("MQTT: publish '{}' failed: {}", topic, e);
                    PublishError::Rejected
                })
        }

        #[cfg(not(target_os = "espidf"))]
        {
            self.sim
                .published
                .push((topic.to_owned(), payload.to_owned(), retain));
            Ok(())
        }
    }
}
