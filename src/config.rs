//! Bridge configuration tables.
//!
//! Everything the firmware needs to know about the installation: which
//! Somfy and DiO remotes exist, how they are grouped, the radio base
//! addresses, rolling-code seeding, and the WiFi / MQTT endpoints.
//!
//! The tables are consumed exactly once at boot (see
//! [`Catalog::build`](crate::catalog::Catalog::build)).  The firmware embeds
//! `config/bridge.json` at compile time; [`BridgeConfig::default`] mirrors
//! the shipped example installation.
//!
//! Group members reference **entity ids**, assigned in declaration order:
//! all Somfy remotes, then Somfy groups, then DiO remotes, then DiO groups.
//! With the default tables "Kitchen" is id 0 and "Desktop" id 1.

use serde::{Deserialize, Serialize};

/// Maximum number of members a single group may list.
pub const MAX_GROUP_MEMBERS: usize = 16;

/// Number of rolling-code slots reserved in NVS.  Storage keys must be
/// below this bound; adding remotes never moves existing keys.
pub const MAX_CODE_SLOTS: u16 = 64;

/// One Somfy RTS remote (a motor, or a set of motors paired to it).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SomfyRemoteConfig {
    /// MQTT topic prefix, e.g. `homeassistant/cover/kitchen`.
    pub topic_base: String,
    /// Human label shown in Home Assistant.
    pub description: String,
    /// Persisted rolling-code slot.  Never renumber an existing remote:
    /// its motor only accepts codes above the last one it saw.
    pub storage_key: u16,
}

/// One Chacon DiO 1.0 receiver.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DioRemoteConfig {
    pub topic_base: String,
    pub description: String,
    /// 26-bit emitter address the receiver was paired with.  Required:
    /// entity ids move when remotes are added, a pairing must not.
    pub sender: u32,
    /// Receiver channel, 0–15.
    pub interruptor: u8,
}

/// A named set of remotes driven together.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GroupConfig {
    pub topic_base: String,
    pub description: String,
    /// Entity ids of the members, in transmission order.
    pub members: Vec<u16>,
}

/// WiFi station settings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct WifiSettings {
    pub ssid: String,
    pub password: String,
    /// The last three MAC bytes are appended to form the hostname.
    pub hostname_prefix: String,
}

impl Default for WifiSettings {
    fn default() -> Self {
        Self {
            ssid: String::new(),
            password: String::new(),
            hostname_prefix: "box-somfy-dio".into(),
        }
    }
}

/// MQTT broker and Home Assistant discovery settings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct MqttSettings {
    pub server: String,
    pub port: u16,
    pub user: String,
    pub password: String,
    /// Appended to each entity's topic base to form its discovery topic.
    pub discovery_suffix: String,
    /// Discovery document with `<BASE_TOPIC>` and `<NAME>` placeholders.
    pub discovery_template: String,
}

impl Default for MqttSettings {
    fn default() -> Self {
        Self {
            server: "192.168.1.x".into(),
            port: 1883,
            user: String::new(),
            password: String::new(),
            discovery_suffix: "/config".into(),
            discovery_template: DEFAULT_DISCOVERY_TEMPLATE.into(),
        }
    }
}

/// Default Home Assistant cover discovery document.
pub const DEFAULT_DISCOVERY_TEMPLATE: &str = "{\"~\":\"<BASE_TOPIC>\",\"name\":\"<NAME>\",\
\"command_topic\":\"~/set\",\"state_topic\":\"~/state\",\
\"payload_close\":\"d\",\"payload_stop\":\"s\",\"payload_open\":\"u\"}";

fn default_somfy_base_id() -> u32 {
    0x10_0000
}

fn default_rolling_code() -> u16 {
    1
}

/// Complete installation description.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BridgeConfig {
    /// Somfy address of entity 0; entity `n` transmits as `base + n`.
    #[serde(default = "default_somfy_base_id")]
    pub somfy_base_id: u32,
    #[serde(default)]
    pub somfy_remotes: Vec<SomfyRemoteConfig>,
    #[serde(default)]
    pub somfy_groups: Vec<GroupConfig>,

    #[serde(default)]
    pub dio_remotes: Vec<DioRemoteConfig>,
    #[serde(default)]
    pub dio_groups: Vec<GroupConfig>,

    /// Overwrite every rolling code with `default_rolling_code` at boot.
    /// Leave false unless the motors are being re-paired.
    #[serde(default)]
    pub reset_rolling_codes: bool,
    /// Seed for a slot on first use or reset.
    #[serde(default = "default_rolling_code")]
    pub default_rolling_code: u16,
    /// Also publish a group's own state topic after a fully successful
    /// group command.
    #[serde(default)]
    pub publish_group_state: bool,

    #[serde(default)]
    pub wifi: WifiSettings,
    #[serde(default)]
    pub mqtt: MqttSettings,
}

impl BridgeConfig {
    /// Parse the JSON form of the tables (the format of `config/bridge.json`).
    pub fn from_json(text: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(text)
    }

    /// Total number of catalog entities these tables declare.
    pub fn entity_count(&self) -> usize {
        self.somfy_remotes.len()
            + self.somfy_groups.len()
            + self.dio_remotes.len()
            + self.dio_groups.len()
    }
}

impl Default for BridgeConfig {
    fn default() -> Self {
        Self {
            somfy_base_id: default_somfy_base_id(),
            somfy_remotes: vec![
                SomfyRemoteConfig {
                    topic_base: "homeassistant/cover/kitchen".into(),
                    description: "Kitchen".into(),
                    storage_key: 0,
                },
                SomfyRemoteConfig {
                    topic_base: "homeassistant/cover/desktop".into(),
                    description: "Desktop".into(),
                    storage_key: 1,
                },
            ],
            somfy_groups: vec![GroupConfig {
                topic_base: "homeassistant/cover/group/main".into(),
                description: "All".into(),
                members: vec![0, 1],
            }],
            dio_remotes: Vec::new(),
            dio_groups: Vec::new(),
            reset_rolling_codes: false,
            default_rolling_code: default_rolling_code(),
            publish_group_state: false,
            wifi: WifiSettings::default(),
            mqtt: MqttSettings::default(),
        }
    }
}
