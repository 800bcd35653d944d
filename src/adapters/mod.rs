//! Adapters — concrete implementations of the hexagonal port traits.
//!
//! | Adapter     | Implements        | Connects to                  |
//! |-------------|-------------------|------------------------------|
//! | `log_sink`  | EventSink         | Serial log output            |
//! | `mqtt`      | StatePort         | esp-mqtt client / sim broker |
//! | `nvs`       | StoragePort       | NVS / in-memory store        |
//! | `radio`     | RadioPort         | OOK transmitter data pin     |
//! | `wifi`      | ConnectivityPort  | ESP-IDF WiFi STA             |
//!
//! `device_id` is a helper, not a port: it derives the MQTT client id and
//! hostname from the factory MAC.

pub mod device_id;
pub mod log_sink;
pub mod mqtt;
pub mod nvs;
pub mod radio;
pub mod wifi;
