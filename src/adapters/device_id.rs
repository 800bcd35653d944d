//! Device identity derived from the ESP32 factory MAC address.
//!
//! The hostname (also the MQTT client id) is the configured prefix plus
//! the last 3 bytes of the 6-byte MAC in lowercase hex, e.g.
//! `box-somfy-dio-aabbcc`.  It is stable across reboots (eFuse MAC) and
//! unique per board, so several bridges can share a broker.

use core::fmt::Write;

/// Hostname / client id string.  Prefixes longer than fits are truncated.
pub type Hostname = heapless::String<32>;

/// Full 6-byte MAC address.
pub type MacAddress = [u8; 6];

/// Read the factory MAC address from eFuse.
#[cfg(target_os = "espidf")]
pub fn read_mac() -> MacAddress {
    let mut mac: MacAddress = [0u8; 6];
    unsafe {
        esp_idf_svc::sys::esp_efuse_mac_get_default(mac.as_mut_ptr());
    }
    mac
}

/// Simulation: returns a deterministic fake MAC.
#[cfg(not(target_os = "espidf"))]
pub fn read_mac() -> MacAddress {
    [0xDE, 0xAD, 0xBE, 0xEF, 0xCA, 0xFE]
}

/// `<prefix>-xxyyzz`.
pub fn hostname(prefix: &str, mac: &MacAddress) -> Hostname {
    const SUFFIX_LEN: usize = 7;
    let mut name = Hostname::new();
    let room = name.capacity() - SUFFIX_LEN;
    let cut = prefix
        .char_indices()
        .map(|(i, c)| i + c.len_utf8())
        .take_while(|&end| end <= room)
        .last()
        .unwrap_or(0);
    let _ = name.push_str(&prefix[..cut]);
    let _ = write!(name, "-{:02x}{:02x}{:02x}", mac[3], mac[4], mac[5]);
    name
}
