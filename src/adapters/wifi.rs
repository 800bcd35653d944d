//! WiFi station adapter.
//!
//! The bridge joins the one network named in `bridge.json` and stays on it.
//! There is no provisioning: credentials are checked once at boot and a
//! bad pair is a configuration error.
//!
//! ## cfg gating
//!
//! - **`target_os = "espidf"`**: `BlockingWifi<EspWifi>` from `esp_idf_svc`.
//! - **all other targets**: a scriptable link for host tests.
//!
//! ## Keeping the link up
//!
//! ```text
//!   Down ──join()──▶ Up ──link lost──▶ Retrying{due now}
//!                     ▲                     │ poll() at due time
//!                     └──── joined ─────────┤
//!                                           └─ failed: due += backoff (2 s, 4 s … 60 s)
//! ```

use core::fmt;
use log::{info, warn};

#[cfg(target_os = "espidf")]
use esp_idf_svc::{
    eventloop::EspSystemEventLoop,
    hal::modem::Modem,
    nvs::EspDefaultNvsPartition,
    wifi::{AuthMethod, BlockingWifi, ClientConfiguration, Configuration, EspWifi},
};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LinkError {
    /// SSID empty or longer than 32 bytes.
    BadSsid,
    /// WPA2 passphrases are 8 to 63 characters (64 for a raw hex key).
    BadPassphrase { len: usize },
    /// The access point did not accept us.
    Association,
}

impl fmt::Display for LinkError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::BadSsid => write!(f, "SSID must be 1 to 32 bytes"),
            Self::BadPassphrase { len } => {
                write!(f, "passphrase of {} bytes (need 8-64, or none for open)", len)
            }
            Self::Association => write!(f, "association with the access point failed"),
        }
    }
}

/// Network connectivity as the main loop sees it.
pub trait ConnectivityPort {
    /// First association attempt.  On failure a retry is scheduled.
    fn join(&mut self, now_ms: u64) -> Result<(), LinkError>;
    fn is_connected(&self) -> bool;
    /// Notice a lost link and run retries that are due.
    fn poll(&mut self, now_ms: u64);
}

/// Validated station credentials.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Credentials {
    ssid: heapless::String<32>,
    passphrase: heapless::String<64>,
}

impl Credentials {
    /// An empty passphrase selects an open network.
    pub fn new(ssid: &str, passphrase: &str) -> Result<Self, LinkError> {
        let mut s = heapless::String::new();
        if ssid.is_empty() || s.push_str(ssid).is_err() {
            return Err(LinkError::BadSsid);
        }
        let len = passphrase.len();
        let mut p = heapless::String::new();
        if !(passphrase.is_empty() || (8..=64).contains(&len)) || p.push_str(passphrase).is_err() {
            return Err(LinkError::BadPassphrase { len });
        }
        Ok(Self {
            ssid: s,
            passphrase: p,
        })
    }

    pub fn ssid(&self) -> &str {
        &self.ssid
    }

    pub fn is_open(&self) -> bool {
        self.passphrase.is_empty()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LinkState {
    Down,
    Up,
    Retrying { attempt: u32, due_ms: u64 },
}

const FIRST_RETRY_SECS: u32 = 2;
const MAX_RETRY_SECS: u32 = 60;

pub struct WifiAdapter {
    credentials: Credentials,
    state: LinkState,
    retry_secs: u32,
    #[cfg(target_os = "espidf")]
    wifi: BlockingWifi<EspWifi<'static>>,
    #[cfg(not(target_os = "espidf"))]
    sim: SimLink,
}

/// Host stand-in for the radio link.
#[cfg(not(target_os = "espidf"))]
#[derive(Debug, Default)]
struct SimLink {
    up: bool,
    refuse: u32,
}

impl WifiAdapter {
    /// Station mode with `hostname` as the DHCP host name.
    #[cfg(target_os = "espidf")]
    pub fn new(
        modem: Modem,
        sysloop: EspSystemEventLoop,
        nvs: EspDefaultNvsPartition,
        hostname: &str,
        credentials: Credentials,
    ) -> Result<Self, esp_idf_svc::sys::EspError> {
        let mut driver = EspWifi::new(modem, sysloop.clone(), Some(nvs))?;
        driver.sta_netif_mut().set_hostname(hostname)?;
        let wifi = BlockingWifi::wrap(driver, sysloop)?;
        info!("WiFi: station '{}' for '{}'", hostname, credentials.ssid());
        Ok(Self {
            credentials,
            state: LinkState::Down,
            retry_secs: FIRST_RETRY_SECS,
            wifi,
        })
    }

    #[cfg(not(target_os = "espidf"))]
    pub fn new(credentials: Credentials) -> Self {
        Self {
            credentials,
            state: LinkState::Down,
            retry_secs: FIRST_RETRY_SECS,
            sim: SimLink::default(),
        }
    }

    pub fn state(&self) -> LinkState {
        self.state
    }

    /// Simulation: the access point refuses the next `count` attempts.
    #[cfg(not(target_os = "espidf"))]
    pub fn sim_refuse(&mut self, count: u32) {
        self.sim.refuse = count;
    }

    /// Simulation: the access point goes away.
    #[cfg(not(target_os = "espidf"))]
    pub fn sim_drop_link(&mut self) {
        self.sim.up = false;
    }

    fn attempt(&mut self, attempt: u32, now_ms: u64) -> Result<(), LinkError> {
        match self.associate() {
            Ok(()) => {
                info!("WiFi: joined '{}'", self.credentials.ssid());
                self.state = LinkState::Up;
                self.retry_secs = FIRST_RETRY_SECS;
                Ok(())
            }
            Err(e) => {
                let due_ms = now_ms + u64::from(self.retry_secs) * 1000;
                warn!(
                    "WiFi: attempt {} failed ({}), next in {}s",
                    attempt, e, self.retry_secs
                );
                self.state = LinkState::Retrying {
                    attempt: attempt + 1,
                    due_ms,
                };
                self.retry_secs = (self.retry_secs * 2).min(MAX_RETRY_SECS);
                Err(e)
            }
        }
    }

    #[cfg(target_os = "espidf")]
    fn associate(&mut self) -> Result<(), LinkError> {
        self.bring_up().map_err(|e| {
            warn!("WiFi(espidf): {}", e);
            LinkError::Association
        })
    }

    #[cfg(target_os = "espidf")]
    fn bring_up(&mut self) -> Result<(), esp_idf_svc::sys::EspError> {
        let auth_method = if self.credentials.is_open() {
            AuthMethod::None
        } else {
            AuthMethod::WPA2Personal
        };
        self.wifi
            .set_configuration(&Configuration::Client(ClientConfiguration {
                ssid: self.credentials.ssid.clone(),
                password: self.credentials.passphrase.clone(),
                auth_method,
                ..Default::default()
            }))?;
        if !self.wifi.is_started()? {
            self.wifi.start()?;
        }
        self.wifi.connect()?;
        self.wifi.wait_netif_up()
    }

    #[cfg(not(target_os = "espidf"))]
    fn associate(&mut self) -> Result<(), LinkError> {
        if self.sim.refuse > 0 {
            self.sim.refuse -= 1;
            return Err(LinkError::Association);
        }
        self.sim.up = true;
        Ok(())
    }

    #[cfg(target_os = "espidf")]
    fn link_up(&self) -> bool {
        self.wifi.is_connected().unwrap_or(false)
    }

    #[cfg(not(target_os = "espidf"))]
    fn link_up(&self) -> bool {
        self.sim.up
    }
}

impl ConnectivityPort for WifiAdapter {
    fn join(&mut self, now_ms: u64) -> Result<(), LinkError> {
        self.attempt(0, now_ms)
    }

    fn is_connected(&self) -> bool {
        self.state == LinkState::Up && self.link_up()
    }

    fn poll(&mut self, now_ms: u64) {
        match self.state {
            LinkState::Up if !self.link_up() => {
                warn!("WiFi: link lost");
                self.state = LinkState::Retrying {
                    attempt: 1,
                    due_ms: now_ms,
                };
            }
            LinkState::Retrying { attempt, due_ms } if now_ms >= due_ms => {
                let _ = self.attempt(attempt, now_ms);
            }
            _ => {}
        }
    }
}
