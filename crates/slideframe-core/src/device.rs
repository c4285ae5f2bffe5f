//! Remote device domain types.
//!
//! A *remote device* is a secondary frame that receives settings pushed from
//! this frame.  It is identified by a [`DeviceAddress`] and tracked as a
//! [`RemoteDevice`] record whose [`DeviceState`] follows the outcome of the
//! most recent delivery attempt:
//!
//! ```text
//!              success                 failure
//! Unknown ───────────────► Reachable ◄───────────► Unreachable
//!    │                                      ▲
//!    └──────────────── failure ─────────────┘
//! ```
//!
//! There is no terminal state: a device stays registered, flipping between
//! `Reachable` and `Unreachable`, until it is explicitly unregistered.

use std::fmt;
use std::net::{IpAddr, SocketAddr};
use std::time::SystemTime;

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Port a frame's control surface listens on unless told otherwise.
pub const DEFAULT_DEVICE_PORT: u16 = 8000;

/// Error returned when a device address string cannot be parsed.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum AddressError {
    #[error("device address is empty")]
    Empty,
    #[error("device address must be host[:port], not a URL: {0}")]
    NotHostPort(String),
    #[error("invalid port in device address: {0}")]
    InvalidPort(String),
    #[error("invalid host in device address: {0}")]
    InvalidHost(String),
}

/// Network address of a remote frame (`host:port`).
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct DeviceAddress {
    host: String,
    port: u16,
}

impl DeviceAddress {
    /// Parses `host`, `host:port`, `ip`, `ip:port` or `[ipv6]:port`, using
    /// [`DEFAULT_DEVICE_PORT`] when no port is given.
    ///
    /// # Errors
    ///
    /// Returns an [`AddressError`] for empty input, URLs, bad ports, or hosts
    /// containing characters outside `[A-Za-z0-9.-_]`.
    pub fn parse(input: &str) -> Result<Self, AddressError> {
        Self::parse_with_default_port(input, DEFAULT_DEVICE_PORT)
    }

    /// Like [`parse`](Self::parse) with a caller-chosen default port.
    ///
    /// # Errors
    ///
    /// See [`parse`](Self::parse).
    pub fn parse_with_default_port(input: &str, default_port: u16) -> Result<Self, AddressError> {
        let s = input.trim();
        if s.is_empty() {
            return Err(AddressError::Empty);
        }
        if s.contains("://") || s.contains('/') || s.contains(char::is_whitespace) {
            return Err(AddressError::NotHostPort(s.to_string()));
        }

        if let Ok(sock) = s.parse::<SocketAddr>() {
            return Self::from_ip(sock.ip(), sock.port(), s);
        }
        if let Ok(ip) = s.parse::<IpAddr>() {
            return Self::from_ip(ip, default_port, s);
        }
        if let Some(inner) = s.strip_prefix('[').and_then(|r| r.strip_suffix(']')) {
            let ip = inner
                .parse::<IpAddr>()
                .map_err(|_| AddressError::InvalidHost(s.to_string()))?;
            return Self::from_ip(ip, default_port, s);
        }

        let (host, port) = match s.rsplit_once(':') {
            Some((host, port)) => {
                let port = port
                    .parse::<u16>()
                    .map_err(|_| AddressError::InvalidPort(s.to_string()))?;
                (host, port)
            }
            None => (s, default_port),
        };
        if port == 0 {
            return Err(AddressError::InvalidPort(s.to_string()));
        }
        let valid_host = !host.is_empty()
            && host
                .chars()
                .all(|c| c.is_ascii_alphanumeric() || matches!(c, '.' | '-' | '_'));
        if !valid_host {
            return Err(AddressError::InvalidHost(s.to_string()));
        }

        Ok(Self {
            host: host.to_ascii_lowercase(),
            port,
        })
    }

    fn from_ip(ip: IpAddr, port: u16, original: &str) -> Result<Self, AddressError> {
        if port == 0 {
            return Err(AddressError::InvalidPort(original.to_string()));
        }
        Ok(Self {
            host: ip.to_string(),
            port,
        })
    }

    pub fn host(&self) -> &str {
        &self.host
    }

    pub fn port(&self) -> u16 {
        self.port
    }

    /// `http://host:port` with no trailing slash.
    pub fn base_url(&self) -> String {
        format!("http://{self}")
    }
}

impl fmt::Display for DeviceAddress {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.host.contains(':') {
            write!(f, "[{}]:{}", self.host, self.port)
        } else {
            write!(f, "{}:{}", self.host, self.port)
        }
    }
}

impl TryFrom<String> for DeviceAddress {
    type Error = AddressError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::parse(&value)
    }
}

impl From<DeviceAddress> for String {
    fn from(value: DeviceAddress) -> Self {
        value.to_string()
    }
}

/// Reachability of a remote device as of its last delivery attempt.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DeviceState {
    /// Registered but never contacted.
    Unknown,
    /// The last delivery attempt succeeded.
    Reachable,
    /// The last delivery attempt failed.
    Unreachable,
}

/// A remote device tracked by the device cache.
#[derive(Debug, Clone, PartialEq)]
pub struct RemoteDevice {
    pub address: DeviceAddress,
    pub state: DeviceState,
    /// When a delivery to this device last succeeded.
    pub last_sync: Option<SystemTime>,
}

impl RemoteDevice {
    /// A freshly registered device: `Unknown`, never synced.
    pub fn new(address: DeviceAddress) -> Self {
        Self {
            address,
            state: DeviceState::Unknown,
            last_sync: None,
        }
    }

    /// Records a successful delivery at `at`.
    pub fn record_success(&mut self, at: SystemTime) {
        self.state = DeviceState::Reachable;
        self.last_sync = Some(at);
    }

    /// Records a successful probe.  Nothing was synced, so `last_sync` is
    /// left alone.
    pub fn record_reachable(&mut self) {
        self.state = DeviceState::Reachable;
    }

    /// Records a failed delivery.  `last_sync` keeps the previous success.
    pub fn record_failure(&mut self) {
        self.state = DeviceState::Unreachable;
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────
