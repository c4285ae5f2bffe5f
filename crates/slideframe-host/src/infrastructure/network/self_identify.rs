//! Network self-identification.
//!
//! Lists the addresses an operator can type into a browser to reach this
//! frame's control surface.  Every local interface address is considered,
//! except:
//!
//! - loopback addresses (`127.0.0.0/8`, `::1`), which only reach this machine;
//! - IPv4 link-local addresses (`169.254.0.0/16`), which are self-assigned
//!   when DHCP fails and are useless to an operator;
//! - any address whose textual form contains `::`, i.e. compressed IPv6
//!   addresses, which are awkward to type and rarely routable on a home LAN.
//!
//! Enumeration problems never fail the caller: a broken interface is logged
//! and skipped, and a failed enumeration yields no endpoints at all.

use std::fmt;
use std::net::{IpAddr, SocketAddr};

use serde::Serialize;
use thiserror::Error;
use tracing::{debug, warn};

/// A local interface address as reported by the OS.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InterfaceAddress {
    pub name: String,
    pub ip: IpAddr,
}

/// Error reported while enumerating interfaces.
#[derive(Debug, Error)]
pub enum InterfaceError {
    #[error("failed to enumerate network interfaces: {0}")]
    Enumerate(#[source] std::io::Error),
    #[error("interface {name}: {reason}")]
    Interface { name: String, reason: String },
}

/// An `ip:port` pair an operator can reach this frame on.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct Endpoint {
    pub ip: IpAddr,
    pub port: u16,
}

impl Endpoint {
    /// `http://ip:port`, for display.
    pub fn url(&self) -> String {
        format!("http://{self}")
    }
}

impl fmt::Display for Endpoint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", SocketAddr::new(self.ip, self.port))
    }
}

/// Whether `ip` is worth showing to an operator.
pub fn is_operator_addressable(ip: &IpAddr) -> bool {
    if ip.is_loopback() {
        return false;
    }
    if let IpAddr::V4(v4) = ip {
        if v4.is_link_local() {
            return false;
        }
    }
    !ip.to_string().contains("::")
}

/// Filters `interfaces` down to operator-addressable endpoints on `port`.
///
/// Errors are logged and skipped.  Order follows the input; an address seen
/// on two interfaces is listed once.
pub fn endpoints_from<I>(interfaces: I, port: u16) -> Vec<Endpoint>
where
    I: IntoIterator<Item = Result<InterfaceAddress, InterfaceError>>,
{
    let mut endpoints: Vec<Endpoint> = Vec::new();
    for entry in interfaces {
        match entry {
            Ok(iface) if is_operator_addressable(&iface.ip) => {
                let endpoint = Endpoint { ip: iface.ip, port };
                if !endpoints.contains(&endpoint) {
                    endpoints.push(endpoint);
                }
            }
            Ok(iface) => debug!("skipping {} address {}", iface.name, iface.ip),
            Err(e) => warn!("{e}"),
        }
    }
    endpoints
}

/// Validates one OS-reported interface address.
///
/// An interface that is up but has no address assigned yet reports the
/// unspecified address (`0.0.0.0` or `::`); that entry is an error.
pub fn interface_entry(name: String, ip: IpAddr) -> Result<InterfaceAddress, InterfaceError> {
    if ip.is_unspecified() {
        return Err(InterfaceError::Interface {
            name,
            reason: "no address assigned".to_string(),
        });
    }
    Ok(InterfaceAddress { name, ip })
}

/// Enumerates this machine's interface addresses.
pub fn system_interfaces() -> Vec<Result<InterfaceAddress, InterfaceError>> {
    match get_if_addrs::get_if_addrs() {
        Ok(interfaces) => interfaces
            .into_iter()
            .map(|iface| {
                let ip = iface.ip();
                interface_entry(iface.name, ip)
            })
            .collect(),
        Err(e) => vec![Err(InterfaceError::Enumerate(e))],
    }
}

/// Operator-addressable endpoints of this machine on `port`.
pub fn local_endpoints(port: u16) -> Vec<Endpoint> {
    endpoints_from(system_interfaces(), port)
}

// ── Tests ─────────────────────────────────────────────────────────────────────
