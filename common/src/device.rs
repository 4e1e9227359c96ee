//! # Device Model
//!
//! A device is identified by its address alone. The hardware generation is a closed
//! tag decided by discovery; it changes which account a session logs in as, never
//! the device's identity.

use std::fmt;
use std::hash::{Hash, Hasher};
use std::net::{IpAddr, SocketAddr};

use crate::config::{Config, STORAGE_ROOT};

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum DeviceKind {
    /// Accepts the administrative login.
    GenerationTwo,
    /// Accepts the regular login but rejects the administrative one.
    GenerationThree,
    /// Reachable, but rejected the regular login.
    Unknown,
}

impl DeviceKind {
    pub fn display_name(&self) -> &'static str {
        match self {
            DeviceKind::GenerationTwo => "comma two",
            DeviceKind::GenerationThree => "comma three",
            DeviceKind::Unknown => "unknown device",
        }
    }

    /// Account a session logs in as, `None` for hosts dashlink cannot use.
    pub fn login_user<'a>(&self, cfg: &'a Config) -> Option<&'a str> {
        match self {
            DeviceKind::GenerationTwo => Some(&cfg.admin_user),
            DeviceKind::GenerationThree => Some(&cfg.user),
            DeviceKind::Unknown => None,
        }
    }

    pub fn storage_root(&self) -> &'static str {
        STORAGE_ROOT
    }

    pub fn is_supported(&self) -> bool {
        !matches!(self, DeviceKind::Unknown)
    }
}

#[derive(Debug, Clone)]
pub struct Device {
    pub address: IpAddr,
    pub port: u16,
    pub kind: DeviceKind,
    pub name: String,
}

impl Device {
    pub fn new(address: IpAddr, port: u16, kind: DeviceKind) -> Self {
        Self {
            address,
            port,
            kind,
            name: format!("{} ({address})", kind.display_name()),
        }
    }

    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = name.into();
        self
    }

    pub fn socket_addr(&self) -> SocketAddr {
        SocketAddr::new(self.address, self.port)
    }
}

impl PartialEq for Device {
    fn eq(&self, other: &Self) -> bool {
        self.address == other.address
    }
}

impl Eq for Device {}

impl Hash for Device {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.address.hash(state);
    }
}

impl fmt::Display for Device {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.name)
    }
}

/// Outcome of probing a single address.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProbeResult {
    NoDevice,
    UnknownDevice(IpAddr),
    ClassifiedDevice(IpAddr, DeviceKind),
}

impl ProbeResult {
    pub fn into_device(self, port: u16) -> Option<Device> {
        match self {
            ProbeResult::NoDevice => None,
            ProbeResult::UnknownDevice(address) => {
                Some(Device::new(address, port, DeviceKind::Unknown))
            }
            ProbeResult::ClassifiedDevice(address, kind) => Some(Device::new(address, port, kind)),
        }
    }
}

// ╔════════════════════════════════════════════╗
// ║ ████████╗███████╗███████╗████████╗███████╗ ║
// ║ ╚══██╔══╝██╔════╝██╔════╝╚══██╔══╝██╔════╝ ║
// ║    ██║   █████╗  ███████╗   ██║   ███████╗ ║
// ║    ██║   ██╔══╝  ╚════██║   ██║   ╚════██║ ║
// ║    ██║   ███████╗███████║   ██║   ███████║ ║
// ║    ╚═╝   ╚══════╝╚══════╝   ╚═╝   ╚══════╝ ║
// ╚════════════════════════════════════════════╝

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;
    use std::net::Ipv4Addr;

    fn ip(last: u8) -> IpAddr {
        IpAddr::V4(Ipv4Addr::new(192, 168, 0, last))
    }

    #[test]
    fn equality_ignores_kind_and_name() {
        let a = Device::new(ip(10), 8022, DeviceKind::GenerationTwo);
        let b = Device::new(ip(10), 22, DeviceKind::Unknown).with_name("garage");
        assert_eq!(a, b);

        let mut set = HashSet::new();
        set.insert(a);
        assert!(!set.insert(b), "same address must hash to the same device");
    }

    #[test]
    fn different_addresses_never_equal() {
        let a = Device::new(ip(10), 8022, DeviceKind::GenerationThree);
        let b = Device::new(ip(11), 8022, DeviceKind::GenerationThree);
        assert_ne!(a, b);
    }

    #[test]
    fn login_user_follows_generation() {
        let cfg = Config::default();
        assert_eq!(DeviceKind::GenerationTwo.login_user(&cfg), Some("root"));
        assert_eq!(DeviceKind::GenerationThree.login_user(&cfg), Some("comma"));
        assert_eq!(DeviceKind::Unknown.login_user(&cfg), None);
    }

    #[test]
    fn probe_results_map_to_devices() {
        assert_eq!(ProbeResult::NoDevice.into_device(8022), None);

        let unknown = ProbeResult::UnknownDevice(ip(3)).into_device(8022).unwrap();
        assert_eq!(unknown.kind, DeviceKind::Unknown);

        let three = ProbeResult::ClassifiedDevice(ip(4), DeviceKind::GenerationThree)
            .into_device(8022)
            .unwrap();
        assert_eq!(three.kind, DeviceKind::GenerationThree);
        assert_eq!(three.socket_addr().port(), 8022);
        assert_eq!(three.to_string(), "comma three (192.168.0.4)");
    }
}
