//! # IPv4 Range Model
//!
//! Address arithmetic for turning an interface's network into the hosts worth
//! probing, and the ordered collection discovery consumes.

use std::collections::HashSet;
use std::net::{IpAddr, Ipv4Addr};

use pnet::ipnetwork::Ipv4Network;

use crate::config::MAX_SCAN_ADDRESSES;

/// Represents a continuous range of IPv4 addresses, inclusive.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Ipv4Range {
    pub start_addr: Ipv4Addr,
    pub end_addr: Ipv4Addr,
}

impl Ipv4Range {
    pub fn new(start_addr: Ipv4Addr, end_addr: Ipv4Addr) -> Self {
        Self {
            start_addr,
            end_addr,
        }
    }

    pub fn iter(&self) -> impl DoubleEndedIterator<Item = Ipv4Addr> + Clone {
        let start: u32 = u32::from(self.start_addr);
        let end: u32 = u32::from(self.end_addr);
        (start..=end).map(Ipv4Addr::from)
    }
}

/// The usable hosts of one IPv4 network.
///
/// Network and broadcast addresses are excluded, except for /31 and /32 where
/// every address is a host.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ScanRange {
    pub first_usable: Ipv4Addr,
    pub address_count: u32,
}

impl ScanRange {
    pub fn from_network(ip: Ipv4Addr, mask: Ipv4Addr) -> Self {
        let mask: u32 = u32::from(mask);
        let network: u32 = u32::from(ip) & mask;
        let host_bits: u32 = !mask;

        match host_bits {
            0 => Self {
                first_usable: Ipv4Addr::from(network),
                address_count: 1,
            },
            1 => Self {
                first_usable: Ipv4Addr::from(network),
                address_count: 2,
            },
            _ => Self {
                first_usable: Ipv4Addr::from(network + 1),
                address_count: host_bits - 1,
            },
        }
    }

    /// Ranges above [`MAX_SCAN_ADDRESSES`] are skipped whole, never partially.
    pub fn is_scannable(&self) -> bool {
        self.address_count <= MAX_SCAN_ADDRESSES
    }

    pub fn to_range(&self) -> Ipv4Range {
        let start: u32 = u32::from(self.first_usable);
        let end: u32 = start.saturating_add(self.address_count.saturating_sub(1));
        Ipv4Range::new(self.first_usable, Ipv4Addr::from(end))
    }
}

impl From<Ipv4Network> for ScanRange {
    fn from(net: Ipv4Network) -> Self {
        Self::from_network(net.ip(), net.mask())
    }
}

/// Insertion-ordered, de-duplicated set of addresses to probe.
#[derive(Debug, Clone, Default)]
pub struct IpCollection {
    addrs: Vec<IpAddr>,
    seen: HashSet<IpAddr>,
}

impl IpCollection {
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns `false` when the address was already present.
    pub fn add_single(&mut self, ip: IpAddr) -> bool {
        if !self.seen.insert(ip) {
            return false;
        }
        self.addrs.push(ip);
        true
    }

    pub fn add_range(&mut self, range: Ipv4Range) {
        for ip in range.iter() {
            self.add_single(IpAddr::V4(ip));
        }
    }

    pub fn contains(&self, ip: &IpAddr) -> bool {
        self.seen.contains(ip)
    }

    pub fn len(&self) -> usize {
        self.addrs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.addrs.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &IpAddr> {
        self.addrs.iter()
    }
}

impl IntoIterator for IpCollection {
    type Item = IpAddr;
    type IntoIter = std::vec::IntoIter<IpAddr>;

    fn into_iter(self) -> Self::IntoIter {
        self.addrs.into_iter()
    }
}

impl FromIterator<IpAddr> for IpCollection {
    fn from_iter<T: IntoIterator<Item = IpAddr>>(iter: T) -> Self {
        let mut collection = IpCollection::new();
        for ip in iter {
            collection.add_single(ip);
        }
        collection
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
