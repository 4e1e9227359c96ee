//! Turns the local interface table into discovery targets.
//!
//! Every up, non-loopback interface contributes the usable hosts of each of its IPv4
//! networks, minus the host's own addresses. Networks wider than
//! [`MAX_SCAN_ADDRESSES`](crate::config::MAX_SCAN_ADDRESSES) are skipped entirely
//! to keep the number of concurrent probes bounded. The tethering address is
//! always scheduled first, whether or not its network gets swept.

use std::collections::HashSet;
use std::net::IpAddr;

use pnet::datalink::{self, NetworkInterface};
use pnet::ipnetwork::{IpNetwork, Ipv4Network};
use tracing::{debug, info};

use crate::config::TETHERING_ADDR;
use crate::network::range::{IpCollection, ScanRange};

pub trait NetworkInterfaceExtension {
    fn get_ipv4_nets(&self) -> Vec<Ipv4Network>;
    fn is_scan_candidate(&self) -> bool;
}

impl NetworkInterfaceExtension for NetworkInterface {
    fn get_ipv4_nets(&self) -> Vec<Ipv4Network> {
        self.ips
            .iter()
            .filter_map(|ip| {
                if let IpNetwork::V4(ipv4) = ip {
                    Some(*ipv4)
                } else {
                    None
                }
            })
            .collect()
    }

    fn is_scan_candidate(&self) -> bool {
        self.is_up() && !self.is_loopback()
    }
}

/// The range of `net` worth sweeping, or `None` when it is too large.
pub fn scan_range(net: &Ipv4Network) -> Option<ScanRange> {
    let range = ScanRange::from(*net);
    range.is_scannable().then_some(range)
}

/// Scan targets for the interfaces of this machine.
pub fn local_scan_targets() -> IpCollection {
    scan_targets(&datalink::interfaces())
}

pub fn scan_targets(interfaces: &[NetworkInterface]) -> IpCollection {
    let local_addrs: HashSet<IpAddr> = interfaces
        .iter()
        .flat_map(|intf| intf.ips.iter().map(|net| net.ip()))
        .collect();

    let mut targets = IpCollection::new();
    let tethering = IpAddr::V4(TETHERING_ADDR);
    if !local_addrs.contains(&tethering) {
        targets.add_single(tethering);
    }

    for intf in interfaces.iter().filter(|intf| intf.is_scan_candidate()) {
        for net in &intf.ips {
            let IpNetwork::V4(v4) = net else {
                info!("Skipping {net} on {}: not an IPv4 network", intf.name);
                continue;
            };
            if v4.ip().is_loopback() || v4.ip().is_link_local() {
                debug!("Skipping {v4} on {}", intf.name);
                continue;
            }
            let Some(range) = scan_range(v4) else {
                info!("Skipping {v4} on {}: network is too large to sweep", intf.name);
                continue;
            };

            let before = targets.len();
            for ip in range.to_range().iter().map(IpAddr::V4) {
                if !local_addrs.contains(&ip) {
                    targets.add_single(ip);
                }
            }
            debug!(
                "Scheduled {} addresses from {v4} on {}",
                targets.len() - before,
                intf.name
            );
        }
    }

    targets
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
    use std::net::Ipv4Addr;

    #[test]
    fn scan_range_refuses_wide_networks() {
        let wide = Ipv4Network::new(Ipv4Addr::new(172, 16, 0, 10), 16).unwrap();
        assert_eq!(scan_range(&wide), None);

        let narrow = Ipv4Network::new(Ipv4Addr::new(172, 16, 0, 10), 24).unwrap();
        assert_eq!(scan_range(&narrow).map(|r| r.address_count), Some(254));
    }

    #[test]
    fn no_interfaces_still_probes_tethering() {
        let targets = scan_targets(&[]);
        let addrs: Vec<IpAddr> = targets.into_iter().collect();
        assert_eq!(addrs, vec![IpAddr::V4(TETHERING_ADDR)]);
    }
}
