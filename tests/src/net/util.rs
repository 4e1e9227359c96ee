use dashlink_common::config::Config;
use dashlink_core::limiter::ConnectionLimiter;
use dashlink_core::mock::MockTransport;
use dashlink_core::session::SessionRegistry;
use pnet::datalink::{MacAddr, NetworkInterface};
use pnet::ipnetwork::{IpNetwork, Ipv4Network, Ipv6Network};
use std::net::{IpAddr, Ipv4Addr, Ipv6Addr};
use std::sync::Arc;

/// Up, broadcast, running.
pub const FLAGS_UP: u32 = 69699;
/// Up, loopback, running.
pub const FLAGS_LOOPBACK: u32 = 65609;
/// Broadcast capable but administratively down.
pub const FLAGS_DOWN: u32 = 4098;

pub fn ni(name: &str, index: u32, mac: Option<MacAddr>, ips: &[IpNetwork], flags: u32) -> NetworkInterface {
    NetworkInterface {
        name: name.into(),
        description: "".into(),
        index,
        mac,
        ips: ips.to_vec(),
        flags,
    }
}

pub fn v4(a: u8, b: u8, c: u8, d: u8, p: u8) -> IpNetwork {
    IpNetwork::V4(Ipv4Network::new(Ipv4Addr::new(a, b, c, d), p).unwrap())
}

pub fn v6(s: &str, p: u8) -> IpNetwork {
    IpNetwork::V6(Ipv6Network::new(s.parse::<Ipv6Addr>().unwrap(), p).unwrap())
}

pub fn ip(a: u8, b: u8, c: u8, d: u8) -> IpAddr {
    IpAddr::V4(Ipv4Addr::new(a, b, c, d))
}

pub fn registry(mock: &MockTransport, slots: usize) -> SessionRegistry {
    SessionRegistry::new(
        Arc::new(mock.clone()),
        ConnectionLimiter::new(slots),
        Config::default(),
    )
}
