use dashlink_common::config::TETHERING_ADDR;
use dashlink_common::network::interface::scan_targets;
use pnet::datalink::{MacAddr, NetworkInterface};
use std::net::IpAddr;

use super::util::{FLAGS_DOWN, FLAGS_LOOPBACK, FLAGS_UP, ip, ni, v4, v6};

/*************************************************************
                    Tests for scan targets
**************************************************************/

#[test]
fn tethering_address_comes_first() {
    let targets = scan_targets(&[lo(), enp9s0()]);
    assert_eq!(targets.iter().next(), Some(&IpAddr::V4(TETHERING_ADDR)));
}

#[test]
fn lan_is_swept_without_the_host_itself() {
    let targets = scan_targets(&[lo(), enp9s0()]);

    // Tethering address plus 254 usable hosts minus our own.
    assert_eq!(targets.len(), 1 + 253);
    assert!(targets.contains(&ip(192, 168, 0, 1)));
    assert!(targets.contains(&ip(192, 168, 0, 254)));
    assert!(!targets.contains(&ip(192, 168, 0, 32)));
    assert!(!targets.contains(&ip(192, 168, 0, 0)));
    assert!(!targets.contains(&ip(192, 168, 0, 255)));
}

#[test]
fn loopback_and_down_interfaces_are_ignored() {
    let targets = scan_targets(&[lo(), eth1_down()]);
    assert_eq!(targets.iter().collect::<Vec<_>>(), vec![&IpAddr::V4(TETHERING_ADDR)]);
}

#[test]
fn networks_wider_than_the_limit_yield_nothing() {
    let targets = scan_targets(&[tun0()]);
    assert_eq!(targets.len(), 1);

    let targets = scan_targets(&[office()]);
    assert_eq!(targets.len(), 1 + 1022 - 1);
}

#[test]
fn ipv6_and_link_local_networks_are_skipped() {
    let targets = scan_targets(&[ipv6only0(), zeroconf0()]);
    assert_eq!(targets.len(), 1);
}

#[test]
fn tethered_host_sweeps_hotspot_once() {
    let targets = scan_targets(&[lo(), wlan0_tethered()]);

    assert_eq!(targets.iter().next(), Some(&ip(192, 168, 43, 1)));
    assert_eq!(targets.len(), 253);
    assert!(!targets.contains(&ip(192, 168, 43, 100)));
}

#[test]
fn host_acting_as_hotspot_never_probes_itself() {
    let targets = scan_targets(&[wlan0_hotspot()]);

    assert!(!targets.contains(&IpAddr::V4(TETHERING_ADDR)));
    assert_eq!(targets.len(), 253);
}

#[test]
fn overlapping_interfaces_are_deduplicated() {
    let targets = scan_targets(&[enp9s0(), br0()]);
    assert_eq!(targets.len(), 1 + 254 - 2);
}

/*************************************************************
                  Mock interfaces for testing
**************************************************************/

fn lo() -> NetworkInterface {
    ni(
        "lo",
        1,
        Some(MacAddr::new(0, 0, 0, 0, 0, 0)),
        &[v4(127, 0, 0, 1, 8), v6("::1", 128)],
        FLAGS_LOOPBACK,
    )
}

fn enp9s0() -> NetworkInterface {
    ni(
        "enp9s0",
        2,
        Some(MacAddr::new(0xa8, 0xa1, 0x59, 0x13, 0x41, 0x46)),
        &[
            v4(192, 168, 0, 32, 24),
            v6("2a02:908:8c1:b880::b054", 128),
            v6("fe80::b3dd:5c39:7c29:48b6", 64),
        ],
        FLAGS_UP,
    )
}

fn br0() -> NetworkInterface {
    ni(
        "br0",
        9,
        Some(MacAddr::new(0x02, 0x42, 0x0a, 0x00, 0x00, 0x09)),
        &[v4(192, 168, 0, 33, 24)],
        FLAGS_UP,
    )
}

fn eth1_down() -> NetworkInterface {
    ni(
        "eth1",
        3,
        Some(MacAddr::new(0x00, 0x1b, 0x21, 0x3a, 0x4f, 0x10)),
        &[v4(10, 0, 0, 15, 24)],
        FLAGS_DOWN,
    )
}

fn tun0() -> NetworkInterface {
    ni("tun0", 5, None, &[v4(10, 8, 0, 6, 16)], FLAGS_UP)
}

fn office() -> NetworkInterface {
    ni(
        "office0",
        6,
        Some(MacAddr::new(0x3c, 0x52, 0x82, 0x10, 0x20, 0x30)),
        &[v4(10, 20, 4, 9, 22)],
        FLAGS_UP,
    )
}

fn ipv6only0() -> NetworkInterface {
    ni(
        "ipv6only0",
        7,
        Some(MacAddr::new(0x02, 0x00, 0x00, 0x00, 0x00, 0x07)),
        &[v6("fd00::7", 64), v6("fe80::7", 64)],
        FLAGS_UP,
    )
}

fn zeroconf0() -> NetworkInterface {
    ni(
        "zeroconf0",
        8,
        Some(MacAddr::new(0x02, 0x00, 0x00, 0x00, 0x00, 0x08)),
        &[v4(169, 254, 10, 2, 24)],
        FLAGS_UP,
    )
}

fn wlan0_tethered() -> NetworkInterface {
    ni(
        "wlan0",
        4,
        Some(MacAddr::new(0x5c, 0x87, 0x9c, 0x11, 0x22, 0x33)),
        &[v4(192, 168, 43, 100, 24)],
        FLAGS_UP,
    )
}

fn wlan0_hotspot() -> NetworkInterface {
    ni(
        "wlan0",
        4,
        Some(MacAddr::new(0x5c, 0x87, 0x9c, 0x11, 0x22, 0x33)),
        &[v4(192, 168, 43, 1, 24)],
        FLAGS_UP,
    )
}
