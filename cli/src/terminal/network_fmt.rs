use crate::terminal::{colors, print};
use colored::*;
use dashlink_common::device::{Device, DeviceKind};
use dashlink_common::drive::{Drive, SegmentFile};
use pnet::datalink::NetworkInterface;
use pnet::ipnetwork::IpNetwork;
use std::net::Ipv6Addr;

use crate::terminal::print::Detail;

pub fn ipv6_to_type_str(ipv6_addr: &Ipv6Addr) -> &'static str {
    let first_byte = ipv6_addr.octets()[0];
    if (0x20..=0x3F).contains(&first_byte) {
        return "GUA";
    }
    if ipv6_addr.is_unique_local() {
        return "ULA";
    }
    if ipv6_addr.is_unicast_link_local() {
        return "LLA";
    }
    "IPv6"
}

pub fn to_key_value_pair_net(ip_net: &[IpNetwork]) -> Vec<Detail> {
    ip_net
        .iter()
        .map(|ip_network| match ip_network {
            IpNetwork::V4(ipv4_network) => {
                let address: ColoredString = ipv4_network.ip().to_string().color(colors::IPV4_ADDR);
                let prefix: ColoredString =
                    ipv4_network.prefix().to_string().color(colors::IPV4_PREFIX);
                let result: ColoredString = format!("{address}/{prefix}").color(colors::SEPARATOR);
                ("IPv4".to_string(), result)
            }
            IpNetwork::V6(ipv6_network) => {
                let address: ColoredString = ipv6_network.ip().to_string().color(colors::IPV6_ADDR);
                let prefix: ColoredString =
                    ipv6_network.prefix().to_string().color(colors::IPV6_PREFIX);
                let value: ColoredString = format!("{address}/{prefix}").color(colors::SEPARATOR);
                (ipv6_to_type_str(&ipv6_network.ip()).to_string(), value)
            }
        })
        .collect()
}

pub fn print_interface(interface: &NetworkInterface, idx: usize, sweep: Option<u32>) {
    print::tree_head(idx, &interface.name);
    let mut key_value_pair: Vec<Detail> = to_key_value_pair_net(&interface.ips);
    if let Some(mac_addr) = interface.mac {
        key_value_pair.push((
            "MAC".to_string(),
            mac_addr.to_string().color(colors::MAC_ADDR),
        ));
    }
    let sweep: ColoredString = match sweep {
        Some(count) => format!("{count} addresses").color(colors::ACCENT),
        None => "skipped".color(colors::MISSING),
    };
    key_value_pair.push(("Sweep".to_string(), sweep));
    print::as_tree_one_level(key_value_pair);
}

pub fn kind_to_colored(kind: DeviceKind) -> ColoredString {
    let color = match kind {
        DeviceKind::GenerationTwo => colors::GENERATION_TWO,
        DeviceKind::GenerationThree => colors::GENERATION_THREE,
        DeviceKind::Unknown => colors::UNKNOWN_DEVICE,
    };
    kind.display_name().color(color)
}

pub fn device_details(device: &Device) -> Vec<Detail> {
    let mut details: Vec<Detail> = vec![
        ("Address".to_string(), device.address.to_string().color(colors::IPV4_ADDR)),
        ("Port".to_string(), device.port.to_string().normal()),
        ("Model".to_string(), kind_to_colored(device.kind)),
    ];
    if device.kind.is_supported() {
        details.push(("Storage".to_string(), device.kind.storage_root().normal()));
    }
    details
}

pub fn drive_details(drive: &Drive) -> Vec<Detail> {
    let first = drive.segments.first().map(|s| s.index()).unwrap_or(0);
    let last = drive.segments.last().map(|s| s.index()).unwrap_or(0);
    vec![
        (
            "Segments".to_string(),
            drive.segments.len().to_string().color(colors::ACCENT),
        ),
        ("Indices".to_string(), format!("{first}..={last}").normal()),
        (
            "Started".to_string(),
            drive.date.format("%Y-%m-%d %H:%M:%S").to_string().normal(),
        ),
    ]
}

pub fn file_selection(files: &[SegmentFile]) -> ColoredString {
    files
        .iter()
        .map(SegmentFile::file_name)
        .collect::<Vec<_>>()
        .join(", ")
        .normal()
}
