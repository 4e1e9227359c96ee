use colored::*;
use dashlink_common::config::Config;
use dashlink_common::network::interface::{NetworkInterfaceExtension, scan_range, scan_targets};
use pnet::datalink::{self, NetworkInterface};

use crate::dprint;
use crate::terminal::{network_fmt, print};

pub fn interfaces(cfg: &Config) -> anyhow::Result<()> {
    let interfaces: Vec<NetworkInterface> = datalink::interfaces();
    let candidates: Vec<&NetworkInterface> = interfaces
        .iter()
        .filter(|intf| intf.is_scan_candidate())
        .collect();

    for (idx, intf) in candidates.iter().enumerate() {
        network_fmt::print_interface(intf, idx, sweep_size(intf));
        if idx + 1 != candidates.len() {
            dprint!();
        }
    }

    let targets = scan_targets(&interfaces);
    if cfg.quiet < 2 {
        print::fat_separator();
    }
    print::centerln(&format!(
        "Discovery would probe {} addresses on port {}",
        targets.len().to_string().green().bold(),
        cfg.port.to_string().yellow()
    ));
    Ok(())
}

/// Addresses the interface's IPv4 networks contribute, `None` when all are skipped.
fn sweep_size(intf: &NetworkInterface) -> Option<u32> {
    intf.get_ipv4_nets()
        .iter()
        .filter(|net| !net.ip().is_loopback() && !net.ip().is_link_local())
        .filter_map(scan_range)
        .map(|range| range.address_count)
        .reduce(|a, b| a + b)
}
