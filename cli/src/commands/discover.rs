use std::sync::Arc;
use std::time::{Duration, Instant};

use colored::*;
use dashlink_common::config::Config;
use dashlink_common::device::Device;
use dashlink_common::network::interface;
use dashlink_common::network::range::IpCollection;
use dashlink_core::discovery::DiscoveryService;
use dashlink_core::session::SessionRegistry;
use tracing::{Instrument, info, info_span, warn};

use crate::dprint;
use crate::terminal::{colors, network_fmt, print, spinner};

pub async fn discover(registry: &SessionRegistry) -> anyhow::Result<()> {
    let cfg = registry.config();
    let targets: IpCollection = interface::local_scan_targets();
    info!(
        "Probing {} addresses on port {}",
        targets.len(),
        cfg.port
    );

    let span = info_span!("discovery");
    let start_time: Instant = Instant::now();
    let mut devices: Vec<Device> = run_discovery(registry, targets).instrument(span).await;

    discovery_ends(&mut devices, start_time.elapsed(), cfg);
    Ok(())
}

async fn run_discovery(registry: &SessionRegistry, targets: IpCollection) -> Vec<Device> {
    let service = DiscoveryService::new(Arc::new(registry.classifier()), registry.config());
    let mut discovery = service.discover(targets);
    let mut devices: Vec<Device> = Vec::new();

    spinner::report_discovery_progress(0, discovery.outstanding());
    while let Some(device) = discovery.next().await {
        info!("Found {device}");
        devices.push(device);
        spinner::report_discovery_progress(devices.len(), discovery.outstanding());
    }

    if discovery.outstanding() > 0 {
        warn!(
            "Stopped waiting after {:.1}s of silence, {} probes cancelled",
            registry.config().wait_timeout.as_secs_f64(),
            discovery.outstanding()
        );
    }
    devices
}

fn discovery_ends(devices: &mut [Device], total_time: Duration, cfg: &Config) {
    if devices.is_empty() {
        print::header("zero devices detected", cfg.quiet);
        print::no_results(cfg.quiet);
        return;
    }

    if cfg.quiet > 0 {
        dprint!();
    }

    print::header("device discovery", cfg.quiet);
    devices.sort_by_key(|device| device.address);
    print_devices(devices, cfg);
    print_summary(devices.len(), total_time, cfg);
}

fn print_devices(devices: &[Device], cfg: &Config) {
    for (idx, device) in devices.iter().enumerate() {
        match cfg.quiet {
            2 => print::print(&device.address.to_string()),
            _ => {
                print::tree_head(idx, &device.name);
                print::as_tree_one_level(network_fmt::device_details(device));
            }
        }
        if cfg.quiet < 2 && idx + 1 != devices.len() {
            dprint!();
        }
    }
}

fn print_summary(devices_len: usize, total_time: Duration, cfg: &Config) {
    let found: ColoredString = format!("{devices_len} devices").bold().green();
    let total_time: ColoredString = format!("{:.2}s", total_time.as_secs_f64()).bold().yellow();
    let output: ColoredString =
        format!("Discovery Complete: {found} identified in {total_time}").color(colors::TEXT_DEFAULT);

    match cfg.quiet {
        0 => {
            print::fat_separator();
            print::centerln(&output.to_string());
        }
        1 => {
            dprint!();
            print::print_status(output.to_string());
        }
        _ => {}
    }
}
