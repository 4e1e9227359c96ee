use std::net::IpAddr;

use anyhow::Context;
use colored::*;
use dashlink_core::session::SessionRegistry;
use dashlink_core::storage;

use crate::dprint;
use crate::terminal::{network_fmt, print};

pub async fn drives(registry: &SessionRegistry, address: IpAddr) -> anyhow::Result<()> {
    let quiet = registry.config().quiet;
    let session = registry
        .open(address)
        .await
        .with_context(|| format!("no supported device at {address}"))?;

    print::header(&format!("drives on {}", session.device()), quiet);
    let drives: Vec<_> = storage::list_drives(&session)
        .await
        .with_context(|| format!("failed to list drives on {}", session.device()))?
        .collect();

    if drives.is_empty() {
        print::print_status("No drives recorded");
        return Ok(());
    }

    for (idx, drive) in drives.iter().enumerate() {
        match quiet {
            2 => print::print(&drive.route_name()),
            _ => {
                print::tree_head(idx, &drive.route_name());
                print::as_tree_one_level(network_fmt::drive_details(drive));
            }
        }
        if quiet < 2 && idx + 1 != drives.len() {
            dprint!();
        }
    }

    if quiet == 0 {
        print::fat_separator();
        let count: ColoredString = format!("{} drives", drives.len()).bold().green();
        print::centerln(&format!("{count} on {}", session.device().address));
    }
    Ok(())
}
