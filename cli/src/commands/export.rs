use std::net::IpAddr;
use std::path::Path;

use anyhow::Context;
use colored::*;
use dashlink_common::drive::SegmentFile;
use dashlink_core::export::SegmentExporter;
use dashlink_core::session::SessionRegistry;
use dashlink_core::storage;
use tracing::{Instrument, error, info_span};

use crate::terminal::{colors, network_fmt, print};

pub async fn export(
    registry: &SessionRegistry,
    address: IpAddr,
    route_name: &str,
    dest: &Path,
    files: &[SegmentFile],
) -> anyhow::Result<()> {
    let quiet = registry.config().quiet;
    let session = registry
        .open(address)
        .await
        .with_context(|| format!("no supported device at {address}"))?;

    let drive = storage::find_drive(&session, route_name)
        .await?
        .with_context(|| format!("{} has no drive named {route_name}", session.device()))?;

    let exporter = if files.is_empty() {
        SegmentExporter::new(session.clone())
    } else {
        SegmentExporter::new(session.clone()).with_files(files.iter().copied())
    };

    print::header(&format!("exporting {route_name}"), quiet);
    if quiet == 0 {
        print::tree_head(0, &drive.route_name());
        print::as_tree_one_level(vec![
            ("Segments".to_string(), drive.segments.len().to_string().color(colors::ACCENT)),
            ("Files".to_string(), network_fmt::file_selection(exporter.files())),
            ("Into".to_string(), dest.display().to_string().normal()),
        ]);
    }

    let report = exporter
        .export_drive(&drive, dest)
        .instrument(info_span!("export"))
        .await?;

    for (label, err) in &report.failed {
        error!("{label}: {err:#}");
    }
    if quiet < 2 {
        print::fat_separator();
        let written: ColoredString = format!("{} files", report.written.len()).bold().green();
        let missing: ColoredString = format!("{} not recorded", report.missing.len()).color(colors::MISSING);
        print::centerln(&format!("Wrote {written}, {missing}"));
    } else {
        for path in &report.written {
            print::print(&path.display().to_string());
        }
    }

    anyhow::ensure!(
        report.is_complete(),
        "{} of the selected files could not be exported",
        report.failed.len()
    );
    Ok(())
}
