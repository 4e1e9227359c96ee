//! Copies a drive's segment files to the local disk.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::Context;
use dashlink_common::drive::{Drive, SegmentFile};
use tokio::fs;
use tokio::io::AsyncWriteExt;
use tokio::task::JoinSet;
use tracing::{debug, info, warn};

use crate::session::SessionManager;
use crate::storage::SegmentResolver;

/// Outcome of one export. Files are labelled `<segment>/<file name>`.
#[derive(Debug, Default)]
pub struct ExportReport {
    pub written: Vec<PathBuf>,
    /// Selected files the device never recorded.
    pub missing: Vec<String>,
    pub failed: Vec<(String, anyhow::Error)>,
}

impl ExportReport {
    pub fn is_complete(&self) -> bool {
        self.failed.is_empty()
    }
}

pub struct SegmentExporter {
    session: Arc<SessionManager>,
    files: Vec<SegmentFile>,
}

impl SegmentExporter {
    /// Exports every well-known file by default.
    pub fn new(session: Arc<SessionManager>) -> Self {
        Self {
            session,
            files: SegmentFile::ALL.to_vec(),
        }
    }

    pub fn with_files(mut self, files: impl IntoIterator<Item = SegmentFile>) -> Self {
        self.files = files.into_iter().collect();
        self.files.sort();
        self.files.dedup();
        self
    }

    /// The selected files, sorted.
    pub fn files(&self) -> &[SegmentFile] {
        &self.files
    }

    /// Downloads the selected files of every segment into `<dest>/<segment>/<file>`.
    ///
    /// Segments are listed one after another over the session; the downloads then run
    /// concurrently, each over its own transient channel. A failed download is recorded
    /// in the report and does not stop the others.
    pub async fn export_drive(&self, drive: &Drive, dest: &Path) -> anyhow::Result<ExportReport> {
        let mut report = ExportReport::default();
        let mut downloads = JoinSet::new();

        for segment_ref in &drive.segments {
            let segment = segment_ref
                .resolve(&self.session)
                .await
                .with_context(|| format!("failed to list segment {}", segment_ref.name))?;
            let folder = dest.join(segment_ref.name.to_string());

            for &kind in &self.files {
                let label = format!("{}/{kind}", segment_ref.name);
                let Some(entry) = segment.file(kind) else {
                    report.missing.push(label);
                    continue;
                };

                let session = self.session.clone();
                let remote = entry.path.clone();
                let local = folder.join(kind.file_name());
                downloads.spawn(async move {
                    let result = download(&session, &remote, &local).await;
                    (label, local, result)
                });
            }
        }

        while let Some(joined) = downloads.join_next().await {
            let (label, local, result) = joined.context("download task failed")?;
            match result {
                Ok(bytes) => {
                    debug!("Wrote {bytes} bytes to {}", local.display());
                    report.written.push(local);
                }
                Err(e) => {
                    warn!("Exporting {label} failed: {e:#}");
                    report.failed.push((label, e));
                }
            }
        }

        report.written.sort();
        report.failed.sort_by(|a, b| a.0.cmp(&b.0));
        info!(
            "Exported {} files of drive {} ({} missing, {} failed)",
            report.written.len(),
            drive.route_name(),
            report.missing.len(),
            report.failed.len()
        );
        Ok(report)
    }
}

async fn download(session: &SessionManager, remote: &str, local: &Path) -> anyhow::Result<u64> {
    let files = session.open_transient().await?;
    let mut reader = files
        .read_file(remote)
        .await
        .with_context(|| format!("failed to open {remote}"))?;

    if let Some(parent) = local.parent() {
        fs::create_dir_all(parent)
            .await
            .with_context(|| format!("failed to create {}", parent.display()))?;
    }
    let mut file = fs::File::create(local)
        .await
        .with_context(|| format!("failed to create {}", local.display()))?;

    let bytes = tokio::io::copy(&mut reader, &mut file).await?;
    file.flush().await?;
    Ok(bytes)
}

// ╔════════════════════════════════════════════╗
// ║ ████████╗███████╗███████╗████████╗███████╗ ║
// ║ ╚══██╔══╝██╔════╝██╔════╝╚══██╔══╝██╔════╝ ║
// ║    ██║   █████╗  ███████╗   ██║   ███████╗ ║
// ║    ██║   ██╔══╝  ╚════██║   ██║   ╚════██║ ║
// ║    ██║   ███████╗███████║   ██║   ███████║ ║
// ║    ╚═╝   ╚══════╝╚══════╝   ╚═╝   ╚══════╝ ║
// ╚════════════════════════════════════════════╝
