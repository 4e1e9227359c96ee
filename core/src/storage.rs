//! Rebuilds drives and segments from a device's storage listing.
//!
//! Listings are never cached; every call goes back to the device.

use std::iter::Peekable;
use std::vec;

use async_trait::async_trait;
use dashlink_common::drive::{Drive, Segment, SegmentName, SegmentRef};
use dashlink_common::error::SessionError;
use dashlink_common::remote::RemoteEntry;
use tracing::debug;

use crate::session::SessionManager;

/// Drives in chronological order, grouped from a sorted run of segment folders.
#[derive(Debug)]
pub struct Drives {
    segments: Peekable<vec::IntoIter<SegmentRef>>,
}

impl Drives {
    /// Keeps directories named like segments; everything else in the listing is ignored.
    pub fn from_entries(entries: impl IntoIterator<Item = RemoteEntry>) -> Self {
        let mut segments: Vec<SegmentRef> = entries
            .into_iter()
            .filter(|entry| entry.is_dir)
            .filter_map(|entry| {
                SegmentName::parse(&entry.name).map(|name| SegmentRef {
                    name,
                    path: entry.path,
                })
            })
            .collect();
        segments.sort_by_key(|segment| segment.name);

        Self {
            segments: segments.into_iter().peekable(),
        }
    }

    pub fn empty() -> Self {
        Self::from_entries(Vec::new())
    }
}

impl Iterator for Drives {
    type Item = Drive;

    fn next(&mut self) -> Option<Drive> {
        let first = self.segments.next()?;
        let date = first.name.date;

        let mut segments = vec![first];
        while let Some(segment) = self.segments.next_if(|next| next.name.date == date) {
            segments.push(segment);
        }
        Some(Drive { date, segments })
    }
}

/// Lists the device's recorded drives.
///
/// A device without a storage root has recorded nothing and yields no drives.
pub async fn list_drives(session: &SessionManager) -> Result<Drives, SessionError> {
    let root = session.storage_root();
    match session.list_dir(root).await {
        Ok(entries) => Ok(Drives::from_entries(entries)),
        Err(e) if e.is_not_found() => {
            debug!("{} has no recordings under {root}", session.device());
            Ok(Drives::empty())
        }
        Err(e) => Err(e),
    }
}

/// Looks a drive up by its `yyyy-mm-dd--hh-mm-ss` name.
pub async fn find_drive(
    session: &SessionManager,
    route_name: &str,
) -> Result<Option<Drive>, SessionError> {
    let mut drives = list_drives(session).await?;
    Ok(drives.find(|drive| drive.route_name() == route_name))
}

#[async_trait]
pub trait SegmentResolver {
    /// Lists the segment folder and picks out its well-known files.
    async fn resolve(&self, session: &SessionManager) -> Result<Segment, SessionError>;
}

#[async_trait]
impl SegmentResolver for SegmentRef {
    async fn resolve(&self, session: &SessionManager) -> Result<Segment, SessionError> {
        match session.list_dir(&self.path).await {
            Ok(entries) => Ok(Segment::from_entries(self.index(), entries)),
            Err(e) if e.is_not_found() => {
                debug!("Segment {} vanished", self.name);
                Ok(Segment::new(self.index()))
            }
            Err(e) => Err(e),
        }
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
