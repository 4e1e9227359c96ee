//! # Drive Model
//!
//! Devices record into one folder per segment, named `yyyy-mm-dd--hh-mm-ss--<index>`.
//! Every segment of one drive carries the drive's start time, so a drive is the set
//! of folders sharing a timestamp. Two drives started within the same second are
//! indistinguishable and end up as one.

use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;
use std::sync::LazyLock;

use chrono::NaiveDateTime;
use regex::Regex;
use tracing::debug;

use crate::remote::RemoteEntry;

/// `chrono` format of the timestamp part of a segment folder name.
pub const DATE_FORMAT: &str = "%Y-%m-%d--%H-%M-%S";

static SEGMENT_NAME: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^(\d{4}-\d{2}-\d{2}--\d{2}-\d{2}-\d{2})--(\d+)$")
        .expect("segment name pattern is valid")
});

/// Parsed segment folder name. Orders by date, then index.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct SegmentName {
    pub date: NaiveDateTime,
    pub index: u32,
}

impl SegmentName {
    pub fn parse(name: &str) -> Option<Self> {
        let caps = SEGMENT_NAME.captures(name)?;
        let date = NaiveDateTime::parse_from_str(&caps[1], DATE_FORMAT).ok()?;
        let index = match caps[2].parse() {
            Ok(index) => index,
            Err(e) => {
                debug!("Skipping {name}: segment index {e}");
                return None;
            }
        };
        Some(Self { date, index })
    }

    /// Name shared by every segment of the drive, `yyyy-mm-dd--hh-mm-ss`.
    pub fn route_name(&self) -> String {
        self.date.format(DATE_FORMAT).to_string()
    }
}

impl fmt::Display for SegmentName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}--{}", self.route_name(), self.index)
    }
}

/// The six files a segment folder may hold.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum SegmentFile {
    FrontCamera,
    DriverCamera,
    WideCamera,
    QuickLog,
    RawLog,
    FrontCameraPreview,
}

impl SegmentFile {
    pub const ALL: [SegmentFile; 6] = [
        SegmentFile::FrontCamera,
        SegmentFile::DriverCamera,
        SegmentFile::WideCamera,
        SegmentFile::QuickLog,
        SegmentFile::RawLog,
        SegmentFile::FrontCameraPreview,
    ];

    pub fn file_name(&self) -> &'static str {
        match self {
            SegmentFile::FrontCamera => "fcamera.hevc",
            SegmentFile::DriverCamera => "dcamera.hevc",
            SegmentFile::WideCamera => "ecamera.hevc",
            SegmentFile::QuickLog => "qlog.bz2",
            SegmentFile::RawLog => "rlog.bz2",
            SegmentFile::FrontCameraPreview => "qcamera.ts",
        }
    }

    /// Case-insensitive match against the well-known file names.
    pub fn from_file_name(name: &str) -> Option<Self> {
        Self::ALL
            .into_iter()
            .find(|file| file.file_name().eq_ignore_ascii_case(name))
    }
}

impl FromStr for SegmentFile {
    type Err = String;

    /// Accepts the file name (`fcamera.hevc`) or its stem (`fcamera`).
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::from_file_name(s)
            .or_else(|| {
                Self::ALL.into_iter().find(|file| {
                    file.file_name()
                        .split('.')
                        .next()
                        .is_some_and(|stem| stem.eq_ignore_ascii_case(s))
                })
            })
            .ok_or_else(|| format!("unknown segment file: {s}"))
    }
}

impl fmt::Display for SegmentFile {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.file_name())
    }
}

/// A segment folder that has been listed.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Segment {
    pub index: u32,
    files: BTreeMap<SegmentFile, RemoteEntry>,
}

impl Segment {
    pub fn new(index: u32) -> Self {
        Self {
            index,
            files: BTreeMap::new(),
        }
    }

    /// Keeps the well-known files out of a folder listing and ignores the rest.
    pub fn from_entries(index: u32, entries: impl IntoIterator<Item = RemoteEntry>) -> Self {
        let files = entries
            .into_iter()
            .filter(|entry| !entry.is_dir)
            .filter_map(|entry| SegmentFile::from_file_name(&entry.name).map(|kind| (kind, entry)))
            .collect();
        Self { index, files }
    }

    pub fn file(&self, kind: SegmentFile) -> Option<&RemoteEntry> {
        self.files.get(&kind)
    }

    pub fn files(&self) -> impl Iterator<Item = (SegmentFile, &RemoteEntry)> {
        self.files.iter().map(|(kind, entry)| (*kind, entry))
    }

    pub fn is_empty(&self) -> bool {
        self.files.is_empty()
    }

    pub fn front_camera(&self) -> Option<&RemoteEntry> {
        self.file(SegmentFile::FrontCamera)
    }

    pub fn driver_camera(&self) -> Option<&RemoteEntry> {
        self.file(SegmentFile::DriverCamera)
    }

    pub fn wide_camera(&self) -> Option<&RemoteEntry> {
        self.file(SegmentFile::WideCamera)
    }

    pub fn quick_log(&self) -> Option<&RemoteEntry> {
        self.file(SegmentFile::QuickLog)
    }

    pub fn raw_log(&self) -> Option<&RemoteEntry> {
        self.file(SegmentFile::RawLog)
    }

    pub fn front_camera_preview(&self) -> Option<&RemoteEntry> {
        self.file(SegmentFile::FrontCameraPreview)
    }
}

/// A segment folder that has not been listed yet.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SegmentRef {
    pub name: SegmentName,
    pub path: String,
}

impl SegmentRef {
    pub fn index(&self) -> u32 {
        self.name.index
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Drive {
    pub date: NaiveDateTime,
    /// Sorted by index.
    pub segments: Vec<SegmentRef>,
}

impl Drive {
    pub fn route_name(&self) -> String {
        self.date.format(DATE_FORMAT).to_string()
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

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{NaiveDate, Timelike};

    #[test]
    fn parses_segment_folder_names() {
        let name = SegmentName::parse("2024-01-01--10-00-05--12").unwrap();
        let expected = NaiveDate::from_ymd_opt(2024, 1, 1)
            .unwrap()
            .and_hms_opt(10, 0, 5)
            .unwrap();
        assert_eq!(name.date, expected);
        assert_eq!(name.date.second(), 5);
        assert_eq!(name.index, 12);
        assert_eq!(name.to_string(), "2024-01-01--10-00-05--12");
        assert_eq!(name.route_name(), "2024-01-01--10-00-05");
    }

    #[test]
    fn rejects_foreign_names() {
        for name in [
            "boot",
            "crash",
            "2024-01-01--10-00-05",
            "2024-01-01 10:00:05--1",
            "2024-01-01--10-00-05---1",
            "x2024-01-01--10-00-05--1",
            "2024-13-01--10-00-05--1",
            "2024-01-01--10-00-05--4294967296",
        ] {
            assert_eq!(SegmentName::parse(name), None, "{name} should not parse");
        }
    }

    #[test]
    fn largest_index_still_parses() {
        let name = SegmentName::parse("2024-01-01--10-00-05--4294967295").unwrap();
        assert_eq!(name.index, u32::MAX);
    }

    #[test]
    fn orders_by_date_then_index() {
        let a = SegmentName::parse("2024-01-01--10-00-00--2").unwrap();
        let b = SegmentName::parse("2024-01-01--10-00-00--10").unwrap();
        let c = SegmentName::parse("2024-01-01--09-59-59--30").unwrap();
        let mut names = vec![a, b, c];
        names.sort();
        assert_eq!(names, vec![c, a, b]);
    }

    #[test]
    fn segment_file_names_match_case_insensitively() {
        assert_eq!(SegmentFile::from_file_name("FCAMERA.HEVC"), Some(SegmentFile::FrontCamera));
        assert_eq!(SegmentFile::from_file_name("qcamera.ts"), Some(SegmentFile::FrontCameraPreview));
        assert_eq!(SegmentFile::from_file_name("qlog"), None);
        assert_eq!("qlog".parse::<SegmentFile>(), Ok(SegmentFile::QuickLog));
        assert_eq!("Ecamera".parse::<SegmentFile>(), Ok(SegmentFile::WideCamera));
        assert!("thumbnail".parse::<SegmentFile>().is_err());
    }

    #[test]
    fn segment_with_only_front_camera() {
        let dir = "/data/media/0/realdata/2024-01-01--10-00-00--0";
        let segment = Segment::from_entries(0, vec![RemoteEntry::file(dir, "fcamera.hevc")]);

        assert!(segment.front_camera().is_some());
        assert!(segment.driver_camera().is_none());
        assert!(segment.wide_camera().is_none());
        assert!(segment.quick_log().is_none());
        assert!(segment.raw_log().is_none());
        assert!(segment.front_camera_preview().is_none());
    }

    #[test]
    fn segment_ignores_directories_and_unknown_files() {
        let dir = "/seg";
        let segment = Segment::from_entries(
            3,
            vec![
                RemoteEntry::dir(dir, "rlog.bz2"),
                RemoteEntry::file(dir, "notes.txt"),
                RemoteEntry::file(dir, "QLOG.BZ2"),
            ],
        );
        assert_eq!(segment.files().count(), 1);
        assert_eq!(segment.quick_log().unwrap().path, "/seg/QLOG.BZ2");
        assert!(segment.raw_log().is_none());
    }
}
