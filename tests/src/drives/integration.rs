use dashlink_common::config::STORAGE_ROOT;
use dashlink_common::device::{Device, DeviceKind};
use dashlink_common::drive::SegmentFile;
use dashlink_core::export::SegmentExporter;
use dashlink_core::mock::MockTransport;
use dashlink_core::session::SessionState;
use dashlink_core::storage::{self, SegmentResolver};
use std::sync::Arc;
use std::time::Duration;
use tokio::task::JoinSet;

use crate::net::util::{ip, registry};

fn recorded_device() -> MockTransport {
    let mock = MockTransport::new().with_host(ip(192, 168, 43, 1), &["comma"]);
    for (segment, files) in [
        ("2024-06-01--07-45-10--0", &["fcamera.hevc", "qlog.bz2", "rlog.bz2"][..]),
        ("2024-06-01--07-45-10--1", &["fcamera.hevc", "qlog.bz2"][..]),
        ("2024-06-01--07-45-10--2", &["QLOG.BZ2"][..]),
        ("2024-06-02--18-00-00--0", &["qcamera.ts"][..]),
    ] {
        for file in files {
            let path = format!("{STORAGE_ROOT}/{segment}/{file}");
            mock.add_file(&path, path.as_bytes());
        }
    }
    mock.add_dir(&format!("{STORAGE_ROOT}/boot"));
    mock
}

fn comma_three() -> Device {
    Device::new(ip(192, 168, 43, 1), 8022, DeviceKind::GenerationThree)
}

#[tokio::test]
async fn reconstructs_drives_and_segments() {
    let mock = recorded_device();
    let registry = registry(&mock, 1);
    let session = registry.session(&comma_three());

    let drives: Vec<_> = storage::list_drives(&session).await.unwrap().collect();
    let names: Vec<String> = drives.iter().map(|d| d.route_name()).collect();
    assert_eq!(names, vec!["2024-06-01--07-45-10", "2024-06-02--18-00-00"]);

    let morning = &drives[0];
    assert_eq!(morning.segments.len(), 3);

    let last = morning.segments[2].resolve(&session).await.unwrap();
    assert_eq!(last.index, 2);
    assert!(last.quick_log().is_some(), "file names match case-insensitively");
    assert!(last.front_camera().is_none());

    let evening = drives[1].segments[0].resolve(&session).await.unwrap();
    assert!(evening.front_camera_preview().is_some());
    assert_eq!(evening.files().count(), 1);
}

#[tokio::test(start_paused = true)]
async fn concurrent_listings_share_one_session() {
    let mock = recorded_device().with_handshake_delay(Duration::from_millis(300));
    let registry = registry(&mock, 1);

    let mut listings = JoinSet::new();
    for _ in 0..8 {
        let session = registry.session(&comma_three());
        listings.spawn(async move { storage::list_drives(&session).await.map(Iterator::count) });
    }
    while let Some(listed) = listings.join_next().await {
        assert_eq!(listed.unwrap().unwrap(), 2);
    }

    assert_eq!(mock.file_transfer_opens(), 1);
    assert_eq!(mock.command_opens(), 1);
    assert_eq!(
        registry.session(&comma_three()).state(),
        SessionState::Connected
    );
}

#[tokio::test]
async fn exports_a_drive_through_the_shared_limiter() {
    let mock = recorded_device();
    let registry = registry(&mock, 1);
    let session = registry.session(&comma_three());
    let dest = tempfile::tempdir().unwrap();

    let drive = storage::find_drive(&session, "2024-06-01--07-45-10")
        .await
        .unwrap()
        .unwrap();
    let report = SegmentExporter::new(Arc::clone(&session))
        .with_files([SegmentFile::QuickLog])
        .export_drive(&drive, dest.path())
        .await
        .unwrap();

    assert_eq!(report.written.len(), 3);
    assert!(report.missing.is_empty());
    assert!(report.is_complete());

    let copied = std::fs::read(dest.path().join("2024-06-01--07-45-10--1").join("qlog.bz2")).unwrap();
    assert_eq!(copied, format!("{STORAGE_ROOT}/2024-06-01--07-45-10--1/qlog.bz2").into_bytes());

    assert!(mock.peak_in_flight() <= 1);
    assert_eq!(registry.limiter().available(), 1);
}
