use dashlink_common::device::DeviceKind;
use dashlink_common::network::range::{IpCollection, Ipv4Range};
use dashlink_core::discovery::DiscoveryService;
use dashlink_core::mock::MockTransport;
use futures_util::StreamExt;
use std::net::Ipv4Addr;
use std::sync::Arc;
use std::time::Duration;

use crate::net::util::{ip, registry};

fn hotspot_subnet() -> IpCollection {
    let mut targets = IpCollection::new();
    targets.add_range(Ipv4Range::new(
        Ipv4Addr::new(192, 168, 43, 1),
        Ipv4Addr::new(192, 168, 43, 20),
    ));
    targets
}

fn fleet() -> MockTransport {
    MockTransport::new()
        .with_host(ip(192, 168, 43, 1), &["comma", "root"])
        .with_host(ip(192, 168, 43, 5), &["comma"])
        .with_host(ip(192, 168, 43, 7), &["pi"])
}

/// Every answering host is classified once and silent addresses are dropped.
#[tokio::test]
async fn classifies_a_mixed_subnet() {
    let mock = fleet();
    let registry = registry(&mock, 1);
    let service = DiscoveryService::new(Arc::new(registry.classifier()), registry.config());

    let mut devices = service.perform_discovery(hotspot_subnet()).await;
    devices.sort_by_key(|device| device.address);

    let found: Vec<_> = devices.iter().map(|d| (d.address, d.kind)).collect();
    assert_eq!(
        found,
        vec![
            (ip(192, 168, 43, 1), DeviceKind::GenerationTwo),
            (ip(192, 168, 43, 5), DeviceKind::GenerationThree),
            (ip(192, 168, 43, 7), DeviceKind::Unknown),
        ]
    );
    // Two logins each for the supported devices, one rejected login for the stranger.
    assert_eq!(mock.authentications(), 5);
    assert_eq!(registry.limiter().available(), 1);
}

#[tokio::test]
async fn streams_devices_as_they_are_found() {
    let mock = fleet();
    let registry = registry(&mock, 10);
    let service = DiscoveryService::new(Arc::new(registry.classifier()), registry.config());

    let stream = service.discover(hotspot_subnet()).into_stream();
    let names: Vec<String> = stream.map(|device| device.name).collect().await;

    assert_eq!(names.len(), 3);
    assert!(names.contains(&"comma two (192.168.43.1)".to_string()));
}

#[tokio::test]
async fn empty_network_finds_nothing() {
    let mock = MockTransport::new();
    let registry = registry(&mock, 2);
    let service = DiscoveryService::new(Arc::new(registry.classifier()), registry.config())
        .with_wait_timeout(Duration::from_millis(200));

    assert!(service.perform_discovery(hotspot_subnet()).await.is_empty());
    assert_eq!(mock.authentications(), 0);
}

/// Discovered devices hand over to sessions without reclassification.
#[tokio::test]
async fn discovered_devices_open_sessions() {
    let mock = fleet();
    let registry = registry(&mock, 2);
    let service = DiscoveryService::new(Arc::new(registry.classifier()), registry.config());

    let devices = service.perform_discovery(hotspot_subnet()).await;
    for device in devices.iter().filter(|d| d.kind.is_supported()) {
        let session = registry.session(device);
        session.connect().await.unwrap();
        assert!(session.is_connected());
    }

    let stranger = devices
        .iter()
        .find(|d| d.kind == DeviceKind::Unknown)
        .unwrap();
    assert!(registry.session(stranger).connect().await.is_err());
    assert_eq!(mock.file_transfer_opens(), 2);
}
