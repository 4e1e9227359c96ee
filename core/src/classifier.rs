//! Probes a single address and tells what answered.
//!
//! The hardware generations are told apart by how they treat two logins with the
//! bundled key. Both accept the regular account; only the older generation also
//! accepts the administrative one. A host rejecting the regular account is
//! reachable but not a device we know.

use std::net::{IpAddr, SocketAddr};
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use dashlink_common::config::Config;
use dashlink_common::device::{DeviceKind, ProbeResult};
use dashlink_common::error::TransportError;
use dashlink_common::remote::{Credentials, Transport};
use tracing::{debug, warn};

use crate::discovery::Probe;
use crate::limiter::ConnectionLimiter;

pub struct DeviceClassifier {
    transport: Arc<dyn Transport>,
    limiter: ConnectionLimiter,
    port: u16,
    timeout: Duration,
    key_path: PathBuf,
    user: String,
    admin_user: String,
}

impl DeviceClassifier {
    pub fn new(transport: Arc<dyn Transport>, limiter: ConnectionLimiter, cfg: &Config) -> Self {
        Self {
            transport,
            limiter,
            port: cfg.port,
            timeout: cfg.probe_timeout,
            key_path: cfg.key_path.clone(),
            user: cfg.user.clone(),
            admin_user: cfg.admin_user.clone(),
        }
    }

    /// Never fails: anything that goes wrong means nothing usable was found.
    pub async fn classify(&self, address: IpAddr) -> ProbeResult {
        match self.try_classify(address).await {
            Ok(result) => result,
            Err(e) => {
                warn!("Probe of {address} failed: {e:#}");
                ProbeResult::NoDevice
            }
        }
    }

    async fn try_classify(&self, address: IpAddr) -> anyhow::Result<ProbeResult> {
        let addr = SocketAddr::new(address, self.port);

        if let Err(e) = self.transport.probe(addr, self.timeout).await {
            debug!("No answer from {addr}: {e}");
            return Ok(ProbeResult::NoDevice);
        }

        match self.login(addr, &self.user).await {
            Ok(()) => {}
            Err(e) if is_auth_rejected(&e) => {
                debug!("{addr} rejected {}, not a known device", self.user);
                return Ok(ProbeResult::UnknownDevice(address));
            }
            Err(e) => return Err(e),
        }

        let kind = match self.login(addr, &self.admin_user).await {
            Ok(()) => DeviceKind::GenerationTwo,
            Err(e) => {
                debug!("{addr} refused {}: {e:#}", self.admin_user);
                DeviceKind::GenerationThree
            }
        };
        debug!("{addr} is a {}", kind.display_name());
        Ok(ProbeResult::ClassifiedDevice(address, kind))
    }

    async fn login(&self, addr: SocketAddr, username: &str) -> anyhow::Result<()> {
        let credentials = Credentials {
            addr,
            username: username.to_string(),
            key_path: self.key_path.clone(),
        };
        let _slot = self.limiter.acquire().await?;
        self.transport.authenticate(&credentials).await?;
        Ok(())
    }
}

fn is_auth_rejected(e: &anyhow::Error) -> bool {
    e.downcast_ref::<TransportError>()
        .is_some_and(TransportError::is_auth_rejected)
}

#[async_trait]
impl Probe for DeviceClassifier {
    async fn probe(&self, address: IpAddr) -> ProbeResult {
        self.classify(address).await
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
    use crate::mock::MockTransport;
    use dashlink_common::remote::{CommandChannel, FileTransfer};
    use std::net::Ipv4Addr;

    fn ip(last: u8) -> IpAddr {
        IpAddr::V4(Ipv4Addr::new(192, 168, 0, last))
    }

    fn classifier(transport: impl Transport + 'static) -> DeviceClassifier {
        DeviceClassifier::new(Arc::new(transport), ConnectionLimiter::new(2), &Config::default())
    }

    #[tokio::test]
    async fn silent_address_is_no_device() {
        let classifier = classifier(MockTransport::new());
        assert_eq!(classifier.classify(ip(9)).await, ProbeResult::NoDevice);
    }

    #[tokio::test]
    async fn rejected_login_is_unknown_device() {
        let classifier = classifier(MockTransport::new().with_host(ip(2), &[]));
        assert_eq!(classifier.classify(ip(2)).await, ProbeResult::UnknownDevice(ip(2)));
    }

    #[tokio::test]
    async fn admin_login_means_generation_two() {
        let classifier = classifier(MockTransport::new().with_host(ip(3), &["comma", "root"]));
        assert_eq!(
            classifier.classify(ip(3)).await,
            ProbeResult::ClassifiedDevice(ip(3), DeviceKind::GenerationTwo)
        );
    }

    #[tokio::test]
    async fn refused_admin_login_means_generation_three() {
        let mock = MockTransport::new().with_host(ip(4), &["comma"]);
        let classifier = classifier(mock.clone());
        assert_eq!(
            classifier.classify(ip(4)).await,
            ProbeResult::ClassifiedDevice(ip(4), DeviceKind::GenerationThree)
        );
        assert_eq!(mock.authentications(), 2);
    }

    struct BrokenAuth;

    #[async_trait]
    impl Transport for BrokenAuth {
        async fn probe(&self, _: SocketAddr, _: Duration) -> Result<(), TransportError> {
            Ok(())
        }

        async fn authenticate(&self, _: &Credentials) -> Result<(), TransportError> {
            Err(TransportError::Io(std::io::Error::other("kex failed")))
        }

        async fn open_file_transfer(
            &self,
            _: &Credentials,
        ) -> Result<Box<dyn FileTransfer>, TransportError> {
            unreachable!("classification never opens channels")
        }

        async fn open_commands(
            &self,
            _: &Credentials,
        ) -> Result<Box<dyn CommandChannel>, TransportError> {
            unreachable!("classification never opens channels")
        }
    }

    #[tokio::test]
    async fn transport_fault_during_first_login_is_no_device() {
        let classifier = classifier(BrokenAuth);
        assert_eq!(classifier.classify(ip(5)).await, ProbeResult::NoDevice);
    }

    #[tokio::test]
    async fn closed_limiter_is_no_device() {
        let limiter = ConnectionLimiter::new(1);
        limiter.close();
        let mock = MockTransport::new().with_host(ip(6), &["comma"]);
        let classifier = DeviceClassifier::new(Arc::new(mock), limiter, &Config::default());
        assert_eq!(classifier.classify(ip(6)).await, ProbeResult::NoDevice);
    }
}
