//! # Network Discovery Service
//!
//! Probes every candidate address at once and yields devices as probes finish.
//!
//! Waiting is bounded per round, not per scan: each wait for the next finished
//! probe gets [`Config::wait_timeout`], and every finished probe starts a fresh
//! round. When a round expires with nothing finishing, discovery ends and the probes
//! still running are cancelled. Devices found until then are kept.
//!
//! Results arrive in completion order, which differs from run to run.

use std::net::IpAddr;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use dashlink_common::config::Config;
use dashlink_common::device::{Device, ProbeResult};
use dashlink_common::network::range::IpCollection;
use futures_util::Stream;
use futures_util::stream;
use tokio::task::JoinSet;
use tracing::{debug, info, warn};

/// One classification attempt against one address.
#[async_trait]
pub trait Probe: Send + Sync {
    async fn probe(&self, address: IpAddr) -> ProbeResult;
}

pub struct DiscoveryService {
    prober: Arc<dyn Probe>,
    port: u16,
    wait_timeout: Duration,
}

impl DiscoveryService {
    pub fn new(prober: Arc<dyn Probe>, cfg: &Config) -> Self {
        Self {
            prober,
            port: cfg.port,
            wait_timeout: cfg.wait_timeout,
        }
    }

    pub fn with_wait_timeout(mut self, wait_timeout: Duration) -> Self {
        self.wait_timeout = wait_timeout;
        self
    }

    /// Starts one probe per address. Must be called within a Tokio runtime.
    pub fn discover(&self, targets: IpCollection) -> Discovery {
        let mut tasks = JoinSet::new();
        for address in targets {
            let prober = self.prober.clone();
            tasks.spawn(async move { prober.probe(address).await });
        }
        info!("Probing {} candidate addresses", tasks.len());

        Discovery {
            tasks,
            port: self.port,
            wait_timeout: self.wait_timeout,
            finished: false,
        }
    }

    /// Runs a whole discovery and returns everything found.
    pub async fn perform_discovery(&self, targets: IpCollection) -> Vec<Device> {
        self.discover(targets).collect().await
    }
}

/// A running discovery. Dropping it cancels the probes still in flight.
pub struct Discovery {
    tasks: JoinSet<ProbeResult>,
    port: u16,
    wait_timeout: Duration,
    finished: bool,
}

impl Discovery {
    /// Next device found, or `None` once every probe finished or a round timed out.
    pub async fn next(&mut self) -> Option<Device> {
        while !self.finished {
            match tokio::time::timeout(self.wait_timeout, self.tasks.join_next()).await {
                Ok(Some(Ok(result))) => {
                    if let Some(device) = result.into_device(self.port) {
                        return Some(device);
                    }
                }
                Ok(Some(Err(e))) => {
                    warn!("Probe task failed: {e}");
                }
                Ok(None) => {
                    debug!("Every probe finished");
                    self.finished = true;
                }
                Err(_elapsed) => {
                    info!(
                        "No probe finished within {:?}, abandoning {} outstanding",
                        self.wait_timeout,
                        self.tasks.len()
                    );
                    self.tasks.abort_all();
                    self.finished = true;
                }
            }
        }
        None
    }

    /// Probes still running.
    pub fn outstanding(&self) -> usize {
        self.tasks.len()
    }

    pub async fn collect(mut self) -> Vec<Device> {
        let mut devices = Vec::new();
        while let Some(device) = self.next().await {
            devices.push(device);
        }
        devices
    }

    pub fn into_stream(self) -> impl Stream<Item = Device> {
        stream::unfold(self, |mut discovery| async move {
            let device = discovery.next().await?;
            Some((device, discovery))
        })
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
