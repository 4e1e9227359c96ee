//! Discovery, sessions and drive reconstruction for dashcam devices on the local network.
//!
//! The pieces fit together like this: [`discovery::DiscoveryService`] runs one
//! [`classifier::DeviceClassifier`] probe per candidate address and yields devices as
//! they are found; [`session::SessionRegistry`] hands out one
//! [`session::SessionManager`] per device, all throttled by a shared
//! [`limiter::ConnectionLimiter`]; [`storage`] rebuilds drives from a session's
//! listing and [`export`] copies their files home.

pub mod classifier;
pub mod discovery;
pub mod export;
pub mod limiter;
pub mod session;
pub mod ssh;
pub mod storage;

#[cfg(any(test, feature = "testing"))]
pub mod mock;
