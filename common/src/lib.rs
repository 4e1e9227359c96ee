//! Shared models and seams for dashlink.
//!
//! Everything the core and the CLI agree on lives here: the device and drive models,
//! the error taxonomy, the remote transport traits and the local address-space
//! enumeration that feeds discovery.

pub mod config;
pub mod device;
pub mod drive;
pub mod error;
pub mod network;
pub mod remote;
