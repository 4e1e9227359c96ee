//! Error taxonomy shared by the transport seam and the session layer.
//!
//! Discovery never surfaces these: an unreachable or rejecting host is an answer,
//! not a failure. Session and data operations do, so callers can tell "no device"
//! apart from "device present but failing".

use std::fmt;
use std::net::{IpAddr, SocketAddr};

use thiserror::Error;

#[derive(Debug, Error)]
pub enum TransportError {
    /// Nothing answered within the timeout.
    #[error("{addr} did not answer")]
    Unreachable { addr: SocketAddr },
    /// The host answered but refused the offered key for this account.
    #[error("authentication rejected for user {username}")]
    AuthenticationRejected { username: String },
    #[error("remote path not found: {path}")]
    NotFound { path: String },
    #[error("remote side failed with status {status}: {stderr}")]
    Remote { status: i32, stderr: String },
    #[error(transparent)]
    LimiterClosed(#[from] LimiterClosed),
    #[error(transparent)]
    Io(#[from] std::io::Error),
}

impl TransportError {
    pub fn is_not_found(&self) -> bool {
        matches!(self, TransportError::NotFound { .. })
    }

    pub fn is_auth_rejected(&self) -> bool {
        matches!(self, TransportError::AuthenticationRejected { .. })
    }
}

/// Step of the session handshake that failed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HandshakeStage {
    FileTransfer,
    Commands,
}

impl fmt::Display for HandshakeStage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            HandshakeStage::FileTransfer => f.write_str("file transfer"),
            HandshakeStage::Commands => f.write_str("command"),
        }
    }
}

#[derive(Debug, Error, Clone, Copy, PartialEq, Eq)]
#[error("connection limiter is closed")]
pub struct LimiterClosed;

#[derive(Debug, Error)]
pub enum SessionError {
    #[error("{stage} handshake with {addr} failed")]
    HandshakeFailed {
        addr: IpAddr,
        stage: HandshakeStage,
        #[source]
        source: TransportError,
    },
    /// Unknown hosts have no account dashlink can log into.
    #[error("{0} is not a supported device")]
    Unsupported(IpAddr),
    #[error(transparent)]
    LimiterClosed(#[from] LimiterClosed),
    #[error(transparent)]
    Transport(#[from] TransportError),
}

impl SessionError {
    /// True when the operation failed only because the remote path is absent.
    pub fn is_not_found(&self) -> bool {
        matches!(self, SessionError::Transport(e) if e.is_not_found())
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
