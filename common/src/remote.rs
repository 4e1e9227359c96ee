//! The remote transport seam.
//!
//! dashlink does not speak the secure transport itself. It talks to devices through
//! these traits: one [`Transport`] per process that knows how to reach hosts, plus the
//! two channels a session is made of, a [`FileTransfer`] channel and a
//! [`CommandChannel`].

use std::net::SocketAddr;
use std::path::PathBuf;
use std::time::Duration;

use async_trait::async_trait;
use tokio::io::AsyncRead;
use tokio::net::TcpStream;
use tokio::sync::mpsc::UnboundedSender;

use crate::error::TransportError;

/// One entry of a remote directory listing.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct RemoteEntry {
    pub name: String,
    pub is_dir: bool,
    /// Absolute remote path of the entry.
    pub path: String,
}

impl RemoteEntry {
    pub fn file(parent: &str, name: &str) -> Self {
        Self {
            name: name.to_string(),
            is_dir: false,
            path: join_path(parent, name),
        }
    }

    pub fn dir(parent: &str, name: &str) -> Self {
        Self {
            is_dir: true,
            ..Self::file(parent, name)
        }
    }
}

/// Joins remote path segments with `/`, whatever the local platform uses.
pub fn join_path(parent: &str, name: &str) -> String {
    let parent = parent.trim_end_matches('/');
    let name = name.trim_start_matches('/');
    format!("{parent}/{name}")
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CommandOutput {
    pub exit_status: i32,
    pub stdout: String,
    pub stderr: String,
}

impl CommandOutput {
    pub fn success(&self) -> bool {
        self.exit_status == 0
    }
}

/// Everything needed to log into one account on one host.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Credentials {
    pub addr: SocketAddr,
    pub username: String,
    pub key_path: PathBuf,
}

pub type RemoteReader = Box<dyn AsyncRead + Send + Unpin>;

#[async_trait]
pub trait FileTransfer: Send + Sync {
    /// Moves the channel's working directory; relative paths resolve against it.
    async fn set_working_dir(&mut self, path: &str) -> Result<(), TransportError>;

    /// Lists one directory, without `.` and `..`.
    async fn list_dir(&self, path: &str) -> Result<Vec<RemoteEntry>, TransportError>;

    async fn read_file(&self, path: &str) -> Result<RemoteReader, TransportError>;
}

#[async_trait]
pub trait CommandChannel: Send + Sync {
    async fn execute(&self, command: &str) -> Result<CommandOutput, TransportError>;

    /// Runs `command`, sending every stdout line as it arrives. Returns the exit status.
    async fn execute_streaming(
        &self,
        command: &str,
        lines: UnboundedSender<String>,
    ) -> Result<i32, TransportError>;
}

#[async_trait]
pub trait Transport: Send + Sync {
    /// Raw TCP connect bounded by `timeout`.
    ///
    /// Both a timeout and a refused connection count as unreachable.
    async fn probe(&self, addr: SocketAddr, timeout: Duration) -> Result<(), TransportError> {
        match tokio::time::timeout(timeout, TcpStream::connect(addr)).await {
            Ok(Ok(_stream)) => Ok(()),
            Ok(Err(_)) | Err(_) => Err(TransportError::Unreachable { addr }),
        }
    }

    async fn authenticate(&self, credentials: &Credentials) -> Result<(), TransportError>;

    async fn open_file_transfer(
        &self,
        credentials: &Credentials,
    ) -> Result<Box<dyn FileTransfer>, TransportError>;

    async fn open_commands(
        &self,
        credentials: &Credentials,
    ) -> Result<Box<dyn CommandChannel>, TransportError>;
}

// ╔════════════════════════════════════════════╗
// ║ ████████╗███████╗███████╗████████╗███████╗ ║
// ║ ╚══██╔══╝██╔════╝██╔════╝╚══██╔══╝██╔════╝ ║
// ║    ██║   █████╗  ███████╗   ██║   ███████╗ ║
// ║    ██║   ██╔══╝  ╚════██║   ██║   ╚════██║ ║
// ║    ██║   ███████╗███████║   ██║   ███████║ ║
// ║    ╚═╝   ╚══════╝╚══════╝   ╚═╝   ╚══════╝ ║
// ╚════════════════════════════════════════════╝
