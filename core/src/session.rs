//! Per-device connection lifecycle.
//!
//! A session is a file-transfer channel plus a command channel to one device, opened
//! lazily by the first operation that needs it and then reused. Connecting is
//! serialized per device, so racing callers share a single handshake, and throttled
//! process-wide through the [`ConnectionLimiter`]. The slot is held for the handshake
//! only, not for the life of the session.
//!
//! Connecting is all-or-nothing: if the command channel cannot be opened the
//! file-transfer channel is dropped too, and the next call starts over.

use std::collections::{HashMap, VecDeque};
use std::net::IpAddr;
use std::sync::atomic::{AtomicU8, Ordering};
use std::sync::{Arc, Mutex, PoisonError, RwLock};

use dashlink_common::config::Config;
use dashlink_common::device::Device;
use dashlink_common::error::{HandshakeStage, SessionError, TransportError};
use dashlink_common::remote::{
    CommandChannel, CommandOutput, Credentials, FileTransfer, RemoteEntry, RemoteReader,
    Transport,
};
use futures_util::Stream;
use futures_util::stream;
use tokio::sync::mpsc::UnboundedSender;
use tracing::{debug, info, warn};

use crate::classifier::DeviceClassifier;
use crate::limiter::ConnectionLimiter;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum SessionState {
    Disconnected = 0,
    Connecting = 1,
    Connected = 2,
}

impl SessionState {
    fn from_u8(value: u8) -> Self {
        match value {
            1 => SessionState::Connecting,
            2 => SessionState::Connected,
            _ => SessionState::Disconnected,
        }
    }
}

#[derive(Clone)]
struct Channels {
    files: Arc<dyn FileTransfer>,
    commands: Arc<dyn CommandChannel>,
}

pub struct SessionManager {
    device: Device,
    credentials: Option<Credentials>,
    transport: Arc<dyn Transport>,
    limiter: ConnectionLimiter,
    state: AtomicU8,
    channels: RwLock<Option<Channels>>,
    handshake: tokio::sync::Mutex<()>,
}

impl SessionManager {
    pub fn new(
        device: Device,
        transport: Arc<dyn Transport>,
        limiter: ConnectionLimiter,
        cfg: &Config,
    ) -> Self {
        let credentials = device.kind.login_user(cfg).map(|username| Credentials {
            addr: device.socket_addr(),
            username: username.to_string(),
            key_path: cfg.key_path.clone(),
        });
        Self {
            device,
            credentials,
            transport,
            limiter,
            state: AtomicU8::new(SessionState::Disconnected as u8),
            channels: RwLock::new(None),
            handshake: tokio::sync::Mutex::new(()),
        }
    }

    pub fn device(&self) -> &Device {
        &self.device
    }

    pub fn state(&self) -> SessionState {
        SessionState::from_u8(self.state.load(Ordering::Acquire))
    }

    pub fn is_connected(&self) -> bool {
        self.state() == SessionState::Connected
    }

    pub fn storage_root(&self) -> &'static str {
        self.device.kind.storage_root()
    }

    /// Idempotent; concurrent callers wait for one shared handshake.
    pub async fn connect(&self) -> Result<(), SessionError> {
        self.channels().await.map(|_| ())
    }

    /// Drops both channels. The next operation reconnects.
    pub async fn disconnect(&self) {
        let _guard = self.handshake.lock().await;
        let previous = self.write_channels().take();
        self.set_state(SessionState::Disconnected);
        if previous.is_some() {
            info!("Disconnected from {}", self.device);
        }
    }

    pub async fn list_dir(&self, path: &str) -> Result<Vec<RemoteEntry>, SessionError> {
        let channels = self.channels().await?;
        Ok(channels.files.list_dir(path).await?)
    }

    /// Every entry below `root`, breadth first.
    ///
    /// Traversal keeps an explicit queue of directories still to list, so depth
    /// costs memory, not stack. Each call walks afresh.
    pub fn walk(&self, root: &str) -> impl Stream<Item = Result<RemoteEntry, SessionError>> + '_ {
        let pending_dirs = VecDeque::from([root.to_string()]);
        let listed: VecDeque<RemoteEntry> = VecDeque::new();

        stream::unfold((pending_dirs, listed), move |(mut dirs, mut listed)| async move {
            loop {
                if let Some(entry) = listed.pop_front() {
                    if entry.is_dir {
                        dirs.push_back(entry.path.clone());
                    }
                    return Some((Ok(entry), (dirs, listed)));
                }
                let dir = dirs.pop_front()?;
                match self.list_dir(&dir).await {
                    Ok(entries) => listed.extend(entries),
                    Err(e) => return Some((Err(e), (dirs, listed))),
                }
            }
        })
    }

    pub async fn read_file(&self, path: &str) -> Result<RemoteReader, SessionError> {
        let channels = self.channels().await?;
        Ok(channels.files.read_file(path).await?)
    }

    pub async fn execute(&self, command: &str) -> Result<CommandOutput, SessionError> {
        let channels = self.channels().await?;
        Ok(channels.commands.execute(command).await?)
    }

    /// Runs `command` and forwards its stdout line by line. Returns the exit status.
    pub async fn execute_streaming(
        &self,
        command: &str,
        lines: UnboundedSender<String>,
    ) -> Result<i32, SessionError> {
        let channels = self.channels().await?;
        Ok(channels.commands.execute_streaming(command, lines).await?)
    }

    /// Opens a throwaway file-transfer channel next to the session's own.
    ///
    /// Used for parallel downloads. Takes a limiter slot for its handshake like any
    /// other connection.
    pub async fn open_transient(&self) -> Result<Box<dyn FileTransfer>, SessionError> {
        let credentials = self.credentials()?;
        let files = {
            let _slot = self.limiter.acquire().await?;
            self.transport
                .open_file_transfer(credentials)
                .await
                .map_err(|source| self.handshake_failed(HandshakeStage::FileTransfer, source))?
        };
        self.enter_storage_root(files).await
    }

    async fn channels(&self) -> Result<Channels, SessionError> {
        if let Some(channels) = self.current() {
            return Ok(channels);
        }

        let _guard = self.handshake.lock().await;
        if let Some(channels) = self.current() {
            return Ok(channels);
        }

        self.set_state(SessionState::Connecting);
        match self.open_channels().await {
            Ok(channels) => {
                *self.write_channels() = Some(channels.clone());
                self.set_state(SessionState::Connected);
                info!("Connected to {}", self.device);
                Ok(channels)
            }
            Err(e) => {
                self.set_state(SessionState::Disconnected);
                warn!("Connecting to {} failed: {e}", self.device);
                Err(e)
            }
        }
    }

    /// Both handshakes run under one slot. Anything after them may need slots of
    /// its own, so the slot is gone by then.
    async fn open_channels(&self) -> Result<Channels, SessionError> {
        let credentials = self.credentials()?;
        let (files, commands) = {
            let _slot = self.limiter.acquire().await?;
            let files = self
                .transport
                .open_file_transfer(credentials)
                .await
                .map_err(|source| self.handshake_failed(HandshakeStage::FileTransfer, source))?;
            let commands = self
                .transport
                .open_commands(credentials)
                .await
                .map_err(|source| self.handshake_failed(HandshakeStage::Commands, source))?;
            (files, commands)
        };

        let files = self.enter_storage_root(files).await?;
        Ok(Channels {
            files: Arc::from(files),
            commands: Arc::from(commands),
        })
    }

    async fn enter_storage_root(
        &self,
        mut files: Box<dyn FileTransfer>,
    ) -> Result<Box<dyn FileTransfer>, SessionError> {
        // A device that never recorded has no storage root yet; listings report it.
        match files.set_working_dir(self.storage_root()).await {
            Ok(()) => {}
            Err(e) if e.is_not_found() => debug!("{} has no {}", self.device, self.storage_root()),
            Err(e) => return Err(self.handshake_failed(HandshakeStage::FileTransfer, e)),
        }
        Ok(files)
    }

    fn handshake_failed(&self, stage: HandshakeStage, source: TransportError) -> SessionError {
        SessionError::HandshakeFailed {
            addr: self.device.address,
            stage,
            source,
        }
    }

    fn credentials(&self) -> Result<&Credentials, SessionError> {
        self.credentials
            .as_ref()
            .ok_or(SessionError::Unsupported(self.device.address))
    }

    fn current(&self) -> Option<Channels> {
        if !self.is_connected() {
            return None;
        }
        self.channels
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    fn write_channels(&self) -> std::sync::RwLockWriteGuard<'_, Option<Channels>> {
        self.channels.write().unwrap_or_else(PoisonError::into_inner)
    }

    fn set_state(&self, state: SessionState) {
        self.state.store(state as u8, Ordering::Release);
    }
}

/// Hands out one session per device address, all sharing one transport and limiter.
pub struct SessionRegistry {
    transport: Arc<dyn Transport>,
    limiter: ConnectionLimiter,
    config: Config,
    sessions: Mutex<HashMap<IpAddr, Arc<SessionManager>>>,
}

impl SessionRegistry {
    pub fn new(transport: Arc<dyn Transport>, limiter: ConnectionLimiter, config: Config) -> Self {
        Self {
            transport,
            limiter,
            config,
            sessions: Mutex::new(HashMap::new()),
        }
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    pub fn limiter(&self) -> &ConnectionLimiter {
        &self.limiter
    }

    pub fn classifier(&self) -> DeviceClassifier {
        DeviceClassifier::new(self.transport.clone(), self.limiter.clone(), &self.config)
    }

    /// The device's session, created on first request and reused afterwards.
    ///
    /// A device seen again with another kind gets a fresh session, since the kind
    /// decides which account to log into. Holders of the old one keep it.
    pub fn session(&self, device: &Device) -> Arc<SessionManager> {
        let mut sessions = self.sessions.lock().unwrap_or_else(PoisonError::into_inner);
        let reusable = sessions
            .get(&device.address)
            .filter(|session| session.device().kind == device.kind)
            .cloned();
        if let Some(session) = reusable {
            return session;
        }

        let session = Arc::new(SessionManager::new(
            device.clone(),
            self.transport.clone(),
            self.limiter.clone(),
            &self.config,
        ));
        if let Some(stale) = sessions.insert(device.address, session.clone()) {
            debug!("{} is now a {}, replacing its session", stale.device(), device.kind.display_name());
        }
        session
    }

    /// Classifies a single address and returns its session when it is a supported device.
    pub async fn open(&self, address: IpAddr) -> Result<Arc<SessionManager>, SessionError> {
        let device = self
            .classifier()
            .classify(address)
            .await
            .into_device(self.config.port)
            .filter(|device| device.kind.is_supported())
            .ok_or(SessionError::Unsupported(address))?;
        Ok(self.session(&device))
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
