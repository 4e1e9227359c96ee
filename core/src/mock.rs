//! In-memory [`Transport`] for tests.
//!
//! Hosts are registered with the accounts they accept; a single remote filesystem
//! and command table is shared by every host. Counters record how many handshakes
//! each channel type went through and the peak number of overlapping opens.

use std::collections::{BTreeMap, HashMap, HashSet};
use std::io::{self, Cursor};
use std::net::{IpAddr, SocketAddr};
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;

use async_trait::async_trait;
use dashlink_common::error::TransportError;
use dashlink_common::remote::{
    CommandChannel, CommandOutput, Credentials, FileTransfer, RemoteEntry, RemoteReader,
    Transport, join_path,
};
use tokio::sync::mpsc::UnboundedSender;

#[derive(Default)]
struct MockState {
    accounts: Mutex<HashMap<IpAddr, HashSet<String>>>,
    tree: Mutex<BTreeMap<String, Vec<RemoteEntry>>>,
    files: Mutex<HashMap<String, Vec<u8>>>,
    commands: Mutex<HashMap<String, CommandOutput>>,
    handshake_delay: Mutex<Duration>,
    refuse_commands: AtomicBool,
    authentications: AtomicUsize,
    file_transfer_opens: AtomicUsize,
    command_opens: AtomicUsize,
    in_flight: AtomicUsize,
    peak_in_flight: AtomicUsize,
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

#[derive(Clone, Default)]
pub struct MockTransport {
    state: Arc<MockState>,
}

impl MockTransport {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers a reachable host accepting the given accounts.
    pub fn with_host(self, addr: IpAddr, users: &[&str]) -> Self {
        lock(&self.state.accounts)
            .entry(addr)
            .or_default()
            .extend(users.iter().map(|user| user.to_string()));
        self
    }

    pub fn with_handshake_delay(self, delay: Duration) -> Self {
        *lock(&self.state.handshake_delay) = delay;
        self
    }

    pub fn with_command(self, command: &str, output: CommandOutput) -> Self {
        lock(&self.state.commands).insert(command.to_string(), output);
        self
    }

    /// Makes every command channel handshake fail until switched back.
    pub fn refuse_commands(&self, refuse: bool) {
        self.state.refuse_commands.store(refuse, Ordering::SeqCst);
    }

    /// Creates `path` and any missing parent directories.
    pub fn add_dir(&self, path: &str) {
        self.insert_entry(path, true);
    }

    /// Creates a file with `contents`, and any missing parent directories.
    pub fn add_file(&self, path: &str, contents: &[u8]) {
        self.insert_entry(path, false);
        lock(&self.state.files).insert(path.to_string(), contents.to_vec());
    }

    pub fn authentications(&self) -> usize {
        self.state.authentications.load(Ordering::SeqCst)
    }

    pub fn file_transfer_opens(&self) -> usize {
        self.state.file_transfer_opens.load(Ordering::SeqCst)
    }

    pub fn command_opens(&self) -> usize {
        self.state.command_opens.load(Ordering::SeqCst)
    }

    /// Largest number of channel handshakes that overlapped.
    pub fn peak_in_flight(&self) -> usize {
        self.state.peak_in_flight.load(Ordering::SeqCst)
    }

    fn insert_entry(&self, path: &str, is_dir: bool) {
        let path = path.trim_end_matches('/');
        let (parent, name) = match path.rsplit_once('/') {
            Some(("", name)) => ("/", name),
            Some((parent, name)) => (parent, name),
            None => ("/", path),
        };
        if parent != "/" {
            self.insert_entry(parent, true);
        }

        let mut tree = lock(&self.state.tree);
        tree.entry("/".to_string()).or_default();
        let siblings = tree.entry(parent.to_string()).or_default();
        if !siblings.iter().any(|entry| entry.name == name) {
            let entry = if is_dir {
                RemoteEntry::dir(parent, name)
            } else {
                RemoteEntry::file(parent, name)
            };
            siblings.push(entry);
        }
        if is_dir {
            tree.entry(path.to_string()).or_default();
        }
    }

    fn check_login(&self, credentials: &Credentials) -> Result<(), TransportError> {
        let accounts = lock(&self.state.accounts);
        let Some(users) = accounts.get(&credentials.addr.ip()) else {
            return Err(TransportError::Unreachable {
                addr: credentials.addr,
            });
        };
        if users.contains(&credentials.username) {
            Ok(())
        } else {
            Err(TransportError::AuthenticationRejected {
                username: credentials.username.clone(),
            })
        }
    }

    async fn handshake(&self) {
        let in_flight = self.state.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
        self.state.peak_in_flight.fetch_max(in_flight, Ordering::SeqCst);

        let delay = *lock(&self.state.handshake_delay);
        if !delay.is_zero() {
            tokio::time::sleep(delay).await;
        } else {
            tokio::task::yield_now().await;
        }

        self.state.in_flight.fetch_sub(1, Ordering::SeqCst);
    }
}

#[async_trait]
impl Transport for MockTransport {
    async fn probe(&self, addr: SocketAddr, _timeout: Duration) -> Result<(), TransportError> {
        if lock(&self.state.accounts).contains_key(&addr.ip()) {
            Ok(())
        } else {
            Err(TransportError::Unreachable { addr })
        }
    }

    async fn authenticate(&self, credentials: &Credentials) -> Result<(), TransportError> {
        self.state.authentications.fetch_add(1, Ordering::SeqCst);
        self.check_login(credentials)
    }

    async fn open_file_transfer(
        &self,
        credentials: &Credentials,
    ) -> Result<Box<dyn FileTransfer>, TransportError> {
        self.handshake().await;
        self.check_login(credentials)?;
        self.state.file_transfer_opens.fetch_add(1, Ordering::SeqCst);
        Ok(Box::new(MockFileTransfer {
            state: self.state.clone(),
            cwd: "/".to_string(),
        }))
    }

    async fn open_commands(
        &self,
        credentials: &Credentials,
    ) -> Result<Box<dyn CommandChannel>, TransportError> {
        self.handshake().await;
        self.check_login(credentials)?;
        if self.state.refuse_commands.load(Ordering::SeqCst) {
            return Err(TransportError::Io(io::Error::new(
                io::ErrorKind::ConnectionReset,
                "command channel refused",
            )));
        }
        self.state.command_opens.fetch_add(1, Ordering::SeqCst);
        Ok(Box::new(MockCommandChannel {
            state: self.state.clone(),
        }))
    }
}

struct MockFileTransfer {
    state: Arc<MockState>,
    cwd: String,
}

impl MockFileTransfer {
    fn resolve(&self, path: &str) -> String {
        if path.starts_with('/') {
            path.trim_end_matches('/').to_string()
        } else {
            join_path(&self.cwd, path)
        }
    }
}

#[async_trait]
impl FileTransfer for MockFileTransfer {
    async fn set_working_dir(&mut self, path: &str) -> Result<(), TransportError> {
        let path = self.resolve(path);
        if !lock(&self.state.tree).contains_key(&path) {
            return Err(TransportError::NotFound { path });
        }
        self.cwd = path;
        Ok(())
    }

    async fn list_dir(&self, path: &str) -> Result<Vec<RemoteEntry>, TransportError> {
        let path = self.resolve(path);
        let path = if path.is_empty() { "/".to_string() } else { path };
        lock(&self.state.tree)
            .get(&path)
            .cloned()
            .ok_or(TransportError::NotFound { path })
    }

    async fn read_file(&self, path: &str) -> Result<RemoteReader, TransportError> {
        let path = self.resolve(path);
        let contents = lock(&self.state.files)
            .get(&path)
            .cloned()
            .ok_or(TransportError::NotFound { path })?;
        Ok(Box::new(Cursor::new(contents)))
    }
}

struct MockCommandChannel {
    state: Arc<MockState>,
}

impl MockCommandChannel {
    fn output(&self, command: &str) -> CommandOutput {
        lock(&self.state.commands)
            .get(command)
            .cloned()
            .unwrap_or_else(|| CommandOutput {
                exit_status: 127,
                stdout: String::new(),
                stderr: format!("{command}: not found"),
            })
    }
}

#[async_trait]
impl CommandChannel for MockCommandChannel {
    async fn execute(&self, command: &str) -> Result<CommandOutput, TransportError> {
        Ok(self.output(command))
    }

    async fn execute_streaming(
        &self,
        command: &str,
        lines: UnboundedSender<String>,
    ) -> Result<i32, TransportError> {
        let output = self.output(command);
        for line in output.stdout.lines() {
            if lines.send(line.to_string()).is_err() {
                break;
            }
        }
        Ok(output.exit_status)
    }
}
