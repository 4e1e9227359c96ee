//! [`Transport`] over the system OpenSSH client.
//!
//! Every channel operation is one `ssh` invocation in batch mode, so a "channel" here
//! is just a verified login plus the credentials to repeat it. Listings use `ls -1Ap`
//! and reads stream `cat` output.
//!
//! Each invocation is a full handshake with the device. The logins made while opening
//! a channel run under the slot the caller already holds; every later invocation takes
//! a slot of its own from the shared [`ConnectionLimiter`] and keeps it until the remote
//! process has exited.

use std::ffi::OsString;
use std::future::Future;
use std::io;
use std::pin::Pin;
use std::process::{ExitStatus, Output, Stdio};
use std::task::{Context, Poll, ready};
use std::time::Duration;

use async_trait::async_trait;
use dashlink_common::error::TransportError;
use dashlink_common::remote::{
    CommandChannel, CommandOutput, Credentials, FileTransfer, RemoteEntry, RemoteReader,
    Transport, join_path,
};
use tokio::io::{AsyncBufReadExt, AsyncRead, AsyncReadExt, BufReader, ReadBuf};
use tokio::process::{Child, ChildStdout, Command};
use tokio::sync::mpsc::UnboundedSender;
use tracing::{debug, trace};

use crate::limiter::{ConcurrencySlot, ConnectionLimiter};

/// Exit status `ssh` reserves for its own failures.
const SSH_FAILURE: i32 = 255;

const UNREACHABLE_MARKERS: [&str; 5] = [
    "Connection refused",
    "Connection timed out",
    "No route to host",
    "Network is unreachable",
    "Could not resolve",
];

#[derive(Debug, Clone)]
pub struct OpenSshTransport {
    program: OsString,
    connect_timeout: Duration,
    limiter: ConnectionLimiter,
}

impl OpenSshTransport {
    /// `limiter` must be the one sessions and the classifier share.
    pub fn new(connect_timeout: Duration, limiter: ConnectionLimiter) -> Self {
        Self {
            program: OsString::from("ssh"),
            connect_timeout,
            limiter,
        }
    }

    /// Uses another client binary, e.g. a full path when `ssh` is not on `PATH`.
    pub fn with_program(mut self, program: impl Into<OsString>) -> Self {
        self.program = program.into();
        self
    }

    fn command(&self, credentials: &Credentials, remote: &str) -> Command {
        let timeout = self.connect_timeout.as_secs().max(1);
        let mut cmd = Command::new(&self.program);
        cmd.arg("-i")
            .arg(&credentials.key_path)
            .arg("-p")
            .arg(credentials.addr.port().to_string())
            .args([
                "-o",
                "BatchMode=yes",
                "-o",
                "StrictHostKeyChecking=no",
                "-o",
                "UserKnownHostsFile=/dev/null",
                "-o",
                "LogLevel=ERROR",
            ])
            .arg("-o")
            .arg(format!("ConnectTimeout={timeout}"))
            .arg(format!("{}@{}", credentials.username, credentials.addr.ip()))
            .arg(remote)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true);
        cmd
    }

    /// Runs under the caller's slot.
    async fn run(&self, credentials: &Credentials, remote: &str) -> Result<CommandOutput, TransportError> {
        trace!("{}@{}: {remote}", credentials.username, credentials.addr);
        let output = self.command(credentials, remote).output().await?;
        check_login(credentials, into_command_output(output))
    }

    /// Takes a slot for the whole invocation.
    async fn run_throttled(
        &self,
        credentials: &Credentials,
        remote: &str,
    ) -> Result<CommandOutput, TransportError> {
        let _slot = self.limiter.acquire().await?;
        self.run(credentials, remote).await
    }

    /// Logs in and runs nothing; proves the account accepts the key.
    async fn verify_login(&self, credentials: &Credentials) -> Result<(), TransportError> {
        let output = self.run(credentials, "true").await?;
        if output.success() {
            Ok(())
        } else {
            Err(TransportError::Remote {
                status: output.exit_status,
                stderr: output.stderr,
            })
        }
    }
}

#[async_trait]
impl Transport for OpenSshTransport {
    async fn authenticate(&self, credentials: &Credentials) -> Result<(), TransportError> {
        self.verify_login(credentials).await
    }

    async fn open_file_transfer(
        &self,
        credentials: &Credentials,
    ) -> Result<Box<dyn FileTransfer>, TransportError> {
        self.verify_login(credentials).await?;
        Ok(Box::new(SshFileTransfer {
            ssh: self.clone(),
            credentials: credentials.clone(),
            cwd: None,
        }))
    }

    async fn open_commands(
        &self,
        credentials: &Credentials,
    ) -> Result<Box<dyn CommandChannel>, TransportError> {
        self.verify_login(credentials).await?;
        Ok(Box::new(SshCommandChannel {
            ssh: self.clone(),
            credentials: credentials.clone(),
        }))
    }
}

struct SshFileTransfer {
    ssh: OpenSshTransport,
    credentials: Credentials,
    /// Unset means the login directory.
    cwd: Option<String>,
}

impl SshFileTransfer {
    fn resolve(&self, path: &str) -> String {
        match &self.cwd {
            Some(cwd) if !path.starts_with('/') => join_path(cwd, path),
            _ => path.to_string(),
        }
    }

    /// `test` exits 1 when the path is absent or of the other kind.
    async fn test(&self, flag: &str, path: &str) -> Result<(), TransportError> {
        let output = self
            .ssh
            .run_throttled(&self.credentials, &format!("test {flag} {}", quote(path)))
            .await?;
        match output.exit_status {
            0 => Ok(()),
            1 => Err(TransportError::NotFound {
                path: path.to_string(),
            }),
            status => Err(TransportError::Remote {
                status,
                stderr: output.stderr,
            }),
        }
    }
}

#[async_trait]
impl FileTransfer for SshFileTransfer {
    async fn set_working_dir(&mut self, path: &str) -> Result<(), TransportError> {
        let path = self.resolve(path);
        self.test("-d", &path).await?;
        self.cwd = Some(path);
        Ok(())
    }

    async fn list_dir(&self, path: &str) -> Result<Vec<RemoteEntry>, TransportError> {
        let path = self.resolve(path);
        // Exit codes and messages of `ls` differ between builds and locales.
        self.test("-d", &path).await?;

        let output = self
            .ssh
            .run_throttled(&self.credentials, &format!("ls -1Ap -- {}", quote(&path)))
            .await?;
        if output.success() {
            Ok(parse_listing(&path, &output.stdout))
        } else {
            Err(TransportError::Remote {
                status: output.exit_status,
                stderr: output.stderr,
            })
        }
    }

    async fn read_file(&self, path: &str) -> Result<RemoteReader, TransportError> {
        let path = self.resolve(path);
        self.test("-f", &path).await?;

        let slot = self.ssh.limiter.acquire().await?;
        let mut child = self
            .ssh
            .command(&self.credentials, &format!("cat -- {}", quote(&path)))
            .stderr(Stdio::null())
            .spawn()?;
        let stdout = child
            .stdout
            .take()
            .ok_or_else(|| io::Error::other("ssh stdout was not captured"))?;
        debug!("Streaming {path} from {}", self.credentials.addr);
        Ok(Box::new(RemoteFileReader {
            path,
            stdout,
            exit: Exit::Running(child),
            _slot: slot,
        }))
    }
}

type WaitFuture = Pin<Box<dyn Future<Output = io::Result<ExitStatus>> + Send>>;

enum Exit {
    Running(Child),
    Waiting(WaitFuture),
    Done,
}

/// Output of a remote `cat`. End of file is only reported once the process has
/// exited successfully; any other exit turns into a read error, so a dropped
/// connection never looks like a short file.
struct RemoteFileReader {
    path: String,
    stdout: ChildStdout,
    exit: Exit,
    _slot: ConcurrencySlot,
}

impl AsyncRead for RemoteFileReader {
    fn poll_read(
        self: Pin<&mut Self>,
        cx: &mut Context<'_>,
        buf: &mut ReadBuf<'_>,
    ) -> Poll<io::Result<()>> {
        let this = self.get_mut();
        if buf.remaining() == 0 {
            return Poll::Ready(Ok(()));
        }
        loop {
            match this.exit {
                Exit::Done => return Poll::Ready(Ok(())),
                Exit::Running(_) => {
                    let filled = buf.filled().len();
                    ready!(Pin::new(&mut this.stdout).poll_read(cx, buf))?;
                    if buf.filled().len() > filled {
                        return Poll::Ready(Ok(()));
                    }
                    if let Exit::Running(mut child) = std::mem::replace(&mut this.exit, Exit::Done) {
                        this.exit = Exit::Waiting(Box::pin(async move { child.wait().await }));
                    }
                }
                Exit::Waiting(ref mut wait) => {
                    let status = ready!(wait.as_mut().poll(cx));
                    this.exit = Exit::Done;
                    let status = status?;
                    if !status.success() {
                        return Poll::Ready(Err(io::Error::other(format!(
                            "reading {} stopped early ({status})",
                            this.path
                        ))));
                    }
                }
            }
        }
    }
}

struct SshCommandChannel {
    ssh: OpenSshTransport,
    credentials: Credentials,
}

#[async_trait]
impl CommandChannel for SshCommandChannel {
    async fn execute(&self, command: &str) -> Result<CommandOutput, TransportError> {
        self.ssh.run_throttled(&self.credentials, command).await
    }

    async fn execute_streaming(
        &self,
        command: &str,
        lines: UnboundedSender<String>,
    ) -> Result<i32, TransportError> {
        let _slot = self.ssh.limiter.acquire().await?;
        let mut child = self.ssh.command(&self.credentials, command).spawn()?;
        let stdout = child
            .stdout
            .take()
            .ok_or_else(|| io::Error::other("ssh stdout was not captured"))?;
        let mut stderr = child
            .stderr
            .take()
            .ok_or_else(|| io::Error::other("ssh stderr was not captured"))?;

        let forward = async {
            let mut reader = BufReader::new(stdout).lines();
            while let Some(line) = reader.next_line().await? {
                // Keep draining after the receiver is gone so the remote side can exit.
                let _ = lines.send(line);
            }
            Ok::<_, io::Error>(())
        };
        let collect_stderr = async {
            let mut buf = String::new();
            stderr.read_to_string(&mut buf).await.map(|_| buf)
        };
        let (forwarded, stderr) = tokio::join!(forward, collect_stderr);
        forwarded?;

        let status = child.wait().await?.code().unwrap_or(-1);
        let output = CommandOutput {
            exit_status: status,
            stdout: String::new(),
            stderr: stderr?,
        };
        check_login(&self.credentials, output).map(|output| output.exit_status)
    }
}

fn into_command_output(output: Output) -> CommandOutput {
    CommandOutput {
        // Killed by a signal.
        exit_status: output.status.code().unwrap_or(-1),
        stdout: String::from_utf8_lossy(&output.stdout).into_owned(),
        stderr: String::from_utf8_lossy(&output.stderr).into_owned(),
    }
}

/// Separates the client's own failures from the remote command's exit status.
fn check_login(credentials: &Credentials, output: CommandOutput) -> Result<CommandOutput, TransportError> {
    if output.exit_status != SSH_FAILURE {
        return Ok(output);
    }
    if output.stderr.contains("Permission denied") {
        return Err(TransportError::AuthenticationRejected {
            username: credentials.username.clone(),
        });
    }
    if UNREACHABLE_MARKERS
        .iter()
        .any(|marker| output.stderr.contains(marker))
    {
        return Err(TransportError::Unreachable {
            addr: credentials.addr,
        });
    }
    Err(TransportError::Remote {
        status: SSH_FAILURE,
        stderr: output.stderr,
    })
}

/// Single-quotes `arg` for the remote POSIX shell.
fn quote(arg: &str) -> String {
    format!("'{}'", arg.replace('\'', r"'\''"))
}

/// Parses `ls -1Ap` output, where directories carry a trailing `/`.
fn parse_listing(parent: &str, stdout: &str) -> Vec<RemoteEntry> {
    stdout
        .lines()
        .filter(|line| !line.is_empty())
        .map(|line| match line.strip_suffix('/') {
            Some(name) => RemoteEntry::dir(parent, name),
            None => RemoteEntry::file(parent, line),
        })
        .collect()
}

// ╔════════════════════════════════════════════╗
// ║ ████████╗███████╗███████╗████████╗███████╗ ║
// ║ ╚══██╔══╝██╔════╝██╔════╝╚══██╔══╝██╔════╝ ║
// ║    ██║   █████╗  ███████╗   ██║   ███████╗ ║
// ║    ██║   ██╔══╝  ╚════██║   ██║   ╚════██║ ║
// ║    ██║   ███████╗███████║   ██║   ███████║ ║
// ║    ╚═╝   ╚══════╝╚══════╝   ╚═╝   ╚══════╝ ║
// ╚════════════════════════════════════════════╝
