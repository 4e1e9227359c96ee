pub mod discover;
pub mod drives;
pub mod exec;
pub mod export;
pub mod interfaces;

use std::net::IpAddr;
use std::path::PathBuf;
use std::time::Duration;

use clap::{ArgAction, Parser, Subcommand};
use dashlink_common::config::{
    Config, DEFAULT_MAX_CONNECTIONS, DEFAULT_PROBE_TIMEOUT, DEFAULT_SSH_PORT,
    DEFAULT_WAIT_TIMEOUT, default_key_path,
};
use dashlink_common::drive::SegmentFile;

#[derive(Parser)]
#[command(name = "dashlink")]
#[command(about = "Find comma dashcams on the local network and pull their drives.")]
pub struct CommandLine {
    #[command(subcommand)]
    pub command: Commands,

    /// SSH port the devices listen on
    #[arg(short, long, global = true, default_value_t = DEFAULT_SSH_PORT)]
    pub port: u16,

    /// Private key offered to devices [default: assets/id_rsa next to the binary]
    #[arg(short, long, global = true)]
    pub key: Option<PathBuf>,

    /// Connect timeout of a single probe
    #[arg(long, global = true, default_value_t = DEFAULT_PROBE_TIMEOUT.as_millis() as u64)]
    pub probe_timeout_ms: u64,

    /// How long discovery waits for the next answer before giving up
    #[arg(long, global = true, default_value_t = DEFAULT_WAIT_TIMEOUT.as_millis() as u64)]
    pub wait_timeout_ms: u64,

    /// Simultaneous connection handshakes allowed
    #[arg(short = 'c', long, global = true, default_value_t = DEFAULT_MAX_CONNECTIONS)]
    pub max_connections: usize,

    /// Less output; -qq prints results only
    #[arg(short, long, global = true, action = ArgAction::Count)]
    pub quiet: u8,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Show local interfaces and the networks discovery would sweep
    #[command(alias = "i")]
    Interfaces,
    /// Find devices on every local network
    #[command(alias = "d")]
    Discover,
    /// List the drives recorded on a device
    #[command(alias = "r")]
    Drives { address: IpAddr },
    /// Download the segment files of one drive
    #[command(alias = "x")]
    Export {
        address: IpAddr,
        /// Drive name, as printed by `drives`
        drive: String,
        /// Directory the segment folders are written to
        #[arg(short, long, default_value = ".")]
        dest: PathBuf,
        /// Files to fetch, comma separated (e.g. qlog,fcamera) [default: all]
        #[arg(short, long, value_delimiter = ',')]
        files: Vec<SegmentFile>,
    },
    /// Run a shell command on a device
    #[command(alias = "e")]
    Exec {
        address: IpAddr,
        #[arg(required = true, trailing_var_arg = true, allow_hyphen_values = true)]
        command: Vec<String>,
    },
}

impl CommandLine {
    pub fn parse_args() -> Self {
        Self::parse()
    }

    pub fn to_config(&self) -> Config {
        Config {
            port: self.port,
            probe_timeout: Duration::from_millis(self.probe_timeout_ms),
            wait_timeout: Duration::from_millis(self.wait_timeout_ms),
            max_connections: self.max_connections,
            key_path: self.key.clone().unwrap_or_else(default_key_path),
            quiet: self.quiet,
            ..Config::default()
        }
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
