use std::net::Ipv4Addr;
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Port the devices' SSH daemon listens on.
pub const DEFAULT_SSH_PORT: u16 = 8022;

/// Address a device takes when it is the hotspot the host is tethered to.
pub const TETHERING_ADDR: Ipv4Addr = Ipv4Addr::new(192, 168, 43, 1);

/// Networks with more usable addresses than this are not swept.
pub const MAX_SCAN_ADDRESSES: u32 = 1024;

pub const DEFAULT_PROBE_TIMEOUT: Duration = Duration::from_millis(5_000);
pub const DEFAULT_WAIT_TIMEOUT: Duration = Duration::from_millis(10_000);
pub const DEFAULT_MAX_CONNECTIONS: usize = 10;

/// Where recorded drives live on the device.
pub const STORAGE_ROOT: &str = "/data/media/0/realdata";

#[derive(Debug, Clone)]
pub struct Config {
    /// Port probed and logged into on every candidate address.
    pub port: u16,
    /// Bound on the raw connect of a single probe.
    pub probe_timeout: Duration,
    /// How long discovery waits for the *next* probe to finish.
    ///
    /// Every finished probe restarts the clock.
    pub wait_timeout: Duration,
    /// Process-wide cap on simultaneous connect handshakes.
    pub max_connections: usize,
    /// Private key offered for both logins.
    pub key_path: PathBuf,
    /// Low-privilege account every supported device accepts.
    pub user: String,
    /// Administrative account only older hardware accepts.
    pub admin_user: String,
    /// 0 prints everything, 1 hides decoration, 2 prints results only.
    pub quiet: u8,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            port: DEFAULT_SSH_PORT,
            probe_timeout: DEFAULT_PROBE_TIMEOUT,
            wait_timeout: DEFAULT_WAIT_TIMEOUT,
            max_connections: DEFAULT_MAX_CONNECTIONS,
            key_path: default_key_path(),
            user: String::from("comma"),
            admin_user: String::from("root"),
            quiet: 0,
        }
    }
}

/// The bundled key ships in `assets/` next to the executable.
pub fn default_key_path() -> PathBuf {
    let base: PathBuf = std::env::current_exe()
        .ok()
        .and_then(|exe| exe.parent().map(Path::to_path_buf))
        .unwrap_or_default();
    base.join("assets").join("id_rsa")
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

    #[test]
    fn default_config_matches_device_defaults() {
        let cfg = Config::default();
        assert_eq!(cfg.port, 8022);
        assert_eq!(cfg.probe_timeout, Duration::from_secs(5));
        assert_eq!(cfg.wait_timeout, Duration::from_secs(10));
        assert_eq!(cfg.max_connections, 10);
        assert_eq!(cfg.user, "comma");
        assert_eq!(cfg.admin_user, "root");
    }

    #[test]
    fn default_key_lives_in_assets() {
        let path = default_key_path();
        assert!(path.ends_with("assets/id_rsa"), "unexpected key path {path:?}");
    }
}
