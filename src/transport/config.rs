//! Connection parameters for device sessions.

use std::path::PathBuf;
use std::time::Duration;

use secrecy::SecretString;

/// Wide enough that device CLIs never soft-wrap table output; wrapped lines
/// would defeat the framer's line-oriented heuristics.
const DEFAULT_TERM_WIDTH: u32 = 511;
const DEFAULT_TERM_HEIGHT: u32 = 24;

/// How to authenticate to the device.
#[derive(Debug, Clone)]
pub enum AuthMethod {
    /// No authentication. Lab devices only.
    None,

    /// Password authentication — the norm for network gear.
    Password(SecretString),

    /// Key file on disk, optionally passphrase-protected.
    PrivateKey {
        path: PathBuf,
        passphrase: Option<String>,
    },
}

/// Host key policy, in the spirit of OpenSSH's `StrictHostKeyChecking`.
#[derive(Debug, Clone, Default)]
pub enum HostKeyVerification {
    /// Only hosts already present in known_hosts may connect.
    Strict,

    /// Learn unknown hosts on first contact, reject changed keys. The
    /// default, matching what `ssh` itself does in most fleets.
    #[default]
    AcceptNew,

    /// Accept anything. Lab use only.
    Disabled,
}

/// Everything the transport needs to reach one device.
#[derive(Debug, Clone)]
pub struct SshConfig {
    /// Hostname or IP address.
    pub host: String,

    /// SSH port.
    pub port: u16,

    /// Login username.
    pub username: String,

    /// Credential material.
    pub auth: AuthMethod,

    /// Cap on TCP connect plus SSH handshake.
    pub timeout: Duration,

    /// Requested PTY columns.
    pub terminal_width: u32,

    /// Requested PTY rows.
    pub terminal_height: u32,

    /// Host key policy for this connection.
    pub host_key_verification: HostKeyVerification,

    /// Alternate known_hosts file. `None` uses the user default.
    pub known_hosts_path: Option<PathBuf>,
}

impl SshConfig {
    /// Password-authenticated config with device-friendly defaults.
    pub fn with_password(
        host: impl Into<String>,
        username: impl Into<String>,
        password: SecretString,
    ) -> Self {
        Self {
            host: host.into(),
            port: 22,
            username: username.into(),
            auth: AuthMethod::Password(password),
            timeout: Duration::from_secs(20),
            terminal_width: DEFAULT_TERM_WIDTH,
            terminal_height: DEFAULT_TERM_HEIGHT,
            host_key_verification: HostKeyVerification::default(),
            known_hosts_path: None,
        }
    }

    /// `host:port`, for log lines.
    pub fn socket_addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}
