//! Error types for netshell.

use std::io;
use std::path::PathBuf;
use std::time::Duration;

use thiserror::Error;

/// Main error type for netshell operations.
#[derive(Error, Debug)]
pub enum Error {
    /// SSH transport-level errors
    #[error("Transport error: {0}")]
    Transport(#[from] TransportError),

    /// Command session errors
    #[error("Session error: {0}")]
    Session(#[from] SessionError),

    /// Backup/rollback errors
    #[error("Backup error: {0}")]
    Backup(#[from] BackupError),
}

/// Transport layer errors (SSH connection, authentication, channel I/O).
///
/// Everything here is fatal to the session it occurs in. A failure before
/// the first command aborts the whole request; a failure mid-session
/// preserves the results collected so far.
#[derive(Error, Debug)]
pub enum TransportError {
    /// SSH handshake or protocol error
    #[error("SSH error: {0}")]
    Ssh(#[from] russh::Error),

    /// Authentication failed
    #[error("Authentication failed for user '{user}'")]
    AuthenticationFailed { user: String },

    /// SSH key error
    #[error("SSH key error: {0}")]
    Key(String),

    /// Host key changed since it was recorded in known_hosts
    #[error("Host key for {host}:{port} changed (known_hosts line {line})")]
    HostKeyChanged { host: String, port: u16, line: usize },

    /// Host key not present in known_hosts under strict verification
    #[error("Unknown host key for {host}:{port}")]
    HostKeyUnknown { host: String, port: u16 },

    /// known_hosts file error
    #[error("known_hosts error: {0}")]
    KnownHosts(String),

    /// Connection was closed unexpectedly
    #[error("Connection disconnected")]
    Disconnected,

    /// Operation timed out
    #[error("Operation timed out after {0:?}")]
    Timeout(Duration),
}

/// Session-level errors. Recorded inline against the command or phase that
/// produced them; they never abort the remaining commands on their own.
#[derive(Error, Debug)]
pub enum SessionError {
    /// Output did not complete within the hard timeout
    #[error("Command '{command}' did not complete within {limit:?}")]
    CommandTimeout { command: String, limit: Duration },

    /// A configuration line was rejected by the device
    #[error("Configuration line rejected: '{line}': {message}")]
    ConfigRejected { line: String, message: String },

    /// Configuration commands cannot run in this session
    #[error("Configuration not supported: {reason}")]
    ConfigNotSupported { reason: String },
}

/// Backup storage and rollback errors.
#[derive(Error, Debug)]
pub enum BackupError {
    /// Backup file missing at rollback time
    #[error("Backup file not found: {path}")]
    NotFound { path: PathBuf },

    /// Device returned an empty configuration capture
    #[error("Empty configuration capture from {host}")]
    EmptyCapture { host: String },

    /// I/O error reading or writing backup files
    #[error("Backup I/O error: {0}")]
    Io(#[from] io::Error),
}

/// Result type alias using netshell's Error.
pub type Result<T> = std::result::Result<T, Error>;
