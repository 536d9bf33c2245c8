//! SSH transport layer wrapping russh.
//!
//! This module provides the low-level SSH connection management —
//! connection setup, authentication, host key handling — plus the
//! interactive [`ShellChannel`] the session driver reads and writes.

pub mod config;
mod shell;
mod ssh;

pub use config::{AuthMethod, HostKeyVerification, SshConfig};
pub use shell::{RawSession, ShellChannel};
pub use ssh::SshTransport;

use std::future::Future;

use crate::error::Result;

/// Opens interactive shells. The production implementation is
/// [`SshConnector`]; tests substitute scripted connectors.
pub trait ShellConnector: Send + Sync {
    /// The shell type this connector produces.
    type Shell: RawSession + 'static;

    /// Open an authenticated shell on `config.host`.
    fn connect(&self, config: SshConfig) -> impl Future<Output = Result<Self::Shell>> + Send;
}

/// Default connector: SSH via [`SshTransport`].
#[derive(Debug, Clone, Default)]
pub struct SshConnector;

impl ShellConnector for SshConnector {
    type Shell = ShellChannel;

    async fn connect(&self, config: SshConfig) -> Result<ShellChannel> {
        SshTransport::connect_shell(config).await
    }
}
