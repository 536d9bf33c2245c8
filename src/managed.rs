//! The structured session collaborator.
//!
//! Configuration changes, backups, and rollback go through a higher-level
//! session library that negotiates device prompts and config modes itself
//! (netmiko-style). This crate does not reimplement that negotiation; it
//! consumes the capability through these traits. Implementations live
//! outside the engine — tests use scripted fakes.

use std::future::Future;

use secrecy::SecretString;

use crate::error::{Result, SessionError};
use crate::vendor::VendorProfile;

/// An open capability-negotiating session on a device.
pub trait ManagedSession: Send {
    /// Send one command and return its cleaned output.
    fn send_command(&mut self, command: &str) -> impl Future<Output = Result<String>> + Send;

    /// Enter configuration mode, apply the lines in order, exit config
    /// mode, and return the combined transcript.
    fn send_config_set(&mut self, lines: &[String]) -> impl Future<Output = Result<String>> + Send;

    /// Tear down the session.
    fn disconnect(self) -> impl Future<Output = Result<()>> + Send;
}

/// Opens [`ManagedSession`]s.
pub trait ManagedConnector: Send + Sync {
    /// The session type this connector produces.
    type Session: ManagedSession + 'static;

    /// Connect and authenticate to `host` for the given vendor dialect.
    fn connect(
        &self,
        host: &str,
        username: &str,
        password: &SecretString,
        vendor: VendorProfile,
    ) -> impl Future<Output = Result<Self::Session>> + Send;
}

/// Stand-in for sessions that carry no configuration work. `connect`
/// always fails, so a request that does need the collaborator is reported
/// as unsupported rather than silently skipped.
pub struct NoCollaborator;

/// Uninhabited session type for [`NoCollaborator`].
pub enum NoCollaboratorSession {}

impl ManagedSession for NoCollaboratorSession {
    async fn send_command(&mut self, _command: &str) -> Result<String> {
        match *self {}
    }

    async fn send_config_set(&mut self, _lines: &[String]) -> Result<String> {
        match *self {}
    }

    async fn disconnect(self) -> Result<()> {
        match self {}
    }
}

impl ManagedConnector for NoCollaborator {
    type Session = NoCollaboratorSession;

    async fn connect(
        &self,
        _host: &str,
        _username: &str,
        _password: &SecretString,
        _vendor: VendorProfile,
    ) -> Result<Self::Session> {
        Err(SessionError::ConfigNotSupported {
            reason: "no structured session collaborator configured".to_string(),
        }
        .into())
    }
}
