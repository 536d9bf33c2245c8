//! SSH connection setup over russh.
//!
//! Connecting to a device is a three-step handshake — TCP+SSH connect under
//! one overall timeout, authentication, PTY shell request — and the whole
//! thing either yields a working [`ShellChannel`] or a typed
//! [`TransportError`]. Host key policy runs inside russh's handler callback,
//! which can only answer yes or no; the gate smuggles the *reason* for a
//! rejection out through a shared slot so connect can report something
//! better than russh's generic unknown-key error.

use std::path::PathBuf;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use log::{debug, warn};
use russh::client::{self, Handle};
use russh::keys::{PrivateKeyWithHashAlg, PublicKey, load_secret_key};
use secrecy::ExposeSecret;

use super::config::{AuthMethod, HostKeyVerification, SshConfig};
use super::shell::ShellChannel;
use crate::error::{Result, TransportError};

/// Interval for protocol-level keepalives. Polling sessions sit idle
/// between cycles, so the connection must not time out on its own.
const KEEPALIVE: Duration = Duration::from_secs(15);

/// An authenticated SSH connection, not yet carrying a shell.
pub struct SshTransport {
    session: Handle<HostKeyGate>,
    config: SshConfig,
}

impl SshTransport {
    /// Connect and authenticate. The config's `timeout` bounds the combined
    /// TCP connect and SSH handshake.
    pub async fn connect(config: SshConfig) -> Result<Self> {
        let client_config = Arc::new(client::Config {
            inactivity_timeout: None,
            keepalive_interval: Some(KEEPALIVE),
            ..Default::default()
        });

        let verdict = RejectionSlot::default();
        let gate = HostKeyGate {
            host: config.host.clone(),
            port: config.port,
            policy: config.host_key_verification.clone(),
            known_hosts_path: config.known_hosts_path.clone(),
            verdict: verdict.clone(),
        };

        let mut session = tokio::time::timeout(
            config.timeout,
            client::connect(client_config, (config.host.as_str(), config.port), gate),
        )
        .await
        .map_err(|_| TransportError::Timeout(config.timeout))?
        .map_err(|e| verdict.explain(e))?;

        authenticate(&mut session, &config).await?;
        debug!("authenticated to {}", config.socket_addr());

        Ok(Self { session, config })
    }

    /// Connect, authenticate, and open the interactive shell in one step.
    pub async fn connect_shell(config: SshConfig) -> Result<ShellChannel> {
        Self::connect(config).await?.into_shell().await
    }

    /// Request a PTY and a shell on a fresh channel, consuming the
    /// transport. One session worker owns exactly one shell.
    pub async fn into_shell(self) -> Result<ShellChannel> {
        let channel = self
            .session
            .channel_open_session()
            .await
            .map_err(TransportError::Ssh)?;

        channel
            .request_pty(
                true,
                "xterm",
                self.config.terminal_width,
                self.config.terminal_height,
                0,
                0,
                &[],
            )
            .await
            .map_err(TransportError::Ssh)?;

        channel
            .request_shell(true)
            .await
            .map_err(TransportError::Ssh)?;

        debug!("shell open on {}", self.config.socket_addr());
        Ok(ShellChannel::new(self.session, channel))
    }

    /// Disconnect without ever having opened a shell.
    pub async fn close(self) -> Result<()> {
        self.session
            .disconnect(russh::Disconnect::ByApplication, "", "en")
            .await
            .map_err(TransportError::Ssh)?;
        Ok(())
    }
}

async fn authenticate(session: &mut Handle<HostKeyGate>, config: &SshConfig) -> Result<()> {
    let accepted = match &config.auth {
        AuthMethod::None => session
            .authenticate_none(&config.username)
            .await
            .map_err(TransportError::Ssh)?
            .success(),

        AuthMethod::Password(password) => session
            .authenticate_password(&config.username, password.expose_secret())
            .await
            .map_err(TransportError::Ssh)?
            .success(),

        AuthMethod::PrivateKey { path, passphrase } => {
            let key = load_secret_key(path, passphrase.as_deref())
                .map_err(|e| TransportError::Key(e.to_string()))?;

            // RSA keys need the strongest hash the server will take.
            let hash_alg = session
                .best_supported_rsa_hash()
                .await
                .map_err(TransportError::Ssh)?
                .flatten();

            session
                .authenticate_publickey(
                    &config.username,
                    PrivateKeyWithHashAlg::new(Arc::new(key), hash_alg),
                )
                .await
                .map_err(TransportError::Ssh)?
                .success()
        }
    };

    if !accepted {
        return Err(TransportError::AuthenticationFailed {
            user: config.username.clone(),
        }
        .into());
    }
    Ok(())
}

/// Carries the detailed host-key rejection out of the handler callback.
#[derive(Clone, Default)]
struct RejectionSlot(Arc<Mutex<Option<TransportError>>>);

impl RejectionSlot {
    fn record(&self, error: TransportError) {
        *self.0.lock().unwrap() = Some(error);
    }

    /// Prefer the recorded rejection over russh's generic error.
    fn explain(&self, fallback: russh::Error) -> TransportError {
        self.0
            .lock()
            .unwrap()
            .take()
            .unwrap_or(TransportError::Ssh(fallback))
    }
}

/// Host key policy enforcement, run by russh during the handshake.
pub(crate) struct HostKeyGate {
    host: String,
    port: u16,
    policy: HostKeyVerification,
    known_hosts_path: Option<PathBuf>,
    verdict: RejectionSlot,
}

/// What known_hosts says about the offered key.
enum KnownHostsLookup {
    Matched,
    Unknown,
}

impl HostKeyGate {
    fn lookup(&self, key: &PublicKey) -> std::result::Result<KnownHostsLookup, TransportError> {
        let checked = match &self.known_hosts_path {
            Some(path) => russh::keys::check_known_hosts_path(&self.host, self.port, key, path),
            None => russh::keys::check_known_hosts(&self.host, self.port, key),
        };

        match checked {
            Ok(true) => Ok(KnownHostsLookup::Matched),
            Ok(false) => Ok(KnownHostsLookup::Unknown),
            Err(russh::keys::Error::KeyChanged { line }) => Err(TransportError::HostKeyChanged {
                host: self.host.clone(),
                port: self.port,
                line,
            }),
            Err(e) => Err(TransportError::KnownHosts(e.to_string())),
        }
    }

    fn learn(&self, key: &PublicKey) {
        let learned = match &self.known_hosts_path {
            Some(path) => {
                russh::keys::known_hosts::learn_known_hosts_path(&self.host, self.port, key, path)
            }
            None => russh::keys::known_hosts::learn_known_hosts(&self.host, self.port, key),
        };
        if let Err(e) = learned {
            // Non-fatal: the key was accepted, it just will not be
            // remembered for next time.
            warn!("could not record host key for {}: {e}", self.host);
        }
    }
}

impl client::Handler for HostKeyGate {
    type Error = russh::Error;

    async fn check_server_key(
        &mut self,
        server_public_key: &PublicKey,
    ) -> std::result::Result<bool, Self::Error> {
        if matches!(self.policy, HostKeyVerification::Disabled) {
            return Ok(true);
        }

        match self.lookup(server_public_key) {
            Ok(KnownHostsLookup::Matched) => Ok(true),
            Ok(KnownHostsLookup::Unknown) => match self.policy {
                HostKeyVerification::AcceptNew => {
                    self.learn(server_public_key);
                    Ok(true)
                }
                _ => {
                    self.verdict.record(TransportError::HostKeyUnknown {
                        host: self.host.clone(),
                        port: self.port,
                    });
                    Ok(false)
                }
            },
            Err(rejection) => {
                self.verdict.record(rejection);
                Ok(false)
            }
        }
    }
}
