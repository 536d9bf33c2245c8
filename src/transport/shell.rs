//! Interactive shell channel with timed, poll-style reads.
//!
//! Network device shells give no structured framing: the only receive
//! primitive that makes sense is "give me whatever bytes arrive within this
//! window". [`ShellChannel::read_available`] provides exactly that, and the
//! completion detector builds its silence heuristic on top of it.

use std::future::Future;
use std::time::Duration;

use bytes::Bytes;
use log::{debug, trace};
use russh::client::{Handle, Msg};
use russh::{Channel, ChannelMsg};

use super::ssh::HostKeyGate;
use crate::error::{Result, TransportError};

/// Byte-level interactive session surface.
///
/// [`ShellChannel`] is the SSH implementation; tests substitute scripted
/// fakes. The contract mirrors an interactive terminal, not an RPC channel:
/// `read_available` may legitimately return nothing.
pub trait RawSession: Send {
    /// Write raw bytes to the remote shell.
    fn write(&mut self, data: &[u8]) -> impl Future<Output = Result<()>> + Send;

    /// Wait up to `wait` for the next chunk of output.
    ///
    /// Returns `Ok(None)` when the window elapses without data — that is a
    /// normal outcome, not an error. Returns `Err` only when the transport
    /// itself is gone.
    fn read_available(
        &mut self,
        wait: Duration,
    ) -> impl Future<Output = Result<Option<Bytes>>> + Send;

    /// Release the session.
    fn close(self) -> impl Future<Output = Result<()>> + Send;
}

/// An authenticated interactive shell on a network device.
///
/// Owns both the SSH session handle and the PTY channel: the session worker
/// that holds a `ShellChannel` holds the whole transport exclusively.
pub struct ShellChannel {
    session: Handle<HostKeyGate>,
    channel: Channel<Msg>,
}

impl ShellChannel {
    pub(crate) fn new(session: Handle<HostKeyGate>, channel: Channel<Msg>) -> Self {
        Self { session, channel }
    }
}

impl RawSession for ShellChannel {
    async fn write(&mut self, data: &[u8]) -> Result<()> {
        self.channel.data(data).await.map_err(|_| {
            // russh surfaces a closed channel as a send error
            TransportError::Disconnected
        })?;
        trace!("wrote {} bytes to shell", data.len());
        Ok(())
    }

    async fn read_available(&mut self, wait: Duration) -> Result<Option<Bytes>> {
        let deadline = tokio::time::Instant::now() + wait;
        loop {
            let remaining = deadline.saturating_duration_since(tokio::time::Instant::now());
            let msg = match tokio::time::timeout(remaining, self.channel.wait()).await {
                Err(_) => return Ok(None),
                Ok(None) => return Err(TransportError::Disconnected.into()),
                Ok(Some(msg)) => msg,
            };

            match msg {
                ChannelMsg::Data { data } => {
                    trace!("read {} bytes from shell", data.len());
                    return Ok(Some(Bytes::copy_from_slice(&data)));
                }
                ChannelMsg::ExtendedData { data, .. } => {
                    return Ok(Some(Bytes::copy_from_slice(&data)));
                }
                ChannelMsg::Eof | ChannelMsg::Close => {
                    debug!("shell channel closed by peer");
                    return Err(TransportError::Disconnected.into());
                }
                // Window adjusts, exit status, etc. — keep waiting.
                _ => continue,
            }
        }
    }

    async fn close(self) -> Result<()> {
        let _ = self.channel.eof().await;
        self.session
            .disconnect(russh::Disconnect::ByApplication, "", "en")
            .await
            .map_err(TransportError::Ssh)?;
        debug!("shell channel closed");
        Ok(())
    }
}
