//! Pagination suppression.
//!
//! Device CLIs pause long output at a `--More--` prompt, which would hang an
//! automated capture forever. Before any user command runs, the known
//! disable commands are sent unconditionally — one per supported dialect —
//! with no vendor detection first: an unsupported disable command just earns
//! an error line that the framer filters out downstream.

use std::time::Duration;

use log::{debug, warn};

use crate::codec::encode_command;
use crate::error::Result;
use crate::transport::RawSession;

/// Pagination-disable commands, sent in this order on every session.
/// The framer also uses these to scrub residue from captured output.
pub const PAGING_DISABLE_COMMANDS: [&str; 2] = ["terminal length 0", "screen-length 0 temporary"];

/// Settle time after connect, letting the login banner finish.
const BANNER_SETTLE: Duration = Duration::from_millis(500);

/// Settle time after each disable command.
const PAGING_SETTLE: Duration = Duration::from_millis(200);

/// Poll window used while draining buffered output.
const DRAIN_POLL: Duration = Duration::from_millis(50);

/// Upper bound on any single drain, so an unexpectedly verbose device can
/// never block session startup.
const DRAIN_BUDGET: Duration = Duration::from_secs(2);

/// Disable output paging on a fresh session.
///
/// Transport errors propagate so the driver can log them, but the driver
/// treats this whole step as best-effort — paging setup never fails a
/// session.
pub async fn disable_paging<S: RawSession>(shell: &mut S) -> Result<()> {
    // Let the banner/MOTD finish, then throw it away.
    tokio::time::sleep(BANNER_SETTLE).await;
    drain_discard(shell).await?;

    for command in PAGING_DISABLE_COMMANDS {
        debug!("disabling paging: {command}");
        shell.write(&encode_command(&format!("{command}\n"))).await?;
        tokio::time::sleep(PAGING_SETTLE).await;
        drain_discard(shell).await?;
    }

    Ok(())
}

/// Read and discard whatever is buffered, until a quiet poll or the budget
/// runs out.
async fn drain_discard<S: RawSession>(shell: &mut S) -> Result<()> {
    let deadline = tokio::time::Instant::now() + DRAIN_BUDGET;
    loop {
        match shell.read_available(DRAIN_POLL).await? {
            None => return Ok(()),
            Some(chunk) => {
                debug!("discarded {} bytes of paging residue", chunk.len());
            }
        }
        if tokio::time::Instant::now() >= deadline {
            warn!("drain budget exhausted; device is unusually verbose");
            return Ok(());
        }
    }
}

#[cfg(test)]
mod tests {
    use std::collections::VecDeque;

    use bytes::Bytes;

    use super::*;

    struct RecordingShell {
        writes: Vec<Vec<u8>>,
        pending: VecDeque<Bytes>,
    }

    impl RawSession for RecordingShell {
        async fn write(&mut self, data: &[u8]) -> Result<()> {
            self.writes.push(data.to_vec());
            Ok(())
        }

        async fn read_available(&mut self, wait: Duration) -> Result<Option<Bytes>> {
            tokio::time::sleep(wait).await;
            Ok(self.pending.pop_front())
        }

        async fn close(self) -> Result<()> {
            Ok(())
        }
    }

    #[tokio::test(start_paused = true)]
    async fn test_sends_both_disable_forms_in_order() {
        let mut shell = RecordingShell {
            writes: Vec::new(),
            pending: VecDeque::from([Bytes::from_static(b"Welcome banner\r\nSwitch#")]),
        };

        disable_paging(&mut shell).await.unwrap();

        assert_eq!(shell.writes.len(), 2);
        assert_eq!(shell.writes[0], b"terminal length 0\n");
        assert_eq!(shell.writes[1], b"screen-length 0 temporary\n");
    }

    #[tokio::test(start_paused = true)]
    async fn test_verbose_device_does_not_block_startup() {
        // More chunks than the drain budget will ever consume.
        let chunks = (0..200).map(|_| Bytes::from_static(b"noise ")).collect();
        let mut shell = RecordingShell {
            writes: Vec::new(),
            pending: chunks,
        };

        disable_paging(&mut shell).await.unwrap();
        assert_eq!(shell.writes.len(), 2);
    }
}
