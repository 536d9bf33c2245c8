//! Silence-based completion detection.
//!
//! Interactive device shells give no end-of-output marker. The only
//! generally available completion signal is silence: once bytes have started
//! arriving, a window with no new data means the command is done. A hard
//! cap bounds the worst case for devices that trickle output indefinitely.

use std::time::Duration;

use bytes::BytesMut;
use log::{debug, trace};
use tokio::time::Instant;

use crate::error::Result;
use crate::transport::RawSession;

/// Timing parameters for one command's completion detection.
#[derive(Debug, Clone)]
pub struct CompletionProfile {
    /// Maximum wait for the first byte of a response. Expiring here is not
    /// an error — some commands legitimately produce no output.
    pub start_timeout: Duration,

    /// Inactivity window after which output is considered complete.
    pub silence_window: Duration,

    /// Absolute cap on total wait per command.
    pub hard_timeout: Duration,
}

impl CompletionProfile {
    /// Conservative tuning for multi-vendor reliability. The safe default.
    pub fn conservative() -> Self {
        Self {
            start_timeout: Duration::from_secs(5),
            silence_window: Duration::from_millis(500),
            hard_timeout: Duration::from_secs(15),
        }
    }

    /// Aggressive tuning for a known-fast target.
    pub fn aggressive() -> Self {
        Self {
            start_timeout: Duration::from_secs(3),
            silence_window: Duration::from_millis(100),
            hard_timeout: Duration::from_secs(5),
        }
    }
}

impl Default for CompletionProfile {
    fn default() -> Self {
        Self::conservative()
    }
}

/// Why output collection stopped.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CompletionCause {
    /// No bytes at all arrived within `start_timeout`.
    FirstByteTimeout,

    /// Bytes arrived, then the silence window elapsed. The normal case.
    Silence,

    /// The hard cap elapsed while data was still trickling in.
    HardTimeout,
}

/// One command's raw capture plus the reason collection stopped.
#[derive(Debug)]
pub struct Capture {
    pub data: BytesMut,
    pub cause: CompletionCause,
}

/// Collect a command's output from `shell` until the profile says it is
/// complete. Transport errors propagate; timeouts do not.
pub async fn collect_output<S: RawSession>(
    shell: &mut S,
    profile: &CompletionProfile,
) -> Result<Capture> {
    let start = Instant::now();
    let mut data = BytesMut::new();

    // Phase 1: wait for the first byte.
    match shell.read_available(profile.start_timeout).await? {
        Some(chunk) => data.extend_from_slice(&chunk),
        None => {
            trace!("no output within {:?}", profile.start_timeout);
            return Ok(Capture {
                data,
                cause: CompletionCause::FirstByteTimeout,
            });
        }
    }

    // Phase 2: read until silence or the hard cap.
    let cause = loop {
        let elapsed = start.elapsed();
        if elapsed >= profile.hard_timeout {
            break CompletionCause::HardTimeout;
        }
        let remaining = profile.hard_timeout - elapsed;
        let wait = profile.silence_window.min(remaining);

        match shell.read_available(wait).await? {
            Some(chunk) => data.extend_from_slice(&chunk),
            // A quiet clamped window means the cap, not silence, ended us.
            None if wait < profile.silence_window => break CompletionCause::HardTimeout,
            None => break CompletionCause::Silence,
        }
    };

    debug!(
        "collected {} bytes in {:?} ({:?})",
        data.len(),
        start.elapsed(),
        cause
    );
    Ok(Capture { data, cause })
}

#[cfg(test)]
mod tests {
    use std::collections::VecDeque;

    use bytes::Bytes;

    use super::*;
    use crate::error::TransportError;

    /// Scripted shell: each entry is (delay before the chunk, chunk).
    struct ScriptedShell {
        steps: VecDeque<(Duration, Bytes)>,
    }

    impl ScriptedShell {
        fn new(steps: Vec<(Duration, &'static [u8])>) -> Self {
            Self {
                steps: steps
                    .into_iter()
                    .map(|(d, b)| (d, Bytes::from_static(b)))
                    .collect(),
            }
        }
    }

    impl RawSession for ScriptedShell {
        async fn write(&mut self, _data: &[u8]) -> Result<()> {
            Ok(())
        }

        async fn read_available(&mut self, wait: Duration) -> Result<Option<Bytes>> {
            match self.steps.front_mut() {
                Some((delay, _)) if *delay <= wait => {
                    let (delay, chunk) = self.steps.pop_front().unwrap();
                    tokio::time::sleep(delay).await;
                    Ok(Some(chunk))
                }
                Some((delay, _)) => {
                    *delay -= wait;
                    tokio::time::sleep(wait).await;
                    Ok(None)
                }
                None => {
                    tokio::time::sleep(wait).await;
                    Ok(None)
                }
            }
        }

        async fn close(self) -> Result<()> {
            Ok(())
        }
    }

    /// Shell whose transport dies mid-read.
    struct DroppingShell;

    impl RawSession for DroppingShell {
        async fn write(&mut self, _data: &[u8]) -> Result<()> {
            Ok(())
        }

        async fn read_available(&mut self, _wait: Duration) -> Result<Option<Bytes>> {
            Err(TransportError::Disconnected.into())
        }

        async fn close(self) -> Result<()> {
            Ok(())
        }
    }

    #[tokio::test(start_paused = true)]
    async fn test_no_output_is_first_byte_timeout() {
        let mut shell = ScriptedShell::new(vec![]);
        let capture = collect_output(&mut shell, &CompletionProfile::conservative())
            .await
            .unwrap();
        assert!(capture.data.is_empty());
        assert_eq!(capture.cause, CompletionCause::FirstByteTimeout);
    }

    #[tokio::test(start_paused = true)]
    async fn test_chunks_then_silence() {
        let mut shell = ScriptedShell::new(vec![
            (Duration::from_millis(50), b"first "),
            (Duration::from_millis(50), b"second"),
        ]);
        let capture = collect_output(&mut shell, &CompletionProfile::conservative())
            .await
            .unwrap();
        assert_eq!(&capture.data[..], b"first second");
        assert_eq!(capture.cause, CompletionCause::Silence);
    }

    #[tokio::test(start_paused = true)]
    async fn test_trickle_hits_hard_timeout() {
        // A chunk every 200ms forever (well, long enough): silence at 500ms
        // never happens, so the 15s cap must end collection.
        let steps = (0..200)
            .map(|_| (Duration::from_millis(200), b"x".as_slice()))
            .collect();
        let mut shell = ScriptedShell::new(steps);
        let capture = collect_output(&mut shell, &CompletionProfile::conservative())
            .await
            .unwrap();
        assert_eq!(capture.cause, CompletionCause::HardTimeout);
        assert!(!capture.data.is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn test_transport_error_propagates() {
        let mut shell = DroppingShell;
        let result = collect_output(&mut shell, &CompletionProfile::aggressive()).await;
        assert!(result.is_err());
    }
}
