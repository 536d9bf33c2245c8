//! The command session driver.
//!
//! One background worker task per session, owning the transport exclusively.
//! State flow: connect → paging setup → per command send / await / drain /
//! frame → close, with a parallel failed state reachable from anywhere on a
//! transport error. A connect failure aborts the whole request atomically;
//! a mid-session failure preserves every result already collected. The
//! terminal `Closed` event is emitted exactly once on every exit path.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

use chrono::Local;
use log::{debug, info, warn};

use super::command::{
    Command, CommandResult, LoopFrame, SessionMode, SessionOutcome, SessionRequest,
};
use super::event::{EventSink, SessionEvent};
use super::handle::SessionHandle;
use super::paging::disable_paging;
use crate::backup::{BackupRecord, BackupStore, backup_running_config};
use crate::codec::{
    CompletionCause, CompletionProfile, collect_output, decode_capture, encode_command,
    frame_output,
};
use crate::error::{Result, SessionError};
use crate::managed::{ManagedConnector, ManagedSession, NoCollaborator};
use crate::transport::{RawSession, ShellConnector, SshConfig, SshConnector};
use crate::vendor::VendorProfile;

/// Granularity at which the loop sleep re-checks the cancellation flag.
const CANCEL_POLL: Duration = Duration::from_millis(100);

/// Entry points for running sessions.
pub struct SessionDriver;

impl SessionDriver {
    /// Spawn a session over SSH with no structured collaborator.
    ///
    /// Requests carrying configuration lines need [`Self::spawn_with`];
    /// without a collaborator the config phase is reported as failed.
    pub fn spawn(request: SessionRequest) -> SessionHandle {
        Self::spawn_with(
            request,
            SshConnector,
            None::<NoCollaborator>,
            BackupStore::default(),
        )
    }

    /// Spawn a session with explicit collaborators, for configuration
    /// sessions and for tests.
    pub fn spawn_with<C, M>(
        request: SessionRequest,
        connector: C,
        managed: Option<M>,
        store: BackupStore,
    ) -> SessionHandle
    where
        C: ShellConnector + 'static,
        M: ManagedConnector + 'static,
    {
        let (sink, events) = EventSink::channel();
        let cancel = Arc::new(AtomicBool::new(false));
        let cancel_flag = cancel.clone();

        let worker = tokio::spawn(async move {
            let outcome = run_worker(request, connector, managed, store, &sink, &cancel_flag).await;
            // The one guaranteed terminal signal. Every branch above funnels
            // through here, including failures.
            sink.send(SessionEvent::Closed);
            outcome
        });

        SessionHandle::new(events, cancel, worker)
    }

    /// Run a one-shot session to completion and return its outcome.
    pub async fn run(request: SessionRequest) -> SessionOutcome {
        Self::spawn(request).wait().await
    }
}

async fn run_worker<C, M>(
    request: SessionRequest,
    connector: C,
    managed: Option<M>,
    store: BackupStore,
    sink: &EventSink,
    cancel: &AtomicBool,
) -> SessionOutcome
where
    C: ShellConnector,
    M: ManagedConnector,
{
    match request.mode {
        SessionMode::Oneshot => run_oneshot(request, connector, managed, store, sink).await,
        SessionMode::Loop { interval_secs } => {
            run_loop(request, connector, sink, cancel, interval_secs).await
        }
    }
}

async fn run_oneshot<C, M>(
    request: SessionRequest,
    connector: C,
    managed: Option<M>,
    store: BackupStore,
    sink: &EventSink,
) -> SessionOutcome
where
    C: ShellConnector,
    M: ManagedConnector,
{
    let vendor = VendorProfile::from_hint(request.vendor.as_deref());
    let mut results: Vec<CommandResult> = Vec::new();

    // Configuration phase, through the structured collaborator. Backup
    // comes first: no config line goes out without a record unless backup
    // was explicitly disabled.
    let (backup, phase_error) = if request.config_lines.is_empty() {
        (None, None)
    } else {
        apply_config_phase(&request, managed.as_ref(), &store, vendor, sink).await
    };

    if request.commands.is_empty() {
        return finish(results, phase_error, backup, sink);
    }

    // Interactive phase over the raw shell.
    sink.log(format!("connecting to {}", request.host));
    let mut shell = match connector.connect(ssh_config(&request)).await {
        Ok(shell) => shell,
        Err(e) => {
            // Connection never succeeded: the request fails atomically,
            // with no partial results.
            let msg = format!("connection failed: {e}");
            sink.log(msg.clone());
            return SessionOutcome::failed(results, msg, backup);
        }
    };
    sink.log("connection established".to_string());

    // Best effort by contract: paging setup never fails the session.
    if let Err(e) = disable_paging(&mut shell).await {
        warn!("paging setup did not complete: {e}");
        sink.log(format!("warning: paging setup did not complete: {e}"));
    }

    for command in &request.commands {
        sink.log(describe(command));
        match execute_command(&mut shell, command, &request.profile).await {
            Ok(result) => {
                sink.send(SessionEvent::Result(result.clone()));
                results.push(result);
            }
            Err(e) => {
                // Transport gone mid-session: report partial success
                // rather than discarding captured output.
                let msg = format!("connection lost: {e}");
                sink.log(msg.clone());
                let _ = shell.close().await;
                return SessionOutcome::failed(results, msg, backup);
            }
        }
    }

    let _ = shell.close().await;
    sink.log("session complete".to_string());

    debug!(
        "oneshot session to {} finished: {} results",
        request.host,
        results.len()
    );
    finish(results, phase_error, backup, sink)
}

fn finish(
    results: Vec<CommandResult>,
    phase_error: Option<String>,
    backup: Option<BackupRecord>,
    sink: &EventSink,
) -> SessionOutcome {
    match phase_error {
        Some(msg) => {
            sink.log(msg.clone());
            SessionOutcome::failed(results, msg, backup)
        }
        None => SessionOutcome {
            success: true,
            results,
            connection_error: None,
            backup,
        },
    }
}

/// Backup, apply, optionally save. Returns the backup record (when one was
/// taken) and the phase error (when anything failed).
async fn apply_config_phase<M: ManagedConnector>(
    request: &SessionRequest,
    managed: Option<&M>,
    store: &BackupStore,
    vendor: VendorProfile,
    sink: &EventSink,
) -> (Option<BackupRecord>, Option<String>) {
    let Some(connector) = managed else {
        return (
            None,
            Some(
                SessionError::ConfigNotSupported {
                    reason: "no structured session collaborator configured".to_string(),
                }
                .to_string(),
            ),
        );
    };

    sink.log(format!("opening structured session to {}", request.host));
    let mut session = match connector
        .connect(&request.host, &request.username, &request.password, vendor)
        .await
    {
        Ok(session) => session,
        Err(e) => return (None, Some(format!("structured session failed: {e}"))),
    };

    let mut record = None;
    if request.backup {
        match backup_running_config(&mut session, store, &request.host, vendor).await {
            Ok(rec) => {
                sink.log(format!("backup saved: {}", rec.path.display()));
                sink.send(SessionEvent::BackupSaved(rec.clone()));
                record = Some(rec);
            }
            Err(e) => {
                // No record means no config: the pre-change backup is the
                // safety contract of this phase.
                let _ = session.disconnect().await;
                return (
                    None,
                    Some(format!("backup failed, configuration not applied: {e}")),
                );
            }
        }
    }

    let error = match session.send_config_set(&request.config_lines).await {
        Ok(output) => {
            info!(
                "applied {} configuration lines to {}",
                request.config_lines.len(),
                request.host
            );
            sink.log(format!(
                "configuration applied ({} lines)",
                request.config_lines.len()
            ));
            sink.log(output);
            save_if_requested(&mut session, request, vendor, sink).await
        }
        Err(e) => Some(format!("configuration failed: {e}")),
    };

    let _ = session.disconnect().await;
    (record, error)
}

async fn save_if_requested<M: ManagedSession>(
    session: &mut M,
    request: &SessionRequest,
    vendor: VendorProfile,
    sink: &EventSink,
) -> Option<String> {
    if !request.write_after_config {
        return None;
    }
    sink.log("saving configuration".to_string());
    for command in vendor.save_sequence() {
        match session.send_command(command).await {
            Ok(output) => sink.log(output),
            Err(e) => return Some(format!("save failed on '{command}': {e}")),
        }
    }
    None
}

async fn run_loop<C: ShellConnector>(
    request: SessionRequest,
    connector: C,
    sink: &EventSink,
    cancel: &AtomicBool,
    interval_secs: u64,
) -> SessionOutcome {
    // Loop mode never touches configuration. Reported as a warning, not a
    // fatal error.
    if !request.config_lines.is_empty() {
        warn!("configuration commands ignored in loop mode");
        sink.log("warning: configuration commands are not allowed in loop mode".to_string());
    }

    sink.log(format!("connecting to {}", request.host));
    let mut shell = match connector.connect(ssh_config(&request)).await {
        Ok(shell) => shell,
        Err(e) => {
            let msg = format!("connection failed: {e}");
            sink.log(msg.clone());
            return SessionOutcome::failed(Vec::new(), msg, None);
        }
    };
    sink.log("connection established".to_string());

    if let Err(e) = disable_paging(&mut shell).await {
        warn!("paging setup did not complete: {e}");
    }

    sink.log(format!("polling every {interval_secs}s"));
    while !cancel.load(Ordering::Relaxed) {
        let timestamp = Local::now();
        let mut combined = format!("--- refresh {} ---\n", timestamp.format("%Y-%m-%d %H:%M:%S"));

        for command in &request.commands {
            combined.push_str(&format!("\n>>> {}\n", command.text));
            match execute_command(&mut shell, command, &request.profile).await {
                Ok(result) => {
                    combined.push_str(&result.output);
                    combined.push('\n');
                    if let Some(error) = &result.error {
                        combined.push_str(&format!("*** {error}\n"));
                    }
                }
                Err(e) => {
                    let msg = format!("connection lost: {e}");
                    sink.log(msg.clone());
                    let _ = shell.close().await;
                    return SessionOutcome::failed(Vec::new(), msg, None);
                }
            }
        }

        sink.send(SessionEvent::Frame(LoopFrame {
            timestamp,
            combined_text: combined,
        }));

        // A stop request is honored promptly: checked before the sleep,
        // re-checked at every poll tick during it.
        if cancel.load(Ordering::Relaxed) {
            break;
        }
        if sleep_unless_cancelled(Duration::from_secs(interval_secs), cancel).await {
            break;
        }
    }

    let _ = shell.close().await;
    sink.log("loop stopped".to_string());
    SessionOutcome {
        success: true,
        results: Vec::new(),
        connection_error: None,
        backup: None,
    }
}

/// Send one command and collect, decode, and frame its output.
///
/// A hard-timeout stop keeps whatever was captured but marks the result
/// failed; a first-byte timeout or silence stop is a normal completion.
/// Only transport errors propagate.
async fn execute_command<S: RawSession>(
    shell: &mut S,
    command: &Command,
    profile: &CompletionProfile,
) -> Result<CommandResult> {
    shell
        .write(&encode_command(&format!("{}\n", command.text)))
        .await?;

    let capture = collect_output(shell, profile).await?;
    let text = decode_capture(&capture.data);
    let output = frame_output(&text, &command.text);

    Ok(match capture.cause {
        CompletionCause::HardTimeout => {
            let error = SessionError::CommandTimeout {
                command: command.text.clone(),
                limit: profile.hard_timeout,
            };
            CommandResult::failed(&command.text, output, error.to_string())
        }
        CompletionCause::Silence | CompletionCause::FirstByteTimeout => {
            CommandResult::ok(&command.text, output)
        }
    })
}

/// Sleep in cancel-poll slices. Returns true if cancellation was observed.
async fn sleep_unless_cancelled(total: Duration, cancel: &AtomicBool) -> bool {
    let mut remaining = total;
    while remaining > Duration::ZERO {
        if cancel.load(Ordering::Relaxed) {
            return true;
        }
        let step = CANCEL_POLL.min(remaining);
        tokio::time::sleep(step).await;
        remaining -= step;
    }
    cancel.load(Ordering::Relaxed)
}

fn ssh_config(request: &SessionRequest) -> SshConfig {
    let mut config = SshConfig::with_password(
        request.host.clone(),
        request.username.clone(),
        request.password.clone(),
    );
    config.port = request.port;
    config
}

fn describe(command: &Command) -> String {
    match &command.description {
        Some(description) => format!(">>> {description} ({})", command.text),
        None => format!(">>> {}", command.text),
    }
}
