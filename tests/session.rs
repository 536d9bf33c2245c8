//! End-to-end session driver tests over scripted shells.
//!
//! Every test drives the real state machine through `SessionDriver`; only
//! the transport and the structured collaborator are replaced by scripted
//! fakes. Time is paused, so the settle and silence waits cost nothing.

use std::collections::{HashMap, VecDeque};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use bytes::Bytes;
use secrecy::SecretString;

use netshell::backup::{BackupStore, restore_backup};
use netshell::codec::CompletionProfile;
use netshell::error::{Result, TransportError};
use netshell::managed::{ManagedConnector, ManagedSession, NoCollaborator};
use netshell::session::{
    Command, CommandResult, PAGING_DISABLE_COMMANDS, SessionDriver, SessionEvent, SessionMode,
    SessionRequest,
};
use netshell::transport::{RawSession, ShellConnector, SshConfig};
use netshell::vendor::VendorProfile;

/// A device shell that answers from a fixed command/response table.
///
/// Paging-disable commands are swallowed silently. After `fail_after`
/// answered commands the transport reports itself disconnected.
struct FakeShell {
    responses: HashMap<String, String>,
    pending: VecDeque<Bytes>,
    answered: usize,
    fail_after: Option<usize>,
    dropped: bool,
    chatty_remaining: usize,
}

impl RawSession for FakeShell {
    async fn write(&mut self, data: &[u8]) -> Result<()> {
        let text = String::from_utf8_lossy(data);
        let command = text.trim();
        if PAGING_DISABLE_COMMANDS.contains(&command) {
            return Ok(());
        }

        if self.fail_after == Some(self.answered) {
            self.dropped = true;
            return Ok(());
        }
        self.answered += 1;

        if command == "show tech-support" {
            // Streams output past any reasonable time limit.
            self.chatty_remaining = 400;
            return Ok(());
        }

        let body = self
            .responses
            .get(command)
            .cloned()
            .unwrap_or_default();
        let reply = if body.is_empty() {
            format!("{command}\r\nSwitch#")
        } else {
            format!("{command}\r\n{body}\r\nSwitch#")
        };
        self.pending.push_back(Bytes::from(reply));
        Ok(())
    }

    async fn read_available(&mut self, wait: Duration) -> Result<Option<Bytes>> {
        if self.dropped {
            return Err(TransportError::Disconnected.into());
        }
        if self.chatty_remaining > 0 {
            self.chatty_remaining -= 1;
            tokio::time::sleep(Duration::from_millis(50).min(wait)).await;
            return Ok(Some(Bytes::from_static(b"% flood line\r\n")));
        }
        if let Some(chunk) = self.pending.pop_front() {
            return Ok(Some(chunk));
        }
        tokio::time::sleep(wait).await;
        Ok(None)
    }

    async fn close(self) -> Result<()> {
        Ok(())
    }
}

#[derive(Clone, Default)]
struct FakeConnector {
    responses: HashMap<String, String>,
    fail_after: Option<usize>,
    refuse: bool,
}

impl FakeConnector {
    fn new<const N: usize>(table: [(&str, &str); N]) -> Self {
        Self {
            responses: table
                .into_iter()
                .map(|(c, r)| (c.to_string(), r.to_string()))
                .collect(),
            fail_after: None,
            refuse: false,
        }
    }

    fn failing_after(mut self, answered: usize) -> Self {
        self.fail_after = Some(answered);
        self
    }

    fn refusing() -> Self {
        Self {
            refuse: true,
            ..Self::default()
        }
    }
}

impl ShellConnector for FakeConnector {
    type Shell = FakeShell;

    async fn connect(&self, config: SshConfig) -> Result<FakeShell> {
        if self.refuse {
            return Err(TransportError::Timeout(config.timeout).into());
        }
        Ok(FakeShell {
            responses: self.responses.clone(),
            pending: VecDeque::new(),
            answered: 0,
            fail_after: self.fail_after,
            dropped: false,
            chatty_remaining: 0,
        })
    }
}

/// Shared record of everything the fake collaborator was asked to do.
#[derive(Clone, Default)]
struct ManagedLog {
    commands: Arc<Mutex<Vec<String>>>,
    config_sets: Arc<Mutex<Vec<Vec<String>>>>,
}

struct FakeManaged {
    log: ManagedLog,
    running_config: String,
}

impl ManagedSession for FakeManaged {
    async fn send_command(&mut self, command: &str) -> Result<String> {
        self.log.commands.lock().unwrap().push(command.to_string());
        Ok(self.running_config.clone())
    }

    async fn send_config_set(&mut self, lines: &[String]) -> Result<String> {
        self.log.config_sets.lock().unwrap().push(lines.to_vec());
        Ok(format!("applied {} lines", lines.len()))
    }

    async fn disconnect(self) -> Result<()> {
        Ok(())
    }
}

struct FakeManagedConnector {
    log: ManagedLog,
    running_config: String,
}

impl ManagedConnector for FakeManagedConnector {
    type Session = FakeManaged;

    async fn connect(
        &self,
        _host: &str,
        _username: &str,
        _password: &SecretString,
        _vendor: VendorProfile,
    ) -> Result<FakeManaged> {
        Ok(FakeManaged {
            log: self.log.clone(),
            running_config: self.running_config.clone(),
        })
    }
}

fn init_logging() {
    let _ = env_logger::builder().is_test(true).try_init();
}

fn base_request() -> SessionRequest {
    init_logging();
    SessionRequest::new("192.0.2.1", "admin", SecretString::from("secret"))
        .with_profile(CompletionProfile::aggressive())
}

#[tokio::test(start_paused = true)]
async fn test_oneshot_yields_one_result_per_command_in_order() {
    let connector = FakeConnector::new([
        ("show version", "Cisco IOS Version 15.2"),
        ("show clock", "12:00:00 UTC"),
    ]);
    let request = base_request()
        .with_command(Command::new("show version"))
        .with_command(Command::new("show clock"))
        .with_command(Command::new("show version"));

    let outcome =
        SessionDriver::spawn_with(request, connector, None::<NoCollaborator>, temp_store())
            .wait()
            .await;

    assert!(outcome.success);
    assert!(outcome.connection_error.is_none());
    assert_eq!(outcome.results.len(), 3);
    assert_eq!(outcome.results[0].command, "show version");
    assert_eq!(outcome.results[0].output, "Cisco IOS Version 15.2");
    assert_eq!(outcome.results[1].command, "show clock");
    assert_eq!(outcome.results[1].output, "12:00:00 UTC");
    // Duplicates run again; their results are separate.
    assert_eq!(outcome.results[2].output, "Cisco IOS Version 15.2");
}

#[tokio::test(start_paused = true)]
async fn test_empty_output_is_success() {
    let connector = FakeConnector::new([("configure terminal", "")]);
    let request = base_request().with_command(Command::new("configure terminal"));

    let outcome =
        SessionDriver::spawn_with(request, connector, None::<NoCollaborator>, temp_store())
            .wait()
            .await;

    assert!(outcome.success);
    assert_eq!(outcome.results.len(), 1);
    assert!(outcome.results[0].success);
    assert_eq!(outcome.results[0].output, "");
}

#[tokio::test(start_paused = true)]
async fn test_connect_failure_is_atomic() {
    let request = base_request().with_command(Command::new("show version"));

    let outcome = SessionDriver::spawn_with(
        request,
        FakeConnector::refusing(),
        None::<NoCollaborator>,
        temp_store(),
    )
    .wait()
    .await;

    assert!(!outcome.success);
    assert!(outcome.results.is_empty());
    let error = outcome.connection_error.expect("connect error recorded");
    assert!(error.contains("connection failed"), "got: {error}");
}

#[tokio::test(start_paused = true)]
async fn test_mid_session_disconnect_keeps_partial_results() {
    let connector = FakeConnector::new([
        ("show version", "Cisco IOS Version 15.2"),
        ("show clock", "12:00:00 UTC"),
    ])
    .failing_after(1);
    let request = base_request()
        .with_command(Command::new("show version"))
        .with_command(Command::new("show clock"))
        .with_command(Command::new("show ip route"));

    let outcome =
        SessionDriver::spawn_with(request, connector, None::<NoCollaborator>, temp_store())
            .wait()
            .await;

    assert!(!outcome.success);
    assert_eq!(outcome.results.len(), 1);
    assert_eq!(outcome.results[0].output, "Cisco IOS Version 15.2");
    let error = outcome.connection_error.expect("disconnect recorded");
    assert!(error.contains("connection lost"), "got: {error}");
}

#[tokio::test(start_paused = true)]
async fn test_hard_timeout_marks_result_failed_but_keeps_capture() {
    let connector = FakeConnector::new([]);
    let request = base_request().with_command(Command::new("show tech-support"));

    let outcome =
        SessionDriver::spawn_with(request, connector, None::<NoCollaborator>, temp_store())
            .wait()
            .await;

    // A slow command is a command-level failure, not a session-level one.
    assert!(outcome.success);
    assert_eq!(outcome.results.len(), 1);
    let result = &outcome.results[0];
    assert!(!result.success);
    assert!(result.output.contains("flood line"));
    let error = result.error.as_deref().expect("timeout recorded");
    assert!(error.contains("did not complete"), "got: {error}");
}

#[tokio::test(start_paused = true)]
async fn test_events_end_with_exactly_one_closed() {
    let connector = FakeConnector::new([("show clock", "12:00:00 UTC")]);
    let request = base_request().with_command(Command::new("show clock"));

    let mut handle =
        SessionDriver::spawn_with(request, connector, None::<NoCollaborator>, temp_store());

    let mut closed = 0;
    let mut results = 0;
    while let Some(event) = handle.next_event().await {
        match event {
            SessionEvent::Closed => closed += 1,
            SessionEvent::Result(_) => results += 1,
            _ => {}
        }
    }
    assert_eq!(closed, 1);
    assert_eq!(results, 1);
    assert!(handle.wait().await.success);
}

#[tokio::test(start_paused = true)]
async fn test_loop_cancel_after_first_frame() {
    let connector = FakeConnector::new([("show clock", "12:00:00 UTC")]);
    let request = base_request()
        .with_command(Command::new("show clock"))
        .with_loop_interval(30);

    let mut handle =
        SessionDriver::spawn_with(request, connector, None::<NoCollaborator>, temp_store());

    let mut frames = 0;
    while let Some(event) = handle.next_event().await {
        if let SessionEvent::Frame(frame) = event {
            frames += 1;
            assert!(frame.combined_text.contains(">>> show clock"));
            assert!(frame.combined_text.contains("12:00:00 UTC"));
            handle.cancel();
        }
    }

    assert_eq!(frames, 1);
    let outcome = handle.wait().await;
    assert!(outcome.success);
    assert!(outcome.results.is_empty());
}

#[tokio::test(start_paused = true)]
async fn test_loop_mode_never_applies_config() {
    let log = ManagedLog::default();
    let managed = FakeManagedConnector {
        log: log.clone(),
        running_config: "hostname sw1".to_string(),
    };
    let connector = FakeConnector::new([("show clock", "12:00:00 UTC")]);
    let request = base_request()
        .with_command(Command::new("show clock"))
        .with_config_lines(vec!["hostname rogue".to_string()])
        .with_loop_interval(30);

    let mut handle = SessionDriver::spawn_with(request, connector, Some(managed), temp_store());

    let mut warned = false;
    let mut frames = 0;
    while let Some(event) = handle.next_event().await {
        match event {
            SessionEvent::Log(line) if line.contains("not allowed") => warned = true,
            SessionEvent::Frame(_) => {
                frames += 1;
                handle.cancel();
            }
            _ => {}
        }
    }

    // The config request is warned about and dropped; the collaborator is
    // never even connected, and polling proceeds normally.
    assert!(warned);
    assert_eq!(frames, 1);
    assert!(log.config_sets.lock().unwrap().is_empty());
    assert!(log.commands.lock().unwrap().is_empty());

    let outcome = handle.wait().await;
    assert!(outcome.success);
    assert!(outcome.backup.is_none());
}

#[tokio::test(start_paused = true)]
async fn test_config_phase_backs_up_then_applies() {
    let log = ManagedLog::default();
    let managed = FakeManagedConnector {
        log: log.clone(),
        running_config: "hostname sw1\ninterface Gi0/1\n no shutdown".to_string(),
    };
    let lines = vec![
        "interface Gi0/2".to_string(),
        "description uplink".to_string(),
        "no shutdown".to_string(),
    ];
    let request = base_request()
        .with_config_lines(lines.clone())
        .with_write_after_config();

    let mut handle = SessionDriver::spawn_with(
        request,
        FakeConnector::new([]),
        Some(managed),
        temp_store(),
    );

    let mut backup_seen = false;
    while let Some(event) = handle.next_event().await {
        if let SessionEvent::BackupSaved(record) = event {
            backup_seen = true;
            assert_eq!(record.host, "192.0.2.1");
            let saved = std::fs::read_to_string(&record.path).unwrap();
            assert!(saved.contains("hostname sw1"));
        }
    }

    let outcome = handle.wait().await;
    assert!(outcome.success, "error: {:?}", outcome.connection_error);
    assert!(backup_seen);
    assert!(outcome.backup.is_some());

    assert_eq!(log.config_sets.lock().unwrap().as_slice(), &[lines]);
    // Backup capture first, then the vendor save command.
    let commands = log.commands.lock().unwrap();
    assert_eq!(
        commands.as_slice(),
        &["show running-config", "write memory"]
    );
}

#[tokio::test(start_paused = true)]
async fn test_config_without_collaborator_fails() {
    let request = base_request().with_config_lines(vec!["hostname sw2".to_string()]);

    let outcome = SessionDriver::spawn_with(
        request,
        FakeConnector::new([]),
        None::<NoCollaborator>,
        temp_store(),
    )
    .wait()
    .await;

    assert!(!outcome.success);
    assert!(outcome.backup.is_none());
    let error = outcome.connection_error.expect("phase error recorded");
    assert!(error.contains("collaborator"), "got: {error}");
}

#[test]
fn test_result_model_round_trips_as_json() {
    let result = CommandResult::ok("show version", "Cisco IOS Version 15.2");
    let json = serde_json::to_value(&result).unwrap();
    assert_eq!(json["command"], "show version");
    assert_eq!(json["output"], "Cisco IOS Version 15.2");
    assert_eq!(json["success"], true);
    assert!(json["error"].is_null());

    let back: CommandResult = serde_json::from_value(json).unwrap();
    assert_eq!(back.command, result.command);

    let mode: SessionMode = serde_json::from_str(r#"{"loop":{"interval_secs":5}}"#).unwrap();
    assert_eq!(mode, SessionMode::Loop { interval_secs: 5 });
    assert_eq!(serde_json::to_string(&SessionMode::Oneshot).unwrap(), "\"oneshot\"");
}

#[tokio::test(start_paused = true)]
async fn test_restore_backup_counts_applied_lines() {
    init_logging();
    let store = temp_store();
    let record = store
        .save("192.0.2.1", "hostname sw1\n\ninterface Gi0/1\n no shutdown\n")
        .unwrap();

    let log = ManagedLog::default();
    let mut session = FakeManaged {
        log: log.clone(),
        running_config: String::new(),
    };

    let report = restore_backup(&mut session, &store, &record).await.unwrap();

    // Blank lines are dropped; everything else replays in order.
    assert_eq!(report.applied_lines, 3);
    assert!(report.errors.is_empty());
    assert_eq!(
        log.config_sets.lock().unwrap().as_slice(),
        &[vec![
            "hostname sw1".to_string(),
            "interface Gi0/1".to_string(),
            " no shutdown".to_string(),
        ]]
    );
}

fn temp_store() -> BackupStore {
    // Leak the tempdir handle so the directory outlives the session worker.
    let dir = Box::leak(Box::new(tempfile::tempdir().unwrap()));
    BackupStore::new(dir.path())
}
