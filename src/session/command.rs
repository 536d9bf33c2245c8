//! Session request and result data model.

use chrono::{DateTime, Local};
use secrecy::SecretString;
use serde::{Deserialize, Serialize};

use crate::backup::BackupRecord;
use crate::codec::CompletionProfile;

/// One operator command to issue on the device.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Command {
    /// Optional human-readable label.
    pub description: Option<String>,

    /// The command text, sent verbatim plus a line terminator.
    pub text: String,
}

impl Command {
    /// Create an unlabeled command.
    pub fn new(text: impl Into<String>) -> Self {
        Self {
            description: None,
            text: text.into(),
        }
    }

    /// Create a labeled command.
    pub fn described(description: impl Into<String>, text: impl Into<String>) -> Self {
        Self {
            description: Some(description.into()),
            text: text.into(),
        }
    }
}

/// The cleaned result of one command. Immutable once produced.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CommandResult {
    /// The command that was executed.
    pub command: String,

    /// Framed output (echo, paging debris, and trailing prompt removed).
    pub output: String,

    /// Whether the command completed normally. Empty output is success.
    pub success: bool,

    /// Error detail when `success` is false.
    pub error: Option<String>,
}

impl CommandResult {
    /// A successful result. Empty output is valid.
    pub fn ok(command: impl Into<String>, output: impl Into<String>) -> Self {
        Self {
            command: command.into(),
            output: output.into(),
            success: true,
            error: None,
        }
    }

    /// A failed result, keeping whatever output was captured.
    pub fn failed(
        command: impl Into<String>,
        output: impl Into<String>,
        error: impl Into<String>,
    ) -> Self {
        Self {
            command: command.into(),
            output: output.into(),
            success: false,
            error: Some(error.into()),
        }
    }
}

/// How the session runs: once through the command list, or polling forever.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SessionMode {
    /// Run every command once and finish.
    Oneshot,

    /// Re-run the command list every `interval_secs` until cancelled.
    Loop { interval_secs: u64 },
}

/// Everything needed to run one session. Immutable for its lifetime.
#[derive(Debug, Clone)]
pub struct SessionRequest {
    /// Target host (hostname or IP address).
    pub host: String,

    /// SSH port.
    pub port: u16,

    /// Username for authentication.
    pub username: String,

    /// Password for authentication.
    pub password: SecretString,

    /// Show-style commands, issued strictly in order. Duplicates allowed.
    pub commands: Vec<Command>,

    /// Configuration lines to apply through the structured collaborator.
    /// Rejected in loop mode.
    pub config_lines: Vec<String>,

    /// Persist the configuration on the device after applying it.
    pub write_after_config: bool,

    /// Capture a backup before the first configuration line. On by default.
    pub backup: bool,

    /// Operating mode.
    pub mode: SessionMode,

    /// Free-form vendor hint; resolved to a profile once per session.
    pub vendor: Option<String>,

    /// Completion-detector tuning for this session.
    pub profile: CompletionProfile,
}

impl SessionRequest {
    /// A one-shot request with conservative timing and backups enabled.
    pub fn new(
        host: impl Into<String>,
        username: impl Into<String>,
        password: SecretString,
    ) -> Self {
        Self {
            host: host.into(),
            port: 22,
            username: username.into(),
            password,
            commands: Vec::new(),
            config_lines: Vec::new(),
            write_after_config: false,
            backup: true,
            mode: SessionMode::Oneshot,
            vendor: None,
            profile: CompletionProfile::default(),
        }
    }

    /// Append a show-style command.
    pub fn with_command(mut self, command: Command) -> Self {
        self.commands.push(command);
        self
    }

    /// Set the configuration lines to apply.
    pub fn with_config_lines(mut self, lines: Vec<String>) -> Self {
        self.config_lines = lines;
        self
    }

    /// Set the vendor hint.
    pub fn with_vendor(mut self, hint: impl Into<String>) -> Self {
        self.vendor = Some(hint.into());
        self
    }

    /// Switch to loop mode with the given polling interval.
    pub fn with_loop_interval(mut self, interval_secs: u64) -> Self {
        self.mode = SessionMode::Loop { interval_secs };
        self
    }

    /// Override the completion-detector tuning.
    pub fn with_profile(mut self, profile: CompletionProfile) -> Self {
        self.profile = profile;
        self
    }

    /// Disable the pre-change backup.
    pub fn without_backup(mut self) -> Self {
        self.backup = false;
        self
    }

    /// Persist the configuration after applying it.
    pub fn with_write_after_config(mut self) -> Self {
        self.write_after_config = true;
        self
    }
}

/// Terminal value of a one-shot session.
#[derive(Debug, Clone, Serialize)]
pub struct SessionOutcome {
    /// False when the session failed at the connection or config level.
    pub success: bool,

    /// Results in command order. Preserved even on mid-session failure.
    pub results: Vec<CommandResult>,

    /// Human-readable session-level error, when `success` is false.
    pub connection_error: Option<String>,

    /// The pre-change backup, when one was taken.
    pub backup: Option<BackupRecord>,
}

impl SessionOutcome {
    pub(crate) fn failed(
        results: Vec<CommandResult>,
        error: impl Into<String>,
        backup: Option<BackupRecord>,
    ) -> Self {
        Self {
            success: false,
            results,
            connection_error: Some(error.into()),
            backup,
        }
    }
}

/// One loop-mode cycle's combined output for all commands.
///
/// Consumers replace the previously displayed frame with each new one;
/// frames are whole replacement units, never merged.
#[derive(Debug, Clone, Serialize)]
pub struct LoopFrame {
    /// When the cycle ran.
    pub timestamp: DateTime<Local>,

    /// Concatenated output of every command in the cycle.
    pub combined_text: String,
}
