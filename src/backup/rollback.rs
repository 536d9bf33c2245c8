//! Backup capture and explicit rollback.
//!
//! The coordinator sits around configuration-changing sessions: capture the
//! full configuration through the structured collaborator before the first
//! config line goes out, and replay it later on demand. Rollback is never
//! automatic, and replaying twice only guarantees the same text is resent —
//! device-side idempotence is the device's business.

use log::{info, warn};
use serde::Serialize;

use super::store::{BackupRecord, BackupStore};
use crate::error::Result;
use crate::managed::ManagedSession;
use crate::vendor::VendorProfile;

/// Outcome of one rollback invocation.
#[derive(Debug, Clone, Serialize)]
pub struct RollbackReport {
    /// Host the backup was replayed to.
    pub host: String,

    /// Number of configuration lines applied.
    pub applied_lines: usize,

    /// Errors reported while applying, if any.
    pub errors: Vec<String>,

    /// Transcript returned by the collaborator.
    pub output: String,
}

/// Capture the device's full configuration and persist it.
pub async fn backup_running_config<M: ManagedSession>(
    session: &mut M,
    store: &BackupStore,
    host: &str,
    vendor: VendorProfile,
) -> Result<BackupRecord> {
    let captured = session.send_command(vendor.backup_command()).await?;
    store.save(host, &captured)
}

/// Replay a stored backup onto the device.
///
/// Non-blank lines are applied as one configuration set through the
/// collaborator, which may abort the batch on a device rejection; in that
/// case the error is recorded and `applied_lines` stays at zero. The caller
/// owns the session: re-opening a connection for rollback is an explicit
/// act, not something the engine does behind the scenes.
pub async fn restore_backup<M: ManagedSession>(
    session: &mut M,
    store: &BackupStore,
    record: &BackupRecord,
) -> Result<RollbackReport> {
    let text = store.load(record)?;
    let lines: Vec<String> = text
        .lines()
        .map(str::trim_end)
        .filter(|line| !line.trim().is_empty())
        .map(String::from)
        .collect();

    let mut report = RollbackReport {
        host: record.host.clone(),
        applied_lines: 0,
        errors: Vec::new(),
        output: String::new(),
    };

    info!(
        "rolling back {} ({} lines from {})",
        record.host,
        lines.len(),
        record.path.display()
    );

    match session.send_config_set(&lines).await {
        Ok(output) => {
            report.applied_lines = lines.len();
            report.output = output;
        }
        Err(e) => {
            warn!("rollback failed for {}: {e}", record.host);
            report.errors.push(e.to_string());
        }
    }

    Ok(report)
}
