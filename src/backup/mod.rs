//! Pre-change configuration backups and on-demand rollback.

mod rollback;
mod store;

pub use rollback::{RollbackReport, backup_running_config, restore_backup};
pub use store::{BackupRecord, BackupStore};
