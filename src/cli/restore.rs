//! Restore subcommand for agent-config CLI

use clap::Args;
use std::path::PathBuf;

/// Arguments for the restore subcommand
#[derive(Args, Debug)]
pub struct RestoreArgs {
    /// Backup file to restore, or its file name inside the backup directory
    #[arg(value_name = "BACKUP")]
    pub backup: PathBuf,

    /// Destination (default: the global configuration file)
    #[arg(long, value_name = "FILE")]
    pub to: Option<PathBuf>,
}

impl RestoreArgs {
    /// Resolve a bare file name against `backup_dir`.
    pub fn backup_path(&self, backup_dir: &std::path::Path) -> PathBuf {
        if self.backup.components().count() == 1 && !self.backup.exists() {
            backup_dir.join(&self.backup)
        } else {
            self.backup.clone()
        }
    }
}
