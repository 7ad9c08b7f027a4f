//! Timestamped configuration snapshots.
//!
//! Backups live in a single directory and are named
//! `<prefix>-<UTC timestamp>.<ext>`, where the timestamp is RFC 3339 with
//! microseconds and every `:` and `.` replaced by `-`. The extension follows
//! the format of the file being backed up.
//!
//! After each backup the directory is pruned to the [`MAX_BACKUPS`] most
//! recent entries. Backups are append-then-prune: a crash in between leaves
//! extra files, never missing ones.

use super::files::{exists, read_required, remove_if_exists, write_atomic};
use crate::error::{ConfigError, ConfigResult};
use crate::format::{self, ConfigFormat};
use chrono::{DateTime, SecondsFormat, TimeDelta, Utc};
use serde::Serialize;
use std::path::{Path, PathBuf};
use tracing::{debug, info, warn};

/// Number of backups retained per directory.
pub const MAX_BACKUPS: usize = 10;

/// File name prefix for backups.
pub const BACKUP_PREFIX: &str = "config-backup";

/// One snapshot on disk.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct BackupEntry {
    pub path: PathBuf,
    /// Modification time of the snapshot.
    pub created: DateTime<Utc>,
    /// Size in bytes.
    pub size: u64,
}

/// Result of a restore.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RestoreOutcome {
    pub restored_to: PathBuf,
    /// Backup of the destination taken before it was overwritten.
    pub safety_backup: Option<PathBuf>,
}

/// Backup directory with retention.
#[derive(Debug, Clone)]
pub struct BackupStore {
    dir: PathBuf,
    prefix: String,
    keep: usize,
}

impl BackupStore {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self {
            dir: dir.into(),
            prefix: BACKUP_PREFIX.to_string(),
            keep: MAX_BACKUPS,
        }
    }

    /// Override how many backups are kept.
    pub fn with_retention(mut self, keep: usize) -> Self {
        self.keep = keep;
        self
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Snapshot `source` and prune old backups.
    ///
    /// Fails with [`ConfigError::NotFound`] when `source` does not exist.
    pub async fn backup(&self, source: &Path) -> ConfigResult<PathBuf> {
        let content = read_required(source).await?;
        let ext = ConfigFormat::of_path(source).extension();
        let target = self.next_backup_path(ext).await;

        write_atomic(&target, content.as_bytes()).await?;
        info!(source = %source.display(), backup = %target.display(), "Created backup");

        self.prune().await?;
        Ok(target)
    }

    /// Pick a free backup name for the current time.
    ///
    /// On a name collision the timestamp is advanced by one microsecond so
    /// that names keep sorting chronologically.
    async fn next_backup_path(&self, ext: &str) -> PathBuf {
        let mut stamp = Utc::now();
        loop {
            let candidate = self.dir.join(self.file_name(stamp, ext));
            if !exists(&candidate).await {
                return candidate;
            }
            stamp += TimeDelta::microseconds(1);
        }
    }

    fn file_name(&self, stamp: DateTime<Utc>, ext: &str) -> String {
        let stamp = stamp
            .to_rfc3339_opts(SecondsFormat::Micros, true)
            .replace([':', '.'], "-");
        format!("{}-{}.{}", self.prefix, stamp, ext)
    }

    fn is_backup_name(&self, name: &str) -> bool {
        name.strip_prefix(self.prefix.as_str())
            .is_some_and(|rest| rest.starts_with('-'))
    }

    /// All backups, newest first.
    ///
    /// Ordered by modification time, ties broken by file name. A missing
    /// directory lists as empty.
    pub async fn list(&self) -> ConfigResult<Vec<BackupEntry>> {
        let mut dir = match tokio::fs::read_dir(&self.dir).await {
            Ok(dir) => dir,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(Vec::new()),
            Err(e) => return Err(ConfigError::read(&self.dir, e)),
        };

        let mut entries = Vec::new();
        while let Some(entry) = dir
            .next_entry()
            .await
            .map_err(|e| ConfigError::read(&self.dir, e))?
        {
            let name = entry.file_name();
            if !self.is_backup_name(&name.to_string_lossy()) {
                continue;
            }
            let meta = match entry.metadata().await {
                Ok(meta) if meta.is_file() => meta,
                Ok(_) => continue,
                Err(e) => {
                    warn!(path = %entry.path().display(), error = %e, "Skipping unreadable backup");
                    continue;
                }
            };
            let created = meta
                .modified()
                .map(DateTime::<Utc>::from)
                .unwrap_or_default();
            entries.push(BackupEntry {
                path: entry.path(),
                created,
                size: meta.len(),
            });
        }

        entries.sort_by(|a, b| {
            b.created
                .cmp(&a.created)
                .then_with(|| b.path.file_name().cmp(&a.path.file_name()))
        });
        Ok(entries)
    }

    /// Delete everything beyond the retention limit, oldest first.
    pub async fn prune(&self) -> ConfigResult<usize> {
        let entries = self.list().await?;
        let mut removed = 0;
        for entry in entries.iter().skip(self.keep) {
            remove_if_exists(&entry.path).await?;
            debug!(path = %entry.path.display(), "Pruned backup");
            removed += 1;
        }
        Ok(removed)
    }

    /// Restore `backup` over `dest`.
    ///
    /// The backup is read and decoded before the destination is touched, so
    /// an unreadable or corrupt backup leaves `dest` unchanged. An existing
    /// destination is itself backed up first. When the two files differ in
    /// format the content is re-encoded for `dest`.
    pub async fn restore(&self, backup: &Path, dest: &Path) -> ConfigResult<RestoreOutcome> {
        let text = read_required(backup).await?;
        let source_format = ConfigFormat::of_path(backup);
        let config = format::decode_config(&text, source_format, backup)?;

        let dest_format = ConfigFormat::of_path(dest);
        let content = if dest_format == source_format {
            text
        } else {
            format::encode(&config, dest_format)?
        };

        let safety_backup = if exists(dest).await {
            Some(self.backup(dest).await?)
        } else {
            None
        };

        write_atomic(dest, content.as_bytes()).await?;
        info!(backup = %backup.display(), dest = %dest.display(), "Restored configuration");

        Ok(RestoreOutcome {
            restored_to: dest.to_path_buf(),
            safety_backup,
        })
    }
}
