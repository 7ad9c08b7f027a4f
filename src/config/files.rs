//! File access for priority-chain layers.
//!
//! All reads and writes are async and issued one at a time by callers. A
//! missing file is reported as `None` rather than an error, which is what
//! layered resolution needs.

use crate::error::{ConfigError, ConfigResult};
use crate::paths::{LayerSlot, PriorityChain};
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use tokio::fs;

/// A chain file found on disk, with its content or the error reading it.
#[derive(Debug)]
pub struct LayerFile {
    pub slot: LayerSlot,
    pub path: PathBuf,
    pub content: ConfigResult<String>,
}

/// Read a file, returning `None` when it does not exist.
pub async fn read_if_exists(path: &Path) -> ConfigResult<Option<String>> {
    match fs::read_to_string(path).await {
        Ok(content) => Ok(Some(content)),
        Err(e) if e.kind() == ErrorKind::NotFound => Ok(None),
        Err(e) => Err(ConfigError::read(path, e)),
    }
}

/// Read a file that must exist.
pub async fn read_required(path: &Path) -> ConfigResult<String> {
    read_if_exists(path)
        .await?
        .ok_or_else(|| ConfigError::not_found(path))
}

/// Whether a path exists. I/O errors count as absent.
pub async fn exists(path: &Path) -> bool {
    fs::try_exists(path).await.unwrap_or(false)
}

/// Chain files present on disk, highest precedence first.
pub async fn present_files(chain: &PriorityChain) -> Vec<PathBuf> {
    let mut present = Vec::new();
    for path in chain.ordered() {
        if exists(path).await {
            present.push(path.to_path_buf());
        }
    }
    present
}

/// Write `content` to `path` atomically.
///
/// Parent directories are created. Content goes to a hidden sibling temp
/// file first and is renamed over the target, so readers never observe a
/// partially written file.
pub async fn write_atomic(path: &Path, content: &[u8]) -> ConfigResult<()> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        fs::create_dir_all(parent)
            .await
            .map_err(|e| ConfigError::write(path, e))?;
    }

    let temp_path = temp_path_for(path);
    if let Err(e) = fs::write(&temp_path, content).await {
        let _ = fs::remove_file(&temp_path).await;
        return Err(ConfigError::write(path, e));
    }

    if let Err(e) = fs::rename(&temp_path, path).await {
        let _ = fs::remove_file(&temp_path).await;
        return Err(ConfigError::write(path, e));
    }

    Ok(())
}

/// Remove a file, treating "already gone" as success.
pub async fn remove_if_exists(path: &Path) -> ConfigResult<()> {
    match fs::remove_file(path).await {
        Ok(()) => Ok(()),
        Err(e) if e.kind() == ErrorKind::NotFound => Ok(()),
        Err(e) => Err(ConfigError::write(path, e)),
    }
}

fn temp_path_for(path: &Path) -> PathBuf {
    let name = path
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_default();
    path.with_file_name(format!(".{}.{}.tmp", name, std::process::id()))
}

/// Read every chain file that exists, lowest precedence first.
///
/// Unreadable files are returned with their error so the caller can decide
/// whether to skip them.
pub async fn read_chain(chain: &PriorityChain) -> Vec<LayerFile> {
    let mut files = Vec::new();
    for (slot, path) in chain.fold_order() {
        let content = match read_if_exists(path).await {
            Ok(Some(content)) => Ok(content),
            Ok(None) => continue,
            Err(e) => Err(e),
        };
        files.push(LayerFile {
            slot,
            path: path.to_path_buf(),
            content,
        });
    }
    files
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::environment::EnvMode;
    use crate::format::ConfigFormat;
    use crate::paths::AppDirs;
    use tempfile::TempDir;

    #[tokio::test]
    async fn test_read_if_exists() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join("a.yml");
        assert_eq!(read_if_exists(&path).await.unwrap(), None);

        std::fs::write(&path, "x: 1\n").unwrap();
        assert_eq!(read_if_exists(&path).await.unwrap().as_deref(), Some("x: 1\n"));
    }

    #[tokio::test]
    async fn test_read_required_not_found() {
        let temp = TempDir::new().unwrap();
        let err = read_required(&temp.path().join("missing.json")).await.unwrap_err();
        assert!(matches!(err, ConfigError::NotFound { .. }));
    }

    #[tokio::test]
    async fn test_write_atomic_creates_parents_and_leaves_no_temp() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join("nested/dir/config.yml");
        write_atomic(&path, b"version: 1.0.0\n").await.unwrap();
        write_atomic(&path, b"version: 2.0.0\n").await.unwrap();

        assert_eq!(std::fs::read_to_string(&path).unwrap(), "version: 2.0.0\n");
        let entries: Vec<_> = std::fs::read_dir(path.parent().unwrap())
            .unwrap()
            .flatten()
            .collect();
        assert_eq!(entries.len(), 1);
    }

    #[tokio::test]
    async fn test_write_atomic_reports_target_path() {
        let temp = TempDir::new().unwrap();
        // A regular file where a directory is expected
        let blocker = temp.path().join("blocker");
        std::fs::write(&blocker, "").unwrap();
        let target = blocker.join("config.yml");

        let err = write_atomic(&target, b"x").await.unwrap_err();
        assert!(matches!(err, ConfigError::Write { .. }));
        assert_eq!(err.path(), Some(target.as_path()));
    }

    #[tokio::test]
    async fn test_chain_presence_and_order() {
        let temp = TempDir::new().unwrap();
        let dirs = AppDirs::new(temp.path().join("project"), temp.path().join("home"));
        let chain = dirs.chain(EnvMode::Development, ConfigFormat::Yaml);

        std::fs::create_dir_all(chain.global.parent().unwrap()).unwrap();
        std::fs::create_dir_all(chain.local.parent().unwrap()).unwrap();
        std::fs::write(&chain.global, "global: true\n").unwrap();
        std::fs::write(&chain.override_file, "local: true\n").unwrap();

        let present = present_files(&chain).await;
        assert_eq!(present, vec![chain.override_file.clone(), chain.global.clone()]);

        let files = read_chain(&chain).await;
        let slots: Vec<LayerSlot> = files.iter().map(|f| f.slot).collect();
        assert_eq!(slots, vec![LayerSlot::Global, LayerSlot::Override]);
        assert_eq!(files[0].content.as_deref().unwrap(), "global: true\n");
    }

    #[tokio::test]
    async fn test_remove_if_exists() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join("gone.yml");
        remove_if_exists(&path).await.unwrap();
        std::fs::write(&path, "").unwrap();
        remove_if_exists(&path).await.unwrap();
        assert!(!path.exists());
    }
}
