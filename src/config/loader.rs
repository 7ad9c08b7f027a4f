//! Layered configuration loader.
//!
//! Resolution folds the priority chain, lowest precedence first, onto the
//! default layer for the detected environment mode:
//!
//! ```text
//! environment template < global < local < environment file < override
//! ```
//!
//! A layer that cannot be read or decoded is logged and skipped; it never
//! aborts resolution. The environment block of the result is recomputed on
//! every call, keeping only the `paths` and `security` that a layer set
//! explicitly.
//!
//! All I/O is sequential: each fold step depends on the previous result.

use super::backup::{BackupEntry, BackupStore, RestoreOutcome};
use super::files::{
    exists, present_files, read_chain, read_if_exists, read_required, remove_if_exists,
    write_atomic,
};
use super::merge::{merge, merge_all};
use super::templates::TemplateCatalog;
use super::types::{
    Config, ConfigLayer, ConfigStatus, ConflictResolution, EnvironmentConfig, EnvironmentPaths,
    SCHEMA_VERSION, SecurityConfig, SyncConfig,
};
use super::validate::{ValidationResult, validate_text};
use crate::environment::{EnvMode, EnvironmentDetector};
use crate::error::{ConfigError, ConfigResult};
use crate::format::{self, ConfigFormat, with_format_extension};
use crate::health::{self, HealthReport, PresentFiles};
use crate::paths::PriorityChain;
use serde::Serialize;
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use tracing::{debug, info, warn};

/// Environment name written into the project companion file.
const LOCAL_ENV_NAME: &str = "local";

/// Options for [`ConfigLoader::save`].
#[derive(Debug, Clone, Copy, Default)]
pub struct SaveOptions {
    /// Back up the target first if it exists.
    pub backup: bool,
    /// Force the output format; the extension of the target is adjusted.
    pub format: Option<ConfigFormat>,
}

impl SaveOptions {
    pub fn with_backup() -> Self {
        Self {
            backup: true,
            format: None,
        }
    }
}

/// Files written by [`ConfigLoader::initialize`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct InitOutcome {
    pub global: PathBuf,
    pub local: PathBuf,
    /// Backup of a global file replaced under `force`.
    pub backup: Option<PathBuf>,
}

/// Locations the loader works with.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ConfigPathsInfo {
    pub mode: EnvMode,
    pub global: PathBuf,
    pub local: PathBuf,
    pub backup_dir: PathBuf,
    pub chain: PriorityChain,
}

/// Resolves, persists and maintains configuration files.
#[derive(Debug, Clone)]
pub struct ConfigLoader {
    detector: EnvironmentDetector,
    catalog: TemplateCatalog,
    backups: BackupStore,
}

impl ConfigLoader {
    pub fn new(detector: EnvironmentDetector, catalog: TemplateCatalog) -> Self {
        let backups = BackupStore::new(detector.dirs().backup_dir());
        Self {
            detector,
            catalog,
            backups,
        }
    }

    /// Loader for the current directory and process environment, with the
    /// built-in template catalog.
    pub fn discover(format: ConfigFormat) -> ConfigResult<Self> {
        Ok(Self::new(
            EnvironmentDetector::discover(format),
            TemplateCatalog::builtin()?,
        ))
    }

    pub fn detector(&self) -> &EnvironmentDetector {
        &self.detector
    }

    pub fn detector_mut(&mut self) -> &mut EnvironmentDetector {
        &mut self.detector
    }

    pub fn catalog(&self) -> &TemplateCatalog {
        &self.catalog
    }

    pub fn backups(&self) -> &BackupStore {
        &self.backups
    }

    /// Priority chain for the detected mode.
    pub fn chain(&self) -> PriorityChain {
        self.detector.detect().paths
    }

    pub fn global_path(&self) -> PathBuf {
        self.chain().global
    }

    pub fn local_path(&self) -> PathBuf {
        self.chain().local
    }

    pub fn paths(&self) -> ConfigPathsInfo {
        let detected = self.detector.detect();
        ConfigPathsInfo {
            mode: detected.mode,
            global: detected.paths.global.clone(),
            local: detected.paths.local.clone(),
            backup_dir: self.backups.dir().to_path_buf(),
            chain: detected.paths,
        }
    }

    /// Resolve the effective configuration.
    pub async fn resolve(&self) -> ConfigResult<Config> {
        let detected = self.detector.detect();
        debug!(mode = %detected.mode, source = ?detected.source, "Resolving configuration");

        let mut layers = vec![self.detector.environment_template(detected.mode)];
        for file in read_chain(&detected.paths).await {
            let text = match file.content {
                Ok(text) => text,
                Err(e) => {
                    warn!(slot = %file.slot, path = %file.path.display(), error = %e, "Skipping unreadable layer");
                    continue;
                }
            };
            match format::decode_for_path::<ConfigLayer>(&text, &file.path) {
                Ok(layer) => {
                    debug!(slot = %file.slot, path = %file.path.display(), "Loaded layer");
                    layers.push(layer);
                }
                Err(e) => {
                    warn!(slot = %file.slot, path = %file.path.display(), error = %e, "Skipping invalid layer");
                }
            }
        }

        let mut config = merge_all(layers).into_config();
        config.environment = Some(self.attach_environment(detected.mode, config.environment.take()));
        Ok(config)
    }

    /// Fresh environment metadata, keeping merged `paths` and `security`.
    ///
    /// The environment template supplies defaults for both, so a merged
    /// value differs from the fresh one only when a layer set it.
    fn attach_environment(&self, mode: EnvMode, merged: Option<EnvironmentConfig>) -> EnvironmentConfig {
        let fresh = self.detector.environment_block(mode);
        match merged {
            Some(merged) => EnvironmentConfig {
                paths: merged.paths,
                security: merged.security,
                ..fresh
            },
            None => fresh,
        }
    }

    /// Whether `path` (default: the global file) exists.
    pub async fn exists(&self, path: Option<&Path>) -> bool {
        match path {
            Some(path) => exists(path).await,
            None => exists(&self.global_path()).await,
        }
    }

    /// Load a single file on its own (default: the global file).
    pub async fn load(&self, path: Option<&Path>) -> ConfigResult<Config> {
        let path = path.map(Path::to_path_buf).unwrap_or_else(|| self.global_path());
        let text = read_required(&path).await?;
        format::decode_config_for_path(&text, &path)
    }

    /// Save `config` (default target: the global file).
    ///
    /// Returns the path written.
    pub async fn save(
        &self,
        config: &Config,
        path: Option<&Path>,
        options: SaveOptions,
    ) -> ConfigResult<PathBuf> {
        let mut target = path.map(Path::to_path_buf).unwrap_or_else(|| self.global_path());
        if let Some(fmt) = options.format {
            target = with_format_extension(&target, fmt);
        }

        if options.backup && exists(&target).await {
            self.backups.backup(&target).await?;
        }

        let text = format::encode(config, ConfigFormat::of_path(&target))?;
        write_atomic(&target, text.as_bytes()).await?;
        info!(path = %target.display(), "Saved configuration");
        Ok(target)
    }

    /// Write the global file from a template and a project companion file.
    ///
    /// Nothing is written when the template is unknown. If the companion
    /// cannot be written the global file is put back the way it was.
    pub async fn initialize(&self, template_id: &str, force: bool) -> ConfigResult<InitOutcome> {
        let template = self.catalog.get(template_id)?.clone();
        let chain = self.chain();

        let previous = read_if_exists(&chain.global).await?;
        if previous.is_some() && !force {
            return Err(ConfigError::already_exists(&chain.global));
        }

        let mut config = default_config();
        config.templates.insert(template_id.to_string(), template);

        let backup = if previous.is_some() {
            Some(self.backups.backup(&chain.global).await?)
        } else {
            None
        };
        self.save(&config, Some(&chain.global), SaveOptions::default())
            .await?;

        let companion = self.local_companion(config);
        if let Err(e) = self
            .save(&companion, Some(&chain.local), SaveOptions::default())
            .await
        {
            warn!(path = %chain.local.display(), error = %e, "Companion write failed, reverting global file");
            self.revert(&chain.global, previous).await;
            return Err(e);
        }

        info!(template = %template_id, global = %chain.global.display(), "Initialized configuration");
        Ok(InitOutcome {
            global: chain.global,
            local: chain.local,
            backup,
        })
    }

    async fn revert(&self, path: &Path, previous: Option<String>) {
        let result = match previous {
            Some(content) => write_atomic(path, content.as_bytes()).await,
            None => remove_if_exists(path).await,
        };
        if let Err(e) = result {
            warn!(path = %path.display(), error = %e, "Failed to revert");
        }
    }

    fn local_companion(&self, mut config: Config) -> Config {
        let project = &self.detector.dirs().project_dir;
        config.sync.auto_sync = false;
        config.environment = Some(EnvironmentConfig {
            name: LOCAL_ENV_NAME.to_string(),
            kind: EnvMode::Development,
            variables: BTreeMap::new(),
            paths: EnvironmentPaths {
                config: project.clone(),
                templates: project.join("templates"),
                cache: project.join(".cache"),
                logs: project.join("logs"),
            },
            security: SecurityConfig::default(),
        });
        config
    }

    /// Status summary with health.
    pub async fn status(&self) -> ConfigResult<ConfigStatus> {
        let chain = self.chain();
        let config_files = present_files(&chain).await;
        if config_files.is_empty() {
            return Ok(ConfigStatus {
                initialized: false,
                config_files,
                last_sync: None,
                version: SCHEMA_VERSION.to_string(),
                template: None,
                features: Vec::new(),
                environment: None,
                health: HealthReport::not_initialized(),
            });
        }

        let config = self.resolve().await?;
        let files = PresentFiles {
            primary: config_files.contains(&chain.global),
            secondary: config_files.contains(&chain.local),
        };

        Ok(ConfigStatus {
            initialized: config.initialized,
            config_files,
            last_sync: config.sync.last_sync.clone(),
            version: config.version.clone(),
            template: config.templates.keys().next().cloned(),
            features: config.enabled_features(),
            environment: config.environment.as_ref().map(|e| e.name.clone()),
            health: health::evaluate(&config, files),
        })
    }

    /// Back up the global file.
    pub async fn create_backup(&self) -> ConfigResult<PathBuf> {
        self.backups.backup(&self.global_path()).await
    }

    pub async fn list_backups(&self) -> ConfigResult<Vec<BackupEntry>> {
        self.backups.list().await
    }

    /// Restore a backup (default destination: the global file).
    pub async fn restore_from_backup(
        &self,
        backup: &Path,
        dest: Option<&Path>,
    ) -> ConfigResult<RestoreOutcome> {
        let dest = dest.map(Path::to_path_buf).unwrap_or_else(|| self.global_path());
        self.backups.restore(backup, &dest).await
    }

    /// Write the global file in `target` format next to the original.
    ///
    /// Returns the new path.
    pub async fn convert_format(&self, target: ConfigFormat) -> ConfigResult<PathBuf> {
        let source = self.global_path();
        let dest = with_format_extension(&source, target);
        self.convert_file(&source, &dest).await
    }

    /// Re-encode `source` into `dest`, formats chosen by extension.
    pub async fn convert_file(&self, source: &Path, dest: &Path) -> ConfigResult<PathBuf> {
        let config = self.load(Some(source)).await?;
        let written = self.save(&config, Some(dest), SaveOptions::default()).await?;
        info!(from = %source.display(), to = %written.display(), "Converted configuration");
        Ok(written)
    }

    /// Fold existing `paths` in order onto the defaults and save to `output`.
    ///
    /// Missing inputs are skipped; undecodable ones fail the merge.
    pub async fn merge_files(&self, paths: &[PathBuf], output: &Path) -> ConfigResult<PathBuf> {
        let mut merged = ConfigLayer::from(default_config());
        for path in paths {
            let Some(text) = read_if_exists(path).await? else {
                debug!(path = %path.display(), "Skipping missing merge input");
                continue;
            };
            let layer: ConfigLayer = format::decode_for_path(&text, path)?;
            merged = merge(merged, layer);
        }
        self.save(&merged.into_config(), Some(output), SaveOptions::default())
            .await
    }

    /// Stamp `sync.lastSync` (and optionally `sync.remote`) on the global file.
    pub async fn record_sync(&self, remote: Option<&str>) -> ConfigResult<Config> {
        let path = self.global_path();
        let mut config = self.load(Some(&path)).await?;
        config.sync.last_sync = Some(chrono::Utc::now().to_rfc3339());
        if let Some(remote) = remote {
            config.sync.remote = Some(remote.to_string());
        }
        self.save(&config, Some(&path), SaveOptions::default()).await?;
        Ok(config)
    }

    /// Validate a file (default: the global file).
    pub async fn validate(&self, path: Option<&Path>) -> ConfigResult<ValidationResult> {
        let path = path.map(Path::to_path_buf).unwrap_or_else(|| self.global_path());
        let text = read_required(&path).await?;
        Ok(validate_text(&text, &path))
    }
}

/// Skeleton written by `initialize` and used as the base for merges.
pub fn default_config() -> Config {
    Config {
        version: SCHEMA_VERSION.to_string(),
        initialized: true,
        templates: BTreeMap::new(),
        sync: SyncConfig {
            auto_sync: false,
            conflict_resolution: Some(ConflictResolution::Prompt),
            backup_before_sync: Some(true),
            ..SyncConfig::default()
        },
        features: BTreeMap::from([
            ("autoComplete".to_string(), true),
            ("backup".to_string(), true),
            ("validation".to_string(), true),
        ]),
        environment: None,
        validation: None,
        extra: BTreeMap::new(),
    }
}
