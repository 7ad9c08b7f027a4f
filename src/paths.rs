//! Configuration file locations.
//!
//! A [`PriorityChain`] names the four candidate files for one environment
//! mode. Precedence is fixed, highest first:
//!
//! 1. **Override** - `<project>/agent.config.local.<ext>`
//! 2. **Environment** - `<project>/agent.config.<mode>.<ext>`
//! 3. **Local** - `<project>/agent.config.<ext>`
//! 4. **Global** - `<home>/.config/agent-config/config.<ext>`
//!
//! Each slot is independent: a missing file is skipped, never an error.

use crate::environment::EnvMode;
use crate::format::ConfigFormat;
use serde::Serialize;
use std::fmt;
use std::path::{Path, PathBuf};

/// Directory name used under the user's config, cache and data roots.
pub const APP_DIR_NAME: &str = "agent-config";

/// Subdirectory of the global config dir holding backups.
pub const BACKUP_DIR_NAME: &str = "backups";

/// One slot of the priority chain.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum LayerSlot {
    /// User-home-scoped file (lowest priority)
    Global = 0,
    /// Project-scoped file
    Local = 1,
    /// Project file suffixed with the environment mode
    Environment = 2,
    /// Explicit local override (highest priority)
    Override = 3,
}

impl LayerSlot {
    /// All slots, lowest precedence first (fold order).
    pub const FOLD_ORDER: [LayerSlot; 4] = [
        LayerSlot::Global,
        LayerSlot::Local,
        LayerSlot::Environment,
        LayerSlot::Override,
    ];
}

impl fmt::Display for LayerSlot {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            LayerSlot::Global => write!(f, "global"),
            LayerSlot::Local => write!(f, "local"),
            LayerSlot::Environment => write!(f, "environment"),
            LayerSlot::Override => write!(f, "override"),
        }
    }
}

/// Root directories the chain is derived from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AppDirs {
    /// Project directory (usually the current directory)
    pub project_dir: PathBuf,
    /// User home directory
    pub home_dir: PathBuf,
}

impl AppDirs {
    pub fn new(project_dir: impl Into<PathBuf>, home_dir: impl Into<PathBuf>) -> Self {
        Self {
            project_dir: project_dir.into(),
            home_dir: home_dir.into(),
        }
    }

    /// Discover the current directory and the user's home.
    ///
    /// Falls back to `.` for either when it cannot be determined.
    pub fn discover() -> Self {
        let project_dir = std::env::current_dir().unwrap_or_else(|_| PathBuf::from("."));
        let home_dir = dirs::home_dir().unwrap_or_else(|| PathBuf::from("."));
        Self {
            project_dir,
            home_dir,
        }
    }

    /// `<home>/.config/agent-config`
    pub fn global_dir(&self) -> PathBuf {
        self.home_dir.join(".config").join(APP_DIR_NAME)
    }

    /// `<home>/.config/agent-config/backups`
    pub fn backup_dir(&self) -> PathBuf {
        self.global_dir().join(BACKUP_DIR_NAME)
    }

    /// `<home>/.cache/agent-config`
    pub fn cache_dir(&self) -> PathBuf {
        self.home_dir.join(".cache").join(APP_DIR_NAME)
    }

    /// `<home>/.local/share/agent-config/logs`
    pub fn logs_dir(&self) -> PathBuf {
        self.home_dir
            .join(".local")
            .join("share")
            .join(APP_DIR_NAME)
            .join("logs")
    }

    /// `<project>/templates`
    pub fn templates_dir(&self) -> PathBuf {
        self.project_dir.join("templates")
    }

    /// Build the priority chain for a mode and format.
    pub fn chain(&self, mode: EnvMode, format: ConfigFormat) -> PriorityChain {
        let ext = format.extension();
        PriorityChain {
            override_file: self.project_dir.join(format!("agent.config.local.{ext}")),
            environment: self.project_dir.join(format!("agent.config.{mode}.{ext}")),
            local: self.project_dir.join(format!("agent.config.{ext}")),
            global: self.global_dir().join(format!("config.{ext}")),
        }
    }
}

/// The four candidate files for one environment mode.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PriorityChain {
    #[serde(rename = "override")]
    pub override_file: PathBuf,
    pub environment: PathBuf,
    pub local: PathBuf,
    pub global: PathBuf,
}

impl PriorityChain {
    /// Path for a slot.
    pub fn get(&self, slot: LayerSlot) -> &Path {
        match slot {
            LayerSlot::Override => &self.override_file,
            LayerSlot::Environment => &self.environment,
            LayerSlot::Local => &self.local,
            LayerSlot::Global => &self.global,
        }
    }

    /// Paths highest precedence first: override, environment, local, global.
    pub fn ordered(&self) -> [&Path; 4] {
        [
            &self.override_file,
            &self.environment,
            &self.local,
            &self.global,
        ]
    }

    /// Slots with their paths, lowest precedence first.
    pub fn fold_order(&self) -> impl Iterator<Item = (LayerSlot, &Path)> {
        LayerSlot::FOLD_ORDER
            .into_iter()
            .map(move |slot| (slot, self.get(slot)))
    }
}
