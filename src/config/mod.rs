//! Layered configuration system.
//!
//! Resolves one effective [`Config`] from up to four files, highest
//! precedence first:
//! 1. **Override** - `agent.config.local.<ext>` in the project
//! 2. **Environment** - `agent.config.<mode>.<ext>` in the project
//! 3. **Local** - `agent.config.<ext>` in the project
//! 4. **Global** - `~/.config/agent-config/config.<ext>`
//!
//! The files are folded onto a default layer for the detected environment
//! mode (see [`crate::environment`]).
//!
//! ## Merge Strategy
//! - Scalars and unknown keys: higher layer replaces
//! - `templates`, `features`: keyed union
//! - `sync`, `environment`, `validation`: field-wise union, one level deep
//!
//! ## Persistence
//! - Saves are atomic (temp file + rename)
//! - Backups are timestamped and pruned to the ten most recent
//! - Restores validate the backup before touching the destination

pub mod backup;
pub mod files;
mod loader;
mod merge;
pub mod templates;
mod types;
pub mod validate;

pub use backup::{BackupEntry, BackupStore, MAX_BACKUPS, RestoreOutcome};
pub use loader::{ConfigLoader, ConfigPathsInfo, InitOutcome, SaveOptions, default_config};
pub use merge::{merge, merge_all};
pub use templates::TemplateCatalog;
pub use types::*;
pub use validate::{Severity, ValidationIssue, ValidationMetadata, ValidationResult};
