//! Configuration types and structures.
//!
//! [`Config`] is the fully resolved record. [`ConfigLayer`] is the partial
//! form of the same record as it appears in a single file of the priority
//! chain: every field is optional so the merge engine can tell "absent" from
//! "set to the default".
//!
//! Field names on disk are camelCase. Unknown top-level keys are kept in
//! `extra` instead of being dropped.

use crate::environment::EnvMode;
use crate::health::HealthReport;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::BTreeMap;
use std::path::PathBuf;

/// Schema version written by this crate.
pub const SCHEMA_VERSION: &str = "1.0.0";

fn default_version() -> String {
    SCHEMA_VERSION.to_string()
}

/// Root persisted configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Config {
    /// Schema version (`x.y.z`).
    #[serde(default = "default_version")]
    pub version: String,

    #[serde(default)]
    pub initialized: bool,

    /// Installed templates by id.
    #[serde(default)]
    pub templates: BTreeMap<String, TemplateConfig>,

    #[serde(default)]
    pub sync: SyncConfig,

    /// Feature flags by name.
    #[serde(default)]
    pub features: BTreeMap<String, bool>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub environment: Option<EnvironmentConfig>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub validation: Option<ValidationConfig>,

    /// Top-level keys this schema does not know about.
    #[serde(flatten)]
    pub extra: BTreeMap<String, Value>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            version: default_version(),
            initialized: false,
            templates: BTreeMap::new(),
            sync: SyncConfig::default(),
            features: BTreeMap::new(),
            environment: None,
            validation: None,
            extra: BTreeMap::new(),
        }
    }
}

impl Config {
    /// Names of enabled features, sorted.
    pub fn enabled_features(&self) -> Vec<String> {
        self.features
            .iter()
            .filter(|(_, enabled)| **enabled)
            .map(|(name, _)| name.clone())
            .collect()
    }
}

/// How sync conflicts are settled.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ConflictResolution {
    Local,
    Remote,
    Prompt,
    Merge,
}

/// Sync policy.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SyncConfig {
    /// Remote locator.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub remote: Option<String>,

    /// RFC 3339 timestamp of the last recorded sync.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_sync: Option<String>,

    #[serde(default)]
    pub auto_sync: bool,

    /// Interval in milliseconds.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sync_interval: Option<u64>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub conflict_resolution: Option<ConflictResolution>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub backup_before_sync: Option<bool>,
}

/// Directories attached to a resolved environment.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct EnvironmentPaths {
    #[serde(default)]
    pub config: PathBuf,
    #[serde(default)]
    pub templates: PathBuf,
    #[serde(default)]
    pub cache: PathBuf,
    #[serde(default)]
    pub logs: PathBuf,
}

/// Security settings attached to a resolved environment.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SecurityConfig {
    #[serde(default)]
    pub encryption_enabled: bool,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub key_store_path: Option<PathBuf>,

    /// Allow-list of trusted sources.
    #[serde(default)]
    pub trusted_sources: Vec<String>,
}

/// Environment snapshot stored in the resolved configuration.
///
/// Recomputed on every resolution; only an override layer can change it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EnvironmentConfig {
    pub name: String,
    #[serde(rename = "type")]
    pub kind: EnvMode,
    /// Prefix-filtered process variables.
    #[serde(default)]
    pub variables: BTreeMap<String, String>,
    #[serde(default)]
    pub paths: EnvironmentPaths,
    #[serde(default)]
    pub security: SecurityConfig,
}

/// Kind of a custom validation rule.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RuleKind {
    Required,
    Format,
    Range,
    Custom,
}

/// User-declared validation rule.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ValidationRule {
    pub field: String,
    #[serde(rename = "type")]
    pub kind: RuleKind,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub value: Option<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
}

/// Validation policy.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ValidationConfig {
    #[serde(default)]
    pub strict_mode: bool,
    #[serde(default)]
    pub custom_rules: Vec<ValidationRule>,
    /// Fields excluded from validation.
    #[serde(default)]
    pub skip_validation: Vec<String>,
}

/// Declared type of a template variable.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum VariableType {
    String,
    Number,
    Boolean,
    Array,
    Object,
}

/// Template variable definition.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TemplateVariable {
    #[serde(rename = "type")]
    pub kind: VariableType,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub default: Option<Value>,
    #[serde(default)]
    pub required: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
}

/// Comparison used by a conditional template file.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum ConditionOperator {
    Equals,
    NotEquals,
    Contains,
}

/// Condition gating a template file on a variable value.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FileCondition {
    pub variable: String,
    pub operator: ConditionOperator,
    pub value: Value,
}

/// One file produced by a template.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TemplateFile {
    pub path: String,
    #[serde(default)]
    pub content: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub permissions: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub encoding: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub conditional: Option<FileCondition>,
}

/// Supported schema range of a template.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Compatibility {
    pub min_version: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_version: Option<String>,
}

/// Template descriptor, as stored under `templates.<id>`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TemplateConfig {
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub description: String,
    #[serde(default = "default_version")]
    pub version: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub author: Option<String>,
    #[serde(default)]
    pub files: Vec<TemplateFile>,
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub variables: BTreeMap<String, TemplateVariable>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub dependencies: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub compatibility: Option<Compatibility>,
}

// ---------------------------------------------------------------------------
// Partial layers
// ---------------------------------------------------------------------------

/// Sync policy as supplied by a single layer.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SyncLayer {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub remote: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_sync: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub auto_sync: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sync_interval: Option<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub conflict_resolution: Option<ConflictResolution>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub backup_before_sync: Option<bool>,
}

/// Environment block as supplied by a single layer.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct EnvironmentLayer {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(default, rename = "type", skip_serializing_if = "Option::is_none")]
    pub kind: Option<EnvMode>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub variables: Option<BTreeMap<String, String>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub paths: Option<EnvironmentPaths>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub security: Option<SecurityConfig>,
}

/// Validation policy as supplied by a single layer.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ValidationLayer {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub strict_mode: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub custom_rules: Option<Vec<ValidationRule>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub skip_validation: Option<Vec<String>>,
}

/// One configuration fragment: the content of a single chain file.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ConfigLayer {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub version: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub initialized: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub templates: Option<BTreeMap<String, TemplateConfig>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sync: Option<SyncLayer>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub features: Option<BTreeMap<String, bool>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub environment: Option<EnvironmentLayer>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub validation: Option<ValidationLayer>,
    #[serde(flatten)]
    pub extra: BTreeMap<String, Value>,
}

impl ConfigLayer {
    /// Fill every absent field with its default to produce a full record.
    pub fn into_config(self) -> Config {
        let defaults = Config::default();
        Config {
            version: self.version.unwrap_or(defaults.version),
            initialized: self.initialized.unwrap_or(defaults.initialized),
            templates: self.templates.unwrap_or_default(),
            sync: self.sync.map(SyncConfig::from).unwrap_or_default(),
            features: self.features.unwrap_or_default(),
            environment: self.environment.map(EnvironmentConfig::from),
            validation: self.validation.map(ValidationConfig::from),
            extra: self.extra,
        }
    }
}

impl From<Config> for ConfigLayer {
    fn from(config: Config) -> Self {
        Self {
            version: Some(config.version),
            initialized: Some(config.initialized),
            templates: Some(config.templates),
            sync: Some(config.sync.into()),
            features: Some(config.features),
            environment: config.environment.map(EnvironmentLayer::from),
            validation: config.validation.map(ValidationLayer::from),
            extra: config.extra,
        }
    }
}

impl From<SyncConfig> for SyncLayer {
    fn from(sync: SyncConfig) -> Self {
        Self {
            remote: sync.remote,
            last_sync: sync.last_sync,
            auto_sync: Some(sync.auto_sync),
            sync_interval: sync.sync_interval,
            conflict_resolution: sync.conflict_resolution,
            backup_before_sync: sync.backup_before_sync,
        }
    }
}

impl From<SyncLayer> for SyncConfig {
    fn from(layer: SyncLayer) -> Self {
        Self {
            remote: layer.remote,
            last_sync: layer.last_sync,
            auto_sync: layer.auto_sync.unwrap_or(false),
            sync_interval: layer.sync_interval,
            conflict_resolution: layer.conflict_resolution,
            backup_before_sync: layer.backup_before_sync,
        }
    }
}

impl From<EnvironmentConfig> for EnvironmentLayer {
    fn from(env: EnvironmentConfig) -> Self {
        Self {
            name: Some(env.name),
            kind: Some(env.kind),
            variables: Some(env.variables),
            paths: Some(env.paths),
            security: Some(env.security),
        }
    }
}

impl From<EnvironmentLayer> for EnvironmentConfig {
    fn from(layer: EnvironmentLayer) -> Self {
        let kind = layer.kind.unwrap_or_default();
        Self {
            name: layer.name.unwrap_or_else(|| kind.to_string()),
            kind,
            variables: layer.variables.unwrap_or_default(),
            paths: layer.paths.unwrap_or_default(),
            security: layer.security.unwrap_or_default(),
        }
    }
}

impl From<ValidationConfig> for ValidationLayer {
    fn from(validation: ValidationConfig) -> Self {
        Self {
            strict_mode: Some(validation.strict_mode),
            custom_rules: Some(validation.custom_rules),
            skip_validation: Some(validation.skip_validation),
        }
    }
}

impl From<ValidationLayer> for ValidationConfig {
    fn from(layer: ValidationLayer) -> Self {
        Self {
            strict_mode: layer.strict_mode.unwrap_or(false),
            custom_rules: layer.custom_rules.unwrap_or_default(),
            skip_validation: layer.skip_validation.unwrap_or_default(),
        }
    }
}

/// Summary handed to status reporting.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ConfigStatus {
    pub initialized: bool,
    /// Chain files present on disk, highest precedence first.
    pub config_files: Vec<PathBuf>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub last_sync: Option<String>,
    pub version: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub template: Option<String>,
    /// Enabled feature names.
    pub features: Vec<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub environment: Option<String>,
    pub health: HealthReport,
}
