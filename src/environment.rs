//! Environment mode detection.
//!
//! The detector never reads the process environment on its own. It works on
//! an [`EnvVars`] snapshot handed to it at construction, normally taken once
//! at startup with [`EnvVars::from_process`].
//!
//! Mode resolution, first match wins:
//! 1. `AGENT_ENV` - normalized through a synonym table; unknown values fall
//!    back to `development` with a warning
//! 2. `APP_ENV` - only the four canonical names are honored
//! 3. Any well-known CI indicator present - `staging`
//! 4. `development`

use crate::config::{
    ConfigLayer, ConflictResolution, EnvironmentConfig, EnvironmentPaths, SCHEMA_VERSION,
    SecurityConfig, SyncLayer,
};
use crate::format::ConfigFormat;
use crate::paths::{AppDirs, PriorityChain};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use tracing::warn;

/// Explicit environment override.
pub const ENV_OVERRIDE_VAR: &str = "AGENT_ENV";

/// Generic runtime mode indicator.
pub const RUNTIME_ENV_VAR: &str = "APP_ENV";

/// Default prefix for variables surfaced into `environment.variables`.
pub const DEFAULT_VAR_PREFIX: &str = "AGENT_";

/// Variables whose presence indicates a CI run.
pub const CI_INDICATORS: [&str; 8] = [
    "CI",
    "CONTINUOUS_INTEGRATION",
    "BUILD_NUMBER",
    "GITHUB_ACTIONS",
    "GITLAB_CI",
    "CIRCLECI",
    "TRAVIS",
    "JENKINS_URL",
];

const TRUSTED_API_SOURCE: &str = "https://api.agent-config.dev";
const TRUSTED_LOCAL_SOURCE: &str = "http://localhost:*";

/// Deployment environment mode.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default, Serialize, Deserialize,
)]
#[serde(rename_all = "lowercase")]
pub enum EnvMode {
    #[default]
    Development,
    Staging,
    Production,
    Test,
}

impl EnvMode {
    pub const ALL: [EnvMode; 4] = [
        EnvMode::Development,
        EnvMode::Staging,
        EnvMode::Production,
        EnvMode::Test,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            EnvMode::Development => "development",
            EnvMode::Staging => "staging",
            EnvMode::Production => "production",
            EnvMode::Test => "test",
        }
    }

    /// Exact canonical name only.
    pub fn from_canonical(s: &str) -> Option<Self> {
        EnvMode::ALL.into_iter().find(|m| m.as_str() == s)
    }

    /// Canonical names plus synonyms, case-insensitive.
    pub fn from_alias(s: &str) -> Option<Self> {
        match s.trim().to_lowercase().as_str() {
            "dev" | "develop" | "development" => Some(EnvMode::Development),
            "stage" | "staging" => Some(EnvMode::Staging),
            "prod" | "production" => Some(EnvMode::Production),
            "test" | "testing" => Some(EnvMode::Test),
            _ => None,
        }
    }

    pub fn is_production(&self) -> bool {
        *self == EnvMode::Production
    }
}

impl fmt::Display for EnvMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Immutable snapshot of environment variables.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct EnvVars(BTreeMap<String, String>);

impl EnvVars {
    /// Capture the current process environment.
    ///
    /// Variables that are not valid Unicode are skipped.
    pub fn from_process() -> Self {
        let vars = std::env::vars_os()
            .filter_map(|(k, v)| Some((k.into_string().ok()?, v.into_string().ok()?)))
            .collect();
        Self(vars)
    }

    /// Build a snapshot from explicit pairs.
    pub fn from_pairs<K, V>(pairs: impl IntoIterator<Item = (K, V)>) -> Self
    where
        K: Into<String>,
        V: Into<String>,
    {
        let vars = pairs
            .into_iter()
            .map(|(k, v)| (k.into(), v.into()))
            .collect();
        Self(vars)
    }

    pub fn get(&self, key: &str) -> Option<&str> {
        self.0.get(key).map(String::as_str)
    }

    /// Value of `key` when present and non-empty.
    pub fn non_empty(&self, key: &str) -> Option<&str> {
        self.get(key).filter(|v| !v.is_empty())
    }

    pub fn set(&mut self, key: impl Into<String>, value: impl Into<String>) {
        self.0.insert(key.into(), value.into());
    }

    /// All variables whose name starts with `prefix` and whose value is non-empty.
    pub fn with_prefix(&self, prefix: &str) -> BTreeMap<String, String> {
        self.0
            .range(prefix.to_string()..)
            .take_while(|(k, _)| k.starts_with(prefix))
            .filter(|(_, v)| !v.is_empty())
            .map(|(k, v)| (k.clone(), v.clone()))
            .collect()
    }
}

/// How the mode was chosen.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum DetectionSource {
    /// `AGENT_ENV`
    Override,
    /// `APP_ENV`
    Runtime,
    /// A CI indicator
    Ci,
    Default,
}

/// Result of environment detection.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DetectedEnvironment {
    pub mode: EnvMode,
    pub source: DetectionSource,
    /// Raw runtime indicator, if set.
    pub runtime_env: Option<String>,
    pub paths: PriorityChain,
}

/// Detects the active mode and derives file locations for it.
#[derive(Debug, Clone)]
pub struct EnvironmentDetector {
    dirs: AppDirs,
    format: ConfigFormat,
    vars: EnvVars,
}

impl EnvironmentDetector {
    pub fn new(dirs: AppDirs, format: ConfigFormat, vars: EnvVars) -> Self {
        Self { dirs, format, vars }
    }

    /// Detector over the current directory, the user's home and the process environment.
    pub fn discover(format: ConfigFormat) -> Self {
        Self::new(AppDirs::discover(), format, EnvVars::from_process())
    }

    pub fn dirs(&self) -> &AppDirs {
        &self.dirs
    }

    pub fn format(&self) -> ConfigFormat {
        self.format
    }

    pub fn vars(&self) -> &EnvVars {
        &self.vars
    }

    /// Determine the active mode.
    pub fn detect(&self) -> DetectedEnvironment {
        let (mode, source) = self.select_mode();
        DetectedEnvironment {
            mode,
            source,
            runtime_env: self.vars.get(RUNTIME_ENV_VAR).map(str::to_string),
            paths: self.paths_for(mode),
        }
    }

    fn select_mode(&self) -> (EnvMode, DetectionSource) {
        if let Some(raw) = self.vars.non_empty(ENV_OVERRIDE_VAR) {
            let mode = EnvMode::from_alias(raw).unwrap_or_else(|| {
                warn!(value = %raw, "Unknown environment, defaulting to development");
                EnvMode::Development
            });
            return (mode, DetectionSource::Override);
        }

        if let Some(mode) = self
            .vars
            .get(RUNTIME_ENV_VAR)
            .and_then(EnvMode::from_canonical)
        {
            return (mode, DetectionSource::Runtime);
        }

        if self.is_ci() {
            return (EnvMode::Staging, DetectionSource::Ci);
        }

        (EnvMode::Development, DetectionSource::Default)
    }

    /// True when any CI indicator is set to a non-empty value.
    pub fn is_ci(&self) -> bool {
        CI_INDICATORS
            .iter()
            .any(|name| self.vars.non_empty(name).is_some())
    }

    /// The four chain files for `mode`.
    pub fn paths_for(&self, mode: EnvMode) -> PriorityChain {
        self.dirs.chain(mode, self.format)
    }

    /// Chain files for `mode` (or the detected mode), highest precedence first.
    pub fn priority_order(&self, mode: Option<EnvMode>) -> Vec<std::path::PathBuf> {
        let mode = mode.unwrap_or_else(|| self.detect().mode);
        self.paths_for(mode)
            .ordered()
            .iter()
            .map(|p| p.to_path_buf())
            .collect()
    }

    /// Variables starting with `prefix`.
    pub fn variables_with_prefix(&self, prefix: &str) -> BTreeMap<String, String> {
        self.vars.with_prefix(prefix)
    }

    /// Pin the mode for later detections on this detector.
    pub fn set_environment(&mut self, mode: EnvMode) {
        self.vars.set(ENV_OVERRIDE_VAR, mode.as_str());
        self.vars.set(RUNTIME_ENV_VAR, mode.as_str());
    }

    /// Freshly computed environment block for `mode`.
    pub fn environment_block(&self, mode: EnvMode) -> EnvironmentConfig {
        let trusted_sources = if mode.is_production() {
            vec![TRUSTED_API_SOURCE.to_string()]
        } else {
            vec![TRUSTED_API_SOURCE.to_string(), TRUSTED_LOCAL_SOURCE.to_string()]
        };

        EnvironmentConfig {
            name: mode.to_string(),
            kind: mode,
            variables: self.variables_with_prefix(DEFAULT_VAR_PREFIX),
            paths: EnvironmentPaths {
                config: self.paths_for(mode).environment,
                templates: self.dirs.templates_dir(),
                cache: self.dirs.cache_dir(),
                logs: self.dirs.logs_dir(),
            },
            security: SecurityConfig {
                encryption_enabled: mode.is_production(),
                key_store_path: None,
                trusted_sources,
            },
        }
    }

    /// Default layer for `mode`, the base every resolution folds onto.
    pub fn environment_template(&self, mode: EnvMode) -> ConfigLayer {
        let (features, sync): (Vec<(&str, bool)>, SyncLayer) = match mode {
            EnvMode::Development => (
                vec![
                    ("debug", true),
                    ("hotReload", true),
                    ("validation", true),
                    ("backup", true),
                ],
                sync_defaults(false, 300_000, ConflictResolution::Prompt, true),
            ),
            EnvMode::Staging => (
                vec![
                    ("debug", false),
                    ("hotReload", false),
                    ("validation", true),
                    ("backup", true),
                    ("monitoring", true),
                ],
                sync_defaults(true, 180_000, ConflictResolution::Remote, true),
            ),
            EnvMode::Production => (
                vec![
                    ("debug", false),
                    ("hotReload", false),
                    ("validation", true),
                    ("backup", true),
                    ("monitoring", true),
                    ("encryption", true),
                ],
                sync_defaults(true, 60_000, ConflictResolution::Remote, true),
            ),
            EnvMode::Test => (
                vec![
                    ("debug", true),
                    ("hotReload", false),
                    ("validation", false),
                    ("backup", false),
                    ("testMode", true),
                ],
                sync_defaults(false, 0, ConflictResolution::Local, false),
            ),
        };

        ConfigLayer {
            version: Some(SCHEMA_VERSION.to_string()),
            initialized: Some(true),
            templates: None,
            sync: Some(sync),
            features: Some(
                features
                    .into_iter()
                    .map(|(name, on)| (name.to_string(), on))
                    .collect(),
            ),
            environment: Some(self.environment_block(mode).into()),
            validation: None,
            extra: BTreeMap::new(),
        }
    }
}

fn sync_defaults(
    auto_sync: bool,
    interval_ms: u64,
    conflict_resolution: ConflictResolution,
    backup_before_sync: bool,
) -> SyncLayer {
    SyncLayer {
        auto_sync: Some(auto_sync),
        sync_interval: Some(interval_ms),
        conflict_resolution: Some(conflict_resolution),
        backup_before_sync: Some(backup_before_sync),
        ..SyncLayer::default()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;

    fn detector(vars: &[(&str, &str)]) -> EnvironmentDetector {
        EnvironmentDetector::new(
            AppDirs::new("/project", "/home/user"),
            ConfigFormat::Yaml,
            EnvVars::from_pairs(vars.iter().copied()),
        )
    }

    #[test]
    fn test_default_is_development() {
        let detected = detector(&[]).detect();
        assert_eq!(detected.mode, EnvMode::Development);
        assert_eq!(detected.source, DetectionSource::Default);
        assert_eq!(
            detected.paths.environment,
            PathBuf::from("/project/agent.config.development.yml")
        );
    }

    #[test]
    fn test_override_synonyms() {
        for (raw, expected) in [
            ("dev", EnvMode::Development),
            ("develop", EnvMode::Development),
            ("stage", EnvMode::Staging),
            ("prod", EnvMode::Production),
            ("PROD", EnvMode::Production),
            ("testing", EnvMode::Test),
            ("test", EnvMode::Test),
        ] {
            let detected = detector(&[(ENV_OVERRIDE_VAR, raw)]).detect();
            assert_eq!(detected.mode, expected, "alias {raw}");
            assert_eq!(detected.source, DetectionSource::Override);
        }
    }

    #[test]
    fn test_unknown_override_falls_back() {
        let detected = detector(&[(ENV_OVERRIDE_VAR, "qa"), (RUNTIME_ENV_VAR, "production")]).detect();
        assert_eq!(detected.mode, EnvMode::Development);
        assert_eq!(detected.source, DetectionSource::Override);
    }

    #[test]
    fn test_override_beats_runtime_and_ci() {
        let d = detector(&[
            (ENV_OVERRIDE_VAR, "test"),
            (RUNTIME_ENV_VAR, "production"),
            ("CI", "true"),
        ]);
        assert_eq!(d.detect().mode, EnvMode::Test);
    }

    #[test]
    fn test_runtime_canonical_only() {
        assert_eq!(
            detector(&[(RUNTIME_ENV_VAR, "production")]).detect().mode,
            EnvMode::Production
        );
        // Synonyms are not honored for the runtime indicator
        let d = detector(&[(RUNTIME_ENV_VAR, "prod")]);
        assert_eq!(d.detect().mode, EnvMode::Development);
        assert_eq!(d.detect().source, DetectionSource::Default);
    }

    #[test]
    fn test_ci_defaults_to_staging() {
        for name in CI_INDICATORS {
            let detected = detector(&[(name, "1")]).detect();
            assert_eq!(detected.mode, EnvMode::Staging, "{name}");
            assert_eq!(detected.source, DetectionSource::Ci);
        }
        // Empty values do not count
        assert_eq!(detector(&[("CI", "")]).detect().mode, EnvMode::Development);
    }

    #[test]
    fn test_runtime_beats_ci() {
        let d = detector(&[(RUNTIME_ENV_VAR, "test"), ("GITHUB_ACTIONS", "true")]);
        assert_eq!(d.detect().mode, EnvMode::Test);
    }

    #[test]
    fn test_priority_order() {
        let order = detector(&[]).priority_order(Some(EnvMode::Production));
        assert_eq!(
            order,
            vec![
                PathBuf::from("/project/agent.config.local.yml"),
                PathBuf::from("/project/agent.config.production.yml"),
                PathBuf::from("/project/agent.config.yml"),
                PathBuf::from("/home/user/.config/agent-config/config.yml"),
            ]
        );
    }

    #[test]
    fn test_variables_with_prefix() {
        let d = detector(&[
            ("AGENT_DEBUG", "true"),
            ("AGENT_EMPTY", ""),
            ("AGENTX", "no"),
            ("PATH", "/bin"),
        ]);
        let vars = d.variables_with_prefix("AGENT_");
        assert_eq!(vars.len(), 1);
        assert_eq!(vars.get("AGENT_DEBUG").map(String::as_str), Some("true"));
    }

    #[test]
    fn test_set_environment() {
        let mut d = detector(&[("CI", "1")]);
        d.set_environment(EnvMode::Production);
        assert_eq!(d.vars().get(ENV_OVERRIDE_VAR), Some("production"));
        assert_eq!(d.vars().get(RUNTIME_ENV_VAR), Some("production"));
        assert_eq!(d.detect().mode, EnvMode::Production);
    }

    #[test]
    fn test_production_template() {
        let layer = detector(&[]).environment_template(EnvMode::Production);
        let config = layer.into_config();
        assert!(config.sync.auto_sync);
        assert_eq!(config.features.get("encryption"), Some(&true));
        assert_eq!(
            config.sync.conflict_resolution,
            Some(ConflictResolution::Remote)
        );
        let env = config.environment.unwrap();
        assert!(env.security.encryption_enabled);
        assert_eq!(env.security.trusted_sources, vec![TRUSTED_API_SOURCE]);
    }

    #[test]
    fn test_mode_specific_templates() {
        let d = detector(&[]);

        let dev = d.environment_template(EnvMode::Development).into_config();
        assert!(!dev.sync.auto_sync);
        assert_eq!(dev.sync.conflict_resolution, Some(ConflictResolution::Prompt));
        assert_eq!(dev.features.get("debug"), Some(&true));

        let staging = d.environment_template(EnvMode::Staging).into_config();
        assert_eq!(staging.features.get("monitoring"), Some(&true));
        assert_eq!(staging.sync.conflict_resolution, Some(ConflictResolution::Remote));

        let test = d.environment_template(EnvMode::Test).into_config();
        assert!(!test.sync.auto_sync);
        assert_eq!(test.sync.sync_interval, Some(0));
        assert_eq!(test.features.get("validation"), Some(&false));
        assert_eq!(test.sync.backup_before_sync, Some(false));
    }
}
