//! Layer merging.
//!
//! Merging is right-biased and dispatches per known field:
//! - `version`, `initialized` and unknown top-level keys: overlay replaces base
//! - `templates`, `features`: keyed union, overlay entries replace base entries
//! - `sync`, `environment`, `validation`: field-wise union one level deep
//!
//! Nothing below that first level is blended: a template entry, an
//! environment `paths` block or a `variables` map is replaced wholesale.
//! Absent fields never erase what the base supplied.

use super::types::{ConfigLayer, EnvironmentLayer, SyncLayer, ValidationLayer};
use std::collections::BTreeMap;

/// Merge `overlay` onto `base`, with `overlay` taking precedence.
///
/// # Example
/// ```
/// use agent_config::config::{ConfigLayer, merge};
/// use std::collections::BTreeMap;
///
/// let base = ConfigLayer {
///     features: Some(BTreeMap::from([("debug".to_string(), true), ("backup".to_string(), true)])),
///     ..Default::default()
/// };
/// let overlay = ConfigLayer {
///     features: Some(BTreeMap::from([("debug".to_string(), false)])),
///     ..Default::default()
/// };
/// let merged = merge(base, overlay);
/// let features = merged.features.unwrap();
/// assert!(!features["debug"]);
/// assert!(features["backup"]);
/// ```
pub fn merge(base: ConfigLayer, overlay: ConfigLayer) -> ConfigLayer {
    ConfigLayer {
        version: overlay.version.or(base.version),
        initialized: overlay.initialized.or(base.initialized),
        templates: union_maps(base.templates, overlay.templates),
        sync: union_with(base.sync, overlay.sync, merge_sync),
        features: union_maps(base.features, overlay.features),
        environment: union_with(base.environment, overlay.environment, merge_environment),
        validation: union_with(base.validation, overlay.validation, merge_validation),
        extra: union_maps(Some(base.extra), Some(overlay.extra)).unwrap_or_default(),
    }
}

/// Fold layers in order, later layers taking precedence.
///
/// Equivalent to folding [`merge`] over the list starting from an empty layer.
pub fn merge_all(layers: impl IntoIterator<Item = ConfigLayer>) -> ConfigLayer {
    layers.into_iter().fold(ConfigLayer::default(), merge)
}

fn union_maps<V>(
    base: Option<BTreeMap<String, V>>,
    overlay: Option<BTreeMap<String, V>>,
) -> Option<BTreeMap<String, V>> {
    match (base, overlay) {
        (Some(mut base), Some(overlay)) => {
            base.extend(overlay);
            Some(base)
        }
        (base, overlay) => overlay.or(base),
    }
}

fn union_with<T>(base: Option<T>, overlay: Option<T>, f: fn(T, T) -> T) -> Option<T> {
    match (base, overlay) {
        (Some(base), Some(overlay)) => Some(f(base, overlay)),
        (base, overlay) => overlay.or(base),
    }
}

fn merge_sync(base: SyncLayer, overlay: SyncLayer) -> SyncLayer {
    SyncLayer {
        remote: overlay.remote.or(base.remote),
        last_sync: overlay.last_sync.or(base.last_sync),
        auto_sync: overlay.auto_sync.or(base.auto_sync),
        sync_interval: overlay.sync_interval.or(base.sync_interval),
        conflict_resolution: overlay.conflict_resolution.or(base.conflict_resolution),
        backup_before_sync: overlay.backup_before_sync.or(base.backup_before_sync),
    }
}

fn merge_environment(base: EnvironmentLayer, overlay: EnvironmentLayer) -> EnvironmentLayer {
    EnvironmentLayer {
        name: overlay.name.or(base.name),
        kind: overlay.kind.or(base.kind),
        variables: overlay.variables.or(base.variables),
        paths: overlay.paths.or(base.paths),
        security: overlay.security.or(base.security),
    }
}

fn merge_validation(base: ValidationLayer, overlay: ValidationLayer) -> ValidationLayer {
    ValidationLayer {
        strict_mode: overlay.strict_mode.or(base.strict_mode),
        custom_rules: overlay.custom_rules.or(base.custom_rules),
        skip_validation: overlay.skip_validation.or(base.skip_validation),
    }
}
