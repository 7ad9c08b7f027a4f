//! Health scoring and diagnostics for a resolved configuration.
//!
//! The score is a sum of fixed points for independent structural checks,
//! capped at 100. Diagnostics come from a fixed table: each failing
//! condition yields exactly one issue and one matching recommendation.

use crate::config::Config;
use serde::Serialize;

/// Upper bound of the health score.
pub const MAX_SCORE: u8 = 100;

/// Which chain files were found on disk.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct PresentFiles {
    /// The global (user-scoped) file.
    pub primary: bool,
    /// The local (project-scoped) file.
    pub secondary: bool,
}

/// Score plus diagnostics.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct HealthReport {
    pub score: u8,
    pub issues: Vec<String>,
    pub recommendations: Vec<String>,
}

impl HealthReport {
    /// Report for a project with no configuration files at all.
    pub fn not_initialized() -> Self {
        Self {
            score: 0,
            issues: vec!["Configuration not initialized".to_string()],
            recommendations: vec!["Run 'agent-config init' to initialize configuration".to_string()],
        }
    }
}

struct ScoreCheck {
    points: u8,
    passes: fn(&Config, PresentFiles) -> bool,
}

const SCORE_CHECKS: &[ScoreCheck] = &[
    ScoreCheck {
        points: 20,
        passes: |c, _| c.initialized,
    },
    ScoreCheck {
        points: 15,
        passes: |c, _| !c.templates.is_empty(),
    },
    // The sync block always exists on a resolved record
    ScoreCheck {
        points: 10,
        passes: |_, _| true,
    },
    ScoreCheck {
        points: 5,
        passes: |c, _| !c.features.is_empty(),
    },
    ScoreCheck {
        points: 10,
        passes: |_, f| f.primary,
    },
    ScoreCheck {
        points: 10,
        passes: |_, f| f.secondary,
    },
    ScoreCheck {
        points: 10,
        passes: |c, _| c.environment.is_some(),
    },
    ScoreCheck {
        points: 10,
        passes: |c, _| c.validation.is_some(),
    },
    ScoreCheck {
        points: 5,
        passes: |c, _| c.sync.auto_sync,
    },
    ScoreCheck {
        points: 5,
        passes: |c, _| c.sync.backup_before_sync.unwrap_or(false),
    },
];

struct Diagnostic {
    failing: fn(&Config) -> bool,
    issue: &'static str,
    recommendation: &'static str,
}

const DIAGNOSTICS: &[Diagnostic] = &[
    Diagnostic {
        failing: |c| c.sync.last_sync.is_none(),
        issue: "No sync history found",
        recommendation: "Set up remote synchronization for backup",
    },
    Diagnostic {
        failing: |c| c.environment.is_none(),
        issue: "Environment configuration missing",
        recommendation: "Configure environment settings for better organization",
    },
    Diagnostic {
        failing: |c| c.validation.is_none(),
        issue: "Validation configuration not set up",
        recommendation: "Enable validation for better configuration management",
    },
    Diagnostic {
        failing: |c| c.enabled_features().is_empty(),
        issue: "No features enabled",
        recommendation: "Enable useful features like autoComplete and validation",
    },
];

/// Health score in `0..=100`.
pub fn score(config: &Config, files: PresentFiles) -> u8 {
    let total: u32 = SCORE_CHECKS
        .iter()
        .filter(|check| (check.passes)(config, files))
        .map(|check| u32::from(check.points))
        .sum();
    total.min(u32::from(MAX_SCORE)) as u8
}

/// Issues and their recommendations, paired by index.
pub fn diagnose(config: &Config) -> (Vec<String>, Vec<String>) {
    DIAGNOSTICS
        .iter()
        .filter(|d| (d.failing)(config))
        .map(|d| (d.issue.to_string(), d.recommendation.to_string()))
        .unzip()
}

/// Score and diagnose in one pass.
pub fn evaluate(config: &Config, files: PresentFiles) -> HealthReport {
    let (issues, recommendations) = diagnose(config);
    HealthReport {
        score: score(config, files),
        issues,
        recommendations,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{EnvironmentConfig, TemplateConfig, ValidationConfig};
    use crate::environment::EnvMode;

    fn complete() -> Config {
        let mut config = Config {
            initialized: true,
            ..Config::default()
        };
        config.templates.insert(
            "default".into(),
            serde_json::from_value::<TemplateConfig>(serde_json::json!({"name": "Default"}))
                .unwrap(),
        );
        config.features.insert("validation".into(), true);
        config.sync.auto_sync = true;
        config.sync.backup_before_sync = Some(true);
        config.sync.last_sync = Some("2026-01-01T00:00:00Z".into());
        config.environment = Some(EnvironmentConfig::from(
            crate::config::EnvironmentLayer {
                kind: Some(EnvMode::Production),
                ..Default::default()
            },
        ));
        config.validation = Some(ValidationConfig::default());
        config
    }

    #[test]
    fn test_full_score_is_capped() {
        let files = PresentFiles {
            primary: true,
            secondary: true,
        };
        assert_eq!(score(&complete(), files), MAX_SCORE);
    }

    #[test]
    fn test_empty_config_score() {
        // Only the always-present sync block counts
        assert_eq!(score(&Config::default(), PresentFiles::default()), 10);
    }

    #[test]
    fn test_partial_score() {
        let mut config = complete();
        config.sync.auto_sync = false;
        config.validation = None;
        let files = PresentFiles {
            primary: true,
            secondary: false,
        };
        assert_eq!(score(&config, files), 100 - 5 - 10 - 10);
    }

    #[test]
    fn test_diagnose_complete_config() {
        let (issues, recommendations) = diagnose(&complete());
        assert!(issues.is_empty());
        assert!(recommendations.is_empty());
    }

    #[test]
    fn test_diagnose_pairs_issues() {
        let mut config = Config::default();
        config.features.insert("debug".into(), false);
        let (issues, recommendations) = diagnose(&config);
        assert_eq!(
            issues,
            vec![
                "No sync history found",
                "Environment configuration missing",
                "Validation configuration not set up",
                "No features enabled",
            ]
        );
        assert_eq!(recommendations.len(), issues.len());
        assert_eq!(recommendations[0], "Set up remote synchronization for backup");
    }

    #[test]
    fn test_not_initialized_report() {
        let report = HealthReport::not_initialized();
        assert_eq!(report.score, 0);
        assert_eq!(report.issues, vec!["Configuration not initialized"]);
        assert!(report.recommendations[0].contains("agent-config init"));
    }
}
