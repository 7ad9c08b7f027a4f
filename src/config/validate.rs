//! Configuration validation.
//!
//! Validation never fails: every problem is collected as a
//! [`ValidationIssue`] in a [`ValidationResult`]. Built-in rules:
//!
//! - `INVALID_VERSION` - `version` is not `x.y.z`
//! - `NO_TEMPLATES` - no templates installed (an error once initialized)
//! - `UNKNOWN_ENVIRONMENT_NAME` - environment block with an empty name
//! - `SYNC_INTERVAL_DISABLED` - auto-sync on with a zero interval
//! - `YAML_TABS` - tab characters in a YAML file
//! - `PARSE_ERROR` - the file cannot be decoded at all
//!
//! User rules from `validation.customRules` are applied after the built-ins.
//! Fields listed in `validation.skipValidation` are not reported, and
//! `validation.strictMode` promotes every warning to an error.

use super::types::{Config, RuleKind, SCHEMA_VERSION, ValidationRule};
use crate::format::{self, ConfigFormat};
use serde::Serialize;
use serde_json::Value;
use std::path::Path;
use std::time::Instant;
use tracing::debug;

const VERSION_PATTERN: &str = r"^\d+\.\d+\.\d+$";

/// Number of built-in config rules, plus the two file-level rules.
const BUILTIN_RULES: usize = 4;
const FILE_RULES: usize = 2;

/// Issue severity.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    Error,
    Warning,
}

/// One validation finding.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ValidationIssue {
    /// Dotted field path, or `file` for file-level problems.
    pub field: String,
    pub message: String,
    pub code: String,
    pub severity: Severity,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub suggestion: Option<String>,
}

impl ValidationIssue {
    fn new(field: &str, code: &str, severity: Severity, message: impl Into<String>) -> Self {
        Self {
            field: field.to_string(),
            message: message.into(),
            code: code.to_string(),
            severity,
            suggestion: None,
        }
    }

    fn suggest(mut self, suggestion: impl Into<String>) -> Self {
        self.suggestion = Some(suggestion.into());
        self
    }
}

/// Run metadata.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ValidationMetadata {
    /// RFC 3339 time the run started.
    pub timestamp: String,
    pub duration_ms: u64,
    pub rules_applied: usize,
    pub schema_version: String,
}

/// Outcome of a validation run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ValidationResult {
    pub valid: bool,
    pub errors: Vec<ValidationIssue>,
    pub warnings: Vec<ValidationIssue>,
    pub metadata: ValidationMetadata,
}

struct Run {
    started: Instant,
    timestamp: String,
    rules: usize,
    issues: Vec<ValidationIssue>,
}

impl Run {
    fn start() -> Self {
        Self {
            started: Instant::now(),
            timestamp: chrono::Utc::now().to_rfc3339(),
            rules: 0,
            issues: Vec::new(),
        }
    }

    fn finish(self, config: Option<&Config>) -> ValidationResult {
        let policy = config.and_then(|c| c.validation.as_ref());
        let strict = policy.is_some_and(|p| p.strict_mode);
        let skipped = policy.map(|p| p.skip_validation.as_slice()).unwrap_or_default();

        let mut errors = Vec::new();
        let mut warnings = Vec::new();
        for mut issue in self.issues {
            if skipped.iter().any(|f| *f == issue.field) {
                continue;
            }
            if strict {
                issue.severity = Severity::Error;
            }
            match issue.severity {
                Severity::Error => errors.push(issue),
                Severity::Warning => warnings.push(issue),
            }
        }

        ValidationResult {
            valid: errors.is_empty(),
            errors,
            warnings,
            metadata: ValidationMetadata {
                timestamp: self.timestamp,
                duration_ms: self.started.elapsed().as_millis() as u64,
                rules_applied: self.rules,
                schema_version: config
                    .map(|c| c.version.clone())
                    .unwrap_or_else(|| SCHEMA_VERSION.to_string()),
            },
        }
    }
}

/// Validate an in-memory configuration.
pub fn validate_config(config: &Config) -> ValidationResult {
    let mut run = Run::start();
    check_config(config, &mut run);
    run.finish(Some(config))
}

/// Validate the text of a configuration file, format chosen by `path`.
pub fn validate_text(text: &str, path: &Path) -> ValidationResult {
    let mut run = Run::start();
    let fmt = ConfigFormat::of_path(path);

    run.rules += FILE_RULES;
    if fmt == ConfigFormat::Yaml {
        for (idx, line) in text.lines().enumerate() {
            if line.contains('\t') {
                run.issues.push(
                    ValidationIssue::new(
                        "file",
                        "YAML_TABS",
                        Severity::Error,
                        format!("Tab character on line {}", idx + 1),
                    )
                    .suggest("Indent YAML with spaces"),
                );
            }
        }
    }

    match format::decode_config(text, fmt, path) {
        Ok(config) => {
            check_config(&config, &mut run);
            run.finish(Some(&config))
        }
        Err(e) => {
            run.issues.push(
                ValidationIssue::new("file", "PARSE_ERROR", Severity::Error, e.to_string())
                    .suggest(format!("Check the file is valid {fmt}")),
            );
            run.finish(None)
        }
    }
}

fn check_config(config: &Config, run: &mut Run) {
    run.rules += BUILTIN_RULES;

    let version_ok = regex_lite::Regex::new(VERSION_PATTERN)
        .map(|re| re.is_match(&config.version))
        .unwrap_or(false);
    if !version_ok {
        run.issues.push(
            ValidationIssue::new(
                "version",
                "INVALID_VERSION",
                Severity::Error,
                format!("Invalid version format: {}", config.version),
            )
            .suggest("Use semantic versioning, e.g. 1.0.0"),
        );
    }

    if config.templates.is_empty() {
        let severity = if config.initialized {
            Severity::Error
        } else {
            Severity::Warning
        };
        run.issues.push(
            ValidationIssue::new("templates", "NO_TEMPLATES", severity, "No templates configured")
                .suggest("Run 'agent-config init' to install a template"),
        );
    }

    if config
        .environment
        .as_ref()
        .is_some_and(|env| env.name.trim().is_empty())
    {
        run.issues.push(ValidationIssue::new(
            "environment.name",
            "UNKNOWN_ENVIRONMENT_NAME",
            Severity::Warning,
            "Environment has no name",
        ));
    }

    if config.sync.auto_sync && config.sync.sync_interval == Some(0) {
        run.issues.push(
            ValidationIssue::new(
                "sync.syncInterval",
                "SYNC_INTERVAL_DISABLED",
                Severity::Warning,
                "Auto-sync is enabled but the sync interval is 0",
            )
            .suggest("Set sync.syncInterval to a positive number of milliseconds"),
        );
    }

    if let Some(policy) = &config.validation {
        match serde_json::to_value(config) {
            Ok(tree) => {
                for rule in &policy.custom_rules {
                    run.rules += 1;
                    if let Some(issue) = check_rule(rule, &tree) {
                        run.issues.push(issue);
                    }
                }
            }
            Err(e) => debug!(error = %e, "Skipping custom rules"),
        }
    }
}

/// Look up a dotted path in a JSON tree.
fn lookup<'a>(tree: &'a Value, field: &str) -> Option<&'a Value> {
    field
        .split('.')
        .try_fold(tree, |node, key| node.get(key))
        .filter(|v| !v.is_null())
}

fn check_rule(rule: &ValidationRule, tree: &Value) -> Option<ValidationIssue> {
    let value = lookup(tree, &rule.field);
    let failure = match rule.kind {
        RuleKind::Required => value.is_none().then(|| format!("{} is required", rule.field)),
        RuleKind::Format => {
            let pattern = rule.value.as_ref().and_then(Value::as_str)?;
            let text = value.and_then(Value::as_str)?;
            let re = regex_lite::Regex::new(pattern).ok()?;
            (!re.is_match(text)).then(|| format!("{} does not match {}", rule.field, pattern))
        }
        RuleKind::Range => {
            let n = value.and_then(Value::as_f64)?;
            let bounds = rule.value.as_ref()?;
            let min = bounds.get("min").and_then(Value::as_f64);
            let max = bounds.get("max").and_then(Value::as_f64);
            let out = min.is_some_and(|m| n < m) || max.is_some_and(|m| n > m);
            out.then(|| format!("{} is out of range", rule.field))
        }
        RuleKind::Custom => {
            debug!(field = %rule.field, "Custom rule kind has no evaluator");
            None
        }
    }?;

    Some(ValidationIssue::new(
        &rule.field,
        "CUSTOM_RULE",
        Severity::Error,
        rule.message.clone().unwrap_or(failure),
    ))
}
