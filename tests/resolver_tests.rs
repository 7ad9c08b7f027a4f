//! Integration tests for layered resolution.
//!
//! Covers the end-to-end paths through ConfigLoader:
//! - detection and priority order on an empty project
//! - override mode normalization and the derived template
//! - a global-only chain with unknown keys
//! - failed initialization leaving the filesystem untouched
//! - determinism of repeated resolution

use agent_config::config::{ConfigLoader, SaveOptions, TemplateCatalog};
use agent_config::environment::{EnvMode, EnvVars, EnvironmentDetector};
use agent_config::error::{ConfigError, ErrorCode};
use agent_config::format::{ConfigFormat, encode};
use agent_config::paths::AppDirs;
use serde_json::Value;
use std::fs;
use std::path::PathBuf;
use tempfile::TempDir;

/// Helper to create a ConfigLoader over temp project and home directories.
fn create_loader(temp: &TempDir, vars: &[(&str, &str)], format: ConfigFormat) -> ConfigLoader {
    let project = temp.path().join("project");
    fs::create_dir_all(&project).unwrap();
    let dirs = AppDirs::new(project, temp.path().join("home"));
    let detector = EnvironmentDetector::new(dirs, format, EnvVars::from_pairs(vars.iter().copied()));
    ConfigLoader::new(detector, TemplateCatalog::builtin().unwrap())
}

fn list_tree(root: &std::path::Path) -> Vec<PathBuf> {
    let mut out = Vec::new();
    let mut stack = vec![root.to_path_buf()];
    while let Some(dir) = stack.pop() {
        for entry in fs::read_dir(&dir).unwrap().flatten() {
            let path = entry.path();
            if path.is_dir() {
                stack.push(path.clone());
            }
            out.push(path);
        }
    }
    out.sort();
    out
}

#[tokio::test]
async fn test_empty_project_defaults_to_development() {
    let temp = TempDir::new().unwrap();
    let loader = create_loader(&temp, &[], ConfigFormat::Yaml);

    let detected = loader.detector().detect();
    assert_eq!(detected.mode, EnvMode::Development);

    let order = loader.detector().priority_order(None);
    let project = temp.path().join("project");
    assert_eq!(
        order,
        vec![
            project.join("agent.config.local.yml"),
            project.join("agent.config.development.yml"),
            project.join("agent.config.yml"),
            temp.path().join("home/.config/agent-config/config.yml"),
        ]
    );

    let status = loader.status().await.unwrap();
    assert!(!status.initialized);
    assert_eq!(status.health.score, 0);
}

#[tokio::test]
async fn test_prod_override_template() {
    let temp = TempDir::new().unwrap();
    let loader = create_loader(&temp, &[("AGENT_ENV", "prod")], ConfigFormat::Yaml);

    assert_eq!(loader.detector().detect().mode, EnvMode::Production);

    let config = loader.resolve().await.unwrap();
    assert!(config.sync.auto_sync);
    assert_eq!(config.features.get("encryption"), Some(&true));
    let env = config.environment.unwrap();
    assert_eq!(env.name, "production");
    assert!(env.security.encryption_enabled);
}

#[tokio::test]
async fn test_global_only_chain_keeps_unknown_keys() {
    let temp = TempDir::new().unwrap();
    let loader = create_loader(&temp, &[], ConfigFormat::Yaml);
    let global = loader.global_path();
    fs::create_dir_all(global.parent().unwrap()).unwrap();
    fs::write(&global, "version: \"1.0.0\"\ninitialized: true\nglobal: true\n").unwrap();

    let config = loader.resolve().await.unwrap();
    assert_eq!(config.extra.get("global"), Some(&Value::Bool(true)));
    assert!(config.environment.is_some());

    let status = loader.status().await.unwrap();
    assert_eq!(status.config_files, vec![global]);
    assert!(status.initialized);
}

#[tokio::test]
async fn test_unknown_template_touches_nothing() {
    let temp = TempDir::new().unwrap();
    let loader = create_loader(&temp, &[], ConfigFormat::Yaml);
    let before = list_tree(temp.path());

    let err = loader.initialize("unknown-template", false).await.unwrap_err();
    assert_eq!(err.code(), ErrorCode::TemplateNotFound);
    match &err {
        ConfigError::TemplateNotFound { available, .. } => {
            assert_eq!(available, &["advanced", "claude", "default", "enterprise"]);
        }
        other => panic!("unexpected error: {other}"),
    }

    assert_eq!(list_tree(temp.path()), before);
}

#[tokio::test]
async fn test_resolution_is_deterministic() {
    let temp = TempDir::new().unwrap();
    let loader = create_loader(&temp, &[("AGENT_A", "1"), ("AGENT_B", "2")], ConfigFormat::Json);
    loader.initialize("enterprise", false).await.unwrap();
    let chain = loader.chain();
    fs::write(
        &chain.environment,
        r#"{"features": {"zeta": true, "alpha": false}, "team": {"name": "core"}}"#,
    )
    .unwrap();

    let first = encode(&loader.resolve().await.unwrap(), ConfigFormat::Yaml).unwrap();
    let second = encode(&loader.resolve().await.unwrap(), ConfigFormat::Yaml).unwrap();
    assert_eq!(first, second);

    let first = encode(&loader.resolve().await.unwrap(), ConfigFormat::Json).unwrap();
    let second = encode(&loader.resolve().await.unwrap(), ConfigFormat::Json).unwrap();
    assert_eq!(first, second);
}

#[tokio::test]
async fn test_corrupt_layer_does_not_abort() {
    let temp = TempDir::new().unwrap();
    let loader = create_loader(&temp, &[("APP_ENV", "staging")], ConfigFormat::Yaml);
    let chain = loader.chain();
    fs::write(&chain.local, "sync:\n  syncInterval: 42\n").unwrap();
    fs::write(&chain.environment, "features: {broken\n").unwrap();
    fs::write(&chain.override_file, "features:\n  monitoring: false\n").unwrap();

    let config = loader.resolve().await.unwrap();
    assert_eq!(config.sync.sync_interval, Some(42));
    assert_eq!(config.features.get("monitoring"), Some(&false));
    assert_eq!(config.environment.unwrap().name, "staging");
}

#[tokio::test]
async fn test_save_reports_target_on_failure() {
    let temp = TempDir::new().unwrap();
    let loader = create_loader(&temp, &[], ConfigFormat::Yaml);
    let blocker = temp.path().join("blocker");
    fs::write(&blocker, "").unwrap();
    let target = blocker.join("config.yml");

    let config = loader.resolve().await.unwrap();
    let err = loader
        .save(&config, Some(&target), SaveOptions::default())
        .await
        .unwrap_err();
    assert_eq!(err.code(), ErrorCode::WriteError);
    assert!(err.to_string().contains("config.yml"));
}
