//! Agent Config CLI
//!
//! Resolves layered configuration for the current project and manages the
//! files behind it: initialization, backups, restores and conversion.

use agent_config::cli::{Cli, Command};
use agent_config::config::{BackupEntry, ConfigLoader, ConfigStatus, TemplateCatalog, ValidationResult};
use agent_config::environment::{EnvVars, EnvironmentDetector};
use agent_config::error::ConfigError;
use agent_config::format::{self, ConfigFormat};
use agent_config::paths::AppDirs;
use anyhow::{Context, Result};
use clap::Parser;
use serde::Serialize;
use serde_json::json;
use std::fs::OpenOptions;
use tracing::{Level, debug};
use tracing_subscriber::FmtSubscriber;

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // Initialize logging based on --log option
    let level = if cli.verbose {
        Level::DEBUG
    } else {
        Level::INFO
    };
    match cli.log.as_str() {
        "0" | "off" => {
            // No logging
        }
        "1" | "stdout" => {
            let subscriber = FmtSubscriber::builder()
                .with_max_level(level)
                .with_writer(std::io::stdout)
                .finish();
            tracing::subscriber::set_global_default(subscriber)?;
        }
        "2" | "stderr" => {
            let subscriber = FmtSubscriber::builder()
                .with_max_level(level)
                .with_writer(std::io::stderr)
                .finish();
            tracing::subscriber::set_global_default(subscriber)?;
        }
        filename => {
            // Log to file (append mode)
            let file = OpenOptions::new()
                .create(true)
                .append(true)
                .open(filename)
                .with_context(|| format!("Failed to open log file {filename}"))?;
            let subscriber = FmtSubscriber::builder()
                .with_max_level(level)
                .with_writer(file)
                .with_ansi(false)
                .finish();
            tracing::subscriber::set_global_default(subscriber)?;
        }
    }

    let json = cli.json;
    if let Err(e) = run(cli).await {
        report_error(&e, json);
        std::process::exit(1);
    }
    Ok(())
}

fn build_loader(cli: &Cli) -> Result<ConfigLoader> {
    let mut dirs = AppDirs::discover();
    if let Some(dir) = &cli.dir {
        dirs.project_dir = dir.clone();
    }
    let format = cli.format.unwrap_or_default();

    let mut detector = EnvironmentDetector::new(dirs, format, EnvVars::from_process());
    if let Some(mode) = cli.env {
        detector.set_environment(mode);
    }
    let catalog = TemplateCatalog::builtin().context("Failed to load built-in templates")?;
    Ok(ConfigLoader::new(detector, catalog))
}

async fn run(cli: Cli) -> Result<()> {
    let loader = build_loader(&cli)?;
    let json = cli.json;
    debug!(project = %loader.detector().dirs().project_dir.display(), "Starting");

    match cli.command {
        Command::Show => {
            let config = loader.resolve().await?;
            let out_format = if json {
                ConfigFormat::Json
            } else {
                loader.detector().format()
            };
            print!("{}", format::encode(&config, out_format)?);
        }

        Command::Init(args) => {
            let outcome = loader.initialize(&args.template, args.force).await?;
            if json {
                print_json(&outcome)?;
            } else {
                println!("Initialized configuration from template '{}'", args.template);
                println!("  global: {}", outcome.global.display());
                println!("  local:  {}", outcome.local.display());
                if let Some(backup) = &outcome.backup {
                    println!("  previous global file backed up to {}", backup.display());
                }
            }
        }

        Command::Status => {
            let status = loader.status().await?;
            if json {
                print_json(&status)?;
            } else {
                print_status(&status);
            }
        }

        Command::Backup => {
            let path = loader.create_backup().await?;
            if json {
                print_json(&json!({ "backup": path }))?;
            } else {
                println!("Backup created: {}", path.display());
            }
        }

        Command::Backups => {
            let backups = loader.list_backups().await?;
            if json {
                print_json(&backups)?;
            } else {
                print_backups(&backups);
            }
        }

        Command::Restore(args) => {
            let backup = args.backup_path(loader.backups().dir());
            let outcome = loader
                .restore_from_backup(&backup, args.to.as_deref())
                .await?;
            if json {
                print_json(&outcome)?;
            } else {
                println!("Restored {} to {}", backup.display(), outcome.restored_to.display());
                if let Some(safety) = &outcome.safety_backup {
                    println!("Previous file backed up to {}", safety.display());
                }
            }
        }

        Command::Paths => {
            let paths = loader.paths();
            if json {
                print_json(&paths)?;
            } else {
                println!("Mode:        {}", paths.mode);
                println!("Global:      {}", paths.global.display());
                println!("Local:       {}", paths.local.display());
                println!("Backups:     {}", paths.backup_dir.display());
                println!("Priority (highest first):");
                for path in paths.chain.ordered() {
                    println!("  {}", path.display());
                }
            }
        }

        Command::Convert(args) => {
            let written = match &args.source {
                Some(source) => loader.convert_file(source, &args.output_for(source)).await?,
                None if args.output.is_some() => {
                    let source = loader.global_path();
                    loader.convert_file(&source, &args.output_for(&source)).await?
                }
                None => loader.convert_format(args.to).await?,
            };
            if json {
                print_json(&json!({ "output": written }))?;
            } else {
                println!("Converted to {}: {}", args.to, written.display());
            }
        }

        Command::Merge(args) => {
            let written = loader.merge_files(&args.inputs, &args.output).await?;
            if json {
                print_json(&json!({ "output": written }))?;
            } else {
                println!("Merged {} files into {}", args.inputs.len(), written.display());
            }
        }

        Command::Validate(args) => {
            let result = loader.validate(args.path.as_deref()).await?;
            if json {
                print_json(&result)?;
            } else {
                print_validation(&result);
            }
            if !result.valid {
                anyhow::bail!("Configuration is invalid");
            }
        }

        Command::Env => {
            let detected = loader.detector().detect();
            let variables = loader
                .detector()
                .variables_with_prefix(agent_config::environment::DEFAULT_VAR_PREFIX);
            if json {
                print_json(&json!({
                    "mode": detected.mode,
                    "source": detected.source,
                    "ci": loader.detector().is_ci(),
                    "runtimeEnv": detected.runtime_env,
                    "variables": variables,
                }))?;
            } else {
                println!("Mode:   {} ({:?})", detected.mode, detected.source);
                println!("CI:     {}", loader.detector().is_ci());
                for (name, value) in &variables {
                    println!("  {name}={value}");
                }
            }
        }

        Command::Sync(args) => {
            let config = loader.record_sync(args.remote.as_deref()).await?;
            if json {
                print_json(&config.sync)?;
            } else {
                println!(
                    "Recorded sync at {}",
                    config.sync.last_sync.as_deref().unwrap_or("-")
                );
            }
        }
    }

    Ok(())
}

fn print_json<T: Serialize>(value: &T) -> Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

fn print_status(status: &ConfigStatus) {
    println!("Initialized: {}", status.initialized);
    println!("Version:     {}", status.version);
    if let Some(env) = &status.environment {
        println!("Environment: {env}");
    }
    if let Some(template) = &status.template {
        println!("Template:    {template}");
    }
    println!("Last sync:   {}", status.last_sync.as_deref().unwrap_or("never"));
    if !status.features.is_empty() {
        println!("Features:    {}", status.features.join(", "));
    }
    println!("Files:");
    for file in &status.config_files {
        println!("  {}", file.display());
    }
    println!("Health:      {}/100", status.health.score);
    for (issue, rec) in status
        .health
        .issues
        .iter()
        .zip(&status.health.recommendations)
    {
        println!("  - {issue}: {rec}");
    }
}

fn print_backups(backups: &[BackupEntry]) {
    if backups.is_empty() {
        println!("No backups found");
        return;
    }
    for entry in backups {
        println!(
            "{}  {:>8} bytes  {}",
            entry.created.format("%Y-%m-%d %H:%M:%S"),
            entry.size,
            entry.path.display()
        );
    }
}

fn print_validation(result: &ValidationResult) {
    if result.valid {
        println!("Configuration is valid");
    }
    for issue in result.errors.iter().chain(&result.warnings) {
        println!("[{:?}] {} {}: {}", issue.severity, issue.code, issue.field, issue.message);
        if let Some(suggestion) = &issue.suggestion {
            println!("    {suggestion}");
        }
    }
}

fn report_error(err: &anyhow::Error, json: bool) {
    if json {
        let code = err
            .downcast_ref::<ConfigError>()
            .and_then(|e| serde_json::to_value(e.code()).ok())
            .unwrap_or_else(|| json!("ERROR"));
        println!(
            "{}",
            json!({ "code": code, "message": format!("{err:#}") })
        );
    } else {
        eprintln!("Error: {err:#}");
    }
}
