//! Agent Config Library
//!
//! Layered, environment-aware configuration resolution with atomic saves,
//! timestamped backups and YAML/JSON conversion.

pub mod cli;
pub mod config;
pub mod environment;
pub mod error;
pub mod format;
pub mod health;
pub mod paths;
