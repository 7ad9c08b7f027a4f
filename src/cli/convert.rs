//! Convert and merge subcommands for agent-config CLI
//!
//! Both write configuration files whose format follows the output
//! extension.

use crate::format::{ConfigFormat, with_format_extension};
use clap::Args;
use std::path::{Path, PathBuf};

/// Arguments for the convert subcommand
#[derive(Args, Debug)]
pub struct ConvertArgs {
    /// Target format: yaml or json
    #[arg(value_name = "FORMAT")]
    pub to: ConfigFormat,

    /// Source file (default: the global configuration file)
    #[arg(short, long, value_name = "FILE")]
    pub source: Option<PathBuf>,

    /// Output file (default: the source with the target extension)
    #[arg(short, long, value_name = "FILE")]
    pub output: Option<PathBuf>,
}

impl ConvertArgs {
    /// Output path for `source`: explicit `--output`, else the source with
    /// the target extension.
    pub fn output_for(&self, source: &Path) -> PathBuf {
        match &self.output {
            Some(output) => with_format_extension(output, self.to),
            None => with_format_extension(source, self.to),
        }
    }
}

/// Arguments for the merge subcommand
#[derive(Args, Debug)]
pub struct MergeArgs {
    /// Files to merge, lowest precedence first
    #[arg(value_name = "FILE", required = true)]
    pub inputs: Vec<PathBuf>,

    /// Output file, format chosen by extension
    #[arg(short, long, value_name = "FILE")]
    pub output: PathBuf,
}
