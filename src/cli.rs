//! Command-line interface definitions.
//!
//! Defines all CLI arguments and subcommands using clap.

use clap::{Parser, Subcommand};
use std::path::PathBuf;

/// Oxen: turn a directory of org notes into a linked static site
#[derive(Parser, Debug, Clone)]
#[command(version, about, long_about = None, arg_required_else_help = true)]
pub struct Cli {
    /// Project root; other paths are relative to it
    #[arg(short, long)]
    pub root: Option<PathBuf>,

    /// Output directory path (relative to project root)
    #[arg(short, long)]
    pub output: Option<PathBuf>,

    /// Content directory path (relative to project root)
    #[arg(short, long)]
    pub content: Option<PathBuf>,

    /// Config file name (default: oxen.toml). Optional; defaults apply when absent
    #[arg(short = 'C', long, default_value = "oxen.toml")]
    pub config: PathBuf,

    /// Inline JSON config used instead of the config file, e.g. '{"site":{"name":"Notes"}}'
    #[arg(long = "config-json")]
    pub config_json: Option<String>,

    /// Print per-file debug output
    #[arg(short, long)]
    pub verbose: bool,

    /// subcommands
    #[command(subcommand)]
    pub command: Commands,
}

/// Shared build arguments for Build and Serve commands
#[derive(clap::Args, Debug, Clone)]
pub struct BuildArgs {
    /// Rebuild every page even when its output is up to date
    #[arg(short, long)]
    pub force: bool,

    /// Worker threads (0 = one per CPU)
    #[arg(short, long)]
    pub workers: Option<usize>,
}

/// Available subcommands
#[derive(Subcommand, Debug, Clone)]
pub enum Commands {
    /// Build the site into the output directory
    Build {
        #[command(flatten)]
        build_args: BuildArgs,
    },

    /// Build, serve the output, and rebuild on change
    Serve {
        #[command(flatten)]
        build_args: BuildArgs,

        /// Interface to bind on
        #[arg(short, long)]
        interface: Option<String>,

        /// The port you should provide
        #[arg(short, long)]
        port: Option<u16>,

        /// enable watch
        #[arg(long, action = clap::ArgAction::Set, num_args = 0..=1, default_missing_value = "true", require_equals = false)]
        watch: Option<bool>,
    },

    /// Report which document and heading declare an identifier
    FindId {
        /// Identifier in 8-4-4-4-12 hex form
        id: String,
    },
}

impl Cli {
    pub const fn is_serve(&self) -> bool {
        matches!(self.command, Commands::Serve { .. })
    }

    /// Build arguments of the current command, if it builds.
    pub const fn build_args(&self) -> Option<&BuildArgs> {
        match &self.command {
            Commands::Build { build_args } | Commands::Serve { build_args, .. } => {
                Some(build_args)
            }
            Commands::FindId { .. } => None,
        }
    }
}
