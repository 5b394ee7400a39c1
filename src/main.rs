//! Oxen - a static site generator for org-mode notes linked by heading IDs.

mod build;
mod cli;
mod compiler;
mod config;
mod data;
mod logger;
mod org;
mod serve;
mod utils;
mod watch;

use anyhow::{Result, bail};
use build::{build_site, find_identifier};
use clap::Parser;
use cli::{Cli, Commands};
use config::{SiteConfig, cfg, init_config};
use serve::serve_site;

fn main() -> Result<()> {
    let cli: &'static Cli = Box::leak(Box::new(Cli::parse()));
    logger::set_verbose(cli.verbose);

    init_config(SiteConfig::load(cli)?);

    match &cli.command {
        Commands::Build { .. } => {
            let result = build_site(&cfg())?;
            if result.has_errors() {
                bail!("build finished with {} error(s)", result.errors);
            }
            Ok(())
        }
        Commands::Serve { .. } => {
            build_site(&cfg())?;
            serve_site()
        }
        Commands::FindId { id } => {
            match find_identifier(&cfg(), id)? {
                Some(location) => println!(
                    "ID {id} found in: {} (headline {})",
                    location.path, location.ordinal
                ),
                None => println!("ID {id} not found"),
            }
            Ok(())
        }
    }
}
