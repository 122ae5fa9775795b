//! Refold - infer a shared layout from rendered HTML and export it as a Hugo site.

mod ast;
mod build;
mod cli;
mod collection;
mod config;
mod diagnostics;
mod document;
mod export;
mod inspect;
mod layout;
mod logger;
mod page;
mod parser;

use anyhow::Result;
use build::build_site;
use clap::Parser;
use cli::{Cli, Commands};
use config::SiteConfig;
use inspect::{print_collections, print_diff};
use std::path::Path;

fn main() -> Result<()> {
    let cli: &'static Cli = Box::leak(Box::new(Cli::parse()));
    let config: &'static SiteConfig = Box::leak(Box::new(load_config(cli)?));

    match &cli.command {
        Commands::Build { .. } => build_site(config),
        Commands::Json { pretty, collection } => {
            print_collections(config, collection.as_deref(), *pretty)
        }
        Commands::Diff {
            anchor,
            other,
            content,
            pretty,
        } => print_diff(config, anchor, other, content.as_deref(), *pretty),
    }
}

/// Load and validate configuration from CLI arguments.
///
/// A missing config file is not an error: every section has defaults.
fn load_config(cli: &'static Cli) -> Result<SiteConfig> {
    let root = cli.root.as_deref().unwrap_or(Path::new("./"));
    let config_path = root.join(&cli.config);

    let mut config = if config_path.exists() {
        SiteConfig::from_path(&config_path)?
    } else {
        SiteConfig::default()
    };
    config.update_with_cli(cli);
    config.validate()?;

    Ok(config)
}
