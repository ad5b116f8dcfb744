//! azuread-generator
//!
//! Regenerates the GitHub labeler files from the provider's service manifest.

use azuread_generator::generate;
use azuread_provider::SERVICES;
use clap::Parser;
use std::path::PathBuf;
use tracing::info;
use tracing_subscriber::EnvFilter;

#[derive(Parser, Debug)]
#[command(name = "azuread-generator", version, about)]
struct Cli {
    /// Repository root to write into
    #[arg(long, default_value = ".")]
    path: PathBuf,

    /// Service package to leave out of the generated files (repeatable)
    #[arg(long = "skip", value_name = "PACKAGE")]
    skip: Vec<String>,
}

fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let cli = Cli::parse();

    match generate(&cli.path, SERVICES, &cli.skip) {
        Ok(paths) => info!(files = paths.len(), "labeler files up to date"),
        Err(e) => {
            eprintln!("Error: {e}");
            std::process::exit(1);
        }
    }
}
