use anyhow::Result;
use clap::Parser;
use pax_core::PaxConfig;
use tracing_subscriber::EnvFilter;

mod cli;
mod commands;

use cli::{Cli, Command};

fn main() -> Result<()> {
    let args = Cli::parse();
    let mut config = PaxConfig::from_env();
    config.verbose |= args.verbose;

    init_tracing(config.verbose);
    tracing::debug!("cache dir {}", config.cache_dir.display());

    match args.command {
        Command::Provision(cmd_args) => commands::provision::run(cmd_args, &config),
        Command::List(cmd_args) => commands::list::run(cmd_args),
        Command::Feature(cmd_args) => commands::feature::run(cmd_args, &config),
    }
}

fn init_tracing(verbose: bool) {
    let default = if verbose { "debug" } else { "info" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}
