use crate::commands;
use clap::{Parser, Subcommand};

#[derive(Parser, Debug)]
#[command(
    name = "pax",
    about = "resolve Eclipse features, p2 units and bundles into a launch set",
    version,
    color = clap::ColorChoice::Auto
)]
pub struct Cli {
    #[arg(short = 'v', long = "verbose", global = true)]
    pub verbose: bool,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Run a provisioning plan and print the resulting bundles
    Provision(commands::provision::ProvisionArgs),
    /// List the bundles or features found in a folder
    List(commands::list::ListArgs),
    /// Show the bundles a feature in a folder resolves to
    Feature(commands::feature::FeatureArgs),
}
