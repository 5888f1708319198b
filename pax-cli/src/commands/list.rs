use anyhow::Result;
use clap::{Args, ValueEnum};
use pax_core::console;
use pax_core::source::DirectorySource;
use std::path::PathBuf;

#[derive(ValueEnum, Clone, Copy, Debug, Default)]
pub enum Kind {
    #[default]
    Bundles,
    Features,
}

#[derive(Args, Debug)]
pub struct ListArgs {
    /// Eclipse installation or folder of bundles
    pub dir: PathBuf,

    /// What to list
    #[arg(long, value_enum, default_value_t = Kind::Bundles)]
    pub kind: Kind,
}

pub fn run(args: ListArgs) -> Result<()> {
    console::header("list", env!("CARGO_PKG_VERSION"));

    let source = DirectorySource::new(&args.dir)?;
    let catalog = source.catalog();

    match args.kind {
        Kind::Bundles => {
            if catalog.bundles.is_empty() {
                println!("No bundles in {}", args.dir.display());
                return Ok(());
            }
            for artifact in catalog.bundles.artifacts() {
                let bundle = &artifact.context;
                console::item(&bundle.id, &bundle.version.to_string(), &bundle.location);
            }
        }
        Kind::Features => {
            if catalog.features.is_empty() {
                println!("No features in {}", args.dir.display());
                return Ok(());
            }
            for artifact in catalog.features.artifacts() {
                let feature = &artifact.context;
                console::item(&feature.id, &feature.version.to_string(), &feature.location);
            }
        }
    }

    Ok(())
}
