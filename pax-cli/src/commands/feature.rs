use anyhow::Result;
use clap::Args;
use pax_core::source::DirectorySource;
use pax_core::{PaxConfig, VersionRequest, console, resolve};
use serde::Serialize;
use std::path::PathBuf;

#[derive(Args, Debug)]
pub struct FeatureArgs {
    /// Eclipse installation or folder with plugins/ and features/
    pub dir: PathBuf,

    /// Feature id
    pub id: String,

    /// Feature version or range; latest when omitted
    #[arg(long)]
    pub version: Option<String>,

    /// Output JSON
    #[arg(long)]
    pub json: bool,
}

#[derive(Serialize)]
struct FeatureOutput<'a> {
    feature: &'a str,
    bundles: Vec<pax_core::EclipseBundle>,
}

pub fn run(args: FeatureArgs, config: &PaxConfig) -> Result<()> {
    if !args.json {
        console::header("feature", env!("CARGO_PKG_VERSION"));
    }

    let version = VersionRequest::parse_optional(args.version.as_deref())?;
    let source = DirectorySource::new(&args.dir)?;
    let bundles = resolve::feature_bundles(&source, &args.id, &version, &config.environment)?;

    if args.json {
        let output = FeatureOutput {
            feature: &args.id,
            bundles,
        };
        println!("{}", serde_json::to_string_pretty(&output)?);
        return Ok(());
    }

    if bundles.is_empty() {
        console::warn(&format!("{} includes no bundles for this environment", args.id));
        return Ok(());
    }

    for bundle in &bundles {
        console::item(&bundle.id, &bundle.version.to_string(), &bundle.location);
    }
    console::summary(bundles.len(), console::elapsed_secs());

    Ok(())
}
