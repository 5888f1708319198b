use anyhow::{Context, Result};
use clap::Args;
use pax_core::{PaxConfig, ProvisionPlan, console, operations};
use std::path::PathBuf;

#[derive(Args, Debug)]
pub struct ProvisionArgs {
    /// Path to the provisioning plan (YAML)
    pub plan: PathBuf,

    /// Print launch entries as JSON
    #[arg(long)]
    pub json: bool,
}

pub fn run(args: ProvisionArgs, config: &PaxConfig) -> Result<()> {
    if !args.json {
        console::header("provision", env!("CARGO_PKG_VERSION"));
    }

    let plan = ProvisionPlan::load(&args.plan)
        .with_context(|| format!("loading {}", args.plan.display()))?;

    let set = match operations::provision(config, &plan) {
        Ok(set) => set,
        Err(err) => {
            console::error(&err.to_string());
            for failure in err.suppressed() {
                console::warn(&format!("  {failure}"));
            }
            return Err(err.into());
        }
    };

    let entries = set.launch_entries();

    if args.json {
        println!("{}", serde_json::to_string_pretty(&entries)?);
        return Ok(());
    }

    for entry in &entries {
        console::bundle(entry);
    }
    console::summary(entries.len(), console::elapsed_secs());

    Ok(())
}
