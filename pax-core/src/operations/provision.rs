use crate::bundle::EclipseBundle;
use crate::config::PaxConfig;
use crate::plan::{PlanRequest, PlanSource, ProvisionPlan};
use crate::provision::{IgnoreSet, Provisioning, ProvisioningSet};
use crate::resolve::{self, UnitResolver};
use crate::source::{
    self, ArtifactSource, CombinedSource, DirectorySource, RepositoryLocation, TargetDefinition,
    WorkspaceSource,
};
use crate::{Result, console};
use std::time::Instant;
use tracing::{debug, info};

/// Opens every source a plan names, in plan order. Bundles that target
/// platforms declare through their unit locations are returned alongside.
pub fn open_sources(
    config: &PaxConfig,
    plan: &ProvisionPlan,
) -> Result<(CombinedSource, Vec<EclipseBundle>)> {
    let environment = plan.environment(&config.environment);
    let mut sources = CombinedSource::new();
    let mut target_bundles = Vec::new();

    for entry in &plan.sources {
        match entry {
            PlanSource::Directory(path) => {
                sources.push(Box::new(DirectorySource::new(path)?));
            }
            PlanSource::Workspace { root, patterns } => {
                sources.push(Box::new(WorkspaceSource::with_patterns(root, patterns)?));
            }
            PlanSource::Repository(url) => {
                sources.push(Box::new(RepositoryLocation::from_config(url, config)));
            }
            PlanSource::Target(path) => {
                let platform = TargetDefinition::load(path)?.open(config)?;
                target_bundles.extend(platform.unit_bundles(&environment)?);
                sources.push(Box::new(platform));
            }
        }
    }

    Ok((sources, target_bundles))
}

/// Runs a plan end to end and returns the launch-ready bundle set.
pub fn provision(config: &PaxConfig, plan: &ProvisionPlan) -> Result<ProvisioningSet> {
    let started = Instant::now();
    let environment = plan.environment(&config.environment);
    let policy = plan.singleton_conflict.unwrap_or(config.singleton_conflict);
    let mode = plan.include_mode.unwrap_or(config.include_mode);

    let ignore = IgnoreSet::new(config.ignore.iter().chain(plan.ignore.iter()).cloned());
    let mut provisioning = Provisioning::new(policy, ignore);

    console::step("Opening sources");
    let (sources, target_bundles) = open_sources(config, plan)?;
    debug!("{}", sources.describe());
    provisioning.add_all(target_bundles)?;

    for request in &plan.requests {
        match request {
            PlanRequest::Feature {
                id,
                version,
                start_level,
            } => {
                console::step(&format!("Resolving feature {id}"));
                let mut bundles = resolve::feature_bundles(&sources, id, version, &environment)?;
                if let Some(level) = start_level {
                    for bundle in &mut bundles {
                        bundle.start_level = Some(*level);
                    }
                }
                provisioning.add_all(bundles)?;
            }
            PlanRequest::Unit { id, version } => {
                console::step(&format!("Resolving unit {id}"));
                let locations: Vec<&dyn ArtifactSource> = sources
                    .delegates()
                    .filter(|source| source.units().is_some())
                    .collect();
                let mut resolver = UnitResolver::new(locations, mode, &environment);
                resolver.resolve_named(id, version)?;
                provisioning.add_all(resolver.bundles())?;
            }
            PlanRequest::Bundle {
                id,
                version,
                start,
                start_level,
            } => {
                let mut bundle = source::require_bundles(&sources)?.bundle(id, version)?;
                bundle.ensure_available()?;
                if let Some(start) = start {
                    bundle.start = *start;
                }
                if start_level.is_some() {
                    bundle.start_level = *start_level;
                }
                provisioning.add(bundle)?;
            }
        }
    }

    let set = provisioning.into_set();
    info!(
        "provisioned {} bundles in {:.3}s",
        set.len(),
        started.elapsed().as_secs_f64()
    );

    Ok(set)
}
