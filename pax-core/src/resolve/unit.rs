use super::{FeatureResolver, IncludeMode};
use crate::artifact::{ArtifactKind, ArtifactRef, ArtifactRequest, VersionRequest};
use crate::bundle::EclipseBundle;
use crate::environment::EclipseEnvironment;
use crate::feature::Feature;
use crate::index::ArtifactIndex;
use crate::source::{self, ArtifactSource};
use crate::unit::{InstallableUnit, Requirement, namespace};
use crate::{PaxError, Result};
use pax_version::Version;
use std::collections::{BTreeMap, BTreeSet};
use tracing::{debug, warn};

/// Capabilities already provided during one resolution pass, per namespace.
#[derive(Debug, Default)]
pub struct ResolvedRequirements {
    provided: BTreeMap<String, ArtifactIndex<()>>,
}

impl ResolvedRequirements {
    pub fn record(&mut self, namespace: &str, name: &str, version: &Version) {
        self.provided
            .entry(namespace.to_string())
            .or_default()
            .add(ArtifactRef::new(name, version.clone(), ()));
    }

    pub fn record_unit(&mut self, unit: &InstallableUnit) {
        self.record(namespace::UNIT, &unit.id, &unit.version);
        for capability in &unit.provides {
            self.record(&capability.namespace, &capability.name, &capability.version);
        }
    }

    pub fn is_satisfied(&self, requirement: &Requirement) -> bool {
        self.provided
            .get(&requirement.namespace)
            .and_then(|index| index.get_in_range(&requirement.name, &requirement.range))
            .is_some()
    }
}

/// Walks p2 requirement graphs across an ordered list of repository
/// locations. Each location must offer units; bundle and feature artifacts
/// are fetched from the location that owns the unit.
pub struct UnitResolver<'a> {
    locations: Vec<&'a dyn ArtifactSource>,
    mode: IncludeMode,
    environment: &'a EclipseEnvironment,
    units: ArtifactIndex<InstallableUnit>,
    bundles: ArtifactIndex<EclipseBundle>,
}

impl<'a> UnitResolver<'a> {
    pub fn new(
        locations: Vec<&'a dyn ArtifactSource>,
        mode: IncludeMode,
        environment: &'a EclipseEnvironment,
    ) -> Self {
        UnitResolver {
            locations,
            mode,
            environment,
            units: ArtifactIndex::new(),
            bundles: ArtifactIndex::new(),
        }
    }

    /// Resolves each root in turn. The set of satisfied requirements is
    /// shared across the roots of one call and dropped afterwards.
    pub fn resolve(&mut self, roots: &[InstallableUnit]) -> Result<()> {
        if roots.is_empty() {
            return Err(PaxError::EmptyRequest { what: "units" });
        }

        let mut resolved = ResolvedRequirements::default();
        let mut visited = BTreeSet::new();

        for root in roots {
            let request = VersionRequest::Exact(root.version.clone());
            let (origin, _) = self.find_unit(None, &root.id, &request)?;
            self.resolve_unit(origin, root, &mut resolved, &mut visited)?;
        }

        Ok(())
    }

    /// First unit matching the request, searching every location in order.
    pub fn find(&self, name: &str, version: &VersionRequest) -> Result<InstallableUnit> {
        self.find_unit(None, name, version).map(|(_, unit)| unit)
    }

    /// Looks `name` up across all locations and resolves what it finds.
    pub fn resolve_named(&mut self, name: &str, version: &VersionRequest) -> Result<()> {
        let unit = self.find(name, version)?;
        self.resolve(&[unit])
    }

    pub fn bundles(&self) -> Vec<EclipseBundle> {
        self.bundles
            .artifacts()
            .into_iter()
            .map(|artifact| artifact.context.clone())
            .collect()
    }

    pub fn units(&self) -> Vec<&InstallableUnit> {
        self.units
            .artifacts()
            .into_iter()
            .map(|artifact| &artifact.context)
            .collect()
    }

    fn resolve_unit(
        &mut self,
        origin: usize,
        unit: &InstallableUnit,
        resolved: &mut ResolvedRequirements,
        visited: &mut BTreeSet<String>,
    ) -> Result<()> {
        if !visited.insert(unit.key()) {
            return Ok(());
        }

        if let Some(filter) = &unit.filter
            && !self.environment.matches_filter(filter)
        {
            debug!("{} excluded by filter {}", unit.key(), filter);
            return Ok(());
        }

        resolved.record_unit(unit);
        self.units.add(ArtifactRef::new(
            unit.id.clone(),
            unit.version.clone(),
            unit.clone(),
        ));

        self.install_artifacts(origin, unit)?;

        for requirement in &unit.requires {
            if requirement.optional {
                debug!("{} skips optional {}", unit.key(), requirement.name);
                continue;
            }

            if let Some(filter) = &requirement.filter
                && !self.environment.matches_filter(filter)
            {
                continue;
            }

            if resolved.is_satisfied(requirement) {
                continue;
            }

            match self.satisfy(origin, requirement, resolved, visited) {
                Ok(()) => {}
                Err(err) if self.mode == IncludeMode::Slicer && err.is_not_found() => {
                    warn!("{} leaves {} unsatisfied: {}", unit.key(), requirement.name, err);
                }
                Err(err) => return Err(err),
            }
        }

        Ok(())
    }

    /// Bundle artifacts come from the unit's own location only. Feature
    /// artifacts are collected and resolved together once the unit's
    /// artifact list has been read.
    fn install_artifacts(&mut self, origin: usize, unit: &InstallableUnit) -> Result<()> {
        let location = self.locations[origin];
        let mut deferred: Vec<Feature> = Vec::new();

        for artifact in &unit.artifacts {
            let request = VersionRequest::Exact(artifact.version.clone());

            match artifact.classifier.as_str() {
                namespace::BUNDLE => {
                    if self.bundles.contains(&artifact.id, &artifact.version) {
                        continue;
                    }
                    let bundle = source::require_bundles(location)?.bundle(&artifact.id, &request)?;
                    self.add_bundle(bundle);
                }
                namespace::FEATURE => {
                    let feature =
                        source::require_features(location)?.feature(&artifact.id, &request)?;
                    deferred.push(feature);
                }
                other => debug!("{} has artifact of unknown kind {}", unit.key(), other),
            }
        }

        if deferred.is_empty() {
            return Ok(());
        }

        let mut features = FeatureResolver::new(
            source::require_bundles(location)?,
            location.features(),
            self.environment,
        );
        features.resolve(&deferred)?;

        for bundle in features.included_bundles() {
            if !self.bundles.contains(&bundle.id, &bundle.version) {
                self.add_bundle(bundle);
            }
        }

        Ok(())
    }

    fn satisfy(
        &mut self,
        origin: usize,
        requirement: &Requirement,
        resolved: &mut ResolvedRequirements,
        visited: &mut BTreeSet<String>,
    ) -> Result<()> {
        let request = requirement.version_request();

        match requirement.namespace.as_str() {
            namespace::UNIT => {
                let (owner, found) = self.find_unit(Some(origin), &requirement.name, &request)?;
                self.resolve_unit(owner, &found, resolved, visited)
            }
            namespace::BUNDLE => {
                let bundle = self.find_bundle(origin, &requirement.name, &request)?;
                resolved.record(namespace::BUNDLE, &bundle.id, &bundle.version);
                if !self.bundles.contains(&bundle.id, &bundle.version) {
                    self.add_bundle(bundle);
                }
                Ok(())
            }
            namespace::PACKAGE => {
                let (owner, provider) = self.find_package_provider(requirement)?;
                self.resolve_unit(owner, &provider, resolved, visited)
            }
            other => {
                let request = ArtifactRequest::new(
                    ArtifactKind::Capability(other.to_string()),
                    &requirement.name,
                    &request,
                );
                if self.mode == IncludeMode::Slicer {
                    debug!("slicer skips {}", request);
                    Ok(())
                } else {
                    Err(PaxError::not_found(request))
                }
            }
        }
    }

    /// `origin` first, then the others in registration order unless slicing.
    fn search_order(&self, origin: Option<usize>) -> Vec<usize> {
        match origin {
            None => (0..self.locations.len()).collect(),
            Some(origin) if self.mode == IncludeMode::Slicer => vec![origin],
            Some(origin) => std::iter::once(origin)
                .chain((0..self.locations.len()).filter(|&i| i != origin))
                .collect(),
        }
    }

    fn find_unit(
        &self,
        origin: Option<usize>,
        name: &str,
        version: &VersionRequest,
    ) -> Result<(usize, InstallableUnit)> {
        let mut failures = Vec::new();

        for index in self.search_order(origin) {
            let location = self.locations[index];
            match source::require_units(location).and_then(|units| units.unit(name, version)) {
                Ok(found) => return Ok((index, found.clone())),
                Err(err) if err.is_miss() => failures.push(err),
                Err(err) => return Err(err),
            }
        }

        Err(PaxError::ArtifactNotFound {
            request: ArtifactRequest::unit(name, version),
            suppressed: failures,
        })
    }

    fn find_bundle(
        &self,
        origin: usize,
        name: &str,
        version: &VersionRequest,
    ) -> Result<EclipseBundle> {
        let mut failures = Vec::new();

        for index in self.search_order(Some(origin)) {
            let location = self.locations[index];
            match source::require_bundles(location).and_then(|bundles| bundles.bundle(name, version))
            {
                Ok(found) => return Ok(found),
                Err(err) if err.is_miss() => failures.push(err),
                Err(err) => return Err(err),
            }
        }

        Err(PaxError::ArtifactNotFound {
            request: ArtifactRequest::bundle(name, version),
            suppressed: failures,
        })
    }

    /// Highest provided package version wins; on a tie, the earlier
    /// location.
    fn find_package_provider(
        &self,
        requirement: &Requirement,
    ) -> Result<(usize, InstallableUnit)> {
        let mut best: Option<(usize, &InstallableUnit, &Version)> = None;

        for (index, location) in self.locations.iter().enumerate() {
            let Some(units) = location.units() else {
                continue;
            };

            for unit in units.all_units()? {
                let Some(version) =
                    unit.best_provided(namespace::PACKAGE, &requirement.name, &requirement.range)
                else {
                    continue;
                };

                let better = match &best {
                    None => true,
                    Some((_, _, current)) => version > *current,
                };
                if better {
                    best = Some((index, unit, version));
                }
            }
        }

        match best {
            Some((index, unit, _)) => Ok((index, unit.clone())),
            None => Err(PaxError::not_found(ArtifactRequest::new(
                ArtifactKind::Package,
                &requirement.name,
                &requirement.version_request(),
            ))),
        }
    }

    fn add_bundle(&mut self, bundle: EclipseBundle) {
        debug!("unit resolution adds {}", bundle.key());
        self.bundles
            .add(ArtifactRef::new(bundle.id.clone(), bundle.version.clone(), bundle));
    }
}
