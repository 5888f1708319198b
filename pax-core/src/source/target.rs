use super::{
    ArtifactSource, BundleSource, CombinedSource, DirectorySource, FeatureSource,
    RepositoryLocation, UnitSource,
};
use crate::artifact::VersionRequest;
use crate::bundle::EclipseBundle;
use crate::config::{PaxConfig, expand_env_vars};
use crate::environment::{EclipseEnvironment, EnvironmentOverride};
use crate::resolve::{IncludeMode, UnitResolver};
use crate::xml::{self, Node};
use crate::{PaxError, Result};
use std::fs;
use std::path::{Path, PathBuf};
use tracing::{debug, warn};

/// One `<location>` of a `.target` file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TargetLocation {
    Directory(PathBuf),
    Profile(PathBuf),
    InstallableUnit {
        mode: IncludeMode,
        units: Vec<(String, VersionRequest)>,
        repositories: Vec<String>,
    },
}

/// A parsed Eclipse PDE target definition.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TargetDefinition {
    pub name: Option<String>,
    pub locations: Vec<TargetLocation>,
    pub environment: EnvironmentOverride,
}

impl TargetDefinition {
    pub fn load(path: &Path) -> Result<Self> {
        let text = fs::read_to_string(path).map_err(|source| PaxError::ReadFile {
            path: path.to_path_buf(),
            source,
        })?;
        let base = path.parent().unwrap_or(Path::new("."));
        Self::parse(&text, path, base)
    }

    /// Relative location paths are taken from `base`.
    pub fn parse(text: &str, origin: &Path, base: &Path) -> Result<Self> {
        let origin_name = origin.display().to_string();
        let mut definition = TargetDefinition::default();
        let mut stack: Vec<String> = Vec::new();
        let mut pending: Option<TargetLocation> = None;

        xml::walk(text, &origin_name, |node| {
            match node {
                Node::Open(element) => {
                    let parent = stack.last().map(String::as_str);

                    match (parent, element.name.as_str()) {
                        (None, "target") => {
                            definition.name = element.attr("name").map(str::to_string);
                        }
                        (Some("locations"), "location") => {
                            let kind = element.attr("type").unwrap_or("");
                            pending = match kind {
                                "Directory" | "Profile" => {
                                    let raw = element.attr("path").ok_or_else(|| {
                                        PaxError::TargetInvalid {
                                            path: origin.to_path_buf(),
                                            reason: format!("{kind} location without a path"),
                                        }
                                    })?;
                                    let path = resolve_path(base, raw);
                                    Some(if kind == "Directory" {
                                        TargetLocation::Directory(path)
                                    } else {
                                        TargetLocation::Profile(path)
                                    })
                                }
                                "InstallableUnit" => {
                                    let mode = element
                                        .attr("includeMode")
                                        .and_then(IncludeMode::from_str)
                                        .unwrap_or_default();
                                    Some(TargetLocation::InstallableUnit {
                                        mode,
                                        units: Vec::new(),
                                        repositories: Vec::new(),
                                    })
                                }
                                other => {
                                    warn!("{}: unsupported location type {:?}", origin_name, other);
                                    None
                                }
                            };
                        }
                        (Some("location"), "unit") => {
                            if let Some(TargetLocation::InstallableUnit { units, .. }) =
                                pending.as_mut()
                            {
                                let id = element.required("id", &origin_name)?;
                                let version = VersionRequest::parse_optional(element.attr("version"))?;
                                units.push((id.to_string(), version));
                            }
                        }
                        (Some("location"), "repository") => {
                            if let Some(TargetLocation::InstallableUnit { repositories, .. }) =
                                pending.as_mut()
                            {
                                let location = element.required("location", &origin_name)?;
                                repositories.push(expand_env_vars(location));
                            }
                        }
                        _ => {}
                    }

                    stack.push(element.name);
                }
                Node::Text(text) => {
                    let inside_environment = stack.len() >= 2
                        && stack[stack.len() - 2] == "environment";
                    if inside_environment {
                        let value = Some(text.trim().to_string());
                        match stack.last().map(String::as_str) {
                            Some("os") => definition.environment.os = value,
                            Some("ws") => definition.environment.ws = value,
                            Some("arch") => definition.environment.arch = value,
                            _ => {}
                        }
                    }
                }
                Node::Close(name) => {
                    stack.pop();
                    if name == "location"
                        && let Some(location) = pending.take()
                    {
                        definition.locations.push(location);
                    }
                }
            }
            Ok(())
        })?;

        Ok(definition)
    }

    /// Opens every location: folders are scanned now, repositories are read
    /// on first lookup.
    pub fn open(&self, config: &PaxConfig) -> Result<TargetPlatform> {
        let mut sources = CombinedSource::new();
        let mut groups = Vec::new();

        for location in &self.locations {
            match location {
                TargetLocation::Directory(path) => {
                    sources.push(Box::new(DirectorySource::new(path)?));
                }
                TargetLocation::Profile(path) => {
                    // a profile is an installation; its bundles live in plugins/
                    sources.push(Box::new(DirectorySource::new(path)?));
                }
                TargetLocation::InstallableUnit {
                    mode,
                    units,
                    repositories,
                } => {
                    let first = sources.len();
                    for url in repositories {
                        sources.push(Box::new(RepositoryLocation::from_config(url, config)));
                    }
                    groups.push(UnitGroup {
                        mode: *mode,
                        units: units.clone(),
                        first,
                        count: repositories.len(),
                    });
                }
            }
        }

        Ok(TargetPlatform {
            name: self.name.clone(),
            environment: self.environment.clone(),
            sources,
            groups,
        })
    }
}

fn resolve_path(base: &Path, raw: &str) -> PathBuf {
    let expanded = PathBuf::from(expand_env_vars(raw));
    if expanded.is_absolute() {
        expanded
    } else {
        base.join(expanded)
    }
}

#[derive(Debug)]
struct UnitGroup {
    mode: IncludeMode,
    units: Vec<(String, VersionRequest)>,
    first: usize,
    count: usize,
}

/// An opened target definition. Lookups go through its folders first, then
/// its repositories, in file order.
pub struct TargetPlatform {
    name: Option<String>,
    environment: EnvironmentOverride,
    sources: CombinedSource,
    groups: Vec<UnitGroup>,
}

impl TargetPlatform {
    pub fn name(&self) -> Option<&str> {
        self.name.as_deref()
    }

    pub fn environment(&self, base: &EclipseEnvironment) -> EclipseEnvironment {
        self.environment.apply(base)
    }

    /// Resolves the units every `InstallableUnit` location lists over that
    /// location's repositories and returns the bundles they bring in.
    pub fn unit_bundles(&self, base: &EclipseEnvironment) -> Result<Vec<EclipseBundle>> {
        let environment = self.environment(base);
        let delegates: Vec<&dyn ArtifactSource> = self.sources.delegates().collect();
        let mut bundles = Vec::new();

        for group in &self.groups {
            if group.units.is_empty() {
                continue;
            }

            let locations = delegates[group.first..group.first + group.count].to_vec();
            let mut resolver = UnitResolver::new(locations, group.mode, &environment);

            let mut roots = Vec::new();
            for (id, version) in &group.units {
                roots.push(resolver.find(id, version)?);
            }
            resolver.resolve(&roots)?;

            debug!("target location resolved {} bundles", resolver.bundles().len());
            bundles.extend(resolver.bundles());
        }

        Ok(bundles)
    }
}

impl ArtifactSource for TargetPlatform {
    fn describe(&self) -> String {
        format!("target {}", self.name.as_deref().unwrap_or("<unnamed>"))
    }

    fn bundles(&self) -> Option<&dyn BundleSource> {
        self.sources.bundles()
    }

    fn features(&self) -> Option<&dyn FeatureSource> {
        self.sources.features()
    }

    fn units(&self) -> Option<&dyn UnitSource> {
        self.sources.units()
    }
}
