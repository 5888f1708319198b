use crate::Result;
use crate::artifact::VersionRequest;
use crate::bundle::EclipseBundle;
use crate::feature::Feature;
use crate::unit::InstallableUnit;
use std::fmt;

pub mod catalog;
pub mod combined;
pub mod directory;
pub mod p2;
pub mod target;
pub mod workspace;

pub use catalog::Catalog;
pub use combined::CombinedSource;
pub use directory::DirectorySource;
pub use p2::RepositoryLocation;
pub use target::{TargetDefinition, TargetPlatform};
pub use workspace::WorkspaceSource;

pub trait BundleSource {
    fn bundle(&self, name: &str, version: &VersionRequest) -> Result<EclipseBundle>;
}

pub trait FeatureSource {
    fn feature(&self, name: &str, version: &VersionRequest) -> Result<Feature>;
}

pub trait UnitSource {
    fn unit(&self, name: &str, version: &VersionRequest) -> Result<&InstallableUnit>;

    fn all_units(&self) -> Result<Vec<&InstallableUnit>>;
}

/// Something resolution can consult. A source declares which lookups it
/// supports by returning `Some` from the matching accessor.
pub trait ArtifactSource {
    fn describe(&self) -> String;

    fn bundles(&self) -> Option<&dyn BundleSource> {
        None
    }

    fn features(&self) -> Option<&dyn FeatureSource> {
        None
    }

    fn units(&self) -> Option<&dyn UnitSource> {
        None
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Capability {
    Bundles,
    Features,
    Units,
}

impl fmt::Display for Capability {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Capability::Bundles => write!(f, "bundle source"),
            Capability::Features => write!(f, "feature source"),
            Capability::Units => write!(f, "unit source"),
        }
    }
}

pub(crate) fn require_bundles(source: &dyn ArtifactSource) -> Result<&dyn BundleSource> {
    source
        .bundles()
        .ok_or_else(|| unsupported(source, Capability::Bundles))
}

pub(crate) fn require_features(source: &dyn ArtifactSource) -> Result<&dyn FeatureSource> {
    source
        .features()
        .ok_or_else(|| unsupported(source, Capability::Features))
}

pub(crate) fn require_units(source: &dyn ArtifactSource) -> Result<&dyn UnitSource> {
    source
        .units()
        .ok_or_else(|| unsupported(source, Capability::Units))
}

fn unsupported(source: &dyn ArtifactSource, capability: Capability) -> crate::PaxError {
    crate::PaxError::UnsupportedCapability {
        source_name: source.describe(),
        capability,
    }
}
