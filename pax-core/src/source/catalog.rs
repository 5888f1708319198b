use crate::artifact::{ArtifactRef, ArtifactRequest, VersionRequest};
use crate::bundle::{BundleManifest, EclipseBundle};
use crate::feature::Feature;
use crate::index::ArtifactIndex;
use crate::{PaxError, Result};
use std::path::Path;
use tracing::{debug, warn};

/// Bundle and feature indexes owned by a filesystem-backed source.
#[derive(Debug, Default)]
pub struct Catalog {
    pub bundles: ArtifactIndex<EclipseBundle>,
    pub features: ArtifactIndex<Feature>,
}

impl Catalog {
    pub fn add_bundle(&mut self, bundle: EclipseBundle) {
        self.bundles
            .add(ArtifactRef::new(bundle.id.clone(), bundle.version.clone(), bundle));
    }

    pub fn add_feature(&mut self, feature: Feature) {
        self.features
            .add(ArtifactRef::new(feature.id.clone(), feature.version.clone(), feature));
    }

    /// Indexes `path` if it is a bundle. Plain jars are skipped quietly,
    /// unreadable ones with a warning.
    pub fn scan_bundle(&mut self, path: &Path) -> bool {
        match BundleManifest::read(path) {
            Ok(Some(manifest)) => {
                let bundle = EclipseBundle::from_manifest(&manifest, path.display().to_string());
                debug!("indexed bundle {} at {}", bundle.key(), path.display());
                self.add_bundle(bundle);
                true
            }
            Ok(None) => {
                debug!("{} has no Bundle-SymbolicName", path.display());
                false
            }
            Err(err) => {
                warn!("skipping {}: {}", path.display(), err);
                false
            }
        }
    }

    pub fn scan_feature(&mut self, path: &Path) -> bool {
        match Feature::read(path) {
            Ok(feature) => {
                debug!("indexed feature {} at {}", feature.key(), path.display());
                self.add_feature(feature);
                true
            }
            Err(err) => {
                warn!("skipping {}: {}", path.display(), err);
                false
            }
        }
    }

    pub fn bundle(&self, name: &str, version: &VersionRequest) -> Result<EclipseBundle> {
        self.bundles
            .get_fuzzy(name, version)
            .map(|found| found.context.clone())
            .ok_or_else(|| PaxError::not_found(ArtifactRequest::bundle(name, version)))
    }

    pub fn feature(&self, name: &str, version: &VersionRequest) -> Result<Feature> {
        self.features
            .get_fuzzy(name, version)
            .map(|found| found.context.clone())
            .ok_or_else(|| PaxError::not_found(ArtifactRequest::feature(name, version)))
    }
}
