use crate::artifact::{ArtifactRef, ArtifactRequest};
use crate::bundle::EclipseBundle;
use crate::environment::EclipseEnvironment;
use crate::feature::Feature;
use crate::index::ArtifactIndex;
use crate::source::{BundleSource, FeatureSource};
use crate::{PaxError, Result};
use tracing::{debug, warn};

/// Flattens a feature graph into the bundles it installs.
///
/// Each feature is visited once per resolver, keyed by `id:version`, so
/// include cycles terminate. Bundles a feature lists directly must resolve;
/// included features may be optional, in which case a missing one is logged
/// and its subtree dropped.
pub struct FeatureResolver<'a> {
    bundle_source: &'a dyn BundleSource,
    feature_source: Option<&'a dyn FeatureSource>,
    environment: &'a EclipseEnvironment,
    features: ArtifactIndex<Feature>,
    bundles: ArtifactIndex<EclipseBundle>,
}

impl<'a> FeatureResolver<'a> {
    pub fn new(
        bundle_source: &'a dyn BundleSource,
        feature_source: Option<&'a dyn FeatureSource>,
        environment: &'a EclipseEnvironment,
    ) -> Self {
        FeatureResolver {
            bundle_source,
            feature_source,
            environment,
            features: ArtifactIndex::new(),
            bundles: ArtifactIndex::new(),
        }
    }

    pub fn resolve(&mut self, roots: &[Feature]) -> Result<()> {
        if roots.is_empty() {
            return Err(PaxError::EmptyRequest { what: "features" });
        }

        for root in roots {
            self.add_feature(root)?;
        }
        Ok(())
    }

    pub fn add_feature(&mut self, feature: &Feature) -> Result<()> {
        if self.features.contains(&feature.id, &feature.version) {
            debug!("feature {} already visited", feature.key());
            return Ok(());
        }

        self.features.add(ArtifactRef::new(
            feature.id.clone(),
            feature.version.clone(),
            feature.clone(),
        ));

        for plugin in &feature.plugins {
            if !plugin.filter.matches(self.environment) {
                debug!("{} excluded from {} by platform filter", plugin.id, feature.key());
                continue;
            }

            if self.bundles.get(&plugin.id, &plugin.version).is_some() {
                continue;
            }

            let bundle = self.bundle_source.bundle(&plugin.id, &plugin.version)?;
            if !self.bundles.contains(&bundle.id, &bundle.version) {
                debug!("{} adds {}", feature.key(), bundle.key());
                self.bundles
                    .add(ArtifactRef::new(bundle.id.clone(), bundle.version.clone(), bundle));
            }
        }

        for include in &feature.includes {
            if !include.filter.matches(self.environment) {
                debug!("{} excluded from {} by platform filter", include.id, feature.key());
                continue;
            }

            let Some(feature_source) = self.feature_source else {
                if include.optional {
                    debug!("no feature source for optional include {}", include.id);
                    continue;
                }
                return Err(PaxError::not_found(ArtifactRequest::feature(
                    &include.id,
                    &include.version,
                )));
            };

            let included = match feature_source.feature(&include.id, &include.version) {
                Ok(included) => included,
                Err(err) if include.optional && err.is_not_found() => {
                    warn!("optional feature {} of {} skipped: {}", include.id, feature.key(), err);
                    continue;
                }
                Err(err) => return Err(err),
            };

            match self.add_feature(&included) {
                Ok(()) => {}
                Err(err) if include.optional && err.is_not_found() => {
                    warn!("optional feature {} of {} skipped: {}", include.id, feature.key(), err);
                }
                Err(err) => return Err(err),
            }
        }

        Ok(())
    }

    /// Every bundle collected so far that is still available, ascending by
    /// name and version. Bundles whose location has gone missing since they
    /// were indexed are dropped without error.
    pub fn included_bundles(&self) -> Vec<EclipseBundle> {
        self.bundles
            .artifacts()
            .into_iter()
            .filter(|artifact| match artifact.context.ensure_available() {
                Ok(()) => true,
                Err(err) => {
                    debug!("dropping {}: {}", artifact.key(), err);
                    false
                }
            })
            .map(|artifact| artifact.context.clone())
            .collect()
    }

    pub fn features(&self) -> Vec<&Feature> {
        self.features
            .artifacts()
            .into_iter()
            .map(|artifact| &artifact.context)
            .collect()
    }
}
