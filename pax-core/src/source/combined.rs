use super::{ArtifactSource, BundleSource, Capability, FeatureSource, UnitSource};
use crate::artifact::{ArtifactRequest, VersionRequest};
use crate::bundle::EclipseBundle;
use crate::feature::Feature;
use crate::unit::InstallableUnit;
use crate::{PaxError, Result};
use tracing::debug;

/// Fans each lookup out over its delegates in registration order. The first
/// delegate that answers wins; if none does, every delegate's failure is
/// carried by a single not-found error.
#[derive(Default)]
pub struct CombinedSource {
    delegates: Vec<Box<dyn ArtifactSource>>,
}

impl CombinedSource {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, source: Box<dyn ArtifactSource>) {
        self.delegates.push(source);
    }

    pub fn with(mut self, source: impl ArtifactSource + 'static) -> Self {
        self.push(Box::new(source));
        self
    }

    pub fn delegates(&self) -> impl Iterator<Item = &dyn ArtifactSource> {
        self.delegates.iter().map(|source| source.as_ref())
    }

    pub fn len(&self) -> usize {
        self.delegates.len()
    }

    pub fn is_empty(&self) -> bool {
        self.delegates.is_empty()
    }

    fn first_success<'s, T>(
        &'s self,
        request: ArtifactRequest,
        capability: Capability,
        mut lookup: impl FnMut(&'s dyn ArtifactSource) -> Option<Result<T>>,
    ) -> Result<T> {
        match fan_out(self.delegates(), capability, &mut lookup)? {
            Ok(found) => Ok(found),
            Err(suppressed) => {
                debug!(
                    "{} missing from all {} delegates",
                    request,
                    self.delegates.len()
                );
                Err(PaxError::ArtifactNotFound {
                    request,
                    suppressed,
                })
            }
        }
    }
}

/// `lookup` returns `None` when a delegate lacks the capability. Misses are
/// collected; any other failure ends the fan-out and is returned as is.
fn fan_out<'s, T>(
    delegates: impl Iterator<Item = &'s dyn ArtifactSource>,
    capability: Capability,
    lookup: &mut impl FnMut(&'s dyn ArtifactSource) -> Option<Result<T>>,
) -> Result<std::result::Result<T, Vec<PaxError>>> {
    let mut failures = Vec::new();

    for delegate in delegates {
        match lookup(delegate) {
            Some(Ok(found)) => return Ok(Ok(found)),
            Some(Err(err)) if err.is_miss() => failures.push(err),
            Some(Err(err)) => return Err(err),
            None => failures.push(PaxError::UnsupportedCapability {
                source_name: delegate.describe(),
                capability,
            }),
        }
    }

    Ok(Err(failures))
}

impl BundleSource for CombinedSource {
    fn bundle(&self, name: &str, version: &VersionRequest) -> Result<EclipseBundle> {
        self.first_success(
            ArtifactRequest::bundle(name, version),
            Capability::Bundles,
            |delegate| delegate.bundles().map(|source| source.bundle(name, version)),
        )
    }
}

impl FeatureSource for CombinedSource {
    fn feature(&self, name: &str, version: &VersionRequest) -> Result<Feature> {
        self.first_success(
            ArtifactRequest::feature(name, version),
            Capability::Features,
            |delegate| delegate.features().map(|source| source.feature(name, version)),
        )
    }
}

impl UnitSource for CombinedSource {
    fn unit(&self, name: &str, version: &VersionRequest) -> Result<&InstallableUnit> {
        self.first_success(
            ArtifactRequest::unit(name, version),
            Capability::Units,
            |delegate| delegate.units().map(|source| source.unit(name, version)),
        )
    }

    /// Units of every delegate that has any; delegates without the
    /// capability are skipped.
    fn all_units(&self) -> Result<Vec<&InstallableUnit>> {
        let mut all = Vec::new();
        for delegate in self.delegates() {
            if let Some(units) = delegate.units() {
                all.extend(units.all_units()?);
            }
        }
        Ok(all)
    }
}

impl ArtifactSource for CombinedSource {
    fn describe(&self) -> String {
        let names: Vec<String> = self.delegates().map(|d| d.describe()).collect();
        format!("combined [{}]", names.join(", "))
    }

    fn bundles(&self) -> Option<&dyn BundleSource> {
        Some(self)
    }

    fn features(&self) -> Option<&dyn FeatureSource> {
        Some(self)
    }

    fn units(&self) -> Option<&dyn UnitSource> {
        Some(self)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct Named(&'static str);

    impl ArtifactSource for Named {
        fn describe(&self) -> String {
            self.0.to_string()
        }
    }

    #[test]
    fn delegate_without_capability_is_recorded() {
        let combined = CombinedSource::new().with(Named("a")).with(Named("b"));
        let err = combined
            .feature("f", &VersionRequest::Latest)
            .unwrap_err();

        assert!(err.is_not_found());
        assert_eq!(err.suppressed().len(), 2);
        assert!(matches!(
            err.suppressed()[0],
            PaxError::UnsupportedCapability {
                capability: Capability::Features,
                ..
            }
        ));
    }

    struct Unreachable;

    impl BundleSource for Unreachable {
        fn bundle(&self, _name: &str, _version: &VersionRequest) -> Result<EclipseBundle> {
            Err(PaxError::RepositoryUnavailable {
                url: "https://unreachable.example.org/p2".to_string(),
                reason: "connection refused".to_string(),
            })
        }
    }

    impl ArtifactSource for Unreachable {
        fn describe(&self) -> String {
            "unreachable".to_string()
        }

        fn bundles(&self) -> Option<&dyn BundleSource> {
            Some(self)
        }
    }

    #[test]
    fn delegate_failure_is_returned_unchanged() {
        let combined = CombinedSource::new().with(Named("a")).with(Unreachable);
        let err = combined.bundle("x", &VersionRequest::Latest).unwrap_err();

        assert!(!err.is_not_found());
        assert!(matches!(err, PaxError::RepositoryUnavailable { .. }));
    }

    #[test]
    fn empty_combined_source_reports_nothing_suppressed() {
        let combined = CombinedSource::new();
        let err = combined.bundle("x", &VersionRequest::Latest).unwrap_err();
        assert!(err.is_not_found());
        assert!(err.suppressed().is_empty());
    }
}
