use crate::Result;
use crate::artifact::VersionRequest;
use crate::bundle::EclipseBundle;
use crate::environment::EclipseEnvironment;
use crate::source::{self, ArtifactSource};

pub mod feature;
pub mod unit;

pub use feature::FeatureResolver;
pub use unit::{ResolvedRequirements, UnitResolver};

/// How the unit resolver treats requirements it cannot satisfy.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum IncludeMode {
    /// Every mandatory requirement must resolve.
    #[default]
    Strict,
    /// Best-effort slice: unsatisfied requirements are logged and skipped,
    /// and lookups never leave the unit's own location.
    Slicer,
}

impl IncludeMode {
    pub fn from_str(value: &str) -> Option<Self> {
        match value.trim().to_ascii_lowercase().as_str() {
            "strict" | "planner" => Some(IncludeMode::Strict),
            "slicer" => Some(IncludeMode::Slicer),
            _ => None,
        }
    }
}

/// Looks up one feature in `source` and returns its flattened bundle list.
pub fn feature_bundles(
    source: &dyn ArtifactSource,
    name: &str,
    version: &VersionRequest,
    environment: &EclipseEnvironment,
) -> Result<Vec<EclipseBundle>> {
    let features = source::require_features(source)?;
    let bundles = source::require_bundles(source)?;

    let root = features.feature(name, version)?;
    let mut resolver = FeatureResolver::new(bundles, Some(features), environment);
    resolver.resolve(&[root])?;

    Ok(resolver.included_bundles())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn planner_maps_to_strict() {
        assert_eq!(IncludeMode::from_str("planner"), Some(IncludeMode::Strict));
        assert_eq!(IncludeMode::from_str(" Slicer "), Some(IncludeMode::Slicer));
        assert_eq!(IncludeMode::from_str("greedy"), None);
    }
}
