use crate::artifact::VersionRequest;
use pax_version::{Version, VersionRange};
use std::collections::BTreeMap;

pub mod namespace {
    pub const BUNDLE: &str = "osgi.bundle";
    pub const FEATURE: &str = "org.eclipse.update.feature";
    pub const UNIT: &str = "org.eclipse.equinox.p2.iu";
    pub const PACKAGE: &str = "java.package";
}

/// One artifact a unit installs, e.g. `osgi.bundle/org.example.core/1.0.0`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ArtifactKey {
    pub classifier: String,
    pub id: String,
    pub version: Version,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Requirement {
    pub namespace: String,
    pub name: String,
    pub range: VersionRange,
    pub optional: bool,
    pub filter: Option<String>,
}

impl Requirement {
    pub fn version_request(&self) -> VersionRequest {
        VersionRequest::Range(self.range.clone())
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProvidedCapability {
    pub namespace: String,
    pub name: String,
    pub version: Version,
}

/// A p2 installable unit as read from `content.xml`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InstallableUnit {
    pub id: String,
    pub version: Version,
    pub singleton: bool,
    pub filter: Option<String>,
    pub properties: BTreeMap<String, String>,
    pub artifacts: Vec<ArtifactKey>,
    pub requires: Vec<Requirement>,
    pub provides: Vec<ProvidedCapability>,
}

impl InstallableUnit {
    pub fn new(id: &str, version: Version) -> Self {
        InstallableUnit {
            id: id.to_string(),
            version,
            singleton: false,
            filter: None,
            properties: BTreeMap::new(),
            artifacts: Vec::new(),
            requires: Vec::new(),
            provides: Vec::new(),
        }
    }

    pub fn key(&self) -> String {
        format!("{}:{}", self.id, self.version)
    }

    /// Highest provided version in `namespace` named `name` that falls in `range`.
    pub fn best_provided(
        &self,
        namespace: &str,
        name: &str,
        range: &VersionRange,
    ) -> Option<&Version> {
        self.provides
            .iter()
            .filter(|capability| {
                capability.namespace == namespace
                    && capability.name == name
                    && range.includes(&capability.version)
            })
            .map(|capability| &capability.version)
            .max()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn matches_provided_package_in_range() {
        let mut unit = InstallableUnit::new("org.example.api", Version::new(1, 0, 0));
        unit.provides.push(ProvidedCapability {
            namespace: namespace::PACKAGE.to_string(),
            name: "org.example.api".to_string(),
            version: Version::new(1, 4, 0),
        });

        let inside = VersionRange::parse("[1.0,2.0)").unwrap();
        let outside = VersionRange::parse("[2.0,3.0)").unwrap();
        assert_eq!(
            unit.best_provided(namespace::PACKAGE, "org.example.api", &inside),
            Some(&Version::new(1, 4, 0))
        );
        assert!(unit.best_provided(namespace::PACKAGE, "org.example.api", &outside).is_none());
        assert!(unit.best_provided(namespace::BUNDLE, "org.example.api", &inside).is_none());
    }
}
