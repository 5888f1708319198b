use super::{ArtifactSource, BundleSource, Catalog, FeatureSource};
use crate::artifact::VersionRequest;
use crate::bundle::EclipseBundle;
use crate::feature::Feature;
use crate::{PaxError, Result};
use std::path::{Path, PathBuf};
use tracing::info;

const MANIFEST_PATH: &str = "META-INF/MANIFEST.MF";
const FEATURE_XML: &str = "feature.xml";

/// Projects checked out side by side: each matching directory carrying a
/// manifest is a bundle, each carrying `feature.xml` is a feature.
#[derive(Debug)]
pub struct WorkspaceSource {
    root: PathBuf,
    catalog: Catalog,
}

impl WorkspaceSource {
    pub fn new(root: &Path) -> Result<Self> {
        Self::with_patterns(root, &["*".to_string()])
    }

    pub fn with_patterns(root: &Path, patterns: &[String]) -> Result<Self> {
        let mut catalog = Catalog::default();

        for pattern in patterns {
            let pattern_path = root.join(pattern);
            let pattern_str = pattern_path.to_string_lossy().to_string();

            for entry in glob::glob(&pattern_str).map_err(|err| PaxError::WorkspaceConfig {
                path: root.to_path_buf(),
                reason: err.to_string(),
            })? {
                let path = entry.map_err(|err| PaxError::WorkspaceConfig {
                    path: root.to_path_buf(),
                    reason: err.to_string(),
                })?;

                if !path.is_dir() {
                    continue;
                }

                if path.join(MANIFEST_PATH).is_file() {
                    catalog.scan_bundle(&path);
                }
                if path.join(FEATURE_XML).is_file() {
                    catalog.scan_feature(&path);
                }
            }
        }

        info!(
            "workspace {}: {} bundles, {} features",
            root.display(),
            catalog.bundles.len(),
            catalog.features.len()
        );

        Ok(WorkspaceSource {
            root: root.to_path_buf(),
            catalog,
        })
    }

    pub fn catalog(&self) -> &Catalog {
        &self.catalog
    }
}

impl BundleSource for WorkspaceSource {
    fn bundle(&self, name: &str, version: &VersionRequest) -> Result<EclipseBundle> {
        self.catalog.bundle(name, version)
    }
}

impl FeatureSource for WorkspaceSource {
    fn feature(&self, name: &str, version: &VersionRequest) -> Result<Feature> {
        self.catalog.feature(name, version)
    }
}

impl ArtifactSource for WorkspaceSource {
    fn describe(&self) -> String {
        format!("workspace {}", self.root.display())
    }

    fn bundles(&self) -> Option<&dyn BundleSource> {
        Some(self)
    }

    fn features(&self) -> Option<&dyn FeatureSource> {
        Some(self)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::TempDir;

    fn project(root: &Path, name: &str, manifest: Option<&str>, feature: Option<&str>) {
        let dir = root.join(name);
        fs::create_dir_all(dir.join("META-INF")).unwrap();
        if let Some(text) = manifest {
            fs::write(dir.join(MANIFEST_PATH), text).unwrap();
        }
        if let Some(text) = feature {
            fs::write(dir.join(FEATURE_XML), text).unwrap();
        }
    }

    #[test]
    fn indexes_bundle_and_feature_projects() {
        let dir = TempDir::new().unwrap();
        project(
            dir.path(),
            "org.example.core",
            Some("Bundle-SymbolicName: org.example.core\nBundle-Version: 1.0.0.qualifier\n"),
            None,
        );
        project(
            dir.path(),
            "org.example.feature",
            None,
            Some(r#"<feature id="org.example.feature" version="1.0.0.qualifier"><plugin id="org.example.core" version="0.0.0"/></feature>"#),
        );
        project(dir.path(), "docs", None, None);

        let source = WorkspaceSource::new(dir.path()).unwrap();
        let bundle = source
            .bundle("org.example.core", &VersionRequest::Latest)
            .unwrap();
        assert_eq!(bundle.version.qualifier, "qualifier");
        assert!(bundle.location.ends_with("org.example.core"));

        let feature = source
            .feature("org.example.feature", &VersionRequest::Latest)
            .unwrap();
        assert_eq!(feature.plugins.len(), 1);
    }

    #[test]
    fn patterns_limit_the_scan() {
        let dir = TempDir::new().unwrap();
        fs::create_dir_all(dir.path().join("bundles")).unwrap();
        project(
            &dir.path().join("bundles"),
            "a",
            Some("Bundle-SymbolicName: a\n"),
            None,
        );
        project(dir.path(), "b", Some("Bundle-SymbolicName: b\n"), None);

        let source =
            WorkspaceSource::with_patterns(dir.path(), &["bundles/*".to_string()]).unwrap();
        assert!(source.bundle("a", &VersionRequest::Latest).is_ok());
        assert!(source.bundle("b", &VersionRequest::Latest).is_err());
    }
}
