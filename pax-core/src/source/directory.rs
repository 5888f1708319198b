use super::{ArtifactSource, BundleSource, Catalog, FeatureSource};
use crate::artifact::VersionRequest;
use crate::bundle::EclipseBundle;
use crate::feature::Feature;
use crate::{PaxError, Result};
use std::fs;
use std::path::{Path, PathBuf};
use tracing::{info, warn};

const PLUGINS_DIR: &str = "plugins";
const FEATURES_DIR: &str = "features";

/// An Eclipse installation or dropins-style folder: bundles under
/// `plugins/`, features under `features/`. A folder without `plugins/` is
/// treated as a flat folder of bundles.
#[derive(Debug)]
pub struct DirectorySource {
    root: PathBuf,
    catalog: Catalog,
}

impl DirectorySource {
    pub fn new(root: &Path) -> Result<Self> {
        if !root.is_dir() {
            return Err(PaxError::ReadFile {
                path: root.to_path_buf(),
                source: std::io::Error::from(std::io::ErrorKind::NotFound),
            });
        }

        let mut catalog = Catalog::default();

        let plugins = root.join(PLUGINS_DIR);
        let bundle_dir = if plugins.is_dir() { plugins } else { root.to_path_buf() };
        for entry in list_entries(&bundle_dir)? {
            if is_candidate(&entry) {
                catalog.scan_bundle(&entry);
            }
        }

        let features = root.join(FEATURES_DIR);
        if features.is_dir() {
            for entry in list_entries(&features)? {
                if is_candidate(&entry) {
                    catalog.scan_feature(&entry);
                }
            }
        }

        info!(
            "{}: {} bundles, {} features",
            root.display(),
            catalog.bundles.len(),
            catalog.features.len()
        );

        Ok(DirectorySource {
            root: root.to_path_buf(),
            catalog,
        })
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn catalog(&self) -> &Catalog {
        &self.catalog
    }
}

/// Jars and directories, sorted by name so indexing order is stable.
fn list_entries(dir: &Path) -> Result<Vec<PathBuf>> {
    let read = fs::read_dir(dir).map_err(|source| PaxError::ReadFile {
        path: dir.to_path_buf(),
        source,
    })?;

    let mut entries = Vec::new();
    for entry in read {
        match entry {
            Ok(entry) => entries.push(entry.path()),
            Err(err) => warn!("unreadable entry in {}: {}", dir.display(), err),
        }
    }

    entries.sort();
    Ok(entries)
}

fn is_candidate(path: &Path) -> bool {
    path.is_dir()
        || path
            .extension()
            .map(|ext| ext.eq_ignore_ascii_case("jar"))
            .unwrap_or(false)
}

impl BundleSource for DirectorySource {
    fn bundle(&self, name: &str, version: &VersionRequest) -> Result<EclipseBundle> {
        self.catalog.bundle(name, version)
    }
}

impl FeatureSource for DirectorySource {
    fn feature(&self, name: &str, version: &VersionRequest) -> Result<Feature> {
        self.catalog.feature(name, version)
    }
}

impl ArtifactSource for DirectorySource {
    fn describe(&self) -> String {
        format!("directory {}", self.root.display())
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
    use std::io::Write;
    use tempfile::TempDir;
    use zip::write::SimpleFileOptions;

    fn write_jar(path: &Path, manifest: &str) {
        let file = fs::File::create(path).unwrap();
        let mut zip = zip::ZipWriter::new(file);
        zip.start_file("META-INF/MANIFEST.MF", SimpleFileOptions::default())
            .unwrap();
        zip.write_all(manifest.as_bytes()).unwrap();
        zip.finish().unwrap();
    }

    #[test]
    fn flat_folder_is_scanned_for_bundles() {
        let dir = TempDir::new().unwrap();
        write_jar(
            &dir.path().join("a_1.0.0.jar"),
            "Bundle-SymbolicName: a\nBundle-Version: 1.0.0\n",
        );
        write_jar(&dir.path().join("plain.jar"), "Main-Class: Foo\n");
        fs::write(dir.path().join("broken.jar"), b"not a zip").unwrap();
        fs::write(dir.path().join("notes.txt"), b"ignored").unwrap();

        let source = DirectorySource::new(dir.path()).unwrap();
        assert_eq!(source.catalog().bundles.len(), 1);
        assert!(source.bundle("a", &VersionRequest::Latest).is_ok());
        assert!(source.catalog().features.is_empty());
    }

    #[test]
    fn missing_root_is_an_error() {
        let dir = TempDir::new().unwrap();
        let err = DirectorySource::new(&dir.path().join("nope")).unwrap_err();
        assert!(matches!(err, PaxError::ReadFile { .. }));
    }
}
