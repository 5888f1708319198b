use super::{ArtifactSource, BundleSource, FeatureSource, UnitSource};
use crate::artifact::{ArtifactRef, ArtifactRequest, VersionRequest};
use crate::bundle::EclipseBundle;
use crate::config::PaxConfig;
use crate::feature::Feature;
use crate::index::ArtifactIndex;
use crate::transport::Transport;
use crate::unit::{InstallableUnit, namespace};
use crate::{PaxError, Result};
use std::cell::{OnceCell, RefCell};
use std::collections::HashMap;
use std::io::{Cursor, Read};
use std::path::PathBuf;
use tracing::{debug, info, warn};

pub mod artifacts;
pub mod content;

pub use artifacts::{ArtifactDescriptor, ArtifactRepository, MappingRule};
pub use content::parse_content;

const FRAGMENT_NAMESPACE: &str = "osgi.fragment";

/// Memo key for feature descriptors already fetched from a location.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct FeatureKey {
    pub name: String,
    pub version: VersionRequest,
}

#[derive(Debug, Clone, Copy)]
struct BundleFlags {
    singleton: bool,
    fragment: bool,
}

#[derive(Debug)]
struct Metadata {
    units: ArtifactIndex<InstallableUnit>,
    bundles: ArtifactIndex<BundleFlags>,
    features: ArtifactIndex<()>,
    artifacts: ArtifactRepository,
}

/// One p2 repository. Metadata is read on first use and kept for the life
/// of the location; a failed read is remembered and reported again on every
/// later lookup.
#[derive(Debug)]
pub struct RepositoryLocation {
    url: String,
    transport: Transport,
    metadata: OnceCell<std::result::Result<Metadata, String>>,
    features: RefCell<HashMap<FeatureKey, Feature>>,
}

impl RepositoryLocation {
    pub fn new(url: &str, transport: Transport) -> Self {
        RepositoryLocation {
            url: url.trim_end_matches('/').to_string(),
            transport,
            metadata: OnceCell::new(),
            features: RefCell::new(HashMap::new()),
        }
    }

    pub fn from_config(url: &str, config: &PaxConfig) -> Self {
        Self::new(url, Transport::from_config(config))
    }

    pub fn url(&self) -> &str {
        &self.url
    }

    /// Number of feature descriptors fetched so far.
    pub fn cached_features(&self) -> usize {
        self.features.borrow().len()
    }

    fn metadata(&self) -> Result<&Metadata> {
        if let Some(loaded) = self.metadata.get() {
            return loaded.as_ref().map_err(|reason| PaxError::RepositoryUnavailable {
                url: self.url.clone(),
                reason: reason.clone(),
            });
        }

        match self.load() {
            Ok(metadata) => {
                let loaded = self.metadata.get_or_init(|| Ok(metadata));
                loaded.as_ref().map_err(|reason| PaxError::RepositoryUnavailable {
                    url: self.url.clone(),
                    reason: reason.clone(),
                })
            }
            Err(err) => {
                let _ = self.metadata.set(Err(err.to_string()));
                Err(err)
            }
        }
    }

    fn load(&self) -> Result<Metadata> {
        let Some(content) = self.read_xml("content")? else {
            let composite = self.read_xml("compositeContent")?.is_some();
            return Err(PaxError::RepositoryUnavailable {
                url: self.url.clone(),
                reason: if composite {
                    "composite repositories are not supported".to_string()
                } else {
                    "no content.xml or content.jar".to_string()
                },
            });
        };

        let origin = format!("{}/content.xml", self.url);
        let parsed = parse_content(&content, &origin)?;

        let artifacts = match self.read_xml("artifacts")? {
            Some(text) => ArtifactRepository::parse(&text, &format!("{}/artifacts.xml", self.url))?,
            None => {
                warn!("{} has no artifacts.xml, using default layout", self.url);
                ArtifactRepository::default()
            }
        };

        let mut metadata = Metadata {
            units: ArtifactIndex::new(),
            bundles: ArtifactIndex::new(),
            features: ArtifactIndex::new(),
            artifacts,
        };

        for unit in parsed {
            let flags = BundleFlags {
                singleton: unit.singleton,
                fragment: unit
                    .provides
                    .iter()
                    .any(|capability| capability.namespace == FRAGMENT_NAMESPACE),
            };

            for artifact in &unit.artifacts {
                match artifact.classifier.as_str() {
                    namespace::BUNDLE => {
                        if !metadata.bundles.contains(&artifact.id, &artifact.version) {
                            metadata.bundles.add(ArtifactRef::new(
                                artifact.id.clone(),
                                artifact.version.clone(),
                                flags,
                            ));
                        }
                    }
                    namespace::FEATURE => {
                        if !metadata.features.contains(&artifact.id, &artifact.version) {
                            metadata.features.add(ArtifactRef::new(
                                artifact.id.clone(),
                                artifact.version.clone(),
                                (),
                            ));
                        }
                    }
                    _ => {}
                }
            }

            metadata
                .units
                .add(ArtifactRef::new(unit.id.clone(), unit.version.clone(), unit));
        }

        info!(
            "loaded {}: {} units, {} bundles, {} features",
            self.url,
            metadata.units.len(),
            metadata.bundles.len(),
            metadata.features.len()
        );

        Ok(metadata)
    }

    /// `<name>.jar` wins over `<name>.xml`, as p2 itself prefers it.
    fn read_xml(&self, name: &str) -> Result<Option<String>> {
        let jar_url = format!("{}/{name}.jar", self.url);
        if let Some(bytes) = self.transport.fetch(&jar_url)? {
            return unpack_xml(&jar_url, bytes, &format!("{name}.xml")).map(Some);
        }

        let xml_url = format!("{}/{name}.xml", self.url);
        match self.transport.fetch(&xml_url)? {
            Some(bytes) => String::from_utf8(bytes)
                .map(Some)
                .map_err(|err| PaxError::ParseXml {
                    origin: xml_url,
                    reason: err.to_string(),
                }),
            None => Ok(None),
        }
    }
}

fn unpack_xml(url: &str, bytes: Vec<u8>, entry: &str) -> Result<String> {
    let archive_path = PathBuf::from(url);
    let mut archive =
        zip::ZipArchive::new(Cursor::new(bytes)).map_err(|source| PaxError::Archive {
            path: archive_path.clone(),
            source,
        })?;
    let mut file = archive.by_name(entry).map_err(|source| PaxError::Archive {
        path: archive_path.clone(),
        source,
    })?;

    let mut text = String::new();
    file.read_to_string(&mut text)
        .map_err(|source| PaxError::ReadFile {
            path: archive_path,
            source,
        })?;
    Ok(text)
}

impl BundleSource for RepositoryLocation {
    fn bundle(&self, name: &str, version: &VersionRequest) -> Result<EclipseBundle> {
        let metadata = self.metadata()?;
        let found = metadata
            .bundles
            .get_fuzzy(name, version)
            .ok_or_else(|| PaxError::not_found(ArtifactRequest::bundle(name, version)))?;

        let url = metadata
            .artifacts
            .location(&self.url, namespace::BUNDLE, name, &found.version)
            .ok_or_else(|| PaxError::not_found(ArtifactRequest::bundle(name, version)))?;
        let sha256 = metadata
            .artifacts
            .descriptor(namespace::BUNDLE, name, &found.version)
            .and_then(|descriptor| descriptor.sha256.as_deref());

        let path = self.transport.materialize(&url, sha256)?;
        debug!("bundle {} from {}", found.key(), url);

        Ok(EclipseBundle {
            id: found.name.clone(),
            version: found.version.clone(),
            location: path.display().to_string(),
            singleton: found.context.singleton,
            fragment: found.context.fragment,
            start: !found.context.fragment,
            start_level: None,
        })
    }
}

impl FeatureSource for RepositoryLocation {
    fn feature(&self, name: &str, version: &VersionRequest) -> Result<Feature> {
        let key = FeatureKey {
            name: name.to_string(),
            version: version.clone(),
        };
        if let Some(cached) = self.features.borrow().get(&key) {
            return Ok(cached.clone());
        }

        let metadata = self.metadata()?;
        let found = metadata
            .features
            .get_fuzzy(name, version)
            .ok_or_else(|| PaxError::not_found(ArtifactRequest::feature(name, version)))?;

        let url = metadata
            .artifacts
            .location(&self.url, namespace::FEATURE, name, &found.version)
            .ok_or_else(|| PaxError::not_found(ArtifactRequest::feature(name, version)))?;
        let sha256 = metadata
            .artifacts
            .descriptor(namespace::FEATURE, name, &found.version)
            .and_then(|descriptor| descriptor.sha256.as_deref());

        let path = self.transport.materialize(&url, sha256)?;
        let feature = Feature::from_jar(&path)?;
        debug!("feature {} from {}", feature.key(), url);

        self.features.borrow_mut().insert(key, feature.clone());
        Ok(feature)
    }
}

impl UnitSource for RepositoryLocation {
    fn unit(&self, name: &str, version: &VersionRequest) -> Result<&InstallableUnit> {
        self.metadata()?
            .units
            .get(name, version)
            .map(|found| &found.context)
            .ok_or_else(|| PaxError::not_found(ArtifactRequest::unit(name, version)))
    }

    fn all_units(&self) -> Result<Vec<&InstallableUnit>> {
        Ok(self
            .metadata()?
            .units
            .artifacts()
            .into_iter()
            .map(|found| &found.context)
            .collect())
    }
}

impl ArtifactSource for RepositoryLocation {
    fn describe(&self) -> String {
        format!("repository {}", self.url)
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
