use crate::artifact::VersionRequest;
use crate::environment::PlatformFilter;
use crate::xml::{self, Node};
use crate::{PaxError, Result};
use pax_version::Version;
use std::fs::{self, File};
use std::io::Read;
use std::path::Path;

const FEATURE_XML: &str = "feature.xml";

/// A plugin listed directly by a feature.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FeaturePlugin {
    pub id: String,
    pub version: VersionRequest,
    pub fragment: bool,
    pub filter: PlatformFilter,
}

/// An edge to another feature. Optional edges may be missing at resolve time.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FeatureInclude {
    pub id: String,
    pub version: VersionRequest,
    pub optional: bool,
    pub filter: PlatformFilter,
}

/// A parsed `feature.xml`. Never mutated after parsing.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Feature {
    pub id: String,
    pub version: Version,
    pub label: Option<String>,
    pub plugins: Vec<FeaturePlugin>,
    pub includes: Vec<FeatureInclude>,
    pub location: String,
}

impl Feature {
    pub fn key(&self) -> String {
        format!("{}:{}", self.id, self.version)
    }

    pub fn parse(text: &str, location: &str) -> Result<Feature> {
        let mut root: Option<Feature> = None;
        let mut plugins = Vec::new();
        let mut includes = Vec::new();
        let mut depth = 0usize;

        xml::walk(text, location, |node| {
            match node {
                Node::Open(element) => {
                    depth += 1;
                    match (depth, element.name.as_str()) {
                        (1, "feature") => {
                            let id = element.required("id", location)?;
                            let version = parse_version(element.attr("version"), location)?;
                            root = Some(Feature {
                                id: id.to_string(),
                                version,
                                label: element.attr("label").map(str::to_string),
                                plugins: Vec::new(),
                                includes: Vec::new(),
                                location: location.to_string(),
                            });
                        }
                        (2, "plugin") => plugins.push(FeaturePlugin {
                            id: element.required("id", location)?.to_string(),
                            version: parse_request(element.attr("version"), location)?,
                            fragment: is_true(element.attr("fragment")),
                            filter: PlatformFilter::from_attributes(
                                element.attr("os"),
                                element.attr("ws"),
                                element.attr("arch"),
                            ),
                        }),
                        (2, "includes") => includes.push(FeatureInclude {
                            id: element.required("id", location)?.to_string(),
                            version: parse_request(element.attr("version"), location)?,
                            optional: is_true(element.attr("optional")),
                            filter: PlatformFilter::from_attributes(
                                element.attr("os"),
                                element.attr("ws"),
                                element.attr("arch"),
                            ),
                        }),
                        _ => {}
                    }
                }
                Node::Text(_) => {}
                Node::Close(_) => depth = depth.saturating_sub(1),
            }
            Ok(())
        })?;

        let mut feature = root.ok_or_else(|| PaxError::ParseXml {
            origin: location.to_string(),
            reason: "no <feature> root element".to_string(),
        })?;
        feature.plugins = plugins;
        feature.includes = includes;
        Ok(feature)
    }

    pub fn from_dir(path: &Path) -> Result<Feature> {
        let xml_path = path.join(FEATURE_XML);
        let text = fs::read_to_string(&xml_path).map_err(|source| PaxError::ReadFile {
            path: xml_path.clone(),
            source,
        })?;
        Self::parse(&text, &path.display().to_string())
    }

    pub fn from_jar(path: &Path) -> Result<Feature> {
        let file = File::open(path).map_err(|source| PaxError::ReadFile {
            path: path.to_path_buf(),
            source,
        })?;
        let mut archive = zip::ZipArchive::new(file).map_err(|source| PaxError::Archive {
            path: path.to_path_buf(),
            source,
        })?;
        let mut entry = archive
            .by_name(FEATURE_XML)
            .map_err(|source| PaxError::Archive {
                path: path.to_path_buf(),
                source,
            })?;

        let mut text = String::new();
        entry
            .read_to_string(&mut text)
            .map_err(|source| PaxError::ReadFile {
                path: path.to_path_buf(),
                source,
            })?;

        Self::parse(&text, &path.display().to_string())
    }

    pub fn read(path: &Path) -> Result<Feature> {
        if path.is_dir() {
            Self::from_dir(path)
        } else {
            Self::from_jar(path)
        }
    }
}

fn is_true(value: Option<&str>) -> bool {
    value.map(|v| v.eq_ignore_ascii_case("true")).unwrap_or(false)
}

fn parse_version(value: Option<&str>, location: &str) -> Result<Version> {
    match value {
        None => Ok(Version::default()),
        Some(raw) => Version::parse(&strip_build_qualifier(raw)).map_err(|err| PaxError::ParseXml {
            origin: location.to_string(),
            reason: err.to_string(),
        }),
    }
}

fn parse_request(value: Option<&str>, location: &str) -> Result<VersionRequest> {
    let raw = value.map(strip_build_qualifier).unwrap_or_default();
    VersionRequest::parse(&raw).map_err(|err| PaxError::ParseXml {
        origin: location.to_string(),
        reason: err.to_string(),
    })
}

/// `1.0.0.qualifier` in a source feature stands for "whatever the build
/// stamped in"; keep only the release part.
fn strip_build_qualifier(raw: &str) -> String {
    raw.trim()
        .strip_suffix(".qualifier")
        .unwrap_or(raw.trim())
        .to_string()
}
