use crate::{PaxError, Result};
use pax_version::Version;
use serde::Serialize;
use std::collections::BTreeMap;
use std::fs::{self, File};
use std::io::Read;
use std::path::{Path, PathBuf};

const MANIFEST_PATH: &str = "META-INF/MANIFEST.MF";

/// A resolved bundle, ready to hand to a container launcher.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct EclipseBundle {
    pub id: String,
    #[serde(serialize_with = "serialize_version")]
    pub version: Version,
    pub location: String,
    pub singleton: bool,
    pub fragment: bool,
    pub start: bool,
    pub start_level: Option<u32>,
}

fn serialize_version<S: serde::Serializer>(
    version: &Version,
    serializer: S,
) -> std::result::Result<S::Ok, S::Error> {
    serializer.collect_str(version)
}

impl EclipseBundle {
    pub fn from_manifest(manifest: &BundleManifest, location: String) -> Self {
        let fragment = manifest.fragment_host.is_some();
        EclipseBundle {
            id: manifest.symbolic_name.clone(),
            version: manifest.version.clone(),
            location,
            singleton: manifest.singleton,
            fragment,
            start: !fragment,
            start_level: None,
        }
    }

    pub fn key(&self) -> String {
        format!("{}:{}", self.id, self.version)
    }

    /// Confirms a local location still exists. Remote locations are taken
    /// on trust.
    pub fn ensure_available(&self) -> Result<()> {
        if is_remote(&self.location) {
            return Ok(());
        }

        let path = local_path(&self.location);
        if path.exists() {
            Ok(())
        } else {
            Err(PaxError::ReadFile {
                path,
                source: std::io::Error::from(std::io::ErrorKind::NotFound),
            })
        }
    }
}

fn is_remote(location: &str) -> bool {
    location.starts_with("http://") || location.starts_with("https://")
}

fn local_path(location: &str) -> PathBuf {
    PathBuf::from(location.strip_prefix("file:").unwrap_or(location))
}

/// The OSGi headers the resolver cares about.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BundleManifest {
    pub symbolic_name: String,
    pub version: Version,
    pub singleton: bool,
    pub fragment_host: Option<String>,
    pub name: Option<String>,
}

impl BundleManifest {
    /// Parses manifest text. Returns `None` for plain jars without a
    /// `Bundle-SymbolicName`.
    pub fn parse(text: &str, origin: &Path) -> Result<Option<Self>> {
        let headers = parse_headers(text);

        let Some(bsn) = headers.get("Bundle-SymbolicName") else {
            return Ok(None);
        };

        let clause = parse_clause(bsn);
        if clause.value.is_empty() {
            return Err(PaxError::ManifestInvalid {
                path: origin.to_path_buf(),
                reason: "empty Bundle-SymbolicName".to_string(),
            });
        }

        let version = match headers.get("Bundle-Version") {
            Some(raw) => Version::parse(raw).map_err(|err| PaxError::ManifestInvalid {
                path: origin.to_path_buf(),
                reason: err.to_string(),
            })?,
            None => Version::default(),
        };

        let singleton = clause
            .directives
            .get("singleton")
            .map(|value| value.eq_ignore_ascii_case("true"))
            .unwrap_or(false);

        let fragment_host = headers
            .get("Fragment-Host")
            .map(|raw| parse_clause(raw).value)
            .filter(|host| !host.is_empty());

        Ok(Some(BundleManifest {
            symbolic_name: clause.value,
            version,
            singleton,
            fragment_host,
            name: headers.get("Bundle-Name").cloned(),
        }))
    }

    pub fn from_jar(path: &Path) -> Result<Option<Self>> {
        let file = File::open(path).map_err(|source| PaxError::ReadFile {
            path: path.to_path_buf(),
            source,
        })?;

        let mut archive = zip::ZipArchive::new(file).map_err(|source| PaxError::Archive {
            path: path.to_path_buf(),
            source,
        })?;

        let mut entry = match archive.by_name(MANIFEST_PATH) {
            Ok(entry) => entry,
            Err(zip::result::ZipError::FileNotFound) => return Ok(None),
            Err(source) => {
                return Err(PaxError::Archive {
                    path: path.to_path_buf(),
                    source,
                });
            }
        };

        let mut text = String::new();
        entry
            .read_to_string(&mut text)
            .map_err(|source| PaxError::ReadFile {
                path: path.to_path_buf(),
                source,
            })?;

        Self::parse(&text, path)
    }

    pub fn from_dir(path: &Path) -> Result<Option<Self>> {
        let manifest_path = path.join(MANIFEST_PATH);
        if !manifest_path.is_file() {
            return Ok(None);
        }

        let text = fs::read_to_string(&manifest_path).map_err(|source| PaxError::ReadFile {
            path: manifest_path.clone(),
            source,
        })?;

        Self::parse(&text, &manifest_path)
    }

    /// Reads a jar file or an exploded bundle directory.
    pub fn read(path: &Path) -> Result<Option<Self>> {
        if path.is_dir() {
            Self::from_dir(path)
        } else {
            Self::from_jar(path)
        }
    }
}

/// Joins continuation lines (leading single space) and splits `Name: value`.
fn parse_headers(text: &str) -> BTreeMap<String, String> {
    let mut headers = BTreeMap::new();
    let mut current: Option<(String, String)> = None;

    for line in text.lines() {
        let line = line.trim_end_matches('\r');

        if let Some(rest) = line.strip_prefix(' ') {
            if let Some((_, value)) = current.as_mut() {
                value.push_str(rest);
            }
            continue;
        }

        if let Some((name, value)) = current.take() {
            headers.insert(name, value);
        }

        if let Some((name, value)) = line.split_once(':') {
            current = Some((name.trim().to_string(), value.trim_start().to_string()));
        }
    }

    if let Some((name, value)) = current {
        headers.insert(name, value);
    }

    headers
}

struct Clause {
    value: String,
    directives: BTreeMap<String, String>,
}

/// Splits `value;attr=x;dir:=y` into the leading value and its directives.
/// Attributes are dropped.
fn parse_clause(raw: &str) -> Clause {
    let mut parts = raw.split(';');
    let value = parts.next().unwrap_or("").trim().to_string();
    let mut directives = BTreeMap::new();

    for part in parts {
        if let Some((key, val)) = part.split_once(":=") {
            directives.insert(
                key.trim().to_string(),
                val.trim().trim_matches('"').to_string(),
            );
        }
    }

    Clause { value, directives }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_singleton_directive() {
        let text = "Manifest-Version: 1.0\r\nBundle-SymbolicName: org.example.core;singleton:=true\r\nBundle-Version: 1.2.3.v2024\r\n";
        let manifest = BundleManifest::parse(text, Path::new("x"))
            .unwrap()
            .unwrap();
        assert_eq!(manifest.symbolic_name, "org.example.core");
        assert_eq!(manifest.version, Version::parse("1.2.3.v2024").unwrap());
        assert!(manifest.singleton);
        assert!(manifest.fragment_host.is_none());
    }

    #[test]
    fn joins_continuation_lines() {
        let text = "Bundle-SymbolicName: org.example.very.long.na\n me\nFragment-Host: org.exa\n mple.host;bundle-version=\"1.0\"\n";
        let manifest = BundleManifest::parse(text, Path::new("x"))
            .unwrap()
            .unwrap();
        assert_eq!(manifest.symbolic_name, "org.example.very.long.name");
        assert_eq!(manifest.fragment_host.as_deref(), Some("org.example.host"));
        assert_eq!(manifest.version, Version::default());
    }

    #[test]
    fn plain_jar_is_not_a_bundle() {
        let text = "Manifest-Version: 1.0\nMain-Class: Foo\n";
        assert!(BundleManifest::parse(text, Path::new("x")).unwrap().is_none());
    }

    #[test]
    fn bad_version_is_an_error() {
        let text = "Bundle-SymbolicName: a\nBundle-Version: not.a.version\n";
        assert!(BundleManifest::parse(text, Path::new("x")).is_err());
    }

    #[test]
    fn fragments_do_not_start() {
        let text = "Bundle-SymbolicName: a.fragment\nFragment-Host: a\n";
        let manifest = BundleManifest::parse(text, Path::new("x"))
            .unwrap()
            .unwrap();
        let bundle = EclipseBundle::from_manifest(&manifest, "file:/tmp/a.jar".to_string());
        assert!(bundle.fragment);
        assert!(!bundle.start);
    }
}
