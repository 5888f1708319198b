use crate::unit::namespace;
use crate::xml::{self, Node};
use crate::{PaxError, Result};
use pax_version::Version;
use std::collections::BTreeMap;

const SHA256_PROPERTY: &str = "download.checksum.sha-256";
const FORMAT_PROPERTY: &str = "format";

/// Maps an artifact classifier to a URL template.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MappingRule {
    pub classifier: String,
    pub output: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ArtifactDescriptor {
    pub classifier: String,
    pub id: String,
    pub version: Version,
    pub sha256: Option<String>,
}

/// The parts of an `artifacts.xml` needed to locate and verify downloads.
/// Packed (pack200) rules and descriptors are left out.
#[derive(Debug, Clone, Default)]
pub struct ArtifactRepository {
    pub rules: Vec<MappingRule>,
    descriptors: BTreeMap<(String, String, Version), ArtifactDescriptor>,
}

impl ArtifactRepository {
    pub fn parse(text: &str, origin: &str) -> Result<Self> {
        let mut repository = ArtifactRepository::default();
        let mut stack: Vec<String> = Vec::new();
        let mut current: Option<(ArtifactDescriptor, bool)> = None;

        xml::walk(text, origin, |node| {
            match node {
                Node::Open(element) => {
                    let parent = stack.last().map(String::as_str);

                    match (parent, element.name.as_str()) {
                        (Some("mappings"), "rule") => {
                            let filter = element.attr("filter").unwrap_or("");
                            let output = element.required("output", origin)?;
                            if filter_value(filter, "format").is_none()
                                && let Some(classifier) = filter_value(filter, "classifier")
                            {
                                repository.rules.push(MappingRule {
                                    classifier,
                                    output: output.to_string(),
                                });
                            }
                        }
                        (Some("artifacts"), "artifact") => {
                            let version = element.attr("version").unwrap_or("0.0.0");
                            let version =
                                Version::parse(version).map_err(|err| PaxError::ParseXml {
                                    origin: origin.to_string(),
                                    reason: err.to_string(),
                                })?;
                            current = Some((
                                ArtifactDescriptor {
                                    classifier: element.required("classifier", origin)?.to_string(),
                                    id: element.required("id", origin)?.to_string(),
                                    version,
                                    sha256: None,
                                },
                                false,
                            ));
                        }
                        (Some("properties"), "property") => {
                            if let Some((descriptor, packed)) = current.as_mut()
                                && let (Some(name), Some(value)) =
                                    (element.attr("name"), element.attr("value"))
                            {
                                match name {
                                    SHA256_PROPERTY => descriptor.sha256 = Some(value.to_string()),
                                    FORMAT_PROPERTY => *packed = value == "packed",
                                    _ => {}
                                }
                            }
                        }
                        _ => {}
                    }

                    stack.push(element.name);
                }
                Node::Text(_) => {}
                Node::Close(name) => {
                    stack.pop();
                    if name == "artifact"
                        && let Some((descriptor, packed)) = current.take()
                        && !packed
                    {
                        repository.insert(descriptor);
                    }
                }
            }
            Ok(())
        })?;

        Ok(repository)
    }

    pub fn insert(&mut self, descriptor: ArtifactDescriptor) {
        let key = (
            descriptor.classifier.clone(),
            descriptor.id.clone(),
            descriptor.version.clone(),
        );
        self.descriptors.insert(key, descriptor);
    }

    pub fn descriptor(
        &self,
        classifier: &str,
        id: &str,
        version: &Version,
    ) -> Option<&ArtifactDescriptor> {
        self.descriptors
            .get(&(classifier.to_string(), id.to_string(), version.clone()))
    }

    pub fn len(&self) -> usize {
        self.descriptors.len()
    }

    pub fn is_empty(&self) -> bool {
        self.descriptors.is_empty()
    }

    /// Download URL for an artifact, from the first rule matching its
    /// classifier or the conventional `plugins/` and `features/` layout.
    pub fn location(
        &self,
        repo_url: &str,
        classifier: &str,
        id: &str,
        version: &Version,
    ) -> Option<String> {
        let template = self
            .rules
            .iter()
            .find(|rule| rule.classifier == classifier)
            .map(|rule| rule.output.as_str())
            .or_else(|| default_template(classifier))?;

        Some(
            template
                .replace("${repoUrl}", repo_url.trim_end_matches('/'))
                .replace("${classifier}", classifier)
                .replace("${id}", id)
                .replace("${version}", &version.to_string()),
        )
    }
}

fn default_template(classifier: &str) -> Option<&'static str> {
    match classifier {
        namespace::BUNDLE => Some("${repoUrl}/plugins/${id}_${version}.jar"),
        namespace::FEATURE => Some("${repoUrl}/features/${id}_${version}.jar"),
        _ => None,
    }
}

/// Pulls `value` out of a `(key=value)` term in a mapping-rule filter.
fn filter_value(filter: &str, key: &str) -> Option<String> {
    let needle = format!("{key}=");
    let start = filter.find(&needle)? + needle.len();
    let rest = &filter[start..];
    let end = rest.find(')').unwrap_or(rest.len());
    let value = rest[..end].trim();

    if value.is_empty() {
        None
    } else {
        Some(value.to_string())
    }
}
