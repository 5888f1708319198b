use crate::unit::{ArtifactKey, InstallableUnit, ProvidedCapability, Requirement};
use crate::xml::{self, Element, Node};
use crate::{PaxError, Result};
use pax_version::{Version, VersionRange};

/// Parses a p2 metadata repository (`content.xml`) into its units.
pub fn parse_content(text: &str, origin: &str) -> Result<Vec<InstallableUnit>> {
    let mut units = Vec::new();
    let mut stack: Vec<String> = Vec::new();
    let mut unit: Option<InstallableUnit> = None;
    let mut requirement: Option<Requirement> = None;

    xml::walk(text, origin, |node| {
        match node {
            Node::Open(element) => {
                let parent = stack.last().map(String::as_str);

                match (parent, element.name.as_str()) {
                    (Some("units"), "unit") => unit = Some(open_unit(&element, origin)?),
                    (Some("provides"), "provided") => {
                        if let Some(current) = unit.as_mut() {
                            current.provides.push(ProvidedCapability {
                                namespace: element.required("namespace", origin)?.to_string(),
                                name: element.required("name", origin)?.to_string(),
                                version: version(element.attr("version"), origin)?,
                            });
                        }
                    }
                    (Some("requires"), "required") => {
                        // requirements written as match expressions carry no name
                        if let (Some(namespace), Some(name)) =
                            (element.attr("namespace"), element.attr("name"))
                        {
                            requirement = Some(Requirement {
                                namespace: namespace.to_string(),
                                name: name.to_string(),
                                range: range(element.attr("range"), origin)?,
                                optional: is_true(element.attr("optional")),
                                filter: None,
                            });
                        }
                    }
                    (Some("artifacts"), "artifact") => {
                        if let Some(current) = unit.as_mut() {
                            current.artifacts.push(ArtifactKey {
                                classifier: element.required("classifier", origin)?.to_string(),
                                id: element.required("id", origin)?.to_string(),
                                version: version(element.attr("version"), origin)?,
                            });
                        }
                    }
                    (Some("properties"), "property") if stack.len() >= 2 => {
                        let grandparent = stack[stack.len() - 2].as_str();
                        if grandparent == "unit"
                            && let Some(current) = unit.as_mut()
                            && let (Some(name), Some(value)) =
                                (element.attr("name"), element.attr("value"))
                        {
                            current
                                .properties
                                .insert(name.to_string(), value.to_string());
                        }
                    }
                    _ => {}
                }

                stack.push(element.name);
            }
            Node::Text(text) => {
                if stack.last().map(String::as_str) == Some("filter") {
                    let owner = stack.len().checked_sub(2).map(|i| stack[i].as_str());
                    match owner {
                        Some("required") => {
                            if let Some(current) = requirement.as_mut() {
                                current.filter = Some(text.trim().to_string());
                            }
                        }
                        Some("unit") => {
                            if let Some(current) = unit.as_mut() {
                                current.filter = Some(text.trim().to_string());
                            }
                        }
                        _ => {}
                    }
                }
            }
            Node::Close(name) => {
                stack.pop();
                match name.as_str() {
                    "required" => {
                        if let (Some(done), Some(current)) = (requirement.take(), unit.as_mut()) {
                            current.requires.push(done);
                        }
                    }
                    "unit" => {
                        if let Some(done) = unit.take() {
                            units.push(done);
                        }
                    }
                    _ => {}
                }
            }
        }
        Ok(())
    })?;

    Ok(units)
}

fn open_unit(element: &Element, origin: &str) -> Result<InstallableUnit> {
    let id = element.required("id", origin)?;
    let mut unit = InstallableUnit::new(id, version(element.attr("version"), origin)?);
    // p2 treats a unit without the attribute as a singleton
    unit.singleton = element
        .attr("singleton")
        .map(|value| value.eq_ignore_ascii_case("true"))
        .unwrap_or(true);
    Ok(unit)
}

fn version(value: Option<&str>, origin: &str) -> Result<Version> {
    match value {
        None => Ok(Version::default()),
        Some(raw) => Version::parse(raw).map_err(|err| PaxError::ParseXml {
            origin: origin.to_string(),
            reason: err.to_string(),
        }),
    }
}

fn range(value: Option<&str>, origin: &str) -> Result<VersionRange> {
    VersionRange::parse(value.unwrap_or("")).map_err(|err| PaxError::ParseXml {
        origin: origin.to_string(),
        reason: err.to_string(),
    })
}

fn is_true(value: Option<&str>) -> bool {
    value.map(|v| v.eq_ignore_ascii_case("true")).unwrap_or(false)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::unit::namespace;

    const CONTENT: &str = r#"<?xml version='1.0' encoding='UTF-8'?>
<?metadataRepository version='1.1.0'?>
<repository name='test' type='org.eclipse.equinox.internal.p2.metadata.repository.LocalMetadataRepository' version='1'>
  <properties size='1'>
    <property name='p2.timestamp' value='1700000000000'/>
  </properties>
  <units size='2'>
    <unit id='org.example.core' version='1.2.0.v2024' singleton='false'>
      <properties size='1'>
        <property name='org.eclipse.equinox.p2.name' value='Example Core'/>
      </properties>
      <provides size='3'>
        <provided namespace='org.eclipse.equinox.p2.iu' name='org.example.core' version='1.2.0.v2024'/>
        <provided namespace='osgi.bundle' name='org.example.core' version='1.2.0.v2024'/>
        <provided namespace='java.package' name='org.example.api' version='1.2.0'/>
      </provides>
      <requires size='3'>
        <required namespace='osgi.bundle' name='org.example.util' range='[1.0.0,2.0.0)'/>
        <required namespace='java.package' name='org.slf4j' range='0.0.0' optional='true' greedy='false'/>
        <required namespace='org.eclipse.equinox.p2.iu' name='org.example.gtk' range='[1.0.0,1.0.0]'>
          <filter>
            (&amp;(osgi.os=linux)(osgi.ws=gtk))
          </filter>
        </required>
      </requires>
      <artifacts size='1'>
        <artifact classifier='osgi.bundle' id='org.example.core' version='1.2.0.v2024'/>
      </artifacts>
    </unit>
    <unit id='org.example.gtk' version='1.0.0'>
      <filter>(osgi.os=linux)</filter>
    </unit>
  </units>
</repository>
"#;

    #[test]
    fn parses_units() {
        let units = parse_content(CONTENT, "mem").unwrap();
        assert_eq!(units.len(), 2);

        let core = &units[0];
        assert_eq!(core.id, "org.example.core");
        assert!(!core.singleton);
        assert_eq!(core.provides.len(), 3);
        assert_eq!(core.requires.len(), 3);
        assert_eq!(core.artifacts[0].classifier, namespace::BUNDLE);
        assert_eq!(
            core.properties.get("org.eclipse.equinox.p2.name").map(String::as_str),
            Some("Example Core")
        );

        assert!(core.requires[1].optional);
        assert_eq!(
            core.requires[2].filter.as_deref(),
            Some("(&(osgi.os=linux)(osgi.ws=gtk))")
        );
        assert!(core.filter.is_none());

        let gtk = &units[1];
        assert!(gtk.singleton);
        assert_eq!(gtk.filter.as_deref(), Some("(osgi.os=linux)"));
    }

    #[test]
    fn repository_properties_are_not_unit_properties() {
        let units = parse_content(CONTENT, "mem").unwrap();
        assert!(!units[1].properties.contains_key("p2.timestamp"));
    }
}
