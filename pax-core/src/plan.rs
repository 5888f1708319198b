use crate::artifact::VersionRequest;
use crate::environment::{EclipseEnvironment, EnvironmentOverride};
use crate::provision::SingletonConflictResolution;
use crate::resolve::IncludeMode;
use crate::transport::local_path;
use crate::{PaxError, Result};
use serde::Deserialize;
use std::fs;
use std::path::{Path, PathBuf};

#[derive(Debug, Deserialize)]
#[serde(rename_all = "kebab-case", deny_unknown_fields)]
struct PlanFile {
    #[serde(default)]
    sources: Vec<SourceEntry>,
    #[serde(default)]
    requests: Vec<RequestEntry>,
    #[serde(default)]
    ignore: Vec<String>,
    singleton_conflict: Option<String>,
    include_mode: Option<String>,
    environment: Option<EnvironmentOverride>,
}

#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum SourceEntry {
    Directory {
        directory: String,
    },
    Workspace {
        workspace: String,
        #[serde(default)]
        patterns: Vec<String>,
    },
    Repository {
        repository: String,
    },
    Target {
        target: String,
    },
}

#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum RequestEntry {
    Feature {
        feature: String,
        version: Option<String>,
        #[serde(rename = "start-level")]
        start_level: Option<u32>,
    },
    Unit {
        unit: String,
        version: Option<String>,
    },
    Bundle {
        bundle: String,
        version: Option<String>,
        start: Option<bool>,
        #[serde(rename = "start-level")]
        start_level: Option<u32>,
    },
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PlanSource {
    Directory(PathBuf),
    Workspace { root: PathBuf, patterns: Vec<String> },
    Repository(String),
    Target(PathBuf),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PlanRequest {
    Feature {
        id: String,
        version: VersionRequest,
        start_level: Option<u32>,
    },
    Unit {
        id: String,
        version: VersionRequest,
    },
    Bundle {
        id: String,
        version: VersionRequest,
        start: Option<bool>,
        start_level: Option<u32>,
    },
}

/// What to provision and where to find it, read from a YAML file.
///
/// Settings left out of the plan fall back to the configuration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProvisionPlan {
    pub path: PathBuf,
    pub sources: Vec<PlanSource>,
    pub requests: Vec<PlanRequest>,
    pub ignore: Vec<String>,
    pub singleton_conflict: Option<SingletonConflictResolution>,
    pub include_mode: Option<IncludeMode>,
    pub environment: EnvironmentOverride,
}

impl ProvisionPlan {
    pub fn load(path: &Path) -> Result<Self> {
        let text = fs::read_to_string(path).map_err(|source| PaxError::ReadFile {
            path: path.to_path_buf(),
            source,
        })?;
        Self::parse(&text, path)
    }

    /// Relative paths in the plan are taken from the plan file's directory.
    pub fn parse(text: &str, path: &Path) -> Result<Self> {
        let invalid = |reason: String| PaxError::PlanInvalid {
            path: path.to_path_buf(),
            reason,
        };

        let file: PlanFile = serde_yaml::from_str(text).map_err(|err| invalid(err.to_string()))?;
        let base = path.parent().unwrap_or(Path::new("."));

        let sources = file
            .sources
            .into_iter()
            .map(|entry| match entry {
                SourceEntry::Directory { directory } => PlanSource::Directory(base.join(directory)),
                SourceEntry::Workspace {
                    workspace,
                    patterns,
                } => PlanSource::Workspace {
                    root: base.join(workspace),
                    patterns: if patterns.is_empty() {
                        vec!["*".to_string()]
                    } else {
                        patterns
                    },
                },
                SourceEntry::Repository { repository } => {
                    PlanSource::Repository(repository_url(base, &repository))
                }
                SourceEntry::Target { target } => PlanSource::Target(base.join(target)),
            })
            .collect();

        let mut requests = Vec::new();
        for entry in file.requests {
            let request = match entry {
                RequestEntry::Feature {
                    feature,
                    version,
                    start_level,
                } => PlanRequest::Feature {
                    id: feature,
                    version: VersionRequest::parse_optional(version.as_deref())?,
                    start_level,
                },
                RequestEntry::Unit { unit, version } => PlanRequest::Unit {
                    id: unit,
                    version: VersionRequest::parse_optional(version.as_deref())?,
                },
                RequestEntry::Bundle {
                    bundle,
                    version,
                    start,
                    start_level,
                } => PlanRequest::Bundle {
                    id: bundle,
                    version: VersionRequest::parse_optional(version.as_deref())?,
                    start,
                    start_level,
                },
            };
            requests.push(request);
        }

        let singleton_conflict = match file.singleton_conflict.as_deref() {
            None => None,
            Some(raw) => Some(SingletonConflictResolution::from_str(raw).ok_or_else(|| {
                invalid(format!("unknown singleton-conflict policy {raw:?}"))
            })?),
        };

        let include_mode = match file.include_mode.as_deref() {
            None => None,
            Some(raw) => Some(
                IncludeMode::from_str(raw)
                    .ok_or_else(|| invalid(format!("unknown include-mode {raw:?}")))?,
            ),
        };

        Ok(ProvisionPlan {
            path: path.to_path_buf(),
            sources,
            requests,
            ignore: file.ignore,
            singleton_conflict,
            include_mode,
            environment: file.environment.unwrap_or_default(),
        })
    }

    pub fn environment(&self, base: &EclipseEnvironment) -> EclipseEnvironment {
        self.environment.apply(base)
    }
}

/// Relative local repositories become absolute paths; URLs are kept.
fn repository_url(base: &Path, raw: &str) -> String {
    match local_path(raw) {
        Some(path) if path.is_relative() => base.join(path).display().to_string(),
        _ => raw.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pax_version::Version;

    const PLAN: &str = r#"
sources:
  - directory: eclipse
  - workspace: ../projects
    patterns: ["bundles/*"]
  - repository: https://download.eclipse.org/releases/2024-03
  - repository: local-repo
  - target: platform.target
requests:
  - feature: org.example.feature
    version: 1.0.0
    start-level: 4
  - unit: org.example.feature.feature.group
  - bundle: org.example.extra
    version: "[1.0,2.0)"
    start: false
ignore: [org.eclipse.osgi]
singleton-conflict: use-highest-version
include-mode: slicer
environment:
  os: linux
"#;

    #[test]
    fn parses_plan() {
        let plan = ProvisionPlan::parse(PLAN, Path::new("/work/plan.yaml")).unwrap();

        assert_eq!(plan.sources.len(), 5);
        assert_eq!(plan.sources[0], PlanSource::Directory(PathBuf::from("/work/eclipse")));
        assert_eq!(
            plan.sources[1],
            PlanSource::Workspace {
                root: PathBuf::from("/work/../projects"),
                patterns: vec!["bundles/*".to_string()],
            }
        );
        assert_eq!(
            plan.sources[2],
            PlanSource::Repository("https://download.eclipse.org/releases/2024-03".to_string())
        );
        assert_eq!(
            plan.sources[3],
            PlanSource::Repository("/work/local-repo".to_string())
        );

        assert_eq!(
            plan.requests[0],
            PlanRequest::Feature {
                id: "org.example.feature".to_string(),
                version: VersionRequest::Exact(Version::new(1, 0, 0)),
                start_level: Some(4),
            }
        );
        assert!(matches!(
            plan.requests[1],
            PlanRequest::Unit {
                version: VersionRequest::Latest,
                ..
            }
        ));
        assert!(matches!(
            plan.requests[2],
            PlanRequest::Bundle {
                version: VersionRequest::Range(_),
                start: Some(false),
                ..
            }
        ));

        assert_eq!(
            plan.singleton_conflict,
            Some(SingletonConflictResolution::UseHighestVersion)
        );
        assert_eq!(plan.include_mode, Some(IncludeMode::Slicer));
        assert_eq!(plan.environment.os.as_deref(), Some("linux"));
    }

    #[test]
    fn unknown_policy_is_rejected() {
        let err = ProvisionPlan::parse("singleton-conflict: sometimes\n", Path::new("p.yaml"))
            .unwrap_err();
        assert!(matches!(err, PaxError::PlanInvalid { .. }));
    }

    #[test]
    fn empty_plan_is_valid() {
        let plan = ProvisionPlan::parse("{}", Path::new("p.yaml")).unwrap();
        assert!(plan.sources.is_empty());
        assert!(plan.requests.is_empty());
    }
}
