use pax_version::{Version, VersionRange};
use std::cmp::Ordering;
use std::fmt;

/// A named, versioned artifact with an opaque payload.
///
/// Equality and ordering ignore the payload. Ordering is by name, then by
/// version descending so that the latest version of a name sorts first.
#[derive(Clone, Debug)]
pub struct ArtifactRef<T> {
    pub name: String,
    pub version: Version,
    pub context: T,
}

impl<T> ArtifactRef<T> {
    pub fn new(name: impl Into<String>, version: Version, context: T) -> Self {
        ArtifactRef {
            name: name.into(),
            version,
            context,
        }
    }

    pub fn key(&self) -> String {
        format!("{}:{}", self.name, self.version)
    }
}

impl<T> PartialEq for ArtifactRef<T> {
    fn eq(&self, other: &Self) -> bool {
        self.name == other.name && self.version == other.version
    }
}

impl<T> Eq for ArtifactRef<T> {}

impl<T> Ord for ArtifactRef<T> {
    fn cmp(&self, other: &Self) -> Ordering {
        self.name
            .cmp(&other.name)
            .then_with(|| other.version.cmp(&self.version))
    }
}

impl<T> PartialOrd for ArtifactRef<T> {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

/// Which version of an artifact a caller wants.
///
/// `Latest` is always spelled out; an empty or `0.0.0` version string parses
/// to it, nothing else silently widens to a wildcard.
#[derive(Clone, Debug, PartialEq, Eq, Hash, Default)]
pub enum VersionRequest {
    #[default]
    Latest,
    Exact(Version),
    Range(VersionRange),
}

impl VersionRequest {
    pub fn parse(value: &str) -> std::result::Result<Self, pax_version::Error> {
        let trimmed = value.trim();

        if trimmed.is_empty() || trimmed == "latest" {
            return Ok(VersionRequest::Latest);
        }

        if trimmed.starts_with('[') || trimmed.starts_with('(') {
            return VersionRange::parse(trimmed).map(VersionRequest::Range);
        }

        let version = Version::parse(trimmed)?;
        if version.is_empty() {
            Ok(VersionRequest::Latest)
        } else {
            Ok(VersionRequest::Exact(version))
        }
    }

    pub fn parse_optional(value: Option<&str>) -> std::result::Result<Self, pax_version::Error> {
        value.map(Self::parse).unwrap_or(Ok(VersionRequest::Latest))
    }

    pub fn matches(&self, version: &Version) -> bool {
        match self {
            VersionRequest::Latest => true,
            VersionRequest::Exact(exact) => exact == version,
            VersionRequest::Range(range) => range.includes(version),
        }
    }
}

impl fmt::Display for VersionRequest {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            VersionRequest::Latest => write!(f, "latest"),
            VersionRequest::Exact(version) => write!(f, "{version}"),
            VersionRequest::Range(range) => write!(f, "{range}"),
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub enum ArtifactKind {
    Bundle,
    Feature,
    Unit,
    Package,
    /// A requirement in a namespace the resolver does not understand.
    Capability(String),
}

impl fmt::Display for ArtifactKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ArtifactKind::Bundle => write!(f, "bundle"),
            ArtifactKind::Feature => write!(f, "feature"),
            ArtifactKind::Unit => write!(f, "installable unit"),
            ArtifactKind::Package => write!(f, "package"),
            ArtifactKind::Capability(namespace) => write!(f, "capability {namespace}"),
        }
    }
}

/// The identity of a failed lookup, carried by not-found errors.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ArtifactRequest {
    pub kind: ArtifactKind,
    pub name: String,
    pub version: VersionRequest,
}

impl ArtifactRequest {
    pub fn new(kind: ArtifactKind, name: &str, version: &VersionRequest) -> Self {
        ArtifactRequest {
            kind,
            name: name.to_string(),
            version: version.clone(),
        }
    }

    pub fn bundle(name: &str, version: &VersionRequest) -> Self {
        Self::new(ArtifactKind::Bundle, name, version)
    }

    pub fn feature(name: &str, version: &VersionRequest) -> Self {
        Self::new(ArtifactKind::Feature, name, version)
    }

    pub fn unit(name: &str, version: &VersionRequest) -> Self {
        Self::new(ArtifactKind::Unit, name, version)
    }
}

impl fmt::Display for ArtifactRequest {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {}@{}", self.kind, self.name, self.version)
    }
}
