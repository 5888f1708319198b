use crate::artifact::ArtifactRequest;
use crate::source::Capability;
use std::path::PathBuf;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum PaxError {
    #[error("Failed to read file {path:?}: {source}")]
    ReadFile { path: PathBuf, source: std::io::Error },

    #[error("Failed to write file {path:?}: {source}")]
    WriteFile { path: PathBuf, source: std::io::Error },

    #[error("Failed to read archive {path:?}: {source}")]
    Archive {
        path: PathBuf,
        source: zip::result::ZipError,
    },

    #[error("Invalid XML in {origin}: {reason}")]
    ParseXml { origin: String, reason: String },

    #[error("Invalid bundle manifest in {path:?}: {reason}")]
    ManifestInvalid { path: PathBuf, reason: String },

    #[error("Invalid version {value}: {reason}")]
    Version { value: String, reason: String },

    #[error("HTTP error for {url}: {source}")]
    Http { url: String, source: reqwest::Error },

    #[error("HTTP status {status} for {url}")]
    HttpStatus { url: String, status: u16 },

    #[error("Checksum mismatch for {url}: expected {expected}, got {actual}")]
    ChecksumMismatch {
        url: String,
        expected: String,
        actual: String,
    },

    #[error("Repository {url} is unavailable: {reason}")]
    RepositoryUnavailable { url: String, reason: String },

    #[error("Invalid workspace pattern in {path:?}: {reason}")]
    WorkspaceConfig { path: PathBuf, reason: String },

    #[error("Invalid target definition {path:?}: {reason}")]
    TargetInvalid { path: PathBuf, reason: String },

    #[error("{request} could not be found ({} failures recorded)", .suppressed.len())]
    ArtifactNotFound {
        request: ArtifactRequest,
        suppressed: Vec<PaxError>,
    },

    #[error("{source_name} is not a {capability}")]
    UnsupportedCapability {
        source_name: String,
        capability: Capability,
    },

    #[error("Singleton bundle {name} is already staged at {current}, refusing {candidate}")]
    SingletonConflict {
        name: String,
        current: String,
        candidate: String,
    },

    #[error("No {what} given to resolve")]
    EmptyRequest { what: &'static str },

    #[error("Invalid provisioning plan {path:?}: {reason}")]
    PlanInvalid { path: PathBuf, reason: String },
}

impl PaxError {
    pub fn not_found(request: ArtifactRequest) -> Self {
        PaxError::ArtifactNotFound {
            request,
            suppressed: Vec::new(),
        }
    }

    pub fn is_not_found(&self) -> bool {
        matches!(self, PaxError::ArtifactNotFound { .. })
    }

    /// A lookup that came back empty, either because the artifact is absent
    /// or because the source cannot answer that kind of lookup at all.
    pub fn is_miss(&self) -> bool {
        matches!(
            self,
            PaxError::ArtifactNotFound { .. } | PaxError::UnsupportedCapability { .. }
        )
    }

    /// Failures collected from every delegate a combined lookup consulted.
    pub fn suppressed(&self) -> &[PaxError] {
        match self {
            PaxError::ArtifactNotFound { suppressed, .. } => suppressed,
            _ => &[],
        }
    }
}

impl From<pax_version::Error> for PaxError {
    fn from(err: pax_version::Error) -> Self {
        PaxError::Version {
            value: err.input().to_string(),
            reason: err.to_string(),
        }
    }
}
