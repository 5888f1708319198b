use crate::artifact::{ArtifactRef, VersionRequest};
use pax_version::{Version, VersionRange};
use std::collections::BTreeMap;

/// All known versions of each artifact name, kept latest-first.
///
/// Built once by a source and read-only afterwards. Duplicate versions are
/// allowed; among equal versions insertion order is preserved.
#[derive(Clone, Debug)]
pub struct ArtifactIndex<T> {
    entries: BTreeMap<String, Vec<ArtifactRef<T>>>,
}

impl<T> Default for ArtifactIndex<T> {
    fn default() -> Self {
        ArtifactIndex {
            entries: BTreeMap::new(),
        }
    }
}

impl<T> ArtifactIndex<T> {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add(&mut self, artifact: ArtifactRef<T>) {
        let list = self.entries.entry(artifact.name.clone()).or_default();
        list.push(artifact);
        // stable: equal versions keep insertion order
        list.sort_by(|a, b| b.version.cmp(&a.version));
    }

    pub fn get_exact(&self, name: &str, version: &Version) -> Option<&ArtifactRef<T>> {
        self.versions(name)
            .iter()
            .find(|artifact| artifact.version == *version)
    }

    /// Highest version inside `range`.
    pub fn get_in_range(&self, name: &str, range: &VersionRange) -> Option<&ArtifactRef<T>> {
        self.versions(name)
            .iter()
            .find(|artifact| range.includes(&artifact.version))
    }

    pub fn get_latest(&self, name: &str) -> Option<&ArtifactRef<T>> {
        self.versions(name).first()
    }

    pub fn get(&self, name: &str, request: &VersionRequest) -> Option<&ArtifactRef<T>> {
        match request {
            VersionRequest::Latest => self.get_latest(name),
            VersionRequest::Exact(version) => self.get_exact(name, version),
            VersionRequest::Range(range) => self.get_in_range(name, range),
        }
    }

    /// Like [`get`](Self::get), but an exact request that misses falls back
    /// to the highest version with the same major.minor.micro, whatever its
    /// qualifier. Directory-scanned bundles usually carry build qualifiers
    /// the caller does not know.
    pub fn get_fuzzy(&self, name: &str, request: &VersionRequest) -> Option<&ArtifactRef<T>> {
        let found = self.get(name, request);
        if found.is_some() {
            return found;
        }

        match request {
            VersionRequest::Exact(version) => self
                .versions(name)
                .iter()
                .find(|artifact| artifact.version.same_release(version)),
            _ => None,
        }
    }

    pub fn contains(&self, name: &str, version: &Version) -> bool {
        self.get_exact(name, version).is_some()
    }

    pub fn versions(&self, name: &str) -> &[ArtifactRef<T>] {
        self.entries.get(name).map(Vec::as_slice).unwrap_or(&[])
    }

    /// Every artifact, ascending by name and then version.
    pub fn artifacts(&self) -> Vec<&ArtifactRef<T>> {
        let mut all: Vec<&ArtifactRef<T>> = self.entries.values().flatten().collect();
        all.sort_by(|a, b| a.name.cmp(&b.name).then_with(|| a.version.cmp(&b.version)));
        all
    }

    pub fn len(&self) -> usize {
        self.entries.values().map(Vec::len).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}
