use crate::bundle::EclipseBundle;
use crate::{PaxError, Result};
use serde::Serialize;
use std::collections::{BTreeMap, BTreeSet};
use tracing::debug;

/// What to do when a second bundle claims an already-staged singleton name.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SingletonConflictResolution {
    #[default]
    Fail,
    KeepCurrent,
    ReplaceCurrent,
    UseHighestVersion,
}

impl SingletonConflictResolution {
    pub fn from_str(value: &str) -> Option<Self> {
        match value.trim().to_ascii_lowercase().replace('_', "-").as_str() {
            "fail" | "error" => Some(SingletonConflictResolution::Fail),
            "keep-current" | "keep" => Some(SingletonConflictResolution::KeepCurrent),
            "replace-current" | "replace" => Some(SingletonConflictResolution::ReplaceCurrent),
            "use-highest-version" | "highest" => {
                Some(SingletonConflictResolution::UseHighestVersion)
            }
            _ => None,
        }
    }
}

/// Bundle keys that must not be staged, matched by bare name or by
/// `name:version` prefix (`name:1`, `name:1.2`, `name:1.2.3`, full version).
#[derive(Debug, Clone, Default)]
pub struct IgnoreSet {
    entries: BTreeSet<String>,
}

impl IgnoreSet {
    pub fn new<I, S>(entries: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        IgnoreSet {
            entries: entries.into_iter().map(Into::into).collect(),
        }
    }

    pub fn insert(&mut self, entry: String) {
        self.entries.insert(entry);
    }

    pub fn matches(&self, bundle: &EclipseBundle) -> bool {
        let v = &bundle.version;
        let candidates = [
            bundle.id.clone(),
            format!("{}:{}", bundle.id, v.major),
            format!("{}:{}.{}", bundle.id, v.major, v.minor),
            format!("{}:{}.{}.{}", bundle.id, v.major, v.minor, v.micro),
            bundle.key(),
        ];

        candidates.iter().any(|key| self.entries.contains(key))
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

/// Merges bundle lists from several feature/unit resolutions into one
/// launchable set.
#[derive(Debug)]
pub struct Provisioning {
    policy: SingletonConflictResolution,
    ignore: IgnoreSet,
    bundles: Vec<EclipseBundle>,
    singletons: BTreeMap<String, EclipseBundle>,
}

impl Provisioning {
    pub fn new(policy: SingletonConflictResolution, ignore: IgnoreSet) -> Self {
        Provisioning {
            policy,
            ignore,
            bundles: Vec::new(),
            singletons: BTreeMap::new(),
        }
    }

    pub fn add_all<I>(&mut self, bundles: I) -> Result<()>
    where
        I: IntoIterator<Item = EclipseBundle>,
    {
        for bundle in bundles {
            self.add(bundle)?;
        }
        Ok(())
    }

    pub fn add(&mut self, bundle: EclipseBundle) -> Result<()> {
        if self.ignore.matches(&bundle) {
            debug!("ignoring {}", bundle.key());
            return Ok(());
        }

        let key = bundle.key();

        if !bundle.singleton {
            self.bundles.push(bundle);
            self.ignore.insert(key);
            return Ok(());
        }

        let Some(current) = self.singletons.get(&bundle.id) else {
            self.singletons.insert(bundle.id.clone(), bundle);
            self.ignore.insert(key);
            return Ok(());
        };

        let replace = match self.policy {
            SingletonConflictResolution::Fail => {
                return Err(PaxError::SingletonConflict {
                    name: bundle.id.clone(),
                    current: current.version.to_string(),
                    candidate: bundle.version.to_string(),
                });
            }
            SingletonConflictResolution::KeepCurrent => false,
            SingletonConflictResolution::ReplaceCurrent => true,
            SingletonConflictResolution::UseHighestVersion => bundle.version >= current.version,
        };

        if replace {
            debug!("singleton {} replaces {}", key, current.key());
            self.singletons.insert(bundle.id.clone(), bundle);
            self.ignore.insert(key);
        } else {
            debug!("singleton {} kept over {}", current.key(), key);
        }

        Ok(())
    }

    pub fn into_set(self) -> ProvisioningSet {
        ProvisioningSet {
            bundles: self.bundles,
            singletons: self.singletons,
        }
    }
}

/// One line of the launcher's input.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct LaunchEntry {
    pub id: String,
    pub version: String,
    pub location: String,
    pub start: bool,
    pub start_level: Option<u32>,
}

#[derive(Debug, Clone, Default)]
pub struct ProvisioningSet {
    pub bundles: Vec<EclipseBundle>,
    pub singletons: BTreeMap<String, EclipseBundle>,
}

impl ProvisioningSet {
    /// Plain bundles in staging order, then singletons by name, with any
    /// repeated `name:version` dropped.
    pub fn launch_entries(&self) -> Vec<LaunchEntry> {
        let mut seen = BTreeSet::new();

        self.bundles
            .iter()
            .chain(self.singletons.values())
            .filter(|bundle| seen.insert(bundle.key()))
            .map(|bundle| LaunchEntry {
                id: bundle.id.clone(),
                version: bundle.version.to_string(),
                location: bundle.location.clone(),
                start: bundle.start,
                start_level: bundle.start_level,
            })
            .collect()
    }

    pub fn len(&self) -> usize {
        self.bundles.len() + self.singletons.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bundles.is_empty() && self.singletons.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pax_version::Version;

    fn bundle(id: &str, version: &str, singleton: bool) -> EclipseBundle {
        EclipseBundle {
            id: id.to_string(),
            version: Version::parse(version).unwrap(),
            location: format!("/bundles/{id}_{version}.jar"),
            singleton,
            fragment: false,
            start: true,
            start_level: None,
        }
    }

    fn stage_twice(policy: SingletonConflictResolution) -> Result<ProvisioningSet> {
        let mut provisioning = Provisioning::new(policy, IgnoreSet::default());
        provisioning.add_all(vec![bundle("S", "1.0", true)])?;
        provisioning.add_all(vec![bundle("S", "2.0", true)])?;
        Ok(provisioning.into_set())
    }

    #[test]
    fn highest_version_policy_takes_newer() {
        let set = stage_twice(SingletonConflictResolution::UseHighestVersion).unwrap();
        assert_eq!(set.singletons.len(), 1);
        assert_eq!(set.singletons["S"].version, Version::new(2, 0, 0));
    }

    #[test]
    fn highest_version_policy_keeps_newer_current() {
        let mut provisioning = Provisioning::new(
            SingletonConflictResolution::UseHighestVersion,
            IgnoreSet::default(),
        );
        provisioning.add(bundle("S", "2.0", true)).unwrap();
        provisioning.add(bundle("S", "1.0", true)).unwrap();
        let set = provisioning.into_set();
        assert_eq!(set.singletons["S"].version, Version::new(2, 0, 0));
    }

    #[test]
    fn keep_current_policy_keeps_first() {
        let set = stage_twice(SingletonConflictResolution::KeepCurrent).unwrap();
        assert_eq!(set.singletons["S"].version, Version::new(1, 0, 0));
    }

    #[test]
    fn replace_policy_takes_latest_staged() {
        let set = stage_twice(SingletonConflictResolution::ReplaceCurrent).unwrap();
        assert_eq!(set.singletons["S"].version, Version::new(2, 0, 0));
    }

    #[test]
    fn fail_policy_rejects_second_singleton() {
        let err = stage_twice(SingletonConflictResolution::Fail).unwrap_err();
        assert!(matches!(err, PaxError::SingletonConflict { .. }));
    }

    #[test]
    fn ignore_set_matches_version_prefixes() {
        let ignore = IgnoreSet::new(["org.junit:4.12"]);
        assert!(ignore.matches(&bundle("org.junit", "4.12.0", false)));
        assert!(!ignore.matches(&bundle("org.junit", "4.13.0", false)));
        assert!(IgnoreSet::new(["org.junit"]).matches(&bundle("org.junit", "5.0.0", false)));
        assert!(IgnoreSet::new(["org.junit:4"]).matches(&bundle("org.junit", "4.13.2.v1", false)));
        assert!(
            IgnoreSet::new(["org.junit:4.13.2.v1"]).matches(&bundle("org.junit", "4.13.2.v1", false))
        );
    }

    #[test]
    fn staged_bundles_are_not_restaged() {
        let mut provisioning =
            Provisioning::new(SingletonConflictResolution::Fail, IgnoreSet::default());
        provisioning.add_all(vec![bundle("a", "1.0", false)]).unwrap();
        provisioning
            .add_all(vec![bundle("a", "1.0", false), bundle("b", "1.0", false)])
            .unwrap();

        let set = provisioning.into_set();
        let ids: Vec<&str> = set.bundles.iter().map(|b| b.id.as_str()).collect();
        assert_eq!(ids, vec!["a", "b"]);
    }

    #[test]
    fn launch_entries_list_plain_then_singletons() {
        let mut provisioning =
            Provisioning::new(SingletonConflictResolution::Fail, IgnoreSet::default());
        provisioning
            .add_all(vec![bundle("z.singleton", "1.0", true), bundle("a", "1.0", false)])
            .unwrap();

        let entries = provisioning.into_set().launch_entries();
        assert_eq!(entries.len(), 2);
        assert_eq!(entries[0].id, "a");
        assert_eq!(entries[1].id, "z.singleton");
        assert_eq!(entries[1].version, "1.0.0");
    }
}
