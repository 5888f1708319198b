mod common;

use common::{feature_xml, write_bundle, write_feature_dir, write_singleton};
use pax_core::provision::IgnoreSet;
use pax_core::{
    EclipseBundle, PaxConfig, PaxError, ProvisionPlan, Provisioning, SingletonConflictResolution,
    operations,
};
use pax_version::Version;
use std::fs;
use std::path::Path;
use tempfile::TempDir;

fn layout(root: &Path) {
    let plugins = root.join("one/plugins");
    write_singleton(&plugins, "app.core", "1.0.0");
    write_bundle(&plugins, "app.util", "1.0.0");
    write_bundle(&plugins, "app.extra", "1.0.0");
    write_bundle(&plugins, "org.eclipse.osgi", "3.0.0");
    write_feature_dir(
        &root.join("one/features"),
        "app",
        &feature_xml(
            "app",
            "1.0.0",
            &[("app.core", "0.0.0"), ("app.util", "0.0.0"), ("org.eclipse.osgi", "0.0.0")],
            &[],
        ),
    );

    write_singleton(&root.join("two"), "app.core", "2.0.0");
}

fn plan(root: &Path, policy: &str) -> ProvisionPlan {
    let text = format!(
        r#"
sources:
  - directory: one
  - directory: two
requests:
  - feature: app
    start-level: 4
  - bundle: app.core
    version: "[2.0,3.0)"
  - bundle: app.extra
    start: false
ignore:
  - org.eclipse.osgi
singleton-conflict: {policy}
"#
    );
    let path = root.join("plan.yaml");
    fs::write(&path, text).unwrap();
    ProvisionPlan::load(&path).unwrap()
}

#[test]
fn plan_produces_launch_entries() {
    let root = TempDir::new().unwrap();
    layout(root.path());
    let config = PaxConfig::with_home(&root.path().join("home"));

    let set = operations::provision(&config, &plan(root.path(), "use-highest-version")).unwrap();
    let entries = set.launch_entries();

    let summary: Vec<(&str, &str, bool, Option<u32>)> = entries
        .iter()
        .map(|e| (e.id.as_str(), e.version.as_str(), e.start, e.start_level))
        .collect();

    assert_eq!(
        summary,
        vec![
            ("app.util", "1.0.0", true, Some(4)),
            ("app.extra", "1.0.0", false, None),
            ("app.core", "2.0.0", true, None),
        ]
    );
}

#[test]
fn conflicting_singletons_fail_by_default() {
    let root = TempDir::new().unwrap();
    layout(root.path());
    let config = PaxConfig::with_home(&root.path().join("home"));

    let err = operations::provision(&config, &plan(root.path(), "fail")).unwrap_err();
    assert!(matches!(err, PaxError::SingletonConflict { .. }));
}

#[test]
fn missing_source_folder_is_reported() {
    let root = TempDir::new().unwrap();
    let path = root.path().join("plan.yaml");
    fs::write(&path, "sources:\n  - directory: nowhere\n").unwrap();

    let config = PaxConfig::with_home(&root.path().join("home"));
    let plan = ProvisionPlan::load(&path).unwrap();
    assert!(matches!(
        operations::provision(&config, &plan),
        Err(PaxError::ReadFile { .. })
    ));
}

fn singleton(version: &str) -> EclipseBundle {
    EclipseBundle {
        id: "s".to_string(),
        version: Version::parse(version).unwrap(),
        location: format!("/bundles/s_{version}.jar"),
        singleton: true,
        fragment: false,
        start: true,
        start_level: None,
    }
}

#[test]
fn keep_current_ignores_later_versions() {
    let mut provisioning =
        Provisioning::new(SingletonConflictResolution::KeepCurrent, IgnoreSet::default());
    provisioning.add(singleton("1.0")).unwrap();
    provisioning.add(singleton("2.0")).unwrap();

    let entries = provisioning.into_set().launch_entries();
    assert_eq!(entries.len(), 1);
    assert_eq!(entries[0].version, "1.0.0");
}

#[test]
fn replace_current_takes_the_last_one() {
    let mut provisioning =
        Provisioning::new(SingletonConflictResolution::ReplaceCurrent, IgnoreSet::default());
    provisioning.add(singleton("2.0")).unwrap();
    provisioning.add(singleton("1.0")).unwrap();

    let entries = provisioning.into_set().launch_entries();
    assert_eq!(entries.len(), 1);
    assert_eq!(entries[0].version, "1.0.0");
}
