mod common;

use common::{feature_xml, write_bundle, write_feature_dir};
use pax_core::source::{ArtifactSource, DirectorySource};
use pax_core::{EclipseEnvironment, VersionRequest, resolve};
use pax_version::Version;
use tempfile::TempDir;

fn linux() -> EclipseEnvironment {
    EclipseEnvironment::new("linux", "gtk", "x86_64")
}

#[test]
fn feature_in_installation_resolves_its_bundle() {
    let dir = TempDir::new().unwrap();
    write_bundle(&dir.path().join("plugins"), "app.bundle", "1.0.0");
    write_feature_dir(
        &dir.path().join("features"),
        "app.feature",
        &feature_xml("app.feature", "1.0.0", &[("app.bundle", "0.0.0")], &[]),
    );

    let source = DirectorySource::new(dir.path()).unwrap();
    let bundles =
        resolve::feature_bundles(&source, "app.feature", &VersionRequest::Latest, &linux()).unwrap();

    assert_eq!(bundles.len(), 1);
    assert_eq!(bundles[0].id, "app.bundle");
    assert_eq!(bundles[0].version, Version::new(1, 0, 0));
}

#[test]
fn unqualified_request_finds_qualified_bundle() {
    let dir = TempDir::new().unwrap();
    write_bundle(&dir.path().join("plugins"), "app.core", "1.2.3.build42");

    let source = DirectorySource::new(dir.path()).unwrap();
    let request = VersionRequest::parse("1.2.3").unwrap();
    let bundle = source.bundles().unwrap().bundle("app.core", &request).unwrap();

    assert_eq!(bundle.version.to_string(), "1.2.3.build42");
}

#[test]
fn latest_version_wins() {
    let dir = TempDir::new().unwrap();
    let plugins = dir.path().join("plugins");
    write_bundle(&plugins, "app.core", "1.0.0");
    write_bundle(&plugins, "app.core", "1.2.0");
    write_bundle(&plugins, "app.core", "2.0.0");

    let source = DirectorySource::new(dir.path()).unwrap();
    let bundles = source.bundles().unwrap();

    let latest = bundles.bundle("app.core", &VersionRequest::Latest).unwrap();
    assert_eq!(latest.version, Version::new(2, 0, 0));

    let ranged = bundles
        .bundle("app.core", &VersionRequest::parse("[1.0.0,2.0.0)").unwrap())
        .unwrap();
    assert_eq!(ranged.version, Version::new(1, 2, 0));
}

#[test]
fn directory_offers_no_units() {
    let dir = TempDir::new().unwrap();
    let source = DirectorySource::new(dir.path()).unwrap();
    assert!(source.units().is_none());
    assert!(source.features().is_some());
}
