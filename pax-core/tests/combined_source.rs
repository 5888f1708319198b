mod common;

use common::{truncated_repository, write_bundle};
use pax_core::source::{ArtifactSource, CombinedSource, DirectorySource};
use pax_core::{PaxError, VersionRequest};
use tempfile::TempDir;

fn folder_with(bundle: &str) -> (TempDir, DirectorySource) {
    let dir = TempDir::new().unwrap();
    write_bundle(dir.path(), bundle, "1.0.0");
    let source = DirectorySource::new(dir.path()).unwrap();
    (dir, source)
}

#[test]
fn failures_from_every_delegate_are_kept() {
    let (_a, first) = folder_with("x");
    let (_b, second) = folder_with("y");
    let combined = CombinedSource::new().with(first).with(second);

    let err = combined
        .bundles()
        .unwrap()
        .bundle("z", &VersionRequest::Latest)
        .unwrap_err();

    assert!(err.is_not_found());
    assert_eq!(err.suppressed().len(), 2);
}

#[test]
fn first_delegate_wins() {
    let first_dir = TempDir::new().unwrap();
    write_bundle(first_dir.path(), "shared", "1.0.0");
    let second_dir = TempDir::new().unwrap();
    write_bundle(second_dir.path(), "shared", "2.0.0");

    let combined = CombinedSource::new()
        .with(DirectorySource::new(first_dir.path()).unwrap())
        .with(DirectorySource::new(second_dir.path()).unwrap());

    let bundle = combined
        .bundles()
        .unwrap()
        .bundle("shared", &VersionRequest::Latest)
        .unwrap();
    assert_eq!(bundle.version.to_string(), "1.0.0");
}

#[test]
fn delegates_without_units_report_unsupported() {
    let (_a, first) = folder_with("x");
    let (_b, second) = folder_with("y");
    let combined = CombinedSource::new().with(first).with(second);

    let units = combined.units().unwrap();
    let err = units.unit("x", &VersionRequest::Latest).unwrap_err();

    assert_eq!(err.suppressed().len(), 2);
    assert!(
        err.suppressed()
            .iter()
            .all(|failure| matches!(failure, PaxError::UnsupportedCapability { .. }))
    );
    assert!(units.all_units().unwrap().is_empty());
}

#[test]
fn unreadable_repository_aborts_the_lookup() {
    let (_a, folder) = folder_with("y");
    let repo = TempDir::new().unwrap();
    let cache = TempDir::new().unwrap();
    let combined = CombinedSource::new()
        .with(folder)
        .with(truncated_repository(repo.path(), cache.path()));

    let err = combined
        .bundles()
        .unwrap()
        .bundle("x", &VersionRequest::Latest)
        .unwrap_err();

    assert!(!err.is_not_found());
    assert!(matches!(err, PaxError::ParseXml { .. }));
}
