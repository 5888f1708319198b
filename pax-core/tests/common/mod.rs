#![allow(dead_code)]

use pax_core::source::RepositoryLocation;
use pax_core::store::ArtifactStore;
use pax_core::transport::Transport;
use std::fs;
use std::io::Write;
use std::path::Path;
use std::time::Duration;
use zip::write::SimpleFileOptions;

pub fn write_jar(path: &Path, entry: &str, text: &str) {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent).unwrap();
    }
    let file = fs::File::create(path).unwrap();
    let mut zip = zip::ZipWriter::new(file);
    zip.start_file(entry, SimpleFileOptions::default()).unwrap();
    zip.write_all(text.as_bytes()).unwrap();
    zip.finish().unwrap();
}

pub fn write_bundle(dir: &Path, id: &str, version: &str) {
    let manifest = format!("Bundle-SymbolicName: {id}\nBundle-Version: {version}\n");
    write_jar(
        &dir.join(format!("{id}_{version}.jar")),
        "META-INF/MANIFEST.MF",
        &manifest,
    );
}

pub fn write_singleton(dir: &Path, id: &str, version: &str) {
    let manifest =
        format!("Bundle-SymbolicName: {id};singleton:=true\nBundle-Version: {version}\n");
    write_jar(
        &dir.join(format!("{id}_{version}.jar")),
        "META-INF/MANIFEST.MF",
        &manifest,
    );
}

/// `plugins` are `(id, version)`; `includes` are `(id, optional)`.
pub fn feature_xml(id: &str, version: &str, plugins: &[(&str, &str)], includes: &[(&str, bool)]) -> String {
    let mut xml = format!("<?xml version=\"1.0\" encoding=\"UTF-8\"?>\n<feature id=\"{id}\" version=\"{version}\">\n");
    for (include, optional) in includes {
        xml.push_str(&format!(
            "  <includes id=\"{include}\" version=\"0.0.0\" optional=\"{optional}\"/>\n"
        ));
    }
    for (plugin, plugin_version) in plugins {
        xml.push_str(&format!(
            "  <plugin id=\"{plugin}\" version=\"{plugin_version}\" unpack=\"false\"/>\n"
        ));
    }
    xml.push_str("</feature>\n");
    xml
}

pub fn write_feature_dir(features: &Path, id: &str, xml: &str) {
    let dir = features.join(id);
    fs::create_dir_all(&dir).unwrap();
    fs::write(dir.join("feature.xml"), xml).unwrap();
}

pub fn open_repository(root: &Path, cache: &Path) -> RepositoryLocation {
    let transport = Transport::new(ArtifactStore::new(cache.to_path_buf()), Duration::from_secs(5));
    RepositoryLocation::new(&root.display().to_string(), transport)
}

/// A repository whose `content.xml` was cut off mid-download.
pub fn truncated_repository(root: &Path, cache: &Path) -> RepositoryLocation {
    fs::write(
        root.join("content.xml"),
        "<?xml version='1.0' encoding='UTF-8'?>\n<repository name='cut'><units size='1'><unit id='x' version='1.0.0'",
    )
    .unwrap();
    open_repository(root, cache)
}
