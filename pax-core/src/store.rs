use crate::{PaxError, Result};
use sha2::{Digest, Sha256};
use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::time::Instant;
use tempfile::NamedTempFile;
use tracing::debug;

/// Downloaded artifacts, one directory per source URL.
#[derive(Debug, Clone)]
pub struct ArtifactStore {
    dir: PathBuf,
}

impl ArtifactStore {
    pub fn new(dir: PathBuf) -> Self {
        ArtifactStore { dir }
    }

    pub fn path_for(&self, url: &str) -> PathBuf {
        let digest = hex::encode(Sha256::digest(url.as_bytes()));
        self.dir.join(&digest[..16]).join(file_name(url))
    }

    /// Returns the stored copy of `url`, calling `download` on a miss or
    /// when the stored bytes no longer match `expected_sha256`.
    pub fn ensure<F>(&self, url: &str, expected_sha256: Option<&str>, download: F) -> Result<PathBuf>
    where
        F: FnOnce() -> Result<Vec<u8>>,
    {
        let path = self.path_for(url);

        if path.is_file() {
            match expected_sha256 {
                None => {
                    debug!("store hit: {}", url);
                    return Ok(path);
                }
                Some(expected) => {
                    let bytes = fs::read(&path).map_err(|source| PaxError::ReadFile {
                        path: path.clone(),
                        source,
                    })?;
                    if sha256_hex(&bytes).eq_ignore_ascii_case(expected) {
                        debug!("store hit: {}", url);
                        return Ok(path);
                    }
                    debug!("store entry for {} is stale", url);
                }
            }
        }

        debug!("store miss: {}", url);
        let started = Instant::now();
        let bytes = download()?;

        if let Some(expected) = expected_sha256 {
            let actual = sha256_hex(&bytes);
            if !actual.eq_ignore_ascii_case(expected) {
                return Err(PaxError::ChecksumMismatch {
                    url: url.to_string(),
                    expected: expected.to_string(),
                    actual,
                });
            }
        }

        write_atomic(&path, &bytes)?;
        debug!(
            "stored {} ({} bytes) in {:.3}s",
            url,
            bytes.len(),
            started.elapsed().as_secs_f64()
        );

        Ok(path)
    }
}

pub fn sha256_hex(bytes: &[u8]) -> String {
    hex::encode(Sha256::digest(bytes))
}

fn file_name(url: &str) -> String {
    let trimmed = url.trim_end_matches('/');
    let name = trimmed.rsplit('/').next().unwrap_or(trimmed);
    let name = name.split(['?', '#']).next().unwrap_or(name);

    if name.is_empty() {
        "artifact".to_string()
    } else {
        name.to_string()
    }
}

fn write_atomic(path: &Path, bytes: &[u8]) -> Result<()> {
    let parent = path.parent().unwrap_or(Path::new("."));
    fs::create_dir_all(parent).map_err(|source| PaxError::WriteFile {
        path: parent.to_path_buf(),
        source,
    })?;

    let mut temp = NamedTempFile::new_in(parent).map_err(|source| PaxError::WriteFile {
        path: parent.to_path_buf(),
        source,
    })?;
    temp.write_all(bytes).map_err(|source| PaxError::WriteFile {
        path: temp.path().to_path_buf(),
        source,
    })?;
    temp.persist(path).map_err(|err| PaxError::WriteFile {
        path: path.to_path_buf(),
        source: err.error,
    })?;

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::Cell;
    use tempfile::TempDir;

    #[test]
    fn second_ensure_is_a_hit() {
        let dir = TempDir::new().unwrap();
        let store = ArtifactStore::new(dir.path().to_path_buf());
        let downloads = Cell::new(0);
        let url = "https://example.org/plugins/a_1.0.0.jar";

        for _ in 0..2 {
            let path = store
                .ensure(url, None, || {
                    downloads.set(downloads.get() + 1);
                    Ok(b"jar".to_vec())
                })
                .unwrap();
            assert!(path.ends_with("a_1.0.0.jar"));
            assert_eq!(fs::read(&path).unwrap(), b"jar");
        }

        assert_eq!(downloads.get(), 1);
    }

    #[test]
    fn checksum_mismatch_is_rejected() {
        let dir = TempDir::new().unwrap();
        let store = ArtifactStore::new(dir.path().to_path_buf());
        let url = "https://example.org/plugins/a_1.0.0.jar";

        let err = store
            .ensure(url, Some("00"), || Ok(b"jar".to_vec()))
            .unwrap_err();
        assert!(matches!(err, PaxError::ChecksumMismatch { .. }));
        assert!(!store.path_for(url).exists());

        let good = sha256_hex(b"jar");
        assert!(store.ensure(url, Some(&good), || Ok(b"jar".to_vec())).is_ok());
    }

    #[test]
    fn file_names_drop_query() {
        assert_eq!(file_name("https://x/y/z.jar?token=1"), "z.jar");
        assert_eq!(file_name("https://x/"), "x");
    }
}
