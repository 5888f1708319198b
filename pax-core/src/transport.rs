use crate::config::PaxConfig;
use crate::store::ArtifactStore;
use crate::{PaxError, Result};
use std::cell::OnceCell;
use std::fs;
use std::io::ErrorKind;
use std::path::PathBuf;
use std::time::Duration;
use tracing::debug;

/// Fetches repository metadata and artifacts from `file:` URLs, plain
/// paths, or HTTP(S). Remote artifacts are kept in the artifact store.
#[derive(Debug)]
pub struct Transport {
    store: ArtifactStore,
    timeout: Duration,
    client: OnceCell<reqwest::blocking::Client>,
}

impl Transport {
    pub fn new(store: ArtifactStore, timeout: Duration) -> Self {
        Transport {
            store,
            timeout,
            client: OnceCell::new(),
        }
    }

    pub fn from_config(config: &PaxConfig) -> Self {
        Self::new(ArtifactStore::new(config.artifacts_dir()), config.http_timeout)
    }

    /// Reads `url`. A missing file or a 404 is `None`, not an error.
    pub fn fetch(&self, url: &str) -> Result<Option<Vec<u8>>> {
        if let Some(path) = local_path(url) {
            return match fs::read(&path) {
                Ok(bytes) => Ok(Some(bytes)),
                Err(err) if err.kind() == ErrorKind::NotFound => Ok(None),
                Err(source) => Err(PaxError::ReadFile { path, source }),
            };
        }

        debug!("GET {}", url);
        let response = self
            .client()?
            .get(url)
            .send()
            .map_err(|source| PaxError::Http {
                url: url.to_string(),
                source,
            })?;

        let status = response.status();
        if status == reqwest::StatusCode::NOT_FOUND {
            return Ok(None);
        }
        if !status.is_success() {
            return Err(PaxError::HttpStatus {
                url: url.to_string(),
                status: status.as_u16(),
            });
        }

        let bytes = response.bytes().map_err(|source| PaxError::Http {
            url: url.to_string(),
            source,
        })?;

        Ok(Some(bytes.to_vec()))
    }

    /// Returns a local path for `url`: local files as they are, remote ones
    /// through the store, checked against `sha256` when given.
    pub fn materialize(&self, url: &str, sha256: Option<&str>) -> Result<PathBuf> {
        if let Some(path) = local_path(url) {
            if path.exists() {
                return Ok(path);
            }
            return Err(PaxError::ReadFile {
                path,
                source: std::io::Error::from(ErrorKind::NotFound),
            });
        }

        self.store.ensure(url, sha256, || {
            self.fetch(url)?.ok_or_else(|| PaxError::HttpStatus {
                url: url.to_string(),
                status: 404,
            })
        })
    }

    fn client(&self) -> Result<&reqwest::blocking::Client> {
        if let Some(client) = self.client.get() {
            return Ok(client);
        }

        let client = reqwest::blocking::Client::builder()
            .timeout(self.timeout)
            .build()
            .map_err(|source| PaxError::Http {
                url: String::new(),
                source,
            })?;

        Ok(self.client.get_or_init(|| client))
    }
}

/// `file:` URLs and bare paths map to a filesystem path; anything with
/// another scheme is remote.
pub fn local_path(url: &str) -> Option<PathBuf> {
    if let Some(rest) = url.strip_prefix("file://") {
        return Some(PathBuf::from(rest));
    }
    if let Some(rest) = url.strip_prefix("file:") {
        return Some(PathBuf::from(rest));
    }
    if url.contains("://") {
        return None;
    }
    Some(PathBuf::from(url))
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn classifies_urls() {
        assert_eq!(local_path("file:///tmp/repo"), Some(PathBuf::from("/tmp/repo")));
        assert_eq!(local_path("file:/tmp/repo"), Some(PathBuf::from("/tmp/repo")));
        assert_eq!(local_path("/tmp/repo"), Some(PathBuf::from("/tmp/repo")));
        assert_eq!(local_path("https://download.eclipse.org/releases"), None);
    }

    #[test]
    fn missing_local_file_is_none() {
        let dir = TempDir::new().unwrap();
        let transport = Transport::new(
            ArtifactStore::new(dir.path().join("store")),
            Duration::from_secs(1),
        );

        let url = format!("file:{}", dir.path().join("content.xml").display());
        assert!(transport.fetch(&url).unwrap().is_none());

        fs::write(dir.path().join("content.xml"), b"<repository/>").unwrap();
        assert_eq!(transport.fetch(&url).unwrap().unwrap(), b"<repository/>");
        assert!(transport.materialize(&url, None).is_ok());
    }
}
