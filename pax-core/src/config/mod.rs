use crate::environment::EclipseEnvironment;
use crate::provision::SingletonConflictResolution;
use crate::resolve::IncludeMode;
use directories::ProjectDirs;
use std::collections::BTreeSet;
use std::env;
use std::path::{Path, PathBuf};
use std::time::Duration;

pub mod rc;
pub use self::rc::*;

const DEFAULT_HTTP_TIMEOUT_SECS: u64 = 60;

#[derive(Debug, Clone)]
pub struct PaxConfig {
    pub cache_dir: PathBuf,
    pub singleton_conflict: SingletonConflictResolution,
    pub include_mode: IncludeMode,
    pub environment: EclipseEnvironment,
    pub ignore: BTreeSet<String>,
    pub http_timeout: Duration,
    pub verbose: bool,
}

impl PaxConfig {
    pub fn from_env() -> Self {
        let dirs = ProjectDirs::from("org", "ops4j", "pax");

        let cache_dir = if let Ok(home) = env::var("PAX_HOME") {
            PathBuf::from(home).join("cache")
        } else {
            match dirs {
                Some(dirs) => dirs.cache_dir().to_path_buf(),
                None => PathBuf::from(".pax").join("cache"),
            }
        };

        let mut config = Self::with_dirs(cache_dir);
        config.apply_settings();
        config
    }

    /// Defaults only, rooted at `home`. Nothing is read from rc files or
    /// the environment.
    pub fn with_home(home: &Path) -> Self {
        Self::with_dirs(home.join("cache"))
    }

    fn with_dirs(cache_dir: PathBuf) -> Self {
        PaxConfig {
            cache_dir,
            singleton_conflict: SingletonConflictResolution::Fail,
            include_mode: IncludeMode::Strict,
            environment: EclipseEnvironment::current(),
            ignore: BTreeSet::new(),
            http_timeout: Duration::from_secs(DEFAULT_HTTP_TIMEOUT_SECS),
            verbose: false,
        }
    }

    fn apply_settings(&mut self) {
        let mut settings = read_rc_settings();
        settings.overlay(read_env_settings());
        self.apply(&settings);

        self.verbose = env::var("PAX_VERBOSE")
            .map(|value| is_truthy(&value))
            .unwrap_or(false);
    }

    pub fn apply(&mut self, settings: &RcSettings) {
        if let Some(policy) = settings.singleton_conflict {
            self.singleton_conflict = policy;
        }
        if let Some(mode) = settings.include_mode {
            self.include_mode = mode;
        }
        if let Some(os) = &settings.os {
            self.environment.os = os.clone();
        }
        if let Some(ws) = &settings.ws {
            self.environment.ws = ws.clone();
        }
        if let Some(arch) = &settings.arch {
            self.environment.arch = arch.clone();
        }
        if let Some(secs) = settings.http_timeout_secs {
            self.http_timeout = Duration::from_secs(secs);
        }
        self.ignore.extend(settings.ignore.iter().cloned());
    }

    pub fn artifacts_dir(&self) -> PathBuf {
        self.cache_dir.join("artifacts")
    }
}

pub(crate) fn is_truthy(value: &str) -> bool {
    let v = value.trim().to_ascii_lowercase();
    matches!(v.as_str(), "1" | "true" | "yes" | "y" | "on")
}
