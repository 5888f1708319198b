use crate::provision::SingletonConflictResolution;
use crate::resolve::IncludeMode;
use directories::BaseDirs;
use std::path::PathBuf;
use std::{env, fs, path::Path};

const RC_FILE: &str = ".paxrc";

/// Settings gathered from `.paxrc` files and `PAX_*` variables. `None`
/// leaves the built-in default alone.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RcSettings {
    pub singleton_conflict: Option<SingletonConflictResolution>,
    pub include_mode: Option<IncludeMode>,
    pub os: Option<String>,
    pub ws: Option<String>,
    pub arch: Option<String>,
    pub ignore: Vec<String>,
    pub http_timeout_secs: Option<u64>,
}

impl RcSettings {
    /// Values set in `other` win; ignore lists are concatenated.
    pub fn overlay(&mut self, other: RcSettings) {
        if other.singleton_conflict.is_some() {
            self.singleton_conflict = other.singleton_conflict;
        }
        if other.include_mode.is_some() {
            self.include_mode = other.include_mode;
        }
        if other.os.is_some() {
            self.os = other.os;
        }
        if other.ws.is_some() {
            self.ws = other.ws;
        }
        if other.arch.is_some() {
            self.arch = other.arch;
        }
        if other.http_timeout_secs.is_some() {
            self.http_timeout_secs = other.http_timeout_secs;
        }
        self.ignore.extend(other.ignore);
    }

    fn set(&mut self, key: &str, value: &str) {
        match key {
            "singleton-conflict" | "singleton_conflict" => {
                if let Some(policy) = SingletonConflictResolution::from_str(value) {
                    self.singleton_conflict = Some(policy);
                }
            }
            "include-mode" | "include_mode" => {
                if let Some(mode) = IncludeMode::from_str(value) {
                    self.include_mode = Some(mode);
                }
            }
            "os" => self.os = non_empty(value),
            "ws" => self.ws = non_empty(value),
            "arch" => self.arch = non_empty(value),
            "ignore" => self.ignore.extend(split_list(value)),
            "http-timeout" | "http_timeout" => {
                if let Ok(parsed) = value.trim().parse::<u64>()
                    && parsed > 0
                {
                    self.http_timeout_secs = Some(parsed);
                }
            }
            _ => {}
        }
    }
}

pub fn expand_env_vars(text: &str) -> String {
    let mut out = String::new();
    let mut rest = text;

    while let Some(dollar) = rest.find('$') {
        out.push_str(&rest[..dollar]);
        let after = &rest[dollar + 1..];

        if let Some(braced) = after.strip_prefix('{')
            && let Some(end) = braced.find('}')
        {
            out.push_str(&env::var(&braced[..end]).unwrap_or_default());
            rest = &braced[end + 1..];
            continue;
        }

        let len = after
            .find(|c: char| !(c == '_' || c.is_ascii_alphanumeric()))
            .unwrap_or(after.len());

        if len == 0 {
            out.push('$');
        } else {
            out.push_str(&env::var(&after[..len]).unwrap_or_default());
        }
        rest = &after[len..];
    }

    out.push_str(rest);
    out
}

pub fn parse_rc(data: &str) -> RcSettings {
    let mut settings = RcSettings::default();

    for line in data.lines() {
        let trimmed = line.trim();
        if trimmed.is_empty() || trimmed.starts_with('#') || trimmed.starts_with(';') {
            continue;
        }

        if let Some((key, value)) = trimmed.split_once('=') {
            let value = expand_env_vars(value.trim());
            settings.set(key.trim(), &value);
        }
    }

    settings
}

pub fn apply_rc_file(path: &Path, settings: &mut RcSettings) {
    if !path.is_file() {
        return;
    }

    if let Ok(data) = fs::read_to_string(path) {
        tracing::debug!("applying {}", path.display());
        settings.overlay(parse_rc(&data));
    }
}

/// Home `.paxrc` first, then every `.paxrc` from the filesystem root down
/// to the current directory, so the nearest file wins.
pub fn read_rc_settings() -> RcSettings {
    let mut settings = RcSettings::default();

    if let Some(base) = BaseDirs::new() {
        apply_rc_file(&base.home_dir().join(RC_FILE), &mut settings);
    }

    let cwd = env::current_dir().unwrap_or_else(|_| PathBuf::from("."));
    let mut chain: Vec<&Path> = cwd.ancestors().collect();
    chain.reverse();

    for dir in chain {
        apply_rc_file(&dir.join(RC_FILE), &mut settings);
    }

    settings
}

pub fn read_env_settings() -> RcSettings {
    let mut settings = RcSettings::default();

    let pairs = [
        ("PAX_SINGLETON_CONFLICT", "singleton-conflict"),
        ("PAX_INCLUDE_MODE", "include-mode"),
        ("PAX_OS", "os"),
        ("PAX_WS", "ws"),
        ("PAX_ARCH", "arch"),
        ("PAX_IGNORE", "ignore"),
        ("PAX_HTTP_TIMEOUT_SECS", "http-timeout"),
    ];

    for (var, key) in pairs {
        if let Ok(value) = env::var(var) {
            settings.set(key, &value);
        }
    }

    settings
}

fn non_empty(value: &str) -> Option<String> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        None
    } else {
        Some(trimmed.to_string())
    }
}

fn split_list(value: &str) -> Vec<String> {
    value
        .split(',')
        .map(str::trim)
        .filter(|part| !part.is_empty())
        .map(str::to_string)
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_rc_lines() {
        let data = "# comment\n; another\nsingleton-conflict = use-highest-version\ninclude-mode=slicer\nos = linux\nignore = org.eclipse.osgi, org.junit:4\nhttp-timeout = 5\nunknown = 1\n";
        let settings = parse_rc(data);

        assert_eq!(
            settings.singleton_conflict,
            Some(SingletonConflictResolution::UseHighestVersion)
        );
        assert_eq!(settings.include_mode, Some(IncludeMode::Slicer));
        assert_eq!(settings.os.as_deref(), Some("linux"));
        assert_eq!(settings.ignore, vec!["org.eclipse.osgi", "org.junit:4"]);
        assert_eq!(settings.http_timeout_secs, Some(5));
    }

    #[test]
    fn overlay_prefers_later_values() {
        let mut base = parse_rc("os = linux\narch = x86_64\nignore = a\n");
        base.overlay(parse_rc("os = win32\nignore = b\n"));

        assert_eq!(base.os.as_deref(), Some("win32"));
        assert_eq!(base.arch.as_deref(), Some("x86_64"));
        assert_eq!(base.ignore, vec!["a", "b"]);
    }

    #[test]
    fn expands_braced_and_bare_variables() {
        let home = env::var("PATH").unwrap_or_default();
        assert_eq!(expand_env_vars("${PATH}"), home);
        assert_eq!(expand_env_vars("$PATH/x"), format!("{home}/x"));
        assert_eq!(expand_env_vars("cost: $"), "cost: $");
    }
}
