use serde::{Deserialize, Serialize};
use std::env;

const INSTALL_FEATURES: &str = "org.eclipse.update.install.features";

/// The os/ws/arch triple conditional provisioning is evaluated against.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EclipseEnvironment {
    pub os: String,
    pub ws: String,
    pub arch: String,
}

impl EclipseEnvironment {
    pub fn new(os: &str, ws: &str, arch: &str) -> Self {
        EclipseEnvironment {
            os: os.to_string(),
            ws: ws.to_string(),
            arch: arch.to_string(),
        }
    }

    pub fn current() -> Self {
        let os = current_os();
        EclipseEnvironment {
            os: os.to_string(),
            ws: default_ws(os).to_string(),
            arch: current_arch().to_string(),
        }
    }

    fn property(&self, key: &str) -> Option<&str> {
        match key {
            "osgi.os" => Some(&self.os),
            "osgi.ws" => Some(&self.ws),
            "osgi.arch" => Some(&self.arch),
            // p2 guards feature jar requirements with this install property
            INSTALL_FEATURES => Some("true"),
            _ => None,
        }
    }

    /// Evaluates a p2 LDAP filter such as `(&(osgi.os=linux)(osgi.ws=gtk))`.
    ///
    /// Keys other than `osgi.os`, `osgi.ws`, `osgi.arch` and
    /// `org.eclipse.update.install.features` (always `true`) are unknown and
    /// never match. A filter that does not parse matches nothing.
    pub fn matches_filter(&self, filter: &str) -> bool {
        let mut parser = FilterParser {
            input: filter.trim().as_bytes(),
            pos: 0,
        };

        match parser.parse() {
            Some(node) if parser.at_end() => node.eval(self),
            _ => false,
        }
    }
}

impl Default for EclipseEnvironment {
    fn default() -> Self {
        Self::current()
    }
}

/// Environment values a plan or target file pins; unset ones keep the
/// caller's.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct EnvironmentOverride {
    #[serde(default)]
    pub os: Option<String>,
    #[serde(default)]
    pub ws: Option<String>,
    #[serde(default)]
    pub arch: Option<String>,
}

impl EnvironmentOverride {
    pub fn apply(&self, base: &EclipseEnvironment) -> EclipseEnvironment {
        EclipseEnvironment {
            os: self.os.clone().unwrap_or_else(|| base.os.clone()),
            ws: self.ws.clone().unwrap_or_else(|| base.ws.clone()),
            arch: self.arch.clone().unwrap_or_else(|| base.arch.clone()),
        }
    }
}

pub fn current_os() -> &'static str {
    match env::consts::OS {
        "macos" => "macosx",
        "windows" => "win32",
        other => other,
    }
}

pub fn current_arch() -> &'static str {
    match env::consts::ARCH {
        "x86" => "x86",
        "powerpc64" => "ppc64",
        other => other,
    }
}

fn default_ws(os: &str) -> &'static str {
    match os {
        "macosx" => "cocoa",
        "win32" => "win32",
        _ => "gtk",
    }
}

/// The `os`, `ws` and `arch` comma lists a feature entry may carry.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PlatformFilter {
    pub os: Vec<String>,
    pub ws: Vec<String>,
    pub arch: Vec<String>,
}

impl PlatformFilter {
    pub fn from_attributes(os: Option<&str>, ws: Option<&str>, arch: Option<&str>) -> Self {
        PlatformFilter {
            os: split_list(os),
            ws: split_list(ws),
            arch: split_list(arch),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.os.is_empty() && self.ws.is_empty() && self.arch.is_empty()
    }

    pub fn matches(&self, environment: &EclipseEnvironment) -> bool {
        matches_list(&self.os, &environment.os)
            && matches_list(&self.ws, &environment.ws)
            && matches_list(&self.arch, &environment.arch)
    }
}

fn split_list(value: Option<&str>) -> Vec<String> {
    value
        .map(|v| {
            v.split(',')
                .map(str::trim)
                .filter(|part| !part.is_empty())
                .map(str::to_string)
                .collect()
        })
        .unwrap_or_default()
}

fn matches_list(list: &[String], current: &str) -> bool {
    list.is_empty() || list.iter().any(|entry| entry == current)
}

enum FilterNode {
    And(Vec<FilterNode>),
    Or(Vec<FilterNode>),
    Not(Box<FilterNode>),
    Equals { key: String, pattern: String },
    Present(String),
}

impl FilterNode {
    fn eval(&self, environment: &EclipseEnvironment) -> bool {
        match self {
            FilterNode::And(children) => children.iter().all(|c| c.eval(environment)),
            FilterNode::Or(children) => children.iter().any(|c| c.eval(environment)),
            FilterNode::Not(child) => !child.eval(environment),
            FilterNode::Present(key) => environment.property(key).is_some(),
            FilterNode::Equals { key, pattern } => environment
                .property(key)
                .map(|value| wildcard_match(pattern, value))
                .unwrap_or(false),
        }
    }
}

struct FilterParser<'a> {
    input: &'a [u8],
    pos: usize,
}

impl FilterParser<'_> {
    fn at_end(&mut self) -> bool {
        self.skip_ws();
        self.pos >= self.input.len()
    }

    fn skip_ws(&mut self) {
        while self.pos < self.input.len() && self.input[self.pos].is_ascii_whitespace() {
            self.pos += 1;
        }
    }

    fn expect(&mut self, byte: u8) -> Option<()> {
        self.skip_ws();
        if self.input.get(self.pos) == Some(&byte) {
            self.pos += 1;
            Some(())
        } else {
            None
        }
    }

    fn parse(&mut self) -> Option<FilterNode> {
        self.expect(b'(')?;
        self.skip_ws();

        let node = match self.input.get(self.pos)? {
            b'&' => {
                self.pos += 1;
                FilterNode::And(self.parse_list()?)
            }
            b'|' => {
                self.pos += 1;
                FilterNode::Or(self.parse_list()?)
            }
            b'!' => {
                self.pos += 1;
                FilterNode::Not(Box::new(self.parse()?))
            }
            _ => self.parse_comparison()?,
        };

        self.expect(b')')?;
        Some(node)
    }

    fn parse_list(&mut self) -> Option<Vec<FilterNode>> {
        let mut children = Vec::new();
        loop {
            self.skip_ws();
            if self.input.get(self.pos) != Some(&b'(') {
                break;
            }
            children.push(self.parse()?);
        }
        Some(children)
    }

    fn parse_comparison(&mut self) -> Option<FilterNode> {
        let start = self.pos;
        while self.pos < self.input.len() && self.input[self.pos] != b'=' {
            if self.input[self.pos] == b')' {
                return None;
            }
            self.pos += 1;
        }
        let key = std::str::from_utf8(&self.input[start..self.pos]).ok()?.trim();
        self.expect(b'=')?;

        let value_start = self.pos;
        while self.pos < self.input.len() && self.input[self.pos] != b')' {
            self.pos += 1;
        }
        let pattern = std::str::from_utf8(&self.input[value_start..self.pos])
            .ok()?
            .trim();

        if key.is_empty() {
            return None;
        }

        if pattern == "*" {
            return Some(FilterNode::Present(key.to_string()));
        }

        Some(FilterNode::Equals {
            key: key.to_string(),
            pattern: pattern.to_string(),
        })
    }
}

fn wildcard_match(pattern: &str, value: &str) -> bool {
    if !pattern.contains('*') {
        return pattern.eq_ignore_ascii_case(value);
    }

    let parts: Vec<&str> = pattern.split('*').collect();
    let mut rest = value;

    for (i, part) in parts.iter().enumerate() {
        if part.is_empty() {
            continue;
        }
        if i == 0 {
            match rest.strip_prefix(part) {
                Some(stripped) => rest = stripped,
                None => return false,
            }
        } else if let Some(found) = rest.find(part) {
            rest = &rest[found + part.len()..];
        } else {
            return false;
        }
    }

    match parts.last() {
        Some(last) if !last.is_empty() => value.ends_with(last),
        _ => true,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn linux() -> EclipseEnvironment {
        EclipseEnvironment::new("linux", "gtk", "x86_64")
    }

    #[test]
    fn evaluates_and_filter() {
        let env = linux();
        assert!(env.matches_filter("(&(osgi.os=linux)(osgi.ws=gtk))"));
        assert!(!env.matches_filter("(&(osgi.os=win32)(osgi.ws=win32))"));
    }

    #[test]
    fn evaluates_or_and_not() {
        let env = linux();
        assert!(env.matches_filter("(|(osgi.os=macosx)(osgi.os=linux))"));
        assert!(env.matches_filter("(!(osgi.os=win32))"));
        assert!(!env.matches_filter("(!(osgi.arch=x86_64))"));
    }

    #[test]
    fn supports_wildcards_and_presence() {
        let env = linux();
        assert!(env.matches_filter("(osgi.arch=x86*)"));
        assert!(env.matches_filter("(osgi.os=*)"));
        assert!(!env.matches_filter("(osgi.nl=*)"));
    }

    #[test]
    fn feature_jars_are_always_installed() {
        assert!(linux().matches_filter("(org.eclipse.update.install.features=true)"));
    }

    #[test]
    fn malformed_filter_matches_nothing() {
        assert!(!linux().matches_filter("(osgi.os=linux"));
        assert!(!linux().matches_filter("osgi.os=linux"));
    }

    #[test]
    fn platform_filter_uses_comma_lists() {
        let filter = PlatformFilter::from_attributes(Some("win32, linux"), None, Some("x86_64"));
        assert!(filter.matches(&linux()));
        let other = PlatformFilter::from_attributes(Some("macosx"), None, None);
        assert!(!other.matches(&linux()));
        assert!(PlatformFilter::default().matches(&linux()));
    }
}
