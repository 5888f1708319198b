use std::cmp::Ordering;
use std::error::Error as StdError;
use std::fmt;
use std::str::FromStr;

/// An OSGi version: `major.minor.micro.qualifier`.
///
/// Numeric segments compare numerically, the qualifier compares as a plain
/// string. Missing segments default to zero and an empty qualifier.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Default)]
pub struct Version {
    pub major: u64,
    pub minor: u64,
    pub micro: u64,
    pub qualifier: String,
}

#[derive(Debug, Clone)]
pub struct Error {
    input: String,
    message: String,
}

impl Error {
    pub fn new(input: String, message: String) -> Self {
        Self { input, message }
    }

    pub fn input(&self) -> &str {
        &self.input
    }
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} ({})", self.message, self.input)
    }
}

impl StdError for Error {}

impl Version {
    pub const fn new(major: u64, minor: u64, micro: u64) -> Self {
        Self {
            major,
            minor,
            micro,
            qualifier: String::new(),
        }
    }

    pub fn with_qualifier(major: u64, minor: u64, micro: u64, qualifier: &str) -> Self {
        Self {
            major,
            minor,
            micro,
            qualifier: qualifier.to_string(),
        }
    }

    pub fn parse(original: &str) -> Result<Self, Error> {
        let s = original.trim();

        if s.is_empty() {
            return Err(Error::new(original.to_string(), "empty version".to_string()));
        }

        let mut parts = s.splitn(4, '.');
        let major = parse_segment(original, parts.next(), "major")?;
        let minor = parse_segment(original, parts.next(), "minor")?;
        let micro = parse_segment(original, parts.next(), "micro")?;
        let qualifier = parts.next().unwrap_or("");

        if let Some(bad) = qualifier
            .chars()
            .find(|c| !(c.is_ascii_alphanumeric() || *c == '_' || *c == '-'))
        {
            return Err(Error::new(
                original.to_string(),
                format!("invalid character {bad:?} in qualifier"),
            ));
        }

        Ok(Version {
            major: major.unwrap_or(0),
            minor: minor.unwrap_or(0),
            micro: micro.unwrap_or(0),
            qualifier: qualifier.to_string(),
        })
    }

    /// True when major, minor and micro are equal, whatever the qualifiers.
    pub fn same_release(&self, other: &Version) -> bool {
        self.major == other.major && self.minor == other.minor && self.micro == other.micro
    }

    pub fn without_qualifier(&self) -> Version {
        Version::new(self.major, self.minor, self.micro)
    }

    pub fn is_empty(&self) -> bool {
        self.major == 0 && self.minor == 0 && self.micro == 0 && self.qualifier.is_empty()
    }
}

fn parse_segment(original: &str, part: Option<&str>, label: &str) -> Result<Option<u64>, Error> {
    match part {
        None => Ok(None),
        Some(text) => text.parse::<u64>().map(Some).map_err(|_| {
            Error::new(
                original.to_string(),
                format!("invalid {label} segment {text:?}"),
            )
        }),
    }
}

impl Ord for Version {
    fn cmp(&self, other: &Self) -> Ordering {
        self.major
            .cmp(&other.major)
            .then(self.minor.cmp(&other.minor))
            .then(self.micro.cmp(&other.micro))
            .then_with(|| self.qualifier.cmp(&other.qualifier))
    }
}

impl PartialOrd for Version {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl fmt::Display for Version {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.qualifier.is_empty() {
            write!(f, "{}.{}.{}", self.major, self.minor, self.micro)
        } else {
            write!(
                f,
                "{}.{}.{}.{}",
                self.major, self.minor, self.micro, self.qualifier
            )
        }
    }
}

impl FromStr for Version {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Version::parse(s)
    }
}

/// An OSGi version interval such as `[1.0,2.0)`.
///
/// A bare version `1.0` means "at least 1.0" with no upper bound.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct VersionRange {
    left: Version,
    left_closed: bool,
    right: Option<Version>,
    right_closed: bool,
}

impl VersionRange {
    /// `[0.0.0, ∞)`: every version matches.
    pub fn unbounded() -> Self {
        Self::at_least(Version::default())
    }

    pub fn at_least(version: Version) -> Self {
        VersionRange {
            left: version,
            left_closed: true,
            right: None,
            right_closed: false,
        }
    }

    pub fn exact(version: Version) -> Self {
        VersionRange {
            left: version.clone(),
            left_closed: true,
            right: Some(version),
            right_closed: true,
        }
    }

    pub fn between(left: Version, left_closed: bool, right: Version, right_closed: bool) -> Self {
        VersionRange {
            left,
            left_closed,
            right: Some(right),
            right_closed,
        }
    }

    pub fn parse(original: &str) -> Result<Self, Error> {
        let s = original.trim();

        if s.is_empty() {
            return Ok(Self::unbounded());
        }

        let first = s.chars().next().unwrap_or(' ');
        if first != '[' && first != '(' {
            return Ok(Self::at_least(Version::parse(s)?));
        }

        let last = s.chars().last().unwrap_or(' ');
        if last != ']' && last != ')' {
            return Err(Error::new(
                original.to_string(),
                "range is missing a closing bound".to_string(),
            ));
        }

        let inner = &s[1..s.len() - 1];
        let (left, right) = inner.split_once(',').ok_or_else(|| {
            Error::new(
                original.to_string(),
                "range must contain two comma-separated versions".to_string(),
            )
        })?;

        let left = Version::parse(left)?;
        let right = Version::parse(right)?;

        if right < left {
            return Err(Error::new(
                original.to_string(),
                "range upper bound is below its lower bound".to_string(),
            ));
        }

        Ok(VersionRange {
            left,
            left_closed: first == '[',
            right: Some(right),
            right_closed: last == ']',
        })
    }

    pub fn includes(&self, version: &Version) -> bool {
        let above_left = if self.left_closed {
            *version >= self.left
        } else {
            *version > self.left
        };

        if !above_left {
            return false;
        }

        match &self.right {
            None => true,
            Some(right) if self.right_closed => version <= right,
            Some(right) => version < right,
        }
    }

    pub fn left(&self) -> &Version {
        &self.left
    }

    pub fn right(&self) -> Option<&Version> {
        self.right.as_ref()
    }
}

impl Default for VersionRange {
    fn default() -> Self {
        Self::unbounded()
    }
}

impl fmt::Display for VersionRange {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.right {
            None => write!(f, "{}", self.left),
            Some(right) => write!(
                f,
                "{}{},{}{}",
                if self.left_closed { '[' } else { '(' },
                self.left,
                right,
                if self.right_closed { ']' } else { ')' }
            ),
        }
    }
}

impl FromStr for VersionRange {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        VersionRange::parse(s)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_partial_versions() {
        let v = Version::parse("1.2").unwrap();
        assert_eq!(v, Version::new(1, 2, 0));
        assert_eq!(v.to_string(), "1.2.0");
    }

    #[test]
    fn qualifier_compares_lexically() {
        let a = Version::parse("1.0.0.v20200101").unwrap();
        let b = Version::parse("1.0.0.v20210101").unwrap();
        let plain = Version::parse("1.0.0").unwrap();
        assert!(a < b);
        assert!(plain < a);
        assert!(a.same_release(&b));
    }

    #[test]
    fn rejects_garbage() {
        assert!(Version::parse("one.two").is_err());
        assert!(Version::parse("1.0.0.bad qualifier").is_err());
        assert!(Version::parse("").is_err());
    }

    #[test]
    fn half_open_range() {
        let range = VersionRange::parse("[1.0.0,2.0.0)").unwrap();
        assert!(range.includes(&Version::new(1, 0, 0)));
        assert!(range.includes(&Version::new(1, 9, 9)));
        assert!(!range.includes(&Version::new(2, 0, 0)));
        assert_eq!(range.to_string(), "[1.0.0,2.0.0)");
    }

    #[test]
    fn bare_version_is_a_minimum() {
        let range = VersionRange::parse("3.1").unwrap();
        assert!(!range.includes(&Version::new(3, 0, 9)));
        assert!(range.includes(&Version::new(99, 0, 0)));
    }

    #[test]
    fn treats_empty_as_unbounded() {
        let range = VersionRange::parse("").unwrap();
        assert!(range.includes(&Version::default()));
        assert!(range.includes(&Version::new(999, 0, 0)));
    }

    #[test]
    fn exclusive_left_bound() {
        let range = VersionRange::parse("(1.0.0,1.0.0]");
        assert!(range.is_ok());
        let range = range.unwrap();
        assert!(!range.includes(&Version::new(1, 0, 0)));
    }
}
