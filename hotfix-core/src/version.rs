//! Client build identifiers and build ranges.

use std::fmt;
use std::str::FromStr;

use serde::Serialize;

use crate::error::{HotfixError, Result};

/// `major.minor.patch.build`, ordered lexicographically by component.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
pub struct Build {
    pub major: u32,
    pub minor: u32,
    pub patch: u32,
    pub build: u32,
}

impl Build {
    pub const fn new(major: u32, minor: u32, patch: u32, build: u32) -> Self {
        Self {
            major,
            minor,
            patch,
            build,
        }
    }
}

impl FromStr for Build {
    type Err = HotfixError;

    fn from_str(s: &str) -> Result<Self> {
        let invalid = || HotfixError::InvalidBuild(s.to_string());
        let mut parts = s.trim().split('.');
        let mut next = || -> Result<u32> {
            parts
                .next()
                .and_then(|p| p.parse().ok())
                .ok_or_else(invalid)
        };
        let build = Self::new(next()?, next()?, next()?, next()?);
        if parts.next().is_some() {
            return Err(invalid());
        }
        Ok(build)
    }
}

impl fmt::Display for Build {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{}.{}.{}", self.major, self.minor, self.patch, self.build)
    }
}

/// Range of builds. Both endpoints are excluded from membership.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
pub struct BuildRange {
    pub lower: Build,
    pub upper: Build,
}

impl BuildRange {
    pub fn contains(&self, build: &Build) -> bool {
        *build > self.lower && *build < self.upper
    }
}

impl fmt::Display for BuildRange {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}-{}", self.lower, self.upper)
    }
}

/// One build token from schema text: a single build or a range.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
#[serde(untagged)]
pub enum BuildSpec {
    Single(Build),
    Range(BuildRange),
}

impl BuildSpec {
    /// `a.b.c.d` yields a single build, `a.b.c.d-e.f.g.h` a range.
    pub fn parse(s: &str) -> Result<Self> {
        match s.trim().split_once('-') {
            Some((lo, hi)) => Ok(Self::Range(BuildRange {
                lower: lo.parse()?,
                upper: hi.parse()?,
            })),
            None => Ok(Self::Single(s.parse()?)),
        }
    }

    pub fn matches(&self, build: &Build) -> bool {
        match self {
            Self::Single(b) => b == build,
            Self::Range(r) => r.contains(build),
        }
    }
}

impl fmt::Display for BuildSpec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Single(b) => fmt::Display::fmt(b, f),
            Self::Range(r) => fmt::Display::fmt(r, f),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn b(s: &str) -> Build {
        s.parse().unwrap()
    }

    #[test]
    fn round_trips_dotted_form() {
        for s in ["9.0.1.33978", "0.0.0.0", "11.2.5.58238", "1.12.1.5875"] {
            assert_eq!(b(s).to_string(), s);
        }
    }

    #[test]
    fn rejects_malformed_builds() {
        for s in ["", "1.2.3", "1.2.3.4.5", "a.b.c.d", "1.2.3.-4"] {
            assert!(s.parse::<Build>().is_err(), "{s:?} should not parse");
        }
    }

    #[test]
    fn ordering_is_lexicographic() {
        assert!(b("1.0.0.0") > b("0.99.99.99"));
        assert!(b("8.3.7.35662") < b("9.0.1.33978"));
        assert!(b("9.0.1.33978") < b("9.0.1.33979"));
        assert!(b("9.0.2.0") > b("9.0.1.99999"));
        assert_eq!(b("9.0.1.33978").cmp(&b("9.0.1.33978")), std::cmp::Ordering::Equal);
    }

    #[test]
    fn range_excludes_endpoints() {
        let lo = b("7.3.5.25600");
        let mid = b("7.3.5.25700");
        let hi = b("7.3.5.25928");
        let range = BuildRange { lower: lo, upper: hi };
        assert!(range.contains(&mid));
        assert!(!range.contains(&lo));
        assert!(!range.contains(&hi));
        assert!(!range.contains(&b("8.0.1.26000")));
    }

    #[test]
    fn parse_distinguishes_single_and_range() {
        assert_eq!(
            BuildSpec::parse("9.0.1.33978").unwrap(),
            BuildSpec::Single(b("9.0.1.33978"))
        );
        let spec = BuildSpec::parse("7.3.5.25600-7.3.5.25928").unwrap();
        assert_eq!(
            spec,
            BuildSpec::Range(BuildRange {
                lower: b("7.3.5.25600"),
                upper: b("7.3.5.25928"),
            })
        );
        assert_eq!(spec.to_string(), "7.3.5.25600-7.3.5.25928");
        assert!(BuildSpec::parse("7.3.5-7.3.6").is_err());
    }

    #[test]
    fn single_matches_only_itself() {
        let spec = BuildSpec::parse("9.0.1.33978").unwrap();
        assert!(spec.matches(&b("9.0.1.33978")));
        assert!(!spec.matches(&b("9.0.1.33979")));
    }
}
